//! Dispatcher: the top-level per-request state machine. Resolves the alias,
//! arbitrates on project mode, delegates to the mock/proxy/forwarder
//! sub-flows, and always returns a structured response — the core never lets
//! a transport-layer failure escape to its caller.

use crate::delay;
use crate::error::Error;
use crate::forwarder::{self, ForwardedResponse};
use crate::headers::{BEO_ECHO_RESPONSE_TYPE, LOOP_HEADER_PREFIX};
use crate::model::{Endpoint, MockResponse, Project, ProjectMode};
use crate::repository::Repository;
use crate::request::DispatchRequest;
use crate::response_builder::{self, BuiltResponse};
use crate::selector::{self, RoundRobinRegistry};
use std::sync::Arc;

/// Which sub-flow produced a [`DispatchOutcome`]'s response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Served from a stored mock response.
    Mock,
    /// Served by trying mocks first, per the `proxy`-mode project flow.
    Proxy,
    /// Served by an unconditional upstream forward.
    Forwarder,
}

impl ExecutionMode {
    /// Lowercase string form, matching the wire-level `executionMode` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Proxy => "proxy",
            Self::Forwarder => "forwarder",
        }
    }
}

/// A fully materialized response, framework-agnostic.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in emission order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// The full result of [`Dispatcher::handle`].
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The response to send back to the inbound caller.
    pub response: DispatchResponse,
    /// The resolved project id, absent only on alias miss.
    pub project_id: Option<String>,
    /// Which branch served the request; absent on alias miss, a disabled
    /// project, or a branch that failed before any sub-flow ran to
    /// completion.
    pub execution_mode: Option<ExecutionMode>,
    /// True iff a concrete mock endpoint supplied the response.
    pub matched: bool,
}

/// Overridable text for the default 200-status JSON envelopes.
#[derive(Debug, Clone)]
pub struct EnvelopeTexts {
    /// Shown when the alias does not resolve to a project.
    pub project_not_found: String,
    /// Shown when no endpoint matches `(project, method, path)`.
    pub endpoint_not_found: String,
    /// Shown when an endpoint has no usable response configured.
    pub no_response_configured: String,
}

impl Default for EnvelopeTexts {
    fn default() -> Self {
        Self {
            project_not_found: "project not found for this alias".to_string(),
            endpoint_not_found: "no endpoint matches this request".to_string(),
            no_response_configured: "no response configured for this endpoint".to_string(),
        }
    }
}

/// The request-dispatch state machine, generic over a storage collaborator.
pub struct Dispatcher<R: Repository> {
    repository: Arc<R>,
    client: reqwest::Client,
    round_robin: RoundRobinRegistry,
    envelope_texts: EnvelopeTexts,
}

impl<R: Repository> Dispatcher<R> {
    /// Build a dispatcher over `repository`, with default envelope text.
    pub fn new(repository: Arc<R>) -> crate::error::Result<Self> {
        Ok(Self {
            repository,
            client: forwarder::build_client()?,
            round_robin: RoundRobinRegistry::new(),
            envelope_texts: EnvelopeTexts::default(),
        })
    }

    /// Override the default envelope text, e.g. from loaded configuration.
    pub fn with_envelope_texts(mut self, texts: EnvelopeTexts) -> Self {
        self.envelope_texts = texts;
        self
    }

    /// Dispatch one request: resolve `alias`, arbitrate on project mode, and
    /// return the structured outcome. `path` is the full inbound path,
    /// including the leading `/{alias}` segment; it is stripped before being
    /// handed to the Repository and the Upstream Forwarder.
    pub async fn handle(
        &self,
        alias: &str,
        method: &str,
        path: &str,
        raw_query: Option<&str>,
        request: &DispatchRequest,
    ) -> DispatchOutcome {
        let rest_path = strip_alias_prefix(path, alias);

        let project = match self.repository.find_project_by_alias(alias).await {
            Some(project) => project,
            None => {
                tracing::debug!(alias, "alias did not resolve to a project");
                return DispatchOutcome {
                    response: json_envelope(200, &self.envelope_texts.project_not_found),
                    project_id: None,
                    execution_mode: None,
                    matched: false,
                };
            }
        };

        // Loop detection at the mode-branch entry: every request carrying a
        // beo-echo header is rejected with 508 regardless of which sub-flow
        // would otherwise serve it. The Upstream Forwarder repeats this check
        // before it ever dials out — that inner check is defense-in-depth
        // for code paths that reach it without passing through here.
        if request.has_header_prefixed(LOOP_HEADER_PREFIX) {
            tracing::debug!(project_id = %project.id, "rejecting request with beo-echo header");
            return DispatchOutcome {
                response: error_envelope(508, "Proxy loop detected: request contains beo-echo header"),
                project_id: Some(project.id),
                execution_mode: None,
                matched: false,
            };
        }

        match project.mode {
            ProjectMode::Mock => {
                self.mock_flow(&project, method, &rest_path, raw_query, request).await
            }
            ProjectMode::Proxy => {
                self.proxy_flow(&project, method, &rest_path, raw_query, request).await
            }
            ProjectMode::Forwarder => {
                self.forwarder_flow(&project, method, &rest_path, raw_query, request).await
            }
            ProjectMode::Disabled => {
                tracing::info!(project_id = %project.id, "project is disabled");
                DispatchOutcome {
                    response: error_envelope(503, "project is disabled"),
                    project_id: Some(project.id),
                    execution_mode: None,
                    matched: false,
                }
            }
        }
    }

    async fn mock_flow(
        &self,
        project: &Project,
        method: &str,
        rest_path: &str,
        raw_query: Option<&str>,
        request: &DispatchRequest,
    ) -> DispatchOutcome {
        let project_id = Some(project.id.clone());

        match self.attempt_mock(project, method, rest_path, request).await {
            MockAttempt::NoEndpoint => {
                delay::apply(delay::effective_delay_ms(None, None, Some(&project.advance_config)))
                    .await;
                DispatchOutcome {
                    response: json_envelope(200, &self.envelope_texts.endpoint_not_found),
                    project_id,
                    execution_mode: Some(ExecutionMode::Mock),
                    matched: false,
                }
            }
            MockAttempt::EndpointUseProxy { endpoint } => {
                let delay_ms = delay::effective_delay_ms(
                    None,
                    Some(&endpoint.advance_config),
                    Some(&project.advance_config),
                );
                delay::apply(delay_ms).await;

                let target = endpoint
                    .proxy_target
                    .as_ref()
                    .expect("MockAttempt::EndpointUseProxy carries a proxy target");
                let response = match self
                    .forward(target.url.as_str(), method, rest_path, raw_query, request)
                    .await
                {
                    Ok(forwarded) => forwarded_to_dispatch(forwarded),
                    Err(err) => error_envelope_for(&err),
                };
                DispatchOutcome {
                    response,
                    project_id,
                    execution_mode: Some(ExecutionMode::Proxy),
                    matched: true,
                }
            }
            MockAttempt::NoResponses { endpoint } => {
                let delay_ms = delay::effective_delay_ms(
                    None,
                    Some(&endpoint.advance_config),
                    Some(&project.advance_config),
                );
                delay::apply(delay_ms).await;
                DispatchOutcome {
                    response: json_envelope(200, &self.envelope_texts.no_response_configured),
                    project_id,
                    execution_mode: Some(ExecutionMode::Mock),
                    matched: true,
                }
            }
            MockAttempt::NoSelection { endpoint } => {
                let delay_ms = delay::effective_delay_ms(
                    None,
                    Some(&endpoint.advance_config),
                    Some(&project.advance_config),
                );
                delay::apply(delay_ms).await;
                DispatchOutcome {
                    response: json_envelope(200, &self.envelope_texts.no_response_configured),
                    project_id,
                    execution_mode: Some(ExecutionMode::Mock),
                    matched: false,
                }
            }
            MockAttempt::Selected { endpoint, response } => {
                let delay_ms = delay::effective_delay_ms(
                    Some(response.delay_ms),
                    Some(&endpoint.advance_config),
                    Some(&project.advance_config),
                );
                delay::apply(delay_ms).await;
                DispatchOutcome {
                    response: built_to_dispatch(response_builder::build(&response)),
                    project_id,
                    execution_mode: Some(ExecutionMode::Mock),
                    matched: true,
                }
            }
        }
    }

    async fn proxy_flow(
        &self,
        project: &Project,
        method: &str,
        rest_path: &str,
        raw_query: Option<&str>,
        request: &DispatchRequest,
    ) -> DispatchOutcome {
        let project_id = Some(project.id.clone());

        let attempt = self.attempt_mock(project, method, rest_path, request).await;
        match attempt {
            MockAttempt::EndpointUseProxy { endpoint } => {
                let delay_ms = delay::effective_delay_ms(
                    None,
                    Some(&endpoint.advance_config),
                    Some(&project.advance_config),
                );
                delay::apply(delay_ms).await;

                let target = endpoint
                    .proxy_target
                    .as_ref()
                    .expect("MockAttempt::EndpointUseProxy carries a proxy target");
                match self.forward(target.url.as_str(), method, rest_path, raw_query, request).await {
                    Ok(forwarded) => {
                        let mut response = forwarded_to_dispatch(forwarded);
                        response.headers.push((
                            BEO_ECHO_RESPONSE_TYPE.to_string(),
                            "mock".to_string(),
                        ));
                        DispatchOutcome {
                            response,
                            project_id,
                            execution_mode: Some(ExecutionMode::Proxy),
                            matched: true,
                        }
                    }
                    // A forwarding failure on the endpoint's own proxy target
                    // is treated like any other mock-attempt miss: fall
                    // through to the project's active proxy below.
                    Err(err) => {
                        tracing::debug!(error = %err, "endpoint proxy target failed, falling back to project proxy");
                        self.proxy_fallback(project, method, rest_path, raw_query, request).await
                    }
                }
            }
            MockAttempt::Selected { endpoint, response } => {
                let delay_ms = delay::effective_delay_ms(
                    Some(response.delay_ms),
                    Some(&endpoint.advance_config),
                    Some(&project.advance_config),
                );
                delay::apply(delay_ms).await;
                let mut dispatch_response = built_to_dispatch(response_builder::build(&response));
                dispatch_response
                    .headers
                    .push((BEO_ECHO_RESPONSE_TYPE.to_string(), "mock".to_string()));
                DispatchOutcome {
                    response: dispatch_response,
                    project_id,
                    execution_mode: Some(ExecutionMode::Proxy),
                    matched: true,
                }
            }
            MockAttempt::NoEndpoint | MockAttempt::NoResponses { .. } | MockAttempt::NoSelection { .. } => {
                self.proxy_fallback(project, method, rest_path, raw_query, request).await
            }
        }
    }

    /// The "fall through to the project's active proxy" half of the proxy
    /// flow, shared between a direct mock-attempt miss and a failed
    /// endpoint-level proxy forward.
    async fn proxy_fallback(
        &self,
        project: &Project,
        method: &str,
        rest_path: &str,
        raw_query: Option<&str>,
        request: &DispatchRequest,
    ) -> DispatchOutcome {
        let project_id = Some(project.id.clone());
        delay::apply(delay::effective_delay_ms(None, None, Some(&project.advance_config))).await;

        let target = match &project.active_proxy {
            Some(target) => target,
            None => {
                return DispatchOutcome {
                    response: error_envelope(500, "no active proxy configured"),
                    project_id,
                    execution_mode: None,
                    matched: false,
                };
            }
        };

        match self.forward(target.url.as_str(), method, rest_path, raw_query, request).await {
            Ok(forwarded) => {
                let mut response = forwarded_to_dispatch(forwarded);
                response
                    .headers
                    .push((BEO_ECHO_RESPONSE_TYPE.to_string(), "proxy".to_string()));
                DispatchOutcome {
                    response,
                    project_id,
                    execution_mode: Some(ExecutionMode::Proxy),
                    matched: false,
                }
            }
            Err(err) => DispatchOutcome {
                response: error_envelope_for(&err),
                project_id,
                execution_mode: Some(ExecutionMode::Proxy),
                matched: false,
            },
        }
    }

    async fn forwarder_flow(
        &self,
        project: &Project,
        method: &str,
        rest_path: &str,
        raw_query: Option<&str>,
        request: &DispatchRequest,
    ) -> DispatchOutcome {
        let project_id = Some(project.id.clone());
        delay::apply(delay::effective_delay_ms(None, None, Some(&project.advance_config))).await;

        let target = match &project.active_proxy {
            Some(target) => target,
            None => {
                return DispatchOutcome {
                    response: error_envelope(500, "no active proxy configured"),
                    project_id,
                    execution_mode: None,
                    matched: false,
                };
            }
        };

        let response = match self.forward(target.url.as_str(), method, rest_path, raw_query, request).await {
            Ok(forwarded) => forwarded_to_dispatch(forwarded),
            Err(err) => error_envelope_for(&err),
        };
        DispatchOutcome {
            response,
            project_id,
            execution_mode: Some(ExecutionMode::Forwarder),
            matched: false,
        }
    }

    /// Endpoint lookup, use-proxy check, responses lookup, and selection —
    /// exactly the shared first four steps of the mock flow, reused
    /// verbatim by the proxy flow's mock-first attempt.
    async fn attempt_mock(
        &self,
        project: &Project,
        method: &str,
        rest_path: &str,
        request: &DispatchRequest,
    ) -> MockAttempt {
        let endpoint = match self.repository.find_matching_endpoint(&project.id, method, rest_path).await {
            Some(endpoint) => endpoint,
            None => return MockAttempt::NoEndpoint,
        };

        if endpoint.use_proxy && endpoint.proxy_target.is_some() {
            return MockAttempt::EndpointUseProxy { endpoint };
        }

        let responses = self.repository.find_responses_by_endpoint_id(&endpoint.id).await;
        if responses.is_empty() {
            return MockAttempt::NoResponses { endpoint };
        }

        match selector::select(&endpoint.id, &responses, endpoint.response_mode, request, &self.round_robin) {
            Some(response) => MockAttempt::Selected { endpoint, response },
            None => MockAttempt::NoSelection { endpoint },
        }
    }

    async fn forward(
        &self,
        base_url: &str,
        method: &str,
        sub_path: &str,
        raw_query: Option<&str>,
        request: &DispatchRequest,
    ) -> crate::error::Result<ForwardedResponse> {
        forwarder::forward(&self.client, base_url, method, sub_path, raw_query, request).await
    }
}

enum MockAttempt {
    NoEndpoint,
    EndpointUseProxy { endpoint: Endpoint },
    NoResponses { endpoint: Endpoint },
    NoSelection { endpoint: Endpoint },
    Selected { endpoint: Endpoint, response: MockResponse },
}

/// Strip a leading `/` and the alias prefix from an inbound path, returning
/// the remainder with a single leading `/`. A path that does not actually
/// start with the alias is passed through unchanged (beyond normalizing the
/// leading slash) rather than rejected — routing ambiguity here is the
/// caller's to resolve, not the dispatcher's.
fn strip_alias_prefix(path: &str, alias: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed == alias {
        return "/".to_string();
    }
    let prefix = format!("{alias}/");
    match trimmed.strip_prefix(&prefix) {
        Some(rest) => format!("/{rest}"),
        None => format!("/{trimmed}"),
    }
}

fn json_envelope(status: u16, message: &str) -> DispatchResponse {
    let body = serde_json::json!({ "message": message });
    json_response(status, &body)
}

fn error_envelope(status: u16, message: &str) -> DispatchResponse {
    let body = serde_json::json!({ "error": true, "message": message });
    json_response(status, &body)
}

fn json_response(status: u16, body: &serde_json::Value) -> DispatchResponse {
    DispatchResponse {
        status,
        headers: vec![("Content-Type".to_string(), "application/json; charset=utf-8".to_string())],
        body: serde_json::to_vec(body).unwrap_or_default(),
    }
}

/// Map a forwarder [`Error`] to the structured envelope the core returns
/// instead of a transport failure.
fn error_envelope_for(err: &Error) -> DispatchResponse {
    let status = match err {
        Error::LoopDetected { .. } => 508,
        Error::UrlParse(_) => 500,
        Error::Proxy { .. } => 502,
        Error::Dispatch { .. } | Error::Config { .. } => 500,
        Error::Disabled { .. } => 503,
        _ => 500,
    };
    error_envelope(status, &err.to_string())
}

fn forwarded_to_dispatch(forwarded: ForwardedResponse) -> DispatchResponse {
    DispatchResponse { status: forwarded.status, headers: forwarded.headers, body: forwarded.body }
}

fn built_to_dispatch(built: BuiltResponse) -> DispatchResponse {
    DispatchResponse { status: built.status, headers: built.headers, body: built.body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdvanceConfig, ProxyTarget, Rule, RuleOperator, RuleType};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::HeaderMap;
    use std::collections::HashMap;
    use wiremock::matchers::{method as wm_method, path as wm_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixtureRepository {
        projects: HashMap<String, Project>,
        endpoints: HashMap<(String, String, String), Endpoint>,
        responses: HashMap<String, Vec<MockResponse>>,
    }

    #[async_trait]
    impl Repository for FixtureRepository {
        async fn find_project_by_alias(&self, alias: &str) -> Option<Project> {
            self.projects.get(alias).cloned()
        }

        async fn find_matching_endpoint(
            &self,
            project_id: &str,
            method: &str,
            path: &str,
        ) -> Option<Endpoint> {
            self.endpoints
                .get(&(project_id.to_string(), method.to_string(), path.to_string()))
                .cloned()
        }

        async fn find_responses_by_endpoint_id(&self, endpoint_id: &str) -> Vec<MockResponse> {
            self.responses.get(endpoint_id).cloned().unwrap_or_default()
        }
    }

    fn empty_request() -> DispatchRequest {
        DispatchRequest {
            method: "GET".to_string(),
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body: Bytes::new(),
        }
    }

    fn loop_request() -> DispatchRequest {
        let mut headers = HeaderMap::new();
        headers.insert("Beo-Echo-Loop-Detect", http::HeaderValue::from_static("true"));
        DispatchRequest { method: "GET".to_string(), headers, query: HashMap::new(), body: Bytes::new() }
    }

    fn unconditional_response(id: &str, priority: i64) -> MockResponse {
        MockResponse {
            id: id.to_string(),
            endpoint_id: "ep1".to_string(),
            status_code: 200,
            body: format!("body-{id}"),
            headers: "{}".to_string(),
            priority,
            delay_ms: 0,
            is_fallback: false,
            rules: vec![],
        }
    }

    #[tokio::test]
    async fn alias_miss_returns_soft_envelope() {
        let repo = Arc::new(FixtureRepository {
            projects: HashMap::new(),
            endpoints: HashMap::new(),
            responses: HashMap::new(),
        });
        let dispatcher = Dispatcher::new(repo).unwrap();
        let outcome = dispatcher.handle("ghost", "GET", "/ghost/x", None, &empty_request()).await;

        assert_eq!(outcome.response.status, 200);
        assert!(outcome.project_id.is_none());
        assert!(outcome.execution_mode.is_none());
        assert!(!outcome.matched);
    }

    #[tokio::test]
    async fn mock_static_selection_picks_highest_priority() {
        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Mock,
                active_proxy: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        let mut endpoints = HashMap::new();
        endpoints.insert(
            ("p1".to_string(), "GET".to_string(), "/widgets".to_string()),
            Endpoint {
                id: "e1".to_string(),
                project_id: "p1".to_string(),
                method: "GET".to_string(),
                path: "/widgets".to_string(),
                response_mode: crate::model::ResponseMode::Static,
                use_proxy: false,
                proxy_target: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        let mut responses = HashMap::new();
        responses.insert(
            "e1".to_string(),
            vec![
                unconditional_response("a", 1),
                unconditional_response("b", 5),
                unconditional_response("c", 3),
            ],
        );
        let repo = Arc::new(FixtureRepository { projects, endpoints, responses });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome =
            dispatcher.handle("acme", "GET", "/acme/widgets", None, &empty_request()).await;
        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.response.body, b"body-b");
        assert!(outcome.matched);
        assert_eq!(outcome.execution_mode, Some(ExecutionMode::Mock));
    }

    #[tokio::test]
    async fn proxy_mode_mock_first_skips_upstream_call() {
        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Proxy,
                active_proxy: Some(ProxyTarget { url: "http://127.0.0.1:9".to_string() }),
                advance_config: AdvanceConfig::default(),
            },
        );
        let mut endpoints = HashMap::new();
        endpoints.insert(
            ("p1".to_string(), "GET".to_string(), "/widgets".to_string()),
            Endpoint {
                id: "e1".to_string(),
                project_id: "p1".to_string(),
                method: "GET".to_string(),
                path: "/widgets".to_string(),
                response_mode: crate::model::ResponseMode::Static,
                use_proxy: false,
                proxy_target: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        let mut responses = HashMap::new();
        responses.insert("e1".to_string(), vec![unconditional_response("only", 1)]);
        let repo = Arc::new(FixtureRepository { projects, endpoints, responses });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome =
            dispatcher.handle("acme", "GET", "/acme/widgets", None, &empty_request()).await;
        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.response.body, b"body-only");
        assert!(outcome.matched);
        assert_eq!(outcome.execution_mode, Some(ExecutionMode::Proxy));
        assert!(outcome
            .response
            .headers
            .iter()
            .any(|(k, v)| k == BEO_ECHO_RESPONSE_TYPE && v == "mock"));
    }

    #[tokio::test]
    async fn forwarder_mode_rejects_loop_without_dialing_upstream() {
        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Forwarder,
                active_proxy: Some(ProxyTarget { url: "http://127.0.0.1:9".to_string() }),
                advance_config: AdvanceConfig::default(),
            },
        );
        let repo = Arc::new(FixtureRepository {
            projects,
            endpoints: HashMap::new(),
            responses: HashMap::new(),
        });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome = dispatcher.handle("acme", "GET", "/acme/x", None, &loop_request()).await;
        assert_eq!(outcome.response.status, 508);
        assert!(!outcome.matched);
    }

    #[tokio::test]
    async fn mock_mode_rejects_loop_header_without_touching_repository() {
        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Mock,
                active_proxy: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        // No endpoints registered: if the loop check were skipped, the mock
        // flow would fall into the "endpoint not found" 200 envelope instead
        // of 508, so this also proves the check runs before the mock flow.
        let repo = Arc::new(FixtureRepository {
            projects,
            endpoints: HashMap::new(),
            responses: HashMap::new(),
        });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome = dispatcher.handle("acme", "GET", "/acme/widgets", None, &loop_request()).await;
        assert_eq!(outcome.response.status, 508);
        assert!(!outcome.matched);
        assert!(outcome.execution_mode.is_none());
    }

    #[tokio::test]
    async fn disabled_project_returns_503() {
        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Disabled,
                active_proxy: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        let repo = Arc::new(FixtureRepository {
            projects,
            endpoints: HashMap::new(),
            responses: HashMap::new(),
        });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome = dispatcher.handle("acme", "GET", "/acme/x", None, &empty_request()).await;
        assert_eq!(outcome.response.status, 503);
        assert_eq!(outcome.project_id.as_deref(), Some("p1"));
        assert!(outcome.execution_mode.is_none());
    }

    #[tokio::test]
    async fn proxy_mode_falls_through_to_upstream_when_no_mock_matches() {
        let server = MockServer::start().await;
        Mock::given(wm_method("GET"))
            .and(wm_path("/widgets"))
            .respond_with(ResponseTemplate::new(200).set_body_string("upstream-body"))
            .mount(&server)
            .await;

        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Proxy,
                active_proxy: Some(ProxyTarget { url: server.uri() }),
                advance_config: AdvanceConfig::default(),
            },
        );
        let repo = Arc::new(FixtureRepository {
            projects,
            endpoints: HashMap::new(),
            responses: HashMap::new(),
        });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome =
            dispatcher.handle("acme", "GET", "/acme/widgets", None, &empty_request()).await;
        assert_eq!(outcome.response.status, 200);
        assert_eq!(outcome.response.body, b"upstream-body");
        assert!(!outcome.matched);
        assert_eq!(outcome.execution_mode, Some(ExecutionMode::Proxy));
        assert!(outcome
            .response
            .headers
            .iter()
            .any(|(k, v)| k == BEO_ECHO_RESPONSE_TYPE && v == "proxy"));
    }

    #[tokio::test]
    async fn mock_mode_rule_gated_response_requires_matching_header() {
        let gated = Rule {
            rule_type: RuleType::Header,
            key: "X-Env".to_string(),
            operator: RuleOperator::Equals,
            value: "prod".to_string(),
        };
        let mut projects = HashMap::new();
        projects.insert(
            "acme".to_string(),
            Project {
                id: "p1".to_string(),
                alias: "acme".to_string(),
                mode: ProjectMode::Mock,
                active_proxy: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        let mut endpoints = HashMap::new();
        endpoints.insert(
            ("p1".to_string(), "GET".to_string(), "/widgets".to_string()),
            Endpoint {
                id: "e1".to_string(),
                project_id: "p1".to_string(),
                method: "GET".to_string(),
                path: "/widgets".to_string(),
                response_mode: crate::model::ResponseMode::Static,
                use_proxy: false,
                proxy_target: None,
                advance_config: AdvanceConfig::default(),
            },
        );
        let mut gated_response = unconditional_response("gated", 1);
        gated_response.rules = vec![gated];
        let mut responses = HashMap::new();
        responses.insert("e1".to_string(), vec![gated_response]);
        let repo = Arc::new(FixtureRepository { projects, endpoints, responses });
        let dispatcher = Dispatcher::new(repo).unwrap();

        let outcome =
            dispatcher.handle("acme", "GET", "/acme/widgets", None, &empty_request()).await;
        assert_eq!(outcome.response.status, 200);
        assert!(!outcome.matched);
    }

    #[test]
    fn strip_alias_prefix_handles_bare_and_nested_paths() {
        assert_eq!(strip_alias_prefix("/acme", "acme"), "/");
        assert_eq!(strip_alias_prefix("/acme/widgets", "acme"), "/widgets");
        assert_eq!(strip_alias_prefix("/acme/a/b", "acme"), "/a/b");
    }
}
