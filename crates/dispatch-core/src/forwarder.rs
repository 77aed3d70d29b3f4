//! Upstream Forwarder: builds, issues, and returns a response from an
//! upstream target, with loop detection and body/header fidelity.

use crate::error::{Error, Result};
use crate::headers::{BEO_ECHO_LATENCY_MS, BEO_ECHO_LOOP_DETECT, LOOP_HEADER_PREFIX};
use crate::request::DispatchRequest;
use std::time::Instant;

/// A response received from an upstream target.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    /// Upstream HTTP status code.
    pub status: u16,
    /// Upstream response headers, in the order received.
    pub headers: Vec<(String, String)>,
    /// Upstream response body, copied verbatim.
    pub body: Vec<u8>,
    /// Wall-clock latency of the upstream call, in milliseconds.
    pub latency_ms: u64,
}

/// Build a `reqwest::Client` suitable for upstream forwarding.
///
/// Disables TLS certificate verification and caps a single attempt at 30
/// seconds. This is a deliberate, security-relevant default: the service is
/// a testing tool that often targets staging hosts with self-signed or
/// otherwise invalid certificates. Deployments that need strict TLS
/// validation must front this service with a verifying proxy.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(Error::from)
}

/// Forward `request` to `base_url` + `sub_path`, returning the upstream
/// response.
///
/// Performs loop detection before doing anything else: any inbound header
/// whose name starts (case-insensitively) with `beo-echo` causes an
/// immediate [`Error::LoopDetected`]. Callers that already checked this at a
/// mode-branch entry point should still call through here — the duplicate
/// check is defense-in-depth against code paths that skip the outer check.
pub async fn forward(
    client: &reqwest::Client,
    base_url: &str,
    method: &str,
    sub_path: &str,
    raw_query: Option<&str>,
    request: &DispatchRequest,
) -> Result<ForwardedResponse> {
    if request.has_header_prefixed(LOOP_HEADER_PREFIX) {
        return Err(Error::loop_detected("request contains beo-echo header"));
    }

    let base = url::Url::parse(base_url).map_err(Error::from)?;
    let outgoing_path = join_paths(base.path(), sub_path);

    let mut outgoing_url = base.clone();
    outgoing_url.set_path(&outgoing_path);
    outgoing_url.set_query(raw_query);

    let reqwest_method = reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|e| Error::proxy(format!("failed to build outgoing request: {e}")))?;

    let host_header = match base.port() {
        Some(port) => format!("{}:{port}", base.host_str().unwrap_or_default()),
        None => base.host_str().unwrap_or_default().to_string(),
    };

    let mut builder = client.request(reqwest_method, outgoing_url);
    for (name, value) in request.headers.iter() {
        if name.as_str().eq_ignore_ascii_case("referer") {
            continue;
        }
        if let Ok(value_str) = value.to_str() {
            builder = builder.header(name.as_str(), value_str);
        }
    }
    builder = builder.header("Host", host_header);
    builder = builder.header(BEO_ECHO_LOOP_DETECT, "true");
    builder = builder.body(request.body.clone());

    let outgoing = builder
        .build()
        .map_err(|e| Error::proxy(format!("failed to build outgoing request: {e}")))?;

    let start = Instant::now();
    let response = client
        .execute(outgoing)
        .await
        .map_err(|e| Error::proxy(format!("upstream transport error: {e}")))?;
    let latency_ms = start.elapsed().as_millis() as u64;

    let status = response.status().as_u16();
    let mut headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::proxy(format!("failed to read upstream response body: {e}")))?
        .to_vec();

    headers.push((BEO_ECHO_LATENCY_MS.to_string(), latency_ms.to_string()));

    Ok(ForwardedResponse { status, headers, body, latency_ms })
}

/// Join a base path and a sub-path with a single separator, POSIX-join
/// style: no `..` resolution beyond what the stdlib/url crate already does
/// when the URL is later parsed.
fn join_paths(base: &str, sub: &str) -> String {
    let base = base.trim_end_matches('/');
    let sub = sub.trim_start_matches('/');
    match (base.is_empty(), sub.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{sub}"),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{sub}"),
    }
}
