//! Ambient HTTP surface for the request-dispatch core: an `axum` router that
//! extracts `(alias, method, path, headers, query, body)` from an inbound
//! request, drives [`dispatch_core::Dispatcher`], and maps the outcome back
//! to an `axum` response.

pub mod config;
pub mod memory_repo;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use bytes::Bytes;
use dispatch_core::repository::Repository;
use dispatch_core::{DispatchRequest, DispatchResponse, Dispatcher};
use std::collections::HashMap;
use std::sync::Arc;

/// Build the router that mounts the dispatch core behind a catch-all route.
///
/// Every method and path is routed through [`dispatch_handler`]; the core
/// itself resolves the alias and decides what, if anything, is configured
/// for the rest of the path.
pub fn build_router<R: Repository + 'static>(dispatcher: Arc<Dispatcher<R>>) -> Router {
    Router::new().fallback(any(dispatch_handler::<R>)).with_state(dispatcher)
}

async fn dispatch_handler<R: Repository + 'static>(
    State(dispatcher): State<Arc<Dispatcher<R>>>,
    request: Request<Body>,
) -> Response {
    let method = request.method().as_str().to_string();
    let uri = request.uri().clone();
    let path = uri.path().to_string();
    let raw_query = uri.query().map(|q| q.to_string());
    let headers = request.headers().clone();

    let query = parse_query(raw_query.as_deref());
    let body = match read_body(request).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read inbound request body");
            return proxy_error_response(&format!("failed to read request body: {err}"));
        }
    };

    let alias = first_path_segment(&path).to_string();
    let dispatch_request = DispatchRequest { method: method.clone(), headers, query, body };

    let outcome =
        dispatcher.handle(&alias, &method, &path, raw_query.as_deref(), &dispatch_request).await;

    tracing::info!(
        alias = %alias,
        method = %method,
        path = %path,
        project_id = outcome.project_id.as_deref().unwrap_or(""),
        execution_mode = outcome.execution_mode.map(|m| m.as_str()).unwrap_or(""),
        matched = outcome.matched,
        status = outcome.response.status,
        "dispatched request"
    );

    response_from(outcome.response)
}

/// Read the inbound body fully into memory. A failure here (e.g. the
/// connection drops mid-body) is the one place spec.md's "body read error ->
/// 502" failure class can surface at this HTTP boundary, since the body is
/// read before `Dispatcher::handle` ever runs — so the error is propagated
/// rather than papered over with an empty body.
async fn read_body(request: Request<Body>) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(request.into_body(), usize::MAX).await
}

/// Build the 502 `{"error":true,...}` envelope for a body-read failure,
/// matching the error envelope shape `dispatch_core::dispatcher` uses for
/// every other failure class.
fn proxy_error_response(message: &str) -> Response {
    let body = serde_json::json!({ "error": true, "message": message });
    Response::builder()
        .status(502)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap_or_default()))
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to build body-read-error response");
            Response::builder().status(500).body(Body::empty()).expect("minimal response always builds")
        })
}

fn first_path_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or("")
}

fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if let Some(raw) = raw {
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            out.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
    }
    out
}

fn response_from(dispatch_response: DispatchResponse) -> Response {
    let mut builder = Response::builder().status(dispatch_response.status);
    for (name, value) in &dispatch_response.headers {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(dispatch_response.body)).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to build outbound response");
        Response::builder().status(500).body(Body::empty()).expect("minimal response always builds")
    })
}
