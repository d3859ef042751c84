//! Request forwarding to the REST API and the front-end renderer.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use tracing::debug;

use crate::{AppState, ServerError};

/// Largest request body forwarded.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::CONTENT_LENGTH);
}

fn path_and_query(request: &Request) -> &str {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
}

/// Forwards a request to `target` and relays the answer unchanged.
pub async fn forward(
    http: &reqwest::Client,
    target: &str,
    request: Request,
) -> Result<Response, ServerError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    debug!(method = %parts.method, target, "Forwarding request");

    let upstream = http
        .request(parts.method, target)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// `/api/v1/*` to the REST API, path unchanged.
pub async fn api_v1(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ServerError> {
    let target = format!("{}{}", state.api.base_url(), path_and_query(&request));
    forward(&state.http, &target, request).await
}

/// `/api/sessions/*` to `{api}/sessions/*`.
pub async fn api_sessions(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ServerError> {
    let path = path_and_query(&request);
    let rest = path.strip_prefix("/api").unwrap_or(path);
    let target = format!("{}{}", state.api.base_url(), rest);
    forward(&state.http, &target, request).await
}

/// Everything else the gate lets through goes to the page renderer.
pub async fn frontend(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ServerError> {
    let Some(upstream) = state.upstream.as_deref() else {
        return Err(ServerError::NotFound);
    };
    let target = format!("{upstream}{}", path_and_query(&request));
    forward(&state.http, &target, request).await
}
