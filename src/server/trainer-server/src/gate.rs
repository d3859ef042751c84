//! Route gate middleware.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use trainer_access::canonical_redirect;
use trainer_auth::SessionContext;

use crate::AppState;

/// Reads the session from a request's `Cookie` headers.
pub fn session_from_headers(headers: &HeaderMap) -> SessionContext {
    let joined = cookie_header(headers).unwrap_or_default();
    SessionContext::from_cookie_header(&joined)
}

/// All `Cookie` headers of a request joined into one value.
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// Runs the access controller before every request.
///
/// A path the renderer would resolve to something else (dot segments,
/// doubled slashes, escaped unreserved characters) is first redirected
/// to its normalized form, so the path decided on is the path served.
pub async fn gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(location) = canonical_location(request.uri()) {
        debug!(path = request.uri().path(), location = %location, "Non-canonical path redirected");
        return Redirect::permanent(&location).into_response();
    }

    let session = session_from_headers(request.headers());
    let path = request.uri().path().to_string();
    let decision = state.controller.decide(&session.access_request(&path));

    match decision.location(state.controller.policy()) {
        Some(location) => {
            debug!(path = %path, ?decision, location, "Request redirected");
            Redirect::temporary(location).into_response()
        },
        None => next.run(request).await,
    }
}

fn canonical_location(uri: &Uri) -> Option<String> {
    let canonical = canonical_redirect(uri.path())?;
    Some(match uri.query() {
        Some(query) => format!("{canonical}?{query}"),
        None => canonical,
    })
}
