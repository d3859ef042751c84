//! Session, navigation and health endpoints.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use trainer_access::{encode_user_cookie, Decision, MenuEntry, NavFilter, Role};
use trainer_api::{LoginRequest, RegisterRequest};
use trainer_auth::{cookie_names, SessionCredentials, TOKEN_COOKIE, USER_COOKIE};

use crate::gate::{cookie_header, session_from_headers};
use crate::{AppState, ServerError};

/// `Clear-Site-Data` value sent on logout.
pub const CLEAR_SITE_DATA: &str = "\"cookies\", \"storage\"";

fn session_cookies(
    state: &AppState,
    credentials: &SessionCredentials,
) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (
            header::SET_COOKIE,
            state.cookies.set_cookie(TOKEN_COOKIE, &credentials.token),
        ),
        (
            header::SET_COOKIE,
            state
                .cookies
                .set_cookie(USER_COOKIE, &encode_user_cookie(&credentials.user)),
        ),
    ])
}

fn session_response(state: &AppState, credentials: SessionCredentials) -> Response {
    (session_cookies(state, &credentials), Json(credentials)).into_response()
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ServerError> {
    let credentials = state.api.login(&request).await?;
    info!(role = ?credentials.user.role, "Login succeeded");
    Ok(session_response(&state, credentials))
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, ServerError> {
    let credentials = state.api.register(&request).await?;
    info!(role = ?credentials.user.role, "Registration succeeded");
    Ok(session_response(&state, credentials))
}

/// `GET /api/auth/after-payment`
///
/// Re-issues the session cookies from the API's post-checkout answer and
/// sends the browser home. Any failure sends it to the login page.
pub async fn after_payment(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let redirects = &state.controller.policy().redirects;
    let cookies = cookie_header(&headers);

    match state.api.after_payment(cookies.as_deref()).await {
        Ok(credentials) => {
            info!(
                subscribed = credentials.user.has_active_subscription(),
                "Session refreshed after payment"
            );
            (
                session_cookies(&state, &credentials),
                Redirect::to(&redirects.home),
            )
                .into_response()
        },
        Err(e) => {
            warn!(error = %e, "Payment callback failed");
            Redirect::to(&redirects.login).into_response()
        },
    }
}

/// `POST /api/auth/logout`
///
/// Expires every cookie the browser sent, plus the session cookies.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let raw = cookie_header(&headers).unwrap_or_default();
    let mut names = cookie_names(&raw);
    for required in [TOKEN_COOKIE, USER_COOKIE] {
        if !names.contains(&required) {
            names.push(required);
        }
    }

    let expired: Vec<(HeaderName, String)> = names
        .iter()
        .map(|name| (header::SET_COOKIE, state.cookies.expire_cookie(name)))
        .collect();

    info!(cookies = expired.len(), "Session terminated");

    (
        AppendHeaders(expired),
        [(HeaderName::from_static("clear-site-data"), CLEAR_SITE_DATA)],
        Redirect::to(&state.controller.policy().redirects.login),
    )
        .into_response()
}

#[derive(Serialize)]
struct NavResponse<'a> {
    role: Option<Role>,
    entries: Vec<&'a MenuEntry>,
}

/// `GET /api/nav`
pub async fn nav(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = session_from_headers(&headers);
    if !session.is_authenticated() {
        return Json(NavResponse {
            role: None,
            entries: Vec::new(),
        })
        .into_response();
    }

    let user = session.user.as_ref();
    Json(NavResponse {
        role: user.and_then(|u| u.role),
        entries: NavFilter::new(state.controller.policy()).visible_for(&state.menu, user),
    })
    .into_response()
}

/// Query for `GET /api/access`.
#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    /// Path to check.
    pub path: String,
}

#[derive(Serialize)]
struct AccessResponse<'a> {
    path: &'a str,
    decision: Decision,
    location: Option<&'a str>,
}

/// `GET /api/access?path=…`
pub async fn access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AccessQuery>,
) -> Response {
    let session = session_from_headers(&headers);
    let decision = state
        .controller
        .decide(&session.access_request(&query.path));

    Json(AccessResponse {
        path: &query.path,
        decision,
        location: decision.location(state.controller.policy()),
    })
    .into_response()
}

/// `GET /api/health`
pub async fn health() -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}
