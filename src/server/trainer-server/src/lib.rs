//! # Trainer Server
//!
//! Edge gate for the roleplay trainer front end.
//!
//! ## Endpoints
//!
//! - `/api/auth/*` - Login, registration, logout and the payment callback
//! - `/api/nav` - Sidebar entries visible to the caller
//! - `/api/access` - Access decision for a path
//! - `/api/health` - Liveness
//! - `/api/v1/*`, `/api/sessions/*` - Forwarded to the REST API
//! - everything else - Gated, then forwarded to the page renderer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod gate;
pub mod handlers;
pub mod proxy;
mod state;

pub use config::ServerConfig;
pub use error::ServerError;
pub use state::AppState;

use axum::middleware;
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/nav", get(handlers::nav))
        .route("/api/access", get(handlers::access))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/after-payment", get(handlers::after_payment))
        .route("/api/v1/{*rest}", any(proxy::api_v1))
        .route("/api/sessions/{*rest}", any(proxy::api_sessions))
        .fallback(proxy::frontend)
        .layer(middleware::from_fn_with_state(state.clone(), gate::gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode, Uri};
    use serde_json::Value;
    use tower::ServiceExt;
    use trainer_access::{encode_user_cookie, AccessController, AccessRequest, Role, UserRecord};

    fn test_app() -> Router {
        let config = ServerConfig::local("http://127.0.0.1:9");
        app(AppState::from_config(&config).unwrap())
    }

    fn cookie_for(role: Role, subscribed: bool) -> String {
        format!(
            "token=tok; user={}",
            encode_user_cookie(&UserRecord::with_role(role, subscribed))
        )
    }

    async fn get(uri: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        test_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_page_redirects_to_login() {
        let response = get("/users", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_allowed_page_without_renderer_is_not_found() {
        let response = get("/login", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert_eq!(body["error"], "not found");
    }

    #[tokio::test]
    async fn test_role_and_subscription_redirects() {
        let user = cookie_for(Role::User, true);
        let response = get("/users", Some(&user)).await;
        assert_eq!(location(&response), "/");

        let unpaid = cookie_for(Role::Admin, false);
        let response = get("/scenario", Some(&unpaid)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/plans");

        let response = get("/login", Some(&unpaid)).await;
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_bypass_and_health() {
        let response = get("/_next/static/app.js", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get("/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_nav_filters_by_role() {
        let body = json_body(get("/api/nav", None).await).await;
        assert_eq!(body["entries"].as_array().unwrap().len(), 0);

        let body = json_body(get("/api/nav", Some(&cookie_for(Role::Admin, true))).await).await;
        assert_eq!(body["role"], "admin");
        let links: Vec<&str> = body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["link"].as_str())
            .collect();
        assert!(links.contains(&"/users"));
        assert!(!links.contains(&"/plansManagement"));
    }

    #[tokio::test]
    async fn test_access_endpoint() {
        let body = json_body(get("/api/access?path=/users", Some(&cookie_for(Role::User, true))).await).await;
        assert_eq!(body["decision"], "redirect_to_home");
        assert_eq!(body["location"], "/");

        let body = json_body(get("/api/access?path=/users", Some(&cookie_for(Role::SuperAdmin, false))).await).await;
        assert_eq!(body["decision"], "allow");
        assert!(body["location"].is_null());
    }

    #[tokio::test]
    async fn test_logout_expires_cookies() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .header(header::COOKIE, "token=tok; theme=dark")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert_eq!(
            response.headers().get("clear-site-data").unwrap(),
            handlers::CLEAR_SITE_DATA
        );

        let cleared: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cleared.len(), 3);
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
        assert!(cleared.iter().any(|c| c.starts_with("theme=")));
        assert!(cleared.iter().any(|c| c.starts_with("user=")));
    }

    #[tokio::test]
    async fn test_non_canonical_paths_redirect_to_normalized_form() {
        let user = cookie_for(Role::User, true);
        for (path, expected) in [
            ("/api/../users", "/users"),
            ("/api/%2e%2e/users", "/users"),
            ("/users/x/..", "/users"),
            ("//users", "/users"),
            ("/%75sers?tab=all", "/users?tab=all"),
        ] {
            let response = get(path, Some(&user)).await;
            assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT, "{path}");
            assert_eq!(location(&response), expected, "{path}");
        }

        let response = get("/users/", Some(&user)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/");
    }

    async fn spawn_renderer() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let pages = Router::new().fallback(|uri: Uri| async move { uri.path().to_string() });
        tokio::spawn(async move { axum::serve(listener, pages).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_served_pages_are_allowed_for_the_viewer() {
        let mut config = ServerConfig::local("http://127.0.0.1:9");
        config.upstream_url = Some(spawn_renderer().await);
        let router = app(AppState::from_config(&config).unwrap());

        let controller = AccessController::default();
        let user = UserRecord::with_role(Role::User, true);
        let cookie = format!("token=tok; user={}", encode_user_cookie(&user));

        let starts = [
            "/users",
            "/scenario",
            "/./history",
            "/api/../users",
            "/api/%2e%2e/users",
            "/_next/../users",
            "/users/x/..",
            "//users",
            "/%75sers",
            "/plans%4Danagement",
        ];

        let mut served = Vec::new();
        for start in starts {
            let mut path = start.to_string();
            for _ in 0..3 {
                let request = Request::builder()
                    .uri(&path)
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap();
                let response = router.clone().oneshot(request).await.unwrap();

                if response.status() == StatusCode::OK {
                    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
                    served.push((start, String::from_utf8(bytes.to_vec()).unwrap()));
                    break;
                }
                assert!(response.status().is_redirection(), "{start}: {}", response.status());
                path = location(&response).to_string();
            }
        }

        for (start, rendered) in &served {
            let request = AccessRequest::authenticated(rendered, "tok", Some(&user));
            assert!(
                controller.decide(&request).is_allowed(),
                "{start} rendered {rendered}"
            );
        }
        assert!(served.iter().any(|(_, page)| page == "/scenario"));
        assert!(served.iter().any(|(_, page)| page == "/history"));
        assert!(served.iter().all(|(_, page)| !page.starts_with("/users")));
    }

    #[test]
    fn test_rejects_bad_upstream() {
        let mut config = ServerConfig::local("http://127.0.0.1:9");
        config.upstream_url = Some("ftp://renderer".into());
        assert!(matches!(
            AppState::from_config(&config),
            Err(ServerError::Config(_))
        ));
    }
}
