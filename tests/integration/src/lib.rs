//! Integration tests for the trainer gate.
//!
//! These tests run the gate against a stub REST API and a stub page
//! renderer, and drive it over real HTTP the way a browser would.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Client, Response};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use trainer_access::RoutePolicy;
use trainer_server::{app, AppState, ServerConfig};

// ============================================================================
// Stub Services
// ============================================================================

const PASSWORD: &str = "S3cret!pw";

fn account(email: &str) -> Option<Value> {
    match email {
        "user@acme.test" => Some(json!({
            "_id": "u-1", "userName": "Una", "email": email,
            "role": "user", "subscriptions": true
        })),
        "admin@acme.test" => Some(json!({
            "_id": "a-1", "userName": "Ada", "email": email,
            "role": "admin", "subscriptions": false
        })),
        "root@acme.test" => Some(json!({
            "_id": "r-1", "userName": "Rex", "email": email,
            "role": "super-admin"
        })),
        _ => None,
    }
}

async fn stub_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default();
    match account(email) {
        Some(user) if body["password"] == PASSWORD => (
            StatusCode::OK,
            Json(json!({ "status": true, "token": format!("tok-{email}"), "user": user })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": false, "message": "Invalid credentials" })),
        ),
    }
}

async fn stub_after_payment(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let cookies = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if cookies.contains("token=tok-admin@acme.test") {
        let mut user = account("admin@acme.test").unwrap_or_default();
        user["subscriptions"] = json!(true);
        (
            StatusCode::OK,
            Json(json!({ "token": "tok-admin-paid", "user": user })),
        )
    } else {
        (StatusCode::PAYMENT_REQUIRED, Json(json!({ "message": "unpaid" })))
    }
}

async fn stub_scenarios(headers: HeaderMap) -> Json<Value> {
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Json(json!({ "token": token, "scenarios": ["cold-call"] }))
}

async fn stub_start_call(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "assistant": { "scenario": body["scenarioId"] } }))
}

async fn renderer(uri: axum::http::Uri) -> String {
    format!("page:{}", uri.path())
}

async fn spawn(router: Router) -> Result<(String, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((format!("http://{addr}"), handle))
}

// ============================================================================
// Test Server
// ============================================================================

/// A gate instance with its own stub API and page renderer.
pub struct TestServer {
    pub base_url: String,
    tasks: Vec<JoinHandle<()>>,
    _policy_dir: Option<TempDir>,
}

impl TestServer {
    /// Start a gate with the built-in policy.
    pub async fn start() -> Result<Self> {
        Self::start_with(None).await
    }

    /// Start a gate that loads the given policy from a file.
    pub async fn start_with_policy(policy: &RoutePolicy) -> Result<Self> {
        Self::start_with(Some(policy)).await
    }

    async fn start_with(policy: Option<&RoutePolicy>) -> Result<Self> {
        let api = Router::new()
            .route("/api/v1/auth/login", post(stub_login))
            .route("/api/v1/auth/after-payment", get(stub_after_payment))
            .route("/api/v1/scenarios", get(stub_scenarios))
            .route("/sessions/startWebCall", post(stub_start_call));
        let (api_url, api_task) = spawn(api).await?;

        let pages = Router::new().fallback(renderer);
        let (pages_url, pages_task) = spawn(pages).await?;

        let mut config = ServerConfig::local(api_url);
        config.upstream_url = Some(pages_url);

        let policy_dir = match policy {
            Some(policy) => {
                let dir = TempDir::new().context("Failed to create temp dir")?;
                let path = dir.path().join("policy.json");
                std::fs::write(&path, policy.to_json_pretty()?)?;
                config.policy = Some(path);
                Some(dir)
            },
            None => None,
        };

        let state = AppState::from_config(&config)?;
        let (base_url, gate_task) = spawn(app(state)).await?;

        let server = Self {
            base_url,
            tasks: vec![api_task, pages_task, gate_task],
            _policy_dir: policy_dir,
        };

        // Wait for server to be ready
        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = Client::new();
        let url = format!("{}/api/health", self.base_url);

        for _ in 0..50 {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 5 seconds")
    }

    /// A browser-like client without a session.
    pub fn client(&self) -> GateClient {
        GateClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client that keeps a cookie header and never follows redirects.
pub struct GateClient {
    client: Client,
    base_url: String,
    cookies: Option<String>,
}

impl GateClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .redirect(redirect::Policy::none())
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            cookies: None,
        }
    }

    /// Adopts the cookies a response set, like a browser would.
    pub fn with_cookies_from(mut self, resp: &Response) -> Self {
        let pairs: Vec<&str> = set_cookies(resp)
            .into_iter()
            .filter_map(|c| c.split(';').next())
            .collect();
        self.cookies = Some(pairs.join("; "));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(cookies) = &self.cookies {
            req = req.header(COOKIE, cookies);
        }
        Ok(req.send().await?)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(cookies) = &self.cookies {
            req = req.header(COOKIE, cookies);
        }
        Ok(req.send().await?)
    }

    pub async fn login(&self, email: &str) -> Result<Response> {
        self.post(
            "/api/auth/login",
            &json!({ "email": email, "password": PASSWORD }),
        )
        .await
    }
}

pub fn location(resp: &Response) -> Option<&str> {
    resp.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

pub fn set_cookies(resp: &Response) -> Vec<&str> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use trainer_access::{ReservedRoute, Role};

    async fn logged_in(server: &TestServer, email: &str) -> GateClient {
        let resp = server.client().login(email).await.unwrap();
        assert_eq!(resp.status(), 200);
        server.client().with_cookies_from(&resp)
    }

    #[tokio::test]
    async fn test_anonymous_visitor() {
        let server = TestServer::start().await.unwrap();
        let client = server.client();

        let resp = client.get("/users").await.unwrap();
        assert_eq!(resp.status(), 307);
        assert_eq!(location(&resp), Some("/login"));

        let resp = client.get("/").await.unwrap();
        assert_eq!(location(&resp), Some("/login"));

        let resp = client.get("/login").await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "page:/login");
    }

    #[tokio::test]
    async fn test_bypass_prefixes_skip_the_gate() {
        let server = TestServer::start().await.unwrap();
        let client = server.client();

        let resp = client.get("/_next/static/chunk.js").await.unwrap();
        assert_eq!(resp.status(), 200);

        let resp = client.get("/favicon.ico").await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "page:/favicon.ico");
    }

    #[tokio::test]
    async fn test_login_sets_both_cookies() {
        let server = TestServer::start().await.unwrap();
        let resp = server.client().login("user@acme.test").await.unwrap();
        assert_eq!(resp.status(), 200);

        let cookies = set_cookies(&resp);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("token=tok-user@acme.test;"));
        assert!(cookies[1].starts_with("user=%7B"));
        for cookie in &cookies {
            assert!(cookie.contains("Path=/"));
            assert!(cookie.contains("Max-Age=604800"));
            assert!(cookie.contains("SameSite=Lax"));
        }

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["token"], "tok-user@acme.test");
        assert_eq!(body["user"]["role"], "user");
    }

    #[tokio::test]
    async fn test_failed_login_sets_nothing() {
        let server = TestServer::start().await.unwrap();
        let resp = server
            .client()
            .post(
                "/api/auth/login",
                &json!({ "email": "user@acme.test", "password": "wrong" }),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), 401);
        assert!(set_cookies(&resp).is_empty());
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_user_role_is_kept_out_of_admin_routes() {
        let server = TestServer::start().await.unwrap();
        let client = logged_in(&server, "user@acme.test").await;

        let resp = client.get("/users").await.unwrap();
        assert_eq!(resp.status(), 307);
        assert_eq!(location(&resp), Some("/"));

        let resp = client.get("/session/42").await.unwrap();
        assert_eq!(location(&resp), Some("/"));

        let resp = client.get("/scenario").await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "page:/scenario");

        let resp = client.get("/login").await.unwrap();
        assert_eq!(location(&resp), Some("/"));
    }

    #[tokio::test]
    async fn test_unsubscribed_admin_until_payment() {
        let server = TestServer::start().await.unwrap();
        let client = logged_in(&server, "admin@acme.test").await;

        let resp = client.get("/users").await.unwrap();
        assert_eq!(location(&resp), Some("/plans"));

        let resp = client.get("/plans").await.unwrap();
        assert_eq!(resp.status(), 200);
        let resp = client.get("/").await.unwrap();
        assert_eq!(resp.status(), 200);

        let resp = client.get("/api/auth/after-payment").await.unwrap();
        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), Some("/"));
        assert!(set_cookies(&resp)[0].starts_with("token=tok-admin-paid;"));

        let client = server.client().with_cookies_from(&resp);
        let resp = client.get("/users").await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "page:/users");

        let resp = client.get("/plansManagement").await.unwrap();
        assert_eq!(location(&resp), Some("/"));
    }

    #[tokio::test]
    async fn test_failed_payment_callback_goes_to_login() {
        let server = TestServer::start().await.unwrap();
        let client = logged_in(&server, "user@acme.test").await;

        let resp = client.get("/api/auth/after-payment").await.unwrap();
        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), Some("/login"));
        assert!(set_cookies(&resp).is_empty());
    }

    #[tokio::test]
    async fn test_super_admin_reaches_everything() {
        let server = TestServer::start().await.unwrap();
        let client = logged_in(&server, "root@acme.test").await;

        for path in ["/users", "/plansManagement", "/evaluation", "/session"] {
            let resp = client.get(path).await.unwrap();
            assert_eq!(resp.status(), 200, "{path}");
        }
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let server = TestServer::start().await.unwrap();
        let client = logged_in(&server, "user@acme.test").await;

        let resp = client.post("/api/auth/logout", &json!({})).await.unwrap();
        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), Some("/login"));
        assert_eq!(
            resp.headers().get("clear-site-data").unwrap(),
            "\"cookies\", \"storage\""
        );

        let cleared = set_cookies(&resp);
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));

        let client = server.client().with_cookies_from(&resp);
        let resp = client.get("/scenario").await.unwrap();
        assert_eq!(location(&resp), Some("/login"));
    }

    #[tokio::test]
    async fn test_nav_matches_role() {
        let server = TestServer::start().await.unwrap();

        let links = |body: Value| -> Vec<String> {
            body["entries"]
                .as_array()
                .unwrap()
                .iter()
                .map(|e| e["link"].as_str().unwrap().to_string())
                .collect()
        };

        let user = logged_in(&server, "user@acme.test").await;
        let body: Value = user.get("/api/nav").await.unwrap().json().await.unwrap();
        let user_links = links(body);
        assert!(user_links.contains(&"/scenario".to_string()));
        assert!(!user_links.contains(&"/users".to_string()));
        assert!(!user_links.contains(&"/evaluation".to_string()));

        let admin = logged_in(&server, "admin@acme.test").await;
        let body: Value = admin.get("/api/nav").await.unwrap().json().await.unwrap();
        assert_eq!(body["role"], "admin");
        let admin_links = links(body);
        for link in &admin_links {
            assert!(link == "/" || link == "/plans", "unsubscribed admin sees {link}");
        }
    }

    #[tokio::test]
    async fn test_api_requests_are_forwarded() {
        let server = TestServer::start().await.unwrap();
        let client = server.client();

        let resp = client
            .client
            .get(client.url("/api/v1/scenarios"))
            .header("token", "tok-x")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["token"], "tok-x");

        let resp = client
            .post("/api/sessions/startWebCall", &json!({ "scenarioId": "cold-call" }))
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["assistant"]["scenario"], "cold-call");
    }

    #[tokio::test]
    async fn test_policy_file_extends_reservations() {
        let mut policy = RoutePolicy::default();
        policy
            .reserved
            .push(ReservedRoute::new("/reports", &[Role::SuperAdmin]));
        let server = TestServer::start_with_policy(&policy).await.unwrap();

        let user = logged_in(&server, "user@acme.test").await;
        let resp = user.get("/reports/q3").await.unwrap();
        assert_eq!(location(&resp), Some("/"));

        let resp = user.get("/reportsarchive").await.unwrap();
        assert_eq!(resp.status(), 200);

        let root = logged_in(&server, "root@acme.test").await;
        let resp = root.get("/reports/q3").await.unwrap();
        assert_eq!(resp.status(), 200);

        let resp = server
            .client()
            .get("/api/access?path=/reports")
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["decision"], "redirect_to_login");
    }
}
