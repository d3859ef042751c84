//! HTTP client for the REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use trainer_auth::SessionCredentials;
use trainer_call::{AssistantConfig, CallStarter, StartError};

use crate::types::{
    ForgetPasswordRequest, MessageResponse, StartWebCallRequest, StartWebCallResponse,
};
use crate::{ApiError, AuthResponse, LoginRequest, RegisterRequest};

/// Production API base URL.
pub const DEFAULT_API_URL: &str = "https://roleplay-trainer-api.vercel.app";

/// Client for the roleplay trainer REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the given base URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Configuration(format!(
                "base URL must be http(s): {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Logs in with email and password.
    pub async fn login(&self, request: &LoginRequest) -> Result<SessionCredentials, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(request)
            .send()
            .await?;

        read_credentials(resp, "Invalid email or password", true).await
    }

    /// Creates an account; the API logs the new account in.
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<SessionCredentials, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(request)
            .send()
            .await?;

        read_credentials(resp, "Registration failed", true).await
    }

    /// Fetches refreshed credentials after checkout.
    ///
    /// The API identifies the checkout by the caller's cookies, so the
    /// browser's `Cookie` header is forwarded as-is.
    pub async fn after_payment(
        &self,
        cookie_header: Option<&str>,
    ) -> Result<SessionCredentials, ApiError> {
        let mut req = self.client.get(self.url("/api/v1/auth/after-payment"));
        if let Some(cookies) = cookie_header {
            req = req.header(header::COOKIE, cookies);
        }

        let resp = req.send().await?;
        read_credentials(resp, "Payment not verified", false).await
    }

    /// Requests a password reset email. Returns the API's message.
    pub async fn forget_password(&self, email: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/forgetPassword"))
            .json(&ForgetPasswordRequest { email })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: MessageResponse = read_json(resp).await.unwrap_or(MessageResponse {
                message: None,
            });
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: body
                    .message
                    .unwrap_or_else(|| "Failed to send reset email".into()),
            });
        }

        let body: MessageResponse = read_json(resp).await?;
        Ok(body.message.unwrap_or_default())
    }

    /// Asks the API for the assistant configuration of a scenario.
    pub async fn start_web_call(
        &self,
        token: &str,
        scenario_id: &str,
    ) -> Result<AssistantConfig, ApiError> {
        let resp = self
            .client
            .post(self.url("/sessions/startWebCall"))
            .header("token", token)
            .json(&StartWebCallRequest { scenario_id })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: MessageResponse = read_json(resp).await.unwrap_or(MessageResponse {
                message: None,
            });
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: body.message.unwrap_or_else(|| "Unable to start call".into()),
            });
        }

        let body: StartWebCallResponse = read_json(resp).await?;
        body.assistant
            .map(AssistantConfig)
            .ok_or_else(|| ApiError::InvalidResponse("no assistant in response".into()))
    }

    /// Binds a token for use as a [`CallStarter`].
    pub fn call_starter(&self, token: impl Into<String>) -> WebCallStarter {
        WebCallStarter {
            api: self.clone(),
            token: token.into(),
        }
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

async fn read_credentials(
    resp: Response,
    default_message: &str,
    require_status: bool,
) -> Result<SessionCredentials, ApiError> {
    let status = resp.status();
    let body: AuthResponse = match read_json(resp).await {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(e),
        Err(_) => AuthResponse::default(),
    };

    let confirmed = !require_status || body.status == Some(true);
    if !status.is_success() || !confirmed {
        debug!(status = status.as_u16(), "Auth request rejected");
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: body.message.unwrap_or_else(|| default_message.to_string()),
        });
    }

    Ok(body.into_credentials()?)
}

/// [`CallStarter`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct WebCallStarter {
    api: ApiClient,
    token: String,
}

#[async_trait]
impl CallStarter for WebCallStarter {
    async fn start_web_call(&self, scenario_id: &str) -> Result<AssistantConfig, StartError> {
        self.api
            .start_web_call(&self.token, scenario_id)
            .await
            .map_err(|e| match e {
                ApiError::Rejected { status, .. } => StartError::Rejected { status },
                other => {
                    warn!(error = %other, "Start web call failed");
                    StartError::Failed(other.to_string())
                },
            })
    }
}
