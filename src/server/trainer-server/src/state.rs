//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use trainer_access::{audit, AccessController, Menu, RoutePolicy};
use trainer_api::ApiClient;
use trainer_auth::CookieAttributes;

use crate::{ServerConfig, ServerError};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Route gate.
    pub controller: AccessController,
    /// Sidebar derived from the active policy.
    pub menu: Arc<Menu>,
    /// REST API client.
    pub api: ApiClient,
    /// Front-end renderer base URL.
    pub upstream: Option<String>,
    /// Attributes for issued cookies.
    pub cookies: CookieAttributes,
    /// Forwarding client; never follows redirects.
    pub http: reqwest::Client,
}

impl AppState {
    /// Builds state from configuration, loading and validating the policy.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let policy = match &config.policy {
            Some(path) => RoutePolicy::load(path)?,
            None => RoutePolicy::default(),
        };
        Self::with_policy(config, policy)
    }

    /// Builds state around an already loaded policy.
    pub fn with_policy(config: &ServerConfig, policy: RoutePolicy) -> Result<Self, ServerError> {
        let findings = policy.validate()?;
        info!(
            version = policy.version,
            reserved = policy.reserved.len(),
            findings = findings.len(),
            "Route policy ready"
        );

        let controller = AccessController::new(policy);
        let menu = Menu::sidebar(controller.policy());
        for issue in audit(&menu, &controller) {
            warn!(
                label = %issue.label,
                link = %issue.link,
                role = %issue.role,
                subscribed = issue.subscribed,
                kind = ?issue.kind,
                "Navigation disagrees with route gate"
            );
        }

        let upstream = config
            .upstream_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string());
        if let Some(url) = &upstream {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ServerError::Config(format!(
                    "upstream URL must be http(s): {url}"
                )));
            }
        }

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let cookies = if config.insecure_cookies {
            CookieAttributes::insecure()
        } else {
            CookieAttributes::default()
        };

        Ok(Self {
            controller,
            menu: Arc::new(menu),
            api: ApiClient::new(&config.api_url)?,
            upstream,
            cookies,
            http,
        })
    }
}
