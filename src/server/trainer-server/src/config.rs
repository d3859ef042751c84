//! Server configuration.

use std::path::PathBuf;

use clap::Parser;

use trainer_api::DEFAULT_API_URL;

/// Command-line and environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "trainer-server")]
#[command(about = "Roleplay Trainer gate - edge access control and session endpoints")]
#[command(version)]
pub struct ServerConfig {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:3000", env = "TRAINER_BIND_ADDRESS")]
    pub bind: String,

    /// REST API base URL
    #[arg(long, default_value = DEFAULT_API_URL, env = "TRAINER_API_URL")]
    pub api_url: String,

    /// Front-end renderer to forward allowed page requests to
    #[arg(long, env = "TRAINER_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Route policy JSON file (built-in table when omitted)
    #[arg(long, env = "TRAINER_POLICY")]
    pub policy: Option<PathBuf>,

    /// Issue cookies without the Secure attribute (plain-http development)
    #[arg(long, env = "TRAINER_INSECURE_COOKIES")]
    pub insecure_cookies: bool,
}

impl ServerConfig {
    /// Configuration for local testing against the given API.
    pub fn local(api_url: impl Into<String>) -> Self {
        Self {
            bind: "127.0.0.1:0".to_string(),
            api_url: api_url.into(),
            upstream_url: None,
            policy: None,
            insecure_cookies: true,
        }
    }
}
