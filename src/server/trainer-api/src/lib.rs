//! # Trainer API
//!
//! Client for the roleplay trainer REST API.
//!
//! ## Endpoints
//!
//! - `/api/v1/auth/login` - email/password login
//! - `/api/v1/auth/register` - account creation
//! - `/api/v1/auth/after-payment` - credential refresh after checkout
//! - `/api/v1/auth/forgetPassword` - password reset email
//! - `/sessions/startWebCall` - assistant configuration for a voice call

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, WebCallStarter, DEFAULT_API_URL};
pub use error::ApiError;
pub use types::{AuthResponse, Company, LoginRequest, RegisterRequest};
