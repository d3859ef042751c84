//! # Trainer Auth
//!
//! Session handling for the trainer gate.
//!
//! ## Pieces
//!
//! - [`SessionCredentials`] / [`SessionContext`] - what a login produces and
//!   what a request carries
//! - [`cookie`] - `Cookie` / `Set-Cookie` wire format
//! - [`SessionLifecycle`] - establish, refresh and terminate a session
//!   across the cookie jar and the local store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod cookie;
pub mod error;
pub mod session;

pub use context::{SessionContext, SessionCredentials};
pub use cookie::{
    cookie_names, parse_cookie_header, CookieAttributes, SameSite, SESSION_MAX_AGE, TOKEN_COOKIE,
    USER_COOKIE,
};
pub use error::AuthError;
pub use session::{RoleMismatch, SessionLifecycle, LOCAL_TOKEN_KEY, LOCAL_USER_KEY};
