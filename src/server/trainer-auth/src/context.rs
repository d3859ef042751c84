//! Session context types.

use serde::{Deserialize, Serialize};

use trainer_access::{decode_user_cookie, AccessRequest, UserRecord};

use crate::cookie::{parse_cookie_header, TOKEN_COOKIE, USER_COOKIE};
use crate::AuthError;

/// What a successful login, registration or payment callback yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// Opaque bearer token.
    pub token: String,
    /// The account's user record.
    pub user: UserRecord,
}

impl SessionCredentials {
    /// Builds credentials, rejecting an empty token.
    pub fn new(token: impl Into<String>, user: UserRecord) -> Result<Self, AuthError> {
        let token = token.into();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Self { token, user })
    }
}

/// Session state as carried by one request's cookies.
///
/// Either part may be missing. The token alone decides whether the request
/// is authenticated; a user record without a token is ignored by the
/// access controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    /// Value of the `token` cookie, if present and non-empty.
    pub token: Option<String>,
    /// Decoded `user` cookie. `None` when absent or malformed.
    pub user: Option<UserRecord>,
}

impl SessionContext {
    /// Reads the session from a `Cookie` request header.
    pub fn from_cookie_header(header: &str) -> Self {
        let mut context = Self::default();

        for (name, value) in parse_cookie_header(header) {
            match name {
                TOKEN_COOKIE if !value.is_empty() => context.token = Some(value.to_string()),
                USER_COOKIE => context.user = decode_user_cookie(value),
                _ => {},
            }
        }

        context
    }

    /// Returns true when a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Builds the controller input for a path.
    pub fn access_request<'a>(&'a self, path: &'a str) -> AccessRequest<'a> {
        AccessRequest {
            path,
            token: self.token.as_deref(),
            user: self.user.as_ref(),
        }
    }
}

impl From<SessionCredentials> for SessionContext {
    fn from(credentials: SessionCredentials) -> Self {
        Self {
            token: Some(credentials.token),
            user: Some(credentials.user),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use trainer_access::{encode_user_cookie, Role};

    #[test]
    fn test_from_cookie_header() {
        let user = UserRecord::with_role(Role::Admin, true);
        let header = format!(
            "theme=dark; token=abc123; user={}",
            encode_user_cookie(&user)
        );

        let ctx = SessionContext::from_cookie_header(&header);
        assert_eq!(ctx.token.as_deref(), Some("abc123"));
        assert_eq!(ctx.user, Some(user));
        assert!(ctx.is_authenticated());
    }

    #[test]
    fn test_malformed_user_cookie_is_dropped() {
        let ctx = SessionContext::from_cookie_header("token=abc; user=%7Bbroken");
        assert!(ctx.is_authenticated());
        assert!(ctx.user.is_none());
    }

    #[test]
    fn test_empty_token_is_absent() {
        let ctx = SessionContext::from_cookie_header("token=; user=%7B%7D");
        assert!(!ctx.is_authenticated());
        assert!(ctx.user.is_some());
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(SessionContext::from_cookie_header(""), SessionContext::default());
    }

    #[test]
    fn test_credentials_reject_empty_token() {
        let result = SessionCredentials::new("", UserRecord::default());
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_access_request() {
        let ctx = SessionContext {
            token: Some("t".into()),
            user: Some(UserRecord::with_role(Role::User, false)),
        };
        let request = ctx.access_request("/users");
        assert_eq!(request.path, "/users");
        assert_eq!(request.token, Some("t"));
        assert_eq!(request.user.and_then(|u| u.role), Some(Role::User));
    }
}
