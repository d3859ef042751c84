//! Request and response bodies.

use serde::{Deserialize, Serialize};

use trainer_access::UserRecord;
use trainer_auth::{AuthError, SessionCredentials};

/// `POST /api/v1/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Company details sent at registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Company {
    /// Company name.
    pub name: String,
    /// Company contact email.
    pub email: String,
    /// Company phone.
    pub phone: String,
    /// Postal address.
    pub address: String,
}

/// `POST /api/v1/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Full name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Password.
    pub password: String,
    /// Password repeated.
    pub confirm_password: String,
    /// Age, as entered.
    pub age: String,
    /// Phone number.
    pub phone_number: String,
    /// Company details.
    pub company: Company,
}

/// Body returned by login, registration and the payment callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    /// `true` on success (login and registration only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// User record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    /// Error or info message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuthResponse {
    /// Extracts credentials; both token and user must be present.
    pub fn into_credentials(self) -> Result<SessionCredentials, AuthError> {
        match (self.token, self.user) {
            (Some(token), Some(user)) => SessionCredentials::new(token, user),
            (None, _) => Err(AuthError::MissingToken),
            (Some(_), None) => Err(AuthError::InvalidCredentials(
                "response carries no user record".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartWebCallResponse {
    #[serde(default)]
    pub assistant: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartWebCallRequest<'a> {
    pub scenario_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgetPasswordRequest<'a> {
    pub email: &'a str,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use trainer_access::Role;

    #[test]
    fn test_register_request_wire_names() {
        let request = RegisterRequest {
            name: "Jane".into(),
            email: "jane@acme.test".into(),
            password: "S3cret!pw".into(),
            confirm_password: "S3cret!pw".into(),
            age: "30".into(),
            phone_number: "0123456789".into(),
            company: Company::default(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("confirmPassword").is_some());
        assert!(json.get("phoneNumber").is_some());
        assert!(json["company"].get("address").is_some());
    }

    #[test]
    fn test_into_credentials() {
        let response: AuthResponse = serde_json::from_str(
            r#"{"status":true,"token":"t1","user":{"role":"admin","subscriptions":true}}"#,
        )
        .unwrap();
        let creds = response.into_credentials().unwrap();
        assert_eq!(creds.token, "t1");
        assert_eq!(creds.user.role, Some(Role::Admin));
    }

    #[test]
    fn test_into_credentials_requires_both() {
        let missing_user = AuthResponse {
            token: Some("t".into()),
            ..AuthResponse::default()
        };
        assert!(matches!(
            missing_user.into_credentials(),
            Err(AuthError::InvalidCredentials(_))
        ));

        let missing_token = AuthResponse {
            user: Some(UserRecord::default()),
            ..AuthResponse::default()
        };
        assert!(matches!(
            missing_token.into_credentials(),
            Err(AuthError::MissingToken)
        ));
    }
}
