//! Decoded user record.
//!
//! The record arrives as a URL-encoded JSON blob in the `user` cookie (and
//! as plain JSON in the local store). It is client-readable and unsigned,
//! so it is only good for UX-level gating.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::Role;

/// User record fields relevant to access control.
///
/// Fields this crate does not interpret are kept in `extra` so a record can
/// be re-encoded without losing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name.
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role tag. `None` when the field is missing or not a string.
    #[serde(
        default,
        deserialize_with = "lenient_role",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<Role>,

    /// Subscription flag as sent by the API. Only literal `true` counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Value>,

    /// Everything else in the record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(tag)) => tag.parse().ok(),
        Some(Value::Null) | None => None,
        Some(_) => Some(Role::Unknown),
    })
}

impl UserRecord {
    /// Creates a record with just a role and subscription flag.
    pub fn with_role(role: Role, subscribed: bool) -> Self {
        Self {
            role: Some(role),
            subscriptions: Some(Value::Bool(subscribed)),
            ..Self::default()
        }
    }

    /// Returns true only when `subscriptions` is the JSON literal `true`.
    pub fn has_active_subscription(&self) -> bool {
        matches!(self.subscriptions, Some(Value::Bool(true)))
    }

    /// Returns true for an `admin` account without an active subscription.
    ///
    /// `super-admin` accounts never match: the role must be literally `admin`.
    pub fn is_unsubscribed_admin(&self) -> bool {
        self.role == Some(Role::Admin) && !self.has_active_subscription()
    }

    /// Parses a record from plain JSON (local-store format).
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serializes the record to plain JSON (local-store format).
    pub fn to_json(&self) -> String {
        // Map<String, Value> plus primitive fields cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Decodes the `user` cookie value.
///
/// Percent-decodes the value and parses it as JSON. A value that fails
/// either step yields `None`; the failure is never surfaced to the caller.
pub fn decode_user_cookie(raw: &str) -> Option<UserRecord> {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(error = %e, "user cookie is not valid percent-encoded UTF-8");
            return None;
        },
    };

    match UserRecord::from_json(&decoded) {
        Ok(user) => Some(user),
        Err(e) => {
            debug!(error = %e, "user cookie is not a valid user record");
            None
        },
    }
}

/// Encodes a record for the `user` cookie.
pub fn encode_user_cookie(user: &UserRecord) -> String {
    urlencoding::encode(&user.to_json()).into_owned()
}
