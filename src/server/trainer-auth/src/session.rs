//! Session lifecycle across the cookie jar and the local store.
//!
//! The cookie jar is what the edge controller reads; the local store is
//! what the navigation filter reads. Both hold the token and the user
//! record and must be written before the next navigation.

use tracing::{debug, info, warn};

use trainer_access::{decode_user_cookie, encode_user_cookie, Role, UserRecord};
use trainer_storage::StorageBackend;

use crate::cookie::{TOKEN_COOKIE, USER_COOKIE};
use crate::{AuthError, SessionContext, SessionCredentials};

/// Local-store key holding the bearer token.
pub const LOCAL_TOKEN_KEY: &str = "token";

/// Local-store key holding the JSON user record.
pub const LOCAL_USER_KEY: &str = "user";

/// Cookie role and local-store role disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMismatch {
    /// Role decoded from the cookie jar.
    pub cookie_role: Option<Role>,
    /// Role decoded from the local store.
    pub local_role: Option<Role>,
}

/// Writes, reads and clears session state in both stores.
pub struct SessionLifecycle<C, L> {
    cookies: C,
    local: L,
}

impl<C: StorageBackend, L: StorageBackend> SessionLifecycle<C, L> {
    /// Creates a lifecycle over a cookie jar and a local store.
    pub fn new(cookies: C, local: L) -> Self {
        Self { cookies, local }
    }

    /// Stores fresh credentials after login, registration or payment.
    ///
    /// The cookie jar is written first, then the local store. When this
    /// returns `Ok`, both are current and the caller may navigate.
    pub async fn establish(&self, credentials: &SessionCredentials) -> Result<(), AuthError> {
        if credentials.token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let encoded_user = encode_user_cookie(&credentials.user);
        self.cookies
            .put(TOKEN_COOKIE, credentials.token.as_bytes())
            .await?;
        self.cookies.put(USER_COOKIE, encoded_user.as_bytes()).await?;

        let user_json = credentials.user.to_json();
        self.local
            .put(LOCAL_TOKEN_KEY, credentials.token.as_bytes())
            .await?;
        self.local.put(LOCAL_USER_KEY, user_json.as_bytes()).await?;

        info!(
            role = ?credentials.user.role,
            subscribed = credentials.user.has_active_subscription(),
            "Session established"
        );

        Ok(())
    }

    /// Replaces the stored credentials without clearing first.
    ///
    /// Used by the after-payment callback, which upgrades the subscription
    /// flag on an existing session.
    pub async fn refresh(&self, credentials: &SessionCredentials) -> Result<(), AuthError> {
        debug!("Refreshing session credentials");
        self.establish(credentials).await
    }

    /// Clears every key from both stores, not only the session keys.
    pub async fn terminate(&self) -> Result<(), AuthError> {
        self.cookies.clear().await?;
        self.local.clear().await?;

        info!("Session terminated");
        Ok(())
    }

    /// Reads the session as the edge controller sees it.
    pub async fn current(&self) -> Result<SessionContext, AuthError> {
        let token = self
            .cookies
            .get_string(TOKEN_COOKIE)
            .await?
            .filter(|t| !t.is_empty());

        // Token presence is authoritative.
        let Some(token) = token else {
            return Ok(SessionContext::default());
        };

        let user = self
            .cookies
            .get_string(USER_COOKIE)
            .await?
            .and_then(|raw| decode_user_cookie(&raw));

        Ok(SessionContext {
            token: Some(token),
            user,
        })
    }

    /// Reads the user record as the navigation filter sees it.
    pub async fn local_user(&self) -> Result<Option<UserRecord>, AuthError> {
        let Some(raw) = self.local.get_string(LOCAL_USER_KEY).await? else {
            return Ok(None);
        };

        match UserRecord::from_json(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Local user record is malformed");
                Ok(None)
            },
        }
    }

    /// Reports a role disagreement between the two stores.
    ///
    /// Detection only: which side is right is not decided here.
    pub async fn reconcile(&self) -> Result<Option<RoleMismatch>, AuthError> {
        let cookie_role = self.current().await?.user.and_then(|u| u.role);
        let local_role = self.local_user().await?.and_then(|u| u.role);

        if cookie_role == local_role {
            return Ok(None);
        }

        warn!(?cookie_role, ?local_role, "Cookie and local-store roles disagree");
        Ok(Some(RoleMismatch {
            cookie_role,
            local_role,
        }))
    }
}
