//! Edge access controller.
//!
//! Decides, for one navigational request, whether to let it through or
//! where to redirect it. The decision is a pure function of the path, the
//! token and the decoded user record.

use std::sync::Arc;

use serde::Serialize;

use crate::policy::normalize_path;
use crate::{Role, RoutePolicy, UserRecord};

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Let the request through.
    Allow,
    /// Send the visitor to the login page.
    RedirectToLogin,
    /// Send the visitor to the home page.
    RedirectToHome,
    /// Send the visitor to the plans page.
    RedirectToPlans,
}

impl Decision {
    /// Returns true for [`Decision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Returns the redirect target for this decision, if any.
    pub fn location<'a>(&self, policy: &'a RoutePolicy) -> Option<&'a str> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(&policy.redirects.login),
            Decision::RedirectToHome => Some(&policy.redirects.home),
            Decision::RedirectToPlans => Some(&policy.redirects.plans),
        }
    }
}

/// Inputs to a single access decision.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Requested path, optionally with query string.
    pub path: &'a str,
    /// Bearer token from the `token` cookie.
    pub token: Option<&'a str>,
    /// Decoded `user` cookie.
    pub user: Option<&'a UserRecord>,
}

impl<'a> AccessRequest<'a> {
    /// Creates a request for the given path with no credentials.
    pub fn anonymous(path: &'a str) -> Self {
        Self {
            path,
            token: None,
            user: None,
        }
    }

    /// Creates a request carrying a token and a user record.
    pub fn authenticated(path: &'a str, token: &'a str, user: Option<&'a UserRecord>) -> Self {
        Self {
            path,
            token: Some(token),
            user,
        }
    }

    /// Token presence is the only authentication signal. Empty means absent.
    fn is_authenticated(&self) -> bool {
        self.token.is_some_and(|t| !t.is_empty())
    }
}

/// The access controller.
#[derive(Debug, Clone)]
pub struct AccessController {
    policy: Arc<RoutePolicy>,
}

impl Default for AccessController {
    fn default() -> Self {
        Self::new(RoutePolicy::default())
    }
}

impl AccessController {
    /// Creates a controller over the given policy.
    pub fn new(policy: RoutePolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// Returns the policy this controller enforces.
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Decides the outcome for a request. First matching rule wins.
    pub fn decide(&self, request: &AccessRequest<'_>) -> Decision {
        let policy = &*self.policy;
        let normalized = normalize_path(request.path);
        let path = normalized.as_str();

        // 1. Assets, framework internals and API calls pass untouched.
        if policy.is_bypassed(path) {
            return Decision::Allow;
        }

        let public = policy.is_public(path);

        // 2. No token: only public routes. The user cookie is ignored.
        if !request.is_authenticated() {
            return if public {
                Decision::Allow
            } else {
                Decision::RedirectToLogin
            };
        }

        // 3. Logged-in users have no business on login/register pages.
        if public {
            return Decision::RedirectToHome;
        }

        let user = request.user;

        // 4. Unsubscribed admins are confined to the upgrade flow.
        if user.is_some_and(UserRecord::is_unsubscribed_admin)
            && !policy.is_unsubscribed_allowed(path)
        {
            return Decision::RedirectToPlans;
        }

        let role = user.and_then(|u| u.role);

        // 5. Super-admins skip reserved-route checks.
        if role == Some(Role::SuperAdmin) {
            return Decision::Allow;
        }

        // 6. Reserved prefixes.
        if let Some(allowed) = policy.reserved_for(path).and_then(|r| r.allowed_roles()) {
            if !role.is_some_and(|r| allowed.contains(&r)) {
                return Decision::RedirectToHome;
            }
        }

        Decision::Allow
    }

    /// Convenience wrapper returning the redirect location, if any.
    pub fn redirect_for(&self, request: &AccessRequest<'_>) -> Option<&str> {
        self.decide(request).location(&self.policy)
    }
}
