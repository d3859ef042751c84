//! Declarative route policy.
//!
//! A single table drives both the edge controller and the navigation
//! filter. The table is serde-serializable so deployments can version it
//! as a JSON document and extend the reserved-prefix mapping without a
//! rebuild.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AccessError, Role};

/// Oldest policy schema version this build can read.
pub const MIN_POLICY_VERSION: u32 = 1;

/// Newest policy schema version this build can read.
pub const CURRENT_POLICY_VERSION: u32 = 2;

/// A path prefix reserved for a set of roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedRoute {
    /// Path prefix, matched on segment boundaries.
    pub prefix: String,

    /// Roles allowed under the prefix. Missing or empty means unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

impl ReservedRoute {
    /// Creates a reserved route for the given roles.
    pub fn new(prefix: impl Into<String>, roles: &[Role]) -> Self {
        Self {
            prefix: prefix.into(),
            roles: Some(roles.to_vec()),
        }
    }

    /// Returns the role allow-set, or `None` when the entry fails open.
    pub fn allowed_roles(&self) -> Option<&[Role]> {
        match self.roles.as_deref() {
            Some([]) | None => None,
            Some(roles) => Some(roles),
        }
    }
}

/// Redirect targets used by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirects {
    /// Where unauthenticated requests go.
    pub login: String,
    /// Where authenticated users are sent away from public or forbidden pages.
    pub home: String,
    /// Where unsubscribed admins are confined.
    pub plans: String,
}

impl Default for Redirects {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/".to_string(),
            plans: "/plans".to_string(),
        }
    }
}

/// Something worth reporting about a policy that is still loadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyFinding {
    /// A reserved entry has no roles and therefore restricts nothing.
    FailOpenReservation {
        /// The offending prefix.
        prefix: String,
    },
    /// A public route is also covered by a reserved prefix.
    PublicRouteReserved {
        /// The public route.
        route: String,
        /// The reserved prefix covering it.
        prefix: String,
    },
}

impl fmt::Display for PolicyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyFinding::FailOpenReservation { prefix } => {
                write!(f, "reserved prefix {prefix} lists no roles and is open to everyone")
            },
            PolicyFinding::PublicRouteReserved { route, prefix } => {
                write!(f, "public route {route} is also reserved by {prefix}")
            },
        }
    }
}

/// The route policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    /// Schema version of this table.
    pub version: u32,

    /// Exact paths reachable without a token and off-limits with one.
    pub public_routes: Vec<String>,

    /// Exact paths an unsubscribed admin may still visit.
    pub unsubscribed_allow: Vec<String>,

    /// Prefixes that are never gated (framework internals, API proxy).
    pub bypass_prefixes: Vec<String>,

    /// Reserved prefixes, most specific match wins.
    pub reserved: Vec<ReservedRoute>,

    /// Redirect targets.
    #[serde(default)]
    pub redirects: Redirects,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            version: CURRENT_POLICY_VERSION,
            public_routes: [
                "/login",
                "/forgetPassword",
                "/verifyResetCode",
                "/resetPassword",
                "/register",
            ]
            .map(String::from)
            .to_vec(),
            unsubscribed_allow: ["/", "/plans"].map(String::from).to_vec(),
            bypass_prefixes: ["/_next", "/api"].map(String::from).to_vec(),
            reserved: vec![
                ReservedRoute::new("/users", &[Role::Admin, Role::SuperAdmin]),
                ReservedRoute::new("/session", &[Role::Admin, Role::SuperAdmin]),
                ReservedRoute::new("/evaluation", &[Role::Admin, Role::SuperAdmin]),
                ReservedRoute::new("/plansManagement", &[Role::SuperAdmin]),
            ],
            redirects: Redirects::default(),
        }
    }
}

impl RoutePolicy {
    /// Parses a policy from a JSON document and validates it.
    pub fn from_json(raw: &str) -> Result<Self, AccessError> {
        let policy: Self = serde_json::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Loads a policy from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AccessError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let policy = Self::from_json(&raw)?;

        info!(
            path = %path.display(),
            version = policy.version,
            reserved = policy.reserved.len(),
            "Route policy loaded"
        );

        Ok(policy)
    }

    /// Serializes the policy as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, AccessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the table.
    ///
    /// Structural errors are returned as `Err`. Fail-open reservations and
    /// other smells are logged and returned as findings.
    pub fn validate(&self) -> Result<Vec<PolicyFinding>, AccessError> {
        if !(MIN_POLICY_VERSION..=CURRENT_POLICY_VERSION).contains(&self.version) {
            return Err(AccessError::UnsupportedVersion {
                found: self.version,
                min: MIN_POLICY_VERSION,
                max: CURRENT_POLICY_VERSION,
            });
        }

        let all_paths = self
            .public_routes
            .iter()
            .chain(&self.unsubscribed_allow)
            .chain(&self.bypass_prefixes)
            .chain(self.reserved.iter().map(|r| &r.prefix))
            .chain([
                &self.redirects.login,
                &self.redirects.home,
                &self.redirects.plans,
            ]);

        for path in all_paths {
            if !path.starts_with('/') {
                return Err(AccessError::InvalidPolicy(format!(
                    "path must start with '/': {path:?}"
                )));
            }
        }

        if !self.public_routes.contains(&self.redirects.login) {
            return Err(AccessError::InvalidPolicy(format!(
                "login redirect {} is not a public route",
                self.redirects.login
            )));
        }

        for target in [&self.redirects.home, &self.redirects.plans] {
            if !self.unsubscribed_allow.contains(target) {
                return Err(AccessError::InvalidPolicy(format!(
                    "redirect target {target} must be reachable by unsubscribed admins"
                )));
            }
        }

        let mut findings = Vec::new();

        for entry in &self.reserved {
            if entry.allowed_roles().is_none() {
                warn!(
                    prefix = %entry.prefix,
                    "Reserved route has no roles and fails open"
                );
                findings.push(PolicyFinding::FailOpenReservation {
                    prefix: entry.prefix.clone(),
                });
            }
        }

        for route in &self.public_routes {
            if let Some(entry) = self.reserved_for(route) {
                warn!(route = %route, prefix = %entry.prefix, "Public route is also reserved");
                findings.push(PolicyFinding::PublicRouteReserved {
                    route: route.clone(),
                    prefix: entry.prefix.clone(),
                });
            }
        }

        Ok(findings)
    }

    /// Returns true when the path is public-only.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_routes.iter().any(|r| r == path)
    }

    /// Returns true when an unsubscribed admin may visit the path.
    pub fn is_unsubscribed_allowed(&self, path: &str) -> bool {
        self.unsubscribed_allow.iter().any(|r| r == path)
    }

    /// Returns true for framework internals, API calls and static assets.
    pub fn is_bypassed(&self, path: &str) -> bool {
        if self
            .bypass_prefixes
            .iter()
            .any(|prefix| matches_prefix(path, prefix))
        {
            return true;
        }

        // File extension in the last segment marks a static asset.
        path.rsplit('/').next().is_some_and(|last| last.contains('.'))
    }

    /// Returns the most specific reserved entry covering the path.
    pub fn reserved_for(&self, path: &str) -> Option<&ReservedRoute> {
        self.reserved
            .iter()
            .filter(|entry| matches_prefix(path, &entry.prefix))
            .max_by_key(|entry| entry.prefix.len())
    }
}

/// Reduces a request path to the form the page renderer resolves.
///
/// Strips query and fragment, decodes percent-escaped unreserved
/// characters, resolves `.` and `..` segments and drops empty segments,
/// so `/api/../users`, `//users` and `/%75sers` all become `/users`.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<Cow<'_, str>> = Vec::new();
    for raw in strip_query(path).split('/') {
        let segment = decode_unreserved(raw);
        if segment == ".." {
            segments.pop();
        } else if !segment.is_empty() && segment != "." {
            segments.push(segment);
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    segments.iter().fold(String::with_capacity(path.len()), |mut out, segment| {
        out.push('/');
        out.push_str(segment);
        out
    })
}

/// Returns the normalized path when it names a different resource than
/// the path as sent. A single trailing slash is tolerated.
pub fn canonical_redirect(path: &str) -> Option<String> {
    let sent = strip_query(path);
    let sent = match sent.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => sent,
    };

    let canonical = normalize_path(path);
    (sent != canonical).then_some(canonical)
}

fn strip_query(path: &str) -> &str {
    let end = path.find(|c| c == '?' || c == '#').unwrap_or(path.len());
    &path[..end]
}

/// RFC 3986 unreserved set. Escapes of these name the same resource.
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

fn decode_unreserved(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }

    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let escape = &rest[idx..];
        let decoded = escape
            .get(1..3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .filter(|byte| is_unreserved(*byte));

        match decoded {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &escape[3..];
            },
            None => {
                out.push('%');
                rest = &escape[1..];
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Segment-boundary prefix match: `/users` covers `/users` and
/// `/users/42` but not `/usersettings`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
