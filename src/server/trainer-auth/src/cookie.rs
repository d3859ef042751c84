//! Cookie wire format.
//!
//! Only what the session needs: splitting a `Cookie` request header and
//! rendering `Set-Cookie` values for the two session cookies.

use std::fmt;
use std::time::Duration;

/// Name of the bearer-token cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Name of the URL-encoded user-record cookie.
pub const USER_COOKIE: &str = "user";

/// Session cookie lifetime.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=None` (requires `Secure`)
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Attributes attached to every session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    /// `Path`
    pub path: String,
    /// `Max-Age`
    pub max_age: Duration,
    /// `Secure`
    pub secure: bool,
    /// `SameSite`
    pub same_site: SameSite,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_age: SESSION_MAX_AGE,
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieAttributes {
    /// Same attributes without `Secure`, for plain-http development.
    pub fn insecure() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }

    /// Renders a `Set-Cookie` value.
    pub fn set_cookie(&self, name: &str, value: &str) -> String {
        self.render(name, value, self.max_age.as_secs())
    }

    /// Renders a `Set-Cookie` value that deletes the cookie.
    pub fn expire_cookie(&self, name: &str) -> String {
        self.render(name, "", 0)
    }

    fn render(&self, name: &str, value: &str, max_age: u64) -> String {
        let mut out = format!("{name}={value}; Path={}; Max-Age={max_age}", self.path);
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str(&format!("; SameSite={}", self.same_site));
        out
    }
}

/// Splits a `Cookie` header into `(name, value)` pairs.
///
/// Pairs without `=` are skipped. Values are returned as sent, still
/// percent-encoded.
pub fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name, value.trim().trim_matches('"')))
    })
}

/// Names of every cookie in a `Cookie` header.
pub fn cookie_names(header: &str) -> Vec<&str> {
    let mut names: Vec<&str> = parse_cookie_header(header).map(|(name, _)| name).collect();
    names.sort_unstable();
    names.dedup();
    names
}
