//! Navigation filter.
//!
//! Decides which menu entries to render so the UI never offers a link the
//! controller would bounce. The default sidebar takes its role
//! restrictions from the route policy, so the two cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::{AccessController, AccessRequest, Role, RoutePolicy, UserRecord};

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Display label.
    pub label: String,
    /// Target path.
    pub link: String,
    /// Roles allowed to see the entry. `None` means everyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

impl MenuEntry {
    /// Creates an unrestricted entry.
    pub fn new(label: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            link: link.into(),
            roles: None,
        }
    }

    /// Restricts the entry to the given roles.
    pub fn restricted_to(mut self, roles: &[Role]) -> Self {
        self.roles = Some(roles.to_vec());
        self
    }

    fn shown_to(&self, role: Option<Role>) -> bool {
        match &self.roles {
            None => true,
            Some(roles) => role.is_some_and(|r| roles.contains(&r)),
        }
    }
}

/// An ordered list of menu entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    /// Wraps a hand-written list of entries.
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        Self { entries }
    }

    /// The application sidebar, with restrictions taken from the policy.
    pub fn sidebar(policy: &RoutePolicy) -> Self {
        let items = [
            ("Dashboard", "/"),
            ("Scenario", "/scenario"),
            ("Results & Evaluations", "/results"),
            ("History", "/history"),
            ("Evaluation", "/evaluation"),
            ("Sessions", "/session"),
            ("Users", "/users"),
            ("Plans Management", "/plansManagement"),
            ("Plans", "/plans"),
        ];

        let entries = items
            .into_iter()
            .map(|(label, link)| MenuEntry {
                label: label.to_string(),
                link: link.to_string(),
                roles: roles_for_link(policy, link),
            })
            .collect();

        Self { entries }
    }

    /// All entries, unfiltered.
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }
}

/// Role restriction implied by the policy for a link.
///
/// Super-admins pass every reserved check, so they are added to any
/// restricted set.
fn roles_for_link(policy: &RoutePolicy, link: &str) -> Option<Vec<Role>> {
    let allowed = policy.reserved_for(link)?.allowed_roles()?;

    let mut roles = allowed.to_vec();
    if !roles.contains(&Role::SuperAdmin) {
        roles.push(Role::SuperAdmin);
    }
    Some(roles)
}

/// Filters menus for a viewer.
#[derive(Debug, Clone, Copy)]
pub struct NavFilter<'a> {
    policy: &'a RoutePolicy,
}

impl<'a> NavFilter<'a> {
    /// Creates a filter bound to a policy.
    pub fn new(policy: &'a RoutePolicy) -> Self {
        Self { policy }
    }

    /// Entries with no restriction or whose restriction includes `role`.
    pub fn visible<'m>(&self, menu: &'m Menu, role: Option<Role>) -> Vec<&'m MenuEntry> {
        menu.entries.iter().filter(|e| e.shown_to(role)).collect()
    }

    /// Like [`NavFilter::visible`], but also hides everything outside the
    /// upgrade flow from unsubscribed admins.
    pub fn visible_for<'m>(&self, menu: &'m Menu, user: Option<&UserRecord>) -> Vec<&'m MenuEntry> {
        let role = user.and_then(|u| u.role);
        let confined = user.is_some_and(UserRecord::is_unsubscribed_admin);

        self.visible(menu, role)
            .into_iter()
            .filter(|e| !confined || self.policy.is_unsubscribed_allowed(&e.link))
            .collect()
    }
}

/// Kind of disagreement between the menu and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// The link is shown but the controller redirects away from it.
    RenderedButRejected,
    /// The link is hidden but the controller would allow it.
    HiddenButAllowed,
}

/// A menu entry whose visibility disagrees with the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    /// Entry label.
    pub label: String,
    /// Entry link.
    pub link: String,
    /// Viewer role.
    pub role: Role,
    /// Viewer subscription state.
    pub subscribed: bool,
    /// What went wrong.
    pub kind: InconsistencyKind,
}

/// Cross-checks a menu against the controller for every viewer.
///
/// Viewers are every assignable role, both subscribed and unsubscribed.
pub fn audit(menu: &Menu, controller: &AccessController) -> Vec<Inconsistency> {
    let filter = NavFilter::new(controller.policy());
    let mut findings = Vec::new();

    for role in Role::ASSIGNABLE {
        for subscribed in [true, false] {
            let viewer = UserRecord::with_role(role, subscribed);
            let rendered = filter.visible_for(menu, Some(&viewer));

            for entry in menu.entries() {
                let shown = rendered.iter().any(|e| *e == entry);
                let allowed = controller
                    .decide(&AccessRequest::authenticated(
                        &entry.link,
                        "audit",
                        Some(&viewer),
                    ))
                    .is_allowed();

                let kind = match (shown, allowed) {
                    (true, false) => InconsistencyKind::RenderedButRejected,
                    (false, true) => InconsistencyKind::HiddenButAllowed,
                    _ => continue,
                };

                findings.push(Inconsistency {
                    label: entry.label.clone(),
                    link: entry.link.clone(),
                    role,
                    subscribed,
                    kind,
                });
            }
        }
    }

    findings
}
