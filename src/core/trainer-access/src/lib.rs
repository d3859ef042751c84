//! # Trainer Access
//!
//! Route access control for the roleplay trainer front end.
//!
//! ## Components
//!
//! - [`RoutePolicy`] - the single declarative route table (public routes,
//!   reserved prefixes, unsubscribed-admin allow-list, redirect targets)
//! - [`AccessController`] - the edge decision function
//! - [`NavFilter`] - the navigation-side mirror of the controller
//! - [`audit`] - role by menu-entry cross-check between the two
//!
//! Both the controller and the navigation filter take the user as an
//! explicit parameter. Nothing here reads ambient state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod controller;
pub mod error;
pub mod nav;
pub mod policy;
pub mod role;
pub mod user;

pub use controller::{AccessController, AccessRequest, Decision};
pub use error::AccessError;
pub use nav::{audit, Inconsistency, InconsistencyKind, Menu, MenuEntry, NavFilter};
pub use policy::{
    canonical_redirect, normalize_path, PolicyFinding, Redirects, ReservedRoute, RoutePolicy,
};
pub use role::Role;
pub use user::{decode_user_cookie, encode_user_cookie, UserRecord};
