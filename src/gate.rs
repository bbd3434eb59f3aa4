//! Access gate wrapped around every protected route.

use crate::role::Role;

/// Path of the login screen; every refused visit lands here
pub const LOGIN_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Allow only authenticated users whose role is listed in `required`.
/// Roles are flat: admin does not imply moderator.
pub fn guard(required: &[Role], current: &Role, authenticated: bool) -> GateDecision {
    if authenticated && required.contains(current) {
        GateDecision::Allow
    } else {
        GateDecision::Redirect(LOGIN_PATH.to_string())
    }
}
