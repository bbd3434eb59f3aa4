//! Role resolution from the stored user profile.

use crate::session::Profile;
use std::fmt;

/// Profile fields that have carried the role across API versions, in priority order
pub const ROLE_KEYS: &[&str] = &["Роль", "ВидКонтрагента", "counterparty_type"];

/// Normalised role of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Moderator,
    /// "клиент": customers have no access to the admin console
    Client,
    /// Any other non-empty role string, lower-cased
    Other(String),
    /// No role known
    Unknown,
}

impl Role {
    /// Classify an already-normalised role string
    pub fn from_normalized(s: &str) -> Self {
        match s {
            "" => Self::Unknown,
            "admin" => Self::Admin,
            "moderator" => Self::Moderator,
            "клиент" => Self::Client,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Client => "клиент",
            Self::Other(s) => s,
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "<none>"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Resolve the role: first non-empty string among `ROLE_KEYS`, lower-cased.
pub fn resolve(profile: Option<&Profile>) -> Role {
    let Some(profile) = profile else {
        return Role::Unknown;
    };

    let raw = ROLE_KEYS
        .iter()
        .filter_map(|key| profile.get(*key).and_then(|v| v.as_str()))
        .find(|v| !v.is_empty())
        .unwrap_or_default();

    Role::from_normalized(&raw.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn profile(value: Value) -> Profile {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_no_profile_is_unknown() {
        assert_eq!(resolve(None), Role::Unknown);
        assert_eq!(resolve(Some(&Profile::new())), Role::Unknown);
    }

    #[test]
    fn test_each_alias_yields_same_role() {
        for key in ROLE_KEYS {
            let mut p = Profile::new();
            p.insert(key.to_string(), json!("Moderator"));
            assert_eq!(resolve(Some(&p)), Role::Moderator, "key {}", key);
        }
    }

    #[test]
    fn test_first_non_empty_wins() {
        let p = profile(json!({
            "Роль": "",
            "ВидКонтрагента": "Admin",
            "counterparty_type": "moderator",
        }));
        assert_eq!(resolve(Some(&p)), Role::Admin);
    }

    #[test]
    fn test_non_string_values_skipped() {
        let p = profile(json!({ "Роль": 7, "counterparty_type": "manager" }));
        assert_eq!(resolve(Some(&p)), Role::Other("manager".to_string()));
    }

    #[test]
    fn test_cyrillic_lowercase() {
        let p = profile(json!({ "ВидКонтрагента": "КЛИЕНТ" }));
        assert_eq!(resolve(Some(&p)), Role::Client);
        assert_eq!(Role::Client.as_str(), "клиент");
    }

    #[test]
    fn test_round_trip_as_str() {
        for role in [
            Role::Admin,
            Role::Moderator,
            Role::Client,
            Role::Other("менеджер".to_string()),
            Role::Unknown,
        ] {
            assert_eq!(Role::from_normalized(role.as_str()), role);
        }
    }
}
