//! Console screens rendered for routed views.
//!
//! Each screen keeps its own state, talks to the API directly with the session token
//! and owns its error text. A failed call leaves the screen usable.

pub mod add_banner;
pub mod banners;
pub mod partners;
pub mod screens;

use crate::session::Profile;
use serde_json::Value;

/// Shown where a field is missing
pub const MISSING: &str = "—";

/// Image shown for banners without a poster
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/120x80?text=No+Image";

/// Base URLs used to build links to uploaded files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    /// API root, e.g. `https://host:1212/api/v1`
    pub api_base: String,
    /// Origin serving uploads, e.g. `https://host:1212`
    pub uploads_host: String,
}

/// Result of a screen action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Inline message for the user
    pub message: Option<String>,
    /// Path to navigate to next
    pub navigate: Option<String>,
}

impl Outcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            navigate: None,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Non-empty string value of a profile field
pub fn field<'a>(profile: &'a Profile, key: &str) -> Option<&'a str> {
    profile
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// First present field among `keys`, or the missing marker
pub fn field_or_missing<'a>(profile: &'a Profile, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|k| field(profile, k))
        .unwrap_or(MISSING)
}

/// Profile object from a payload that is either the object or an array holding it first
pub fn profile_from_payload(payload: Option<Value>) -> Option<Profile> {
    let value = match payload? {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Parse `key=value` arguments (shell-quoted) into pairs
pub fn parse_assignments(args: &str) -> anyhow::Result<Vec<(String, String)>> {
    let words = shell_words::split(args)?;
    words
        .into_iter()
        .map(|w| match w.split_once('=') {
            Some((k, v)) => Ok((k.trim().to_lowercase(), v.to_string())),
            None => Err(anyhow::anyhow!("Expected key=value, got '{}'", w)),
        })
        .collect()
}
