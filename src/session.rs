//! Session store: the access token and user profile shared by the router and views.
//!
//! The session starts uninitialised. `initialize` must run before any route decision;
//! until then the router reports `Loading`. Every change to the token or profile is
//! written through to the backing storage.

use crate::storage::{KeyValueStore, ACCESS_TOKEN_KEY, USER_KEY};
use serde_json::{Map, Value};

/// User profile as returned by the API: an opaque JSON object
pub type Profile = Map<String, Value>;

pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
    token: Option<String>,
    user: Option<Profile>,
    loaded: bool,
    warnings: Vec<String>,
}

impl SessionStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            token: None,
            user: None,
            loaded: false,
            warnings: Vec::new(),
        }
    }

    /// Load the persisted token and profile.
    /// A stored profile that is not a JSON object is dropped from storage; the token is kept.
    pub fn initialize(&mut self) {
        self.token = self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty());

        self.user = match self.store.get(USER_KEY) {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(profile)) => Some(profile),
                _ => {
                    if let Err(e) = self.store.remove(USER_KEY) {
                        self.warn(format!("failed to remove stored profile: {}", e));
                    }
                    None
                }
            },
            None => None,
        };

        self.loaded = true;
    }

    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&Profile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn login(&mut self, profile: Profile, token: &str) {
        self.token = Some(token.to_string()).filter(|t| !t.is_empty());
        self.user = Some(profile);
        self.persist();
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
        self.persist();
    }

    /// Best-effort write-through: present values are stored, absent ones removed.
    fn persist(&mut self) {
        let token_result = match &self.token {
            Some(token) => self.store.set(ACCESS_TOKEN_KEY, token),
            None => self.store.remove(ACCESS_TOKEN_KEY),
        };
        if let Err(e) = token_result {
            self.warn(format!("failed to persist access token: {}", e));
        }

        let user_result = match &self.user {
            Some(user) => match serde_json::to_string(user) {
                Ok(json) => self.store.set(USER_KEY, &json),
                Err(e) => Err(e.into()),
            },
            None => self.store.remove(USER_KEY),
        };
        if let Err(e) = user_result {
            self.warn(format!("failed to persist user profile: {}", e));
        }
    }

    fn warn(&mut self, message: String) {
        eprintln!("Warning: {}", message);
        self.warnings.push(message);
    }

    /// Storage warnings raised since the last call
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    #[cfg(test)]
    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{self, Role};
    use crate::storage::{FileStore, MemoryStore};
    use serde_json::json;

    fn profile(value: Value) -> Profile {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_uninitialized_is_loading() {
        let session = SessionStore::new(Box::new(MemoryStore::new()));
        assert!(session.is_loading());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_initialize_loads_token_and_profile() {
        let store = MemoryStore::new()
            .with_entry(ACCESS_TOKEN_KEY, "tok")
            .with_entry(USER_KEY, r#"{"Роль":"Admin"}"#);
        let mut session = SessionStore::new(Box::new(store));
        session.initialize();

        assert!(!session.is_loading());
        assert_eq!(session.token(), Some("tok"));
        assert_eq!(session.user().unwrap()["Роль"], json!("Admin"));
    }

    #[test]
    fn test_malformed_profile_keeps_token() {
        let store = MemoryStore::new()
            .with_entry(ACCESS_TOKEN_KEY, "tok")
            .with_entry(USER_KEY, "{not json");
        let mut session = SessionStore::new(Box::new(store));
        session.initialize();

        assert!(session.user().is_none());
        assert_eq!(session.token(), Some("tok"));
        assert!(session.stored(USER_KEY).is_none());
        assert_eq!(session.stored(ACCESS_TOKEN_KEY).as_deref(), Some("tok"));
    }

    #[test]
    fn test_non_object_profile_is_discarded() {
        let store = MemoryStore::new().with_entry(USER_KEY, "[1,2,3]");
        let mut session = SessionStore::new(Box::new(store));
        session.initialize();
        assert!(session.user().is_none());
        assert!(session.stored(USER_KEY).is_none());
    }

    #[test]
    fn test_login_then_logout_clears_storage() {
        let mut session = SessionStore::new(Box::new(MemoryStore::new()));
        session.initialize();

        session.login(profile(json!({"Роль": "moderator"})), "tok");
        assert_eq!(role::resolve(session.user()), Role::Moderator);
        assert!(session.is_authenticated());
        assert_eq!(session.stored(ACCESS_TOKEN_KEY).as_deref(), Some("tok"));
        assert!(session.stored(USER_KEY).unwrap().contains("moderator"));

        session.logout();
        assert_eq!(role::resolve(session.user()), Role::Unknown);
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.stored(ACCESS_TOKEN_KEY).is_none());
        assert!(session.stored(USER_KEY).is_none());
    }

    #[test]
    fn test_session_survives_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let mut session = SessionStore::new(Box::new(FileStore::open(&path).unwrap()));
        session.initialize();
        session.login(profile(json!({"ВидКонтрагента": "клиент"})), "tok");

        let mut reloaded = SessionStore::new(Box::new(FileStore::open(&path).unwrap()));
        reloaded.initialize();
        assert_eq!(reloaded.token(), Some("tok"));
        assert_eq!(reloaded.user().unwrap()["ВидКонтрагента"], json!("клиент"));
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("read-only"))
        }
        fn remove(&mut self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("read-only"))
        }
    }

    #[test]
    fn test_storage_failure_is_not_fatal() {
        let mut session = SessionStore::new(Box::new(ReadOnlyStore));
        session.initialize();
        session.login(profile(json!({"Роль": "admin"})), "tok");

        assert_eq!(session.token(), Some("tok"));
        let warnings = session.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("access token"));
        assert!(session.take_warnings().is_empty());
    }
}
