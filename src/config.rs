use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default API root of the production deployment
pub const DEFAULT_API_URL: &str = "https://api.dustipharma.tj:1212/api/v1";

/// Directory name used for user and project configuration
const CONFIG_DIR: &str = ".dusti-admin";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Remote API settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Origin serving uploaded files; derived from `base_url` when unset
    #[serde(default)]
    pub uploads_host: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ApiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn uploads_host(&self) -> String {
        match &self.uploads_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => origin(self.base_url()),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or_else(default_timeout_ms)
    }
}

/// Scheme, host and port of a URL; the input unchanged when it does not parse
fn origin(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed.origin().ascii_serialization(),
        _ => url.trim_end_matches('/').to_string(),
    }
}

/// Problem with a URL setting, if any: must parse, use http(s) and name a host
fn check_http_url(value: &str) -> Option<String> {
    let parsed = match Url::parse(value) {
        Ok(parsed) => parsed,
        Err(e) => return Some(format!("Invalid URL '{}': {}", value, e)),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return Some(format!("Expected an http(s) URL, got '{}'", value));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Some(format!("URL '{}' has no host", value));
    }
    None
}

/// Where the session storage and transcripts live
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured directory, else `~/.dusti-admin`, else `./.dusti-admin`
    pub fn dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
    }
}

/// Partner list settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PartnersConfig {
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PartnersConfig {
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(7)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub partners: PartnersConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.dusti-admin/config.local.toml) > project (.dusti-admin/config.toml)
    /// > user (~/.dusti-admin/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(CONFIG_DIR).join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Local overrides, should be gitignored
        let local_config = Path::new(CONFIG_DIR).join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every value it sets)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.uploads_host.is_some() {
            self.api.uploads_host = other.api.uploads_host;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }
        if other.storage.dir.is_some() {
            self.storage.dir = other.storage.dir;
        }
        if other.partners.page_size.is_some() {
            self.partners.page_size = other.partners.page_size;
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(message) = check_http_url(self.api.base_url()) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message,
            });
        }

        if let Some(host) = &self.api.uploads_host {
            if let Some(message) = check_http_url(host) {
                errors.push(ValidationError {
                    field: "api.uploads_host".to_string(),
                    message,
                });
            }
        }

        if self.api.timeout_ms() == 0 {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.partners.page_size() == 0 {
            errors.push(ValidationError {
                field: "partners.page_size".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url(), DEFAULT_API_URL);
        assert_eq!(config.api.uploads_host(), "https://api.dustipharma.tj:1212");
        assert_eq!(config.api.timeout_ms(), 30_000);
        assert_eq!(config.partners.page_size(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_origin() {
        assert_eq!(origin("http://localhost:8080/api/v1"), "http://localhost:8080");
        assert_eq!(origin("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(origin("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_origin_drops_path_and_query() {
        assert_eq!(origin("http://host:1212?v=1"), "http://host:1212");
        assert_eq!(origin("https://host/api/v1?x=2#f"), "https://host");
        // default ports are not repeated
        assert_eq!(origin("https://host:443/api"), "https://host");
    }

    #[test]
    fn test_validate_rejects_url_without_host() {
        let mut config = Config::default();
        config.api.base_url = Some("https://".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "api.base_url");

        config.api.base_url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.api.base_url = Some("http://localhost:8080/api/v1".to_string());
        config.api.uploads_host = Some("mailto:x@y".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors[0].field, "api.uploads_host");
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
[api]
base_url = "http://localhost:9000/api/v1"
timeout_ms = 5000

[partners]
page_size = 20
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url(), "http://localhost:9000/api/v1");
        assert_eq!(config.api.uploads_host(), "http://localhost:9000");
        assert_eq!(config.api.timeout_ms(), 5000);
        assert_eq!(config.partners.page_size(), 20);
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let mut base = Config::default();
        base.api.base_url = Some("http://a/api".to_string());
        base.partners.page_size = Some(10);

        let mut other = Config::default();
        other.api.timeout_ms = Some(1000);
        base.merge(other);

        assert_eq!(base.api.base_url(), "http://a/api");
        assert_eq!(base.api.timeout_ms(), 1000);
        assert_eq!(base.partners.page_size(), 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\ndir = \"/var/lib/dusti\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage.dir(), PathBuf::from("/var/lib/dusti"));
    }

    #[test]
    fn test_validate_errors() {
        let mut config = Config::default();
        config.api.base_url = Some("ftp://x".to_string());
        config.api.timeout_ms = Some(0);
        config.partners.page_size = Some(0);

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].field.contains("base_url"));
        assert!(errors[2].message.contains("greater than 0"));
    }
}
