//! Client for the remote admin REST API.
//!
//! Every response body is a JSON envelope with a numeric `code`, an optional `message`
//! and the data under `payload`.

use crate::multipart::MultipartForm;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Response envelope shared by all endpoints
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl Envelope {
    pub fn with_code(code: i64) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn with_payload(code: i64, payload: Value) -> Self {
        Self {
            code: Some(code),
            payload: Some(payload),
            ..Default::default()
        }
    }

    /// True when `code` is one of `codes` or the API flagged `success`
    pub fn succeeded(&self, codes: &[i64]) -> bool {
        self.code.is_some_and(|c| codes.contains(&c)) || self.success == Some(true)
    }
}

/// A failed API call
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status, if the server answered
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "API error {}: {}", status, self.message),
            None => write!(f, "Request failed: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Message to show the user for a failed call: the server's `message` when it sent one
pub fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => api.message.clone(),
        None => err.to_string(),
    }
}

/// Query for the paginated user list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub page: u32,
    pub size: u32,
    pub number_phone: Option<String>,
    pub full_name: Option<String>,
}

impl UserQuery {
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(phone) = &self.number_phone {
            pairs.push(("numberPhone", phone.clone()));
        }
        if let Some(name) = &self.full_name {
            pairs.push(("fullName", name.clone()));
        }
        pairs
    }
}

/// Trait for the admin API to allow mocking
pub trait AdminApi {
    fn banners(&self, token: &str) -> Result<Envelope>;
    fn create_banner(&self, token: &str, form: &MultipartForm) -> Result<Envelope>;
    fn update_banner(&self, token: &str, id: &str, form: &MultipartForm) -> Result<Envelope>;
    fn delete_banner(&self, token: &str, id: &str) -> Result<Envelope>;
    fn users(&self, token: &str, query: &UserQuery) -> Result<Envelope>;
    fn profile(&self, token: &str) -> Result<Envelope>;
    /// Succeeds on any 2xx status
    fn delete_user(&self, token: &str, id: &str) -> Result<()>;
}

pub struct Client {
    base_url: String,
    agent: ureq::Agent,
}

impl Client {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_millis(timeout_ms))
                .build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str, token: &str) -> ureq::Request {
        self.agent
            .request(method, &self.url(path))
            .set("Authorization", &format!("Bearer {}", token))
    }

    fn into_envelope(resp: std::result::Result<ureq::Response, ureq::Error>) -> Result<Envelope> {
        match resp {
            Ok(r) => {
                let body: Envelope = r.into_json()?;
                Ok(body)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let message = serde_json::from_str::<Envelope>(&body)
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or(body);
                Err(anyhow!(ApiError {
                    status: Some(code),
                    message,
                }))
            }
            Err(e) => Err(anyhow!(ApiError {
                status: None,
                message: e.to_string(),
            })),
        }
    }
}

impl AdminApi for Client {
    fn banners(&self, token: &str) -> Result<Envelope> {
        Self::into_envelope(self.request("GET", "/app/banners", token).call())
    }

    fn create_banner(&self, token: &str, form: &MultipartForm) -> Result<Envelope> {
        Self::into_envelope(
            self.request("POST", "/app/admin/banners", token)
                .set("Content-Type", &form.content_type())
                .send_bytes(&form.body()),
        )
    }

    fn update_banner(&self, token: &str, id: &str, form: &MultipartForm) -> Result<Envelope> {
        Self::into_envelope(
            self.request("PUT", &format!("/app/admin/banners/{}", id), token)
                .set("Content-Type", &form.content_type())
                .send_bytes(&form.body()),
        )
    }

    fn delete_banner(&self, token: &str, id: &str) -> Result<Envelope> {
        Self::into_envelope(
            self.request("DELETE", &format!("/app/admin/banners/{}", id), token)
                .call(),
        )
    }

    fn users(&self, token: &str, query: &UserQuery) -> Result<Envelope> {
        let mut req = self
            .request("GET", "/app/admin/users", token)
            .set("Content-Type", "application/json");
        for (key, value) in query.pairs() {
            req = req.query(key, &value);
        }
        Self::into_envelope(req.call())
    }

    fn profile(&self, token: &str) -> Result<Envelope> {
        Self::into_envelope(
            self.request("GET", "/app/profile/users", token)
                .set("Content-Type", "application/json")
                .call(),
        )
    }

    fn delete_user(&self, token: &str, id: &str) -> Result<()> {
        let resp = self
            .request("DELETE", &format!("/app/admin/users/{}", id), token)
            .set("Content-Type", "application/json")
            .call();
        match resp {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, _)) => Err(anyhow!(ApiError {
                status: Some(code),
                message: format!("Ошибка удаления: {}", code),
            })),
            Err(e) => Err(anyhow!(ApiError {
                status: None,
                message: e.to_string(),
            })),
        }
    }
}

/// Render a JSON id (number or string) as a path segment
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
