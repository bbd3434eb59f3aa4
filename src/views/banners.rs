//! Banner ("block") list with edit and delete.

use super::{parse_assignments, Links, Outcome, MISSING, PLACEHOLDER_IMAGE};
use crate::api::{self, AdminApi};
use crate::multipart::{MultipartForm, Upload};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Banner {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Banner {
    pub fn id(&self) -> Option<String> {
        api::id_string(&self.id)
    }
}

/// Public URL of a banner poster
pub fn image_url(links: &Links, poster_path: Option<&str>) -> String {
    match poster_path {
        None | Some("") => PLACEHOLDER_IMAGE.to_string(),
        Some(p) if p.starts_with("/api/uploads/") || p.starts_with("/uploads/") => {
            format!("{}{}", links.uploads_host, p)
        }
        Some(p) => format!("{}/api/uploads/{}", links.uploads_host, p),
    }
}

/// Render an API timestamp as `dd.mm.yyyy`
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return MISSING.to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d.%m.%Y").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%d.%m.%Y").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%d.%m.%Y").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format("%d.%m.%Y").to_string();
    }
    MISSING.to_string()
}

/// Changes submitted from the edit dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerEdit {
    pub title: String,
    pub description: String,
    pub poster: Option<Upload>,
    pub file: Option<Upload>,
}

impl BannerEdit {
    /// Start from the banner's current values, then apply `key=value` arguments.
    /// Recognised keys: title, description, poster, file (paths relative to `root`).
    pub fn from_args(banner: &Banner, args: &str, root: &Path) -> Result<Self> {
        let mut edit = Self {
            title: banner.title.clone().unwrap_or_default(),
            description: banner.description.clone().unwrap_or_default(),
            poster: None,
            file: None,
        };
        for (key, value) in parse_assignments(args)? {
            match key.as_str() {
                "title" => edit.title = value,
                "description" => edit.description = value,
                "poster" => edit.poster = Some(Upload::from_path(&root.join(value))?),
                "file" => edit.file = Some(Upload::from_path(&root.join(value))?),
                other => return Err(anyhow::anyhow!("Unknown field: {}", other)),
            }
        }
        Ok(edit)
    }

    pub fn form(&self) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text("title", &self.title)
            .text("description", &self.description);
        if let Some(poster) = &self.poster {
            form = form.file("poster", poster.clone());
        }
        if let Some(file) = &self.file {
            form = form.file("file", file.clone());
        }
        form
    }
}

#[derive(Default)]
pub struct BannersView {
    banners: Vec<Banner>,
    pub error: Option<String>,
}

impl BannersView {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn banners(&self) -> &[Banner] {
        &self.banners
    }

    pub fn find(&self, id: &str) -> Option<&Banner> {
        self.banners.iter().find(|b| b.id().as_deref() == Some(id))
    }

    pub fn load(&mut self, api: &dyn AdminApi, token: Option<&str>) {
        let Some(token) = token else {
            self.error = Some("Пользователь не авторизован. Токен отсутствует.".to_string());
            return;
        };

        match api.banners(token) {
            Ok(envelope) => {
                let data = envelope
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("data"))
                    .cloned();
                self.banners = match data {
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .filter_map(|v| serde_json::from_value(v).ok())
                        .collect(),
                    _ => Vec::new(),
                };
                self.error = None;
            }
            Err(e) => {
                let message = api::error_message(&e);
                self.error = Some(if message.is_empty() {
                    "Ошибка при загрузке данных".to_string()
                } else {
                    message
                });
            }
        }
    }

    pub fn delete(&mut self, api: &dyn AdminApi, token: &str, id: &str) -> Outcome {
        match api.delete_banner(token, id) {
            Ok(envelope) if envelope.succeeded(&[200]) => {
                self.banners.retain(|b| b.id().as_deref() != Some(id));
                Outcome::message("Баннер удалён")
            }
            _ => Outcome::message("Ошибка при удалении баннера"),
        }
    }

    /// Submit an edit; the list is reloaded on success
    pub fn update(&mut self, api: &dyn AdminApi, token: &str, id: &str, edit: &BannerEdit) -> Outcome {
        if edit.title.trim().is_empty() {
            return Outcome::message("Название не может быть пустым");
        }

        match api.update_banner(token, id, &edit.form()) {
            Ok(envelope) if envelope.succeeded(&[200]) => {
                self.load(api, Some(token));
                Outcome::message("Баннер обновлён")
            }
            _ => Outcome::message("Ошибка при обновлении баннера"),
        }
    }

    pub fn render(&self, links: &Links) -> String {
        if let Some(err) = &self.error {
            return format!("Ошибка: {}", err);
        }

        let mut out = String::from("Панель MobileApp / Управление блоками\n");
        if self.banners.is_empty() {
            out.push_str("Нет доступных баннеров");
            return out;
        }

        out.push_str("ID | Наименование | Описание | Дата создания | Дата обновления | Изображение\n");
        for b in &self.banners {
            out.push_str(&format!(
                "{} | {} | {} | {} | {} | {}\n",
                b.id().as_deref().unwrap_or(MISSING),
                b.title.as_deref().unwrap_or_default(),
                b.description.as_deref().unwrap_or_default(),
                format_date(b.created_at.as_deref()),
                format_date(b.updated_at.as_deref()),
                image_url(links, b.poster_path.as_deref()),
            ));
        }
        out.truncate(out.trim_end().len());
        out
    }
}
