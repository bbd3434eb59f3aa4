//! New banner form.

use super::{parse_assignments, Links, Outcome};
use crate::api::{self, AdminApi};
use crate::multipart::{MultipartForm, Upload};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Where the console goes after a banner is saved or the form is cancelled
pub const AFTER_SAVE_PATH: &str = "/mobile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBannerView {
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub poster: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub message: Option<String>,
    /// Link to the uploaded poster reported by the last successful save
    pub poster_url: Option<String>,
}

impl Default for AddBannerView {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            is_active: true,
            poster: None,
            file: None,
            message: None,
            poster_url: None,
        }
    }
}

impl AddBannerView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update form fields from `key=value` arguments.
    /// Keys: title, description, active (true/false), poster, file.
    pub fn set(&mut self, args: &str, root: &Path) -> Result<()> {
        for (key, value) in parse_assignments(args)? {
            match key.as_str() {
                "title" => self.title = value,
                "description" => self.description = value,
                "active" | "is_active" => {
                    self.is_active = match value.to_lowercase().as_str() {
                        "true" | "yes" | "да" | "1" => true,
                        "false" | "no" | "нет" | "0" => false,
                        other => return Err(anyhow::anyhow!("Invalid active value: {}", other)),
                    }
                }
                "poster" => self.poster = Some(root.join(value)),
                "file" => self.file = Some(root.join(value)),
                other => return Err(anyhow::anyhow!("Unknown field: {}", other)),
            }
        }
        Ok(())
    }

    fn form(&self, poster: Upload, file: Upload) -> MultipartForm {
        MultipartForm::new()
            .text("title", self.title.trim())
            .text("description", self.description.trim())
            .text("is_active", if self.is_active { "true" } else { "false" })
            .file("poster", poster)
            .file("file", file)
    }

    /// Validate and submit the form
    pub fn save(&mut self, api: &dyn AdminApi, token: &str, links: &Links) -> Outcome {
        let outcome = self.submit(api, token, links);
        self.message = outcome.message.clone();
        outcome
    }

    fn submit(&mut self, api: &dyn AdminApi, token: &str, links: &Links) -> Outcome {
        if self.title.trim().is_empty() {
            return Outcome::message("Введите название баннера");
        }

        let (Some(poster_path), Some(file_path)) = (&self.poster, &self.file) else {
            return Outcome::message("Загрузите оба файла (poster и file)");
        };

        let uploads = Upload::from_path(poster_path).and_then(|poster| {
            Upload::from_path(file_path).map(|file| (poster, file))
        });
        let (poster, file) = match uploads {
            Ok(pair) => pair,
            Err(e) => return Outcome::message(e.to_string()),
        };

        match api.create_banner(token, &self.form(poster, file)) {
            Ok(envelope) if matches!(envelope.code, Some(200 | 201)) => {
                self.poster_url = envelope
                    .payload
                    .as_ref()
                    .and_then(|p| p.get("data"))
                    .and_then(|d| d.get("poster_path"))
                    .and_then(|p| p.as_str())
                    .map(|p| format!("{}/files/{}", links.api_base, p));
                Outcome {
                    message: Some("Баннер успешно добавлен".to_string()),
                    navigate: Some(AFTER_SAVE_PATH.to_string()),
                }
            }
            Ok(_) => Outcome::message("Ошибка при добавлении баннера"),
            Err(e) => {
                let message = api::error_message(&e);
                Outcome::message(if message.is_empty() {
                    "Ошибка при добавлении баннера".to_string()
                } else {
                    message
                })
            }
        }
    }

    pub fn render(&self) -> String {
        let file_status = |p: &Option<PathBuf>| match p {
            Some(path) => format!(
                "Выбран: {}",
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default()
            ),
            None => "Файл не выбран".to_string(),
        };

        let mut out = String::from("PanelMobil / Управление баннерами\nДобавление баннера\n");
        out.push_str(&format!("Наименование: {}\n", self.title));
        out.push_str(&format!("Описание: {}\n", self.description));
        out.push_str(&format!(
            "Активен ли баннер: {}\n",
            if self.is_active { "Да" } else { "Нет" }
        ));
        out.push_str(&format!("Постер: {}\n", file_status(&self.poster)));
        out.push_str(&format!("Основной файл: {}", file_status(&self.file)));
        if let Some(message) = &self.message {
            out.push_str(&format!("\n{}", message));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::Envelope;
    use serde_json::json;
    use tempfile::TempDir;

    fn links() -> Links {
        Links {
            api_base: "http://api.test:1212/api/v1".to_string(),
            uploads_host: "http://api.test:1212".to_string(),
        }
    }

    fn filled(dir: &TempDir) -> AddBannerView {
        std::fs::write(dir.path().join("poster.png"), b"img").unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"pdf").unwrap();
        let mut view = AddBannerView::new();
        view.set(
            r#"title="  Новинки " description=" Весна " active=нет poster=poster.png file=doc.pdf"#,
            dir.path(),
        )
        .unwrap();
        view
    }

    #[test]
    fn test_title_required() {
        let api = MockApi::new();
        let mut view = AddBannerView::new();
        let outcome = view.save(&api, "tok", &links());
        assert_eq!(outcome.message.as_deref(), Some("Введите название баннера"));
        assert!(outcome.navigate.is_none());
    }

    #[test]
    fn test_both_files_required() {
        let api = MockApi::new();
        let mut view = AddBannerView::new();
        view.set("title=X poster=a.png", Path::new(".")).unwrap();
        let outcome = view.save(&api, "tok", &links());
        assert_eq!(outcome.message.as_deref(), Some("Загрузите оба файла (poster и file)"));
        assert!(api.called("create_banner").is_empty());
    }

    #[test]
    fn test_successful_save_navigates() {
        let dir = TempDir::new().unwrap();
        let api = MockApi::new();
        api.respond(
            "create_banner",
            Envelope::with_payload(201, json!({"data": {"poster_path": "p/1.png"}})),
        );

        let mut view = filled(&dir);
        let outcome = view.save(&api, "tok", &links());

        assert_eq!(outcome.message.as_deref(), Some("Баннер успешно добавлен"));
        assert_eq!(outcome.navigate.as_deref(), Some(AFTER_SAVE_PATH));
        assert_eq!(
            view.poster_url.as_deref(),
            Some("http://api.test:1212/api/v1/files/p/1.png")
        );

        let forms = api.forms.borrow();
        let form = &forms[0];
        assert_eq!(
            form.field_names(),
            vec!["title", "description", "is_active", "poster", "file"]
        );
        assert_eq!(form.text_value("title"), Some("Новинки"));
        assert_eq!(form.text_value("description"), Some("Весна"));
        assert_eq!(form.text_value("is_active"), Some("false"));
    }

    #[test]
    fn test_unexpected_code_is_error() {
        let dir = TempDir::new().unwrap();
        let api = MockApi::new();
        api.respond("create_banner", Envelope::with_code(400));
        let mut view = filled(&dir);
        let outcome = view.save(&api, "tok", &links());
        assert_eq!(outcome.message.as_deref(), Some("Ошибка при добавлении баннера"));
        assert!(outcome.navigate.is_none());
    }

    #[test]
    fn test_api_failure_message_shown() {
        let dir = TempDir::new().unwrap();
        let api = MockApi::new();
        api.fail("create_banner", "Файл слишком большой");
        let mut view = filled(&dir);
        view.save(&api, "tok", &links());
        assert!(view.render().ends_with("Файл слишком большой"));
    }

    #[test]
    fn test_render_file_status() {
        let mut view = AddBannerView::new();
        assert!(view.render().contains("Постер: Файл не выбран"));
        view.set("poster=img/a.png", Path::new("/tmp")).unwrap();
        assert!(view.render().contains("Постер: Выбран: a.png"));
        assert!(view.set("active=maybe", Path::new(".")).is_err());
    }
}
