//! Partner (user) list with search, pagination, detail card and delete.

use super::{field, field_or_missing, profile_from_payload, Outcome, MISSING};
use crate::api::{self, AdminApi, UserQuery};
use crate::session::Profile;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Six or more digits are searched as a phone number
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6,}$").expect("valid regex"));

pub struct PartnersView {
    search: String,
    page: u32,
    size: u32,
    users: Vec<Profile>,
    profile: Option<Profile>,
    pub error: Option<String>,
}

impl PartnersView {
    pub fn new(size: u32) -> Self {
        Self {
            search: String::new(),
            page: 1,
            size: size.max(1),
            users: Vec::new(),
            profile: None,
            error: None,
        }
    }

    #[cfg(test)]
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn users(&self) -> &[Profile] {
        &self.users
    }

    pub fn query(&self) -> UserQuery {
        let term = self.search.trim();
        let (number_phone, full_name) = if term.is_empty() {
            (None, None)
        } else if PHONE_RE.is_match(term) {
            (Some(term.to_string()), None)
        } else {
            (None, Some(term.to_string()))
        };
        UserQuery {
            page: self.page,
            size: self.size,
            number_phone,
            full_name,
        }
    }

    /// Fetch the current page. On failure the previous rows stay on screen.
    pub fn load(&mut self, api: &dyn AdminApi, token: &str) {
        match api.users(token, &self.query()) {
            Ok(envelope) => {
                self.users = match envelope.payload {
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::Object(map) => Some(map),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                self.error = None;
            }
            Err(e) => {
                self.error = Some(format!(
                    "Ошибка загрузки пользователей: {}",
                    api::error_message(&e)
                ));
            }
        }
    }

    /// Fetch the signed-in user's profile for the sidebar
    pub fn load_profile(&mut self, api: &dyn AdminApi, token: &str) {
        self.profile = api
            .profile(token)
            .ok()
            .and_then(|envelope| profile_from_payload(envelope.payload));
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size.max(1);
        self.page = 1;
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    /// Returns false on the first page
    pub fn prev_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    fn find(&self, id: &str) -> Option<&Profile> {
        self.users
            .iter()
            .find(|u| u.get("id").and_then(api::id_string).as_deref() == Some(id))
    }

    /// Detail card for one user
    pub fn detail(&self, id: &str) -> Option<String> {
        let user = self.find(id)?;
        Some(format!(
            "Информация о пользователе:\n\nФ.И.О: {}\nРоль: {}\nТелефон: {}\nАдрес: {}\nИНН: {}\nМенеджер: {}\nID: {}",
            field_or_missing(user, &["Наименование"]),
            field_or_missing(user, &["ВидКонтрагента"]),
            field_or_missing(user, &["Телефон"]),
            field_or_missing(user, &["Адрес", "БизнесРегион"]),
            field_or_missing(user, &["ИНН"]),
            field_or_missing(user, &["МенеджерКонтрагента"]),
            user.get("id").and_then(api::id_string).as_deref().unwrap_or(MISSING),
        ))
    }

    pub fn delete(&mut self, api: &dyn AdminApi, token: &str, id: &str) -> Outcome {
        match api.delete_user(token, id) {
            Ok(()) => {
                self.users
                    .retain(|u| u.get("id").and_then(api::id_string).as_deref() != Some(id));
                Outcome::message("Пользователь удалён")
            }
            Err(_) => Outcome::message("Не удалось удалить пользователя."),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        let name = self
            .profile
            .as_ref()
            .and_then(|p| field(p, "Наименование"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Имя не указано");
        let role = self
            .profile
            .as_ref()
            .and_then(|p| field(p, "ВидКонтрагента"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Роль не указана");
        out.push_str(&format!("[{} | {}]\n", name, role));

        out.push_str("Партнёры");
        if !self.search.trim().is_empty() {
            out.push_str(&format!(" (поиск: {})", self.search.trim()));
        }
        out.push('\n');

        if let Some(err) = &self.error {
            out.push_str(&format!("{}\n", err));
        }

        out.push_str("№ | Ф.И.О | КонтрАгент | Адрес | Телефон | Менеджер | ID\n");
        let offset = (self.page.saturating_sub(1) as usize) * self.size as usize;
        for (i, u) in self.users.iter().enumerate() {
            out.push_str(&format!(
                "{} | {} | {} | {} | {} | {} | {}\n",
                offset + i + 1,
                field_or_missing(u, &["Наименование"]),
                field_or_missing(u, &["ВидКонтрагента"]),
                field_or_missing(u, &["БизнесРегион", "Адрес"]),
                field_or_missing(u, &["Телефон"]),
                field_or_missing(u, &["МенеджерКонтрагента"]),
                u.get("id").and_then(api::id_string).as_deref().unwrap_or(MISSING),
            ));
        }
        out.push_str(&format!("Страница {}", self.page));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::Envelope;
    use serde_json::json;

    fn users_payload() -> Envelope {
        Envelope::with_payload(
            200,
            json!([
                {"id": 1, "Наименование": "Аптека №1", "ВидКонтрагента": "клиент", "Адрес": "Худжанд", "Телефон": "992900000001"},
                {"id": "u-2", "Наименование": "", "БизнесРегион": "Душанбе", "Адрес": "ул. Рудаки"},
            ]),
        )
    }

    #[test]
    fn test_query_phone_vs_name() {
        let mut view = PartnersView::new(7);
        assert_eq!(view.query().pairs().len(), 2);

        view.set_search("  992900 ");
        assert_eq!(view.query().number_phone.as_deref(), Some("992900"));
        assert!(view.query().full_name.is_none());

        view.set_search("12345");
        assert_eq!(view.query().full_name.as_deref(), Some("12345"));

        view.set_search("Саидов");
        assert_eq!(view.query().full_name.as_deref(), Some("Саидов"));
    }

    #[test]
    fn test_search_resets_page() {
        let mut view = PartnersView::new(7);
        view.next_page();
        view.next_page();
        assert_eq!(view.page(), 3);
        view.set_search("x");
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_prev_refused_on_first_page() {
        let mut view = PartnersView::new(7);
        assert!(!view.prev_page());
        view.next_page();
        assert!(view.prev_page());
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_load_and_render_rows() {
        let api = MockApi::new();
        api.respond("users", users_payload());

        let mut view = PartnersView::new(7);
        view.next_page();
        view.load(&api, "tok");

        assert_eq!(api.called("users"), vec!["page=2&size=7".to_string()]);
        assert_eq!(view.users().len(), 2);

        let screen = view.render();
        assert!(screen.contains("8 | Аптека №1 | клиент | Худжанд"));
        assert!(screen.contains("9 | — | — | Душанбе"));
        assert!(screen.contains("Имя не указано"));
        assert!(screen.contains("Страница 2"));
    }

    #[test]
    fn test_non_array_payload_is_empty() {
        let api = MockApi::new();
        api.respond("users", Envelope::with_payload(200, json!({"data": []})));
        let mut view = PartnersView::new(7);
        view.load(&api, "tok");
        assert!(view.users().is_empty());
    }

    #[test]
    fn test_load_failure_keeps_rows() {
        let api = MockApi::new();
        api.respond("users", users_payload());
        api.fail("users", "down");

        let mut view = PartnersView::new(7);
        view.load(&api, "tok");
        view.load(&api, "tok");
        assert_eq!(view.users().len(), 2);
        assert!(view.error.as_deref().unwrap().contains("down"));
    }

    #[test]
    fn test_profile_from_array_payload() {
        let api = MockApi::new();
        api.respond(
            "profile",
            Envelope::with_payload(200, json!([{"Наименование": " Админ ", "ВидКонтрагента": "admin"}])),
        );
        let mut view = PartnersView::new(7);
        view.load_profile(&api, "tok");
        assert!(view.render().starts_with("[Админ | admin]"));
    }

    #[test]
    fn test_detail_card() {
        let api = MockApi::new();
        api.respond("users", users_payload());
        let mut view = PartnersView::new(7);
        view.load(&api, "tok");

        let card = view.detail("u-2").unwrap();
        assert!(card.contains("Ф.И.О: —"));
        assert!(card.contains("Адрес: ул. Рудаки"));
        assert!(card.contains("ID: u-2"));
        assert!(view.detail("404").is_none());
    }

    #[test]
    fn test_delete_removes_row_on_success() {
        let api = MockApi::new();
        api.respond("users", users_payload());
        let mut view = PartnersView::new(7);
        view.load(&api, "tok");

        view.delete(&api, "tok", "1");
        assert_eq!(api.called("delete_user"), vec!["1".to_string()]);
        assert_eq!(view.users().len(), 1);

        api.fail("delete_user", "nope");
        let outcome = view.delete(&api, "tok", "u-2");
        assert_eq!(outcome.message.as_deref(), Some("Не удалось удалить пользователя."));
        assert_eq!(view.users().len(), 1);
    }
}
