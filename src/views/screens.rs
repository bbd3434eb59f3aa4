//! Screens without API interaction: login and the informational pages.

use super::field;
use crate::role::Role;
use crate::routes::{self, Params, View};
use crate::session::Profile;

/// Sidebar entry for each reachable route pattern
pub fn sidebar(role: &Role, authenticated: bool) -> Vec<String> {
    routes::reachable_paths(role, authenticated)
        .into_iter()
        .filter_map(|pattern| {
            routes::BRANCHES
                .iter()
                .filter(|b| b.applies(role, authenticated))
                .flat_map(|b| b.entries(role))
                .find_map(|entry| match entry {
                    routes::Entry::Route(rule) if rule.path == pattern => {
                        Some(format!("{:<28} {}", pattern, rule.view.title()))
                    }
                    _ => None,
                })
        })
        .collect()
}

pub fn render_login(authenticated: bool, role: &Role) -> String {
    let mut out = String::from("Вход\n");
    if authenticated && *role == Role::Client {
        out.push_str("Клиенты не имеют доступа к панели администратора.\n");
    }
    out.push_str("Use /login <token> [profile-json] to sign in.");
    out
}

pub fn render_static(
    view: View,
    params: &Params,
    profile: Option<&Profile>,
    role: &Role,
    authenticated: bool,
) -> String {
    let mut out = String::new();

    let name = profile
        .and_then(|p| field(p, "Наименование"))
        .unwrap_or("Имя не указано");
    out.push_str(&format!("[{} | {}]\n", name.trim(), role));

    out.push_str(view.title());
    if let Some(kind) = params.get("type") {
        out.push_str(&format!(": {}", kind));
    }
    out.push('\n');

    let entries = sidebar(role, authenticated);
    if !entries.is_empty() {
        out.push_str("\nМеню:\n");
        for entry in entries {
            out.push_str(&format!("  {}\n", entry));
        }
    }
    out.truncate(out.trim_end().len());
    out
}
