//! Role-based route table.
//!
//! Routes are registered as an ordered list of branches. Each branch has a predicate over
//! the resolved role and authentication state, plus an ordered list of entries. Resolution
//! walks the branches top to bottom, skipping branches whose predicate is false, and the
//! first entry whose pattern matches the path wins. Later branches may register a path an
//! earlier branch already claimed; the earlier registration shadows it.
//!
//! A matched route is passed through the access gate before it renders.

use crate::gate::{self, GateDecision, LOGIN_PATH};
use crate::role::Role;
use std::collections::BTreeMap;

/// Maximum number of redirects followed for a single navigation
const MAX_REDIRECTS: usize = 8;

/// Screens the console can render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
    RoleAndRoot,
    AddEmployee,
    Statistics,
    AddCategory,
    AddBlock,
    ListOfBlocks,
    Partner,
    MobileApp,
    Calls,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Вход",
            Self::Dashboard => "Статистика",
            Self::RoleAndRoot => "Роли и права",
            Self::AddEmployee => "Добавление сотрудника",
            Self::Statistics => "Детальная статистика",
            Self::AddCategory => "Добавление категории",
            Self::AddBlock => "Добавление баннера",
            Self::ListOfBlocks => "Управление блоками",
            Self::Partner => "Партнёры",
            Self::MobileApp => "Панель MobileApp",
            Self::Calls => "Журнал звонков",
        }
    }
}

/// Who may render a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Roles(Vec<Role>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub path: &'static str,
    pub access: Access,
    pub view: View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Route(RouteRule),
    /// Matches any path and redirects
    Wildcard { redirect_to: &'static str },
}

/// A predicate and the routes it registers
pub struct Branch {
    pub name: &'static str,
    predicate: fn(&Role, bool) -> bool,
    entries: fn(&Role) -> Vec<Entry>,
}

impl Branch {
    pub fn applies(&self, role: &Role, authenticated: bool) -> bool {
        (self.predicate)(role, authenticated)
    }

    pub fn entries(&self, role: &Role) -> Vec<Entry> {
        (self.entries)(role)
    }
}

fn guarded(path: &'static str, view: View, roles: &[Role]) -> Entry {
    Entry::Route(RouteRule {
        path,
        access: Access::Roles(roles.to_vec()),
        view,
    })
}

fn login_entries(_: &Role) -> Vec<Entry> {
    vec![Entry::Route(RouteRule {
        path: LOGIN_PATH,
        access: Access::Public,
        view: View::Login,
    })]
}

fn moderator_entries(_: &Role) -> Vec<Entry> {
    let roles = [Role::Moderator];
    vec![
        guarded("/mobile", View::MobileApp, &roles),
        guarded("/calls", View::Calls, &roles),
        guarded("/add-category", View::AddCategory, &roles),
        guarded("/add-block", View::AddBlock, &roles),
        guarded("/list-of-blocks", View::ListOfBlocks, &roles),
        Entry::Wildcard {
            redirect_to: "/mobile",
        },
    ]
}

fn admin_entries(_: &Role) -> Vec<Entry> {
    let roles = [Role::Admin];
    vec![
        guarded("/dashboard", View::Dashboard, &roles),
        guarded("/RoleAndRoot", View::RoleAndRoot, &roles),
        guarded("/RoleAndRoot/add-employee", View::AddEmployee, &roles),
        guarded("/statistics/:type", View::Statistics, &roles),
        guarded("/add-category", View::AddCategory, &roles),
        guarded("/add-block", View::AddBlock, &roles),
        guarded("/list-of-blocks", View::ListOfBlocks, &roles),
        guarded("/Partner", View::Partner, &roles),
        guarded("/mobile", View::MobileApp, &roles),
        guarded("/calls", View::Calls, &roles),
    ]
}

/// Routes for any other named role. Each route admits exactly the caller's own role.
fn generic_entries(role: &Role) -> Vec<Entry> {
    let roles = [role.clone()];
    vec![
        guarded("/dashboard", View::Dashboard, &roles),
        guarded("/RoleAndRoot", View::RoleAndRoot, &roles),
        guarded("/RoleAndRoot/add-employee", View::AddEmployee, &roles),
        guarded("/statistics/:type", View::Statistics, &roles),
        guarded("/list-of-blocks", View::ListOfBlocks, &roles),
        guarded("/Partner", View::Partner, &roles),
        Entry::Wildcard {
            redirect_to: "/dashboard",
        },
    ]
}

fn always(_: &Role, _: bool) -> bool {
    true
}

fn is_moderator(role: &Role, _: bool) -> bool {
    *role == Role::Moderator
}

fn is_admin(role: &Role, _: bool) -> bool {
    *role == Role::Admin
}

fn is_other_signed_in(role: &Role, authenticated: bool) -> bool {
    authenticated && matches!(role, Role::Other(_))
}

fn is_client_signed_in(role: &Role, authenticated: bool) -> bool {
    authenticated && *role == Role::Client
}

fn is_anonymous(role: &Role, authenticated: bool) -> bool {
    !authenticated || *role == Role::Unknown
}

fn back_to_login(_: &Role) -> Vec<Entry> {
    vec![Entry::Wildcard {
        redirect_to: LOGIN_PATH,
    }]
}

/// The route table, in evaluation order
pub static BRANCHES: &[Branch] = &[
    Branch {
        name: "login",
        predicate: always,
        entries: login_entries,
    },
    Branch {
        name: "moderator",
        predicate: is_moderator,
        entries: moderator_entries,
    },
    Branch {
        name: "admin",
        predicate: is_admin,
        entries: admin_entries,
    },
    Branch {
        name: "generic",
        predicate: is_other_signed_in,
        entries: generic_entries,
    },
    Branch {
        name: "client",
        predicate: is_client_signed_in,
        entries: back_to_login,
    },
    Branch {
        name: "anonymous",
        predicate: is_anonymous,
        entries: back_to_login,
    },
];

pub type Params = BTreeMap<String, String>;

/// Outcome of resolving one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Session not initialised yet: render nothing
    Loading,
    Render {
        view: View,
        params: Params,
        branch: &'static str,
    },
    Redirect {
        to: String,
        branch: &'static str,
    },
    NotFound,
}

/// Match `path` against a route pattern (`/a/:param`), returning captured parameters.
pub fn match_path(pattern: &str, path: &str) -> Option<Params> {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = Params::new();
    for (pat, seg) in pattern_segments.iter().zip(path_segments.iter()) {
        if let Some(name) = pat.strip_prefix(':') {
            params.insert(name.to_string(), seg.to_string());
        } else if !pat.eq_ignore_ascii_case(seg) {
            return None;
        }
    }
    Some(params)
}

/// Resolve a single path for the given role; redirects are not followed.
pub fn resolve(path: &str, role: &Role, authenticated: bool) -> Resolution {
    for branch in BRANCHES.iter().filter(|b| b.applies(role, authenticated)) {
        for entry in branch.entries(role) {
            match entry {
                Entry::Route(rule) => {
                    let Some(params) = match_path(rule.path, path) else {
                        continue;
                    };
                    let decision = match &rule.access {
                        Access::Public => GateDecision::Allow,
                        Access::Roles(required) => gate::guard(required, role, authenticated),
                    };
                    return match decision {
                        GateDecision::Allow => Resolution::Render {
                            view: rule.view,
                            params,
                            branch: branch.name,
                        },
                        GateDecision::Redirect(to) => Resolution::Redirect {
                            to,
                            branch: branch.name,
                        },
                    };
                }
                Entry::Wildcard { redirect_to } => {
                    return Resolution::Redirect {
                        to: redirect_to.to_string(),
                        branch: branch.name,
                    };
                }
            }
        }
    }
    Resolution::NotFound
}

/// Where a navigation ended up after following redirects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub resolution: Resolution,
    /// Paths visited before the final one
    pub redirected_from: Vec<String>,
}

/// Resolve `path`, following redirects until a view renders or nothing matches.
pub fn navigate(path: &str, role: &Role, authenticated: bool, loading: bool) -> Navigation {
    let mut current = path.to_string();
    let mut redirected_from = Vec::new();

    if loading {
        return Navigation {
            path: current,
            resolution: Resolution::Loading,
            redirected_from,
        };
    }

    loop {
        let resolution = resolve(&current, role, authenticated);
        match &resolution {
            Resolution::Redirect { to, .. }
                if *to != current && redirected_from.len() < MAX_REDIRECTS =>
            {
                redirected_from.push(std::mem::replace(&mut current, to.clone()));
            }
            _ => {
                return Navigation {
                    path: current,
                    resolution,
                    redirected_from,
                }
            }
        }
    }
}

/// Protected route patterns the role can render, in registration order.
/// A pattern already registered by an earlier branch is not listed again.
pub fn reachable_paths(role: &Role, authenticated: bool) -> Vec<&'static str> {
    let mut seen = Vec::new();
    let mut reachable = Vec::new();

    for branch in BRANCHES.iter().filter(|b| b.applies(role, authenticated)) {
        for entry in branch.entries(role) {
            let Entry::Route(rule) = entry else {
                continue;
            };
            if seen.contains(&rule.path) {
                continue;
            }
            seen.push(rule.path);
            if let Access::Roles(required) = &rule.access {
                if gate::guard(required, role, authenticated) == GateDecision::Allow {
                    reachable.push(rule.path);
                }
            }
        }
    }
    reachable
}
