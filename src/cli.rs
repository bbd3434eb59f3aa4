use crate::{
    api::AdminApi,
    config::Config,
    gate,
    role::{self, Role},
    routes::{self, Params, Resolution, View},
    session::SessionStore,
    transcript::Transcript,
    views::{
        add_banner::{self, AddBannerView},
        banners::{BannerEdit, BannersView},
        partners::PartnersView,
        profile_from_payload, screens, Links, Outcome,
    },
    Args,
};
use anyhow::{anyhow, Context as _, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;

/// Path opened after a successful `/login`
const HOME_PATH: &str = "/dashboard";

/// What the console is currently showing
pub enum Screen {
    Blank,
    Login,
    Static(View, Params),
    Partners(PartnersView),
    Banners(BannersView),
    AddBanner(AddBannerView),
}

impl Screen {
    fn name(&self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::Login => "login",
            Self::Static(..) => "static",
            Self::Partners(_) => "partners",
            Self::Banners(_) => "banners",
            Self::AddBanner(_) => "add_banner",
        }
    }
}

pub struct Context {
    pub args: Args,
    pub root: PathBuf,
    pub config: Config,
    pub session: RefCell<SessionStore>,
    pub api: Box<dyn AdminApi>,
    pub transcript: RefCell<Transcript>,
    pub session_id: String,
    pub tracing: RefCell<bool>,
    /// False in one-shot mode: confirmations are not asked
    pub interactive: bool,
    pub path: RefCell<String>,
    pub screen: RefCell<Screen>,
}

fn trace(ctx: &Context, label: &str, content: &str) {
    if *ctx.tracing.borrow() {
        eprintln!("[TRACE:{}] {}", label, content);
    }
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

impl Context {
    fn role(&self) -> Role {
        role::resolve(self.session.borrow().user())
    }

    fn token(&self) -> Option<String> {
        self.session.borrow().token().map(str::to_string)
    }

    fn links(&self) -> Links {
        Links {
            api_base: self.config.api.base_url().trim_end_matches('/').to_string(),
            uploads_host: self.config.api.uploads_host(),
        }
    }

    /// Move storage warnings from the session into the transcript
    pub fn flush_warnings(&self) {
        let warnings = self.session.borrow_mut().take_warnings();
        for warning in warnings {
            let _ = self.transcript.borrow_mut().storage_warning(&warning);
        }
    }
}

/// Ask before a destructive action
fn confirm(ctx: &Context, question: &str) -> bool {
    if ctx.args.yes {
        return true;
    }

    if !ctx.interactive {
        eprintln!("Not confirmed: {} - use --yes in one-shot mode", question);
        return false;
    }

    print!("{} [y/N]: ", question);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        input == "y" || input == "yes" || input == "д" || input == "да"
    } else {
        false
    }
}

fn require_token(token: Option<&str>) -> Result<&str> {
    token.ok_or_else(|| anyhow!("Пользователь не авторизован. Токен отсутствует."))
}

fn note_error(ctx: &Context, view: &str, error: Option<&String>) {
    if let Some(error) = error {
        let _ = ctx.transcript.borrow_mut().api_error(view, error);
    }
}

/// Resolve `path` for the current session and show the resulting screen
pub fn open_path(ctx: &Context, path: &str) {
    let role = ctx.role();
    let (authenticated, loading) = {
        let session = ctx.session.borrow();
        (session.is_authenticated(), session.is_loading())
    };

    let nav = routes::navigate(path, &role, authenticated, loading);
    for from in &nav.redirected_from {
        trace(ctx, "route", &format!("redirect from {}", from));
    }

    let label = match &nav.resolution {
        Resolution::Loading => "loading",
        Resolution::Render { .. } => "render",
        Resolution::Redirect { .. } => "redirect_loop",
        Resolution::NotFound => "not_found",
    };
    trace(
        ctx,
        "route",
        &format!("{} -> {} ({}, role {})", path, nav.path, label, role),
    );
    let _ = ctx.transcript.borrow_mut().navigation(
        path,
        &nav.path,
        label,
        role.as_str(),
        authenticated,
    );

    *ctx.path.borrow_mut() = nav.path.clone();

    let screen = match nav.resolution {
        Resolution::Loading => Screen::Blank,
        Resolution::NotFound => {
            println!("Страница не найдена: {}", nav.path);
            Screen::Blank
        }
        Resolution::Redirect { to, .. } => {
            eprintln!("Too many redirects: {} -> {}", path, to);
            Screen::Blank
        }
        Resolution::Render { view, params, .. } => build_screen(ctx, view, params),
    };
    *ctx.screen.borrow_mut() = screen;

    show(ctx);
}

fn build_screen(ctx: &Context, view: View, params: Params) -> Screen {
    let token = ctx.token();

    match view {
        View::Login => Screen::Login,
        View::Partner => {
            let mut partners = PartnersView::new(ctx.config.partners.page_size());
            if let Some(token) = &token {
                partners.load_profile(ctx.api.as_ref(), token);
                partners.load(ctx.api.as_ref(), token);
            }
            note_error(ctx, "partners", partners.error.as_ref());
            Screen::Partners(partners)
        }
        View::ListOfBlocks => {
            let mut banners = BannersView::new();
            banners.load(ctx.api.as_ref(), token.as_deref());
            note_error(ctx, "banners", banners.error.as_ref());
            Screen::Banners(banners)
        }
        View::AddBlock => Screen::AddBanner(AddBannerView::new()),
        view => Screen::Static(view, params),
    }
}

/// Print the current screen
fn show(ctx: &Context) {
    let role = ctx.role();
    let session = ctx.session.borrow();
    let authenticated = session.is_authenticated();

    let text = match &*ctx.screen.borrow() {
        Screen::Blank => return,
        Screen::Login => screens::render_login(authenticated, &role),
        Screen::Static(view, params) => {
            screens::render_static(*view, params, session.user(), &role, authenticated)
        }
        Screen::Partners(view) => view.render(),
        Screen::Banners(view) => view.render(&ctx.links()),
        Screen::AddBanner(view) => view.render(),
    };
    println!("{}", text);
}

/// Run a single console line. Returns true when the console should exit.
pub fn execute(ctx: &Context, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    if line.starts_with('/') {
        return handle_command(ctx, line);
    }

    if let Err(e) = handle_action(ctx, line) {
        eprintln!("Error: {}", e);
    }
    false
}

pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    execute(ctx, line);
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("dusti-admin - type /help for commands, /exit to quit");

    loop {
        let prompt = format!("{}> ", ctx.path.borrow());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if execute(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn handle_command(ctx: &Context, cmd: &str) -> bool {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    let rest = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match parts[0] {
        "/exit" | "/quit" => return true,
        "/help" => print_help(),
        "/session" => {
            println!("Session: {}", ctx.session_id);
            println!("Transcript: {:?}", ctx.transcript.borrow().path);
            println!("API: {}", ctx.config.api.base_url());
        }
        "/whoami" => {
            let session = ctx.session.borrow();
            let name = session
                .user()
                .and_then(|p| crate::views::field(p, "Наименование"))
                .unwrap_or("Имя не указано");
            println!("Name: {}", name.trim());
            println!("Role: {}", ctx.role());
            println!("Authenticated: {}", session.is_authenticated());
            println!("Path: {}", ctx.path.borrow());
        }
        "/login" => {
            if let Err(e) = login(ctx, rest) {
                eprintln!("Error: {}", e);
            }
        }
        "/logout" => logout(ctx),
        "/routes" => {
            let session = ctx.session.borrow();
            let entries = screens::sidebar(&ctx.role(), session.is_authenticated());
            if entries.is_empty() {
                println!("No routes available. Use /login to sign in.");
            } else {
                for entry in entries {
                    println!("  {}", entry);
                }
            }
        }
        "/trace" => {
            let mut t = ctx.tracing.borrow_mut();
            *t = !*t;
            println!("Tracing: {}", if *t { "on" } else { "off" });
        }
        _ => println!("Unknown command: {}", parts[0]),
    }
    false
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                        - quit");
    println!("  /help                        - show commands");
    println!("  /session                     - show session info");
    println!("  /whoami                      - show the signed-in user and role");
    println!("  /login <token> [profile-json] - sign in (profile fetched when omitted)");
    println!("  /logout                      - sign out");
    println!("  /routes                      - list pages available to you");
    println!("  /trace                       - toggle tracing");
    println!("Navigation:");
    println!("  open <path>                  - open a page, e.g. open /Partner");
    println!("  refresh                      - reload the current page");
    println!("Partners (/Partner):");
    println!("  search [text]                - search by phone (6+ digits) or name");
    println!("  next | prev | size <n>       - paging");
    println!("  view <id> | delete <id>      - show or delete a user");
    println!("Banners (/list-of-blocks):");
    println!("  delete <id>");
    println!("  edit <id> title=.. [description=..] [poster=path] [file=path]");
    println!("Add banner (/add-block):");
    println!("  set title=.. description=.. active=true|false poster=path file=path");
    println!("  save | cancel");
}

fn login(ctx: &Context, args: &str) -> Result<()> {
    let (token, profile_json) = match args.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (args, ""),
    };
    if token.is_empty() {
        return Err(anyhow!("Usage: /login <token> [profile-json]"));
    }

    let profile = if profile_json.is_empty() {
        let envelope = ctx
            .api
            .profile(token)
            .context("Не удалось получить профиль")?;
        profile_from_payload(envelope.payload)
            .ok_or_else(|| anyhow!("Не удалось получить профиль"))?
    } else {
        let value: serde_json::Value =
            serde_json::from_str(profile_json).context("Invalid profile JSON")?;
        profile_from_payload(Some(value))
            .ok_or_else(|| anyhow!("Profile must be a JSON object"))?
    };

    ctx.session.borrow_mut().login(profile, token);
    ctx.flush_warnings();

    let role = ctx.role();
    verbose(ctx, &format!("Signed in as {}", role));
    let _ = ctx.transcript.borrow_mut().login(role.as_str());

    open_path(ctx, HOME_PATH);
    Ok(())
}

fn logout(ctx: &Context) {
    ctx.session.borrow_mut().logout();
    ctx.flush_warnings();
    let _ = ctx.transcript.borrow_mut().logout();
    open_path(ctx, gate::LOGIN_PATH);
}

fn handle_action(ctx: &Context, line: &str) -> Result<()> {
    let (action, args) = match line.split_once(char::is_whitespace) {
        Some((action, rest)) => (action, rest.trim()),
        None => (line, ""),
    };

    match action {
        "open" => {
            if args.is_empty() {
                return Err(anyhow!("Usage: open <path>"));
            }
            open_path(ctx, args);
        }
        "refresh" => {
            let path = ctx.path.borrow().clone();
            open_path(ctx, &path);
        }
        "logout" => logout(ctx),
        _ => screen_action(ctx, action, args)?,
    }
    Ok(())
}

fn screen_action(ctx: &Context, action: &str, args: &str) -> Result<()> {
    let token = ctx.token();
    let token = token.as_deref();

    let (view_name, outcome) = {
        let mut screen = ctx.screen.borrow_mut();
        let view_name = screen.name();
        let outcome = match &mut *screen {
            Screen::Partners(view) => partners_action(ctx, view, token, action, args)?,
            Screen::Banners(view) => banners_action(ctx, view, token, action, args)?,
            Screen::AddBanner(view) => add_banner_action(ctx, view, token, action, args)?,
            _ => {
                return Err(anyhow!(
                    "Unknown action '{}' on this page (type /help)",
                    action
                ))
            }
        };
        (view_name, outcome)
    };

    let Some(outcome) = outcome else {
        return Ok(());
    };

    let _ = ctx
        .transcript
        .borrow_mut()
        .action(view_name, action, outcome.message.as_deref());

    match &outcome.navigate {
        Some(path) => {
            if let Some(message) = &outcome.message {
                println!("{}", message);
            }
            open_path(ctx, path);
        }
        None => {
            show(ctx);
            if let Some(message) = &outcome.message {
                println!("{}", message);
            }
        }
    }
    Ok(())
}

/// `None` means the action printed its own output
fn partners_action(
    ctx: &Context,
    view: &mut PartnersView,
    token: Option<&str>,
    action: &str,
    args: &str,
) -> Result<Option<Outcome>> {
    let api = ctx.api.as_ref();

    match action {
        "search" => view.set_search(args),
        "next" => view.next_page(),
        "prev" => {
            if !view.prev_page() {
                return Ok(Some(Outcome::message("Это первая страница")));
            }
        }
        "size" => {
            let size: u32 = args.parse().context("Usage: size <n>")?;
            view.set_size(size);
        }
        "view" => {
            match view.detail(args) {
                Some(card) => println!("{}", card),
                None => println!("Пользователь {} не найден", args),
            }
            return Ok(None);
        }
        "delete" => {
            if args.is_empty() {
                return Err(anyhow!("Usage: delete <id>"));
            }
            if !confirm(ctx, &format!("Удалить пользователя {}?", args)) {
                return Ok(Some(Outcome::message("Удаление отменено")));
            }
            return Ok(Some(view.delete(api, require_token(token)?, args)));
        }
        _ => return Err(anyhow!("Unknown action '{}' on this page (type /help)", action)),
    }

    view.load(api, require_token(token)?);
    note_error(ctx, "partners", view.error.as_ref());
    Ok(Some(Outcome::none()))
}

fn banners_action(
    ctx: &Context,
    view: &mut BannersView,
    token: Option<&str>,
    action: &str,
    args: &str,
) -> Result<Option<Outcome>> {
    let api = ctx.api.as_ref();

    let outcome = match action {
        "delete" => {
            if args.is_empty() {
                return Err(anyhow!("Usage: delete <id>"));
            }
            if !confirm(ctx, &format!("Удалить баннер {}?", args)) {
                return Ok(Some(Outcome::message("Удаление отменено")));
            }
            view.delete(api, require_token(token)?, args)
        }
        "edit" => {
            let (id, fields) = match args.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, rest.trim()),
                None => (args, ""),
            };
            let banner = view
                .find(id)
                .ok_or_else(|| anyhow!("Баннер {} не найден", id))?;
            let edit = BannerEdit::from_args(banner, fields, &ctx.root)?;
            let outcome = view.update(api, require_token(token)?, id, &edit);
            note_error(ctx, "banners", view.error.as_ref());
            outcome
        }
        _ => return Err(anyhow!("Unknown action '{}' on this page (type /help)", action)),
    };
    Ok(Some(outcome))
}

fn add_banner_action(
    ctx: &Context,
    view: &mut AddBannerView,
    token: Option<&str>,
    action: &str,
    args: &str,
) -> Result<Option<Outcome>> {
    let outcome = match action {
        "set" => {
            view.set(args, &ctx.root)?;
            Outcome::none()
        }
        "save" => {
            let outcome = view.save(ctx.api.as_ref(), require_token(token)?, &ctx.links());
            if let Some(url) = &view.poster_url {
                verbose(ctx, &format!("Poster uploaded: {}", url));
            }
            outcome
        }
        "cancel" => Outcome {
            message: None,
            navigate: Some(add_banner::AFTER_SAVE_PATH.to_string()),
        },
        _ => return Err(anyhow!("Unknown action '{}' on this page (type /help)", action)),
    };
    Ok(Some(outcome))
}
