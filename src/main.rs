mod api;
mod cli;
mod config;
mod gate;
mod multipart;
mod role;
mod routes;
mod session;
mod storage;
mod transcript;
mod views;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dusti-admin", about = "Console for the Dusti Pharma admin panel")]
pub struct Args {
    #[arg(short, long, help = "Run one console line and exit")]
    pub command: Option<String>,

    #[arg(long, default_value = "/", help = "Path opened at start")]
    pub open: String,

    #[arg(long, env = "DUSTI_API_URL", help = "API base URL (overrides config)")]
    pub api_url: Option<String>,

    #[arg(long, help = "Directory for session storage and transcripts")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Auto-confirm destructive actions")]
    pub yes: bool,

    #[arg(long, help = "Enable tracing of route decisions")]
    pub trace: bool,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        config::Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: ignoring config: {}", e);
            config::Config::default()
        })
    };

    if let Some(url) = &args.api_url {
        cfg.api.base_url = Some(url.clone());
    }
    if let Some(dir) = &args.state_dir {
        cfg.storage.dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!("Invalid configuration"));
    }

    if args.debug {
        eprintln!("[DEBUG] API: {}", cfg.api.base_url());
        eprintln!("[DEBUG] Uploads: {}", cfg.api.uploads_host());
        eprintln!("[DEBUG] Timeout: {} ms", cfg.api.timeout_ms());
        eprintln!("[DEBUG] State dir: {}", cfg.storage.dir().display());
    }

    let state_dir = cfg.storage.dir();
    let transcripts_dir = state_dir.join("transcripts");
    std::fs::create_dir_all(&transcripts_dir)
        .with_context(|| format!("Failed to create {}", transcripts_dir.display()))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let transcript_path = transcripts_dir.join(format!("{}.jsonl", session_id));
    let transcript = transcript::Transcript::new(&transcript_path, &session_id)?;

    let store = storage::FileStore::open(&state_dir.join("storage.json"))?;
    let mut session = session::SessionStore::new(Box::new(store));
    // Must run before the first route decision
    session.initialize();

    let client = api::Client::new(cfg.api.base_url(), cfg.api.timeout_ms());
    if args.debug {
        eprintln!("[DEBUG] Requests go to {}", client.base_url());
    }
    let root = std::env::current_dir()?;
    let trace = args.trace;
    let interactive = args.command.is_none();

    let ctx = cli::Context {
        args,
        root,
        config: cfg,
        session: RefCell::new(session),
        api: Box::new(client),
        transcript: RefCell::new(transcript),
        session_id,
        tracing: RefCell::new(trace),
        interactive,
        path: RefCell::new(String::new()),
        screen: RefCell::new(cli::Screen::Blank),
    };
    ctx.flush_warnings();

    let start = ctx.args.open.clone();
    cli::open_path(&ctx, &start);

    if let Some(command) = ctx.args.command.clone() {
        cli::run_once(&ctx, &command)
    } else {
        cli::run_repl(ctx)
    }
}
