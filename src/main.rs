//! cbtquest - battle through the thought monsters of a diary entry

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem};

use cbtquest::action::Action;
use cbtquest::animation::Pacing;
use cbtquest::api::{AdventureApi, ApiConfig, HttpAdventureApi};
use cbtquest::auth;
use cbtquest::effect::Effect;
use cbtquest::reducer::reducer;
use cbtquest::runner;
use cbtquest::state::AppState;
use cbtquest::ui;

const LOADING_ROTATE_MS: u64 = 2000;

#[derive(Parser, Debug)]
#[command(name = "cbtquest")]
#[command(about = "Fight the thought monsters of a diary entry in your terminal")]
struct Args {
    /// Diary entry whose adventure should be played
    #[arg(long)]
    diary: u64,

    /// Base URL of the journaling server
    #[arg(long, env = "CBTQUEST_BASE_URL", default_value = "http://localhost:5000")]
    base_url: String,

    /// Bearer token; falls back to the remembered token file
    #[arg(long, env = "CBTQUEST_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Store the given token for later runs
    #[arg(long)]
    remember_token: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Resolve turns without animation delays
    #[arg(long)]
    no_animations: bool,

    /// Write logs to this file (RUST_LOG controls the filter)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[derive(Clone)]
struct RuntimeConfig {
    api: Arc<dyn AdventureApi>,
    pacing: Pacing,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let debug = DebugSession::new(args.debug);
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let token_path = auth::token_file_path(None);
    let token = auth::load_token(args.token.as_deref(), &token_path).await;
    if args.remember_token {
        if let Some(token) = token.as_deref() {
            if let Err(err) = auth::save_token(&token_path, token).await {
                log::warn!("{err}");
            }
        }
    }

    let api = HttpAdventureApi::new(ApiConfig {
        base_url: args.base_url.clone(),
        token: token.clone().unwrap_or_default(),
        timeout: Duration::from_secs(args.timeout_secs),
    })
    .map_err(|err| io::Error::other(format!("http client error: {err}")))?;
    let config = RuntimeConfig {
        api: Arc::new(api),
        pacing: if args.no_animations {
            Pacing::instant()
        } else {
            Pacing::default()
        },
    };
    log::info!(
        "starting adventure for diary {} against {}",
        args.diary,
        args.base_url
    );

    let diary_id = args.diary;
    let authenticated = token.is_some();
    let state = debug
        .load_state_or_else_async(|| async move {
            Ok::<AppState, io::Error>(AppState::new(diary_id, authenticated))
        })
        .await
        .map_err(debug_error)?;

    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, config).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn init_logging(path: Option<&Path>) -> io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    config: RuntimeConfig,
) -> io::Result<DebugRunOutput<AppState>> {
    let config = Arc::new(config);
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::SessionAcquire),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime.subscriptions().interval(
                    "loading",
                    Duration::from_millis(LOADING_ROTATE_MS),
                    || Action::Tick,
                );
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, config.clone()),
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, config: Arc<RuntimeConfig>) {
    let key = effect.task_key();
    log::debug!("spawning {key} task");
    ctx.tasks().spawn(
        TaskKey::new(key),
        runner::perform(config.api.clone(), effect, config.pacing),
    );
}
