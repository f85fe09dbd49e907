//! `heysri` — console host for the Hey Sri assistant.
//!
//! Reads commands from stdin, drives the assistant through a scripted
//! recogniser and prints every assistant event to stdout as one JSON line.
//! Logs go to stderr.

mod commands;
mod settings;
mod state;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::{parse_line, run_command, Flow, HELP};
use settings::{default_settings_path, load_settings};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("heysri=info,heysri_core=info")),
        )
        .init();

    info!("Hey Sri starting");

    let settings_path = default_settings_path();
    let app_settings = load_settings(&settings_path);
    info!(
        settings_path = ?settings_path,
        language = %app_settings.language,
        native_capability = app_settings.native_capability,
        device_admin_enabled = app_settings.device_admin_enabled,
        resume_after_command = app_settings.resume_after_command,
        "runtime settings loaded"
    );

    // ── Assistant setup ───────────────────────────────────────────────────
    let state = AppState::start(app_settings, settings_path);

    let mut events = state.assistant.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!("could not serialise event: {e}"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    eprintln!("{HELP}");

    // ── Input loop ────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        match run_command(&state, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    state.shutdown().await;
    if let Err(e) = printer.await {
        warn!("event printer ended abnormally: {e}");
    }
    info!("Hey Sri stopped");
    Ok(())
}
