//! Console command handlers.
//!
//! Each stdin line is parsed into a [`ConsoleCommand`] and applied to the
//! [`AppState`]. Speech commands feed the scripted recogniser; the rest map
//! onto the assistant's controls.

use heysri_core::{EngineErrorKind, Result as CoreResult};
use tracing::{info, warn};

use crate::settings::save_settings;
use crate::state::AppState;

pub const HELP: &str = "\
commands:
  partial <text>   interim speech
  final <text>     confirmed speech
  end              recogniser closes on its own
  error <code>     recogniser error (no-speech, aborted, not-allowed, ...)
  start | stop     toggle listening
  process          stop and run the confirmed transcript
  clear            clear the transcript
  reset            stop and forget everything
  status           print the current state
  admin on|off     grant or revoke device admin
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Partial(String),
    Final(String),
    End,
    Error(EngineErrorKind),
    Start,
    Stop,
    Process,
    ClearTranscript,
    Reset,
    Status,
    Admin(bool),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "partial" | "p" => ConsoleCommand::Partial(require_text(verb, rest)?),
        "final" | "f" | "say" => ConsoleCommand::Final(require_text(verb, rest)?),
        "end" => ConsoleCommand::End,
        "error" => ConsoleCommand::Error(EngineErrorKind::from_code(&require_text(verb, rest)?)),
        "start" => ConsoleCommand::Start,
        "stop" => ConsoleCommand::Stop,
        "process" => ConsoleCommand::Process,
        "clear" => ConsoleCommand::ClearTranscript,
        "reset" => ConsoleCommand::Reset,
        "status" => ConsoleCommand::Status,
        "admin" => match rest.to_ascii_lowercase().as_str() {
            "on" | "true" | "enable" => ConsoleCommand::Admin(true),
            "off" | "false" | "disable" => ConsoleCommand::Admin(false),
            other => return Err(format!("admin expects on|off, got '{other}'")),
        },
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

fn require_text(verb: &str, rest: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("{verb} needs an argument"))
    } else {
        Ok(rest.to_string())
    }
}

/// Apply one command to the running assistant.
pub async fn run_command(state: &AppState, command: ConsoleCommand) -> CoreResult<Flow> {
    match command {
        ConsoleCommand::Partial(text) => {
            if !state.engine.partial(&text) {
                eprintln!("not listening, speech dropped");
            }
        }
        ConsoleCommand::Final(text) => {
            if !state.engine.finalize(&text) {
                eprintln!("not listening, speech dropped");
            }
        }
        ConsoleCommand::End => state.engine.end(),
        ConsoleCommand::Error(kind) => state.engine.fail(kind),
        ConsoleCommand::Start => state.assistant.start_listening().await?,
        ConsoleCommand::Stop => state.assistant.stop_listening().await?,
        ConsoleCommand::Process => {
            let outcome = state.assistant.stop_and_process().await?;
            info!(?outcome, "manual command processed");
        }
        ConsoleCommand::ClearTranscript => state.assistant.reset_transcript().await?,
        ConsoleCommand::Reset => state.assistant.reset().await?,
        ConsoleCommand::Status => {
            let snap = state.assistant.snapshot();
            eprintln!("{}", snap.status.description(snap.wake_word_detected));
            match serde_json::to_string_pretty(&snap) {
                Ok(json) => eprintln!("{json}"),
                Err(e) => warn!("could not serialise snapshot: {e}"),
            }
            eprintln!("simulated locks: {}", state.policy.locks());
        }
        ConsoleCommand::Admin(enabled) => {
            state.policy.set_admin(enabled);
            let mut settings = state.settings.lock();
            settings.device_admin_enabled = enabled;
            save_settings(&state.settings_path, &settings)?;
            info!(enabled, "device admin updated");
        }
        ConsoleCommand::Help => eprintln!("{HELP}"),
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
