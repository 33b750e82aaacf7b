mod app;
mod commands;
mod helper;
mod logging;
mod render;

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use concierge_core::backend::CredentialProvider;
use concierge_infrastructure::{ConciergePaths, ConfigStorage, FileCredentialStore};

use crate::app::{App, Flow};
use crate::commands::Command;
use crate::helper::CliHelper;

type LineEditor = Editor<CliHelper, DefaultHistory>;

/// The main entry point for the Concierge REPL.
///
/// Startup order:
/// 1. Load `config.toml` (writing defaults on first run) and environment overrides
/// 2. Install file logging
/// 3. Open the credential store and restore the conversation
/// 4. Read lines until `quit`, Ctrl-D, or an editor error
///
/// An optional first argument names the session to resume.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration =====
    let paths = ConciergePaths::new();
    let storage = ConfigStorage::new(&paths)?;
    if let Err(e) = storage.ensure_default() {
        eprintln!(
            "{}",
            format!("Could not write default config to {}: {}", storage.path().display(), e).yellow()
        );
    }
    let config = storage.load()?;

    let _log_guard = logging::init(paths.logs_dir().ok().as_deref(), &config.log.level);
    tracing::info!("[Startup] Using recommendation service at {}", config.api.base_url);

    let credentials: Arc<dyn CredentialProvider> = Arc::new(FileCredentialStore::new(&paths)?);
    let session_hint = std::env::args().nth(1);

    // ===== Conversation =====
    let mut app = App::start(&config, credentials.clone(), session_hint.as_deref()).await?;

    // ===== REPL Setup =====
    let mut rl: LineEditor = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Concierge ===".bright_magenta().bold());
    match credentials.credentials().and_then(|c| c.username) {
        Some(username) => println!("{}", format!("Logged in as {username}.").bright_black()),
        None => println!("{}", "Not logged in. Use /login <user>.".bright_black()),
    }
    println!("{}", "Type a question, '/help' for commands, or 'quit' to exit.".bright_black());
    println!();
    app.print_conversation().await;

    // ===== Main REPL Loop =====
    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        let command = match commands::parse(trimmed) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage.yellow());
                continue;
            }
        };

        match command {
            Command::Login(username) => {
                if let Some(password) = read_secret(&mut rl, "Password: ")? {
                    app.login(&username, &password).await;
                }
            }
            Command::Register { username, email } => {
                if let Some(password) = read_secret(&mut rl, "Choose a password: ")? {
                    app.register(&username, &email, &password).await;
                }
            }
            command => {
                if app.handle(command).await == Flow::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Reads a line with the input masked. `None` when the user aborts.
fn read_secret(rl: &mut LineEditor, prompt: &str) -> rustyline::Result<Option<String>> {
    if let Some(helper) = rl.helper_mut() {
        helper.masking = true;
    }
    let result = rl.readline(prompt);
    if let Some(helper) = rl.helper_mut() {
        helper.masking = false;
    }

    match result {
        Ok(secret) => Ok(Some(secret)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err),
    }
}
