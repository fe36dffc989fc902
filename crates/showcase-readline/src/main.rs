//! `showcase` - interactive chat REPL.
//!
//! Reads configuration and the backend key, opens a chat session for the
//! configured identity and streams replies to the terminal as they arrive.
//! Logs go to a daily rolling file so they never interleave with the REPL.

mod command;
mod helper;

use std::io::Write;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use showcase_application::{AppContext, ChatEvent, ChatSession};
use showcase_core::chat::{ChatMessage, MessageRole};
use showcase_core::error::ShowcaseError;
use showcase_infrastructure::storage::BACKEND_KEY_ENV;
use showcase_infrastructure::{ConfigService, SecretStorage, ShowcasePaths};
use showcase_interaction::PromptTemplate;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use command::{COMMANDS, Command};
use helper::ReplHelper;

#[tokio::main]
async fn main() -> Result<()> {
    let config_service = ConfigService::new()?;
    let config = config_service.get_config()?;

    // Dropping the guard flushes the log writer
    let _log_guard = init_tracing(&config.logging.level)?;
    tracing::info!(
        "[showcase] Starting with config {}",
        config_service.path().display()
    );

    if let Err(err) = ShowcasePaths::ensure_secret_file() {
        tracing::warn!("[showcase] Could not create secret file template: {}", err);
    }
    let secrets = SecretStorage::new()?;
    let backend_key = secrets.backend_key().with_context(|| {
        format!(
            "No backend key. Set backend.publishable_key in {} or {}",
            secrets.path().display(),
            BACKEND_KEY_ENV
        )
    })?;

    let context = AppContext::from_config(config, &backend_key, None)?;

    let (session, load_error) = match context.open_session().await {
        Ok(opened) => opened,
        Err(ShowcaseError::Unauthenticated) => {
            println!("{}", ShowcaseError::Unauthenticated.user_message().red());
            println!(
                "{}",
                "Set [identity] user_id in config.toml or SHOWCASE_USER_ID.".bright_black()
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = session.with_event_sender(event_tx);

    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ReplHelper::new()));

    println!("{}", "=== Showcase Chat ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Signed in as {}", session.identity().display_name()).bright_black()
    );
    match load_error {
        Some(err) => println!("{}", err.user_message().yellow()),
        None => println!(
            "{}",
            format!("{} messages in history. Type /help for commands.", session.messages().len())
                .bright_black()
        ),
    }
    println!();

    let mut output = Output::default();

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

        let Some(command) = Command::parse(&line) else {
            continue;
        };
        let _ = rl.add_history_entry(line.trim());

        match command {
            Command::Quit => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Command::Say(text) => {
                let outcome = stream_send(&session, &mut event_rx, &mut output, &text).await;
                if let Err(err) = outcome {
                    tracing::debug!("[showcase] Send ended with {}", err);
                }
            }
            Command::Clear => {
                if let Err(err) = session.clear().await {
                    println!("{}", err.user_message().red());
                }
                output.drain(&mut event_rx);
            }
            Command::History => print_history(&session.messages()),
            Command::Generate { template, input } => {
                generate(&context, template, &input).await;
            }
            Command::Image(prompt) => generate_image(&context, &prompt).await,
            Command::SignOut => {
                context.identity_provider().sign_out().await?;
                session.end();
                println!("{}", "Signed out. Goodbye!".bright_green());
                break;
            }
            Command::Help => print_help(),
            Command::Invalid(message) => println!("{}", message.yellow()),
        }

        if session.is_ended() {
            println!("{}", "Session ended.".yellow());
            break;
        }
    }

    session.end();
    tracing::info!("[showcase] Exiting");
    Ok(())
}

/// Installs a registry with an `EnvFilter` (RUST_LOG, else `level`) and a
/// daily rolling file writer under the config directory.
fn init_tracing(level: &str) -> Result<WorkerGuard> {
    let logs_dir = ShowcasePaths::logs_dir()?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "showcase.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    Ok(guard)
}

/// Sends `text` and renders events while the reply streams in. CTRL-C
/// cancels the send.
async fn stream_send(
    session: &ChatSession,
    events: &mut UnboundedReceiver<ChatEvent>,
    output: &mut Output,
    text: &str,
) -> showcase_core::error::Result<Option<ChatMessage>> {
    let send = session.send(text);
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            Some(event) = events.recv() => output.render(event),
            _ = tokio::signal::ctrl_c() => {
                session.cancel_current();
            }
        }
    };

    output.drain(events);
    outcome
}

async fn generate(context: &AppContext, template: PromptTemplate, input: &str) {
    println!("{}", format!("Generating {}...", template.label()).bright_black());

    let result = tokio::select! {
        result = context.text_generator().generate(template, input) => result,
        _ = tokio::signal::ctrl_c() => Err(ShowcaseError::Cancelled),
    };

    match result {
        Ok(text) => {
            for line in text.lines() {
                println!("{}", line.bright_blue());
            }
        }
        Err(err) => {
            tracing::warn!("[showcase] Generation failed: {}", err);
            println!("{}", err.user_message().red());
        }
    }
}

async fn generate_image(context: &AppContext, prompt: &str) {
    println!("{}", "Generating image...".bright_black());

    let result = tokio::select! {
        result = context.image_generator().generate(prompt) => result,
        _ = tokio::signal::ctrl_c() => Err(ShowcaseError::Cancelled),
    };

    match result {
        Ok(url) => println!("{} {}", "Image ready:".green(), url.bright_blue().underline()),
        Err(err) => {
            tracing::warn!("[showcase] Image generation failed: {}", err);
            println!("{}", err.user_message().red());
        }
    }
}

fn print_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("{}", "No messages yet.".bright_black());
        return;
    }
    for message in messages {
        let label = match message.role {
            MessageRole::User => "[you]".green(),
            MessageRole::Assistant => "[assistant]".bright_magenta(),
        };
        println!("{}", label);
        for line in message.content.lines() {
            println!("{}", line);
        }
    }
}

fn print_help() {
    let descriptions = [
        "delete the whole conversation",
        "show the conversation so far",
        "<template> <text>: one-shot generation (story, poem, email, summary, custom)",
        "<description>: generate an image and print its URL",
        "sign out and quit",
        "show this help",
    ];
    for (command, description) in COMMANDS.iter().zip(descriptions) {
        println!("  {} {}", command.bright_cyan(), description.bright_black());
    }
    println!("  {} {}", "quit".bright_cyan(), "exit the REPL".bright_black());
}

/// Renders chat events, tracking whether a streamed reply left the cursor
/// mid-line.
#[derive(Default)]
struct Output {
    mid_line: bool,
}

impl Output {
    fn render(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Fragment(fragment) => {
                print!("{}", fragment.bright_blue());
                let _ = std::io::stdout().flush();
                self.mid_line = !fragment.ends_with('\n');
            }
            ChatEvent::Completed(finalized) => {
                self.end_line();
                if finalized.is_none() {
                    println!("{}", "(empty reply)".bright_black());
                }
            }
            ChatEvent::Failed { error, notice } => {
                self.end_line();
                if error.is_cancelled() {
                    println!("{}", notice.yellow());
                } else {
                    println!("{}", notice.red());
                }
            }
            ChatEvent::Cleared => {
                self.end_line();
                println!("{}", "Conversation cleared.".green());
            }
        }
    }

    fn drain(&mut self, events: &mut UnboundedReceiver<ChatEvent>) {
        while let Ok(event) = events.try_recv() {
            self.render(event);
        }
    }

    fn end_line(&mut self) {
        if self.mid_line {
            println!();
            self.mid_line = false;
        }
    }
}
