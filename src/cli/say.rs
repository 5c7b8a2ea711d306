//! Line-oriented "say" and "chat" commands

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::core::config::data::Config;
use crate::core::config::defaults::{api_key_from_env, SettingsOverrides};
use crate::core::message::Message;
use crate::core::orchestrator::{
    summarize_layout, ConversationOrchestrator, TurnError, TurnEvent, TurnOutcome,
};
use crate::utils::logging::LoggingState;

fn build_orchestrator(
    overrides: &SettingsOverrides,
) -> Result<ConversationOrchestrator, Box<dyn Error>> {
    let config = Config::load()?;
    let settings = config.resolve_settings(overrides);
    Ok(ConversationOrchestrator::from_settings(
        settings,
        reqwest::Client::new(),
        api_key_from_env(),
    ))
}

pub async fn run_say(
    prompt: Vec<String>,
    overrides: SettingsOverrides,
    log: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: vastuchat say <prompt>");
        std::process::exit(1);
    }

    let orchestrator = build_orchestrator(&overrides)?;
    let logging = LoggingState::new(log)?;

    let user = Message::user(prompt);
    logging.log_message(&user)?;

    match stream_turn(&orchestrator, vec![user]).await? {
        Ok(outcome) => {
            logging.log_message(&Message::assistant(outcome.text.clone()))?;
            Ok(())
        }
        Err(err) => {
            eprintln!("\n❌ Error: {err}");
            std::process::exit(1);
        }
    }
}

pub async fn run_chat(
    overrides: SettingsOverrides,
    log: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let orchestrator = build_orchestrator(&overrides)?;
    let mut logging = LoggingState::new(log)?;

    let settings = orchestrator.settings();
    println!(
        "vastuchat · {} at {} ({})",
        settings.model, settings.endpoint, settings.dialect
    );
    println!("Describe the home you want. /log toggles the transcript, /quit exits.");

    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/log" => {
                match logging.toggle_logging() {
                    Ok(status) => println!("{status}"),
                    Err(err) => eprintln!("⚠️  {err}"),
                }
                continue;
            }
            _ => {}
        }

        let user = Message::user(input);
        logging.log_message(&user)?;
        let mut turn_history = history.clone();
        turn_history.push(user);

        match stream_turn(&orchestrator, turn_history).await? {
            Ok(outcome) => {
                logging.log_message(&Message::assistant(outcome.text.clone()))?;
                history = outcome.messages;
            }
            // The failed user message is dropped so it can simply be retyped.
            Err(err) => eprintln!("\n❌ Error: {err}"),
        }
    }

    Ok(())
}

/// Run one turn, echoing text deltas to stdout and turn events to stderr.
///
/// The outer error is a failure to drive the turn at all; the inner one is
/// the turn's own result.
async fn stream_turn(
    orchestrator: &ConversationOrchestrator,
    history: Vec<Message>,
) -> Result<Result<TurnOutcome, TurnError>, Box<dyn Error>> {
    let mut handle = orchestrator.start_turn(history, orchestrator.tool_definitions());

    let mut streamed = String::new();
    let mut text_open = true;
    let mut events_open = true;
    while text_open || events_open {
        tokio::select! {
            delta = handle.text.recv(), if text_open => match delta {
                Some(delta) => {
                    streamed.push_str(&delta);
                    print!("{delta}");
                    io::stdout().flush()?;
                }
                None => text_open = false,
            },
            event = handle.events.recv(), if events_open => match event {
                Some(event) => report_event(&event),
                None => events_open = false,
            },
        }
    }

    let outcome = handle.outcome.await?;
    if let Ok(outcome) = &outcome {
        if !streamed.is_empty() {
            println!();
        }
        // Only repeat the answer when sanitizing changed what was shown.
        if outcome.text.trim() != streamed.trim() {
            if !streamed.is_empty() {
                println!();
            }
            println!("{}", outcome.text);
        }
    }
    Ok(outcome)
}

fn report_event(event: &TurnEvent) {
    match event {
        TurnEvent::ToolResolved(call) => {
            let status = if call.result.success { "done" } else { "failed" };
            eprintln!("\n🔧 {} {status}", call.name);
        }
        TurnEvent::FallbackLayout(payload) => {
            eprintln!("\n🏠 The model is slow to respond; generated a layout directly.");
            eprintln!("   {}", summarize_layout(payload));
        }
        TurnEvent::FallbackFailed(notice) => eprintln!("\n⚠️  {notice}"),
    }
}
