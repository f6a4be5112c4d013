//! services/client/src/bin/docustream.rs
//!
//! A terminal front-end for the chat session.

use client_lib::{
    adapters::{FileAddress, HttpConversationStore, HttpUploadAdapter, SseChatAdapter},
    config::Config,
    error::{ClientError, ClientResult},
    session::{AppState, ChatSession, ConversationHistory, TranscriptEvent},
};
use docustream_core::{
    attached_files, ports::conversation_from_location, ConversationId, ExtractionProfile,
    Message, MessagePart, MessageStatus, NavigableAddress, Role, StagedAttachment,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Commands:
  /attach <path>...   stage files for the next message
  /detach <n>         unstage the n-th staged file
  /files              list staged files
  /profile [name]     show or select the extraction profile ('none' clears it)
  /open <id>          open an existing conversation
  /new                start a new conversation
  /list               list saved conversations
  /delete <id>        delete a saved conversation
  /quit               exit
Anything else is sent as a message.";

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Backend at {}.", config.api_base_url);

    // --- 2. Initialize Service Adapters ---
    // No global timeout: it would cut long-lived chat streams.
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ClientError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let address = Arc::new(FileAddress::new(config.location_file.clone()));

    let app_state = AppState {
        config: config.clone(),
        transport: Arc::new(SseChatAdapter::new(http.clone(), config.api_base_url.clone())),
        uploader: Arc::new(HttpUploadAdapter::new(
            http.clone(),
            config.api_base_url.clone(),
            config.request_timeout,
        )),
        store: Arc::new(HttpConversationStore::new(
            http,
            config.api_base_url.clone(),
            config.request_timeout,
        )),
        address: address.clone(),
    };
    let mut history = ConversationHistory::new(app_state.store.clone());
    let session = Arc::new(ChatSession::new(app_state));

    // --- 3. Render Transcript Changes ---
    let printer = tokio::spawn(print_events(session.clone()));
    render_transcript(&session.messages().await);

    // --- 4. Resume The Conversation In The Address, If Any ---
    match address.current().await {
        Ok(location) => {
            if let Some(id) = conversation_from_location(&location) {
                session.open(id).await;
            }
        }
        Err(e) => warn!("Could not read the current location: {}", e),
    }

    // --- 5. Main Input Loop ---
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        match handle_line(line, &session, &mut history, &mut lines).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("! {}", e),
        }
    }

    printer.abort();
    info!("Goodbye.");
    Ok(())
}

/// Handles one input line. Returns `false` when the user asked to quit.
async fn handle_line(
    line: &str,
    session: &ChatSession,
    history: &mut ConversationHistory,
    lines: &mut Lines<BufReader<Stdin>>,
) -> ClientResult<bool> {
    let (command, argument) = match line.strip_prefix('/') {
        Some(rest) => {
            let mut split = rest.splitn(2, char::is_whitespace);
            let command = split.next().unwrap_or_default();
            (Some(command), split.next().unwrap_or_default().trim())
        }
        None => (None, line),
    };

    match command {
        None => {
            if !session.can_submit(line).await {
                if session.is_loading().await {
                    println!("! Wait for the current response to finish.");
                }
                return Ok(true);
            }
            // The handle is dropped; the response keeps streaming into the transcript.
            let handle = session.submit(line).await?;
            if let Some(e) = handle.address_error() {
                println!("! Sent, but the address could not be updated: {}", e);
            }
        }
        Some("attach") => {
            let mut files = Vec::new();
            for path in argument.split_whitespace() {
                files.push(read_attachment(Path::new(path)).await?);
            }
            session.stage(files).await;
            print_staged(&session.staged().await);
        }
        Some("detach") => {
            let removed = match argument.parse::<usize>() {
                Ok(n) if n > 0 => session.unstage(n - 1).await,
                _ => None,
            };
            if removed.is_none() {
                println!("! No staged file at position '{}'.", argument);
            }
            print_staged(&session.staged().await);
        }
        Some("files") => print_staged(&session.staged().await),
        Some("profile") => select_profile(session, argument).await,
        Some("open") if !argument.is_empty() => {
            session.open(ConversationId::from(argument)).await;
        }
        Some("new") => session.new_conversation().await,
        Some("list") => {
            for entry in history.refresh().await? {
                println!("  {}  {}", entry.id, entry.title);
            }
        }
        Some("delete") if !argument.is_empty() => {
            let id = ConversationId::from(argument);
            print!("Delete conversation {}? [y/N] ", id);
            std::io::stdout().flush()?;
            let answer = lines.next_line().await?.unwrap_or_default();
            if answer.trim().eq_ignore_ascii_case("y") {
                history.delete(&id).await?;
                if session.conversation_id().await.as_ref() == Some(&id) {
                    session.new_conversation().await;
                }
                println!("Deleted.");
            }
        }
        Some("quit") | Some("exit") => return Ok(false),
        Some(_) => println!("{}", HELP),
    }
    Ok(true)
}

async fn read_attachment(path: &Path) -> ClientResult<StagedAttachment> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(StagedAttachment::new(name, bytes))
}

async fn select_profile(session: &ChatSession, argument: &str) {
    if argument.is_empty() {
        let current = session.profile().await;
        for profile in ExtractionProfile::ALL {
            let marker = if current == Some(profile) { "*" } else { " " };
            println!(" {} {:<14} {}", marker, profile.as_str(), profile.label());
        }
        return;
    }
    if argument.eq_ignore_ascii_case("none") {
        session.select_profile(None).await;
        println!("Extraction profile cleared.");
        return;
    }
    match argument.parse::<ExtractionProfile>() {
        Ok(profile) => {
            session.select_profile(Some(profile)).await;
            println!("Extraction profile: {}", profile.label());
        }
        Err(e) => println!("! {}", e),
    }
}

fn print_staged(staged: &[StagedAttachment]) {
    if staged.is_empty() {
        println!("No files staged.");
    }
    for (i, file) in staged.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, file.name, file.size_label());
    }
}

//=========================================================================================
// Transcript Rendering
//=========================================================================================

async fn print_events(session: Arc<ChatSession>) {
    let mut events = session.subscribe();
    loop {
        match events.recv().await {
            Ok(TranscriptEvent::Appended(message)) => render_message(&message),
            Ok(TranscriptEvent::Fragment { part, .. }) => render_part(&part),
            Ok(TranscriptEvent::Settled { status, .. }) => match status {
                MessageStatus::Failed => println!("\n! The response failed."),
                _ => println!(),
            },
            Ok(TranscriptEvent::Replaced { .. }) => render_transcript(&session.messages().await),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Renderer fell behind by {} events; redrawing.", skipped);
                render_transcript(&session.messages().await);
            }
            Err(RecvError::Closed) => break,
        }
        let _ = std::io::stdout().flush();
    }
}

fn render_transcript(messages: &[Message]) {
    println!("----------------------------------------");
    for message in messages {
        render_message(message);
        if message.role == Role::Assistant && message.is_frozen() {
            println!();
        }
    }
}

fn render_message(message: &Message) {
    match message.role {
        Role::User => {
            let text = message.text();
            for file in attached_files(&text) {
                println!("  [file] {}", file.filename);
            }
            let typed: Vec<&str> = text
                .lines()
                .filter(|line| attached_files(line).is_empty())
                .collect();
            println!("you> {}", typed.join("\n").trim());
        }
        Role::Assistant => {
            print!("assistant> ");
            for part in &message.parts {
                render_part(part);
            }
            if message.status == MessageStatus::Failed {
                println!("\n! The response failed.");
            }
        }
    }
}

fn render_part(part: &MessagePart) {
    match part {
        MessagePart::Text { content } => print!("{}", content),
        MessagePart::ToolCall { name } => print!("\n  [tool: {}]\n", name),
    }
}
