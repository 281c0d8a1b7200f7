//! Interactive chat loop (`qarag chat`).
//!
//! Reads lines from stdin while applying session events as they arrive, so
//! answers and ingestion progress print as soon as they land even while the
//! user is typing the next question.
//!
//! | Input | Action |
//! |-------|--------|
//! | any text | ask a question |
//! | `/upload <paths>` | ingest PDF files |
//! | `/files` | list indexed documents |
//! | `/evidence` | show or hide the evidence panel |
//! | `/history` | list every exchange |
//! | `/clear` | wipe documents and session (asks first) |
//! | `/help` | this table |
//! | `/quit` | leave |

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use qarag_core::ingestion::IngestionPhase;

use crate::commands::{build_session, is_yes, load_uploads, select_pdfs};
use crate::config::Config;
use crate::progress::ProgressMode;
use crate::render;
use crate::session::{Notice, Session};

const HELP: &str = "\
Commands:
  <question>          ask about the indexed documents
  /upload <paths>     upload PDF files
  /files              list indexed documents
  /evidence           show or hide the evidence panel
  /history            list every exchange
  /clear              wipe all documents and the session
  /help               show this help
  /quit               leave
";

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Ask(String),
    Upload(Vec<PathBuf>),
    Files,
    Evidence,
    History,
    Clear,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_command(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Ask(line.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    match name {
        "upload" => ChatCommand::Upload(args.split_whitespace().map(PathBuf::from).collect()),
        "files" => ChatCommand::Files,
        "evidence" => ChatCommand::Evidence,
        "history" => ChatCommand::History,
        "clear" => ChatCommand::Clear,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        other => ChatCommand::Unknown(other.to_string()),
    }
}

pub async fn run_chat(config: &Config, progress: Option<ProgressMode>) -> Result<()> {
    // The chat draws its own ingestion widget; only JSON progress is passed through.
    let mode = match progress {
        Some(ProgressMode::Json) => ProgressMode::Json,
        _ => ProgressMode::Off,
    };
    let mut session = build_session(config, mode)?;
    let threshold = config.display.precise_threshold;

    println!("qarag chat  backend: {}", session.backend_location());
    println!("Type a question, or /help for commands.");
    session.refresh_documents();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirming_clear = false;
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if confirming_clear {
                    confirming_clear = false;
                    if is_yes(&line) {
                        session.clear_all();
                        println!("Cleared documents and session.");
                    } else {
                        println!("Cancelled.");
                    }
                    prompt();
                    continue;
                }
                match parse_command(&line) {
                    ChatCommand::Quit => break,
                    ChatCommand::Clear => {
                        print!("Wipe all document data and session? [y/N] ");
                        flush();
                        confirming_clear = true;
                        continue;
                    }
                    command => handle_command(&mut session, command, threshold).await,
                }
                prompt();
            }
            Some(event) = session.next_event() => {
                session.set_columns(render::terminal_columns());
                let notices = session.apply(event);
                if !notices.is_empty() {
                    println!();
                    for notice in &notices {
                        print_notice(&session, notice, threshold);
                    }
                    prompt();
                }
            }
        }
    }

    if session.state().conversation.is_awaiting_response() {
        tracing::debug!(
            outstanding = session.state().conversation.outstanding(),
            "leaving with unanswered queries"
        );
    }
    Ok(())
}

async fn handle_command(session: &mut Session, command: ChatCommand, threshold: f64) {
    match command {
        ChatCommand::Ask(text) => {
            session.set_columns(render::terminal_columns());
            if session.submit_query(&text).is_some() {
                print!(
                    "{}",
                    render::render_loading(session.state().conversation.outstanding())
                );
            }
        }
        ChatCommand::Upload(paths) => start_upload(session, paths).await,
        ChatCommand::Files => {
            print!("{}", render::render_documents(&session.state().documents));
            session.refresh_documents();
        }
        ChatCommand::Evidence => {
            if session.toggle_evidence_panel() {
                print!(
                    "{}",
                    render::render_evidence_panel(session.state().active_evidence(), threshold)
                );
            } else {
                println!("Evidence panel hidden.");
            }
        }
        ChatCommand::History => print!("{}", render::render_history(&session.state().conversation)),
        ChatCommand::Help => print!("{}", HELP),
        ChatCommand::Unknown(name) => println!("Unknown command /{}. Try /help.", name),
        ChatCommand::Empty | ChatCommand::Clear | ChatCommand::Quit => {}
    }
}

async fn start_upload(session: &mut Session, paths: Vec<PathBuf>) {
    if paths.is_empty() {
        println!("Usage: /upload <file.pdf> [more.pdf ...]");
        return;
    }
    let pdfs = select_pdfs(&paths);
    let files = match load_uploads(pdfs).await {
        Ok(files) => files,
        Err(e) => {
            println!("Cannot read upload: {:#}", e);
            return;
        }
    };
    match session.start_upload(files) {
        Ok(_) => print!("{}", render::render_ingestion(IngestionPhase::Uploading)),
        Err(e) => println!("Upload rejected: {}", e),
    }
}

fn print_notice(session: &Session, notice: &Notice, threshold: f64) {
    let state = session.state();
    match notice {
        Notice::ExchangesAppended(n) => {
            let exchanges = state.conversation.exchanges();
            for ex in &exchanges[exchanges.len().saturating_sub(*n)..] {
                print!("{}", render::render_exchange(ex));
            }
            if state.panel.show_evidence() {
                println!();
                print!(
                    "{}",
                    render::render_evidence_panel(state.active_evidence(), threshold)
                );
            }
            let outstanding = state.conversation.outstanding();
            if outstanding > 0 {
                print!("{}", render::render_loading(outstanding));
            }
        }
        Notice::PhaseChanged(IngestionPhase::Idle) => {}
        Notice::PhaseChanged(phase) => print!("{}", render::render_ingestion(*phase)),
        Notice::UploadFailed(message) => println!("!! {}", message),
        Notice::DocumentsUpdated => print!("{}", render::render_documents(&state.documents)),
    }
}

fn prompt() {
    print!("> ");
    flush();
}

fn flush() {
    let _ = std::io::stdout().flush();
}
