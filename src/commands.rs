//! One-shot CLI commands: `files`, `upload`, `ask`, `clear`.
//!
//! Each command builds a [`Session`], starts its operation, and drains the
//! session until it is idle before printing.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use qarag_core::models::Role;

use crate::config::Config;
use crate::progress::ProgressMode;
use crate::render;
use crate::session::{Notice, Session, SessionOptions};
use crate::transport::{is_pdf_path, HttpBackend, UploadFile};

/// Build a session against the configured HTTP backend.
pub fn build_session(config: &Config, progress: ProgressMode) -> Result<Session> {
    let backend = HttpBackend::new(&config.backend)?;
    let options = SessionOptions::from_config(config, render::terminal_columns());
    Ok(Session::new(Arc::new(backend), options).with_reporter(progress.reporter()))
}

/// Keep only PDF paths, warning about the rest.
pub fn select_pdfs(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| {
            let keep = is_pdf_path(p);
            if !keep {
                eprintln!("Skipping {} (only PDF files are accepted)", p.display());
            }
            keep
        })
        .cloned()
        .collect()
}

pub fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    paths.iter().map(|p| UploadFile::read(p)).collect()
}

/// [`read_uploads`] on the blocking pool, off the event loop.
pub async fn load_uploads(paths: Vec<PathBuf>) -> Result<Vec<UploadFile>> {
    tokio::task::spawn_blocking(move || read_uploads(&paths))
        .await
        .context("Upload reader task failed")?
}

pub async fn run_files(config: &Config) -> Result<()> {
    let mut session = build_session(config, ProgressMode::Off)?;
    session.refresh_documents();
    let mut listed = false;
    session
        .settle(|_, notice| listed |= *notice == Notice::DocumentsUpdated)
        .await;
    // A one-shot listing has no earlier result to fall back on.
    if !listed {
        bail!(
            "Backend unreachable: could not list documents at {}",
            session.backend_location()
        );
    }
    print!("{}", render::render_documents(&session.state().documents));
    Ok(())
}

pub async fn run_upload(config: &Config, paths: &[PathBuf], progress: ProgressMode) -> Result<()> {
    let pdfs = select_pdfs(paths);
    if pdfs.is_empty() {
        bail!("No PDF files to upload.");
    }
    let files = load_uploads(pdfs.clone()).await?;

    let mut session = build_session(config, progress)?;
    session.start_upload(files)?;

    let mut failure = None;
    session
        .settle(|_, notice| {
            if let Notice::UploadFailed(message) = notice {
                failure = Some(message.clone());
            }
        })
        .await;

    if let Some(message) = failure {
        bail!(message);
    }

    println!("Uploaded {} file(s).", pdfs.len());
    print!("{}", render::render_documents(&session.state().documents));
    Ok(())
}

pub async fn run_ask(config: &Config, query: &str, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query must not be empty.");
    }

    let mut session = build_session(config, ProgressMode::Off)?;
    session.submit_query(query);
    session.settle(|_, _| {}).await;

    let state = session.state();
    let Some(answer) = state
        .conversation
        .exchanges()
        .last()
        .filter(|ex| ex.role == Role::Assistant)
    else {
        bail!("No answer received.");
    };

    if json {
        println!(
            "{}",
            render::format_ask_json(&render::AskOutput::new(query, answer))
        );
    } else {
        print!("{}", render::render_exchange(answer));
        if !answer.is_error {
            println!();
            print!(
                "{}",
                render::render_evidence_panel(
                    state.active_evidence(),
                    config.display.precise_threshold
                )
            );
        }
    }

    if answer.is_error {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn run_clear(config: &Config, yes: bool) -> Result<()> {
    if !yes && !confirm("Wipe all document data and session?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut session = build_session(config, ProgressMode::Off)?;
    session.clear_all();
    session.settle(|_, _| {}).await;
    println!("Cleared documents and session.");
    Ok(())
}

/// Ask a yes/no question on stdin; anything but `y`/`yes` is no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
