//! Client session: the single owner of all client state.
//!
//! A [`Session`] holds the [`ClientState`] and is the only thing that
//! mutates it. Network calls and ingestion timers run as tokio tasks that
//! never touch state; each posts a [`SessionEvent`] into the session's
//! channel when it finishes, and the owner applies events one at a time with
//! [`Session::apply`].
//!
//! ```text
//!   submit_query / start_upload / clear_all / refresh_documents
//!            │ spawn
//!            ▼
//!   ┌─────────────────┐  SessionEvent  ┌──────────────┐
//!   │ backend + timer │───────────────▶│ apply(event) │──▶ Vec<Notice>
//!   │      tasks      │    (mpsc)      │  ClientState │
//!   └─────────────────┘                └──────────────┘
//! ```
//!
//! Responses that arrive after a clear are dropped: query tickets carry the
//! conversation epoch, and listing requests carry the session's clear epoch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use qarag_core::conversation::{QueryTicket, Resolution};
use qarag_core::display::PanelState;
use qarag_core::ingestion::{CycleToken, IngestionBusy, IngestionPhase, IngestionTimings};
use qarag_core::models::{ranks_are_contiguous, QueryResponse};
use qarag_core::state::ClientState;

use crate::config::Config;
use crate::error::ClientResult;
use crate::progress::{IngestionProgressEvent, IngestionProgressReporter, NoProgress};
use crate::transport::{Backend, UploadFile};

/// Diagnostic text appended as the assistant turn when a query fails.
pub const QUERY_FAILURE_MESSAGE: &str = "Critical error in RAG pipeline. Verify backend status.";

/// Completion of a task started by the session.
#[derive(Debug)]
pub enum SessionEvent {
    DocumentsListed {
        epoch: u64,
        result: ClientResult<Vec<String>>,
    },
    QueryResolved {
        ticket: QueryTicket,
        result: ClientResult<QueryResponse>,
    },
    UploadResolved {
        cycle: CycleToken,
        result: ClientResult<()>,
    },
    StageTimer {
        cycle: CycleToken,
        phase: IngestionPhase,
    },
    HoldElapsed {
        cycle: CycleToken,
    },
    ClearResolved {
        result: ClientResult<()>,
    },
}

/// What changed after applying an event, for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// This many assistant exchanges were appended to the log.
    ExchangesAppended(usize),
    /// The ingestion tracker moved to a new phase.
    PhaseChanged(IngestionPhase),
    /// The upload failed; the user must be told.
    UploadFailed(String),
    /// The document listing was replaced.
    DocumentsUpdated,
}

#[derive(Debug, Error, PartialEq)]
pub enum UploadRejected {
    #[error(transparent)]
    Busy(#[from] IngestionBusy),
    #[error("no PDF files selected")]
    NoFiles,
}

/// Knobs a session needs from configuration and the terminal.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub timings: IngestionTimings,
    pub columns: u16,
    pub narrow_columns: u16,
}

impl SessionOptions {
    pub fn from_config(config: &Config, columns: u16) -> Self {
        Self {
            timings: config.ingestion.timings(),
            columns,
            narrow_columns: config.display.narrow_columns,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timings: IngestionTimings::default(),
            columns: 120,
            narrow_columns: 100,
        }
    }
}

pub struct Session {
    state: ClientState,
    backend: Arc<dyn Backend>,
    options: SessionOptions,
    reporter: Box<dyn IngestionProgressReporter>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    /// Stage and hold timers of the current ingestion cycle.
    timers: Vec<JoinHandle<()>>,
    /// Backend requests dispatched but not yet applied.
    in_flight: usize,
    clear_epoch: u64,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, options: SessionOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: ClientState::new(PanelState::for_width(
                options.columns,
                options.narrow_columns,
            )),
            backend,
            options,
            reporter: Box::new(NoProgress),
            events_tx,
            events_rx,
            timers: Vec::new(),
            in_flight: 0,
            clear_epoch: 0,
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn IngestionProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn backend_location(&self) -> &str {
        self.backend.location()
    }

    pub fn columns(&self) -> u16 {
        self.options.columns
    }

    pub fn set_columns(&mut self, columns: u16) {
        self.options.columns = columns;
    }

    pub fn toggle_evidence_panel(&mut self) -> bool {
        self.state.panel.toggle()
    }

    /// No backend request is pending and no ingestion cycle is active.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && !self.state.ingestion.is_active()
    }

    pub fn refresh_documents(&mut self) {
        let backend = Arc::clone(&self.backend);
        let epoch = self.clear_epoch;
        self.dispatch(async move {
            let result = backend.list_documents().await;
            SessionEvent::DocumentsListed { epoch, result }
        });
    }

    /// Append the user's turn and send the query. Blank input is ignored.
    pub fn submit_query(&mut self, text: &str) -> Option<QueryTicket> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let ticket = self.state.conversation.append_user_exchange(text);
        tracing::debug!(seq = ticket.seq(), "query submitted");

        let backend = Arc::clone(&self.backend);
        let query = text.to_string();
        self.dispatch(async move {
            let result = backend.submit_query(&query).await;
            SessionEvent::QueryResolved { ticket, result }
        });
        Some(ticket)
    }

    /// Start an ingestion cycle: the upload request and the stage timers
    /// begin together.
    pub fn start_upload(&mut self, files: Vec<UploadFile>) -> Result<CycleToken, UploadRejected> {
        if files.is_empty() {
            return Err(UploadRejected::NoFiles);
        }
        let cycle = self.state.ingestion.begin()?;

        self.reporter.report(IngestionProgressEvent::Started {
            files: files.len(),
            bytes: files.iter().map(|f| f.bytes.len() as u64).sum(),
        });
        tracing::info!(files = files.len(), cycle = cycle.id(), "upload started");

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.upload_documents(files).await;
            SessionEvent::UploadResolved { cycle, result }
        });

        let timings = self.options.timings;
        self.spawn_timer(
            timings.parsing_after,
            SessionEvent::StageTimer {
                cycle,
                phase: IngestionPhase::Parsing,
            },
        );
        self.spawn_timer(
            timings.embedding_after,
            SessionEvent::StageTimer {
                cycle,
                phase: IngestionPhase::Embedding,
            },
        );
        Ok(cycle)
    }

    /// Wipe the backend and the local log and listing.
    ///
    /// Local state is cleared at dispatch, not on success; a failed clear is
    /// only logged.
    pub fn clear_all(&mut self) {
        self.state.clear_all();
        self.clear_epoch += 1;

        let backend = Arc::clone(&self.backend);
        self.dispatch(async move {
            let result = backend.clear_all().await;
            SessionEvent::ClearResolved { result }
        });
    }

    /// Wait for the next task completion.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Apply events until the session is idle, handing each notice to `f`.
    pub async fn settle<F>(&mut self, mut f: F)
    where
        F: FnMut(&Session, &Notice),
    {
        while !self.is_idle() {
            let Some(event) = self.next_event().await else {
                break;
            };
            for notice in self.apply(event) {
                f(self, &notice);
            }
        }
    }

    pub fn apply(&mut self, event: SessionEvent) -> Vec<Notice> {
        match event {
            SessionEvent::DocumentsListed { epoch, result } => {
                self.in_flight -= 1;
                self.on_documents_listed(epoch, result)
            }
            SessionEvent::QueryResolved { ticket, result } => {
                self.in_flight -= 1;
                self.on_query_resolved(ticket, result)
            }
            SessionEvent::UploadResolved { cycle, result } => {
                self.in_flight -= 1;
                self.on_upload_resolved(cycle, result)
            }
            SessionEvent::StageTimer { cycle, phase } => self
                .state
                .ingestion
                .advance(cycle, phase)
                .map(|p| self.phase_changed(p))
                .into_iter()
                .collect(),
            SessionEvent::HoldElapsed { cycle } => self
                .state
                .ingestion
                .finish(cycle)
                .map(|p| self.phase_changed(p))
                .into_iter()
                .collect(),
            SessionEvent::ClearResolved { result } => {
                self.in_flight -= 1;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "clear request failed");
                }
                Vec::new()
            }
        }
    }

    fn on_documents_listed(&mut self, epoch: u64, result: ClientResult<Vec<String>>) -> Vec<Notice> {
        match result {
            Ok(_) if epoch != self.clear_epoch => {
                tracing::debug!("discarding document listing requested before clear");
                Vec::new()
            }
            Ok(files) => {
                self.state.documents.replace(files);
                vec![Notice::DocumentsUpdated]
            }
            Err(e) => {
                tracing::warn!(error = %e, "document listing unavailable, keeping cached list");
                Vec::new()
            }
        }
    }

    fn on_query_resolved(
        &mut self,
        ticket: QueryTicket,
        result: ClientResult<QueryResponse>,
    ) -> Vec<Notice> {
        let answered = result.is_ok();
        let resolution = match result {
            Ok(response) => {
                if !ranks_are_contiguous(&response.evidence) {
                    tracing::warn!(
                        passages = response.evidence.len(),
                        "evidence ranks are not contiguous from 1"
                    );
                }
                self.state
                    .conversation
                    .append_assistant_exchange(ticket, response)
            }
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                self.state
                    .conversation
                    .append_assistant_error(ticket, QUERY_FAILURE_MESSAGE)
            }
        };

        match resolution {
            Resolution::Appended(n) => {
                if answered {
                    self.state.panel.on_answer(self.options.columns);
                }
                vec![Notice::ExchangesAppended(n)]
            }
            Resolution::Buffered => Vec::new(),
            Resolution::Stale => {
                tracing::debug!(seq = ticket.seq(), "discarding response from before clear");
                Vec::new()
            }
            Resolution::Duplicate => {
                tracing::warn!(seq = ticket.seq(), "query resolved twice");
                Vec::new()
            }
        }
    }

    fn on_upload_resolved(&mut self, cycle: CycleToken, result: ClientResult<()>) -> Vec<Notice> {
        self.cancel_timers();
        match result {
            Ok(()) => {
                let Some(phase) = self.state.ingestion.complete(cycle) else {
                    return Vec::new();
                };
                let notice = self.phase_changed(phase);
                self.refresh_documents();
                self.spawn_timer(
                    self.options.timings.complete_hold,
                    SessionEvent::HoldElapsed { cycle },
                );
                vec![notice]
            }
            Err(e) => {
                if self.state.ingestion.fail(cycle).is_none() {
                    return Vec::new();
                }
                tracing::warn!(error = %e, "upload failed");
                self.reporter.report(IngestionProgressEvent::Failed {
                    reason: e.to_string(),
                });
                vec![
                    Notice::PhaseChanged(IngestionPhase::Idle),
                    Notice::UploadFailed(format!(
                        "System Offline: Backend must be running at {}",
                        self.backend.location()
                    )),
                ]
            }
        }
    }

    fn phase_changed(&self, phase: IngestionPhase) -> Notice {
        self.reporter
            .report(IngestionProgressEvent::Phase { phase });
        Notice::PhaseChanged(phase)
    }

    fn dispatch<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = SessionEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    fn spawn_timer(&mut self, after: Duration, event: SessionEvent) {
        let tx = self.events_tx.clone();
        self.timers.push(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(event);
        }));
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
