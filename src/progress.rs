//! Ingestion progress reporting.
//!
//! Emits the tracker's phase changes during `qarag upload` (and `/upload` in
//! chat) so users see which stage the ingestion is in. Progress goes to
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use qarag_core::ingestion::IngestionPhase;

/// A single progress event for an ingestion cycle.
#[derive(Clone, Debug)]
pub enum IngestionProgressEvent {
    /// Cycle started; the upload request is in flight.
    Started { files: usize, bytes: u64 },
    /// The displayed phase changed.
    Phase { phase: IngestionPhase },
    /// The upload request failed and the tracker reset.
    Failed { reason: String },
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestionProgressReporter: Send + Sync {
    fn report(&self, event: IngestionProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  [##----]  Neural Parsing".
pub struct StderrProgress;

impl IngestionProgressReporter for StderrProgress {
    fn report(&self, event: IngestionProgressEvent) {
        let line = match &event {
            IngestionProgressEvent::Started { files, bytes } => {
                format!(
                    "ingest  {}  {} file(s), {} bytes\n",
                    phase_bar(IngestionPhase::Uploading),
                    files,
                    format_number(*bytes)
                )
            }
            IngestionProgressEvent::Phase { phase } => match phase {
                IngestionPhase::Idle => "ingest  done\n".to_string(),
                IngestionPhase::Complete => {
                    format!("ingest  {}  indexed\n", phase_bar(*phase))
                }
                _ => format!("ingest  {}  {}...\n", phase_bar(*phase), phase.label()),
            },
            IngestionProgressEvent::Failed { reason } => {
                format!("ingest  failed: {}\n", reason)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestionProgressReporter for JsonProgress {
    fn report(&self, event: IngestionProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event_json(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestionProgressReporter for NoProgress {
    fn report(&self, _event: IngestionProgressEvent) {}
}

fn event_json(event: &IngestionProgressEvent) -> serde_json::Value {
    match event {
        IngestionProgressEvent::Started { files, bytes } => serde_json::json!({
            "event": "progress",
            "phase": IngestionPhase::Uploading.to_string(),
            "step": IngestionPhase::Uploading.step(),
            "fill_percent": IngestionPhase::Uploading.fill_percent(),
            "files": files,
            "bytes": bytes
        }),
        IngestionProgressEvent::Phase { phase } => serde_json::json!({
            "event": "progress",
            "phase": phase.to_string(),
            "step": phase.step(),
            "fill_percent": phase.fill_percent()
        }),
        IngestionProgressEvent::Failed { reason } => serde_json::json!({
            "event": "failed",
            "phase": IngestionPhase::Idle.to_string(),
            "step": 0,
            "reason": reason
        }),
    }
}

/// Four-slot bar, one slot per step.
fn phase_bar(phase: IngestionPhase) -> String {
    let filled = phase.step() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(4 - filled))
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestionProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
