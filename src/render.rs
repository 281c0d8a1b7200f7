//! Terminal rendering of client state.
//!
//! Every function returns a `String` so callers decide where it goes and
//! tests can assert on the exact text. Human output is plain text; `ask
//! --json` uses [`format_ask_json`].

use serde::Serialize;

use qarag_core::conversation::ConversationLog;
use qarag_core::documents::DocumentListing;
use qarag_core::evidence::EvidenceSummary;
use qarag_core::ingestion::{IngestionPhase, StepState};
use qarag_core::models::{Evidence, Exchange, Role};

const BAR_WIDTH: usize = 20;

/// Width of the attached terminal. Without one, `$COLUMNS` or 120.
pub fn terminal_columns() -> u16 {
    match crossterm::terminal::size() {
        Ok((columns, _)) if columns > 0 => columns,
        _ => columns_from_env(std::env::var("COLUMNS").ok().as_deref()),
    }
}

fn columns_from_env(value: Option<&str>) -> u16 {
    value
        .and_then(|c| c.trim().parse::<u16>().ok())
        .filter(|c| *c > 0)
        .unwrap_or(120)
}

fn bar(percent: f64, width: usize) -> String {
    let percent = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

pub fn render_documents(listing: &DocumentListing) -> String {
    let mut out = String::from("Doc Repositories\n");
    if listing.is_empty() {
        out.push_str("  No active repositories found\n");
        return out;
    }
    for file in listing.files() {
        out.push_str(&format!("  - {}\n", file));
    }
    out
}

/// The three-step ingestion widget with its fill bar.
pub fn render_ingestion(phase: IngestionPhase) -> String {
    let mut out = String::new();
    for stage in IngestionPhase::STAGES {
        let marker = match phase.step_state(stage) {
            StepState::Pending => " ",
            StepState::Active => "~",
            StepState::Done => "x",
        };
        out.push_str(&format!("  [{}] {}\n", marker, stage.label()));
    }
    out.push_str(&format!(
        "  {} {:.0}%\n",
        bar(phase.fill_percent(), BAR_WIDTH),
        phase.fill_percent()
    ));
    out
}

pub fn render_exchange(exchange: &Exchange) -> String {
    match exchange.role {
        Role::User => format!("you> {}\n", exchange.text),
        Role::Assistant => render_assistant(exchange),
    }
}

fn render_assistant(exchange: &Exchange) -> String {
    let mut out = String::new();
    if exchange.is_error {
        out.push_str(&format!("! {}\n", exchange.text));
        return out;
    }

    let sections = exchange.answer_sections();
    for line in sections.answer.trim_end().lines() {
        out.push_str(&format!("  {}\n", line));
    }
    for trace in sections.traces {
        out.push_str("\n  -- Generation Process --\n");
        for line in trace.trim().lines() {
            out.push_str(&format!("  | {}\n", line));
        }
    }

    if let Some(verification) = &exchange.verification {
        out.push_str("\n  -- Traceability [Grounded] --\n");
        for line in verification.trim().lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out
}

pub fn render_loading(outstanding: usize) -> String {
    if outstanding == 1 {
        "  ... waiting for answer\n".to_string()
    } else {
        format!("  ... waiting for {} answers\n", outstanding)
    }
}

/// The evidence panel for the active evidence set.
pub fn render_evidence_panel(evidence: &[Evidence], precise_threshold: f64) -> String {
    let mut out = String::from("Intelligence Matrix\n");
    if evidence.is_empty() {
        out.push_str("  Waiting for query\n");
        return out;
    }

    let summary = EvidenceSummary::from_evidence(evidence, precise_threshold);
    if let Some(mean) = summary.mean_match_percent {
        out.push_str(&format!(
            "  {} passage(s), {} precise, mean match {:.1}%\n",
            summary.count, summary.precise, mean
        ));
    }

    for ev in evidence {
        out.push('\n');
        out.push_str(&format!(
            "  PASSAGE {} \u{2022} P{}  [{}]\n",
            ev.rank,
            ev.page,
            ev.badge(precise_threshold).label()
        ));
        out.push_str(&format!("  \"{}\"\n", ev.text));
        out.push_str(&format!("  {} ({})\n", ev.filename, ev.status));
        out.push_str(&format!(
            "  Vector Similarity {} {:.1}%\n",
            bar(ev.bar_fill(), BAR_WIDTH),
            ev.match_percent
        ));
    }
    out
}

/// Full log with timestamps and per-turn evidence counts.
pub fn render_history(log: &ConversationLog) -> String {
    if log.is_empty() {
        return "No exchanges yet.\n".to_string();
    }
    let mut out = String::new();
    for (i, ex) in log.exchanges().iter().enumerate() {
        let who = match ex.role {
            Role::User => "user",
            Role::Assistant if ex.is_error => "error",
            Role::Assistant => "assistant",
        };
        let first_line = ex.text.lines().next().unwrap_or_default();
        out.push_str(&format!(
            "{:>3}  {}  {:<9}  {}",
            i + 1,
            ex.created_at.format("%H:%M:%S"),
            who,
            first_line
        ));
        if ex.role == Role::Assistant && !ex.evidence.is_empty() {
            out.push_str(&format!("  ({} passages)", ex.evidence.len()));
        }
        out.push('\n');
    }
    out
}

/// JSON shape printed by `qarag ask --json`.
#[derive(Serialize)]
pub struct AskOutput<'a> {
    pub query: &'a str,
    pub answer: &'a str,
    pub trace: Vec<&'a str>,
    pub verification: Option<&'a str>,
    pub error: bool,
    pub evidence: &'a [Evidence],
}

impl<'a> AskOutput<'a> {
    pub fn new(query: &'a str, exchange: &'a Exchange) -> Self {
        let sections = exchange.answer_sections();
        Self {
            query,
            answer: sections.answer.trim(),
            trace: sections.traces.into_iter().map(str::trim).collect(),
            verification: exchange.verification.as_deref(),
            error: exchange.is_error,
            evidence: &exchange.evidence,
        }
    }
}

pub fn format_ask_json(output: &AskOutput<'_>) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qarag_core::display::PanelState;
    use qarag_core::models::QueryResponse;

    fn evidence(rank: u32, match_percent: f64) -> Evidence {
        Evidence {
            rank,
            filename: "contract.pdf".to_string(),
            page: 9,
            text: "Either party may terminate.".to_string(),
            score: match_percent / 100.0,
            match_percent,
            status: "High Match".to_string(),
        }
    }

    #[test]
    fn columns_fallback_when_no_terminal() {
        assert_eq!(columns_from_env(None), 120);
        assert_eq!(columns_from_env(Some("80")), 80);
        assert_eq!(columns_from_env(Some(" 72 ")), 72);
        assert_eq!(columns_from_env(Some("0")), 120);
        assert_eq!(columns_from_env(Some("wide")), 120);
    }

    #[test]
    fn narrow_fallback_width_hides_panel() {
        let mut panel = PanelState::for_width(columns_from_env(Some("80")), 100);
        assert!(!panel.show_evidence());
        panel.on_answer(80);
        assert!(panel.show_evidence());
    }

    #[test]
    fn empty_listing_message() {
        let listing = DocumentListing::new();
        assert!(render_documents(&listing).contains("No active repositories found"));
    }

    #[test]
    fn ingestion_widget_marks_steps() {
        let out = render_ingestion(IngestionPhase::Parsing);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  [x] Upload Stream");
        assert_eq!(lines[1], "  [~] Neural Parsing");
        assert_eq!(lines[2], "  [ ] Vector Mapping");
        assert!(lines[3].ends_with("50%"));

        let done = render_ingestion(IngestionPhase::Complete);
        assert!(done.lines().take(3).all(|l| l.contains("[x]")));
        assert!(done.contains(&"=".repeat(BAR_WIDTH)));
    }

    #[test]
    fn assistant_answer_with_trace_and_verification() {
        let ex = Exchange::assistant(QueryResponse {
            answer: "Section 9 covers termination.\nGeneration Process:\nstep one\nstep two"
                .to_string(),
            evidence: vec![],
            verification: Some("Supported by page 9.".to_string()),
        });
        let out = render_exchange(&ex);
        assert!(out.starts_with("  Section 9 covers termination.\n"));
        assert!(out.contains("-- Generation Process --"));
        assert!(out.contains("  | step one\n  | step two\n"));
        assert!(out.contains("[Grounded]"));
        assert!(out.contains("Supported by page 9."));
    }

    #[test]
    fn error_exchange_is_flagged() {
        let out = render_exchange(&Exchange::assistant_error("backend down"));
        assert_eq!(out, "! backend down\n");
    }

    #[test]
    fn evidence_panel_badges_and_bar() {
        let out = render_evidence_panel(&[evidence(1, 91.0), evidence(2, 60.0)], 85.0);
        assert!(out.contains("PASSAGE 1 \u{2022} P9  [Precise]"));
        assert!(out.contains("PASSAGE 2 \u{2022} P9  [Relevant]"));
        assert!(out.contains("91.0%"));
        assert!(out.contains("2 passage(s), 1 precise, mean match 75.5%"));

        let empty = render_evidence_panel(&[], 85.0);
        assert!(empty.contains("Waiting for query"));
    }

    #[test]
    fn bar_is_clamped() {
        assert_eq!(bar(150.0, 4), "[====]");
        assert_eq!(bar(-5.0, 4), "[    ]");
        assert_eq!(bar(50.0, 4), "[==  ]");
    }

    #[test]
    fn history_lists_turns() {
        let mut log = ConversationLog::new();
        let t = log.append_user_exchange("What is the termination clause?");
        log.append_assistant_exchange(
            t,
            QueryResponse {
                answer: "Section 9.".to_string(),
                evidence: vec![evidence(1, 91.0)],
                verification: None,
            },
        );
        let out = render_history(&log);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("user"));
        assert!(lines[1].contains("assistant"));
        assert!(lines[1].ends_with("(1 passages)"));
    }

    #[test]
    fn ask_json_shape() {
        let ex = Exchange::assistant(QueryResponse {
            answer: "A.\nGeneration Process:\ntrace".to_string(),
            evidence: vec![evidence(1, 91.0)],
            verification: None,
        });
        let json = format_ask_json(&AskOutput::new("q", &ex));
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["answer"], "A.");
        assert_eq!(v["trace"][0], "trace");
        assert_eq!(v["evidence"][0]["match_percent"], 91.0);
        assert_eq!(v["error"], false);
        assert!(v["verification"].is_null());
    }
}
