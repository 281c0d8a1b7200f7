//! Core data models shared by the client.
//!
//! These types mirror the JSON the backend returns for a query and the
//! entries kept in the conversation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker the backend places between the direct answer and the appended
/// generation trace inside an answer text.
pub const TRACE_DELIMITER: &str = "Generation Process:";

/// Match percentage above which a passage is badged as [`MatchBadge::Precise`].
pub const DEFAULT_PRECISE_THRESHOLD: f64 = 85.0;

/// Who produced an [`Exchange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One retrieved passage supporting an answer.
///
/// Field names match the backend's evidence JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// 1-based position in the retrieval ranking.
    pub rank: u32,
    pub filename: String,
    pub page: u32,
    /// Passage content, displayed verbatim.
    pub text: String,
    /// Raw similarity score as reported by the backend.
    pub score: f64,
    /// Normalized 0–100 relevance, display only.
    pub match_percent: f64,
    /// Backend-assigned tag (e.g. `"High Match"`); opaque to the client.
    pub status: String,
}

/// Display classification of a passage's relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBadge {
    Precise,
    Relevant,
}

impl MatchBadge {
    pub fn label(&self) -> &'static str {
        match self {
            MatchBadge::Precise => "Precise",
            MatchBadge::Relevant => "Relevant",
        }
    }
}

impl Evidence {
    /// Classify against `threshold`; a passage must be strictly above it
    /// to count as precise.
    pub fn badge(&self, threshold: f64) -> MatchBadge {
        if self.match_percent > threshold {
            MatchBadge::Precise
        } else {
            MatchBadge::Relevant
        }
    }

    /// Bar fill in percent, clamped to `[0, 100]`.
    pub fn bar_fill(&self) -> f64 {
        if self.match_percent.is_nan() {
            return 0.0;
        }
        self.match_percent.clamp(0.0, 100.0)
    }
}

/// Returns true when ranks run `1, 2, 3, ...` in sequence order.
pub fn ranks_are_contiguous(evidence: &[Evidence]) -> bool {
    evidence
        .iter()
        .enumerate()
        .all(|(i, ev)| ev.rank as usize == i + 1)
}

/// Successful response body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub verification: Option<String>,
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub role: Role,
    pub text: String,
    /// Only ever non-empty on assistant exchanges.
    pub evidence: Vec<Evidence>,
    pub verification: Option<String>,
    /// Set on the diagnostic exchange appended when a query fails.
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl Exchange {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            evidence: Vec::new(),
            verification: None,
            is_error: false,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(response: QueryResponse) -> Self {
        Self {
            role: Role::Assistant,
            text: response.answer,
            evidence: response.evidence,
            verification: response.verification.filter(|v| !v.trim().is_empty()),
            is_error: false,
            created_at: Utc::now(),
        }
    }

    pub fn assistant_error(message: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: message.into(),
            evidence: Vec::new(),
            verification: None,
            is_error: true,
            created_at: Utc::now(),
        }
    }

    /// Split the text into the direct answer and any generation traces.
    ///
    /// Display only: nothing in the client branches on the result.
    pub fn answer_sections(&self) -> AnswerSections<'_> {
        let mut parts = self.text.split(TRACE_DELIMITER);
        let answer = parts.next().unwrap_or_default();
        AnswerSections {
            answer,
            traces: parts.collect(),
        }
    }
}

/// Borrowed view of an answer split on [`TRACE_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSections<'a> {
    pub answer: &'a str,
    pub traces: Vec<&'a str>,
}
