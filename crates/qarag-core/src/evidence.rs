//! Evidence correlation.
//!
//! The evidence shown next to the conversation is never stored on its own.
//! It is always derived from the log: the evidence attached to the most
//! recent assistant exchange, or nothing. Earlier turns keep their evidence
//! in the log but are not surfaced here.

use crate::conversation::ConversationLog;
use crate::models::{Evidence, MatchBadge};

/// Evidence attached to the most recent assistant exchange.
pub fn active_evidence(log: &ConversationLog) -> &[Evidence] {
    log.last_assistant()
        .map(|ex| ex.evidence.as_slice())
        .unwrap_or(&[])
}

/// Aggregate view of an evidence set.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceSummary {
    pub count: usize,
    pub precise: usize,
    /// Mean of `match_percent` across the set; `None` when empty.
    pub mean_match_percent: Option<f64>,
}

impl EvidenceSummary {
    pub fn from_evidence(evidence: &[Evidence], precise_threshold: f64) -> Self {
        let count = evidence.len();
        let precise = evidence
            .iter()
            .filter(|ev| ev.badge(precise_threshold) == MatchBadge::Precise)
            .count();
        let mean_match_percent = if count == 0 {
            None
        } else {
            Some(evidence.iter().map(|ev| ev.match_percent).sum::<f64>() / count as f64)
        };
        Self {
            count,
            precise,
            mean_match_percent,
        }
    }
}
