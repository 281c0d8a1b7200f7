//! The client's complete state in one owned value.
//!
//! Nothing here is global: the owner (a session or a test) holds a
//! [`ClientState`] and mutates it only through the methods of its parts.

use crate::conversation::ConversationLog;
use crate::display::PanelState;
use crate::documents::DocumentListing;
use crate::evidence::active_evidence;
use crate::ingestion::IngestionTracker;
use crate::models::Evidence;

#[derive(Debug)]
pub struct ClientState {
    pub conversation: ConversationLog,
    pub documents: DocumentListing,
    pub ingestion: IngestionTracker,
    pub panel: PanelState,
}

impl ClientState {
    pub fn new(panel: PanelState) -> Self {
        Self {
            conversation: ConversationLog::new(),
            documents: DocumentListing::new(),
            ingestion: IngestionTracker::new(),
            panel,
        }
    }

    pub fn active_evidence(&self) -> &[Evidence] {
        active_evidence(&self.conversation)
    }

    /// Forget every document and exchange on the client side.
    ///
    /// The ingestion tracker is left alone: an upload in flight keeps its
    /// own cycle and refreshes the listing when it completes.
    pub fn clear_all(&mut self) {
        self.conversation.clear();
        self.documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::IngestionPhase;
    use crate::models::QueryResponse;

    #[test]
    fn clear_all_empties_log_and_listing() {
        let mut state = ClientState::new(PanelState::for_width(120, 100));
        state.documents.replace(vec!["a.pdf".to_string()]);
        let t = state.conversation.append_user_exchange("q");
        state.conversation.append_assistant_exchange(
            t,
            QueryResponse {
                answer: "a".to_string(),
                evidence: vec![],
                verification: None,
            },
        );
        let upload = state.ingestion.begin().unwrap();

        state.clear_all();

        assert!(state.conversation.is_empty());
        assert!(state.documents.is_empty());
        assert!(state.active_evidence().is_empty());
        assert_eq!(state.ingestion.phase(), IngestionPhase::Uploading);
        assert_eq!(state.ingestion.current_cycle(), Some(upload));
    }
}
