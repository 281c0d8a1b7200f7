//! Panel visibility rules for narrow and wide terminals.

/// Whether the evidence panel is drawn alongside the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelState {
    show_evidence: bool,
    narrow_columns: u16,
}

impl PanelState {
    /// Initial state: shown on wide terminals, hidden on narrow ones.
    pub fn for_width(columns: u16, narrow_columns: u16) -> Self {
        Self {
            show_evidence: columns >= narrow_columns,
            narrow_columns,
        }
    }

    pub fn show_evidence(&self) -> bool {
        self.show_evidence
    }

    pub fn is_narrow(&self, columns: u16) -> bool {
        columns < self.narrow_columns
    }

    /// An answer arrived. Narrow terminals pop the panel open so the new
    /// evidence is seen; wide terminals keep whatever the user chose.
    pub fn on_answer(&mut self, columns: u16) {
        if self.is_narrow(columns) {
            self.show_evidence = true;
        }
    }

    pub fn toggle(&mut self) -> bool {
        self.show_evidence = !self.show_evidence;
        self.show_evidence
    }
}
