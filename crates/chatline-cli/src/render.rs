/// What to write to the terminal for a new snapshot.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderOp {
    /// Snapshot extends what is on screen; print only the suffix.
    Append(String),
    /// Snapshot diverges from what is on screen; reprint it in full.
    Replace(String),
    /// Nothing new to show.
    Unchanged,
}

/// Tracks the reply text already printed for the current turn so full-text
/// snapshots can be rendered incrementally on a line-oriented terminal.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    shown: String,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `text` as the current snapshot and returns the terminal update.
    pub fn update(&mut self, text: &str) -> RenderOp {
        if text == self.shown {
            return RenderOp::Unchanged;
        }
        let op = match text.strip_prefix(self.shown.as_str()) {
            Some(suffix) => RenderOp::Append(suffix.to_string()),
            None => RenderOp::Replace(text.to_string()),
        };
        self.shown = text.to_string();
        op
    }

    /// Text of the latest snapshot.
    pub fn shown(&self) -> &str {
        &self.shown
    }
}
