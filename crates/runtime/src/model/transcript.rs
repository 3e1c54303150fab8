//! Append-only conversation transcript.

use super::types::{HistoryEntry, Turn};

/// The ordered record of one conversation, replayed to the provider on every
/// call. Turns are never edited or removed once appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a transcript from caller-supplied history.
    pub fn from_history(history: impl IntoIterator<Item = HistoryEntry>) -> Self {
        Self {
            turns: history.into_iter().map(Turn::from).collect(),
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in the order they were appended.
    pub fn render(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Whether any tool call in the transcript already uses `id`.
    pub fn has_call_id(&self, id: &str) -> bool {
        self.turns
            .iter()
            .any(|turn| matches!(turn, Turn::ToolCall(call) if call.id == id))
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
