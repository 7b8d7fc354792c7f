//! Conversation aggregation for orchestration runs.
//!
//! The monitor keeps the ordered history of complete entries and buffers
//! streamed fragments until their group closes. One monitor serves one
//! logical stream at a time.

use crate::broadcast::Broadcaster;
use gk_protocol::conversation_models::{AuthorRole, ConversationEntry, StreamFragment};
use std::sync::Arc;
use tracing::{debug, info};

/// Aggregates agent responses into a conversation history.
#[derive(Default)]
pub struct OrchestrationMonitor {
    history: Vec<ConversationEntry>,
    pending: Vec<StreamFragment>,
    emitted: usize,
    broadcaster: Option<Arc<dyn Broadcaster>>,
}

impl OrchestrationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also publish every emitted entry to `broadcaster`.
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Append a complete entry and emit it.
    pub fn record_final(&mut self, entry: ConversationEntry) {
        self.emit(&entry, None);
        self.history.push(entry);
    }

    /// Buffer a streamed fragment.
    ///
    /// When `is_final` is set the buffered group is combined into one entry,
    /// appended to the history, emitted and returned. Fragments of a group
    /// that is still open are never emitted on their own.
    pub fn record_stream_fragment(
        &mut self,
        fragment: StreamFragment,
        is_final: bool,
    ) -> Option<ConversationEntry> {
        self.pending.push(fragment);
        if is_final {
            self.flush_pending()
        } else {
            None
        }
    }

    /// Close the open fragment group, if any.
    pub fn flush_pending(&mut self) -> Option<ConversationEntry> {
        if self.pending.is_empty() {
            return None;
        }

        let fragments = std::mem::take(&mut self.pending);
        let role = fragments
            .iter()
            .find_map(|fragment| fragment.role)
            .unwrap_or(AuthorRole::Assistant);
        let author = fragments
            .iter()
            .find_map(|fragment| fragment.author_name.clone());
        let content: String = fragments
            .iter()
            .filter_map(|fragment| fragment.content.as_deref())
            .collect();

        let mut entry = ConversationEntry::new(role, content);
        entry.author_name = author;

        let rendered = render_fragments(&fragments);
        self.emit(&entry, Some(&rendered));
        self.history.push(entry.clone());
        Some(entry)
    }

    /// Drop the open fragment group without emitting it.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        if dropped > 0 {
            debug!(fragments = dropped, "discarding unterminated stream");
        }
        self.pending.clear();
        dropped
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.history
    }

    /// Number of fragments waiting for their group to close.
    pub fn pending_fragments(&self) -> usize {
        self.pending.len()
    }

    /// Number of emissions so far.
    pub fn emitted_count(&self) -> usize {
        self.emitted
    }

    pub fn into_history(self) -> Vec<ConversationEntry> {
        self.history
    }

    fn emit(&mut self, entry: &ConversationEntry, rendered: Option<&str>) {
        self.emitted += 1;
        info!(
            speaker = %entry.speaker(),
            content = %entry.content,
            rendered = rendered.unwrap_or_default(),
            "conversation entry"
        );

        if entry.content.trim().is_empty() {
            return;
        }
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.publish(&entry.to_string());
        }
    }
}

/// Render fragments with their boundaries intact: each payload JSON-quoted
/// and wrapped in parentheses, e.g. `("Hel")("lo")`.
pub fn render_fragments(fragments: &[StreamFragment]) -> String {
    fragments
        .iter()
        .filter_map(|fragment| fragment.content.as_ref())
        .map(|content| format!("({})", serde_json::Value::String(content.clone())))
        .collect()
}
