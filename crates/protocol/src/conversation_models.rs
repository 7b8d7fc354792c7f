//! Conversation models produced by agents during orchestration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Role of the author of a conversation entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    System,
    User,
    #[default]
    Assistant,
    Tool,
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthorRole::System => "system",
            AuthorRole::User => "user",
            AuthorRole::Assistant => "assistant",
            AuthorRole::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// A complete message in an orchestration conversation.
///
/// Entries are appended to the history in invocation order and never
/// mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ConversationEntry {
    pub role: AuthorRole,

    /// Name of the agent that produced the entry, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    pub content: String,

    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    /// Create an entry timestamped now.
    pub fn new(role: AuthorRole, content: impl Into<String>) -> Self {
        Self {
            role,
            author_name: None,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Set the author name.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_name = Some(author.into());
        self
    }

    /// `role` or `role - author`, as used in log and broadcast lines.
    pub fn speaker(&self) -> String {
        match &self.author_name {
            Some(author) => format!("{} - {author}", self.role),
            None => self.role.to_string(),
        }
    }
}

impl fmt::Display for ConversationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.speaker(), self.content)
    }
}

/// A partial piece of a streamed response.
///
/// Role and author are usually only present on the first fragment of a
/// stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
pub struct StreamFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AuthorRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamFragment {
    /// A fragment carrying only content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: None,
            author_name: None,
            content: Some(content.into()),
        }
    }

    /// Set the author role and name.
    pub fn from_author(mut self, role: AuthorRole, author: impl Into<String>) -> Self {
        self.role = Some(role);
        self.author_name = Some(author.into());
        self
    }
}
