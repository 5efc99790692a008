use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a note captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A single user utterance.
    Message,
    /// A summary of a stretch of conversation.
    Summary,
}

impl Default for NoteKind {
    fn default() -> Self {
        Self::Message
    }
}

/// Sensitivity classification stored with every note. Only `Personal` is
/// written today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Personal,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self::Personal
    }
}

/// A note to be written. The store assigns the id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    pub user_id: String,
    pub content: String,
    pub kind: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    pub sensitivity: Sensitivity,
}

impl NewNote {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>, kind: NoteKind) -> Self {
        Self {
            user_id: user_id.into(),
            content: content.into(),
            kind,
            sentiment: None,
            topic: None,
            summary: None,
            next_step: None,
            sensitivity: Sensitivity::Personal,
        }
    }

    pub fn with_sentiment(mut self, sentiment: impl Into<String>) -> Self {
        self.sentiment = Some(sentiment.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_next_step(mut self, next_step: impl Into<String>) -> Self {
        self.next_step = Some(next_step.into());
        self
    }
}

/// A persisted note, as returned by the store after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub kind: NoteKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub sensitivity: Sensitivity,
}

/// A retrieved memory. Built fresh per retrieval call, never persisted.
///
/// `similarity` is only set when the memory came out of vector search;
/// recency results leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(rename = "created_at")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl From<&NoteRecord> for Memory {
    fn from(note: &NoteRecord) -> Self {
        Self {
            id: note.id.clone(),
            content: note.content.clone(),
            timestamp: note.created_at,
            sentiment: note.sentiment.clone(),
            topic: note.topic.clone(),
            similarity: None,
        }
    }
}

/// Arguments to the store's similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct MatchQuery {
    pub query_embedding: Vec<f32>,
    pub match_threshold: f32,
    pub match_count: usize,
    pub filter_user_id: String,
}

/// True if `id` is a canonical hyphenated UUID (8-4-4-4-12 hex digits).
/// Anything else is treated as an anonymous caller and never reaches the store.
pub fn is_canonical_user_id(id: &str) -> bool {
    // `try_parse` also accepts simple, braced and urn forms; pin the width
    // to the hyphenated one.
    id.len() == 36 && uuid::Uuid::try_parse(id).is_ok()
}
