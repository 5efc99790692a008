use async_trait::async_trait;

use crate::error::MemoryError;
use crate::types::{MatchQuery, Memory, NewNote, NoteRecord};

/// Backing store for notes and their embeddings. Supabase in production,
/// an in-process store for tests and offline runs. The memory service
/// handles fallback and failure isolation; the store just stores and retrieves.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Whether the store has the credentials it needs. A disabled store is
    /// never called; writes become no-ops and retrieval comes back empty.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Insert a note row. Returns the created row with its generated id and timestamp.
    async fn insert_note(&self, note: &NewNote) -> Result<NoteRecord, MemoryError>;

    /// Insert the embedding for an existing note.
    async fn insert_embedding(&self, note_id: &str, embedding: &[f32]) -> Result<(), MemoryError>;

    /// Similarity search. Rows come back already filtered to
    /// `similarity >= match_threshold`, ordered by descending similarity,
    /// capped at `match_count`, and restricted to `filter_user_id`.
    async fn match_notes(&self, query: &MatchQuery) -> Result<Vec<Memory>, MemoryError>;

    /// The `limit` most recent notes for a user, newest first. No similarity attached.
    async fn recent_notes(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>, MemoryError>;
}

/// Blanket impl so `Box<dyn NoteStore>` can be handed to `CompanionMemory::new()`.
#[async_trait]
impl NoteStore for Box<dyn NoteStore> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    async fn insert_note(&self, note: &NewNote) -> Result<NoteRecord, MemoryError> {
        (**self).insert_note(note).await
    }

    async fn insert_embedding(&self, note_id: &str, embedding: &[f32]) -> Result<(), MemoryError> {
        (**self).insert_embedding(note_id, embedding).await
    }

    async fn match_notes(&self, query: &MatchQuery) -> Result<Vec<Memory>, MemoryError> {
        (**self).match_notes(query).await
    }

    async fn recent_notes(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        (**self).recent_notes(user_id, limit).await
    }
}
