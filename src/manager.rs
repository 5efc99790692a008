use std::future::Future;

use tracing::{debug, info, warn};

use crate::config::{MemoryConfig, RetrievalConfig};
use crate::context::build_context;
use crate::embedders::OpenAiEmbedder;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;
use crate::store::NoteStore;
use crate::stores::SupabaseStore;
use crate::types::{is_canonical_user_id, MatchQuery, Memory, NewNote};

/// Conversational memory. Wires together a note store and an embedding
/// provider: writes notes with best-effort embeddings, retrieves related
/// notes with a recency fallback, and renders them for the prompt.
///
/// Every failure here degrades personalization rather than the chat itself.
pub struct CompanionMemory {
    store: Box<dyn NoteStore>,
    embedder: Box<dyn EmbeddingProvider>,
    retrieval: RetrievalConfig,
}

impl CompanionMemory {
    pub fn new(
        store: impl NoteStore + 'static,
        embedder: impl EmbeddingProvider + 'static,
    ) -> Self {
        Self {
            store: Box::new(store),
            embedder: Box::new(embedder),
            retrieval: RetrievalConfig::default(),
        }
    }

    /// Build the production wiring: OpenAI embeddings and a Supabase store,
    /// the latter disabled if the config carries no Supabase credentials.
    pub fn from_config(config: &MemoryConfig) -> Result<Self, MemoryError> {
        let store = SupabaseStore::from_config(config.supabase.clone());
        if !store.is_enabled() {
            warn!("supabase not configured, memory persistence disabled");
        }
        Self::new(store, OpenAiEmbedder::from_config(&config.embedding))
            .with_retrieval_config(config.retrieval.clone())
    }

    /// Replace the retrieval knobs. Rejects configs that `RetrievalConfig::validate` refuses.
    pub fn with_retrieval_config(mut self, config: RetrievalConfig) -> Result<Self, MemoryError> {
        config.validate()?;
        self.retrieval = config;
        Ok(self)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    /// Persist a note, then try to embed it. Returns the new note's id, or an
    /// empty string when the store is disabled.
    ///
    /// A note whose `user_id` isn't a canonical UUID is refused with
    /// `MemoryError::Validation` before anything is called; retrieval could
    /// never return it. Past that, only the note insert can fail this call.
    /// The embedding is a quality of service extra: if it fails the note
    /// stays, unembedded, and is only reachable through recency retrieval.
    pub async fn save_note(&self, note: NewNote) -> Result<String, MemoryError> {
        if !is_canonical_user_id(&note.user_id) {
            return Err(MemoryError::Validation(format!(
                "note owner {:?} is not a canonical user id",
                note.user_id
            )));
        }

        if !self.store.is_enabled() {
            warn!(user_id = %note.user_id, "memory store disabled, dropping note");
            return Ok(String::new());
        }

        let record = self.store.insert_note(&note).await?;
        info!(note_id = %record.id, user_id = %record.user_id, kind = ?record.kind, "saved note");

        best_effort("embed note", &record.id, async {
            let embedding = self.embedder.embed(&record.content).await?;
            self.store.insert_embedding(&record.id, &embedding).await
        })
        .await;

        Ok(record.id)
    }

    /// Related past notes for `message`, at most the configured match count.
    pub async fn retrieve(&self, user_id: &str, message: &str) -> Result<Vec<Memory>, MemoryError> {
        self.retrieve_with_limit(user_id, message, self.retrieval.match_count)
            .await
    }

    /// Related past notes for `message`, most relevant first, at most `limit`.
    ///
    /// Vector search first. If embedding the message or the search itself
    /// fails, falls back to the `limit` newest notes. Only a failure of that
    /// fallback is returned as an error. A malformed `user_id` yields an
    /// empty list without touching the network.
    pub async fn retrieve_with_limit(
        &self,
        user_id: &str,
        message: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        if !self.accepts(user_id) || limit == 0 {
            return Ok(Vec::new());
        }

        match self.similar(user_id, message, limit).await {
            Ok(mut hits) => {
                hits.truncate(limit);
                debug!(user_id = %user_id, count = hits.len(), "vector retrieval");
                Ok(hits)
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "vector retrieval failed, using recent notes");
                self.recent_unchecked(user_id, limit).await
            }
        }
    }

    /// The `limit` newest notes for a user, without similarity scores.
    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        if !self.accepts(user_id) || limit == 0 {
            return Ok(Vec::new());
        }
        self.recent_unchecked(user_id, limit).await
    }

    /// Retrieve and render in one go. This is what the chat layer calls
    /// before building its prompt.
    pub async fn recall_context(&self, user_id: &str, message: &str) -> Result<String, MemoryError> {
        let memories = self.retrieve(user_id, message).await?;
        Ok(build_context(&memories))
    }

    fn accepts(&self, user_id: &str) -> bool {
        if !is_canonical_user_id(user_id) {
            debug!(user_id = %user_id, "not a canonical user id, skipping retrieval");
            return false;
        }
        if !self.store.is_enabled() {
            debug!("memory store disabled, skipping retrieval");
            return false;
        }
        true
    }

    async fn similar(
        &self,
        user_id: &str,
        message: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        let query_embedding = self.embedder.embed(message).await?;
        let query = MatchQuery {
            query_embedding,
            match_threshold: self.retrieval.match_threshold,
            match_count: limit,
            filter_user_id: user_id.to_string(),
        };
        self.store.match_notes(&query).await
    }

    async fn recent_unchecked(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        let mut notes = self.store.recent_notes(user_id, limit).await?;
        notes.truncate(limit);
        debug!(user_id = %user_id, count = notes.len(), "recency retrieval");
        Ok(notes)
    }
}

/// Run a secondary operation whose failure must not affect the caller.
/// Errors are logged and dropped.
async fn best_effort<F>(what: &str, note_id: &str, op: F)
where
    F: Future<Output = Result<(), MemoryError>>,
{
    if let Err(e) = op.await {
        warn!(note_id = %note_id, error = %e, "{what} failed");
    }
}
