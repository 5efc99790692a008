use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::MemoryError;
use crate::scoring::{cosine_similarity, rank_matches};
use crate::store::NoteStore;
use crate::types::{MatchQuery, Memory, NewNote, NoteRecord};

/// Process-local note store. Does the similarity search itself with a
/// linear cosine scan, so it behaves like the hosted function for small data.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    notes: Vec<NoteRecord>,
    embeddings: HashMap<String, Vec<f32>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn note_count(&self) -> usize {
        self.inner.read().await.notes.len()
    }

    pub async fn embedding_count(&self) -> usize {
        self.inner.read().await.embeddings.len()
    }
}

#[async_trait]
impl NoteStore for InMemoryStore {
    async fn insert_note(&self, note: &NewNote) -> Result<NoteRecord, MemoryError> {
        let record = NoteRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: note.user_id.clone(),
            content: note.content.clone(),
            kind: note.kind,
            created_at: Utc::now(),
            sentiment: note.sentiment.clone(),
            topic: note.topic.clone(),
            summary: note.summary.clone(),
            next_step: note.next_step.clone(),
            sensitivity: note.sensitivity,
        };

        self.inner.write().await.notes.push(record.clone());
        Ok(record)
    }

    async fn insert_embedding(&self, note_id: &str, embedding: &[f32]) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        if !inner.notes.iter().any(|n| n.id == note_id) {
            return Err(MemoryError::Store(format!("no note with id {note_id}")));
        }
        if inner.embeddings.contains_key(note_id) {
            return Err(MemoryError::Store(format!(
                "note {note_id} already has an embedding"
            )));
        }
        inner.embeddings.insert(note_id.to_string(), embedding.to_vec());
        Ok(())
    }

    async fn match_notes(&self, query: &MatchQuery) -> Result<Vec<Memory>, MemoryError> {
        let inner = self.inner.read().await;

        let candidates: Vec<(&NoteRecord, f32)> = inner
            .notes
            .iter()
            .filter(|n| n.user_id == query.filter_user_id)
            .filter_map(|n| {
                let embedding = inner.embeddings.get(&n.id)?;
                Some((n, cosine_similarity(&query.query_embedding, embedding)))
            })
            .collect();

        Ok(
            rank_matches(candidates, query.match_threshold, query.match_count)
                .into_iter()
                .map(|(note, score)| Memory {
                    similarity: Some(score),
                    ..Memory::from(note)
                })
                .collect(),
        )
    }

    async fn recent_notes(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        let inner = self.inner.read().await;

        // Insertion order breaks timestamp ties, newest insert first.
        let mut notes: Vec<(usize, &NoteRecord)> = inner
            .notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.user_id == user_id)
            .collect();
        notes.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at).then(b.0.cmp(&a.0)));

        Ok(notes
            .into_iter()
            .take(limit)
            .map(|(_, note)| Memory::from(note))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoteKind;

    const ALICE: &str = "123e4567-e89b-12d3-a456-426614174000";
    const BOB: &str = "223e4567-e89b-12d3-a456-426614174000";

    async fn seed(store: &InMemoryStore, user: &str, content: &str, embedding: &[f32]) -> String {
        let record = store
            .insert_note(&NewNote::new(user, content, NoteKind::Message))
            .await
            .unwrap();
        store.insert_embedding(&record.id, embedding).await.unwrap();
        record.id
    }

    fn query(embedding: Vec<f32>, threshold: f32, count: usize, user: &str) -> MatchQuery {
        MatchQuery {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: count,
            filter_user_id: user.into(),
        }
    }

    #[tokio::test]
    async fn match_respects_threshold_order_and_user() {
        let store = InMemoryStore::new();
        seed(&store, ALICE, "exact", &[1.0, 0.0]).await;
        seed(&store, ALICE, "close", &[0.9, 0.3]).await;
        seed(&store, ALICE, "far", &[0.0, 1.0]).await;
        seed(&store, BOB, "bob exact", &[1.0, 0.0]).await;

        let hits = store
            .match_notes(&query(vec![1.0, 0.0], 0.7, 10, ALICE))
            .await
            .unwrap();

        let contents: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["exact", "close"]);
        assert!(hits.iter().all(|h| h.similarity.unwrap() >= 0.7));
    }

    #[tokio::test]
    async fn match_caps_at_count() {
        let store = InMemoryStore::new();
        for i in 0..4 {
            seed(&store, ALICE, &format!("note {i}"), &[1.0, 0.0]).await;
        }

        let hits = store
            .match_notes(&query(vec![1.0, 0.0], 0.7, 2, ALICE))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn notes_without_embeddings_only_show_up_by_recency() {
        let store = InMemoryStore::new();
        store
            .insert_note(&NewNote::new(ALICE, "unembedded", NoteKind::Message))
            .await
            .unwrap();

        let hits = store
            .match_notes(&query(vec![1.0, 0.0], -1.0, 5, ALICE))
            .await
            .unwrap();
        assert!(hits.is_empty());

        let recent = store.recent_notes(ALICE, 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "unembedded");
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = InMemoryStore::new();
        seed(&store, ALICE, "one", &[1.0]).await;
        seed(&store, ALICE, "two", &[1.0]).await;
        seed(&store, ALICE, "three", &[1.0]).await;
        seed(&store, BOB, "other", &[1.0]).await;

        let recent = store.recent_notes(ALICE, 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "two"]);
        assert!(recent.iter().all(|m| m.similarity.is_none()));
    }

    #[tokio::test]
    async fn one_embedding_per_note() {
        let store = InMemoryStore::new();
        let id = seed(&store, ALICE, "note", &[1.0]).await;

        let err = store.insert_embedding(&id, &[0.5]).await.unwrap_err();
        assert!(matches!(err, MemoryError::Store(_)));
        assert_eq!(store.embedding_count().await, 1);
    }

    #[tokio::test]
    async fn embedding_needs_a_note() {
        let store = InMemoryStore::new();
        assert!(store.insert_embedding("missing", &[1.0]).await.is_err());
        assert_eq!(store.note_count().await, 0);
    }
}
