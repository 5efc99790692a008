use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::SupabaseConfig;
use crate::error::MemoryError;
use crate::store::NoteStore;
use crate::types::{MatchQuery, Memory, NewNote, NoteRecord};

const MEMORY_COLUMNS: &str = "id,content,created_at,sentiment,topic";

/// Supabase-backed note store, spoken to through PostgREST.
///
/// Notes and embeddings live in two tables; similarity search is a
/// server-side function called over `/rpc`. Built without credentials the
/// store reports itself disabled.
pub struct SupabaseStore {
    client: reqwest::Client,
    config: Option<SupabaseConfig>,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self::from_config(Some(config))
    }

    pub fn from_config(config: Option<SupabaseConfig>) -> Self {
        let config = config.map(|mut c| {
            c.url = c.url.trim_end_matches('/').to_string();
            c
        });
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// A store with no credentials. Every write is dropped by the caller.
    pub fn disabled() -> Self {
        Self::from_config(None)
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn config(&self) -> Result<&SupabaseConfig, MemoryError> {
        self.config
            .as_ref()
            .ok_or_else(|| MemoryError::Configuration("supabase is not configured".into()))
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, MemoryError> {
        let config = self.config()?;
        Ok(self
            .client
            .request(method, format!("{}/rest/v1/{path}", config.url))
            .header("apikey", &config.api_key)
            .header("authorization", format!("Bearer {}", config.api_key)))
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, MemoryError> {
    let response = request
        .send()
        .await
        .map_err(|e| MemoryError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MemoryError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, MemoryError> {
    response
        .json()
        .await
        .map_err(|e| MemoryError::Parse(e.to_string()))
}

#[async_trait]
impl NoteStore for SupabaseStore {
    fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn insert_note(&self, note: &NewNote) -> Result<NoteRecord, MemoryError> {
        let table = &self.config()?.notes_table;
        let request = self
            .request(reqwest::Method::POST, table)?
            .header("prefer", "return=representation")
            .json(note);

        let rows: Vec<NoteRecord> = parse(send(request).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| MemoryError::Parse("insert returned no rows".into()))
    }

    async fn insert_embedding(&self, note_id: &str, embedding: &[f32]) -> Result<(), MemoryError> {
        let table = &self.config()?.embeddings_table;
        let request = self
            .request(reqwest::Method::POST, table)?
            .header("prefer", "return=minimal")
            .json(&json!({ "note_id": note_id, "embedding": embedding }));

        send(request).await?;
        Ok(())
    }

    async fn match_notes(&self, query: &MatchQuery) -> Result<Vec<Memory>, MemoryError> {
        let function = &self.config()?.match_function;
        let request = self
            .request(reqwest::Method::POST, &format!("rpc/{function}"))?
            .json(query);

        let rows: Vec<Memory> = parse(send(request).await?).await?;
        debug!(function = %function, rows = rows.len(), "similarity search");
        Ok(rows)
    }

    async fn recent_notes(&self, user_id: &str, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        let table = &self.config()?.notes_table;
        let request = self.request(reqwest::Method::GET, table)?.query(&[
            ("select", MEMORY_COLUMNS.to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);

        parse(send(request).await?).await
    }
}
