use std::str::FromStr;

use serde::Deserialize;

use crate::error::MemoryError;

/// Everything needed to wire up the memory subsystem.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub embedding: EmbeddingConfig,
    /// `None` soft-disables persistence: notes are dropped and retrieval
    /// returns nothing, but nothing errors.
    pub supabase: Option<SupabaseConfig>,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Must match the model's output size.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_notes_table")]
    pub notes_table: String,
    #[serde(default = "default_embeddings_table")]
    pub embeddings_table: String,
    #[serde(default = "default_match_function")]
    pub match_function: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            notes_table: default_notes_table(),
            embeddings_table: default_embeddings_table(),
            match_function: default_match_function(),
        }
    }
}

fn default_notes_table() -> String {
    "notes".into()
}

fn default_embeddings_table() -> String {
    "note_embeddings".into()
}

fn default_match_function() -> String {
    "match_notes".into()
}

/// Retrieval knobs. Defaults: threshold 0.7, five results.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a vector match.
    pub match_threshold: f32,
    /// Result cap when the caller doesn't pass one.
    pub match_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.7,
            match_count: 5,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), MemoryError> {
        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(MemoryError::Configuration(format!(
                "match_threshold must be within [-1, 1], got {}",
                self.match_threshold
            )));
        }
        if self.match_count == 0 {
            return Err(MemoryError::Configuration(
                "match_count must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl MemoryConfig {
    /// Build a config from process environment variables.
    ///
    /// Credentials that are absent stay `None`; the components built from
    /// them report themselves disabled instead of failing here.
    pub fn from_env() -> Result<Self, MemoryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MemoryError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut embedding = EmbeddingConfig {
            api_key: get("OPENAI_API_KEY"),
            ..EmbeddingConfig::default()
        };
        if let Some(url) = get("OPENAI_BASE_URL") {
            embedding.base_url = url;
        }
        if let Some(model) = get("MEMORY_EMBEDDING_MODEL") {
            embedding.model = model;
        }
        if let Some(raw) = get("MEMORY_EMBEDDING_DIMENSIONS") {
            embedding.dimensions = parse_var("MEMORY_EMBEDDING_DIMENSIONS", &raw)?;
        }

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(key)) => Some(SupabaseConfig::new(url, key)),
            _ => None,
        };

        let mut retrieval = RetrievalConfig::default();
        if let Some(raw) = get("MEMORY_MATCH_THRESHOLD") {
            retrieval.match_threshold = parse_var("MEMORY_MATCH_THRESHOLD", &raw)?;
        }
        if let Some(raw) = get("MEMORY_MATCH_COUNT") {
            retrieval.match_count = parse_var("MEMORY_MATCH_COUNT", &raw)?;
        }
        retrieval.validate()?;

        Ok(Self {
            embedding,
            supabase,
            retrieval,
        })
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, MemoryError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| MemoryError::Configuration(format!("{key}={raw:?}: {e}")))
}
