pub mod config;
pub mod context;
pub mod embedders;
pub mod embedding;
pub mod error;
pub mod manager;
pub mod scoring;
pub mod store;
pub mod stores;
pub mod types;

pub use config::{EmbeddingConfig, MemoryConfig, RetrievalConfig, SupabaseConfig};
pub use context::{build_context, FIRST_CONVERSATION};
pub use embedders::OpenAiEmbedder;
pub use embedding::EmbeddingProvider;
pub use error::MemoryError;
pub use manager::CompanionMemory;
pub use scoring::{cosine_similarity, rank_matches};
pub use store::NoteStore;
pub use stores::{InMemoryStore, SupabaseStore};
pub use types::{
    is_canonical_user_id, MatchQuery, Memory, NewNote, NoteKind, NoteRecord, Sensitivity,
};
