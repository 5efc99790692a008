use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;

/// OpenAI-compatible embedding provider. Hits `/v1/embeddings`, which
/// takes `{model, input}` and returns vectors under `data[*].embedding`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// `dimensions` must match the model's output size
    /// (1536 for `text-embedding-3-small`).
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: model.into(),
            dimensions,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let mut embedder =
            Self::new(&config.model, config.dimensions).with_base_url(&config.base_url);
        embedder.api_key = config.api_key.clone();
        embedder
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| MemoryError::Parse("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MemoryError::Configuration("no embedding API key configured".into()))?;

        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(MemoryError::Validation("cannot embed empty text".into()));
        }

        debug!(model = %self.model, inputs = texts.len(), "embedding request");

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("authorization", format!("Bearer {api_key}"))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
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

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::Parse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(MemoryError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        let mut items: Vec<(usize, Vec<f32>)> = parsed
            .data
            .into_iter()
            .enumerate()
            .map(|(pos, item)| (item.index.unwrap_or(pos), item.embedding))
            .collect();
        items.sort_by_key(|(index, _)| *index);

        for (_, vector) in &items {
            if vector.len() != self.dimensions {
                return Err(MemoryError::Parse(format!(
                    "expected {} dimensions, got {}",
                    self.dimensions,
                    vector.len()
                )));
            }
        }

        Ok(items.into_iter().map(|(_, vector)| vector).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(server: &MockServer) -> OpenAiEmbedder {
        OpenAiEmbedder::new("text-embedding-3-small", 3)
            .with_base_url(server.uri())
            .with_api_key("sk-test")
    }

    #[tokio::test]
    async fn embeds_single_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "text-embedding-3-small",
                "input": ["hello"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = embedder(&server).embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn batch_is_reordered_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "index": 1, "embedding": [1.0, 1.0, 1.0] },
                    { "index": 0, "embedding": [0.0, 0.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let vectors = embedder(&server)
            .embed_batch(&["a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(vectors[1], vec![1.0, 1.0, 1.0]);
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new("text-embedding-3-small", 3).with_base_url(server.uri());
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::Configuration(_)));
    }

    #[tokio::test]
    async fn non_success_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = embedder(&server).embed("hello").await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn wrong_dimension_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [0.1, 0.2] }]
            })))
            .mount(&server)
            .await;

        let err = embedder(&server).embed("hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::Parse(_)));
    }

    #[tokio::test]
    async fn empty_text_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = embedder(&server).embed("   ").await.unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn from_config_trims_base_url() {
        let config = EmbeddingConfig {
            api_key: Some("k".into()),
            base_url: "http://localhost:8080/".into(),
            model: "m".into(),
            dimensions: 8,
        };
        let embedder = OpenAiEmbedder::from_config(&config);
        assert_eq!(embedder.base_url, "http://localhost:8080");
        assert_eq!(embedder.dimensions(), 8);
        assert_eq!(embedder.api_key.as_deref(), Some("k"));
    }
}
