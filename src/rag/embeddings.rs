use anyhow::{anyhow, Result};
use lru::LruCache;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const CACHE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointKind {
    OpenAiCompatible,
    Ollama,
}

/// One embedding client for the whole app, so ingestion, retrieval and
/// memory always produce vectors from the same model. Repeated texts are
/// served from a small LRU cache.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    kind: EndpointKind,
    cache: Arc<Mutex<LruCache<String, Vec<f32>>>>,
}

impl EmbeddingClient {
    /// Configure from `EMBEDDING_API_URL` / `EMBEDDING_MODEL` /
    /// `EMBEDDING_API_KEY`. Without explicit settings, an OpenAI key selects
    /// the hosted endpoint and the fallback is a local Ollama daemon.
    pub fn from_env() -> Self {
        let openai_key = env::var("OPENAI_API_KEY").ok();

        let (default_url, default_model) = if openai_key.is_some() {
            (
                "https://api.openai.com/v1/embeddings".to_string(),
                "text-embedding-3-small".to_string(),
            )
        } else {
            (
                "http://localhost:11434/api/embeddings".to_string(),
                "nomic-embed-text".to_string(),
            )
        };

        let api_url = env::var("EMBEDDING_API_URL").unwrap_or(default_url);
        let model = env::var("EMBEDDING_MODEL").unwrap_or(default_model);
        let api_key = env::var("EMBEDDING_API_KEY").ok().or(openai_key);

        let kind = if api_url.contains("/api/embeddings") {
            EndpointKind::Ollama
        } else {
            EndpointKind::OpenAiCompatible
        };

        Self {
            client: Client::new(),
            api_url,
            api_key,
            model,
            kind,
            cache: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_SIZE).unwrap(),
            ))),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self
            .cache
            .lock()
            .map_err(|e| anyhow!("Cache lock error: {}", e))?
            .get(text)
            .cloned()
        {
            return Ok(cached);
        }

        let embedding = match self.kind {
            EndpointKind::Ollama => self.embed_ollama(text).await?,
            EndpointKind::OpenAiCompatible => self.embed_openai(text).await?,
        };

        self.cache
            .lock()
            .map_err(|e| anyhow!("Cache lock error: {}", e))?
            .put(text.to_string(), embedding.clone());

        Ok(embedding)
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({
                "model": self.model,
                "prompt": text
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let embedding = response
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Invalid embedding response: {}", response))?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }

    async fn embed_openai(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self.client.post(&self.api_url).json(&json!({
            "model": self.model,
            "input": text
        }));

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!(
                "Embedding request failed: Status {}, Body: {}",
                status,
                error_text
            ));
        }

        let response_json: Value = response.json().await?;

        let embedding = response_json
            .get("data")
            .and_then(|data| data.get(0))
            .and_then(|first| first.get("embedding"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Invalid embedding response: {}", response_json))?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_shape_selects_endpoint_kind() {
        std::env::set_var("EMBEDDING_API_URL", "http://localhost:11434/api/embeddings");
        let client = EmbeddingClient::from_env();
        assert_eq!(client.kind, EndpointKind::Ollama);

        std::env::set_var("EMBEDDING_API_URL", "https://api.openai.com/v1/embeddings");
        let client = EmbeddingClient::from_env();
        assert_eq!(client.kind, EndpointKind::OpenAiCompatible);

        std::env::remove_var("EMBEDDING_API_URL");
    }
}
