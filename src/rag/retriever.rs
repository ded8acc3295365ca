use crate::database::vector_db::VectorDb;
use crate::rag::embeddings::EmbeddingClient;
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
    pub source: String,
}

/// Embeds a query and searches the document collection.
#[derive(Clone)]
pub struct Retriever {
    vector_db: Arc<VectorDb>,
    embedder: EmbeddingClient,
    collection: String,
    top_k: u64,
}

impl Retriever {
    pub async fn new(
        vector_db: Arc<VectorDb>,
        embedder: EmbeddingClient,
        collection: &str,
        embedding_dim: u64,
        top_k: u64,
    ) -> Result<Self> {
        // Create collection if it doesn't exist
        if let Err(e) = vector_db.create_collection(collection, embedding_dim).await {
            log::warn!("Collection {} may already exist: {}", collection, e);
        }

        Ok(Self {
            vector_db,
            embedder,
            collection: collection.to_string(),
            top_k,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> &EmbeddingClient {
        &self.embedder
    }

    pub async fn search(&self, query: &str, top_k: Option<u64>) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        self.search_with_embedding(query_embedding, top_k).await
    }

    pub async fn search_with_embedding(
        &self,
        query_embedding: Vec<f32>,
        top_k: Option<u64>,
    ) -> Result<Vec<ScoredChunk>> {
        let limit = top_k.unwrap_or(self.top_k);
        let results = self
            .vector_db
            .search_vectors(&self.collection, query_embedding, limit)
            .await
            .map_err(|e| Error::msg(format!("Failed to search: {}", e)))?;

        let chunks = results
            .into_iter()
            .filter_map(|(_, score, payload)| {
                let text = payload.get("text")?.as_str()?.to_string();
                let source = payload
                    .get("source")
                    .and_then(|s| s.as_str())
                    .unwrap_or("unknown")
                    .to_string();

                Some(ScoredChunk {
                    text,
                    score,
                    source,
                })
            })
            .collect();

        Ok(chunks)
    }

    /// Chunk texts joined for prompt context.
    pub fn combined_context(chunks: &[ScoredChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// Numbered listing with scores and sources, for display.
    pub fn format_results(chunks: &[ScoredChunk]) -> String {
        let mut formatted = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            formatted.push_str(&format!(
                "{}. [Score: {:.2}] {} (Source: {})\n",
                i + 1,
                chunk.score,
                chunk.text,
                chunk.source
            ));
        }
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            text: text.to_string(),
            score,
            source: "test.md".to_string(),
        }
    }

    #[test]
    fn combined_context_joins_with_separator() {
        let chunks = vec![chunk("first", 0.9), chunk("second", 0.8)];
        assert_eq!(
            Retriever::combined_context(&chunks),
            "first\n\n---\n\nsecond"
        );
    }

    #[test]
    fn format_results_numbers_and_scores() {
        let chunks = vec![chunk("alpha", 0.91)];
        let formatted = Retriever::format_results(&chunks);
        assert!(formatted.starts_with("1. [Score: 0.91] alpha"));
        assert!(formatted.contains("test.md"));
    }
}
