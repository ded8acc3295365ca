use crate::database::vector_db::VectorDb;
use anyhow::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct Memory {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub role: String,
    pub session_id: String,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConversationSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub topic: String,
    pub last_active: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MemoryManager {
    vector_db: Arc<VectorDb>,
    collection_name: String,
    embedding_dim: u64,
    current_session: Option<ConversationSession>,
}

impl MemoryManager {
    pub async fn new(vector_db: Arc<VectorDb>, embedding_dim: u64) -> Result<Self> {
        let collection_name = "conversation_memory";

        // Create collection if it doesn't exist
        if let Err(e) = vector_db
            .create_collection(collection_name, embedding_dim)
            .await
        {
            log::warn!("Collection may already exist: {}", e);
        }

        Ok(Self {
            vector_db,
            collection_name: collection_name.to_string(),
            embedding_dim,
            current_session: None,
        })
    }

    pub fn start_new_session(&mut self, topic: &str) -> String {
        let session = ConversationSession {
            id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            topic: topic.to_string(),
            last_active: Utc::now(),
        };

        self.current_session = Some(session.clone());
        session.id
    }

    /// Reuse the current session while it has been active in the last half
    /// hour, otherwise roll over to a fresh one.
    pub fn get_or_create_session(&mut self, topic: Option<&str>) -> String {
        if let Some(session) = &mut self.current_session {
            if Utc::now()
                .signed_duration_since(session.last_active)
                .num_minutes()
                < 30
            {
                session.last_active = Utc::now();
                return session.id.clone();
            }
        }

        self.start_new_session(topic.unwrap_or("General Conversation"))
    }

    pub async fn store_memory(
        &self,
        text: &str,
        role: &str,
        embedding: Vec<f32>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<String> {
        let session_id = if let Some(session) = &self.current_session {
            session.id.clone()
        } else {
            "default".to_string()
        };

        let mut payload = HashMap::new();
        payload.insert(
            "text".to_string(),
            serde_json::Value::String(text.to_string()),
        );
        payload.insert(
            "timestamp".to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
        payload.insert(
            "role".to_string(),
            serde_json::Value::String(role.to_string()),
        );
        payload.insert(
            "session_id".to_string(),
            serde_json::Value::String(session_id),
        );

        if let Some(meta) = metadata {
            payload.insert("metadata".to_string(), serde_json::to_value(meta)?);
        }

        self.vector_db
            .store_vector(&self.collection_name, embedding, payload)
            .await
            .map_err(|e| Error::msg(format!("Failed to store memory: {}", e)))
    }

    pub async fn search_similar(
        &self,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<Memory>> {
        let results = self
            .vector_db
            .search_vectors(&self.collection_name, query_embedding, limit)
            .await
            .map_err(|e| Error::msg(format!("Failed to search memories: {}", e)))?;

        let memories = results
            .into_iter()
            .filter_map(|(_, _, payload)| {
                let text = payload.get("text")?.as_str()?.to_string();
                let timestamp = payload
                    .get("timestamp")?
                    .as_str()
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                    .map(|dt| dt.with_timezone(&Utc))?;
                let role = payload.get("role")?.as_str()?.to_string();
                let session_id = payload
                    .get("session_id")
                    .and_then(|s| s.as_str())
                    .unwrap_or_default()
                    .to_string();
                let metadata = payload
                    .get("metadata")
                    .and_then(|m| serde_json::from_value(m.clone()).ok());

                Some(Memory {
                    text,
                    timestamp,
                    role,
                    session_id,
                    metadata,
                })
            })
            .collect();

        Ok(memories)
    }

    /// Recency via a zero-vector search over the collection, sorted by
    /// timestamp afterwards. Cosine distance makes the zero vector an
    /// indifferent query, so this returns an arbitrary sample capped at
    /// `limit` rather than a true tail scan.
    pub async fn get_recent_memories(&self, limit: u64) -> Result<Vec<Memory>> {
        let zero_vector = vec![0.0; self.embedding_dim as usize];
        let mut memories = self.search_similar(zero_vector, limit).await?;

        memories.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(memories)
    }

    pub fn summarize_memories(&self, memories: &[Memory]) -> String {
        let mut summary = String::new();

        for memory in memories {
            summary.push_str(&format!(
                "[{}] {}: {}\n",
                memory.timestamp.format("%Y-%m-%d %H:%M:%S"),
                memory.role,
                memory.text
            ));
        }

        summary
    }
}
