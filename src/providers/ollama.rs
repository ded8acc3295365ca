use crate::providers::traits::CompletionProvider;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::sync::{Arc, RwLock};

/// Local models via an Ollama daemon. No API key is required; the field is
/// kept so the provider satisfies the trait and can be switched to like any
/// hosted backend.
#[derive(Clone)]
pub struct OllamaProvider {
    api_key: String,
    system_message: Arc<RwLock<String>>,
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn new(api_key: String, system_message: String) -> Result<Self> {
        let base_url =
            env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
        let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        let embedding_model =
            env::var("OLLAMA_EMBEDDING_MODEL").unwrap_or_else(|_| "nomic-embed-text".to_string());

        Ok(Self {
            api_key,
            system_message: Arc::new(RwLock::new(system_message)),
            client: Client::new(),
            base_url,
            model,
            embedding_model,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let system_message = self
            .system_message
            .read()
            .map_err(|e| anyhow!("Failed to read system message: {}", e))?
            .clone();

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_message
                    },
                    {
                        "role": "user",
                        "content": prompt
                    }
                ],
                "stream": false
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!(
                "Ollama request failed: Status {}, Body: {}",
                status,
                error_text
            ));
        }

        let response_json: Value = response.json().await?;

        response_json
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid response from Ollama: {}", response_json))
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&json!({
                "model": self.embedding_model,
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
            .ok_or_else(|| anyhow!("Invalid embedding response from Ollama: {}", response))?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }

    async fn update_system_prompt(&self, system_message: String) -> Result<()> {
        let mut guard = self
            .system_message
            .write()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        *guard = system_message;
        Ok(())
    }

    fn get_system_message(&self) -> String {
        self.system_message.read().unwrap().clone()
    }

    fn get_api_key(&self) -> &String {
        &self.api_key
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }

    fn clone_with_system(&self, system_prompt: &str) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(Self {
            api_key: self.api_key.clone(),
            system_message: Arc::new(RwLock::new(system_prompt.to_string())),
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            embedding_model: self.embedding_model.clone(),
        })
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }
}
