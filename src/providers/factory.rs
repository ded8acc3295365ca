use crate::providers::deepseek::DeepSeekProvider;
use crate::providers::ollama::OllamaProvider;
use crate::providers::openai::OpenAiProvider;
use crate::providers::openrouter::OpenRouterProvider;
use crate::providers::traits::CompletionProvider;
use anyhow::{anyhow, Result};
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider error: {0}")]
    Init(String),
    #[error("All providers failed")]
    AllFailed,
}

pub const PROVIDER_NAMES: [&str; 4] = ["deepseek", "openai", "openrouter", "ollama"];

/// Build a provider by name. The API key falls back to `<NAME>_API_KEY`.
pub async fn create_provider(
    name: &str,
    api_key: Option<String>,
    system_prompt: String,
) -> Result<Box<dyn CompletionProvider + Send + Sync>> {
    let key_for = |var: &str| -> Result<String> {
        if let Some(key) = api_key.clone() {
            return Ok(key);
        }
        env::var(var).map_err(|_| anyhow!("{} not set", var))
    };

    let provider: Box<dyn CompletionProvider + Send + Sync> = match name.to_lowercase().as_str() {
        "deepseek" => Box::new(DeepSeekProvider::new(key_for("DEEPSEEK_API_KEY")?, system_prompt).await?),
        "openai" => Box::new(OpenAiProvider::new(key_for("OPENAI_API_KEY")?, system_prompt).await?),
        "openrouter" => {
            Box::new(OpenRouterProvider::new(key_for("OPENROUTER_API_KEY")?, system_prompt).await?)
        }
        // Ollama runs locally and needs no key.
        "ollama" => Box::new(
            OllamaProvider::new(api_key.clone().unwrap_or_default(), system_prompt).await?,
        ),
        other => {
            return Err(anyhow!(
                "Unknown provider: {}. Available providers: {}",
                other,
                PROVIDER_NAMES.join(", ")
            ))
        }
    };

    Ok(provider)
}

/// Holds the active provider plus any backups that initialized, and swaps a
/// healthy backup in when the active one stops answering.
#[derive(Clone)]
pub struct ProviderFactory {
    active_provider: Arc<RwLock<Box<dyn CompletionProvider + Send + Sync>>>,
    backup_providers: Vec<Box<dyn CompletionProvider + Send + Sync>>,
}

impl ProviderFactory {
    pub async fn new(primary_name: &str, system_prompt: String) -> Result<Self, ProviderError> {
        let primary = create_provider(primary_name, None, system_prompt.clone())
            .await
            .map_err(|e| ProviderError::Init(e.to_string()))?;

        let mut backup_providers: Vec<Box<dyn CompletionProvider + Send + Sync>> = Vec::new();
        for name in PROVIDER_NAMES {
            if name == primary_name {
                continue;
            }
            if let Ok(provider) = create_provider(name, None, system_prompt.clone()).await {
                backup_providers.push(provider);
            }
        }

        Ok(Self {
            active_provider: Arc::new(RwLock::new(primary)),
            backup_providers,
        })
    }

    pub async fn get_provider(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        self.active_provider.read().await.as_ref().clone_box()
    }

    pub async fn set_provider(&self, provider: Box<dyn CompletionProvider + Send + Sync>) {
        let mut active = self.active_provider.write().await;
        *active = provider;
    }

    pub async fn health_check(&self) -> bool {
        let provider = self.active_provider.read().await;
        provider.as_ref().get_model_info().await.is_ok()
    }

    pub async fn fallback_if_needed(&self) -> Result<(), ProviderError> {
        if !self.health_check().await {
            let mut active = self.active_provider.write().await;

            for backup in &self.backup_providers {
                if backup.get_model_info().await.is_ok() {
                    *active = backup.clone_box();
                    return Ok(());
                }
            }

            return Err(ProviderError::AllFailed);
        }
        Ok(())
    }
}
