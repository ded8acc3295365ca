use std::env;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub models: Vec<String>,
    pub api_url: String,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase();

        // Get models from env or use defaults
        let models = env::var(format!("{}_MODELS", prefix))
            .map(|m| m.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| match provider {
                "openrouter" => vec![
                    "anthropic/claude-3.5-sonnet".to_string(),
                    "openai/gpt-4o-mini".to_string(),
                    "meta-llama/llama-3.1-70b-instruct".to_string(),
                ],
                "openai" => vec![
                    "gpt-4o".to_string(),
                    "gpt-4o-mini".to_string(),
                    "gpt-3.5-turbo".to_string(),
                ],
                "deepseek" => vec![
                    "deepseek-chat".to_string(),
                    "deepseek-reasoner".to_string(),
                ],
                "ollama" => vec![
                    "llama3.2".to_string(),
                    "qwen2.5:7b".to_string(),
                ],
                _ => vec![],
            });

        // Get API URL from env or use default
        let api_url = env::var(format!("{}_API_URL", prefix)).unwrap_or_else(|_| match provider {
            "openrouter" => "https://openrouter.ai/api/v1/chat/completions".to_string(),
            "openai" => "https://api.openai.com/v1/chat/completions".to_string(),
            "deepseek" => "https://api.deepseek.com/v1/chat/completions".to_string(),
            "ollama" => "http://localhost:11434/api/chat".to_string(),
            _ => String::new(),
        });

        // Get temperature from env or use default
        let temperature = env::var(format!("{}_TEMPERATURE", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.7);

        Self {
            models,
            api_url,
            temperature,
        }
    }
}

/// Runtime knobs shared by retrieval, workflows and storage.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub embedding_dim: u64,
    pub top_k: u64,
    pub max_agent_steps: usize,
    pub sqlite_path: String,
    pub roles_dir: String,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            qdrant_url: env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            collection: env::var("RAG_COLLECTION").unwrap_or_else(|_| "documents".to_string()),
            embedding_dim: env::var("EMBEDDING_DIM")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(1536),
            top_k: env::var("RAG_TOP_K")
                .ok()
                .and_then(|k| k.parse().ok())
                .unwrap_or(5),
            max_agent_steps: env::var("AGENT_MAX_STEPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "data/ragline.db".to_string()),
            roles_dir: env::var("ROLES_DIR").unwrap_or_else(|_| "roles".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_cover_known_providers() {
        let config = ProviderConfig::from_env("deepseek");
        assert!(config.api_url.contains("deepseek.com"));
        assert!(!config.models.is_empty());

        let config = ProviderConfig::from_env("ollama");
        assert!(config.api_url.contains("11434"));
    }

    #[test]
    fn unknown_provider_gets_empty_defaults() {
        let config = ProviderConfig::from_env("nosuch");
        assert!(config.models.is_empty());
        assert!(config.api_url.is_empty());
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn agent_config_has_sane_defaults() {
        let config = AgentConfig::from_env();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.max_agent_steps, 6);
        assert!(config.embedding_dim > 0);
    }
}
