use crate::tools::{query_arg, query_schema, Tool};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;

const SEARCH_URL: &str = "https://api.firecrawl.dev/v1/search";
const DEFAULT_LIMIT: u64 = 3;

/// Web search via Firecrawl. Degrades to a plain message when no API key is
/// configured so workflows can keep going without web results.
#[derive(Clone)]
pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
    limit: u64,
}

impl WebSearchTool {
    pub fn from_env() -> Self {
        Self {
            client: Client::new(),
            api_key: env::var("FIRECRAWL_API_KEY").ok(),
            limit: env::var("WEB_SEARCH_LIMIT")
                .ok()
                .and_then(|l| l.parse().ok())
                .unwrap_or(DEFAULT_LIMIT),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn search(&self, query: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Ok("Web search unavailable - API not configured.".to_string());
        };

        let response = self
            .client
            .post(SEARCH_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({
                "query": query,
                "limit": self.limit
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!(
                "Web search failed: Status {}, Body: {}",
                status,
                error_text
            ));
        }

        let response_json: Value = response.json().await?;
        let results = response_json
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(Self::format_results(&results))
    }

    pub fn format_results(results: &[Value]) -> String {
        let mut blocks = Vec::new();
        for result in results {
            let Some(obj) = result.as_object() else {
                continue;
            };
            let title = obj.get("title").and_then(|t| t.as_str()).unwrap_or("No title");
            let url = obj.get("url").and_then(|u| u.as_str()).unwrap_or("No URL");
            let description = obj
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("")
                .trim();
            let snippet = if description.is_empty() {
                "[no description available]".to_string()
            } else {
                description.chars().take(1000).collect()
            };
            blocks.push(format!("Title: {}\nURL: {}\nContent: {}", title, url, snippet));
        }

        if blocks.is_empty() {
            "No relevant web search results found.".to_string()
        } else {
            blocks.join("\n\n---\n\n")
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search_tool"
    }

    fn description(&self) -> &str {
        "Search the web and return a concise list of results (title, URL, and short \
         description snippet). Use this tool when the user asks about a topic that is \
         not covered by the indexed documents or the SQL tables."
    }

    fn parameters(&self) -> Value {
        query_schema("The search query to look up on the web")
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = query_arg(&args).ok_or_else(|| anyhow!("'query' argument is required"))?;

        // Network trouble becomes a message rather than a workflow abort.
        match self.search(&query).await {
            Ok(results) => Ok(results),
            Err(e) => {
                log::error!("Web search failed: {}", e);
                Ok(format!("Web search unavailable due to technical issues: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_results_renders_blocks() {
        let results = vec![
            json!({"title": "Qdrant", "url": "https://qdrant.tech", "description": "Vector DB"}),
            json!({"title": "Milvus", "url": "https://milvus.io"}),
        ];
        let formatted = WebSearchTool::format_results(&results);
        assert!(formatted.contains("Title: Qdrant"));
        assert!(formatted.contains("Content: Vector DB"));
        assert!(formatted.contains("[no description available]"));
        assert!(formatted.contains("\n\n---\n\n"));
    }

    #[test]
    fn empty_results_get_a_message() {
        assert_eq!(
            WebSearchTool::format_results(&[]),
            "No relevant web search results found."
        );
    }

    #[tokio::test]
    async fn unconfigured_search_reports_missing_api() {
        let tool = WebSearchTool {
            client: Client::new(),
            api_key: None,
            limit: 3,
        };
        let out = tool.search("anything").await.unwrap();
        assert_eq!(out, "Web search unavailable - API not configured.");
    }
}
