use crate::providers::traits::CompletionProvider;
use crate::tools::ToolRegistry;
use anyhow::Result;
use serde_json::Value;

const ROUTER_SYSTEM_TEMPLATE: &str = "You are a routing agent. You answer user questions, using tools when they help.\n\n\
Available tools:\n\
{tools}\n\
To call a tool, respond with ONLY a JSON object of the form:\n\
{\"tool\": \"<tool name>\", \"args\": {\"query\": \"<the query for the tool>\"}}\n\
You may emit several JSON objects in one reply to call several tools.\n\
When the tool outputs in the conversation are enough to answer, reply with the final \
answer as plain text and no JSON.";

const MAX_STEPS_ANSWER: &str = "I reached the maximum number of steps without a final answer.";

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
        }
    }
}

/// The tool-routing loop: the model either emits JSON tool calls, which are
/// all executed and fed back as tool messages, or a plain-text reply, which
/// ends the run. A step cap bounds the loop.
pub struct RouterWorkflow {
    provider: Box<dyn CompletionProvider + Send + Sync>,
    tools: ToolRegistry,
    chat_history: Vec<ChatMessage>,
    max_steps: usize,
}

impl RouterWorkflow {
    pub fn new(
        provider: Box<dyn CompletionProvider + Send + Sync>,
        tools: ToolRegistry,
        max_steps: usize,
    ) -> Self {
        let system_prompt =
            ROUTER_SYSTEM_TEMPLATE.replace("{tools}", &tools.catalog());
        let provider = provider.clone_with_system(&system_prompt);

        Self {
            provider,
            tools,
            chat_history: Vec::new(),
            max_steps,
        }
    }

    /// Clears the chat history.
    pub fn reset(&mut self) {
        self.chat_history.clear();
    }

    pub async fn run(&mut self, message: &str) -> Result<String> {
        self.chat_history
            .push(ChatMessage::new("user", message.to_string()));

        for _ in 0..self.max_steps {
            let prompt = render_history(&self.chat_history);
            let response = self.provider.complete(&prompt).await?;

            let tool_calls = parse_tool_calls(&response);

            self.chat_history
                .push(ChatMessage::new("assistant", response.clone()));

            if tool_calls.is_empty() {
                return Ok(response);
            }

            for (tool_name, args) in tool_calls {
                log::info!("Calling tool {} with args {}", tool_name, args);

                let tool_result = match self.tools.get(&tool_name) {
                    Some(tool) => match tool.call(args).await {
                        Ok(result) => result,
                        Err(e) => format!("Error executing tool: {}", e),
                    },
                    None => format!("Error: Tool '{}' not found.", tool_name),
                };

                self.chat_history.push(ChatMessage::new(
                    "tool",
                    format!("Tool Output ({}): {}", tool_name, tool_result),
                ));
            }
        }

        Ok(MAX_STEPS_ANSWER.to_string())
    }
}

fn render_history(history: &[ChatMessage]) -> String {
    let mut rendered = String::new();
    for message in history {
        rendered.push_str(&format!("{}: {}\n\n", message.role, message.content));
    }
    rendered.push_str("assistant:");
    rendered
}

/// Extract every JSON tool call from a model reply. Handles whole-message
/// JSON as well as JSON objects embedded in surrounding prose.
pub fn parse_tool_calls(response: &str) -> Vec<(String, Value)> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut calls = Vec::new();

    // Fast path: whole message is one JSON object
    if let Ok(val) = serde_json::from_str::<Value>(trimmed) {
        if let Some(call) = extract_tool_args(&val) {
            return vec![call];
        }
    }

    // Scan for balanced braces and try to parse each candidate
    let mut starts = Vec::new();
    let mut depth = 0;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    starts.push(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(start) = starts.pop() {
                            let candidate = &trimmed[start..=idx];
                            if let Ok(val) = serde_json::from_str::<Value>(candidate) {
                                if let Some(call) = extract_tool_args(&val) {
                                    calls.push(call);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    calls
}

fn extract_tool_args(val: &Value) -> Option<(String, Value)> {
    let obj = val.as_object()?;
    let tool = obj.get("tool")?.as_str()?.to_string();

    // Accept both {"tool": "...", "args": {...}} and flat {"tool": "...", ...}
    let args = match obj.get("args") {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other.clone());
            Value::Object(map)
        }
        None => {
            let mut map = serde_json::Map::new();
            for (k, v) in obj.iter() {
                if k != "tool" {
                    map.insert(k.clone(), v.clone());
                }
            }
            Value::Object(map)
        }
    };

    Some((tool, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_message_tool_call_parses() {
        let calls = parse_tool_calls(r#"{"tool": "sql_tool", "args": {"query": "cities in Texas"}}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sql_tool");
        assert_eq!(calls[0].1["query"], "cities in Texas");
    }

    #[test]
    fn embedded_and_multiple_tool_calls_parse() {
        let response = r#"I will check both sources.
{"tool": "document_tool", "args": {"query": "vector databases"}}
{"tool": "web_search_tool", "args": {"query": "qdrant vs milvus"}}"#;
        let calls = parse_tool_calls(response);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "document_tool");
        assert_eq!(calls[1].0, "web_search_tool");
    }

    #[test]
    fn flat_args_shape_is_accepted() {
        let calls = parse_tool_calls(r#"{"tool": "sql_tool", "query": "top cities"}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["query"], "top cities");
    }

    #[test]
    fn plain_text_has_no_tool_calls() {
        assert!(parse_tool_calls("The answer is 42.").is_empty());
        assert!(parse_tool_calls("").is_empty());
        // JSON without a tool field is not a call
        assert!(parse_tool_calls(r#"{"answer": 42}"#).is_empty());
    }

    #[test]
    fn history_renders_roles_in_order() {
        let history = vec![
            ChatMessage::new("user", "hi".to_string()),
            ChatMessage::new("assistant", "hello".to_string()),
        ];
        let rendered = render_history(&history);
        assert!(rendered.starts_with("user: hi"));
        assert!(rendered.ends_with("assistant:"));
    }
}
