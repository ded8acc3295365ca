use anyhow::Result;
use async_trait::async_trait;
use ragline::providers::traits::CompletionProvider;
use ragline::tools::{query_arg, query_schema, Tool, ToolRegistry};
use ragline::workflow::RouterWorkflow;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays a fixed script of completions. Clones share the script so the
/// router's internal provider clone drains the same queue.
#[derive(Clone)]
struct ScriptedProvider {
    api_key: String,
    responses: Arc<Mutex<VecDeque<String>>>,
    system_message: Arc<Mutex<String>>,
}

impl ScriptedProvider {
    fn with_script(responses: Vec<&str>) -> Self {
        Self {
            api_key: "test".to_string(),
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(|r| r.to_string()).collect(),
            )),
            system_message: Arc::new(Mutex::new(String::new())),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn new(api_key: String, system_message: String) -> Result<Self> {
        Ok(Self {
            api_key,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            system_message: Arc::new(Mutex::new(system_message)),
        })
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }

    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }

    async fn update_system_prompt(&self, system_message: String) -> Result<()> {
        *self.system_message.lock().unwrap() = system_message;
        Ok(())
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("scripted".to_string())
    }

    fn get_system_message(&self) -> String {
        self.system_message.lock().unwrap().clone()
    }

    fn get_api_key(&self) -> &String {
        &self.api_key
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }

    fn clone_with_system(&self, system_prompt: &str) -> Box<dyn CompletionProvider + Send + Sync> {
        let clone = self.clone();
        *clone.system_message.lock().unwrap() = system_prompt.to_string();
        Box::new(clone)
    }
}

/// Records the queries it was called with.
struct RecorderTool {
    calls: Arc<Mutex<Vec<String>>>,
    reply: String,
}

#[async_trait]
impl Tool for RecorderTool {
    fn name(&self) -> &str {
        "recorder"
    }

    fn description(&self) -> &str {
        "Records queries and replies with a fixed answer."
    }

    fn parameters(&self) -> Value {
        query_schema("Query to record")
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = query_arg(&args).unwrap_or_default();
        self.calls.lock().unwrap().push(query);
        Ok(self.reply.clone())
    }
}

fn registry_with_recorder(calls: Arc<Mutex<Vec<String>>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(RecorderTool {
        calls,
        reply: "the population of Houston is 2,303,000".to_string(),
    }));
    registry
}

#[tokio::test]
async fn router_executes_tool_then_answers() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider::with_script(vec![
        r#"{"tool": "recorder", "args": {"query": "population of Houston"}}"#,
        "Houston has about 2.3 million inhabitants.",
    ]);

    let mut router = RouterWorkflow::new(Box::new(provider), registry_with_recorder(calls.clone()), 6);

    let answer = router.run("How many people live in Houston?").await.unwrap();
    assert_eq!(answer, "Houston has about 2.3 million inhabitants.");
    assert_eq!(calls.lock().unwrap().as_slice(), ["population of Houston"]);
}

#[tokio::test]
async fn router_reports_unknown_tools_and_recovers() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider::with_script(vec![
        r#"{"tool": "no_such_tool", "args": {"query": "anything"}}"#,
        "I could not use that tool, but the answer is 42.",
    ]);

    let mut router = RouterWorkflow::new(Box::new(provider), registry_with_recorder(calls.clone()), 6);

    let answer = router.run("What is the answer?").await.unwrap();
    assert_eq!(answer, "I could not use that tool, but the answer is 42.");
    // The unknown tool never reached the registered one
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn router_stops_at_the_step_cap() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    // Every completion asks for another tool call
    let provider = ScriptedProvider::with_script(vec![
        r#"{"tool": "recorder", "args": {"query": "one"}}"#,
        r#"{"tool": "recorder", "args": {"query": "two"}}"#,
        r#"{"tool": "recorder", "args": {"query": "three"}}"#,
    ]);

    let mut router = RouterWorkflow::new(Box::new(provider), registry_with_recorder(calls.clone()), 3);

    let answer = router.run("loop forever").await.unwrap();
    assert_eq!(
        answer,
        "I reached the maximum number of steps without a final answer."
    );
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn router_runs_parallel_tool_calls_in_one_step() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider::with_script(vec![
        "Checking both sources.\n\
         {\"tool\": \"recorder\", \"args\": {\"query\": \"first\"}}\n\
         {\"tool\": \"recorder\", \"args\": {\"query\": \"second\"}}",
        "Both sources agree.",
    ]);

    let mut router = RouterWorkflow::new(Box::new(provider), registry_with_recorder(calls.clone()), 6);

    let answer = router.run("Compare the sources").await.unwrap();
    assert_eq!(answer, "Both sources agree.");
    assert_eq!(calls.lock().unwrap().as_slice(), ["first", "second"]);
}
