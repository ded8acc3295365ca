use crate::config::AgentConfig;
use crate::database::Database;
use crate::providers::factory::{create_provider, PROVIDER_NAMES};
use crate::providers::traits::CompletionProvider;
use crate::rag::ingest::DocumentIngestor;
use crate::rag::memory::MemoryManager;
use crate::rag::retriever::Retriever;
use crate::roles::RoleProfile;
use crate::tools::{DocumentQueryTool, SqlQueryTool, Tool, ToolRegistry, WebSearchTool};
use crate::workflow::{CorrectiveRagWorkflow, RouterWorkflow};
use colored::Colorize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

mod doc;
mod role;
mod search;
mod system;

pub struct CommandHandler {
    provider: Box<dyn CompletionProvider + Send + Sync>,
    provider_name: String,
    role: RoleProfile,
    router: RouterWorkflow,
    retriever: Retriever,
    ingestor: Arc<DocumentIngestor>,
    memory: MemoryManager,
    db: Database,
    web_search: WebSearchTool,
    config: AgentConfig,
    // API keys found in the environment, by provider name
    provider_keys: HashMap<String, String>,
}

impl CommandHandler {
    pub fn new(
        provider: Box<dyn CompletionProvider + Send + Sync>,
        provider_name: &str,
        role: RoleProfile,
        retriever: Retriever,
        ingestor: Arc<DocumentIngestor>,
        memory: MemoryManager,
        db: Database,
        config: AgentConfig,
    ) -> Self {
        let web_search = WebSearchTool::from_env();

        let mut provider_keys = HashMap::new();
        for name in PROVIDER_NAMES {
            let key_var = format!("{}_API_KEY", name.to_uppercase());
            if let Ok(api_key) = env::var(&key_var) {
                provider_keys.insert(name.to_string(), api_key);
            }
        }

        let router = Self::build_router(&provider, &retriever, &db, &web_search, &config);

        Self {
            provider,
            provider_name: provider_name.to_string(),
            role,
            router,
            retriever,
            ingestor,
            memory,
            db,
            web_search,
            config,
            provider_keys,
        }
    }

    fn build_router(
        provider: &Box<dyn CompletionProvider + Send + Sync>,
        retriever: &Retriever,
        db: &Database,
        web_search: &WebSearchTool,
        config: &AgentConfig,
    ) -> RouterWorkflow {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DocumentQueryTool::new(
            retriever.clone(),
            provider.clone_box(),
        )));
        registry.register(Arc::new(SqlQueryTool::new(db.clone(), provider.clone_box())));
        registry.register(Arc::new(web_search.clone()));

        RouterWorkflow::new(provider.clone_box(), registry, config.max_agent_steps)
    }

    fn build_corrective(&self) -> CorrectiveRagWorkflow {
        CorrectiveRagWorkflow::new(
            self.retriever.clone(),
            self.provider.clone_box(),
            self.web_search.clone(),
        )
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<(), String> {
        if input.is_empty() {
            return Ok(());
        }

        let input = input.trim();

        // Single-word commands first
        match input.to_lowercase().as_str() {
            "help" | "exit" | "quit" => return system::handle_command(input),
            "providers" => return self.list_providers(),
            "roles" => return role::list_roles(&self.config.roles_dir, &self.role),
            "reset" => {
                self.router.reset();
                println!("🔄 Chat history cleared");
                return Ok(());
            }
            _ => {}
        }

        if let Some(rest) = input.strip_prefix("use ") {
            return self.switch_provider(rest.trim()).await;
        }

        if let Some(rest) = input.strip_prefix("role load ") {
            let profile = role::load_role(&self.config.roles_dir, rest.trim())?;
            return self.switch_role(profile).await;
        }

        if let Some(rest) = input.strip_prefix("ask ") {
            return self.handle_ask(rest.trim()).await;
        }

        if input.starts_with("doc ") {
            return doc::handle_command(
                input,
                &self.provider,
                &self.retriever,
                &self.ingestor,
                &self.db,
            )
            .await;
        }

        if let Some(rest) = input.strip_prefix("sql ") {
            return self.handle_sql(rest.trim()).await;
        }

        if let Some(rest) = input.strip_prefix("web ") {
            return search::handle_command(rest.trim(), &self.web_search).await;
        }

        if let Some(rest) = input.strip_prefix("crew ") {
            return self.handle_crew(rest.trim()).await;
        }

        // Default to router chat if no command matches
        self.handle_chat(input).await
    }

    async fn handle_chat(&mut self, input: &str) -> Result<(), String> {
        let input_tokens = input.split_whitespace().count();

        // Recall similar past exchanges into the prompt
        let message = match self.retriever.embedder().embed(input).await {
            Ok(embedding) => {
                let similar = self
                    .memory
                    .search_similar(embedding, 5)
                    .await
                    .unwrap_or_default();
                if similar.is_empty() {
                    input.to_string()
                } else {
                    format!(
                        "Relevant previous messages:\n{}\nUser question: {}",
                        self.memory.summarize_memories(&similar),
                        input
                    )
                }
            }
            Err(e) => {
                log::warn!("Embedding failed, chatting without memory: {}", e);
                input.to_string()
            }
        };

        let response = self
            .router
            .run(&message)
            .await
            .map_err(|e| format!("Failed to get AI response: {}", e))?;

        let response_tokens = response.split_whitespace().count();
        self.print_response(&response, input_tokens, response_tokens);

        // Store the exchange
        let interaction = format!("Q: {}\nA: {}", input, response);
        if let Ok(embedding) = self.retriever.embedder().embed(&interaction).await {
            if let Err(e) = self.memory.store_memory(&interaction, "chat", embedding, None).await {
                log::warn!("Failed to store memory: {}", e);
            }
        }
        if let Err(e) = self
            .db
            .save_conversation(input.to_string(), response, self.role.name.clone())
            .await
        {
            log::warn!("Failed to save conversation: {}", e);
        }

        Ok(())
    }

    async fn handle_ask(&self, question: &str) -> Result<(), String> {
        if question.is_empty() {
            println!("Usage: ask <question>");
            return Ok(());
        }

        let result = self
            .build_corrective()
            .run(question)
            .await
            .map_err(|e| format!("Workflow failed: {}", e))?;

        println!("\n💬 Answer:");
        println!("{}", result.answer.truecolor(255, 236, 179));
        let mut status = format!("kept chunks: {}", result.kept_chunks);
        if result.web_search_used {
            status.push_str(" | web search used");
        }
        if let Some(query) = &result.transformed_query {
            status.push_str(&format!(" | search query: {}", query));
        }
        println!("\n📊 {}", status.cyan());

        Ok(())
    }

    async fn handle_sql(&self, question: &str) -> Result<(), String> {
        if question.is_empty() {
            println!("Usage: sql <question>");
            return Ok(());
        }

        let tool = SqlQueryTool::new(self.db.clone(), self.provider.clone_box());
        let output = tool
            .call(serde_json::json!({ "query": question }))
            .await
            .map_err(|e| format!("SQL tool failed: {}", e))?;

        println!("\n{}", output.bright_green());
        Ok(())
    }

    async fn handle_crew(&self, topic: &str) -> Result<(), String> {
        if topic.is_empty() {
            println!("Usage: crew <topic>");
            return Ok(());
        }

        let output = role::run_research_crew(self.provider.as_ref(), topic)
            .await
            .map_err(|e| format!("Crew failed: {}", e))?;

        for task in &output.tasks {
            println!("\n🧩 {} ({})", task.description.bright_yellow(), task.agent);
            println!("{}", task.output.truecolor(255, 236, 179));
        }
        println!("\n✅ Final output:");
        println!("{}", output.final_output.bright_green());

        Ok(())
    }

    fn print_response(&self, response: &str, input_tokens: usize, response_tokens: usize) {
        println!("{}", response.truecolor(255, 236, 179));

        println!(
            "\n📊 Tokens: 📥 Input: {} | 📤 Response: {} | 📈 Total: {}",
            input_tokens.to_string().cyan(),
            response_tokens.to_string().cyan(),
            (input_tokens + response_tokens).to_string().cyan()
        );
        println!();
    }

    fn list_providers(&self) -> Result<(), String> {
        println!("\n🤖 Available AI Providers:");
        println!("  Currently using: {}", self.provider_name.cyan());
        println!("\n  Available providers:");

        for provider in PROVIDER_NAMES {
            let status = if provider == "ollama" {
                "✅ Local".green()
            } else if self.provider_keys.contains_key(provider) {
                "✅ Ready".green()
            } else {
                "❌ No API key".red()
            };
            println!("  • {} - {}", provider, status);
        }

        println!("\nTo switch providers, use: use <provider>");
        println!("Example: use openai");

        Ok(())
    }

    async fn switch_provider(&mut self, provider_name: &str) -> Result<(), String> {
        let provider_name = provider_name.to_lowercase();

        let new_provider = create_provider(
            &provider_name,
            None,
            self.role.generate_system_prompt(),
        )
        .await
        .map_err(|e| format!("Failed to initialize {} provider: {}", provider_name, e))?;

        self.provider = new_provider;
        self.provider_name = provider_name.clone();
        self.router = Self::build_router(
            &self.provider,
            &self.retriever,
            &self.db,
            &self.web_search,
            &self.config,
        );

        println!(
            "🔄 Switched to {} provider (chat history cleared)",
            provider_name.cyan()
        );

        Ok(())
    }

    async fn switch_role(&mut self, profile: RoleProfile) -> Result<(), String> {
        self.provider
            .update_system_prompt(profile.generate_system_prompt())
            .await
            .map_err(|e| format!("Failed to update role: {}", e))?;

        println!("🎭 Now acting as {}", profile.name.cyan());
        self.role = profile;
        Ok(())
    }
}
