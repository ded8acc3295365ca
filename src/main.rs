use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use ragline::commands::CommandHandler;
use ragline::config::AgentConfig;
use ragline::database::Database;
use ragline::mcp::McpServer;
use ragline::providers::factory::{create_provider, ProviderFactory, PROVIDER_NAMES};
use ragline::providers::traits::CompletionProvider;
use ragline::rag::embeddings::EmbeddingClient;
use ragline::rag::ingest::DocumentIngestor;
use ragline::rag::memory::MemoryManager;
use ragline::rag::retriever::Retriever;
use ragline::roles::{default_role, RoleProfile};
use ragline::tools::{DocumentQueryTool, SqlQueryTool, ToolRegistry, WebSearchTool};
use ragline::workflow::{CorrectiveRagWorkflow, RouterWorkflow};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API key for the selected provider (falls back to <PROVIDER>_API_KEY)
    #[arg(short, long)]
    api_key: Option<String>,

    /// LLM provider: deepseek, openai, openrouter or ollama
    #[arg(long)]
    provider: Option<String>,

    /// Role profile JSON file
    #[arg(long)]
    role: Option<String>,

    /// Run the HTTP API server instead of the chat CLI
    #[arg(long)]
    api: bool,

    /// Run the MCP tool server on stdin/stdout
    #[arg(long)]
    mcp: bool,

    #[arg(long, default_value = "3000")]
    port: u16,
}

/// Everything the three run modes share.
struct AppContext {
    config: AgentConfig,
    role: RoleProfile,
    db: Database,
    retriever: Retriever,
    ingestor: Arc<DocumentIngestor>,
    memory: MemoryManager,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    colored::control::set_override(true);

    // Load environment variables
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    if args.mcp {
        run_mcp_server(&args).await
    } else if args.api {
        run_api_server(&args).await
    } else {
        run_cli_mode(&args).await
    }
}

fn pick_provider_name(args: &Args) -> String {
    if let Some(name) = &args.provider {
        return name.to_lowercase();
    }
    if let Ok(name) = env::var("DEFAULT_PROVIDER") {
        return name.to_lowercase();
    }
    // First hosted provider with a key in the environment, else local Ollama
    for name in PROVIDER_NAMES {
        if name == "ollama" {
            continue;
        }
        if env::var(format!("{}_API_KEY", name.to_uppercase())).is_ok() {
            return name.to_string();
        }
    }
    "ollama".to_string()
}

fn load_role(args: &Args) -> RoleProfile {
    if let Some(role_file) = &args.role {
        let path = Path::new(role_file);
        match RoleProfile::from_file(path) {
            Ok(profile) => return profile,
            Err(e) => {
                eprintln!("Failed to load role {}: {}. Using default.", role_file, e);
            }
        }
    }
    default_role()
}

async fn build_context(args: &Args) -> Result<AppContext, Box<dyn std::error::Error + Send + Sync>> {
    let config = AgentConfig::from_env();
    let role = load_role(args);

    let db = Database::new(config.sqlite_path.clone())
        .await?
        .with_vector_db(&config.qdrant_url)
        .await?;

    let vector_db = db.get_vector_db().ok_or("Failed to get vector database")?;
    let embedder = EmbeddingClient::from_env();

    let retriever = Retriever::new(
        vector_db.clone(),
        embedder.clone(),
        &config.collection,
        config.embedding_dim,
        config.top_k,
    )
    .await?;

    let ingestor = Arc::new(DocumentIngestor::new(
        vector_db.clone(),
        embedder.clone(),
        db.clone(),
        &config.collection,
    ));

    let memory = MemoryManager::new(vector_db, config.embedding_dim).await?;

    Ok(AppContext {
        config,
        role,
        db,
        retriever,
        ingestor,
        memory,
    })
}

fn build_registry(
    ctx: &AppContext,
    provider: &Box<dyn CompletionProvider + Send + Sync>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DocumentQueryTool::new(
        ctx.retriever.clone(),
        provider.clone_box(),
    )));
    registry.register(Arc::new(SqlQueryTool::new(
        ctx.db.clone(),
        provider.clone_box(),
    )));
    registry.register(Arc::new(WebSearchTool::from_env()));
    registry
}

async fn run_cli_mode(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ctx = build_context(args).await?;
    let provider_name = pick_provider_name(args);

    // Primary provider plus whatever backups initialize
    let factory = ProviderFactory::new(&provider_name, ctx.role.generate_system_prompt()).await?;

    // Health check loop, swapping to a backup when the primary stops answering
    let factory_clone = factory.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(300)).await;
            if let Err(e) = factory_clone.fallback_if_needed().await {
                eprintln!("Provider health check failed: {}", e);
            }
        }
    });

    let mut command_handler = CommandHandler::new(
        factory.get_provider().await,
        &provider_name,
        ctx.role.clone(),
        ctx.retriever.clone(),
        ctx.ingestor.clone(),
        ctx.memory.clone(),
        ctx.db.clone(),
        ctx.config.clone(),
    );

    println!(
        "🧵 ragline ready - provider: {}, collection: {}",
        provider_name.cyan(),
        ctx.config.collection.cyan()
    );
    command_handler.handle_command("help").await?;

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                if let Err(e) = command_handler.handle_command(input).await {
                    println!("{}", e.red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;

    let ctx = build_context(args).await?;
    let provider_name = pick_provider_name(args);
    let provider = create_provider(&provider_name, args.api_key.clone(), ctx.role.generate_system_prompt()).await?;

    let registry = build_registry(&ctx, &provider);
    let router_workflow =
        RouterWorkflow::new(provider.clone_box(), registry, ctx.config.max_agent_steps);
    let corrective = CorrectiveRagWorkflow::new(
        ctx.retriever.clone(),
        provider.clone_box(),
        WebSearchTool::from_env(),
    );

    let app = ragline::api::create_api(
        router_workflow,
        corrective,
        ctx.ingestor.clone(),
        ctx.db.clone(),
    );

    println!("Starting API server on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    println!("Ready to accept connections!");
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}

async fn run_mcp_server(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ctx = build_context(args).await?;
    let provider_name = pick_provider_name(args);
    let provider = create_provider(&provider_name, args.api_key.clone(), ctx.role.generate_system_prompt()).await?;

    let registry = build_registry(&ctx, &provider);

    // stdout carries the protocol; logs go to stderr via env_logger
    log::info!("Starting MCP server with tools: {}", registry.list_names().join(", "));
    McpServer::new(registry).run().await?;

    Ok(())
}
