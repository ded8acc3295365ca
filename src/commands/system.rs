use colored::Colorize;

pub fn handle_command(input: &str) -> Result<(), String> {
    match input.to_lowercase().as_str() {
        "help" => {
            print_help();
            Ok(())
        }
        "exit" | "quit" => {
            println!("👋 Goodbye!");
            std::process::exit(0);
        }
        _ => Err(format!("Unknown system command: {}", input)),
    }
}

fn print_help() {
    println!("\n{}", "ragline commands".bright_yellow());
    println!("  <message>             - Chat (the agent may call tools to answer)");
    println!("  ask <question>        - Corrective RAG with web-search fallback");
    println!("  doc ingest <path>     - Index a txt/md/pdf file");
    println!("  doc dir <path>        - Index every supported file in a directory");
    println!("  doc list              - List indexed documents");
    println!("  doc search <query>    - Show raw retrieval results");
    println!("  doc ask <question>    - Grounded answer from the indexed documents");
    println!("  sql <question>        - Natural language over the SQL tables");
    println!("  web <query>           - Web search");
    println!("  crew <topic>          - Run the research crew on a topic");
    println!("  roles                 - List available roles");
    println!("  role load <file>      - Switch the agent role");
    println!("  providers             - List LLM providers");
    println!("  use <provider>        - Switch LLM provider");
    println!("  reset                 - Clear the chat history");
    println!("  help | exit | quit");
    println!();
}
