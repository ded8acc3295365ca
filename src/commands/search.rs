use crate::tools::WebSearchTool;
use colored::Colorize;

pub async fn handle_command(query: &str, web_search: &WebSearchTool) -> Result<(), String> {
    if query.is_empty() {
        println!("Usage: web <query>");
        return Ok(());
    }

    if !web_search.is_configured() {
        println!("Web search unavailable - set FIRECRAWL_API_KEY to enable it.");
        return Ok(());
    }

    println!("🌐 Searching the web for: {}", query.bright_yellow());

    let results = web_search
        .search(query)
        .await
        .map_err(|e| format!("Web search failed: {}", e))?;

    println!("\n{}", results);
    Ok(())
}
