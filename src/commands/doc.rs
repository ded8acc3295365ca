use crate::database::Database;
use crate::providers::traits::CompletionProvider;
use crate::rag::ingest::DocumentIngestor;
use crate::rag::retriever::Retriever;
use crate::tools::{DocumentQueryTool, Tool};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

pub async fn handle_command(
    input: &str,
    provider: &Box<dyn CompletionProvider + Send + Sync>,
    retriever: &Retriever,
    ingestor: &Arc<DocumentIngestor>,
    db: &Database,
) -> Result<(), String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = parts[1];

    match command {
        "ingest" => {
            let path = parts.get(2).ok_or("Missing file path")?;
            println!("📄 Indexing document: {}", path.bright_yellow());

            let report = ingestor
                .ingest_file(Path::new(path))
                .await
                .map_err(|e| format!("Failed to ingest document: {}", e))?;

            println!(
                "✅ Indexed {} chunks from {}",
                report.chunks.to_string().bright_green(),
                report.source
            );
            Ok(())
        }
        "dir" => {
            let path = parts.get(2).ok_or("Missing directory path")?;
            println!("📁 Indexing directory: {}", path.bright_yellow());

            let reports = ingestor
                .ingest_dir(Path::new(path))
                .await
                .map_err(|e| format!("Failed to ingest directory: {}", e))?;

            if reports.is_empty() {
                println!("No supported files (txt/md/pdf) found.");
                return Ok(());
            }
            for report in &reports {
                println!("  • {} ({} chunks)", report.source, report.chunks);
            }
            println!("✅ Indexed {} documents", reports.len().to_string().bright_green());
            Ok(())
        }
        "list" => {
            let documents = db
                .list_documents()
                .await
                .map_err(|e| format!("Failed to list documents: {}", e))?;

            if documents.is_empty() {
                println!("No documents indexed yet. Use: doc ingest <path>");
                return Ok(());
            }

            println!("\n📚 Indexed documents:");
            for (source, chunks) in documents {
                println!("  • {} ({} chunks)", source.bright_yellow(), chunks);
            }
            Ok(())
        }
        "search" => {
            let query = parts[2..].join(" ");
            if query.is_empty() {
                println!("Usage: doc search <query>");
                return Ok(());
            }
            println!("🔍 Searching documents for: {}", query.bright_yellow());

            let chunks = retriever
                .search(&query, None)
                .await
                .map_err(|e| format!("Search failed: {}", e))?;

            if chunks.is_empty() {
                println!("No matches found.");
                return Ok(());
            }

            println!("\n{}", Retriever::format_results(&chunks));
            Ok(())
        }
        "ask" => {
            let query = parts[2..].join(" ");
            if query.is_empty() {
                println!("Usage: doc ask <question>");
                return Ok(());
            }

            let tool = DocumentQueryTool::new(retriever.clone(), provider.clone_box());
            let answer = tool
                .call(serde_json::json!({ "query": query }))
                .await
                .map_err(|e| format!("Failed to answer: {}", e))?;

            println!("\n💬 Response:");
            println!("{}", answer.bright_green());
            Ok(())
        }
        _ => Err(format!("Unknown document command: {}", command)),
    }
}

fn print_usage() {
    println!("📚 Document Commands:");
    println!("  doc ingest <file_path>   - Index a txt/md/pdf file");
    println!("  doc dir <folder_path>    - Index every supported file in a folder");
    println!("  doc list                 - List indexed documents");
    println!("  doc search <query>       - Show raw retrieval results");
    println!("  doc ask <question>       - Grounded answer from the documents");
}
