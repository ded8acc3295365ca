use crate::crew::{Crew, CrewOutput};
use crate::providers::traits::CompletionProvider;
use crate::roles::{load_roles_from_dir, RoleProfile};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn list_roles(roles_dir: &str, current: &RoleProfile) -> Result<(), String> {
    let roles = load_roles_from_dir(roles_dir);

    println!("\n🎭 Current role: {}", current.name.cyan());
    if roles.is_empty() {
        println!("No role files found in {}/", roles_dir);
        println!("Add JSON files with a \"name\" plus description/goal/style fields.");
        return Ok(());
    }

    println!("Available roles:");
    for role in roles {
        let description = role.get_str("description").unwrap_or("").to_string();
        println!("  • {} - {}", role.name.bright_yellow(), description);
    }
    println!("\nTo switch: role load <file.json>");
    Ok(())
}

pub fn load_role(roles_dir: &str, filename: &str) -> Result<RoleProfile, String> {
    let path = Path::new(roles_dir).join(filename);
    if !path.exists() {
        return Err(format!("Role file not found: {}", path.display()));
    }
    RoleProfile::from_file(&path).map_err(|e| format!("Failed to load role: {}", e))
}

/// Two-agent crew: a researcher gathers findings, a writer turns them into a
/// short report.
pub async fn run_research_crew(
    provider: &(dyn CompletionProvider + Send + Sync),
    topic: &str,
) -> Result<CrewOutput> {
    let researcher = RoleProfile {
        name: "Researcher".to_string(),
        attributes: serde_json::json!({
            "description": "a thorough researcher who gathers facts and arguments",
            "style": "structured and neutral",
            "goal": "collect the key facts, numbers and open questions about the topic"
        }),
    };

    let writer = RoleProfile {
        name: "Writer".to_string(),
        attributes: serde_json::json!({
            "description": "a technical writer who turns research notes into clear prose",
            "style": "clear and engaging",
            "goal": "produce a short, well-structured report from the research notes"
        }),
    };

    let mut crew = Crew::new();
    let researcher_idx = crew.add_agent(researcher, provider);
    let writer_idx = crew.add_agent(writer, provider);

    crew.add_task(
        "Research the topic '{input}'. List the key findings as bullet points.",
        "5-10 bullet points with the most important facts",
        researcher_idx,
    );
    crew.add_task(
        "Write a short report about '{input}' based on the research notes.",
        "A report of 2-4 paragraphs with a one-line takeaway at the end",
        writer_idx,
    );

    crew.run(topic).await
}
