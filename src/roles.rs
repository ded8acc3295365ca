use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// An agent role loaded from JSON. Everything beyond `name` is free-form so
/// role files can carry whatever attributes their prompts need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleProfile {
    pub name: String,
    #[serde(flatten)]
    pub attributes: Value,
}

impl RoleProfile {
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.attributes.get(key).and_then(|v| v.as_array())
    }

    pub fn generate_system_prompt(&self) -> String {
        let description = self.get_str("description").unwrap_or("an AI assistant");

        let style = self.get_str("style").unwrap_or("helpful and precise");

        let goal = self
            .get_str("goal")
            .map(|g| format!("\nYour goal: {}", g))
            .unwrap_or_default();

        let backstory = self
            .get_str("backstory")
            .map(|b| format!("\nBackground: {}", b))
            .unwrap_or_default();

        let expertise = self
            .get_array("expertise")
            .map(|e| {
                let areas: Vec<String> = e
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
                if !areas.is_empty() {
                    format!("\nYour areas of expertise: {}", areas.join(", "))
                } else {
                    String::new()
                }
            })
            .unwrap_or_default();

        let guidelines = self
            .get_array("guidelines")
            .map(|g| {
                let rules: Vec<String> = g
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
                if !rules.is_empty() {
                    format!(
                        "\nFollow these guidelines:\n{}",
                        rules
                            .iter()
                            .map(|r| format!("- {}", r))
                            .collect::<Vec<_>>()
                            .join("\n")
                    )
                } else {
                    String::new()
                }
            })
            .unwrap_or_default();

        format!(
            "You are {}, {}. Your communication style is {}.{}{}{}{}\n\
             Stay in role and answer as this agent would. Base your answers on the \
             provided context when one is given.",
            self.name, description, style, goal, backstory, expertise, guidelines
        )
    }
}

/// List role profiles found in a directory of `.json` files.
pub fn load_roles_from_dir<P: AsRef<Path>>(dir: P) -> Vec<RoleProfile> {
    let mut roles = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Ok(profile) = RoleProfile::from_file(&path) {
                    roles.push(profile);
                }
            }
        }
    }
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    roles
}

pub fn default_role() -> RoleProfile {
    RoleProfile {
        name: "Research Assistant".to_string(),
        attributes: serde_json::json!({
            "description": "a careful research assistant grounded in retrieved documents",
            "style": "concise and factual",
            "goal": "answer questions using retrieved context, and say when the context is not enough",
            "expertise": ["document analysis", "summarization", "web research"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_includes_role_fields() {
        let role = RoleProfile::from_json(
            r#"{
                "name": "Paralegal",
                "description": "a legal research specialist",
                "style": "formal",
                "goal": "find supporting citations",
                "expertise": ["contract law", "case law"]
            }"#,
        )
        .unwrap();

        let prompt = role.generate_system_prompt();
        assert!(prompt.contains("Paralegal"));
        assert!(prompt.contains("legal research specialist"));
        assert!(prompt.contains("contract law"));
        assert!(prompt.contains("Your goal: find supporting citations"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let role = RoleProfile::from_json(r#"{"name": "Bare"}"#).unwrap();
        let prompt = role.generate_system_prompt();
        assert!(prompt.contains("an AI assistant"));
        assert!(prompt.contains("helpful and precise"));
    }

    #[test]
    fn default_role_renders() {
        let prompt = default_role().generate_system_prompt();
        assert!(prompt.contains("Research Assistant"));
    }
}
