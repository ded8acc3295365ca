use crate::providers::traits::CompletionProvider;
use crate::roles::RoleProfile;
use anyhow::{anyhow, Result};

/// A role-played agent: a role profile bound to a provider carrying that
/// role's system prompt.
pub struct CrewAgent {
    pub role: RoleProfile,
    provider: Box<dyn CompletionProvider + Send + Sync>,
}

#[derive(Debug, Clone)]
pub struct CrewTask {
    pub description: String,
    pub expected_output: String,
    pub agent: usize,
}

#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub description: String,
    pub agent: String,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub tasks: Vec<TaskOutput>,
    pub final_output: String,
}

/// Sequential crew: tasks run in order, each prompt carrying the outputs of
/// the tasks before it.
pub struct Crew {
    agents: Vec<CrewAgent>,
    tasks: Vec<CrewTask>,
}

impl Crew {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Returns the index of the added agent.
    pub fn add_agent(
        &mut self,
        role: RoleProfile,
        base_provider: &(dyn CompletionProvider + Send + Sync),
    ) -> usize {
        let provider = base_provider.clone_with_system(&role.generate_system_prompt());
        self.agents.push(CrewAgent { role, provider });
        self.agents.len() - 1
    }

    pub fn add_task(&mut self, description: &str, expected_output: &str, agent: usize) {
        self.tasks.push(CrewTask {
            description: description.to_string(),
            expected_output: expected_output.to_string(),
            agent,
        });
    }

    pub fn build_task_prompt(task: &CrewTask, input: &str, context: &[TaskOutput]) -> String {
        let mut prompt = task.description.replace("{input}", input);

        if !context.is_empty() {
            prompt.push_str("\n\nContext from earlier tasks:\n");
            for prior in context {
                prompt.push_str(&format!(
                    "--- {} ({}) ---\n{}\n",
                    prior.description, prior.agent, prior.output
                ));
            }
        }

        if !task.expected_output.is_empty() {
            prompt.push_str(&format!("\n\nExpected output:\n{}", task.expected_output));
        }

        prompt
    }

    pub async fn run(&self, input: &str) -> Result<CrewOutput> {
        if self.tasks.is_empty() {
            return Err(anyhow!("Crew has no tasks"));
        }

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let agent = self
                .agents
                .get(task.agent)
                .ok_or_else(|| anyhow!("Task references unknown agent index {}", task.agent))?;

            let prompt = Self::build_task_prompt(task, input, &outputs);
            log::info!("Crew task '{}' running as {}", task.description, agent.role.name);

            let output = agent.provider.complete(&prompt).await?;

            outputs.push(TaskOutput {
                description: task.description.clone(),
                agent: agent.role.name.clone(),
                output: output.trim().to_string(),
            });
        }

        let final_output = outputs
            .last()
            .map(|t| t.output.clone())
            .unwrap_or_default();

        Ok(CrewOutput {
            tasks: outputs,
            final_output,
        })
    }
}

impl Default for Crew {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(description: &str, expected: &str) -> CrewTask {
        CrewTask {
            description: description.to_string(),
            expected_output: expected.to_string(),
            agent: 0,
        }
    }

    #[test]
    fn task_prompt_interpolates_input() {
        let prompt = Crew::build_task_prompt(
            &task("Research {input} thoroughly", "A bullet list"),
            "vector databases",
            &[],
        );
        assert!(prompt.starts_with("Research vector databases thoroughly"));
        assert!(prompt.contains("Expected output:\nA bullet list"));
        assert!(!prompt.contains("Context from earlier tasks"));
    }

    #[test]
    fn task_prompt_carries_prior_outputs() {
        let prior = TaskOutput {
            description: "Research {input}".to_string(),
            agent: "Researcher".to_string(),
            output: "Qdrant and Milvus are common choices.".to_string(),
        };
        let prompt = Crew::build_task_prompt(&task("Write a summary", ""), "dbs", &[prior]);
        assert!(prompt.contains("Context from earlier tasks"));
        assert!(prompt.contains("Researcher"));
        assert!(prompt.contains("Qdrant and Milvus"));
    }
}
