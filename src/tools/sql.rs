use crate::database::Database;
use crate::providers::traits::CompletionProvider;
use crate::tools::{query_arg, query_schema, Tool};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

const NL_TO_SQL_TEMPLATE: &str = "You translate natural language questions into SQLite SQL.\n\
Database schema:\n\
{schema}\n\n\
Rules:\n\
- Write exactly ONE SELECT statement answering the question.\n\
- Do not modify data. No INSERT, UPDATE, DELETE, DROP or PRAGMA.\n\
- Respond with the SQL only, no markdown fences and no explanation.\n\n\
Question: {question}\n\
SQL:";

/// Natural language over the SQLite tables: the LLM writes a single SELECT,
/// which is validated and executed.
pub struct SqlQueryTool {
    db: Database,
    provider: Box<dyn CompletionProvider + Send + Sync>,
}

impl SqlQueryTool {
    pub fn new(db: Database, provider: Box<dyn CompletionProvider + Send + Sync>) -> Self {
        Self { db, provider }
    }

    pub fn build_prompt(schema: &str, question: &str) -> String {
        NL_TO_SQL_TEMPLATE
            .replace("{schema}", schema)
            .replace("{question}", question)
    }

    /// Strip markdown fences and keep the statement only.
    pub fn clean_sql(raw: &str) -> String {
        let mut sql = raw.trim();
        if let Some(stripped) = sql.strip_prefix("```sql") {
            sql = stripped;
        } else if let Some(stripped) = sql.strip_prefix("```") {
            sql = stripped;
        }
        if let Some(stripped) = sql.strip_suffix("```") {
            sql = stripped;
        }
        sql.trim().trim_end_matches(';').trim().to_string()
    }

    pub fn validate_sql(sql: &str) -> Result<()> {
        let lowered = sql.to_lowercase();
        if !lowered.starts_with("select") {
            return Err(anyhow!("generated SQL is not a SELECT statement: {}", sql));
        }
        if sql.contains(';') {
            return Err(anyhow!("generated SQL must be a single statement: {}", sql));
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        "sql_tool"
    }

    fn description(&self) -> &str {
        "Useful for translating a natural language query into a SQL query over a table \
         containing: city_stats, containing the population/state of each city located in \
         the USA."
    }

    fn parameters(&self) -> Value {
        query_schema("The natural language question to answer from the SQL tables")
    }

    async fn call(&self, args: Value) -> Result<String> {
        let question = query_arg(&args).ok_or_else(|| anyhow!("'query' argument is required"))?;

        let schema = self.db.table_schema().await?;
        let prompt = Self::build_prompt(&schema, &question);

        let raw_sql = self.provider.complete(&prompt).await?;
        let sql = Self::clean_sql(&raw_sql);
        Self::validate_sql(&sql)?;

        log::info!("Running generated SQL: {}", sql);
        let result = self.db.run_select(&sql).await?;

        Ok(format!("SQL: {}\n\n{}", sql, result.to_table()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_sql_strips_fences_and_semicolons() {
        assert_eq!(
            SqlQueryTool::clean_sql("```sql\nSELECT * FROM city_stats;\n```"),
            "SELECT * FROM city_stats"
        );
        assert_eq!(
            SqlQueryTool::clean_sql("SELECT 1;"),
            "SELECT 1"
        );
    }

    #[test]
    fn validate_rejects_non_select() {
        assert!(SqlQueryTool::validate_sql("SELECT * FROM city_stats").is_ok());
        assert!(SqlQueryTool::validate_sql("DROP TABLE city_stats").is_err());
        assert!(SqlQueryTool::validate_sql("SELECT 1; DELETE FROM city_stats").is_err());
    }

    #[test]
    fn prompt_embeds_schema_and_question() {
        let prompt = SqlQueryTool::build_prompt(
            "CREATE TABLE city_stats (city_name TEXT)",
            "Which cities are in Texas?",
        );
        assert!(prompt.contains("CREATE TABLE city_stats"));
        assert!(prompt.contains("Which cities are in Texas?"));
    }
}
