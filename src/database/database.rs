use super::vector_db::VectorDb;
use log::info;
use rusqlite::params;
use rusqlite::types::ValueRef;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Vector database error: {0}")]
    VectorDb(String),
    #[error("Rejected query: {0}")]
    RejectedQuery(String),
}

/// Column names plus stringified rows from a SELECT.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    /// Render as an aligned text table for tool output.
    pub fn to_table(&self) -> String {
        if self.rows.is_empty() {
            return "(no rows)".to_string();
        }
        let mut out = self.columns.join(" | ");
        out.push('\n');
        out.push_str(&"-".repeat(out.len().saturating_sub(1)));
        for row in &self.rows {
            out.push('\n');
            out.push_str(&row.join(" | "));
        }
        out
    }
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
    vector_db: Option<Arc<VectorDb>>,
}

impl Database {
    pub async fn new<P: AsRef<Path> + Send + 'static>(path: P) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let db = Self {
            conn: Arc::new(conn),
            vector_db: None,
        };
        db.initialize().await?;
        Ok(db)
    }

    pub async fn with_vector_db(mut self, url: &str) -> Result<Self, DatabaseError> {
        let vector_db = VectorDb::new(url)
            .await
            .map_err(|e| DatabaseError::VectorDb(e.to_string()))?;
        self.vector_db = Some(Arc::new(vector_db));
        Ok(self)
    }

    pub fn get_vector_db(&self) -> Option<Arc<VectorDb>> {
        self.vector_db.clone()
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        // Create tables if they don't exist
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS conversations (
                        id INTEGER PRIMARY KEY,
                        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                        user_input TEXT NOT NULL,
                        ai_response TEXT NOT NULL,
                        role_name TEXT NOT NULL
                    );
                    CREATE TABLE IF NOT EXISTS documents (
                        id INTEGER PRIMARY KEY,
                        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                        source TEXT UNIQUE NOT NULL,
                        chunk_count INTEGER NOT NULL
                    );
                    CREATE TABLE IF NOT EXISTS city_stats (
                        city_name TEXT PRIMARY KEY,
                        population INTEGER,
                        state TEXT
                    );",
                )
            })
            .await?;

        // Seed the demo table backing the SQL tool
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "INSERT OR IGNORE INTO city_stats (city_name, population, state) VALUES
                        ('New York City', 8336000, 'New York'),
                        ('Los Angeles', 3822000, 'California'),
                        ('Chicago', 2665000, 'Illinois'),
                        ('Houston', 2303000, 'Texas'),
                        ('Miami', 449514, 'Florida'),
                        ('Seattle', 749256, 'Washington');",
                )
            })
            .await?;

        info!("Database initialized successfully");
        Ok(())
    }

    pub async fn save_conversation(
        &self,
        user_input: String,
        ai_response: String,
        role_name: String,
    ) -> Result<(), DatabaseError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (user_input, ai_response, role_name) VALUES (?1, ?2, ?3)",
                    [&user_input, &ai_response, &role_name],
                )
            })
            .await?;

        Ok(())
    }

    pub async fn get_recent_conversations(
        &self,
        limit: i64,
    ) -> Result<Vec<(String, String, String, String)>, DatabaseError> {
        let result = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, user_input, ai_response, role_name
                     FROM conversations
                     ORDER BY timestamp DESC
                     LIMIT ?",
                )?;

                let rows = stmt.query_map([limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?;

                let mut conversations = Vec::new();
                for row in rows {
                    conversations.push(row?);
                }

                Ok(conversations)
            })
            .await?;

        Ok(result)
    }

    pub async fn record_document(
        &self,
        source: String,
        chunk_count: usize,
    ) -> Result<(), DatabaseError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO documents (source, chunk_count) VALUES (?1, ?2)",
                    params![source, chunk_count as i64],
                )
            })
            .await?;

        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<(String, i64)>, DatabaseError> {
        let result = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT source, chunk_count FROM documents ORDER BY timestamp DESC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;

                let mut documents = Vec::new();
                for row in rows {
                    documents.push(row?);
                }
                Ok(documents)
            })
            .await?;

        Ok(result)
    }

    /// CREATE summaries of the user-visible tables, rendered into the NL->SQL
    /// prompt so the model knows what it can query.
    pub async fn table_schema(&self) -> Result<String, DatabaseError> {
        let result = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT sql FROM sqlite_master
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                     ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

                let mut schemas = Vec::new();
                for row in rows {
                    schemas.push(row?);
                }
                Ok(schemas)
            })
            .await?;

        Ok(result.join(";\n"))
    }

    /// Execute a single read-only SELECT and return stringified rows.
    pub async fn run_select(&self, sql: &str) -> Result<QueryResult, DatabaseError> {
        let trimmed = sql.trim().trim_end_matches(';').to_string();
        if !trimmed.to_lowercase().starts_with("select") {
            return Err(DatabaseError::RejectedQuery(
                "only SELECT statements are allowed".to_string(),
            ));
        }
        if trimmed.contains(';') {
            return Err(DatabaseError::RejectedQuery(
                "only a single statement is allowed".to_string(),
            ));
        }

        let result = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&trimmed)?;
                let columns: Vec<String> =
                    stmt.column_names().iter().map(|c| c.to_string()).collect();
                let column_count = columns.len();

                let rows = stmt.query_map([], move |row| {
                    let mut values = Vec::with_capacity(column_count);
                    for i in 0..column_count {
                        let value = match row.get_ref(i)? {
                            ValueRef::Null => "NULL".to_string(),
                            ValueRef::Integer(v) => v.to_string(),
                            ValueRef::Real(v) => v.to_string(),
                            ValueRef::Text(v) => String::from_utf8_lossy(v).to_string(),
                            ValueRef::Blob(v) => format!("<{} bytes>", v.len()),
                        };
                        values.push(value);
                    }
                    Ok(values)
                })?;

                let mut collected = Vec::new();
                for row in rows {
                    collected.push(row?);
                }

                Ok((columns, collected))
            })
            .await?;

        Ok(QueryResult {
            columns: result.0,
            rows: result.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn select_guard_rejects_writes() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        let err = db.run_select("DELETE FROM city_stats").await.unwrap_err();
        assert!(matches!(err, DatabaseError::RejectedQuery(_)));

        let err = db
            .run_select("SELECT 1; DROP TABLE city_stats")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::RejectedQuery(_)));
    }

    #[tokio::test]
    async fn city_stats_is_seeded_and_queryable() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        let result = db
            .run_select("SELECT city_name, state FROM city_stats WHERE state = 'California'")
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["city_name", "state"]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "Los Angeles");
    }

    #[tokio::test]
    async fn conversations_round_trip() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        db.save_conversation("hi".into(), "hello".into(), "Research Assistant".into())
            .await
            .unwrap();
        let recent = db.get_recent_conversations(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].1, "hi");
    }

    #[tokio::test]
    async fn schema_lists_city_stats() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        let schema = db.table_schema().await.unwrap();
        assert!(schema.contains("city_stats"));
        assert!(schema.contains("population"));
    }
}
