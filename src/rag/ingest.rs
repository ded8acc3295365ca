use crate::database::vector_db::VectorDb;
use crate::database::Database;
use crate::rag::chunker::{chunk_text, DEFAULT_CHUNK_SIZE};
use crate::rag::embeddings::EmbeddingClient;
use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const EMBED_BATCH: usize = 16;

pub struct IngestReport {
    pub source: String,
    pub chunks: usize,
}

/// Loads a document, chunks it, embeds the chunks and upserts them into the
/// document collection.
pub struct DocumentIngestor {
    vector_db: Arc<VectorDb>,
    embedder: EmbeddingClient,
    db: Database,
    collection: String,
    chunk_size: usize,
}

impl DocumentIngestor {
    pub fn new(
        vector_db: Arc<VectorDb>,
        embedder: EmbeddingClient,
        db: Database,
        collection: &str,
    ) -> Self {
        Self {
            vector_db,
            embedder,
            db,
            collection: collection.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Extract text from a file by extension: pdf via pdf-extract, anything
    /// else read as UTF-8.
    pub fn load_text(path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(anyhow!("File not found: {}", path.display()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        match extension.as_str() {
            "pdf" => pdf_extract::extract_text(path)
                .map_err(|e| anyhow!("Failed to extract PDF text: {}", e)),
            _ => std::fs::read_to_string(path)
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e)),
        }
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let text = Self::load_text(path)?;
        let source = path.display().to_string();
        self.ingest_text(&text, &source).await
    }

    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<IngestReport> {
        let chunks = chunk_text(text, self.chunk_size);
        if chunks.is_empty() {
            return Err(anyhow!("No text to index in {}", source));
        }

        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}")
                .unwrap(),
        );
        pb.set_message(format!("indexing {}", source));

        for batch in chunks.chunks(EMBED_BATCH) {
            let embeddings = self.embedder.embed_batch(batch).await?;

            let entries = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    let mut payload = HashMap::new();
                    payload.insert(
                        "text".to_string(),
                        serde_json::Value::String(chunk.clone()),
                    );
                    payload.insert(
                        "source".to_string(),
                        serde_json::Value::String(source.to_string()),
                    );
                    (embedding, payload)
                })
                .collect();

            self.vector_db
                .store_vectors(&self.collection, entries)
                .await
                .map_err(|e| anyhow!("Failed to index chunks: {}", e))?;

            pb.inc(batch.len() as u64);
        }

        pb.finish_with_message("done");

        self.db
            .record_document(source.to_string(), chunks.len())
            .await
            .map_err(|e| anyhow!("Failed to record document: {}", e))?;

        log::info!("Indexed {} chunks from {}", chunks.len(), source);

        Ok(IngestReport {
            source: source.to_string(),
            chunks: chunks.len(),
        })
    }

    /// Ingest every supported file directly under a directory.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<Vec<IngestReport>> {
        let mut reports = Vec::new();
        let entries =
            std::fs::read_dir(dir).map_err(|e| anyhow!("Failed to read directory: {}", e))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_lowercase();
            if !matches!(extension.as_str(), "txt" | "md" | "pdf") {
                continue;
            }
            match self.ingest_file(&path).await {
                Ok(report) => reports.push(report),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn load_text_reads_plain_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# Title\n\nBody text.").unwrap();

        let text = DocumentIngestor::load_text(&path).unwrap();
        assert!(text.contains("Body text."));
    }

    #[test]
    fn load_text_reports_missing_files() {
        let err = DocumentIngestor::load_text(Path::new("/no/such/file.txt")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
