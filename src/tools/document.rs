use crate::providers::traits::CompletionProvider;
use crate::rag::retriever::Retriever;
use crate::tools::{query_arg, query_schema, Tool};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

const GROUNDED_ANSWER_TEMPLATE: &str = "You are a meticulous and accurate document analyst. Your task is to answer the user's question based exclusively on the provided context. \
Follow these rules strictly:\n\
1. Your entire response must be grounded in the facts provided in the 'Context' section. Do not use any prior knowledge.\n\
2. If multiple parts of the context are relevant, synthesize them into a single, coherent answer.\n\
3. If the context does not contain the information needed to answer the question, you must state only: 'The provided context does not contain enough information to answer this question.'\n\
-----------------------------------------\n\
Context: {context_str}\n\
-----------------------------------------\n\
Question: {query_str}\n\n\
Answer:";

/// Semantic search over the indexed documents plus a grounded answer.
pub struct DocumentQueryTool {
    retriever: Retriever,
    provider: Box<dyn CompletionProvider + Send + Sync>,
}

impl DocumentQueryTool {
    pub fn new(
        retriever: Retriever,
        provider: Box<dyn CompletionProvider + Send + Sync>,
    ) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    pub fn build_prompt(context: &str, query: &str) -> String {
        GROUNDED_ANSWER_TEMPLATE
            .replace("{context_str}", context)
            .replace("{query_str}", query)
    }
}

#[async_trait]
impl Tool for DocumentQueryTool {
    fn name(&self) -> &str {
        "document_tool"
    }

    fn description(&self) -> &str {
        "Useful for answering a natural language question by performing a semantic search over \
         a collection of indexed documents. These documents may contain general knowledge, \
         reports, or domain-specific content. Returns a grounded answer synthesized from the \
         most relevant passages. If the user query does not relate to US city statistics \
         (population and state), use this document search tool."
    }

    fn parameters(&self) -> Value {
        query_schema("The natural language question to answer from the document collection")
    }

    async fn call(&self, args: Value) -> Result<String> {
        let query = query_arg(&args).ok_or_else(|| anyhow!("'query' argument is required"))?;

        let chunks = self.retriever.search(&query, None).await?;
        if chunks.is_empty() {
            return Ok(
                "The provided context does not contain enough information to answer this question."
                    .to_string(),
            );
        }

        let context = Retriever::combined_context(&chunks);
        let prompt = Self::build_prompt(&context, &query);
        let answer = self.provider.complete(&prompt).await?;

        let mean_score = chunks.iter().map(|c| c.score).sum::<f32>() / chunks.len() as f32;

        Ok(format!(
            "{}\n\n[retrieval: {} chunks, mean score {:.2}]",
            answer.trim(),
            chunks.len(),
            mean_score
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_context_and_question() {
        let prompt = DocumentQueryTool::build_prompt("Paris is in France.", "Where is Paris?");
        assert!(prompt.contains("Context: Paris is in France."));
        assert!(prompt.contains("Question: Where is Paris?"));
        assert!(prompt.contains("Do not use any prior knowledge."));
    }
}
