use crate::providers::traits::CompletionProvider;
use crate::rag::retriever::{Retriever, ScoredChunk};
use crate::tools::WebSearchTool;
use anyhow::Result;

const RELEVANCY_PROMPT_TEMPLATE: &str = "As a grader, your task is to evaluate the relevance of a document retrieved in response to a user's question.\n\n\
Retrieved Document:\n\
-------------------\n\
{context_str}\n\n\
User Question:\n\
--------------\n\
{query_str}\n\n\
Evaluation Criteria:\n\
- Consider whether the document contains keywords or topics related to the user's question.\n\
- The evaluation should not be overly stringent; the primary objective is to identify and filter out clearly irrelevant retrievals.\n\n\
Decision:\n\
- Assign a binary score to indicate the document's relevance.\n\
- Use 'yes' if the document is relevant to the question, or 'no' if it is not.\n\n\
Please provide your binary score ('yes' or 'no') below to indicate the document's relevance to the user question.";

const TRANSFORM_QUERY_TEMPLATE: &str = "Your task is to refine a query to ensure it is highly effective for retrieving relevant search results.\n\
Analyze the given input to grasp the core semantic intent or meaning.\n\
Original Query:\n\
-------\n\
{query_str}\n\
-------\n\
Your goal is to rephrase or enhance this query to improve its search performance. Ensure the revised query is concise and directly aligned with the intended search objective.\n\
Respond with the optimized query only:";

const SYNTHESIS_TEMPLATE: &str = "You are a response synthesizer. Create a comprehensive and accurate answer based on the available information.\n\n\
USER QUESTION:\n\
{query}\n\n\
DOCUMENT CONTEXT (from the knowledge base):\n\
{relevant_text}\n\n\
WEB SEARCH RESULTS (additional context):\n\
{web_results}\n\n\
INSTRUCTIONS:\n\
- Synthesize information from both sources to provide the most complete answer\n\
- Prioritize information from reliable sources\n\
- If there are contradictions, acknowledge them\n\
- Clearly indicate when information comes from web search vs document knowledge\n\
- If web results are empty, answer from the document context alone\n\n\
SYNTHESIZED RESPONSE:";

/// One step of the corrective retrieval state machine.
#[derive(Debug)]
enum Step {
    Retrieve,
    Grade {
        chunks: Vec<ScoredChunk>,
    },
    WebSearch {
        relevant_text: String,
        kept_chunks: usize,
    },
    Synthesize {
        relevant_text: String,
        search_text: String,
        kept_chunks: usize,
        transformed_query: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct CorrectiveResult {
    pub answer: String,
    pub web_search_used: bool,
    pub kept_chunks: usize,
    pub transformed_query: Option<String>,
}

/// Corrective RAG: retrieve, grade each chunk, fall back to web search when
/// any chunk is graded irrelevant (or nothing was retrieved), then
/// synthesize from whatever survived.
pub struct CorrectiveRagWorkflow {
    retriever: Retriever,
    provider: Box<dyn CompletionProvider + Send + Sync>,
    web_search: WebSearchTool,
}

impl CorrectiveRagWorkflow {
    pub fn new(
        retriever: Retriever,
        provider: Box<dyn CompletionProvider + Send + Sync>,
        web_search: WebSearchTool,
    ) -> Self {
        Self {
            retriever,
            provider,
            web_search,
        }
    }

    pub async fn run(&self, query: &str) -> Result<CorrectiveResult> {
        let mut step = Step::Retrieve;

        loop {
            step = match step {
                Step::Retrieve => {
                    let chunks = self.retriever.search(query, None).await?;
                    log::info!("Retrieved {} chunks", chunks.len());
                    Step::Grade { chunks }
                }

                Step::Grade { chunks } => {
                    let mut kept = Vec::new();
                    let mut any_irrelevant = chunks.is_empty();

                    for chunk in &chunks {
                        let prompt = RELEVANCY_PROMPT_TEMPLATE
                            .replace("{context_str}", &chunk.text)
                            .replace("{query_str}", query);
                        let verdict = self.provider.complete(&prompt).await?;

                        if parse_grade(&verdict) {
                            kept.push(chunk.text.clone());
                        } else {
                            any_irrelevant = true;
                        }
                    }

                    log::info!("Kept {}/{} chunks after grading", kept.len(), chunks.len());

                    let kept_chunks = kept.len();
                    let relevant_text = kept.join("\n");

                    if any_irrelevant {
                        Step::WebSearch {
                            relevant_text,
                            kept_chunks,
                        }
                    } else {
                        Step::Synthesize {
                            relevant_text,
                            search_text: String::new(),
                            kept_chunks,
                            transformed_query: None,
                        }
                    }
                }

                Step::WebSearch {
                    relevant_text,
                    kept_chunks,
                } => {
                    let prompt = TRANSFORM_QUERY_TEMPLATE.replace("{query_str}", query);
                    let transformed = self
                        .provider
                        .complete(&prompt)
                        .await
                        .map(|q| q.trim().to_string())
                        .unwrap_or_else(|_| query.to_string());

                    log::info!("Web search with transformed query: {}", transformed);

                    let search_text = match self.web_search.search(&transformed).await {
                        Ok(results) => results,
                        Err(e) => {
                            log::error!("Web search failed: {}", e);
                            "Web search unavailable due to technical issues.".to_string()
                        }
                    };

                    Step::Synthesize {
                        relevant_text,
                        search_text,
                        kept_chunks,
                        transformed_query: Some(transformed),
                    }
                }

                Step::Synthesize {
                    relevant_text,
                    search_text,
                    kept_chunks,
                    transformed_query,
                } => {
                    let web_search_used = transformed_query.is_some();
                    let prompt = SYNTHESIS_TEMPLATE
                        .replace("{query}", query)
                        .replace(
                            "{relevant_text}",
                            if relevant_text.is_empty() {
                                "(none)"
                            } else {
                                relevant_text.as_str()
                            },
                        )
                        .replace(
                            "{web_results}",
                            if search_text.is_empty() {
                                "(none)"
                            } else {
                                search_text.as_str()
                            },
                        );

                    let answer = self.provider.complete(&prompt).await?;

                    return Ok(CorrectiveResult {
                        answer: answer.trim().to_string(),
                        web_search_used,
                        kept_chunks,
                        transformed_query,
                    });
                }
            };
        }
    }
}

/// Grader replies are expected to lead with yes/no. Anything else counts as
/// "no" so a confused grader pushes toward the web fallback.
pub fn parse_grade(verdict: &str) -> bool {
    verdict
        .trim()
        .split_whitespace()
        .next()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .eq_ignore_ascii_case("yes")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_parses_leading_token() {
        assert!(parse_grade("yes"));
        assert!(parse_grade("Yes."));
        assert!(parse_grade("YES, the document is relevant"));
        assert!(!parse_grade("no"));
        assert!(!parse_grade("No, it is unrelated"));
    }

    #[test]
    fn unparseable_grade_counts_as_no() {
        assert!(!parse_grade(""));
        assert!(!parse_grade("The document discusses fish."));
        assert!(!parse_grade("maybe"));
    }
}
