use text_splitter::MarkdownSplitter;

pub const DEFAULT_CHUNK_SIZE: usize = 1200;

/// Split markdown or plain text into retrieval-sized chunks. Splits happen
/// on markdown structure first, falling back to sentences and words when a
/// section exceeds the character budget.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let splitter = MarkdownSplitter::new(chunk_size);
    splitter
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| chunk.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("Just a short note.", DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Just a short note.");
    }

    #[test]
    fn long_text_respects_the_budget() {
        let paragraph = "Qdrant stores embedding vectors. ".repeat(40);
        let text = format!("{}\n\n{}\n\n{}", paragraph, paragraph, paragraph);

        let chunks = chunk_text(&text, 500);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 500);
        }
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        assert!(chunk_text("   \n\n  ", DEFAULT_CHUNK_SIZE).is_empty());
    }
}
