//! Prompt templates for aerospace question answering

use crate::types::RetrievedChunk;

/// Instruction block placed before the retrieved context
const PREAMBLE: &str = "You are an expert aerospace diagnostic AI assistant. Use the following retrieved documents to answer questions about aerospace systems, anomaly detection, and technical troubleshooting.

INSTRUCTIONS:
- Base your answer on the provided context documents
- If the context doesn't contain sufficient information, clearly state this
- Provide specific technical details, parameters, and procedures when available
- Include relevant safety considerations and warnings
- Be precise and professional in your response
- Reference specific documents or sections when possible";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block, one labelled entry per chunk in the given order
    pub fn build_context(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "[{}] {}\nContent: {}",
                    i + 1,
                    Self::format_source_ref(chunk),
                    chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Format the source label for a chunk
    fn format_source_ref(chunk: &RetrievedChunk) -> String {
        let mut label = format!("Document: {}", chunk.source().unwrap_or("unknown"));
        if let Some(page) = chunk.page() {
            label.push_str(&format!(" (Page {})", page));
        }
        label
    }

    /// Build the full prompt for a question over the given chunks
    pub fn build_rag_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
        format!(
            "{preamble}\n\nContext Documents:\n{context}\n\nQuestion: {question}\n\nExpert Answer:",
            preamble = PREAMBLE,
            context = Self::build_context(chunks),
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(content: &str, metadata: serde_json::Value) -> RetrievedChunk {
        RetrievedChunk {
            id: None,
            content: content.to_string(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            similarity: 0.5,
        }
    }

    #[test]
    fn test_context_labels_document_and_page() {
        let context = PromptBuilder::build_context(&[
            chunk("Pressure 3000 psi.", json!({"document": "hyd.pdf", "page": 12})),
            chunk("Retract in 8 s.", json!({"source": "gear.pdf"})),
        ]);
        assert_eq!(
            context,
            "[1] Document: hyd.pdf (Page 12)\nContent: Pressure 3000 psi.\n\n[2] Document: gear.pdf\nContent: Retract in 8 s."
        );
    }

    #[test]
    fn test_prompt_ends_with_question() {
        let prompt = PromptBuilder::build_rag_prompt("Why is EGT high?", &[]);
        assert!(prompt.starts_with("You are an expert aerospace diagnostic AI assistant."));
        assert!(prompt.ends_with("Question: Why is EGT high?\n\nExpert Answer:"));
    }
}
