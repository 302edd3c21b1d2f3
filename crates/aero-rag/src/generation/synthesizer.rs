//! Budgeted prompt assembly and answer synthesis

use std::sync::Arc;

use crate::config::{GenerationConfig, SynthesisPolicy};
use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::{AnswerResponse, RetrievalResult, Source};

use super::prompt::PromptBuilder;

/// Turns a question and its retrieved chunks into an answer with sources
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmProvider>,
    max_prompt_chars: usize,
    excerpt_chars: usize,
    policy: SynthesisPolicy,
}

impl AnswerSynthesizer {
    /// Create a synthesizer
    pub fn new(llm: Arc<dyn LlmProvider>, config: &GenerationConfig) -> Self {
        Self {
            llm,
            max_prompt_chars: config.max_prompt_chars,
            excerpt_chars: config.excerpt_chars,
            policy: config.on_failure,
        }
    }

    /// Assemble the prompt within budget, dropping the least similar chunks first.
    ///
    /// Returns the prompt and the chunks it contains, most similar first.
    pub fn fit_prompt(&self, question: &str, mut chunks: RetrievalResult) -> Result<(String, RetrievalResult)> {
        chunks.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        loop {
            let prompt = PromptBuilder::build_rag_prompt(question, &chunks);
            if prompt.chars().count() <= self.max_prompt_chars {
                return Ok((prompt, chunks));
            }
            if chunks.pop().is_none() {
                return Err(Error::Synthesis(format!(
                    "prompt exceeds the {} character budget even without context",
                    self.max_prompt_chars
                )));
            }
            tracing::debug!(
                "Prompt over budget, dropped a chunk ({} remain)",
                chunks.len()
            );
        }
    }

    /// Produce an answer for `question` grounded on `chunks`
    pub async fn synthesize(&self, question: &str, chunks: RetrievalResult) -> Result<AnswerResponse> {
        let retrieved = chunks.len();
        if retrieved == 0 {
            tracing::info!("No chunks retrieved, skipping generation");
            return Ok(AnswerResponse::not_found());
        }

        let (prompt, kept) = self.fit_prompt(question, chunks)?;
        if kept.len() < retrieved {
            tracing::info!(
                "Prompt budget kept {} of {} retrieved chunks",
                kept.len(),
                retrieved
            );
        }

        match self.llm.generate(&prompt).await {
            Ok(answer) => Ok(AnswerResponse {
                answer: answer.trim().to_string(),
                sources: kept
                    .iter()
                    .map(|c| Source::from_chunk(c, self.excerpt_chars))
                    .collect(),
                success: true,
                error: None,
                retrieved_chunks: retrieved,
            }),
            Err(e) => {
                let e = e.into_synthesis();
                match self.policy {
                    SynthesisPolicy::Degrade => {
                        tracing::warn!("Answer generation via {} failed: {}", self.llm.name(), e);
                        Ok(AnswerResponse::degraded(e.to_string(), retrieved))
                    }
                    SynthesisPolicy::FailFast => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;
    use crate::types::RetrievedChunk;
    use serde_json::Map;

    fn chunk(content: &str, similarity: f32) -> RetrievedChunk {
        let mut metadata = Map::new();
        metadata.insert("source".into(), content.into());
        RetrievedChunk {
            id: None,
            content: content.to_string(),
            metadata,
            similarity,
        }
    }

    fn synthesizer(llm: Arc<FakeLlm>, max_prompt_chars: usize, policy: SynthesisPolicy) -> AnswerSynthesizer {
        AnswerSynthesizer::new(
            llm,
            &GenerationConfig {
                max_prompt_chars,
                excerpt_chars: 200,
                on_failure: policy,
            },
        )
    }

    #[tokio::test]
    async fn test_budget_drops_lowest_similarity_first() {
        let llm = Arc::new(FakeLlm::answering("ok"));
        let chunks = vec![chunk("low", 0.1), chunk("high", 0.9), chunk("mid", 0.5)];

        // Budget that fits exactly the two best chunks
        let two = PromptBuilder::build_rag_prompt("q", &[chunk("high", 0.9), chunk("mid", 0.5)]);
        let synth = synthesizer(llm.clone(), two.chars().count(), SynthesisPolicy::Degrade);

        let resp = synth.synthesize("q", chunks).await.unwrap();
        let kept: Vec<_> = resp.sources.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(kept, vec!["high", "mid"]);
        assert_eq!(resp.retrieved_chunks, 3);
        assert_eq!(llm.prompts()[0], two);
    }

    #[tokio::test]
    async fn test_budget_too_small_for_question_fails_without_llm_call() {
        let llm = Arc::new(FakeLlm::answering("ok"));
        let synth = synthesizer(llm.clone(), 10, SynthesisPolicy::Degrade);

        let err = synth.synthesize("q", vec![chunk("a", 0.5)]).await.unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_chunks_skips_llm() {
        let llm = Arc::new(FakeLlm::answering("ok"));
        let synth = synthesizer(llm.clone(), 10_000, SynthesisPolicy::Degrade);

        let resp = synth.synthesize("q", Vec::new()).await.unwrap();
        assert!(resp.success);
        assert!(resp.sources.is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_degrade_policy_returns_error_as_answer() {
        let llm = Arc::new(FakeLlm::failing("quota exceeded"));
        let synth = synthesizer(llm, 10_000, SynthesisPolicy::Degrade);

        let resp = synth.synthesize("q", vec![chunk("a", 0.5)]).await.unwrap();
        assert!(!resp.success);
        assert!(resp.sources.is_empty());
        assert!(resp.answer.contains("quota exceeded"));
        assert_eq!(resp.error.as_deref(), Some("Question answering failed: quota exceeded"));
    }

    #[tokio::test]
    async fn test_fail_fast_policy_propagates() {
        let llm = Arc::new(FakeLlm::failing("quota exceeded"));
        let synth = synthesizer(llm, 10_000, SynthesisPolicy::FailFast);

        let err = synth.synthesize("q", vec![chunk("a", 0.5)]).await.unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_sources_are_excerpted() {
        let llm = Arc::new(FakeLlm::answering("  Replace the filter.  "));
        let synth = synthesizer(llm, 100_000, SynthesisPolicy::Degrade);

        let long = "z".repeat(300);
        let resp = synth.synthesize("q", vec![chunk(&long, 0.7)]).await.unwrap();
        assert_eq!(resp.answer, "Replace the filter.");
        assert_eq!(resp.sources[0].content, format!("{}...", "z".repeat(200)));
        assert_eq!(resp.sources[0].similarity, 0.7);
    }
}
