//! Deterministic in-process providers for tests and offline trials
//!
//! None of these make network calls; each counts its invocations so callers
//! can assert that an operation did or did not reach a provider.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::memory::InMemoryStore;
use crate::providers::{EmbeddingProvider, LlmProvider, RecordId, VectorStoreProvider};
use crate::types::RetrievalResult;

/// Bag-of-words embedder: each lowercase word is hashed into one of `dimensions` buckets
pub struct FakeEmbedder {
    dimensions: usize,
    fail_on: Vec<String>,
    fixed: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    /// Create an embedder producing vectors of `dimensions` length
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_on: Vec::new(),
            fixed: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail for any text containing `marker`
    pub fn fail_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_on.push(marker.into());
        self
    }

    /// Always return `vector`, regardless of input
    pub fn with_fixed(mut self, vector: Vec<f32>) -> Self {
        self.dimensions = vector.len();
        self.fixed = Some(vector);
        self
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = self.fail_on.iter().find(|m| text.contains(m.as_str())) {
            return Err(Error::Embedding(format!("refused text containing '{}'", marker)));
        }
        if let Some(fixed) = &self.fixed {
            return Ok(fixed.clone());
        }

        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// LLM returning a canned answer or a canned failure, recording every prompt
pub struct FakeLlm {
    reply: std::result::Result<String, String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    /// Always answer with `answer`
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            reply: Ok(answer.into()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `answer` after sleeping for `delay`
    pub fn delayed(answer: impl Into<String>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::answering(answer)
        }
    }

    /// Always fail with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(Error::Synthesis)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// In-memory store that can be told to fail writes or reads
pub struct FaultyStore {
    inner: InMemoryStore,
    fail_writes_containing: Option<String>,
    fail_reads: bool,
    write_delay: Option<Duration>,
    searches: AtomicUsize,
    writes_in_flight: AtomicUsize,
    max_concurrent_writes: AtomicUsize,
}

impl FaultyStore {
    /// Wrap a fresh in-memory store
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: InMemoryStore::new(dimensions),
            fail_writes_containing: None,
            fail_reads: false,
            write_delay: None,
            searches: AtomicUsize::new(0),
            writes_in_flight: AtomicUsize::new(0),
            max_concurrent_writes: AtomicUsize::new(0),
        }
    }

    /// Reject upserts whose content contains `marker`
    pub fn fail_writes_containing(mut self, marker: impl Into<String>) -> Self {
        self.fail_writes_containing = Some(marker.into());
        self
    }

    /// Reject every search
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Hold every upsert for `delay` before completing it
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Highest number of upserts observed in flight at once
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_concurrent_writes.load(Ordering::SeqCst)
    }

    /// Number of `search` calls so far
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl FaultyStore {
    async fn write(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<RecordId> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(marker) = &self.fail_writes_containing {
            if content.contains(marker.as_str()) {
                return Err(Error::StoreWrite("simulated insert failure".to_string()));
            }
        }
        self.inner.upsert(content, embedding, metadata).await
    }
}

#[async_trait]
impl VectorStoreProvider for FaultyStore {
    async fn upsert(
        &self,
        content: &str,
        embedding: &[f32],
        metadata: &Map<String, Value>,
    ) -> Result<RecordId> {
        let in_flight = self.writes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_writes.fetch_max(in_flight, Ordering::SeqCst);

        let result = self.write(content, embedding, metadata).await;

        self.writes_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<RetrievalResult> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Error::StoreRead("simulated search failure".to_string()));
        }
        self.inner.search(query_embedding, top_k).await
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail_reads)
    }

    fn name(&self) -> &str {
        "faulty-memory"
    }
}

/// Build a PDF with one Courier text line per page, for parser and upload tests
pub fn pdf_with_pages(pages: &[&str]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| Error::Internal(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}
