//! Retrieval Collaborators
//!
//! The retrieval pipeline is modeled as external collaborator interfaces:
//! an [`Embedder`] turns text into vectors, a [`Retriever`] answers
//! top-k queries. The in-memory store here is the development/test
//! collaborator; real deployments plug a remote embedding service into
//! the same traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// A retrievable chunk of text
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Chunk content
    pub content: String,

    /// Where the chunk came from (file path, URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A document with its similarity score for one query
#[derive(Clone, Debug)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// External embedding collaborator: text in, vector out
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts; the default embeds sequentially
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// External search collaborator: query in, top-k scored documents out
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>>;
}

/// Split text into character chunks with overlap.
///
/// `overlap` must be smaller than `chunk_size`; the step degrades to one
/// character rather than looping forever on bad parameters.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// In-memory vector store ranked by cosine similarity.
///
/// Documents are added at startup, queries only read; the store is the
/// in-process analog of a hosted vector database.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(Document, Vec<f32>)>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Embed and index documents
    pub async fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize> {
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != documents.len() {
            return Err(AgentError::Provider(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let added = documents.len();
        self.entries.extend(documents.into_iter().zip(vectors));
        tracing::debug!(added, total = self.entries.len(), "indexed documents");
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Retriever for InMemoryVectorStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let query_vector = self.embedder.embed(query).await?;

        let mut scored: Vec<ScoredDocument> = self
            .entries
            .iter()
            .map(|(document, vector)| ScoredDocument {
                document: document.clone(),
                score: cosine_similarity(&query_vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds along fixed axes so similarity is predictable.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("weather").count() as f32,
                lower.matches("recipe").count() as f32,
                lower.matches("translate").count() as f32,
            ])
        }
    }

    #[test]
    fn test_split_text_chunks_and_overlap() {
        let chunks = split_text("abcdefghij", 4, 2);
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn test_split_text_degenerate_params() {
        assert!(split_text("", 4, 2).is_empty());
        assert!(split_text("abc", 0, 0).is_empty());
        // overlap >= chunk_size still terminates
        let chunks = split_text("abcd", 2, 5);
        assert_eq!(chunks, vec!["ab", "bc", "cd"]);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < f32::EPSILON);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_store_ranks_by_similarity() {
        let mut store = InMemoryVectorStore::new(Arc::new(AxisEmbedder));
        store
            .add_documents(vec![
                Document::new("The weather service reports weather hourly."),
                Document::new("A recipe for chicken curry."),
                Document::new("How to translate idioms."),
            ])
            .await
            .unwrap();

        assert_eq!(store.len(), 3);

        let hits = store.search("what is the weather like", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].document.content.contains("weather"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = InMemoryVectorStore::new(Arc::new(AxisEmbedder));
        let hits = store.search("anything", 3).await.unwrap();
        assert!(hits.is_empty());
    }
}
