//! Chunk-level vector index.
//!
//! An index is built once per corpus snapshot and never mutated afterwards;
//! callers share it behind an `Arc` and replace it wholesale on rebuild.
//! [`IndexMode::Keyword`] stores sparse TF-IDF rows over a vocabulary fitted on
//! the chunks themselves, [`IndexMode::Semantic`] stores one dense embedding
//! per chunk.

use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{Chunk, IndexMode};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::info;

static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("term pattern is valid"));

/// Lowercased terms of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TERM_RE
        .find_iter(&lowered)
        .map(|term| term.as_str().to_string())
        .collect()
}

/// Sorted `(term_id, weight)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
}

impl SparseVector {
    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|(_, weight)| f64::from(*weight) * f64::from(*weight))
            .sum::<f64>()
            .sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut left, mut right) = (0, 0);
        let mut total = 0.0;
        while left < self.entries.len() && right < other.entries.len() {
            let (left_term, left_weight) = self.entries[left];
            let (right_term, right_weight) = other.entries[right];
            match left_term.cmp(&right_term) {
                std::cmp::Ordering::Less => left += 1,
                std::cmp::Ordering::Greater => right += 1,
                std::cmp::Ordering::Equal => {
                    total += f64::from(left_weight) * f64::from(right_weight);
                    left += 1;
                    right += 1;
                }
            }
        }
        total
    }
}

/// TF-IDF with smoothed idf, `ln((1 + n) / (1 + df)) + 1`, and L2-normalized rows.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn fit<S: AsRef<str>>(texts: &[S]) -> Self {
        let tokenized: Vec<BTreeSet<String>> = texts
            .iter()
            .map(|text| tokenize(text.as_ref()).into_iter().collect())
            .collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &tokenized {
            for term in terms {
                *document_frequency.entry(term.as_str()).or_default() += 1;
            }
        }

        let total = texts.len() as f64;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (term_id, (term, frequency)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), term_id);
            idf.push((((1.0 + total) / (1.0 + frequency as f64)).ln() + 1.0) as f32);
        }

        Self { vocabulary, idf }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Terms outside the fitted vocabulary are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for term in tokenize(text) {
            if let Some(term_id) = self.vocabulary.get(&term) {
                *counts.entry(*term_id).or_default() += 1.0;
            }
        }

        let mut entries: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(term_id, count)| (term_id, count * self.idf[term_id]))
            .collect();

        let norm = entries
            .iter()
            .map(|(_, weight)| weight * weight)
            .sum::<f32>()
            .sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut entries {
                *weight /= norm;
            }
        }

        SparseVector { entries }
    }
}

#[derive(Debug, Clone)]
pub enum ChunkVectors {
    Sparse {
        vectorizer: TfidfVectorizer,
        rows: Vec<SparseVector>,
    },
    Dense {
        model: String,
        rows: Vec<Vec<f32>>,
    },
}

impl ChunkVectors {
    pub fn len(&self) -> usize {
        match self {
            ChunkVectors::Sparse { rows, .. } => rows.len(),
            ChunkVectors::Dense { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct SearchIndex {
    mode: IndexMode,
    fingerprint: String,
    chunking: ChunkingConfig,
    chunks: Vec<Chunk>,
    vectors: ChunkVectors,
}

impl SearchIndex {
    pub fn build<E: Embedder + ?Sized>(
        chunks: Vec<Chunk>,
        mode: IndexMode,
        chunking: ChunkingConfig,
        fingerprint: impl Into<String>,
        embedder: &E,
    ) -> Result<Self, SearchError> {
        let vectors = match mode {
            IndexMode::Keyword => {
                let vectorizer = TfidfVectorizer::fit(
                    &chunks.iter().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>(),
                );
                let rows = chunks
                    .iter()
                    .map(|chunk| vectorizer.transform(&chunk.text))
                    .collect();
                ChunkVectors::Sparse { vectorizer, rows }
            }
            IndexMode::Semantic => {
                let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
                let rows = if texts.is_empty() {
                    Vec::new()
                } else {
                    embedder.encode(&texts)?
                };
                ChunkVectors::Dense {
                    model: embedder.model_name().to_string(),
                    rows,
                }
            }
        };

        if vectors.len() != chunks.len() {
            return Err(SearchError::Embedding(format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let index = Self {
            mode,
            fingerprint: fingerprint.into(),
            chunking,
            chunks,
            vectors,
        };

        info!(
            mode = %index.mode,
            chunk_count = index.len(),
            fingerprint = %index.fingerprint,
            "built search index"
        );

        Ok(index)
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.chunking
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk_to_document(&self, chunk_index: usize) -> Option<i64> {
        self.chunks.get(chunk_index).map(|chunk| chunk.document_id)
    }

    pub fn vectors(&self) -> &ChunkVectors {
        &self.vectors
    }

    /// Cosine similarity of `query` against every chunk, in chunk order.
    /// The query must already be normalized the way chunks were.
    pub fn similarities<E: Embedder + ?Sized>(
        &self,
        query: &str,
        embedder: &E,
    ) -> Result<Vec<f64>, SearchError> {
        match &self.vectors {
            ChunkVectors::Sparse { vectorizer, rows } => {
                let query_vector = vectorizer.transform(query);
                Ok(rows
                    .iter()
                    .map(|row| sparse_cosine(&query_vector, row))
                    .collect())
            }
            ChunkVectors::Dense { model, rows } => {
                if model != embedder.model_name() {
                    return Err(SearchError::Embedding(format!(
                        "index was built with {model} but the query embedder is {}",
                        embedder.model_name()
                    )));
                }
                let query_vector = embedder.encode_one(query)?;
                Ok(rows
                    .iter()
                    .map(|row| cosine_similarity(&query_vector, row))
                    .collect())
            }
        }
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let (mut dot, mut left_norm, mut right_norm) = (0.0f64, 0.0f64, 0.0f64);
    for (a, b) in left.iter().zip(right) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    let denominator = left_norm.sqrt() * right_norm.sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

pub fn sparse_cosine(left: &SparseVector, right: &SparseVector) -> f64 {
    let denominator = left.norm() * right.norm();
    if denominator == 0.0 {
        0.0
    } else {
        left.dot(right) / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;

    fn chunk(document_id: i64, text: &str) -> Chunk {
        Chunk {
            document_id,
            text: text.to_string(),
            start_word_offset: 0,
        }
    }

    fn config() -> ChunkingConfig {
        ChunkingConfig::new(10, 2).unwrap()
    }

    #[test]
    fn tokenizer_drops_single_characters() {
        assert_eq!(tokenize("I ate a Royale, with cheese!"), vec!["ate", "royale", "with", "cheese"]);
    }

    #[test]
    fn idf_favours_rare_terms() {
        let vectorizer = TfidfVectorizer::fit(&["the cat", "the dog", "the bird"]);
        let vector = vectorizer.transform("the cat");
        let weights: HashMap<usize, f32> = vector.entries().iter().copied().collect();
        let the = weights[&vectorizer.vocabulary["the"]];
        let cat = weights[&vectorizer.vocabulary["cat"]];
        assert!(cat > the);
        assert!((vector.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unseen_query_terms_produce_zero_similarity() {
        let vectorizer = TfidfVectorizer::fit(&["leave the gun", "take the cannoli"]);
        let query = vectorizer.transform("spaceship");
        assert!(query.is_empty());
        assert_eq!(sparse_cosine(&query, &vectorizer.transform("take the cannoli")), 0.0);
    }

    #[test]
    fn dense_cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn keyword_index_aligns_rows_with_chunks() {
        let chunks = vec![chunk(1, "why so serious"), chunk(1, "the night is darkest"), chunk(2, "royale with cheese")];
        let index = SearchIndex::build(chunks, IndexMode::Keyword, config(), "fp", &CharacterNgramEmbedder::default()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.vectors().len(), 3);
        assert_eq!(index.chunk_to_document(2), Some(2));
        assert_eq!(index.chunk_to_document(3), None);

        let scores = index.similarities("cheese", &CharacterNgramEmbedder::default()).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[2] > 0.0);
        assert_eq!(scores[0], 0.0);
    }

    #[test]
    fn semantic_index_rejects_a_different_query_model() {
        struct OtherModel;
        impl Embedder for OtherModel {
            fn model_name(&self) -> &str {
                "other"
            }
            fn dimensions(&self) -> usize {
                1
            }
            fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
                Ok(texts.iter().map(|_| vec![1.0]).collect())
            }
        }

        let index = SearchIndex::build(vec![chunk(1, "text")], IndexMode::Semantic, config(), "fp", &CharacterNgramEmbedder::default()).unwrap();
        assert!(matches!(
            index.similarities("text", &OtherModel),
            Err(SearchError::Embedding(_))
        ));
    }

    #[test]
    fn semantic_index_rejects_misaligned_embeddings() {
        struct Truncating;
        impl Embedder for Truncating {
            fn model_name(&self) -> &str {
                "truncating"
            }
            fn dimensions(&self) -> usize {
                1
            }
            fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
                Ok(vec![vec![1.0]])
            }
        }

        let chunks = vec![chunk(1, "a b"), chunk(2, "c d")];
        assert!(SearchIndex::build(chunks, IndexMode::Semantic, config(), "fp", &Truncating).is_err());
    }
}
