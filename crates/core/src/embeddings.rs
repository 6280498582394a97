use crate::error::SearchError;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Turns texts into fixed-length vectors. Output order follows input order and
/// must be deterministic for a given model.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;

    fn encode_one(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        self.encode(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Embedding("empty embedding response".to_string()))
    }
}

/// Hashed character-trigram embedding. Needs no model download, which makes it
/// the default provider and the one used in tests.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let mut hash = 1469598103934665603u64;
            for ch in window {
                let mut buffer = [0u8; 4];
                for byte in ch.encode_utf8(&mut buffer).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn model_name(&self) -> &str {
        "char-trigram-hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::Embedder;
    use crate::error::SearchError;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    const BATCH_SIZE: usize = 64;

    /// all-MiniLM-L6-v2 run locally through ONNX Runtime.
    pub struct FastEmbedder {
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedder {
        pub fn try_new() -> Result<Self, SearchError> {
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true),
            )
            .map_err(|error| {
                SearchError::Embedding(format!("failed to initialize local model: {error}"))
            })?;

            Ok(Self {
                model: Mutex::new(model),
            })
        }
    }

    impl Embedder for FastEmbedder {
        fn model_name(&self) -> &str {
            "all-MiniLM-L6-v2"
        }

        fn dimensions(&self) -> usize {
            384
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let mut model = self
                .model
                .lock()
                .map_err(|_| SearchError::Embedding("embedding model lock poisoned".to_string()))?;

            model
                .embed(texts.to_vec(), Some(BATCH_SIZE))
                .map_err(|error| SearchError::Embedding(error.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CharacterNgramEmbedder, Embedder};

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Life is like a box of chocolates.");
        let second = embedder.embed("Life is like a box of chocolates.");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vectors = embedder
            .encode(&["abc".to_string(), String::new()])
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|vector| vector.len() == 32));
        assert!(vectors[1].iter().all(|value| *value == 0.0));
    }

    #[test]
    fn encode_one_matches_batch_encoding() {
        let embedder = CharacterNgramEmbedder::default();
        let single = embedder.encode_one("why so serious").unwrap();
        assert_eq!(single, embedder.embed("why so serious"));
    }
}
