use crate::error::IngestError;
use crate::models::{Chunk, SearchOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if overlap == 0 || overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "expected 0 < overlap < chunk_size, got overlap={overlap} chunk_size={chunk_size}"
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl TryFrom<&SearchOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: &SearchOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.overlap)
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a document into overlapping word windows.
///
/// Texts that fit in one window come back untouched as a single chunk. Longer
/// texts advance by `chunk_size - overlap` words, and the window that first
/// reaches the last word is the final one. Text without words yields nothing.
pub fn chunk_words(document_id: i64, text: &str, config: ChunkingConfig) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.is_empty() {
        return Vec::new();
    }

    if words.len() <= config.chunk_size {
        return vec![Chunk {
            document_id,
            text: text.to_string(),
            start_word_offset: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + config.chunk_size).min(words.len());
        chunks.push(Chunk {
            document_id,
            text: words[start..end].join(" "),
            start_word_offset: start,
        });

        if start + config.chunk_size >= words.len() {
            break;
        }
        start += config.step();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|index| format!("w{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof \u{a0}  spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn short_text_is_a_single_unmodified_chunk() {
        let config = ChunkingConfig::new(5, 2).unwrap();
        let text = "one  two three";
        let chunks = chunk_words(7, text, config);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].document_id, 7);
        assert_eq!(chunks[0].start_word_offset, 0);
    }

    #[test]
    fn text_of_exactly_chunk_size_words_is_one_chunk() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        assert_eq!(chunk_words(1, &numbered_words(4), config).len(), 1);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        assert!(chunk_words(1, "   ", config).is_empty());
    }

    #[test]
    fn windows_overlap_and_cover_every_word() {
        for (count, size, overlap) in [(10, 4, 1), (11, 4, 2), (23, 5, 4), (100, 7, 3), (9, 8, 1)] {
            let config = ChunkingConfig::new(size, overlap).unwrap();
            let chunks = chunk_words(1, &numbered_words(count), config);

            let mut covered = vec![false; count];
            for chunk in &chunks {
                let len = chunk.text.split_whitespace().count();
                assert!(len <= size);
                for offset in chunk.start_word_offset..chunk.start_word_offset + len {
                    covered[offset] = true;
                }
                let first = chunk.text.split_whitespace().next().unwrap();
                assert_eq!(first, format!("w{}", chunk.start_word_offset));
            }
            assert!(covered.iter().all(|seen| *seen), "gap for n={count} c={size} o={overlap}");

            for pair in chunks.windows(2) {
                assert!(pair[0].start_word_offset < pair[1].start_word_offset);
                let first_end = pair[0].start_word_offset + pair[0].text.split_whitespace().count();
                assert_eq!(first_end - pair[1].start_word_offset, overlap);
            }

            let last = chunks.last().unwrap();
            assert!(last.start_word_offset < count);
            assert!(last.text.ends_with(&format!("w{}", count - 1)));
        }
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        assert!(ChunkingConfig::new(10, 0).is_err());
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(10, 12).is_err());
        assert!(ChunkingConfig::new(10, 9).is_ok());
    }
}
