pub mod assembler;
pub mod chunking;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod keyword;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod ranker;
pub mod sample;
pub mod traits;

pub use assembler::{keyword_results, ranked_results, snippet_around, truncate_chars, RankedSource};
pub use chunking::{chunk_words, normalize_whitespace, ChunkingConfig};
pub use corpus::{corpus_fingerprint, sample_corpus, MemoryCorpus, SqliteCorpus};
#[cfg(feature = "local-embeddings")]
pub use embeddings::FastEmbedder;
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ExtractionError, IngestError, SearchError};
pub use extractor::{
    decode_single_byte, encode_single_byte, extract_subtitle_text, pack_subtitle,
    SubtitleExtractor, ZipExtractor,
};
pub use index::{ChunkVectors, SearchIndex, SparseVector, TfidfVectorizer};
pub use keyword::{find_matches, scan_documents, DocumentMatches};
pub use models::{
    Chunk, Document, DocumentInfo, IndexMode, MatchLine, Relevance, SearchMode, SearchOptions,
    SearchRequest, SearchResult, SourceRecord, DEFAULT_URL_BASE,
};
pub use normalizer::normalize;
pub use orchestrator::{ExportReport, SearchCoordinator, SkippedDocument};
pub use ranker::{rank, RankedDocument};
pub use sample::{sample_documents, sample_subtitles, SampleSubtitle};
pub use traits::{CorpusStore, PlaceholderTranscriber, Transcriber, PLACEHOLDER_TRANSCRIPT};
