use crate::models::IndexMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("archive has no entries")]
    EmptyArchive,

    #[error("archive entry {name} exceeds {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("archive read error: {0}")]
    Read(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(value: zip::result::ZipError) -> Self {
        match value {
            zip::result::ZipError::Io(error) => Self::Read(error),
            other => Self::InvalidArchive(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no {0} index has been built; build the index before searching")]
    IndexNotBuilt(IndexMode),

    #[error("unsupported search mode: {0} (use exact, keyword or semantic)")]
    UnsupportedMode(String),

    #[error("corpus unavailable: {0}")]
    CorpusUnavailable(String),

    #[error("document {0} not found in corpus")]
    DocumentNotFound(i64),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::CorpusUnavailable(value.to_string())
    }
}
