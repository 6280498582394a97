use crate::{Document, SearchError};
use async_trait::async_trait;

/// Read-only access to the subtitle corpus. Implementations own their rows and
/// hand out copies; nothing is held open between calls.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<Document>, SearchError>;

    async fn get_document(&self, id: i64) -> Result<Option<Document>, SearchError>;
}

/// Speech-to-text for audio queries.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[u8]) -> Result<String, SearchError>;
}

pub const PLACEHOLDER_TRANSCRIPT: &str = "This is a placeholder for transcribed audio";

/// Stands in until a real speech-to-text backend is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderTranscriber;

impl Transcriber for PlaceholderTranscriber {
    fn transcribe(&self, _audio: &[u8]) -> Result<String, SearchError> {
        Ok(PLACEHOLDER_TRANSCRIPT.to_string())
    }
}
