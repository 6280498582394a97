use crate::error::ExtractionError;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Upper bound on the decompressed size of a single archive entry.
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub trait SubtitleExtractor {
    fn extract(&self, blob: &[u8]) -> Result<String, ExtractionError>;
}

/// Reads the first entry of an in-memory zip archive as Latin-1 text.
///
/// Archives are expected to hold one subtitle file. Extra entries are ignored
/// rather than rejected.
#[derive(Debug, Clone, Copy)]
pub struct ZipExtractor {
    pub max_entry_bytes: u64,
}

impl Default for ZipExtractor {
    fn default() -> Self {
        Self {
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

impl SubtitleExtractor for ZipExtractor {
    fn extract(&self, blob: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(blob))?;
        if archive.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        let entry = archive.by_index(0)?;
        let name = entry.name().to_string();

        let mut bytes = Vec::new();
        entry
            .take(self.max_entry_bytes.saturating_add(1))
            .read_to_end(&mut bytes)?;

        if bytes.len() as u64 > self.max_entry_bytes {
            return Err(ExtractionError::EntryTooLarge {
                name,
                limit: self.max_entry_bytes,
            });
        }

        Ok(decode_single_byte(&bytes))
    }
}

pub fn extract_subtitle_text(blob: &[u8]) -> Result<String, ExtractionError> {
    ZipExtractor::default().extract(blob)
}

/// Every byte maps to the code point of the same value, so decoding cannot fail.
pub fn decode_single_byte(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

pub fn encode_single_byte(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

/// Builds a single-entry deflate archive, the shape the corpus store holds.
pub fn pack_subtitle(file_name: &str, text: &str) -> Result<Vec<u8>, ExtractionError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(file_name, options)?;
    writer.write_all(&encode_single_byte(text))?;

    Ok(writer.finish()?.into_inner())
}
