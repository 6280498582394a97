use crate::traits::CorpusStore;
use crate::{Document, SearchError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const SELECT_DOCUMENTS: &str = "SELECT num, name, content FROM zipfiles";

/// Corpus backed by the `zipfiles(num, name, content)` SQLite table.
///
/// Each call opens its own connection on a blocking thread and drops it before
/// returning, whichever way the call ends.
#[derive(Debug, Clone)]
pub struct SqliteCorpus {
    path: PathBuf,
}

impl SqliteCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the table if needed and upserts `documents`.
    pub async fn create(
        path: impl Into<PathBuf>,
        documents: Vec<Document>,
    ) -> Result<Self, SearchError> {
        let path = path.into();
        let target = path.clone();

        run_blocking(move || {
            let mut connection = Connection::open(&target)?;
            connection.execute_batch(
                "CREATE TABLE IF NOT EXISTS zipfiles (
                    num INTEGER PRIMARY KEY,
                    name TEXT,
                    content BLOB
                );",
            )?;

            let transaction = connection.transaction()?;
            {
                let mut statement = transaction.prepare(
                    "INSERT OR REPLACE INTO zipfiles (num, name, content) VALUES (?1, ?2, ?3)",
                )?;
                for document in &documents {
                    statement.execute(params![document.id, document.name, document.raw_content])?;
                }
            }
            transaction.commit()?;
            Ok(())
        })
        .await?;

        Ok(Self::new(path))
    }

    async fn with_connection<T, F>(&self, operation: F) -> Result<T, SearchError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, SearchError> + Send + 'static,
    {
        let path = self.path.clone();
        run_blocking(move || {
            let connection = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            operation(&connection)
        })
        .await
    }
}

async fn run_blocking<T, F>(operation: F) -> Result<T, SearchError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SearchError> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|error| SearchError::CorpusUnavailable(format!("corpus task failed: {error}")))?
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        raw_content: row.get::<_, Option<Vec<u8>>>(2)?.unwrap_or_default(),
    })
}

#[async_trait]
impl CorpusStore for SqliteCorpus {
    async fn list_documents(&self) -> Result<Vec<Document>, SearchError> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(&format!("{SELECT_DOCUMENTS} ORDER BY num"))?;
            let documents = statement
                .query_map([], document_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(documents)
        })
        .await
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>, SearchError> {
        self.with_connection(move |connection| {
            let document = connection
                .query_row(
                    &format!("{SELECT_DOCUMENTS} WHERE num = ?1"),
                    params![id],
                    document_from_row,
                )
                .optional()?;
            Ok(document)
        })
        .await
    }
}

/// In-process corpus, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    documents: Vec<Document>,
}

impl MemoryCorpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpus {
    async fn list_documents(&self) -> Result<Vec<Document>, SearchError> {
        Ok(self.documents.clone())
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>, SearchError> {
        Ok(self
            .documents
            .iter()
            .find(|document| document.id == id)
            .cloned())
    }
}

/// Keeps `round(n * ratio)` documents, picked by a seeded hash of their id so
/// the same seed always selects the same subset. Corpus order is preserved.
pub fn sample_corpus(documents: Vec<Document>, ratio: f64, seed: u64) -> Vec<Document> {
    if ratio >= 1.0 {
        return documents;
    }

    let keep = ((documents.len() as f64) * ratio.max(0.0)).round() as usize;
    let mut ranked: Vec<(u64, i64)> = documents
        .iter()
        .map(|document| {
            let mut hasher = Sha256::new();
            hasher.update(seed.to_le_bytes());
            hasher.update(document.id.to_le_bytes());
            let digest = hasher.finalize();
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&digest[..8]);
            (u64::from_le_bytes(prefix), document.id)
        })
        .collect();
    ranked.sort_unstable();

    let chosen: HashSet<i64> = ranked.into_iter().take(keep).map(|(_, id)| id).collect();
    documents
        .into_iter()
        .filter(|document| chosen.contains(&document.id))
        .collect()
}

/// Identity of a corpus snapshot: changes whenever any row does.
pub fn corpus_fingerprint(documents: &[Document]) -> String {
    let mut hasher = Sha256::new();
    for document in documents {
        hasher.update(document.id.to_le_bytes());
        hasher.update((document.name.len() as u64).to_le_bytes());
        hasher.update(document.name.as_bytes());
        hasher.update((document.raw_content.len() as u64).to_le_bytes());
        hasher.update(&document.raw_content);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn document(id: i64) -> Document {
        Document {
            id,
            name: format!("Movie {id}"),
            raw_content: vec![id as u8; 4],
        }
    }

    #[tokio::test]
    async fn sqlite_corpus_round_trips_rows() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("corpus.db");
        let corpus = SqliteCorpus::create(&path, vec![document(2), document(1)]).await?;

        let listed = corpus.list_documents().await?;
        let ids: Vec<i64> = listed.iter().map(|document| document.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(listed[1], document(2));

        assert_eq!(corpus.get_document(1).await?, Some(document(1)));
        assert_eq!(corpus.get_document(99).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_database_is_unavailable() {
        let dir = tempdir().unwrap();
        let corpus = SqliteCorpus::new(dir.path().join("absent.db"));

        let error = corpus.list_documents().await.unwrap_err();
        assert!(matches!(error, SearchError::CorpusUnavailable(_)));
    }

    #[tokio::test]
    async fn null_columns_read_as_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("corpus.db");
        SqliteCorpus::create(&path, Vec::new()).await?;
        {
            let connection = Connection::open(&path)?;
            connection.execute("INSERT INTO zipfiles (num, name, content) VALUES (7, NULL, NULL)", [])?;
        }

        let document = SqliteCorpus::new(&path).get_document(7).await?.unwrap();
        assert_eq!(document.name, "");
        assert!(document.raw_content.is_empty());
        Ok(())
    }

    #[test]
    fn sampling_is_deterministic_and_ordered() {
        let documents: Vec<Document> = (1..=20).map(document).collect();

        let first = sample_corpus(documents.clone(), 0.5, 42);
        let second = sample_corpus(documents.clone(), 0.5, 42);
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|pair| pair[0].id < pair[1].id));

        assert_eq!(sample_corpus(documents.clone(), 1.0, 7).len(), 20);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let original = vec![document(1), document(2)];
        let mut changed = original.clone();
        changed[1].raw_content.push(0);

        assert_eq!(corpus_fingerprint(&original), corpus_fingerprint(&original.clone()));
        assert_ne!(corpus_fingerprint(&original), corpus_fingerprint(&changed));
    }
}
