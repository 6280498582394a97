use crate::assembler::{keyword_results, ranked_results, truncate_chars, RankedSource};
use crate::chunking::{chunk_words, ChunkingConfig};
use crate::corpus::{corpus_fingerprint, sample_corpus};
use crate::embeddings::Embedder;
use crate::extractor::{encode_single_byte, SubtitleExtractor, ZipExtractor};
use crate::index::SearchIndex;
use crate::keyword::scan_documents;
use crate::normalizer::normalize;
use crate::ranker::rank;
use crate::traits::CorpusStore;
use crate::{
    Document, DocumentInfo, IndexMode, SearchError, SearchMode, SearchOptions, SearchRequest,
    SearchResult,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub document_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedDocument>,
}

/// One search session over a corpus.
///
/// Built indexes are shared as `Arc<SearchIndex>` and only ever replaced, so
/// queries running against an older index are unaffected by a rebuild. Builds
/// run one at a time, so a slow build of an older snapshot never replaces a
/// newer index.
pub struct SearchCoordinator<C, E>
where
    C: CorpusStore,
    E: Embedder,
{
    corpus: C,
    embedder: E,
    extractor: ZipExtractor,
    options: SearchOptions,
    chunking: ChunkingConfig,
    indexes: RwLock<HashMap<IndexMode, Arc<SearchIndex>>>,
    build_lock: Mutex<()>,
}

impl<C, E> SearchCoordinator<C, E>
where
    C: CorpusStore,
    E: Embedder,
{
    pub fn new(corpus: C, embedder: E, options: SearchOptions) -> Result<Self, SearchError> {
        options.validate()?;
        let chunking = ChunkingConfig::try_from(&options)?;

        Ok(Self {
            corpus,
            embedder,
            extractor: ZipExtractor {
                max_entry_bytes: options.max_entry_bytes,
            },
            options,
            chunking,
            indexes: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
        })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn corpus(&self) -> &C {
        &self.corpus
    }

    pub async fn index(&self, mode: IndexMode) -> Option<Arc<SearchIndex>> {
        self.indexes.read().await.get(&mode).cloned()
    }

    /// Builds the index for `mode`, or returns the current one when the corpus
    /// snapshot and chunking are unchanged.
    pub async fn build_index(&self, mode: IndexMode) -> Result<Arc<SearchIndex>, SearchError> {
        let _building = self.build_lock.lock().await;

        let documents = sample_corpus(
            self.corpus.list_documents().await?,
            self.options.sample_ratio,
            self.options.sample_seed,
        );
        let fingerprint = corpus_fingerprint(&documents);

        if let Some(current) = self.index(mode).await {
            if current.fingerprint() == fingerprint && current.chunking() == self.chunking {
                info!(%mode, fingerprint = %fingerprint, "reusing search index");
                return Ok(current);
            }
        }

        let chunks = documents
            .iter()
            .filter_map(|document| self.normalized_text(document))
            .flat_map(|(document_id, text)| chunk_words(document_id, &text, self.chunking))
            .collect::<Vec<_>>();

        let index = Arc::new(SearchIndex::build(
            chunks,
            mode,
            self.chunking,
            fingerprint,
            &self.embedder,
        )?);

        self.indexes.write().await.insert(mode, Arc::clone(&index));
        Ok(index)
    }

    pub async fn ranked_search(
        &self,
        mode: IndexMode,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let index = self
            .index(mode)
            .await
            .ok_or(SearchError::IndexNotBuilt(mode))?;

        let ranked = rank(&index, query, top_k, &self.embedder)?;

        let mut sources = Vec::with_capacity(ranked.len());
        for hit in ranked {
            let Some(document) = self.corpus.get_document(hit.document_id).await? else {
                warn!(document_id = hit.document_id, "ranked document vanished from corpus");
                continue;
            };
            let text = self
                .normalized_text(&document)
                .map(|(_, text)| text)
                .unwrap_or_default();
            let best_chunk = index
                .chunks()
                .get(hit.chunk_index)
                .map(|chunk| chunk.text.as_str())
                .unwrap_or_default();

            sources.push(RankedSource {
                ranked: hit,
                name: document.name,
                best_chunk,
                text,
            });
        }

        Ok(ranked_results(sources, &self.options))
    }

    /// Exact substring search over every decoded document.
    pub async fn keyword_search(
        &self,
        query: &str,
        max_results: usize,
        case_sensitive: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let documents = self.corpus.list_documents().await?;
        let hits = scan_documents(
            &documents,
            &self.extractor,
            query,
            case_sensitive,
            max_results,
        );

        info!(
            query = %query,
            scanned = documents.len(),
            matched = hits.len(),
            "keyword scan finished"
        );

        Ok(keyword_results(hits, query, case_sensitive, &self.options))
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        match request.mode.index_mode() {
            None => {
                self.keyword_search(&request.query, request.max_results, request.case_sensitive)
                    .await
            }
            Some(mode) => self.ranked_search(mode, &request.query, request.top_k).await,
        }
    }

    /// Parses `mode` before doing any work, so unknown modes fail fast.
    pub async fn search_with_mode(
        &self,
        query: &str,
        mode: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let request = SearchRequest {
            query: query.to_string(),
            mode: mode.parse::<SearchMode>()?,
            top_k: self.options.top_k,
            max_results: self.options.max_results,
            case_sensitive: self.options.case_sensitive,
        };
        self.search(&request).await
    }

    pub async fn document_info(&self, id: i64) -> Result<DocumentInfo, SearchError> {
        let document = self
            .corpus
            .get_document(id)
            .await?
            .ok_or(SearchError::DocumentNotFound(id))?;
        let url = self.options.document_url(document.id);

        let info = match self.extractor.extract(&document.raw_content) {
            Ok(text) => DocumentInfo {
                id: document.id,
                name: document.name,
                url,
                text_available: true,
                line_count: text.lines().count(),
                word_count: normalize(&text).split_whitespace().count(),
                preview: truncate_chars(&text, PREVIEW_CHARS),
            },
            Err(error) => {
                debug!(document_id = id, %error, "subtitle text unavailable");
                DocumentInfo {
                    id: document.id,
                    name: document.name,
                    url,
                    text_available: false,
                    line_count: 0,
                    word_count: 0,
                    preview: String::new(),
                }
            }
        };

        Ok(info)
    }

    /// Writes every readable subtitle to `<dir>/<id>_<name>.srt` with its
    /// original single-byte encoding.
    pub async fn export_documents(&self, dir: &Path) -> Result<ExportReport, SearchError> {
        tokio::fs::create_dir_all(dir).await?;

        let mut report = ExportReport::default();
        for document in self.corpus.list_documents().await? {
            match self.extractor.extract(&document.raw_content) {
                Ok(text) => {
                    let path = dir.join(export_file_name(&document));
                    tokio::fs::write(&path, encode_single_byte(&text)).await?;
                    report.written.push(path);
                }
                Err(error) => report.skipped.push(SkippedDocument {
                    document_id: document.id,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(report)
    }

    fn normalized_text(&self, document: &Document) -> Option<(i64, String)> {
        match self.extractor.extract(&document.raw_content) {
            Ok(text) => Some((document.id, normalize(&text))),
            Err(error) => {
                debug!(document_id = document.id, %error, "skipping unreadable subtitle");
                None
            }
        }
    }
}

fn export_file_name(document: &Document) -> String {
    let stem: String = document
        .name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches(|ch| ch == '_' || ch == '.');

    if stem.is_empty() {
        format!("{}.srt", document.id)
    } else {
        format!("{}_{}.srt", document.id, stem)
    }
}
