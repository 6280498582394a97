use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::normalizer::normalize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedDocument {
    pub document_id: i64,
    pub score: f64,
    /// Chunk that produced the document's best score.
    pub chunk_index: usize,
}

/// Ranks documents by their best-scoring chunk.
///
/// Only the `2 * top_k` best chunks are considered, so a document with many
/// strong chunks cannot crowd out the rest of the candidate set entirely.
pub fn rank<E: Embedder + ?Sized>(
    index: &SearchIndex,
    query: &str,
    top_k: usize,
    embedder: &E,
) -> Result<Vec<RankedDocument>, SearchError> {
    let query = normalize(query);
    if query.is_empty() || top_k == 0 || index.is_empty() {
        return Ok(Vec::new());
    }

    let similarities = index.similarities(&query, embedder)?;
    Ok(top_documents(&similarities, top_k, |chunk_index| {
        index.chunk_to_document(chunk_index)
    }))
}

pub fn top_documents<F>(similarities: &[f64], top_k: usize, chunk_to_document: F) -> Vec<RankedDocument>
where
    F: Fn(usize) -> Option<i64>,
{
    if top_k == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..similarities.len()).collect();
    order.sort_by(|left, right| similarities[*right].total_cmp(&similarities[*left]));
    order.truncate(top_k.saturating_mul(2));

    let mut documents: Vec<RankedDocument> = Vec::new();
    for chunk_index in order {
        let Some(document_id) = chunk_to_document(chunk_index) else {
            continue;
        };
        let score = similarities[chunk_index];

        match documents
            .iter_mut()
            .find(|ranked| ranked.document_id == document_id)
        {
            Some(existing) if score > existing.score => {
                existing.score = score;
                existing.chunk_index = chunk_index;
            }
            Some(_) => {}
            None => documents.push(RankedDocument {
                document_id,
                score,
                chunk_index,
            }),
        }
    }

    documents.sort_by(|left, right| right.score.total_cmp(&left.score));
    documents.truncate(top_k);
    documents
}
