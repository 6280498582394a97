use crate::keyword::DocumentMatches;
use crate::models::{Relevance, SearchOptions, SearchResult, SourceRecord};
use crate::ranker::RankedDocument;

const ELLIPSIS: &str = "...";

/// Cuts `context_chars` characters either side of the first occurrence of
/// `query`, marking each truncated side with an ellipsis.
pub fn snippet_around(
    text: &str,
    query: &str,
    case_sensitive: bool,
    context_chars: usize,
) -> Option<String> {
    let haystack: Vec<char> = text.chars().collect();
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    let fold = |ch: &char| {
        if case_sensitive {
            *ch
        } else {
            ch.to_lowercase().next().unwrap_or(*ch)
        }
    };
    let folded_haystack: Vec<char> = haystack.iter().map(fold).collect();
    let folded_needle: Vec<char> = needle.iter().map(fold).collect();

    let position = folded_haystack
        .windows(folded_needle.len())
        .position(|window| window == folded_needle.as_slice())?;

    let start = position.saturating_sub(context_chars);
    let end = (position + needle.len() + context_chars).min(haystack.len());

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&haystack[start..end]);
    if end < haystack.len() {
        snippet.push_str(ELLIPSIS);
    }
    Some(snippet)
}

/// Keeps at most `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

/// Results for a whole-corpus scan. The snippet is cut from the first matched
/// subtitle entry, so it always agrees with `matches[0]`.
pub fn keyword_results(
    hits: Vec<DocumentMatches>,
    query: &str,
    case_sensitive: bool,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    hits.into_iter()
        .map(|hit| {
            let snippet = hit.matches.first().map(|line| {
                snippet_around(
                    &line.text,
                    query.trim(),
                    case_sensitive,
                    options.snippet_context_chars,
                )
                .unwrap_or_else(|| line.text.clone())
            });

            SearchResult {
                document_id: hit.document_id,
                url: options.document_url(hit.document_id),
                relevance: Relevance::MatchCount(hit.match_count()),
                name: hit.name,
                snippet,
                matches: hit.matches,
                record: None,
            }
        })
        .collect()
}

/// Ranked document together with the corpus data needed to present it.
#[derive(Debug, Clone)]
pub struct RankedSource<'a> {
    pub ranked: RankedDocument,
    pub name: String,
    pub best_chunk: &'a str,
    pub text: String,
}

pub fn ranked_results(sources: Vec<RankedSource<'_>>, options: &SearchOptions) -> Vec<SearchResult> {
    sources
        .into_iter()
        .map(|source| {
            let document_id = source.ranked.document_id;
            SearchResult {
                document_id,
                url: options.document_url(document_id),
                relevance: Relevance::Similarity(source.ranked.score),
                snippet: Some(truncate_chars(
                    source.best_chunk,
                    options.snippet_context_chars.saturating_mul(2),
                )),
                matches: Vec::new(),
                record: Some(SourceRecord {
                    document_id,
                    name: source.name.clone(),
                    text: source.text,
                }),
                name: source.name,
            }
        })
        .collect()
}
