use crate::extractor::SubtitleExtractor;
use crate::models::{Document, MatchLine};
use crate::normalizer::{contains_timestamp_range, strip_markup};
use tracing::debug;

/// Matches of one document from a whole-corpus scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatches {
    pub document_id: i64,
    pub name: String,
    pub matches: Vec<MatchLine>,
}

impl DocumentMatches {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Finds subtitle entries whose spoken text contains `query`.
///
/// Entries are blank-line separated blocks. The first line carrying a time
/// range marks the start of the spoken text; blocks without one, or without
/// text after it, are skipped.
pub fn find_matches(text: &str, query: &str, case_sensitive: bool) -> Vec<MatchLine> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let needle = fold_case(query, case_sensitive);

    subtitle_blocks(text)
        .into_iter()
        .filter_map(|block| spoken_entry(&block))
        .filter(|entry| fold_case(&entry.text, case_sensitive).contains(&needle))
        .collect()
}

/// Scans every document, keeps the ones with at least one match, and orders
/// them by match count. Equal counts keep corpus order.
pub fn scan_documents<X: SubtitleExtractor + ?Sized>(
    documents: &[Document],
    extractor: &X,
    query: &str,
    case_sensitive: bool,
    max_results: usize,
) -> Vec<DocumentMatches> {
    if max_results == 0 || query.trim().is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<DocumentMatches> = documents
        .iter()
        .filter_map(|document| {
            let text = match extractor.extract(&document.raw_content) {
                Ok(text) => text,
                Err(error) => {
                    debug!(document_id = document.id, %error, "skipping unreadable subtitle");
                    return None;
                }
            };

            let matches = find_matches(&text, query, case_sensitive);
            if matches.is_empty() {
                return None;
            }

            Some(DocumentMatches {
                document_id: document.id,
                name: document.name.clone(),
                matches,
            })
        })
        .collect();

    hits.sort_by(|left, right| right.match_count().cmp(&left.match_count()));
    hits.truncate(max_results);
    hits
}

fn fold_case(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

fn subtitle_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn spoken_entry(block: &[&str]) -> Option<MatchLine> {
    let marker = block
        .iter()
        .position(|line| contains_timestamp_range(line))?;

    let spoken = block[marker + 1..]
        .iter()
        .map(|line| strip_markup(line.trim()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if spoken.is_empty() {
        return None;
    }

    Some(MatchLine {
        timestamp_range: block[marker].trim().to_string(),
        text: spoken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{pack_subtitle, ZipExtractor};

    const PULP_FICTION: &str = "1\n00:00:10,000 --> 00:00:15,000\nRoyale with cheese.\n\n2\n00:00:16,000 --> 00:00:21,000\nSay what again. Say what again,\nI dare you, I double-dare you.\n";

    #[test]
    fn keyword_match_is_case_insensitive_by_default() {
        let matches = find_matches(PULP_FICTION, "ROYALE", false);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].timestamp_range, "00:00:10,000 --> 00:00:15,000");
        assert_eq!(matches[0].text, "Royale with cheese.");
    }

    #[test]
    fn case_sensitive_match_respects_case() {
        assert!(find_matches(PULP_FICTION, "ROYALE", true).is_empty());
        assert_eq!(find_matches(PULP_FICTION, "Royale", true).len(), 1);
    }

    #[test]
    fn multi_line_entries_are_joined() {
        let matches = find_matches(PULP_FICTION, "again, i dare", false);
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].text,
            "Say what again. Say what again, I dare you, I double-dare you."
        );
    }

    #[test]
    fn blocks_without_timestamp_or_text_are_skipped() {
        let text = "1\nno timestamp here cheese\n\n2\n00:00:01,000 --> 00:00:02,000\n\n3\n00:00:03,000 --> 00:00:04,000\n<i>cheese</i> please\r\n";
        let matches = find_matches(text, "cheese", false);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "cheese please");
        assert_eq!(matches[0].timestamp_range, "00:00:03,000 --> 00:00:04,000");
    }

    #[test]
    fn blank_query_matches_nothing() {
        assert!(find_matches(PULP_FICTION, "  ", false).is_empty());
    }

    fn document(id: i64, text: &str) -> Document {
        Document {
            id,
            name: format!("doc {id}"),
            raw_content: pack_subtitle("doc.srt", text).unwrap(),
        }
    }

    #[test]
    fn scan_ranks_by_match_count_and_keeps_corpus_order_on_ties() {
        let once = "1\n00:00:01,000 --> 00:00:02,000\nwhat a day\n";
        let twice = "1\n00:00:01,000 --> 00:00:02,000\nwhat\n\n2\n00:00:03,000 --> 00:00:04,000\nwhat now\n";
        let documents = vec![
            document(1, once),
            Document {
                id: 2,
                name: "broken".to_string(),
                raw_content: b"not a zip".to_vec(),
            },
            document(3, "1\n00:00:01,000 --> 00:00:02,000\nnothing here\n"),
            document(4, twice),
            document(5, once),
        ];

        let hits = scan_documents(&documents, &ZipExtractor::default(), "what", false, 10);
        let ids: Vec<i64> = hits.iter().map(|hit| hit.document_id).collect();
        assert_eq!(ids, vec![4, 1, 5]);
        assert_eq!(hits[0].match_count(), 2);

        let capped = scan_documents(&documents, &ZipExtractor::default(), "what", false, 2);
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[1].document_id, 1);
    }

    #[test]
    fn zero_max_results_returns_nothing() {
        let documents = vec![document(1, PULP_FICTION)];
        assert!(scan_documents(&documents, &ZipExtractor::default(), "cheese", false, 0).is_empty());
    }
}
