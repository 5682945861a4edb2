use tracing::debug;

use super::{SearchRecord, SubtitleRecord};

/// A movie the user has to choose between when a search is ambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    /// Last segment of the movie link (the IMDb id on yifysubtitles).
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    NoMatch,
    /// Listed in the order the movies appear on the search page.
    Ambiguous(Vec<Candidate>),
    Unique(SearchRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleOutcome {
    NoMatch,
    Selected(SubtitleRecord),
}

pub fn resolve_search(mut records: Vec<SearchRecord>) -> SearchOutcome {
    match records.len() {
        0 => SearchOutcome::NoMatch,
        1 => SearchOutcome::Unique(records.remove(0)),
        _ => SearchOutcome::Ambiguous(
            records
                .into_iter()
                .map(|r| Candidate {
                    identifier: identifier(&r.movie_link).to_string(),
                    title: r.title,
                })
                .collect(),
        ),
    }
}

/// Keep rows in `language` (exact match) and pick the most upvoted one.
/// Equal upvotes keep listing order.
pub fn resolve_subtitle(records: Vec<SubtitleRecord>, language: &str) -> SubtitleOutcome {
    let mut matching: Vec<SubtitleRecord> = records
        .into_iter()
        .filter(|r| r.language == language)
        .collect();
    debug!("{} subtitle rows in {}", matching.len(), language);

    // sort_by is stable
    matching.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
    match matching.into_iter().next() {
        Some(best) => SubtitleOutcome::Selected(best),
        None => SubtitleOutcome::NoMatch,
    }
}

fn identifier(movie_link: &str) -> &str {
    movie_link.rsplit('/').next().unwrap_or(movie_link)
}

// ── Tests ──
