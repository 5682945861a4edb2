pub mod extract;
pub mod resolve;
pub mod rules;

pub use extract::{extract_search_records, extract_subtitle_records, resolve_download};
pub use resolve::{resolve_search, resolve_subtitle, Candidate, SearchOutcome, SubtitleOutcome};
pub use rules::Rules;

/// One movie hit on the search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub title: String,
    /// `/movie-imdb/<identifier>`
    pub movie_link: String,
}

/// One row of a movie's subtitle listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleRecord {
    pub upvotes: u32,
    pub language: String,
    /// Path of the subtitle detail page.
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubtitle {
    pub download_url: String,
}
