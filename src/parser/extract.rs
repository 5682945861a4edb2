use std::collections::HashSet;

use tracing::debug;

use super::rules::Rules;
use super::{ResolvedSubtitle, SearchRecord, SubtitleRecord};

/// Extract search hits in page order, collapsing repeated `(title, link)` pairs.
pub fn extract_search_records(rules: &Rules, text: &str) -> Vec<SearchRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for line in text.lines() {
        let Some(caps) = rules.search.captures(line) else {
            continue;
        };
        let record = SearchRecord {
            title: caps["title"].trim().to_string(),
            movie_link: caps["link"].to_string(),
        };
        if seen.insert((record.title.clone(), record.movie_link.clone())) {
            records.push(record);
        }
    }

    debug!("Extracted {} search records", records.len());
    records
}

/// Extract every subtitle listing row, in listing order.
pub fn extract_subtitle_records(rules: &Rules, text: &str) -> Vec<SubtitleRecord> {
    let records: Vec<SubtitleRecord> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let caps = rules.listing_captures(line)?;
            // Digits only, so this fails only on overflow; such a row is skipped.
            let upvotes = caps["upvotes"].parse().ok()?;
            Some(SubtitleRecord {
                upvotes,
                language: caps["language"].to_string(),
                link: caps["link"].to_string(),
            })
        })
        .collect();

    debug!("Extracted {} subtitle rows", records.len());
    records
}

/// Find the download link on a subtitle detail page.
///
/// Runs over the whole text: long links are wrapped by the text renderer, so
/// the captured link has its line breaks removed.
pub fn resolve_download(rules: &Rules, text: &str) -> Option<ResolvedSubtitle> {
    let caps = rules.download.captures(text)?;
    let download_url: String = caps["link"]
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();
    let download_url = download_url.trim().to_string();
    if download_url.is_empty() {
        return None;
    }
    Some(ResolvedSubtitle { download_url })
}

// ── Tests ──
