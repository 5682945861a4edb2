use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::settings::Settings;

/// Subtitle listing row with the language in its own cell:
/// `upvote 12 │ English │ [subtitle Name](/subtitles/x) │ ...`
///
/// Captures: `upvotes`, `language`, `link` (first parenthesized group after
/// the language cell). `|` and `│` both count as cell delimiters.
static LISTING_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*[|│]?\s*(?:upvote\s*)?(?P<upvotes>\d+)\s*[|│]\s*(?P<language>[^|│\[\]()]+?)\s*[|│].*?\((?P<link>[^)\s]+)\)",
    )
    .unwrap()
});

/// Subtitle listing row with the language leading the link label:
/// `upvote12 | [English subtitle Name](/subtitles/x) | ...`
///
/// Same captures as [`LISTING_CELL_RE`].
static LISTING_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*[|│]?\s*(?:upvote\s*)?(?P<upvotes>\d+)\s*[|│].*?\[(?P<language>[^|│\[\]()]+?) subtitle\b[^\]]*\]\((?P<link>[^)\s]+)\)",
    )
    .unwrap()
});

/// Line patterns for each pipeline stage.
///
/// Site markup assumptions live here and nowhere else, so a layout change on
/// the site means editing a single rule.
#[derive(Debug, Clone)]
pub struct Rules {
    /// Search result bullet. Captures: `title`, `link`.
    pub search: Regex,
    /// Subtitle listing row shapes, tried in order; the first match wins.
    /// Captures: `upvotes`, `language`, `link`.
    pub listing: Vec<Regex>,
    /// Download link on the detail page, matched against the whole text.
    /// Captures: `link` (may contain line breaks).
    pub download: Regex,
}

impl Rules {
    pub fn new(settings: &Settings) -> Result<Self> {
        let search = Regex::new(&format!(
            r"^\s*[*+-]\s+\[(?P<title>(?:[^\[\]]|\[[^\[\]]*\])+)\].*?(?P<link>{}[^)\s]+)\)",
            regex::escape(&settings.movie_path)
        ))
        .context("Invalid search rule")?;

        let download = Regex::new(&format!(
            r"\[{}\]\((?P<link>[^)]*)\)",
            regex::escape(&settings.download_marker)
        ))
        .context("Invalid download rule")?;

        Ok(Self {
            search,
            listing: vec![LISTING_CELL_RE.clone(), LISTING_LABEL_RE.clone()],
            download,
        })
    }

    /// Match a listing row against each row shape in turn.
    pub fn listing_captures<'t>(&self, line: &'t str) -> Option<Captures<'t>> {
        self.listing.iter().find_map(|re| re.captures(line))
    }
}
