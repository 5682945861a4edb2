use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::archive;
use crate::parser::{self, Candidate, Rules, SearchOutcome, SubtitleOutcome, SubtitleRecord};
use crate::scraper::PageSource;
use crate::settings::Settings;

pub struct Options {
    pub dest: PathBuf,
    pub dry_run: bool,
}

/// How a run ended. Everything except a failed fetch or extraction lands here.
#[derive(Debug)]
pub enum Outcome {
    NoMovie,
    Ambiguous(Vec<Candidate>),
    NoSubtitles { title: String },
    NoDownloadLink { page: String },
    /// Dry run: the link was found but nothing was downloaded.
    Resolved {
        subtitle: SubtitleRecord,
        download_url: String,
    },
    Downloaded {
        subtitle: SubtitleRecord,
        download_url: String,
        files: Vec<PathBuf>,
    },
}

/// search page → movie page → subtitle page → archive, one fetch at a time.
pub async fn run<S: PageSource>(
    source: &S,
    settings: &Settings,
    query: &str,
    opts: &Options,
) -> Result<Outcome> {
    let rules = Rules::new(settings)?;

    // Stage 1: search
    let search_url = settings.search_url(query)?;
    let text = source.fetch_text(search_url.as_str()).await?;
    let movie = match parser::resolve_search(parser::extract_search_records(&rules, &text)) {
        SearchOutcome::NoMatch => return Ok(Outcome::NoMovie),
        SearchOutcome::Ambiguous(candidates) => {
            info!("{} movies match {:?}", candidates.len(), query);
            return Ok(Outcome::Ambiguous(candidates));
        }
        SearchOutcome::Unique(movie) => movie,
    };
    info!("Matched {} ({})", movie.title, movie.movie_link);

    // Stage 2: subtitle listing
    let movie_url = settings.site_url(&movie.movie_link)?;
    let text = source.fetch_text(movie_url.as_str()).await?;
    let rows = parser::extract_subtitle_records(&rules, &text);
    let subtitle = match parser::resolve_subtitle(rows, &settings.language) {
        SubtitleOutcome::NoMatch => return Ok(Outcome::NoSubtitles { title: movie.title }),
        SubtitleOutcome::Selected(subtitle) => subtitle,
    };
    info!(
        "Selected {} ({} upvotes)",
        subtitle.link, subtitle.upvotes
    );

    // Stage 3: detail page → download link
    let page = settings.site_url(&subtitle.link)?;
    let text = source.fetch_text(page.as_str()).await?;
    let Some(resolved) = parser::resolve_download(&rules, &text) else {
        return Ok(Outcome::NoDownloadLink {
            page: page.to_string(),
        });
    };
    let download_url = settings.site_url(&resolved.download_url)?.to_string();

    if opts.dry_run {
        return Ok(Outcome::Resolved {
            subtitle,
            download_url,
        });
    }

    let bytes = source.fetch_bytes(&download_url).await?;
    let files = archive::materialize(bytes, &download_url, &opts.dest).await?;

    Ok(Outcome::Downloaded {
        subtitle,
        download_url,
        files,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use anyhow::anyhow;

    use super::*;
    use crate::archive::tests::zip_bytes;

    /// Serves fixed pages and records every request.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<String, String>,
        files: HashMap<String, Vec<u8>>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn page(mut self, url: &str, text: &str) -> Self {
            self.pages.insert(url.to_string(), text.to_string());
            self
        }

        fn file(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.files.insert(url.to_string(), bytes);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    impl PageSource for FakeSource {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("404 Not Found: {}", url))
        }

        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.borrow_mut().push(url.to_string());
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("404 Not Found: {}", url))
        }
    }

    const BASE: &str = "http://www.yifysubtitles.com";
    const MOVIE_URL: &str = "http://www.yifysubtitles.com/movie-imdb/tt0133093";
    const DETAIL_URL: &str =
        "http://www.yifysubtitles.com/subtitles/the-matrix-1999-english-yify-102";
    const ZIP_URL: &str =
        "http://www.yifysubtitles.com/subtitle/the-matrix-1999-english-yify-102.zip";

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.md", name)).unwrap()
    }

    fn search_url(query: &str) -> String {
        Settings::default().search_url(query).unwrap().to_string()
    }

    fn options(dest: &std::path::Path, dry_run: bool) -> Options {
        Options {
            dest: dest.to_path_buf(),
            dry_run,
        }
    }

    #[tokio::test]
    async fn no_search_hits_stops_after_first_fetch() {
        let source = FakeSource::default().page(&search_url("zzz"), "# Search\n\nNothing found\n");
        let dir = tempfile::tempdir().unwrap();

        let outcome = run(&source, &Settings::default(), "zzz", &options(dir.path(), false))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::NoMovie));
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn ambiguous_search_lists_candidates_without_guessing() {
        let source = FakeSource::default().page(&search_url("Matrix"), &fixture("search_multi"));
        let dir = tempfile::tempdir().unwrap();

        let outcome = run(&source, &Settings::default(), "Matrix", &options(dir.path(), false))
            .await
            .unwrap();

        let Outcome::Ambiguous(candidates) = outcome else {
            panic!("expected ambiguous outcome");
        };
        let ids: Vec<&str> = candidates.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, vec!["tt0133093", "tt0234215", "tt0242653"]);
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_search_lines_proceed_to_listing() {
        let search = "* [X](/movie-imdb/ttX)\n* [X](/movie-imdb/ttX)\n";
        let source = FakeSource::default().page(&search_url("ttX"), search);
        let dir = tempfile::tempdir().unwrap();

        // Movie page is missing, so the run fails at stage 2
        let result = run(&source, &Settings::default(), "ttX", &options(dir.path(), false)).await;

        assert!(result.is_err());
        assert_eq!(
            source.requested(),
            vec![search_url("ttX"), format!("{}/movie-imdb/ttX", BASE)]
        );
    }

    #[tokio::test]
    async fn no_subtitles_in_target_language() {
        let source = FakeSource::default()
            .page(&search_url("The Matrix"), &fixture("search_single"))
            .page(MOVIE_URL, &fixture("movie"));
        let settings = Settings {
            language: "German".to_string(),
            ..Settings::default()
        };
        let dir = tempfile::tempdir().unwrap();

        let outcome = run(&source, &settings, "The Matrix", &options(dir.path(), false))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::NoSubtitles { ref title } if title == "The Matrix"));
        assert_eq!(source.requested().len(), 2);
    }

    #[tokio::test]
    async fn missing_download_marker_downloads_nothing() {
        let source = FakeSource::default()
            .page(&search_url("The Matrix"), &fixture("search_single"))
            .page(MOVIE_URL, &fixture("movie"))
            .page(DETAIL_URL, "# The Matrix\n\n[Download subtitle](http://host/x.zip)\n");
        let dir = tempfile::tempdir().unwrap();

        let outcome = run(&source, &Settings::default(), "The Matrix", &options(dir.path(), false))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::NoDownloadLink { .. }));
        assert_eq!(source.requested().len(), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dry_run_resolves_without_downloading() {
        let source = FakeSource::default()
            .page(&search_url("The Matrix"), &fixture("search_single"))
            .page(MOVIE_URL, &fixture("movie"))
            .page(DETAIL_URL, &fixture("subtitle"));
        let dir = tempfile::tempdir().unwrap();

        let outcome = run(&source, &Settings::default(), "The Matrix", &options(dir.path(), true))
            .await
            .unwrap();

        let Outcome::Resolved { subtitle, download_url } = outcome else {
            panic!("expected resolved outcome");
        };
        assert_eq!(subtitle.upvotes, 20);
        assert_eq!(download_url, ZIP_URL);
        assert!(!source.requested().contains(&ZIP_URL.to_string()));
    }

    #[tokio::test]
    async fn full_run_extracts_best_english_subtitle() {
        let zip = zip_bytes(&[("The.Matrix.1999.1080p.srt", "1\n00:00:01,000 --> 00:00:02,000\nFollow the white rabbit.\n")]);
        let source = FakeSource::default()
            .page(&search_url("The Matrix"), &fixture("search_single"))
            .page(MOVIE_URL, &fixture("movie"))
            .page(DETAIL_URL, &fixture("subtitle"))
            .file(ZIP_URL, zip);
        let dir = tempfile::tempdir().unwrap();

        let outcome = run(&source, &Settings::default(), "The Matrix", &options(dir.path(), false))
            .await
            .unwrap();

        let Outcome::Downloaded { subtitle, files, .. } = outcome else {
            panic!("expected download");
        };
        assert_eq!(subtitle.link, "/subtitles/the-matrix-1999-english-yify-102");
        assert_eq!(files, vec![dir.path().join("The.Matrix.1999.1080p.srt")]);
        assert!(!dir.path().join("the-matrix-1999-english-yify-102.zip").exists());
        assert_eq!(
            source.requested(),
            vec![
                search_url("The Matrix"),
                MOVIE_URL.to_string(),
                DETAIL_URL.to_string(),
                ZIP_URL.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let source = FakeSource::default();
        let dir = tempfile::tempdir().unwrap();

        let result = run(&source, &Settings::default(), "anything", &options(dir.path(), false)).await;

        assert!(result.is_err());
    }
}
