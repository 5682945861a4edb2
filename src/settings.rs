use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://www.yifysubtitles.com";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_MOVIE_PATH: &str = "/movie-imdb/";
pub const DEFAULT_DOWNLOAD_MARKER: &str = "DOWNLOAD SUBTITLE";
pub const DEFAULT_TEXT_WIDTH: usize = 400;

/// Site-specific constants. Defaults target yifysubtitles; every key can be
/// overridden with a `YIFY_` environment variable (e.g. `YIFY_LANGUAGE`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub language: String,
    /// Path prefix of movie detail pages, as it appears in search results.
    pub movie_path: String,
    /// Exact label of the download link on a subtitle detail page.
    pub download_marker: String,
    pub text_width: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            movie_path: DEFAULT_MOVIE_PATH.to_string(),
            download_marker: DEFAULT_DOWNLOAD_MARKER.to_string(),
            text_width: DEFAULT_TEXT_WIDTH,
            timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("language", DEFAULT_LANGUAGE)?
            .set_default("movie_path", DEFAULT_MOVIE_PATH)?
            .set_default("download_marker", DEFAULT_DOWNLOAD_MARKER)?
            .set_default("text_width", DEFAULT_TEXT_WIDTH as i64)?
            .add_source(config::Environment::with_prefix("YIFY"))
            .build()
            .context("Failed to read settings")?;

        let mut settings: Settings = settings
            .try_deserialize()
            .context("Invalid settings")?;
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(settings)
    }

    pub fn search_url(&self, query: &str) -> Result<reqwest::Url> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", query)],
        )
        .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        Ok(url)
    }

    /// Resolve a site link (usually a root-relative path) against the base URL.
    pub fn site_url(&self, link: &str) -> Result<reqwest::Url> {
        let base = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        base.join(link)
            .with_context(|| format!("Invalid link: {}", link))
    }
}
