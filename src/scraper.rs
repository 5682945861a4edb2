use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{debug, info};

use crate::settings::Settings;

static FOOTNOTE_DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d+)\]:\s*(\S+)\s*$").unwrap());
static FOOTNOTE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[((?:[^\[\]]|\[[^\[\]]*\])*)\]\[(\d+)\]").unwrap());

/// Where the pipeline gets its pages from.
pub trait PageSource {
    /// Fetch a page and return it as line-oriented text with links in
    /// `[label](target)` form.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Fetch a resource as raw bytes.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Live HTTP source: reqwest for transport, html2text for normalization.
pub struct HttpSource {
    client: reqwest::Client,
    text_width: usize,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            text_width: settings.text_width,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Bad response from {}", url))?;
        Ok(response)
    }
}

impl PageSource for HttpSource {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let pb = spinner(format!("Fetching {}", url))?;
        let start = Instant::now();

        let result = async {
            let body = self.get(url).await?.bytes().await?;
            html2text::from_read(&body[..], self.text_width)
                .with_context(|| format!("Failed to render {} as text", url))
        }
        .await;
        pb.finish_and_clear();

        let text = result?;
        info!(
            "Fetched {} ({} bytes of text) in {}ms",
            url,
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(inline_links(&text))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let pb = spinner(format!("Downloading {}", url))?;
        let result = async { Ok::<_, anyhow::Error>(self.get(url).await?.bytes().await?) }.await;
        pb.finish_and_clear();

        let bytes = result.with_context(|| format!("Failed to download {}", url))?;
        info!("Downloaded {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Rewrite html2text's footnote links (`[label][3]` plus a trailing
/// `[3]: target` list) into inline `[label](target)` links.
///
/// The footnote list itself is dropped. References without a matching
/// footnote are left as they are.
pub fn inline_links(text: &str) -> String {
    let mut targets: HashMap<&str, &str> = HashMap::new();
    let mut body = Vec::new();

    for line in text.lines() {
        match FOOTNOTE_DEF_RE.captures(line) {
            Some(caps) => {
                let (Some(n), Some(target)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                targets.insert(n.as_str(), target.as_str());
            }
            None => body.push(line),
        }
    }
    debug!("Inlining {} footnote links", targets.len());

    let body = body.join("\n");
    FOOTNOTE_REF_RE
        .replace_all(&body, |caps: &regex::Captures| match targets.get(&caps[2]) {
            Some(target) => format!("[{}]({})", &caps[1], target),
            None => caps[0].to_string(),
        })
        .into_owned()
}

// ── Tests ──
