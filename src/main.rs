mod archive;
mod parser;
mod pipeline;
mod scraper;
mod settings;

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use pipeline::{Options, Outcome};
use scraper::HttpSource;
use settings::Settings;

#[derive(Parser)]
#[command(name = "yify", about = "Download the best-rated YIFY subtitle for a movie")]
struct Cli {
    /// Movie to search for (title or IMDb id)
    query: String,
    /// Subtitle language, exactly as listed on the site
    #[arg(short, long)]
    lang: Option<String>,
    /// Directory the subtitle is extracted into
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
    /// Resolve the download link without downloading it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(lang) = cli.lang {
        settings.language = lang;
    }

    let source = HttpSource::new(&settings)?;
    let opts = Options {
        dest: cli.dir,
        dry_run: cli.dry_run,
    };

    let outcome = pipeline::run(&source, &settings, &cli.query, &opts).await?;
    report(&outcome, &settings.language, &mut std::io::stdout().lock())?;

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

/// Print the user-facing result of a run.
fn report(outcome: &Outcome, language: &str, out: &mut impl Write) -> std::io::Result<()> {
    match outcome {
        Outcome::NoMovie => writeln!(out, "No movie found.")?,
        Outcome::Ambiguous(candidates) => {
            writeln!(out, "Found {} movies, please search by IMDb id:", candidates.len())?;
            for c in candidates {
                writeln!(out, "  {} ({})", c.title, c.identifier)?;
            }
        }
        Outcome::NoSubtitles { title } => {
            writeln!(out, "No {} subtitles found for {}.", language, title)?
        }
        Outcome::NoDownloadLink { page } => writeln!(out, "No download link on {}", page)?,
        Outcome::Resolved {
            subtitle,
            download_url,
        } => {
            writeln!(out, "Found subtitle {} ({} upvotes)", subtitle.link, subtitle.upvotes)?;
            writeln!(out, "Download {}", download_url)?;
        }
        Outcome::Downloaded {
            subtitle,
            download_url,
            files,
        } => {
            writeln!(out, "Found subtitle {} ({} upvotes)", subtitle.link, subtitle.upvotes)?;
            writeln!(out, "Download {}", download_url)?;
            for f in files {
                writeln!(out, "  -> {}", f.display())?;
            }
        }
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

// ── Tests ──
