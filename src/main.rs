//! # Rappler Scraper
//!
//! Discovers article URLs from Rappler's sitemap hierarchy and extracts
//! structured per-article data — title, publication time, body text, and
//! moodmeter reaction percentages — persisting each result as a JSON
//! document keyed by a hash of the article URL.
//!
//! ## Usage
//!
//! ```sh
//! rappler_scraper -m 100 -o ./article_data -p
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: Collect article URLs from the post sitemaps (or a
//!    saved URL file)
//! 2. **Dedup**: Drop URLs whose records already exist locally or remotely
//! 3. **Extraction**: Fan surviving URLs out across isolated browser
//!    sessions; each worker runs the per-article state machine
//! 4. **Persistence**: Write each record under the `complete`/`incomplete`
//!    partition named by its URL hash

use chrono::Utc;
use clap::Parser;
use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod driver;
mod error;
mod extractor;
mod models;
mod moods;
mod scheduler;
mod session;
mod sitemap;
mod store;
#[cfg(test)]
mod testing;

use cli::Cli;
use driver::WebDriverFactory;
use sitemap::SitemapCrawler;
use store::{DedupCache, ResultStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("rappler_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Collect article URLs ----
    let article_urls = if let Some(ref path) = args.urls_file {
        let contents = tokio::fs::read_to_string(path).await?;
        let urls: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        info!(count = urls.len(), %path, "Loaded article URLs from file");
        urls
    } else {
        let exclude: HashSet<String> = args.exclude.iter().cloned().collect();
        SitemapCrawler::new()
            .discover(&args.sitemap_url, args.max_articles, &exclude)
            .await
    };

    if args.save_urls {
        let filename = format!("article_urls_{}.txt", Utc::now().timestamp());
        if let Err(e) = tokio::fs::write(&filename, article_urls.join("\n")).await {
            error!(path = %filename, error = %e, "Failed to save URL list");
        } else {
            info!(path = %filename, count = article_urls.len(), "Saved article URLs");
        }
    }

    if article_urls.is_empty() {
        warn!("No article URLs to scrape");
        return Ok(());
    }

    // ---- Dedup filter ----
    let cache = DedupCache::new(&args.output_directory, None, args.ignore_cache);
    let fresh_urls = cache.filter_new(article_urls).await;
    if fresh_urls.is_empty() {
        info!("Every URL already has a cached record; nothing to do");
        return Ok(());
    }

    // ---- Fan out extraction ----
    let concurrency = if args.parallel {
        args.concurrency
            .unwrap_or_else(scheduler::default_concurrency)
    } else {
        1
    };
    info!(
        count = fresh_urls.len(),
        concurrency, "Starting article extraction"
    );

    let factory = Arc::new(WebDriverFactory::new(&args.webdriver_url));
    let store = Arc::new(ResultStore::new(&args.output_directory, None));
    scheduler::run_all(fresh_urls, factory, store, concurrency).await;

    let elapsed = start_time.elapsed();
    info!(secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}
