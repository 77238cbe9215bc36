//! Command-line interface definitions for the Rappler scraper.
//!
//! All options arrive here as already-parsed values; the pipeline components
//! consume them directly.

use clap::Parser;

/// Command-line arguments for the Rappler article scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape up to 100 articles in parallel
/// rappler_scraper -m 100 -p
///
/// # Re-extract everything, ignoring cached results
/// rappler_scraper --ignore-cache -f article_urls.txt
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// URL of the root sitemap index
    #[arg(
        short = 's',
        long,
        default_value = "https://www.rappler.com/sitemap_index.xml"
    )]
    pub sitemap_url: String,

    /// Maximum number of articles to scrape
    #[arg(short = 'm', long)]
    pub max_articles: Option<usize>,

    /// Directory for the complete/incomplete record partitions
    #[arg(short = 'o', long, default_value = "article_data")]
    pub output_directory: String,

    /// Extract articles in parallel (one browser session per worker)
    #[arg(short = 'p', long)]
    pub parallel: bool,

    /// Worker-pool width; defaults to the number of processing units
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// File containing article URLs, one per line (skips sitemap discovery)
    #[arg(short = 'f', long)]
    pub urls_file: Option<String>,

    /// Save the discovered article URLs to a timestamped file
    #[arg(short = 'u', long)]
    pub save_urls: bool,

    /// Extract even when a cached record already exists
    #[arg(long)]
    pub ignore_cache: bool,

    /// URL to exclude from discovery (exact match, repeatable)
    #[arg(long = "exclude", value_name = "URL")]
    pub exclude: Vec<String>,

    /// WebDriver endpoint for browser sessions
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["rappler_scraper"]);
        assert_eq!(cli.sitemap_url, "https://www.rappler.com/sitemap_index.xml");
        assert_eq!(cli.output_directory, "article_data");
        assert!(cli.max_articles.is_none());
        assert!(!cli.parallel);
        assert!(!cli.ignore_cache);
        assert!(cli.exclude.is_empty());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from([
            "rappler_scraper",
            "-s",
            "https://example.com/sitemap.xml",
            "-m",
            "25",
            "-o",
            "/tmp/articles",
            "-p",
        ]);
        assert_eq!(cli.sitemap_url, "https://example.com/sitemap.xml");
        assert_eq!(cli.max_articles, Some(25));
        assert_eq!(cli.output_directory, "/tmp/articles");
        assert!(cli.parallel);
    }

    #[test]
    fn test_repeatable_exclude() {
        let cli = Cli::parse_from([
            "rappler_scraper",
            "--exclude",
            "https://www.rappler.com/latest/",
            "--exclude",
            "https://www.rappler.com/video/",
        ]);
        assert_eq!(cli.exclude.len(), 2);
    }
}
