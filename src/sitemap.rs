//! Article-URL discovery over Rappler's sitemap hierarchy.
//!
//! Discovery is two-level: the root sitemap index enumerates child sitemaps,
//! and the children whose location contains `post-sitemap` enumerate article
//! URLs. Aggregation is bounded and deduplicated:
//!
//! - an exclusion set (exact URL match) is applied before anything counts
//!   toward the limit (e.g. the "latest articles" index page, which lives in
//!   the sitemaps but is not an article)
//! - URLs are deduplicated as they are inserted, so `max_count` bounds the
//!   number of *unique* URLs returned
//!
//! # Failure policy
//!
//! A failed child-sitemap fetch is logged and skipped; discovery continues
//! with the remaining children. A failed root fetch aborts discovery with an
//! empty result — there is nothing useful to do without the index.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Token marking a child sitemap as containing article (post) URLs.
const POST_SITEMAP_TOKEN: &str = "post-sitemap";

/// Discovers article URLs from a site's sitemap hierarchy.
pub struct SitemapCrawler {
    client: reqwest::Client,
}

impl SitemapCrawler {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    /// Discover up to `max_count` unique article URLs reachable from
    /// `root_url`, skipping exact matches in `exclude`.
    ///
    /// Never fails: every error path degrades to fewer (possibly zero) URLs,
    /// logged at the appropriate level.
    #[instrument(level = "info", skip_all, fields(root_url = %root_url))]
    pub async fn discover(
        &self,
        root_url: &str,
        max_count: Option<usize>,
        exclude: &HashSet<String>,
    ) -> Vec<String> {
        info!("Fetching post sitemaps from root index");
        let root_xml = match self.fetch(root_url).await {
            Ok(xml) => xml,
            Err(e) => {
                error!(error = %e, "Root sitemap fetch failed; aborting discovery");
                return Vec::new();
            }
        };

        let post_sitemaps = match parse_locs(&root_xml, b"sitemap") {
            Ok(locs) => locs
                .into_iter()
                .filter(|loc| loc.contains(POST_SITEMAP_TOKEN))
                .collect::<Vec<_>>(),
            Err(e) => {
                error!(error = %e, "Root sitemap parse failed; aborting discovery");
                return Vec::new();
            }
        };

        if post_sitemaps.is_empty() {
            error!("No post sitemaps found in root index");
            return Vec::new();
        }
        info!(count = post_sitemaps.len(), "Found post sitemaps");

        let base_host = Url::parse(root_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));

        let mut urls = Vec::new();
        let mut seen = HashSet::new();
        for sitemap in &post_sitemaps {
            info!(%sitemap, "Fetching article URLs");
            let xml = match self.fetch(sitemap).await {
                Ok(xml) => xml,
                Err(e) => {
                    warn!(%sitemap, error = %e, "Child sitemap fetch failed; skipping");
                    continue;
                }
            };
            let locs = match parse_locs(&xml, b"url") {
                Ok(locs) => locs,
                Err(e) => {
                    warn!(%sitemap, error = %e, "Child sitemap parse failed; skipping");
                    continue;
                }
            };
            debug!(%sitemap, count = locs.len(), "Parsed sitemap entries");

            let scoped = locs
                .into_iter()
                .filter(|loc| same_host(loc, base_host.as_deref()));
            if aggregate(&mut urls, &mut seen, scoped, max_count, exclude) {
                break;
            }
        }

        info!(count = urls.len(), "Discovered article URLs");
        urls
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.text().await
    }
}

impl Default for SitemapCrawler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold candidate URLs into `out`, deduplicating against `seen` and applying
/// the exclusion set, stopping exactly at `max_count` unique URLs.
///
/// Returns true once the limit is reached so the caller can stop fetching
/// further sitemaps.
pub fn aggregate(
    out: &mut Vec<String>,
    seen: &mut HashSet<String>,
    candidates: impl IntoIterator<Item = String>,
    max_count: Option<usize>,
    exclude: &HashSet<String>,
) -> bool {
    for url in candidates {
        if let Some(max) = max_count
            && out.len() >= max
        {
            return true;
        }
        if exclude.contains(&url) {
            debug!(%url, "Excluded URL");
            continue;
        }
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
    max_count.is_some_and(|max| out.len() >= max)
}

/// Extract the text of every `<loc>` element nested directly under `parent`
/// (`<sitemap>` for index documents, `<url>` for URL sets).
pub fn parse_locs(xml: &str, parent: &[u8]) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_parent = false;
    let mut in_loc = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == parent => in_parent = true,
            Event::Start(e) if in_parent && e.local_name().as_ref() == b"loc" => in_loc = true,
            Event::Text(t) if in_loc => {
                let text = t.unescape().map_err(quick_xml::Error::from)?;
                locs.push(text.trim().to_string());
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Event::End(e) if e.local_name().as_ref() == parent => in_parent = false,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(locs)
}

/// Whether `candidate` lives on the same host as the root sitemap. With no
/// parseable base host the check is skipped.
fn same_host(candidate: &str, base_host: Option<&str>) -> bool {
    let Some(base) = base_host else {
        return true;
    };
    Url::parse(candidate)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == base))
        .unwrap_or(false)
}
