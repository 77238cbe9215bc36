//! Bounded fan-out of extraction tasks.
//!
//! Each surviving URL becomes one task: open a fresh session from the
//! factory, run the extractor, persist the record. Tasks are independent —
//! a worker's failure is logged and affects nothing else in flight — and no
//! session or record is ever shared between tasks. Completion order is
//! unspecified.
//!
//! Pool width is typically the machine's available parallelism; width 1
//! gives the sequential mode.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::extractor::ArticleExtractor;
use crate::session::SessionFactory;
use crate::store::ResultStore;

/// Default pool width: one worker per available processing unit.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Extract and persist every URL, at most `concurrency` in flight.
#[instrument(level = "info", skip_all, fields(urls = urls.len(), concurrency))]
pub async fn run_all(
    urls: Vec<String>,
    factory: Arc<dyn SessionFactory>,
    store: Arc<ResultStore>,
    concurrency: usize,
) {
    let total = urls.len();
    info!("Dispatching extraction tasks");

    let results: Vec<Option<bool>> = stream::iter(urls)
        .map(|url| {
            let factory = Arc::clone(&factory);
            let store = Arc::clone(&store);
            async move {
                let session = match factory.open().await {
                    Ok(session) => session,
                    Err(e) => {
                        error!(%url, error = %e, "Failed to open session; skipping URL");
                        return None;
                    }
                };
                let record = ArticleExtractor::new(session, &url).extract().await;
                let complete = record.is_complete();
                match store.persist(&record).await {
                    Ok(_) => Some(complete),
                    Err(e) => {
                        error!(%url, error = %e, "Failed to persist record");
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let persisted = results.iter().filter(|r| r.is_some()).count();
    let complete = results.iter().filter(|r| **r == Some(true)).count();
    info!(
        total,
        persisted,
        complete,
        incomplete = persisted - complete,
        failed = total - persisted,
        "Extraction run finished"
    );
}
