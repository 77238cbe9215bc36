//! Content-addressed persistence and the dedup skip check.
//!
//! Records are stored as `{output_root}/{partition}/{url_hash}.json`, where
//! the partition is `complete` or `incomplete` by field population. The hash
//! key makes writes idempotent: two workers racing on the same URL overwrite
//! the same file with equivalent content, so the advisory [`DedupCache`]
//! check needs no locking.
//!
//! A [`RemoteStore`] is an optional collaborator (a document collection
//! indexed by `url_hash`). Only complete records go remote; incomplete ones
//! are logged and dropped from that path.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::models::ArticleRecord;

/// Storage partition, derived from record completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Complete,
    Incomplete,
}

impl Partition {
    pub fn for_record(record: &ArticleRecord) -> Self {
        if record.is_complete() {
            Partition::Complete
        } else {
            Partition::Incomplete
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Complete => "complete",
            Partition::Incomplete => "incomplete",
        }
    }
}

/// Optional remote document collection, queryable by `url_hash`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Existence-only lookup, limited to one match.
    async fn exists(&self, url_hash: &str) -> Result<bool, StoreError>;

    /// Insert one record document.
    async fn insert(&self, record: &ArticleRecord) -> Result<(), StoreError>;
}

/// Persists records under the content-addressed layout.
pub struct ResultStore {
    output_root: PathBuf,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl ResultStore {
    pub fn new(output_root: impl Into<PathBuf>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            output_root: output_root.into(),
            remote,
        }
    }

    /// Write `record` to its partition, returning the file path.
    ///
    /// Partition directories are created idempotently on every call, so the
    /// store needs no separate initialization step.
    #[instrument(level = "info", skip_all, fields(url_hash = %record.url_hash))]
    pub async fn persist(&self, record: &ArticleRecord) -> Result<PathBuf, StoreError> {
        let partition = Partition::for_record(record);
        let dir = self.output_root.join(partition.as_str());
        fs::create_dir_all(&dir).await.map_err(|e| StoreError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let path = dir.join(format!("{}.json", record.url_hash));
        let json = serde_json::to_string(record)?;
        fs::write(&path, json).await.map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), partition = partition.as_str(), "Saved article record");

        if let Some(ref remote) = self.remote {
            if partition == Partition::Complete {
                if let Err(e) = remote.insert(record).await {
                    warn!(error = %e, "Remote insert failed; local copy is authoritative");
                }
            } else {
                info!("Record incomplete; skipping remote insert");
            }
        }

        Ok(path)
    }
}

/// Advisory skip check over the local partitions and the optional remote.
///
/// Check-then-act without mutual exclusion: concurrent workers may both pass
/// for the same URL, which is fine because the eventual writes are
/// idempotent and keyed by the same hash.
pub struct DedupCache {
    output_root: PathBuf,
    remote: Option<Arc<dyn RemoteStore>>,
    ignore_cache: bool,
}

impl DedupCache {
    pub fn new(
        output_root: impl Into<PathBuf>,
        remote: Option<Arc<dyn RemoteStore>>,
        ignore_cache: bool,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            remote,
            ignore_cache,
        }
    }

    /// Whether extraction for `url_hash` should be skipped.
    ///
    /// With `ignore_cache` set the check is bypassed entirely and extraction
    /// always proceeds (existing files are overwritten on persist, never
    /// deleted up front). Remote lookup errors are logged and treated as a
    /// miss so a flaky remote cannot stall a run.
    pub async fn should_skip(&self, url_hash: &str) -> bool {
        if self.ignore_cache {
            return false;
        }
        for partition in [Partition::Complete, Partition::Incomplete] {
            let path = self
                .output_root
                .join(partition.as_str())
                .join(format!("{url_hash}.json"));
            if fs::try_exists(&path).await.unwrap_or(false) {
                debug!(%url_hash, partition = partition.as_str(), "Cache hit");
                return true;
            }
        }
        if let Some(ref remote) = self.remote {
            match remote.exists(url_hash).await {
                Ok(true) => {
                    debug!(%url_hash, "Remote cache hit");
                    return true;
                }
                Ok(false) => {}
                Err(e) => warn!(%url_hash, error = %e, "Remote existence check failed"),
            }
        }
        false
    }

    /// Drop URLs whose records already exist, preserving order.
    #[instrument(level = "info", skip_all, fields(candidates = urls.len()))]
    pub async fn filter_new(&self, urls: Vec<String>) -> Vec<String> {
        let mut fresh = Vec::with_capacity(urls.len());
        let mut skipped = 0usize;
        for url in urls {
            if self.should_skip(&crate::models::url_hash(&url)).await {
                skipped += 1;
            } else {
                fresh.push(url);
            }
        }
        info!(kept = fresh.len(), skipped, "Applied dedup cache filter");
        fresh
    }
}
