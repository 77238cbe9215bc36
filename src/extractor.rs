//! Per-article extraction state machine.
//!
//! One extractor owns one page session and one URL, and always hands back an
//! [`ArticleRecord`] — on failure a partial one, keeping whatever fields were
//! populated before the failure. The stages run in order: navigate, title,
//! datetime, content, moodmeter. Title/datetime/content are independent
//! best-effort reads: a bounded wait that times out nulls the field and the
//! machine advances. Only session faults and hard moodmeter interaction
//! failures terminate extraction early.
//!
//! The session is released on every exit path; the extractor never leaks a
//! browser.

use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ExtractError, SessionError};
use crate::models::ArticleRecord;
use crate::moods::{self, MoodOutcome};
use crate::session::PageSession;

/// Article headline.
pub const ARTICLE_TITLE_XPATH: &str = "//h1[contains(@class,'post-single__title')]";
/// Article body container.
pub const ARTICLE_CONTENT_XPATH: &str = "//div[contains(@class,'post-single__content')]";
/// Publication timestamp in the article header.
pub const ARTICLE_DATETIME_XPATH: &str = "//div[contains(@class,'post-single__header')]//time";

/// Page-level wait for the content fields.
pub const PAGE_WAIT: Duration = Duration::from_secs(10);

/// Drives one session through the extraction stages for one URL.
pub struct ArticleExtractor {
    session: Box<dyn PageSession>,
    record: ArticleRecord,
}

impl ArticleExtractor {
    pub fn new(session: Box<dyn PageSession>, url: &str) -> Self {
        Self {
            session,
            record: ArticleRecord::new(url),
        }
    }

    /// Run extraction to completion, releasing the session unconditionally.
    ///
    /// Never fails: errors terminate the stage machine early and the partial
    /// record is returned for the caller to persist.
    #[instrument(level = "info", skip_all, fields(url = %self.record.url))]
    pub async fn extract(mut self) -> ArticleRecord {
        match self.run().await {
            Ok(()) => info!("Extraction finished"),
            Err(ExtractError::Interaction { ref selector }) => {
                error!(%selector, "Moodmeter interaction failed; keeping partial record");
            }
            Err(ExtractError::Session(ref e)) => {
                error!(error = %e, "Session failure; keeping partial record");
            }
        }
        self.session.close().await;
        self.record
    }

    async fn run(&mut self) -> Result<(), ExtractError> {
        let url = self.record.url.clone();
        info!("Navigating to article");
        self.session.navigate(&url).await?;

        self.record.title = self.field_text(ARTICLE_TITLE_XPATH).await?;
        self.record.datetime = self.field_text(ARTICLE_DATETIME_XPATH).await?;
        self.record.content = self.field_text(ARTICLE_CONTENT_XPATH).await?;

        self.record.moods = match moods::capture_moods(self.session.as_mut()).await? {
            MoodOutcome::Found(moods) => Some(moods),
            MoodOutcome::NotFound => None,
        };
        Ok(())
    }

    /// Best-effort field read: a wait timeout yields `None`, any other
    /// session error aborts extraction.
    async fn field_text(&mut self, selector: &str) -> Result<Option<String>, ExtractError> {
        match self.session.wait_for_element(selector, PAGE_WAIT).await {
            Ok(element) => {
                let text = self.session.read_text(&element).await?;
                debug!(selector, bytes = text.len(), "Fetched field");
                Ok(Some(text))
            }
            Err(SessionError::Timeout { .. }) => {
                warn!(selector, "Field wait timed out; leaving field null");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
