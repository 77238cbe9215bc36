//! Page-interaction capability traits.
//!
//! The extractor never talks to an automation technology directly; it drives
//! a [`PageSession`], the minimal surface the scraping state machines need:
//! navigate, bounded element waits, text reads, script-driven clicks, and
//! access to completed network exchanges. [`driver::WebDriverSession`]
//! implements it over the WebDriver REST protocol; tests substitute a
//! scripted in-memory session.
//!
//! Sessions are exclusively owned: the scheduler opens one per task via a
//! [`SessionFactory`] and the extractor closes it on every exit path.
//!
//! [`driver::WebDriverSession`]: crate::driver::WebDriverSession

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SessionError;

/// Opaque reference to an element located by a prior wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

/// One completed network exchange observed by the browser.
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    /// Request URL of the exchange.
    pub url: String,
    /// Response body, when the driver exposes it (may be empty).
    pub body: String,
}

/// A live browser page owned by exactly one extraction task.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url` in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Wait up to `timeout` for an element matching the XPath `selector`.
    ///
    /// Returns [`SessionError::Timeout`] if the element never appears;
    /// any other error is a session fault.
    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, SessionError>;

    /// Read the rendered text of an element.
    async fn read_text(&mut self, element: &ElementHandle) -> Result<String, SessionError>;

    /// Read the rendered text of every descendant of `element` matching a
    /// CSS `selector`, in DOM order.
    async fn read_text_all(
        &mut self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<String>, SessionError>;

    /// Click an element through injected script (bypasses overlay issues
    /// that defeat native clicks on the moodmeter widget).
    async fn click_via_script(&mut self, element: &ElementHandle) -> Result<(), SessionError>;

    /// Completed network exchanges observed so far, oldest first. Drivers
    /// without network-log support return an empty sequence.
    async fn intercepted_responses(&mut self) -> Result<Vec<InterceptedResponse>, SessionError>;

    /// Release the session. Must be safe to call on any exit path.
    async fn close(&mut self);
}

/// Opens fresh, isolated sessions for the scheduler's workers.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>, SessionError>;
}
