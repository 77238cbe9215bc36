//! Scripted in-memory [`PageSession`] for unit tests.
//!
//! The scripted session models a page as a set of *available* selectors:
//! waiting for an available selector succeeds immediately, anything else
//! times out (no real sleeping). Clicks can reveal further selectors, which
//! is enough to script both moodmeter presentation states.
//!
//! Navigation and close events are recorded behind `Arc`s so clones handed
//! out by [`ScriptedFactory`] share one log with the test body.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::SessionError;
use crate::session::{ElementHandle, InterceptedResponse, PageSession, SessionFactory};

#[derive(Clone, Default)]
pub struct ScriptedSession {
    available: HashSet<String>,
    texts: HashMap<String, String>,
    children: HashMap<(String, String), Vec<String>>,
    reveal_on_click: HashMap<String, Vec<String>>,
    responses: Vec<InterceptedResponse>,
    fail_navigation: bool,
    pub clicks: Vec<String>,
    pub navigations: Arc<Mutex<Vec<String>>>,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `selector` immediately present on the page.
    pub fn with_element(mut self, selector: &str) -> Self {
        self.available.insert(selector.to_string());
        self
    }

    /// Make `selector` present with the given rendered text.
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.available.insert(selector.to_string());
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Script the descendant texts returned for (`parent`, `child`) reads.
    pub fn with_children(mut self, parent: &str, child: &str, texts: &[&str]) -> Self {
        self.children.insert(
            (parent.to_string(), child.to_string()),
            texts.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Clicking `clicked` makes `revealed` available afterwards.
    pub fn with_reveal_on_click(mut self, clicked: &str, revealed: &str) -> Self {
        self.reveal_on_click
            .entry(clicked.to_string())
            .or_default()
            .push(revealed.to_string());
        self
    }

    /// Add a canned network exchange.
    pub fn with_response(mut self, url: &str, body: &str) -> Self {
        self.responses.push(InterceptedResponse {
            url: url.to_string(),
            body: body.to_string(),
        });
        self
    }

    /// Make every navigation fail with a driver error.
    pub fn with_failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.navigations.lock().unwrap().push(url.to_string());
        if self.fail_navigation {
            return Err(SessionError::Driver {
                status: 500,
                message: "navigation failed".to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<ElementHandle, SessionError> {
        if self.available.contains(selector) {
            Ok(ElementHandle(selector.to_string()))
        } else {
            Err(SessionError::Timeout {
                selector: selector.to_string(),
            })
        }
    }

    async fn read_text(&mut self, element: &ElementHandle) -> Result<String, SessionError> {
        Ok(self.texts.get(&element.0).cloned().unwrap_or_default())
    }

    async fn read_text_all(
        &mut self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<String>, SessionError> {
        Ok(self
            .children
            .get(&(element.0.clone(), selector.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn click_via_script(&mut self, element: &ElementHandle) -> Result<(), SessionError> {
        self.clicks.push(element.0.clone());
        if let Some(revealed) = self.reveal_on_click.get(&element.0) {
            self.available.extend(revealed.iter().cloned());
        }
        Ok(())
    }

    async fn intercepted_responses(&mut self) -> Result<Vec<InterceptedResponse>, SessionError> {
        Ok(self.responses.clone())
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out clones of a scripted template session.
///
/// Clones share the template's navigation/close logs, so tests can assert
/// across every session the scheduler opened.
pub struct ScriptedFactory {
    template: ScriptedSession,
    pub opened: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(template: ScriptedSession) -> Self {
        Self {
            template,
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open(&self) -> Result<Box<dyn PageSession>, SessionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.template.clone()))
    }
}
