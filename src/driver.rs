//! WebDriver-protocol implementation of the page-interaction capability.
//!
//! A thin HTTP client against a chromedriver-compatible endpoint, speaking
//! the W3C WebDriver REST protocol. Sessions are created headless with
//! extensions and image loading disabled — article text and the moodmeter
//! widget need neither, and skipping images keeps workers cheap.
//!
//! `wait_for_element` emulates the classic explicit-wait loop: poll the
//! find-element endpoint every 500 ms until the element appears or the
//! caller's timeout expires. Network interception drains the Selenium
//! performance log when the driver exposes it; drivers without log support
//! simply yield no intercepted responses.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::session::{ElementHandle, InterceptedResponse, PageSession, SessionFactory};

/// W3C element identifier key in WebDriver payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Opens isolated headless-browser sessions against one WebDriver endpoint.
pub struct WebDriverFactory {
    endpoint: String,
    client: reqwest::Client,
}

impl WebDriverFactory {
    pub fn new(endpoint: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--disable-extensions", "--log-level=3"],
                        "prefs": {"profile.managed_default_content_settings.images": 2}
                    },
                    "goog:loggingPrefs": {"performance": "ALL"}
                }
            }
        });

        let value = post_json(
            &self.client,
            &format!("{}/session", self.endpoint),
            &capabilities,
        )
        .await?;
        let session_id = value
            .pointer("/value/sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::Protocol("missing sessionId in response".to_string()))?;

        info!(session_id, "Opened WebDriver session");
        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!("{}/session/{}", self.endpoint, session_id),
        }))
    }
}

/// One live WebDriver session.
pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
}

impl WebDriverSession {
    /// Single find-element probe; `Ok(None)` when the element is not (yet)
    /// in the DOM.
    async fn find_element(&self, selector: &str) -> Result<Option<String>, SessionError> {
        let body = json!({ "using": "xpath", "value": selector });
        match post_json(&self.client, &format!("{}/element", self.base), &body).await {
            Ok(value) => {
                let id = value
                    .pointer("/value")
                    .and_then(|v| v.get(ELEMENT_KEY))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        SessionError::Protocol("missing element id in response".to_string())
                    })?;
                Ok(Some(id.to_string()))
            }
            // "no such element" comes back as a 404.
            Err(SessionError::Driver { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn element_text(&self, element_id: &str) -> Result<String, SessionError> {
        let value = get_json(
            &self.client,
            &format!("{}/element/{}/text", self.base, element_id),
        )
        .await?;
        value
            .pointer("/value")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SessionError::Protocol("missing text in response".to_string()))
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        post_json(
            &self.client,
            &format!("{}/url", self.base),
            &json!({ "url": url }),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(id) = self.find_element(selector).await? {
                return Ok(ElementHandle(id));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout {
                    selector: selector.to_string(),
                });
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn read_text(&mut self, element: &ElementHandle) -> Result<String, SessionError> {
        self.element_text(&element.0).await
    }

    async fn read_text_all(
        &mut self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<String>, SessionError> {
        let body = json!({ "using": "css selector", "value": selector });
        let value = post_json(
            &self.client,
            &format!("{}/element/{}/elements", self.base, element.0),
            &body,
        )
        .await?;
        let ids: Vec<String> = value
            .pointer("/value")
            .and_then(Value::as_array)
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|e| e.get(ELEMENT_KEY).and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut texts = Vec::with_capacity(ids.len());
        for id in &ids {
            texts.push(self.element_text(id).await?);
        }
        Ok(texts)
    }

    async fn click_via_script(&mut self, element: &ElementHandle) -> Result<(), SessionError> {
        let body = json!({
            "script": "arguments[0].click();",
            "args": [{ ELEMENT_KEY: element.0 }]
        });
        post_json(&self.client, &format!("{}/execute/sync", self.base), &body).await?;
        Ok(())
    }

    async fn intercepted_responses(&mut self) -> Result<Vec<InterceptedResponse>, SessionError> {
        // Selenium extension endpoint; not every driver implements it.
        let body = json!({ "type": "performance" });
        let value = match post_json(&self.client, &format!("{}/se/log", self.base), &body).await {
            Ok(value) => value,
            Err(SessionError::Driver { status, .. }) if status == 404 || status == 405 => {
                debug!("Driver does not expose the performance log");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let entries = value
            .pointer("/value")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut responses = Vec::new();
        for entry in &entries {
            let Some(message) = entry.get("message").and_then(Value::as_str) else {
                continue;
            };
            let Ok(parsed) = serde_json::from_str::<Value>(message) else {
                continue;
            };
            if parsed.pointer("/message/method").and_then(Value::as_str)
                != Some("Network.responseReceived")
            {
                continue;
            }
            let Some(url) = parsed
                .pointer("/message/params/response/url")
                .and_then(Value::as_str)
            else {
                continue;
            };
            // The log carries response metadata only; bodies are present
            // only when the driver chooses to embed them.
            let body = parsed
                .pointer("/message/params/response/body")
                .and_then(Value::as_str)
                .unwrap_or_default();
            responses.push(InterceptedResponse {
                url: url.to_string(),
                body: body.to_string(),
            });
        }
        Ok(responses)
    }

    async fn close(&mut self) {
        if let Err(e) = self.client.delete(&self.base).send().await {
            debug!(error = %e, "Session delete failed (already gone?)");
        }
    }
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<Value, SessionError> {
    let response = client.post(url).json(body).send().await?;
    decode(response).await
}

async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, SessionError> {
    let response = client.get(url).send().await?;
    decode(response).await
}

async fn decode(response: reqwest::Response) -> Result<Value, SessionError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        // W3C error payloads nest the human-readable part under value.message.
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| {
                v.pointer("/value/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(text);
        return Err(SessionError::Driver {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(&text).map_err(|e| SessionError::Protocol(e.to_string()))
}
