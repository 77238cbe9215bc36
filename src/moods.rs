//! Moodmeter capture: reading reader-reaction percentages from an article.
//!
//! The widget has two presentation states. When the browser profile has
//! already voted, a "see reactions" affordance is present and a single click
//! reveals the percentages. When it has not voted, the affordance never
//! appears; the only way to reveal the data is to cast a vote. Capture
//! therefore runs a small fallback chain:
//!
//! 1. wait (short timeout) for the see-reactions affordance; click it if
//!    present
//! 2. on timeout, emulate a vote: open the voting control, pick the `happy`
//!    option — a timeout *inside this sequence* means the page structure
//!    changed and is a hard [`ExtractError::Interaction`]
//! 3. read the revealed container, zipping `h4` labels with the percentage
//!    spans in DOM order; if that yields nothing, fall back to the vote-count
//!    API response captured from the network log
//!
//! Outcomes are data, not control flow: [`MoodOutcome::NotFound`] is the soft
//! "no data on this article" case, while hard failures propagate as errors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ExtractError, SessionError};
use crate::session::PageSession;

/// Revealed reactions container (labels + percentages).
pub const MOODS_CONTAINER_XPATH: &str = "//div[contains(@class,'xa3V2iPvKCrXH2KVimTv-g==')]";
/// "See reactions" affordance, present only when the widget already voted.
pub const SEE_MOODS_XPATH: &str = "//div[contains(@class,'AOhvJlN4Z5TsLqKZb1kSBw==')]";
/// Voting control that opens the mood picker.
pub const VOTE_DIV_XPATH: &str = "//div[contains(@class,'i1IMtjULF3BKu3lB0m1ilg==')]";
/// The `happy` option inside the mood picker.
pub const HAPPY_DIV_XPATH: &str = "//div[contains(@class,'mood-happy')]";

/// Substring identifying the vote-count API endpoint in intercepted traffic.
pub const VOTES_API_TOKEN: &str = "/api/v1/votes";

/// Short wait for the see-reactions check, keeping the fallback path cheap.
pub const MOOD_CHECK_WAIT: Duration = Duration::from_secs(3);
/// Wait for the reveal interactions and the container itself.
pub const MOOD_REVEAL_WAIT: Duration = Duration::from_secs(10);

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}\s*%").expect("valid percent regex"));

/// Result of one capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoodOutcome {
    /// Reaction data was revealed and read.
    Found(BTreeMap<String, String>),
    /// Both read paths came up empty; the record's `moods` stays null.
    NotFound,
}

/// Run the capture chain against the already-navigated article page.
#[instrument(level = "info", skip_all)]
pub async fn capture_moods(
    session: &mut (dyn PageSession + '_),
) -> Result<MoodOutcome, ExtractError> {
    debug!("Checking for existing reactions");
    match session
        .wait_for_element(SEE_MOODS_XPATH, MOOD_CHECK_WAIT)
        .await
    {
        Ok(affordance) => {
            session.click_via_script(&affordance).await?;
        }
        Err(SessionError::Timeout { .. }) => {
            warn!("No reactions affordance; emulating a vote");
            emulate_vote(session).await?;
        }
        Err(e) => return Err(e.into()),
    }

    read_moods(session).await
}

/// Two-step vote emulation forcing the widget into its revealed state.
///
/// A timeout here is not "moods unavailable" — the selectors stopped
/// matching, which is an extraction-level failure.
async fn emulate_vote(session: &mut (dyn PageSession + '_)) -> Result<(), ExtractError> {
    for selector in [VOTE_DIV_XPATH, HAPPY_DIV_XPATH] {
        match session.wait_for_element(selector, MOOD_REVEAL_WAIT).await {
            Ok(element) => session.click_via_script(&element).await?,
            Err(SessionError::Timeout { .. }) => {
                return Err(ExtractError::Interaction {
                    selector: selector.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read the revealed reaction data, preferring the DOM and falling back to
/// the intercepted vote-count API response.
async fn read_moods(session: &mut (dyn PageSession + '_)) -> Result<MoodOutcome, ExtractError> {
    match session
        .wait_for_element(MOODS_CONTAINER_XPATH, MOOD_REVEAL_WAIT)
        .await
    {
        Ok(container) => {
            let labels = session.read_text_all(&container, "h4").await?;
            let spans = session.read_text_all(&container, "span").await?;
            let moods = zip_moods(&labels, &spans);
            if !moods.is_empty() {
                info!(count = moods.len(), "Read moodmeter data from the page");
                return Ok(MoodOutcome::Found(moods));
            }
        }
        Err(SessionError::Timeout { .. }) => {
            debug!("Moods container never appeared; trying network capture");
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(moods) = moods_from_network(session).await? {
        info!(count = moods.len(), "Read moodmeter data from the votes API");
        return Ok(MoodOutcome::Found(moods));
    }

    warn!("Mood data not found");
    Ok(MoodOutcome::NotFound)
}

/// Pair the i-th label with the i-th percentage token, DOM order. Spans
/// without a percentage (counts, separators) are dropped before zipping.
pub fn zip_moods(labels: &[String], spans: &[String]) -> BTreeMap<String, String> {
    let percentages = spans
        .iter()
        .filter_map(|s| PERCENT_RE.find(s).map(|m| m.as_str().replace(' ', "")));
    labels
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .zip(percentages)
        .collect()
}

/// Scan intercepted responses for the vote-count payload.
async fn moods_from_network(
    session: &mut (dyn PageSession + '_),
) -> Result<Option<BTreeMap<String, String>>, ExtractError> {
    let responses = session.intercepted_responses().await?;
    // Latest response wins; the widget may refresh counts after a vote.
    for response in responses.iter().rev() {
        if !response.url.contains(VOTES_API_TOKEN) {
            continue;
        }
        if let Some(moods) = parse_votes_payload(&response.body) {
            return Ok(Some(moods));
        }
    }
    Ok(None)
}

/// Extract the mood-count mapping from a votes API body, normalizing label
/// keys to lowercase. Returns `None` for unparseable or empty payloads.
pub fn parse_votes_payload(body: &str) -> Option<BTreeMap<String, String>> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let counts = value.get("mood_count")?.as_object()?;
    if counts.is_empty() {
        return None;
    }
    let moods = counts
        .iter()
        .map(|(label, count)| {
            let count = match count {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (label.to_lowercase(), count)
        })
        .collect();
    Some(moods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSession;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_zip_moods_pairs_in_order() {
        let labels = strings(&["Happy", "Sad", "Angry"]);
        let spans = strings(&["64%", "ignore me", "20%", "16 %"]);
        let moods = zip_moods(&labels, &spans);
        assert_eq!(moods.get("Happy").unwrap(), "64%");
        assert_eq!(moods.get("Sad").unwrap(), "20%");
        assert_eq!(moods.get("Angry").unwrap(), "16%");
    }

    #[test]
    fn test_zip_moods_empty_inputs() {
        assert!(zip_moods(&[], &strings(&["64%"])).is_empty());
        assert!(zip_moods(&strings(&["Happy"]), &[]).is_empty());
    }

    #[test]
    fn test_parse_votes_payload_lowercases_keys() {
        let body = r#"{"mood_count":{"Happy":120,"Angry":"7"}}"#;
        let moods = parse_votes_payload(body).unwrap();
        assert_eq!(moods.get("happy").unwrap(), "120");
        assert_eq!(moods.get("angry").unwrap(), "7");
    }

    #[test]
    fn test_parse_votes_payload_rejects_garbage() {
        assert!(parse_votes_payload("not json").is_none());
        assert!(parse_votes_payload(r#"{"mood_count":{}}"#).is_none());
        assert!(parse_votes_payload(r#"{"other":1}"#).is_none());
    }

    #[tokio::test]
    async fn test_direct_read_skips_vote_emulation() {
        let mut session = ScriptedSession::new()
            .with_element(SEE_MOODS_XPATH)
            .with_element(MOODS_CONTAINER_XPATH)
            .with_children(MOODS_CONTAINER_XPATH, "h4", &["Happy", "Sad"])
            .with_children(MOODS_CONTAINER_XPATH, "span", &["70%", "30%"]);

        let outcome = capture_moods(&mut session).await.unwrap();
        let MoodOutcome::Found(moods) = outcome else {
            panic!("expected Found");
        };
        assert_eq!(moods.len(), 2);
        // Direct path taken: the vote control was never touched.
        assert_eq!(session.clicks, vec![SEE_MOODS_XPATH.to_string()]);
    }

    #[tokio::test]
    async fn test_vote_emulation_reveals_container() {
        let mut session = ScriptedSession::new()
            .with_element(VOTE_DIV_XPATH)
            .with_element(HAPPY_DIV_XPATH)
            .with_reveal_on_click(HAPPY_DIV_XPATH, MOODS_CONTAINER_XPATH)
            .with_children(MOODS_CONTAINER_XPATH, "h4", &["Happy"])
            .with_children(MOODS_CONTAINER_XPATH, "span", &["100%"]);

        let outcome = capture_moods(&mut session).await.unwrap();
        assert!(matches!(outcome, MoodOutcome::Found(_)));
        assert_eq!(
            session.clicks,
            vec![VOTE_DIV_XPATH.to_string(), HAPPY_DIV_XPATH.to_string()]
        );
    }

    #[tokio::test]
    async fn test_vote_emulation_timeout_is_hard_failure() {
        // Neither the affordance nor the vote control exists.
        let mut session = ScriptedSession::new();
        let err = capture_moods(&mut session).await.unwrap_err();
        assert!(matches!(err, ExtractError::Interaction { .. }));
    }

    #[tokio::test]
    async fn test_network_fallback_when_dom_read_is_empty() {
        let mut session = ScriptedSession::new()
            .with_element(SEE_MOODS_XPATH)
            .with_element(MOODS_CONTAINER_XPATH)
            .with_response("https://www.rappler.com/api/v1/votes?post=1", "ignored")
            .with_response(
                "https://www.rappler.com/api/v1/votes?post=2",
                r#"{"mood_count":{"Inspired":42}}"#,
            );

        let outcome = capture_moods(&mut session).await.unwrap();
        let MoodOutcome::Found(moods) = outcome else {
            panic!("expected Found");
        };
        assert_eq!(moods.get("inspired").unwrap(), "42");
    }

    #[tokio::test]
    async fn test_no_data_anywhere_is_not_found() {
        let mut session = ScriptedSession::new()
            .with_element(SEE_MOODS_XPATH)
            .with_response("https://www.rappler.com/other", "{}");

        let outcome = capture_moods(&mut session).await.unwrap();
        assert_eq!(outcome, MoodOutcome::NotFound);
    }
}
