//! Activity signal: is a Meet tab open right now?

use crate::config::TrackerConfig;
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

/// Source of the boolean signal sampled on every tick
#[async_trait]
pub trait ActivityProbe: Send + Sync {
    async fn is_active(&self) -> Result<bool>;
}

/// Compiled tab URL pattern
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: Regex,
}

impl UrlMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| CoreError::Config(format!("Invalid url_pattern '{}': {}", pattern, e)))?;
        Ok(UrlMatcher { pattern })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

/// One entry of the DevTools `/json/list` response
#[derive(Debug, Clone, Deserialize)]
pub struct DevToolsTarget {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

/// Number of page targets whose URL matches
pub fn count_matching_tabs(targets: &[DevToolsTarget], matcher: &UrlMatcher) -> usize {
    targets
        .iter()
        .filter(|t| t.kind == "page" && matcher.matches(&t.url))
        .count()
}

/// Lists browser tabs through a Chromium remote debugging endpoint
/// (browser started with `--remote-debugging-port`).
pub struct DevToolsProbe {
    client: reqwest::Client,
    list_url: String,
    matcher: UrlMatcher,
}

impl DevToolsProbe {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(DevToolsProbe {
            client,
            list_url: format!("{}/json/list", config.devtools_url.trim_end_matches('/')),
            matcher: UrlMatcher::new(&config.url_pattern)?,
        })
    }
}

#[async_trait]
impl ActivityProbe for DevToolsProbe {
    async fn is_active(&self) -> Result<bool> {
        let targets: Vec<DevToolsTarget> = self
            .client
            .get(&self.list_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let meet_tabs = count_matching_tabs(&targets, &self.matcher);
        tracing::debug!("Found {} Google Meet tabs", meet_tabs);
        Ok(meet_tabs > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_matcher() -> UrlMatcher {
        UrlMatcher::new(&TrackerConfig::default().url_pattern).unwrap()
    }

    #[test]
    fn test_default_pattern() {
        let matcher = default_matcher();
        assert!(matcher.matches("https://meet.google.com/abc-defg-hij"));
        assert!(matcher.matches("https://meet.google.com/"));
        assert!(!matcher.matches("http://meet.google.com/abc"));
        assert!(!matcher.matches("https://calendar.google.com/meet.google.com/"));
        assert!(!matcher.matches("https://meetxgoogle.com/abc"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        assert!(matches!(UrlMatcher::new("("), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_only_page_targets_count() {
        let json = r#"[
            {"id": "1", "type": "page", "title": "Meet", "url": "https://meet.google.com/abc-defg-hij"},
            {"id": "2", "type": "service_worker", "url": "https://meet.google.com/sw.js"},
            {"id": "3", "type": "page", "url": "https://example.com/"},
            {"id": "4", "type": "iframe"}
        ]"#;
        let targets: Vec<DevToolsTarget> = serde_json::from_str(json).unwrap();
        assert_eq!(count_matching_tabs(&targets, &default_matcher()), 1);
    }

    #[test]
    fn test_probe_builds_list_url() {
        let config = TrackerConfig {
            devtools_url: "http://127.0.0.1:9222/".into(),
            ..TrackerConfig::default()
        };
        let probe = DevToolsProbe::new(&config).unwrap();
        assert_eq!(probe.list_url, "http://127.0.0.1:9222/json/list");
    }
}
