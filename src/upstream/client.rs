use crate::state::StateRecord;
use crate::upstream::StateSource;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Home Assistant connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct HomeAssistantConfig {
    /// Base URL, e.g. "http://homeassistant.local:8123"
    #[serde(default = "default_url")]
    pub url: String,

    /// Long-lived access token
    #[serde(default)]
    pub token: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP client for the Home Assistant REST API.
///
/// Authenticates every request with the configured bearer token.
pub struct HomeAssistantClient {
    token: String,
    http_client: Client,
    base_url: Url,
}

impl HomeAssistantClient {
    pub fn new(config: &HomeAssistantConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("whereabouts/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .with_context(|| format!("Invalid Home Assistant URL: {}", config.url))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid Home Assistant URL: {}", config.url);
        }

        Ok(Self {
            token: config.token.clone(),
            http_client,
            base_url,
        })
    }

    /// Base URL requests are issued against, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl StateSource for HomeAssistantClient {
    async fn fetch_current_state(&self, entity_id: &str) -> Result<StateRecord> {
        let url = self.endpoint(&["api", "states", entity_id]);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send state request")?;

        check_response_status(&response)?;
        response
            .json::<StateRecord>()
            .await
            .context("Failed to parse state response")
    }

    async fn fetch_history(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        significant_only: bool,
    ) -> Result<Vec<Vec<StateRecord>>> {
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let url = self.endpoint(&["api", "history", "period", &start]);

        let mut query = vec![
            ("filter_entity_id", entity_id.to_string()),
            ("end_time", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ];
        if significant_only {
            query.push(("significant_changes_only", String::new()));
        }

        let response = self
            .http_client
            .get(url)
            .query(&query)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to send history request")?;

        check_response_status(&response)?;
        response
            .json::<Vec<Vec<StateRecord>>>()
            .await
            .context("Failed to parse history response")
    }

    async fn ping(&self) -> Result<()> {
        // Trailing empty segment keeps the slash: /api/
        let url = self.endpoint(&["api", ""]);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to reach Home Assistant")?;

        check_response_status(&response)
    }
}

/// Map non-2xx responses to descriptive errors.
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(anyhow!("Home Assistant auth error: token invalid")),
        StatusCode::NOT_FOUND => Err(anyhow!("Home Assistant entity not found")),
        s if !s.is_success() => Err(anyhow!("Home Assistant API error: {}", s)),
        _ => Ok(()),
    }
}
