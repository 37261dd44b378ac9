//! Sessions API client used by the tracker

use crate::config::TrackerConfig;
use crate::error::{CoreError, Result};
use crate::model::{format_timestamp, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// The two calls the tracker makes against the backend
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create_session(
        &self,
        user_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Session>;

    async fn update_session(&self, session_id: &str, end_time: DateTime<Utc>) -> Result<Session>;
}

/// [`SessionApi`] over HTTP
pub struct HttpSessionApi {
    client: reqwest::Client,
    sessions_url: String,
    api_key: Option<String>,
}

impl HttpSessionApi {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("meetime/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpSessionApi {
            client,
            sessions_url: format!("{}/sessions", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Session> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Network(format!("HTTP {}: {}", status, body)));
        }

        Ok(response.json::<Session>().await?)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn create_session(
        &self,
        user_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Session> {
        let body = serde_json::json!({
            "user_id": user_id,
            "start_time": format_timestamp(&start_time),
            "end_time": format_timestamp(&end_time),
        });
        self.send(self.client.post(&self.sessions_url).json(&body)).await
    }

    async fn update_session(&self, session_id: &str, end_time: DateTime<Utc>) -> Result<Session> {
        let body = serde_json::json!({ "end_time": format_timestamp(&end_time) });
        let url = format!("{}/{}", self.sessions_url, session_id);
        self.send(self.client.put(url).json(&body)).await
    }
}
