use std::time::Duration;

use {
    async_trait::async_trait,
    chatrelay_config::SinkConfig,
    chatrelay_pipeline::{Error, NotificationSink, Result},
    reqwest::{
        Client,
        header::{AUTHORIZATION, HeaderMap, HeaderValue},
    },
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

/// Publishes each chunk as one ntfy message: `POST {endpoint}` with the
/// chunk as the body and the `[Platform] user` title in the `Title` header.
pub struct NtfySink {
    client: Client,
    endpoint: String,
    token: Option<Secret<String>>,
    priority: Option<String>,
    tags: Option<String>,
}

impl NtfySink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::external("failed to build ntfy HTTP client", e))?;

        let tags = (!config.tags.is_empty()).then(|| config.tags.join(","));

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            token: config.token.clone(),
            priority: config.priority.clone(),
            tags,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self, title: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = header_value(title) {
            headers.insert("Title", value);
        }
        if let Some(priority) = &self.priority
            && let Ok(value) = HeaderValue::from_str(priority)
        {
            headers.insert("Priority", value);
        }
        if let Some(tags) = &self.tags
            && let Ok(value) = header_value(tags)
        {
            headers.insert("Tags", value);
        }
        if let Some(token) = &self.token
            && let Ok(mut value) =
                HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

/// Header value that keeps non-ASCII names intact (sent as raw UTF-8, which
/// ntfy decodes) but drops control characters that would be rejected.
fn header_value(text: &str) -> std::result::Result<HeaderValue, reqwest::header::InvalidHeaderValue> {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    HeaderValue::from_bytes(cleaned.trim().as_bytes())
}

#[async_trait]
impl NotificationSink for NtfySink {
    async fn send(&self, title: &str, body: &[u8]) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.headers(title))
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| Error::external("ntfy publish failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(endpoint = %self.endpoint, title, "published to ntfy");
        Ok(())
    }
}
