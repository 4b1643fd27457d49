//! HTTP client wrapper for provider JSON APIs with retry logic.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::RequestAuth;
use crate::error::{GeocodeError, Result};
use crate::provider::Provider;

/// HTTP client for provider search endpoints.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(request_timeout: Duration, max_retries: u32, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            max_retries,
            request_timeout,
        })
    }

    /// GET `url` with the given query parameters and decode a JSON body.
    ///
    /// Non-success statuses, network errors and undecodable bodies are all
    /// reported as [`GeocodeError::Transport`] for `provider`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: Provider,
        url: &str,
        query: &[(&str, &str)],
        auth: &dyn RequestAuth,
    ) -> Result<T> {
        let mut params: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        auth.sign_query(&mut params);

        let req = self.client.get(url).query(&params);
        let resp = self
            .execute_with_retry(req)
            .await
            .map_err(|e| GeocodeError::transport(provider, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeocodeError::transport(
                provider,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(300).collect::<String>()
                ),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| GeocodeError::transport(provider, format!("reading response body: {e}")))?;
        debug!(%provider, bytes = body.len(), "provider response received");

        serde_json::from_str(&body)
            .map_err(|e| GeocodeError::transport(provider, format!("parsing response: {e}")))
    }

    /// Execute a request with exponential backoff retry.
    ///
    /// Only timeouts and connection failures are retried.
    async fn execute_with_retry(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * (1 << (attempt - 1)));
                tokio::time::sleep(backoff).await;
            }

            match request.try_clone() {
                Some(cloned) => match cloned.send().await {
                    Ok(resp) => return Ok(resp),
                    Err(e) if e.is_timeout() || e.is_connect() => {
                        debug!(attempt, error = %e, "transient request failure");
                        last_err = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                },
                None => return request.send().await,
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => request.send().await,
        }
    }

    /// Getter for the timeout duration.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
