//! HTTP client using reqwest, with bounded exponential backoff

use std::time::Duration;

use reqwest::Client;

use super::{HttpError, HttpResponse, RetryPolicy};

pub struct HttpClient {
    client: Client,
    user_agent: String,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(user_agent: &str, retry: RetryPolicy) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_agent: user_agent.to_string(),
            retry,
        }
    }

    /// Issue a single GET request.
    ///
    /// 429 responses surface as `RateLimited` and 5xx responses as
    /// `ServerError` so callers can distinguish transient from permanent
    /// failures; all other statuses (404 included) return the response.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| HttpError::InvalidUrl {
            url: url.to_string(),
        })?;

        let mut request = self
            .client
            .get(parsed)
            .header("User-Agent", &self.user_agent);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::RequestFailed {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(HttpError::RateLimited);
        }
        if status >= 500 {
            return Err(HttpError::ServerError { code: status });
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let body = response.text().await.map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            body,
            headers,
        })
    }

    /// GET with retries per the configured `RetryPolicy`. Transient failures
    /// (timeouts, 5xx, rate limits) back off and retry; anything else is
    /// returned immediately.
    pub async fn get_with_retry(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut attempt = 1;
        loop {
            match self.get(url, headers).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_ms(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        delay_ms = delay,
                        "transient fetch failure, retrying: {error}"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(
            concat!("incite/", env!("CARGO_PKG_VERSION")),
            RetryPolicy::default(),
        )
    }
}
