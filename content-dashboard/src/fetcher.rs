use crate::types::{DashboardError, HttpConfig, Result};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Thin wrapper over a configured `reqwest` client.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: HttpConfig,
}

/// Status and body of a completed request.
#[derive(Debug)]
pub struct FetchedBody {
    pub status: StatusCode,
    pub body: String,
    pub response_time_ms: u64,
}

impl Fetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(DashboardError::Http)?;

        Ok(Self { client, config })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GET `url` and read the whole body, whatever the status code.
    pub async fn get_text(&self, url: Url, headers: &[(&str, &str)]) -> Result<FetchedBody> {
        let start_time = Instant::now();
        debug!("GET {}", redact_query(&url));

        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let response_time_ms = start_time.elapsed().as_millis() as u64;

        debug!("GET {} -> {} in {}ms ({} bytes)", redact_query(&url), status, response_time_ms, body.len());

        Ok(FetchedBody {
            status,
            body,
            response_time_ms,
        })
    }
}

/// `HTTP 401: Unauthorized`
pub fn describe_status(status: StatusCode) -> String {
    format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown"))
}

fn redact_query(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
