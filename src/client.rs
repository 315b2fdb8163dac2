use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::ScraperConfig;
use crate::extract::extract_from_html;
use crate::models::ExtractionResult;

const MAX_ERROR_BODY_LEN: usize = 200;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("ConnectError: {0}")]
    Connection(String),
    #[error("upstream responded with status {status}")]
    UpstreamHttp { status: StatusCode, body: String },
    #[error("TimeoutError: {0}")]
    Timeout(String),
    #[error("NoResponse: {0}")]
    NoResponse(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout(e.to_string())
        } else if e.is_connect() {
            ScrapeError::Connection(e.to_string())
        } else if e.is_request() || e.is_body() {
            ScrapeError::NoResponse(e.to_string())
        } else {
            ScrapeError::Other(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct HtmlRequest<'a> {
    vid: &'a str,
    prefix: &'a str,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Fetches the TikTokio HTML fragment for a reference and extracts its media.
#[derive(Clone, Debug)]
pub struct TikTokioClient {
    http: Client,
    config: ScraperConfig,
}

impl TikTokioClient {
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(config.headers.clone())
            .build()
            .map_err(|e| ScrapeError::Other(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub async fn extract(&self, reference: &str) -> Result<ExtractionResult, ScrapeError> {
        let html = self.fetch_html(reference).await?;
        Ok(extract_from_html(&html))
    }

    async fn fetch_html(&self, reference: &str) -> Result<String, ScrapeError> {
        let body = HtmlRequest {
            vid: reference,
            prefix: &self.config.prefix,
        };

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        // Non-2xx bodies are error pages, never parsed as results.
        let status = response.status();
        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(%status, "failed to read upstream error body: {}", e);
                    String::new()
                }
            };
            return Err(ScrapeError::UpstreamHttp {
                status,
                body: truncate(text.trim(), MAX_ERROR_BODY_LEN),
            });
        }

        Ok(response.text().await?)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
