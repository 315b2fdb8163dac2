use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, ORIGIN, PRAGMA,
    REFERER, USER_AGENT,
};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://tiktokio.com/api/v1/tk/html";
pub const DEFAULT_PREFIX: &str = "tiktokio.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/127.0.0.0 Mobile Safari/537.36";

/// Settings for the outbound call to the TikTokio HTML endpoint.
#[derive(Clone, Debug)]
pub struct ScraperConfig {
    pub endpoint: Url,
    /// Sent as `prefix` next to the reference in the request body.
    pub prefix: String,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).unwrap(),
            prefix: DEFAULT_PREFIX.to_string(),
            headers: default_headers(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Mimics the mobile browser request the TikTokio site itself sends.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ms-MY"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://tiktokio.com"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(REFERER, HeaderValue::from_static("https://tiktokio.com/"));
    headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
    headers
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_address: String,
    pub environment: String,
    pub scraper: ScraperConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut scraper = ScraperConfig::default();
        if let Ok(endpoint) = env::var("TIKTOKIO_ENDPOINT") {
            scraper.endpoint = Url::parse(&endpoint)
                .with_context(|| format!("TIKTOKIO_ENDPOINT is not a valid URL: {endpoint}"))?;
        }
        if let Ok(prefix) = env::var("TIKTOKIO_PREFIX") {
            scraper.prefix = prefix;
        }
        if let Ok(timeout) = env::var("UPSTREAM_TIMEOUT_MS") {
            let millis: u64 = timeout
                .parse()
                .with_context(|| format!("UPSTREAM_TIMEOUT_MS must be milliseconds: {timeout}"))?;
            scraper.timeout = Duration::from_millis(millis);
        }

        Ok(Self {
            bind_address,
            environment,
            scraper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tiktokio_site() {
        let config = ScraperConfig::default();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.prefix, "tiktokio.com");
        assert_eq!(config.timeout, Duration::from_millis(15_000));
        assert_eq!(config.headers[CONTENT_TYPE], "application/json");
        assert_eq!(config.headers[REFERER], "https://tiktokio.com/");
        assert_eq!(config.headers[ORIGIN], "https://tiktokio.com");
        assert!(config.headers[USER_AGENT]
            .to_str()
            .unwrap()
            .contains("Mobile Safari"));
    }
}
