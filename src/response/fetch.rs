use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::info;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where a response sheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSource {
    /// Already rendered HTML text.
    Html(String),
    /// A published response sheet to download once.
    Url(String),
}

impl ResponseSource {
    pub fn is_url(value: &str) -> bool {
        value.starts_with("http")
    }

    pub fn into_html(self, fetcher: &impl ResponseFetcher) -> Result<String> {
        match self {
            Self::Html(html) => Ok(html),
            Self::Url(url) => fetcher.fetch(&url),
        }
    }
}

pub trait ResponseFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Single blocking GET with a browser user agent. No retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }
}

impl ResponseFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        info!(url = %url, "fetching response sheet");

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("response sheet request rejected: {url}"))?;

        response
            .text()
            .with_context(|| format!("failed to read response body from {url}"))
    }
}
