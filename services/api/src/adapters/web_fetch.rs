//! services/api/src/adapters/web_fetch.rs
//!
//! This module contains the adapter for web-page ingestion. It implements
//! the `PageFetcher` port: fetch a URL and boil the page down to its
//! visible article text, with scripts, styles, and chrome stripped.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use studyforge_core::ports::{ExtractError, PageFetcher};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (compatible; Studyforge/1.0)";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PageFetcher` with a shared `reqwest`
/// client and readability-based article extraction.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    /// Creates a new `HttpPageFetcher` with its own HTTP client.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a fetcher sharing an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// A clone of the underlying HTTP client, for adapters that should
    /// share its connection pool and timeouts.
    pub fn client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

fn fetch_error(url: &str, reason: impl ToString) -> ExtractError {
    ExtractError::FetchError {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

//=========================================================================================
// `PageFetcher` Trait Implementation
//=========================================================================================

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_article_text(&self, url: &str) -> Result<String, ExtractError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(url, format!("HTTP {}", status)));
        }

        // Track the final URL after redirects; readability resolves
        // relative links against it.
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(url, e))?;

        let mut cursor = Cursor::new(body.as_ref());
        let product = readability::extractor::extract(&mut cursor, &final_url)
            .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?;

        Ok(product.text)
    }
}
