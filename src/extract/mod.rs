use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scraper::Html;
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use url::Url;

use crate::config::FetcherConfig;

pub mod sites;

pub use sites::{SelectorStrategy, SiteRegistry, SiteStrategy};

/// Which page node a parse failure refers to. A missing node means the site
/// changed layout, which warrants a different operator response than a
/// network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Title,
    Price,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Title => write!(f, "title"),
            MissingField::Price => write!(f, "price"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unsupported site: {host}")]
    UnsupportedSite { host: String },

    #[error("fetch failed: {cause}")]
    Fetch { cause: String },

    #[error("page parse failed: missing {missing}")]
    Parse { missing: MissingField },
}

impl ExtractError {
    /// Transient errors are retried next cycle without operator attention.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Fetch { .. })
    }
}

/// Successful extraction of a product page.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub title: String,
    pub price: f64,
}

/// Fetches product pages and extracts (title, price) using the site strategy
/// registered for the URL host. Never touches tracked-item state.
pub struct PriceExtractor {
    client: reqwest::Client,
    registry: SiteRegistry,
    config: FetcherConfig,
}

impl PriceExtractor {
    pub fn new(config: FetcherConfig) -> crate::Result<Self> {
        Self::with_registry(config, SiteRegistry::with_default_sites())
    }

    pub fn with_registry(config: FetcherConfig, registry: SiteRegistry) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            registry,
            config,
        })
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Check that a strategy exists for the URL host without fetching
    /// anything. Used to reject untrackable URLs synchronously.
    pub fn supports(&self, url: &str) -> Result<(), ExtractError> {
        let host = host_of(url)?;
        if self.registry.supports(&host) {
            Ok(())
        } else {
            Err(ExtractError::UnsupportedSite { host })
        }
    }

    pub async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let host = host_of(url)?;
        let strategy = self
            .registry
            .strategy_for(&host)
            .ok_or(ExtractError::UnsupportedSite { host })?;

        let body = self.fetch(url).await?;
        let document = Html::parse_document(&body);

        let title = strategy
            .extract_title(&document)
            .ok_or(ExtractError::Parse {
                missing: MissingField::Title,
            })?;

        let price_text = strategy
            .extract_price_text(&document)
            .ok_or(ExtractError::Parse {
                missing: MissingField::Price,
            })?;

        let price = normalize_price(&price_text).ok_or(ExtractError::Parse {
            missing: MissingField::Price,
        })?;

        tracing::debug!(url, %price, "extracted product page");
        Ok(Extraction { title, price })
    }

    async fn fetch(&self, url: &str) -> Result<String, ExtractError> {
        let backoff = ExponentialBackoff::from_millis(self.config.retry_delay_ms.max(1))
            .max_delay(Duration::from_secs(30))
            .take(self.config.retry_attempts as usize);

        Retry::spawn(backoff, || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ExtractError::Fetch {
                    cause: e.to_string(),
                })?;

            let response = response
                .error_for_status()
                .map_err(|e| ExtractError::Fetch {
                    cause: e.to_string(),
                })?;

            response.text().await.map_err(|e| ExtractError::Fetch {
                cause: e.to_string(),
            })
        })
        .await
    }
}

fn host_of(url: &str) -> Result<String, ExtractError> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .ok_or_else(|| ExtractError::UnsupportedSite {
            host: url.to_string(),
        })
}

/// Normalize raw price text (currency symbols, thousands separators) to a
/// numeric magnitude. Returns None when no parseable number is present.
pub fn normalize_price(text: &str) -> Option<f64> {
    let re = Regex::new(r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").ok()?;
    let captures = re.captures(text)?;
    let cleaned = captures.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&cleaned).ok()?.to_f64()
}
