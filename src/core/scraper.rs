//! Storefront scraping.
//!
//! Fetching and extraction are separate capabilities: [`HttpPageFetcher`]
//! downloads `http://{domain}` and [`ProductCardExtractor`] reads the
//! featured products out of the page with fixed CSS selectors.

use crate::domain::model::Product;
use crate::domain::ports::{Page, PageFetcher, ProductExtractor};
use crate::utils::error::{BannerError, Result, ScrapeError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Featured products taken from each storefront.
pub const MAX_PRODUCTS: usize = 3;

pub const PRODUCT_CARD_SELECTOR: &str = ".product-card";
pub const PRODUCT_IMAGE_SELECTOR: &str = "img";
pub const PRODUCT_TITLE_SELECTOR: &str = ".product-title";
pub const PRODUCT_PRICE_SELECTOR: &str = ".product-price";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Reject spreadsheet values that are not a bare host, since the domain is
/// also used as a file and archive path component.
pub fn check_domain(domain: &str) -> std::result::Result<(), ScrapeError> {
    if domain.contains(['/', '\\']) || domain == "." || domain == ".." {
        return Err(ScrapeError::InvalidUrl {
            url: format!("http://{}", domain),
            reason: "domain must be a bare host name".to_string(),
        });
    }
    Ok(())
}

/// Build the storefront URL for a domain from the spreadsheet.
pub fn storefront_url(domain: &str) -> std::result::Result<Url, ScrapeError> {
    check_domain(domain)?;
    let raw = format!("http://{}", domain);
    let url = Url::parse(&raw).map_err(|e| ScrapeError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ScrapeError::InvalidUrl {
            url: raw,
            reason: "no host".to_string(),
        });
    }
    Ok(url)
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(BannerError::HttpClientError)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, domain: &str) -> std::result::Result<Page, ScrapeError> {
        let url = storefront_url(domain)?;
        tracing::debug!("Fetching storefront {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(ScrapeError::Fetch)?;

        // Error pages are parsed like any other; no product cards means no products.
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Storefront {} answered HTTP {}", url, status.as_u16());
        }

        // Redirects may move the page; relative image paths follow the final URL.
        let final_url = response.url().clone();
        let html = response.text().await.map_err(ScrapeError::Fetch)?;
        tracing::debug!("Fetched {} bytes from {}", html.len(), final_url);

        Ok(Page {
            url: final_url,
            html,
        })
    }
}

/// Reads `.product-card` elements, each holding an `img`, a `.product-title`
/// and a `.product-price`.
pub struct ProductCardExtractor {
    card: Selector,
    image: Selector,
    title: Selector,
    price: Selector,
}

impl ProductCardExtractor {
    pub fn new() -> std::result::Result<Self, ScrapeError> {
        Ok(Self {
            card: parse_selector(PRODUCT_CARD_SELECTOR)?,
            image: parse_selector(PRODUCT_IMAGE_SELECTOR)?,
            title: parse_selector(PRODUCT_TITLE_SELECTOR)?,
            price: parse_selector(PRODUCT_PRICE_SELECTOR)?,
        })
    }

    fn extract_card(
        &self,
        index: usize,
        card: ElementRef<'_>,
        base: &Url,
    ) -> std::result::Result<Product, ScrapeError> {
        let missing = |selector: &str| ScrapeError::MissingElement {
            index,
            selector: selector.to_string(),
        };

        let src = card
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .ok_or_else(|| missing("img[src]"))?;
        let image_url = base
            .join(src)
            .map(String::from)
            .unwrap_or_else(|_| src.to_string());

        let name = card
            .select(&self.title)
            .next()
            .map(element_text)
            .ok_or_else(|| missing(PRODUCT_TITLE_SELECTOR))?;
        let price = card
            .select(&self.price)
            .next()
            .map(element_text)
            .ok_or_else(|| missing(PRODUCT_PRICE_SELECTOR))?;

        Ok(Product {
            image_url,
            name,
            price,
        })
    }
}

impl ProductExtractor for ProductCardExtractor {
    fn extract(&self, page: &Page) -> std::result::Result<Vec<Product>, ScrapeError> {
        let document = Html::parse_document(&page.html);

        document
            .select(&self.card)
            .take(MAX_PRODUCTS)
            .enumerate()
            .map(|(index, card)| self.extract_card(index, card, &page.url))
            .collect()
    }
}

fn parse_selector(selector: &str) -> std::result::Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|_| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetch a storefront and extract its featured products.
pub struct ProductScraper {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ProductExtractor>,
}

impl ProductScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: Arc<dyn ProductExtractor>) -> Self {
        Self { fetcher, extractor }
    }

    /// HTTP fetcher with the given page timeout and the product-card extractor.
    pub fn http(timeout: Duration) -> Result<Self> {
        let extractor = ProductCardExtractor::new().map_err(|e| BannerError::ConfigError {
            message: e.to_string(),
        })?;
        Ok(Self::new(
            Arc::new(HttpPageFetcher::new(timeout)?),
            Arc::new(extractor),
        ))
    }

    /// Between one and [`MAX_PRODUCTS`] products, or why there are none.
    pub async fn scrape(&self, domain: &str) -> std::result::Result<Vec<Product>, ScrapeError> {
        check_domain(domain)?;
        let page = self.fetcher.fetch_page(domain).await?;
        let mut products = self.extractor.extract(&page)?;
        products.truncate(MAX_PRODUCTS);

        if products.is_empty() {
            return Err(ScrapeError::NoProducts {
                selector: PRODUCT_CARD_SELECTOR.to_string(),
            });
        }

        tracing::debug!("Found {} products on {}", products.len(), domain);
        Ok(products)
    }
}
