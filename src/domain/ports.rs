use crate::domain::model::Product;
use crate::utils::error::{RenderError, Result, ScrapeError};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// `path` 的實際位置，用於日誌與報告
    fn locate(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn bind_address(&self) -> &str;
    fn upload_dir(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn fetch_timeout(&self) -> Duration;
    fn image_timeout(&self) -> Option<Duration>;
    fn font_path(&self) -> Option<&str>;
    fn max_upload_bytes(&self) -> usize;
    fn monitoring_enabled(&self) -> bool;
}

/// A storefront page as fetched from the network.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub html: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, domain: &str) -> std::result::Result<Page, ScrapeError>;
}

/// Given raw storefront HTML, produce the featured products (at most three).
pub trait ProductExtractor: Send + Sync {
    fn extract(&self, page: &Page) -> std::result::Result<Vec<Product>, ScrapeError>;
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> std::result::Result<Vec<u8>, RenderError>;
}
