use serde::{Deserialize, Serialize};
use std::fmt;

/// One featured product scraped from a storefront page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub image_url: String,
    pub name: String,
    pub price: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const SQUARE: CanvasSize = CanvasSize::new(1200, 1200);
    pub const LANDSCAPE: CanvasSize = CanvasSize::new(1200, 628);

    /// Every banner is rendered at these sizes, in this order.
    pub const ALL: [CanvasSize; 2] = [CanvasSize::SQUARE, CanvasSize::LANDSCAPE];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// File name of a rendered banner, e.g. `shop.example.com_1200x628.png`.
pub fn banner_file_name(domain: &str, size: CanvasSize) -> String {
    format!("{}_{}.png", domain, size)
}

/// Path of a rendered banner inside the output archive.
pub fn archive_entry_name(domain: &str, size: CanvasSize) -> String {
    format!("{}/{}", domain, banner_file_name(domain, size))
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDomain {
    pub domain: String,
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRender {
    pub domain: String,
    pub size: CanvasSize,
    pub reason: String,
}

/// 單次批次執行結果
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub archive_path: String,
    pub domains_total: usize,
    pub entries: Vec<String>,
    pub skipped: Vec<SkippedDomain>,
    pub failed_renders: Vec<FailedRender>,
}

impl BatchReport {
    pub fn new(archive_path: String, domains_total: usize) -> Self {
        Self {
            archive_path,
            domains_total,
            entries: Vec::new(),
            skipped: Vec::new(),
            failed_renders: Vec::new(),
        }
    }

    /// 至少產出一個壓縮檔項目的網域數
    pub fn domains_rendered(&self) -> usize {
        let mut seen: Vec<&str> = self
            .entries
            .iter()
            .filter_map(|entry| entry.split('/').next())
            .collect();
        seen.dedup();
        seen.len()
    }
}
