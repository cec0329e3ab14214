use crate::core::archive::{BannerArchive, ARCHIVE_FILE_NAME};
use crate::core::loader::load_domains;
use crate::core::renderer::BannerRenderer;
use crate::core::scraper::ProductScraper;
use crate::domain::model::{
    archive_entry_name, banner_file_name, BatchReport, CanvasSize, FailedRender, Product,
    SkippedDomain,
};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::collections::HashSet;
use std::path::Path;

/// 試算表中重複出現的網域所記錄的略過類型
pub const DUPLICATE_KIND: &str = "duplicate";

/// 批次引擎：讀入試算表，輸出橫幅壓縮檔
pub struct BannerEngine<S: Storage> {
    storage: S,
    scraper: ProductScraper,
    renderer: BannerRenderer,
    monitor: SystemMonitor,
}

impl<S: Storage> BannerEngine<S> {
    pub fn new(storage: S, scraper: ProductScraper, renderer: BannerRenderer) -> Self {
        Self {
            storage,
            scraper,
            renderer,
            monitor: SystemMonitor::new(false),
        }
    }

    /// 依配置建立 HTTP 抓取器與渲染器
    pub fn from_config<C: ConfigProvider>(storage: S, config: &C) -> Result<Self> {
        let scraper = ProductScraper::http(config.fetch_timeout())?;
        let renderer = BannerRenderer::http(config.image_timeout(), config.font_path())?;
        Ok(Self::new(storage, scraper, renderer).with_monitoring(config.monitoring_enabled()))
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 讀取試算表中的網域，依序抓取並渲染。
    ///
    /// 試算表與壓縮檔錯誤會中止批次；抓取與渲染失敗只略過該網域的橫幅。
    /// 重複的網域只處理第一次。
    pub async fn run(&self, spreadsheet: &Path) -> Result<BatchReport> {
        tracing::info!("Loading domains from {}", spreadsheet.display());
        let domains = load_domains(spreadsheet)?;
        tracing::info!("Loaded {} domains", domains.len());
        self.monitor.log_stats("load");

        let mut report = BatchReport::new(self.storage.locate(ARCHIVE_FILE_NAME), domains.len());
        let mut archive = BannerArchive::new();
        let mut seen = HashSet::new();

        for domain in &domains {
            if !seen.insert(domain.as_str()) {
                tracing::info!("Skipping {}: already processed in this batch", domain);
                report.skipped.push(SkippedDomain {
                    domain: domain.clone(),
                    kind: DUPLICATE_KIND.to_string(),
                    reason: "domain listed more than once".to_string(),
                });
                continue;
            }
            tracing::info!("Processing {}...", domain);

            let products = match self.scraper.scrape(domain).await {
                Ok(products) => products,
                Err(e) => {
                    tracing::warn!("Skipping {} due to scraping issues: {}", domain, e);
                    report.skipped.push(SkippedDomain {
                        domain: domain.clone(),
                        kind: e.kind().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            self.render_domain(domain, &products, &mut archive, &mut report)
                .await?;
            self.monitor.log_stats(domain);
        }

        tracing::debug!("Writing archive with {} entries", archive.len());
        let zip_data = archive.finish()?;
        self.storage.write_file(ARCHIVE_FILE_NAME, &zip_data).await?;

        tracing::info!(
            "Archive {} holds {} banners for {} of {} domains",
            report.archive_path,
            report.entries.len(),
            report.domains_rendered(),
            report.domains_total
        );
        self.monitor.log_final_stats();
        Ok(report)
    }

    async fn render_domain(
        &self,
        domain: &str,
        products: &[Product],
        archive: &mut BannerArchive,
        report: &mut BatchReport,
    ) -> Result<()> {
        for size in CanvasSize::ALL {
            let png = match self.renderer.render_png(domain, products, size).await {
                Ok(png) => png,
                Err(e) => {
                    tracing::error!("Error creating image for {} at {}: {}", domain, size, e);
                    report.failed_renders.push(FailedRender {
                        domain: domain.to_string(),
                        size,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            self.storage
                .write_file(&banner_file_name(domain, size), &png)
                .await?;

            let entry = archive_entry_name(domain, size);
            if archive.add(&entry, &png)? {
                report.entries.push(entry);
            } else {
                tracing::warn!("{} is already in the archive, keeping the first copy", entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fonts::BannerFont;
    use crate::core::renderer::encode_png;
    use crate::core::scraper::ProductCardExtractor;
    use crate::domain::ports::{ImageSource, Page, PageFetcher, ProductExtractor};
    use crate::utils::error::{BannerError, RenderError, ScrapeError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::Builder;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemoryStorage {
        fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(path).cloned()
        }
    }

    impl Storage for MemoryStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.get_file(path).ok_or_else(|| {
                BannerError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn locate(&self, path: &str) -> String {
            format!("memory://{}", path)
        }
    }

    /// Serves canned HTML per domain and records which domains were asked for.
    struct FakeStorefronts {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for FakeStorefronts {
        async fn fetch_page(&self, domain: &str) -> std::result::Result<Page, ScrapeError> {
            self.fetched.lock().unwrap().push(domain.to_string());
            let html = self
                .pages
                .get(domain)
                .cloned()
                .ok_or_else(|| ScrapeError::InvalidUrl {
                    url: format!("http://{}", domain),
                    reason: "host not found".to_string(),
                })?;
            Ok(Page {
                url: url::Url::parse(&format!("http://{}/", domain)).unwrap(),
                html,
            })
        }
    }

    struct FakeImages;

    #[async_trait]
    impl ImageSource for FakeImages {
        async fn fetch_image(&self, url: &str) -> std::result::Result<Vec<u8>, RenderError> {
            if url.contains("broken") {
                return Err(RenderError::ImageStatus {
                    url: url.to_string(),
                    status: 404,
                });
            }
            let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
            encode_png(&img)
        }
    }

    fn storefront(cards: usize, image: &str) -> String {
        (0..cards)
            .map(|i| {
                format!(
                    r#"<div class="product-card"><img src="/{image}{i}.png"><span class="product-title">P{i}</span><span class="product-price">${i}</span></div>"#
                )
            })
            .collect()
    }

    fn engine(
        pages: &[(&str, String)],
        storage: MemoryStorage,
    ) -> (BannerEngine<MemoryStorage>, Arc<FakeStorefronts>) {
        let fetcher = Arc::new(FakeStorefronts {
            pages: pages
                .iter()
                .map(|(d, html)| (d.to_string(), html.clone()))
                .collect(),
            fetched: Mutex::new(Vec::new()),
        });
        let extractor: Arc<dyn ProductExtractor> = Arc::new(ProductCardExtractor::new().unwrap());
        let scraper = ProductScraper::new(fetcher.clone(), extractor);
        let renderer = BannerRenderer::new(Arc::new(FakeImages), BannerFont::Bitmap);
        (BannerEngine::new(storage, scraper, renderer), fetcher)
    }

    fn spreadsheet(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn archive_names(storage: &MemoryStorage) -> Vec<String> {
        let bytes = storage.get_file(ARCHIVE_FILE_NAME).unwrap();
        let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_successful_domain_gets_both_sizes() {
        let storage = MemoryStorage::default();
        let (engine, _) = engine(&[("shop.example.com", storefront(3, "p"))], storage.clone());
        let sheet = spreadsheet("domain\nshop.example.com\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert_eq!(
            archive_names(&storage),
            vec![
                "shop.example.com/shop.example.com_1200x1200.png",
                "shop.example.com/shop.example.com_1200x628.png",
            ]
        );
        assert_eq!(report.entries.len(), 2);
        assert!(storage.get_file("shop.example.com_1200x628.png").is_some());
        assert_eq!(report.archive_path, "memory://output_images.zip");
    }

    #[tokio::test]
    async fn test_failed_domain_is_skipped() {
        let storage = MemoryStorage::default();
        let (engine, fetcher) = engine(&[("b.com", storefront(3, "p"))], storage.clone());
        let sheet = spreadsheet("domain\na.com\nb.com\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert_eq!(*fetcher.fetched.lock().unwrap(), vec!["a.com", "b.com"]);
        let names = archive_names(&storage);
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.starts_with("b.com/")));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].domain, "a.com");
        assert_eq!(report.skipped[0].kind, "fetch");
    }

    #[tokio::test]
    async fn test_page_without_cards_contributes_nothing() {
        let storage = MemoryStorage::default();
        let (engine, _) = engine(
            &[("empty.com", "<p>nothing here</p>".to_string())],
            storage.clone(),
        );
        let sheet = spreadsheet("domain\nempty.com\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert!(archive_names(&storage).is_empty());
        assert_eq!(report.skipped[0].kind, "no_products");
    }

    #[tokio::test]
    async fn test_fewer_than_three_cards_still_render() {
        let storage = MemoryStorage::default();
        let (engine, _) = engine(&[("one.com", storefront(1, "p"))], storage.clone());
        let sheet = spreadsheet("domain\none.com\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert_eq!(report.entries.len(), 2);
        assert!(report.failed_renders.is_empty());
    }

    #[tokio::test]
    async fn test_broken_image_fails_renders_only() {
        let storage = MemoryStorage::default();
        let (engine, _) = engine(
            &[("bad.com", storefront(2, "broken")), ("ok.com", storefront(3, "p"))],
            storage.clone(),
        );
        let sheet = spreadsheet("domain\nbad.com\nok.com\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert_eq!(report.failed_renders.len(), 2);
        assert!(report.skipped.is_empty());
        assert_eq!(archive_names(&storage).len(), 2);
        assert_eq!(report.domains_rendered(), 1);
    }

    #[tokio::test]
    async fn test_missing_column_fails_before_scraping() {
        let storage = MemoryStorage::default();
        let (engine, fetcher) = engine(&[("a.com", storefront(3, "p"))], storage.clone());
        let sheet = spreadsheet("site\na.com\n");

        let err = engine.run(sheet.path()).await.unwrap_err();

        assert!(matches!(err, BannerError::MissingColumnError { .. }));
        assert!(fetcher.fetched.lock().unwrap().is_empty());
        assert!(storage.get_file(ARCHIVE_FILE_NAME).is_none());
    }

    #[tokio::test]
    async fn test_repeated_domain_is_scraped_once() {
        let storage = MemoryStorage::default();
        let (engine, fetcher) = engine(
            &[("a.com", storefront(3, "p")), ("b.com", storefront(1, "p"))],
            storage.clone(),
        );
        let sheet = spreadsheet("domain\na.com\nb.com\na.com\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert_eq!(*fetcher.fetched.lock().unwrap(), vec!["a.com", "b.com"]);
        assert_eq!(archive_names(&storage).len(), 4);
        assert_eq!(report.entries.len(), 4);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].domain, "a.com");
        assert_eq!(report.skipped[0].kind, DUPLICATE_KIND);
    }

    #[tokio::test]
    async fn test_path_like_domain_writes_nothing() {
        let storage = MemoryStorage::default();
        let (engine, fetcher) = engine(&[("evil.com/../../x", storefront(3, "p"))], storage.clone());
        let sheet = spreadsheet("domain\nevil.com/../../x\n");

        let report = engine.run(sheet.path()).await.unwrap();

        assert!(fetcher.fetched.lock().unwrap().is_empty());
        assert!(report.entries.is_empty());
        assert_eq!(report.skipped[0].kind, "fetch");
        assert_eq!(storage.files.lock().unwrap().len(), 1);
    }
}
