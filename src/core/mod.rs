pub mod archive;
pub mod engine;
pub mod fonts;
pub mod loader;
pub mod renderer;
pub mod scraper;

pub use crate::domain::model::{BatchReport, CanvasSize, Product};
pub use crate::domain::ports::{ConfigProvider, ImageSource, PageFetcher, ProductExtractor, Storage};
pub use crate::utils::error::Result;
