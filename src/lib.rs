pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::{engine::BannerEngine, renderer::BannerRenderer, scraper::ProductScraper};
pub use utils::error::{BannerError, Result};
