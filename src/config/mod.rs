pub mod cli;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_bind_address, validate_path, validate_range, Validate};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "static/output";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 16;

/// Command line configuration. `--config` points at a TOML file that
/// replaces the server settings below; logging flags always apply.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "shop-banners")]
#[command(about = "Turn a spreadsheet of storefront domains into promotional banner images")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: String,

    #[arg(long, default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: String,

    /// Timeout for fetching each storefront page
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Timeout for each product image download (unbounded when unset)
    #[arg(long)]
    pub image_timeout_secs: Option<u64>,

    /// TrueType/OpenType font used for banner text
    #[arg(long)]
    pub font_path: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory during batches")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn bind_address(&self) -> &str {
        &self.bind
    }

    fn upload_dir(&self) -> &str {
        &self.upload_dir
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    fn image_timeout(&self) -> Option<Duration> {
        self.image_timeout_secs.map(Duration::from_secs)
    }

    fn font_path(&self) -> Option<&str> {
        self.font_path.as_deref()
    }

    fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitor
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_common(self)
    }
}

/// 所有配置來源共用的驗證
pub fn validate_common<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_bind_address("bind", config.bind_address())?;
    validate_path("upload_dir", config.upload_dir())?;
    validate_path("output_dir", config.output_dir())?;
    validate_range("fetch_timeout_secs", config.fetch_timeout().as_secs(), 1, 300)?;
    if let Some(timeout) = config.image_timeout() {
        validate_range("image_timeout_secs", timeout.as_secs(), 1, 3600)?;
    }
    if let Some(font) = config.font_path() {
        validate_path("font_path", font)?;
    }
    validate_range("max_upload_mb", config.max_upload_bytes() / (1024 * 1024), 1, 1024)?;
    Ok(())
}
