use crate::config::{
    validate_common, DEFAULT_BIND, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_UPLOAD_MB,
    DEFAULT_OUTPUT_DIR, DEFAULT_UPLOAD_DIR,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BannerError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// 檔案式配置，所有表格與欄位皆可省略
///
/// ```toml
/// [server]
/// bind = "127.0.0.1:8080"
/// max_upload_mb = 8
///
/// [paths]
/// upload_dir = "/var/lib/shop-banners/uploads"
/// output_dir = "${OUTPUT_ROOT}/banners"
///
/// [scrape]
/// timeout_seconds = 10
///
/// [render]
/// font_path = "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf"
/// image_timeout_seconds = 30
///
/// [monitoring]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub paths: PathsSection,
    pub scrape: ScrapeSection,
    pub render: RenderSection,
    pub monitoring: MonitoringSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: String,
    pub max_upload_mb: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    pub upload_dir: String,
    pub output_dir: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeSection {
    pub timeout_seconds: u64,
}

impl Default for ScrapeSection {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSection {
    pub font_path: Option<String>,
    pub image_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringSection {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BannerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，先替換 `${VAR}` 環境變數（未設定者保留原樣）
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| BannerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }
}

fn env_var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

/// 替換環境變數 (例如 ${OUTPUT_ROOT})
fn substitute_env_vars(content: &str) -> String {
    env_var_pattern().replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}

impl ConfigProvider for TomlConfig {
    fn bind_address(&self) -> &str {
        &self.server.bind
    }

    fn upload_dir(&self) -> &str {
        &self.paths.upload_dir
    }

    fn output_dir(&self) -> &str {
        &self.paths.output_dir
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape.timeout_seconds)
    }

    fn image_timeout(&self) -> Option<Duration> {
        self.render.image_timeout_seconds.map(Duration::from_secs)
    }

    fn font_path(&self) -> Option<&str> {
        self.render.font_path.as_deref()
    }

    fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_common(self)
    }
}
