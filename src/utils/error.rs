use thiserror::Error;

#[derive(Error, Debug)]
pub enum BannerError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Spreadsheet could not be read: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Spreadsheet has no '{column}' column")]
    MissingColumnError { column: String },

    #[error("Unsupported spreadsheet format: {extension}")]
    UnsupportedFormatError { extension: String },

    #[error("Spreadsheet is empty: {path}")]
    EmptySpreadsheetError { path: String },

    #[error("Upload rejected: {message}")]
    UploadError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("HTTP client setup failed: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Upload,
    Configuration,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BannerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BannerError::SpreadsheetError(_)
            | BannerError::CsvError(_)
            | BannerError::MissingColumnError { .. }
            | BannerError::UnsupportedFormatError { .. }
            | BannerError::EmptySpreadsheetError { .. } => ErrorCategory::Input,
            BannerError::UploadError { .. } => ErrorCategory::Upload,
            BannerError::ConfigError { .. } | BannerError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            BannerError::ZipError(_) | BannerError::IoError(_) => ErrorCategory::Storage,
            BannerError::HttpClientError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Upload => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 是否為使用者輸入造成的錯誤（而非服務端失敗）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Input | ErrorCategory::Upload
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BannerError::MissingColumnError { column } => {
                format!("The spreadsheet must contain a '{}' column", column)
            }
            BannerError::UnsupportedFormatError { extension } => format!(
                "Files of type '{}' are not supported; upload a .csv, .xlsx, .xls or .ods file",
                extension
            ),
            BannerError::EmptySpreadsheetError { .. } => {
                "The spreadsheet has no header row".to_string()
            }
            BannerError::SpreadsheetError(_) | BannerError::CsvError(_) => {
                "The spreadsheet could not be read".to_string()
            }
            BannerError::UploadError { message } => message.clone(),
            BannerError::ConfigError { .. } | BannerError::InvalidConfigValueError { .. } => {
                format!("Invalid configuration: {}", self)
            }
            _ => "Internal error while building the banner archive".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the file is a valid spreadsheet with a 'domain' header in the first row"
            }
            ErrorCategory::Upload => "Choose a file with a plain name and submit the form again",
            ErrorCategory::Configuration => "Review the command line flags or the TOML config file",
            ErrorCategory::Storage => {
                "Check that the upload and output directories exist and are writable"
            }
            ErrorCategory::System => "Check the TLS and network setup of the host",
        }
    }
}

pub type Result<T> = std::result::Result<T, BannerError>;

/// 網域抓取失敗的原因；該網域會被略過，批次繼續執行
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("invalid storefront URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("storefront request failed: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("no elements matching '{selector}'")]
    NoProducts { selector: String },

    #[error("product card {index} has no element matching '{selector}'")]
    MissingElement { index: usize, selector: String },

    #[error("invalid selector '{selector}'")]
    InvalidSelector { selector: String },
}

impl ScrapeError {
    /// 日誌與批次報告使用的簡短分類標籤
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidUrl { .. } | ScrapeError::Fetch(_) => "fetch",
            ScrapeError::NoProducts { .. } => "no_products",
            ScrapeError::MissingElement { .. } | ScrapeError::InvalidSelector { .. } => {
                "structure"
            }
        }
    }
}

/// 單一（網域, 尺寸）橫幅無法產生的原因
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("product image request to {url} failed: {source}")]
    ImageFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("product image {url} returned HTTP {status}")]
    ImageStatus { url: String, status: u16 },

    #[error("product image {url} could not be decoded: {source}")]
    ImageDecode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("banner could not be encoded: {0}")]
    Encode(#[source] image::ImageError),

    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
