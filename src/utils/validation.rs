use crate::utils::error::{BannerError, Result};
use regex::Regex;
use std::net::SocketAddr;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(BannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(BannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_bind_address(field_name: &str, address: &str) -> Result<()> {
    address
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| BannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: address.to_string(),
            reason: format!("Expected host:port, {}", e),
        })
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(BannerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn unsafe_filename_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"))
}

/// Reduce an uploaded file name to something safe to join onto the upload
/// directory. Accented letters are reduced to ASCII through NFKD, path
/// separators become spaces, whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped and leading dots or underscores are stripped.
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let name = ascii.replace(['/', '\\'], " ");
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = unsafe_filename_chars().replace_all(&joined, "");
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
