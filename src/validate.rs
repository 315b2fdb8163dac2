use once_cell::sync::Lazy;
use regex::Regex;

pub const EXAMPLE_REFERENCE: &str = "https://vt.tiktok.com/ZSrJxqY5S/";

static TIKTOK_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(tiktok\.com|vt\.tiktok\.com)/.+").unwrap());

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL must not be empty")]
    EmptyInput,
    #[error("Invalid TikTok URL. Example: {EXAMPLE_REFERENCE}")]
    InvalidFormat,
}

/// Accept a TikTok reference, returned as-is (no trimming or normalization).
pub fn validate_reference(reference: Option<&str>) -> Result<&str, ValidationError> {
    let reference = match reference {
        Some(r) if !r.is_empty() => r,
        _ => return Err(ValidationError::EmptyInput),
    };
    if !TIKTOK_URL_RE.is_match(reference) {
        return Err(ValidationError::InvalidFormat);
    }
    Ok(reference)
}
