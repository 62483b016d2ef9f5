use crate::utils::error::{MergeError, Result};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(MergeError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Checks that a file exists, is a regular file, carries an allowed extension
/// and stays under the size cap before anything tries to open it.
pub fn validate_input_file(
    field_name: &str,
    path: &Path,
    allowed_extensions: &[&str],
    max_size_mb: u64,
) -> Result<()> {
    let display = path.display().to_string();

    if !path.exists() {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display,
            reason: "File does not exist".to_string(),
        });
    }

    if !path.is_file() {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display,
            reason: "Path is not a file".to_string(),
        });
    }

    let allowed_set: HashSet<String> = allowed_extensions
        .iter()
        .map(|ext| ext.to_ascii_lowercase())
        .collect();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if allowed_set.contains(&ext) => {}
        _ => {
            return Err(MergeError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: display,
                reason: format!(
                    "Invalid file extension. Allowed: {}",
                    allowed_extensions.join(", ")
                ),
            });
        }
    }

    let size_bytes = path.metadata()?.len();
    if size_bytes > max_size_mb * 1024 * 1024 {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display,
            reason: format!(
                "File too large: {} bytes (max: {}MB)",
                size_bytes, max_size_mb
            ),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MergeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
