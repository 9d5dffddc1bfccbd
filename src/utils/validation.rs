use crate::utils::error::{EhonError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> EhonError {
    EhonError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, url_str, format!("Invalid URL format: {}", e))),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_file_extension(field_name: &str, path: &str, allowed_extensions: &[&str]) -> Result<()> {
    match std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_extensions.contains(&extension) => Ok(()),
        Some(extension) => Err(invalid(
            field_name,
            path,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        )),
        None => Err(invalid(field_name, path, "File has no extension or invalid filename")),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

/// 取得必填的密鑰；空字串或未替換的 `${VAR}` 都視為缺少
pub fn validate_secret<'a>(field_name: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || (trimmed.starts_with("${") && trimmed.ends_with('}')) {
        return Err(EhonError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(trimmed)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty or whitespace-only"));
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
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("library.endpoint", "https://api.calil.jp").is_ok());
        assert!(validate_url("library.endpoint", "http://localhost:8080").is_ok());
        assert!(validate_url("library.endpoint", "").is_err());
        assert!(validate_url("library.endpoint", "invalid-url").is_err());
        assert!(validate_url("library.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_secret() {
        assert_eq!(validate_secret("library.api_key", " abc ").unwrap(), "abc");
        assert!(validate_secret("library.api_key", "").is_err());
        assert!(validate_secret("library.api_key", "${CALIL_API_KEY}").is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("catalog.path", "books.csv", &["csv"]).is_ok());
        assert!(validate_file_extension("catalog.path", "books.txt", &["csv"]).is_err());
        assert!(validate_file_extension("catalog.path", "books", &["csv"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("text_generation.isbn_temperature", 0.3, 0.0, 2.0).is_ok());
        assert!(validate_range("text_generation.isbn_temperature", 2.5, 0.0, 2.0).is_err());
    }
}
