use thiserror::Error;

#[derive(Error, Debug)]
pub enum EhonError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with HTTP {status}")]
    UpstreamStatus { service: String, status: u16 },

    #[error("Malformed response from {service}: {message}")]
    MalformedResponse { service: String, message: String },

    #[error("No ISBN could be extracted from response: {response}")]
    NoIsbnInResponse { response: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown region: {name}")]
    UnknownRegion { name: String },

    #[error("Unknown keyword: {keyword}")]
    UnknownKeyword { keyword: String },

    #[error("No book has been selected")]
    NoBookSelected,

    #[error("Book not found in catalog: {isbn}")]
    BookNotInCatalog { isbn: String },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Data,
    Configuration,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EhonError {
    pub fn malformed(service: &str, message: impl Into<String>) -> Self {
        EhonError::MalformedResponse {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// 是否值得重試：網路錯誤、5xx/429、格式錯誤的回應
    pub fn is_transient(&self) -> bool {
        match self {
            EhonError::Http(_) => true,
            EhonError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            EhonError::MalformedResponse { .. } => true,
            EhonError::NoIsbnInResponse { .. } => true,
            EhonError::SerializationError(_) => true,
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EhonError::Http(_) => ErrorCategory::Network,
            EhonError::UpstreamStatus { .. } => ErrorCategory::Upstream,
            EhonError::MalformedResponse { .. }
            | EhonError::NoIsbnInResponse { .. }
            | EhonError::CsvError(_)
            | EhonError::IoError(_)
            | EhonError::SerializationError(_) => ErrorCategory::Data,
            EhonError::ConfigValidationError { .. }
            | EhonError::InvalidConfigValueError { .. }
            | EhonError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EhonError::UnknownRegion { .. }
            | EhonError::UnknownKeyword { .. }
            | EhonError::NoBookSelected
            | EhonError::BookNotInCatalog { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 給使用者看的訊息，不含技術細節
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Upstream | ErrorCategory::Data => {
                "検索を完了できませんでした。".to_string()
            }
            ErrorCategory::Configuration => "設定に問題があります。".to_string(),
            ErrorCategory::Input => match self {
                EhonError::UnknownRegion { name } => format!("「{}」は都道府県名として認識できません。", name),
                EhonError::UnknownKeyword { keyword } => {
                    format!("キーワード「{}」はデータにありません。", keyword)
                }
                EhonError::BookNotInCatalog { isbn } => format!("ISBN {} の絵本はカタログにありません。", isbn),
                _ => "絵本が選択されていません。".to_string(),
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and try again",
            ErrorCategory::Upstream => "The upstream service may be busy; retry later or check the API key",
            ErrorCategory::Data => "Inspect the input file or upstream response format",
            ErrorCategory::Configuration => "Review ehon.toml and the PERPLEXITY_API_KEY / CALIL_API_KEY variables",
            ErrorCategory::Input => "Choose a value from the listed options",
        }
    }
}

pub type Result<T> = std::result::Result<T, EhonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server_error = EhonError::UpstreamStatus {
            service: "calil".to_string(),
            status: 503,
        };
        let unauthorized = EhonError::UpstreamStatus {
            service: "calil".to_string(),
            status: 401,
        };
        assert!(server_error.is_transient());
        assert!(!unauthorized.is_transient());
        assert!(EhonError::malformed("perplexity", "missing choices").is_transient());
        assert!(!EhonError::NoBookSelected.is_transient());
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = EhonError::malformed("calil", "expected value at line 1 column 1");
        assert_eq!(err.user_friendly_message(), "検索を完了できませんでした。");
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
