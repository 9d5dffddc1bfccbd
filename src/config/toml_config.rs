use crate::core::poller::PollingPolicy;
use crate::core::retry::RetryPolicy;
use crate::utils::error::{EhonError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const TEXT_GENERATION_KEY_VAR: &str = "PERPLEXITY_API_KEY";
pub const LIBRARY_KEY_VAR: &str = "CALIL_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub text_generation: TextGenerationConfig,
    pub library: LibraryApiConfig,
    pub retry: RetrySettings,
    pub polling: PollingSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGenerationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub isbn_temperature: f32,
    pub summary_temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for TextGenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.perplexity.ai/chat/completions".to_string(),
            api_key: String::new(),
            model: "sonar-pro".to_string(),
            isbn_temperature: crate::core::isbn::DEFAULT_ISBN_TEMPERATURE,
            summary_temperature: crate::core::describe::DEFAULT_SUMMARY_TEMPERATURE,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryApiConfig {
    pub endpoint: String,
    pub site_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for LibraryApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.calil.jp".to_string(),
            site_url: "https://calil.jp".to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_millis: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: crate::core::retry::DEFAULT_MAX_ATTEMPTS,
            delay_millis: crate::core::retry::DEFAULT_DELAY.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_millis))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub max_polls: u32,
    pub interval_millis: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            max_polls: crate::core::poller::DEFAULT_MAX_POLLS,
            interval_millis: crate::core::poller::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl PollingSettings {
    pub fn policy(&self) -> PollingPolicy {
        PollingPolicy {
            max_polls: self.max_polls,
            interval: Duration::from_millis(self.interval_millis),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub path: String,
    pub candidate_pool: usize,
    pub recommendations: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: "output_with_all_keywords_update.csv".to_string(),
            candidate_pool: crate::core::catalog::DEFAULT_CANDIDATE_POOL,
            recommendations: crate::core::catalog::DEFAULT_RECOMMENDATIONS,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EhonError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案存在才讀取，否則使用預設值；密鑰最後由環境變數補上
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            Some(path) => {
                tracing::debug!("{} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env_secrets();
        Ok(config)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EhonError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CALIL_API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
            regex::Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern")
        });

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    fn apply_env_secrets(&mut self) {
        fill_from_env(&mut self.text_generation.api_key, TEXT_GENERATION_KEY_VAR);
        fill_from_env(&mut self.library.api_key, LIBRARY_KEY_VAR);
    }
}

fn fill_from_env(slot: &mut String, var_name: &str) {
    if validation::validate_secret(var_name, slot).is_err() {
        if let Ok(value) = std::env::var(var_name) {
            *slot = value;
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("text_generation.endpoint", &self.text_generation.endpoint)?;
        validation::validate_non_empty_string("text_generation.model", &self.text_generation.model)?;
        validation::validate_range(
            "text_generation.isbn_temperature",
            self.text_generation.isbn_temperature,
            0.0,
            2.0,
        )?;
        validation::validate_range(
            "text_generation.summary_temperature",
            self.text_generation.summary_temperature,
            0.0,
            2.0,
        )?;
        validation::validate_url("library.endpoint", &self.library.endpoint)?;
        validation::validate_url("library.site_url", &self.library.site_url)?;
        validation::validate_positive_number("retry.max_attempts", self.retry.max_attempts as usize, 1)?;
        validation::validate_positive_number("polling.max_polls", self.polling.max_polls as usize, 1)?;
        validation::validate_path("catalog.path", &self.catalog.path)?;
        validation::validate_file_extension("catalog.path", &self.catalog.path, &["csv"])?;
        validation::validate_positive_number("catalog.recommendations", self.catalog.recommendations, 1)?;
        validation::validate_positive_number(
            "catalog.candidate_pool",
            self.catalog.candidate_pool,
            self.catalog.recommendations,
        )?;
        Ok(())
    }
}
