//! ISBN 校正：向文字生成服務詢問正確的 ISBN，並從自由文字中擷取。

use crate::core::retry::{RetryOutcome, RetryPolicy};
use crate::domain::model::BookIdentity;
use crate::domain::ports::{GenerationRequest, IsbnExtractor, TextGenerator};
use crate::utils::error::{EhonError, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};

pub const DEFAULT_ISBN_TEMPERATURE: f32 = 0.3;

// 前後須為非數字，避免把相鄰的版次或頁數黏進候選字串
static ISBN13_PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])(97[89](?:[-\s]?[0-9]){10})(?:$|[^0-9])").expect("valid ISBN-13 pattern")
});

static CANONICAL_ISBN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])((?:97[89][-\s]?)?(?:[0-9][-\s]?){9}[0-9Xx])(?:$|[^0-9])").expect("valid ISBN pattern")
});

/// 清除分隔符後的候選字串；只接受 13 碼數字或 10 碼（末碼可為 X）
fn normalize_candidate(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let (body, last) = cleaned.split_at(cleaned.len().saturating_sub(1));
    let body_is_digits = body.chars().all(|c| c.is_ascii_digit());

    match cleaned.len() {
        13 if body_is_digits && last != "X" => Some(cleaned),
        10 if body_is_digits && last == "X" => Some(isbn10_to_isbn13(body)),
        10 if body_is_digits => Some(cleaned),
        _ => None,
    }
}

/// 以前 9 碼換算成 978 開頭的 ISBN-13
pub fn isbn10_to_isbn13(first_nine: &str) -> String {
    let mut digits = format!("978{}", first_nine);
    let check = isbn13_check_digit(&digits);
    digits.push(char::from(b'0' + check));
    digits
}

fn isbn13_check_digit(first_twelve: &str) -> u8 {
    let sum: u32 = first_twelve
        .bytes()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * (if i % 2 == 0 { 1 } else { 3 }))
        .sum();
    ((10 - sum % 10) % 10) as u8
}

pub fn is_valid_checksum(isbn: &str) -> bool {
    if !isbn.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match isbn.len() {
        13 => isbn13_check_digit(&isbn[..12]) == isbn.as_bytes()[12] - b'0',
        10 => {
            let sum: u32 = isbn
                .bytes()
                .enumerate()
                .map(|(i, b)| u32::from(b - b'0') * (10 - i as u32))
                .sum();
            sum % 11 == 0
        }
        _ => false,
    }
}

/// 978/979 開頭、允許連字號或空白的 ISBN-13
pub struct Isbn13PrefixExtractor;

impl IsbnExtractor for Isbn13PrefixExtractor {
    fn name(&self) -> &str {
        "isbn13-prefix"
    }

    fn extract(&self, text: &str) -> Option<String> {
        ISBN13_PREFIXED
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| normalize_candidate(m.as_str()))
    }
}

/// 標準 10/13 碼 ISBN 樣式，可帶「ISBN」「ISBN-13:」等前綴
pub struct CanonicalPatternExtractor;

impl IsbnExtractor for CanonicalPatternExtractor {
    fn name(&self) -> &str {
        "canonical-pattern"
    }

    fn extract(&self, text: &str) -> Option<String> {
        CANONICAL_ISBN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| normalize_candidate(m.as_str()))
    }
}

/// 最後手段：只留數字，至少 10 碼時取前 13 或前 10 碼
pub struct DigitRunExtractor;

impl IsbnExtractor for DigitRunExtractor {
    fn name(&self) -> &str {
        "digit-run"
    }

    fn extract(&self, text: &str) -> Option<String> {
        let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.len() {
            n if n >= 13 => Some(digits[..13].to_string()),
            n if n >= 10 => Some(digits[..10].to_string()),
            _ => None,
        }
    }
}

/// 依序嘗試多個策略
pub struct ExtractorChain {
    extractors: Vec<Box<dyn IsbnExtractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn IsbnExtractor>>) -> Self {
        Self { extractors }
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(Isbn13PrefixExtractor),
            Box::new(CanonicalPatternExtractor),
            Box::new(DigitRunExtractor),
        ])
    }
}

impl IsbnExtractor for ExtractorChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn extract(&self, text: &str) -> Option<String> {
        self.extractors.iter().find_map(|extractor| {
            let found = extractor.extract(text);
            if let Some(isbn) = &found {
                tracing::debug!("🔎 ISBN {} extracted by {}", isbn, extractor.name());
            }
            found
        })
    }
}

pub struct IsbnResolver {
    generator: Arc<dyn TextGenerator>,
    extractor: Box<dyn IsbnExtractor>,
    retry: RetryPolicy,
    temperature: f32,
}

impl IsbnResolver {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy, temperature: f32) -> Self {
        Self {
            generator,
            extractor: Box::new(ExtractorChain::default()),
            retry,
            temperature,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn IsbnExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn prompt_for(book: &BookIdentity) -> String {
        format!(
            "絵本『{}』（著者：{}）のISBNを教えてください。複数の版がある場合は最新版のものを、ISBNの番号だけで答えてください。",
            book.title, book.author
        )
    }

    /// 取得校正後的 ISBN；無法取得時回傳 None，由呼叫端退回目錄的 ISBN
    pub async fn resolve(&self, book: &BookIdentity) -> Option<String> {
        let request = GenerationRequest {
            prompt: Self::prompt_for(book),
            temperature: self.temperature,
        };

        let outcome = self
            .retry
            .execute_when(
                "ISBN correction",
                |_| self.attempt(&request),
                EhonError::is_transient,
            )
            .await;

        match outcome {
            RetryOutcome::Succeeded { value, retries } => {
                if !is_valid_checksum(&value) {
                    tracing::debug!("ISBN {} has an invalid check digit, using it anyway", value);
                }
                tracing::info!(
                    "📗 Corrected ISBN for '{}': {} -> {} (retries: {})",
                    book.title,
                    book.catalog_isbn,
                    value,
                    retries
                );
                Some(value)
            }
            RetryOutcome::Failed { last_error, attempts } => {
                tracing::warn!(
                    "⚠️ No ISBN correction for '{}' after {} attempt(s): {}",
                    book.title,
                    attempts,
                    last_error
                );
                None
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<String> {
        let text = self.generator.generate(request).await?;
        self.extractor
            .extract(&text)
            .ok_or(EhonError::NoIsbnInResponse { response: text })
    }
}
