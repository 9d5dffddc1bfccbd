use crate::app::session::LookupSession;
use crate::core::retry::{RetryOutcome, RetryPolicy};
use crate::domain::model::BookIdentity;
use crate::domain::ports::{GenerationRequest, TextGenerator};
use crate::domain::region::Region;
use crate::utils::error::EhonError;
use std::sync::Arc;

pub const DEFAULT_SUMMARY_TEMPERATURE: f32 = 0.7;
pub const SUMMARY_UNAVAILABLE: &str = "（解説を取得できませんでした）";

/// 繪本介紹文與地區圖書館導覽的文字生成
pub struct BookDescriber {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    temperature: f32,
}

impl BookDescriber {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy, temperature: f32) -> Self {
        Self {
            generator,
            retry,
            temperature,
        }
    }

    /// 介紹文以 (書名, 作者) 快取於 session；失敗時回傳固定的提示文字且不寫入快取
    pub async fn summary(&self, session: &mut LookupSession, book: &BookIdentity) -> String {
        if let Some(cached) = session.cached_summary(book) {
            return cached.to_string();
        }

        let prompt = format!(
            "絵本『{}』（著者：{}）を子どもと保護者向けにやさしく紹介する文章を200文字以内で書いてください。",
            book.title, book.author
        );
        match self.generate("book summary", prompt).await {
            Some(summary) => {
                session.cache_summary(book, summary.clone());
                summary
            }
            None => SUMMARY_UNAVAILABLE.to_string(),
        }
    }

    pub async fn region_library_guide(&self, book: &BookIdentity, region: &Region) -> Option<String> {
        let prompt = format!(
            "絵本『{title}』（著者：{author}）を{region}の図書館で借りたいと考えています。{region}の代表的な公共図書館を3つほど、名前と公式サイトのURLをマークダウンのリンク形式で教えてください。",
            title = book.title,
            author = book.author,
            region = region
        );
        self.generate("region library guide", prompt).await
    }

    async fn generate(&self, label: &str, prompt: String) -> Option<String> {
        let request = GenerationRequest {
            prompt,
            temperature: self.temperature,
        };
        match self
            .retry
            .execute_when(label, |_| self.generator.generate(&request), EhonError::is_transient)
            .await
        {
            RetryOutcome::Succeeded { value, .. } if !value.trim().is_empty() => Some(value.trim().to_string()),
            RetryOutcome::Succeeded { .. } => None,
            RetryOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct CountingGenerator {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EhonError::UpstreamStatus {
                    service: "perplexity".to_string(),
                    status: 500,
                });
            }
            Ok(format!(" 紹介 (t={}) ", request.temperature))
        }
    }

    fn describer(generator: Arc<CountingGenerator>) -> BookDescriber {
        BookDescriber::new(generator, RetryPolicy::new(2, Duration::ZERO), DEFAULT_SUMMARY_TEMPERATURE)
    }

    #[tokio::test]
    async fn test_summary_is_cached_per_title_and_author() {
        let generator = Arc::new(CountingGenerator { calls: AtomicU32::new(0), fail: false });
        let describer = describer(generator.clone());
        let mut session = LookupSession::new();
        let book = BookIdentity::new("ぐりとぐら", "なかがわりえこ", "9784834000825");

        let first = describer.summary(&mut session, &book).await;
        let second = describer.summary(&mut session, &book).await;

        assert_eq!(first, "紹介 (t=0.7)");
        assert_eq!(first, second);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_summary_falls_back_and_is_not_cached() {
        let generator = Arc::new(CountingGenerator { calls: AtomicU32::new(0), fail: true });
        let describer = describer(generator.clone());
        let mut session = LookupSession::new();
        let book = BookIdentity::new("ぐりとぐら", "なかがわりえこ", "9784834000825");

        assert_eq!(describer.summary(&mut session, &book).await, SUMMARY_UNAVAILABLE);
        assert!(session.cached_summary(&book).is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_region_guide_none_on_failure() {
        let generator = Arc::new(CountingGenerator { calls: AtomicU32::new(0), fail: true });
        let book = BookIdentity::new("ぐりとぐら", "なかがわりえこ", "9784834000825");
        let guide = describer(generator)
            .region_library_guide(&book, &Region::parse("京都府").unwrap())
            .await;
        assert!(guide.is_none());
    }
}
