//! 對外呼叫共用的有限次重試策略。
//!
//! 失敗後固定等待 `delay` 再試，最後一次失敗不等待；
//! 結果以 [`RetryOutcome`] 回傳，錯誤不會越過這一層往外丟。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

#[derive(Debug, PartialEq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, retries: u32 },
    Failed { last_error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Failed { last_error, .. } => Err(last_error),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 任何錯誤都重試
    pub async fn execute<T, E, F, Fut>(&self, label: &str, operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_when(label, operation, |_| true).await
    }

    /// `should_retry` 回傳 false 的錯誤立即結束
    pub async fn execute_when<T, E, F, Fut, P>(
        &self,
        label: &str,
        mut operation: F,
        should_retry: P,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        retries: attempt - 1,
                    }
                }
                Err(e) => {
                    if attempt >= self.max_attempts || !should_retry(&e) {
                        tracing::warn!("❌ {} failed after {} attempt(s): {}", label, attempt, e);
                        return RetryOutcome::Failed {
                            last_error: e,
                            attempts: attempt,
                        };
                    }

                    tracing::warn!(
                        "🔁 {} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        self.delay,
                        e
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
