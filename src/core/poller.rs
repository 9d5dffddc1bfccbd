//! 蔵書確認的輪詢狀態機。
//!
//! `Initiated` 送出 isbn 與系統清單取得 session；`Polling` 期間只帶 session
//! 重新查詢並合併結果，直到上游回報完成（`Done`）或輪詢次數用盡（`Exhausted`）。
//! 用盡時累積的部分結果仍視為有效。

use crate::core::retry::RetryPolicy;
use crate::domain::model::{AvailabilitySession, PollTermination};
use crate::domain::ports::AvailabilityService;
use crate::utils::error::{EhonError, Result};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_POLLS: u32 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub max_polls: u32,
    pub interval: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            max_polls: DEFAULT_MAX_POLLS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Initiated,
    Polling { polls: u32 },
    Done { polls: u32 },
    Exhausted { polls: u32 },
}

#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub session: AvailabilitySession,
    pub termination: PollTermination,
}

pub struct AvailabilityPoller {
    service: Arc<dyn AvailabilityService>,
    retry: RetryPolicy,
    policy: PollingPolicy,
}

impl AvailabilityPoller {
    pub fn new(service: Arc<dyn AvailabilityService>, retry: RetryPolicy, policy: PollingPolicy) -> Self {
        Self {
            service,
            retry,
            policy,
        }
    }

    pub async fn run(&self, isbn: &str, system_ids: &[String]) -> Result<PollOutcome> {
        let first = self
            .retry
            .execute_when(
                "availability check",
                |_| self.service.start_check(isbn, system_ids),
                EhonError::is_transient,
            )
            .await
            .into_result()?;

        if first.session_token.is_empty() && first.continue_polling {
            return Err(EhonError::malformed("calil", "check response has no session token"));
        }

        let mut session = AvailabilitySession::new(first.session_token.clone(), isbn.to_string(), system_ids.to_vec());
        session.merge(&first, 0);
        let mut continue_polling = first.continue_polling;
        let mut state = PollState::Initiated;

        tracing::debug!(
            "📨 Availability check started for {} across {} systems (session: {})",
            isbn,
            system_ids.len(),
            session.session_token
        );

        let termination = loop {
            state = match state {
                PollState::Initiated | PollState::Polling { .. } => {
                    let polls = match state {
                        PollState::Polling { polls } => polls,
                        _ => 0,
                    };

                    if !continue_polling {
                        PollState::Done { polls }
                    } else if polls >= self.policy.max_polls {
                        PollState::Exhausted { polls }
                    } else {
                        if !self.policy.interval.is_zero() {
                            tokio::time::sleep(self.policy.interval).await;
                        }

                        let round = polls + 1;
                        let token = session.session_token.clone();
                        let response = self
                            .retry
                            .execute_when(
                                "availability poll",
                                |_| self.service.poll(&token),
                                EhonError::is_transient,
                            )
                            .await
                            .into_result()?;

                        let written = session.merge(&response, round);
                        continue_polling = response.continue_polling;
                        tracing::debug!(
                            "🔄 Poll {}/{}: {} systems updated, continue: {}",
                            round,
                            self.policy.max_polls,
                            written,
                            continue_polling
                        );
                        PollState::Polling { polls: round }
                    }
                }
                PollState::Done { polls } => break PollTermination::Done { polls },
                PollState::Exhausted { polls } => break PollTermination::Exhausted { polls },
            };
        };

        session.polls = termination.polls();
        session.done = matches!(termination, PollTermination::Done { .. });

        match termination {
            PollTermination::Done { polls } => {
                tracing::info!("✅ Availability check finished after {} poll(s)", polls)
            }
            PollTermination::Exhausted { polls } => tracing::warn!(
                "⏱️ Availability check still running after {} poll(s); using partial results ({} of {} systems reported)",
                polls,
                session.results().len(),
                system_ids.len()
            ),
        }

        Ok(PollOutcome {
            session,
            termination,
        })
    }
}
