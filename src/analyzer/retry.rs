//! 上流AI呼び出しのリトライ方針
//!
//! 待機時間は `base_delay * 2^(attempt-1)` の指数バックオフ。

use crate::error::{MistakeReviewError, Result};
use std::future::Future;
use std::time::Duration;

/// バックオフの倍率上限（2^16）
const MAX_BACKOFF_SHIFT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// `max_attempts` が0の場合は1回として扱う
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` 回目（1始まり）が失敗した後の待機時間
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1 << shift)
    }

    /// 成功するか上限に達するまで `op` を呼ぶ
    ///
    /// # Errors
    /// すべて失敗した場合は最後のエラーを含む `RetriesExhausted`
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    log::warn!("AI呼び出しが{}回失敗しました: {}", attempt, e);
                    return Err(MistakeReviewError::RetriesExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "AI呼び出し失敗 ({}/{}): {} - {:?}後に再試行",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
