//! Operation context (cancellation + deadline) / 操作上下文
//!
//! Every remote call runs under an [`OpContext`]. Dropping the returned
//! future also abandons the call; the context adds an explicit token and an
//! optional deadline shared by all calls made with it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{BlobError, Result};

#[derive(Debug, Clone)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OpContext {
    /// Context without deadline / 无截止时间的上下文
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Context that expires after `timeout` / 超时后过期
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context cancelled together with this one / 派生子上下文
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail if already cancelled or expired / 检查是否已取消或超时
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(BlobError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(BlobError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `fut` until it finishes, the token fires or the deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| BlobError::DeadlineExceeded)
                    .and_then(|res| res),
                None => fut.await,
            }
        };

        tokio::select! {
            _ = self.token.cancelled() => Err(BlobError::Cancelled),
            res = bounded => res,
        }
    }

    /// Sleep between polls, waking early on cancellation / 轮询间隔
    pub async fn sleep(&self, period: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(period).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = OpContext::new();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let ctx = OpContext::new();
        ctx.cancel();
        let res = ctx.run(async { Ok(()) }).await;
        assert!(matches!(res, Err(BlobError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_while_pending() {
        let ctx = OpContext::new();
        let token = ctx.token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let res = ctx.run(std::future::pending::<Result<()>>()).await;
        assert!(matches!(res, Err(BlobError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = OpContext::with_timeout(Duration::from_millis(20));
        let res = ctx.run(std::future::pending::<Result<()>>()).await;
        assert!(matches!(res, Err(BlobError::DeadlineExceeded)));
        assert!(matches!(ctx.check(), Err(BlobError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = OpContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(matches!(child.check(), Err(BlobError::Cancelled)));
    }
}
