//! Per-call cancellation and timeout
//!
//! A [`CallContext`] travels with one operation. Cancelling its token or
//! letting its timeout expire drops the in-flight request future, which
//! closes the underlying connection.

use crate::error::IconError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie this call to an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `operation` to completion unless cancelled or timed out first.
    ///
    /// An already-cancelled context never polls `operation`.
    pub async fn run<F, T>(&self, operation: F) -> Result<T, IconError>
    where
        F: Future<Output = Result<T, IconError>>,
    {
        if self.is_cancelled() {
            return Err(IconError::Cancelled);
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, operation).await {
                    Ok(result) => result,
                    Err(_) => Err(IconError::transport(format!(
                        "request timed out after {}ms",
                        limit.as_millis()
                    ))),
                },
                None => operation.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(IconError::Cancelled),
            result = bounded => result,
        }
    }
}
