//! Retry with exponential backoff for transient vision faults.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use hygiene_core::{VisionAnalysisResult, VisionProviderKind};

use crate::config::duration_str;
use crate::ports::{AnalysisParams, VisionError, VisionProvider};

/// Retry policy for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retries
    pub max_attempts: usize,

    #[serde(with = "duration_str")]
    pub min_delay: Duration,

    #[serde(with = "duration_str")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }
}

/// Wraps a provider, retrying only faults that [`VisionError::is_retryable`].
pub struct RetryingVisionProvider {
    inner: Arc<dyn VisionProvider>,
    policy: RetryPolicy,
}

impl RetryingVisionProvider {
    pub fn new(inner: Arc<dyn VisionProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    fn notify(&self, err: &VisionError, delay: Duration) {
        tracing::warn!(
            provider = self.inner.name(),
            error = %err,
            delay = ?delay,
            "Vision call failed, retrying"
        );
    }
}

#[async_trait]
impl VisionProvider for RetryingVisionProvider {
    async fn analyze(
        &self,
        image: &[u8],
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        (|| async move { self.inner.analyze(image, params).await })
            .retry(self.policy.backoff())
            .when(VisionError::is_retryable)
            .notify(|err: &VisionError, delay: Duration| self.notify(err, delay))
            .await
    }

    async fn analyze_stored(
        &self,
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        (|| async move { self.inner.analyze_stored(bucket, key, params).await })
            .retry(self.policy.backoff())
            .when(VisionError::is_retryable)
            .notify(|err: &VisionError, delay: Duration| self.notify(err, delay))
            .await
    }

    fn kind(&self) -> VisionProviderKind {
        self.inner.kind()
    }

    fn model_version(&self) -> &str {
        self.inner.model_version()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Fails with the given error until `failures` calls have been made
    struct FlakyProvider {
        failures: usize,
        error: VisionError,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VisionProvider for FlakyProvider {
        async fn analyze(
            &self,
            _image: &[u8],
            _params: &AnalysisParams,
        ) -> Result<VisionAnalysisResult, VisionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(VisionAnalysisResult::new(vec![], VisionProviderKind::Rekognition, "3.0"))
            }
        }

        async fn analyze_stored(
            &self,
            _bucket: &str,
            _key: &str,
            params: &AnalysisParams,
        ) -> Result<VisionAnalysisResult, VisionError> {
            self.analyze(&[], params).await
        }

        fn kind(&self) -> VisionProviderKind {
            VisionProviderKind::Rekognition
        }

        fn model_version(&self) -> &str {
            "3.0"
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn flaky(failures: usize, error: VisionError) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            failures,
            error,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_retries_transient_faults() {
        let inner = flaky(2, VisionError::Http("connection reset".into()));
        let provider = RetryingVisionProvider::new(inner.clone(), fast_policy(3));

        let result = provider.analyze(b"img", &AnalysisParams::default()).await;
        assert!(result.is_ok());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = flaky(10, VisionError::Timeout(Duration::from_secs(1)));
        let provider = RetryingVisionProvider::new(inner.clone(), fast_policy(3));

        let result = provider.analyze_stored("b", "k", &AnalysisParams::default()).await;
        assert!(matches!(result, Err(VisionError::Timeout(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_faults_not_retried() {
        let inner = flaky(10, VisionError::Parse("bad json".into()));
        let provider = RetryingVisionProvider::new(inner.clone(), fast_policy(5));

        let result = provider.analyze(b"img", &AnalysisParams::default()).await;
        assert!(matches!(result, Err(VisionError::Parse(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_yaml() {
        let policy: RetryPolicy =
            serde_yaml::from_str("max_attempts: 4\nmin_delay: 100ms\nmax_delay: 2s\n").unwrap();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.min_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
    }
}
