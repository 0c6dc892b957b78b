//! Provider fallback chain.

use async_trait::async_trait;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;

use hygiene_core::{VisionAnalysisResult, VisionProviderKind};

use super::{CircuitBreaker, CircuitBreakerConfig};
use crate::ports::{AnalysisParams, VisionError, VisionProvider};

/// Tries providers in order, skipping any whose circuit is open.
///
/// Each chain position has its own circuit, so two providers with the same
/// name (say, two `http` endpoints) never share failure counts.
///
/// The first success wins. When every provider fails (or is skipped) the
/// collected reasons come back as [`VisionError::AllProvidersFailed`]; a
/// failure is never turned into an empty result.
pub struct FallbackVisionProvider {
    providers: Vec<Arc<dyn VisionProvider>>,
    circuit_keys: Vec<String>,
    circuit_breaker: CircuitBreaker,
}

impl FallbackVisionProvider {
    /// Chain providers, primary first.
    pub fn new(
        providers: Vec<Arc<dyn VisionProvider>>,
        config: CircuitBreakerConfig,
    ) -> Result<Self, VisionError> {
        if providers.is_empty() {
            return Err(VisionError::NotConfigured(
                "fallback chain needs at least one provider".to_string(),
            ));
        }
        let circuit_keys = providers
            .iter()
            .enumerate()
            .map(|(index, provider)| format!("{}#{}", provider.name(), index))
            .collect();
        Ok(Self {
            providers,
            circuit_keys,
            circuit_breaker: CircuitBreaker::new(config),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Circuit breaker key of the provider at `index` in the chain.
    pub fn circuit_key(&self, index: usize) -> Option<&str> {
        self.circuit_keys.get(index).map(String::as_str)
    }

    fn primary(&self) -> &Arc<dyn VisionProvider> {
        // Non-empty, checked in `new`
        &self.providers[0]
    }

    async fn run<'a, F, Fut>(&'a self, call: F) -> Result<VisionAnalysisResult, VisionError>
    where
        F: Fn(&'a Arc<dyn VisionProvider>) -> Fut,
        Fut: Future<Output = Result<VisionAnalysisResult, VisionError>>,
    {
        let mut errors = Vec::new();

        for (provider, circuit) in self.providers.iter().zip(&self.circuit_keys) {
            let name = provider.name();

            if self.circuit_breaker.is_open(circuit) {
                tracing::warn!(provider = name, "Circuit open, skipping vision provider");
                errors.push(VisionError::CircuitOpen(name.to_string()).to_string());
                continue;
            }

            match call(provider).await {
                Ok(result) => {
                    self.circuit_breaker.record_success(circuit);
                    if !errors.is_empty() {
                        tracing::info!(provider = name, skipped = errors.len(), "Vision fallback succeeded");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    tracing::warn!(provider = name, error = %err, "Vision provider failed, trying next");
                    self.circuit_breaker.record_failure(circuit);
                    errors.push(format!("{}: {}", name, err));
                }
            }
        }

        Err(VisionError::AllProvidersFailed(errors))
    }
}

#[async_trait]
impl VisionProvider for FallbackVisionProvider {
    async fn analyze(
        &self,
        image: &[u8],
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        self.run(|provider| provider.analyze(image, params)).await
    }

    async fn analyze_stored(
        &self,
        bucket: &str,
        key: &str,
        params: &AnalysisParams,
    ) -> Result<VisionAnalysisResult, VisionError> {
        self.run(|provider| provider.analyze_stored(bucket, key, params))
            .await
    }

    fn kind(&self) -> VisionProviderKind {
        self.primary().kind()
    }

    fn model_version(&self) -> &str {
        self.primary().model_version()
    }

    fn name(&self) -> &str {
        "fallback"
    }

    /// Healthy when any provider in the chain is; all are probed at once.
    async fn health_check(&self) -> bool {
        join_all(self.providers.iter().map(|provider| provider.health_check()))
            .await
            .into_iter()
            .any(|healthy| healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        name: &'static str,
        kind: VisionProviderKind,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(name: &'static str, kind: VisionProviderKind, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                kind,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VisionProvider for StubProvider {
        async fn analyze(
            &self,
            _image: &[u8],
            _params: &AnalysisParams,
        ) -> Result<VisionAnalysisResult, VisionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(VisionError::Api {
                    status: 500,
                    message: "internal".to_string(),
                })
            } else {
                Ok(VisionAnalysisResult::new(vec![], self.kind.clone(), "v1"))
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
            self.kind.clone()
        }

        fn model_version(&self) -> &str {
            "v1"
        }

        fn name(&self) -> &str {
            self.name
        }

        async fn health_check(&self) -> bool {
            !self.fail
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let primary = StubProvider::new("primary", VisionProviderKind::Rekognition, true);
        let backup = StubProvider::new("backup", VisionProviderKind::OnDevice, false);
        let chain = FallbackVisionProvider::new(
            vec![primary.clone(), backup.clone()],
            CircuitBreakerConfig::default(),
        )
        .unwrap();

        let result = chain.analyze(b"img", &AnalysisParams::default()).await.unwrap();

        // The audit records the backend that actually answered
        assert_eq!(result.provider, VisionProviderKind::OnDevice);
        assert_eq!(chain.kind(), VisionProviderKind::Rekognition);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert!(chain.health_check().await);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_provider() {
        let primary = StubProvider::new("primary", VisionProviderKind::Rekognition, true);
        let backup = StubProvider::new("backup", VisionProviderKind::OnDevice, false);
        let chain = FallbackVisionProvider::new(
            vec![primary.clone(), backup.clone()],
            CircuitBreakerConfig {
                failure_threshold: 1,
                ..Default::default()
            },
        )
        .unwrap();

        chain.analyze_stored("b", "k", &AnalysisParams::default()).await.unwrap();
        chain.analyze_stored("b", "k", &AnalysisParams::default()).await.unwrap();

        // Second call never reaches the primary
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backup.calls.load(Ordering::SeqCst), 2);
        assert_eq!(chain.circuit_key(0), Some("primary#0"));
        assert!(chain.circuit_breaker().is_open("primary#0"));
        assert!(!chain.circuit_breaker().is_open("backup#1"));
    }

    #[tokio::test]
    async fn test_same_named_providers_have_separate_circuits() {
        let primary = StubProvider::new("http", VisionProviderKind::LlmVision, true);
        let backup = StubProvider::new("http", VisionProviderKind::LlmVision, false);
        let chain = FallbackVisionProvider::new(
            vec![primary.clone(), backup.clone()],
            CircuitBreakerConfig::default(),
        )
        .unwrap();

        for _ in 0..10 {
            chain.analyze(b"img", &AnalysisParams::default()).await.unwrap();
        }

        // The backup's successes must not keep the dead primary's circuit closed
        let threshold = CircuitBreakerConfig::default().failure_threshold as usize;
        assert_eq!(primary.calls.load(Ordering::SeqCst), threshold);
        assert_eq!(backup.calls.load(Ordering::SeqCst), 10);
        assert!(chain.circuit_breaker().is_open("http#0"));
        assert!(!chain.circuit_breaker().is_open("http#1"));
    }

    #[tokio::test]
    async fn test_all_failed_is_an_error() {
        let chain = FallbackVisionProvider::new(
            vec![
                StubProvider::new("a", VisionProviderKind::Rekognition, true),
                StubProvider::new("b", VisionProviderKind::OnDevice, true),
            ],
            CircuitBreakerConfig::default(),
        )
        .unwrap();

        match chain.analyze(b"img", &AnalysisParams::default()).await {
            Err(VisionError::AllProvidersFailed(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].starts_with("a: "));
            }
            other => panic!("Expected AllProvidersFailed, got {:?}", other),
        }
        assert!(!chain.health_check().await);
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(FallbackVisionProvider::new(vec![], CircuitBreakerConfig::default()).is_err());
    }
}
