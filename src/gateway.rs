//! Enrichment gateway boundary
//!
//! The engine never fetches market data itself; it calls this capability
//! and the concrete transport (HTTP, RPC, cache) lives outside the core.
//! Every failure mode is recoverable: the coordinator skips tier
//! advancement for the cycle and the next mention retries.

use crate::types::EnrichmentSnapshot;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure modes an enrichment source can signal. A deadline expiry on
/// the caller side is reported as `Timeout` as well.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment deadline exceeded")]
    Timeout,

    #[error("enrichment source unavailable: {0}")]
    Unavailable(String),

    #[error("unknown or invalid token: {0}")]
    InvalidToken(String),
}

/// Capability to obtain current market/on-chain metrics for a token.
///
/// Implementations must respect `deadline` as an upper bound on the call;
/// the coordinator additionally enforces it from the outside.
#[async_trait]
pub trait EnrichmentGateway: Send + Sync {
    async fn fetch_snapshot(
        &self,
        token: &str,
        deadline: Duration,
    ) -> Result<EnrichmentSnapshot, EnrichmentError>;
}

/// Gateway stub that always reports the source as unavailable. Lets the
/// engine run social-only (T1) until a real collaborator is wired in.
pub struct NullEnrichmentGateway;

#[async_trait]
impl EnrichmentGateway for NullEnrichmentGateway {
    async fn fetch_snapshot(
        &self,
        _token: &str,
        _deadline: Duration,
    ) -> Result<EnrichmentSnapshot, EnrichmentError> {
        Err(EnrichmentError::Unavailable(
            "no enrichment gateway configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_gateway_reports_unavailable() {
        let gw = NullEnrichmentGateway;
        let err = gw
            .fetch_snapshot("tok", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichmentError::Unavailable(_)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            EnrichmentError::Timeout.to_string(),
            "enrichment deadline exceeded"
        );
    }
}
