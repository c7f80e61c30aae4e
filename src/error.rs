//! Error types for wastectl
//!
//! Library code uses `crate::error::Result<T>` which returns `WastectlError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling; conversion
//! happens at the CLI boundary and preserves error chains.
//!
//! ## Failure tiers
//!
//! - Transient provider failures (`CloudProvider`, `Io`) are retryable and go
//!   through the `RetryPolicy` in `src/retry.rs`.
//! - `PricingUnavailable` is the pricing resolver's single hard failure mode:
//!   neither the live API nor the static table knows the key. Scanners catch
//!   it and downgrade to a null-cost finding; it never crosses the scanner
//!   boundary.
//! - `ScannerUnavailable` means one resource kind could not be scanned at all
//!   (inventory listing failed after retries). The orchestrator records it
//!   and moves on to the next kind.
//! - Anything fatal before the first scanner runs (auth preflight) aborts the
//!   run and is reported through the notification path, not a report.

use crate::model::ResourceKind;
use thiserror::Error;

/// Main error type for wastectl
#[derive(Error, Debug)]
pub enum WastectlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cloud provider error: {provider} - {message}")]
    CloudProvider {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No price available for {kind} with signature '{signature}' in {region}")]
    PricingUnavailable {
        kind: ResourceKind,
        region: String,
        signature: String,
    },

    #[error("Scanner unavailable: {kind} - {message}")]
    ScannerUnavailable {
        kind: ResourceKind,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS SDK error: {0}")]
    Aws(String),

    #[error("Report store error: {0}")]
    ReportStore(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WastectlError {
    /// Wrap a provider SDK failure, keeping the original error as source.
    pub fn provider<E>(provider: &str, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WastectlError::CloudProvider {
            provider: provider.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WastectlError>;

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to determine whether an error
/// should trigger a retry attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for WastectlError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            WastectlError::Retryable { .. }
                | WastectlError::CloudProvider { .. }
                | WastectlError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_unavailable_is_not_retryable() {
        let err = WastectlError::PricingUnavailable {
            kind: ResourceKind::Volume,
            region: "us-east-1".to_string(),
            signature: "gp3".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cloud_provider_is_retryable() {
        let err = WastectlError::CloudProvider {
            provider: "ec2".to_string(),
            message: "throttled".to_string(),
            source: None,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_scanner_unavailable_is_not_retryable() {
        let err = WastectlError::ScannerUnavailable {
            kind: ResourceKind::Database,
            message: "inventory unreachable".to_string(),
            source: None,
        };
        assert!(!err.is_retryable());
    }
}
