//! Coordinator error types

use confidential_rarity_primitives::RegistryError;
use thiserror::Error;

/// Errors surfaced by coordinator flows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    /// Terminal rejection by the registry. State is unchanged.
    #[error("registry rejected the call: {0}")]
    Registry(#[from] RegistryError),

    // Oracle errors
    #[error("decryption oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("decryption oracle did not answer within {0} ms")]
    OracleTimeout(u64),

    #[error("oracle response has no cleartext for handle {0}")]
    MissingCleartext(String),

    // Encryption errors
    #[error("encryption failed: {0}")]
    Encryption(String),

    // Ledger errors
    #[error("ledger transport failure: {0}")]
    TransportFailure(String),

    #[error("no reveal observed within {0} ms")]
    ObserveTimeout(u64),

    // Input errors
    #[error("descriptor is {0} bytes, above the registry limit")]
    DescriptorTooLong(usize),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoordinatorError {
    /// Whether the same request may be repeated unchanged.
    ///
    /// A retryable failure after submission never means the reveal was
    /// lost: repeating `request_reveal` converges through the revealed-record
    /// short circuit.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoordinatorError::OracleUnavailable(_)
                | CoordinatorError::OracleTimeout(_)
                | CoordinatorError::TransportFailure(_)
                | CoordinatorError::ObserveTimeout(_)
        )
    }

    /// The registry failure kind, if the registry rejected the call.
    pub fn registry_error(&self) -> Option<RegistryError> {
        match self {
            CoordinatorError::Registry(e) => Some(*e),
            _ => None,
        }
    }
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
