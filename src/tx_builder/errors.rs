//! Error types for mirror transaction submission
//!
//! Every failure between "instructions translated" and "transaction
//! confirmed" is captured here so the submitter can turn it into a
//! `ReplicationOutcome::Failed` instead of propagating it.

use thiserror::Error;

use crate::rpc_manager::RpcManagerError;

/// Error type for a single mirror submission
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    /// Failed to fetch a fresh blockhash
    ///
    /// The transaction was never assembled
    #[error("Blockhash error: {0}")]
    Blockhash(RpcManagerError),

    /// Failed to sign the assembled transaction
    ///
    /// This can indicate:
    /// - The operator key is not a required signer of the message
    /// - The key does not match the fee payer
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Submission or confirmation failed
    ///
    /// The transaction may or may not have landed; the underlying
    /// send-and-confirm primitive already exhausted its own retries
    #[error("Submission failed: {0}")]
    Submission(RpcManagerError),
}

impl SubmitError {
    /// Get the failing stage for metrics and observability
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Blockhash(_) => "blockhash",
            Self::Signing(_) => "signing",
            Self::Submission(_) => "submission",
        }
    }

    /// Check if a later attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blockhash(err) | Self::Submission(err) => err.is_retryable(),
            Self::Signing(_) => false,
        }
    }
}
