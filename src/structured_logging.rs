//! Structured logging for replication events

use solana_sdk::{clock::Slot, pubkey::Pubkey, signature::Signature};
use uuid::Uuid;

use crate::types::{lamports_to_sol, ReplicationOutcome};

/// Structured logger scoped to one monitor tick
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
}

impl StructuredLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    /// Logger with a fresh context id
    pub fn for_tick() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_cursor_seeded(&self, address: &Pubkey, slot: Slot) {
        tracing::info!(
            context_id = %self.context_id,
            address = %address,
            slot = %slot,
            "Tracking initialized"
        );
    }

    pub fn log_new_signature(&self, address: &Pubkey, signature: &Signature, slot: Slot) {
        tracing::info!(
            context_id = %self.context_id,
            address = %address,
            signature = %signature,
            slot = %slot,
            "New transaction detected"
        );
    }

    pub fn log_transfer_translated(&self, destination: &Pubkey, lamports: u64) {
        tracing::info!(
            context_id = %self.context_id,
            destination = %destination,
            lamports = %lamports,
            sol = %lamports_to_sol(lamports),
            "Transfer instruction added"
        );
    }

    pub fn log_outcome(&self, address: &Pubkey, source: &Signature, outcome: &ReplicationOutcome) {
        match outcome {
            ReplicationOutcome::Submitted {
                signature,
                instructions,
            } => tracing::info!(
                context_id = %self.context_id,
                address = %address,
                source = %source,
                signature = %signature,
                instructions = %instructions,
                "Transaction replicated"
            ),
            ReplicationOutcome::Skipped(reason) => tracing::info!(
                context_id = %self.context_id,
                address = %address,
                source = %source,
                reason = %reason,
                "Replication skipped"
            ),
            ReplicationOutcome::Failed(err) => tracing::warn!(
                context_id = %self.context_id,
                address = %address,
                source = %source,
                stage = %err.stage(),
                retryable = err.is_retryable(),
                error = %err,
                "Replication failed"
            ),
        }
    }

    pub fn log_fetch_deferred(&self, signature: &Signature, attempt: u32, max_attempts: u32) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            attempt = %attempt,
            max_attempts = %max_attempts,
            "Transaction detail unavailable, retrying next tick"
        );
    }

    pub fn log_fetch_abandoned(&self, address: &Pubkey, signature: &Signature, attempts: u32) {
        tracing::error!(
            context_id = %self.context_id,
            address = %address,
            signature = %signature,
            attempts = %attempts,
            "Giving up on transaction detail, transaction will not be replicated"
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            context_id = %self.context_id,
            message = %message,
            "Error"
        );
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::for_tick()
    }
}
