//! RPC Manager Module
//!
//! Narrow async interface over the ledger RPC surface the agent consumes,
//! plus the `solana-client` backed implementation.

use async_trait::async_trait;
use solana_sdk::{
    clock::Slot, hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};

use crate::types::{ParsedTransaction, SignatureInfo};

// Submodules
pub mod rpc_client;
pub mod rpc_errors;

// Re-exports for convenience
pub use rpc_client::SolanaLedgerRpc;
pub use rpc_errors::RpcManagerError;

pub type RpcResult<T> = std::result::Result<T, RpcManagerError>;

/// Ledger RPC calls used by the monitor, fetcher, submitter and balance check
///
/// Every method is a suspension point; callers await each one before
/// issuing the next.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Endpoint identifier for logs
    fn endpoint(&self) -> &str;

    /// Current slot at the configured commitment
    async fn get_slot(&self) -> RpcResult<Slot>;

    /// Balance of an account in lamports
    async fn get_balance(&self, address: &Pubkey) -> RpcResult<u64>;

    /// Up to `limit` most recent confirmed signatures for `address`, newest
    /// first, stopping before `until` when given
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        until: Option<Signature>,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>>;

    /// Parsed transaction detail; `Ok(None)` when the node cannot supply it
    async fn get_parsed_transaction(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<ParsedTransaction>>;

    async fn get_latest_blockhash(&self) -> RpcResult<Hash>;

    /// Submit a signed transaction and wait for confirmation
    async fn send_and_confirm_transaction(&self, transaction: &Transaction)
        -> RpcResult<Signature>;
}
