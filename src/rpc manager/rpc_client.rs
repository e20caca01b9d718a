//! `solana-client` backed implementation of [`LedgerRpc`]

use async_trait::async_trait;
use solana_client::{
    client_error::ClientError, nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
};
use solana_rpc_client_api::config::RpcTransactionConfig;
use solana_sdk::{
    clock::Slot, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use super::{LedgerRpc, RpcManagerError, RpcResult};
use crate::sniffer::decoder::decode_transaction;
use crate::types::{ParsedTransaction, SignatureInfo};

/// Versioned transactions up to v0 are returned by `getTransaction`
const MAX_SUPPORTED_TRANSACTION_VERSION: u8 = 0;

/// Ledger RPC over a single HTTP endpoint
pub struct SolanaLedgerRpc {
    client: RpcClient,
    endpoint: String,
    commitment: CommitmentConfig,
}

impl SolanaLedgerRpc {
    pub fn new(endpoint: &str, commitment: CommitmentConfig, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout_and_commitment(
                endpoint.to_string(),
                timeout,
                commitment,
            ),
            endpoint: endpoint.to_string(),
            commitment,
        }
    }

    fn map_err(&self, err: ClientError) -> RpcManagerError {
        RpcManagerError::from_client_error(err, &self.endpoint)
    }
}

/// `getTransaction` answers `null` for unknown or pruned signatures, which the
/// client surfaces as a deserialization failure
fn is_missing_transaction(err: &ClientError) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("invalid type: null") || msg.contains("transaction not found")
}

#[async_trait]
impl LedgerRpc for SolanaLedgerRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_slot(&self) -> RpcResult<Slot> {
        self.client.get_slot().await.map_err(|e| self.map_err(e))
    }

    async fn get_balance(&self, address: &Pubkey) -> RpcResult<u64> {
        self.client
            .get_balance(address)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        until: Option<Signature>,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        let statuses = self
            .client
            .get_signatures_for_address_with_config(
                address,
                GetConfirmedSignaturesForAddress2Config {
                    before: None,
                    until,
                    limit: Some(limit),
                    commitment: Some(self.commitment),
                },
            )
            .await
            .map_err(|e| self.map_err(e))?;

        let mut infos = Vec::with_capacity(statuses.len());
        for status in statuses {
            match Signature::from_str(&status.signature) {
                Ok(signature) => infos.push(SignatureInfo {
                    signature,
                    slot: status.slot,
                    failed: status.err.is_some(),
                }),
                Err(e) => {
                    warn!(
                        address = %address,
                        signature = %status.signature,
                        error = %e,
                        "Dropping unparsable signature from listing"
                    );
                }
            }
        }
        Ok(infos)
    }

    async fn get_parsed_transaction(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<ParsedTransaction>> {
        let result = self
            .client
            .get_transaction_with_config(
                signature,
                RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::JsonParsed),
                    commitment: Some(self.commitment),
                    max_supported_transaction_version: Some(MAX_SUPPORTED_TRANSACTION_VERSION),
                },
            )
            .await;

        let encoded = match result {
            Ok(encoded) => encoded,
            Err(e) if is_missing_transaction(&e) => {
                debug!(signature = %signature, "Transaction not available from node");
                return Ok(None);
            }
            Err(e) => return Err(self.map_err(e)),
        };

        match decode_transaction(*signature, encoded) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!(signature = %signature, error = %e, "Malformed transaction detail");
                Ok(None)
            }
        }
    }

    async fn get_latest_blockhash(&self) -> RpcResult<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> RpcResult<Signature> {
        self.client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(|e| self.map_err(e))
    }
}
