//! Assembly, signing and submission of mirror transactions
//!
//! One watched transaction produces at most one mirror transaction. The
//! operator pays the fee and signs; confirmation relies entirely on the
//! client's send-and-confirm retry policy.

use nonempty::NonEmpty;
use solana_sdk::{signature::Signature, transaction::Transaction};
use std::sync::Arc;
use tracing::debug;

use super::errors::SubmitError;
use crate::metrics::{metrics, Timer};
use crate::rpc_manager::LedgerRpc;
use crate::types::{ReplicationOutcome, TranslatedInstruction};
use crate::wallet::WalletManager;

pub struct TransactionSubmitter {
    rpc: Arc<dyn LedgerRpc>,
    wallet: WalletManager,
}

impl TransactionSubmitter {
    pub fn new(rpc: Arc<dyn LedgerRpc>, wallet: WalletManager) -> Self {
        Self { rpc, wallet }
    }

    /// Submit translated instructions; never returns an error, failures become
    /// `ReplicationOutcome::Failed`
    pub async fn submit(&self, instructions: &NonEmpty<TranslatedInstruction>) -> ReplicationOutcome {
        let timer = Timer::new();
        let result = self.try_submit(instructions).await;
        timer.observe_duration(&metrics().submit_latency);

        match result {
            Ok(signature) => ReplicationOutcome::Submitted {
                signature,
                instructions: instructions.len(),
            },
            Err(err) => ReplicationOutcome::Failed(err),
        }
    }

    async fn try_submit(
        &self,
        instructions: &NonEmpty<TranslatedInstruction>,
    ) -> Result<Signature, SubmitError> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(SubmitError::Blockhash)?;

        let payer = self.wallet.pubkey();
        let ixs: Vec<_> = instructions.iter().map(|t| t.instruction.clone()).collect();
        let mut tx = Transaction::new_with_payer(&ixs, Some(&payer));
        tx.try_sign(&[self.wallet.keypair()], blockhash)
            .map_err(|e| SubmitError::Signing(e.to_string()))?;

        debug!(
            payer = %payer,
            instructions = ixs.len(),
            blockhash = %blockhash,
            "Sending mirror transaction"
        );

        self.rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(SubmitError::Submission)
    }
}
