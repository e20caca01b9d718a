//! Signature listing and transaction detail lookup for watched addresses

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::sync::Arc;

use crate::cursor::CursorPosition;
use crate::rpc_manager::{LedgerRpc, RpcResult};
use crate::types::{ParsedTransaction, SignatureInfo};

pub struct TransactionFetcher {
    rpc: Arc<dyn LedgerRpc>,
}

impl TransactionFetcher {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }

    /// Most recent confirmed signatures of `address`, newest first
    ///
    /// The node bounds the listing by the cursor's signature when one is
    /// known; that bound is not a slot filter, so callers still pass the
    /// result through [`pending_signatures`].
    pub async fn list_new_signatures(
        &self,
        address: &Pubkey,
        since: &CursorPosition,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        self.rpc
            .get_signatures_for_address(address, since.signature, limit)
            .await
    }

    /// Parsed detail of one signature; `Ok(None)` when the node cannot supply it
    pub async fn fetch_parsed(&self, signature: &Signature) -> RpcResult<Option<ParsedTransaction>> {
        self.rpc.get_parsed_transaction(signature).await
    }
}

/// Drop signatures already covered by `since` and order the rest by ascending slot
///
/// Once the cursor carries a signature the listing already stops before it,
/// so signatures sharing the cursor's slot are still pending. A freshly
/// seeded cursor has no such bound and everything at its slot is history.
///
/// The listing is reversed first so signatures sharing a slot are replayed
/// in the order they were confirmed.
pub fn pending_signatures(newest_first: Vec<SignatureInfo>, since: &CursorPosition) -> Vec<SignatureInfo> {
    let bounded = since.signature.is_some();
    let mut pending: Vec<_> = newest_first
        .into_iter()
        .filter(|info| info.slot > since.slot || (bounded && info.slot == since.slot))
        .filter(|info| Some(info.signature) != since.signature)
        .collect();
    pending.reverse();
    pending.sort_by_key(|info| info.slot);
    pending
}
