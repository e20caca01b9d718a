//! Test Utilities Module
//!
//! Scripted in-memory ledger for deterministic tests of the fetcher,
//! submitter and monitor. Every call is recorded so tests can assert which
//! RPC operations a tick performed.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    clock::Slot, hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rpc_manager::{LedgerRpc, RpcManagerError, RpcResult};
use crate::types::{ParsedTransaction, SignatureInfo, SourceInstruction};

/// Distinct signature for test fixtures
pub fn unique_signature() -> Signature {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut bytes = [0u8; 64];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    bytes[63] = 0xA5;
    Signature::from(bytes)
}

/// One recorded RPC call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    GetSlot,
    GetBalance(Pubkey),
    ListSignatures {
        address: Pubkey,
        until: Option<Signature>,
        limit: usize,
    },
    GetTransaction(Signature),
    GetLatestBlockhash,
    SendAndConfirm,
}

#[derive(Default)]
struct LedgerState {
    slot: Slot,
    balances: HashMap<Pubkey, u64>,
    /// Per address, newest first
    signatures: HashMap<Pubkey, Vec<SignatureInfo>>,
    transactions: HashMap<Signature, ParsedTransaction>,
    listing_errors: HashMap<Pubkey, RpcManagerError>,
    fetch_errors: HashMap<Signature, RpcManagerError>,
    slot_error: Option<RpcManagerError>,
    balance_error: Option<RpcManagerError>,
    blockhash_error: Option<RpcManagerError>,
    submit_error: Option<RpcManagerError>,
    one_shot_submit_errors: VecDeque<RpcManagerError>,
    sent: Vec<Transaction>,
    calls: Vec<LedgerCall>,
}

/// Mock ledger implementing [`LedgerRpc`]
pub struct MockLedger {
    state: Mutex<LedgerState>,
    blockhash: Hash,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            blockhash: Hash::new_unique(),
        }
    }

    pub fn with_slot(slot: Slot) -> Self {
        let ledger = Self::new();
        ledger.set_slot(slot);
        ledger
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn set_slot(&self, slot: Slot) {
        self.state.lock().slot = slot;
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.state.lock().balances.insert(address, lamports);
    }

    /// Record a confirmed transaction of `address` at `slot` carrying
    /// `instructions`; returns its signature
    pub fn push_transaction(
        &self,
        address: &Pubkey,
        slot: Slot,
        instructions: Vec<SourceInstruction>,
    ) -> Signature {
        let signature = self.push_signature(address, slot);
        self.add_transaction(ParsedTransaction {
            signature,
            slot,
            instructions,
        });
        signature
    }

    /// Record a signature without transaction detail
    pub fn push_signature(&self, address: &Pubkey, slot: Slot) -> Signature {
        let signature = unique_signature();
        self.push_signature_info(address, SignatureInfo::new(signature, slot));
        signature
    }

    /// Insert a listing entry keeping the list newest first by slot; within
    /// a slot the latest push counts as the most recent confirmation
    pub fn push_signature_info(&self, address: &Pubkey, info: SignatureInfo) {
        let mut state = self.state.lock();
        let list = state.signatures.entry(*address).or_default();
        let pos = list
            .iter()
            .position(|existing| existing.slot <= info.slot)
            .unwrap_or(list.len());
        list.insert(pos, info);
    }

    /// Replace the listing of `address` verbatim (newest first)
    pub fn set_listing(&self, address: &Pubkey, listing: Vec<SignatureInfo>) {
        self.state.lock().signatures.insert(*address, listing);
    }

    pub fn add_transaction(&self, tx: ParsedTransaction) {
        self.state.lock().transactions.insert(tx.signature, tx);
    }

    pub fn fail_slot(&self, err: RpcManagerError) {
        self.state.lock().slot_error = Some(err);
    }

    pub fn fail_balance(&self, err: RpcManagerError) {
        self.state.lock().balance_error = Some(err);
    }

    pub fn fail_listing(&self, address: &Pubkey, err: RpcManagerError) {
        self.state.lock().listing_errors.insert(*address, err);
    }

    pub fn fail_fetch(&self, signature: &Signature, err: RpcManagerError) {
        self.state.lock().fetch_errors.insert(*signature, err);
    }

    pub fn fail_blockhash(&self, err: RpcManagerError) {
        self.state.lock().blockhash_error = Some(err);
    }

    /// Every submission fails with `err`
    pub fn fail_submissions(&self, err: RpcManagerError) {
        self.state.lock().submit_error = Some(err);
    }

    /// Only the next submission fails with `err`
    pub fn fail_next_submission(&self, err: RpcManagerError) {
        self.state.lock().one_shot_submit_errors.push_back(err);
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state.lock().sent.clone()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Signatures whose detail was requested, in call order
    pub fn fetched_signatures(&self) -> Vec<Signature> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::GetTransaction(sig) => Some(sig),
                _ => None,
            })
            .collect()
    }

    pub fn count_calls(&self, predicate: impl Fn(&LedgerCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    fn endpoint(&self) -> &str {
        "mock://ledger"
    }

    async fn get_slot(&self) -> RpcResult<Slot> {
        let mut state = self.state.lock();
        state.calls.push(LedgerCall::GetSlot);
        match &state.slot_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.slot),
        }
    }

    async fn get_balance(&self, address: &Pubkey) -> RpcResult<u64> {
        let mut state = self.state.lock();
        state.calls.push(LedgerCall::GetBalance(*address));
        if let Some(err) = &state.balance_error {
            return Err(err.clone());
        }
        Ok(state.balances.get(address).copied().unwrap_or_default())
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        until: Option<Signature>,
        limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        let mut state = self.state.lock();
        state.calls.push(LedgerCall::ListSignatures {
            address: *address,
            until,
            limit,
        });
        if let Some(err) = state.listing_errors.get(address) {
            return Err(err.clone());
        }
        let listing = state.signatures.get(address).cloned().unwrap_or_default();
        Ok(listing
            .into_iter()
            .take_while(|info| Some(info.signature) != until)
            .take(limit)
            .collect())
    }

    async fn get_parsed_transaction(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<ParsedTransaction>> {
        let mut state = self.state.lock();
        state.calls.push(LedgerCall::GetTransaction(*signature));
        if let Some(err) = state.fetch_errors.get(signature) {
            return Err(err.clone());
        }
        Ok(state.transactions.get(signature).cloned())
    }

    async fn get_latest_blockhash(&self) -> RpcResult<Hash> {
        let mut state = self.state.lock();
        state.calls.push(LedgerCall::GetLatestBlockhash);
        match &state.blockhash_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.blockhash),
        }
    }

    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> RpcResult<Signature> {
        let mut state = self.state.lock();
        state.calls.push(LedgerCall::SendAndConfirm);
        if let Some(err) = state.one_shot_submit_errors.pop_front() {
            return Err(err);
        }
        if let Some(err) = &state.submit_error {
            return Err(err.clone());
        }
        state.sent.push(transaction.clone());
        Ok(transaction.signatures[0])
    }
}
