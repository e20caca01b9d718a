//! Per-address progress cursors
//!
//! The monitor reads a cursor before listing an address's signatures and
//! writes it after each signature is fully processed. Implementations must
//! keep the slot monotonically non-decreasing.

use dashmap::DashMap;
use solana_sdk::{clock::Slot, pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// How far monitoring of one address has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    /// Highest processed slot
    pub slot: Slot,

    /// Signature that moved the cursor to `slot`; `None` right after seeding
    pub signature: Option<Signature>,
}

impl CursorPosition {
    /// Position written when an address is first observed
    pub fn seeded(current_slot: Slot) -> Self {
        Self {
            slot: current_slot.saturating_sub(1),
            signature: None,
        }
    }

    pub fn at(slot: Slot, signature: Signature) -> Self {
        Self {
            slot,
            signature: Some(signature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor for {address} cannot move back from slot {current} to {attempted}")]
    Regression {
        address: Pubkey,
        current: Slot,
        attempted: Slot,
    },
}

/// Storage for per-address cursors
///
/// `get` returning `None` means the address has not been seen yet.
pub trait CursorStore: Send + Sync {
    fn get(&self, address: &Pubkey) -> Option<CursorPosition>;

    /// Record a new position; rejects a slot lower than the stored one
    fn set(&self, address: &Pubkey, position: CursorPosition) -> Result<(), CursorError>;
}

/// Process-lifetime cursor store; nothing survives a restart
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    cursors: DashMap<Pubkey, CursorPosition>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

impl CursorStore for InMemoryCursorStore {
    fn get(&self, address: &Pubkey) -> Option<CursorPosition> {
        self.cursors.get(address).map(|entry| *entry.value())
    }

    fn set(&self, address: &Pubkey, position: CursorPosition) -> Result<(), CursorError> {
        let mut entry = self.cursors.entry(*address).or_insert(position);
        if entry.slot > position.slot {
            return Err(CursorError::Regression {
                address: *address,
                current: entry.slot,
                attempted: position.slot,
            });
        }
        *entry = position;
        Ok(())
    }
}
