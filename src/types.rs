//! Common types used throughout the mirror agent

use serde::{Deserialize, Serialize};
use solana_sdk::{
    clock::Slot, instruction::Instruction, native_token::LAMPORTS_PER_SOL, pubkey::Pubkey,
    signature::Signature,
};
use std::fmt;

use crate::tx_builder::SubmitError;

/// Convert lamports to SOL for display purposes only
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// A confirmed signature returned by the address listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    /// Transaction signature
    pub signature: Signature,

    /// Slot the transaction was confirmed in
    pub slot: Slot,

    /// Whether the transaction failed on chain
    pub failed: bool,
}

impl SignatureInfo {
    pub fn new(signature: Signature, slot: Slot) -> Self {
        Self {
            signature,
            slot,
            failed: false,
        }
    }
}

/// Decoded transaction body, fetched fresh per signature
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub signature: Signature,
    pub slot: Slot,

    /// Instructions in message order
    pub instructions: Vec<SourceInstruction>,
}

/// One instruction of a watched transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInstruction {
    /// Target program
    pub program_id: Pubkey,

    /// Typed payload where the node could decode it
    pub payload: InstructionPayload,
}

impl SourceInstruction {
    pub fn transfer(source: Pubkey, destination: Pubkey, lamports: u64) -> Self {
        Self {
            program_id: solana_sdk::system_program::id(),
            payload: InstructionPayload::Transfer(TransferPayload {
                source,
                destination,
                lamports,
            }),
        }
    }

    pub fn other(program_id: Pubkey, kind: impl Into<String>) -> Self {
        Self {
            program_id,
            payload: InstructionPayload::Parsed { kind: kind.into() },
        }
    }
}

/// Instruction payload as reported by the node
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionPayload {
    /// Native value transfer
    Transfer(TransferPayload),
    /// Parsed instruction of a type the agent does not replicate
    Parsed { kind: String },
    /// The node returned raw instruction data
    Undecoded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPayload {
    pub source: Pubkey,
    pub destination: Pubkey,
    pub lamports: u64,
}

/// An instruction rebuilt around the operator key, ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedInstruction {
    pub instruction: Instruction,

    /// Position of the source instruction in the watched transaction
    pub source_index: usize,

    pub destination: Pubkey,
    pub lamports: u64,
}

/// Why a signature was processed without submitting anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No instruction in the transaction could be translated
    NothingToReplicate,
    /// The watched transaction failed on chain, there is no effect to copy
    SourceFailed,
    /// The node never returned the transaction detail
    Unfetchable { attempts: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToReplicate => write!(f, "nothing to replicate"),
            Self::SourceFailed => write!(f, "source transaction failed"),
            Self::Unfetchable { attempts } => {
                write!(f, "transaction detail unavailable after {} attempts", attempts)
            }
        }
    }
}

/// Result of replicating one watched transaction
#[derive(Debug, Clone)]
pub enum ReplicationOutcome {
    /// The mirror transaction was confirmed
    Submitted {
        signature: Signature,
        instructions: usize,
    },
    /// Processed without submitting
    Skipped(SkipReason),
    /// Submission was attempted and failed
    Failed(SubmitError),
}

impl ReplicationOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ReplicationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted {
                signature,
                instructions,
            } => write!(f, "submitted {} ({} instructions)", signature, instructions),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
            Self::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}
