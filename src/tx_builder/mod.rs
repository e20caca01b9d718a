//! Mirror transaction builder
//!
//! ## Architecture
//!
//! - **instructions**: translation of watched instructions into
//!   operator-signed equivalents (native transfers only)
//! - **submit**: blockhash fetch, single-transaction assembly with the
//!   operator as fee payer, signing, send-and-confirm
//! - **errors**: submission error taxonomy
//!
//! Failures never escape the builder: the submitter turns them into
//! `ReplicationOutcome::Failed` so the monitor can keep going.

// Public API - Error types
pub mod errors;
pub use errors::SubmitError;

pub mod instructions;
pub mod submit;

pub use instructions::{InstructionTranslator, Translation};
pub use submit::TransactionSubmitter;
