//! Copy Mirror - Solana address mirroring agent
//!
//! Watches a set of addresses and replays their native SOL transfers from
//! an operator wallet. The binary wires these modules together; they are
//! exposed here for testing and integration purposes.

pub mod balance;
pub mod config;
pub mod cursor;
pub mod endpoints;
pub mod metrics;
pub mod monitor;
pub mod sniffer;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
