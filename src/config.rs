//! Configuration module for the mirror agent
//!
//! This module handles configuration loading from TOML files, `.env`
//! overrides and validation of the watched wallet list.

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::monitor::MonitorSettings;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Operator wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Watched wallets and loop tuning
    pub monitor: MonitorConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint used for every ledger call
    pub endpoint: String,

    /// Commitment level: processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Base58 encoded secret key; `PRIVATE_KEY` takes precedence
    #[serde(default)]
    pub private_key: Option<String>,

    /// Path to keypair file
    #[serde(default)]
    pub keypair_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Base58 addresses to mirror, processed in this order
    pub wallets: Vec<String>,

    /// Delay between ticks in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Signatures listed per address per tick
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,

    /// Reserved for repricing non-native instructions
    #[serde(default = "default_slippage")]
    pub slippage_tolerance: f64,

    /// Detail lookups per signature before it is skipped
    #[serde(default = "default_max_fetch_attempts")]
    pub max_fetch_attempts: u32,

    /// Operator balance (SOL) below which startup warns
    #[serde(default = "default_low_balance")]
    pub low_balance_sol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_commitment() -> String { "confirmed".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_poll_interval() -> u64 { 2_000 }
fn default_signature_limit() -> usize { 10 }
fn default_slippage() -> f64 { 0.5 }
fn default_max_fetch_attempts() -> u32 { 3 }
fn default_low_balance() -> f64 { 0.01 }
fn default_metrics_port() -> u16 { 9090 }
fn default_true() -> bool { true }

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("monitor.wallets is empty")]
    NoWallets,

    #[error("invalid watched wallet {address:?}: {reason}")]
    InvalidWallet { address: String, reason: String },

    #[error("unknown commitment level {0:?}")]
    InvalidCommitment(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("monitor.slippage_tolerance must not be negative, got {0}")]
    NegativeSlippage(f64),
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration after applying `.env` to the process environment
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Reject configurations the monitor cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.wallets.is_empty() {
            return Err(ConfigError::NoWallets);
        }
        self.watched_addresses()?;
        self.commitment()?;

        if self.monitor.signature_limit == 0 {
            return Err(ConfigError::Zero { field: "monitor.signature_limit" });
        }
        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::Zero { field: "monitor.poll_interval_ms" });
        }
        if self.monitor.max_fetch_attempts == 0 {
            return Err(ConfigError::Zero { field: "monitor.max_fetch_attempts" });
        }
        if self.rpc.timeout_secs == 0 {
            return Err(ConfigError::Zero { field: "rpc.timeout_secs" });
        }
        if self.monitor.slippage_tolerance < 0.0 {
            return Err(ConfigError::NegativeSlippage(self.monitor.slippage_tolerance));
        }
        Ok(())
    }

    /// Watched wallets as public keys, in configured order
    pub fn watched_addresses(&self) -> Result<Vec<Pubkey>, ConfigError> {
        self.monitor
            .wallets
            .iter()
            .map(|address| {
                Pubkey::from_str(address.trim()).map_err(|e| ConfigError::InvalidWallet {
                    address: address.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    pub fn commitment(&self) -> Result<CommitmentConfig, ConfigError> {
        match self.rpc.commitment.to_ascii_lowercase().as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            _ => Err(ConfigError::InvalidCommitment(self.rpc.commitment.clone())),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            signature_limit: self.monitor.signature_limit,
            max_fetch_attempts: self.monitor.max_fetch_attempts,
        }
    }
}
