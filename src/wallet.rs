//! Operator wallet management

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::WalletConfig;

/// Environment variable holding the base58 operator secret key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Wallet manager for the operator keypair
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Resolve the operator key: `PRIVATE_KEY` environment variable first,
    /// then `wallet.private_key`, then `wallet.keypair_path`
    pub fn resolve(config: &WalletConfig) -> Result<Self> {
        let from_env = std::env::var(PRIVATE_KEY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());

        if let Some(secret) = from_env {
            return Self::from_base58(&secret)
                .with_context(|| format!("Invalid key in {} environment variable", PRIVATE_KEY_ENV));
        }
        if let Some(secret) = config.private_key.as_deref() {
            return Self::from_base58(secret).context("Invalid wallet.private_key in config");
        }
        if let Some(path) = config.keypair_path.as_deref() {
            return Self::from_file(path);
        }
        anyhow::bail!(
            "No operator key configured: set {} or wallet.private_key / wallet.keypair_path",
            PRIVATE_KEY_ENV
        )
    }

    /// Create a wallet manager from a base58 encoded 64-byte secret key
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .context("Secret key is not valid base58")?;
        Self::from_bytes(&bytes)
    }

    /// Create a new wallet manager from a keypair file (JSON byte array or raw 64 bytes)
    ///
    /// A leading `~/` resolves against `$HOME`.
    pub fn from_file(path: &str) -> Result<Self> {
        let resolved = expand_home(path, std::env::var("HOME").ok().as_deref());
        let keypair_bytes = std::fs::read(&resolved)
            .with_context(|| format!("Failed to read keypair file: {}", resolved.display()))?;

        if keypair_bytes.len() == 64 {
            return Self::from_bytes(&keypair_bytes);
        }

        let json: Vec<u8> =
            serde_json::from_slice(&keypair_bytes).context("Failed to parse keypair JSON")?;
        Self::from_bytes(&json)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get a reference to the keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl Clone for WalletManager {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => Path::new(home).join(rest),
        _ => PathBuf::from(path),
    }
}
