//! Operator balance inspection

use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::rpc_manager::{LedgerRpc, RpcResult};
use crate::types::lamports_to_sol;

/// Spendable balance of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub lamports: u64,
}

impl Balance {
    pub fn sol(&self) -> f64 {
        lamports_to_sol(self.lamports)
    }

    /// True when the balance may not cover transaction fees
    pub fn is_below(&self, threshold_sol: f64) -> bool {
        self.sol() < threshold_sol
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.sol())
    }
}

/// Read the balance of `owner`
pub async fn check_balance(rpc: &dyn LedgerRpc, owner: &Pubkey) -> RpcResult<Balance> {
    let lamports = rpc.get_balance(owner).await?;
    Ok(Balance { lamports })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_manager::RpcManagerError;
    use crate::test_utils::MockLedger;

    #[test]
    fn test_balance_conversion() {
        let balance = Balance {
            lamports: 2_500_000_000,
        };
        assert_eq!(balance.sol(), 2.5);
        assert_eq!(balance.to_string(), "2.5 SOL");
        assert!(!balance.is_below(0.01));
        assert!(Balance { lamports: 9_999_999 }.is_below(0.01));
        assert!(!Balance { lamports: 10_000_000 }.is_below(0.01));
    }

    #[tokio::test]
    async fn test_check_balance_reads_owner() {
        let ledger = MockLedger::new();
        let owner = Pubkey::new_unique();
        ledger.set_balance(owner, 42);

        let balance = check_balance(&ledger, &owner).await.unwrap();
        assert_eq!(balance.lamports, 42);
        assert_eq!(
            check_balance(&ledger, &Pubkey::new_unique()).await.unwrap().lamports,
            0
        );
    }

    #[tokio::test]
    async fn test_check_balance_propagates_rpc_error() {
        let ledger = MockLedger::new();
        ledger.fail_balance(RpcManagerError::Transport {
            endpoint: "mock".to_string(),
            message: "connection refused".to_string(),
        });

        let err = check_balance(&ledger, &Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, RpcManagerError::Transport { .. }));
    }
}
