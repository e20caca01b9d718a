//! End-to-end replication through the public API against the scripted ledger

use copy_mirror::balance::check_balance;
use copy_mirror::config::Config;
use copy_mirror::cursor::{CursorStore, InMemoryCursorStore};
use copy_mirror::monitor::{AddressStatus, Monitor};
use copy_mirror::test_utils::{LedgerCall, MockLedger};
use copy_mirror::types::{ReplicationOutcome, SkipReason, SourceInstruction};
use copy_mirror::wallet::WalletManager;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, system_program};
use std::sync::Arc;

fn config_for(wallets: &[Pubkey]) -> Config {
    let list: Vec<_> = wallets.iter().map(|w| format!("\"{}\"", w)).collect();
    let text = format!(
        r#"
[rpc]
endpoint = "http://127.0.0.1:8899"

[monitor]
wallets = [{}]
max_fetch_attempts = 2
"#,
        list.join(", ")
    );
    let config: Config = toml::from_str(&text).unwrap();
    config.validate().unwrap();
    config
}

#[tokio::test]
async fn test_mirror_session() {
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();
    let config = config_for(&[alice, bob]);

    let ledger = Arc::new(MockLedger::with_slot(5_000));
    let cursors = Arc::new(InMemoryCursorStore::new());
    let wallet = WalletManager::from_keypair(Keypair::new());
    let operator = wallet.pubkey();
    ledger.set_balance(operator, 2_000_000_000);

    let balance = check_balance(ledger.as_ref(), &operator).await.unwrap();
    assert!(!balance.is_below(config.monitor.low_balance_sol));

    // history before the agent started is never copied
    ledger.push_transaction(
        &alice,
        4_990,
        vec![SourceInstruction::transfer(alice, Pubkey::new_unique(), 1)],
    );

    let monitor = Monitor::new(
        ledger.clone(),
        cursors.clone(),
        wallet,
        config.watched_addresses().unwrap(),
        config.monitor.slippage_tolerance,
        config.monitor_settings(),
    );

    let report = monitor.tick().await;
    assert!(report
        .addresses
        .iter()
        .all(|r| matches!(r.status, AddressStatus::Seeded { slot: 4_999 })));
    assert_eq!(cursors.len(), 2);

    let shop = Pubkey::new_unique();
    ledger.push_transaction(
        &alice,
        5_001,
        vec![
            SourceInstruction::other(Pubkey::new_unique(), "swap"),
            SourceInstruction::transfer(alice, shop, 250_000_000),
        ],
    );
    ledger.push_transaction(
        &alice,
        5_002,
        vec![SourceInstruction::other(system_program::id(), "createAccount")],
    );
    let pending = ledger.push_signature(&bob, 5_003);

    let report = monitor.tick().await;

    let alice_report = report.address(&alice).unwrap();
    assert_eq!(alice_report.processed.len(), 2);
    assert!(matches!(
        alice_report.processed[0].outcome,
        ReplicationOutcome::Submitted { instructions: 1, .. }
    ));
    assert!(matches!(
        alice_report.processed[1].outcome,
        ReplicationOutcome::Skipped(SkipReason::NothingToReplicate)
    ));
    assert!(matches!(
        report.address(&bob).unwrap().status,
        AddressStatus::Deferred { attempt: 1, .. }
    ));

    let sent = ledger.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.account_keys[0], operator);
    assert!(sent[0].message.account_keys.contains(&shop));

    // second miss exhausts the budget of two
    let report = monitor.tick().await;
    let bob_report = report.address(&bob).unwrap();
    assert_eq!(bob_report.processed[0].signature, pending);
    assert!(matches!(
        bob_report.processed[0].outcome,
        ReplicationOutcome::Skipped(SkipReason::Unfetchable { attempts: 2 })
    ));
    assert_eq!(cursors.get(&bob).unwrap().slot, 5_003);
    assert_eq!(cursors.get(&alice).unwrap().slot, 5_002);

    let fetches = ledger.fetched_signatures();
    assert_eq!(fetches.iter().filter(|s| **s == pending).count(), 2);
    assert_eq!(
        ledger.count_calls(|c| matches!(c, LedgerCall::SendAndConfirm)),
        1
    );
}
