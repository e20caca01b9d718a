//! Monitor loop for watched addresses
//!
//! One tick visits every watched address in configured order:
//! - an address without a cursor is seeded at `current slot - 1` and nothing
//!   else happens for it this tick
//! - otherwise new signatures are listed, filtered against the cursor and
//!   replicated oldest first; the cursor moves to each signature's slot once
//!   that signature is done
//!
//! Addresses and signatures are processed strictly one after another. Every
//! failure is turned into a report entry; nothing aborts the tick.

use parking_lot::Mutex;
use solana_sdk::{clock::Slot, pubkey::Pubkey, signature::Signature};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cursor::{CursorError, CursorPosition, CursorStore};
use crate::metrics::{metrics, Timer};
use crate::rpc_manager::{LedgerRpc, RpcManagerError};
use crate::sniffer::{pending_signatures, TransactionFetcher};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{InstructionTranslator, TransactionSubmitter, Translation};
use crate::types::{ParsedTransaction, ReplicationOutcome, SignatureInfo, SkipReason};
use crate::wallet::WalletManager;

/// Loop parameters
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Delay between the end of one tick and the start of the next
    pub poll_interval: Duration,

    /// Maximum signatures listed per address per tick
    pub signature_limit: usize,

    /// Detail lookups allowed per signature before it is skipped for good
    pub max_fetch_attempts: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2_000),
            signature_limit: 10,
            max_fetch_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AddressError {
    #[error("slot query failed: {0}")]
    Slot(RpcManagerError),

    #[error("signature listing failed: {0}")]
    Listing(RpcManagerError),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// What happened to one address during a tick
#[derive(Debug, Clone)]
pub enum AddressStatus {
    /// First observation; cursor initialized, nothing replicated
    Seeded { slot: Slot },
    /// No signatures newer than the cursor
    Idle,
    /// Every pending signature was processed
    Advanced { cursor: Slot },
    /// Stopped at a signature whose detail is not available yet; the cursor
    /// stays before it so the next tick retries
    Deferred { signature: Signature, attempt: u32 },
    Failed(AddressError),
}

/// Outcome of one watched signature
#[derive(Debug, Clone)]
pub struct SignatureReport {
    pub signature: Signature,
    pub slot: Slot,
    pub outcome: ReplicationOutcome,
}

#[derive(Debug, Clone)]
pub struct AddressReport {
    pub address: Pubkey,
    pub status: AddressStatus,

    /// Signatures fully processed this tick, in processing order
    pub processed: Vec<SignatureReport>,
}

impl AddressReport {
    fn new(address: Pubkey, status: AddressStatus) -> Self {
        Self {
            address,
            status,
            processed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub context_id: String,
    pub addresses: Vec<AddressReport>,
}

impl TickReport {
    pub fn submitted(&self) -> usize {
        self.outcomes().filter(|o| o.is_submitted()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes().filter(|o| o.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes()
            .filter(|o| matches!(o, ReplicationOutcome::Skipped(_)))
            .count()
    }

    pub fn address(&self, address: &Pubkey) -> Option<&AddressReport> {
        self.addresses.iter().find(|r| r.address == *address)
    }

    fn outcomes(&self) -> impl Iterator<Item = &ReplicationOutcome> {
        self.addresses
            .iter()
            .flat_map(|r| r.processed.iter().map(|s| &s.outcome))
    }
}

/// Detail lookup retries pending for an address
#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    signature: Signature,
    attempts: u32,
}

enum FetchResult {
    Ready(ParsedTransaction),
    Retry { attempt: u32 },
    Abandoned { attempts: u32 },
}

pub struct Monitor {
    rpc: Arc<dyn LedgerRpc>,
    cursors: Arc<dyn CursorStore>,
    fetcher: TransactionFetcher,
    translator: InstructionTranslator,
    submitter: TransactionSubmitter,
    addresses: Vec<Pubkey>,
    settings: MonitorSettings,
    /// At most one entry per address since processing stops at a deferred signature
    pending_fetches: Mutex<HashMap<Pubkey, PendingFetch>>,
}

impl Monitor {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        cursors: Arc<dyn CursorStore>,
        wallet: WalletManager,
        addresses: Vec<Pubkey>,
        slippage_tolerance: f64,
        settings: MonitorSettings,
    ) -> Self {
        metrics().watched_addresses.set(addresses.len() as i64);
        Self {
            fetcher: TransactionFetcher::new(Arc::clone(&rpc)),
            translator: InstructionTranslator::new(wallet.pubkey(), slippage_tolerance),
            submitter: TransactionSubmitter::new(Arc::clone(&rpc), wallet),
            rpc,
            cursors,
            addresses,
            settings,
            pending_fetches: Mutex::new(HashMap::new()),
        }
    }

    /// Tick until `shutdown` turns true or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            addresses = self.addresses.len(),
            interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Monitor loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.tick().await;
            debug!(
                context_id = %report.context_id,
                submitted = report.submitted(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Tick complete"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Monitor loop stopped");
    }

    /// Process every watched address once
    pub async fn tick(&self) -> TickReport {
        let timer = Timer::new();
        let logger = StructuredLogger::for_tick();
        let mut current_slot = None;
        let mut reports = Vec::with_capacity(self.addresses.len());

        for address in &self.addresses {
            let report = match self.cursors.get(address) {
                None => self.seed_address(address, &mut current_slot, &logger).await,
                Some(cursor) => self.process_address(address, cursor, &logger).await,
            };
            reports.push(report);
        }

        timer.observe_duration(&metrics().tick_latency);
        TickReport {
            context_id: logger.context_id().to_string(),
            addresses: reports,
        }
    }

    async fn seed_address(
        &self,
        address: &Pubkey,
        current_slot: &mut Option<Slot>,
        logger: &StructuredLogger,
    ) -> AddressReport {
        let slot = match *current_slot {
            Some(slot) => slot,
            None => match self.rpc.get_slot().await {
                Ok(slot) => {
                    *current_slot = Some(slot);
                    slot
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "Cannot seed cursor, slot query failed");
                    return AddressReport::new(*address, AddressStatus::Failed(AddressError::Slot(e)));
                }
            },
        };

        let position = CursorPosition::seeded(slot);
        if let Err(e) = self.cursors.set(address, position) {
            logger.error(&e.to_string());
            return AddressReport::new(*address, AddressStatus::Failed(e.into()));
        }

        metrics().cursors_seeded.inc();
        logger.log_cursor_seeded(address, position.slot);
        AddressReport::new(*address, AddressStatus::Seeded { slot: position.slot })
    }

    async fn process_address(
        &self,
        address: &Pubkey,
        cursor: CursorPosition,
        logger: &StructuredLogger,
    ) -> AddressReport {
        let listing = match self
            .fetcher
            .list_new_signatures(address, &cursor, self.settings.signature_limit)
            .await
        {
            Ok(listing) => listing,
            Err(e) => {
                metrics()
                    .listing_failures
                    .with_label_values(&[e.category()])
                    .inc();
                warn!(
                    address = %address,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Signature listing failed"
                );
                return AddressReport::new(*address, AddressStatus::Failed(AddressError::Listing(e)));
            }
        };

        let pending = pending_signatures(listing, &cursor);
        if pending.is_empty() {
            return AddressReport::new(*address, AddressStatus::Idle);
        }

        let mut report = AddressReport::new(*address, AddressStatus::Advanced { cursor: cursor.slot });

        for info in pending {
            logger.log_new_signature(address, &info.signature, info.slot);
            metrics().signatures_observed.inc();

            let outcome = if info.failed {
                ReplicationOutcome::Skipped(SkipReason::SourceFailed)
            } else {
                match self.fetch_with_budget(address, &info, logger).await {
                    FetchResult::Ready(tx) => self.replicate(&tx, logger).await,
                    FetchResult::Retry { attempt } => {
                        report.status = AddressStatus::Deferred {
                            signature: info.signature,
                            attempt,
                        };
                        return report;
                    }
                    FetchResult::Abandoned { attempts } => {
                        ReplicationOutcome::Skipped(SkipReason::Unfetchable { attempts })
                    }
                }
            };

            logger.log_outcome(address, &info.signature, &outcome);
            record_outcome(&outcome);

            if let Err(e) = self
                .cursors
                .set(address, CursorPosition::at(info.slot, info.signature))
            {
                logger.error(&e.to_string());
                report.status = AddressStatus::Failed(e.into());
                return report;
            }

            report.status = AddressStatus::Advanced { cursor: info.slot };
            report.processed.push(SignatureReport {
                signature: info.signature,
                slot: info.slot,
                outcome,
            });
        }

        report
    }

    /// Look up transaction detail, counting consecutive misses per address
    async fn fetch_with_budget(
        &self,
        address: &Pubkey,
        info: &SignatureInfo,
        logger: &StructuredLogger,
    ) -> FetchResult {
        let category = match self.fetcher.fetch_parsed(&info.signature).await {
            Ok(Some(tx)) => {
                self.pending_fetches.lock().remove(address);
                return FetchResult::Ready(tx);
            }
            Ok(None) => "missing",
            Err(e) => {
                warn!(
                    signature = %info.signature,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Transaction detail lookup failed"
                );
                e.category()
            }
        };
        metrics().fetch_failures.with_label_values(&[category]).inc();

        let attempts = {
            let mut pending = self.pending_fetches.lock();
            let entry = pending.entry(*address).or_insert(PendingFetch {
                signature: info.signature,
                attempts: 0,
            });
            if entry.signature != info.signature {
                *entry = PendingFetch {
                    signature: info.signature,
                    attempts: 0,
                };
            }
            entry.attempts += 1;
            entry.attempts
        };

        if attempts >= self.settings.max_fetch_attempts {
            self.pending_fetches.lock().remove(address);
            metrics().fetch_abandoned.inc();
            logger.log_fetch_abandoned(address, &info.signature, attempts);
            FetchResult::Abandoned { attempts }
        } else {
            logger.log_fetch_deferred(&info.signature, attempts, self.settings.max_fetch_attempts);
            FetchResult::Retry { attempt: attempts }
        }
    }

    async fn replicate(&self, tx: &ParsedTransaction, logger: &StructuredLogger) -> ReplicationOutcome {
        match self.translator.translate(tx, logger) {
            Translation::NothingToReplicate => {
                ReplicationOutcome::Skipped(SkipReason::NothingToReplicate)
            }
            Translation::Replicate(instructions) => self.submitter.submit(&instructions).await,
        }
    }
}

fn record_outcome(outcome: &ReplicationOutcome) {
    let m = metrics();
    match outcome {
        ReplicationOutcome::Submitted { .. } => m.replications_submitted.inc(),
        ReplicationOutcome::Skipped(_) => m.replications_skipped.inc(),
        ReplicationOutcome::Failed(err) => m.replications_failed.with_label_values(&[err.stage()]).inc(),
    }
}
