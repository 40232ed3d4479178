// Periodically refreshed lookup of the custom symbols available for reactions.
//
// Readers load the currently published `SymbolTable` through an
// `ArcSwap`, so `lookup` and `list_names` never wait on a refresh. A
// refresh builds a complete new table off to the side and publishes it with a
// single pointer store.

use std::collections::{HashMap, hash_map::Entry};
use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::Duration;

use arc_swap::ArcSwap;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, FetchError};
use crate::platform::GroupSymbolSource;
use crate::symbol::{SymbolEntry, SymbolTable};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published {
        generation: u64,
        symbols: usize,
        failed_groups: usize,
    },
    // Another refresh was in flight, or the cache has been stopped.
    Skipped,
}

pub struct SymbolCache {
    source: Arc<dyn GroupSymbolSource>,
    table: ArcSwap<SymbolTable>,
    refresh_interval: Duration,
    refreshing: AtomicBool,
    generation: AtomicU64,
    // Serializes publishing against `stop` so a late refresh cannot
    // republish a table after the cache was released.
    publish: Mutex<()>,
    cancellation_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

// Clears the in-flight flag however the refresh future ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SymbolCache {
    pub fn new(source: Arc<dyn GroupSymbolSource>, refresh_interval: Duration) -> Self {
        Self {
            source,
            table: ArcSwap::from_pointee(SymbolTable::default()),
            refresh_interval,
            refreshing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            publish: Mutex::new(()),
            cancellation_token: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    // Refreshes once, then keeps refreshing every `refresh_interval` in the
    // background. A failing first refresh is logged and the cache starts
    // empty. A `stop` that lands during the first refresh wins.
    pub async fn start(self: &Arc<Self>) -> Result<(), AppError> {
        if self.cancellation_token.is_cancelled() {
            return Err(AppError::CacheStopped);
        }
        log::info!("Starting symbol cache...");

        if let Err(e) = self.refresh().await {
            log::error!("Initial symbol refresh failed: {e}");
        }
        self.schedule_refresh()?;

        log::info!("Symbol cache started with {} symbols", self.len());
        Ok(())
    }

    // Cancels the scheduled refresh and releases the table. Idempotent.
    pub fn stop(&self) {
        log::info!("Stopping symbol cache...");
        self.cancellation_token.cancel();
        if let Ok(mut task) = self.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        let _publish = self.publish.lock();
        self.table.store(Arc::new(SymbolTable::default()));
        log::info!("Symbol cache stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    // Fetches every group's symbols and publishes the merged table.
    //
    // Groups are merged in ascending id order and the first group defining a
    // name keeps it. A group that fails to enumerate is skipped for this
    // cycle. Only a failure to list the groups themselves leaves the
    // previous snapshot in place.
    pub async fn refresh(&self) -> Result<RefreshOutcome, FetchError> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Symbol refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        }
        let _in_flight = InFlight(&self.refreshing);

        let mut groups = self.source.list_groups().await?;
        groups.sort();
        groups.dedup();
        log::debug!("Fetching symbols from {} groups", groups.len());

        let results = join_all(groups.iter().map(|group| self.source.list_symbols(*group))).await;

        let mut entries: HashMap<String, SymbolEntry> = HashMap::new();
        let mut failed_groups = 0;
        for (group, result) in groups.iter().zip(results) {
            match result {
                Ok(symbols) => {
                    log::debug!("Found {} symbols in group {group}", symbols.len());
                    for mut symbol in symbols {
                        if symbol.name.is_empty() {
                            continue;
                        }
                        match entries.entry(symbol.name.clone()) {
                            Entry::Occupied(existing) => {
                                log::debug!(
                                    "Symbol {} from group {group} shadowed by group {:?}",
                                    symbol.name,
                                    existing.get().group
                                );
                            }
                            Entry::Vacant(slot) => {
                                symbol.group = Some(*group);
                                slot.insert(symbol);
                            }
                        }
                    }
                }
                Err(e) => {
                    failed_groups += 1;
                    log::error!("Error fetching symbols from group {group}: {e}");
                }
            }
        }

        let _publish = self.publish.lock();
        if self.cancellation_token.is_cancelled() {
            log::debug!("Symbol cache stopped during refresh, discarding result");
            return Ok(RefreshOutcome::Skipped);
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let symbols = entries.len();
        self.table
            .store(Arc::new(SymbolTable::new(generation, entries)));

        Ok(RefreshOutcome::Published {
            generation,
            symbols,
            failed_groups,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolEntry> {
        self.table.load().get(name).cloned()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.table.load().names()
    }

    pub fn snapshot(&self) -> Arc<SymbolTable> {
        self.table.load_full()
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }

    // Checked under the task slot lock, which `stop` takes after cancelling.
    fn schedule_refresh(self: &Arc<Self>) -> Result<(), AppError> {
        let Ok(mut task) = self.task.lock() else {
            log::error!("Symbol refresh task slot poisoned, periodic refresh disabled");
            return Ok(());
        };
        if self.cancellation_token.is_cancelled() {
            log::debug!("Symbol cache stopped during start, not scheduling refresh");
            return Err(AppError::CacheStopped);
        }
        if task.is_some() {
            return Ok(());
        }

        let cache: Weak<Self> = Arc::downgrade(self);
        let token = self.cancellation_token.clone();
        let period = self.refresh_interval;
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        log::debug!("Refreshing symbol cache...");
                        tokio::select! {
                            _ = token.cancelled() => break,
                            outcome = cache.refresh() => match outcome {
                                Ok(RefreshOutcome::Published { symbols, failed_groups, .. }) => {
                                    log::info!(
                                        "Symbol cache refreshed with {symbols} symbols ({failed_groups} groups failed)"
                                    );
                                }
                                Ok(RefreshOutcome::Skipped) => {}
                                Err(e) => log::error!("Error refreshing symbol cache: {e}"),
                            },
                        }
                    }
                }
            }
            log::debug!("Symbol refresh task exited");
        }));
        Ok(())
    }

    // Whether the periodic refresh task is currently installed.
    pub fn is_scheduled(&self) -> bool {
        self.task.lock().map(|task| task.is_some()).unwrap_or(false)
    }
}

impl Drop for SymbolCache {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
