//! Reconciliation poller.
//!
//! On every tick the poller:
//! - Loads the active items from the store
//! - Reconciles them in batches on a bounded worker pool
//! - Persists only real deltas, conditioned on the status it read
//! - Dispatches extraction for items whose completion write claimed it
//!
//! Ticks run on their own tasks so a slow tick never holds up the timer.
//! An item still being reconciled by an earlier tick is skipped.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

use mediaq_models::{AssetSnapshot, ProviderUploadState, QueueItem, QueueItemId, UploadSnapshot, UploadStatus};
use mediaq_provider::ProviderAdapter;
use mediaq_store::QueueStore;

use crate::config::ReconcilerConfig;
use crate::delta::{compute_delta, write_precondition, ItemDelta, ObservedRefs};
use crate::error::{ReconcileError, ReconcileResult};
use crate::extraction::ExtractionTrigger;
use crate::logging::ItemLogger;
use crate::mapper::map_state;
use crate::metrics::{record_item_outcome, record_tick};
use crate::policy::{PolicyAction, RetryPolicy};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of reconciling one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Nothing to write.
    Unchanged,
    /// Progress, status or provider refs moved forward.
    Updated { status: UploadStatus, progress: u8 },
    /// First transition into `completed`.
    Completed { extraction_triggered: bool },
    /// Transient fault counted against the retry budget.
    Retrying { retry_count: u32 },
    /// Provider verdict or exhausted retries.
    Failed { error_message: String },
    /// No upload reference stored.
    SkippedMissingRef,
    /// An earlier tick is still reconciling this item.
    SkippedInFlight,
    /// The stored item changed underneath us (e.g. admin cancel); write dropped.
    Superseded,
    /// Store or task failure; nothing was recorded on the item.
    Errored(String),
}

impl ItemOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Unchanged => "unchanged",
            ItemOutcome::Updated { .. } => "updated",
            ItemOutcome::Completed { .. } => "completed",
            ItemOutcome::Retrying { .. } => "retrying",
            ItemOutcome::Failed { .. } => "failed",
            ItemOutcome::SkippedMissingRef => "skipped_missing_ref",
            ItemOutcome::SkippedInFlight => "skipped_in_flight",
            ItemOutcome::Superseded => "superseded",
            ItemOutcome::Errored(_) => "errored",
        }
    }

    /// True if this outcome persisted a change.
    pub fn wrote(&self) -> bool {
        matches!(
            self,
            ItemOutcome::Updated { .. }
                | ItemOutcome::Completed { .. }
                | ItemOutcome::Retrying { .. }
                | ItemOutcome::Failed { .. }
        )
    }
}

/// Per-item outcomes of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Size of the active set loaded at the start of the tick
    pub active: usize,
    pub outcomes: Vec<(QueueItemId, ItemOutcome)>,
    pub duration: Duration,
}

impl TickReport {
    fn new(active: usize) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }

    fn push(&mut self, id: QueueItemId, outcome: ItemOutcome) {
        self.outcomes.push((id, outcome));
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome recorded for an item, if it was part of this tick.
    pub fn outcome(&self, id: &QueueItemId) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|(i, _)| i == id).map(|(_, o)| o)
    }

    /// Number of outcomes with the given label.
    pub fn count(&self, label: &str) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.label() == label).count()
    }

    /// Number of items that had a change persisted.
    pub fn writes(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.wrote()).count()
    }
}

// =============================================================================
// In-Flight Tracking
// =============================================================================

/// Item ids currently being reconciled.
#[derive(Debug, Default)]
struct InFlight {
    ids: StdMutex<HashSet<QueueItemId>>,
}

impl InFlight {
    fn try_acquire(self: &Arc<Self>, id: &QueueItemId) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(self),
            id: id.clone(),
        })
    }

    fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Releases the item's in-flight slot when dropped, including on panic.
struct InFlightGuard {
    set: Arc<InFlight>,
    id: QueueItemId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Per-item tasks of one batch, aborted if the tick is dropped before
/// awaiting them (e.g. when `stop` gives up waiting).
struct BatchTasks(Vec<(QueueItemId, JoinHandle<ItemOutcome>)>);

impl Drop for BatchTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

// =============================================================================
// Tick Execution
// =============================================================================

/// Provider state for one item.
struct Observation {
    upload: UploadSnapshot,
    asset: Option<AssetSnapshot>,
}

/// State shared by the timer loop and every tick task.
struct PollerCore {
    store: Arc<dyn QueueStore>,
    provider: Arc<dyn ProviderAdapter>,
    trigger: ExtractionTrigger,
    policy: RetryPolicy,
    config: ReconcilerConfig,
    permits: Arc<Semaphore>,
    in_flight: Arc<InFlight>,
}

impl PollerCore {
    async fn tick(self: &Arc<Self>) -> ReconcileResult<TickReport> {
        let started = Instant::now();

        let active = match self.store.list_active().await {
            Ok(active) => active,
            Err(e) => {
                record_tick("error", started.elapsed(), 0);
                return Err(e.into());
            }
        };

        let mut report = TickReport::new(active.len());
        if active.is_empty() {
            report.duration = started.elapsed();
            record_tick("empty", report.duration, 0);
            return Ok(report);
        }

        debug!("Reconciling {} active items", active.len());

        for batch in active.chunks(self.config.batch_size.max(1)) {
            let mut tasks = BatchTasks(Vec::with_capacity(batch.len()));

            for item in batch {
                let Some(guard) = self.in_flight.try_acquire(&item.id) else {
                    debug!(item_id = %item.id, "Item still in flight, skipping");
                    record_item_outcome(ItemOutcome::SkippedInFlight.label());
                    report.push(item.id.clone(), ItemOutcome::SkippedInFlight);
                    continue;
                };

                let core = Arc::clone(self);
                let id = item.id.clone();
                let span = ItemLogger::new(&item.id, "reconcile").create_span();

                let handle = tokio::spawn(
                    async move {
                        let _guard = guard;
                        let _permit = match Arc::clone(&core.permits).acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => return ItemOutcome::Errored("worker pool closed".to_string()),
                        };
                        core.reconcile_current(&id).await
                    }
                    .instrument(span),
                );
                tasks.0.push((item.id.clone(), handle));
            }

            for (id, handle) in tasks.0.iter_mut() {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(item_id = %id, "Reconciliation task failed: {}", e);
                        ItemOutcome::Errored(format!("reconciliation task failed: {}", e))
                    }
                };
                record_item_outcome(outcome.label());
                report.push(id.clone(), outcome);
            }
        }

        report.duration = started.elapsed();
        record_tick("ok", report.duration, report.active);

        if report.writes() > 0 || report.count("errored") > 0 {
            info!(
                active = report.active,
                writes = report.writes(),
                completed = report.count("completed"),
                failed = report.count("failed"),
                retrying = report.count("retrying"),
                errored = report.count("errored"),
                duration_ms = report.duration.as_millis() as u64,
                "Reconciliation tick finished"
            );
        }

        Ok(report)
    }

    /// Reconcile from the stored copy read under the in-flight claim.
    ///
    /// The snapshot loaded at the start of the tick can be older than writes
    /// made by later ticks while this batch waited its turn.
    async fn reconcile_current(&self, id: &QueueItemId) -> ItemOutcome {
        match self.store.get(id).await {
            Ok(Some(item)) if item.is_active() => self.reconcile_item(item).await,
            Ok(Some(_)) | Ok(None) => {
                debug!(item_id = %id, "Item left the active set before reconciliation");
                ItemOutcome::Superseded
            }
            Err(e) => {
                warn!(item_id = %id, "Failed to load item: {}", e);
                ItemOutcome::Errored(e.to_string())
            }
        }
    }

    async fn reconcile_item(&self, item: QueueItem) -> ItemOutcome {
        let logger = ItemLogger::new(&item.id, "reconcile");

        let Some(upload_ref) = item.upload_ref.clone() else {
            logger.log_warning("no upload reference stored, skipping");
            return ItemOutcome::SkippedMissingRef;
        };

        // Panics anywhere between observation and the write count as a transient fault
        let attempt = AssertUnwindSafe(self.observe_and_apply(&item, &upload_ref, &logger))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ReconcileError::from_panic(payload)));

        match attempt {
            Ok(outcome) => outcome,
            Err(e) if e.counts_as_item_fault() => {
                logger.log_warning(&format!("reconciliation failed: {}", e));
                let action = self.policy.on_fault(&item, &e.to_string());
                self.persist(&item, &action, &ObservedRefs::default(), &logger).await
            }
            Err(e) => {
                logger.log_error(&format!("reconciliation failed: {}", e));
                ItemOutcome::Errored(e.to_string())
            }
        }
    }

    async fn observe_and_apply(
        &self,
        item: &QueueItem,
        upload_ref: &str,
        logger: &ItemLogger,
    ) -> ReconcileResult<ItemOutcome> {
        let observation = self.observe(item, upload_ref).await?;

        let mapped = map_state(
            &observation.upload,
            observation.asset.as_ref(),
            item.upload_status,
            item.upload_progress,
            self.config.preparing_progress,
        );
        let refs = ObservedRefs {
            asset_ref: observation.upload.asset_ref.clone(),
            playback_ref: observation
                .asset
                .as_ref()
                .and_then(AssetSnapshot::primary_playback_ref)
                .map(str::to_string),
        };
        let action = self.policy.on_observation(&mapped);

        Ok(self.persist(item, &action, &refs, logger).await)
    }

    async fn observe(&self, item: &QueueItem, upload_ref: &str) -> ReconcileResult<Observation> {
        let upload = self.provider.get_upload_state(upload_ref).await?;

        let asset = if matches!(upload.state, ProviderUploadState::AssetCreated) {
            match upload.asset_ref.as_deref().or(item.asset_ref.as_deref()) {
                Some(asset_ref) => Some(self.provider.get_asset_state(asset_ref).await?),
                None => None,
            }
        } else {
            None
        };

        Ok(Observation { upload, asset })
    }

    async fn persist(
        &self,
        item: &QueueItem,
        action: &PolicyAction,
        refs: &ObservedRefs,
        logger: &ItemLogger,
    ) -> ItemOutcome {
        let delta = compute_delta(item, action, refs);
        let precondition = write_precondition(item, &delta);

        let result = match &delta {
            ItemDelta::None => return ItemOutcome::Unchanged,
            ItemDelta::Fail { error_message } => {
                self.store
                    .update_status(&item.id, &precondition, UploadStatus::Failed, Some(error_message.clone()))
                    .await
            }
            ItemDelta::Update(update) => {
                debug!(item_id = %item.id, fields = ?update.field_names(), "Persisting item update");
                self.store
                    .update_fields(&item.id, &precondition, update.clone())
                    .await
            }
        };

        let stored = match result {
            Ok(stored) => stored,
            Err(e) if e.is_precondition_failed() => {
                logger.log_warning(&format!("item changed concurrently, write dropped: {}", e));
                return ItemOutcome::Superseded;
            }
            Err(e) => {
                logger.log_error(&format!("failed to persist reconciliation: {}", e));
                return ItemOutcome::Errored(e.to_string());
            }
        };

        match action {
            PolicyAction::Fail { error_message } => {
                logger.log_transition(item.upload_status, stored.upload_status, stored.upload_progress);
                ItemOutcome::Failed {
                    error_message: error_message.clone(),
                }
            }
            PolicyAction::Retry { retry_count, .. } => {
                logger.log_warning(&format!(
                    "transient fault, retry {}/{}",
                    retry_count, stored.max_retries
                ));
                ItemOutcome::Retrying {
                    retry_count: *retry_count,
                }
            }
            PolicyAction::Advance { .. } if delta.completes() => {
                logger.log_transition(item.upload_status, stored.upload_status, stored.upload_progress);
                let extraction_triggered = delta.claims_extraction();
                if extraction_triggered {
                    self.trigger.dispatch(stored.id.clone());
                }
                ItemOutcome::Completed { extraction_triggered }
            }
            PolicyAction::Advance { .. } => {
                if stored.upload_status != item.upload_status {
                    logger.log_transition(item.upload_status, stored.upload_status, stored.upload_progress);
                }
                ItemOutcome::Updated {
                    status: stored.upload_status,
                    progress: stored.upload_progress,
                }
            }
        }
    }
}

// =============================================================================
// Poller Lifecycle
// =============================================================================

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Process-wide reconciliation scheduler.
///
/// Construct one and share it by `Arc`. `start` and `stop` are idempotent.
pub struct ReconciliationPoller {
    core: Arc<PollerCore>,
    running: Mutex<Option<RunningLoop>>,
    is_running: AtomicBool,
}

impl ReconciliationPoller {
    pub fn new(
        store: Arc<dyn QueueStore>,
        provider: Arc<dyn ProviderAdapter>,
        trigger: ExtractionTrigger,
        config: ReconcilerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.batch_size.max(1)));
        Self {
            core: Arc::new(PollerCore {
                store,
                provider,
                trigger,
                policy: RetryPolicy::new(),
                config,
                permits,
                in_flight: Arc::new(InFlight::default()),
            }),
            running: Mutex::new(None),
            is_running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.core.config
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Items currently being reconciled.
    pub fn in_flight(&self) -> usize {
        self.core.in_flight.len()
    }

    /// Begin ticking. Returns `false` if already running or disabled.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("Reconciliation poller already running");
            return false;
        }
        if !self.core.config.enabled {
            info!("Reconciliation poller is disabled");
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(Arc::clone(&self.core), shutdown_rx));
        *running = Some(RunningLoop { shutdown, handle });
        self.is_running.store(true, Ordering::SeqCst);

        info!(
            "Reconciliation poller started (interval: {:?}, batch size: {})",
            self.core.config.tick_interval, self.core.config.batch_size
        );
        true
    }

    /// Stop ticking and wait for in-flight ticks. Returns `false` if not running.
    ///
    /// Ticks still running after `shutdown_timeout` are aborted together with
    /// their per-item tasks; an item task is cancelled at its next await point,
    /// so a store write already in progress completes.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(RunningLoop { shutdown, mut handle }) = running.take() else {
            return false;
        };

        let _ = shutdown.send(true);
        match tokio::time::timeout(self.core.config.shutdown_timeout, &mut handle).await {
            Ok(Ok(())) => info!("Reconciliation poller stopped"),
            Ok(Err(e)) => error!("Reconciliation poller loop failed: {}", e),
            Err(_) => {
                warn!(
                    "Reconciliation poller did not drain within {:?}, aborting",
                    self.core.config.shutdown_timeout
                );
                handle.abort();
                let _ = handle.await;
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        true
    }

    /// Run one tick now, outside the timer.
    pub async fn tick_once(&self) -> ReconcileResult<TickReport> {
        self.core.tick().await
    }
}

// =============================================================================
// Timer Loop
// =============================================================================

async fn run_loop(core: Arc<PollerCore>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(core.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = JoinSet::new();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let core = Arc::clone(&core);
                ticks.spawn(async move { core.tick().await });

                while let Some(result) = ticks.try_join_next() {
                    log_tick_result(result);
                }
            }
        }
    }

    if !ticks.is_empty() {
        info!("Waiting for {} in-flight ticks to finish", ticks.len());
    }
    while let Some(result) = ticks.join_next().await {
        log_tick_result(result);
    }
}

fn log_tick_result(result: Result<ReconcileResult<TickReport>, JoinError>) {
    match result {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!("Reconciliation tick failed: {}", e),
        Err(e) => error!("Reconciliation tick task failed: {}", e),
    }
}
