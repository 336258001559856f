//! Sync orchestrator implementation.
//!
//! Drives a full sync through the state machine
//! IDLE -> SCRAPING -> PROCESSING -> COMPLETED | ERROR -> IDLE:
//! - Scraping: listing pages in ascending order, entries in listing order,
//!   every entry persisted as soon as it is classified
//! - Processing: one more attempt for detail fetches that failed earlier
//! - Reset: the terminal snapshot stays visible for a grace period
//!
//! Single-release re-syncs run independently, serialized per release id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{Release, ReleaseStore, UpsertKind};
use crate::fetcher::{with_retry, FetchError, PageFetcher};
use crate::metrics;
use crate::parser::size::same_size;
use crate::parser::{ReleaseParser, ReleaseSummary};
use crate::progress::{
    ItemOutcome, ItemProgress, ProgressEvent, ProgressKind, ProgressReporter, SyncSession,
    SyncState,
};

use super::config::{RecheckPolicy, SyncConfig};
use super::state::StateCell;
use super::types::{SyncError, SyncHandle};

type CancelSlot = Arc<Mutex<Option<(u64, CancellationToken)>>>;

/// The sync orchestrator - owns the single-flight guarantee.
pub struct SyncOrchestrator {
    config: SyncConfig,
    store: Arc<dyn ReleaseStore>,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<ReleaseParser>,
    reporter: Arc<ProgressReporter>,

    // Runtime state
    state: Arc<StateCell>,
    cancel: CancelSlot,
    resync_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncOrchestrator {
    /// Create a new orchestrator in the IDLE state.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn ReleaseStore>,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<ReleaseParser>,
        reporter: Arc<ProgressReporter>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            parser,
            reporter,
            state: Arc::new(StateCell::new()),
            cancel: Arc::new(Mutex::new(None)),
            resync_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Start a full sync in the background.
    ///
    /// Returns immediately. Fails with `AlreadyInProgress` while another
    /// session is SCRAPING or PROCESSING, leaving it untouched.
    pub fn start_sync(&self) -> Result<SyncHandle, SyncError> {
        let session_id = self.state.try_begin().map_err(|(current, state)| {
            debug!(current, state = %state, "Sync start rejected");
            SyncError::AlreadyInProgress
        })?;

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((session_id, token.clone()));

        let session = SyncSession::started(session_id, self.config.max_pages, Utc::now());
        self.reporter
            .publish(ProgressEvent::new(ProgressKind::Started, session.clone()));
        info!(session = session_id, max_pages = self.config.max_pages, "Sync started");

        let worker = SyncWorker {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            parser: Arc::clone(&self.parser),
            reporter: Arc::clone(&self.reporter),
            state: Arc::clone(&self.state),
            cancel_slot: Arc::clone(&self.cancel),
            cancel: token,
            session,
            deferred: Vec::new(),
            detail_fetched: false,
            capped: false,
        };
        let task = tokio::spawn(worker.run());
        Ok(SyncHandle::new(session_id, task))
    }

    /// Ask the running session to stop at its next checkpoint.
    pub fn cancel_sync(&self) -> Result<(), SyncError> {
        let (generation, state) = self.state.load();
        if !state.is_active() {
            return Err(SyncError::NotRunning);
        }
        let slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((session_id, token)) if *session_id == generation => {
                info!(session = generation, "Sync cancellation requested");
                token.cancel();
                Ok(())
            }
            _ => Err(SyncError::NotRunning),
        }
    }

    /// Current session snapshot.
    pub fn status(&self) -> SyncSession {
        self.reporter.current_status()
    }

    /// Re-scrape one release from its detail page.
    ///
    /// Concurrent re-syncs of the same id run one after the other; a full
    /// sync neither blocks nor is blocked by them.
    pub async fn resync(&self, id: u64) -> Result<Release, SyncError> {
        let lock = self.resync_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.resync_locked(id).await
        };
        self.release_resync_lock(id, &lock);

        let label = match &result {
            Ok((_, UpsertKind::Unchanged)) => "unchanged",
            Ok(_) => "updated",
            Err(SyncError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        metrics::RESYNCS.with_label_values(&[label]).inc();
        result.map(|(release, _)| release)
    }

    async fn resync_locked(&self, id: u64) -> Result<(Release, UpsertKind), SyncError> {
        let release = self.store.get(id)?;
        info!(id, url = %release.source_url, "Re-syncing release");

        let raw = with_retry(&self.config.retry, "detail", || {
            self.fetcher.fetch_detail(&release.source_url)
        })
        .await?;
        let detail = self
            .parser
            .parse_detail(&raw)
            .map_err(|e| FetchError::Body(e.to_string()))?;

        // The detail page title wins; the stored one covers pages without it.
        // The stored publish date is kept so relative upload dates never count
        // as a remote change; the page's upload date only fills a missing one.
        let title = detail
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| release.title.clone());
        let summary = ReleaseSummary {
            source_url: release.source_url.clone(),
            title,
            raw_publish_date: None,
            publish_date: release.publish_date,
            raw_size: None,
        };
        let (updated, kind) = self.store.refresh(id, detail.into_fields(&summary))?;
        info!(id, changed = kind == UpsertKind::Updated, "Release re-synced");
        Ok((updated, kind))
    }

    fn resync_lock(&self, id: u64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .resync_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    fn release_resync_lock(&self, id: u64, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .resync_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(&id);
        }
    }

    #[cfg(test)]
    fn resync_lock_count(&self) -> usize {
        self.resync_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Background task running one full sync session.
struct SyncWorker {
    config: SyncConfig,
    store: Arc<dyn ReleaseStore>,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<ReleaseParser>,
    reporter: Arc<ProgressReporter>,
    state: Arc<StateCell>,
    cancel_slot: CancelSlot,
    cancel: CancellationToken,

    session: SyncSession,
    /// Entries whose detail fetch failed during SCRAPING.
    deferred: Vec<ReleaseSummary>,
    detail_fetched: bool,
    capped: bool,
}

impl SyncWorker {
    async fn run(mut self) -> SyncSession {
        let started = Instant::now();
        let result = match self.scrape().await {
            Ok(()) => self.process().await,
            Err(e) => Err(e),
        };
        self.finish(result, started)
    }

    fn session_id(&self) -> u64 {
        self.session.session_id
    }

    fn publish(&self, event: ProgressEvent) {
        let session_id = self.session_id();
        self.reporter
            .publish_if(event, |current| current.session_id == session_id);
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Politeness delay; returns early on cancellation.
    async fn pause(&self, ms: u64) -> Result<(), SyncError> {
        if ms == 0 {
            return self.check_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(()),
        }
    }

    async fn fetch_listing(&self, page: u32) -> Result<String, SyncError> {
        let fetch = with_retry(&self.config.retry, "listing", || {
            self.fetcher.fetch_listing(page)
        });
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = fetch => result.map_err(|source| SyncError::Page { page, source }),
        }
    }

    /// `Ok(Err(_))` is an item-level failure; `Err(_)` ends the session.
    async fn fetch_detail(&mut self, url: &str) -> Result<Result<String, FetchError>, SyncError> {
        if self.detail_fetched {
            self.pause(self.config.item_delay_ms).await?;
        }
        self.detail_fetched = true;
        let fetch = with_retry(&self.config.retry, "detail", || self.fetcher.fetch_detail(url));
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = fetch => Ok(result),
        }
    }

    fn item_cap_reached(&self) -> bool {
        self.config
            .max_items
            .is_some_and(|max| self.session.current_item >= max)
    }

    async fn scrape(&mut self) -> Result<(), SyncError> {
        for page in 1..=self.config.max_pages {
            self.check_cancelled()?;
            if self.item_cap_reached() {
                self.stop_at_item_cap();
                return Ok(());
            }
            if page > 1 {
                self.pause(self.config.page_delay_ms).await?;
            }

            debug!(session = self.session_id(), page, "Fetching listing page");
            let raw = self.fetch_listing(page).await?;
            let summaries: Vec<ReleaseSummary> = {
                let listing = self.parser.parse_listing(&raw);
                listing.summaries().collect()
            };

            self.session.current_page = page;
            if summaries.is_empty() {
                info!(session = self.session_id(), page, "Empty listing page, pagination done");
                metrics::PAGES_PROCESSED.with_label_values(&["empty"]).inc();
                break;
            }
            metrics::PAGES_PROCESSED.with_label_values(&["ok"]).inc();

            self.session.total_items += summaries.len() as u32;
            self.session.message = format!(
                "Scraping page {}/{} ({} entries)",
                page,
                self.config.max_pages,
                summaries.len()
            );

            for summary in summaries {
                if self.item_cap_reached() {
                    break;
                }
                self.check_cancelled()?;
                self.session.current_item += 1;
                self.process_summary(summary).await?;
            }
            self.publish(ProgressEvent::new(ProgressKind::Page, self.session.clone()));
        }
        if self.item_cap_reached() {
            self.stop_at_item_cap();
        }
        Ok(())
    }

    fn stop_at_item_cap(&mut self) {
        if !self.capped {
            info!(
                session = self.session_id(),
                max_items = self.session.current_item,
                "Item limit reached"
            );
            self.capped = true;
        }
    }

    async fn process_summary(&mut self, summary: ReleaseSummary) -> Result<(), SyncError> {
        let existing = self.store.find_by_url(&summary.source_url)?;

        let (outcome, release_id) = match existing {
            Some(release) if !self.needs_refetch(&release, &summary) => {
                debug!(id = release.id, title = %summary.title, "Unchanged on listing");
                (ItemOutcome::Unchanged, Some(release.id))
            }
            existing => match self.fetch_detail(&summary.source_url).await? {
                Ok(raw) => self.merge(&summary, existing.as_ref(), &raw)?,
                Err(e) if self.config.retry_deferred => {
                    warn!(url = %summary.source_url, error = %e, "Detail fetch failed, deferring");
                    self.deferred.push(summary.clone());
                    (ItemOutcome::Deferred, existing.map(|r| r.id))
                }
                Err(e) => {
                    warn!(url = %summary.source_url, error = %e, "Detail fetch failed, skipping");
                    (ItemOutcome::Skipped, existing.map(|r| r.id))
                }
            },
        };

        self.record(outcome, release_id, &summary);
        Ok(())
    }

    /// Whether a known entry's detail page should be fetched again.
    fn needs_refetch(&self, release: &Release, summary: &ReleaseSummary) -> bool {
        match self.config.recheck {
            RecheckPolicy::Never => false,
            RecheckPolicy::Always => true,
            RecheckPolicy::OnDrift => {
                let title_drift = summary.title != release.title;
                let size_drift = summary
                    .raw_size
                    .as_deref()
                    .is_some_and(|size| !same_size(size, &release.size));
                let date_drift = match (summary.publish_date, release.publish_date) {
                    (Some(listed), Some(stored)) => {
                        (listed - stored).num_days().abs() > self.config.date_drift_days
                    }
                    _ => false,
                };
                title_drift || size_drift || date_drift
            }
        }
    }

    /// Parse a fetched detail page and persist the merged release.
    fn merge(
        &self,
        summary: &ReleaseSummary,
        existing: Option<&Release>,
        raw: &str,
    ) -> Result<(ItemOutcome, Option<u64>), SyncError> {
        let existing_id = existing.map(|r| r.id);
        let detail = match self.parser.parse_detail(raw) {
            Ok(detail) => detail,
            Err(e) => {
                warn!(url = %summary.source_url, error = %e, "Unparseable detail page, skipping");
                return Ok((ItemOutcome::Skipped, existing_id));
            }
        };
        if self.config.require_magnet_link && detail.magnet_link.is_none() {
            warn!(url = %summary.source_url, "No magnet link found, skipping");
            return Ok((ItemOutcome::Skipped, existing_id));
        }

        let mut fields = detail.into_fields(summary);
        if let Some(existing) = existing {
            // Relative listing dates resolve a little differently on every
            // run; a small shift is not a remote change.
            match (fields.publish_date, existing.publish_date) {
                (Some(listed), Some(stored))
                    if (listed - stored).num_days().abs() <= self.config.date_drift_days =>
                {
                    fields.publish_date = Some(stored);
                }
                (None, Some(stored)) => fields.publish_date = Some(stored),
                _ => {}
            }
        }

        let outcome = self.store.upsert_from_scrape(&summary.source_url, fields)?;
        let item = match outcome.kind {
            UpsertKind::Created => ItemOutcome::New,
            UpsertKind::Updated => ItemOutcome::Updated,
            UpsertKind::Unchanged => ItemOutcome::Unchanged,
        };
        Ok((item, Some(outcome.id)))
    }

    fn record(&mut self, outcome: ItemOutcome, release_id: Option<u64>, summary: &ReleaseSummary) {
        match outcome {
            ItemOutcome::New => self.session.new_count += 1,
            ItemOutcome::Updated => self.session.updated_count += 1,
            ItemOutcome::Unchanged | ItemOutcome::Skipped => self.session.skipped_count += 1,
            ItemOutcome::Deferred => {}
        }
        if outcome != ItemOutcome::Deferred {
            metrics::RELEASES_PROCESSED
                .with_label_values(&[outcome.as_str()])
                .inc();
        }
        self.publish(ProgressEvent::item(
            self.session.clone(),
            ItemProgress {
                outcome,
                release_id,
                title: summary.title.clone(),
                source_url: summary.source_url.clone(),
            },
        ));
    }

    /// PROCESSING phase: second attempt for deferred detail fetches.
    async fn process(&mut self) -> Result<(), SyncError> {
        self.check_cancelled()?;
        if !self
            .state
            .transition(self.session_id(), SyncState::Scraping, SyncState::Processing)
        {
            warn!(session = self.session_id(), "Unexpected state entering PROCESSING");
        }
        self.session.state = SyncState::Processing;
        self.session.message = if self.deferred.is_empty() {
            "Finalizing".to_string()
        } else {
            format!("Retrying {} deferred entries", self.deferred.len())
        };
        self.publish(ProgressEvent::new(ProgressKind::Phase, self.session.clone()));

        let deferred = std::mem::take(&mut self.deferred);
        for summary in deferred {
            self.check_cancelled()?;
            let existing = self.store.find_by_url(&summary.source_url)?;
            let (outcome, release_id) = match self.fetch_detail(&summary.source_url).await? {
                Ok(raw) => self.merge(&summary, existing.as_ref(), &raw)?,
                Err(e) => {
                    warn!(url = %summary.source_url, error = %e, "Deferred detail fetch failed, skipping");
                    (ItemOutcome::Skipped, existing.map(|r| r.id))
                }
            };
            self.record(outcome, release_id, &summary);
        }
        Ok(())
    }

    fn finish(mut self, result: Result<(), SyncError>, started: Instant) -> SyncSession {
        let session_id = self.session_id();
        let now = Utc::now();

        let result = result.and_then(|()| self.store.mark_synced(now).map_err(SyncError::from));
        let (state, label) = match &result {
            Ok(()) => {
                let message = format!(
                    "Sync completed: {} new, {} updated, {} skipped{}",
                    self.session.new_count,
                    self.session.updated_count,
                    self.session.skipped_count,
                    if self.capped { " (item limit reached)" } else { "" }
                );
                self.session.message = message;
                (SyncState::Completed, "completed")
            }
            Err(SyncError::Cancelled) => {
                self.session.message = "Sync cancelled".to_string();
                (SyncState::Error, "cancelled")
            }
            Err(e) => {
                self.session.message = e.to_string();
                (SyncState::Error, "error")
            }
        };

        self.session.state = state;
        self.session.finished_at = Some(now);
        match state {
            SyncState::Completed => info!(
                session = session_id,
                new = self.session.new_count,
                updated = self.session.updated_count,
                skipped = self.session.skipped_count,
                "Sync completed"
            ),
            _ => error!(session = session_id, message = %self.session.message, "Sync failed"),
        }

        // Snapshot first, so a session started right after the state flips
        // can never be overwritten by this one's final event.
        self.publish(ProgressEvent::new(ProgressKind::Finished, self.session.clone()));
        if !self.state.finish(session_id, state) {
            warn!(session = session_id, "Sync state changed underneath the worker");
        }

        {
            let mut slot = self.cancel_slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|(id, _)| *id == session_id) {
                *slot = None;
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        metrics::SYNC_SESSIONS.with_label_values(&[label]).inc();
        metrics::SYNC_DURATION
            .with_label_values(&[label])
            .observe(elapsed);

        self.schedule_reset();
        self.session
    }

    fn schedule_reset(&self) {
        let state = Arc::clone(&self.state);
        let reporter = Arc::clone(&self.reporter);
        let session_id = self.session_id();
        let grace = Duration::from_millis(self.config.reset_grace_ms);

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if state.reset(session_id) {
                let published = reporter.publish_if(
                    ProgressEvent::new(ProgressKind::Reset, SyncSession::idle(session_id)),
                    |current| current.session_id == session_id && current.state.is_terminal(),
                );
                debug!(session = session_id, published, "Sync state reset to IDLE");
            }
        });
    }
}
