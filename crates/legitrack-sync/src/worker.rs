//! The synchronization worker.
//!
//! One cycle mirrors the three reference tables and then walks the paginated
//! bill listing. Each bill is fetched (detail, tracking history, themes) and
//! written in its own transaction, so a failing bill only costs that bill.
//! Cycles repeat on a fixed interval until shutdown.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use legitrack_core::wire::{
    RemoteBillDetail, RemoteBillSummary, RemoteBillTheme, RemoteReference, RemoteStatus,
};
use legitrack_core::{
    BillRecord, BillStatus, ItemError, ReferenceItem, ReferenceKind, TrackingEntry, parse_item,
};
use legitrack_store::{
    BillSync, BillWriteOutcome, DuckStore, ReferenceChanges, SharedStore, lock,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{CamaraApi, SyncError};

/// Tunables of the worker. [`Default`] matches the production schedule.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// `itens` of the listing request.
    pub page_size: u32,
    /// Attempts per listing page before pagination stops.
    pub page_attempts: u32,
    /// Pause between attempts at the same page.
    pub retry_delay: Duration,
    /// Pause between consecutive pages.
    pub page_delay: Duration,
    /// Pause between cycles in [`SyncWorker::run_forever`].
    pub interval: Duration,
    /// Restrict the listing to these years. Empty means no filter.
    pub years: Vec<i32>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_attempts: 3,
            retry_delay: Duration::from_secs(5),
            page_delay: Duration::from_secs(1),
            interval: Duration::from_secs(15 * 60),
            years: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BillStats {
    pub new: usize,
    pub updated: usize,
    pub tracking_added: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Outcome of one [`SyncWorker::run_cycle`]. A reference table that could
/// not be synced carries `None`.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub references: Vec<(ReferenceKind, Option<ReferenceStats>)>,
    pub bills: BillStats,
}

pub struct SyncWorker<A> {
    api: A,
    store: SharedStore,
    settings: SyncSettings,
}

impl<A: CamaraApi> SyncWorker<A> {
    pub fn new(api: A, store: SharedStore, settings: SyncSettings) -> Self {
        Self {
            api,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    // ── Reference tables ──

    /// Mirror one reference table. An empty remote list leaves the table alone.
    pub async fn sync_reference(&self, kind: ReferenceKind) -> Result<ReferenceStats, SyncError> {
        let items = self.api.references(kind).await?.into_items();
        if items.is_empty() {
            info!(table = %kind, "nothing received");
            return Ok(ReferenceStats::default());
        }

        let local = lock(&self.store)?.reference_map(kind)?;
        let (changes, skipped) = diff_reference(kind, &local, &items);
        let stats = ReferenceStats {
            inserted: changes.inserts.len(),
            updated: changes.updates.len(),
            skipped,
        };
        lock(&self.store)?.apply_reference_changes(kind, &changes)?;

        info!(
            table = %kind,
            inserted = stats.inserted,
            updated = stats.updated,
            skipped = stats.skipped,
            "reference table synced"
        );
        Ok(stats)
    }

    /// Mirror all reference tables, themes last. A failing table is logged
    /// and skipped.
    pub async fn sync_references(&self) -> Vec<(ReferenceKind, Option<ReferenceStats>)> {
        let mut results = Vec::with_capacity(ReferenceKind::ALL.len());
        for kind in ReferenceKind::ALL {
            match self.sync_reference(kind).await {
                Ok(stats) => results.push((kind, Some(stats))),
                Err(e) => {
                    error!(table = %kind, error = %e, "reference sync failed, skipping table");
                    results.push((kind, None));
                }
            }
        }
        results
    }

    // ── Bills ──

    /// Walk the listing from page 1, following `next` links. A page that
    /// fails every attempt ends the walk; what was collected so far is kept.
    pub async fn collect_bill_summaries(&self, years: &[i32]) -> Result<Vec<Value>, SyncError> {
        let mut url = Some(self.api.first_page_url(years, self.settings.page_size)?);
        let mut items = Vec::new();
        let mut page = 0u32;

        while let Some(current) = url.take() {
            page += 1;
            let Some(envelope) = self.fetch_page(&current, page).await else {
                warn!(page, collected = items.len(), "giving up on pagination");
                break;
            };
            let next = envelope
                .next_href()
                .filter(|href| *href != current)
                .map(str::to_owned);
            let batch = envelope.into_items();
            if batch.is_empty() {
                break;
            }
            debug!(page, count = batch.len(), "received bill page");
            items.extend(batch);

            if next.is_some() {
                tokio::time::sleep(self.settings.page_delay).await;
            }
            url = next;
        }

        info!(pages = page, bills = items.len(), "bill listing collected");
        Ok(items)
    }

    async fn fetch_page(&self, url: &str, page: u32) -> Option<legitrack_core::Envelope> {
        let attempts = self.settings.page_attempts.max(1);
        for attempt in 1..=attempts {
            match self.api.bill_page(url).await {
                Ok(envelope) => return Some(envelope),
                Err(e) => {
                    warn!(page, attempt, attempts, error = %e, "bill page request failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }
        None
    }

    /// Sync every bill of the listing. Per-bill failures are counted and the
    /// loop moves on.
    pub async fn sync_bills(&self, years: &[i32]) -> Result<BillStats, SyncError> {
        let items = self.collect_bill_summaries(years).await?;
        let total = items.len();
        let mut stats = BillStats::default();

        for (index, raw) in items.iter().enumerate() {
            if index > 0 && index % 100 == 0 {
                info!(done = index, total, "bill sync progress");
            }

            let summary: RemoteBillSummary = match parse_item(raw) {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "skipping bill without a valid id");
                    stats.skipped += 1;
                    continue;
                }
            };

            match self.sync_bill(&summary).await {
                Ok(outcome) => {
                    if outcome.created {
                        stats.new += 1;
                    } else {
                        stats.updated += 1;
                    }
                    stats.tracking_added += outcome.tracking_added;
                }
                Err(e) => {
                    error!(bill = summary.id, error = %e, "bill sync failed");
                    stats.failed += 1;
                }
            }
        }

        info!(
            new = stats.new,
            updated = stats.updated,
            tracking_added = stats.tracking_added,
            failed = stats.failed,
            skipped = stats.skipped,
            "bill sync finished"
        );
        Ok(stats)
    }

    /// Fetch one bill's detail, history and themes, then write them together.
    pub async fn sync_bill(&self, summary: &RemoteBillSummary) -> Result<BillWriteOutcome, SyncError> {
        let record = BillRecord::from(summary);
        let id = record.id;

        let detail = self.api.bill_detail(id).await?;
        let tracking = parse_tracking(id, self.api.bill_tracking(id).await?.items());
        let themes = parse_themes(id, self.api.bill_themes(id).await?.items());

        let status = match current_status(&detail.dados) {
            Ok(status) => Some(status),
            Err(e) => {
                let fallback = tracking
                    .iter()
                    .max_by_key(|entry| entry.sequence)
                    .map(TrackingEntry::as_status);
                warn!(
                    bill = id,
                    error = %e,
                    fallback = fallback.is_some(),
                    "no usable statusProposicao, using last tracking entry"
                );
                fallback
            }
        };

        let sync = BillSync {
            record,
            status,
            tracking,
            themes,
        };
        let outcome = lock(&self.store)?.write_bill(&sync)?;
        for theme in &outcome.unknown_themes {
            warn!(bill = id, theme, "theme not found locally");
        }
        Ok(outcome)
    }

    // ── Cycles ──

    /// Reference tables, then bills.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        info!("sync cycle starting");
        let references = self.sync_references().await;
        let bills = self.sync_bills(&self.settings.years).await?;
        info!("sync cycle finished");
        Ok(CycleReport { references, bills })
    }

    /// Run cycles every [`SyncSettings::interval`] until `shutdown` turns
    /// true or its sender is dropped.
    pub async fn run_forever(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        error!(error = %e, "sync cycle failed");
                    }
                }
                _ = shutdown.changed() => break,
            }

            info!(secs = self.settings.interval.as_secs(), "sleeping until next cycle");
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("sync worker stopped");
    }
}

/// Split remote reference items into inserts and updates against the local
/// rows. Returns the changes and the number of skipped items.
pub fn diff_reference(
    kind: ReferenceKind,
    local: &HashMap<i64, String>,
    items: &[Value],
) -> (ReferenceChanges, usize) {
    let mut changes = ReferenceChanges::default();
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for raw in items {
        let item = match parse_item::<RemoteReference>(raw).and_then(ReferenceItem::try_from) {
            Ok(item) => item,
            Err(e) => {
                warn!(table = %kind, error = %e, "skipping reference item");
                skipped += 1;
                continue;
            }
        };
        if !seen.insert(item.id) {
            warn!(table = %kind, id = item.id, "duplicate reference item");
            skipped += 1;
            continue;
        }
        match local.get(&item.id) {
            Some(existing) if *existing == item.description => {}
            Some(_) => changes.updates.push(item),
            None => changes.inserts.push(item),
        }
    }
    (changes, skipped)
}

fn current_status(detail: &Value) -> Result<BillStatus, ItemError> {
    let detail: RemoteBillDetail = parse_item(detail)?;
    let raw = detail
        .status_proposicao
        .ok_or(ItemError::Missing("statusProposicao"))?;
    BillStatus::try_from(parse_item::<RemoteStatus>(&raw)?)
}

fn parse_tracking(bill: i64, items: &[Value]) -> Vec<TrackingEntry> {
    items
        .iter()
        .filter_map(|raw| {
            match parse_item::<RemoteStatus>(raw).and_then(TrackingEntry::try_from) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(bill, error = %e, "skipping tracking entry");
                    None
                }
            }
        })
        .collect()
}

fn parse_themes(bill: i64, items: &[Value]) -> Vec<i64> {
    items
        .iter()
        .filter_map(|raw| match parse_item::<RemoteBillTheme>(raw) {
            Ok(theme) => Some(theme.cod_tema),
            Err(e) => {
                warn!(bill, error = %e, "skipping theme link");
                None
            }
        })
        .collect()
}

/// Open the database file, retrying while another process holds it.
pub async fn wait_for_store(
    path: &Path,
    attempts: u32,
    delay: Duration,
) -> Result<DuckStore, SyncError> {
    let attempts = attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match DuckStore::open_persistent(path) {
            Ok(store) => return Ok(store),
            Err(e) => {
                warn!(path = %path.display(), attempt, attempts, error = %e, "store not ready");
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(last_error.map_or_else(
        || SyncError::Other("store unavailable".into()),
        SyncError::Store,
    ))
}
