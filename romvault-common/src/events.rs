//! Scan progress events
//!
//! A run emits an ordered, finite sequence: exactly one `ScanStarted`,
//! any number of `EntryScanned` / `PlatformCompleted`, then exactly one
//! `ScanDone`. Events go to a caller-supplied [`EventSink`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{IdentStatus, ProviderId, RomEntry, ScanStats, ScanSummary, ScanType};

/// Scan progress event types
///
/// Serialized with a `type` discriminator (`scan_started`, `entry_scanned`,
/// `platform_completed`, `scan_done`) for push-style transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// Run entered `Running`
    ScanStarted {
        run_id: Uuid,
        scan_type: ScanType,
        /// Platform folders selected for this run
        platforms: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// One entry was committed to the catalog
    EntryScanned {
        run_id: Uuid,
        /// Platform folder name
        platform: String,
        entry: EntryInfo,
        identified: bool,
        /// Run totals after this entry
        totals: ScanStats,
        timestamp: DateTime<Utc>,
    },

    /// Every selected entry of a platform finished and siblings were regrouped
    PlatformCompleted {
        run_id: Uuid,
        platform: String,
        platform_id: Uuid,
        stats: ScanStats,
        timestamp: DateTime<Utc>,
    },

    /// Run reached a terminal state
    ScanDone { summary: ScanSummary },
}

/// Entry snapshot carried by `EntryScanned`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub id: Uuid,
    pub fs_name: String,
    pub name: Option<String>,
    pub status: IdentStatus,
    pub external_ids: BTreeMap<ProviderId, String>,
    pub read_error: Option<String>,
    pub missing_from_fs: bool,
}

impl From<&RomEntry> for EntryInfo {
    fn from(entry: &RomEntry) -> Self {
        Self {
            id: entry.id,
            fs_name: entry.fs_name.clone(),
            name: entry.metadata.name.clone(),
            status: entry.status(),
            external_ids: entry.external_ids.clone(),
            read_error: entry.failure.read_error.clone(),
            missing_from_fs: entry.missing_from_fs,
        }
    }
}

impl ScanEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            ScanEvent::ScanStarted { run_id, .. }
            | ScanEvent::EntryScanned { run_id, .. }
            | ScanEvent::PlatformCompleted { run_id, .. } => *run_id,
            ScanEvent::ScanDone { summary } => summary.run_id,
        }
    }

    /// Event type name as serialized
    pub fn kind(&self) -> &'static str {
        match self {
            ScanEvent::ScanStarted { .. } => "scan_started",
            ScanEvent::EntryScanned { .. } => "entry_scanned",
            ScanEvent::PlatformCompleted { .. } => "platform_completed",
            ScanEvent::ScanDone { .. } => "scan_done",
        }
    }
}

/// Abstract "emit event" sink supplied by the caller of a scan
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ScanEvent);
}

impl<F> EventSink for F
where
    F: Fn(ScanEvent) + Send + Sync,
{
    fn publish(&self, event: ScanEvent) {
        self(event)
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Broadcast distribution of scan events to any number of subscribers
///
/// Uses `tokio::broadcast` internally: publishing never blocks on slow
/// subscribers, and lagging receivers observe `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use romvault_common::events::EventBus;
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// # drop(rx);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScanEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ScanEvent,
    ) -> Result<usize, broadcast::error::SendError<ScanEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ScanEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: ScanEvent) {
        self.emit_lossy(event);
    }
}
