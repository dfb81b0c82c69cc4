//! Start / stop / status of background scan runs
//!
//! At most one run is active per controller (one controller per library
//! root). Runs execute on a spawned task; `start` returns as soon as the
//! run is accepted.

use romvault_common::models::{RomEntry, ScanRun, ScanState, ScanSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use super::{check_preconditions, ScanOrchestrator, ScanRequest};
use crate::discovery::Discoverer;
use crate::error::{Result, ScanError};

struct ActiveRun {
    id: Uuid,
    cancel: CancellationToken,
    done: Arc<AtomicBool>,
    /// Taken by whoever waits for the run
    handle: Option<JoinHandle<ScanSummary>>,
}

impl ActiveRun {
    fn is_running(&self) -> bool {
        let task_ended = self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(false);
        !self.done.load(Ordering::SeqCst) && !task_ended
    }
}

fn set_state(state: &std::sync::Mutex<ScanState>, new_state: ScanState) {
    match state.lock() {
        Ok(mut guard) => *guard = new_state,
        Err(poisoned) => *poisoned.into_inner() = new_state,
    }
}

pub struct ScanController {
    orchestrator: Arc<ScanOrchestrator>,
    active: Mutex<Option<ActiveRun>>,
    last_summary: Mutex<Option<ScanSummary>>,
    /// State of the current or last run
    state: Arc<std::sync::Mutex<ScanState>>,
}

impl ScanController {
    pub fn new(orchestrator: ScanOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            active: Mutex::new(None),
            last_summary: Mutex::new(None),
            state: Arc::new(std::sync::Mutex::new(ScanState::Idle)),
        }
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator {
        &self.orchestrator
    }

    /// Accept a scan request and run it in the background
    ///
    /// # Errors
    ///
    /// - `ScanError::Config` if the library root is missing or unreadable
    /// - `ScanError::AlreadyRunning` if a run has not reached a terminal state
    pub async fn start(&self, request: ScanRequest) -> Result<Uuid> {
        check_preconditions(self.orchestrator.settings())?;

        let mut active = self.active.lock().await;
        if let Some(run) = active.as_ref() {
            if run.is_running() {
                return Err(ScanError::AlreadyRunning(run.id));
            }
        }

        let run = ScanRun::from(&request);
        let run_id = run.id;
        let cancel = CancellationToken::new();
        let done = Arc::new(AtomicBool::new(false));

        let orchestrator = Arc::clone(&self.orchestrator);
        let token = cancel.clone();
        let finished = Arc::clone(&done);
        let state = Arc::clone(&self.state);
        set_state(&state, ScanState::Running);
        let handle = tokio::spawn(async move {
            let summary = orchestrator.run(run, request, token).await;
            set_state(&state, summary.state);
            finished.store(true, Ordering::SeqCst);
            summary
        });

        info!(run_id = %run_id, "Scan run accepted");
        *active = Some(ActiveRun {
            id: run_id,
            cancel,
            done,
            handle: Some(handle),
        });
        Ok(run_id)
    }

    /// Request cooperative cancellation; `false` when nothing is running
    pub async fn stop(&self) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(run) if run.is_running() => {
                info!(run_id = %run.id, "Stop requested");
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// `Idle` before the first run, then the state of the current or last run
    pub fn state(&self) -> ScanState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map(ActiveRun::is_running)
            .unwrap_or(false)
    }

    /// Id of the run currently executing
    pub async fn active_run(&self) -> Option<Uuid> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|run| run.is_running())
            .map(|run| run.id)
    }

    /// Wait for the current run to end and return its summary.
    ///
    /// Without a current run, returns the summary of the last run waited
    /// for, if any.
    pub async fn wait(&self) -> Result<Option<ScanSummary>> {
        let handle = {
            let mut active = self.active.lock().await;
            active.as_mut().and_then(|run| run.handle.take())
        };
        let Some(handle) = handle else {
            return Ok(self.last_summary.lock().await.clone());
        };

        let summary = handle.await.map_err(|e| {
            error!(error = %e, "Scan task panicked");
            ScanError::Catalog(romvault_common::Error::Internal(e.to_string()))
        })?;

        *self.last_summary.lock().await = Some(summary.clone());
        Ok(Some(summary))
    }

    /// Rename an entry on disk and in the catalog; refused while scanning
    ///
    /// Holds the run slot for the whole rename, so a scan cannot start
    /// until the file and its catalog row agree again.
    pub async fn rename_rom(&self, rom_id: Uuid, new_name: &str) -> Result<RomEntry> {
        let active = self.active.lock().await;
        if let Some(run) = active.as_ref().filter(|run| run.is_running()) {
            return Err(ScanError::AlreadyRunning(run.id));
        }
        let discoverer = Discoverer::new(self.orchestrator.settings())?;
        let renamed = crate::rename::rename_rom(
            self.orchestrator.catalog().as_ref(),
            &discoverer,
            rom_id,
            new_name,
        )
        .await;
        drop(active);
        renamed
    }
}
