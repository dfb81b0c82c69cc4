//! Scan run state machine
//!
//! A scan run progresses `Idle → Running → {Completed | Stopped | Failed}`.
//! Terminal states are never left again; a new run gets a new record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ProviderId;

/// Policy restricting which platforms and entries a run processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Only platform folders not yet in the catalog
    NewPlatforms,
    /// New entries and entries whose size/mtime changed
    Quick,
    /// Entries currently unidentified
    Unidentified,
    /// Entries identified but lacking enrichment fields
    Partial,
    /// Every entry, forced re-identification
    Complete,
    /// Recompute hashes for entries missing one
    Hashes,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::NewPlatforms => "new_platforms",
            ScanType::Quick => "quick",
            ScanType::Unidentified => "unidentified",
            ScanType::Partial => "partial",
            ScanType::Complete => "complete",
            ScanType::Hashes => "hashes",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "new_platforms" => Ok(ScanType::NewPlatforms),
            "quick" => Ok(ScanType::Quick),
            "unidentified" => Ok(ScanType::Unidentified),
            "partial" => Ok(ScanType::Partial),
            "complete" => Ok(ScanType::Complete),
            "hashes" => Ok(ScanType::Hashes),
            other => Err(format!("unknown scan type: {}", other)),
        }
    }
}

/// Scan run lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Running,
    /// Every selected entry was processed
    Completed,
    /// Cancelled cooperatively; committed entries are kept
    Stopped,
    /// Whole-run precondition failure (library root unreachable)
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Stopped | ScanState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Running => "running",
            ScanState::Completed => "completed",
            ScanState::Stopped => "stopped",
            ScanState::Failed => "failed",
        }
    }
}

impl FromStr for ScanState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ScanState::Idle),
            "running" => Ok(ScanState::Running),
            "completed" => Ok(ScanState::Completed),
            "stopped" => Ok(ScanState::Stopped),
            "failed" => Ok(ScanState::Failed),
            other => Err(format!("unknown scan state: {}", other)),
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: ScanState,
    pub new_state: ScanState,
    pub transitioned_at: DateTime<Utc>,
}

/// Running totals of a scan run (or of one platform within it)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub platforms_scanned: usize,
    pub platforms_added: usize,
    pub roms_scanned: usize,
    pub roms_added: usize,
    pub roms_identified: usize,
    /// Entries carrying a read error or provider error
    pub roms_failed: usize,
    /// Entries newly flagged missing from the filesystem
    pub roms_missing: usize,
}

impl ScanStats {
    pub fn absorb(&mut self, other: &ScanStats) {
        self.platforms_scanned += other.platforms_scanned;
        self.platforms_added += other.platforms_added;
        self.roms_scanned += other.roms_scanned;
        self.roms_added += other.roms_added;
        self.roms_identified += other.roms_identified;
        self.roms_failed += other.roms_failed;
        self.roms_missing += other.roms_missing;
    }
}

/// One scan run (in-memory state, persisted at start and end)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: Uuid,
    pub scan_type: ScanType,

    /// Requested platform folders or ids; empty means the whole library
    pub platforms: Vec<String>,

    /// Requested providers; empty means every enabled provider
    pub providers: Vec<ProviderId>,

    pub state: ScanState,
    pub stats: ScanStats,

    /// Stop was requested
    pub cancelled: bool,

    /// Reason for `Failed`
    pub failure: Option<String>,

    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ScanRun {
    pub fn new(scan_type: ScanType, platforms: Vec<String>, providers: Vec<ProviderId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scan_type,
            platforms,
            providers,
            state: ScanState::Idle,
            stats: ScanStats::default(),
            cancelled: false,
            failure: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: ScanState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        match new_state {
            ScanState::Running => self.started_at = transition.transitioned_at,
            ScanState::Completed | ScanState::Stopped | ScanState::Failed => {
                self.ended_at = Some(transition.transitioned_at);
            }
            ScanState::Idle => {}
        }

        transition
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> StateTransition {
        self.failure = Some(reason.into());
        self.transition_to(ScanState::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            run_id: self.id,
            scan_type: self.scan_type,
            state: self.state,
            stats: self.stats,
            failure: self.failure.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

/// Final summary reported when a run ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub run_id: Uuid,
    pub scan_type: ScanType,
    pub state: ScanState,
    pub stats: ScanStats,
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_type_round_trip_names() {
        for scan_type in [
            ScanType::NewPlatforms,
            ScanType::Quick,
            ScanType::Unidentified,
            ScanType::Partial,
            ScanType::Complete,
            ScanType::Hashes,
        ] {
            assert_eq!(scan_type.as_str().parse::<ScanType>(), Ok(scan_type));
        }
        assert_eq!("new-platforms".parse::<ScanType>(), Ok(ScanType::NewPlatforms));
        assert!("full".parse::<ScanType>().is_err());
    }

    #[test]
    fn test_transition_sets_end_time_on_terminal() {
        let mut run = ScanRun::new(ScanType::Quick, vec![], vec![]);
        assert_eq!(run.state, ScanState::Idle);

        let t = run.transition_to(ScanState::Running);
        assert_eq!(t.old_state, ScanState::Idle);
        assert!(run.ended_at.is_none());
        assert!(!run.is_terminal());

        run.transition_to(ScanState::Stopped);
        assert!(run.ended_at.is_some());
        assert!(run.is_terminal());
        assert_eq!(run.summary().state, ScanState::Stopped);
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = ScanStats::default();
        let platform = ScanStats {
            platforms_scanned: 1,
            roms_scanned: 3,
            roms_added: 2,
            roms_identified: 1,
            ..Default::default()
        };
        total.absorb(&platform);
        total.absorb(&platform);
        assert_eq!(total.platforms_scanned, 2);
        assert_eq!(total.roms_scanned, 6);
        assert_eq!(total.roms_identified, 2);
    }
}
