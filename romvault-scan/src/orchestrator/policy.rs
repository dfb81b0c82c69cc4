//! Scan-type selection policy
//!
//! Decides, per diffed entry, whether a run touches it and how much work it
//! gets. Pure so that every scan type can be tested without a filesystem.

use romvault_common::models::ScanType;

use crate::discovery::{DiffedEntry, EntryChange};

/// Which providers an entry is (re)identified with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identify {
    /// Keep the current identification
    Skip,
    /// Keep accepted ids, query providers without one
    Missing,
    /// Like `Missing`, and re-fetch details of the kept ids
    Refresh,
    /// Drop previous ids and query every provider
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPlan {
    /// Only clear the missing flag of a reappeared entry
    Touch,
    Process { rehash: bool, identify: Identify },
}

impl EntryPlan {
    pub fn identify(&self) -> Identify {
        match self {
            EntryPlan::Touch => Identify::Skip,
            EntryPlan::Process { identify, .. } => *identify,
        }
    }
}

/// Work for one entry under a scan type; `None` leaves the entry alone
pub fn plan_entry(scan_type: ScanType, diffed: &DiffedEntry) -> Option<EntryPlan> {
    let Some(previous) = diffed.previous.as_ref() else {
        // New entries are always added
        let identify = if scan_type == ScanType::Hashes {
            Identify::Skip
        } else {
            Identify::Full
        };
        return Some(EntryPlan::Process {
            rehash: true,
            identify,
        });
    };

    let changed = diffed.change == EntryChange::Changed;
    let plan = match scan_type {
        ScanType::Complete => Some(EntryPlan::Process {
            rehash: true,
            identify: Identify::Full,
        }),
        ScanType::Quick => changed.then_some(EntryPlan::Process {
            rehash: true,
            identify: Identify::Missing,
        }),
        ScanType::Hashes => (changed || previous.hashes.is_empty()).then_some(EntryPlan::Process {
            rehash: true,
            identify: Identify::Skip,
        }),
        ScanType::Unidentified => previous.is_unidentified.then_some(EntryPlan::Process {
            rehash: changed || previous.hashes.is_empty(),
            identify: Identify::Missing,
        }),
        ScanType::Partial => (!previous.is_unidentified && previous.is_partial).then_some(
            EntryPlan::Process {
                rehash: changed,
                identify: Identify::Refresh,
            },
        ),
        // Only reached for entries of platforms new to the catalog
        ScanType::NewPlatforms => changed.then_some(EntryPlan::Process {
            rehash: true,
            identify: Identify::Missing,
        }),
    };

    match plan {
        None if diffed.reappeared => Some(EntryPlan::Touch),
        other => other,
    }
}
