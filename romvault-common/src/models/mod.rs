//! Catalog data model
//!
//! Platforms and ROM entries are owned by the persisted catalog; scan runs
//! are owned by the orchestrator for their lifetime.

pub mod platform;
pub mod rom;
pub mod scan_run;

pub use platform::PlatformFolder;
pub use rom::{
    EntryFailure, FileCategory, GameMetadata, IdentStatus, ProviderFailure, ProviderId,
    RomEntry, RomFile, RomHashes, RomTags, SiblingGroup,
};
pub use scan_run::{ScanRun, ScanState, ScanStats, ScanSummary, ScanType, StateTransition};
