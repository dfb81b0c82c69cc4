//! romvault-scan - Library Scan & Metadata Reconciliation Engine
//!
//! Walks a ROM library root, fingerprints every entry, asks external
//! metadata providers who each entry is, reconciles their answers into one
//! identification per entry, groups sibling versions of the same game and
//! persists the result incrementally to the catalog.
//!
//! Entry point for callers is [`ScanController`]: start a run with a
//! [`ScanRequest`], observe [`romvault_common::events::ScanEvent`]s on the
//! supplied sink, stop it, wait for the summary.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hashing;
pub mod orchestrator;
pub mod providers;
pub mod reconciler;
pub mod rename;
pub mod siblings;
pub mod tags;

pub use catalog::{Catalog, MemoryCatalog, SqliteCatalog};
pub use config::ScanSettings;
pub use error::{Result, ScanError};
pub use orchestrator::{ScanController, ScanOrchestrator, ScanRequest};
pub use providers::{MetadataProvider, ProviderRegistry};
