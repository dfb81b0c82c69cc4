//! # RomVault Common Library
//!
//! Shared code for the RomVault library scanner including:
//! - Catalog data model (platforms, ROM entries, scan runs)
//! - Scan progress events and the EventBus
//! - Configuration loading and library root resolution
//! - Database initialization

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
