// src/models/mod.rs

//! Domain models for the watcher.

mod config;
mod listing;

// Re-export all public types
pub use config::{
    Collection, Config, IdentityKey, MailConfig, NotifyConfig, RecipientsConfig, RunMode, ScraperConfig,
    SelectorConfig, SnapshotConfig, SnapshotPolicy, StorageConfig,
};
pub use listing::{ClassifiedChange, ListingRecord, UpdateType};
