// src/services/recipients.rs

//! Recipient directory.
//!
//! In dev mode the configured list is used as-is. In prod mode the list is
//! read from a directory object in storage, falling back to the admin list
//! whenever that object is not configured or cannot be read.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{RecipientsConfig, RunMode};
use crate::storage::BlobStorage;

/// Accepted shapes of the directory object.
#[derive(Deserialize)]
#[serde(untagged)]
enum DirectoryFile {
    List(Vec<String>),
    Wrapped { recipients: Vec<String> },
}

/// Resolves who gets this run's digest.
pub struct RecipientDirectory<'a> {
    config: &'a RecipientsConfig,
    run_mode: RunMode,
    storage: Option<&'a dyn BlobStorage>,
}

impl<'a> RecipientDirectory<'a> {
    pub fn new(
        config: &'a RecipientsConfig,
        run_mode: RunMode,
        storage: Option<&'a dyn BlobStorage>,
    ) -> Self {
        Self {
            config,
            run_mode,
            storage,
        }
    }

    /// Resolve a sorted, deduplicated recipient list. Never fails.
    pub async fn resolve(&self) -> Vec<String> {
        let recipients = match self.run_mode {
            RunMode::Dev => {
                let list = normalize(&self.config.emails);
                log::info!("RUN_MODE=dev using configured recipients (count={})", list.len());
                list
            }
            RunMode::Prod => {
                let list = match self.load_directory().await {
                    Some(list) => list,
                    None => normalize(&self.config.admin_emails),
                };
                log::info!("RUN_MODE=prod using recipients (count={})", list.len());
                list
            }
        };

        if recipients.is_empty() {
            log::warn!("No recipients resolved; digest will not be sent");
        }
        recipients
    }

    /// Read the directory object, or `None` to fall back.
    async fn load_directory(&self) -> Option<Vec<String>> {
        let (Some(storage), Some(key)) = (self.storage, self.config.directory_key.as_deref())
        else {
            log::info!("No recipient directory configured, using admin recipients");
            return None;
        };

        match storage.read_bytes(key).await {
            Ok(Some(bytes)) => match parse_directory(&bytes) {
                Ok(list) => Some(normalize(&list)),
                Err(e) => {
                    log::error!("Invalid recipient directory {}: {}", storage.location(key), e);
                    None
                }
            },
            Ok(None) => {
                log::error!("Recipient directory not found at {}", storage.location(key));
                None
            }
            Err(e) => {
                log::error!("Could not load recipients from {}: {}", storage.location(key), e);
                None
            }
        }
    }
}

fn parse_directory(bytes: &[u8]) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    match serde_json::from_value(value) {
        Ok(DirectoryFile::List(list)) | Ok(DirectoryFile::Wrapped { recipients: list }) => {
            Ok(list)
        }
        Err(_) => Err(AppError::validation(
            "recipients JSON must be a list or an object with 'recipients'",
        )),
    }
}

/// Trim, drop blanks, deduplicate and sort.
pub fn normalize(emails: &[String]) -> Vec<String> {
    emails
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
