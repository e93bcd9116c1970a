// src/config.rs

//! Configuration loading for an invocation.
//!
//! The config file is read once, then environment overrides are applied
//! through an explicit lookup so nothing downstream reads the environment.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::models::{Config, RunMode};

/// Default config file location, overridable with `CONFIG_PATH`.
pub const DEFAULT_CONFIG_PATH: &str = "shelfwatch.toml";

/// Load the config for this invocation from the process environment.
pub fn load_for_invocation() -> Config {
    let path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = if Path::new(&path).exists() {
        Config::load_or_default(&path)
    } else {
        log::info!("No config file at {}, using defaults", path);
        Config::default()
    };
    apply_env(&mut config);
    config
}

/// Apply overrides from the process environment.
pub fn apply_env(config: &mut Config) {
    apply_env_with(config, |name| std::env::var(name).ok());
}

/// Apply overrides using the given variable lookup.
pub fn apply_env_with<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(mode) = var("RUN_MODE") {
        config.run_mode = RunMode::parse(&mode);
    }
    if let Some(bucket) = var("BUCKET_NAME") {
        config.storage.bucket = Some(bucket);
    }
    if let Some(key) = var("FILE_PATH") {
        config.snapshot.key = key;
    }
    if let Some(key) = var("DEV_FILE_KEY") {
        config.snapshot.dev_key = Some(key);
    }
    if let Some(key) = var("RECIPIENTS_KEY") {
        config.recipients.directory_key = Some(key);
    }
    if let Some(emails) = var("RECIPIENT_EMAILS").and_then(|v| parse_json("RECIPIENT_EMAILS", &v))
    {
        config.recipients.emails = emails;
    }
    if let Some(emails) = var("ADMIN_EMAILS").and_then(|v| parse_json("ADMIN_EMAILS", &v)) {
        config.recipients.admin_emails = emails;
    }
    if let Some(key) = var("MAIL_API_KEY") {
        config.notify.mail.api_key = Some(key);
    }
    if let Some(email) = var("MAIL_SENDER_EMAIL") {
        config.notify.mail.sender_email = email;
    }
    if let Some(name) = var("MAIL_SENDER_NAME") {
        config.notify.mail.sender_name = name;
    }
    if let Some(secs) = var("SCRAPE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.scraper.timeout_secs = secs;
    }
    if let Some(ms) = var("REQUEST_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.scraper.request_delay_ms = ms;
    }
}

fn parse_json<T: DeserializeOwned>(name: &str, value: &str) -> Option<T> {
    serde_json::from_str(value)
        .map_err(|e| log::warn!("Ignoring {}: not valid JSON ({})", name, e))
        .ok()
}
