//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Deployment mode, switches recipient resolution and snapshot key
    #[serde(default)]
    pub run_mode: RunMode,

    /// HTTP and page parsing settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Snapshot persistence settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Notification targets
    #[serde(default)]
    pub recipients: RecipientsConfig,

    /// Digest and mail delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Storage backend location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Storage key of the snapshot for the current run mode.
    pub fn snapshot_key(&self) -> &str {
        match (self.run_mode, self.snapshot.dev_key.as_deref()) {
            (RunMode::Dev, Some(dev_key)) if !dev_key.trim().is_empty() => dev_key,
            _ => &self.snapshot.key,
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.scraper.base_url).map_err(|e| {
            AppError::validation(format!(
                "scraper.base_url '{}' is not a valid URL: {e}",
                self.scraper.base_url
            ))
        })?;
        if self.scraper.collections.is_empty() {
            return Err(AppError::validation("No collections defined"));
        }
        for collection in &self.scraper.collections {
            if collection.store.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Collection {} has an empty store label",
                    collection.url
                )));
            }
            url::Url::parse(&collection.url).map_err(|e| {
                AppError::validation(format!(
                    "Collection URL '{}' is invalid: {e}",
                    collection.url
                ))
            })?;
        }
        if self.snapshot.key.trim().is_empty() {
            return Err(AppError::validation("snapshot.key is empty"));
        }
        if self.notify.subject.trim().is_empty() {
            return Err(AppError::validation("notify.subject is empty"));
        }
        let mail = &self.notify.mail;
        if mail.api_key.is_some() && mail.sender_email.trim().is_empty() {
            return Err(AppError::validation(
                "notify.mail.sender_email is required when an API key is set",
            ));
        }
        Ok(())
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Prod,
    Dev,
}

impl RunMode {
    /// Parse a mode name. Anything other than "dev" is production.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("dev") {
            RunMode::Dev
        } else {
            RunMode::Prod
        }
    }
}

/// HTTP client and page parsing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between detail page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Site root used to resolve relative product links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Fetch each detail page to determine stock status
    #[serde(default = "defaults::track_stock")]
    pub track_stock: bool,

    /// CSS selectors for the storefront theme
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Collection pages to scrape
    #[serde(default = "defaults::collections")]
    pub collections: Vec<Collection>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            base_url: defaults::base_url(),
            track_stock: defaults::track_stock(),
            selectors: SelectorConfig::default(),
            collections: defaults::collections(),
        }
    }
}

/// A collection page and the store label its listings carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub url: String,
    pub store: String,
}

impl Collection {
    pub fn new(url: impl Into<String>, store: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            store: store.into(),
        }
    }
}

/// CSS selectors for collection and product pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "defaults::item_selector")]
    pub item: String,

    #[serde(default = "defaults::title_link_selector")]
    pub title_link: String,

    #[serde(default = "defaults::sale_price_selector")]
    pub sale_price: String,

    #[serde(default = "defaults::regular_price_selector")]
    pub regular_price: String,

    #[serde(default = "defaults::cart_button_selector")]
    pub cart_button: String,

    /// Cart button text meaning the product cannot be bought
    #[serde(default = "defaults::sold_out_text")]
    pub sold_out_text: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: defaults::item_selector(),
            title_link: defaults::title_link_selector(),
            sale_price: defaults::sale_price_selector(),
            regular_price: defaults::regular_price_selector(),
            cart_button: defaults::cart_button_selector(),
            sold_out_text: defaults::sold_out_text(),
        }
    }
}

/// When the snapshot is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// After every non-empty fetch
    #[default]
    Always,
    /// Only when at least one change was classified
    OnChange,
}

/// Field used to correlate records across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKey {
    /// Detail page URL
    #[default]
    Link,
    /// Display name, for snapshots written by name-keyed deployments
    Name,
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Storage key of the snapshot
    #[serde(default = "defaults::snapshot_key")]
    pub key: String,

    /// Alternate key used in dev mode
    #[serde(default)]
    pub dev_key: Option<String>,

    #[serde(default)]
    pub policy: SnapshotPolicy,

    /// Record field that identifies a listing across runs
    #[serde(default)]
    pub identity_key: IdentityKey,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            key: defaults::snapshot_key(),
            dev_key: None,
            policy: SnapshotPolicy::default(),
            identity_key: IdentityKey::default(),
        }
    }
}

/// Notification targets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipientsConfig {
    /// Recipients used in dev mode and as the configured list
    #[serde(default)]
    pub emails: Vec<String>,

    /// Fallback recipients in prod mode
    #[serde(default)]
    pub admin_emails: Vec<String>,

    /// Storage key of the recipient directory object
    #[serde(default)]
    pub directory_key: Option<String>,
}

/// Digest content and delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "defaults::subject")]
    pub subject: String,

    /// Sentence shown above the change table
    #[serde(default = "defaults::intro")]
    pub intro: String,

    /// Include "Out of Stock" changes in the digest
    #[serde(default = "defaults::include_out_of_stock")]
    pub include_out_of_stock: bool,

    #[serde(default)]
    pub mail: MailConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            subject: defaults::subject(),
            intro: defaults::intro(),
            include_out_of_stock: defaults::include_out_of_stock(),
            mail: MailConfig::default(),
        }
    }
}

/// Transactional mail API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "defaults::mail_api_url")]
    pub api_url: String,

    /// API key; without one, digests are only logged
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub sender_email: String,

    #[serde(default = "defaults::sender_name")]
    pub sender_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::mail_api_url(),
            api_key: None,
            sender_email: String::new(),
            sender_name: defaults::sender_name(),
        }
    }
}

/// Storage backend location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3 bucket; when set, snapshots and the recipient directory live there
    #[serde(default)]
    pub bucket: Option<String>,

    /// Local directory used when no bucket is configured
    #[serde(default = "defaults::local_dir")]
    pub local_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            local_dir: defaults::local_dir(),
        }
    }
}

mod defaults {
    use super::Collection;

    // Scraper defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        400
    }
    pub fn base_url() -> String {
        "https://thebrokenbindingsub.com".into()
    }
    pub fn track_stock() -> bool {
        true
    }
    pub fn collections() -> Vec<Collection> {
        vec![
            Collection::new(
                "https://thebrokenbindingsub.com/collections/to-the-stars",
                "To The Stars",
            ),
            Collection::new(
                "https://thebrokenbindingsub.com/collections/the-infirmary",
                "The Infirmary",
            ),
            Collection::new(
                "https://thebrokenbindingsub.com/collections/dragons-hoard",
                "Dragon's Hoard",
            ),
        ]
    }

    // Selector defaults
    pub fn item_selector() -> String {
        "li.grid__item".into()
    }
    pub fn title_link_selector() -> String {
        "h3.card__heading a.full-unstyled-link".into()
    }
    pub fn sale_price_selector() -> String {
        "span.price-item--sale".into()
    }
    pub fn regular_price_selector() -> String {
        "span.price-item--regular".into()
    }
    pub fn cart_button_selector() -> String {
        "button.product-form__submit".into()
    }
    pub fn sold_out_text() -> String {
        "Sold out".into()
    }

    // Snapshot defaults
    pub fn snapshot_key() -> String {
        "items_seen.json".into()
    }

    // Notify defaults
    pub fn subject() -> String {
        "New Broken Binding Books Available!".into()
    }
    pub fn intro() -> String {
        "New book(s) available:".into()
    }
    pub fn include_out_of_stock() -> bool {
        true
    }
    pub fn mail_api_url() -> String {
        "https://api.brevo.com/v3/smtp/email".into()
    }
    pub fn sender_name() -> String {
        "Shelfwatch".into()
    }

    // Storage defaults
    pub fn local_dir() -> String {
        "storage".into()
    }
}
