// src/pipeline/check.rs

//! One complete check: fetch, diff, notify, persist.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{ClassifiedChange, Config, SnapshotPolicy};
use crate::pipeline::diff::DiffCalculator;
use crate::services::{
    DeliveryReport, Digest, ListingSource, Notifier, RecipientDirectory, deliver_all,
};
use crate::storage::{BlobStorage, SnapshotStore};
use crate::utils::log::{step, summary};

const TOTAL_STEPS: usize = 5;

/// Per-run switches that are not part of the deployment config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Write the snapshot according to `snapshot.policy`
    pub persist: bool,
}

impl CheckOptions {
    /// Preview a run without touching the stored snapshot.
    pub fn dry_run() -> Self {
        Self { persist: false }
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { persist: true }
    }
}

/// How a check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The source returned nothing; the snapshot was left untouched
    EmptyFetch,
    /// Nothing differed from the snapshot
    NoChanges,
    /// Changes were found but none belong in the digest
    NothingToNotify,
    /// A digest was rendered and dispatched
    Notified,
}

/// Summary of a check run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CheckOutcome,
    pub recipient_count: usize,
    pub previous_count: usize,
    pub current_count: usize,
    /// Every classified change, including ones left out of the digest
    pub changes: Vec<ClassifiedChange>,
    pub notified_count: usize,
    /// The digest, when one was rendered
    #[serde(skip)]
    pub digest: Option<Digest>,
    pub sent: Vec<String>,
    pub failed: Vec<String>,
    pub snapshot_written: bool,
    /// Where the snapshot was written, when it was
    pub snapshot_location: Option<String>,
    pub snapshot_saved_at: Option<DateTime<Utc>>,
}

impl CheckReport {
    fn log_summary(&self) {
        summary(
            "Check",
            &[
                ("Outcome", format!("{:?}", self.outcome)),
                ("Previous records", self.previous_count.to_string()),
                ("Current records", self.current_count.to_string()),
                ("Changes", self.changes.len().to_string()),
                ("In digest", self.notified_count.to_string()),
                (
                    "Deliveries",
                    format!("{} sent, {} failed", self.sent.len(), self.failed.len()),
                ),
                ("Snapshot written", self.snapshot_written.to_string()),
            ],
        );
    }
}

/// Run one check against the given collaborators.
///
/// Only an invalid config is an error. Fetch, storage and delivery
/// failures are logged and reflected in the report.
pub async fn run_check(
    config: &Config,
    source: &dyn ListingSource,
    storage: &dyn BlobStorage,
    notifier: &dyn Notifier,
) -> Result<CheckReport> {
    run_check_with(config, source, storage, notifier, CheckOptions::default()).await
}

/// Run one check with explicit [`CheckOptions`].
pub async fn run_check_with(
    config: &Config,
    source: &dyn ListingSource,
    storage: &dyn BlobStorage,
    notifier: &dyn Notifier,
    options: CheckOptions,
) -> Result<CheckReport> {
    config.validate()?;
    let started_at = Utc::now();

    step(1, TOTAL_STEPS, "Resolve recipients");
    let directory = RecipientDirectory::new(&config.recipients, config.run_mode, Some(storage));
    let recipients = directory.resolve().await;

    step(2, TOTAL_STEPS, "Load snapshot");
    let snapshot = SnapshotStore::new(storage, config.snapshot_key());
    let previous = snapshot.load().await;

    step(3, TOTAL_STEPS, "Fetch current listings");
    let current = source.fetch_listings().await;

    let mut report = CheckReport {
        started_at,
        finished_at: started_at,
        outcome: CheckOutcome::EmptyFetch,
        recipient_count: recipients.len(),
        previous_count: previous.len(),
        current_count: current.len(),
        changes: Vec::new(),
        notified_count: 0,
        digest: None,
        sent: Vec::new(),
        failed: Vec::new(),
        snapshot_written: false,
        snapshot_location: None,
        snapshot_saved_at: None,
    };

    if current.is_empty() {
        log::warn!(
            "Fetch returned no listings; keeping snapshot at {}",
            snapshot.location()
        );
        report.finished_at = Utc::now();
        report.log_summary();
        return Ok(report);
    }

    step(4, TOTAL_STEPS, "Classify and notify");
    let diff = DiffCalculator::keyed_by(config.snapshot.identity_key)
        .calculate(&previous, &current);
    let notifiable = diff.notifiable(config.notify.include_out_of_stock);
    report.notified_count = notifiable.len();

    report.outcome = if !diff.has_changes() {
        log::info!("No new listings found.");
        CheckOutcome::NoChanges
    } else if notifiable.is_empty() {
        log::info!(
            "{} changes found, none to notify",
            diff.change_count()
        );
        CheckOutcome::NothingToNotify
    } else {
        let digest = Digest::render(&config.notify, &notifiable);
        let DeliveryReport { sent, failed } =
            deliver_all(notifier, &digest.subject, &digest.html, &recipients).await;
        log::info!(
            "{} changes found, digest sent to {} of {} recipients",
            notifiable.len(),
            sent.len(),
            recipients.len()
        );
        report.sent = sent;
        report.failed = failed;
        report.digest = Some(digest);
        CheckOutcome::Notified
    };

    step(5, TOTAL_STEPS, "Persist snapshot");
    let should_write = match config.snapshot.policy {
        SnapshotPolicy::Always => true,
        SnapshotPolicy::OnChange => diff.has_changes(),
    };
    if !options.persist {
        log::info!("Dry run, leaving snapshot at {}", snapshot.location());
    } else if should_write {
        match snapshot.save(&current).await {
            Ok(meta) => {
                report.snapshot_written = true;
                report.snapshot_location = Some(meta.location);
                report.snapshot_saved_at = Some(meta.timestamp);
            }
            Err(e) => log::error!("Error saving snapshot to {}: {}", snapshot.location(), e),
        }
    } else {
        log::info!("Snapshot unchanged, skipping write");
    }

    report.changes = diff.changes;
    report.finished_at = Utc::now();
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::{IdentityKey, ListingRecord, RunMode, UpdateType};
    use crate::storage::LocalStorage;

    struct StaticSource(Vec<ListingRecord>);

    #[async_trait]
    impl ListingSource for StaticSource {
        async fn fetch_listings(&self) -> Vec<ListingRecord> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail_for: Option<&'static str>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingNotifier {
        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, subject: &str, body: &str, to: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string(), to.to_string()));
            if self.fail_for == Some(to) {
                return Err(AppError::notify("rejected"));
            }
            Ok(())
        }
    }

    fn config(recipients: &[&str]) -> Config {
        let mut config = Config::default();
        config.run_mode = RunMode::Dev;
        config.recipients.emails = recipients.iter().map(|r| r.to_string()).collect();
        config
    }

    fn book(link: &str, price: &str, in_stock: bool) -> ListingRecord {
        ListingRecord::new("A", price, "S1", link).with_stock(in_stock)
    }

    async fn seed(storage: &LocalStorage, config: &Config, records: &[ListingRecord]) {
        SnapshotStore::new(storage, config.snapshot_key())
            .save(records)
            .await
            .unwrap();
    }

    async fn stored(storage: &LocalStorage, config: &Config) -> Vec<ListingRecord> {
        SnapshotStore::new(storage, config.snapshot_key())
            .try_load()
            .await
            .unwrap()
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_unchanged_listing_sends_nothing() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["a@x.com"]);
        let records = vec![book("L1", "$10", true)];
        seed(&storage, &config, &records).await;

        let notifier = RecordingNotifier::default();
        let report = run_check(&config, &StaticSource(records.clone()), &storage, &notifier)
            .await
            .unwrap();

        assert_eq!(report.outcome, CheckOutcome::NoChanges);
        assert!(report.changes.is_empty());
        assert!(notifier.calls().is_empty());
        assert_eq!(stored(&storage, &config).await, records);
    }

    #[tokio::test]
    async fn test_on_change_policy_skips_write_without_changes() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut config = config(&["a@x.com"]);
        config.snapshot.policy = SnapshotPolicy::OnChange;
        let records = vec![book("L1", "$10", true)];
        seed(&storage, &config, &records).await;

        let notifier = RecordingNotifier::default();
        let report = run_check(&config, &StaticSource(records), &storage, &notifier)
            .await
            .unwrap();

        assert!(!report.snapshot_written);
    }

    #[tokio::test]
    async fn test_price_change_is_notified_and_persisted() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["a@x.com"]);
        seed(&storage, &config, &[book("L1", "$10", true)]).await;

        let current = vec![book("L1", "$12", true)];
        let notifier = RecordingNotifier::default();
        let report = run_check(&config, &StaticSource(current.clone()), &storage, &notifier)
            .await
            .unwrap();

        assert_eq!(report.outcome, CheckOutcome::Notified);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(
            report.changes[0].update_type,
            UpdateType::PriceChange {
                previous: "$10".into()
            }
        );

        let calls = notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "New Broken Binding Books Available!");
        assert!(calls[0].1.contains("Price Change - Previously $10"));
        assert_eq!(calls[0].2, "a@x.com");
        assert_eq!(report.digest.as_ref().map(|d| d.html.as_str()), Some(calls[0].1.as_str()));

        assert!(report.snapshot_written);
        assert_eq!(stored(&storage, &config).await, current);
        let location = report.snapshot_location.as_deref().unwrap();
        assert!(location.ends_with("items_seen.json"));
        assert!(report.snapshot_saved_at.is_some());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_snapshot_for_next_run() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["a@x.com"]);
        let previous = vec![book("L1", "$10", true)];
        seed(&storage, &config, &previous).await;

        let source = StaticSource(vec![book("L1", "$12", true)]);
        let notifier = RecordingNotifier::default();
        let preview = run_check_with(
            &config,
            &source,
            &storage,
            &notifier,
            CheckOptions::dry_run(),
        )
        .await
        .unwrap();

        assert_eq!(preview.outcome, CheckOutcome::Notified);
        assert!(!preview.snapshot_written);
        assert!(preview.snapshot_location.is_none());
        assert_eq!(stored(&storage, &config).await, previous);

        // The real run still sees the same change.
        let report = run_check(&config, &source, &storage, &notifier)
            .await
            .unwrap();
        assert_eq!(report.changes.len(), 1);
        assert!(report.snapshot_written);
    }

    #[tokio::test]
    async fn test_name_identity_reports_url_change() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut config = config(&["a@x.com"]);
        config.snapshot.identity_key = IdentityKey::Name;
        seed(&storage, &config, &[book("L1", "$10", true)]).await;

        let notifier = RecordingNotifier::default();
        let report = run_check(
            &config,
            &StaticSource(vec![book("L2", "$10", true)]),
            &storage,
            &notifier,
        )
        .await
        .unwrap();

        assert_eq!(report.changes[0].update_type, UpdateType::UrlChange);
        assert!(notifier.calls()[0].1.contains("URL Change"));
    }

    #[tokio::test]
    async fn test_one_dispatch_per_recipient_with_same_body() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["b@x.com", "a@x.com", "a@x.com"]);

        let notifier = RecordingNotifier::default();
        let report = run_check(
            &config,
            &StaticSource(vec![book("L2", "$5", true)]),
            &storage,
            &notifier,
        )
        .await
        .unwrap();

        assert_eq!(report.changes[0].update_type, UpdateType::NewItem);

        let calls = notifier.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].2, "a@x.com");
        assert_eq!(calls[1].2, "b@x.com");
        assert_eq!(calls[0].1, calls[1].1);
        assert_eq!(report.sent, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_snapshot() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["a@x.com"]);
        let previous = vec![book("L1", "$10", true), book("L2", "$20", true)];
        seed(&storage, &config, &previous).await;

        let notifier = RecordingNotifier::default();
        let report = run_check(&config, &StaticSource(Vec::new()), &storage, &notifier)
            .await
            .unwrap();

        assert_eq!(report.outcome, CheckOutcome::EmptyFetch);
        assert!(!report.snapshot_written);
        assert!(notifier.calls().is_empty());
        assert_eq!(stored(&storage, &config).await, previous);
    }

    #[tokio::test]
    async fn test_failed_recipient_does_not_block_others_or_write() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["a@x.com", "b@x.com"]);

        let notifier = RecordingNotifier {
            fail_for: Some("a@x.com"),
            ..RecordingNotifier::default()
        };
        let report = run_check(
            &config,
            &StaticSource(vec![book("L1", "$10", true)]),
            &storage,
            &notifier,
        )
        .await
        .unwrap();

        assert_eq!(notifier.calls().len(), 2);
        assert_eq!(report.failed, vec!["a@x.com"]);
        assert_eq!(report.sent, vec!["b@x.com"]);
        assert!(report.snapshot_written);
    }

    #[tokio::test]
    async fn test_out_of_stock_hidden_from_digest_but_persisted() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut config = config(&["a@x.com"]);
        config.notify.include_out_of_stock = false;
        seed(&storage, &config, &[book("L1", "$10", true)]).await;

        let current = vec![book("L1", "$10", false)];
        let notifier = RecordingNotifier::default();
        let report = run_check(&config, &StaticSource(current.clone()), &storage, &notifier)
            .await
            .unwrap();

        assert_eq!(report.outcome, CheckOutcome::NothingToNotify);
        assert_eq!(report.changes[0].update_type, UpdateType::OutOfStock);
        assert!(notifier.calls().is_empty());
        assert_eq!(stored(&storage, &config).await, current);
    }

    #[tokio::test]
    async fn test_no_recipients_still_persists() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&[]);

        let notifier = RecordingNotifier::default();
        let report = run_check(
            &config,
            &StaticSource(vec![book("L1", "$10", true)]),
            &storage,
            &notifier,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome, CheckOutcome::Notified);
        assert!(notifier.calls().is_empty());
        assert!(report.snapshot_written);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_treated_as_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config(&["a@x.com"]);
        storage
            .write_bytes(config.snapshot_key(), b"{broken")
            .await
            .unwrap();

        let notifier = RecordingNotifier::default();
        let report = run_check(
            &config,
            &StaticSource(vec![book("L1", "$10", false)]),
            &storage,
            &notifier,
        )
        .await
        .unwrap();

        assert_eq!(report.previous_count, 0);
        assert_eq!(report.changes[0].update_type, UpdateType::NewItemOutOfStock);
        assert!(report.snapshot_written);
    }

    #[tokio::test]
    async fn test_invalid_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut config = config(&["a@x.com"]);
        config.scraper.collections.clear();

        let notifier = RecordingNotifier::default();
        let result = run_check(&config, &StaticSource(Vec::new()), &storage, &notifier).await;
        assert!(result.is_err());
    }
}
