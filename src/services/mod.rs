//! Service layer for the watcher.
//!
//! - Listing scraping (`StorefrontCrawler`)
//! - Recipient resolution (`RecipientDirectory`)
//! - Digest rendering (`Digest`)
//! - Delivery (`Notifier`, `HttpMailer`, `LogNotifier`)

pub mod digest;
pub mod listings;
pub mod notifier;
pub mod recipients;

pub use digest::Digest;
pub use listings::{FetchOutcome, ListingSource, StorefrontCrawler};
pub use notifier::{DeliveryReport, HttpMailer, LogNotifier, Notifier, deliver_all};
pub use recipients::RecipientDirectory;
