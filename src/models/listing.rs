// src/models/listing.rs

//! Listing records and their classified changes.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// One product listing as observed on a collection page.
///
/// Two records are equal only when every field matches, including the
/// stock flag. The link is the identity key used to correlate runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ListingRecord {
    /// Display name of the product
    pub name: String,

    /// Price text as shown on the page (e.g. "$24.00"), compared verbatim
    pub price: String,

    /// Collection the listing was found in
    pub store: String,

    /// Absolute URL of the product detail page
    pub link: String,

    /// Stock flag, absent when stock tracking is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

impl ListingRecord {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        store: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            store: store.into(),
            link: link.into(),
            in_stock: None,
        }
    }

    /// Attach a stock flag.
    pub fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    /// Whether the listing can be bought. Untracked stock counts as available.
    pub fn is_available(&self) -> bool {
        self.in_stock.unwrap_or(true)
    }
}

/// Semantic label attached to a new or changed listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateType {
    NewItem,
    NewItemOutOfStock,
    Restocked,
    OutOfStock,
    PriceChange { previous: String },
    StoreChange,
    UrlChange,
    UnknownChange,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateType::NewItem => f.write_str("New Item"),
            UpdateType::NewItemOutOfStock => f.write_str("New Item - Out of Stock"),
            UpdateType::Restocked => f.write_str("Restocked"),
            UpdateType::OutOfStock => f.write_str("Out of Stock"),
            UpdateType::PriceChange { previous } => {
                write!(f, "Price Change - Previously {previous}")
            }
            UpdateType::StoreChange => f.write_str("Store Change"),
            UpdateType::UrlChange => f.write_str("URL Change"),
            UpdateType::UnknownChange => f.write_str("Unknown Change"),
        }
    }
}

impl Serialize for UpdateType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A listing record annotated with its update type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassifiedChange {
    #[serde(flatten)]
    pub record: ListingRecord,
    pub update_type: UpdateType,
}

impl ClassifiedChange {
    pub fn new(record: ListingRecord, update_type: UpdateType) -> Self {
        Self {
            record,
            update_type,
        }
    }
}
