// src/services/listings.rs

//! Listing source service.
//!
//! Scrapes the configured collection pages and, when stock tracking is on,
//! each product's detail page for its add-to-cart button.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Collection, ListingRecord, ScraperConfig, SelectorConfig};
use crate::utils::http::{create_async_client, fetch_text};
use crate::utils::resolve_url;

const NO_PRICE: &str = "No price found";

/// Anything that can produce the current listing.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the current listing. Failures are absorbed per page or item,
    /// so a total outage yields an empty list rather than an error.
    async fn fetch_listings(&self) -> Vec<ListingRecord>;
}

/// Summary of a scrape run.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<ListingRecord>,
    pub page_total: usize,
    pub page_failures: usize,
    pub detail_total: usize,
    pub detail_failures: usize,
}

/// Compiled CSS selectors for one storefront theme.
struct Selectors {
    item: Selector,
    title_link: Selector,
    sale_price: Selector,
    regular_price: Selector,
    cart_button: Selector,
    sold_out_text: String,
}

impl Selectors {
    fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            item: parse_selector(&config.item)?,
            title_link: parse_selector(&config.title_link)?,
            sale_price: parse_selector(&config.sale_price)?,
            regular_price: parse_selector(&config.regular_price)?,
            cart_button: parse_selector(&config.cart_button)?,
            sold_out_text: config.sold_out_text.clone(),
        })
    }
}

/// Scraper for a storefront's collection pages.
pub struct StorefrontCrawler {
    config: ScraperConfig,
    selectors: Selectors,
    client: Client,
    base_url: Url,
}

impl StorefrontCrawler {
    /// Create a crawler, compiling selectors and building the HTTP client.
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = create_async_client(&config)?;
        Self::with_client(config, client)
    }

    /// Create a crawler using an existing HTTP client.
    pub fn with_client(config: ScraperConfig, client: Client) -> Result<Self> {
        let selectors = Selectors::compile(&config.selectors)?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            config,
            selectors,
            client,
            base_url,
        })
    }

    /// Fetch every collection in order, one request at a time.
    pub async fn fetch_all(&self) -> FetchOutcome {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let mut outcome = FetchOutcome {
            page_total: self.config.collections.len(),
            ..FetchOutcome::default()
        };

        for collection in &self.config.collections {
            let listed = match self.fetch_collection(collection).await {
                Ok(records) => records,
                Err(error) => {
                    outcome.page_failures += 1;
                    log::warn!("Error fetching collection {}: {}", collection.url, error);
                    continue;
                }
            };
            log::info!("{}: {} listings", collection.store, listed.len());

            if !self.config.track_stock {
                outcome.records.extend(listed);
                continue;
            }

            for mut record in listed {
                outcome.detail_total += 1;
                match self.fetch_stock(&record.link).await {
                    Ok(in_stock) => {
                        record.in_stock = Some(in_stock);
                        outcome.records.push(record);
                    }
                    Err(error) => {
                        outcome.detail_failures += 1;
                        log::warn!("Error fetching product {}: {}", record.link, error);
                    }
                }

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        outcome
    }

    /// Fetch and parse one collection page.
    async fn fetch_collection(&self, collection: &Collection) -> Result<Vec<ListingRecord>> {
        let html = fetch_text(&self.client, &collection.url).await?;
        Ok(self.parse_collection(&html, &collection.store))
    }

    /// Fetch a detail page and read its stock status.
    async fn fetch_stock(&self, link: &str) -> Result<bool> {
        let html = fetch_text(&self.client, link).await?;
        Ok(self.parse_stock(&html))
    }

    /// Extract listing records from a collection page.
    fn parse_collection(&self, html: &str, store: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.item)
            .filter_map(|item| self.parse_item(&item, store))
            .collect()
    }

    fn parse_item(&self, item: &ElementRef, store: &str) -> Option<ListingRecord> {
        let selectors = &self.selectors;
        let Some(title) = item.select(&selectors.title_link).next() else {
            log::debug!("Skipping {} item without a title link", store);
            return None;
        };
        let href = title.value().attr("href")?;

        let name = element_text(&title);
        let price = item
            .select(&selectors.sale_price)
            .next()
            .or_else(|| item.select(&selectors.regular_price).next())
            .map(|el| element_text(&el))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| NO_PRICE.to_string());
        let link = resolve_url(&self.base_url, href);

        Some(ListingRecord::new(name, price, store, link))
    }

    /// In stock when the cart button exists and is not marked sold out.
    fn parse_stock(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.cart_button)
            .next()
            .map(|button| !element_text(&button).contains(&self.selectors.sold_out_text))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ListingSource for StorefrontCrawler {
    async fn fetch_listings(&self) -> Vec<ListingRecord> {
        let outcome = self.fetch_all().await;
        log::info!(
            "Fetched {} listings ({} of {} pages failed, {} of {} products failed)",
            outcome.records.len(),
            outcome.page_failures,
            outcome.page_total,
            outcome.detail_failures,
            outcome.detail_total
        );
        outcome.records
    }
}

fn element_text(element: &ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
