// src/lambda.rs

//! AWS Lambda handler for the scheduled check.

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::pipeline::{CheckReport, run_check};
use crate::services::{StorefrontCrawler, notifier};
use crate::utils::http::create_async_client;
use crate::{config, storage};

const SUCCESS_MESSAGE: &str = "Update check completed!";

/// Main Lambda handler function.
///
/// Always answers with a status payload; failures become a 500 body.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<Value>) -> std::result::Result<Value, LambdaError> {
    info!("Handling event: {:?}", event.payload);

    Ok(into_response(run_lambda_check().await))
}

/// Map the outcome of a check to the status payload returned to the trigger.
fn into_response(result: Result<CheckReport>) -> Value {
    match result {
        Ok(report) => {
            info!(
                outcome = ?report.outcome,
                changes = report.changes.len(),
                sent = report.sent.len(),
                failed = report.failed.len(),
                "Lambda execution successful"
            );
            status_payload(200, SUCCESS_MESSAGE)
        }
        Err(e) => {
            error!("Lambda execution failed: {}", e);
            status_payload(500, &format!("Error: {e}"))
        }
    }
}

async fn run_lambda_check() -> Result<CheckReport> {
    let config = config::load_for_invocation();

    let storage = storage::open(&config.storage).await?;
    let client = create_async_client(&config.scraper)?;
    let crawler = StorefrontCrawler::with_client(config.scraper.clone(), client.clone())?;
    let notifier = notifier::from_config(&config.notify.mail, client);

    run_check(&config, &crawler, storage.as_ref(), notifier.as_ref()).await
}

/// API-Gateway style response with a JSON-encoded string body.
fn status_payload(status: u16, message: &str) -> Value {
    serde_json::json!({
        "statusCode": status,
        "body": Value::String(message.to_string()).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::{Config, ListingRecord};
    use crate::services::{ListingSource, LogNotifier};
    use crate::storage::LocalStorage;

    struct NoListings;

    #[async_trait]
    impl ListingSource for NoListings {
        async fn fetch_listings(&self) -> Vec<ListingRecord> {
            Vec::new()
        }
    }

    #[test]
    fn test_success_payload() {
        let payload = status_payload(200, SUCCESS_MESSAGE);
        assert_eq!(payload["statusCode"], 200);
        assert_eq!(payload["body"], "\"Update check completed!\"");
    }

    #[test]
    fn test_error_becomes_500_payload() {
        let payload = into_response(Err(AppError::validation("No collections defined")));
        assert_eq!(payload["statusCode"], 500);
        assert_eq!(
            payload["body"],
            "\"Error: Validation error: No collections defined\""
        );
    }

    #[tokio::test]
    async fn test_completed_check_becomes_200_payload() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let result = run_check(&Config::default(), &NoListings, &storage, &LogNotifier).await;

        let payload = into_response(result);
        assert_eq!(payload["statusCode"], 200);
        assert_eq!(payload["body"], "\"Update check completed!\"");
    }

    #[tokio::test]
    async fn test_invalid_config_becomes_500_payload() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let mut config = Config::default();
        config.scraper.collections.clear();
        let result = run_check(&config, &NoListings, &storage, &LogNotifier).await;

        let payload = into_response(result);
        assert_eq!(payload["statusCode"], 500);
        assert!(payload["body"].as_str().unwrap().contains("No collections defined"));
    }
}
