//! AWS Lambda entry point for Shelfwatch
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! and trigger on a schedule.

use lambda_runtime::{Error as LambdaError, service_fn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    // `log` records from the library are forwarded into this subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Shelfwatch Lambda starting...");
    lambda_runtime::run(service_fn(shelfwatch::lambda::handler)).await
}
