//! Plugin entry point.

use redmine_provider::{init_logging, serve, RedmineProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    tracing::info!("starting Redmine provider");
    serve(RedmineProvider::new()).await
}
