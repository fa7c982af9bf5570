//! CatalogGen CLI binary

use anyhow::Result;

use catalog_gen::cli::CliApp;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_gen=info".into()),
        )
        .init();

    let matches = CliApp::app().get_matches();

    CliApp::run(&matches).await
}
