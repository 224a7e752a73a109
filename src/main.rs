//! Command line entry point: load identifiers, crawl, print the summary.

use catalog_crawler::input::load_identifiers;
use catalog_crawler::{Config, Crawler};
use clap::Parser;
use std::path::PathBuf;

/// Fetch catalog products in resumable batches
#[derive(Debug, Parser)]
#[command(name = "catalog-crawler", version, about)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file with the product identifiers
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output directory for batch units and failure partitions
    #[arg(long)]
    output: Option<PathBuf>,

    /// CSV column holding the identifiers
    #[arg(long)]
    id_column: Option<String>,

    /// Products per batch unit
    #[arg(long)]
    batch_size: Option<usize>,

    /// Products fetched concurrently within a batch
    #[arg(long)]
    concurrency: Option<usize>,

    /// Attempts per product, first one included
    #[arg(long)]
    max_retries: Option<u32>,
}

impl Args {
    fn into_config(self) -> catalog_crawler::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(path) = self.input {
            config.input.path = path;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(column) = self.id_column {
            config.input.id_column = column;
        }
        if let Some(size) = self.batch_size {
            config.crawl.batch_size = size;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawl.concurrency = concurrency;
        }
        if let Some(attempts) = self.max_retries {
            config.retry.max_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into()),
        )
        .init();

    let config = Args::parse().into_config()?;
    let ids = load_identifiers(&config.input.path, &config.input.id_column)?;

    let crawler = Crawler::new(config)?;
    let report = crawler.run(ids).await?;

    println!("{}", report.stats);
    Ok(())
}
