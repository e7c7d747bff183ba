//! Catalog CLI - fetch the catalog and report the coordinator's states.
//!
//! # Examples
//!
//! ```bash
//! # Fetch from API_BASE_URL (or the built-in default)
//! catalog
//!
//! # Fetch another endpoint from an explicit server, refetching twice
//! catalog --base-url http://127.0.0.1:3000/api/v1 --endpoint empty --refetch 2
//! ```

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use catalog_core::{ApiClient, ApiConfig, CatalogItem, FetchCoordinator, FetchState};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Titles printed per successful fetch.
const PREVIEW_LEN: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(about = "Fetch the catalog and report every state transition")]
#[command(version)]
struct Cli {
    /// API base URL. Defaults to $API_BASE_URL, then http://127.0.0.1:3000/api/v1.
    #[arg(long)]
    base_url: Option<String>,

    /// Endpoint relative to the base URL.
    #[arg(long, short, default_value = "catalog")]
    endpoint: String,

    /// Extra refetch cycles after the first fetch settles.
    #[arg(long, default_value_t = 0)]
    refetch: u32,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("catalog_core=debug,info")
        } else {
            EnvFilter::new("catalog_core=warn")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn report(out: &mut impl Write, state: &FetchState<CatalogItem>) -> io::Result<()> {
    if state.loading {
        writeln!(out, "loading...")?;
    } else if let Some(error) = &state.error {
        writeln!(out, "error: {error}")?;
    } else if let Some(items) = &state.data {
        writeln!(out, "loaded {} items", items.len())?;
        for item in items.iter().take(PREVIEW_LEN) {
            writeln!(
                out,
                "  #{:<4} {} ({}, {:.1})",
                item.id, item.title, item.release_year, item.rating
            )?;
        }
        if items.len() > PREVIEW_LEN {
            writeln!(out, "  ... and {} more", items.len() - PREVIEW_LEN)?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.base_url {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::from_env(),
    }
    .context("invalid API configuration")?;
    debug!(base_url = config.base_url(), "Resolved configuration");

    let client = Arc::new(ApiClient::from_config(config));
    let coordinator: FetchCoordinator<CatalogItem, _> =
        FetchCoordinator::mount(client, cli.endpoint.as_str());
    let mut updates = coordinator.subscribe();
    let mut stdout = io::stdout().lock();
    report(&mut stdout, &updates.borrow_and_update())?;

    let mut cycles = 0;
    let last = loop {
        let state = updates.wait_for(|state| !state.loading).await?.clone();
        report(&mut stdout, &state)?;
        if cycles == cli.refetch {
            break state;
        }
        cycles += 1;
        coordinator.refetch();
        report(&mut stdout, &updates.borrow_and_update())?;
    };

    if let Some(error) = last.error {
        bail!(error);
    }
    Ok(())
}
