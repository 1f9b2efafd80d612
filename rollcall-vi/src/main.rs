//! rollcall-vi - Roll-Call Vote Ingest
//!
//! Probes the House and Senate sources for recorded votes and ingests
//! them into the shared store. The two chambers are independent scans
//! and run as separate tasks; each terminates on its own miss
//! threshold.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rollcall_common::config::{CliOverrides, IngestConfig};
use rollcall_common::db::models::Chamber;
use rollcall_vi::driver::Driver;
use rollcall_vi::fetch::{HttpFetcher, RetryPolicy};
use rollcall_vi::identity::IdentityIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ChamberArg {
    House,
    Senate,
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "rollcall-vi", about = "Roll-call vote discovery and ingestion")]
struct Args {
    /// Chamber(s) to scan
    #[arg(long, value_enum, default_value = "both")]
    chamber: ChamberArg,

    /// Congress number, e.g. 118
    #[arg(long)]
    congress: Option<i64>,

    /// Session within the congress (1 or 2)
    #[arg(long)]
    session: Option<i64>,

    /// Calendar year used in House roll URLs (derived from
    /// congress/session when omitted)
    #[arg(long)]
    house_year: Option<i32>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cli = CliOverrides {
        database: args.database.clone(),
        congress: args.congress,
        session: args.session,
        house_year: args.house_year,
    };
    let config = IngestConfig::resolve(&cli, args.config.as_deref())?;

    info!("Starting rollcall-vi (Vote Ingest)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        congress = config.congress,
        session = config.session,
        house_year = config.house_year,
        database = %config.database.display(),
        "Run parameters"
    );

    let pool = rollcall_common::db::init_database_pool(&config.database).await?;
    info!("Database connection established");

    let identity = Arc::new(IdentityIndex::load(&pool).await?);
    if identity.is_empty() {
        warn!("Legislator directory is empty; every tally entry will be unresolved");
    } else {
        info!(members = identity.len(), "Identity directory loaded");
    }

    let fetcher = HttpFetcher::new(
        Duration::from_secs(config.http_timeout_secs),
        RetryPolicy::new(
            config.http_max_retries,
            Duration::from_millis(config.http_retry_delay_ms),
        ),
    )?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested; finishing current roll");
                cancel.cancel();
            }
        });
    }

    let chambers = match args.chamber {
        ChamberArg::House => vec![Chamber::House],
        ChamberArg::Senate => vec![Chamber::Senate],
        ChamberArg::Both => vec![Chamber::House, Chamber::Senate],
    };

    // The chambers have disjoint roll spaces and vote ids, so each gets
    // its own task; rolls within a chamber stay strictly sequential.
    let mut handles = Vec::new();
    for chamber in chambers {
        let driver = Driver::new(
            fetcher.clone(),
            pool.clone(),
            identity.clone(),
            config.clone(),
            cancel.clone(),
        );
        let (congress, session) = (config.congress, config.session);
        handles.push(tokio::spawn(async move {
            driver.run_chamber(chamber, congress, session).await
        }));
    }

    let mut rolls_ingested = 0u64;
    let mut rolls_missed = 0u64;
    let mut transient_failures = 0u64;
    let mut identities_unresolved = 0usize;
    for handle in handles {
        match handle.await {
            Ok(summary) => {
                rolls_ingested += summary.rolls_ingested;
                rolls_missed += summary.rolls_missed;
                transient_failures += summary.transient_failures;
                identities_unresolved += summary.unresolved.len();
            }
            Err(e) => warn!(error = %e, "Chamber task failed"),
        }
    }

    info!(
        rolls_ingested,
        rolls_missed,
        transient_failures,
        identities_unresolved,
        "Vote ingest complete"
    );

    pool.close().await;
    Ok(())
}
