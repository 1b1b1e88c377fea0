mod display;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use legitrack_api::AppState;
use legitrack_core::ReferenceKind;
use legitrack_store::{BillFilter, DuckStore, shared};
use legitrack_sync::{CamaraClient, DEFAULT_BASE_URL, SyncSettings, SyncWorker, wait_for_store};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const STORE_ATTEMPTS: u32 = 10;
const STORE_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "legitrack", version, about = "Mirror of Chamber of Deputies bills with a query API")]
struct Cli {
    /// DuckDB database file.
    #[arg(long, global = true, env = "LEGITRACK_DB", default_value = "legitrack.duckdb")]
    db: PathBuf,

    /// Log filter, e.g. `info` or `legitrack_sync=debug`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API, running the sync worker in the same process.
    Serve {
        #[arg(long, env = "LEGITRACK_BIND", default_value = "0.0.0.0:5000")]
        bind: String,

        /// Serve only; do not start the sync worker.
        #[arg(long)]
        no_worker: bool,

        /// Bearer token lifetime in seconds.
        #[arg(long, env = "LEGITRACK_TOKEN_TTL_SECS", default_value_t = 86_400)]
        token_ttl_secs: u64,

        /// Restrict the worker's bill listing to these years.
        #[arg(long, env = "LEGITRACK_SYNC_YEARS", value_delimiter = ',')]
        years: Vec<i32>,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Run the sync worker.
    Sync {
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,

        /// Restrict the bill listing to these years.
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// One-shot full load of reference tables and the bills of the given years.
    Seed {
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<i32>,

        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Print a stored bill with its tracking history.
    Show { id: i64 },
    /// List stored themes.
    Themes,
    /// List stored bills, newest status first.
    Bills {
        /// Only bills linked to any of these theme codes.
        #[arg(long = "theme")]
        themes: Vec<i64>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 15)]
        per_page: u32,
    },
}

#[derive(Args)]
struct RemoteArgs {
    /// Base URL of the Chamber open-data API.
    #[arg(long, env = "LEGITRACK_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Seconds between sync cycles.
    #[arg(long, env = "LEGITRACK_SYNC_INTERVAL_SECS", default_value_t = 900)]
    interval_secs: u64,
}

impl RemoteArgs {
    fn settings(&self, years: Vec<i32>) -> SyncSettings {
        SyncSettings {
            interval: Duration::from_secs(self.interval_secs),
            years,
            ..SyncSettings::default()
        }
    }

    fn client(&self) -> anyhow::Result<CamaraClient> {
        CamaraClient::new(&self.api_url).context("building HTTP client")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;
    info!("legitrack v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve {
            bind,
            no_worker,
            token_ttl_secs,
            years,
            remote,
        } => cmd_serve(&cli.db, &bind, no_worker, token_ttl_secs, years, &remote).await,
        Command::Sync {
            once,
            years,
            remote,
        } => cmd_sync(&cli.db, once, years, &remote).await,
        Command::Seed { years, remote } => cmd_seed(&cli.db, years, &remote).await,
        Command::Show { id } => cmd_show(&cli.db, id),
        Command::Themes => cmd_themes(&cli.db),
        Command::Bills {
            themes,
            page,
            per_page,
        } => cmd_bills(&cli.db, themes, page, per_page),
    }
}

fn init_tracing(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

// ── Long-running commands ──

async fn cmd_serve(
    db: &Path,
    bind: &str,
    no_worker: bool,
    token_ttl_secs: u64,
    years: Vec<i32>,
    remote: &RemoteArgs,
) -> anyhow::Result<()> {
    let store = shared(open_for_writing(db).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = if no_worker {
        None
    } else {
        let worker = SyncWorker::new(remote.client()?, store.clone(), remote.settings(years));
        Some(tokio::spawn(async move { worker.run_forever(shutdown_rx).await }))
    };

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    let state = AppState::new(store, Duration::from_secs(token_ttl_secs));
    let shutdown = async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };
    legitrack_api::serve(listener, state, shutdown)
        .await
        .context("HTTP server")?;

    if let Some(handle) = worker {
        handle.await.context("joining sync worker")?;
    }
    info!("shut down");
    Ok(())
}

async fn cmd_sync(
    db: &Path,
    once: bool,
    years: Vec<i32>,
    remote: &RemoteArgs,
) -> anyhow::Result<()> {
    let store = shared(open_for_writing(db).await?);
    let worker = SyncWorker::new(remote.client()?, store, remote.settings(years));

    if once {
        let report = worker.run_cycle().await.context("sync cycle")?;
        display::print_cycle_report(&report);
        return Ok(());
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = tx.send(true);
    });
    worker.run_forever(rx).await;
    Ok(())
}

async fn cmd_seed(db: &Path, years: Vec<i32>, remote: &RemoteArgs) -> anyhow::Result<()> {
    let store = shared(open_for_writing(db).await?);
    let worker = SyncWorker::new(remote.client()?, store, remote.settings(years.clone()));

    info!(?years, "seeding");
    let references = worker.sync_references().await;
    let bills = worker.sync_bills(&years).await.context("seeding bills")?;
    display::print_cycle_report(&legitrack_sync::CycleReport { references, bills });
    Ok(())
}

async fn open_for_writing(db: &Path) -> anyhow::Result<DuckStore> {
    wait_for_store(db, STORE_ATTEMPTS, STORE_RETRY_DELAY)
        .await
        .with_context(|| format!("opening {}", db.display()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ── Read-only commands ──

fn open_existing(db: &Path) -> anyhow::Result<DuckStore> {
    anyhow::ensure!(db.exists(), "database not found: {}", db.display());
    DuckStore::open_persistent(db).with_context(|| format!("opening {}", db.display()))
}

fn cmd_show(db: &Path, id: i64) -> anyhow::Result<()> {
    let store = open_existing(db)?;
    let bill = store
        .get_bill(id)
        .with_context(|| format!("bill {id}"))?;
    let tracking = store.tracking_history(id)?;
    display::print_bill_card(&bill, &tracking);
    Ok(())
}

fn cmd_themes(db: &Path) -> anyhow::Result<()> {
    let store = open_existing(db)?;
    display::print_themes(&store.list_references(ReferenceKind::Theme)?);
    Ok(())
}

fn cmd_bills(db: &Path, themes: Vec<i64>, page: u32, per_page: u32) -> anyhow::Result<()> {
    anyhow::ensure!(page >= 1, "--page must be at least 1");
    anyhow::ensure!(
        (1..=100).contains(&per_page),
        "--per-page must be between 1 and 100"
    );
    let store = open_existing(db)?;
    let filter = BillFilter {
        themes,
        page,
        per_page,
    };
    display::print_bill_table(&store.list_bills(&filter)?, page, per_page);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn seed_requires_years() {
        assert!(Cli::try_parse_from(["legitrack", "seed"]).is_err());
        let cli = Cli::try_parse_from(["legitrack", "seed", "--years", "2023,2022"]).unwrap();
        match cli.command {
            Command::Seed { years, remote } => {
                assert_eq!(years, vec![2023, 2022]);
                assert_eq!(remote.api_url, DEFAULT_BASE_URL);
            }
            _ => panic!("expected seed"),
        }
    }

    #[test]
    fn bills_accepts_repeated_themes() {
        let cli = Cli::try_parse_from([
            "legitrack", "--db", "x.duckdb", "bills", "--theme", "40", "--theme", "42",
        ])
        .unwrap();
        assert_eq!(cli.db, PathBuf::from("x.duckdb"));
        match cli.command {
            Command::Bills {
                themes,
                page,
                per_page,
            } => {
                assert_eq!(themes, vec![40, 42]);
                assert_eq!((page, per_page), (1, 15));
            }
            _ => panic!("expected bills"),
        }
    }
}
