use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hcfleet::config::{Config, ENDPOINT_ENV, TOKEN_ENV};
use hcfleet::hcloud::client::HcloudClient;
use hcfleet::pricing::{PricingCatalog, Tier};
use hcfleet::resource::{fetch_inventory, fetch_resources, Server};
use hcfleet::snapshot::RunSummary;
use hcfleet::{cost, report, snapshot};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Exit code when at least one snapshot request did not go through
const EXIT_SUBMISSION_FAILED: u8 = 2;

/// Cost forecast and bulk snapshots for Hetzner Cloud
#[derive(Parser, Debug)]
#[command(name = "hcfleet", version, about, long_about = None)]
struct Args {
    /// Log level for debugging (written to the log file)
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// API token (overrides the config file)
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// API endpoint (overrides the config file)
    #[arg(long, global = true, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report the projected monthly cost of the project
    Cost {
        /// Price tier (defaults to the config file, then net)
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
    },
    /// Create a snapshot of every server
    Snapshot {
        /// Show what would be done without sending any request
        #[arg(long)]
        dry_run: bool,

        /// Snapshot running servers without shutting them down
        #[arg(long)]
        force: bool,

        /// Wait for every snapshot action to finish
        #[arg(long)]
        wait: bool,

        /// Description prefix, followed by the server name
        #[arg(long)]
        prefix: Option<String>,

        /// Servers processed at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Stop waiting after this many seconds (0 = no limit)
        #[arg(long)]
        max_wait: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Net,
    Gross,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Net => Tier::Net,
            TierArg::Gross => Tier::Gross,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("hcfleet started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("hcfleet").join("hcfleet.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".hcfleet").join("hcfleet.log");
    }
    PathBuf::from("hcfleet.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {err:#}");
            None
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = Config::load();

    // Fail on missing credentials before touching the network
    let token = config.effective_token(args.token)?;
    let client = HcloudClient::new(&config.effective_api_url(args.endpoint), &token)?;
    tracing::info!("Using endpoint {}", client.base_url());

    match args.command {
        Command::Cost { tier } => {
            let tier = tier.map(Tier::from).unwrap_or(config.tier);
            run_cost(&client, &config, tier, args.json).await
        }
        Command::Snapshot {
            dry_run,
            force,
            wait,
            prefix,
            concurrency,
            max_wait,
        } => {
            let mut options = config.snapshot.to_options();
            options.dry_run = dry_run;
            options.wait = wait;
            options.force |= force;
            if let Some(prefix) = prefix {
                options.description_prefix = prefix;
            }
            if let Some(concurrency) = concurrency {
                options.concurrency = concurrency.max(1);
            }
            if let Some(secs) = max_wait {
                options.max_wait = (secs > 0).then(|| Duration::from_secs(secs));
            }
            run_snapshot(&client, &config, &options, args.json).await
        }
    }
}

async fn run_cost(client: &HcloudClient, config: &Config, tier: Tier, json: bool) -> Result<ExitCode> {
    let (catalog, inventory) = tokio::try_join!(
        async {
            PricingCatalog::fetch(client)
                .await
                .map_err(|e| hcfleet::Error::fetch("price catalog", e))
        },
        fetch_inventory(client, config.page_size),
    )?;

    let breakdown = cost::aggregate(&inventory, &catalog, tier);

    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    } else {
        print!("{}", report::render_cost(&breakdown));
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_snapshot(
    client: &HcloudClient,
    config: &Config,
    options: &snapshot::SnapshotOptions,
    json: bool,
) -> Result<ExitCode> {
    let servers = fetch_resources::<Server>(client, config.page_size).await?;
    let records = snapshot::run(client, &servers, options).await;
    let summary = RunSummary::from_records(&records);

    if json {
        let document = serde_json::json!({ "records": records, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", report::render_snapshot(&records));
    }

    if summary.has_submission_failures() {
        Ok(ExitCode::from(EXIT_SUBMISSION_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
