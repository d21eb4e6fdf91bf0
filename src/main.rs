use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use logdash::analysis::DashboardData;
use logdash::client::ApiClient;
use logdash::config::{DashboardConfig, LoggingConfig};
use logdash::render::format::{format_count, format_summary};
use logdash::session::Session;

#[derive(Parser)]
#[command(
    name = "logdash",
    about = "Operator dashboard for log analysis: event aggregation, charts, and anomaly trends",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $LOGDASH_CONFIG, then ./logdash.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard (snapshot poller + local web server)
    Serve {
        /// Bind address, overrides dashboard.bind
        #[arg(long)]
        bind: Option<String>,
    },

    /// Fetch one snapshot and print the derived series
    Summary {
        /// Events to fetch, overrides dashboard.per_page
        #[arg(long)]
        per_page: Option<u32>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Ask a question in plain language; upstream turns it into SQL
    Query {
        /// The question
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Upload a log file for ingestion
    Upload {
        /// Path to the log file
        file: PathBuf,
    },

    /// Check the processing status of an upload
    UploadStatus {
        /// Upload ID printed by `upload`
        upload_id: String,
    },

    /// List detected anomalies
    Anomalies {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "50")]
        per_page: u32,
    },

    /// Show a single event with its anomalies
    Event {
        /// Event ID
        id: i64,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolve configuration with a temporary stderr subscriber in place, so
/// what config loading logs is not lost before [`init_tracing`] runs.
fn resolve_config(explicit: Option<&std::path::Path>) -> Result<DashboardConfig> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(bootstrap, || DashboardConfig::resolve(explicit))
}

/// API client with a live session when service credentials are configured.
async fn login(config: &DashboardConfig) -> Result<ApiClient> {
    let api = logdash::connect(config)?;
    if let Some(credentials) = config.auth.credentials() {
        Session::new()
            .login(&api, &credentials)
            .await
            .with_context(|| format!("login as {} failed", credentials.username))?;
    }
    Ok(api)
}

fn print_summary(data: &DashboardData) {
    println!("\n=== Log Summary ===");
    println!("{}", format_summary(&data.stats));

    println!("\nTop source IPs:");
    if data.top_ips.is_empty() {
        println!("  (none)");
    }
    for entry in &data.top_ips {
        println!("  {:<40} {:>10}", entry.key, format_count(entry.count));
    }

    println!("\nStatus codes:");
    for group in &data.status_codes {
        println!(
            "  {:<6} {:<6} {:>10}",
            group.status,
            group.category.label(),
            format_count(group.count)
        );
    }

    println!("\nMethods:");
    for share in &data.methods {
        println!(
            "  {:<10} {:>10} {:>6.1}%",
            share.method,
            format_count(share.count),
            share.percentage
        );
    }

    println!("\nTimeline:");
    for bucket in &data.timeline {
        println!(
            "  {}  {:>10}",
            bucket.time.format("%Y-%m-%d %H:%M"),
            format_count(bucket.count)
        );
    }

    if !data.anomalies.is_empty() {
        println!("\nAnomaly trend:");
        for point in &data.anomalies {
            let score = point
                .mean_score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}  {:>6} anomalies  avg score {}",
                point.time.format("%Y-%m-%d %H:%M"),
                point.count,
                score
            );
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = resolve_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.dashboard.bind = bind;
            }
            tracing::info!(bind = %config.dashboard.bind, upstream = %config.api.base_url, "Starting logdash");
            logdash::serve(config).await?;
        }
        Commands::Summary { per_page, json } => {
            let api = login(&config).await?;
            let per_page = per_page.unwrap_or(config.dashboard.per_page);
            let page = api.events(1, per_page).await.context("failed to fetch events")?;
            let data = DashboardData::from_events(&page.events, config.params());
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_summary(&data);
            }
        }
        Commands::Query { prompt } => {
            let api = login(&config).await?;
            let prompt = prompt.join(" ");
            tracing::info!(%prompt, "Running query");
            let result = api.query(&prompt).await.context("query failed")?;

            println!("\nSQL: {}", result.sql);
            if let Some(response) = &result.response {
                println!("\n{}", response);
            }
            println!("\n{} row{}", result.rows.len(), if result.rows.len() == 1 { "" } else { "s" });
            for row in &result.rows {
                println!("{}", serde_json::to_string(row)?);
            }
        }
        Commands::Upload { file } => {
            let api = login(&config).await?;
            tracing::info!(file = %file.display(), "Uploading log file");
            let receipt = api.upload(&file).await.context("upload failed")?;
            println!("Upload ID: {}", receipt.upload_id);
            if let Some(message) = receipt.message {
                println!("{}", message);
            }
        }
        Commands::UploadStatus { upload_id } => {
            let api = login(&config).await?;
            let status = api
                .upload_status(&upload_id)
                .await
                .context("failed to fetch upload status")?;
            println!("{}: {}", status.upload_id, status.status);
        }
        Commands::Anomalies { page, per_page } => {
            let api = login(&config).await?;
            let result = api
                .anomalies(page, per_page)
                .await
                .context("failed to fetch anomalies")?;
            if result.anomalies.is_empty() {
                println!("No anomalies found.");
            } else {
                println!("{:<10} | {:<20} | {:<6} | Reason", "Event", "Detector", "Score");
                println!("{:-<10}-|-{:-<20}-|-{:-<6}-|-{:-<30}", "", "", "", "");
                for a in &result.anomalies {
                    println!(
                        "{:<10} | {:<20} | {:<6} | {}",
                        a.event_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                        a.detector.as_deref().unwrap_or("-"),
                        a.score.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".into()),
                        a.reason.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
        Commands::Event { id } => {
            let api = login(&config).await?;
            let event = api.event(id).await.with_context(|| format!("failed to fetch event {}", id))?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}
