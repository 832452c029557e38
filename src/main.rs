// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! cmis-monitor entry point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use cmis_monitor::config::{self, CliOptions, WrapperMode};
use cmis_monitor::service::ROOT_FOLDER_ID;
use cmis_monitor::telemetry::{init_telemetry, TelemetryConfig};
use cmis_monitor::types::{
    GetChildrenRequest, GetContentStreamRequest, GetObjectRequest, QueryRequest,
};
use cmis_monitor::{CmisService, InMemoryRepository, LocalBackend, ServiceFactory, SharedService};

/// Crate version string.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// cmis-monitor - time CMIS service calls and count them.
#[derive(Parser)]
#[command(name = "cmis-monitor")]
#[command(author, version, about = "Time CMIS service calls and count them", long_about = None)]
struct Cli {
    /// Root container name
    #[arg(long, env = "CMIS_MONITOR_CONTAINER")]
    container: Option<String>,

    /// Operations to time (comma separated)
    #[arg(long, value_delimiter = ',')]
    operations: Option<Vec<String>>,

    /// Disable the catch-all counter
    #[arg(long)]
    no_catch_all: bool,

    /// How wrappers are handed out
    #[arg(long, value_enum)]
    wrapper_mode: Option<Mode>,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,

    /// Show debug output with span timings and source locations
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Shared,
    PerRequest,
}

impl From<Mode> for WrapperMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Shared => WrapperMode::Shared,
            Mode::PerRequest => WrapperMode::PerRequest,
        }
    }
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workload against an in-memory repository and print the numbers
    Demo {
        /// Total number of requests
        #[arg(short = 'n', long, default_value_t = 200)]
        requests: u64,

        /// Number of concurrent callers
        #[arg(short, long, default_value_t = 8)]
        concurrency: u64,

        /// Latency added to every repository call, in milliseconds
        #[arg(long, default_value_t = 5)]
        latency_ms: u64,

        /// Make every Nth request fail (0 disables)
        #[arg(long, default_value_t = 0)]
        fail_every: u64,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Write an example configuration file
    Init,

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = init_telemetry(&TelemetryConfig::from_flags(cli.verbose, cli.debug))?;

    let cli_options = CliOptions {
        container: cli.container,
        operations: cli.operations,
        catch_all: if cli.no_catch_all { Some(false) } else { None },
        wrapper_mode: cli.wrapper_mode.map(WrapperMode::from),
    };

    match cli.command {
        Commands::Demo {
            requests,
            concurrency,
            latency_ms,
            fail_every,
            format,
        } => {
            let settings = DemoSettings {
                requests,
                concurrency: concurrency.max(1),
                latency: Duration::from_millis(latency_ms),
                fail_every,
            };
            run_demo(cli_options, settings, format).await?;
        }
        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                let workspace_root = std::env::current_dir()?;
                let config = config::load_config(&workspace_root, cli_options)?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        },
        Commands::Init => {
            let workspace_root = std::env::current_dir()?;
            let path = config::init_config(&workspace_root)?;
            println!("Created config file: {}", path.display());
        }
        Commands::Version => {
            println!("cmis-monitor {}", VERSION);
        }
    }

    Ok(())
}

struct DemoSettings {
    requests: u64,
    concurrency: u64,
    latency: Duration,
    fail_every: u64,
}

/// Seed a repository with two folders of documents. Returns folder and
/// document ids.
fn seed_repository(repo: &InMemoryRepository) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    let mut folders = Vec::new();
    let mut documents = Vec::new();
    for folder_name in ["contracts", "invoices"] {
        let folder = repo.add_folder(ROOT_FOLDER_ID, folder_name)?;
        for i in 0..10 {
            let name = format!("{}-{:02}.txt", folder_name.trim_end_matches('s'), i);
            let body = format!("{} body {}\n", folder_name, i).repeat(16);
            documents.push(repo.add_document(&folder, &name, "text/plain", body)?);
        }
        folders.push(folder);
    }
    Ok((folders, documents))
}

async fn run_demo(
    cli_options: CliOptions,
    settings: DemoSettings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let workspace_root = std::env::current_dir()?;
    let config = config::load_config(&workspace_root, cli_options)?;

    let backend = Arc::new(LocalBackend::new(config.listener()));
    let repository = InMemoryRepository::new("demo").with_latency(settings.latency);
    let (folders, documents) = seed_repository(&repository)?;
    let repository: SharedService = Arc::new(repository);

    let factory = Arc::new(ServiceFactory::from_config(
        repository,
        backend.clone(),
        &config,
    )?);
    factory
        .start()
        .context("monitoring backend rejected registration")?;

    let folders = Arc::new(folders);
    let documents = Arc::new(documents);
    let failures = Arc::new(AtomicU64::new(0));
    let started = Instant::now();

    let mut workers = Vec::new();
    for worker in 0..settings.concurrency {
        let factory = factory.clone();
        let folders = folders.clone();
        let documents = documents.clone();
        let failures = failures.clone();
        let (requests, concurrency, fail_every) =
            (settings.requests, settings.concurrency, settings.fail_every);

        workers.push(tokio::spawn(async move {
            let mut i = worker;
            while i < requests {
                let service = factory.service()?;
                let inject_failure = fail_every > 0 && (i + 1) % fail_every == 0;
                let ok = run_request(
                    service.as_ref(),
                    i,
                    &folders,
                    &documents,
                    inject_failure,
                )
                .await;
                if !ok {
                    failures.fetch_add(1, Ordering::Relaxed);
                }
                i += concurrency;
            }
            Ok::<(), cmis_monitor::MonitorError>(())
        }));
    }

    for worker in workers {
        worker.await.context("demo worker panicked")??;
    }

    let elapsed = started.elapsed();
    let snapshot = backend.snapshot();

    match format {
        OutputFormat::Text => {
            println!(
                "{} {} requests in {:.2?} ({} failed)\n",
                "✓".green(),
                settings.requests,
                elapsed,
                failures.load(Ordering::Relaxed).to_string().yellow()
            );
            print!("{}", snapshot.format_report());
        }
        OutputFormat::Json => {
            let events: serde_json::Map<String, serde_json::Value> = snapshot
                .events
                .iter()
                .map(|(name, (class, count))| {
                    (
                        name.clone(),
                        serde_json::json!({ "class": class.as_str(), "count": count }),
                    )
                })
                .collect();
            let accumulators: serde_json::Map<String, serde_json::Value> = snapshot
                .accumulators
                .iter()
                .map(|(name, stats)| {
                    (
                        name.clone(),
                        serde_json::json!({
                            "samples": stats.samples,
                            "meanMs": stats.mean().as_secs_f64() * 1000.0,
                            "minMs": stats.min_or_zero().as_secs_f64() * 1000.0,
                            "maxMs": stats.max.as_secs_f64() * 1000.0,
                            "p99Ms": stats.histogram.p99().as_secs_f64() * 1000.0,
                        }),
                    )
                })
                .collect();
            let report = serde_json::json!({
                "listener": snapshot.listener,
                "requests": settings.requests,
                "failures": failures.load(Ordering::Relaxed),
                "elapsedMs": elapsed.as_secs_f64() * 1000.0,
                "events": events,
                "accumulators": accumulators,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Issue one request, picking the operation by index. Returns whether it
/// succeeded.
async fn run_request(
    service: &dyn CmisService,
    i: u64,
    folders: &[String],
    documents: &[String],
    inject_failure: bool,
) -> bool {
    let repo = "demo";
    let document = if inject_failure {
        "missing-object".to_string()
    } else {
        documents[i as usize % documents.len()].clone()
    };

    let result = match i % 4 {
        0 => service
            .query(QueryRequest::new(repo, if inject_failure { "" } else { "invoice" })
                .with_paging(Some(5), Some(i % 3)))
            .await
            .map(|_| ()),
        1 => {
            let folder = if inject_failure {
                document.clone()
            } else {
                folders[i as usize % folders.len()].clone()
            };
            service
                .get_children(GetChildrenRequest::new(repo, folder).with_paging(Some(4), None))
                .await
                .map(|_| ())
        }
        2 => service
            .get_content_stream(
                GetContentStreamRequest::new(repo, document).with_range(Some(0), Some(64)),
            )
            .await
            .map(|_| ()),
        _ => service
            .get_object(GetObjectRequest::new(repo, document))
            .await
            .map(|_| ()),
    };

    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(request = i, error = %err, "Demo request failed");
            false
        }
    }
}
