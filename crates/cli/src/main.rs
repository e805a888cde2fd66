// MLB Stats CLI - producer and consumer entry points
// Composition root: wires the AMQP and CSV adapters into the core services

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mlb_stats_core::application::{shutdown_channel, Dispatcher, DispatchReport, Producer, ProducerReport};
use mlb_stats_core::domain::{League, TextCodec};
use mlb_stats_core::port::{DurableQueue, TracingAlertSink};
use mlb_stats_core::VERSION;
use mlb_stats_infra_amqp::AmqpQueue;
use mlb_stats_infra_csv::CsvStatSource;
use settings::{LogFormat, Settings};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "mlb-stats")]
#[command(about = "Route MLB batting stats through league queues and alert on standout hitters", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./mlb-stats.toml when present)
    #[arg(long, global = true, env = "MLB_STATS_CONFIG")]
    config: Option<PathBuf>,

    /// Broker host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Broker port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Also write logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish every row of a batter stats CSV to its league queue
    Produce {
        /// Source CSV (Player, Team, AVG, HR, RBI columns)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Consume league queues and log alerts until Ctrl+C
    Consume {
        /// Queue to consume; repeat for several. Defaults to both leagues
        #[arg(long = "queue", value_name = "NAME", value_parser = League::from_str)]
        queues: Vec<League>,
    },
}

impl Cli {
    /// Flags win over file and environment settings
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.broker.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.broker.port = port;
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
        if let Some(dir) = &self.log_dir {
            settings.logging.directory = Some(dir.clone());
        }
        if let Commands::Produce { csv: Some(path) } = &self.command {
            settings.producer.csv_path = path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply_overrides(&mut settings);

    // Flushes the log file on drop
    let _log_guard =
        telemetry::init_logging(settings.logging.format, settings.logging.directory.as_deref())?;

    info!("mlb-stats v{} starting", VERSION);

    match cli.command {
        Commands::Produce { .. } => produce(&settings).await,
        Commands::Consume { queues } => consume(&settings, selected_leagues(queues)).await,
    }
}

async fn produce(settings: &Settings) -> Result<()> {
    let csv_path = &settings.producer.csv_path;
    let mut source = CsvStatSource::open(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let endpoint = settings.broker.endpoint();
    let queue = Arc::new(
        AmqpQueue::connect(&endpoint)
            .await
            .with_context(|| format!("Failed to connect to broker at {}", endpoint.uri()))?,
    );

    let producer = Producer::new(queue.clone(), Arc::new(TextCodec::new()));
    let result = producer.run(&mut source).await;
    close_queue(queue.as_ref()).await;

    let report = result.context("Producer stopped")?;
    print_producer_report(&report);
    Ok(())
}

async fn consume(settings: &Settings, leagues: Vec<League>) -> Result<()> {
    let endpoint = settings.broker.endpoint();
    let queue = Arc::new(
        AmqpQueue::connect(&endpoint)
            .await
            .with_context(|| format!("Failed to connect to broker at {}", endpoint.uri()))?,
    );

    let dispatcher = Dispatcher::new(
        queue.clone(),
        Arc::new(TextCodec::new()),
        Arc::new(TracingAlertSink),
    );

    let (shutdown_tx, shutdown) = shutdown_channel();
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping consumers");
                shutdown_tx.shutdown();
            }
            Err(e) => {
                // Without a signal handler the consumers run until the broker goes away
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    });

    let result = dispatcher.run(&leagues, shutdown).await;
    signal.abort();

    info!("Closing connection");
    close_queue(queue.as_ref()).await;

    let report = result.context("Consumer stopped")?;
    print_dispatch_report(&report);
    Ok(())
}

async fn close_queue(queue: &dyn DurableQueue) {
    if let Err(e) = queue.close().await {
        warn!(error = %e, "Failed to close broker connection cleanly");
    }
}

/// Requested leagues in order, without repeats; both leagues when none given
fn selected_leagues(requested: Vec<League>) -> Vec<League> {
    if requested.is_empty() {
        return League::ALL.to_vec();
    }
    let mut leagues = Vec::with_capacity(requested.len());
    for league in requested {
        if !leagues.contains(&league) {
            leagues.push(league);
        }
    }
    leagues
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Rows")]
    count: u64,
}

fn print_producer_report(report: &ProducerReport) {
    let rows = vec![
        CountRow { outcome: "read", count: report.rows_read },
        CountRow { outcome: "published", count: report.published },
        CountRow { outcome: "unrouted team", count: report.unrouted },
        CountRow { outcome: "blank stat", count: report.skipped_blank },
        CountRow { outcome: "invalid stat", count: report.skipped_invalid },
        CountRow { outcome: "unreadable", count: report.unreadable },
        CountRow { outcome: "publish failed", count: report.publish_failures },
    ];

    println!("\n{}", "Producer Summary".bold());
    println!("{}", Table::new(rows));

    if report.publish_failures > 0 {
        println!("{} {} rows were not published", "Warning:".yellow(), report.publish_failures);
    } else {
        println!("{} {} messages sent", "✓".green(), report.published);
    }
}

#[derive(Tabled)]
struct SubscriptionRow {
    #[tabled(rename = "Queue")]
    queue: &'static str,
    #[tabled(rename = "Received")]
    received: u64,
    #[tabled(rename = "Alerts")]
    alerts: u64,
    #[tabled(rename = "Discarded")]
    discarded: u64,
    #[tabled(rename = "Panicked")]
    panicked: u64,
}

fn print_dispatch_report(report: &DispatchReport) {
    let rows: Vec<SubscriptionRow> = report
        .subscriptions
        .iter()
        .map(|(league, stats)| SubscriptionRow {
            queue: league.queue_name(),
            received: stats.received,
            alerts: stats.alerts,
            discarded: stats.discarded,
            panicked: stats.panicked,
        })
        .collect();

    println!("\n{}", "Consumer Summary".bold());
    println!("{}", Table::new(rows));
}
