//! Fraud Model Router - Main Entry Point
//!
//! Answers fraud detection requests over NATS request/reply. Requests are
//! processed in parallel, bounded by the configured number of workers.

use anyhow::{Context, Result};
use fraud_model_router::{
    config::{AppConfig, LoggingConfig},
    consumer::{parse_control_command, RequestConsumer},
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::{Detection, FraudPipeline, KillSwitch},
    producer::ResultProducer,
    types::Sector,
};
use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fraud_model_router={}", logging.level)))
        .context("Invalid log level")?;

    if logging.format == "pretty" {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::var("FRAUD_ROUTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config_found = Path::new(&path).exists();
    let config = if config_found {
        AppConfig::load_from_path(&path)?
    } else {
        AppConfig::default()
    };

    init_logging(&config.logging)?;
    info!("Starting Fraud Model Router");
    if config_found {
        info!(path = %path, "Configuration loaded");
    } else {
        warn!(path = %path, "Configuration file not found, using defaults");
    }

    for sector in Sector::ALL {
        let plan = config.routing.route(sector);
        let backends: Vec<&str> = plan.backends().iter().map(|b| b.id()).collect();
        info!(
            sector = %sector,
            two_stage = plan.is_two_stage(),
            backends = ?backends,
            "Route configured"
        );
    }

    let kill_switch = KillSwitch::new(config.pipeline.kill_switch);
    let pipeline = Arc::new(FraudPipeline::from_config(&config, kill_switch.clone())?);
    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject, &config.nats.control_subject);
    let producer = Arc::new(ResultProducer::new(client.clone()));

    // Kill-switch commands
    let mut control = consumer.subscribe_control().await?;
    let switch = kill_switch.clone();
    tokio::spawn(async move {
        while let Some(message) = control.next().await {
            match parse_control_command(&message.payload) {
                Some(engaged) => {
                    switch.set(engaged);
                    warn!(engaged, "Kill switch updated");
                }
                None => warn!(payload = ?message.payload, "Unrecognised kill-switch command"),
            }
        }
    });

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    let num_workers = config.pipeline.workers;
    info!(
        workers = num_workers,
        subject = consumer.request_subject(),
        kill_switch = kill_switch.is_engaged(),
        "Starting request processing loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            match pipeline.detect_json(&message.payload).await {
                Ok(detection) => {
                    match &detection {
                        Detection::Scored {
                            result,
                            answered_by,
                            failures,
                        } => metrics.record_result(result, answered_by.as_deref(), failures),
                        Detection::Disabled => metrics.record_disabled(),
                    }

                    if let Err(e) = producer.reply(&message, &detection).await {
                        error!(error = %e, "Failed to send fraud result");
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

                    // Log progress every 100 requests
                    if count % 100 == 0 {
                        let processing_stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.2} req/s", metrics.get_throughput()),
                            avg_latency_ms = processing_stats.mean_ms,
                            "Processing milestone"
                        );
                    }
                }
                Err(invalid) => {
                    metrics.record_rejected();
                    debug!(error = %invalid, "Rejected invalid request");
                    if let Err(e) = producer.reply_error(&message, &invalid).await {
                        error!(error = %e, "Failed to send error reply");
                    }
                }
            }

            // Release permit when done
            drop(permit);
        });
    }

    info!("Router shutting down...");
    metrics.print_summary();

    Ok(())
}
