//! Fraud Network Pipeline - Main Entry Point
//!
//! Consumes beneficiary cases from NATS, scores them concurrently across the
//! anomaly, duplicate, and network stages, and publishes verdict envelopes.

use anyhow::Result;
use fraud_network_pipeline::{
    config::AppConfig,
    consumer::CaseConsumer,
    graph::{cache::load_or_build, GraphBuilder, GraphCache, GraphHandle, GraphServices},
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::PipelineOrchestrator,
    producer::VerdictProducer,
    stages::{AnomalyStage, DuplicateStage, NetworkStage, Stage},
    store::RecordStore,
    types::case::CaseInput,
    types::verdict::VerdictEnvelope,
    ScoreAggregator,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("fraud_network_pipeline={}", config.logging.level).parse()?);
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Fraud Network Pipeline");
    info!(
        "Detection threshold: {:.2}, Risk levels: low<{:.2}, medium<{:.2}, high<{:.2}",
        config.detection.threshold,
        config.detection.risk_levels.low,
        config.detection.risk_levels.medium,
        config.detection.risk_levels.high
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Load the beneficiary record store
    let store = Arc::new(RecordStore::load_csv(&config.records.path)?);
    info!(records = store.len(), "Record store ready");

    // Build or load the relationship graph
    let builder = GraphBuilder::new(config.graph.max_group_size);
    let cache = GraphCache::new(&config.graph.cache_path);
    let graph = load_or_build(&cache, &builder, store.records())?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        fingerprint = graph.fingerprint(),
        "Relationship graph ready"
    );

    let services = GraphServices::new(
        graph,
        config.graph.ring_threshold,
        config.graph.hub_percentile,
    );
    info!(
        rings = services.rings.ring_count(),
        hub_threshold = services.centrality.hub_threshold(),
        "Graph services ready"
    );
    let graph_handle = GraphHandle::new(services);

    // Assemble the scoring stages and orchestrator
    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(AnomalyStage::new(config.detection.threshold)),
        Arc::new(DuplicateStage::new(store.clone(), config.detection.threshold)),
        Arc::new(NetworkStage::new(graph_handle.clone())),
    ];
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        stages,
        ScoreAggregator::new(config.detection.weights.clone()),
        config.detection.risk_levels.clone(),
        Duration::from_millis(config.pipeline.stage_timeout_ms),
    ));

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = CaseConsumer::new(client.clone(), &config.nats.case_subject);
    let producer = Arc::new(VerdictProducer::new(client.clone(), &config.nats.verdict_subject));

    let num_workers = config.pipeline.workers;
    info!(
        "Starting case processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", config.nats.case_subject);
    info!("Publishing verdicts to: {}", config.nats.verdict_subject);

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    // Process cases in parallel
    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break, // semaphore closed, shutting down
        };

        let orchestrator = orchestrator.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let input = match serde_json::from_slice::<CaseInput>(&message.payload) {
                Ok(input) => input,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize case");
                    drop(permit);
                    return;
                }
            };
            // kept aside so an abort can still name its subject
            let beneficiary_id = input.beneficiary_id.clone();

            let envelope = match orchestrator.run(input).await {
                Ok(verdict) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_case(processing_time, verdict.summary.risk_score);
                    metrics.record_verdict_level(
                        &format!("{:?}", verdict.summary.risk_level).to_lowercase(),
                    );
                    for (stage_name, outcome) in &verdict.stages {
                        if !outcome.is_ok() {
                            metrics.record_stage_failure(stage_name);
                        }
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let throughput = metrics.get_throughput();
                        let processing_stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} cases/s", throughput),
                            avg_latency_us = processing_stats.mean_us,
                            "Processing milestone"
                        );
                    }

                    VerdictEnvelope::Completed { verdict }
                }
                Err(e) => {
                    metrics.record_abort();
                    warn!(
                        beneficiary_id = beneficiary_id.as_deref().unwrap_or("<unknown>"),
                        error = %e,
                        "Case aborted"
                    );
                    VerdictEnvelope::Aborted {
                        beneficiary_id,
                        reason: e.to_string(),
                    }
                }
            };

            if let Err(e) = producer.publish(&envelope).await {
                error!(error = %e, "Failed to publish verdict envelope");
            }

            drop(permit);
        });
    }

    // Print final summary
    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
