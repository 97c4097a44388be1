// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voxgraph - a real-time speech-to-knowledge-graph server.
//!
//! Binary entry point: loads configuration, initializes logging, constructs
//! the process-wide external-service clients, and serves the gateway.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use voxgraph_cache::RedisGraphStore;
use voxgraph_config::{load_config, load_config_from_path, VoxgraphConfig};
use voxgraph_core::{GeneratorAdapter, GraphStore, SpeechAdapter};
use voxgraph_feedback::{FeedbackManager, ObjectStoreClient, WarehouseClient};
use voxgraph_gateway::AppContext;
use voxgraph_graph::GraphManager;
use voxgraph_llm::{GeneratorClient, KnowledgeExtractor};
use voxgraph_pipeline::PipelineOptions;
use voxgraph_speech::SpeechClient;

/// Voxgraph - a real-time speech-to-knowledge-graph server.
#[derive(Parser, Debug)]
#[command(name = "voxgraph", version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server (the default when no subcommand is given).
    Serve,
    /// Load and validate the configuration, then exit.
    ConfigValidate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::ConfigValidate => {
            println!("configuration ok");
            ExitCode::SUCCESS
        }
        Commands::Serve => {
            init_tracing(&config);
            match serve(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "server exited with error");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn load(cli: &Cli) -> Result<VoxgraphConfig, figment::Error> {
    match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    }
}

/// Initializes the tracing subscriber per the logging config.
fn init_tracing(config: &VoxgraphConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Constructs the singleton clients and serves the gateway.
async fn serve(config: VoxgraphConfig) -> Result<(), voxgraph_core::VoxgraphError> {
    info!(
        host = config.server.host.as_str(),
        port = config.server.port,
        "voxgraph starting"
    );

    // Cache connects in the background; a missing Redis degrades to
    // in-memory-only graphs instead of blocking startup.
    let store = Arc::new(RedisGraphStore::new(&config.cache.url, config.cache.ttl_secs)?);
    {
        let store = store.clone();
        tokio::spawn(async move {
            store.connect().await;
        });
    }

    let speech: Arc<dyn SpeechAdapter> = Arc::new(SpeechClient::new(
        &config.speech.endpoint,
        config.speech.api_key.as_deref(),
    )?);

    let generator: Arc<dyn GeneratorAdapter> = Arc::new(GeneratorClient::new(
        &config.generator.endpoint,
        config.generator.api_key.as_deref(),
        &config.generator.model,
    )?);

    let extractor = Arc::new(KnowledgeExtractor::new(generator.clone()));

    let feedback = match (&config.feedback.enabled, &config.feedback.bucket) {
        (true, Some(bucket)) => {
            let object_store = Arc::new(ObjectStoreClient::new(
                &config.feedback.object_store_endpoint,
                bucket,
                None,
            )?);
            let warehouse = Arc::new(WarehouseClient::new(
                &config.feedback.warehouse_endpoint,
                &config.feedback.dataset,
                None,
            )?);
            info!(bucket = bucket.as_str(), "feedback collection enabled");
            Some(Arc::new(FeedbackManager::new(
                object_store,
                warehouse,
                generator.clone(),
            )))
        }
        (true, None) => {
            info!("feedback enabled but no bucket configured, disabling");
            None
        }
        _ => None,
    };

    let graph_store: Arc<dyn GraphStore> = store;
    let ctx = AppContext {
        graph: Arc::new(GraphManager::new(graph_store.clone())),
        store: graph_store,
        speech,
        generator,
        extractor,
        feedback,
        pipeline_options: PipelineOptions {
            extraction_batch_size: config.pipeline.extraction_batch_size,
            default_language_codes: config.speech.language_codes.clone(),
        },
        extraction_limit: Arc::new(tokio::sync::Semaphore::new(
            config.pipeline.max_concurrent_extractions,
        )),
        sessions: Arc::new(dashmap::DashMap::new()),
    };

    voxgraph_gateway::start_server(&config.server.host, config.server.port, ctx).await
}
