//! bcr-ai - terminal front end for the round history engine
//!
//! Reads one command per line from stdin:
//! - `p`, `b`, `t` (or `player`, `banker`, `tie`) record a round
//! - `reset` clears the history after confirmation
//! - `export [path]` writes the history as CSV
//! - `history` shows the most recent rounds
//! - `status`, `help`, `quit`
//!
//! # Environment Variables
//! - `BCR_MODEL_PATH` - ONNX model file (default: tfjs_model/model.onnx)
//! - `BCR_DATA_DIR` - where the history is persisted (default: ~/.bcr_ai)
//! - `BCR_HISTORY_KEY`, `BCR_HISTORY_CAPACITY`, `BCR_EXPORT_PATH`

use anyhow::{Context, Result};
use bcr_ai::application::engine::{Engine, run_and_publish};
use bcr_ai::application::events::EngineEvent;
use bcr_ai::application::ml::classifier::ModelLoader;
use bcr_ai::application::ml::dispatcher::PredictionRequest;
use bcr_ai::config::Config;
use bcr_ai::domain::errors::EngineError;
use bcr_ai::domain::history::LoadOutcome;
use bcr_ai::domain::ports::KeyValueStore;
use bcr_ai::infrastructure::{FileKeyValueStore, InMemoryKeyValueStore};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Rounds listed by the `history` command.
const RECENT_ROUNDS: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "bcr-ai", version, about = "Round history tracker with next-round prediction")]
struct Cli {
    /// ONNX model file, overrides BCR_MODEL_PATH
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Persistence directory, overrides BCR_DATA_DIR
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long)]
    in_memory: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("Invalid log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    info!("bcr-ai {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(model) = cli.model {
        config.model_path = model;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let store: Arc<dyn KeyValueStore> = if cli.in_memory {
        Arc::new(InMemoryKeyValueStore::new())
    } else {
        Arc::new(FileKeyValueStore::new(&config.data_dir)?)
    };

    let mut engine = Engine::create(config.engine(), store);
    let printer = tokio::spawn(print_events(engine.subscribe()));

    match engine.load_persisted() {
        LoadOutcome::Restored { len } => println!("Restored {} rounds.", len),
        LoadOutcome::Missing => println!("Starting with an empty history."),
        LoadOutcome::Recovered(e) => println!("Stored history was unreadable ({}); starting fresh.", e),
    }

    let mut model_load = Some(engine.spawn_model_load(model_loader(&config.model_path)));
    let events = engine.event_sender();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_help();
    loop {
        tokio::select! {
            loaded = async { model_load.as_mut().expect("guarded by select condition").await }, if model_load.is_some() => {
                model_load = None;
                match loaded {
                    Ok(Ok(())) => {
                        if let Some(request) = engine.predict_current() {
                            spawn_prediction(request, &events);
                        }
                    }
                    Ok(Err(_)) => {}
                    Err(e) => warn!("Model load task failed: {}", e),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut engine, &mut lines, &events, line.trim()).await? {
                    break;
                }
            }
        }
    }

    if let Some(handle) = model_load {
        handle.abort();
    }
    engine.dispose();
    drop(events);
    let _ = printer.await;
    Ok(())
}

#[cfg(feature = "onnx")]
fn model_loader(path: &Path) -> Arc<dyn ModelLoader> {
    Arc::new(bcr_ai::application::ml::onnx_classifier::OnnxModelLoader::new(
        path.to_path_buf(),
    ))
}

#[cfg(not(feature = "onnx"))]
fn model_loader(path: &Path) -> Arc<dyn ModelLoader> {
    Arc::new(bcr_ai::infrastructure::mock::StaticModelLoader::failing(&format!(
        "built without ONNX support, cannot load {}",
        path.display()
    )))
}

/// Returns `false` when the session should end.
async fn handle_command(
    engine: &mut Engine,
    lines: &mut Lines<BufReader<Stdin>>,
    events: &broadcast::Sender<EngineEvent>,
    line: &str,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };

    match command.to_lowercase().as_str() {
        "quit" | "exit" | "q" => return Ok(false),
        "help" | "?" => print_help(),
        "reset" => {
            println!("Clear the entire history? [y/N]");
            let answer = lines.next_line().await?.unwrap_or_default();
            if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                engine.reset_history();
            } else {
                println!("Reset cancelled.");
            }
        }
        "export" => {
            let path = parts.next().map(Path::new);
            match engine.export_to_file(path) {
                Ok(written) => println!("Exported to {}", written.display()),
                Err(EngineError::EmptyExport) => println!("No data to export."),
                Err(e) => println!("{}", e),
            }
        }
        "history" => {
            let recent = engine.history().recent(RECENT_ROUNDS);
            if recent.is_empty() {
                println!("—");
            } else {
                let tokens: Vec<&str> = recent.iter().map(|o| o.token()).collect();
                println!("{}", tokens.join(" "));
            }
        }
        "status" => {
            println!(
                "rounds: {}/{} | model: {:?}",
                engine.history().len(),
                engine.history().capacity(),
                engine.dispatcher_state()
            );
            if let Some(alert) = engine.current_alert() {
                println!("alert: {}", alert);
            }
            if let Some(p) = engine.latest_prediction() {
                println!("prediction: {} ({})", p.label, p.confidence_label());
            }
        }
        other => match engine.submit_token(other) {
            Ok(Some(request)) => spawn_prediction(request, events),
            Ok(None) => {}
            Err(e) => println!("{} (type 'help' for commands)", e),
        },
    }
    Ok(true)
}

fn spawn_prediction(request: PredictionRequest, events: &broadcast::Sender<EngineEvent>) {
    let events = events.clone();
    tokio::spawn(async move {
        run_and_publish(request, &events).await;
    });
}

async fn print_events(mut rx: broadcast::Receiver<EngineEvent>) {
    loop {
        match rx.recv().await {
            Ok(EngineEvent::HistoryChanged { .. }) => {}
            Ok(event) => println!("> {}", event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event printer lagged, {} events skipped", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_help() {
    println!("Commands: p | b | t | reset | export [path] | history | status | help | quit");
}
