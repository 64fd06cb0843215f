//! Penguin Predictor - Main Entry Point
//!
//! Loads the model artifact once, then predicts penguin species from
//! measurements given on the command line or as JSON lines on stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use penguin_predictor::{
    config::{AppConfig, LogFormat},
    display::{self, Renderer, Slider},
    metrics::SessionMetrics,
    models::{inference, ArtifactStore, ModelArtifact},
    session,
    types::RawInputs,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "penguin-predictor", version, about = "Predict penguin species from measurements")]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the model artifact path
    #[arg(long, global = true)]
    artifact: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predict the species of a single penguin
    Predict {
        #[arg(long, default_value_t = display::BILL_LENGTH.default, value_parser = bill_length)]
        bill_length_mm: f64,
        #[arg(long, default_value_t = display::BILL_DEPTH.default, value_parser = bill_depth)]
        bill_depth_mm: f64,
        #[arg(long, default_value_t = display::FLIPPER_LENGTH.default, value_parser = flipper_length)]
        flipper_length_mm: f64,
        #[arg(long, default_value_t = display::BODY_MASS.default, value_parser = body_mass)]
        body_mass_g: f64,
        /// Biscoe, Dream or Torgersen
        #[arg(long, default_value = "Biscoe")]
        island: String,
        /// Female or Male
        #[arg(long, default_value = "Female")]
        sex: String,
    },
    /// Read one JSON object of inputs per line from stdin and predict each
    Session {
        /// Print results as JSON lines instead of charts
        #[arg(long)]
        json: bool,
    },
    /// Show which features matter most to the model
    Importances,
}

fn slider_value(s: &str, slider: &Slider) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    slider.check(value).map_err(|e| e.to_string())
}

fn bill_length(s: &str) -> Result<f64, String> {
    slider_value(s, &display::BILL_LENGTH)
}

fn bill_depth(s: &str) -> Result<f64, String> {
    slider_value(s, &display::BILL_DEPTH)
}

fn flipper_length(s: &str) -> Result<f64, String> {
    slider_value(s, &display::FLIPPER_LENGTH)
}

fn body_mass(s: &str) -> Result<f64, String> {
    slider_value(s, &display::BODY_MASS)
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive(format!("penguin_predictor={}", config.logging.level).parse()?),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let Some(path) = cli.artifact {
        config.artifact.path = path;
    }

    init_logging(&config)?;
    info!(artifact = %config.artifact.path.display(), "Starting Penguin Predictor");

    // A missing or broken artifact is fatal
    let store = ArtifactStore::from_config(&config.artifact);
    let artifact = store
        .load()
        .with_context(|| format!("Cannot start without model artifact {}", store.path().display()))?;

    let renderer = Renderer::new(&config.display);

    match cli.command {
        Command::Predict {
            bill_length_mm,
            bill_depth_mm,
            flipper_length_mm,
            body_mass_g,
            island,
            sex,
        } => {
            let raw = RawInputs::new(
                bill_length_mm,
                bill_depth_mm,
                flipper_length_mm,
                body_mass_g,
                &island,
                &sex,
            );
            let result = inference::predict(&raw, &artifact)?;

            println!("{}", renderer.prediction(&result, &artifact));
            if let Some(gauge) = renderer.confidence(Some(&result)) {
                println!("{gauge}");
            }
            println!("{}", renderer.feature_importances(&artifact));
        }
        Command::Session { json } => run_session(&artifact, &renderer, json)?,
        Command::Importances => println!("{}", renderer.feature_importances(&artifact)),
    }

    Ok(())
}

/// Serve predictions until stdin closes; a bad request never ends the session
fn run_session(artifact: &ModelArtifact, renderer: &Renderer, json: bool) -> Result<()> {
    let metrics = SessionMetrics::new();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    info!("Session started, reading one JSON request per line");

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match session::handle_request(&line, artifact, &metrics) {
            Ok(result) => {
                if json {
                    writeln!(stdout, "{}", serde_json::to_string(&result)?)?;
                } else {
                    writeln!(stdout, "{}", renderer.prediction(&result, artifact))?;
                    if let Some(gauge) = renderer.confidence(Some(&result)) {
                        writeln!(stdout, "{gauge}")?;
                    }
                }
            }
            Err(e) => writeln!(stdout, "error: {e}")?,
        }
        stdout.flush()?;
    }

    metrics.print_summary();
    Ok(())
}
