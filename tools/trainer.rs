// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Network Trainer

Trains a serialized network on a JSON dataset with target propagation.

Usage:
  cargo run --bin neurevo-trainer -- --network <network.json> --data <samples.json> \
      [--output <trained.json>] [--config <neurevo.toml>] [--set key=value]... \
      [--debug-neurevo-neural | --debug-all]

The dataset is a JSON array of `{"input": [...], "output": [...]}` samples.
Every epoch runs one traced forward pass and one propagate call per sample,
then applies the adjusted weights and biases. Without `--output` the trained
network overwrites the input file.
*/

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{info, warn};

use neurevo::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, TrainingConfig,
};
use neurevo::neural::{unknown_exclusions, Network, NetworkRecord};
use neurevo::observability::{debug_flags_help, parse_debug_flags};

#[derive(Debug, Deserialize)]
struct Sample {
    input: Vec<f64>,
    output: Vec<f64>,
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    network: Option<PathBuf>,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    #[cfg_attr(not(feature = "file-logging"), allow(dead_code))]
    log_dir: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn usage() -> String {
    format!(
        "Usage: neurevo-trainer --network <network.json> --data <samples.json> \
         [--output <trained.json>] [--config <neurevo.toml>] [--log-dir <dir>] \
         [--set key=value]...\n\n{}",
        debug_flags_help()
    )
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .with_context(|| format!("{} expects a value\n\n{}", name, usage()))
        };
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--network" => args.network = Some(PathBuf::from(value("--network")?)),
            "--data" => args.data = Some(PathBuf::from(value("--data")?)),
            "--output" => args.output = Some(PathBuf::from(value("--output")?)),
            "--log-dir" => args.log_dir = Some(PathBuf::from(value("--log-dir")?)),
            "--set" => {
                let pair = value("--set")?;
                let Some((key, val)) = pair.split_once('=') else {
                    bail!("--set expects key=value, got {:?}", pair);
                };
                args.overrides
                    .insert(key.trim().to_string(), val.trim().to_string());
            }
            "--help" | "-h" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            flag if flag.starts_with("--debug-") => {}
            other => bail!("Unknown argument {:?}\n\n{}", other, usage()),
        }
    }
    Ok(args)
}

fn load_training_config(args: &Args) -> Result<TrainingConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    if let Some(path) = path {
        return load_config(Some(&path), Some(&args.overrides))
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let mut config = TrainingConfig::default();
    apply_environment_overrides(&mut config)?;
    apply_cli_overrides(&mut config, &args.overrides)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn mean_absolute_error(outputs: &[f64], targets: &[f64]) -> f64 {
    if outputs.is_empty() {
        return 0.0;
    }
    outputs
        .iter()
        .zip(targets)
        .map(|(output, target)| (output - target).abs())
        .sum::<f64>()
        / outputs.len() as f64
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = load_training_config(&args)?;
    let flags = parse_debug_flags();

    #[cfg(feature = "file-logging")]
    let _guard = neurevo::observability::init_file_logging(
        &flags,
        &config.logging.level,
        config.logging.format,
        args.log_dir.clone(),
    )?;
    #[cfg(not(feature = "file-logging"))]
    neurevo::observability::init_logging(&flags, &config.logging.level, config.logging.format)?;

    for name in unknown_exclusions(&config.propagation) {
        warn!(squash = name, "excluded squash matches no known strategy");
    }

    let network_path = args
        .network
        .clone()
        .with_context(|| format!("--network is required\n\n{}", usage()))?;
    let data_path = args
        .data
        .clone()
        .with_context(|| format!("--data is required\n\n{}", usage()))?;

    let record: NetworkRecord = read_json(&network_path)?;
    let mut network = Network::from_record(&record)?;
    network.validate()?;
    let samples: Vec<Sample> = read_json(&data_path)?;
    if samples.is_empty() {
        bail!("{} contains no samples", data_path.display());
    }

    let seed = config.training.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    info!(
        seed,
        epochs = config.training.epochs,
        samples = samples.len(),
        neurons = network.graph().len(),
        synapses = network.graph().synapse_count(),
        "training started"
    );

    for epoch in 1..=config.training.epochs {
        let mut error = 0.0;
        for sample in &samples {
            network.clear();
            let outputs = network.activate_and_trace(&sample.input)?;
            error += mean_absolute_error(&outputs, &sample.output);
            network.propagate(&sample.output, &config.propagation, &mut rng)?;
        }
        let changed = network.apply(&config.propagation)?;
        info!(
            epoch,
            mae = error / samples.len() as f64,
            changed,
            "epoch complete"
        );
    }

    let output_path = args.output.clone().unwrap_or(network_path);
    fs::write(&output_path, network.to_record().to_json()?)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    info!(path = %output_path.display(), "trained network written");
    Ok(())
}
