// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! The merged result is validated before it is returned.

use crate::validation::validate_config;
use crate::{ConfigError, ConfigResult, TrainingConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "NEUREVO_CONFIG_PATH";

/// Configuration file name searched for in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "neurevo.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `NEUREVO_CONFIG_PATH` environment variable
/// 2. Current working directory: `./neurevo.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<TrainingConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: TrainingConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = {:?}", key, value)))
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply one `key = value` override; keys are the snake_case CLI names
fn apply_override(config: &mut TrainingConfig, key: &str, value: &str) -> ConfigResult<bool> {
    let propagation = &mut config.propagation;
    match key {
        "learning_rate" => propagation.learning_rate = parse_value(key, value)?,
        "generations" => propagation.generations = parse_value(key, value)?,
        "batch_size" => propagation.batch_size = parse_value(key, value)?,
        "plank_constant" => propagation.plank_constant = parse_value(key, value)?,
        "disable_random_samples" => propagation.disable_random_samples = parse_flag(value),
        "disable_exponential_clamp" => propagation.disable_exponential_clamp = parse_flag(value),
        "epochs" => config.training.epochs = parse_value(key, value)?,
        "seed" => config.training.seed = Some(parse_value(key, value)?),
        "log_level" => config.logging.level = value.trim().to_string(),
        _ => return Ok(false),
    }
    Ok(true)
}

const OVERRIDE_KEYS: &[&str] = &[
    "learning_rate",
    "generations",
    "batch_size",
    "plank_constant",
    "disable_random_samples",
    "disable_exponential_clamp",
    "epochs",
    "seed",
    "log_level",
];

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUREVO_LEARNING_RATE` -> `propagation.learning_rate`
/// - `NEUREVO_GENERATIONS` -> `propagation.generations`
/// - `NEUREVO_BATCH_SIZE` -> `propagation.batch_size`
/// - `NEUREVO_PLANK_CONSTANT` -> `propagation.plank_constant`
/// - `NEUREVO_DISABLE_RANDOM_SAMPLES` -> `propagation.disable_random_samples`
/// - `NEUREVO_DISABLE_EXPONENTIAL_CLAMP` -> `propagation.disable_exponential_clamp`
/// - `NEUREVO_EPOCHS` -> `training.epochs`
/// - `NEUREVO_SEED` -> `training.seed`
/// - `NEUREVO_LOG_LEVEL` -> `logging.level`
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a variable is set but cannot be parsed.
pub fn apply_environment_overrides(config: &mut TrainingConfig) -> ConfigResult<()> {
    for key in OVERRIDE_KEYS {
        let var = format!("NEUREVO_{}", key.to_uppercase());
        if let Ok(value) = env::var(&var) {
            apply_override(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"learning_rate": "0.05", "epochs": "20"}`)
///
/// Unknown keys are ignored so callers can pass their whole argument map.
pub fn apply_cli_overrides(
    config: &mut TrainingConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        apply_override(config, key, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var(CONFIG_PATH_ENV, "/definitely/not/here/neurevo.toml");
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[propagation]").unwrap();
        writeln!(file, "learning_rate = 0.25").unwrap();
        writeln!(file, "batch_size = 4").unwrap();
        writeln!(file, "[training]").unwrap();
        writeln!(file, "epochs = 3").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.propagation.learning_rate, 0.25);
        assert_eq!(config.propagation.batch_size, 4);
        assert_eq!(config.training.epochs, 3);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[propagation]").unwrap();
        writeln!(file, "batch_size = 0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = TrainingConfig::default();

        env::set_var("NEUREVO_LEARNING_RATE", "0.75");
        env::set_var("NEUREVO_DISABLE_RANDOM_SAMPLES", "yes");
        env::set_var("NEUREVO_SEED", "42");

        let result = apply_environment_overrides(&mut config);

        env::remove_var("NEUREVO_LEARNING_RATE");
        env::remove_var("NEUREVO_DISABLE_RANDOM_SAMPLES");
        env::remove_var("NEUREVO_SEED");

        result.unwrap();
        assert_eq!(config.propagation.learning_rate, 0.75);
        assert!(config.propagation.disable_random_samples);
        assert_eq!(config.training.seed, Some(42));
    }

    #[test]
    fn test_environment_override_parse_failure() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = TrainingConfig::default();

        env::set_var("NEUREVO_BATCH_SIZE", "lots");
        let result = apply_environment_overrides(&mut config);
        env::remove_var("NEUREVO_BATCH_SIZE");

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = TrainingConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("generations".to_string(), "0".to_string());
        cli_args.insert("epochs".to_string(), "7".to_string());
        cli_args.insert("unrelated_flag".to_string(), "x".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.propagation.generations, 0.0);
        assert_eq!(config.training.epochs, 7);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[propagation]").unwrap();
        writeln!(file, "learning_rate = 0.2").unwrap();
        writeln!(file, "generations = 5.0").unwrap();

        env::set_var("NEUREVO_LEARNING_RATE", "0.3");
        env::set_var("NEUREVO_GENERATIONS", "6");

        let mut cli_args = HashMap::new();
        cli_args.insert("learning_rate".to_string(), "0.4".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));

        env::remove_var("NEUREVO_LEARNING_RATE");
        env::remove_var("NEUREVO_GENERATIONS");

        let config = config.unwrap();
        // CLI wins for learning rate, env wins for generations (no CLI override)
        assert_eq!(config.propagation.learning_rate, 0.4);
        assert_eq!(config.propagation.generations, 6.0);
    }
}
