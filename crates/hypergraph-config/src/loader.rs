// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base values, missing keys take defaults)
//! 2. Environment variables (runtime overrides)
//! 3. Explicit key/value overrides (caller-supplied)
//!
//! The merged result is validated before it is returned.

use crate::{validate_config, ConfigError, ConfigResult, HypergraphConfig, SchedulingMode};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "hypergraph_configuration.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `HYPERGRAPH_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("HYPERGRAPH_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by HYPERGRAPH_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet HYPERGRAPH_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `overrides` - Optional key/value overrides (see [`apply_cli_overrides`])
///
/// # Errors
///
/// Returns error if the file is missing, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    overrides: Option<&HashMap<String, String>>,
) -> ConfigResult<HypergraphConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: HypergraphConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(overrides) = overrides {
        apply_cli_overrides(&mut config, overrides);
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `HYPERGRAPH_LEARNING_SEED` -> `learning.seed`
/// - `HYPERGRAPH_UPDATE_FRACTION` -> `learning.update_fraction`
/// - `HYPERGRAPH_LEARNING_ENABLED` -> `learning.enabled`
/// - `HYPERGRAPH_CONNECTIVITY_SEED` -> `connectivity.seed`
/// - `HYPERGRAPH_SCHEDULING_MODE` -> `scheduling.mode`
/// - `HYPERGRAPH_WORKER_THREADS` -> `scheduling.worker_threads`
/// - `HYPERGRAPH_ACCELERATOR_BACKEND` -> `accelerator.backend`
/// - `HYPERGRAPH_SNAPSHOT_COMPRESS` -> `snapshot.compress`
/// - `HYPERGRAPH_LOG_LEVEL` -> `logging.level`
///
/// Unparseable values are ignored and the file value is kept.
pub fn apply_environment_overrides(config: &mut HypergraphConfig) {
    let vars: HashMap<String, String> = [
        ("HYPERGRAPH_LEARNING_SEED", "learning_seed"),
        ("HYPERGRAPH_UPDATE_FRACTION", "update_fraction"),
        ("HYPERGRAPH_LEARNING_ENABLED", "learning_enabled"),
        ("HYPERGRAPH_CONNECTIVITY_SEED", "connectivity_seed"),
        ("HYPERGRAPH_SCHEDULING_MODE", "scheduling_mode"),
        ("HYPERGRAPH_WORKER_THREADS", "worker_threads"),
        ("HYPERGRAPH_ACCELERATOR_BACKEND", "accelerator_backend"),
        ("HYPERGRAPH_SNAPSHOT_COMPRESS", "snapshot_compress"),
        ("HYPERGRAPH_LOG_LEVEL", "log_level"),
    ]
    .iter()
    .filter_map(|(var, key)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_cli_overrides(config, &vars);
}

/// Apply key/value overrides to configuration
///
/// Keys: `learning_seed`, `update_fraction`, `learning_enabled`,
/// `connectivity_seed`, `scheduling_mode`, `worker_threads`,
/// `accelerator_backend`, `snapshot_compress`, `log_level`.
pub fn apply_cli_overrides(config: &mut HypergraphConfig, overrides: &HashMap<String, String>) {
    if let Some(seed) = overrides.get("learning_seed").and_then(|v| v.parse::<u64>().ok()) {
        config.learning.seed = seed;
    }
    if let Some(fraction) = overrides
        .get("update_fraction")
        .and_then(|v| v.parse::<f32>().ok())
    {
        config.learning.update_fraction = fraction;
    }
    if let Some(value) = overrides.get("learning_enabled") {
        config.learning.enabled = parse_bool(value);
    }
    if let Some(seed) = overrides
        .get("connectivity_seed")
        .and_then(|v| v.parse::<u64>().ok())
    {
        config.connectivity.seed = seed;
    }
    if let Some(mode) = overrides
        .get("scheduling_mode")
        .and_then(|v| v.parse::<SchedulingMode>().ok())
    {
        config.scheduling.mode = mode;
    }
    if let Some(threads) = overrides
        .get("worker_threads")
        .and_then(|v| v.parse::<usize>().ok())
    {
        config.scheduling.worker_threads = threads;
    }
    if let Some(value) = overrides.get("accelerator_backend") {
        config.accelerator.backend = value.to_lowercase();
    }
    if let Some(value) = overrides.get("snapshot_compress") {
        config.snapshot.compress = parse_bool(value);
    }
    if let Some(value) = overrides.get("log_level") {
        config.logging.level = value.clone();
    }
}
