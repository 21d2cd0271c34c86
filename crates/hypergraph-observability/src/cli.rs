// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-crate debug flags
//!
//! Supports flags like `--debug-hypergraph-brain` and `--debug-all`.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Crates whose logs are raised to debug level
///
/// # Example
/// ```rust
/// use hypergraph_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-hypergraph-brain".to_string()]);
/// assert!(flags.is_enabled("hypergraph-brain"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,

    /// Level for everything not listed (defaults to "info")
    pub default_level: Option<String>,
}

impl CrateDebugFlags {
    /// Parse `--debug-{crate-name}` / `--debug-all` arguments
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }
        flags
    }

    /// Build from a list of crate names and a default level (e.g. from the config file)
    pub fn from_crates<I, S>(crates: I, default_level: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = CrateDebugFlags {
            default_level: Some(default_level.to_string()),
            ..Default::default()
        };
        for crate_name in crates {
            match crate_name.as_ref().trim() {
                "" => {}
                "all" => flags.enable_all(),
                name => {
                    flags.enabled_crates.insert(name.to_string());
                }
            }
        }
        flags
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` if enabled for the crate, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Filter directive string for `EnvFilter`.
    ///
    /// Tracing targets are module paths, so crate names are written with
    /// underscores: "hypergraph_brain=debug,info".
    pub fn to_filter_string(&self) -> String {
        let default_level = self
            .default_level
            .clone()
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase();

        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name.replace('-', "_")))
            .collect();
        filters.push(default_level);
        filters.join(",")
    }
}

/// Parse debug flags from process arguments and `HYPERGRAPH_DEBUG`
///
/// Environment variable format: comma-separated crate names or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var("HYPERGRAPH_DEBUG") {
        let from_env = CrateDebugFlags::from_crates(env_var.split(','), "info");
        flags.enabled_crates.extend(from_env.enabled_crates);
    }
    flags
}

/// Help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  HYPERGRAPH_DEBUG={{crate-name}}[,{{crate-name}}]
  HYPERGRAPH_DEBUG=all
"#,
        KNOWN_CRATES.join(", ")
    )
}
