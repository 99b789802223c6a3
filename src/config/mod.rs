/// Configuration management for the flowdeck loader
///
/// Handles workflow discovery roots, watch behavior and the optional
/// publish target. Defaults come from FLOWDECK_* environment variables for
/// container deployment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discovery and watch configuration
    pub loader: LoaderConfig,
    /// External publish target configuration
    pub publish: PublishConfig,
}

/// Discovery, loading and watch parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Root directory scanned for definition files (default: "workflows")
    pub workflows_dir: PathBuf,
    /// File extensions loaded as definitions (default: json, yaml, lua)
    pub extensions: Vec<String>,
    /// Whether to watch the root for changes after the startup scan
    pub watch: bool,
    /// Quiet window before a changed file is considered settled
    pub quiescence_ms: u64,
    /// Full-rescan period once the watcher has degraded
    pub rescan_secs: u64,
}

/// Publish target configuration; publishing stays disabled without a URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Whether accepted definitions are pushed to the publish target
    pub auto_deploy: bool,
    /// Endpoint receiving `{id, name, sourcePath}` records
    pub target_url: Option<String>,
    /// Optional API key sent with each publish request
    pub api_key: Option<String>,
    /// Per-request timeout for the publish client
    pub request_timeout_secs: u64,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        let extensions = std::env::var("FLOWDECK_EXTENSIONS")
            .map(|raw| {
                raw.split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_string())
                    .filter(|ext| !ext.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec!["json".to_string(), "yaml".to_string(), "lua".to_string()]
            });

        Self {
            loader: LoaderConfig {
                workflows_dir: std::env::var("FLOWDECK_WORKFLOWS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("workflows")),
                extensions,
                watch: env_flag("FLOWDECK_WATCH", true),
                quiescence_ms: env_number("FLOWDECK_QUIESCENCE_MS", 300),
                rescan_secs: env_number("FLOWDECK_RESCAN_SECS", 30),
            },
            publish: PublishConfig {
                auto_deploy: env_flag("FLOWDECK_AUTO_DEPLOY", false),
                target_url: std::env::var("FLOWDECK_PUBLISH_URL").ok(),
                api_key: std::env::var("FLOWDECK_PUBLISH_API_KEY").ok(),
                request_timeout_secs: env_number("FLOWDECK_PUBLISH_TIMEOUT_SECS", 10),
            },
        }
    }
}

impl LoaderConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }
}

impl PublishConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Publishing is active only when enabled and a target URL is set.
    pub fn enabled(&self) -> bool {
        self.auto_deploy && self.target_url.is_some()
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_number(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
