use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration. Every key has a sensible default; a missing
/// config file means a default scan of us-east-1 with no persistence or
/// notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub compute: ComputeSettings,
    pub volume: VolumeSettings,
    pub database: DatabaseSettings,
    pub object_store: ObjectStoreSettings,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target region; each run covers exactly one account/region pair.
    pub region: String,
    /// Try the live Price List API before the static table.
    pub use_pricing_api: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    pub lookback_days: u32,
    /// Average CPU % below which a running instance is idle.
    pub cpu_idle_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub lookback_days: u32,
    /// Combined read+write operations below which an attached volume is
    /// considered low-activity.
    pub io_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub lookback_days: u32,
    pub cpu_threshold: f64,
    /// Average connection count at or below which the instance is idle.
    pub connections_threshold: f64,
    /// Manual snapshots older than this are flagged.
    pub snapshot_age_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSettings {
    pub lookback_days: u32,
    /// Total requests at or below which a bucket is considered inactive.
    pub request_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Bucket for persisted reports; unset skips persistence.
    pub s3_bucket: Option<String>,
    /// Topic for summary notifications; unset skips notification.
    pub sns_topic_arn: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            use_pricing_api: true,
        }
    }
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            cpu_idle_threshold: 5.0,
        }
    }
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            io_threshold: 100.0,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            cpu_threshold: 5.0,
            connections_threshold: 1.0,
            snapshot_age_days: 90,
        }
    }
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            lookback_days: 180,
            request_threshold: 10.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            compute: ComputeSettings::default(),
            volume: VolumeSettings::default(),
            database: DatabaseSettings::default(),
            object_store: ObjectStoreSettings::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .wastectl.toml in current dir, then ~/.config/wastectl/config.toml
            let local = PathBuf::from(".wastectl.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("wastectl").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".wastectl.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content).with_context(|| {
                format!(
                    "Failed to parse config: {}\n  Tip: Run 'wastectl init' to create a new config file",
                    config_path.display()
                )
            })?;
            Ok(config)
        } else {
            if path.is_some() {
                eprintln!("WARNING: Config file not found: {}", config_path.display());
                eprintln!("   Using default configuration. Run 'wastectl init' to create a config file.");
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
