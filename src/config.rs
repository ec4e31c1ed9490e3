//! Detector configuration: five enumerated option groups with range
//! validation, JSON/TOML persistence and default-on-omission semantics.
//!
//! The per-field `#[serde(default = "…")]` idiom and `toml::from_str`
//! loading path follow the nested, validated runtime configuration style
//! used for protocol-analysis pipelines.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.5
}

fn default_max_payload_size() -> u32 {
    1024
}

fn default_dpi_timeout_ms() -> u32 {
    50
}

fn default_max_signatures() -> u32 {
    256
}

fn default_cache_size() -> usize {
    1000
}

fn default_max_memory_mb() -> u32 {
    512
}

fn default_report_format() -> String {
    "json".to_string()
}

/// Which detector families run and which verdicts are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_true")]
    pub enable_port_based: bool,
    #[serde(default = "default_true")]
    pub enable_dpi: bool,
    #[serde(default = "default_true")]
    pub enable_heuristic: bool,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Empty set means "all protocols allowed".
    #[serde(default)]
    pub enabled_protocols: HashSet<String>,
}

impl DetectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidConfig(format!(
                "detection.confidence_threshold must be in [0,1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    /// Empty set ≡ "all allowed".
    pub fn protocol_allowed(&self, protocol: &str) -> bool {
        self.enabled_protocols.is_empty() || self.enabled_protocols.contains(protocol)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enable_port_based: true,
            enable_dpi: true,
            enable_heuristic: true,
            confidence_threshold: default_confidence_threshold(),
            enabled_protocols: HashSet::new(),
        }
    }
}

/// Which analyzer groups the DPI engine runs, plus its resource budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpiConfig {
    #[serde(default = "default_true")]
    pub enable_http: bool,
    #[serde(default = "default_true")]
    pub enable_tls: bool,
    #[serde(default = "default_true")]
    pub enable_dns: bool,
    #[serde(default = "default_true")]
    pub enable_industrial: bool,
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: u32,
    #[serde(default = "default_dpi_timeout_ms")]
    pub timeout_ms: u32,
}

impl DpiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Default for DpiConfig {
    fn default() -> Self {
        Self {
            enable_http: true,
            enable_tls: true,
            enable_dns: true,
            enable_industrial: true,
            max_payload_size: default_max_payload_size(),
            timeout_ms: default_dpi_timeout_ms(),
        }
    }
}

/// OS/device fingerprinting toggles. Not yet backed by a detector family in
/// this core — reserved for a signature-based detector, see Non-goals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintingConfig {
    #[serde(default)]
    pub enable_os_detection: bool,
    #[serde(default)]
    pub enable_device_detection: bool,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_max_signatures")]
    pub max_signatures: u32,
}

impl FingerprintingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidConfig(format!(
                "fingerprinting.confidence_threshold must be in [0,1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }
}

impl Default for FingerprintingConfig {
    fn default() -> Self {
        Self {
            enable_os_detection: false,
            enable_device_detection: false,
            confidence_threshold: default_confidence_threshold(),
            max_signatures: default_max_signatures(),
        }
    }
}

/// Cache sizing and profiling toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default)]
    pub enable_profiling: bool,
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u32,
}

impl PerformanceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            cache_size: default_cache_size(),
            enable_profiling: false,
            max_memory_mb: default_max_memory_mb(),
        }
    }
}

/// Flow/report-level analysis toggles consumed by `report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub enable_flow_analysis: bool,
    #[serde(default)]
    pub enable_anomaly_detection: bool,
    #[serde(default = "default_true")]
    pub enable_reporting: bool,
    #[serde(default = "default_report_format")]
    pub report_format: String,
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enable_flow_analysis: true,
            enable_anomaly_detection: false,
            enable_reporting: true,
            report_format: default_report_format(),
        }
    }
}

/// Root configuration document. Reading an omitted sub-section yields its
/// documented defaults; unknown keys are ignored by `serde`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub dpi: DpiConfig,
    #[serde(default)]
    pub fingerprinting: FingerprintingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Checks every sub-section's numeric ranges. Validation failure never
    /// replaces an existing live configuration — callers decide that.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.dpi.validate()?;
        self.fingerprinting.validate()?;
        self.performance.validate()?;
        self.analysis.validate()?;
        Ok(())
    }

    /// Loads and validates a configuration document. Format is chosen by
    /// file extension: `.toml` parses as TOML, anything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let config: Config = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads from file, falling back to defaults on any error (missing
    /// file, parse error, or validation failure).
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// Serialises to JSON or TOML, chosen by file extension, the inverse of
    /// `from_file`.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidConfig(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self)?
        };
        fs::write(path, content)?;
        Ok(())
    }
}
