use thiserror::Error;

/// Errors from loading or validating a [`crate::config::Config`].
///
/// Surfaced to the caller; on any of these the detector's existing
/// configuration is not replaced.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from the external capture-file reader. Fatal errors never
/// originate in the detection core; only here.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture: {0}")]
    OpenFailed(String),

    #[error("failed to read packet: {0}")]
    ReadFailed(String),

    #[error("no more packets")]
    NoMorePackets,
}

/// Reserved for core-originating error conditions. Most "failure" modes in
/// detection (parse miss, underflow, unknown verdict, capacity-0 cache
/// no-op) are represented as `Option`/sentinel values rather than errors,
/// per the error-handling design; this enum stays small by design.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
