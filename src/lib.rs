//! Protocol classification core: port-dictionary, heuristic and DPI
//! detectors arbitrated by a single [`detector::UnifiedDetector`], plus the
//! ambient stack (configuration, caching, packet decoding, offline capture,
//! statistics reporting) around it.

#[cfg(feature = "rest-api")]
pub mod api;
pub mod cache;
#[cfg(feature = "cli")]
pub mod capture;
pub mod config;
pub mod detector;
pub mod dpi;
pub mod error;
pub mod heuristics;
pub mod packet;
pub mod port_dictionary;
pub mod report;
pub mod types;

pub use cache::{CacheStats, TtlLruCache};
#[cfg(feature = "cli")]
pub use capture::{CaptureStats, FileCapture, HostnameResolver, NoopResolver, PacketSource, RawPacket};
pub use config::Config;
pub use detector::UnifiedDetector;
pub use error::{CaptureError, ConfigError, DetectorError};
pub use packet::Packet;
pub use report::DetectionReport;
pub use types::{DetectionMethod, DetectionResult, DetectionStats};
