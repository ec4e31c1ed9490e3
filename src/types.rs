//! Core data model: detection/analysis results and the port/heuristic
//! evidence types that feed into them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which detector family produced a [`DetectionResult`].
///
/// Ordering here is declaration order only; arbitration weighting lives in
/// `detector::method_weight`, not in this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    Port,
    Dpi,
    Heuristic,
    Signature,
    Unknown,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMethod::Port => "Port",
            DetectionMethod::Dpi => "DPI",
            DetectionMethod::Heuristic => "Heuristic",
            DetectionMethod::Signature => "Signature",
            DetectionMethod::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Protocol name used when no detector accepts a packet.
pub const UNKNOWN_PROTOCOL: &str = "Unknown";

/// The verdict returned by the Unified Detector for one packet.
///
/// Invariant: `confidence == 0.0` if and only if `protocol == "Unknown"` and
/// `method == DetectionMethod::Unknown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub protocol: String,
    pub confidence: f32,
    pub method: DetectionMethod,
    pub details: HashMap<String, String>,
}

impl DetectionResult {
    pub fn unknown() -> Self {
        Self {
            protocol: UNKNOWN_PROTOCOL.to_string(),
            confidence: 0.0,
            method: DetectionMethod::Unknown,
            details: HashMap::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.protocol == UNKNOWN_PROTOCOL
    }
}

/// The result produced by a single DPI analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub protocol: String,
    pub subprotocol: String,
    pub confidence: f32,
    pub details: HashMap<String, String>,
    pub metadata: HashMap<String, String>,
}

impl AnalysisResult {
    pub fn new(protocol: impl Into<String>, subprotocol: impl Into<String>, confidence: f32) -> Self {
        Self {
            protocol: protocol.into(),
            subprotocol: subprotocol.into(),
            confidence,
            details: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A candidate protocol assignment for one transport port.
///
/// One port may hold several mappings ordered by priority; element 0 of the
/// owning `Vec<PortMapping>` is the highest priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMapping {
    pub protocol: String,
    pub confidence: f32,
    pub description: String,
    pub category: String,
}

impl PortMapping {
    pub fn new(
        protocol: impl Into<String>,
        confidence: f32,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            confidence,
            description: description.into(),
            category: category.into(),
        }
    }
}

/// Evidence produced by a heuristic matcher when its predicate accepts a
/// packet.
#[derive(Debug, Clone)]
pub struct HeuristicMatch {
    pub protocol: &'static str,
    pub confidence: f32,
    pub category: &'static str,
    pub details: HashMap<String, String>,
}

/// A named, ordered, stateless matcher in the heuristic set. Matchers have
/// no cross-packet memory: `matcher` is a plain function pointer.
pub struct HeuristicPattern {
    pub protocol: &'static str,
    pub confidence: f32,
    pub category: &'static str,
    pub matcher: fn(&crate::packet::Packet) -> bool,
}

/// Monotonically non-decreasing detection counters, guarded by a single
/// `RwLock` in the Unified Detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_packets: u64,
    pub successful_detections: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub by_method: HashMap<String, u64>,
    pub by_protocol: HashMap<String, u64>,
}

impl DetectionStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_packets == 0 {
            0.0
        } else {
            self.successful_detections as f64 / self.total_packets as f64
        }
    }

    pub fn record(&mut self, result: &DetectionResult) {
        self.total_packets += 1;
        if !result.is_unknown() {
            self.successful_detections += 1;
            *self
                .by_protocol
                .entry(result.protocol.clone())
                .or_insert(0) += 1;
        }
        *self.by_method.entry(result.method.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_invariant_holds() {
        let result = DetectionResult::unknown();
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.protocol, "Unknown");
        assert_eq!(result.method, DetectionMethod::Unknown);
    }

    #[test]
    fn stats_success_rate_guards_division_by_zero() {
        let stats = DetectionStats::default();
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn stats_record_tracks_successes_and_unknowns() {
        let mut stats = DetectionStats::default();
        stats.record(&DetectionResult::unknown());
        stats.record(&DetectionResult {
            protocol: "HTTP".to_string(),
            confidence: 0.95,
            method: DetectionMethod::Dpi,
            details: HashMap::new(),
        });
        assert_eq!(stats.total_packets, 2);
        assert_eq!(stats.successful_detections, 1);
        assert_eq!(stats.by_protocol.get("HTTP"), Some(&1));
    }
}
