//! Statistics snapshot assembled from a detector's running state, plus
//! per-flow aggregation of individual verdicts.
//!
//! The top-level snapshot covers the whole detection surface: counters,
//! both cache statistics, the effective configuration, and the
//! supported-protocol union. `FlowSummary` does the same per flow key,
//! tallying which protocols and methods were seen on each one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::config::Config;
use crate::detector::UnifiedDetector;
use crate::types::{DetectionMethod, DetectionResult, DetectionStats};

/// Read-only copy of everything a caller might want to know about the
/// detector's current state. Every field is a snapshot at the moment
/// `DetectionReport::snapshot` was called; nothing here updates live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub stats: DetectionStats,
    pub success_rate: f64,
    pub detection_cache: CacheStats,
    pub dpi_cache: CacheStats,
    pub config: Config,
    pub supported_protocols: Vec<String>,
    /// ISO-8601 timestamp of when this snapshot was taken.
    pub generated_at: String,
}

impl DetectionReport {
    pub fn snapshot(detector: &UnifiedDetector, generated_at: String) -> Self {
        let stats = detector.stats();
        Self {
            success_rate: stats.success_rate(),
            stats,
            detection_cache: detector.detection_cache_stats(),
            dpi_cache: detector.dpi_cache_stats(),
            config: detector.config(),
            supported_protocols: detector.supported_protocols(),
            generated_at,
        }
    }
}

/// Per-flow rollup of every verdict seen for one flow key. A flow is
/// identified by the same key the detector's cache uses
/// (`detector::flow_key`), so a `FlowSummary` groups exactly the packets
/// that would have shared a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    pub flow_key: String,
    pub packet_count: u64,
    /// Most recently observed verdict for this flow; a flow's protocol can
    /// change over its lifetime (e.g. a cache eviction revealing a new
    /// classification), so only the last one is kept, not a running
    /// "first seen" value.
    pub last_protocol: String,
    pub last_confidence: f32,
    pub last_method: DetectionMethod,
    pub protocol_counts: HashMap<String, u64>,
}

impl FlowSummary {
    fn new(flow_key: String) -> Self {
        Self {
            flow_key,
            packet_count: 0,
            last_protocol: crate::types::UNKNOWN_PROTOCOL.to_string(),
            last_confidence: 0.0,
            last_method: DetectionMethod::Unknown,
            protocol_counts: HashMap::new(),
        }
    }

    fn record(&mut self, result: &DetectionResult) {
        self.packet_count += 1;
        self.last_protocol = result.protocol.clone();
        self.last_confidence = result.confidence;
        self.last_method = result.method;
        *self
            .protocol_counts
            .entry(result.protocol.clone())
            .or_insert(0) += 1;
    }
}

/// Groups `(flow_key, DetectionResult)` pairs into one [`FlowSummary`] per
/// distinct key, in first-seen order.
pub fn summarize_flows<'a>(
    results: impl IntoIterator<Item = (&'a str, &'a DetectionResult)>,
) -> Vec<FlowSummary> {
    let mut order = Vec::new();
    let mut by_key: HashMap<&str, FlowSummary> = HashMap::new();

    for (flow_key, result) in results {
        by_key
            .entry(flow_key)
            .or_insert_with(|| {
                order.push(flow_key);
                FlowSummary::new(flow_key.to_string())
            })
            .record(result);
    }

    order.into_iter().map(|key| by_key.remove(key).unwrap()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_detector_counters() {
        use crate::packet::{Packet, TcpLayer};

        let detector = UnifiedDetector::new(Config::default());
        let packet = Packet {
            tcp: Some(TcpLayer {
                source_port: 1234,
                destination_port: 502,
                syn: false,
                ack: false,
                fin: false,
                rst: false,
                payload: vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A],
            }),
            ..Default::default()
        };
        detector.detect(&packet);

        let report = DetectionReport::snapshot(&detector, "2026-07-28T00:00:00Z".to_string());
        assert_eq!(report.stats.total_packets, 1);
        assert!(report.supported_protocols.contains(&"Modbus TCP".to_string()));
        assert_eq!(report.generated_at, "2026-07-28T00:00:00Z");
    }

    #[test]
    fn summarize_flows_groups_by_key_and_keeps_last_verdict() {
        let http = DetectionResult {
            protocol: "HTTP".to_string(),
            confidence: 0.95,
            method: DetectionMethod::Dpi,
            details: Default::default(),
        };
        let unknown = DetectionResult::unknown();

        let results = vec![("flow-a", &http), ("flow-b", &http), ("flow-a", &unknown)];
        let summaries = summarize_flows(results);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].flow_key, "flow-a");
        assert_eq!(summaries[0].packet_count, 2);
        assert_eq!(summaries[0].last_protocol, "Unknown");
        assert_eq!(summaries[0].protocol_counts.get("HTTP"), Some(&1));
        assert_eq!(summaries[1].flow_key, "flow-b");
        assert_eq!(summaries[1].packet_count, 1);
        assert_eq!(summaries[1].last_protocol, "HTTP");
    }
}
