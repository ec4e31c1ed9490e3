//! Unified Detector: orchestrates the three evidence sources, arbitrates
//! between them, and owns the detection cache and running statistics.
//!
//! Cache first, then try candidates in priority order: three
//! independently-scored detector families combined by a weighted-confidence
//! arbitration step.

use std::sync::RwLock;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::cache::TtlLruCache;
use crate::config::Config;
use crate::dpi::{CachedDpiEngine, DpiEngine};
use crate::heuristics::HeuristicSet;
use crate::packet::Packet;
use crate::port_dictionary::PortDictionary;
use crate::types::{DetectionMethod, DetectionResult, DetectionStats};

const DEFAULT_DETECTION_CACHE_CAPACITY: usize = 1000;
const DEFAULT_DETECTION_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Fixed multipliers biasing score comparison between detector families.
/// Orthogonal to `confidence`, which is evaluated on its own for the
/// threshold gate.
fn method_weight(method: DetectionMethod) -> f32 {
    match method {
        DetectionMethod::Dpi => 1.0,
        DetectionMethod::Signature => 0.9,
        DetectionMethod::Port => 0.7,
        DetectionMethod::Heuristic => 0.5,
        DetectionMethod::Unknown => 0.1,
    }
}

/// Builds the detection-cache key: ordered layer-type names, then
/// `:srcPort:dstPort` if a transport layer is present.
///
/// Collisions across unrelated flows sharing this shape are acceptable by
/// design: the cache is an advisory accelerator, never a correctness
/// boundary.
pub fn flow_key(packet: &Packet) -> String {
    let mut key = packet.layer_stack().join(",");
    if let Some((src, dst)) = packet.transport_flow() {
        key.push(':');
        key.push_str(&src.to_string());
        key.push(':');
        key.push_str(&dst.to_string());
    }
    key
}

/// Runs DPI, port-based and heuristic detectors against one packet, scores
/// and arbitrates their verdicts, and caches the result by flow key.
///
/// Thread-safety per the concurrency model: counters live behind a single
/// `RwLock`, the cache guards its own map under a mutex, and configuration
/// is read once at the start of each packet's processing so a
/// reconfiguration mid-burst cannot produce an internally inconsistent
/// verdict for any one packet.
pub struct UnifiedDetector {
    config: RwLock<Config>,
    port_dictionary: PortDictionary,
    heuristics: HeuristicSet,
    dpi: CachedDpiEngine,
    cache: TtlLruCache<String, DetectionResult>,
    stats: RwLock<DetectionStats>,
}

impl UnifiedDetector {
    pub fn new(config: Config) -> Self {
        Self::with_cache(config, DEFAULT_DETECTION_CACHE_CAPACITY, DEFAULT_DETECTION_CACHE_TTL)
    }

    pub fn with_cache(config: Config, cache_capacity: usize, cache_ttl: Duration) -> Self {
        let dpi_capacity = config.performance.cache_size.max(1);
        let max_payload = config.dpi.max_payload_size.max(1) as usize;
        Self {
            port_dictionary: PortDictionary::new(),
            heuristics: HeuristicSet::new(),
            dpi: CachedDpiEngine::new(DpiEngine::new(), dpi_capacity, cache_ttl, max_payload),
            cache: TtlLruCache::new(cache_capacity, cache_ttl),
            config: RwLock::new(config),
            stats: RwLock::new(DetectionStats::default()),
        }
    }

    /// Runs the seven-step arbitration procedure for one packet.
    pub fn detect(&self, packet: &Packet) -> DetectionResult {
        let key = flow_key(packet);

        if self.config_snapshot().performance.enable_caching {
            if let Some(cached) = self.cache.get(&key) {
                let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
                stats.total_packets += 1;
                stats.cache_hits += 1;
                trace!(flow_key = %key, "detection cache hit");
                return cached;
            }
            let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
            stats.cache_misses += 1;
        }

        let config = self.config_snapshot();
        let candidates = self.collect_candidates(packet, &config);
        let selected = Self::arbitrate(candidates);

        let verdict = match selected {
            Some(result)
                if result.confidence >= config.detection.confidence_threshold
                    && config.detection.protocol_allowed(&result.protocol) =>
            {
                debug!(protocol = %result.protocol, method = %result.method, confidence = result.confidence, "accepted verdict");
                result
            }
            Some(result) => {
                trace!(protocol = %result.protocol, confidence = result.confidence, threshold = config.detection.confidence_threshold, "below threshold, returning Unknown");
                DetectionResult::unknown()
            }
            None => DetectionResult::unknown(),
        };

        {
            let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
            stats.record(&verdict);
        }

        if config.performance.enable_caching {
            self.cache.put(key, verdict.clone());
        }

        verdict
    }

    fn collect_candidates(&self, packet: &Packet, config: &Config) -> Vec<DetectionResult> {
        let mut candidates = Vec::with_capacity(3);

        if config.detection.enable_dpi {
            if let Some(analysis) = self.dpi.analyze(packet) {
                let mut details = analysis.details.clone();
                details.insert("subprotocol".to_string(), analysis.subprotocol.clone());
                for (k, v) in analysis.metadata {
                    details.insert(format!("metadata.{k}"), v);
                }
                candidates.push(DetectionResult {
                    protocol: analysis.protocol,
                    confidence: analysis.confidence,
                    method: DetectionMethod::Dpi,
                    details,
                });
            }
        }

        if config.detection.enable_port_based {
            if let Some(result) = self.port_dictionary.detect(packet) {
                candidates.push(result);
            }
        }

        if config.detection.enable_heuristic {
            if let Some(result) = self.heuristics.detect(packet) {
                candidates.push(result);
            }
        }

        candidates
    }

    /// Selects the candidate with the highest `confidence * methodWeight`
    /// score; ties keep the earlier (DPI → Port → Heuristic) candidate.
    fn arbitrate(candidates: Vec<DetectionResult>) -> Option<DetectionResult> {
        candidates.into_iter().fold(None, |best, candidate| {
            let score = candidate.confidence * method_weight(candidate.method);
            match &best {
                Some((best_score, _)) if *best_score >= score => best,
                _ => Some((score, candidate)),
            }
        }).map(|(_, result)| result)
    }

    fn config_snapshot(&self) -> Config {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_confidence_threshold(&self, threshold: f32) {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        config.detection.confidence_threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn set_detector_enabled(&self, method: DetectionMethod, enabled: bool) {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        match method {
            DetectionMethod::Dpi => config.detection.enable_dpi = enabled,
            DetectionMethod::Port => config.detection.enable_port_based = enabled,
            DetectionMethod::Heuristic => config.detection.enable_heuristic = enabled,
            other => warn!(method = %other, "no detector family toggle for this method"),
        }
    }

    pub fn set_enabled_protocols(&self, protocols: Vec<String>) {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        config.detection.enabled_protocols = protocols.into_iter().collect();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        self.dpi.clear_cache();
    }

    pub fn stats(&self) -> DetectionStats {
        self.stats.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn detection_cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    pub fn dpi_cache_stats(&self) -> crate::cache::CacheStats {
        self.dpi.cache_stats()
    }

    pub fn config(&self) -> Config {
        self.config_snapshot()
    }

    pub fn supported_protocols(&self) -> Vec<String> {
        let mut names = self.port_dictionary.supported_protocols();
        names.extend(self.heuristics.supported_protocols());
        names.extend(self.dpi.supported_protocols());
        names.sort();
        names.dedup();
        names
    }
}
