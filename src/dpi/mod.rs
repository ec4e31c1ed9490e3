//! DPI Analyzer Framework: a registry of per-protocol analyzers dispatched
//! in registration order, plus a payload-hash keyed cache wrapper.
//!
//! A `Vec` of boxed trait objects tried in order, first match wins, over
//! eight application-protocol analyzers.

mod bacnet;
mod coap;
mod dns;
mod dnp3;
mod ethernet_ip;
mod http;
mod modbus;
mod tls;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use md5::{Digest, Md5};
use tracing::{debug, trace};

use crate::cache::TtlLruCache;
use crate::packet::Packet;
use crate::types::AnalysisResult;

pub use bacnet::BacnetAnalyzer;
pub use coap::CoapAnalyzer;
pub use dns::DnsAnalyzer;
pub use dnp3::Dnp3Analyzer;
pub use ethernet_ip::EtherNetIpAnalyzer;
pub use http::HttpAnalyzer;
pub use modbus::ModbusAnalyzer;
pub use tls::TlsAnalyzer;

/// Capability set every DPI analyzer exposes. Deliberately a flat trait
/// rather than a class hierarchy, per the polymorphic-analyzer design note.
pub trait DpiAnalyzer: Send + Sync {
    /// Quick-but-usually-port-first check of whether this analyzer should
    /// attempt `analyze`. If the packet's transport port matches this
    /// analyzer's well-known set, it commits unconditionally; otherwise it
    /// runs a cheap content heuristic before committing to a full parse.
    fn can_analyze(&self, packet: &Packet) -> bool;

    /// Attempt a full parse. `None` is a parse miss (not my protocol, or
    /// payload shorter than my fixed header) — never an error.
    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult>;

    fn protocol_name(&self) -> &'static str;

    fn confidence_threshold(&self) -> f32;
}

/// Registration-by-name, ordered dispatch over the closed analyzer set.
pub struct DpiEngine {
    analyzers: Vec<Box<dyn DpiAnalyzer>>,
    index: HashMap<String, usize>,
}

impl DpiEngine {
    /// Default registry: HTTP first (most common on IT ports), then the
    /// industrial binary protocols, then the remaining IT/constrained
    /// protocols — registration order is dispatch order.
    pub fn new() -> Self {
        let mut engine = Self {
            analyzers: Vec::new(),
            index: HashMap::new(),
        };
        engine.register(Box::new(HttpAnalyzer));
        engine.register(Box::new(ModbusAnalyzer));
        engine.register(Box::new(EtherNetIpAnalyzer));
        engine.register(Box::new(Dnp3Analyzer));
        engine.register(Box::new(BacnetAnalyzer));
        engine.register(Box::new(TlsAnalyzer));
        engine.register(Box::new(DnsAnalyzer));
        engine.register(Box::new(CoapAnalyzer));
        engine
    }

    pub fn register(&mut self, analyzer: Box<dyn DpiAnalyzer>) {
        let name = analyzer.protocol_name().to_string();
        debug!(protocol = %name, "registering DPI analyzer");
        self.index.insert(name, self.analyzers.len());
        self.analyzers.push(analyzer);
    }

    /// Walks analyzers in registration order; the first one whose
    /// `can_analyze`/`analyze` pair produces a result wins.
    pub fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        for analyzer in &self.analyzers {
            if analyzer.can_analyze(packet) {
                trace!(protocol = analyzer.protocol_name(), "DPI analyzer matched, parsing");
                if let Some(result) = analyzer.analyze(packet) {
                    return Some(result);
                }
            }
        }
        None
    }

    pub fn analyzer_by_name(&self, name: &str) -> Option<&dyn DpiAnalyzer> {
        self.index.get(name).map(|&i| self.analyzers[i].as_ref())
    }

    pub fn supported_protocols(&self) -> Vec<String> {
        self.analyzers.iter().map(|a| a.protocol_name().to_string()).collect()
    }
}

impl Default for DpiEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a `DpiEngine` with a payload-hash keyed cache. Only results with
/// `confidence >= 0.7` are cached; values are stored and returned as
/// independent copies so caller mutation never affects the cache.
pub struct CachedDpiEngine {
    engine: DpiEngine,
    cache: TtlLruCache<String, AnalysisResult>,
    max_payload_length: Mutex<usize>,
}

impl CachedDpiEngine {
    pub fn new(engine: DpiEngine, capacity: usize, ttl: Duration, max_payload_length: usize) -> Self {
        Self {
            engine,
            cache: TtlLruCache::new(capacity, ttl),
            max_payload_length: Mutex::new(max_payload_length),
        }
    }

    pub fn set_max_payload_length(&self, len: usize) {
        *self.max_payload_length.lock().unwrap_or_else(|e| e.into_inner()) = len;
    }

    fn cache_key(&self, packet: &Packet) -> String {
        let (payload, layer) = packet.highest_layer_payload();
        let max_len = *self.max_payload_length.lock().unwrap_or_else(|e| e.into_inner());
        let truncated = &payload[..payload.len().min(max_len)];
        let mut hasher = Md5::new();
        hasher.update(truncated);
        let digest = hasher.finalize();
        format!("{:x}:{}", digest, layer)
    }

    pub fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let key = self.cache_key(packet);
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let result = self.engine.analyze(packet)?;
        if result.confidence >= 0.7 {
            self.cache.put(key, result.clone());
        }
        Some(result)
    }

    pub fn supported_protocols(&self) -> Vec<String> {
        self.engine.supported_protocols()
    }

    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, TcpLayer};

    fn modbus_packet() -> Packet {
        Packet {
            tcp: Some(TcpLayer {
                source_port: 40000,
                destination_port: 502,
                syn: false,
                ack: false,
                fin: false,
                rst: false,
                payload: vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn engine_dispatches_to_first_matching_analyzer() {
        let engine = DpiEngine::new();
        let result = engine.analyze(&modbus_packet()).unwrap();
        assert_eq!(result.protocol, "Modbus TCP");
    }

    #[test]
    fn cached_engine_reuses_result_on_second_call() {
        let cached = CachedDpiEngine::new(DpiEngine::new(), 100, Duration::from_secs(60), 1024);
        let packet = modbus_packet();
        let first = cached.analyze(&packet).unwrap();
        let second = cached.analyze(&packet).unwrap();
        assert_eq!(first.protocol, second.protocol);
        assert_eq!(cached.cache_stats().hits, 1);
    }
}
