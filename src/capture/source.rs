//! Packet source contract: the capture reader hands the core a
//! [`RawPacket`] with its own byte slice. Decoding into typed layers
//! happens in `packet::Packet::from_ethernet_frame`, never here — a
//! capture source's only job is to yield bytes in order.

use std::time::SystemTime;

use crate::error::CaptureError;

/// One capture-file/interface record: still-undecoded frame bytes plus
/// capture metadata.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub data: Vec<u8>,
    pub timestamp: SystemTime,
    pub length: usize,
}

/// Capture-level counters, distinct from the detector's `DetectionStats` —
/// these describe the capture reader itself, not detection outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureStats {
    pub packets_received: u64,
    pub packets_dropped: u64,
}

/// Abstraction over packet capture sources so the core can be driven by a
/// file reader, a live interface, or a test fixture without caring which.
pub trait PacketSource {
    /// Returns the next packet, or `None` once the source is exhausted.
    fn next_packet(&mut self) -> Result<Option<RawPacket>, CaptureError>;

    fn stats(&self) -> CaptureStats;
}

/// Resolves an IP address to a hostname, used to annotate reports with
/// friendlier names than raw addresses. The default implementation never
/// resolves anything — wiring in a real resolver (e.g. reverse DNS, a
/// static hosts file) is left to the embedding application.
pub trait HostnameResolver: Send + Sync {
    fn resolve(&self, addr: std::net::IpAddr) -> Option<String>;
}

/// No-op resolver: always returns `None`. Used as the default so the core
/// never depends on network access to produce a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl HostnameResolver for NoopResolver {
    fn resolve(&self, _addr: std::net::IpAddr) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_resolver_never_resolves() {
        let resolver = NoopResolver;
        assert_eq!(resolver.resolve("127.0.0.1".parse().unwrap()), None);
    }
}
