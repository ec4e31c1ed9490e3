//! Offline packet capture. Live-interface capture (af_packet/XDP/Napatech)
//! is out of scope — only a file-backed reader is needed to drive the
//! detector from a pcap.

pub mod file;
pub mod source;

pub use file::FileCapture;
pub use source::{CaptureStats, HostnameResolver, NoopResolver, PacketSource, RawPacket};
