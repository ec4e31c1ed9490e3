//! Ordered payload/frame-shape heuristic matchers.
//!
//! Each matcher is a pure, stateless predicate over a packet's layers:
//! fixed header fields read at fixed offsets with early-return guards. The
//! heuristic set probes industrial signatures before general-IT ones
//! because industrial frames carry tighter invariants.

use byteorder::{BigEndian, ByteOrder};

use crate::packet::Packet;
use crate::types::{DetectionMethod, DetectionResult, HeuristicPattern};

fn is_modbus_tcp(packet: &Packet) -> bool {
    if !packet.is_tcp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 7 {
        return false;
    }
    let protocol_id = BigEndian::read_u16(&payload[2..4]);
    let length = BigEndian::read_u16(&payload[4..6]);
    if protocol_id != 0 || !(1..=252).contains(&length) {
        return false;
    }
    if payload.len() > 7 {
        let function_code = payload[7];
        if !(1..=127).contains(&function_code) {
            return false;
        }
    }
    true
}

fn is_ethernet_ip(packet: &Packet) -> bool {
    if !packet.is_tcp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 24 {
        return false;
    }
    let command = BigEndian::read_u16(&payload[0..2]);
    matches!(command, 0x0065 | 0x0066 | 0x006F | 0x0070)
}

fn is_dnp3(packet: &Packet) -> bool {
    if !packet.is_tcp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 10 {
        return false;
    }
    payload[0] == 0x05 && payload[1] == 0x64 && payload[2] >= 5
}

fn is_bacnet(packet: &Packet) -> bool {
    if !packet.is_udp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 4 {
        return false;
    }
    matches!(payload[0], 0x81..=0x84)
}

const HTTP_METHOD_PREFIXES: &[&str] = &[
    "GET ", "POST ", "PUT ", "DELETE ", "HEAD ", "OPTIONS ", "PATCH ",
];

fn is_http(packet: &Packet) -> bool {
    if !packet.is_tcp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 10 {
        return false;
    }
    let window = &payload[..payload.len().min(100)];
    let text = String::from_utf8_lossy(window);
    HTTP_METHOD_PREFIXES.iter().any(|p| text.starts_with(p)) || text.contains("HTTP/")
}

fn is_dns(packet: &Packet) -> bool {
    if !packet.is_udp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 12 {
        return false;
    }
    let flags = BigEndian::read_u16(&payload[2..4]);
    let opcode = (flags >> 11) & 0x0F;
    let rcode = flags & 0x0F;
    opcode <= 2 && rcode <= 5
}

fn is_dhcp(packet: &Packet) -> bool {
    if !packet.is_udp() {
        return false;
    }
    let payload = packet.transport_payload();
    if payload.len() < 240 {
        return false;
    }
    payload[236..240] == [0x63, 0x82, 0x53, 0x63]
}

fn is_ssh(packet: &Packet) -> bool {
    if !packet.is_tcp() {
        return false;
    }
    let payload = packet.transport_payload();
    payload.len() >= 7 && payload.starts_with(b"SSH-")
}

fn is_profinet_dcp(packet: &Packet) -> bool {
    let Some(eth) = &packet.ethernet else {
        return false;
    };
    if eth.ether_type != 0x8892 || eth.payload.len() < 4 {
        return false;
    }
    let frame_id = BigEndian::read_u16(&eth.payload[0..2]);
    (0xFEFC..=0xFEFF).contains(&frame_id)
}

fn is_lldp(packet: &Packet) -> bool {
    let Some(eth) = &packet.ethernet else {
        return false;
    };
    if eth.ether_type != 0x88CC || eth.payload.len() < 2 {
        return false;
    }
    let tlv_type = eth.payload[0] >> 1;
    tlv_type == 1
}

/// Declared in probe order: industrial signatures first, then general IT.
fn patterns() -> Vec<HeuristicPattern> {
    vec![
        HeuristicPattern { protocol: "Modbus TCP", confidence: 0.85, category: "Industrial", matcher: is_modbus_tcp },
        HeuristicPattern { protocol: "EtherNet/IP", confidence: 0.85, category: "Industrial", matcher: is_ethernet_ip },
        HeuristicPattern { protocol: "DNP3", confidence: 0.80, category: "Industrial", matcher: is_dnp3 },
        HeuristicPattern { protocol: "BACnet/IP", confidence: 0.80, category: "Industrial", matcher: is_bacnet },
        HeuristicPattern { protocol: "HTTP", confidence: 0.75, category: "IT", matcher: is_http },
        HeuristicPattern { protocol: "DNS", confidence: 0.85, category: "IT", matcher: is_dns },
        HeuristicPattern { protocol: "DHCP", confidence: 0.80, category: "IT", matcher: is_dhcp },
        HeuristicPattern { protocol: "SSH", confidence: 0.80, category: "IT", matcher: is_ssh },
        HeuristicPattern { protocol: "Profinet-DCP", confidence: 0.90, category: "Industrial", matcher: is_profinet_dcp },
        HeuristicPattern { protocol: "LLDP", confidence: 0.85, category: "Industrial", matcher: is_lldp },
    ]
}

pub struct HeuristicSet {
    patterns: Vec<HeuristicPattern>,
}

impl HeuristicSet {
    pub fn new() -> Self {
        Self { patterns: patterns() }
    }

    /// First matcher whose predicate accepts the packet wins.
    pub fn detect(&self, packet: &Packet) -> Option<DetectionResult> {
        for pattern in &self.patterns {
            if (pattern.matcher)(packet) {
                let mut details = std::collections::HashMap::new();
                details.insert("category".to_string(), pattern.category.to_string());
                details.insert("matcher".to_string(), pattern.protocol.to_string());
                return Some(DetectionResult {
                    protocol: pattern.protocol.to_string(),
                    confidence: pattern.confidence,
                    method: DetectionMethod::Heuristic,
                    details,
                });
            }
        }
        None
    }

    pub fn supported_protocols(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.protocol.to_string()).collect()
    }
}

impl Default for HeuristicSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{EthernetLayer, Packet, TcpLayer, UdpLayer};

    fn tcp_with_payload(payload: Vec<u8>) -> Packet {
        Packet {
            tcp: Some(TcpLayer {
                source_port: 1234,
                destination_port: 1,
                syn: false,
                ack: false,
                fin: false,
                rst: false,
                payload,
            }),
            ..Default::default()
        }
    }

    fn udp_with_payload(payload: Vec<u8>) -> Packet {
        Packet {
            udp: Some(UdpLayer {
                source_port: 1234,
                destination_port: 1,
                payload,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn modbus_read_holding_registers_matches() {
        let payload = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A];
        let set = HeuristicSet::new();
        let result = set.detect(&tcp_with_payload(payload)).unwrap();
        assert_eq!(result.protocol, "Modbus TCP");
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn modbus_rejects_nonzero_protocol_id() {
        let payload = vec![0x00, 0x01, 0x00, 0x01, 0x00, 0x06, 0x01, 0x03];
        assert!(!is_modbus_tcp(&tcp_with_payload(payload)));
    }

    #[test]
    fn modbus_rejects_function_code_zero() {
        let payload = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x00];
        assert!(!is_modbus_tcp(&tcp_with_payload(payload)));
    }

    #[test]
    fn http_get_matches() {
        let payload = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec();
        let set = HeuristicSet::new();
        let result = set.detect(&tcp_with_payload(payload)).unwrap();
        assert_eq!(result.protocol, "HTTP");
    }

    #[test]
    fn dns_query_matches() {
        let mut payload = vec![0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        payload.extend_from_slice(b"\x07example\x03com\x00\x00\x01\x00\x01");
        let set = HeuristicSet::new();
        let result = set.detect(&udp_with_payload(payload)).unwrap();
        assert_eq!(result.protocol, "DNS");
    }

    #[test]
    fn dns_rejects_opcode_three() {
        // flags = 0001 1000 0000 0000 -> opcode = 3
        let payload = vec![0x00, 0x00, 0x18, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!is_dns(&udp_with_payload(payload)));
    }

    #[test]
    fn lldp_matches_on_chassis_id_tlv() {
        let packet = Packet {
            ethernet: Some(EthernetLayer {
                source: [0; 6],
                destination: [0; 6],
                ether_type: 0x88CC,
                payload: vec![0x02, 0x07, 0x04, 0, 0, 0, 0, 0, 0],
            }),
            ..Default::default()
        };
        let set = HeuristicSet::new();
        let result = set.detect(&packet).unwrap();
        assert_eq!(result.protocol, "LLDP");
    }

    #[test]
    fn profinet_dcp_matches_frame_id_range() {
        let packet = Packet {
            ethernet: Some(EthernetLayer {
                source: [0; 6],
                destination: [0; 6],
                ether_type: 0x8892,
                payload: vec![0xFE, 0xFD, 0, 0],
            }),
            ..Default::default()
        };
        let set = HeuristicSet::new();
        let result = set.detect(&packet).unwrap();
        assert_eq!(result.protocol, "Profinet-DCP");
    }
}
