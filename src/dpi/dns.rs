use byteorder::{BigEndian, ByteOrder};

use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORTS: &[u16] = &[53, 5353];

pub struct DnsAnalyzer;

impl DpiAnalyzer for DnsAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_udp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        if PORTS.contains(&dst_port) {
            return true;
        }
        packet.transport_payload().len() >= 12
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 12 {
            return None;
        }

        let transaction_id = BigEndian::read_u16(&payload[0..2]);
        let flags = BigEndian::read_u16(&payload[2..4]);
        let qr = (flags >> 15) & 0x01;
        let opcode = (flags >> 11) & 0x0F;
        let rcode = flags & 0x0F;

        if opcode > 2 || rcode > 5 {
            return None;
        }

        let question_count = BigEndian::read_u16(&payload[4..6]);
        let answer_count = BigEndian::read_u16(&payload[6..8]);
        let subprotocol = if qr == 0 { "Query" } else { "Response" };

        let result = AnalysisResult::new("DNS", subprotocol, 0.90)
            .with_detail("transaction_id", format!("0x{transaction_id:04X}"))
            .with_detail("query_count", question_count.to_string())
            .with_detail("answer_count", answer_count.to_string())
            .with_detail("opcode", opcode.to_string())
            .with_detail("rcode", rcode.to_string());
        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "DNS"
    }

    fn confidence_threshold(&self) -> f32 {
        0.90
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::UdpLayer;

    fn packet(payload: Vec<u8>) -> Packet {
        Packet {
            udp: Some(UdpLayer {
                source_port: 40000,
                destination_port: 53,
                payload,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn parses_example_com_query() {
        let mut payload = vec![0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        payload.extend_from_slice(b"\x07example\x03com\x00\x00\x01\x00\x01");
        let analyzer = DnsAnalyzer;
        let result = analyzer.analyze(&packet(payload)).unwrap();
        assert_eq!(result.subprotocol, "Query");
        assert_eq!(result.details.get("transaction_id").unwrap(), "0x1234");
        assert_eq!(result.details.get("query_count").unwrap(), "1");
    }

    #[test]
    fn rejects_opcode_three_and_rcode_six() {
        let analyzer = DnsAnalyzer;
        let opcode3 = vec![0, 0, 0x18, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(analyzer.analyze(&packet(opcode3)).is_none());
        let rcode6 = vec![0, 0, 0x00, 0x06, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(analyzer.analyze(&packet(rcode6)).is_none());
    }
}
