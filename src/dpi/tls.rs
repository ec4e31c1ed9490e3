use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORTS: &[u16] = &[443, 993, 995, 636, 8443, 9443];

fn record_type_name(record_type: u8) -> &'static str {
    match record_type {
        0x14 => "Change Cipher Spec",
        0x15 => "Alert",
        0x16 => "Handshake",
        0x17 => "Application Data",
        _ => "Unknown Record",
    }
}

pub struct TlsAnalyzer;

impl DpiAnalyzer for TlsAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_tcp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        if PORTS.contains(&dst_port) {
            return true;
        }
        let payload = packet.transport_payload();
        payload.len() >= 2 && (0x14..=0x17).contains(&payload[0]) && payload[1] == 0x03
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 2 || !(0x14..=0x17).contains(&payload[0]) || payload[1] != 0x03 {
            return None;
        }

        let record_type = payload[0];
        let result = AnalysisResult::new("TLS", record_type_name(record_type), 0.85)
            .with_detail("record_type", format!("0x{record_type:02X}"))
            .with_detail("major_version", "3".to_string());
        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "TLS"
    }

    fn confidence_threshold(&self) -> f32 {
        0.85
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::TcpLayer;

    fn packet(payload: Vec<u8>) -> Packet {
        Packet {
            tcp: Some(TcpLayer {
                source_port: 40000,
                destination_port: 443,
                syn: false,
                ack: false,
                fin: false,
                rst: false,
                payload,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn detects_handshake_record() {
        let analyzer = TlsAnalyzer;
        let result = analyzer.analyze(&packet(vec![0x16, 0x03, 0x03, 0x00, 0x10])).unwrap();
        assert_eq!(result.subprotocol, "Handshake");
    }

    #[test]
    fn rejects_wrong_major_version() {
        let analyzer = TlsAnalyzer;
        assert!(analyzer.analyze(&packet(vec![0x16, 0x02, 0x03])).is_none());
    }

    #[test]
    fn detects_application_data_record() {
        let analyzer = TlsAnalyzer;
        let result = analyzer.analyze(&packet(vec![0x17, 0x03, 0x03, 0x00, 0x10])).unwrap();
        assert_eq!(result.subprotocol, "Application Data");
    }

    #[test]
    fn rejects_record_type_outside_known_range() {
        let analyzer = TlsAnalyzer;
        assert!(analyzer.analyze(&packet(vec![0x18, 0x03, 0x03])).is_none());
    }
}
