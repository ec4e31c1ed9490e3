use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORT: u16 = 20000;
const START_BYTES: [u8; 2] = [0x05, 0x64];

fn control_description(control: u8) -> &'static str {
    let dir = control & 0x80 != 0;
    let prm = control & 0x40 != 0;
    match (dir, prm) {
        (true, true) => "Request from Master",
        (false, true) => "Unsolicited Response",
        (false, false) => "Response from Outstation",
        (true, false) => "Reserved",
    }
}

fn function_category(code: u8) -> &'static str {
    match code {
        0x00..=0x06 => "Control",
        0x07..=0x0C => "Freeze",
        0x0D..=0x12 => "App Control",
        0x13..=0x17 => "Configuration",
        0x18..=0x1E => "File Transfer",
        0x81 => "Response",
        0x82 => "Unsolicited",
        _ => "Other",
    }
}

fn decode_iin(flags: u16) -> Vec<&'static str> {
    const NAMES: &[(u16, &str)] = &[
        (0x0001, "ALL_STATIONS"),
        (0x0002, "CLASS_1_EVENTS"),
        (0x0004, "CLASS_2_EVENTS"),
        (0x0008, "CLASS_3_EVENTS"),
        (0x0010, "NEED_TIME"),
        (0x0020, "LOCAL_CONTROL"),
        (0x0040, "DEVICE_TROUBLE"),
        (0x0080, "DEVICE_RESTART"),
    ];
    NAMES
        .iter()
        .filter(|&&(bit, _)| flags & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}

/// Advisory object-header parse: only the address/count qualifier forms
/// are decoded, anything else stops the walk.
fn decode_object_header(body: &[u8]) -> Option<String> {
    if body.len() < 3 {
        return None;
    }
    let qualifier = body[2];
    match qualifier & 0x0F {
        0x00 | 0x01 => {
            if body.len() < 5 {
                return None;
            }
            let start = LittleEndian::read_u16(&body[3..5]);
            Some(format!("Start: {start}"))
        }
        0x07 | 0x08 => {
            if body.len() < 4 {
                return None;
            }
            Some(format!("Count: {}", body[3]))
        }
        _ => None,
    }
}

fn looks_like_dnp3(payload: &[u8]) -> bool {
    payload.len() >= 10 && payload[0..2] == START_BYTES && payload[2] >= 5
}

pub struct Dnp3Analyzer;

impl DpiAnalyzer for Dnp3Analyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_tcp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        dst_port == PORT || looks_like_dnp3(packet.transport_payload())
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 10 || payload[0..2] != START_BYTES {
            return None;
        }

        let length = payload[2];
        if (length as usize) < 5 || (length as usize) > payload.len().saturating_sub(3) {
            return None;
        }

        let control = payload[3];
        let destination = BigEndian::read_u16(&payload[4..6]);
        let source = BigEndian::read_u16(&payload[6..8]);

        let mut result = AnalysisResult::new("DNP3", "Data Link Frame", 0.90)
            .with_detail("control", control_description(control))
            .with_detail("destination", destination.to_string())
            .with_detail("source", source.to_string());

        if payload.len() > 11 {
            let app_control = payload[10];
            let function_code = payload[11];
            result = result
                .with_detail("subprotocol", function_category(function_code))
                .with_detail("app_control", app_control.to_string())
                .with_detail("function_code", format!("0x{function_code:02X}"));
            result.subprotocol = function_category(function_code).to_string();

            if matches!(function_code, 0x81 | 0x82) && payload.len() >= 14 {
                let iin = BigEndian::read_u16(&payload[12..14]);
                let flags = decode_iin(iin).join(",");
                result = result.with_detail("iin_flags", flags);

                if let Some(object_header) = decode_object_header(&payload[14..]) {
                    result = result.with_detail("object_header", object_header);
                }
            }
        }

        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "DNP3"
    }

    fn confidence_threshold(&self) -> f32 {
        0.90
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
                destination_port: 20000,
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
    fn parses_data_link_header() {
        let mut payload = vec![0x05, 0x64, 0x05, 0xC0, 0x00, 0x01, 0x00, 0x02, 0, 0];
        payload.extend_from_slice(&[0, 0]);
        let analyzer = Dnp3Analyzer;
        let result = analyzer.analyze(&packet(payload)).unwrap();
        assert_eq!(result.protocol, "DNP3");
        assert_eq!(result.details.get("control").unwrap(), "Request from Master");
    }

    #[test]
    fn rejects_bad_start_bytes() {
        let payload = vec![0x00, 0x00, 0x05, 0xC0, 0, 0, 0, 0, 0, 0];
        let analyzer = Dnp3Analyzer;
        assert!(analyzer.analyze(&packet(payload)).is_none());
    }

    #[test]
    fn decodes_unsolicited_response_iin_flags() {
        let mut payload = vec![0x05, 0x64, 0x0B, 0x44, 0, 1, 0, 2, 0, 0];
        // application layer: control byte, function code 0x82, IIN flags
        payload.extend_from_slice(&[0xC0, 0x82, 0x00, 0x10]);
        let analyzer = Dnp3Analyzer;
        let result = analyzer.analyze(&packet(payload)).unwrap();
        assert_eq!(result.details.get("subprotocol").unwrap(), "Unsolicited");
        assert!(result.details.get("iin_flags").unwrap().contains("NEED_TIME"));
    }
}
