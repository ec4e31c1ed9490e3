use byteorder::{BigEndian, ByteOrder};

use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORT: u16 = 502;

fn function_name(code: u8) -> &'static str {
    match code {
        0x01 => "Read Coils",
        0x02 => "Read Discrete Inputs",
        0x03 => "Read Holding Registers",
        0x04 => "Read Input Registers",
        0x05 => "Write Single Coil",
        0x06 => "Write Single Register",
        0x0F => "Write Multiple Coils",
        0x10 => "Write Multiple Registers",
        0x16 => "Mask Write Register",
        0x17 => "Read/Write Multiple Registers",
        0x2B => "Encapsulated Interface Transport",
        _ => "Unknown Function",
    }
}

fn function_category(code: u8) -> &'static str {
    match code {
        1..=4 => "Read",
        5..=6 => "Write Single",
        15..=16 => "Write Multiple",
        23 => "Read/Write Multiple",
        43..=44 => "Encapsulated",
        129..=255 => "Exception",
        _ => "Other",
    }
}

/// Looks like a Modbus/TCP MBAP frame without committing to a full parse:
/// same structural checks as the heuristic matcher, used as the
/// content-fallback when the port doesn't match.
fn looks_like_modbus(payload: &[u8]) -> bool {
    if payload.len() < 7 {
        return false;
    }
    let protocol_id = BigEndian::read_u16(&payload[2..4]);
    let length = BigEndian::read_u16(&payload[4..6]);
    protocol_id == 0 && (1..=252).contains(&length)
}

pub struct ModbusAnalyzer;

impl DpiAnalyzer for ModbusAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_tcp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        if dst_port == PORT {
            return true;
        }
        looks_like_modbus(packet.transport_payload())
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 8 {
            return None;
        }

        let transaction_id = BigEndian::read_u16(&payload[0..2]);
        let protocol_id = BigEndian::read_u16(&payload[2..4]);
        let length = BigEndian::read_u16(&payload[4..6]);
        let unit_id = payload[6];
        let function_code = payload[7];

        if protocol_id != 0 || !(1..=252).contains(&length) {
            return None;
        }
        // 0 and 128 are not valid function codes in this analyzer's closed
        // range (1..=127 requests, 129..=255 exceptions).
        if function_code == 0 || function_code == 128 {
            return None;
        }

        let mut result = AnalysisResult::new("Modbus TCP", function_name(function_code), 0.95)
            .with_detail("transaction_id", transaction_id.to_string())
            .with_detail("unit_id", unit_id.to_string())
            .with_detail("function_code", function_code.to_string())
            .with_detail("category", function_category(function_code));

        let body = &payload[8..];
        match function_code {
            1..=4 if body.len() >= 4 => {
                let start_address = BigEndian::read_u16(&body[0..2]);
                let quantity = BigEndian::read_u16(&body[2..4]);
                result = result
                    .with_detail("start_address", start_address.to_string())
                    .with_detail("quantity", quantity.to_string());
            }
            5 | 6 if body.len() >= 4 => {
                let address = BigEndian::read_u16(&body[0..2]);
                let value = BigEndian::read_u16(&body[2..4]);
                result = result
                    .with_detail("address", address.to_string())
                    .with_detail("value", value.to_string());
            }
            15 | 16 if body.len() >= 5 => {
                let start_address = BigEndian::read_u16(&body[0..2]);
                let quantity = BigEndian::read_u16(&body[2..4]);
                let byte_count = body[4];
                result = result
                    .with_detail("start_address", start_address.to_string())
                    .with_detail("quantity", quantity.to_string())
                    .with_detail("byte_count", byte_count.to_string());
            }
            _ => {}
        }

        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "Modbus TCP"
    }

    fn confidence_threshold(&self) -> f32 {
        0.95
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
                destination_port: 502,
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
    fn parses_read_holding_registers_request() {
        let payload = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A];
        let analyzer = ModbusAnalyzer;
        let result = analyzer.analyze(&packet(payload)).unwrap();
        assert_eq!(result.protocol, "Modbus TCP");
        assert_eq!(result.subprotocol, "Read Holding Registers");
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.details.get("start_address").unwrap(), "0");
        assert_eq!(result.details.get("quantity").unwrap(), "10");
        assert_eq!(result.details.get("unit_id").unwrap(), "1");
    }

    #[test]
    fn rejects_nonzero_protocol_id() {
        let payload = vec![0x00, 0x01, 0x00, 0x01, 0x00, 0x06, 0x01, 0x03, 0, 0, 0, 0];
        let analyzer = ModbusAnalyzer;
        assert!(analyzer.analyze(&packet(payload)).is_none());
    }

    #[test]
    fn rejects_length_zero_and_253() {
        let analyzer = ModbusAnalyzer;
        let zero_len = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x03];
        assert!(analyzer.analyze(&packet(zero_len)).is_none());
        let mut too_long = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x03];
        byteorder::BigEndian::write_u16(&mut too_long[4..6], 253);
        assert!(analyzer.analyze(&packet(too_long)).is_none());
    }

    #[test]
    fn rejects_function_code_zero_and_128() {
        let analyzer = ModbusAnalyzer;
        let fc0 = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x00];
        assert!(analyzer.analyze(&packet(fc0)).is_none());
        let fc128 = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x80];
        assert!(analyzer.analyze(&packet(fc128)).is_none());
    }
}
