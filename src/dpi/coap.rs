use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORT: u16 = 5683;

fn message_type_name(msg_type: u8) -> &'static str {
    match msg_type {
        0 => "Confirmable",
        1 => "Non-confirmable",
        2 => "Acknowledgement",
        3 => "Reset",
        _ => "Unknown",
    }
}

fn request_method_name(code: u8) -> Option<&'static str> {
    match code {
        1 => Some("GET"),
        2 => Some("POST"),
        3 => Some("PUT"),
        4 => Some("DELETE"),
        _ => None,
    }
}

fn response_code_name(code: u8) -> Option<&'static str> {
    match code {
        65 => Some("2.01 Created"),
        66 => Some("2.02 Deleted"),
        67 => Some("2.03 Valid"),
        68 => Some("2.04 Changed"),
        69 => Some("2.05 Content"),
        128 => Some("4.00 Bad Request"),
        129 => Some("4.01 Unauthorized"),
        132 => Some("4.04 Not Found"),
        133 => Some("4.05 Method Not Allowed"),
        160 => Some("5.00 Internal Server Error"),
        163 => Some("5.03 Service Unavailable"),
        65..=165 => Some("Response"),
        _ => None,
    }
}

/// Walks CoAP options, applying the delta/length extended-encoding rule
/// (13 adds an extra byte offset by 13, 14 adds two bytes offset by 269),
/// stopping at the 0xFF payload marker.
fn count_options(mut data: &[u8]) -> usize {
    let mut count = 0;
    while !data.is_empty() {
        if data[0] == 0xFF {
            break;
        }
        let delta_nibble = (data[0] >> 4) & 0x0F;
        let length_nibble = data[0] & 0x0F;
        let mut cursor = 1;

        let extra = |nibble: u8, data: &[u8], cursor: &mut usize| -> Option<usize> {
            match nibble {
                13 => {
                    let v = *data.get(*cursor)? as usize + 13;
                    *cursor += 1;
                    Some(v)
                }
                14 => {
                    if data.len() < *cursor + 2 {
                        return None;
                    }
                    let v = u16::from_be_bytes([data[*cursor], data[*cursor + 1]]) as usize + 269;
                    *cursor += 2;
                    Some(v)
                }
                15 => None,
                n => Some(n as usize),
            }
        };

        let Some(_delta) = extra(delta_nibble, data, &mut cursor) else {
            break;
        };
        let Some(length) = extra(length_nibble, data, &mut cursor) else {
            break;
        };

        if data.len() < cursor + length {
            break;
        }
        data = &data[cursor + length..];
        count += 1;
    }
    count
}

pub struct CoapAnalyzer;

impl DpiAnalyzer for CoapAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_udp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        dst_port == PORT
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 4 {
            return None;
        }

        let version = (payload[0] >> 6) & 0x03;
        if version != 1 {
            return None;
        }
        let msg_type = (payload[0] >> 4) & 0x03;
        let token_length = payload[0] & 0x0F;
        if token_length > 8 {
            return None;
        }

        let code = payload[1];
        let subprotocol = request_method_name(code)
            .or_else(|| response_code_name(code))
            .unwrap_or("Unknown");

        let token_start = 4;
        let token_end = token_start + token_length as usize;
        if payload.len() < token_end {
            return None;
        }
        let option_count = count_options(&payload[token_end..]);

        let result = AnalysisResult::new("CoAP", subprotocol, 0.90)
            .with_detail("message_type", message_type_name(msg_type))
            .with_detail("token_length", token_length.to_string())
            .with_detail("code", format!("0x{code:02X}"))
            .with_detail("option_count", option_count.to_string());
        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "CoAP"
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
                destination_port: 5683,
                payload,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn parses_confirmable_get() {
        // Ver=1, Type=0 (Confirmable), TKL=0 -> byte0 = 0b01_00_0000 = 0x40
        let payload = vec![0x40, 0x01, 0x00, 0x01];
        let analyzer = CoapAnalyzer;
        let result = analyzer.analyze(&packet(payload)).unwrap();
        assert_eq!(result.subprotocol, "GET");
        assert_eq!(result.details.get("message_type").unwrap(), "Confirmable");
    }

    #[test]
    fn rejects_wrong_version() {
        let analyzer = CoapAnalyzer;
        let payload = vec![0x00, 0x01, 0x00, 0x01];
        assert!(analyzer.analyze(&packet(payload)).is_none());
    }
}
