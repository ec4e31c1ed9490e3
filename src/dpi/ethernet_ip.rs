use byteorder::{ByteOrder, LittleEndian};

use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORT: u16 = 44818;

fn command_name(command: u16) -> Option<&'static str> {
    match command {
        0x0063 => Some("ListServices"),
        0x0064 => Some("ListIdentity"),
        0x0065 => Some("RegisterSession"),
        0x0066 => Some("UnregisterSession"),
        0x006F => Some("SendRRData"),
        0x0070 => Some("SendUnitData"),
        _ => None,
    }
}

fn service_name(service: u8) -> &'static str {
    match service {
        0x01 => "Get_Attributes_All",
        0x0E => "Get_Attribute_Single",
        0x10 => "Set_Attribute_Single",
        0x52 => "Multiple_Service_Packet",
        0x54 => "Read_Tag",
        0x55 => "Write_Tag",
        0x4B => "Execute_PCCC",
        _ => "Unknown_Service",
    }
}

fn class_name(class_id: u16) -> &'static str {
    match class_id {
        1 => "Identity",
        2 => "Message_Router",
        4 => "Assembly",
        5 => "Connection",
        6 => "Connection_Manager",
        0x20 => "Parameter",
        0x6B => "Symbol",
        0x6C => "Template",
        _ => "Unknown_Class",
    }
}

/// Walks a CIP EPATH, decoding the 0x20/0x24/0x30 single-byte-value
/// segment forms (class/instance/attribute). Unrecognised segment types
/// stop the walk rather than erroring.
fn decode_epath(path: &[u8]) -> (Option<u16>, Option<u8>, Option<u8>) {
    let (mut class, mut instance, mut attribute) = (None, None, None);
    let mut i = 0;
    while i + 1 < path.len() {
        match path[i] {
            0x20 => {
                class = Some(path[i + 1] as u16);
                i += 2;
            }
            0x24 => {
                instance = Some(path[i + 1]);
                i += 2;
            }
            0x30 => {
                attribute = Some(path[i + 1]);
                i += 2;
            }
            _ => break,
        }
    }
    (class, instance, attribute)
}

fn looks_like_enip(payload: &[u8]) -> bool {
    if payload.len() < 24 {
        return false;
    }
    let command = LittleEndian::read_u16(&payload[0..2]);
    command_name(command).is_some()
}

pub struct EtherNetIpAnalyzer;

impl DpiAnalyzer for EtherNetIpAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_tcp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        dst_port == PORT || looks_like_enip(packet.transport_payload())
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 24 {
            return None;
        }

        let command = LittleEndian::read_u16(&payload[0..2]);
        let length = LittleEndian::read_u16(&payload[2..4]);
        let session_handle = LittleEndian::read_u32(&payload[4..8]);
        let status = LittleEndian::read_u32(&payload[8..12]);

        let name = command_name(command)?;
        if length as usize > (u16::MAX as usize) - 24 {
            return None;
        }

        let mut result = AnalysisResult::new("EtherNet/IP", name, 0.95)
            .with_detail("command", format!("0x{command:04X}"))
            .with_detail("session_handle", session_handle.to_string())
            .with_detail("status", status.to_string());

        let cip_offset = match command {
            0x006F | 0x0070 => 24 + 6,
            _ => 24,
        };

        if payload.len() > cip_offset {
            let cip = &payload[cip_offset..];
            let service = cip[0];
            result = result
                .with_detail("cip_service", service_name(service))
                .with_detail("cip_service_code", format!("0x{service:02X}"));

            if cip.len() > 1 {
                let (class, instance, attribute) = decode_epath(&cip[1..]);
                if let Some(class_id) = class {
                    result = result
                        .with_detail("cip_class", class_name(class_id))
                        .with_detail("cip_class_id", class_id.to_string());
                }
                if let Some(instance_id) = instance {
                    result = result.with_detail("cip_instance", instance_id.to_string());
                }
                if let Some(attribute_id) = attribute {
                    result = result.with_detail("cip_attribute", attribute_id.to_string());
                }
            }
        }

        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "EtherNet/IP"
    }

    fn confidence_threshold(&self) -> f32 {
        0.95
    }
}
