use crate::dpi::DpiAnalyzer;
use crate::packet::Packet;
use crate::types::AnalysisResult;

const PORT: u16 = 47808;

fn bvlc_function_name(function: u8) -> &'static str {
    match function {
        0x00 => "BVLC-Result",
        0x01 => "Write-Broadcast-Distribution-Table",
        0x02 => "Read-Broadcast-Distribution-Table",
        0x03 => "Read-Broadcast-Distribution-Table-Ack",
        0x04 => "Forwarded-NPDU",
        0x05 => "Register-Foreign-Device",
        0x06 => "Read-Foreign-Device-Table",
        0x07 => "Read-Foreign-Device-Table-Ack",
        0x08 => "Delete-Foreign-Device-Table-Entry",
        0x09 => "Distribute-Broadcast-To-Network",
        0x0A => "Original-Unicast-NPDU",
        0x0B => "Original-Broadcast-NPDU",
        _ => "Unknown-BVLC-Function",
    }
}

pub struct BacnetAnalyzer;

impl DpiAnalyzer for BacnetAnalyzer {
    fn can_analyze(&self, packet: &Packet) -> bool {
        if !packet.is_udp() {
            return false;
        }
        let (_, dst_port) = match packet.transport_flow() {
            Some(flow) => flow,
            None => return false,
        };
        if dst_port == PORT {
            return true;
        }
        packet.transport_payload().first() == Some(&0x81)
    }

    fn analyze(&self, packet: &Packet) -> Option<AnalysisResult> {
        let payload = packet.transport_payload();
        if payload.len() < 4 || payload[0] != 0x81 {
            return None;
        }
        let function = payload[1];
        if !(0x00..=0x0B).contains(&function) {
            return None;
        }

        let result = AnalysisResult::new("BACnet/IP", bvlc_function_name(function), 0.90)
            .with_detail("bvlc_function", format!("0x{function:02X}"));
        Some(result)
    }

    fn protocol_name(&self) -> &'static str {
        "BACnet/IP"
    }

    fn confidence_threshold(&self) -> f32 {
        0.90
    }
}
