//! Decoded packet layers consumed by the detector.
//!
//! A capture reader hands the core a [`Packet`] with typed, already-decoded
//! layers instead of a raw byte slice. Decoding itself lives here, built on
//! top of `etherparse`, so that `detector`/`dpi`/`heuristics` never see raw
//! bytes below the layer they care about.

use etherparse::{Ethernet2Header, Icmpv4Header, Icmpv6Header, Ipv4Header, Ipv6Header, TcpHeader, UdpHeader};

#[derive(Debug, Clone)]
pub struct EthernetLayer {
    pub source: [u8; 6],
    pub destination: [u8; 6],
    pub ether_type: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Ipv4Layer {
    pub source: [u8; 4],
    pub destination: [u8; 4],
    pub protocol: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Ipv6Layer {
    pub source: [u8; 16],
    pub destination: [u8; 16],
    pub next_header: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    Request,
    Reply,
    Other(u16),
}

#[derive(Debug, Clone)]
pub struct ArpLayer {
    pub operation: ArpOperation,
    pub sender_hw: [u8; 6],
    pub sender_proto: [u8; 4],
    pub target_hw: [u8; 6],
    pub target_proto: [u8; 4],
}

#[derive(Debug, Clone)]
pub struct TcpLayer {
    pub source_port: u16,
    pub destination_port: u16,
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UdpLayer {
    pub source_port: u16,
    pub destination_port: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct Icmpv4Layer {
    pub icmp_type: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct Icmpv6Layer {
    pub icmp_type: u8,
}

/// A packet decoded into the layer stack the detector reasons about.
///
/// Read-only during detection: nothing in `dpi`/`heuristics`/`detector`
/// mutates a `Packet` once it reaches them.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    pub ethernet: Option<EthernetLayer>,
    pub ipv4: Option<Ipv4Layer>,
    pub ipv6: Option<Ipv6Layer>,
    pub arp: Option<ArpLayer>,
    pub tcp: Option<TcpLayer>,
    pub udp: Option<UdpLayer>,
    pub icmpv4: Option<Icmpv4Layer>,
    pub icmpv6: Option<Icmpv6Layer>,
}

impl Packet {
    /// Decode a raw Ethernet frame into a layered `Packet`.
    ///
    /// Unsupported or malformed layers are simply absent rather than
    /// surfaced as an error — the detector only ever asks "is this layer
    /// present", never "why isn't it".
    pub fn from_ethernet_frame(data: &[u8]) -> Option<Packet> {
        let (eth, rest) = Ethernet2Header::from_slice(data).ok()?;
        let mut packet = Packet {
            ethernet: Some(EthernetLayer {
                source: eth.source,
                destination: eth.destination,
                ether_type: eth.ether_type.0,
                payload: rest.to_vec(),
            }),
            ..Default::default()
        };

        match eth.ether_type.0 {
            0x0800 => packet.decode_ipv4(rest),
            0x86DD => packet.decode_ipv6(rest),
            0x0806 => packet.decode_arp(rest),
            _ => {}
        }

        Some(packet)
    }

    fn decode_ipv4(&mut self, data: &[u8]) {
        let Ok((header, rest)) = Ipv4Header::from_slice(data) else {
            return;
        };
        self.decode_transport(header.protocol.0, rest);
        self.ipv4 = Some(Ipv4Layer {
            source: header.source,
            destination: header.destination,
            protocol: header.protocol.0,
            payload: rest.to_vec(),
        });
    }

    fn decode_ipv6(&mut self, data: &[u8]) {
        let Ok((header, rest)) = Ipv6Header::from_slice(data) else {
            return;
        };
        self.decode_transport(header.next_header.0, rest);
        self.ipv6 = Some(Ipv6Layer {
            source: header.source,
            destination: header.destination,
            next_header: header.next_header.0,
            payload: rest.to_vec(),
        });
    }

    fn decode_transport(&mut self, protocol: u8, data: &[u8]) {
        match protocol {
            6 => {
                if let Ok((header, rest)) = TcpHeader::from_slice(data) {
                    self.tcp = Some(TcpLayer {
                        source_port: header.source_port,
                        destination_port: header.destination_port,
                        syn: header.syn,
                        ack: header.ack,
                        fin: header.fin,
                        rst: header.rst,
                        payload: rest.to_vec(),
                    });
                }
            }
            17 => {
                if let Ok((header, rest)) = UdpHeader::from_slice(data) {
                    self.udp = Some(UdpLayer {
                        source_port: header.source_port,
                        destination_port: header.destination_port,
                        payload: rest.to_vec(),
                    });
                }
            }
            1 => {
                if let Ok((header, _rest)) = Icmpv4Header::from_slice(data) {
                    self.icmpv4 = Some(Icmpv4Layer {
                        icmp_type: header.icmp_type.to_bytes()[0],
                    });
                }
            }
            58 => {
                if let Ok((header, _rest)) = Icmpv6Header::from_slice(data) {
                    self.icmpv6 = Some(Icmpv6Layer {
                        icmp_type: header.icmp_type.to_bytes()[0],
                    });
                }
            }
            _ => {}
        }
    }

    /// ARP has no general "slice" support in the header decoder this crate
    /// uses, so the fixed 28-byte Ethernet/IPv4 ARP packet is parsed by hand.
    fn decode_arp(&mut self, data: &[u8]) {
        if data.len() < 28 {
            return;
        }
        let operation = match u16::from_be_bytes([data[6], data[7]]) {
            1 => ArpOperation::Request,
            2 => ArpOperation::Reply,
            other => ArpOperation::Other(other),
        };
        self.arp = Some(ArpLayer {
            operation,
            sender_hw: data[8..14].try_into().unwrap(),
            sender_proto: data[14..18].try_into().unwrap(),
            target_hw: data[18..24].try_into().unwrap(),
            target_proto: data[24..28].try_into().unwrap(),
        });
    }

    /// Ordered layer-type names present in this packet's stack, used to
    /// build the detection cache flow key.
    pub fn layer_stack(&self) -> Vec<&'static str> {
        let mut layers = Vec::with_capacity(4);
        if self.ethernet.is_some() {
            layers.push("Ethernet");
        }
        if self.ipv4.is_some() {
            layers.push("IPv4");
        }
        if self.ipv6.is_some() {
            layers.push("IPv6");
        }
        if self.arp.is_some() {
            layers.push("ARP");
        }
        if self.tcp.is_some() {
            layers.push("TCP");
        }
        if self.udp.is_some() {
            layers.push("UDP");
        }
        if self.icmpv4.is_some() {
            layers.push("ICMPv4");
        }
        if self.icmpv6.is_some() {
            layers.push("ICMPv6");
        }
        layers
    }

    /// Integer-valued `(src, dst)` transport endpoints, required for
    /// cache-key construction. `None` when no transport layer is present.
    pub fn transport_flow(&self) -> Option<(u16, u16)> {
        if let Some(tcp) = &self.tcp {
            return Some((tcp.source_port, tcp.destination_port));
        }
        if let Some(udp) = &self.udp {
            return Some((udp.source_port, udp.destination_port));
        }
        None
    }

    /// `true` when this packet carries a TCP segment.
    pub fn is_tcp(&self) -> bool {
        self.tcp.is_some()
    }

    /// `true` when this packet carries a UDP datagram.
    pub fn is_udp(&self) -> bool {
        self.udp.is_some()
    }

    /// Transport-layer payload — the bytes a port or heuristic matcher
    /// inspects. Empty for non-TCP/UDP packets.
    pub fn transport_payload(&self) -> &[u8] {
        if let Some(tcp) = &self.tcp {
            return &tcp.payload;
        }
        if let Some(udp) = &self.udp {
            return &udp.payload;
        }
        &[]
    }

    /// Highest-layer payload available, tagged with the layer it came
    /// from: transport (TCP/UDP) preferred, else network (IPv4/IPv6), else
    /// the raw Ethernet payload. Used to build the DPI cache key.
    pub fn highest_layer_payload(&self) -> (&[u8], &'static str) {
        if let Some(tcp) = &self.tcp {
            return (&tcp.payload, "transport");
        }
        if let Some(udp) = &self.udp {
            return (&udp.payload, "transport");
        }
        if let Some(ipv4) = &self.ipv4 {
            return (&ipv4.payload, "network");
        }
        if let Some(ipv6) = &self.ipv6 {
            return (&ipv6.payload, "network");
        }
        if let Some(eth) = &self.ethernet {
            return (&eth.payload, "ethernet");
        }
        (&[], "none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_packet(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder = etherparse::PacketBuilder::ethernet2([0; 6], [1; 6])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(src_port, dst_port, 0, 1024);
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    #[test]
    fn decodes_tcp_over_ipv4() {
        let raw = tcp_packet(12345, 502, b"hello");
        let packet = Packet::from_ethernet_frame(&raw).expect("decode");
        assert!(packet.ethernet.is_some());
        assert!(packet.ipv4.is_some());
        assert_eq!(packet.transport_flow(), Some((12345, 502)));
        assert_eq!(packet.transport_payload(), b"hello");
    }

    #[test]
    fn layer_stack_orders_ethernet_first() {
        let raw = tcp_packet(1, 2, b"");
        let packet = Packet::from_ethernet_frame(&raw).expect("decode");
        assert_eq!(packet.layer_stack(), vec!["Ethernet", "IPv4", "TCP"]);
    }

    #[test]
    fn too_short_frame_fails_to_decode() {
        assert!(Packet::from_ethernet_frame(&[0u8; 4]).is_none());
    }
}
