//! Static transport-port -> protocol-candidate dictionary.
//!
//! Population happens once at construction (`PortDictionary::new`): a fixed
//! table of domain data rather than trait objects.

use std::collections::HashMap;

use crate::packet::Packet;
use crate::types::{DetectionMethod, DetectionResult, PortMapping};

/// `(port, protocol, confidence, description, category)`.
///
/// Where a port legitimately carries more than one well-known service
/// (5000, 8080), the earlier tuple is the higher-priority mapping: lookup
/// always uses element 0 of the resulting `Vec<PortMapping>`, so insertion
/// order here is priority order.
const TCP_PORTS: &[(u16, &str, f32, &str, &str)] = &[
    // --- Industrial / OT ---
    (502, "Modbus TCP", 0.9, "Modbus/TCP industrial control", "Industrial"),
    (44818, "EtherNet/IP", 0.9, "EtherNet/IP + CIP", "Industrial"),
    (20000, "DNP3", 0.85, "DNP3 over TCP", "Industrial"),
    (102, "S7Comm", 0.85, "Siemens S7 ISO-on-TCP", "Industrial"),
    (4840, "OPC-UA", 0.8, "OPC Unified Architecture", "Industrial"),
    (789, "Red Lion Crimson", 0.6, "Red Lion Crimson v3", "Industrial"),
    (9600, "OMRON FINS", 0.6, "OMRON FINS over TCP", "Industrial"),
    // --- Core IT / remote access ---
    (21, "FTP", 0.8, "File Transfer Protocol control", "IT"),
    (22, "SSH", 0.85, "Secure Shell", "IT"),
    (23, "Telnet", 0.8, "Telnet remote login", "IT"),
    (25, "SMTP", 0.8, "Simple Mail Transfer Protocol", "IT"),
    (80, "HTTP", 0.7, "Hypertext Transfer Protocol", "IT"),
    (110, "POP3", 0.8, "Post Office Protocol v3", "IT"),
    (143, "IMAP", 0.8, "Internet Message Access Protocol", "IT"),
    (389, "LDAP", 0.8, "Lightweight Directory Access Protocol", "IT"),
    (443, "HTTPS", 0.75, "HTTP over TLS", "IT"),
    (445, "SMB", 0.8, "Server Message Block", "IT"),
    (465, "SMTPS", 0.8, "SMTP over TLS", "IT"),
    (587, "SMTP Submission", 0.75, "SMTP mail submission", "IT"),
    (636, "LDAPS", 0.8, "LDAP over TLS", "IT"),
    (993, "IMAPS", 0.8, "IMAP over TLS", "IT"),
    (995, "POP3S", 0.8, "POP3 over TLS", "IT"),
    (3389, "RDP", 0.85, "Remote Desktop Protocol", "IT"),
    (5900, "VNC", 0.8, "Virtual Network Computing", "IT"),
    (139, "NetBIOS", 0.7, "NetBIOS Session Service", "IT"),
    (88, "Kerberos", 0.75, "Kerberos authentication", "IT"),
    // --- Database ---
    (1433, "MSSQL", 0.85, "Microsoft SQL Server", "Database"),
    (1521, "Oracle", 0.85, "Oracle TNS Listener", "Database"),
    (3306, "MySQL", 0.85, "MySQL/MariaDB", "Database"),
    (5432, "PostgreSQL", 0.85, "PostgreSQL", "Database"),
    (6379, "Redis", 0.85, "Redis key-value store", "Database"),
    (9042, "Cassandra", 0.8, "Apache Cassandra CQL", "Database"),
    (9200, "Elasticsearch", 0.8, "Elasticsearch REST API", "Database"),
    (5984, "CouchDB", 0.75, "Apache CouchDB", "Database"),
    (27017, "MongoDB", 0.85, "MongoDB", "Database"),
    // --- Messaging ---
    (1883, "MQTT", 0.85, "MQ Telemetry Transport", "Messaging"),
    (8883, "MQTT-TLS", 0.85, "MQTT over TLS", "Messaging"),
    (5672, "AMQP", 0.8, "Advanced Message Queuing Protocol / RabbitMQ", "Messaging"),
    (9092, "Kafka", 0.8, "Apache Kafka broker", "Messaging"),
    (61616, "ActiveMQ", 0.75, "Apache ActiveMQ OpenWire", "Messaging"),
    // --- Containers / orchestration ---
    (2375, "Docker", 0.75, "Docker Engine API (plaintext)", "Container"),
    (2376, "Docker-TLS", 0.8, "Docker Engine API (TLS)", "Container"),
    (6443, "Kubernetes API", 0.8, "Kubernetes API server", "Container"),
    (2379, "etcd", 0.75, "etcd client port", "Container"),
    (2380, "etcd-peer", 0.75, "etcd peer port", "Container"),
    // --- VPN / tunnelling ---
    (1723, "PPTP", 0.75, "Point-to-Point Tunneling Protocol", "VPN"),
    // --- Media / signalling ---
    (554, "RTSP", 0.8, "Real Time Streaming Protocol", "Media"),
    (5060, "SIP", 0.75, "Session Initiation Protocol", "Media"),
    // --- Developer / HTTP-alt ---
    (5000, "Flask Dev", 0.5, "Flask/Werkzeug development server", "Development"),
    (5000, "Docker Registry", 0.5, "Docker Registry v2 API", "Development"),
    (8080, "HTTP-Alt", 0.75, "Alternate HTTP port", "Development"),
    (8080, "Jenkins", 0.5, "Jenkins CI web UI", "Development"),
    (8000, "HTTP-Alt", 0.55, "Common development HTTP port", "Development"),
    (8008, "HTTP-Alt", 0.5, "Alternate HTTP port", "Development"),
    (3000, "Node.js Dev", 0.55, "Common Node.js/React development port", "Development"),
    (4200, "Angular Dev", 0.5, "Angular CLI development server", "Development"),
    (9000, "HTTP-Alt", 0.5, "Alternate HTTP / PHP-FPM", "Development"),
    (9090, "Prometheus", 0.6, "Prometheus web UI", "Development"),
    (8081, "Webpack Dev", 0.45, "Webpack dev server proxy port", "Development"),
    (3690, "SVN", 0.75, "Subversion repository access", "Development"),
    (9418, "Git", 0.75, "Git native protocol", "Development"),
    // --- Misc IT services ---
    (79, "Finger", 0.6, "Finger user information protocol", "IT"),
    (43, "Whois", 0.6, "WHOIS directory service", "IT"),
    (70, "Gopher", 0.6, "Gopher protocol", "IT"),
    (6667, "IRC", 0.7, "Internet Relay Chat", "IT"),
    (5222, "XMPP", 0.75, "Extensible Messaging and Presence Protocol", "IT"),
    (11211, "Memcached", 0.75, "Memcached", "Database"),
    (631, "IPP", 0.7, "Internet Printing Protocol / CUPS", "IT"),
    (548, "AFP", 0.7, "Apple Filing Protocol", "IT"),
    (2049, "NFS", 0.7, "Network File System", "IT"),
    (873, "rsync", 0.75, "rsync file synchronisation", "IT"),
    (5800, "VNC-HTTP", 0.7, "VNC Java viewer over HTTP", "IT"),
];

/// `(port, protocol, confidence, description, category)`.
const UDP_PORTS: &[(u16, &str, f32, &str, &str)] = &[
    (47808, "BACnet/IP", 0.85, "BACnet/IP building automation", "Industrial"),
    (5683, "CoAP", 0.8, "Constrained Application Protocol", "Industrial"),
    (20000, "DNP3", 0.75, "DNP3 over UDP", "Industrial"),
    (53, "DNS", 0.8, "Domain Name System", "IT"),
    (5353, "mDNS", 0.75, "Multicast DNS", "IT"),
    (67, "DHCP Server", 0.8, "DHCP server port", "IT"),
    (68, "DHCP Client", 0.8, "DHCP client port", "IT"),
    (69, "TFTP", 0.75, "Trivial File Transfer Protocol", "IT"),
    (123, "NTP", 0.8, "Network Time Protocol", "IT"),
    (137, "NetBIOS-NS", 0.7, "NetBIOS Name Service", "IT"),
    (138, "NetBIOS-DGM", 0.7, "NetBIOS Datagram Service", "IT"),
    (161, "SNMP", 0.8, "Simple Network Management Protocol", "IT"),
    (162, "SNMP Trap", 0.75, "SNMP trap receiver", "IT"),
    (514, "Syslog", 0.75, "Syslog message protocol", "IT"),
    (520, "RIP", 0.7, "Routing Information Protocol", "IT"),
    (1900, "SSDP", 0.7, "Simple Service Discovery Protocol", "IT"),
    (5060, "SIP", 0.7, "Session Initiation Protocol (UDP)", "Media"),
    (3478, "STUN", 0.7, "Session Traversal Utilities for NAT", "Media"),
    (500, "IKE", 0.75, "IPsec Internet Key Exchange", "VPN"),
    (4500, "IPsec NAT-T", 0.75, "IPsec NAT traversal", "VPN"),
    (1194, "OpenVPN", 0.7, "OpenVPN tunnel", "VPN"),
    (51820, "WireGuard", 0.7, "WireGuard VPN", "VPN"),
    (1812, "RADIUS", 0.75, "RADIUS authentication", "IT"),
    (1813, "RADIUS Accounting", 0.75, "RADIUS accounting", "IT"),
    (11211, "Memcached-UDP", 0.6, "Memcached over UDP", "Database"),
];

/// TCP destination ports in this range fall back to a blanket low-confidence
/// "Development" mapping when no specific entry matches.
const TCP_DEV_RANGE: std::ops::RangeInclusive<u16> = 5000..=5999;

pub struct PortDictionary {
    tcp: HashMap<u16, Vec<PortMapping>>,
    udp: HashMap<u16, Vec<PortMapping>>,
}

impl PortDictionary {
    pub fn new() -> Self {
        let mut tcp: HashMap<u16, Vec<PortMapping>> = HashMap::new();
        for &(port, protocol, confidence, description, category) in TCP_PORTS {
            tcp.entry(port)
                .or_default()
                .push(PortMapping::new(protocol, confidence, description, category));
        }

        let mut udp: HashMap<u16, Vec<PortMapping>> = HashMap::new();
        for &(port, protocol, confidence, description, category) in UDP_PORTS {
            udp.entry(port)
                .or_default()
                .push(PortMapping::new(protocol, confidence, description, category));
        }

        Self { tcp, udp }
    }

    fn development_mapping() -> PortMapping {
        PortMapping::new(
            "Development",
            0.3,
            "Ephemeral development/test service port",
            "Development",
        )
    }

    fn mappings_for(&self, is_tcp: bool, port: u16) -> Option<&Vec<PortMapping>> {
        let table = if is_tcp { &self.tcp } else { &self.udp };
        table.get(&port)
    }

    /// Highest-priority mapping for one transport/port, falling back to the
    /// blanket TCP 5000-5999 "Development" mapping when no specific entry
    /// matches. Applies equally to a destination-port or source-port lookup.
    fn lookup(&self, is_tcp: bool, port: u16) -> Option<PortMapping> {
        self.mappings_for(is_tcp, port)
            .and_then(|m| m.first())
            .cloned()
            .or_else(|| {
                if is_tcp && TCP_DEV_RANGE.contains(&port) {
                    Some(Self::development_mapping())
                } else {
                    None
                }
            })
    }

    /// Destination port first (element 0 of its mapping list, full
    /// confidence); otherwise source port (0.9 return-traffic penalty).
    /// `None` when neither transport port has a mapping.
    pub fn detect(&self, packet: &Packet) -> Option<DetectionResult> {
        let (src_port, dst_port) = packet.transport_flow()?;
        let is_tcp = packet.is_tcp();

        if let Some(mapping) = self.lookup(is_tcp, dst_port) {
            return Some(Self::to_result(
                &mapping,
                transport_name(is_tcp),
                dst_port,
                "destination",
                mapping.confidence,
            ));
        }

        if let Some(mapping) = self.lookup(is_tcp, src_port) {
            let confidence = mapping.confidence * 0.9;
            return Some(Self::to_result(&mapping, transport_name(is_tcp), src_port, "source", confidence));
        }

        None
    }

    fn to_result(
        mapping: &PortMapping,
        transport: String,
        port: u16,
        direction: &str,
        confidence: f32,
    ) -> DetectionResult {
        let mut details = std::collections::HashMap::new();
        details.insert("transport".to_string(), transport);
        details.insert("port".to_string(), port.to_string());
        details.insert("direction".to_string(), direction.to_string());
        details.insert("description".to_string(), mapping.description.clone());
        details.insert("category".to_string(), mapping.category.clone());

        DetectionResult {
            protocol: mapping.protocol.clone(),
            confidence,
            method: DetectionMethod::Port,
            details,
        }
    }

    /// Union of every protocol name this dictionary can produce.
    pub fn supported_protocols(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tcp
            .values()
            .chain(self.udp.values())
            .flatten()
            .map(|m| m.protocol.clone())
            .collect();
        names.push("Development".to_string());
        names.sort();
        names.dedup();
        names
    }
}

impl Default for PortDictionary {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_name(is_tcp: bool) -> String {
    if is_tcp {
        "TCP".to_string()
    } else {
        "UDP".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, TcpLayer, UdpLayer};

    fn tcp_packet(src: u16, dst: u16) -> Packet {
        Packet {
            tcp: Some(TcpLayer {
                source_port: src,
                destination_port: dst,
                syn: false,
                ack: false,
                fin: false,
                rst: false,
                payload: Vec::new(),
            }),
            ..Default::default()
        }
    }

    fn udp_packet(src: u16, dst: u16) -> Packet {
        Packet {
            udp: Some(UdpLayer {
                source_port: src,
                destination_port: dst,
                payload: Vec::new(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn destination_port_match_uses_full_confidence() {
        let dict = PortDictionary::new();
        let result = dict.detect(&tcp_packet(40000, 502)).unwrap();
        assert_eq!(result.protocol, "Modbus TCP");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.details.get("direction").unwrap(), "destination");
    }

    #[test]
    fn source_port_match_applies_return_traffic_penalty() {
        let dict = PortDictionary::new();
        let result = dict.detect(&tcp_packet(502, 49000)).unwrap();
        assert_eq!(result.protocol, "Modbus TCP");
        assert!((result.confidence - 0.9 * 0.9).abs() < 1e-6);
        assert_eq!(result.details.get("direction").unwrap(), "source");
    }

    #[test]
    fn no_match_returns_none() {
        let dict = PortDictionary::new();
        assert!(dict.detect(&tcp_packet(40000, 41000)).is_none());
    }

    #[test]
    fn port_5000_resolves_to_first_inserted_mapping() {
        let dict = PortDictionary::new();
        let result = dict.detect(&tcp_packet(1, 5000)).unwrap();
        assert_eq!(result.protocol, "Flask Dev");
    }

    #[test]
    fn port_8080_resolves_to_first_inserted_mapping() {
        let dict = PortDictionary::new();
        let result = dict.detect(&tcp_packet(1, 8080)).unwrap();
        assert_eq!(result.protocol, "HTTP-Alt");
    }

    #[test]
    fn development_range_fallback_applies_when_no_exact_entry() {
        let dict = PortDictionary::new();
        let result = dict.detect(&tcp_packet(1, 5123)).unwrap();
        assert_eq!(result.protocol, "Development");
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn udp_destination_lookup_works() {
        let dict = PortDictionary::new();
        let result = dict.detect(&udp_packet(1, 47808)).unwrap();
        assert_eq!(result.protocol, "BACnet/IP");
        assert_eq!(result.details.get("transport").unwrap(), "UDP");
    }

    #[test]
    fn udp_source_lookup_reports_udp_transport() {
        let dict = PortDictionary::new();
        let result = dict.detect(&udp_packet(53, 49000)).unwrap();
        assert_eq!(result.protocol, "DNS");
        assert_eq!(result.details.get("direction").unwrap(), "source");
        assert_eq!(result.details.get("transport").unwrap(), "UDP");
    }

    #[test]
    fn development_range_fallback_applies_on_source_port_too() {
        let dict = PortDictionary::new();
        let result = dict.detect(&tcp_packet(5123, 41000)).unwrap();
        assert_eq!(result.protocol, "Development");
        assert_eq!(result.details.get("direction").unwrap(), "source");
        assert!((result.confidence - 0.3 * 0.9).abs() < 1e-6);
    }
}
