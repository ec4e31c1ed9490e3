//! Literal end-to-end scenarios driving the public `UnifiedDetector` API
//! the way an embedding application would: build a `Config`, feed decoded
//! packets in, read back `DetectionResult`s and counters.

use protocol_classifier::config::Config;
use protocol_classifier::detector::UnifiedDetector;
use protocol_classifier::packet::{Packet, TcpLayer, UdpLayer};
use protocol_classifier::types::DetectionMethod;

fn tcp_packet(src_port: u16, dst_port: u16, payload: &[u8]) -> Packet {
    Packet {
        tcp: Some(TcpLayer {
            source_port: src_port,
            destination_port: dst_port,
            syn: false,
            ack: false,
            fin: false,
            rst: false,
            payload: payload.to_vec(),
        }),
        ..Default::default()
    }
}

fn udp_packet(src_port: u16, dst_port: u16, payload: &[u8]) -> Packet {
    Packet {
        udp: Some(UdpLayer {
            source_port: src_port,
            destination_port: dst_port,
            payload: payload.to_vec(),
        }),
        ..Default::default()
    }
}

#[test]
fn scenario_1_http_get_via_dpi() {
    let detector = UnifiedDetector::new(Config::default());
    let packet = tcp_packet(
        54321,
        80,
        b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/7.88.1\r\n\r\n",
    );

    let result = detector.detect(&packet);

    assert_eq!(result.protocol, "HTTP");
    assert_eq!(result.method, DetectionMethod::Dpi);
    assert!((result.confidence - 0.95).abs() < 1e-6);
    assert_eq!(result.details.get("method").unwrap(), "GET");
    assert_eq!(result.details.get("uri").unwrap(), "/index.html");
    assert_eq!(result.details.get("version").unwrap(), "HTTP/1.1");
    assert_eq!(result.details.get("host").unwrap(), "example.com");
    assert_eq!(result.details.get("metadata.user_agent").unwrap(), "cURL Tool");
}

#[test]
fn scenario_2_modbus_read_holding_registers_via_dpi() {
    let detector = UnifiedDetector::new(Config::default());
    let packet = tcp_packet(
        49000,
        502,
        &[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A],
    );

    let result = detector.detect(&packet);

    assert_eq!(result.protocol, "Modbus TCP");
    assert!((result.confidence - 0.95).abs() < 1e-6);
    assert_eq!(result.details.get("subprotocol").unwrap(), "Read Holding Registers");
    assert_eq!(result.details.get("start_address").unwrap(), "0");
    assert_eq!(result.details.get("quantity").unwrap(), "10");
    assert_eq!(result.details.get("unit_id").unwrap(), "1");
}

#[test]
fn scenario_3_dns_query_via_dpi() {
    let detector = UnifiedDetector::new(Config::default());
    let mut payload = vec![0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    payload.extend_from_slice(b"\x07example\x03com\x00\x00\x01\x00\x01");
    let packet = udp_packet(54321, 53, &payload);

    let result = detector.detect(&packet);

    assert_eq!(result.protocol, "DNS");
    assert_eq!(result.details.get("subprotocol").unwrap(), "Query");
    assert_eq!(result.details.get("transaction_id").unwrap(), "0x1234");
    assert_eq!(result.details.get("query_count").unwrap(), "1");
}

fn port_only_config(threshold: f32) -> Config {
    let mut config = Config::default();
    config.detection.enable_dpi = false;
    config.detection.enable_heuristic = false;
    config.detection.confidence_threshold = threshold;
    config
}

fn generic_http_alt_packet() -> Packet {
    tcp_packet(54321, 8080, b"binary\x00\x01\x02")
}

#[test]
fn scenario_4_port_dictionary_hit_below_threshold() {
    let detector = UnifiedDetector::new(port_only_config(0.5));

    let result = detector.detect(&generic_http_alt_packet());

    assert_eq!(result.protocol, "HTTP-Alt");
    assert_eq!(result.method, DetectionMethod::Port);
    assert!((result.confidence - 0.75).abs() < 1e-6);
}

#[test]
fn scenario_5_same_packet_above_threshold_is_unknown() {
    let detector = UnifiedDetector::new(port_only_config(0.95));

    let result = detector.detect(&generic_http_alt_packet());

    assert!(result.is_unknown());
    assert_eq!(result.method, DetectionMethod::Unknown);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn scenario_6_repeated_packet_is_a_cache_hit() {
    let detector = UnifiedDetector::new(Config::default());
    let packet = tcp_packet(
        54321,
        80,
        b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/7.88.1\r\n\r\n",
    );

    let first = detector.detect(&packet);
    let second = detector.detect(&packet);

    assert_eq!(first.protocol, second.protocol);
    assert_eq!(first.confidence, second.confidence);

    let stats = detector.stats();
    assert_eq!(stats.total_packets, 2);
    assert_eq!(stats.cache_hits, 1);
    assert!(stats.successful_detections <= stats.total_packets);
}
