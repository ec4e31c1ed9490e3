#![cfg_attr(not(feature = "cli"), allow(dead_code))]

#[cfg(feature = "cli")]
use std::env;

#[cfg(feature = "cli")]
use protocol_classifier::{Config, DetectionReport, FileCapture, UnifiedDetector};

#[cfg(feature = "cli")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let mut pcap_file = None;
    let mut config_path = "config.json".to_string();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = args
                    .get(i + 1)
                    .cloned()
                    .ok_or("--config requires a path argument")?;
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                pcap_file = Some(other.to_string());
                i += 1;
            }
        }
    }
    let pcap_file = pcap_file.ok_or("usage: protocol_classifier <capture.pcap> [--config <path>]")?;

    let config = Config::from_file_or_default(&config_path);
    let detector = UnifiedDetector::new(config);

    println!("Classifying traffic from: {}\n", pcap_file);

    let mut source = FileCapture::open(&pcap_file)?;
    while let Some(packet) = source.next_decoded()? {
        detector.detect(&packet);
    }

    let generated_at = chrono::Utc::now().to_rfc3339();
    let report = DetectionReport::snapshot(&detector, generated_at);

    println!("Classification Report:");
    println!("=======================");
    println!("Total packets:       {}", report.stats.total_packets);
    println!("Successful detections: {}", report.stats.successful_detections);
    println!("Success rate:        {:.2}%", report.success_rate * 100.0);
    println!("Cache hits/misses:   {}/{}", report.stats.cache_hits, report.stats.cache_misses);
    println!();

    println!("By protocol:");
    let mut protocols: Vec<_> = report.stats.by_protocol.iter().collect();
    protocols.sort_by(|a, b| b.1.cmp(a.1));
    for (protocol, count) in protocols {
        println!("  {:<20} {}", protocol, count);
    }

    println!();
    println!("By method:");
    let mut methods: Vec<_> = report.stats.by_method.iter().collect();
    methods.sort_by(|a, b| b.1.cmp(a.1));
    for (method, count) in methods {
        println!("  {:<20} {}", method, count);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn print_help() {
    eprintln!("protocol_classifier: offline protocol classification over a pcap file");
    eprintln!();
    eprintln!("Usage: protocol_classifier <capture.pcap> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>   Load detector configuration from a JSON/TOML file");
    eprintln!("  --help, -h        Show this help message");
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature to be enabled.");
    eprintln!("Please build with: cargo build --features cli");
    std::process::exit(1);
}
