//! REST server exposing a `UnifiedDetector`'s statistics snapshot.
//!
//! A live view of the classification core: there is no capture running
//! behind it, so every request reflects whatever `UnifiedDetector` default
//! state the process started with plus any control calls made since.
//!
//! Usage:
//!   report_server [--config <path>] [--host <host>] [--port <port>]

use std::env;
use std::sync::Arc;

use protocol_classifier::{api, Config, UnifiedDetector};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let mut config_path = "config.json".to_string();
    let mut host = "127.0.0.1".to_string();
    let mut port: u16 = 3000;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = require_arg(&args, &mut i, "--config")?;
            }
            "--host" => {
                host = require_arg(&args, &mut i, "--host")?;
            }
            "--port" => {
                port = require_arg(&args, &mut i, "--port")?.parse()?;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    let config = Config::from_file_or_default(&config_path);
    let detector = Arc::new(UnifiedDetector::new(config));
    let listen_addr = format!("{host}:{port}");

    println!("Starting protocol classification REST API...");
    println!("  Listen address: http://{listen_addr}");
    println!();
    println!("Endpoints:");
    println!("  GET  /health                       - Health check");
    println!("  GET  /api/v1/stats                 - Detector statistics snapshot");
    println!("  POST /api/v1/cache/clear           - Clear detection and DPI caches");
    println!("  POST /api/v1/detectors/<method>    - {{\"enabled\": bool}} for dpi|port|heuristic");
    println!("  POST /api/v1/config/threshold      - {{\"threshold\": f32}} in [0,1]");
    println!();

    api::start_server(detector, &listen_addr).await?;
    Ok(())
}

fn require_arg(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    let value = args
        .get(*i + 1)
        .cloned()
        .ok_or_else(|| format!("{flag} requires an argument"))?;
    *i += 2;
    Ok(value)
}

fn print_help() {
    eprintln!("report_server: serves a protocol classifier's statistics over HTTP");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>   Load detector configuration from a JSON/TOML file");
    eprintln!("  --host <HOST>     Listen host (default: 127.0.0.1)");
    eprintln!("  --port <PORT>     Listen port (default: 3000)");
    eprintln!("  --help, -h        Show this help message");
}
