//! Calibration readout: dump the device's calibration state as JSON.
//!
//! Discovers the chip command prefix, collects the EUI and calibration
//! tokens, then takes one load sample scaled by the token-implied AC
//! reference.
//!
//! # Prerequisites
//!
//! - A metering device console reachable over telnet
//!
//! # Usage
//!
//! ```bash
//! cargo run --example calibration -- --host 192.168.1.50 --port 4900
//! ```

use std::env;

use embercli::meter::MeterCli;
use embercli::transport::TelnetConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("Connecting to {}:{}...", args.host, args.port);
    let config = TelnetConfig::new(&args.host, args.port);
    let mut meter = MeterCli::connect(config).await?;
    println!("Connected!");

    println!("\nDiscovering command prefix...");
    let prefix = meter.command_prefix().await?;
    println!("Chip prefix: {prefix}");

    println!("\nReading calibration state...");
    let tokens = meter.calibration_info(&prefix).await?;
    println!("{}", serde_json::to_string_pretty(&tokens)?);

    println!("\nSampling the load...");
    let sample = meter.load_sample(&prefix, &tokens.ac_reference()).await?;
    println!("Load now: {sample}");

    println!("\nClosing connection...");
    meter.close();
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 4900u16;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(4900);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self { host, port }
    }

    fn print_help() {
        println!(
            r#"embercli calibration example

USAGE:
    cargo run --example calibration -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Device host [default: localhost]
    -p, --port <PORT>    Console port [default: 4900]
    --help               Print this help message
"#
        );
    }
}
