//! Level monitor: poll the device dim level until interrupted.
//!
//! Connects to the device console and reads the dim level in a loop,
//! flagging the minimum and maximum stops.
//!
//! # Prerequisites
//!
//! - A metering device console reachable over telnet
//!
//! # Usage
//!
//! ```bash
//! cargo run --example monitor -- --host 192.168.1.50 --port 4900
//! ```

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embercli::meter::{LEVEL_MAX, LEVEL_MIN, MeterCli};
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

    // Ctrl-C flips the flag; the loop notices between polls.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    println!("Polling dim level (Ctrl-C to stop)...");
    while !stop.load(Ordering::Relaxed) {
        match meter.level().await {
            Ok(level) if level == LEVEL_MIN => println!("level {level} (MIN)"),
            Ok(level) if level == LEVEL_MAX => println!("level {level} (MAX)"),
            Ok(level) => println!("level {level}"),
            Err(err) => {
                eprintln!("poll failed: {err}");
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(args.interval)).await;
    }

    println!("\nClosing connection...");
    meter.close();
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    interval: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 4900u16;
        let mut interval = 250u64;

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
                "--interval" | "-i" => {
                    i += 1;
                    if i < args.len() {
                        interval = args[i].parse().unwrap_or(250);
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

        Self {
            host,
            port,
            interval,
        }
    }

    fn print_help() {
        println!(
            r#"embercli monitor example

USAGE:
    cargo run --example monitor -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Device host [default: localhost]
    -p, --port <PORT>          Console port [default: 4900]
    -i, --interval <MILLIS>    Delay between polls [default: 250]
    --help                     Print this help message
"#
        );
    }
}
