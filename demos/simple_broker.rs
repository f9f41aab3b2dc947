//! Simple pub/sub broker example
//!
//! Run with: cargo run --example simple_broker [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example simple_broker                    # binds to 0.0.0.0:3000
//!   cargo run --example simple_broker localhost          # binds to 127.0.0.1:3000
//!   cargo run --example simple_broker 127.0.0.1:3001     # binds to 127.0.0.1:3001
//!
//! The broker reads the rest of its configuration from the environment
//! (`.env` is loaded when present):
//!
//!   BROADCASTING_AUTH_URL    authorization endpoint for private/presence channels
//!   BROKER_REDIS_HOST        Redis host for the bus and auth cache
//!   BROKER_REDIS_PORT        Redis port
//!   BROKER_CACHE_EXPIRES     auth cache TTL in seconds
//!   BROKER_MAX_CONNECTIONS   concurrent connection limit (0 = unlimited)
//!
//! ## Subscribing
//!
//! With websocat:
//!   websocat "ws://localhost:3000/?member_id=42"
//!   {"event":"subscribe","channel":"news"}
//!
//! ## Publishing
//!
//! Publish a JSON envelope to the channel's Redis topic:
//!   redis-cli PUBLISH news '{"event":"headline","data":{"text":"hi"}}'

use std::net::SocketAddr;

use pubsub_rs::{BrokerConfig, BrokerServer};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:3000
/// - "localhost:3001" -> 127.0.0.1:3001
/// - "127.0.0.1" -> 127.0.0.1:3000
/// - "0.0.0.0:3001" -> 0.0.0.0:3001
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 3000;

    // Replace "localhost" with "127.0.0.1"
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: simple_broker [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:3000)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  simple_broker                     # binds to 0.0.0.0:3000");
    eprintln!("  simple_broker localhost           # binds to 127.0.0.1:3000");
    eprintln!("  simple_broker 127.0.0.1:3001      # binds to 127.0.0.1:3001");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pubsub_rs=debug".parse()?)
                .add_directive("simple_broker=debug".parse()?),
        )
        .init();

    let mut config = BrokerConfig::from_env();

    if let Some(addr_str) = args.get(1) {
        match parse_bind_addr(addr_str) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    println!("Starting broker on {}", config.bind_addr);
    println!("Auth endpoint: {}", config.auth_url);
    println!("Bus: {}", config.redis_url());
    println!();
    println!("=== Subscribe ===");
    println!("websocat \"ws://localhost:{}/?member_id=42\"", config.bind_addr.port());
    println!("{{\"event\":\"subscribe\",\"channel\":\"news\"}}");
    println!();
    println!("=== Publish ===");
    println!("redis-cli PUBLISH news '{{\"event\":\"headline\",\"data\":{{\"text\":\"hi\"}}}}'");
    println!();

    let server = BrokerServer::connect(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}
