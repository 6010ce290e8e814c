//! TableCache Server Binary
//!
//! Starts the TCP cache server.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tablecache::{CacheServer, Config, Registry, Table};
use tracing_subscriber::{fmt, EnvFilter};

/// TableCache Server
#[derive(Parser, Debug)]
#[command(name = "tablecache-server")]
#[command(about = "Look-aside cache server with named tables")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:5757")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// How often the serve loop checks for shutdown (milliseconds)
    #[arg(short, long, default_value = "100")]
    poll_ms: u64,

    /// Default table entry restored on reset, as TABLE=KEY:VALUE (repeatable)
    #[arg(short, long = "table", value_name = "TABLE=KEY:VALUE")]
    tables: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tablecache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("TableCache Server v{}", tablecache::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .poll_interval_ms(args.poll_ms)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    let registry = Registry::with_config(config);
    let server = registry.get_or_create(&args.listen);

    if let Err(e) = seed_defaults(&server, &args.tables) {
        tracing::error!("{}", e);
        process::exit(1);
    }

    // Set up Ctrl+C handler
    let stopper = Arc::clone(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        stopper.stop();
    }) {
        tracing::error!("Failed to set Ctrl-C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Register `--table` entries as static table defaults
fn seed_defaults(server: &CacheServer, specs: &[String]) -> Result<(), String> {
    let mut defaults: std::collections::BTreeMap<String, Table> = Default::default();

    for spec in specs {
        let (table, entry) = spec
            .split_once('=')
            .ok_or_else(|| format!("invalid --table '{}': expected TABLE=KEY:VALUE", spec))?;
        let (key, value) = entry
            .split_once(':')
            .ok_or_else(|| format!("invalid --table '{}': expected TABLE=KEY:VALUE", spec))?;
        if table.is_empty() {
            return Err(format!("invalid --table '{}': table name cannot be empty", spec));
        }

        defaults
            .entry(table.to_string())
            .or_default()
            .insert(key.as_bytes().to_vec(), Some(value.as_bytes().to_vec()));
    }

    for (table, content) in defaults {
        tracing::info!("Default for table '{}': {} entries", table, content.len());
        server.set_table_default(table, content);
    }
    Ok(())
}
