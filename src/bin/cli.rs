//! TableCache CLI Client
//!
//! Command-line interface for interacting with a TableCache server.

use std::process;

use clap::{Parser, Subcommand};
use tablecache::network::Client;
use tablecache::{Key, Table, Value};

/// TableCache CLI
#[derive(Parser, Debug)]
#[command(name = "tablecache-cli")]
#[command(about = "CLI for the TableCache look-aside cache")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:5757")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List materialized tables
    Tables,

    /// Restore every table to its default
    ResetAll,

    /// Get a value by key
    Get { table: String, key: String },

    /// Set a key-value pair (omit the value to store an absent value)
    Set {
        table: String,
        key: String,
        value: Option<String>,
    },

    /// Delete a key
    Del { table: String, key: String },

    /// Dump a whole table
    Query { table: String },

    /// Get several keys
    Mget {
        table: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Set several KEY=VALUE pairs
    Mset {
        table: String,
        #[arg(required = true, value_name = "KEY=VALUE")]
        entries: Vec<String>,
    },

    /// Delete several keys
    Mdel {
        table: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Drop a whole table
    DeleteAll { table: String },

    /// Restore one table to its default
    Reset { table: String },

    /// Count the entries of a table
    Size { table: String },
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            process::exit(1);
        }
    };

    if let Err(e) = execute(&mut client, args.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn execute(client: &mut Client, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Tables => {
            for name in client.list_tables()? {
                println!("{}", name);
            }
        }
        Commands::ResetAll => {
            client.reset_all()?;
            println!("OK");
        }
        Commands::Get { table, key } => match client.get(&table, key.into_bytes())? {
            Some(value) => println!("{}", show(&value)),
            None => println!("(not found)"),
        },
        Commands::Set { table, key, value } => {
            client.set(&table, key.into_bytes(), value.map(String::into_bytes))?;
            println!("OK");
        }
        Commands::Del { table, key } => {
            println!("{}", client.delete(&table, key.into_bytes())?);
        }
        Commands::Query { table } => {
            for (key, value) in client.query(&table)? {
                println!("{}\t{}", String::from_utf8_lossy(&key), show(&value));
            }
        }
        Commands::Mget { table, keys } => {
            for (key, value) in client.get_batch(&table, to_keys(keys))? {
                let shown = value.as_ref().map_or_else(|| "(not found)".to_string(), show);
                println!("{}\t{}", String::from_utf8_lossy(&key), shown);
            }
        }
        Commands::Mset { table, entries } => {
            client.set_batch(&table, parse_entries(&entries)?)?;
            println!("OK");
        }
        Commands::Mdel { table, keys } => {
            println!("{}", client.delete_batch(&table, to_keys(keys))?);
        }
        Commands::DeleteAll { table } => {
            println!("{}", client.delete_all(&table)?);
        }
        Commands::Reset { table } => {
            client.reset_table(&table)?;
            println!("OK");
        }
        Commands::Size { table } => {
            println!("{}", client.table_size(&table)?);
        }
    }
    Ok(())
}

fn show(value: &Value) -> String {
    match value {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => "(nil)".to_string(),
    }
}

fn to_keys(keys: Vec<String>) -> Vec<Key> {
    keys.into_iter().map(String::into_bytes).collect()
}

fn parse_entries(entries: &[String]) -> Result<Table, String> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.as_bytes().to_vec(), Some(v.as_bytes().to_vec())))
                .ok_or_else(|| format!("invalid entry '{}': expected KEY=VALUE", entry))
        })
        .collect()
}
