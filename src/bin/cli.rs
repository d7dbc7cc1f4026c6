//! distmap CLI Client
//!
//! Command-line interface for inspecting and editing one map on a server.

use std::fmt;

use clap::{Parser, Subcommand};
use distmap::{Client, Config, DistributedMap, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as log_fmt, EnvFilter};

/// distmap CLI
#[derive(Parser, Debug)]
#[command(name = "distmap-cli")]
#[command(about = "CLI for distmap maps")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7379")]
    server: String,

    /// Name of the map to operate on
    #[arg(short, long, default_value = "default")]
    map: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Store a value (integers and decimals are stored as numbers)
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete keys
    Del {
        /// The keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// List every key
    Keys,

    /// List every value
    Values,

    /// Count the entries
    Len,

    /// Add to a numeric value and print the result
    Incr {
        /// The key to increment
        key: String,

        /// Amount to add
        #[arg(default_value = "1", allow_hyphen_values = true)]
        delta: String,
    },

    /// Ping the server
    Ping,
}

/// Any scalar the default codec can hold
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numbers become numbers; everything else is text
    fn parse(raw: &str) -> Self {
        if let Ok(int) = raw.parse::<i64>() {
            Value::Int(int)
        } else if let Ok(float) = raw.parse::<f64>() {
            Value::Float(float)
        } else {
            Value::Text(raw.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "(null)"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Text(v) => write!(f, "{:?}", v),
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    log_fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder()
        .server_addr(&args.server)
        .dispatch_threads(1)
        .build();
    let client = Client::connect(config)?;
    let map: DistributedMap<String, Value> = client.get_map(&args.map);

    match args.command {
        Commands::Get { key } => match map.get(&key).wait()? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => match map.put(&key, &Value::parse(&value)).wait()? {
            Some(previous) => println!("OK (was {})", previous),
            None => println!("OK"),
        },
        Commands::Del { keys } => {
            let removed = map.fast_remove(&keys).wait()?;
            println!("(integer) {}", removed);
        }
        Commands::Keys => {
            for key in map.key_iter() {
                println!("{}", key?);
            }
        }
        Commands::Values => {
            for value in map.value_iter() {
                println!("{}", value?);
            }
        }
        Commands::Len => println!("(integer) {}", map.size().wait()?),
        Commands::Incr { key, delta } => {
            let next = map.add_and_get(&key, &Value::parse(&delta)).wait()?;
            println!("{}", next);
        }
        Commands::Ping => {
            client.ping().wait()?;
            println!("PONG");
        }
    }

    Ok(())
}
