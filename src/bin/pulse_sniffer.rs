// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Prints the body of every message published to the given exchanges.
//!
//! ```text
//! pulse-sniffer [-u user] [-p password] [-s url] [-c config.json] [<exchange> <routing_key>]...
//! ```

use clap::Parser;
use pulse::{
    binding::bind,
    config::PulseConfig,
    connection::Connection,
    errors::PulseError,
    message::Message,
};
use std::{path::PathBuf, process};
use tracing_subscriber::EnvFilter;

/// Prints the body of every message published to the given exchanges
#[derive(Parser, Debug)]
#[command(name = "pulse-sniffer")]
#[command(about = "Prints Pulse messages matching the given bindings", long_about = None)]
struct Args {
    /// Pulse user (falls back to the URL, then PULSE_USERNAME)
    #[arg(short = 'u', long = "user")]
    user: Option<String>,

    /// Pulse password (falls back to the URL, then PULSE_PASSWORD)
    #[arg(short = 'p', long = "password")]
    password: Option<String>,

    /// Server URL (default: the production broker)
    #[arg(short = 's', long = "server")]
    url: Option<String>,

    /// JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Bindings as <exchange> <routing_key> pairs
    #[arg(value_name = "EXCHANGE ROUTING_KEY", num_args = 0..)]
    bindings: Vec<String>,
}

impl Args {
    /// The positional arguments as `(exchange, routing_key)` pairs.
    fn pairs(&self) -> Result<Vec<(String, String)>, PulseError> {
        if self.bindings.len() % 2 != 0 {
            return Err(PulseError::ConfigError(
                "bindings are given as <exchange> <routing_key> pairs".to_owned(),
            ));
        }

        Ok(self
            .bindings
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect())
    }
}

async fn print_message(msg: Message) -> Result<(), PulseError> {
    println!("Received from exchange {}:", msg.exchange);
    println!("{}", String::from_utf8_lossy(&msg.body));
    println!();
    msg.ack(false).await
}

async fn run(args: Args) -> Result<(), PulseError> {
    let pairs = args.pairs()?;

    let mut cfg = match &args.config {
        Some(path) => PulseConfig::from_file(path)?,
        None => PulseConfig::default(),
    };
    if let Some(user) = args.user {
        cfg.user = user;
    }
    if let Some(password) = args.password {
        cfg.password = password;
    }
    if let Some(url) = args.url {
        cfg.url = url;
    }
    for (exchange, routing_key) in &pairs {
        cfg.subscription.bindings.push(bind(routing_key, exchange));
    }
    if cfg.subscription.bindings.is_empty() {
        return Err(PulseError::ConfigError("at least one binding is required".to_owned()));
    }

    let conn = Connection::from_config(&cfg);
    let sub = conn
        .subscribe_with(
            cfg.subscription.options(),
            print_message,
            cfg.subscription.bindings.clone(),
        )
        .await?;

    sub.wait().await;
    conn.close().await
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("pulse-sniffer: {}", err);
        process::exit(1);
    }
}
