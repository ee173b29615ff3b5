// src/main.rs
mod feed;
mod history;
mod web;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedviz")]
#[command(about = "Feeder log feed -> dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local dashboard server
    Serve {
        /// Logs endpoint of the feeder
        #[arg(long, default_value = "http://127.0.0.1:8000/logs")]
        feed_url: String,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Fetch the feed once and print it as a list
    Logs {
        /// Logs endpoint of the feeder
        #[arg(long, default_value = "http://127.0.0.1:8000/logs")]
        feed_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { feed_url, bind } => {
            let bind: SocketAddr = bind.parse().context("parse bind addr")?;
            web::serve(feed_url, bind).await?;
        }

        Command::Logs { feed_url } => {
            let client = reqwest::Client::new();
            let entries = feed::fetch_feed(&client, &feed_url).await?;
            for entry in &entries {
                println!("{} → {}", entry.timestamp, entry.event);
            }
        }
    }

    Ok(())
}
