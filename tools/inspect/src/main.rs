//! Strata inspect CLI
//!
//! Usage:
//!   strata-inspect decode --hex "AB CD 00 05 01 12 34 00 4C"
//!   strata-inspect decode capture.bin --chunk 1 --json
//!   strata-inspect encode reading:0x1234 pair:1,2 text:hello
//!   strata-inspect --config stack.toml config

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strata_config::StackConfig;
use strata_inspect::demo::{parse_message, Demo};
use strata_inspect::{decode, encode, parse_hex};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strata-inspect")]
#[command(about = "Decode and encode frames of the Strata demo protocol")]
#[command(version)]
struct Cli {
    /// Stack configuration file (TOML); STRATA_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode frames from a file or hex string
    Decode {
        /// Binary input file
        file: Option<PathBuf>,

        /// Hex input instead of a file
        #[arg(long, conflicts_with = "file")]
        hex: Option<String>,

        /// Deliver input this many bytes at a time
        #[arg(long)]
        chunk: Option<usize>,
    },
    /// Encode messages given as kind:args (reading:<u16>, pair:<u8>,<u8>, text:<str>)
    Encode {
        #[arg(required = true, value_parser = parse_message)]
        messages: Vec<Demo>,
    },
    /// Print the effective stack configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = StackConfig::load(cli.config.as_deref())?;
    init_logging(&config, cli.json_logs);
    debug!(?cli, "Arguments parsed");

    match cli.command {
        Command::Decode { file, hex, chunk } => {
            let input = match (file, hex) {
                (_, Some(text)) => parse_hex(&text)?,
                (Some(path), None) => std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => bail!("Provide an input file or --hex"),
            };

            let report = decode(&input, &config, chunk)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for message in &report.messages {
                    println!("{message}");
                }
                println!(
                    "{} frame(s), {} byte(s) dropped in {} resync(s)",
                    report.stats.frames, report.stats.bytes_dropped, report.stats.resyncs
                );
                if !report.pending.is_empty() {
                    println!("pending: {}", report.pending);
                }
            }
        }
        Command::Encode { messages } => {
            let frames = encode(&messages, &config)?;
            if cli.json {
                let encoded: Vec<String> = frames.iter().map(hex::encode).collect();
                println!("{}", serde_json::to_string_pretty(&encoded)?);
            } else {
                for frame in &frames {
                    println!("{}", hex::encode_upper(frame));
                }
            }
        }
        Command::Config => print!("{}", config.to_toml_string()?),
    }

    Ok(())
}

fn init_logging(config: &StackConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
