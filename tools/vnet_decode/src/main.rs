//-----------------------------------------------------------------------------
// vnet_decode - decode device transport streams
//
// - Reads hex encoded transport byte chunks from the command line or a file
// - Frames, decodes and prints the messages
// - Prints the events and errors collected while decoding
//
// vnet_decode --help
//-----------------------------------------------------------------------------

use std::sync::Arc;

use anyhow::{Context, Result, bail};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use vnetlink::{EventFilter, Link, LinkConfig, MessageFilter, Transport};

//-----------------------------------------------------------------------------
// Command line arguments

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "vnet_decode")]
#[command(about = concat!("vnet_decode v", env!("CARGO_PKG_VERSION"), " decodes vehicle network device transport streams"))]
#[command(long_about = concat!("vnet_decode v", env!("CARGO_PKG_VERSION"), " decodes vehicle network device transport streams.

Each hex string is one chunk of the received byte stream, packets may span chunks.
Whitespace inside a file is ignored, each line is one chunk.

Examples:
  vnet_decode 18000100180900000030010203000000000000000000000000000000
  vnet_decode --file capture.txt --event-limit 100"))]
#[command(version)]
struct Args {
    // -l --log-level
    /// Log level (Off=0, Error=1, Warn=2, Info=3, Debug=4, Trace=5)
    #[arg(short, long, default_value_t = 2)]
    log_level: u8,

    // -f --file
    /// Read hex encoded chunks from file, one chunk per line
    #[arg(short, long)]
    file: Option<String>,

    // -e --event-limit
    /// Capacity of the event buffer
    #[arg(short, long, default_value_t = 10_000)]
    event_limit: usize,

    /// Hex encoded chunks
    chunks: Vec<String>,
}

trait ToLogLevelFilter {
    fn to_log_level_filter(self) -> log::LevelFilter;
}

impl ToLogLevelFilter for u8 {
    fn to_log_level_filter(self) -> log::LevelFilter {
        match self {
            0 => log::LevelFilter::Off,
            1 => log::LevelFilter::Error,
            2 => log::LevelFilter::Warn,
            3 => log::LevelFilter::Info,
            4 => log::LevelFilter::Debug,
            5 => log::LevelFilter::Trace,
            _ => log::LevelFilter::Warn,
        }
    }
}

//-----------------------------------------------------------------------------

// Decoding only, nothing is sent
struct NoTransport;

impl Transport for NoTransport {
    fn write(&self, _bytes: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "vnet_decode does not transmit"))
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = s.bytes().filter(|c| !c.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in '{}'", s);
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).context("invalid hex digit")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex byte '{}'", pair))
        })
        .collect()
}

//------------------------------------------------------------------------
// Main function

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(args.log_level.to_log_level_filter())
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let mut chunks = Vec::new();
    if let Some(file) = &args.file {
        info!("Read chunks from {}", file);
        let text = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file))?;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            chunks.push(parse_hex(line)?);
        }
    }
    for s in &args.chunks {
        chunks.push(parse_hex(s)?);
    }
    if chunks.is_empty() {
        bail!("no input, pass hex chunks or --file");
    }

    let link = Link::new(Arc::new(NoTransport), LinkConfig::default().set_event_limit(args.event_limit));
    link.enable_message_polling();
    {
        // Collect every decode error as event instead of keeping only the last one
        let _guard = link.events().downgrade_current_thread();
        for chunk in &chunks {
            link.on_receive(chunk);
        }
    }

    let messages = link.get_messages(&MessageFilter::all())?;
    println!("{} messages", messages.len());
    for message in &messages {
        println!("  {}", message);
    }

    let events = link.get_events(&EventFilter::all());
    println!("{} events", events.len());
    for event in &events {
        println!("  {}", event);
    }

    Ok(())
}
