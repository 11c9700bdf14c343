mod checksum;
mod clock;
mod config;
mod dns_resolver;
mod error;
mod messages;
mod packet;
mod parser;
mod prober;
#[cfg(test)]
mod test_utils;
mod transport;

use crate::clock::MonotonicClock;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::messages::RunSummary;
use crate::prober::{ExitProcess, Prober};
use crate::transport::IcmpSocket;

use clap::Parser;
use clap::error::ErrorKind;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;

const EXIT_USAGE: u8 = 1;
const EXIT_TTL_RANGE: u8 = 2;

/// Sends four ICMP echo requests and reports their round-trip times.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Host name or IPv4 address to ping
    host: String,

    /// Outbound TTL, between 1 and 255
    #[arg(allow_hyphen_values = true)]
    ttl: String,

    /// Log diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let program = std::env::args().next().unwrap_or_else(|| "arcping".to_string());

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => {
            print_usage(&program);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let Some(ttl) = parse_ttl(&args.ttl) else {
        print_usage(&program);
        println!("####### ttl should be between 1 and 255 ########");
        return ExitCode::from(EXIT_TTL_RANGE);
    };

    init_logging(args.verbose);

    match run(&args.host, ProbeConfig::new(ttl)) {
        Ok(summary) => {
            println!();
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(message) = failure_message(&e) {
                println!("{}", message);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(host: &str, config: ProbeConfig) -> Result<RunSummary> {
    let socket = IcmpSocket::open(config.ttl)?;
    let destination = dns_resolver::resolve(host)?;
    println!("{} resolved to {}", host, destination);

    let clock = MonotonicClock::new();
    let mut prober = Prober::new(socket, clock, Arc::new(ExitProcess), config, destination);
    tracing::debug!(identifier = prober.identifier(), %destination, "starting probes");
    prober.run(|result| {
        tracing::debug!(sequence = result.sequence, "probe recorded");
        println!("{}", result)
    })
}

/// Line printed for a failed run. The timeout watcher reports timeouts itself.
fn failure_message(error: &ProbeError) -> Option<String> {
    match error {
        ProbeError::Timeout => None,
        other => Some(other.to_string()),
    }
}

/// Accepts an integer TTL in `1..=255`. Anything else, including text, is out of range.
fn parse_ttl(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|ttl| (1..=255).contains(ttl))
        .map(|ttl| ttl as u8)
}

fn print_usage(program: &str) {
    println!("Usage: {} host/ip ttl[1:255]", program);
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
