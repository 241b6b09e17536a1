//! eodlink: find the attached board, run the start/parameters/result
//! handshake once, print the result.

mod client;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use eodlink_core::config::ClientConfig;
use eodlink_core::protocol::{list_ports, SerialConnector};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Serial handshake client for EOD-framed microcontroller protocols
#[derive(Debug, Parser)]
#[command(name = "eodlink", version)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, env = "EODLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Use this port instead of scanning
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Milliseconds to wait after resetting the board
    #[arg(long = "settle-ms")]
    settle_ms: Option<u64>,

    /// The two integers sent to the board (0-999)
    #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
    params: Option<Vec<u16>>,

    /// List serial ports, marking the ones a scan would probe, and exit
    #[arg(short, long)]
    list: bool,

    /// Log more on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Load the config file (if any) and apply command line overrides
    fn config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .context("loading configuration")?,
            None => ClientConfig::default(),
        };

        if let Some(port) = &self.port {
            config.ports.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.line.baud_rate = baud;
        }
        if let Some(ms) = self.settle_ms {
            config.settle_delay_ms = ms;
        }
        if let Some([first, second]) = self.params.as_deref() {
            config.parameters = [*first, *second];
        }

        config.validate().context("checking configuration")?;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    let mut out = io::stdout().lock();

    let config = match args.config() {
        Ok(config) => config,
        Err(e) => return ExitCode::from(client::fail(&mut out, &e)),
    };
    tracing::debug!("configuration: {:?}", config);

    if args.list {
        let candidates = config.candidates();
        for port in list_ports() {
            let probed = candidates.names().contains(&port.name);
            let _ = writeln!(out, "{}", report::port_line(&port, probed));
        }
        return ExitCode::SUCCESS;
    }

    let connector = SerialConnector::new(config.line.baud_rate);
    ExitCode::from(client::execute(connector, &config, &mut out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "eodlink", "--port", "COM4", "--baud", "19200", "--params", "1", "2", "-vv",
        ])
        .unwrap();
        assert_eq!(args.port.as_deref(), Some("COM4"));
        assert_eq!(args.baud, Some(19200));
        assert_eq!(args.params, Some(vec![1, 2]));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::try_parse_from([
            "eodlink",
            "--port",
            "/dev/ttyUSB0",
            "--settle-ms",
            "500",
            "--params",
            "7",
            "8",
        ])
        .unwrap();
        let config = args.config().unwrap();
        assert_eq!(config.ports.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.settle_delay_ms, 500);
        assert_eq!(config.parameters, [7, 8]);
        assert_eq!(config.line.baud_rate, 9600);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::try_parse_from(["eodlink", "--params", "1000", "2"]).unwrap();
        assert!(args.config().is_err());
    }

    #[test]
    fn test_params_needs_two_values() {
        assert!(Args::try_parse_from(["eodlink", "--params", "1"]).is_err());
    }
}
