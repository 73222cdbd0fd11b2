//! Loopr - terminal loop editor with pitch-preserving time-stretch
//!
//! Decodes a file, starts the audio output and reads commands from stdin.
//! Type `help` for the command list.
//!
//! ## Command line
//!
//! ```text
//! loopr [--config <path>] [--alpha <f>] [--list-devices] [<file>]
//! ```

mod commands;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use loopr_core::audio::{get_output_devices, start_audio_output};
use loopr_core::config::{default_config_path, load_config, LooprConfig};

use commands::{parse_command, HELP};
use session::{Flow, Session};

/// Parsed command line flags
#[derive(Debug, Default, PartialEq)]
struct Args {
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    alpha: Option<f64>,
    list_devices: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--alpha" => {
                    let raw = args.next().context("--alpha needs a value")?;
                    let alpha: f64 = raw
                        .parse()
                        .with_context(|| format!("Invalid --alpha '{}'", raw))?;
                    parsed.alpha = Some(alpha);
                }
                "--list-devices" => parsed.list_devices = true,
                flag if flag.starts_with("--") => bail!("Unknown flag {}", flag),
                file => {
                    if parsed.file.is_some() {
                        bail!("Only one file can be opened at a time");
                    }
                    parsed.file = Some(PathBuf::from(file));
                }
            }
        }
        Ok(parsed)
    }
}

fn list_devices() -> Result<()> {
    let devices = get_output_devices().context("Failed to enumerate audio devices")?;
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in devices {
        println!("{}", device);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    if args.list_devices {
        return list_devices();
    }

    log::info!("loopr starting up");
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config: LooprConfig = load_config(&config_path);
    if let Some(alpha) = args.alpha {
        config.playback.default_alpha = alpha;
    }
    let playback = config.playback.validated();

    let output = start_audio_output(&config.audio, &playback)
        .context("Failed to start audio output")?;
    println!(
        "Audio output running at {} Hz, {} frames (~{:.1}ms)",
        output.sample_rate,
        output.buffer_size,
        output.stream.latency_ms()
    );

    // Held until exit; dropping it stops the stream
    let _stream = output.stream;
    let mut session = Session::new(output.player, output.sample_rate, &playback, &config.display);
    if let Some(file) = &args.file {
        session.open(file)?;
        println!("{}", session.status_line());
    }

    println!("{}", HELP);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read stdin")?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{:#}", e);
                continue;
            }
        };
        match session.execute(command) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("{:#}", e),
        }
    }

    log::info!("loopr shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_args_defaults() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_args_all_flags() {
        let args = parse(&["--config", "/tmp/c.yaml", "--alpha", "1.5", "loop.wav"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("loop.wav")));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert_eq!(args.alpha, Some(1.5));
        assert!(!args.list_devices);
        assert!(parse(&["--list-devices"]).unwrap().list_devices);
    }

    #[test]
    fn test_args_errors() {
        assert!(parse(&["--alpha"]).is_err());
        assert!(parse(&["--alpha", "fast"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["a.wav", "b.wav"]).is_err());
    }
}
