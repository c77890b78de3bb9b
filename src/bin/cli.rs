use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hookwire::{EngineConfig, MessageType, format_debug, format_events, format_json, record};

/// hookwire CLI: print the callback transcript of an HTTP/1.x stream.
///
/// Reads raw HTTP bytes from a file, --raw string, or stdin, runs them
/// through the parser and prints every event it dispatches.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP message as a single shell argument.
#[derive(ClapParser)]
#[command(name = "hookwire-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing raw HTTP messages.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP string (escape sequences \r \n \t \\ are expanded).
    #[arg(long)]
    raw: Option<String>,

    /// Which messages the stream holds.
    #[arg(short = 't', long = "type", default_value = "both", value_enum)]
    message_type: TypeArg,

    /// Feed the input in pieces of this many bytes (0: all at once).
    #[arg(short, long, default_value = "0")]
    chunk_size: usize,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Maximum size of a start line plus header section in bytes.
    #[arg(long, default_value = "81920")]
    max_header_size: u32,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    Request,
    Response,
    Both,
}

impl From<TypeArg> for MessageType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Request => MessageType::Request,
            TypeArg::Response => MessageType::Response,
            TypeArg::Both => MessageType::Both,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON report
    Json,
    /// Human-readable summary and events
    Debug,
    /// One event per line
    Events,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let config = EngineConfig {
        max_header_size: cli.max_header_size,
        ..EngineConfig::default()
    };
    let chunk_size = (cli.chunk_size > 0).then_some(cli.chunk_size);
    let report = record(&data, cli.message_type.into(), chunk_size, config);

    let output = match cli.format {
        OutputFormat::Json => format_json(&report, cli.pretty),
        OutputFormat::Debug => format_debug(&report),
        OutputFormat::Events => format_events(&report),
    };
    print!("{output}");
    if matches!(cli.format, OutputFormat::Json) {
        println!();
    }

    if let Some(error) = &report.error {
        eprintln!("Parse error: {error}");
        process::exit(2);
    }
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_expands_line_endings() {
        assert_eq!(unescape(r"GET / HTTP/1.1\r\n\r\n"), "GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn unescape_keeps_unknown_sequences() {
        assert_eq!(unescape(r"a\qb\\"), "a\\qb\\");
        assert_eq!(unescape("tail\\"), "tail\\");
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "hookwire-cli",
            "--raw",
            "x",
            "--type",
            "response",
            "--chunk-size",
            "3",
            "--format",
            "events",
        ])
        .unwrap();
        assert!(matches!(cli.message_type, TypeArg::Response));
        assert_eq!(cli.chunk_size, 3);
        assert!(matches!(cli.format, OutputFormat::Events));
    }
}
