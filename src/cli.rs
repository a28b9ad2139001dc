//! Command-line interface for aw-qt.
use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let lowercase = trimmed.to_ascii_lowercase();
        let level = match lowercase.as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" | "information" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for aw-qt.
#[derive(Parser, Debug)]
#[command(name = "aw-qt", version, author)]
#[command(about = "Starts and supervises the ActivityWatch modules", long_about = None)]
pub struct Cli {
    /// Run in testing mode: modules get `--testing` and the testing settings apply.
    #[arg(long)]
    pub testing: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Path to the settings file (defaults to the platform config directory).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Comma separated modules to autostart, overriding the settings (`none` for none).
    #[arg(long, value_name = "LIST")]
    pub autostart_modules: Option<String>,

    /// Read start/stop/status commands from standard input.
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    /// Filter directive requested on the command line, if any.
    pub fn log_filter(&self) -> Option<&'static str> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.as_str()),
            (None, true) => Some("debug"),
            (None, false) => None,
        }
    }
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// A command typed in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveCommand {
    Start(String),
    Stop(String),
    Toggle(String),
    /// Status table for one module or all of them.
    Status(Option<String>),
    /// Status as JSON for one module or all of them.
    Json(Option<String>),
    /// Latest log file of a module.
    Log(String),
    Quit,
}

impl InteractiveCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let target = words.next().map(str::to_string);

        let needs_module = |target: Option<String>| {
            target.ok_or_else(|| format!("Usage: {verb} <module>"))
        };

        let command = match verb {
            "start" => Self::Start(needs_module(target)?),
            "stop" => Self::Stop(needs_module(target)?),
            "toggle" => Self::Toggle(needs_module(target)?),
            "s" | "status" => Self::Status(target),
            "json" => Self::Json(target),
            "log" => Self::Log(needs_module(target)?),
            "q" | "quit" | "exit" => Self::Quit,
            other => return Err(format!("Unknown command: {other}")),
        };

        Ok(Some(command))
    }
}
