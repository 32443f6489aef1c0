//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{NaiveTime, Weekday};
use clap::{Parser, Subcommand};

use crate::config::ClientConfig;
use crate::tracing::LogFormat;

/// facility - book shared facilities over UDP
#[derive(Debug, Parser)]
#[command(name = "facility")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FACILITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, env = "FACILITY_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    // --- Connection flags ---
    /// Facility server host
    #[arg(long, env = "FACILITY_HOST")]
    pub host: Option<String>,

    /// Facility server UDP port
    #[arg(long, short, env = "FACILITY_PORT")]
    pub port: Option<u16>,

    /// Local UDP port to bind (0 = any)
    #[arg(long)]
    pub bind_port: Option<u16>,

    /// Seconds to wait for each reply
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Attempts per request before giving up
    #[arg(long)]
    pub retries: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(port) = self.bind_port {
            config.client.bind_port = port;
        }
        if let Some(secs) = self.timeout {
            config.rpc.timeout_secs = secs;
        }
        if let Some(retries) = self.retries {
            config.rpc.max_retries = retries;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config.debug |= self.debug;
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every facility
    Names,

    /// Show free slots of a facility
    Availability {
        facility: String,

        /// Days to query (monday, tue, ...)
        #[arg(value_parser = parse_weekday)]
        days: Vec<Weekday>,
    },

    /// Book a facility
    Book {
        facility: String,

        #[arg(value_parser = parse_weekday)]
        day: Weekday,

        /// Start time (HHMM or HH:MM)
        #[arg(value_parser = parse_time)]
        start: NaiveTime,

        /// End time (HHMM or HH:MM)
        #[arg(value_parser = parse_time)]
        end: NaiveTime,
    },

    /// Show a booking
    Booking { id: String },

    /// Move a booking by a number of minutes
    Update {
        id: String,

        facility: String,

        /// Day of the current booking
        #[arg(value_parser = parse_weekday)]
        day: Weekday,

        /// Current start time (HHMM or HH:MM)
        #[arg(value_parser = parse_time)]
        start: NaiveTime,

        /// Current end time (HHMM or HH:MM)
        #[arg(value_parser = parse_time)]
        end: NaiveTime,

        /// Minutes to shift by, negative for earlier
        #[arg(long, allow_hyphen_values = true)]
        offset: i64,
    },

    /// Cancel a booking
    Delete { id: String, facility: String },

    /// Rate a facility from 1 to 5
    Rate {
        facility: String,

        #[arg(value_parser = parse_rating)]
        rating: f32,
    },

    /// Show the average rating of a facility
    Rating { facility: String },

    /// Send text the server echoes back
    Echo {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Watch a facility for availability changes
    Monitor {
        facility: String,

        /// Seconds to keep listening
        #[arg(long, short, default_value = "60")]
        duration: u64,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.parse()
        .map_err(|_| format!("'{s}' is not a day of the week"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("'{s}' is not a time (expected HHMM or HH:MM)"))
}

fn parse_rating(s: &str) -> Result<f32, String> {
    let rating: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (1.0..=5.0).contains(&rating) {
        Ok(rating)
    } else {
        Err(format!("rating must be between 1 and 5, got {rating}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("facility").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn book_parses_days_and_times() {
        let cli = parse(&["book", "LT1", "tuesday", "0900", "10:30"]);
        match cli.command {
            Command::Book {
                facility,
                day,
                start,
                end,
            } => {
                assert_eq!(facility, "LT1");
                assert_eq!(day, Weekday::Tue);
                assert_eq!(start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
                assert_eq!(end, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn update_accepts_negative_offset() {
        let cli = parse(&["update", "7", "LT1", "mon", "0900", "1000", "--offset", "-30"]);
        assert!(matches!(cli.command, Command::Update { offset: -30, .. }));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        for args in [
            ["book", "LT1", "someday", "0900", "1000"],
            ["book", "LT1", "mon", "25:00", "1000"],
            ["rate", "LT1", "9", "", ""],
        ] {
            let args = args.iter().copied().filter(|a| !a.is_empty());
            assert!(Cli::try_parse_from(std::iter::once("facility").chain(args)).is_err());
        }
    }

    #[test]
    fn overrides_replace_file_values() {
        let cli = parse(&[
            "--host",
            "10.0.0.9",
            "--port",
            "7000",
            "--timeout",
            "2",
            "--retries",
            "3",
            "--log-format",
            "json",
            "-v",
            "names",
        ]);
        let mut config = ClientConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.host, "10.0.0.9");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.rpc.timeout_secs, 2);
        assert_eq!(config.rpc.max_retries, 3);
        assert_eq!(config.client.bind_port, 0);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.debug);
    }

    #[test]
    fn monitor_duration_defaults_to_a_minute() {
        let cli = parse(&["monitor", "LT1"]);
        assert!(matches!(cli.command, Command::Monitor { duration: 60, .. }));
    }
}
