//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::engine::{SpeedBounds, TimeTravelError};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "clockd")]
#[command(about = "A presentation countdown timer with synchronized setup, display and moderator surfaces")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Tick period of each surface's countdown in milliseconds
    #[arg(long, default_value = "16", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Keep counting below zero once the countdown runs out
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub allow_negative: bool,

    /// Slowest time-travel speed accepted
    #[arg(long, default_value = "0.1", value_parser = parse_speed)]
    pub min_speed: f64,

    /// Fastest time-travel speed accepted
    #[arg(long, default_value = "10", value_parser = parse_speed)]
    pub max_speed: f64,

    /// Directory holding the persisted timer and settings; in-memory when omitted
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Session-wide time-travel bounds; fails when `--min-speed` exceeds `--max-speed`
    pub fn speed_bounds(&self) -> Result<SpeedBounds, TimeTravelError> {
        SpeedBounds {
            min_speed: self.min_speed,
            max_speed: self.max_speed,
        }
        .validate()
    }
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("speed must be a positive number, got {}", value));
    }
    Ok(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["clockd"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.tick_interval(), Duration::from_millis(16));
        assert!(config.allow_negative);
        assert_eq!(config.speed_bounds(), Ok(SpeedBounds::default()));
        assert_eq!(config.log_level(), "info");
        assert!(config.state_dir.is_none());
    }

    #[test]
    fn overrides() {
        let config = Config::try_parse_from([
            "clockd",
            "--port",
            "9000",
            "--allow-negative",
            "false",
            "--max-speed",
            "4",
            "--state-dir",
            "/tmp/clockd",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.allow_negative);
        assert_eq!(config.speed_bounds().unwrap().max_speed, 4.0);
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/clockd")));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn speed_bounds_are_validated() {
        assert!(Config::try_parse_from(["clockd", "--max-speed", "-1"]).is_err());
        assert!(Config::try_parse_from(["clockd", "--min-speed", "0"]).is_err());
        assert!(Config::try_parse_from(["clockd", "--min-speed", "inf"]).is_err());

        let inverted = Config::try_parse_from(["clockd", "--min-speed", "5", "--max-speed", "2"]).unwrap();
        assert_eq!(inverted.speed_bounds().unwrap_err().kind(), "invalidBounds");
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(Config::try_parse_from(["clockd", "--tick-ms", "0"]).is_err());
    }
}
