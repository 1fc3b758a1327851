//! Command-line interface.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "dictalog",
    about = "Hands-free dictation logger: listens for a fixed duration and \
             appends timestamped transcript lines to a file",
    version
)]
pub struct Cli {
    /// Path to a config file (default: ~/.config/dictalog/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How long to listen, e.g. "90s", "15m", "2h"
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Recognition language tag, e.g. "en-IN"
    #[arg(short, long)]
    pub language: Option<String>,

    /// Transcript output file (appended, created if absent)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Audio input device name (see `dictalog devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Whisper model file
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Max recognition tasks in flight before capture blocks
    #[arg(long)]
    pub max_pending: Option<usize>,

    /// Number of concurrent recognition workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Suppress the progress line and transcript echo
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,
}

impl Cli {
    /// Apply command-line overrides on top of file/env configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(duration) = self.duration {
            config.run.duration_secs = duration.as_secs();
        }
        if let Some(language) = &self.language {
            config.recognition.language = language.clone();
        }
        if let Some(output) = &self.output {
            config.run.output = output.clone();
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(model) = &self.model {
            config.recognition.model = model.clone();
        }
        if let Some(max_pending) = self.max_pending {
            config.recognition.max_pending = max_pending;
        }
        if let Some(workers) = self.workers {
            config.recognition.workers = workers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let cli = Cli::parse_from(["dictalog"]);
        assert!(cli.config.is_none());
        assert!(cli.duration.is_none());
        assert!(!cli.quiet);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_humantime_duration() {
        let cli = Cli::parse_from(["dictalog", "--duration", "15m"]);
        assert_eq!(cli.duration, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_parse_devices_subcommand() {
        let cli = Cli::parse_from(["dictalog", "devices"]);
        assert!(matches!(cli.command, Some(Commands::Devices)));
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let cli = Cli::parse_from([
            "dictalog",
            "--duration",
            "90s",
            "--language",
            "de",
            "--output",
            "notes.txt",
            "--device",
            "pulse",
            "--workers",
            "4",
            "--max-pending",
            "8",
        ]);

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.run.duration_secs, 90);
        assert_eq!(config.recognition.language, "de");
        assert_eq!(config.run.output, PathBuf::from("notes.txt"));
        assert_eq!(config.audio.device, Some("pulse".to_string()));
        assert_eq!(config.recognition.workers, 4);
        assert_eq!(config.recognition.max_pending, 8);
    }

    #[test]
    fn test_unset_flags_leave_config_untouched() {
        let cli = Cli::parse_from(["dictalog"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, Config::default());
    }
}
