use crate::defaults;
use crate::error::{DictalogError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
    pub audio: AudioConfig,
    pub recognition: RecognitionConfig,
}

/// Run budget and output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock budget for the listening phase, in seconds
    pub duration_secs: u64,
    /// Transcript output file (append-only, created if absent)
    pub output: PathBuf,
}

/// Audio capture and utterance segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    /// Hard cutoff per utterance, in seconds
    pub max_phrase_secs: u64,
    /// Max wait with no speech before a capture attempt retries, in seconds
    pub silence_timeout_secs: u64,
    /// Silence duration that closes an utterance, in milliseconds
    pub pause_ms: u32,
    /// Minimum sustained speech to count as an utterance start, in milliseconds
    pub phrase_start_ms: u32,
    /// Pre-roll of frames prepended at speech onset, in milliseconds
    pub non_speaking_ms: u32,
    /// Ambient-noise calibration pass duration, in milliseconds
    pub calibration_ms: u32,
    /// Multiplier applied to the calibrated noise floor
    pub energy_scale: f32,
}

/// Recognition dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Language tag passed to the recognizer
    pub language: String,
    /// Backpressure bound on in-flight recognition tasks
    pub max_pending: usize,
    /// Concurrent recognition workers
    pub workers: usize,
    /// Whisper model path (used by the `whisper` backend)
    pub model: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: defaults::RUN_DURATION_SECS,
            output: PathBuf::from(defaults::OUTPUT_FILE),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            max_phrase_secs: defaults::MAX_PHRASE_SECS,
            silence_timeout_secs: defaults::SILENCE_TIMEOUT_SECS,
            pause_ms: defaults::PAUSE_MS,
            phrase_start_ms: defaults::PHRASE_START_MS,
            non_speaking_ms: defaults::NON_SPEAKING_MS,
            calibration_ms: defaults::CALIBRATION_MS,
            energy_scale: defaults::ENERGY_SCALE,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: defaults::LANGUAGE.to_string(),
            max_pending: defaults::MAX_PENDING,
            workers: defaults::WORKERS,
            model: PathBuf::from(defaults::MODEL_PATH),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DictalogError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                DictalogError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only falls back to defaults when the file is missing.
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(DictalogError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DICTALOG_LANGUAGE → recognition.language
    /// - DICTALOG_OUTPUT → run.output
    /// - DICTALOG_AUDIO_DEVICE → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("DICTALOG_LANGUAGE")
            && !language.is_empty()
        {
            self.recognition.language = language;
        }

        if let Ok(output) = std::env::var("DICTALOG_OUTPUT")
            && !output.is_empty()
        {
            self.run.output = PathBuf::from(output);
        }

        if let Ok(device) = std::env::var("DICTALOG_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Validate values that would otherwise wedge or panic the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.recognition.workers == 0 {
            return Err(DictalogError::ConfigInvalidValue {
                key: "recognition.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.recognition.max_pending == 0 {
            return Err(DictalogError::ConfigInvalidValue {
                key: "recognition.max_pending".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(DictalogError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(self.audio.energy_scale.is_finite() && self.audio.energy_scale > 0.0) {
            return Err(DictalogError::ConfigInvalidValue {
                key: "audio.energy_scale".to_string(),
                message: "must be a positive number".to_string(),
            });
        }
        if self.audio.pause_ms == 0 {
            return Err(DictalogError::ConfigInvalidValue {
                key: "audio.pause_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/dictalog/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dictalog").join("config.toml"))
    }
}
