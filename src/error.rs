//! Error types for dictalog.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictalogError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    /// No speech was detected within the idle timeout.
    ///
    /// Expected during quiet stretches; the scheduler retries immediately
    /// without dispatching anything.
    #[error("No speech detected within the idle timeout")]
    NoSpeechTimeout,

    // Recognizer startup errors
    #[error("Recognition model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Recognizer failed to initialize: {message}")]
    RecognizerInit { message: String },

    // Transcript output errors
    #[error("Transcript write failed: {message}")]
    TranscriptWrite { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DictalogError>;
