//! Whisper-based recognition backend.
//!
//! Implements the [`Recognizer`] trait using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::audio::source::AudioSegment;
use crate::error::{DictalogError, Result};
use crate::recognize::{RecognitionError, RecognitionResult, Recognizer};
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters,
    install_logging_hooks,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper recognizer.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Number of threads for inference (None = whisper default)
    pub threads: Option<usize>,
}

/// Whisper-backed [`Recognizer`].
///
/// The WhisperContext is wrapped in a Mutex so workers can share one loaded
/// model; inference itself serializes on the lock.
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

impl WhisperRecognizer {
    /// Load the model and create a recognizer.
    ///
    /// # Errors
    /// `DictalogError::ModelNotFound` if the model file doesn't exist,
    /// `DictalogError::RecognizerInit` if model loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Suppress whisper.cpp output (only once per process)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(DictalogError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| DictalogError::RecognizerInit {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| DictalogError::RecognizerInit {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Convert i16 PCM to the f32 [-1.0, 1.0] format Whisper expects.
    fn convert_audio(samples: &[i16]) -> Vec<f32> {
        samples
            .iter()
            .map(|&sample| sample as f32 / 32768.0)
            .collect()
    }

    /// Reduce a BCP-47-ish tag ("en-IN") to the primary subtag whisper
    /// understands ("en").
    fn primary_subtag(language: &str) -> &str {
        language.split(['-', '_']).next().unwrap_or(language)
    }
}

impl Recognizer for WhisperRecognizer {
    fn recognize(&self, segment: &AudioSegment, language: &str) -> RecognitionResult {
        let audio = Self::convert_audio(&segment.samples);

        let context = self
            .context
            .lock()
            .map_err(|e| RecognitionError::Unexpected(format!("context lock poisoned: {}", e)))?;

        let mut state = context.create_state().map_err(|e| {
            RecognitionError::ServiceUnavailable(format!("failed to create state: {}", e))
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(Self::primary_subtag(language)));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state.full(params, &audio).map_err(|e| {
            RecognitionError::ServiceUnavailable(format!("inference failed: {}", e))
        })?;

        let mut text = String::new();
        for piece in state.as_iter() {
            text.push_str(&piece.to_string());
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(RecognitionError::Unrecognized);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}
