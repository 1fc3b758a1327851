//! Speech recognition seam.
//!
//! The pipeline treats recognition as a black box: samples and a language
//! tag in, text or a typed failure out. `whisper` provides the real backend
//! behind a feature flag; [`MockRecognizer`] scripts outcomes for tests.

#[cfg(feature = "whisper")]
pub mod whisper;

use crate::audio::source::AudioSegment;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Per-segment recognition failures.
///
/// These are contained within their task: none of them aborts the capture
/// loop, and no retry is attempted — the next capture supersedes the lost
/// segment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// The audio contained no decodable speech. Not a fault; the caller
    /// drops the segment silently.
    #[error("no recognizable speech in segment")]
    Unrecognized,

    /// The recognition backend rejected or failed the request.
    #[error("recognition service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other failure during recognition.
    #[error("unexpected recognition failure: {0}")]
    Unexpected(String),
}

/// Outcome of recognizing one segment.
pub type RecognitionResult = std::result::Result<String, RecognitionError>;

/// Trait for speech-to-text recognition.
///
/// Implementations must be callable concurrently from multiple worker
/// threads. This trait allows swapping implementations (real backend vs
/// mock).
pub trait Recognizer: Send + Sync {
    /// Recognize one audio segment.
    ///
    /// # Arguments
    /// * `segment` - Captured utterance (16-bit PCM mono)
    /// * `language` - Language tag, e.g. "en-IN"
    fn recognize(&self, segment: &AudioSegment, language: &str) -> RecognitionResult;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "recognizer"
    }
}

/// Implement Recognizer for Arc<T> to allow sharing across workers.
impl<T: Recognizer + ?Sized> Recognizer for Arc<T> {
    fn recognize(&self, segment: &AudioSegment, language: &str) -> RecognitionResult {
        (**self).recognize(segment, language)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// One scripted outcome for [`MockRecognizer`].
#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    pub result: RecognitionResult,
    /// Artificial recognition latency, slept before returning.
    pub latency: Duration,
}

impl ScriptedOutcome {
    pub fn text(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            latency: Duration::ZERO,
        }
    }

    pub fn failure(error: RecognitionError) -> Self {
        Self {
            result: Err(error),
            latency: Duration::ZERO,
        }
    }

    pub fn after(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Mock recognizer for tests.
///
/// Outcomes can be keyed by the first sample of the segment, which stays
/// deterministic regardless of which worker picks a job up first; segments
/// without a keyed entry get the fixed fallback outcome.
pub struct MockRecognizer {
    fallback: ScriptedOutcome,
    keyed: Mutex<HashMap<i16, ScriptedOutcome>>,
    calls: AtomicUsize,
}

impl MockRecognizer {
    /// Recognizer that returns `text` for every segment.
    pub fn with_text(text: &str) -> Self {
        Self {
            fallback: ScriptedOutcome::text(text),
            keyed: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Recognizer that fails every segment with `error`.
    pub fn with_failure(error: RecognitionError) -> Self {
        Self {
            fallback: ScriptedOutcome::failure(error),
            keyed: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add latency to the fallback outcome.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.fallback.latency = latency;
        self
    }

    /// Script the outcome for segments whose first sample equals `key`.
    pub fn script(self, key: i16, outcome: ScriptedOutcome) -> Self {
        if let Ok(mut keyed) = self.keyed.lock() {
            keyed.insert(key, outcome);
        }
        self
    }

    /// Number of recognize calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(&self, segment: &AudioSegment, _language: &str) -> RecognitionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let outcome = segment
            .samples
            .first()
            .and_then(|key| {
                self.keyed
                    .lock()
                    .ok()
                    .and_then(|keyed| keyed.get(key).cloned())
            })
            .unwrap_or_else(|| self.fallback.clone());

        if !outcome.latency.is_zero() {
            std::thread::sleep(outcome.latency);
        }
        outcome.result
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
