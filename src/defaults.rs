//! Default configuration constants for dictalog.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default total run duration in seconds.
///
/// The wall-clock budget for the listening phase. New captures stop once
/// the budget is exhausted; outstanding recognition is still drained.
pub const RUN_DURATION_SECS: u64 = 1000;

/// Default transcript output file.
pub const OUTPUT_FILE: &str = "output.txt";

/// Default language tag passed to the recognizer.
pub const LANGUAGE: &str = "en-IN";

/// Default hard cutoff per utterance in seconds.
///
/// An utterance still in progress after this long is closed mid-speech so
/// a single run-on phrase cannot monopolize the capture loop.
pub const MAX_PHRASE_SECS: u64 = 10;

/// Default idle timeout in seconds.
///
/// Maximum wait with no speech at all before a capture attempt gives up
/// and the loop retries. Keeps the remaining-budget check responsive.
pub const SILENCE_TIMEOUT_SECS: u64 = 3;

/// Default pause threshold in milliseconds.
///
/// Silence of this duration after speech closes the utterance. 350ms keeps
/// dictation snappy while tolerating short intra-sentence pauses.
pub const PAUSE_MS: u32 = 350;

/// Default phrase-start threshold in milliseconds.
///
/// Minimum sustained energy above the speech threshold to count as an
/// utterance start. Filters out clicks and keyboard noise.
pub const PHRASE_START_MS: u32 = 100;

/// Default non-speaking pre-roll in milliseconds.
///
/// Silence samples kept in a ring buffer while idle, prepended when speech
/// starts. Captures soft onsets that occur before energy crosses the
/// threshold.
pub const NON_SPEAKING_MS: u32 = 200;

/// Default ambient-noise calibration duration in milliseconds.
pub const CALIBRATION_MS: u32 = 500;

/// Default multiplier applied to the calibrated noise floor.
///
/// The speech threshold is the ambient RMS scaled by this factor, which
/// reduces false-positive speech detection in noisy rooms.
pub const ENERGY_SCALE: f32 = 1.5;

/// Lower bound for the calibrated speech threshold.
///
/// A dead-silent room would otherwise calibrate to ~0 and treat any
/// electrical noise as speech.
pub const THRESHOLD_FLOOR: f32 = 0.01;

/// Default backpressure bound on in-flight recognition tasks.
///
/// Dispatch blocks once more than this many tasks are outstanding, waiting
/// for the first completion before capturing again.
pub const MAX_PENDING: usize = 4;

/// Default number of concurrent recognition workers.
pub const WORKERS: usize = 2;

/// Backoff after an unexpected capture failure, in milliseconds.
///
/// Prevents a tight error loop when the audio stream misbehaves.
pub const ERROR_BACKOFF_MS: u64 = 50;

/// Samples per frame delivered by the capture stream.
///
/// 1024 samples at 16kHz is 64ms, fine-grained enough for the pause and
/// phrase-start timers.
pub const FRAME_SAMPLES: usize = 1024;

/// Default Whisper model path for the recognition backend.
pub const MODEL_PATH: &str = "models/ggml-base.bin";
