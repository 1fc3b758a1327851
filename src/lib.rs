//! dictalog - hands-free dictation logger
//!
//! Listens to the microphone for a fixed wall-clock duration, segments the
//! stream into utterances, recognizes them on a small pool of concurrent
//! workers, and appends each result to a transcript file as a
//! `HH:MM:SS : <text>` line stamped at recognition completion.
//!
//! # Architecture
//!
//! ```text
//! MicSource (cpal) -> Segmenter -> Scheduler -> RecognitionPool -> FileSink
//!                                  (run budget)  (whisper workers)
//! ```
//!
//! The scheduler thread is the only consumer of audio; dispatch applies
//! backpressure once too many recognition tasks are in flight, and the run
//! always drains outstanding work before exiting.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod recognize;
pub mod report;
pub mod transcript;

#[cfg(all(feature = "cli", feature = "cpal-audio"))]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;

pub use audio::source::{AudioSegment, MockUtteranceSource, UtteranceSource};
pub use config::Config;
pub use error::{DictalogError, Result};
pub use pipeline::{PipelineConfig, RecognitionPool, RunPhase, RunSummary, Scheduler};
pub use recognize::{MockRecognizer, RecognitionError, RecognitionResult, Recognizer};
pub use report::{CollectingReporter, ErrorReporter, StderrReporter};
pub use transcript::{CollectorSink, FileSink, TranscriptSink};
