//! Run loop: capture, dispatch, drain, within a fixed wall-clock budget.

use crate::audio::source::UtteranceSource;
use crate::config::Config;
use crate::error::{DictalogError, Result};
use crate::pipeline::pool::RecognitionPool;
use crate::recognize::Recognizer;
use crate::report::{self, ErrorReporter};
use crate::transcript::TranscriptSink;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pipeline tuning resolved once at startup; read-only afterwards.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Wall-clock budget for the listening phase.
    pub run_duration: Duration,
    /// Language tag passed to the recognizer.
    pub language: String,
    /// Hard cutoff per utterance.
    pub max_phrase: Duration,
    /// Max wait with no speech before a capture attempt retries.
    pub silence_timeout: Duration,
    /// Ambient-noise calibration pass duration.
    pub calibration: Duration,
    /// Backpressure bound on in-flight recognition tasks.
    pub max_pending: usize,
    /// Concurrent recognition workers.
    pub workers: usize,
    /// Backoff after an unexpected capture failure.
    pub error_backoff: Duration,
    /// Suppress the progress line.
    pub quiet: bool,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            run_duration: Duration::from_secs(config.run.duration_secs),
            language: config.recognition.language.clone(),
            max_phrase: Duration::from_secs(config.audio.max_phrase_secs),
            silence_timeout: Duration::from_secs(config.audio.silence_timeout_secs),
            calibration: Duration::from_millis(config.audio.calibration_ms as u64),
            max_pending: config.recognition.max_pending,
            workers: config.recognition.workers,
            error_backoff: Duration::from_millis(crate::defaults::ERROR_BACKOFF_MS),
            quiet: false,
        }
    }
}

/// Run loop phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Configuration resolved, components constructed.
    Starting,
    /// Ambient-noise calibration pass in progress.
    Calibrating,
    /// Capturing and dispatching utterances.
    Listening,
    /// Budget exhausted; waiting for outstanding recognition.
    Draining,
    /// Terminal; no further capture or dispatch.
    Stopped,
}

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Utterances captured (equals segments dispatched).
    pub captures: u64,
    /// Capture attempts that timed out with no speech.
    pub idle_timeouts: u64,
    /// Capture attempts that failed unexpectedly.
    pub capture_errors: u64,
    /// Total wall-clock time including draining.
    pub elapsed: Duration,
}

/// Orchestrates one bounded dictation run.
///
/// Single-threaded: this is the only place that blocks on audio I/O, and
/// the only caller of the pool's dispatch/drain.
pub struct Scheduler<S: UtteranceSource> {
    config: PipelineConfig,
    source: S,
    recognizer: Arc<dyn Recognizer>,
    sink: Arc<dyn TranscriptSink>,
    reporter: Arc<dyn ErrorReporter>,
    phase: RunPhase,
}

impl<S: UtteranceSource> Scheduler<S> {
    pub fn new(
        config: PipelineConfig,
        source: S,
        recognizer: Arc<dyn Recognizer>,
        sink: Arc<dyn TranscriptSink>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            config,
            source,
            recognizer,
            sink,
            reporter,
            phase: RunPhase::Starting,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run to completion: calibrate, listen for the whole budget, drain.
    ///
    /// Per-segment failures are contained; the only errors that propagate
    /// are audio acquisition/calibration failure and total worker loss.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.phase = RunPhase::Calibrating;
        let threshold = self.source.calibrate(self.config.calibration)?;
        if !self.config.quiet {
            report::eprintln_clear(&format!(
                "dictalog: calibrated (speech threshold {:.4})",
                threshold
            ));
        }

        let mut pool = RecognitionPool::start(
            self.config.workers,
            self.config.max_pending,
            Arc::clone(&self.recognizer),
            Arc::clone(&self.sink),
            Arc::clone(&self.reporter),
            self.config.language.clone(),
        );

        let mut summary = RunSummary::default();

        // The budget is measured from entry into Listening and re-checked
        // every iteration, so a long capture can overshoot it by at most one
        // phrase duration.
        self.phase = RunPhase::Listening;
        let started = Instant::now();

        loop {
            let Some(remaining) = self.config.run_duration.checked_sub(started.elapsed()) else {
                break;
            };
            if !self.config.quiet {
                report::progress(&format!("Time left: {}s ", remaining.as_secs()));
            }

            match self
                .source
                .capture(self.config.silence_timeout, self.config.max_phrase)
            {
                Ok(segment) => {
                    pool.dispatch(segment)?;
                    summary.captures += 1;
                }
                // Quiet stretch: nothing to dispatch, retry immediately.
                Err(DictalogError::NoSpeechTimeout) => {
                    summary.idle_timeouts += 1;
                }
                Err(e) => {
                    summary.capture_errors += 1;
                    self.reporter.report("capture", &e.to_string());
                    std::thread::sleep(self.config.error_backoff);
                }
            }
        }

        self.phase = RunPhase::Draining;
        if !self.config.quiet {
            report::eprintln_clear("dictalog: time budget spent, draining recognition...");
        }
        pool.shutdown();

        self.phase = RunPhase::Stopped;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}
