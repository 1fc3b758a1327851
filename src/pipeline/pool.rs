//! Bounded recognition worker pool with dispatch backpressure.
//!
//! Segments enter the pool in capture order over a job channel; a fixed set
//! of worker threads runs recognition and delivers results to the transcript
//! sink. Every job is acknowledged exactly once on a completion channel,
//! which is what the dispatcher counts to enforce the in-flight bound.

use crate::audio::source::AudioSegment;
use crate::error::{DictalogError, Result};
use crate::recognize::{RecognitionError, Recognizer};
use crate::report::ErrorReporter;
use crate::transcript::TranscriptSink;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Worker pool guarded by a wait-for-first-completion backpressure policy.
///
/// Only the scheduler thread calls [`dispatch`](Self::dispatch) and
/// [`drain`](Self::drain); workers only touch the channels, the recognizer
/// and the sink.
pub struct RecognitionPool {
    job_tx: Option<Sender<AudioSegment>>,
    done_rx: Receiver<()>,
    workers: Vec<JoinHandle<()>>,
    in_flight: usize,
    max_pending: usize,
}

impl RecognitionPool {
    /// Spawn `workers` recognition threads.
    pub fn start(
        workers: usize,
        max_pending: usize,
        recognizer: Arc<dyn Recognizer>,
        sink: Arc<dyn TranscriptSink>,
        reporter: Arc<dyn ErrorReporter>,
        language: String,
    ) -> Self {
        let (job_tx, job_rx) = unbounded::<AudioSegment>();
        let (done_tx, done_rx) = unbounded::<()>();

        let handles = (0..workers.max(1))
            .map(|index| {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let recognizer = Arc::clone(&recognizer);
                let sink = Arc::clone(&sink);
                let reporter = Arc::clone(&reporter);
                let language = language.clone();

                std::thread::Builder::new()
                    .name(format!("recognize-{}", index))
                    .spawn(move || {
                        worker_loop(&job_rx, &done_tx, &recognizer, &sink, &reporter, &language);
                    })
                    .unwrap_or_else(|e| panic!("failed to spawn recognition worker: {}", e))
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            done_rx,
            workers: handles,
            in_flight: 0,
            max_pending,
        }
    }

    /// Hand one segment to the pool.
    ///
    /// After enqueueing, blocks while more than `max_pending` tasks are
    /// outstanding, waiting for the first completion rather than for all of
    /// them — this minimizes the capture stall. The bound is checked after
    /// adding, so in-flight work briefly reaches `max_pending + 1` inside
    /// this call; by the time it returns the count is back within the bound.
    pub fn dispatch(&mut self, segment: AudioSegment) -> Result<()> {
        let job_tx = self.job_tx.as_ref().ok_or_else(|| {
            DictalogError::Other("dispatch after pool shutdown".to_string())
        })?;

        job_tx
            .send(segment)
            .map_err(|_| DictalogError::Other("recognition workers exited".to_string()))?;
        self.in_flight += 1;

        while self.in_flight > self.max_pending {
            match self.done_rx.recv() {
                Ok(()) => self.in_flight -= 1,
                Err(_) => {
                    return Err(DictalogError::Other(
                        "recognition workers exited".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Tasks dispatched but not yet terminal.
    ///
    /// Collects any completion acknowledgements that arrived since the last
    /// blocking wait before reporting the count.
    pub fn in_flight(&mut self) -> usize {
        while self.done_rx.try_recv().is_ok() {
            self.in_flight -= 1;
        }
        self.in_flight
    }

    /// Block until every dispatched task is terminal.
    pub fn drain(&mut self) {
        while self.in_flight > 0 {
            match self.done_rx.recv() {
                Ok(()) => self.in_flight -= 1,
                // Workers gone with jobs unacknowledged: nothing left to wait for.
                Err(_) => break,
            }
        }
    }

    /// Drain outstanding work, stop the workers, and join them.
    pub fn shutdown(mut self) {
        self.drain();
        // Closing the job channel ends the worker loops.
        drop(self.job_tx.take());

        for handle in self.workers.drain(..) {
            if let Err(panic_info) = handle.join() {
                let msg = panic_info
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                    .unwrap_or("unknown panic");
                eprintln!("dictalog: recognition worker panicked: {}", msg);
            }
        }
    }
}

fn worker_loop(
    job_rx: &Receiver<AudioSegment>,
    done_tx: &Sender<()>,
    recognizer: &Arc<dyn Recognizer>,
    sink: &Arc<dyn TranscriptSink>,
    reporter: &Arc<dyn ErrorReporter>,
    language: &str,
) {
    while let Ok(segment) = job_rx.recv() {
        match recognizer.recognize(&segment, language) {
            Ok(text) => {
                if let Err(e) = sink.record(&text) {
                    reporter.report("transcript", &e.to_string());
                }
            }
            // Expected-empty: nothing to record, nothing to report.
            Err(RecognitionError::Unrecognized) => {}
            Err(e @ RecognitionError::ServiceUnavailable(_)) => {
                reporter.report("recognition", &e.to_string());
            }
            Err(e @ RecognitionError::Unexpected(_)) => {
                reporter.report("recognition", &e.to_string());
            }
        }

        // Acknowledge exactly once, success or failure. A closed channel
        // means the dispatcher is gone; stop taking work.
        if done_tx.send(()).is_err() {
            break;
        }
    }
}
