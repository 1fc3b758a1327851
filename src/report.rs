//! Operator feed: non-fatal error reporting on stderr.

use std::io::Write;
use std::sync::Mutex;

/// Trait for reporting contained pipeline failures.
///
/// Per-segment failures never abort the run loop; they are surfaced here
/// and the loop continues.
pub trait ErrorReporter: Send + Sync {
    /// Reports a failure from a pipeline stage ("capture", "recognition",
    /// "transcript").
    fn report(&self, stage: &str, message: &str);
}

/// Default reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report(&self, stage: &str, message: &str) {
        eprintln_clear(&format!("[{}] {}", stage, message));
    }
}

/// Reporter that collects reports for test assertions.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<(String, String)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, stage: &str, message: &str) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((stage.to_string(), message.to_string()));
        }
    }
}

/// Print a message to stderr, clearing any active progress line first.
pub fn eprintln_clear(msg: &str) {
    eprint!("\r{:60}\r", "");
    eprintln!("{}", msg);
}

/// Overwrite the current stderr line with a progress message.
pub fn progress(msg: &str) {
    eprint!("\r{}", msg);
    std::io::stderr().flush().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_records_in_order() {
        let reporter = CollectingReporter::new();
        reporter.report("capture", "stream stalled");
        reporter.report("recognition", "service unavailable");

        let reports = reporter.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, "capture");
        assert_eq!(reports[1].1, "service unavailable");
    }

    #[test]
    fn test_stderr_reporter_does_not_panic() {
        StderrReporter.report("capture", "test error");
    }
}
