//! Append-only transcript output.
//!
//! Lines are stamped with the wall-clock time at recognition completion,
//! not at capture — completions may arrive out of capture order because
//! recognition latency varies per segment.

use crate::error::{DictalogError, Result};
use crate::report;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Format one transcript line: `HH:MM:SS : <text>`.
pub fn format_line(text: &str) -> String {
    format!("{} : {}", Local::now().format("%H:%M:%S"), text)
}

/// Pluggable transcript output.
///
/// `record` is called concurrently from completing recognition workers;
/// implementations must never interleave partial lines.
pub trait TranscriptSink: Send + Sync {
    /// Append one recognized text as a timestamped line.
    fn record(&self, text: &str) -> Result<()>;
}

/// File-backed sink: appends `HH:MM:SS : <text>` lines to the log and
/// optionally echoes them to the operator feed (stderr).
pub struct FileSink {
    file: Mutex<File>,
    path: PathBuf,
    echo: bool,
}

impl FileSink {
    /// Open (creating if absent) the log file in append mode.
    pub fn open(path: &Path, echo: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DictalogError::TranscriptWrite {
                message: format!("cannot open {}: {}", path.display(), e),
            })?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
            echo,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptSink for FileSink {
    fn record(&self, text: &str) -> Result<()> {
        let line = format_line(text);

        {
            // Lock held across write + flush so concurrent completions
            // cannot tear a line.
            let mut file = self.file.lock().map_err(|e| DictalogError::TranscriptWrite {
                message: format!("log lock poisoned: {}", e),
            })?;
            writeln!(file, "{}", line).map_err(|e| DictalogError::TranscriptWrite {
                message: e.to_string(),
            })?;
            file.flush().map_err(|e| DictalogError::TranscriptWrite {
                message: e.to_string(),
            })?;
        }

        if self.echo {
            report::eprintln_clear(&line);
        }

        Ok(())
    }
}

/// In-memory sink for tests: collects raw text in completion order.
#[derive(Default)]
pub struct CollectorSink {
    lines: Mutex<Vec<String>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl TranscriptSink for CollectorSink {
    fn record(&self, text: &str) -> Result<()> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn is_well_formed(line: &str) -> bool {
        // HH:MM:SS : <text>
        let Some((stamp, text)) = line.split_once(" : ") else {
            return false;
        };
        let parts: Vec<&str> = stamp.split(':').collect();
        parts.len() == 3
            && parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit()))
            && !text.is_empty()
    }

    #[test]
    fn test_format_line_shape() {
        let line = format_line("hello world");
        assert!(is_well_formed(&line), "malformed line: {}", line);
        assert!(line.ends_with(" : hello world"));
    }

    #[test]
    fn test_file_sink_creates_file_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.txt");

        let sink = FileSink::open(&path, false).unwrap();
        assert!(path.exists());

        sink.record("first").unwrap();
        sink.record("second").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" : first"));
        assert!(lines[1].ends_with(" : second"));
        assert!(lines.iter().all(|l| is_well_formed(l)));
    }

    #[test]
    fn test_file_sink_reopen_appends_not_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.txt");

        FileSink::open(&path, false).unwrap().record("one").unwrap();
        FileSink::open(&path, false).unwrap().record("two").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_file_sink_concurrent_records_never_tear_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        let sink = Arc::new(FileSink::open(&path, false).unwrap());

        let mut handles = Vec::new();
        for worker in 0..4 {
            let sink = Arc::clone(&sink);
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    sink.record(&format!("worker {} line {}", worker, i)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 100);
        assert!(lines.iter().all(|l| is_well_formed(l)));
    }

    #[test]
    fn test_collector_sink_preserves_order_of_calls() {
        let sink = CollectorSink::new();
        sink.record("a").unwrap();
        sink.record("b").unwrap();
        assert_eq!(sink.lines(), vec!["a".to_string(), "b".to_string()]);
    }
}
