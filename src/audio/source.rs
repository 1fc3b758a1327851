use crate::error::{DictalogError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One contiguous span of captured speech, bounded by silence on both sides
/// (or a hard duration cutoff).
///
/// Produced once per detected utterance. Ownership moves from the source to
/// the dispatched recognition task; the samples are never mutated after
/// capture.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// 16-bit PCM mono samples
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Wall-clock instant at which capture of this segment started
    pub captured_at: Instant,
}

impl AudioSegment {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            captured_at: Instant::now(),
        }
    }

    /// Audio duration implied by the sample count.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Trait for utterance-level audio sources.
///
/// This trait allows swapping implementations (real microphone vs mock).
pub trait UtteranceSource: Send {
    /// Observe ambient audio for `duration` and derive the speech energy
    /// threshold used to separate speech from background noise.
    ///
    /// Must run once before the first `capture` call.
    ///
    /// # Returns
    /// The derived threshold (normalized RMS, 0.0 to 1.0).
    fn calibrate(&mut self, duration: Duration) -> Result<f32>;

    /// Block until one utterance is captured.
    ///
    /// Returns when speech was detected and enough trailing silence followed
    /// to close the utterance, or when `max_phrase` elapsed mid-speech.
    ///
    /// # Errors
    /// `DictalogError::NoSpeechTimeout` if `silence_timeout` elapsed with no
    /// speech detected at all — the caller should retry immediately.
    fn capture(&mut self, silence_timeout: Duration, max_phrase: Duration)
    -> Result<AudioSegment>;
}

/// One scripted step for [`MockUtteranceSource`].
#[derive(Debug, Clone)]
pub enum ScriptedCapture {
    /// Capture succeeds with these samples.
    Utterance(Vec<i16>),
    /// Capture times out with no speech.
    Timeout,
    /// Capture fails with an unexpected error.
    Fail(String),
}

/// Scripted utterance source for tests.
///
/// Plays back a queue of [`ScriptedCapture`] steps, optionally sleeping on
/// each step to simulate a blocking capture call. Once the script is
/// exhausted every further capture reports `NoSpeechTimeout` (sleeping for
/// the requested `silence_timeout`, as a real quiet microphone would).
pub struct MockUtteranceSource {
    script: VecDeque<ScriptedCapture>,
    capture_delay: Duration,
    threshold: f32,
    calibrated: bool,
    sample_rate: u32,
    capture_log: Arc<Mutex<Vec<Instant>>>,
}

impl MockUtteranceSource {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            capture_delay: Duration::ZERO,
            threshold: 0.03,
            calibrated: false,
            sample_rate: 16000,
            capture_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful capture.
    pub fn push_utterance(mut self, samples: Vec<i16>) -> Self {
        self.script.push_back(ScriptedCapture::Utterance(samples));
        self
    }

    /// Queue a no-speech timeout.
    pub fn push_timeout(mut self) -> Self {
        self.script.push_back(ScriptedCapture::Timeout);
        self
    }

    /// Queue an unexpected capture failure.
    pub fn push_failure(mut self, message: &str) -> Self {
        self.script
            .push_back(ScriptedCapture::Fail(message.to_string()));
        self
    }

    /// Sleep this long inside every scripted capture, simulating the
    /// blocking listen on a real microphone.
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Threshold reported by `calibrate`.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Handle to the capture-call timestamps, usable after the source has
    /// been moved into a scheduler.
    pub fn capture_log(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.capture_log)
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }
}

impl Default for MockUtteranceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSource for MockUtteranceSource {
    fn calibrate(&mut self, _duration: Duration) -> Result<f32> {
        self.calibrated = true;
        Ok(self.threshold)
    }

    fn capture(
        &mut self,
        silence_timeout: Duration,
        _max_phrase: Duration,
    ) -> Result<AudioSegment> {
        if let Ok(mut log) = self.capture_log.lock() {
            log.push(Instant::now());
        }

        match self.script.pop_front() {
            Some(ScriptedCapture::Utterance(samples)) => {
                std::thread::sleep(self.capture_delay);
                Ok(AudioSegment::new(samples, self.sample_rate))
            }
            Some(ScriptedCapture::Timeout) => {
                std::thread::sleep(self.capture_delay.max(silence_timeout));
                Err(DictalogError::NoSpeechTimeout)
            }
            Some(ScriptedCapture::Fail(message)) => {
                std::thread::sleep(self.capture_delay);
                Err(DictalogError::AudioCapture { message })
            }
            None => {
                std::thread::sleep(silence_timeout);
                Err(DictalogError::NoSpeechTimeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_duration_from_sample_count() {
        let segment = AudioSegment::new(vec![0i16; 16000], 16000);
        assert_eq!(segment.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_segment_duration_zero_rate_is_zero() {
        let segment = AudioSegment::new(vec![0i16; 100], 0);
        assert_eq!(segment.duration(), Duration::ZERO);
    }

    #[test]
    fn test_mock_source_plays_script_in_order() {
        let mut source = MockUtteranceSource::new()
            .push_utterance(vec![1i16; 10])
            .push_timeout()
            .push_utterance(vec![2i16; 10]);

        let first = source.capture(Duration::ZERO, Duration::from_secs(10));
        assert_eq!(first.unwrap().samples, vec![1i16; 10]);

        let second = source.capture(Duration::ZERO, Duration::from_secs(10));
        assert!(matches!(second, Err(DictalogError::NoSpeechTimeout)));

        let third = source.capture(Duration::ZERO, Duration::from_secs(10));
        assert_eq!(third.unwrap().samples, vec![2i16; 10]);
    }

    #[test]
    fn test_mock_source_times_out_after_script() {
        let mut source = MockUtteranceSource::new();
        let result = source.capture(Duration::from_millis(1), Duration::from_secs(10));
        assert!(matches!(result, Err(DictalogError::NoSpeechTimeout)));
    }

    #[test]
    fn test_mock_source_scripted_failure() {
        let mut source = MockUtteranceSource::new().push_failure("stream stalled");
        let result = source.capture(Duration::ZERO, Duration::from_secs(10));
        match result {
            Err(DictalogError::AudioCapture { message }) => {
                assert_eq!(message, "stream stalled");
            }
            other => panic!("expected AudioCapture error, got {:?}", other.map(|s| s.samples)),
        }
    }

    #[test]
    fn test_mock_source_calibration_reports_threshold() {
        let mut source = MockUtteranceSource::new().with_threshold(0.05);
        assert!(!source.is_calibrated());
        let threshold = source.calibrate(Duration::from_millis(500)).unwrap();
        assert_eq!(threshold, 0.05);
        assert!(source.is_calibrated());
    }

    #[test]
    fn test_mock_source_records_capture_instants() {
        let mut source = MockUtteranceSource::new()
            .push_utterance(vec![0i16; 4])
            .push_utterance(vec![0i16; 4]);
        let log = source.capture_log();

        source.capture(Duration::ZERO, Duration::from_secs(1)).unwrap();
        source.capture(Duration::ZERO, Duration::from_secs(1)).unwrap();

        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
