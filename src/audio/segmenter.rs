//! Utterance endpointing over a stream of audio frames.
//!
//! The [`Segmenter`] is a pure state machine: time advances by the sample
//! count of each pushed frame, so it is deterministic and testable without
//! a device or a clock. The capture source feeds it frames and acts on the
//! returned [`SegmentEvent`].

use std::collections::VecDeque;
use std::time::Duration;

/// Tuning for utterance endpointing.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// RMS threshold for detecting speech (0.0 to 1.0), from calibration.
    pub threshold: f32,
    /// Silence duration after speech that closes the utterance.
    pub pause: Duration,
    /// Minimum sustained speech to count as an utterance start.
    pub phrase_start: Duration,
    /// Pre-roll of idle frames prepended at speech onset.
    pub non_speaking: Duration,
    /// Max wait with no speech at all before the capture times out.
    pub silence_timeout: Duration,
    /// Hard cutoff per utterance.
    pub max_phrase: Duration,
}

/// Endpointing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// No speech yet; idle frames accumulate in the pre-roll ring.
    Idle,
    /// Energy above threshold, waiting for it to sustain `phrase_start`.
    Onset,
    /// Confirmed utterance in progress.
    Speaking,
}

/// Outcome of pushing one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Utterance not finished yet; feed more frames.
    Pending,
    /// `silence_timeout` elapsed with no speech detected at all.
    TimedOut,
    /// Utterance closed; contains pre-roll + speech samples.
    Complete(Vec<i16>),
}

pub struct Segmenter {
    config: SegmenterConfig,
    sample_rate: u32,
    state: SegmenterState,
    /// Idle samples kept for onset pre-roll, capped at `non_speaking`.
    preroll: VecDeque<i16>,
    /// Onset + speech samples of the utterance being built.
    buffer: Vec<i16>,
    idle_elapsed: Duration,
    onset_run: Duration,
    speech_elapsed: Duration,
    silence_run: Duration,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
            state: SegmenterState::Idle,
            preroll: VecDeque::new(),
            buffer: Vec::new(),
            idle_elapsed: Duration::ZERO,
            onset_run: Duration::ZERO,
            speech_elapsed: Duration::ZERO,
            silence_run: Duration::ZERO,
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Process one frame of 16-bit PCM samples.
    pub fn push(&mut self, frame: &[i16]) -> SegmentEvent {
        let frame_duration = self.frame_duration(frame.len());
        let is_speech = rms(frame) > self.config.threshold;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Onset;
                    self.onset_run = frame_duration;
                    self.buffer.extend_from_slice(frame);
                    self.maybe_confirm_speech();
                    SegmentEvent::Pending
                } else {
                    self.extend_preroll(frame);
                    self.idle_elapsed += frame_duration;
                    if self.idle_elapsed >= self.config.silence_timeout {
                        SegmentEvent::TimedOut
                    } else {
                        SegmentEvent::Pending
                    }
                }
            }
            SegmenterState::Onset => {
                if is_speech {
                    self.onset_run += frame_duration;
                    self.buffer.extend_from_slice(frame);
                    self.maybe_confirm_speech();
                    SegmentEvent::Pending
                } else {
                    // False start (click, cough). The candidate samples become
                    // pre-roll and the idle timer keeps running.
                    self.idle_elapsed += self.onset_run + frame_duration;
                    self.onset_run = Duration::ZERO;
                    let candidate = std::mem::take(&mut self.buffer);
                    self.extend_preroll(&candidate);
                    self.extend_preroll(frame);
                    self.state = SegmenterState::Idle;
                    if self.idle_elapsed >= self.config.silence_timeout {
                        SegmentEvent::TimedOut
                    } else {
                        SegmentEvent::Pending
                    }
                }
            }
            SegmenterState::Speaking => {
                self.buffer.extend_from_slice(frame);
                self.speech_elapsed += frame_duration;

                if is_speech {
                    self.silence_run = Duration::ZERO;
                } else {
                    self.silence_run += frame_duration;
                    if self.silence_run >= self.config.pause {
                        return SegmentEvent::Complete(self.finish());
                    }
                }

                if self.speech_elapsed >= self.config.max_phrase {
                    // Hard cutoff mid-speech.
                    return SegmentEvent::Complete(self.finish());
                }

                SegmentEvent::Pending
            }
        }
    }

    fn maybe_confirm_speech(&mut self) {
        if self.onset_run >= self.config.phrase_start {
            self.state = SegmenterState::Speaking;
            self.speech_elapsed = self.onset_run;
            self.silence_run = Duration::ZERO;
        }
    }

    /// Assemble pre-roll + utterance samples and reset for reuse.
    fn finish(&mut self) -> Vec<i16> {
        let mut segment: Vec<i16> = self.preroll.drain(..).collect();
        segment.append(&mut self.buffer);

        self.state = SegmenterState::Idle;
        self.idle_elapsed = Duration::ZERO;
        self.onset_run = Duration::ZERO;
        self.speech_elapsed = Duration::ZERO;
        self.silence_run = Duration::ZERO;

        segment
    }

    fn extend_preroll(&mut self, samples: &[i16]) {
        self.preroll.extend(samples.iter().copied());
        let cap = self.preroll_capacity();
        while self.preroll.len() > cap {
            self.preroll.pop_front();
        }
    }

    fn preroll_capacity(&self) -> usize {
        (self.config.non_speaking.as_secs_f64() * self.sample_rate as f64) as usize
    }

    fn frame_duration(&self, samples: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }
}

/// Normalized RMS of 16-bit PCM samples (0.0 silence, ~0.707 full-scale sine).
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;
    /// 100ms of samples at 16kHz.
    const FRAME: usize = 1600;

    fn config() -> SegmenterConfig {
        SegmenterConfig {
            threshold: 0.02,
            pause: Duration::from_millis(300),
            phrase_start: Duration::from_millis(200),
            non_speaking: Duration::from_millis(200),
            silence_timeout: Duration::from_millis(500),
            max_phrase: Duration::from_secs(2),
        }
    }

    fn silence() -> Vec<i16> {
        vec![0i16; FRAME]
    }

    fn speech() -> Vec<i16> {
        vec![5000i16; FRAME] // RMS ~0.15, well above 0.02
    }

    #[test]
    fn test_rms_silence_is_zero() {
        assert_eq!(rms(&silence()), 0.0);
    }

    #[test]
    fn test_rms_max_amplitude() {
        let full = vec![i16::MAX; FRAME];
        let value = rms(&full);
        assert!((value - 1.0).abs() < 0.001, "RMS should be ~1.0, got {}", value);
    }

    #[test]
    fn test_rms_empty_samples() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_times_out_on_pure_silence() {
        let mut seg = Segmenter::new(config(), RATE);
        for _ in 0..4 {
            assert_eq!(seg.push(&silence()), SegmentEvent::Pending);
        }
        // 5th frame crosses the 500ms timeout
        assert_eq!(seg.push(&silence()), SegmentEvent::TimedOut);
    }

    #[test]
    fn test_utterance_closed_by_pause() {
        let mut seg = Segmenter::new(config(), RATE);

        // 3 frames of speech (300ms, past the 200ms phrase start)
        for _ in 0..3 {
            assert_eq!(seg.push(&speech()), SegmentEvent::Pending);
        }
        assert_eq!(seg.state(), SegmenterState::Speaking);

        // 2 frames of silence (200ms) — not yet a pause
        assert_eq!(seg.push(&silence()), SegmentEvent::Pending);
        assert_eq!(seg.push(&silence()), SegmentEvent::Pending);

        // 3rd silent frame reaches the 300ms pause
        match seg.push(&silence()) {
            SegmentEvent::Complete(samples) => {
                let speech_samples = samples.iter().filter(|&&s| s == 5000).count();
                assert_eq!(speech_samples, 3 * FRAME);
            }
            other => panic!("expected Complete, got {:?}", other),
        }
        assert_eq!(seg.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_preroll_prepended_at_onset() {
        let mut seg = Segmenter::new(config(), RATE);

        // Idle silence fills the pre-roll ring
        seg.push(&silence());
        seg.push(&silence());

        // Speak past phrase start, then pause out
        for _ in 0..3 {
            seg.push(&speech());
        }
        let mut event = SegmentEvent::Pending;
        for _ in 0..3 {
            event = seg.push(&silence());
        }

        match event {
            SegmentEvent::Complete(samples) => {
                // Segment starts with pre-roll zeros, capped at non_speaking (200ms)
                let leading_zeros = samples.iter().take_while(|&&s| s == 0).count();
                assert_eq!(leading_zeros, 2 * FRAME);
                assert_eq!(samples[leading_zeros], 5000);
            }
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_click_shorter_than_phrase_start_is_ignored() {
        let mut seg = Segmenter::new(config(), RATE);

        // Single 100ms burst, below the 200ms phrase-start threshold
        assert_eq!(seg.push(&speech()), SegmentEvent::Pending);
        assert_eq!(seg.state(), SegmenterState::Onset);

        assert_eq!(seg.push(&silence()), SegmentEvent::Pending);
        assert_eq!(seg.state(), SegmenterState::Idle);

        // Idle time kept running through the false start; timeout still fires
        seg.push(&silence());
        seg.push(&silence());
        assert_eq!(seg.push(&silence()), SegmentEvent::TimedOut);
    }

    #[test]
    fn test_hard_cutoff_at_max_phrase() {
        let mut seg = Segmenter::new(config(), RATE);

        // Continuous speech; max_phrase is 2s = 20 frames
        let mut completed = None;
        for i in 0..30 {
            match seg.push(&speech()) {
                SegmentEvent::Complete(samples) => {
                    completed = Some((i, samples));
                    break;
                }
                SegmentEvent::Pending => {}
                SegmentEvent::TimedOut => panic!("unexpected timeout"),
            }
        }

        let (frame_index, samples) = completed.expect("utterance should hit the hard cutoff");
        assert_eq!(frame_index, 19); // 20th frame reaches 2s
        assert_eq!(samples.len(), 20 * FRAME);
    }

    #[test]
    fn test_brief_silence_does_not_close_utterance() {
        let mut seg = Segmenter::new(config(), RATE);

        for _ in 0..3 {
            seg.push(&speech());
        }
        // 100ms silence gap, below the 300ms pause
        assert_eq!(seg.push(&silence()), SegmentEvent::Pending);
        // Speech resumes; silence run resets
        assert_eq!(seg.push(&speech()), SegmentEvent::Pending);
        assert_eq!(seg.state(), SegmenterState::Speaking);
    }

    #[test]
    fn test_segmenter_reusable_after_completion() {
        let mut seg = Segmenter::new(config(), RATE);

        for _ in 0..3 {
            seg.push(&speech());
        }
        let mut first = SegmentEvent::Pending;
        for _ in 0..3 {
            first = seg.push(&silence());
        }
        assert!(matches!(first, SegmentEvent::Complete(_)));

        // Second utterance on the same segmenter
        for _ in 0..3 {
            seg.push(&speech());
        }
        let mut second = SegmentEvent::Pending;
        for _ in 0..3 {
            second = seg.push(&silence());
        }
        assert!(matches!(second, SegmentEvent::Complete(_)));
    }
}
