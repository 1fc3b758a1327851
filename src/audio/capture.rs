//! Real microphone capture using CPAL (Cross-Platform Audio Library).
//!
//! The cpal callback pushes converted i16 frames into a crossbeam channel;
//! [`MicSource`] consumes them on the capture thread and runs the
//! [`Segmenter`] endpointing state machine over them.

use crate::audio::segmenter::{rms, SegmentEvent, Segmenter, SegmenterConfig};
use crate::audio::source::{AudioSegment, UtteranceSource};
use crate::config::Config;
use crate::defaults;
use crate::error::{DictalogError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers when
/// probing audio backends. The messages are harmless but would tear through
/// the progress line.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// List available audio input device names.
pub fn list_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.collect::<Vec<_>>())
    })
    .map_err(|e| DictalogError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    Ok(devices
        .into_iter()
        .filter_map(|device| device.name().ok())
        .collect())
}

/// Find an input device by name, or the system default when `name` is None.
fn find_device(name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        match name {
            Some(wanted) => {
                let devices = host
                    .input_devices()
                    .map_err(|e| DictalogError::AudioCapture {
                        message: format!("Failed to enumerate input devices: {}", e),
                    })?;
                for device in devices {
                    if let Ok(device_name) = device.name()
                        && device_name == wanted
                    {
                        return Ok(device);
                    }
                }
                Err(DictalogError::AudioDeviceNotFound {
                    device: wanted.to_string(),
                })
            }
            None => host
                .default_input_device()
                .ok_or_else(|| DictalogError::AudioDeviceNotFound {
                    device: "default".to_string(),
                }),
        }
    })
}

/// Tuning for the microphone source, resolved once from [`Config`].
#[derive(Debug, Clone)]
pub struct MicConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub pause: Duration,
    pub phrase_start: Duration,
    pub non_speaking: Duration,
    pub energy_scale: f32,
}

impl From<&Config> for MicConfig {
    fn from(config: &Config) -> Self {
        Self {
            device: config.audio.device.clone(),
            sample_rate: config.audio.sample_rate,
            pause: Duration::from_millis(config.audio.pause_ms as u64),
            phrase_start: Duration::from_millis(config.audio.phrase_start_ms as u64),
            non_speaking: Duration::from_millis(config.audio.non_speaking_ms as u64),
            energy_scale: config.audio.energy_scale,
        }
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is created and dropped on the capture thread and its
/// methods are never called concurrently; it only needs to move with the
/// owning MicSource.
struct SendableStream(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone utterance source.
///
/// Opening the source starts the input stream immediately; failure to
/// acquire the device here is the one fatal error of the pipeline.
pub struct MicSource {
    _stream: SendableStream,
    frames: Receiver<Vec<i16>>,
    config: MicConfig,
    /// Speech threshold derived by `calibrate`; None until calibration ran.
    threshold: Option<f32>,
}

impl MicSource {
    /// Open the configured input device and start streaming frames.
    pub fn open(config: MicConfig) -> Result<Self> {
        let device = find_device(config.device.as_deref())?;

        let (frame_tx, frames) = crossbeam_channel::unbounded();
        let stream = build_input_stream(&device, config.sample_rate, frame_tx)?;

        stream.play().map_err(|e| DictalogError::AudioCapture {
            message: format!("Failed to start input stream: {}", e),
        })?;

        Ok(Self {
            _stream: SendableStream(stream),
            frames,
            config,
            threshold: None,
        })
    }

    /// Receive the next frame, mapping stream loss to a capture error.
    fn next_frame(&self) -> Result<Vec<i16>> {
        // Frames arrive every ~64ms while the stream is healthy; a second of
        // silence on the channel means the stream died.
        match self.frames.recv_timeout(Duration::from_secs(1)) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(DictalogError::AudioCapture {
                message: "audio stream stalled (no frames for 1s)".to_string(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(DictalogError::AudioCapture {
                message: "audio stream closed".to_string(),
            }),
        }
    }
}

impl UtteranceSource for MicSource {
    fn calibrate(&mut self, duration: Duration) -> Result<f32> {
        // Discard anything buffered before the calibration window.
        while self.frames.try_recv().is_ok() {}

        let started = Instant::now();
        let mut level_sum = 0.0f64;
        let mut frame_count = 0u32;

        while started.elapsed() < duration {
            let frame = self.next_frame()?;
            level_sum += rms(&frame) as f64;
            frame_count += 1;
        }

        let ambient = if frame_count == 0 {
            0.0
        } else {
            (level_sum / frame_count as f64) as f32
        };

        let threshold = (ambient * self.config.energy_scale).max(defaults::THRESHOLD_FLOOR);
        self.threshold = Some(threshold);
        Ok(threshold)
    }

    fn capture(
        &mut self,
        silence_timeout: Duration,
        max_phrase: Duration,
    ) -> Result<AudioSegment> {
        let threshold = self.threshold.ok_or_else(|| DictalogError::AudioCapture {
            message: "capture called before ambient calibration".to_string(),
        })?;

        let mut segmenter = Segmenter::new(
            SegmenterConfig {
                threshold,
                pause: self.config.pause,
                phrase_start: self.config.phrase_start,
                non_speaking: self.config.non_speaking,
                silence_timeout,
                max_phrase,
            },
            self.config.sample_rate,
        );

        let captured_at = Instant::now();
        loop {
            let frame = self.next_frame()?;
            match segmenter.push(&frame) {
                SegmentEvent::Pending => {}
                SegmentEvent::TimedOut => return Err(DictalogError::NoSpeechTimeout),
                SegmentEvent::Complete(samples) => {
                    return Ok(AudioSegment {
                        samples,
                        sample_rate: self.config.sample_rate,
                        captured_at,
                    });
                }
            }
        }
    }
}

/// Build an input stream that delivers i16 mono frames at `target_rate`.
///
/// Prefers the device's native format when it already matches; otherwise
/// converts in the callback (channel averaging + nearest-sample resampling).
fn build_input_stream(
    device: &cpal::Device,
    target_rate: u32,
    frame_tx: Sender<Vec<i16>>,
) -> Result<cpal::Stream> {
    let supported = device
        .default_input_config()
        .map_err(|e| DictalogError::AudioCapture {
            message: format!("Failed to query input config: {}", e),
        })?;

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let channels = stream_config.channels as usize;
    let device_rate = stream_config.sample_rate.0;

    let err_fn = |e| eprintln!("dictalog: audio stream error: {}", e);

    let stream = match sample_format {
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let mono = downmix_i16(data, channels);
                    push_resampled(&mono, device_rate, target_rate, &frame_tx);
                },
                err_fn,
                None,
            )
            .map_err(|e| DictalogError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })?,
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = downmix_f32(data, channels);
                    push_resampled(&mono, device_rate, target_rate, &frame_tx);
                },
                err_fn,
                None,
            )
            .map_err(|e| DictalogError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })?,
        other => {
            return Err(DictalogError::AudioCapture {
                message: format!("Unsupported sample format: {:?}", other),
            });
        }
    };

    Ok(stream)
}

/// Average interleaved i16 channels down to mono.
fn downmix_i16(data: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Average interleaved f32 channels down to mono i16.
fn downmix_f32(data: &[f32], channels: usize) -> Vec<i16> {
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| {
            let mean: f32 = frame.iter().sum::<f32>() / frame.len() as f32;
            (mean.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect()
}

/// Resample mono samples to the target rate and send them as one frame.
fn push_resampled(mono: &[i16], from_rate: u32, to_rate: u32, tx: &Sender<Vec<i16>>) {
    let frame = if from_rate == to_rate || from_rate == 0 {
        mono.to_vec()
    } else {
        resample_nearest(mono, from_rate, to_rate)
    };

    if !frame.is_empty() {
        // Receiver gone means the source was dropped; nothing to do.
        tx.send(frame).ok();
    }
}

/// Nearest-sample resampling. Crude but adequate for speech endpointing and
/// 16kHz recognition input.
fn resample_nearest(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if samples.is_empty() {
        return Vec::new();
    }
    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    (0..out_len)
        .map(|i| {
            let src = (i as f64 * step) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_i16_stereo_averages_channels() {
        let data = vec![100i16, 200, -100, 100];
        assert_eq!(downmix_i16(&data, 2), vec![150, 0]);
    }

    #[test]
    fn test_downmix_i16_mono_passthrough() {
        let data = vec![1i16, 2, 3];
        assert_eq!(downmix_i16(&data, 1), data);
    }

    #[test]
    fn test_downmix_f32_full_scale() {
        let data = vec![1.0f32, 1.0];
        let mono = downmix_f32(&data, 2);
        assert_eq!(mono, vec![i16::MAX]);
    }

    #[test]
    fn test_downmix_f32_clamps_out_of_range() {
        let data = vec![2.0f32, -3.0];
        let mono = downmix_f32(&data, 1);
        assert_eq!(mono, vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_resample_halves_sample_count() {
        let samples: Vec<i16> = (0..100).collect();
        let out = resample_nearest(&samples, 32000, 16000);
        assert_eq!(out.len(), 50);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 2);
    }

    #[test]
    fn test_resample_identity_when_rates_match() {
        let samples = vec![5i16; 64];
        let out = resample_nearest(&samples, 16000, 16000);
        assert_eq!(out, samples);
    }

    #[test]
    fn test_mic_config_from_config() {
        let config = Config::default();
        let mic = MicConfig::from(&config);
        assert_eq!(mic.sample_rate, 16000);
        assert_eq!(mic.pause, Duration::from_millis(350));
        assert_eq!(mic.phrase_start, Duration::from_millis(100));
        assert_eq!(mic.non_speaking, Duration::from_millis(200));
        assert_eq!(mic.energy_scale, 1.5);
        assert_eq!(mic.device, None);
    }
}
