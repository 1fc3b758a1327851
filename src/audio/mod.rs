//! Audio capture and utterance segmentation.
//!
//! `source` defines the capture seam (`UtteranceSource`), `segmenter` holds
//! the pure endpointing state machine, and `capture` is the real cpal-backed
//! microphone source.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod segmenter;
pub mod source;
