//! Capture-to-transcript pipeline: a single scheduler thread feeds a bounded
//! pool of recognition workers.

pub mod pool;
pub mod scheduler;

pub use pool::RecognitionPool;
pub use scheduler::{PipelineConfig, RunPhase, RunSummary, Scheduler};
