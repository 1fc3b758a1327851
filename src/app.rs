//! Composition root: wires the real microphone, recognizer and transcript
//! file into a scheduler and runs it.

use crate::audio::capture::{MicConfig, MicSource};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{PipelineConfig, RunSummary, Scheduler};
use crate::recognize::Recognizer;
use crate::report::StderrReporter;
use crate::transcript::FileSink;
use std::sync::Arc;

/// Run one dictation session with the given configuration.
///
/// Blocks for the whole run duration plus recognition drain.
pub fn run(config: &Config, quiet: bool) -> Result<RunSummary> {
    config.validate()?;

    let sink = Arc::new(FileSink::open(&config.run.output, !quiet)?);
    let reporter = Arc::new(StderrReporter);
    let recognizer = build_recognizer(config)?;

    let source = MicSource::open(MicConfig::from(config))?;

    let mut pipeline_config = PipelineConfig::from(config);
    pipeline_config.quiet = quiet;

    let mut scheduler = Scheduler::new(pipeline_config, source, recognizer, sink, reporter);
    scheduler.run()
}

#[cfg(feature = "whisper")]
fn build_recognizer(config: &Config) -> Result<Arc<dyn Recognizer>> {
    use crate::recognize::whisper::{WhisperConfig, WhisperRecognizer};

    let recognizer = WhisperRecognizer::new(WhisperConfig {
        model_path: config.recognition.model.clone(),
        threads: None,
    })?;
    Ok(Arc::new(recognizer))
}

#[cfg(not(feature = "whisper"))]
fn build_recognizer(_config: &Config) -> Result<Arc<dyn Recognizer>> {
    Err(crate::error::DictalogError::RecognizerInit {
        message: "built without the `whisper` feature; no recognition backend available"
            .to_string(),
    })
}
