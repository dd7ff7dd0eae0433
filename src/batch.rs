//! Sequential batch conversion with cooperative cancellation
//!
//! Files are converted one at a time in selection order. The cancel flag is
//! checked before each item and the caller's progress callback runs after
//! each item, so a front end can repaint and flip the flag between files.
//! A file that fails to decode, encode or write is logged and skipped.

use crate::encode::{EncoderConfig, OutputFormat, Quality};
use crate::error::{ConvertError, Result};
use crate::metrics::{ConversionMetrics, Timer};
use crate::raw::RawDecoder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Batch lifecycle: Idle -> Running -> {Completed | Cancelled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Idle,
    Running,
    /// Cancel requested, waiting for the current item to finish
    Cancelling,
    Completed,
    Cancelled,
}

impl BatchState {
    pub fn is_active(&self) -> bool {
        matches!(self, BatchState::Running | BatchState::Cancelling)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    inputs: Vec<PathBuf>,
    destination: PathBuf,
    encoder: EncoderConfig,
}

impl ConversionJob {
    /// Duplicate inputs are dropped, keeping the first occurrence.
    pub fn new(
        inputs: impl IntoIterator<Item = PathBuf>,
        destination: impl Into<PathBuf>,
        quality: Quality,
    ) -> Self {
        Self {
            inputs: dedup_paths(inputs),
            destination: destination.into(),
            encoder: EncoderConfig::new(OutputFormat::Jpeg, quality),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.encoder.format = format;
        self
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn quality(&self) -> Quality {
        self.encoder.quality
    }

    pub fn format(&self) -> OutputFormat {
        self.encoder.format
    }

    /// `<destination>/<stem>_Q<quality>.<ext>`
    pub fn output_path_for(&self, input: &Path) -> Option<PathBuf> {
        output_file_name(input, self.encoder.quality, self.encoder.format)
            .map(|name| self.destination.join(name))
    }

    fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(ConvertError::InvalidJob("no input files".to_string()));
        }
        if !self.destination.is_dir() {
            return Err(ConvertError::InvalidJob(format!(
                "destination {} is not a directory",
                self.destination.display()
            )));
        }
        Ok(())
    }
}

pub fn dedup_paths(inputs: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    inputs
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

pub fn output_file_name(input: &Path, quality: Quality, format: OutputFormat) -> Option<String> {
    let stem = input.file_stem()?.to_string_lossy();
    Some(format!("{}_Q{}.{}", stem, quality.value(), format.extension()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub total: usize,
    /// Items attempted before the run ended
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub outputs: Vec<PathBuf>,
}

/// Shared cancellation flag, checked between items
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Converted(PathBuf),
    Skipped(String),
}

/// Reported after every item
#[derive(Debug)]
pub struct Progress<'a> {
    pub processed: usize,
    pub total: usize,
    pub input: &'a Path,
    pub outcome: &'a ItemOutcome,
}

pub struct BatchConverter<'d> {
    decoder: &'d dyn RawDecoder,
    metrics: Arc<ConversionMetrics>,
}

impl<'d> BatchConverter<'d> {
    pub fn new(decoder: &'d dyn RawDecoder) -> Self {
        Self {
            decoder,
            metrics: ConversionMetrics::new(),
        }
    }

    pub fn with_metrics(decoder: &'d dyn RawDecoder, metrics: Arc<ConversionMetrics>) -> Self {
        Self { decoder, metrics }
    }

    pub fn metrics(&self) -> Arc<ConversionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the whole job. Errors only when the job itself is unusable; per
    /// file failures end up in `ConversionResult::failed`.
    pub fn run<F>(
        &self,
        job: &ConversionJob,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> Result<ConversionResult>
    where
        F: FnMut(&Progress<'_>),
    {
        job.validate()?;

        let total = job.inputs().len();
        let mut result = ConversionResult {
            total,
            ..ConversionResult::default()
        };

        info!(
            "Converting {} file(s) to {} at Q{} into {}",
            total,
            job.format().display_name(),
            job.quality(),
            job.destination().display()
        );

        for input in job.inputs() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }

            let timer = Timer::new();
            let outcome = match self.convert_one(job, input) {
                Ok((output, bytes)) => {
                    self.metrics.record_success(bytes, timer.elapsed_ms());
                    debug!("{} -> {} ({} bytes)", input.display(), output.display(), bytes);
                    result.succeeded += 1;
                    result.outputs.push(output.clone());
                    ItemOutcome::Converted(output)
                }
                Err(e) => {
                    self.metrics.record_failure(timer.elapsed_ms());
                    warn!("Error converting {}: {}", input.display(), e);
                    result.failed += 1;
                    ItemOutcome::Skipped(e.to_string())
                }
            };
            result.processed += 1;

            on_progress(&Progress {
                processed: result.processed,
                total,
                input,
                outcome: &outcome,
            });
        }

        // A cancel that arrived during the final item still counts
        if cancel.is_cancelled() {
            result.cancelled = true;
        }

        if result.cancelled {
            info!("Conversion cancelled after {} of {} file(s)", result.succeeded, total);
        } else {
            info!("Converted {} of {} file(s)", result.succeeded, total);
        }

        Ok(result)
    }

    fn convert_one(&self, job: &ConversionJob, input: &Path) -> Result<(PathBuf, u64)> {
        let output = job.output_path_for(input).ok_or_else(|| {
            ConvertError::InvalidJob(format!("{} has no file name", input.display()))
        })?;

        let decoded = self.decoder.decode(input)?;
        let encoded = job.encoder.encode(&decoded)?;
        std::fs::write(&output, &encoded)?;

        Ok((output, encoded.len() as u64))
    }
}
