//! Interactive session state
//!
//! Holds what the user picked (files, folder, quality) and drives the batch
//! lifecycle. It is independent of any toolkit: a front end calls these
//! methods from its event handlers and renders the returned labels and
//! notifications.

use crate::batch::{dedup_paths, BatchState, CancelToken, ConversionJob, ConversionResult};
use crate::encode::{EncoderConfig, OutputFormat, Quality};
use crate::estimate::{SizeEstimate, SizeEstimator};
use crate::raw::RawDecoder;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Messages the original tool showed as modal dialogs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NoFiles,
    NoFolder,
    Busy,
    Completed { succeeded: usize, total: usize },
    Cancelled { succeeded: usize, total: usize },
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::NoFiles => "No Files",
            Notification::NoFolder => "No Folder",
            Notification::Busy => "Busy",
            Notification::Completed { .. } => "Conversion Complete",
            Notification::Cancelled { .. } => "Cancelled",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::NoFiles => write!(f, "Please select NEF files to convert."),
            Notification::NoFolder => write!(f, "Please select a destination folder."),
            Notification::Busy => write!(f, "A conversion is already running."),
            Notification::Completed { succeeded, total } => {
                write!(f, "Successfully converted {} of {} file(s).", succeeded, total)
            }
            Notification::Cancelled { succeeded, total } => {
                write!(f, "Conversion cancelled after {} of {} file(s).", succeeded, total)
            }
        }
    }
}

pub struct Session<'d> {
    decoder: &'d dyn RawDecoder,
    files: Vec<PathBuf>,
    destination: Option<PathBuf>,
    quality: Quality,
    format: OutputFormat,
    estimator: SizeEstimator,
    preview_failed: bool,
    state: BatchState,
    cancel: Option<CancelToken>,
}

impl<'d> Session<'d> {
    pub fn new(decoder: &'d dyn RawDecoder) -> Self {
        Self {
            decoder,
            files: Vec::new(),
            destination: None,
            quality: Quality::default(),
            format: OutputFormat::default(),
            estimator: SizeEstimator::new(EncoderConfig::default()),
            preview_failed: false,
            state: BatchState::Idle,
            cancel: None,
        }
    }

    pub fn decoder(&self) -> &'d dyn RawDecoder {
        self.decoder
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Replace the selection and load the first file as the estimate sample.
    /// An empty selection leaves everything as it was.
    pub fn select_files(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        let files = dedup_paths(paths);
        let Some(first) = files.first() else {
            return;
        };

        self.preview_failed = !self.estimator.load_sample(self.decoder, first);
        self.files = files;
        info!("Selected {} file(s)", self.files.len());
    }

    pub fn select_folder(&mut self, path: impl Into<PathBuf>) {
        self.destination = Some(path.into());
    }

    pub fn set_quality(&mut self, quality: Quality) -> SizeEstimate {
        self.quality = quality;
        self.estimate()
    }

    pub fn set_format(&mut self, format: OutputFormat) -> SizeEstimate {
        self.format = format;
        self.estimator.set_encoder(EncoderConfig::new(format, self.quality));
        self.estimate()
    }

    pub fn estimate(&self) -> SizeEstimate {
        self.estimator.estimate(self.quality)
    }

    pub fn estimate_label(&self) -> String {
        if self.preview_failed {
            return "Size estimate: Failed to load preview.".to_string();
        }
        self.estimate().to_string()
    }

    pub fn button_label(&self) -> String {
        match self.state {
            BatchState::Running => "Cancel".to_string(),
            BatchState::Cancelling => "Cancelling...".to_string(),
            _ => format!("Convert to {}", self.format.display_name()),
        }
    }

    /// Start a batch. Refuses (staying idle) when files or folder are missing.
    pub fn start(&mut self) -> Result<(ConversionJob, CancelToken), Notification> {
        if self.state.is_active() {
            return Err(Notification::Busy);
        }
        if self.files.is_empty() {
            return Err(Notification::NoFiles);
        }
        let Some(destination) = &self.destination else {
            return Err(Notification::NoFolder);
        };

        let job = ConversionJob::new(self.files.clone(), destination.clone(), self.quality)
            .with_format(self.format);
        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());
        self.state = BatchState::Running;

        Ok((job, cancel))
    }

    /// Ask a running batch to stop after its current item
    pub fn request_cancel(&mut self) -> bool {
        if self.state != BatchState::Running {
            return false;
        }
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        self.state = BatchState::Cancelling;
        true
    }

    /// Record the outcome of the batch started by [`Session::start`]
    pub fn finish(&mut self, result: &ConversionResult) -> Notification {
        self.cancel = None;
        if result.cancelled {
            self.state = BatchState::Cancelled;
            Notification::Cancelled {
                succeeded: result.succeeded,
                total: result.total,
            }
        } else {
            self.state = BatchState::Completed;
            Notification::Completed {
                succeeded: result.succeeded,
                total: result.total,
            }
        }
    }

    /// A batch that could not run at all; back to idle
    pub fn abort(&mut self) {
        self.cancel = None;
        self.state = BatchState::Idle;
    }
}
