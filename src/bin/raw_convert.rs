// raw_convert - terminal front end
// Converts RAW files to JPEG/WebP with a size estimate, progress bar and Ctrl-C cancellation

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use raw_convert::{
    BatchConverter, BatchState, ConversionMetrics, ItemOutcome, OutputFormat, Quality,
    RawProcessor, Session,
};

static DECODER: RawProcessor = RawProcessor;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Jpeg,
    Webp,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => OutputFormat::Jpeg,
            FormatArg::Webp => OutputFormat::Webp,
        }
    }
}

#[derive(Parser)]
#[command(name = "raw_convert", version, about = "Convert camera RAW files to JPEG or WebP")]
struct Args {
    /// RAW files to convert, in order
    files: Vec<PathBuf>,

    /// Destination folder
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Compression quality (1-100)
    #[arg(short, long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Jpeg)]
    format: FormatArg,

    /// Only print the estimated output size for the first file
    #[arg(long)]
    estimate: bool,

    /// Create the destination folder if it does not exist
    #[arg(long)]
    create_dir: bool,

    /// Print the result and metrics as JSON
    #[arg(long)]
    json: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    for file in &args.files {
        if file.is_file() && !RawProcessor::is_raw_format(file) {
            warn!("{} does not look like a RAW file, trying standard decoders", file.display());
        }
    }

    let mut session = Session::new(&DECODER);
    session.select_files(args.files.iter().cloned());
    session.set_format(args.format.into());
    session.set_quality(Quality::new(args.quality));

    if args.estimate {
        println!("{}", session.estimate_label());
        return Ok(());
    }
    info!("{}", session.estimate_label());

    if let Some(dir) = &args.output_dir {
        if args.create_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        session.select_folder(dir);
    }

    let (job, cancel) = match session.start() {
        Ok(started) => started,
        Err(note) => anyhow::bail!("{}: {}", note.title(), note),
    };

    let pb = progress_bar(job.inputs().len() as u64, args.no_progress);
    pb.set_message(session.button_label());

    let metrics = ConversionMetrics::new();
    let mut handle = {
        let pb = pb.clone();
        let metrics = metrics.clone();
        let job = job.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            BatchConverter::with_metrics(&DECODER, metrics).run(&job, &cancel, |p| {
                if let ItemOutcome::Skipped(reason) = p.outcome {
                    pb.println(format!("Skipped {}: {}", p.input.display(), reason));
                }
                pb.set_position(p.processed as u64);
            })
        })
    };

    let outcome = loop {
        tokio::select! {
            joined = &mut handle => break joined.context("Conversion task panicked")?,
            _ = tokio::signal::ctrl_c(), if session.state() == BatchState::Running => {
                if session.request_cancel() {
                    warn!("Cancel requested, finishing current file");
                    pb.set_message(session.button_label());
                }
            }
        }
    };

    pb.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            session.abort();
            return Err(e).context("Conversion could not start");
        }
    };

    let note = session.finish(&result);

    // Keep stdout machine-readable in JSON mode
    if args.json {
        let report = serde_json::json!({
            "notification": note.to_string(),
            "result": result,
            "metrics": metrics.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}: {}", note.title(), note);
    }

    Ok(())
}

fn progress_bar(total: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40}] {pos}/{len} ETA: {eta_precise}")
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
