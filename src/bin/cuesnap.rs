use std::{io::Write, path::PathBuf, sync::Arc};

use clap::Parser;
use colored::{ColoredString, Colorize};
use cuesnap::{
    ArmedSignature, DEFAULT_ASSUMED_FRAME_RATE, DEFAULT_DARK_THRESHOLD, DEFAULT_SAMPLE_X,
    DEFAULT_SAMPLE_Y, FfmpegLogLevel, FramePipeline, MediaSource, PipelineConfig,
    ProgressCallback, ProgressReport, RunSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  cuesnap match.mp4 1700000000 snapshots 600\n  cuesnap match.mp4 0 snapshots 0 --progress --json\n  cuesnap match.mp4 0 snapshots 0 --sample-x 960 --sample-y 540 --dark-threshold 30";

#[derive(Debug, Parser)]
#[command(
    name = "cuesnap",
    version,
    about = "Save a PNG whenever a cue pixel turns from its armed colour to dark",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input media path or URL.
    input: String,

    /// Seconds added to every snapshot timestamp.
    #[arg(allow_negative_numbers = true)]
    base_time: i64,

    /// Directory snapshots are written into. Must already exist.
    output: PathBuf,

    /// Transitions on frames up to and including this one are not exported.
    start_frame: u64,

    /// Column of the sampled pixel.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_X)]
    sample_x: u32,

    /// Row of the sampled pixel.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_Y)]
    sample_y: u32,

    /// A sample is dark when every channel is below this value.
    #[arg(long, default_value_t = DEFAULT_DARK_THRESHOLD)]
    dark_threshold: u8,

    /// Armed colour: red must be below this value.
    #[arg(long, default_value_t = ArmedSignature::default().red_max)]
    armed_red_max: u8,

    /// Armed colour: green must be above this value.
    #[arg(long, default_value_t = ArmedSignature::default().green_min)]
    armed_green_min: u8,

    /// Armed colour: blue must be below this value.
    #[arg(long, default_value_t = ArmedSignature::default().blue_max)]
    armed_blue_max: u8,

    /// Frame rate used to turn frame counts into seconds.
    #[arg(long, default_value_t = DEFAULT_ASSUMED_FRAME_RATE)]
    assumed_fps: u32,

    /// Override the stream's frame count for the ETA.
    #[arg(long)]
    total_frames: Option<u64>,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, default_value = "error")]
    ffmpeg_log_level: FfmpegLogLevel,

    /// Show debug logging output.
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors.
    #[arg(long)]
    quiet: bool,

    /// Show a progress bar instead of progress log lines.
    #[arg(long)]
    progress: bool,

    /// Print the run summary as machine-readable JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.output)
            .with_sample_point(self.sample_x, self.sample_y)
            .with_dark_threshold(self.dark_threshold)
            .with_armed_signature(ArmedSignature::new(
                self.armed_red_max,
                self.armed_green_min,
                self.armed_blue_max,
            ))
            .with_base_time_offset(self.base_time)
            .with_start_frame(self.start_frame)
            .with_total_frames(self.total_frames)
            .with_assumed_frame_rate(self.assumed_fps)
    }
}

fn level_prefix(level: Level) -> ColoredString {
    match level {
        Level::Error => "error:".red().bold(),
        Level::Warn => "warning:".yellow().bold(),
        Level::Info => "info:".green().bold(),
        Level::Debug => "debug:".cyan().bold(),
        Level::Trace => "trace:".dimmed(),
    }
}

/// stderr logger with coloured level prefixes.
fn logger(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format(|buf, record| {
            writeln!(buf, "{} {}", level_prefix(record.level()), record.args())
        });
    builder
}

/// Renders progress reports as an indicatif bar.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, report: &ProgressReport) {
        if let Some(total) = report.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(report.frame);
        let message = match report.estimated_remaining {
            Some(eta) => format!(
                "{} | {} fps | ETA {eta}",
                report.position, report.frames_since_last
            ),
            None => format!("{} | {} fps", report.position, report.frames_since_last),
        };
        self.bar.set_message(message);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn print_summary(summary: &RunSummary, json: bool) {
    if json {
        let payload = json!({
            "frames_processed": summary.frames_processed,
            "transitions_detected": summary.transitions_detected,
            "gated_transitions": summary.gated_transitions,
            "snapshots_written": summary.snapshots_written,
            "failed_exports": summary.failed_exports,
            "cancelled": summary.cancelled,
            "written_paths": summary
                .written_paths
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>(),
        });
        println!("{payload}");
        return;
    }

    println!(
        "{} {} frames, {} transitions ({} before start frame)",
        "processed".green().bold(),
        summary.frames_processed,
        summary.transitions_detected,
        summary.gated_transitions,
    );
    println!(
        "{} {} snapshots",
        "saved".green().bold(),
        summary.snapshots_written
    );
    if summary.failed_exports > 0 {
        println!(
            "{} {} snapshots could not be written",
            "failed".red().bold(),
            summary.failed_exports
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logger(cli.log_level()).try_init()?;
    cuesnap::set_ffmpeg_log_level(cli.ffmpeg_log_level);

    let mut config = cli.pipeline_config();
    if cli.progress {
        config = config.with_progress(Arc::new(BarProgress::new()?));
    }

    let mut source = MediaSource::open(&cli.input)?;
    let mut pipeline = FramePipeline::new(config);
    let summary = pipeline.run(&mut source)?;

    print_summary(&summary, cli.json);
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
