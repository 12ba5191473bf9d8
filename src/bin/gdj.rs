//! gdj - Command-line interface for gesture-dj
//!
//! Commands:
//! - classify: Turn recorded landmark frames into gesture events (batch mode)
//! - run: Classify frames streamed on stdin and drive the local player (streaming mode)
//! - validate: Check landmark frames for malformed hands
//! - config: Print the default engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gesture_dj::dispatch::{DispatchOutcome, GestureDispatcher, LocalPlayer, MediaAction};
use gesture_dj::pipeline::{
    parse_frame_line, parse_frames_array, parse_frames_ndjson, GestureProcessor,
};
use gesture_dj::types::{Frame, Gesture, GestureEvent, HandObservation};
use gesture_dj::{GestureError, PipelineConfig, VERSION};

/// gdj - Hand-gesture media control from landmark streams
#[derive(Parser)]
#[command(name = "gdj")]
#[command(version = VERSION)]
#[command(about = "Classify hand landmark frames into media-control gestures", long_about = None)]
struct Cli {
    /// Log classifier internals (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn recorded landmark frames into gesture events (batch mode)
    Classify {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// JSON configuration file (unspecified fields keep their defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Classify only every Nth frame (overrides the configuration)
        #[arg(long)]
        every_n: Option<u32>,
    },

    /// Classify frames streamed on stdin and drive the local player (streaming mode)
    Run {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Classify only every Nth frame (overrides the configuration)
        #[arg(long)]
        every_n: Option<u32>,

        /// Buffer output instead of flushing after each record
        #[arg(long)]
        no_flush: bool,
    },

    /// Check landmark frames for malformed hands
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default engine configuration as JSON
    Config,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one gesture event per line)
    Ndjson,
    /// JSON array of gesture events
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GdjCliError> {
    match cli.command {
        Commands::Classify {
            input,
            output,
            input_format,
            output_format,
            config,
            every_n,
        } => cmd_classify(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            every_n,
        ),

        Commands::Run {
            config,
            every_n,
            no_flush,
        } => cmd_run(config.as_deref(), every_n, !no_flush),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config => cmd_config(),
    }
}

fn cmd_classify(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    every_n: Option<u32>,
) -> Result<(), GdjCliError> {
    let input_data = read_input(input)?;
    let frames = parse_frames(&input_data, &input_format)?;

    if frames.is_empty() {
        return Err(GdjCliError::NoFrames);
    }

    let config = load_config(config, every_n)?;
    let mut processor = GestureProcessor::new(config)?;
    let events = processor.process_all(&frames);
    info!(
        "Classified {} frame(s), {} gesture(s)",
        processor.frames_seen(),
        events.len()
    );

    let output_data = format_output(&events, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(config: Option<&Path>, every_n: Option<u32>, flush: bool) -> Result<(), GdjCliError> {
    if atty::is(atty::Stream::Stdin) {
        warn!("stdin is a TTY; gdj run expects NDJSON frames piped from a landmark estimator");
    }

    let config = load_config(config, every_n)?;
    let mut processor = GestureProcessor::new(config)?;
    let mut dispatcher = GestureDispatcher::new(LocalPlayer::new());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (i, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        // An unreadable line counts as a frame without hands; the stream goes on
        let frame = match parse_frame_line(&line, i + 1) {
            Ok(frame) => frame,
            Err(e) => {
                processor.discard_frame(&e);
                continue;
            }
        };
        let Some(event) = processor.process_frame(&frame) else {
            continue;
        };

        let action = match dispatcher.dispatch(event.gesture, event.timestamp)? {
            DispatchOutcome::Applied(action) => action,
            DispatchOutcome::Throttled => continue,
        };

        let player = dispatcher.controller();
        let record = RunRecord {
            frame_index: event.frame_index,
            gesture: event.gesture,
            action,
            is_playing: player.is_playing,
            volume: player.volume,
            track_index: player.track_index,
        };
        writeln!(stdout, "{}", serde_json::to_string(&record)?)?;
        if flush {
            stdout.flush()?;
        }

        if event.gesture == Gesture::Quit {
            info!("Two hands raised, stopping");
            break;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), GdjCliError> {
    let input_data = read_input(input)?;
    let frames = parse_frames(&input_data, &input_format)?;

    let mut errors = Vec::new();
    let mut hand_count = 0;
    for (frame_index, frame) in frames.iter().enumerate() {
        for (hand_index, raw) in frame.hands.iter().enumerate() {
            hand_count += 1;
            if let Err(e) = HandObservation::from_landmarks(raw) {
                errors.push(ValidationErrorDetail {
                    frame_index,
                    hand_index,
                    error: e.to_string(),
                });
            }
        }
    }

    let report = ValidationReport {
        total_frames: frames.len(),
        total_hands: hand_count,
        invalid_hands: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:  {}", report.total_frames);
        println!("Total hands:   {}", report.total_hands);
        println!("Invalid hands: {}", report.invalid_hands);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Frame {} hand {}: {}",
                    err.frame_index, err.hand_index, err.error
                );
            }
        }
    }

    if report.invalid_hands > 0 {
        Err(GdjCliError::ValidationFailed(report.invalid_hands))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), GdjCliError> {
    println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, GdjCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_frames(input: &str, format: &InputFormat) -> Result<Vec<Frame>, GdjCliError> {
    let frames = match format {
        InputFormat::Ndjson => parse_frames_ndjson(input)?,
        InputFormat::Json => parse_frames_array(input)?,
    };
    Ok(frames)
}

fn load_config(path: Option<&Path>, every_n: Option<u32>) -> Result<PipelineConfig, GdjCliError> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    if let Some(n) = every_n {
        config.process_every_n_frames = n;
        config.validate()?;
    }
    Ok(config)
}

fn format_output(events: &[GestureEvent], format: &OutputFormat) -> Result<String, GdjCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for event in events {
                lines.push(serde_json::to_string(event)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(events)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(events)?),
    }
}

// Error types

#[derive(Debug)]
enum GdjCliError {
    Io(io::Error),
    Gesture(GestureError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
}

impl From<io::Error> for GdjCliError {
    fn from(e: io::Error) -> Self {
        GdjCliError::Io(e)
    }
}

impl From<GestureError> for GdjCliError {
    fn from(e: GestureError) -> Self {
        GdjCliError::Gesture(e)
    }
}

impl From<serde_json::Error> for GdjCliError {
    fn from(e: serde_json::Error) -> Self {
        GdjCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GdjCliError> for CliError {
    fn from(e: GdjCliError) -> Self {
        match e {
            GdjCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GdjCliError::Gesture(GestureError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'gdj config' to see valid defaults".to_string()),
            },
            GdjCliError::Gesture(GestureError::DispatchError(msg)) => CliError {
                code: "DISPATCH_ERROR".to_string(),
                message: msg,
                hint: None,
            },
            GdjCliError::Gesture(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Each frame needs a timestamp and a list of hands".to_string()),
            },
            GdjCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GdjCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GdjCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} hands failed validation", count),
                hint: Some("Every hand needs 21 finite landmarks".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct RunRecord {
    frame_index: u64,
    gesture: Gesture,
    action: MediaAction,
    is_playing: bool,
    volume: u8,
    track_index: u32,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    total_hands: usize,
    invalid_hands: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    frame_index: usize,
    hand_index: usize,
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_flush(args: &[&str]) -> bool {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Run { no_flush, .. } => !no_flush,
            _ => panic!("expected the run command"),
        }
    }

    #[test]
    fn test_run_flushes_by_default() {
        assert!(run_flush(&["gdj", "run"]));
    }

    #[test]
    fn test_run_no_flush_disables_flushing() {
        assert!(!run_flush(&["gdj", "run", "--no-flush"]));
    }

    #[test]
    fn test_run_rejects_removed_flush_flag() {
        assert!(Cli::try_parse_from(["gdj", "run", "--flush"]).is_err());
    }
}
