//! VideoSync command-line tools
//!
//! Command-line front end for the c1-log library, plus the DVR footage
//! pipeline:
//! - `merge`: merge two C1 logs onto one time base, remapping colliding channels
//! - `trim`: cut one video segment's worth of events out of a C1 log
//! - `footage`: rename, convert, concatenate and resample DVR exports via ffmpeg

use anyhow::{Context, Result};
use c1_log::{
    load_log, parse_clock, parse_length, parse_offset, C1Log, MergeConfig, MergeOutput, Merger,
    Offsets, SegmentSpec,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod config;
mod footage;
mod prompt;
mod report;

use config::AppConfig;
use footage::{ffmpeg::SystemRunner, FootageOptions, Pipeline};
use prompt::Prompter;

/// VideoSync tools - C1 log merging and DVR footage processing
#[derive(Parser, Debug)]
#[command(name = "vsync")]
#[command(about = "Merge and trim C1 event logs, prepare DVR footage", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge two C1 logs, remapping channels of the second that collide with the first
    Merge(MergeArgs),
    /// Keep only the events covered by one video segment
    Trim(TrimArgs),
    /// Process DVR footage with ffmpeg
    Footage(FootageArgs),
}

#[derive(clap::Args, Debug)]
struct MergeArgs {
    /// Authoritative C1 log (its channels never change)
    first: PathBuf,

    /// C1 log whose colliding channels are remapped
    second: PathBuf,

    /// Video offset of the first log in milliseconds (asked for when missing)
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    offset_a: Option<i64>,

    /// Video offset of the second log in milliseconds (asked for when missing)
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    offset_b: Option<i64>,

    /// Channel reference list
    #[arg(long, value_name = "FILE")]
    channels: Option<PathBuf>,

    /// Merged log output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Remapping report output
    #[arg(short, long, value_name = "FILE")]
    mapping: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct TrimArgs {
    /// C1 log to trim
    log: PathBuf,

    /// Wall-clock time the C1 log started (HH:MM:SS)
    #[arg(long, value_name = "TIME")]
    log_start: Option<String>,

    /// Timestamp of the first C1 event in milliseconds
    #[arg(long, value_name = "MS")]
    first_event: Option<i64>,

    /// Wall-clock time the video segment started (HH:MM:SS)
    #[arg(long, value_name = "TIME")]
    video_start: Option<String>,

    /// Day of the recording the segment falls on (1 = first day)
    #[arg(long, value_name = "DAY")]
    day: Option<u32>,

    /// Length of the video segment (H:MM:SS)
    #[arg(long, value_name = "LENGTH")]
    length: Option<String>,

    /// Trimmed log output (".c1" is appended when missing)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct FootageArgs {
    /// File or directory to operate on
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Rename .dav files from the DVR to <phase>_<start>-<end>.dav
    #[arg(short, long)]
    rename: bool,

    /// Convert .dav (h264) files to .mp4
    #[arg(long)]
    convert: bool,

    /// Concatenate the .mp4 files of a directory into one file
    #[arg(long)]
    concat: bool,

    /// Re-encode .mp4 files at this frame rate (config default when no value)
    #[arg(short, long, value_name = "FPS", num_args = 0..=1)]
    fps: Option<Option<f64>>,

    /// Phase number used when renaming (asked for when missing)
    #[arg(long, value_name = "N")]
    phase: Option<u32>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("VideoSync tools v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using c1-log library v{}", c1_log::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    match &args.command {
        Command::Merge(merge_args) => merge_mode(merge_args, &config),
        Command::Trim(trim_args) => trim_mode(trim_args, &config),
        Command::Footage(footage_args) => footage_mode(footage_args, &config),
    }
}

/// Merge mode - validate both logs, settle offsets, merge, then write outputs
fn merge_mode(args: &MergeArgs, config: &AppConfig) -> Result<()> {
    let mut library = config.merge.library.clone();
    if let Some(channels) = &args.channels {
        library.channel_pool = channels.clone();
    }

    let first = load_log(&args.first, &library.format)?;
    let second = load_log(&args.second, &library.format)?;

    let mut prompter = Prompter::stdio();
    let offset_a = match args.offset_a {
        Some(offset) => offset,
        None => prompter.ask_until(
            &format!("Enter video offset for {} in milliseconds: ", first.name()),
            parse_offset,
        )?,
    };
    let offset_b = match args.offset_b {
        Some(offset) => offset,
        None => prompter.ask_until(
            &format!("\nEnter video offset for {} in milliseconds: ", second.name()),
            parse_offset,
        )?,
    };

    let merged_path = args.output.as_ref().unwrap_or(&config.merge.merged_output);
    let mapping_path = args.mapping.as_ref().unwrap_or(&config.merge.mapping_output);
    let output = merge_and_write(
        &library,
        &first,
        &second,
        Offsets::new(offset_a, offset_b),
        merged_path,
        mapping_path,
    )?;

    if !output.remapping.is_empty() {
        println!("\nRemapped channels:\n{}", output.report_text());
    }
    log::debug!("{} replacement channels left unused", output.unused_pool.len());
    Ok(())
}

/// Merge two loaded logs and write both outputs
///
/// Nothing is written unless the merge succeeds.
fn merge_and_write(
    library: &MergeConfig,
    first: &C1Log,
    second: &C1Log,
    offsets: Offsets,
    merged_path: &Path,
    mapping_path: &Path,
) -> Result<MergeOutput> {
    let merger = Merger::from_config(library)
        .with_context(|| format!("Failed to load channel pool {:?}", library.channel_pool))?;
    let output = merger
        .merge(&first.records, &second.records, offsets)
        .with_context(|| format!("Failed to merge {} into {}", second.name(), first.name()))?;

    report::write_merge_outputs(&output, merged_path, mapping_path)?;
    Ok(output)
}

/// Trim mode - locate one video segment in a C1 log and keep its events
fn trim_mode(args: &TrimArgs, config: &AppConfig) -> Result<()> {
    let format = &config.merge.library.format;
    let log = load_log(&args.log, format)?;
    let mut prompter = Prompter::stdio();

    let log_start = match &args.log_start {
        Some(text) => parse_clock(text)?,
        None => prompter.ask_until("Enter the C1 log start time [HH:MM:SS]: ", parse_clock)?,
    };
    let first_event_ms = match args.first_event {
        Some(ms) => ms,
        None => prompter.ask_until("What is the first C1 event timestamp (ms): ", parse_offset)?,
    };
    let video_start = match &args.video_start {
        Some(text) => parse_clock(text)?,
        None => prompter.ask_until("Enter the video start time [HH:MM:SS]: ", parse_clock)?,
    };
    let day = match args.day {
        Some(day) => day,
        None => prompter.ask_until("Which day does this video segment take place on: ", parse_day)?,
    };
    let video_length = match &args.length {
        Some(text) => parse_length(text)?,
        None => prompter.ask_until("Enter the video length [H:MM:SS]: ", parse_length)?,
    };

    let spec = SegmentSpec {
        log_start,
        first_event_ms,
        video_start,
        day,
        video_length,
    };
    let window = spec.window()?;
    println!("Segment start: {}", window.start);
    println!("Segment end: {}", window.end);

    let trimmed = c1_log::trim(&log.records, window);
    match (trimmed.first(), trimmed.last()) {
        (Some(first), Some(last)) => {
            println!("First record in segment: {}", first);
            println!("Last record in segment: {}", last);
        }
        _ => println!("No records fall inside the segment"),
    }

    let output = match &args.output {
        Some(path) => path.clone(),
        None => PathBuf::from(prompter.ask("Enter a file name: ")?),
    };
    let output = with_log_extension(&output, &format.extension);

    let mut text = c1_log::serialize_records(&trimmed);
    if !text.is_empty() {
        text.push('\n');
    }
    println!("Saving trimmed c1 file to: {}", output.display());
    report::write_text(&output, &text)
}

/// Footage mode - run the selected ffmpeg pipeline steps
fn footage_mode(args: &FootageArgs, config: &AppConfig) -> Result<()> {
    let options = FootageOptions {
        rename: args.rename,
        convert: args.convert,
        concat: args.concat,
        fps: args.fps.map(|fps| fps.unwrap_or(config.footage.default_fps)),
        phase: args.phase,
        assume_yes: args.yes,
    };

    if !options.any() {
        println!("No operation specified. Please add '--rename', '--convert', '--concat', or '--fps'.");
        println!("\nExamples:");
        println!("  vsync footage --rename --convert /footage/phase2");
        println!("  vsync footage --concat --fps 29.97 /footage/phase2");
        return Ok(());
    }
    if let Some(fps) = options.fps {
        if !(fps > 0.0) {
            anyhow::bail!("Frame rate must be positive, got {}", fps);
        }
    }

    let runner = SystemRunner;
    let mut prompter = Prompter::stdio();
    Pipeline::new(&config.footage, &runner, &mut prompter).run(&args.path, &options)
}

/// Parse a 1-based recording day
fn parse_day(answer: &str) -> std::result::Result<u32, String> {
    match answer.trim().parse::<u32>() {
        Ok(0) => Err("day numbers start at 1".to_string()),
        Ok(day) => Ok(day),
        Err(e) => Err(e.to_string()),
    }
}

/// Append the log extension unless the path already carries it
fn with_log_extension(path: &Path, extension: &str) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext == extension => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(extension);
            PathBuf::from(name)
        }
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_cli_parses_merge() {
        let args = Args::try_parse_from([
            "vsync", "merge", "a.c1", "b.c1", "--offset-a", "-250", "--offset-b", "100",
        ])
        .unwrap();
        match args.command {
            Command::Merge(m) => {
                assert_eq!(m.offset_a, Some(-250));
                assert_eq!(m.offset_b, Some(100));
                assert!(m.output.is_none());
            }
            other => panic!("expected merge, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_non_integer_offset() {
        assert!(Args::try_parse_from(["vsync", "merge", "a.c1", "b.c1", "--offset-a", "1.5"]).is_err());
    }

    #[test]
    fn test_cli_fps_without_value() {
        let args = Args::try_parse_from(["vsync", "footage", "--fps", "--concat", "clips"]).unwrap();
        match args.command {
            Command::Footage(f) => {
                assert_eq!(f.fps, Some(None));
                assert!(f.concat);
                assert_eq!(f.path, PathBuf::from("clips"));
            }
            other => panic!("expected footage, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_day_rejects_zero() {
        assert_eq!(parse_day(" 3 "), Ok(3));
        assert!(parse_day("0").is_err());
        assert!(parse_day("-1").is_err());
        assert!(parse_day("two").is_err());
    }

    #[test]
    fn test_day_prompt_asks_again_after_zero() {
        let mut prompter = Prompter::new(std::io::Cursor::new(b"0\n2\n".to_vec()), Vec::new());
        assert_eq!(prompter.ask_until("Day: ", parse_day).unwrap(), 2);
    }

    fn write_log(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_exhausted_merge_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_log(dir.path(), "north.c1", "1 5 0 0000000000\n2 6 1 0000000100\n");
        let second = write_log(dir.path(), "south.c1", "2 6 0 0000000050\n");
        let channels = write_log(dir.path(), "channels.txt", "1,5\n2,6\n");
        let merged_path = dir.path().join("output.c1");
        let mapping_path = dir.path().join("output mapping.txt");

        let args = Args::try_parse_from([
            OsString::from("vsync"),
            "merge".into(),
            first.into_os_string(),
            second.into_os_string(),
            "--offset-a".into(),
            "0".into(),
            "--offset-b".into(),
            "0".into(),
            "--channels".into(),
            channels.into_os_string(),
            "-o".into(),
            merged_path.clone().into_os_string(),
            "-m".into(),
            mapping_path.clone().into_os_string(),
        ])
        .unwrap();
        let Command::Merge(merge_args) = &args.command else {
            panic!("expected merge");
        };

        let err = merge_mode(merge_args, &AppConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<c1_log::C1Error>(),
            Some(c1_log::C1Error::PoolExhausted { .. })
        ));
        assert!(!merged_path.exists());
        assert!(!mapping_path.exists());
    }

    #[test]
    fn test_successful_merge_writes_both_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let format = c1_log::LogFormat::default();
        let first = write_log(dir.path(), "north.c1", "1 5 0 0000000000\n");
        let second = write_log(dir.path(), "south.c1", "1 5 1 0000000500\n");
        let channels = write_log(dir.path(), "channels.txt", "1,5\n2,6\n");
        let merged_path = dir.path().join("output.c1");
        let mapping_path = dir.path().join("output mapping.txt");

        let library = MergeConfig::new().with_channel_pool(channels);
        let output = merge_and_write(
            &library,
            &load_log(&first, &format).unwrap(),
            &load_log(&second, &format).unwrap(),
            Offsets::new(0, 0),
            &merged_path,
            &mapping_path,
        )
        .unwrap();

        assert_eq!(output.remapping.len(), 1);
        assert_eq!(std::fs::read_to_string(&mapping_path).unwrap(), "1 5 --> 2 6");
        assert!(merged_path.exists());
    }

    #[test]
    fn test_with_log_extension() {
        assert_eq!(with_log_extension(Path::new("day2"), "c1"), PathBuf::from("day2.c1"));
        assert_eq!(with_log_extension(Path::new("day2.c1"), "c1"), PathBuf::from("day2.c1"));
    }
}
