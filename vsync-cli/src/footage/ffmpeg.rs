//! ffmpeg / ffprobe invocation
//!
//! Argument vectors are built by plain functions so the command contract can
//! be checked without the tools installed. Execution goes through
//! [`CommandRunner`].

use super::FootageError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

static PROBE_FRAMES_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"nb_read_frames=([0-9]+)|nb_frames=([0-9]+)").expect("probe pattern is valid")
});

/// Runs an external program and returns its standard output
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<String, FootageError>;
}

/// Runs commands as child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<String, FootageError> {
        let tool = tool_name(program);
        log::debug!("Running {} {:?}", program.display(), args);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| FootageError::ToolFailed {
                tool: tool.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(FootageError::ToolFailed {
                tool,
                message: format!("{} ({})", last_line.trim(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Resolve a tool name or path and check that it runs
pub fn locate_tool(name: &str, runner: &dyn CommandRunner) -> Result<PathBuf, FootageError> {
    let path = which::which(name).map_err(|_| FootageError::ToolNotFound {
        tool: name.to_string(),
    })?;

    runner
        .run(&path, &[OsString::from("-version")])
        .map_err(|_| FootageError::ToolNotFound {
            tool: name.to_string(),
        })?;

    log::debug!("Using {} at {}", name, path.display());
    Ok(path)
}

/// Re-encode a raw h264 `.dav` stream as an mp4
pub fn convert_args(input: &Path, output: &Path, source_frame_rate: u32) -> Vec<OsString> {
    vec![
        "-r".into(),
        source_frame_rate.to_string().into(),
        "-i".into(),
        input.into(),
        "-c:v".into(),
        "libx264".into(),
        output.into(),
    ]
}

/// Remux an mp4 into an MPEG-TS intermediate for concatenation
pub fn intermediate_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.into(),
        "-c".into(),
        "copy".into(),
        "-bsf:v".into(),
        "h264_mp4toannexb".into(),
        "-f".into(),
        "mpegts".into(),
        output.into(),
    ]
}

/// Join MPEG-TS intermediates with the concat protocol
pub fn concat_args(intermediates: &[PathBuf], output: &Path) -> Vec<OsString> {
    let mut source = OsString::from("concat:");
    for (i, path) in intermediates.iter().enumerate() {
        if i > 0 {
            source.push("|");
        }
        source.push(path);
    }

    vec![
        "-i".into(),
        source,
        "-c".into(),
        "copy".into(),
        "-bsf:a".into(),
        "aac_adtstoasc".into(),
        output.into(),
    ]
}

/// Re-encode an mp4 at another frame rate
pub fn fps_args(input: &Path, output: &Path, fps_label: &str, crf: u32) -> Vec<OsString> {
    vec![
        "-r".into(),
        fps_label.into(),
        "-i".into(),
        input.into(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-crf".into(),
        crf.to_string().into(),
        output.into(),
    ]
}

/// Ask ffprobe for the frame count of the first video stream
pub fn probe_frames_args(input: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "v:0".into(),
        "-show_entries".into(),
        "stream=nb_frames".into(),
        "-of".into(),
        "default=noprint_wrappers=1".into(),
        input.into(),
    ]
}

/// Frame count from ffprobe output, `None` if the container does not record it
pub fn parse_frame_count(probe_output: &str) -> Option<u64> {
    let caps = PROBE_FRAMES_RX.captures(probe_output)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}
