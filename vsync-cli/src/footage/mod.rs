//! DVR footage pipeline
//!
//! Prepares traffic intersection footage exported from a DVR: rename the raw
//! `.dav` exports, convert them to mp4, concatenate the segments of one
//! phase, and resample the frame rate. All media work is done by ffmpeg.

pub mod ffmpeg;
pub mod naming;

use crate::config::FootageConfig;
use crate::prompt::Prompter;
use anyhow::{Context, Result};
use ffmpeg::CommandRunner;
use naming::{DavName, SegmentName};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the footage pipeline
#[derive(Error, Debug)]
pub enum FootageError {
    #[error("{tool} not found; this command requires {tool} to be installed")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("No .{extension} files found at {path:?}")]
    NoFiles { extension: String, path: PathBuf },

    #[error("{file:?} does not match the <phase>_<HHMM>-<HHMM>.{extension} naming scheme")]
    NamingMismatch { file: String, extension: String },

    #[error("At least two .mp4 files are needed to concatenate, found {found}")]
    NotEnoughFiles { found: usize },

    #[error("Refusing to overwrite existing file {0:?}")]
    TargetExists(PathBuf),

    #[error("Operation cancelled")]
    Aborted,
}

/// Which pipeline steps to run and how
#[derive(Debug, Clone, Default)]
pub struct FootageOptions {
    pub rename: bool,
    pub convert: bool,
    pub concat: bool,
    /// Target frame rate for the resampling step
    pub fps: Option<f64>,
    /// Phase number for renaming; asked for when missing
    pub phase: Option<u32>,
    /// Skip confirmations
    pub assume_yes: bool,
}

impl FootageOptions {
    pub fn any(&self) -> bool {
        self.rename || self.convert || self.concat || self.fps.is_some()
    }
}

/// Runs pipeline steps against one file or directory
pub struct Pipeline<'a, R, W> {
    config: &'a FootageConfig,
    runner: &'a dyn CommandRunner,
    prompter: &'a mut Prompter<R, W>,
}

impl<'a, R: BufRead, W: Write> Pipeline<'a, R, W> {
    pub fn new(
        config: &'a FootageConfig,
        runner: &'a dyn CommandRunner,
        prompter: &'a mut Prompter<R, W>,
    ) -> Self {
        Self {
            config,
            runner,
            prompter,
        }
    }

    /// Run the selected steps in order: rename, convert, concat, fps
    ///
    /// The first failing step stops the run.
    pub fn run(&mut self, path: &Path, options: &FootageOptions) -> Result<()> {
        let ffmpeg = ffmpeg::locate_tool(&self.config.ffmpeg, self.runner)?;
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to read the working directory")?
                .join(path)
        };
        println!("Path for video file(s): {}\n", path.display());

        if options.rename {
            self.rename(&path, options)?;
        }
        if options.convert {
            self.convert(&ffmpeg, &path)?;
        }
        if options.concat {
            self.concat(&ffmpeg, &path, options)?;
        }
        if let Some(fps) = options.fps {
            let ffprobe = ffmpeg::locate_tool(&self.config.ffprobe, self.runner)?;
            self.set_fps(&ffmpeg, &ffprobe, &path, fps)?;
        }
        Ok(())
    }

    /// Rename DVR `.dav` exports to `<phase>_<start>-<end>.dav`
    ///
    /// Returns the new paths.
    pub fn rename(&mut self, path: &Path, options: &FootageOptions) -> Result<Vec<PathBuf>> {
        let (dir, files) = list_files(path)?;
        let dav_files = with_extension(&files, "dav");
        if dav_files.is_empty() {
            return Err(no_files("dav", &dir));
        }

        let mut exports = Vec::new();
        let mut all_match = true;
        for file in dav_files {
            match naming::classify_dav(file) {
                DavName::Dvr { start, end } => exports.push((file, start, end)),
                DavName::Renamed(name) => {
                    println!("{:?} is already named properly (phase {})", file, name.phase)
                }
                DavName::Unrecognised => {
                    println!("Naming scheme of {:?} does not match the DVR naming scheme", file);
                    all_match = false;
                }
            }
        }
        if all_match {
            log::info!("Naming scheme matches for all .dav files");
        }
        if exports.is_empty() {
            println!("All .dav files are already named properly or cannot be renamed.");
            return Ok(Vec::new());
        }

        let phase = match options.phase {
            Some(phase) => phase,
            None => self.prompter.ask_until(
                "\nPlease enter the video file phase number: ",
                |answer: &str| answer.parse::<u32>().map_err(|e| e.to_string()),
            )?,
        };

        println!("\n{} file(s) will be renamed:", exports.len());
        let mut plan = Vec::new();
        for (file, start, end) in exports {
            let target = dir.join(naming::renamed_dav(phase, start, end).to_string());
            println!("{:?} -> {:?}", file, file_name(&target));
            if target.exists() {
                return Err(FootageError::TargetExists(target).into());
            }
            plan.push((dir.join(file), target));
        }

        if !options.assume_yes && !self.prompter.confirm("Continue? (y/n): ")? {
            return Err(FootageError::Aborted.into());
        }

        let mut renamed = Vec::new();
        for (from, to) in plan {
            fs::rename(&from, &to).with_context(|| format!("Failed to rename {:?}", from))?;
            println!("Renamed {:?} to {:?}", file_name(&from), file_name(&to));
            renamed.push(to);
        }
        Ok(renamed)
    }

    /// Convert every `.dav` file to an h264 mp4 next to it
    pub fn convert(&mut self, ffmpeg: &Path, path: &Path) -> Result<Vec<PathBuf>> {
        let (dir, files) = list_files(path)?;
        let dav_files = with_extension(&files, "dav");
        if dav_files.is_empty() {
            return Err(no_files("dav", &dir));
        }

        println!("Converting h264 to mp4...");
        let mut outputs = Vec::new();
        for file in dav_files {
            let input = dir.join(file);
            let output = input.with_extension("mp4");
            println!("Starting ffmpeg child process to convert {:?}", file);
            let args = ffmpeg::convert_args(&input, &output, self.config.source_frame_rate);
            self.runner.run(ffmpeg, &args)?;
            println!("ffmpeg conversion completed successfully!\n");
            outputs.push(output);
        }
        Ok(outputs)
    }

    /// Concatenate every renamed mp4 in a directory into one file
    ///
    /// The sources and intermediates are removed once the joined file exists.
    pub fn concat(&mut self, ffmpeg: &Path, path: &Path, options: &FootageOptions) -> Result<PathBuf> {
        let dir = if path.is_file() {
            let parent = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            let question = format!(
                "Concatenation needs a directory, not a file. Use {:?} instead? (Y/n): ",
                parent
            );
            if !options.assume_yes && !self.prompter.confirm(&question)? {
                return Err(FootageError::Aborted.into());
            }
            parent
        } else {
            path.to_path_buf()
        };

        let (dir, files) = list_files(&dir)?;
        let mp4_files = with_extension(&files, "mp4");
        if mp4_files.is_empty() {
            return Err(no_files("mp4", &dir));
        }

        let mut segments = Vec::new();
        for file in &mp4_files {
            let name = SegmentName::parse_with_extension(file, "mp4").ok_or_else(|| {
                FootageError::NamingMismatch {
                    file: file.to_string(),
                    extension: "mp4".to_string(),
                }
            })?;
            segments.push(name);
        }
        if segments.len() < 2 {
            return Err(FootageError::NotEnoughFiles {
                found: segments.len(),
            }
            .into());
        }

        println!("Creating mpeg intermediates...");
        let mut intermediates = Vec::new();
        for segment in &segments {
            let input = dir.join(segment.to_string());
            let ts = segment.with_extension("ts");
            println!("Starting ffmpeg child process to create mpeg intermediate for {:?}", segment.to_string());
            self.runner
                .run(ffmpeg, &ffmpeg::intermediate_args(&input, &dir.join(ts.to_string())))?;
            intermediates.push(ts);
        }
        intermediates.sort_by(|a, b| a.start.cmp(&b.start));

        let joined = naming::concat_name(&intermediates)
            .map(|name| dir.join(name.to_string()))
            .ok_or(FootageError::NotEnoughFiles { found: 0 })?;
        let parts: Vec<PathBuf> = intermediates.iter().map(|ts| dir.join(ts.to_string())).collect();

        println!("Concatenating {} intermediates into {:?}", parts.len(), file_name(&joined));
        self.runner.run(ffmpeg, &ffmpeg::concat_args(&parts, &joined))?;
        println!("Concatenation completed successfully!\n");

        println!("Cleaning up...");
        for file in mp4_files.iter().map(|f| dir.join(f)).chain(parts) {
            fs::remove_file(&file).with_context(|| format!("Failed to remove {:?}", file))?;
        }
        Ok(joined)
    }

    /// Re-encode every mp4 at `fps`, replacing each source
    pub fn set_fps(&mut self, ffmpeg: &Path, ffprobe: &Path, path: &Path, fps: f64) -> Result<Vec<PathBuf>> {
        let (dir, files) = list_files(path)?;
        let mp4_files = with_extension(&files, "mp4");
        if mp4_files.is_empty() {
            return Err(no_files("mp4", &dir));
        }

        let label = naming::fps_label(fps);
        let mut outputs = Vec::new();
        for file in mp4_files {
            let input = dir.join(file);

            println!("\nGathering information for {:?}...", file);
            let probe = self.runner.run(ffprobe, &ffmpeg::probe_frames_args(&input))?;
            match ffmpeg::parse_frame_count(&probe) {
                Some(frames) => println!("Total Frames: {}", frames),
                None => log::warn!("{:?} does not report a frame count", file),
            }

            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output = dir.join(format!("{}_{}.mp4", stem, label));
            println!("Converting frame rate to {}", label);
            self.runner
                .run(ffmpeg, &ffmpeg::fps_args(&input, &output, &label, self.config.crf))?;
            println!("Frame rate conversion completed successfully!");

            fs::remove_file(&input).with_context(|| format!("Failed to remove {:?}", input))?;
            outputs.push(output);
        }
        Ok(outputs)
    }
}

/// The directory to work in and the file names to consider
///
/// A file path yields its parent directory and just that file; a directory
/// yields every file in it, sorted by name.
pub fn list_files(path: &Path) -> Result<(PathBuf, Vec<String>)> {
    if path.is_file() {
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok((dir, vec![name]));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("Failed to list {:?}", path))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok((path.to_path_buf(), names))
}

fn with_extension<'f>(files: &'f [String], extension: &str) -> Vec<&'f str> {
    let suffix = format!(".{}", extension);
    files
        .iter()
        .filter(|f| f.ends_with(&suffix))
        .map(|f| f.as_str())
        .collect()
}

fn no_files(extension: &str, dir: &Path) -> anyhow::Error {
    FootageError::NoFiles {
        extension: extension.to_string(),
        path: dir.to_path_buf(),
    }
    .into()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::OsString;
    use std::io::Cursor;

    /// Records invocations and creates each command's output file
    #[derive(Default)]
    struct FakeRunner {
        calls: RefCell<Vec<Vec<String>>>,
        probe_output: String,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &Path, args: &[OsString]) -> std::result::Result<String, FootageError> {
            let mut call = vec![file_name(program)];
            call.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
            self.calls.borrow_mut().push(call);

            if program.ends_with("ffprobe") {
                return Ok(self.probe_output.clone());
            }
            if let Some(last) = args.last() {
                let out = PathBuf::from(last);
                if out.is_absolute() {
                    fs::write(&out, b"").unwrap();
                }
            }
            Ok(String::new())
        }
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    #[test]
    fn test_rename_dvr_exports() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &[
                "NVR_ch1_main_20190612073015_20190612080015.dav",
                "2_0800-0830.dav",
                "notes.txt",
            ],
        );

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("x\n2\ny\n");
        let options = FootageOptions::default();

        let renamed = Pipeline::new(&config, &runner, &mut p)
            .rename(dir.path(), &options)
            .unwrap();

        assert_eq!(renamed, vec![dir.path().join("2_0730-0800.dav")]);
        assert!(dir.path().join("2_0730-0800.dav").exists());
        assert!(dir.path().join("2_0800-0830.dav").exists());
        assert!(!dir.path().join("NVR_ch1_main_20190612073015_20190612080015.dav").exists());
    }

    #[test]
    fn test_rename_can_be_declined() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["NVR_ch1_main_20190612073015_20190612080015.dav"]);

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("n\n");
        let options = FootageOptions {
            phase: Some(1),
            ..FootageOptions::default()
        };

        let err = Pipeline::new(&config, &runner, &mut p)
            .rename(dir.path(), &options)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<FootageError>(), Some(FootageError::Aborted)));
        assert!(dir.path().join("NVR_ch1_main_20190612073015_20190612080015.dav").exists());
    }

    #[test]
    fn test_convert_requires_dav_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["1_0700-0730.mp4"]);

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("");

        let err = Pipeline::new(&config, &runner, &mut p)
            .convert(Path::new("ffmpeg"), dir.path())
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<FootageError>(), Some(FootageError::NoFiles { .. })));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_convert_each_dav() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["1_0700-0730.dav", "1_0730-0800.dav"]);

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("");

        let outputs = Pipeline::new(&config, &runner, &mut p)
            .convert(Path::new("ffmpeg"), dir.path())
            .unwrap();

        assert_eq!(outputs.len(), 2);
        let calls = runner.calls.borrow();
        assert_eq!(calls[0][0..3], ["ffmpeg", "-r", "30"]);
        assert!(calls[1].last().unwrap().ends_with("1_0730-0800.mp4"));
    }

    #[test]
    fn test_concat_joins_in_time_order_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["4_0830-0900.mp4", "4_0800-0830.mp4"]);

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("");

        let joined = Pipeline::new(&config, &runner, &mut p)
            .concat(Path::new("ffmpeg"), dir.path(), &FootageOptions::default())
            .unwrap();

        assert_eq!(joined, dir.path().join("4_0800-0900.mp4"));
        assert!(joined.exists());
        assert!(!dir.path().join("4_0800-0830.mp4").exists());
        assert!(!dir.path().join("4_0800-0830.ts").exists());

        let calls = runner.calls.borrow();
        let concat = &calls[2];
        let first = dir.path().join("4_0800-0830.ts");
        let second = dir.path().join("4_0830-0900.ts");
        assert_eq!(
            concat[2],
            format!("concat:{}|{}", first.display(), second.display())
        );
    }

    #[test]
    fn test_concat_rejects_unrenamed_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["4_0800-0830.mp4", "holiday.mp4"]);

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("");

        let err = Pipeline::new(&config, &runner, &mut p)
            .concat(Path::new("ffmpeg"), dir.path(), &FootageOptions::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FootageError>(),
            Some(FootageError::NamingMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_needs_two_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["4_0800-0830.mp4"]);

        let config = FootageConfig::default();
        let runner = FakeRunner::default();
        let mut p = prompter("");

        let err = Pipeline::new(&config, &runner, &mut p)
            .concat(Path::new("ffmpeg"), dir.path(), &FootageOptions::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FootageError>(),
            Some(FootageError::NotEnoughFiles { found: 1 })
        ));
    }

    #[test]
    fn test_set_fps_replaces_sources() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["4_0800-0900.mp4"]);

        let config = FootageConfig::default();
        let runner = FakeRunner {
            probe_output: "nb_frames=108000\n".to_string(),
            ..FakeRunner::default()
        };
        let mut p = prompter("");

        let outputs = Pipeline::new(&config, &runner, &mut p)
            .set_fps(Path::new("ffmpeg"), Path::new("ffprobe"), dir.path(), 29.97)
            .unwrap();

        assert_eq!(outputs, vec![dir.path().join("4_0800-0900_29.97.mp4")]);
        assert!(outputs[0].exists());
        assert!(!dir.path().join("4_0800-0900.mp4").exists());

        let calls = runner.calls.borrow();
        assert_eq!(calls[0][0], "ffprobe");
        assert!(calls[1].contains(&"-crf".to_string()));
    }

    #[test]
    fn test_list_files_for_single_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.dav", "b.dav"]);

        let (parent, files) = list_files(&dir.path().join("b.dav")).unwrap();
        assert_eq!(parent, dir.path());
        assert_eq!(files, vec!["b.dav".to_string()]);

        let (_, all) = list_files(dir.path()).unwrap();
        assert_eq!(all, vec!["a.dav".to_string(), "b.dav".to_string()]);
    }
}
