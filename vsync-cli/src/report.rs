//! Output file writing
//!
//! Texts are rendered in full before the first file is created, so a failed
//! merge never leaves a partial output behind.

use anyhow::{Context, Result};
use c1_log::MergeOutput;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `text` to `path`, flushing and closing the file before returning
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .with_context(|| format!("Failed to write {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    Ok(())
}

/// Write the merged log and the remapping report
pub fn write_merge_outputs(output: &MergeOutput, merged_path: &Path, mapping_path: &Path) -> Result<()> {
    let merged = output.merged_text();
    let mapping = output.report_text();

    println!("Saving merged c1 file to: {}", merged_path.display());
    write_text(merged_path, &merged)?;

    println!("Saving output mapping to: {}", mapping_path.display());
    write_text(mapping_path, &mapping)?;

    log::info!(
        "Wrote {} records and {} remapped channels",
        output.records.len(),
        output.remapping.len()
    );
    Ok(())
}
