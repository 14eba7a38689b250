//! Main merge API
//!
//! [`Merger`] runs the whole pipeline over two parsed logs: align, remap,
//! merge. It performs no I/O; writing the results is left to the caller.

use crate::align::align;
use crate::config::MergeConfig;
use crate::merge::{merge, serialize_records};
use crate::parser::{load_log, C1Log};
use crate::remap::{load_channel_pool, remap, used_channels, ChannelPool, Remapping};
use crate::types::{Offsets, Record, Result};
use std::path::Path;

/// Everything a merge produces
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Both logs on one time base, sorted by timestamp
    pub records: Vec<Record>,
    /// Channels of the second log that were moved
    pub remapping: Remapping,
    /// Replacement channels that were not needed
    pub unused_pool: ChannelPool,
}

impl MergeOutput {
    /// The merged log in C1 text form
    pub fn merged_text(&self) -> String {
        serialize_records(&self.records)
    }

    /// The remapping report text
    pub fn report_text(&self) -> String {
        self.remapping.report()
    }
}

/// Merges a pair of C1 logs against a channel reference pool
pub struct Merger {
    pool: ChannelPool,
}

impl Merger {
    /// Create a merger that draws replacements from `pool`
    pub fn new(pool: ChannelPool) -> Self {
        Self { pool }
    }

    /// Create a merger from the pool file named in `config`
    ///
    /// # Example
    /// ```no_run
    /// use c1_log::{load_log, MergeConfig, Merger, Offsets};
    /// use std::path::Path;
    ///
    /// let config = MergeConfig::new();
    /// let merger = Merger::from_config(&config).unwrap();
    /// let a = load_log(Path::new("north.c1"), &config.format).unwrap();
    /// let b = load_log(Path::new("south.c1"), &config.format).unwrap();
    /// let output = merger.merge(&a.records, &b.records, Offsets::new(1200, 800)).unwrap();
    /// println!("{}", output.report_text());
    /// ```
    pub fn from_config(config: &MergeConfig) -> Result<Self> {
        Ok(Self::new(load_channel_pool(&config.channel_pool)?))
    }

    /// The full reference pool
    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    /// Align, remap and merge two record sequences
    ///
    /// `a` is authoritative: its channels are never changed. Fails with
    /// `PoolExhausted` if `b` collides on more channels than the pool can
    /// replace.
    pub fn merge(&self, a: &[Record], b: &[Record], offsets: Offsets) -> Result<MergeOutput> {
        let (aligned_a, aligned_b) = align(a, b, offsets)?;

        let claimed = used_channels(&aligned_a);
        let available = self.pool.available_for(&claimed);
        log::info!(
            "First log claims {} channels, {} replacements available",
            claimed.len(),
            available.len()
        );

        let outcome = remap(&aligned_b, &claimed, available)?;
        log::info!("Remapped {} colliding channels", outcome.remapping.len());

        let records = merge(aligned_a, outcome.records);

        Ok(MergeOutput {
            records,
            remapping: outcome.remapping,
            unused_pool: outcome.pool,
        })
    }
}

/// Load both logs and the pool named in `config`, then merge them
pub fn merge_logs(
    first: &Path,
    second: &Path,
    offsets: Offsets,
    config: &MergeConfig,
) -> Result<MergeOutput> {
    let a: C1Log = load_log(first, &config.format)?;
    let b: C1Log = load_log(second, &config.format)?;
    Merger::from_config(config)?.merge(&a.records, &b.records, offsets)
}
