//! C1 Event Log Library
//!
//! A small, I/O-light library for working with C1 channel-event logs: the
//! plain-text `chip pin edge timestamp` logs exported by intersection
//! detector readers.
//!
//! # Architecture
//!
//! Merging two logs is a single linear transformation:
//! - Load and validate both logs ([`load_log`])
//! - Put them on one time base using their video offsets ([`align`])
//! - Move channels of the second log that collide with the first onto free
//!   channels from a reference pool ([`remap`])
//! - Merge by timestamp and serialize ([`merge`], [`serialize_records`])
//!
//! [`trim`] cuts the events of one video segment out of a longer log.
//!
//! The library does NOT prompt for input or write output files; that is the
//! job of the application layer (vsync-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use c1_log::{merge_logs, MergeConfig, Offsets};
//! use std::path::Path;
//!
//! let config = MergeConfig::new().with_channel_pool("channels.txt");
//! let output = merge_logs(
//!     Path::new("north.c1"),
//!     Path::new("south.c1"),
//!     Offsets::new(1500, 250),
//!     &config,
//! ).unwrap();
//!
//! println!("{}", output.merged_text());
//! println!("{}", output.report_text());
//! ```

// Public modules
pub mod align;
pub mod config;
pub mod merge;
pub mod merger;
pub mod parser;
pub mod remap;
pub mod trim;
pub mod types;

// Re-export main types for convenience
pub use align::{align, parse_offset};
pub use config::{LogFormat, MergeConfig};
pub use merge::{merge, serialize_records};
pub use merger::{merge_logs, MergeOutput, Merger};
pub use parser::{load_log, parse_log, parse_record, C1Log};
pub use remap::{load_channel_pool, remap, used_channels, ChannelPool, RemapOutcome, Remapping};
pub use trim::{parse_clock, parse_length, trim, SegmentSpec, SegmentWindow};
pub use types::{C1Error, Channel, Edge, Offsets, Record, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
