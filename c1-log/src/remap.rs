//! Channel collision remapping
//!
//! Channels used by the first log are claimed. Every channel of the second
//! log that collides with one of them is moved, on first sight, to the next
//! free channel of the reference pool, and keeps that replacement for the
//! rest of the run.

use crate::types::{C1Error, Channel, Record, Result};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::Path;

/// Ordered queue of channels that can be handed out as replacements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPool {
    channels: VecDeque<Channel>,
}

impl ChannelPool {
    /// Build a pool from channels in the order they should be handed out
    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            channels: channels.into_iter().collect(),
        }
    }

    /// Parse a channel reference list
    ///
    /// One `chip,pin` entry per line: the chip is the first character and the
    /// pin the two characters after the separator. Lines with an empty chip
    /// or pin field are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut channels = Vec::new();

        for (index, raw) in text.split('\n').enumerate() {
            let line = raw.trim_end_matches('\r');
            let chip_field = line.get(0..1).unwrap_or("").trim();
            let pin_field = line
                .get(2..line.len().min(4))
                .unwrap_or("")
                .trim();
            if chip_field.is_empty() || pin_field.is_empty() {
                continue;
            }

            let chip = chip_field.parse::<u8>().map_err(|_| C1Error::ChannelPool {
                line: index + 1,
                reason: format!("chip {:?} is not a digit", chip_field),
            })?;
            let pin = pin_field.parse::<u8>().map_err(|_| C1Error::ChannelPool {
                line: index + 1,
                reason: format!("pin {:?} is not a number", pin_field),
            })?;
            channels.push(Channel::new(chip, pin));
        }

        Ok(Self::from_channels(channels))
    }

    /// The channels still free once `used` are claimed, sorted by chip then pin
    pub fn available_for(&self, used: &HashSet<Channel>) -> Self {
        let free: BTreeSet<Channel> = self
            .channels
            .iter()
            .filter(|channel| !used.contains(channel))
            .copied()
            .collect();
        Self::from_channels(free)
    }

    /// Take the next replacement channel
    pub fn next_channel(&mut self) -> Option<Channel> {
        self.channels.pop_front()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }
}

/// Load a channel reference list from disk
pub fn load_channel_pool(path: &Path) -> Result<ChannelPool> {
    log::info!("Loading channel pool: {:?}", path);
    let text = std::fs::read_to_string(path)?;
    let pool = ChannelPool::parse(&text)?;
    log::debug!("Channel pool holds {} entries", pool.len());
    Ok(pool)
}

/// Collect the set of channels a log uses
pub fn used_channels(records: &[Record]) -> HashSet<Channel> {
    records.iter().map(|record| record.channel).collect()
}

/// Channel replacements in the order they were first assigned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remapping {
    entries: Vec<(Channel, Channel)>,
    index: HashMap<Channel, usize>,
}

impl Remapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacement for `original`, if one was assigned
    pub fn get(&self, original: &Channel) -> Option<Channel> {
        self.index.get(original).map(|&i| self.entries[i].1)
    }

    fn insert(&mut self, original: Channel, replacement: Channel) {
        self.index.insert(original, self.entries.len());
        self.entries.push((original, replacement));
    }

    /// `(original, replacement)` pairs in assignment order
    pub fn entries(&self) -> &[(Channel, Channel)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable report, one `chip pin --> new_chip new_pin` line per entry
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Remapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (original, replacement)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} --> {}", original, replacement)?;
        }
        Ok(())
    }
}

/// Result of remapping the second log
#[derive(Debug, Clone)]
pub struct RemapOutcome {
    /// The second log with colliding channels rewritten
    pub records: Vec<Record>,
    /// Every replacement made, in assignment order
    pub remapping: Remapping,
    /// Channels that were not handed out
    pub pool: ChannelPool,
}

/// Move the second log off channels claimed by the first
///
/// `pool` must already exclude the claimed channels (see
/// [`ChannelPool::available_for`]).
pub fn remap(
    records: &[Record],
    claimed: &HashSet<Channel>,
    mut pool: ChannelPool,
) -> Result<RemapOutcome> {
    let mut remapping = Remapping::new();
    let mut rewritten = Vec::with_capacity(records.len());

    for record in records {
        let channel = record.channel;

        if let Some(replacement) = remapping.get(&channel) {
            rewritten.push(record.with_channel(replacement));
        } else if claimed.contains(&channel) {
            let replacement = pool
                .next_channel()
                .ok_or(C1Error::PoolExhausted { channel })?;
            log::debug!("Remapping channel {} --> {}", channel, replacement);
            remapping.insert(channel, replacement);
            rewritten.push(record.with_channel(replacement));
        } else {
            rewritten.push(record.clone());
        }
    }

    let native = used_channels(records);
    for (original, replacement) in remapping.entries() {
        if native.contains(replacement) {
            log::warn!(
                "Channel {} was moved to {}, which the second log already uses",
                original,
                replacement
            );
        }
    }

    Ok(RemapOutcome {
        records: rewritten,
        remapping,
        pool,
    })
}
