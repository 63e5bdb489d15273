// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Category label encoding.
//!
//! A category label carries a two-digit histogram bin in characters `[0, 2)`
//! and a channel tag starting at character 3, e.g. `"05_LOAD"` or `"17_RPM"`.
//! Character 2 is a free separator. This is the only module that knows these
//! offsets.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{Error, Result};

const BIN_DIGITS: usize = 2;
const TAG_OFFSET: usize = 3;

/// One measurement axis, identified by the tag embedded in category labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Tag looked up at [`TAG_OFFSET`] in the category label.
    pub tag: String,
    /// Display name used for the chart series and report rows.
    pub name: String,
    /// Physical unit of the scaled report values.
    pub unit: String,
    /// Calibration factor from bin units to physical units.
    pub scale: f64,
    /// Horizontal bar offset so both channels stay visible at the same bin.
    pub x_offset: f64,
}

impl Channel {
    pub fn load() -> Self {
        Self {
            tag: "LOAD".to_string(),
            name: "LOAD".to_string(),
            unit: "%".to_string(),
            scale: 5.0,
            x_offset: -0.25,
        }
    }

    pub fn rpm() -> Self {
        Self {
            tag: "RPM".to_string(),
            name: "RPM".to_string(),
            unit: "rpm".to_string(),
            scale: 300.0,
            x_offset: 0.25,
        }
    }

    /// Whether `label` carries this channel's tag.
    pub fn matches(&self, label: &str) -> bool {
        label
            .get(TAG_OFFSET..TAG_OFFSET + self.tag.len())
            .is_some_and(|tag| tag == self.tag)
    }
}

/// Decoded histogram bin of a category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinLabel(u32);

impl BinLabel {
    pub fn parse(label: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidLabel {
            label: label.to_string(),
            reason,
        };

        let prefix = label
            .get(..BIN_DIGITS)
            .ok_or_else(|| invalid("shorter than the bin prefix"))?;
        if !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("bin prefix is not two digits"));
        }
        prefix
            .parse()
            .map(BinLabel)
            .map_err(|_| invalid("bin prefix is not two digits"))
    }

    pub fn index(self) -> u32 {
        self.0
    }

    /// Center of the bin on the bin-index axis.
    pub fn midpoint(self) -> f64 {
        f64::from(self.0) + 0.5
    }
}

/// The `(bin, total)` pairs of one channel, taken from the store totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelHistogram {
    bins: Vec<(BinLabel, f64)>,
}

impl ChannelHistogram {
    /// Select every total whose label carries `channel`'s tag.
    ///
    /// Labels with the tag but an undecodable bin are skipped with a warning;
    /// labels with another tag are not part of this channel.
    pub fn select(channel: &Channel, totals: &FxHashMap<String, f64>) -> Self {
        let mut bins: Vec<(BinLabel, f64)> = totals
            .iter()
            .filter(|(label, _)| channel.matches(label))
            .filter_map(|(label, total)| match BinLabel::parse(label) {
                Ok(bin) => Some((bin, *total)),
                Err(e) => {
                    warn!(channel = %channel.name, error = %e, "skipping category");
                    None
                }
            })
            .collect();
        bins.sort_by_key(|(bin, _)| *bin);
        Self { bins }
    }

    #[cfg(test)]
    pub(crate) fn from_bins(bins: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            bins: bins.into_iter().map(|(b, t)| (BinLabel(b), t)).collect(),
        }
    }

    pub fn bins(&self) -> &[(BinLabel, f64)] {
        &self.bins
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of all totals in the channel.
    pub fn sample_count(&self) -> f64 {
        self.bins.iter().map(|(_, total)| total).sum()
    }
}
