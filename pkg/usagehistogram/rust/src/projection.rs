// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Totals to renderable bar series, normalized to percent per channel.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::label::{Channel, ChannelHistogram};

/// Chart x range: one bin of margin around the bin indices.
pub const X_RANGE: (f64, f64) = (-1.0, 22.0);
/// Chart y range in percent.
pub const Y_RANGE: (f64, f64) = (0.0, 100.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    /// `(x, y)` points, sorted by x.
    pub data: Vec<(f64, f64)>,
}

/// What a render sink draws in one update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub series: Vec<Series>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl Default for ChartFrame {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            x_range: X_RANGE,
            y_range: Y_RANGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesProjector {
    channels: Vec<Channel>,
}

impl SeriesProjector {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    /// One series per channel, in reverse configuration order (RPM before
    /// LOAD with the default channels).
    pub fn project(&self, totals: &FxHashMap<String, f64>) -> ChartFrame {
        let series = self
            .channels
            .iter()
            .rev()
            .map(|channel| project_channel(channel, &ChannelHistogram::select(channel, totals)))
            .collect();

        ChartFrame {
            series,
            ..Default::default()
        }
    }
}

fn project_channel(channel: &Channel, histogram: &ChannelHistogram) -> Series {
    let sum = histogram.sample_count();
    let data = histogram
        .bins()
        .iter()
        .map(|(bin, total)| {
            let x = f64::from(bin.index()) + channel.x_offset;
            // all-zero channel: draw empty bars rather than NaN
            let y = if sum == 0.0 { 0.0 } else { total / sum * 100.0 };
            (x, y)
        })
        .collect();

    Series {
        label: channel.name.clone(),
        data,
    }
}
