// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Descriptive statistics over a channel's binned totals.
//!
//! Each bin contributes its midpoint (`bin + 0.5`) weighted by its total.
//! From those the engine derives a weighted mean, the population standard
//! deviation and a fourth standardized moment. The composite usage index
//! multiplies `mean * fourth_moment` across both channels.
//!
//! A channel with no samples has every moment equal to zero, which also makes
//! the composite index zero. Nothing here divides by zero.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::label::{Channel, ChannelHistogram};

/// Standard deviations below this are replaced by [`STDDEV_FLOOR`].
const STDDEV_EPSILON: f64 = 0.01;
const STDDEV_FLOOR: f64 = 0.1;
/// Applied to the mean of a near-degenerate distribution before the fourth
/// moment is taken.
const DEGENERATE_MEAN_DAMPING: f64 = 0.95;

pub const REPORT_SEPARATOR_NAME: &str = "_________________________";
pub const REPORT_SEPARATOR_VALUE: &str = "====";
pub const USAGE_INDEX_NAME: &str = "Model-based machine usage index";

/// Moments of one channel in bin units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelMoments {
    /// Weighted mean of the bin midpoints.
    pub mean: f64,
    /// Standard deviation after the numeric floor.
    pub stddev: f64,
    /// Mean used for the fourth moment; damped when the spread is degenerate.
    pub effective_mean: f64,
    /// Fourth standardized moment.
    pub kurtosis: f64,
    /// Sum of all bin totals.
    pub samples: f64,
}

impl ChannelMoments {
    pub fn compute(histogram: &ChannelHistogram) -> Self {
        let n = histogram.sample_count();
        if n == 0.0 || !n.is_finite() {
            return Self::default();
        }

        let bins = histogram.bins();
        let weighted = |f: &dyn Fn(f64) -> f64| -> f64 {
            bins.iter()
                .map(|(bin, total)| f(bin.midpoint()) * total)
                .sum::<f64>()
                / n
        };

        let mean = weighted(&|x: f64| x);
        let mut stddev = weighted(&|x: f64| (x - mean).powi(2)).sqrt();
        if stddev < STDDEV_EPSILON {
            stddev = STDDEV_FLOOR;
        }
        let effective_mean = if stddev <= STDDEV_FLOOR {
            mean * DEGENERATE_MEAN_DAMPING
        } else {
            mean
        };
        let kurtosis = weighted(&|x: f64| ((x - effective_mean) / stddev).powi(4));

        Self {
            mean,
            stddev,
            effective_mean,
            kurtosis,
            samples: n,
        }
    }

    /// This channel's factor of the composite usage index.
    pub fn usage_factor(&self) -> f64 {
        self.effective_mean * self.kurtosis
    }
}

/// Product of every channel's usage factor, folded in the given order.
pub fn composite_index(moments: &[ChannelMoments]) -> f64 {
    if moments.is_empty() {
        return 0.0;
    }
    moments.iter().map(ChannelMoments::usage_factor).product()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,
    pub value: String,
}

impl ReportEntry {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Full statistics panel for a set of channels.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    pub channels: Vec<(Channel, ChannelMoments)>,
    pub usage_index: f64,
}

impl StatisticsReport {
    pub fn compute(channels: &[Channel], totals: &FxHashMap<String, f64>) -> Self {
        let channels: Vec<(Channel, ChannelMoments)> = channels
            .iter()
            .map(|channel| {
                let histogram = ChannelHistogram::select(channel, totals);
                (channel.clone(), ChannelMoments::compute(&histogram))
            })
            .collect();
        let moments: Vec<ChannelMoments> = channels.iter().map(|(_, m)| *m).collect();

        Self {
            usage_index: composite_index(&moments),
            channels,
        }
    }

    /// Display rows: per channel mean, stddev, kurtosis and sample count,
    /// then a separator and the composite index.
    pub fn entries(&self, window_label: &str) -> Vec<ReportEntry> {
        let mut entries = Vec::with_capacity(self.channels.len() * 4 + 2);
        for (channel, m) in &self.channels {
            let (name, unit) = (&channel.name, &channel.unit);
            entries.push(ReportEntry::new(
                format!("{name} mean [{unit}]"),
                format_rounded(m.mean * channel.scale),
            ));
            entries.push(ReportEntry::new(
                format!("{name} std. dev. [{unit}]"),
                format_rounded(m.stddev * channel.scale),
            ));
            entries.push(ReportEntry::new(
                format!("{name} kurtosis [{unit}^4]"),
                format_rounded(m.kurtosis * channel.scale),
            ));
            entries.push(ReportEntry::new(
                format!("{name} readings in {window_label} []"),
                format_count(m.samples),
            ));
        }
        entries.push(ReportEntry::new(
            REPORT_SEPARATOR_NAME,
            REPORT_SEPARATOR_VALUE,
        ));
        entries.push(ReportEntry::new(
            USAGE_INDEX_NAME,
            format_rounded(self.usage_index),
        ));
        entries
    }
}

fn format_rounded(value: f64) -> String {
    let rounded = value.round();
    // avoid "-0"
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded:.0}")
    }
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS * b.abs().max(1.0)
    }

    fn totals(pairs: &[(&str, f64)]) -> FxHashMap<String, f64> {
        pairs.iter().map(|(l, t)| (l.to_string(), *t)).collect()
    }

    #[test]
    fn test_single_bin_clamps_stddev() {
        let m = ChannelMoments::compute(&ChannelHistogram::from_bins([(5, 10.0)]));

        assert!(approx(m.mean, 5.5));
        assert_eq!(m.stddev, 0.1);
        assert_eq!(m.samples, 10.0);
        assert!(approx(m.effective_mean, 5.5 * 0.95));
        // ((5.5 - 5.225) / 0.1)^4 = 2.75^4
        assert!(approx(m.kurtosis, 57.19140625), "kurtosis {}", m.kurtosis);
    }

    #[test]
    fn test_two_bins_mean() {
        let m = ChannelMoments::compute(&ChannelHistogram::from_bins([(0, 5.0), (10, 5.0)]));

        assert_eq!(m.samples, 10.0);
        assert!(approx(m.mean, 5.5));
        assert!(approx(m.stddev, 5.0));
        assert_eq!(m.effective_mean, m.mean);
        // both midpoints sit exactly one stddev from the mean
        assert!(approx(m.kurtosis, 1.0));
    }

    #[test]
    fn test_small_stddev_above_epsilon_still_damps_mean() {
        // stddev = sqrt(0.001 * 0.999), about 0.032
        let m = ChannelMoments::compute(&ChannelHistogram::from_bins([(5, 999.0), (6, 1.0)]));
        assert!(m.stddev >= STDDEV_EPSILON && m.stddev <= STDDEV_FLOOR);
        assert!(approx(m.effective_mean, m.mean * 0.95));
    }

    #[test]
    fn test_wide_spread_does_not_damp() {
        let m = ChannelMoments::compute(&ChannelHistogram::from_bins([(1, 1.0), (9, 3.0)]));
        assert!(m.stddev > STDDEV_FLOOR);
        assert_eq!(m.effective_mean, m.mean);
    }

    #[test]
    fn test_empty_channel_is_all_zero() {
        let m = ChannelMoments::compute(&ChannelHistogram::default());
        assert_eq!(m, ChannelMoments::default());
        assert_eq!(m.usage_factor(), 0.0);
    }

    #[test]
    fn test_zero_totals_is_all_zero() {
        let m = ChannelMoments::compute(&ChannelHistogram::from_bins([(3, 0.0), (4, 0.0)]));
        assert_eq!(m, ChannelMoments::default());
    }

    #[test]
    fn test_composite_index_order_independent() {
        let a = ChannelMoments::compute(&ChannelHistogram::from_bins([(2, 3.0), (7, 11.0)]));
        let b = ChannelMoments::compute(&ChannelHistogram::from_bins([(13, 4.0), (15, 1.0)]));

        let ab = composite_index(&[a, b]);
        let ba = composite_index(&[b, a]);
        assert!(approx(ab, ba));
        assert!(approx(ab, a.usage_factor() * b.usage_factor()));
    }

    #[test]
    fn test_report_layout() {
        let t = totals(&[("05_LOAD", 10.0), ("00_RPM", 5.0), ("10_RPM", 5.0)]);
        let report = StatisticsReport::compute(&[Channel::load(), Channel::rpm()], &t);
        let entries = report.entries("60s");

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "LOAD mean [%]",
                "LOAD std. dev. [%]",
                "LOAD kurtosis [%^4]",
                "LOAD readings in 60s []",
                "RPM mean [rpm]",
                "RPM std. dev. [rpm]",
                "RPM kurtosis [rpm^4]",
                "RPM readings in 60s []",
                REPORT_SEPARATOR_NAME,
                USAGE_INDEX_NAME,
            ]
        );

        let values: Vec<&str> = entries.iter().map(|e| e.value.as_str()).collect();
        // LOAD: 5.5 * 5, 0.1 * 5, 57.19 * 5, 10
        assert_eq!(&values[..4], &["28", "1", "286", "10"]);
        // RPM: 5.5 * 300, 5 * 300, 1 * 300, 10
        assert_eq!(&values[4..8], &["1650", "1500", "300", "10"]);
        assert_eq!(values[8], REPORT_SEPARATOR_VALUE);
        // (5.225 * 57.19140625) * (5.5 * 1.0) = 1643.56...
        assert_eq!(values[9], "1644");
    }

    #[test]
    fn test_report_with_empty_channel() {
        let t = totals(&[("05_LOAD", 10.0)]);
        let report = StatisticsReport::compute(&[Channel::load(), Channel::rpm()], &t);
        let entries = report.entries("60s");

        assert_eq!(report.usage_index, 0.0);
        let rpm: Vec<&str> = entries[4..8].iter().map(|e| e.value.as_str()).collect();
        assert_eq!(rpm, vec!["0", "0", "0", "0"]);
        assert_eq!(entries[9].value, "0");
    }

    #[test]
    fn test_format_count_keeps_fraction() {
        assert_eq!(format_count(10.0), "10");
        assert_eq!(format_count(2.5), "2.5");
    }
}
