// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! In-memory window of count samples, keyed by category and timestamp.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::CountRecord;

/// How a category's samples collapse into its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsPolicy {
    /// Count of the sample with the latest timestamp.
    #[default]
    LastSample,
    /// Sum of every retained sample.
    WindowSum,
}

/// Samples of one category. Never empty while owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySeries {
    label: String,
    samples: BTreeMap<i64, f64>,
}

impl CategorySeries {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            samples: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn samples(&self) -> &BTreeMap<i64, f64> {
        &self.samples
    }

    fn total(&self, policy: TotalsPolicy) -> Option<f64> {
        match policy {
            TotalsPolicy::LastSample => self.samples.values().next_back().copied(),
            TotalsPolicy::WindowSum => {
                (!self.samples.is_empty()).then(|| self.samples.values().sum())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    policy: TotalsPolicy,
    series: FxHashMap<String, CategorySeries>,
    totals: FxHashMap<String, f64>,
    last_updated_by: Option<String>,
}

impl TimeSeriesStore {
    pub fn new(policy: TotalsPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> TotalsPolicy {
        self.policy
    }

    /// Merge a batch of records. A later sample for the same category and
    /// timestamp replaces the earlier one.
    pub fn merge(&mut self, records: &[CountRecord]) {
        for record in records {
            self.last_updated_by = Some(provenance(&record.host, record.timestamp));

            for rc in &record.referrer_counts {
                self.series
                    .entry(rc.referrer.clone())
                    .or_insert_with(|| CategorySeries::new(&rc.referrer))
                    .samples
                    .insert(record.timestamp, rc.count);
                self.update_total(&rc.referrer);
            }
        }
    }

    /// Drop every sample older than `cutoff_ms`, and every category left
    /// without samples. Returns the number of samples removed.
    pub fn prune(&mut self, cutoff_ms: i64) -> usize {
        let mut removed = 0;
        let mut touched = Vec::new();

        for (label, series) in self.series.iter_mut() {
            let before = series.samples.len();
            series.samples = series.samples.split_off(&cutoff_ms);
            let dropped = before - series.samples.len();
            if dropped > 0 {
                removed += dropped;
                touched.push(label.clone());
            }
        }

        self.series.retain(|_, series| !series.samples.is_empty());
        for label in &touched {
            self.update_total(label);
        }

        if removed > 0 {
            debug!(
                cutoff_ms,
                removed,
                categories = self.series.len(),
                "pruned samples"
            );
        }
        removed
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.totals.clear();
        self.last_updated_by = None;
    }

    pub fn totals(&self) -> &FxHashMap<String, f64> {
        &self.totals
    }

    /// Who supplied the most recently merged record, and when.
    pub fn last_updated_by(&self) -> Option<&str> {
        self.last_updated_by.as_deref()
    }

    pub fn series(&self, label: &str) -> Option<&CategorySeries> {
        self.series.get(label)
    }

    pub fn category_count(&self) -> usize {
        self.series.len()
    }

    /// Latest timestamp across every category.
    pub fn newest_timestamp(&self) -> Option<i64> {
        self.series
            .values()
            .filter_map(|s| s.samples.keys().next_back().copied())
            .max()
    }

    pub fn sample_count(&self) -> usize {
        self.series.values().map(|s| s.samples.len()).sum()
    }

    fn update_total(&mut self, label: &str) {
        match self.series.get(label).and_then(|s| s.total(self.policy)) {
            Some(total) => {
                self.totals.insert(label.to_string(), total);
            }
            None => {
                self.totals.remove(label);
            }
        }
    }
}

fn provenance(host: &str, timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(at) => format!("{host} at {}", at.format("%a, %d %b %Y %H:%M:%S GMT")),
        None => format!("{host} at {timestamp_ms} ms"),
    }
}
