// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use tracing::debug;

use crate::label::Channel;
use crate::store::TotalsPolicy;

pub const DEFAULT_RESOURCE: &str = "undefined";

fn default_endpoint() -> String {
    "http://127.0.0.1:8080/api/GetCounts".to_string()
}

fn default_update_interval_ms() -> u64 {
    2000
}

fn default_intervals_per_stats_update() -> u64 {
    1
}

fn default_fetch_range_seconds() -> u64 {
    2
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_window_seconds() -> u64 {
    0
}

fn default_resource() -> String {
    DEFAULT_RESOURCE.to_string()
}

fn default_channels() -> Vec<Channel> {
    vec![Channel::load(), Channel::rpm()]
}

fn default_stats_window_label() -> String {
    "60s".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewerConfig {
    /// Full URL of the count server's GetCounts endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Recompute the statistics panel every N cycles.
    #[serde(default = "default_intervals_per_stats_update")]
    pub intervals_per_stats_update: u64,
    /// How far back each fetch asks for data.
    #[serde(default = "default_fetch_range_seconds")]
    pub fetch_range_seconds: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Samples older than this, measured back from the newest merged sample,
    /// are pruned after every merge. 0 keeps everything.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Resource queried while the selection is empty.
    #[serde(default = "default_resource")]
    pub default_resource: String,
    #[serde(default)]
    pub totals_policy: TotalsPolicy,
    /// Exactly two channels: the first is channel A of the usage index.
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,
    /// Aggregation window of the count server, shown in the report.
    #[serde(default = "default_stats_window_label")]
    pub stats_window_label: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            update_interval_ms: default_update_interval_ms(),
            intervals_per_stats_update: default_intervals_per_stats_update(),
            fetch_range_seconds: default_fetch_range_seconds(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            window_seconds: default_window_seconds(),
            default_resource: default_resource(),
            totals_policy: TotalsPolicy::default(),
            channels: default_channels(),
            stats_window_label: default_stats_window_label(),
        }
    }
}

impl ViewerConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// `None` when pruning is disabled.
    pub fn window(&self) -> Option<Duration> {
        (self.window_seconds > 0).then(|| Duration::from_secs(self.window_seconds))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.update_interval_ms > 0, "update_interval_ms must be > 0");
        ensure!(
            self.intervals_per_stats_update > 0,
            "intervals_per_stats_update must be > 0"
        );
        ensure!(self.fetch_timeout_ms > 0, "fetch_timeout_ms must be > 0");
        ensure!(
            !self.default_resource.is_empty(),
            "default_resource must not be empty"
        );

        let [a, b] = self.channels.as_slice() else {
            bail!(
                "exactly two channels are required, got {}",
                self.channels.len()
            );
        };
        for channel in [a, b] {
            ensure!(!channel.tag.is_empty(), "channel tag must not be empty");
            ensure!(
                channel.scale.is_finite() && channel.scale != 0.0,
                "channel {} has invalid scale {}",
                channel.name,
                channel.scale
            );
            ensure!(
                channel.x_offset.is_finite(),
                "channel {} has invalid x_offset",
                channel.name
            );
        }
        ensure!(a.tag != b.tag, "channel tags must differ, both are {}", a.tag);
        Ok(())
    }
}

/// Load the viewer config. Without a path the built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let config = match path {
        Some(path) => parse_config(path)?,
        None => {
            debug!("no config file given, using defaults");
            ViewerConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path) -> Result<ViewerConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    // an empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
        return Ok(ViewerConfig::default());
    }
    let config: ViewerConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
