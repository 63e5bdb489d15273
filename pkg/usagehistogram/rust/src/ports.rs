// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Interfaces between the update loop and its collaborators.
//!
//! The loop only talks to the outside through these traits: where counts come
//! from, where the chart and the summary go, and where the selected resource
//! is read.

use async_trait::async_trait;

use crate::errors::Result;
use crate::projection::Series;
use crate::protocol::CountRecord;
use crate::statistics::ReportEntry;

/// Source of count records.
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Fetch the counts of `resource` over the last `range_seconds` seconds.
    async fn get_data(&self, resource: &str, range_seconds: u64) -> Result<Vec<CountRecord>>;
}

/// Chart widget. Staged changes become visible on [`RenderSink::draw`].
pub trait RenderSink: Send + Sync {
    fn set_data(&self, series: Vec<Series>) -> Result<()>;
    fn set_x_range(&self, min: f64, max: f64) -> Result<()>;
    fn set_y_range(&self, min: f64, max: f64) -> Result<()>;
    fn draw(&self) -> Result<()>;
}

/// Statistics panel and page status line.
pub trait SummarySink: Send + Sync {
    fn show_report(&self, entries: Vec<ReportEntry>) -> Result<()>;
    /// `None` hides the "last update" line.
    fn show_last_updated(&self, provenance: Option<&str>) -> Result<()>;
    fn show_resource(&self, resource: &str) -> Result<()>;
}

/// The user's currently selected resource, read once per cycle.
pub trait ResourceInput: Send + Sync {
    /// Raw input; may be empty.
    fn read(&self) -> String;
}
