// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Live usage histogram of a machine's LOAD and RPM readings.
//!
//! Count records are polled from a count server, merged into a per-category
//! time series, and turned into two artifacts on every cycle: a percentage
//! histogram per channel and a statistics report ending in a composite usage
//! index.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod label;
pub mod ports;
pub mod projection;
pub mod protocol;
pub mod provider;
pub mod statistics;
pub mod store;
pub mod update_loop;

// Re-export the public API
pub use config::{ViewerConfig, load_config};
pub use dashboard::Dashboard;
pub use errors::{Error, Result};
pub use label::{BinLabel, Channel, ChannelHistogram};
pub use projection::{ChartFrame, Series, SeriesProjector};
pub use protocol::{CountRecord, ReferrerCount};
pub use provider::HttpCountSource;
pub use statistics::{ChannelMoments, ReportEntry, StatisticsReport};
pub use store::{TimeSeriesStore, TotalsPolicy};
pub use update_loop::{Collaborators, LoopHandle, LoopSettings, LoopState, UpdateLoop};
