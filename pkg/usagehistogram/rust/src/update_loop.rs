// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Fetch, merge, render cycle on a fixed interval.
//!
//! The loop owns the [`TimeSeriesStore`]; nothing else writes to it, so it
//! needs no lock. Cycles never overlap: the next sleep starts only after the
//! current cycle has rendered. [`LoopHandle::stop`] cancels a pending sleep
//! immediately but lets an in-flight cycle finish.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::errors::{Error, Result};
use crate::label::Channel;
use crate::ports::{CountSource, RenderSink, ResourceInput, SummarySink};
use crate::projection::{ChartFrame, SeriesProjector};
use crate::protocol::CountRecord;
use crate::statistics::StatisticsReport;
use crate::store::TimeSeriesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, or waiting after a failed fetch.
    Idle,
    /// Waiting for the count source.
    Fetching,
    /// New counts are in the store.
    Merged,
    /// Chart and summary pushed; sleeping until the next tick.
    Rendered,
    /// No further cycle will run.
    Stopped,
}

impl LoopState {
    pub(crate) fn can_transition_to(self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Fetching, Merged)
                | (Fetching, Idle)
                | (Merged, Rendered)
                | (Rendered, Fetching)
                | (Idle, Stopped)
                | (Rendered, Stopped)
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Fetching => write!(f, "fetching"),
            LoopState::Merged => write!(f, "merged"),
            LoopState::Rendered => write!(f, "rendered"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Timing and selection knobs of the loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub update_interval: Duration,
    pub intervals_per_stats_update: u64,
    pub fetch_range_seconds: u64,
    pub fetch_timeout: Duration,
    pub window: Option<Duration>,
    pub default_resource: String,
    pub stats_window_label: String,
}

impl From<&ViewerConfig> for LoopSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            update_interval: config.update_interval(),
            intervals_per_stats_update: config.intervals_per_stats_update.max(1),
            fetch_range_seconds: config.fetch_range_seconds,
            fetch_timeout: config.fetch_timeout(),
            window: config.window(),
            default_resource: config.default_resource.clone(),
            stats_window_label: config.stats_window_label.clone(),
        }
    }
}

/// Everything the loop talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn CountSource>,
    pub render: Arc<dyn RenderSink>,
    pub summary: Arc<dyn SummarySink>,
    pub input: Arc<dyn ResourceInput>,
}

/// Controls a running [`UpdateLoop`] from the outside.
#[derive(Clone)]
pub struct LoopHandle {
    token: CancellationToken,
    state_rx: watch::Receiver<LoopState>,
}

impl LoopHandle {
    /// Ask the loop to stop at the next cycle boundary.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn state(&self) -> LoopState {
        *self.state_rx.borrow()
    }

    /// Resolves once the loop reached [`LoopState::Stopped`].
    pub async fn stopped(&mut self) {
        // a dropped sender means the loop is gone
        let _ = self
            .state_rx
            .wait_for(|state| *state == LoopState::Stopped)
            .await;
    }
}

pub struct UpdateLoop {
    settings: LoopSettings,
    channels: Vec<Channel>,
    store: TimeSeriesStore,
    projector: SeriesProjector,
    io: Collaborators,
    token: CancellationToken,
    state_tx: watch::Sender<LoopState>,
    cycles: u64,
    rendered_since_stats: u64,
    active_resource: Option<String>,
    shown_resource: Option<String>,
}

impl UpdateLoop {
    pub fn new(config: &ViewerConfig, io: Collaborators) -> Self {
        Self::with_settings(
            LoopSettings::from(config),
            config.channels.clone(),
            TimeSeriesStore::new(config.totals_policy),
            io,
        )
    }

    pub fn with_settings(
        settings: LoopSettings,
        channels: Vec<Channel>,
        store: TimeSeriesStore,
        io: Collaborators,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Idle);
        Self {
            settings,
            projector: SeriesProjector::new(channels.clone()),
            channels,
            store,
            io,
            token: CancellationToken::new(),
            state_tx,
            cycles: 0,
            rendered_since_stats: 0,
            active_resource: None,
            shown_resource: None,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            token: self.token.clone(),
            state_rx: self.state_tx.subscribe(),
        }
    }

    pub fn state(&self) -> LoopState {
        *self.state_tx.borrow()
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Spawn the loop on the current runtime. The join handle yields the loop
    /// back once it stopped.
    pub fn start(mut self) -> (LoopHandle, JoinHandle<Self>) {
        let handle = self.handle();
        let task = tokio::spawn(async move {
            self.run().await;
            self
        });
        (handle, task)
    }

    /// Run one cycle right away, then one per interval until stopped.
    pub async fn run(&mut self) {
        if self.state() != LoopState::Idle {
            warn!(state = %self.state(), "update loop can only start from idle");
            return;
        }

        let interval_ms =
            u64::try_from(self.settings.update_interval.as_millis()).unwrap_or(u64::MAX);
        info!(
            interval_ms,
            stats_every = self.settings.intervals_per_stats_update,
            "update loop started"
        );

        let token = self.token.clone();
        if !token.is_cancelled() {
            self.cycle().await;
        }

        while !token.is_cancelled() {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.settings.update_interval) => {}
            }
            self.cycle().await;
        }

        self.transition(LoopState::Stopped);
        info!(cycles = self.cycles, "update loop stopped");
    }

    async fn cycle(&mut self) {
        self.cycles += 1;
        let resource = self.select_resource();

        self.transition(LoopState::Fetching);
        let records = match self.fetch(&resource).await {
            Ok(records) => records,
            Err(e) => {
                // keep showing the last good data; the next tick retries
                warn!(cycle = self.cycles, resource = %resource, error = %e, "fetch failed");
                self.transition(LoopState::Idle);
                return;
            }
        };

        self.store.merge(&records);
        // the window trails the newest sample, not the local clock
        if let (Some(window), Some(newest)) =
            (self.settings.window, self.store.newest_timestamp())
        {
            let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
            self.store.prune(newest.saturating_sub(window_ms));
        }
        self.transition(LoopState::Merged);
        self.show_resource(&resource);
        debug!(
            cycle = self.cycles,
            records = records.len(),
            categories = self.store.category_count(),
            "merged counts"
        );

        if let Err(e) = self.render_chart(self.projector.project(self.store.totals())) {
            warn!(error = %e, "chart update failed");
        }

        self.rendered_since_stats += 1;
        if self.rendered_since_stats >= self.settings.intervals_per_stats_update {
            self.rendered_since_stats = 0;
            if let Err(e) = self.publish_statistics() {
                warn!(error = %e, "statistics update failed");
            }
        }

        if let Err(e) = self
            .io
            .summary
            .show_last_updated(self.store.last_updated_by())
        {
            warn!(error = %e, "last-updated label update failed");
        }

        self.transition(LoopState::Rendered);
    }

    /// Read the selection fresh. Switching resources drops the old data; the
    /// label follows once the new resource's first fetch succeeded.
    fn select_resource(&mut self) -> String {
        let raw = self.io.input.read();
        let resource = if raw.is_empty() {
            self.settings.default_resource.clone()
        } else {
            raw
        };

        if self.active_resource.as_deref() != Some(resource.as_str()) {
            if let Some(previous) = self.active_resource.replace(resource.clone()) {
                info!(from = %previous, to = %resource, "resource changed, clearing store");
                self.store.clear();
            }
        }
        resource
    }

    /// Label the display with `resource` once its data is in the store.
    fn show_resource(&mut self, resource: &str) {
        if self.shown_resource.as_deref() == Some(resource) {
            return;
        }
        match self.io.summary.show_resource(resource) {
            Ok(()) => self.shown_resource = Some(resource.to_string()),
            Err(e) => warn!(error = %e, "resource label update failed"),
        }
    }

    async fn fetch(&self, resource: &str) -> Result<Vec<CountRecord>> {
        let request = self
            .io
            .source
            .get_data(resource, self.settings.fetch_range_seconds);
        match timeout(self.settings.fetch_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                resource: resource.to_string(),
                after: self.settings.fetch_timeout,
            }),
        }
    }

    fn render_chart(&self, frame: ChartFrame) -> Result<()> {
        let render = &self.io.render;
        render.set_data(frame.series)?;
        render.set_y_range(frame.y_range.0, frame.y_range.1)?;
        render.set_x_range(frame.x_range.0, frame.x_range.1)?;
        render.draw()
    }

    fn publish_statistics(&self) -> Result<()> {
        let report = StatisticsReport::compute(&self.channels, self.store.totals());
        debug!(usage_index = report.usage_index, "computed statistics");
        self.io
            .summary
            .show_report(report.entries(&self.settings.stats_window_label))
    }

    fn transition(&self, next: LoopState) {
        let current = self.state();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "unexpected update loop transition");
        }
        self.state_tx.send_replace(next);
    }
}
