// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP dashboard: the render and summary sink of the binary.
//!
//! The update loop writes into shared state through the sink traits; the page
//! polls the JSON endpoints below and feeds its chart widget.
//!
//! - `GET /api/health`
//! - `GET /api/chart` - last drawn frame
//! - `GET /api/summary` - statistics report, last-updated line, resource
//! - `GET /api/resource`, `PUT /api/resource` - the selected resource

use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::{Error, Result};
use crate::ports::{RenderSink, ResourceInput, SummarySink};
use crate::projection::{ChartFrame, Series};
use crate::statistics::ReportEntry;

#[derive(Debug, Default)]
struct DashboardState {
    staged: ChartFrame,
    published: ChartFrame,
    draws: u64,
    report: Vec<ReportEntry>,
    last_updated: Option<String>,
    shown_resource: Option<String>,
    selected_resource: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub series: Vec<Series>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    /// Number of completed draws; 0 until the first render.
    pub draws: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySnapshot {
    pub description: String,
    pub resource: Option<String>,
    /// "Last update from: ..." line, absent until data arrived.
    pub last_updated: Option<String>,
    pub report: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSelection {
    pub resource: String,
}

pub struct Dashboard {
    description: String,
    state: RwLock<DashboardState>,
}

impl Dashboard {
    pub fn new(description: impl Into<String>, initial_resource: &str) -> Self {
        Self {
            description: description.into(),
            state: RwLock::new(DashboardState {
                selected_resource: initial_resource.to_string(),
                ..Default::default()
            }),
        }
    }

    /// Page header for a loop refreshing every `interval_ms`.
    pub fn describe(channel_names: &[String], interval_ms: u64) -> String {
        format!(
            "Relative frequency of {} readings. Refreshed every {interval_ms} ms",
            channel_names.join(" / ")
        )
    }

    pub fn chart(&self) -> Result<ChartSnapshot> {
        let state = self.read_state("chart")?;
        Ok(ChartSnapshot {
            series: state.published.series.clone(),
            x_range: state.published.x_range,
            y_range: state.published.y_range,
            draws: state.draws,
        })
    }

    pub fn summary(&self) -> Result<SummarySnapshot> {
        let state = self.read_state("summary")?;
        Ok(SummarySnapshot {
            description: self.description.clone(),
            resource: state.shown_resource.clone(),
            last_updated: state
                .last_updated
                .as_ref()
                .map(|by| format!("Last update from: {by}")),
            report: state.report.clone(),
        })
    }

    pub fn select_resource(&self, resource: &str) -> Result<()> {
        self.write_state("resource")?.selected_resource = resource.to_string();
        Ok(())
    }

    fn read_state(&self, sink: &'static str) -> Result<RwLockReadGuard<'_, DashboardState>> {
        self.state.read().map_err(|_| Error::Sink {
            sink,
            reason: "dashboard state lock poisoned".to_string(),
        })
    }

    fn write_state(&self, sink: &'static str) -> Result<RwLockWriteGuard<'_, DashboardState>> {
        self.state.write().map_err(|_| Error::Sink {
            sink,
            reason: "dashboard state lock poisoned".to_string(),
        })
    }
}

impl RenderSink for Dashboard {
    fn set_data(&self, series: Vec<Series>) -> Result<()> {
        self.write_state("chart")?.staged.series = series;
        Ok(())
    }

    fn set_x_range(&self, min: f64, max: f64) -> Result<()> {
        self.write_state("chart")?.staged.x_range = (min, max);
        Ok(())
    }

    fn set_y_range(&self, min: f64, max: f64) -> Result<()> {
        self.write_state("chart")?.staged.y_range = (min, max);
        Ok(())
    }

    fn draw(&self) -> Result<()> {
        let mut state = self.write_state("chart")?;
        state.published = state.staged.clone();
        state.draws += 1;
        Ok(())
    }
}

impl SummarySink for Dashboard {
    fn show_report(&self, entries: Vec<ReportEntry>) -> Result<()> {
        self.write_state("summary")?.report = entries;
        Ok(())
    }

    fn show_last_updated(&self, provenance: Option<&str>) -> Result<()> {
        self.write_state("summary")?.last_updated = provenance.map(str::to_string);
        Ok(())
    }

    fn show_resource(&self, resource: &str) -> Result<()> {
        self.write_state("summary")?.shown_resource = Some(resource.to_string());
        Ok(())
    }
}

impl ResourceInput for Dashboard {
    fn read(&self) -> String {
        match self.state.read() {
            Ok(state) => state.selected_resource.clone(),
            Err(poisoned) => poisoned.into_inner().selected_resource.clone(),
        }
    }
}

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chart", get(chart_handler))
        .route("/api/summary", get(summary_handler))
        .route(
            "/api/resource",
            get(get_resource_handler).put(put_resource_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(dashboard)
}

/// Bind the dashboard listener.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding dashboard to {addr}"))
}

/// Serve the dashboard on `listener` until `shutdown` is cancelled.
pub async fn serve(
    dashboard: Arc<Dashboard>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "dashboard listening");
    axum::serve(listener, router(dashboard))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

// --- Handlers ---

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chart_handler(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    match dashboard.chart() {
        Ok(chart) => Json(chart).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn summary_handler(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    match dashboard.summary() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn get_resource_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<ResourceSelection> {
    Json(ResourceSelection {
        resource: ResourceInput::read(dashboard.as_ref()),
    })
}

async fn put_resource_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Json(selection): Json<ResourceSelection>,
) -> impl IntoResponse {
    match dashboard.select_resource(selection.resource.trim()) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn dashboard() -> Arc<Dashboard> {
        Arc::new(Dashboard::new("test page", ""))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> T {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_staged_data_hidden_until_draw() {
        let d = dashboard();
        d.set_data(vec![Series {
            label: "LOAD".into(),
            data: vec![(1.75, 100.0)],
        }])
        .unwrap();
        assert!(d.chart().unwrap().series.is_empty());
        assert_eq!(d.chart().unwrap().draws, 0);

        d.draw().unwrap();
        let chart = d.chart().unwrap();
        assert_eq!(chart.series[0].data, vec![(1.75, 100.0)]);
        assert_eq!(chart.draws, 1);
    }

    #[test]
    fn test_resource_input_reads_selection() {
        let d = dashboard();
        assert_eq!(ResourceInput::read(d.as_ref()), "");
        d.select_resource("VIN-42").unwrap();
        assert_eq!(ResourceInput::read(d.as_ref()), "VIN-42");
    }

    #[test]
    fn test_describe() {
        let text = Dashboard::describe(&["LOAD".to_string(), "RPM".to_string()], 2000);
        assert_eq!(
            text,
            "Relative frequency of LOAD / RPM readings. Refreshed every 2000 ms"
        );
    }

    #[tokio::test]
    async fn test_chart_endpoint() {
        let d = dashboard();
        d.set_data(vec![Series {
            label: "RPM".into(),
            data: vec![(2.25, 50.0)],
        }])
        .unwrap();
        d.set_x_range(-1.0, 22.0).unwrap();
        d.set_y_range(0.0, 100.0).unwrap();
        d.draw().unwrap();

        let chart: ChartSnapshot = get_json(router(d), "/api/chart").await;
        assert_eq!(chart.series[0].label, "RPM");
        assert_eq!(chart.x_range, (-1.0, 22.0));
        assert_eq!(chart.y_range, (0.0, 100.0));
    }

    #[tokio::test]
    async fn test_summary_endpoint() {
        let d = dashboard();
        d.show_report(vec![ReportEntry {
            name: "LOAD mean [%]".into(),
            value: "28".into(),
        }])
        .unwrap();
        d.show_last_updated(Some("h1 at Thu, 01 Jan 1970 00:00:01 GMT"))
            .unwrap();
        d.show_resource("undefined").unwrap();

        let summary: SummarySnapshot = get_json(router(d.clone()), "/api/summary").await;
        assert_eq!(summary.description, "test page");
        assert_eq!(summary.resource.as_deref(), Some("undefined"));
        assert_eq!(
            summary.last_updated.as_deref(),
            Some("Last update from: h1 at Thu, 01 Jan 1970 00:00:01 GMT")
        );
        assert_eq!(summary.report.len(), 1);

        d.show_last_updated(None).unwrap();
        let summary: SummarySnapshot = get_json(router(d), "/api/summary").await;
        assert_eq!(summary.last_updated, None);
    }

    #[tokio::test]
    async fn test_put_resource() {
        let d = dashboard();
        let response = router(d.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/resource")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"resource": " VIN-7 "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let selection: ResourceSelection = get_json(router(d), "/api/resource").await;
        assert_eq!(selection.resource, "VIN-7");
    }

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(format!("{err:#}").contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(dashboard(), listener, shutdown.clone()));

        let stream = tokio::net::TcpStream::connect(addr).await;
        assert!(stream.is_ok());
        drop(stream);

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_health() {
        let body: serde_json::Value = get_json(router(dashboard()), "/api/health").await;
        assert_eq!(body["status"], "ok");
    }
}
