// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP client for the count server.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::ports::CountSource;
use crate::protocol::{self, CountRecord};

/// Fetches counts with `GET <endpoint>?resource=..&range_in_seconds=..`.
pub struct HttpCountSource {
    endpoint: RwLock<String>,
    client: reqwest::Client,
}

impl HttpCountSource {
    /// `timeout` bounds each request end to end.
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: RwLock::new(endpoint.to_string()),
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        match self.endpoint.read() {
            Ok(endpoint) => endpoint.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Point later requests at another count server.
    pub fn set_endpoint(&self, endpoint: &str) {
        let mut guard = match self.endpoint.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = endpoint.to_string();
    }
}

#[async_trait]
impl CountSource for HttpCountSource {
    async fn get_data(&self, resource: &str, range_seconds: u64) -> Result<Vec<CountRecord>> {
        let url = self.endpoint();
        let transport = |source| Error::Transport {
            resource: resource.to_string(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("resource", resource.to_string()),
                ("range_in_seconds", range_seconds.to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                resource: resource.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let records = protocol::decode(&body)?;
        debug!(
            url = %url,
            resource,
            records = records.len(),
            "fetched counts"
        );
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde::Deserialize;
    use serde_json::{Value, json};

    #[derive(Deserialize)]
    struct CountsQuery {
        resource: String,
        range_in_seconds: u64,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/GetCounts")
    }

    async fn counts(Query(q): Query<CountsQuery>) -> Json<Value> {
        Json(json!([{
            "resource": q.resource,
            "timestamp": 1000,
            "host": "h1",
            "referrerCounts": [{"referrer": "05_LOAD", "count": q.range_in_seconds}]
        }]))
    }

    #[tokio::test]
    async fn test_get_data_sends_query_and_decodes() {
        let url = serve(Router::new().route("/api/GetCounts", get(counts))).await;
        let source = HttpCountSource::new(&url, Duration::from_secs(5)).unwrap();

        let records = source.get_data("/a b", 2).await.unwrap();
        assert_eq!(
            records,
            vec![CountRecord::new("/a b", 1000, "h1", &[("05_LOAD", 2.0)])]
        );
    }

    #[tokio::test]
    async fn test_error_status() {
        let url = serve(Router::new().route(
            "/api/GetCounts",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let source = HttpCountSource::new(&url, Duration::from_secs(5)).unwrap();

        let err = source.get_data("/x", 2).await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let url = serve(Router::new().route(
            "/api/GetCounts",
            get(|| async { Json(json!([{"resource": "/x", "host": "h", "referrerCounts": []}])) }),
        ))
        .await;
        let source = HttpCountSource::new(&url, Duration::from_secs(5)).unwrap();

        let err = source.get_data("/x", 2).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRecord {
                field: "timestamp",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source =
            HttpCountSource::new(&format!("http://{addr}/api/GetCounts"), Duration::from_secs(2))
                .unwrap();
        let err = source.get_data("/x", 2).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[test]
    fn test_set_endpoint() {
        let source = HttpCountSource::new("http://a/api/GetCounts", Duration::from_secs(1)).unwrap();
        source.set_endpoint("http://b/api/GetCounts");
        assert_eq!(source.endpoint(), "http://b/api/GetCounts");
    }
}
