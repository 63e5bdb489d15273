// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Count server wire format.
//!
//! The server answers `GET /api/GetCounts` with a JSON array:
//!
//! ```json
//! [{
//!   "resource": "/index.html",
//!   "timestamp": 1397156430562,
//!   "host": "worker01-ec2",
//!   "referrerCounts": [{"referrer": "05_LOAD", "count": 1002}]
//! }]
//! ```
//!
//! Every field is optional on the wire so that a missing one is reported as a
//! protocol error naming the field, instead of a generic JSON error.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub resource: Option<String>,
    pub timestamp: Option<i64>,
    pub host: Option<String>,
    pub referrer_counts: Option<Vec<WireReferrerCount>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireReferrerCount {
    pub referrer: Option<String>,
    pub count: Option<f64>,
}

/// A validated count record: one host's per-category counts at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRecord {
    pub resource: String,
    pub timestamp: i64,
    pub host: String,
    pub referrer_counts: Vec<ReferrerCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: f64,
}

impl CountRecord {
    pub fn new(resource: &str, timestamp: i64, host: &str, counts: &[(&str, f64)]) -> Self {
        Self {
            resource: resource.to_string(),
            timestamp,
            host: host.to_string(),
            referrer_counts: counts
                .iter()
                .map(|(referrer, count)| ReferrerCount {
                    referrer: referrer.to_string(),
                    count: *count,
                })
                .collect(),
        }
    }
}

/// Validate a whole response batch. The first bad record rejects the batch.
pub fn validate(batch: Vec<WireRecord>) -> Result<Vec<CountRecord>> {
    batch
        .into_iter()
        .enumerate()
        .map(|(index, wire)| validate_record(index, wire))
        .collect()
}

fn validate_record(index: usize, wire: WireRecord) -> Result<CountRecord> {
    let missing = |field| Error::MalformedRecord { index, field };

    let resource = wire.resource.ok_or_else(|| missing("resource"))?;
    let timestamp = wire.timestamp.ok_or_else(|| missing("timestamp"))?;
    let host = wire.host.ok_or_else(|| missing("host"))?;
    let referrer_counts = wire
        .referrer_counts
        .ok_or_else(|| missing("referrerCounts"))?
        .into_iter()
        .map(|rc| {
            let referrer = rc.referrer.ok_or_else(|| missing("referrer"))?;
            let count = rc
                .count
                .filter(|c| c.is_finite())
                .ok_or_else(|| missing("count"))?;
            Ok(ReferrerCount { referrer, count })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CountRecord {
        resource,
        timestamp,
        host,
        referrer_counts,
    })
}

/// Parse and validate a raw response body.
pub fn decode(body: &[u8]) -> Result<Vec<CountRecord>> {
    let batch: Vec<WireRecord> = serde_json::from_slice(body)?;
    validate(batch)
}
