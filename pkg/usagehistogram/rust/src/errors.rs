// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The count server sent a record without one of the required fields.
    #[error("malformed count record at index {index}: missing or invalid `{field}`")]
    MalformedRecord { index: usize, field: &'static str },

    #[error("invalid category label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    #[error("count request for resource {resource:?} failed")]
    Transport {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("count server answered {status} for resource {resource:?}")]
    Status { resource: String, status: u16 },

    #[error("count response is not valid JSON")]
    Decode(#[from] serde_json::Error),

    #[error("count request for resource {resource:?} timed out after {after:?}")]
    Timeout { resource: String, after: Duration },

    #[error("{sink} sink rejected update: {reason}")]
    Sink { sink: &'static str, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
