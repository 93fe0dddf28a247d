//! Liveness endpoint.
//!
//! Confirms the process is up and serving. It does not check dependencies.

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Version of the public API surface, independent of the crate version.
pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub message: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

pub async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        message: "API is live",
        status: "ok",
        version: API_VERSION,
        time_stamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
