//! Data Transfer Objects
//!
//! Response types for the JSON endpoints.

use serde::Serialize;

use crate::hub::StreamSnapshot;

/// Full health status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" or "draining"
    pub status: String,
    pub active_streams: usize,
    pub active_clients: usize,
    /// Generator feeding the streams
    pub generator: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Listing of active streams
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamListResponse {
    pub streams: Vec<StreamSnapshot>,
    pub total_clients: usize,
}
