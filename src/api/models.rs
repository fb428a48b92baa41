//! Bodies returned outside the pipeline envelopes

use std::collections::BTreeMap;

use serde::Serialize;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    /// Stored records per table
    pub records: BTreeMap<String, usize>,
    pub pipeline: MetricsSnapshot,
    pub version: String,
}

/// One `(value, label)` pair of an enumeration
#[derive(Debug, Serialize)]
pub struct Choice {
    pub value: &'static str,
    pub label: String,
}
