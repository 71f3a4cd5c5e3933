// src/records.rs
//
// Shared domain types flowing through linkscope. A SessionRecord is one
// immutable IPDR fact produced by ingestion (out of scope here); everything
// the analysis layer computes from it is a freshly built value object.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::RecordError;

/// One logged communication session, read-only to the core.
///
/// Byte counters are `u64`, so the "negative byte count" class of malformed
/// record is unrepresentable; the remaining shape check is on timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject_id: String,
    pub device_imei: String,
    pub msisdn: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub destination_ip: IpAddr,
    pub destination_port: u16,
    pub protocol: String,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub service: String,
    pub app_name: Option<String>,
    /// Advisory flag set by ingestion heuristics. Never authoritative:
    /// classification is always recomputed from the raw record data.
    pub flagged: bool,
}

impl SessionRecord {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_up + self.bytes_down
    }

    /// Shape check applied once at the aggregation boundary.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.end < self.start {
            return Err(RecordError::NegativeDuration);
        }
        Ok(())
    }
}

/// Directory entry for a subject: the output of `SubjectDirectory::resolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub subject_id: String,
    pub display_name: String,
    pub msisdn: String,
    /// Prior suspicion marker from the directory, carried onto cluster nodes.
    pub flagged: bool,
}

/// Per-destination location metadata. Purely additive: absence never affects
/// classification or clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
    pub isp: String,
}
