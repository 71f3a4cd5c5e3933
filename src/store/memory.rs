// src/store/memory.rs
//
// Concurrent in-memory store. DashMap = sharded concurrent HashMap, safe for
// parallel per-subject analysis with no outer mutex.
//
// Shape:
//   - Per-subject session log (append-only within one run)
//   - Destination reverse index: address -> sessions from every subject
//   - Subject directory and geo table as flat maps
//
// This is the in-memory equivalent of the production deployment's
// ORM-backed record store, and the fixture of choice for tests.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::records::{GeoLocation, SessionRecord, SubjectInfo};
use crate::store::{GeoResolver, SessionStore, SubjectDirectory};

#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<String, Arc<RwLock<Vec<SessionRecord>>>>,
    destination_idx: DashMap<IpAddr, Arc<RwLock<Vec<SessionRecord>>>>,
    subjects: DashMap<String, SubjectInfo>,
    locations: DashMap<IpAddr, GeoLocation>,
    pub total_records: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record, updating the per-subject log and the destination
    /// reverse index. Shape validation happened at ingestion; records are
    /// stored as given.
    pub fn ingest(&self, record: SessionRecord) {
        self.total_records.fetch_add(1, Ordering::Relaxed);

        self.sessions
            .entry(record.subject_id.clone())
            .or_default()
            .write()
            .push(record.clone());

        self.destination_idx
            .entry(record.destination_ip)
            .or_default()
            .write()
            .push(record);
    }

    pub fn register_subject(&self, info: SubjectInfo) {
        debug!(subject = %info.subject_id, "subject registered");
        self.subjects.insert(info.subject_id.clone(), info);
    }

    pub fn set_location(&self, destination: IpAddr, location: GeoLocation) {
        self.locations.insert(destination, location);
    }

    pub fn n_subjects(&self) -> usize {
        self.subjects.len()
    }
}

impl SessionStore for MemoryStore {
    fn sessions_by_subject(&self, subject: &str) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .sessions
            .get(subject)
            .map(|log| log.read().clone())
            .unwrap_or_default())
    }

    fn sessions_by_destination(
        &self,
        destination: &IpAddr,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .destination_idx
            .get(destination)
            .map(|log| log.read().clone())
            .unwrap_or_default())
    }

    fn subject_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

impl SubjectDirectory for MemoryStore {
    fn resolve(&self, subject: &str) -> Result<Option<SubjectInfo>, StoreError> {
        Ok(self.subjects.get(subject).map(|s| s.clone()))
    }
}

impl GeoResolver for MemoryStore {
    fn locate(&self, destination: &IpAddr) -> Option<GeoLocation> {
        self.locations.get(destination).map(|l| l.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(subject: &str, dest: &str) -> SessionRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        SessionRecord {
            subject_id: subject.to_string(),
            device_imei: "356938035643809".into(),
            msisdn: "+919812345678".into(),
            start,
            end: start + chrono::Duration::seconds(60),
            source_ip: "10.0.0.4".parse().unwrap(),
            source_port: 40022,
            destination_ip: dest.parse().unwrap(),
            destination_port: 443,
            protocol: "TCP".into(),
            bytes_up: 10,
            bytes_down: 20,
            service: "HTTPS".into(),
            app_name: None,
            flagged: false,
        }
    }

    #[test]
    fn destination_index_spans_subjects() {
        let store = MemoryStore::new();
        store.ingest(record("A", "203.0.113.1"));
        store.ingest(record("B", "203.0.113.1"));
        store.ingest(record("B", "203.0.113.2"));

        let dest: IpAddr = "203.0.113.1".parse().unwrap();
        let hits = store.sessions_by_destination(&dest).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(store.sessions_by_subject("B").unwrap().len(), 2);
        assert_eq!(store.total_records.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn subject_ids_are_sorted() {
        let store = MemoryStore::new();
        store.ingest(record("B", "203.0.113.1"));
        store.ingest(record("A", "203.0.113.1"));
        assert_eq!(store.subject_ids().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn unknown_lookups_are_empty_not_errors() {
        let store = MemoryStore::new();
        assert!(store.sessions_by_subject("ghost").unwrap().is_empty());
        assert!(store.resolve("ghost").unwrap().is_none());
        assert!(store.locate(&"203.0.113.9".parse().unwrap()).is_none());
    }
}
