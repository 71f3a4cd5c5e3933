// src/store/mod.rs
//
// Narrow interfaces to the excluded collaborators: the session record store,
// the subject directory, and the geo enrichment service. The core performs
// no blocking I/O of its own; timeouts and retries belong behind these
// traits.

pub mod memory;

use std::net::IpAddr;

use crate::error::StoreError;
use crate::records::{GeoLocation, SessionRecord, SubjectInfo};

/// Read access to session records. Implementations must support concurrent
/// reads; one cluster computation assumes a consistent snapshot underneath.
pub trait SessionStore {
    fn sessions_by_subject(&self, subject: &str) -> Result<Vec<SessionRecord>, StoreError>;

    /// Every session, regardless of subject, that targeted the destination.
    /// Drives the cross-reference ("who else contacted this B-party") step.
    fn sessions_by_destination(&self, destination: &IpAddr)
        -> Result<Vec<SessionRecord>, StoreError>;

    /// Bulk scan: every subject id with at least one session on record.
    fn subject_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Resolves a subject id to display attributes. `Ok(None)` means the id is
/// unknown, which is not a store failure.
pub trait SubjectDirectory {
    fn resolve(&self, subject: &str) -> Result<Option<SubjectInfo>, StoreError>;
}

/// Optional per-destination location lookup. Infallible by contract:
/// anything the resolver cannot answer is simply absent.
pub trait GeoResolver {
    fn locate(&self, destination: &IpAddr) -> Option<GeoLocation>;
}

/// Geo resolver for callers without an enrichment source.
pub struct NoGeo;

impl GeoResolver for NoGeo {
    fn locate(&self, _destination: &IpAddr) -> Option<GeoLocation> {
        None
    }
}
