// src/analysis/partners.rs
//
// Partner index: groups one subject's sessions by destination address into
// per-partner aggregates (B-party view). Ordered by contact frequency, the
// primary investigative signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;

use crate::records::{GeoLocation, SessionRecord};

/// Aggregate over every session a subject held with one destination address.
/// At most one partner exists per distinct destination per computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationPartner {
    pub destination_ip: IpAddr,
    /// Port of the first session observed for this destination.
    pub destination_port: u16,
    pub total_sessions: u64,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub services: BTreeSet<String>,
    pub protocols: BTreeSet<String>,
    pub first_contact: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
    /// Filled in by geo enrichment when available. Never affects ordering,
    /// classification, or clustering.
    pub location: Option<GeoLocation>,
}

/// Group a subject's sessions by destination address.
///
/// Output is ordered by session count descending, destination address
/// ascending on ties, so repeated runs over the same history are identical.
/// Invalid records are skipped the same way `build_profile` skips them.
pub fn build_partners(sessions: &[SessionRecord]) -> Vec<CommunicationPartner> {
    let mut by_destination: HashMap<IpAddr, CommunicationPartner> = HashMap::new();

    for record in sessions {
        if record.validate().is_err() {
            continue;
        }

        let partner = by_destination
            .entry(record.destination_ip)
            .or_insert_with(|| CommunicationPartner {
                destination_ip: record.destination_ip,
                destination_port: record.destination_port,
                total_sessions: 0,
                bytes_up: 0,
                bytes_down: 0,
                services: BTreeSet::new(),
                protocols: BTreeSet::new(),
                first_contact: record.start,
                last_contact: record.end,
                location: None,
            });

        partner.total_sessions += 1;
        partner.bytes_up += record.bytes_up;
        partner.bytes_down += record.bytes_down;
        partner.services.insert(record.service.clone());
        partner.protocols.insert(record.protocol.clone());
        partner.first_contact = partner.first_contact.min(record.start);
        partner.last_contact = partner.last_contact.max(record.end);
    }

    let mut partners: Vec<CommunicationPartner> = by_destination.into_values().collect();
    partners.sort_by(|a, b| {
        b.total_sessions
            .cmp(&a.total_sessions)
            .then_with(|| a.destination_ip.cmp(&b.destination_ip))
    });
    partners
}
