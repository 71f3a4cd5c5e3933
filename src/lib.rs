// src/lib.rs
//
// linkscope: IPDR session investigation core.
//
// Two tightly coupled jobs:
//   classify: reduce a subject's session records to a behavioral profile
//              and run a configurable threshold rule set over it
//   cluster:  reconstruct the bounded-depth communication network around a
//              subject via shared-destination cross references
//
// Ingestion, persistence, rendering, and the CLI live elsewhere and talk to
// this crate through the narrow traits in [`store`].

pub mod analysis;
pub mod error;
pub mod investigator;
pub mod records;
pub mod store;

pub use analysis::cluster::{NetworkCluster, NetworkClusterBuilder, NetworkEdge, NetworkNode};
pub use analysis::partners::{build_partners, CommunicationPartner};
pub use analysis::profile::{build_profile, SessionShape, UserProfile};
pub use analysis::rules::{classify, Rule, RuleSet, SuspicionVerdict, MB};
pub use error::{InvestigateError, RecordError, StoreError};
pub use investigator::{InvestigationReport, Investigator};
pub use records::{GeoLocation, SessionRecord, SubjectInfo};
pub use store::{GeoResolver, NoGeo, SessionStore, SubjectDirectory};
