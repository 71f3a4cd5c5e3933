// src/investigator.rs
//
// High-level investigation entry points. Owns nothing but handles to the
// injected collaborators; every output is a freshly built value object, so
// callers may run investigators for different subjects in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::cluster::{NetworkCluster, NetworkClusterBuilder};
use crate::analysis::partners::{build_partners, CommunicationPartner};
use crate::analysis::profile::{build_profile, UserProfile};
use crate::analysis::rules::{classify, RuleSet, SuspicionVerdict};
use crate::error::InvestigateError;
use crate::records::SubjectInfo;
use crate::store::{GeoResolver, NoGeo, SessionStore, SubjectDirectory};

/// Everything one investigation run produces for a single subject, as plain
/// structured data for the caller's report renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub subject: SubjectInfo,
    pub profile: UserProfile,
    pub verdict: SuspicionVerdict,
    pub partners: Vec<CommunicationPartner>,
    pub generated_at: DateTime<Utc>,
}

impl InvestigationReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub struct Investigator<'a, S, D, G = NoGeo> {
    store: &'a S,
    directory: &'a D,
    geo: &'a G,
}

impl<'a, S, D, G> Investigator<'a, S, D, G>
where
    S: SessionStore,
    D: SubjectDirectory,
    G: GeoResolver,
{
    pub fn new(store: &'a S, directory: &'a D, geo: &'a G) -> Self {
        Self { store, directory, geo }
    }

    fn require_subject(&self, subject: &str) -> Result<SubjectInfo, InvestigateError> {
        self.directory
            .resolve(subject)?
            .ok_or_else(|| InvestigateError::SubjectNotFound(subject.to_string()))
    }

    /// Behavioral profile for one subject. An empty history yields the zero
    /// profile; an unknown subject is a hard `SubjectNotFound`.
    pub fn profile(&self, subject: &str) -> Result<UserProfile, InvestigateError> {
        self.require_subject(subject)?;
        let sessions = self.store.sessions_by_subject(subject)?;
        Ok(build_profile(&sessions))
    }

    pub fn classify(
        &self,
        subject: &str,
        rules: &RuleSet,
    ) -> Result<SuspicionVerdict, InvestigateError> {
        let profile = self.profile(subject)?;
        Ok(classify(subject, &profile, rules))
    }

    /// Partner list ordered by contact frequency, geo-enriched where the
    /// resolver has an answer.
    pub fn partners(&self, subject: &str) -> Result<Vec<CommunicationPartner>, InvestigateError> {
        self.require_subject(subject)?;
        let sessions = self.store.sessions_by_subject(subject)?;
        let mut partners = build_partners(&sessions);
        for partner in &mut partners {
            partner.location = self.geo.locate(&partner.destination_ip);
        }
        Ok(partners)
    }

    pub fn cluster(&self, subject: &str, max_depth: i32) -> Result<NetworkCluster, InvestigateError> {
        NetworkClusterBuilder::new(self.store, self.directory).build(subject, max_depth)
    }

    /// Full single-subject investigation: profile, verdict, partner index.
    pub fn investigate(
        &self,
        subject: &str,
        rules: &RuleSet,
    ) -> Result<InvestigationReport, InvestigateError> {
        info!(subject = %subject, "starting investigation");

        let info = self.require_subject(subject)?;
        let sessions = self.store.sessions_by_subject(subject)?;
        let profile = build_profile(&sessions);
        let verdict = classify(subject, &profile, rules);
        let mut partners = build_partners(&sessions);
        for partner in &mut partners {
            partner.location = self.geo.locate(&partner.destination_ip);
        }

        info!(
            subject = %subject,
            sessions = profile.total_sessions,
            partners = partners.len(),
            suspicious = verdict.suspicious,
            "investigation finished"
        );

        Ok(InvestigationReport {
            subject: info,
            profile,
            verdict,
            partners,
            generated_at: Utc::now(),
        })
    }

    /// Classify every subject the store knows about and return the verdicts
    /// that fired, ordered by subject id. Subjects without a directory entry
    /// are skipped rather than failing the whole sweep.
    pub fn sweep(&self, rules: &RuleSet) -> Result<Vec<SuspicionVerdict>, InvestigateError> {
        let mut subjects = self.store.subject_ids()?;
        subjects.sort();

        let mut flagged = Vec::new();
        for subject in subjects {
            if self.directory.resolve(&subject)?.is_none() {
                warn!(subject = %subject, "sessions on record for unknown subject, sweep skips it");
                continue;
            }
            let sessions = self.store.sessions_by_subject(&subject)?;
            let verdict = classify(&subject, &build_profile(&sessions), rules);
            if verdict.suspicious {
                flagged.push(verdict);
            }
        }
        info!(flagged = flagged.len(), "sweep finished");
        Ok(flagged)
    }
}
