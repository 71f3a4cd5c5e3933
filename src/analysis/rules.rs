// src/analysis/rules.rs
//
// Suspicion classifier: a fixed set of independent threshold rules evaluated
// against a behavioral profile. Thresholds all live on RuleSet; the
// algorithm hard-codes nothing. Evaluation order is fixed so the triggered
// list is reproducible for identical input.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::profile::UserProfile;

pub const MB: u64 = 1_048_576;

/// Named classification rules in their fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    HighDataUsage,
    ExcessiveSessions,
    LateNightActivity,
    MultipleDestinations,
    UnusualServices,
    DataExfiltration,
    HighUploadRatio,
}

impl Rule {
    pub const ALL: [Rule; 7] = [
        Rule::HighDataUsage,
        Rule::ExcessiveSessions,
        Rule::LateNightActivity,
        Rule::MultipleDestinations,
        Rule::UnusualServices,
        Rule::DataExfiltration,
        Rule::HighUploadRatio,
    ];
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighDataUsage => write!(f, "HIGH_DATA_USAGE"),
            Self::ExcessiveSessions => write!(f, "EXCESSIVE_SESSIONS"),
            Self::LateNightActivity => write!(f, "LATE_NIGHT_ACTIVITY"),
            Self::MultipleDestinations => write!(f, "MULTIPLE_DESTINATIONS"),
            Self::UnusualServices => write!(f, "UNUSUAL_SERVICES"),
            Self::DataExfiltration => write!(f, "DATA_EXFILTRATION"),
            Self::HighUploadRatio => write!(f, "HIGH_UPLOAD_RATIO"),
        }
    }
}

/// Externally configurable thresholds, supplied per call. Every comparison
/// is a strict `>`: a subject sitting exactly on a threshold does not fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Total up+down volume above which HIGH_DATA_USAGE fires.
    pub high_data_usage_mb: u64,
    pub excessive_sessions: u64,
    /// Night window start hour (inclusive, wraps past midnight).
    pub late_night_start_hour: u32,
    /// Night window end hour (inclusive).
    pub late_night_end_hour: u32,
    pub late_night_activity_ratio: f64,
    pub multiple_destinations: u64,
    pub unusual_services_count: u64,
    /// DATA_EXFILTRATION: session shorter than this...
    pub short_duration_minutes: i64,
    /// ...while moving more than this.
    pub high_data_session_mb: u64,
    pub high_upload_ratio: f64,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            high_data_usage_mb: 100,
            excessive_sessions: 50,
            late_night_start_hour: 23,
            late_night_end_hour: 5,
            late_night_activity_ratio: 0.3,
            multiple_destinations: 50,
            unusual_services_count: 10,
            short_duration_minutes: 5,
            high_data_session_mb: 50,
            high_upload_ratio: 10.0,
        }
    }
}

/// Classification outcome: one verdict per call, caller owns persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionVerdict {
    pub subject_id: String,
    pub suspicious: bool,
    /// Rules that fired, in evaluation order.
    pub triggered: Vec<Rule>,
}

impl SuspicionVerdict {
    pub fn rule_names(&self) -> Vec<String> {
        self.triggered.iter().map(Rule::to_string).collect()
    }
}

/// Evaluate every rule against the profile. Rules are independent; no rule
/// short-circuits another. A zero-session profile triggers nothing.
pub fn classify(subject_id: &str, profile: &UserProfile, rules: &RuleSet) -> SuspicionVerdict {
    let mut triggered = Vec::new();

    if profile.total_sessions > 0 {
        for rule in Rule::ALL {
            if fires(rule, profile, rules) {
                triggered.push(rule);
            }
        }
    }

    if !triggered.is_empty() {
        debug!(subject = subject_id, rules = ?triggered, "suspicion rules fired");
    }

    SuspicionVerdict {
        subject_id: subject_id.to_string(),
        suspicious: !triggered.is_empty(),
        triggered,
    }
}

fn fires(rule: Rule, profile: &UserProfile, rules: &RuleSet) -> bool {
    match rule {
        Rule::HighDataUsage => profile.total_bytes() > rules.high_data_usage_mb * MB,
        Rule::ExcessiveSessions => profile.total_sessions > rules.excessive_sessions,
        Rule::LateNightActivity => {
            profile.late_night_fraction(rules.late_night_start_hour, rules.late_night_end_hour)
                > rules.late_night_activity_ratio
        }
        Rule::MultipleDestinations => profile.distinct_destinations > rules.multiple_destinations,
        Rule::UnusualServices => profile.services.len() as u64 > rules.unusual_services_count,
        Rule::DataExfiltration => profile.shapes.iter().any(|s| {
            s.duration_secs < rules.short_duration_minutes * 60
                && s.total_bytes > rules.high_data_session_mb * MB
        }),
        Rule::HighUploadRatio => profile.upload_download_ratio() > rules.high_upload_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::profile::SessionShape;

    fn profile_with_sessions(n: u64) -> UserProfile {
        UserProfile {
            total_sessions: n,
            bytes_up: n,
            bytes_down: n * 10,
            ..Default::default()
        }
    }

    #[test]
    fn empty_profile_triggers_nothing() {
        let verdict = classify("A", &UserProfile::default(), &RuleSet::default());
        assert!(!verdict.suspicious);
        assert!(verdict.triggered.is_empty());
    }

    #[test]
    fn excessive_sessions_boundary_is_strict() {
        let rules = RuleSet::default();
        let at = classify("A", &profile_with_sessions(50), &rules);
        assert!(!at.triggered.contains(&Rule::ExcessiveSessions));

        let above = classify("A", &profile_with_sessions(51), &rules);
        assert!(above.triggered.contains(&Rule::ExcessiveSessions));
        assert!(above.suspicious);
    }

    #[test]
    fn high_data_usage_counts_both_directions() {
        let rules = RuleSet::default();
        let profile = UserProfile {
            total_sessions: 1,
            bytes_up: 60 * MB,
            bytes_down: 41 * MB,
            ..Default::default()
        };
        let verdict = classify("A", &profile, &rules);
        assert!(verdict.triggered.contains(&Rule::HighDataUsage));
    }

    #[test]
    fn exfiltration_needs_short_and_heavy_in_one_session() {
        let rules = RuleSet::default();
        let mut profile = profile_with_sessions(2);
        // Heavy but slow, then fast but light: neither qualifies.
        profile.shapes = vec![
            SessionShape { duration_secs: 3_600, total_bytes: 200 * MB },
            SessionShape { duration_secs: 10, total_bytes: MB },
        ];
        assert!(!classify("A", &profile, &rules)
            .triggered
            .contains(&Rule::DataExfiltration));

        profile.shapes.push(SessionShape {
            duration_secs: 90,
            total_bytes: 51 * MB,
        });
        assert!(classify("A", &profile, &rules)
            .triggered
            .contains(&Rule::DataExfiltration));
    }

    #[test]
    fn upload_with_zero_download_is_unusual() {
        let rules = RuleSet::default();
        let profile = UserProfile {
            total_sessions: 1,
            bytes_up: 1,
            bytes_down: 0,
            ..Default::default()
        };
        let verdict = classify("A", &profile, &rules);
        assert!(verdict.triggered.contains(&Rule::HighUploadRatio));
    }

    #[test]
    fn triggered_order_matches_evaluation_order() {
        let rules = RuleSet {
            excessive_sessions: 0,
            multiple_destinations: 0,
            ..Default::default()
        };
        let profile = UserProfile {
            total_sessions: 1,
            distinct_destinations: 1,
            ..Default::default()
        };
        let verdict = classify("A", &profile, &rules);
        assert_eq!(
            verdict.triggered,
            vec![Rule::ExcessiveSessions, Rule::MultipleDestinations]
        );
        assert_eq!(
            verdict.rule_names(),
            vec!["EXCESSIVE_SESSIONS", "MULTIPLE_DESTINATIONS"]
        );
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let rules: RuleSet = serde_json::from_str(r#"{"excessive_sessions": 5}"#).unwrap();
        assert_eq!(rules.excessive_sessions, 5);
        assert_eq!(rules.high_data_usage_mb, 100);
    }
}
