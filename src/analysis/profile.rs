// src/analysis/profile.rs
//
// Aggregation engine: reduces a subject's session history into a behavioral
// profile. Pure function of its input; byte sums are exact integer math and
// ratios are only ever computed on demand with zero-denominator guards.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use tracing::debug;

use crate::records::SessionRecord;

/// Compact per-session shape retained on the profile so single-session rules
/// can be evaluated without re-reading the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionShape {
    pub duration_secs: i64,
    pub total_bytes: u64,
}

/// Aggregate behavioral profile for one subject, recomputed per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub total_sessions: u64,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub distinct_destinations: u64,
    pub services: BTreeSet<String>,
    /// Session starts binned by hour of day (end timestamps are not binned).
    pub hourly: [u64; 24],
    /// Session starts binned by weekday, Monday = index 0.
    pub weekday: [u64; 7],
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    /// Sessions carrying the advisory ingestion flag.
    pub flagged_sessions: u64,
    /// Records rejected by per-record validation and excluded from every
    /// other field. Advisory metadata, not an error condition.
    pub excluded_records: u64,
    pub shapes: Vec<SessionShape>,
}

impl UserProfile {
    pub fn total_bytes(&self) -> u64 {
        self.bytes_up + self.bytes_down
    }

    /// Upload-to-download byte ratio. Defined as 0 when nothing was moved;
    /// upload with zero download yields +infinity, which deterministically
    /// exceeds any configured threshold.
    pub fn upload_download_ratio(&self) -> f64 {
        if self.bytes_down == 0 {
            if self.bytes_up == 0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            self.bytes_up as f64 / self.bytes_down as f64
        }
    }

    /// Fraction of sessions starting in the wrapping night window
    /// [start_hour..24) ∪ [0..=end_hour]. 0 when the profile is empty.
    pub fn late_night_fraction(&self, start_hour: u32, end_hour: u32) -> f64 {
        if self.total_sessions == 0 {
            return 0.0;
        }
        let late: u64 = self
            .hourly
            .iter()
            .enumerate()
            .filter(|(h, _)| *h as u32 >= start_hour || *h as u32 <= end_hour)
            .map(|(_, n)| n)
            .sum();
        late as f64 / self.total_sessions as f64
    }

    /// Hour bucket with the most session starts; earliest hour wins ties.
    pub fn most_active_hour(&self) -> Option<u32> {
        if self.total_sessions == 0 {
            return None;
        }
        let (hour, _) = self
            .hourly
            .iter()
            .enumerate()
            .max_by_key(|(h, n)| (**n, 23 - *h))?;
        Some(hour as u32)
    }

    pub fn most_active_weekday(&self) -> Option<Weekday> {
        if self.total_sessions == 0 {
            return None;
        }
        const DAYS: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        let (day, _) = self
            .weekday
            .iter()
            .enumerate()
            .max_by_key(|(d, n)| (**n, 6 - *d))?;
        Some(DAYS[day])
    }
}

/// Build a profile from a subject's session history.
///
/// Empty input is a valid, non-error outcome and yields the zero profile.
/// Records failing `validate()` contribute to nothing except the
/// `excluded_records` count.
pub fn build_profile(sessions: &[SessionRecord]) -> UserProfile {
    let mut profile = UserProfile::default();
    let mut destinations: HashSet<IpAddr> = HashSet::new();

    for record in sessions {
        if record.validate().is_err() {
            profile.excluded_records += 1;
            continue;
        }

        profile.total_sessions += 1;
        profile.bytes_up += record.bytes_up;
        profile.bytes_down += record.bytes_down;
        destinations.insert(record.destination_ip);
        profile.services.insert(record.service.clone());

        profile.hourly[record.start.hour() as usize] += 1;
        profile.weekday[record.start.weekday().num_days_from_monday() as usize] += 1;

        profile.first_activity = Some(match profile.first_activity {
            Some(first) if first <= record.start => first,
            _ => record.start,
        });
        profile.last_activity = Some(match profile.last_activity {
            Some(last) if last >= record.end => last,
            _ => record.end,
        });

        if record.flagged {
            profile.flagged_sessions += 1;
        }
        profile.shapes.push(SessionShape {
            duration_secs: record.duration().num_seconds(),
            total_bytes: record.total_bytes(),
        });
    }

    profile.distinct_destinations = destinations.len() as u64;

    if profile.excluded_records > 0 {
        debug!(
            excluded = profile.excluded_records,
            "records excluded due to invalid duration"
        );
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(subject: &str, start: DateTime<Utc>, secs: i64, up: u64, down: u64) -> SessionRecord {
        SessionRecord {
            subject_id: subject.to_string(),
            device_imei: "356938035643809".into(),
            msisdn: "+919812345678".into(),
            start,
            end: start + chrono::Duration::seconds(secs),
            source_ip: "10.0.0.4".parse().unwrap(),
            source_port: 40022,
            destination_ip: "203.0.113.7".parse().unwrap(),
            destination_port: 443,
            protocol: "TCP".into(),
            bytes_up: up,
            bytes_down: down,
            service: "HTTPS".into(),
            app_name: None,
            flagged: false,
        }
    }

    #[test]
    fn empty_history_yields_zero_profile() {
        let profile = build_profile(&[]);
        assert_eq!(profile, UserProfile::default());
        assert_eq!(profile.total_sessions, 0);
        assert!(profile.first_activity.is_none());
        assert!(profile.services.is_empty());
    }

    #[test]
    fn sums_and_histograms_are_exact() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 2, 15, 0).unwrap(); // Monday 02h
        let t1 = Utc.with_ymd_and_hms(2024, 3, 5, 23, 45, 0).unwrap(); // Tuesday 23h
        let profile = build_profile(&[
            record("A", t0, 300, 1_000, 9_000),
            record("A", t1, 60, 2_000, 500),
        ]);

        assert_eq!(profile.total_sessions, 2);
        assert_eq!(profile.bytes_up, 3_000);
        assert_eq!(profile.bytes_down, 9_500);
        assert_eq!(profile.total_bytes(), 12_500);
        assert_eq!(profile.distinct_destinations, 1);
        assert_eq!(profile.hourly[2], 1);
        assert_eq!(profile.hourly[23], 1);
        assert_eq!(profile.weekday[0], 1);
        assert_eq!(profile.weekday[1], 1);
        assert_eq!(profile.first_activity, Some(t0));
        assert_eq!(
            profile.last_activity,
            Some(t1 + chrono::Duration::seconds(60))
        );
    }

    #[test]
    fn build_profile_is_idempotent() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let sessions = vec![
            record("A", t0, 120, 10, 20),
            record("A", t0 + chrono::Duration::hours(1), 240, 30, 40),
        ];
        assert_eq!(build_profile(&sessions), build_profile(&sessions));
    }

    #[test]
    fn invalid_records_are_skip_counted() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let mut bad = record("A", t0, 60, 5, 5);
        bad.end = bad.start - chrono::Duration::seconds(1);
        let profile = build_profile(&[record("A", t0, 60, 5, 5), bad]);

        assert_eq!(profile.total_sessions, 1);
        assert_eq!(profile.excluded_records, 1);
        assert_eq!(profile.bytes_up, 5);
    }

    #[test]
    fn ratio_guard_handles_zero_download() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let profile = build_profile(&[record("A", t0, 60, 4_096, 0)]);
        assert!(profile.upload_download_ratio().is_infinite());

        let empty = build_profile(&[]);
        assert_eq!(empty.upload_download_ratio(), 0.0);
    }

    #[test]
    fn late_night_fraction_wraps_midnight() {
        let night = Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap();
        let day = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        let profile = build_profile(&[
            record("A", night, 60, 1, 1),
            record("A", day, 60, 1, 1),
        ]);
        assert_eq!(profile.late_night_fraction(23, 5), 0.5);
        assert_eq!(UserProfile::default().late_night_fraction(23, 5), 0.0);
    }
}
