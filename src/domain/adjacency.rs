//! "Double header" filtering.
//!
//! A single free hour is rarely worth travelling for. The filter keeps only
//! sessions that have another free session at the same venue starting
//! exactly one hour before or after.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};

use super::CourtSession;

/// Removes sessions with no back-to-back neighbour at the same venue.
///
/// Sessions are grouped by `(venue, start_time)`; a group survives if the
/// same venue also has a group starting one hour earlier or one hour later.
/// All members of a group are kept or dropped together. Groups come out in
/// order of first appearance, sessions within a group in input order.
#[must_use]
pub fn filter_multi_session(sessions: Vec<CourtSession>) -> Vec<CourtSession> {
    let mut order: Vec<(String, NaiveDateTime)> = Vec::new();
    let mut groups: HashMap<(String, NaiveDateTime), Vec<CourtSession>> = HashMap::new();

    for session in sessions {
        let key = (session.venue_name().to_string(), session.start_time);
        groups
            .entry(key)
            .or_insert_with_key(|key| {
                order.push(key.clone());
                Vec::new()
            })
            .push(session);
    }

    let hour = Duration::hours(1);
    let keep: HashSet<&(String, NaiveDateTime)> = order
        .iter()
        .filter(|(venue, start)| {
            let before = (venue.clone(), *start - hour);
            let after = (venue.clone(), *start + hour);
            groups.contains_key(&before) || groups.contains_key(&after)
        })
        .collect();

    let mut retained = Vec::new();
    for key in &order {
        if keep.contains(key)
            && let Some(group) = groups.remove(key)
        {
            retained.extend(group);
        }
    }
    retained
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{Cost, DataSource, Venue};

    fn at(venue: &Arc<Venue>, hour: u32, minute: u32) -> CourtSession {
        let Some(start) =
            NaiveDate::from_ymd_opt(2022, 1, 1).and_then(|d| d.and_hms_opt(hour, minute, 0))
        else {
            panic!("valid datetime");
        };
        CourtSession {
            venue: Arc::clone(venue),
            label: Some("test-label".to_string()),
            cost: Cost::from_minor_units(1000),
            start_time: start,
            end_time: start + Duration::hours(1),
            url: "test-url".to_string(),
        }
    }

    fn venue(path: &str) -> Arc<Venue> {
        Arc::new(Venue::new(path, DataSource::ClubSpark))
    }

    fn hours(sessions: &[CourtSession]) -> Vec<(String, String)> {
        sessions
            .iter()
            .map(|s| (s.venue_name().to_string(), s.start_time.format("%H:%M").to_string()))
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(filter_multi_session(Vec::new()).is_empty());
    }

    #[test]
    fn lone_session_is_dropped() {
        let v = venue("venue1");
        assert!(filter_multi_session(vec![at(&v, 0, 0)]).is_empty());
    }

    #[test]
    fn consecutive_run_is_kept_entirely() {
        let v = venue("venue1");
        let kept = filter_multi_session(vec![at(&v, 0, 0), at(&v, 1, 0), at(&v, 2, 0)]);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn two_hour_gap_is_not_adjacent() {
        let v = venue("venue1");
        assert!(filter_multi_session(vec![at(&v, 0, 0), at(&v, 2, 0)]).is_empty());
    }

    #[test]
    fn half_hour_offsets_do_not_count() {
        let v = venue("venue1");
        assert!(filter_multi_session(vec![at(&v, 10, 0), at(&v, 11, 30)]).is_empty());
    }

    #[test]
    fn neighbours_must_share_a_venue() {
        let kept = filter_multi_session(vec![
            at(&venue("venue1"), 0, 0),
            at(&venue("venue2"), 1, 0),
            at(&venue("venue3"), 2, 0),
        ]);
        assert!(kept.is_empty());
    }

    #[test]
    fn only_the_adjacent_pair_survives() {
        let v1 = venue("venue1");
        let kept =
            filter_multi_session(vec![at(&v1, 0, 0), at(&v1, 1, 0), at(&venue("venue2"), 2, 0)]);
        assert_eq!(
            hours(&kept),
            vec![
                ("Venue1".to_string(), "00:00".to_string()),
                ("Venue1".to_string(), "01:00".to_string()),
            ]
        );
    }

    #[test]
    fn groups_are_kept_or_dropped_together() {
        let v = venue("venue1");
        let mut court_a = at(&v, 9, 0);
        court_a.label = Some("Court A".to_string());
        let mut court_b = at(&v, 9, 0);
        court_b.label = Some("Court B".to_string());
        let lone = at(&v, 14, 0);

        let kept = filter_multi_session(vec![court_a, lone, court_b, at(&v, 10, 0)]);
        let labels: Vec<_> = kept.iter().filter_map(|s| s.label.as_deref()).collect();
        assert_eq!(labels, vec!["Court A", "Court B", "test-label"]);
    }

    #[test]
    fn sessions_across_midnight_are_adjacent() {
        let v = venue("venue1");
        let late = at(&v, 23, 0);
        let mut early = at(&v, 0, 0);
        early.start_time += Duration::days(1);
        early.end_time += Duration::days(1);
        assert_eq!(filter_multi_session(vec![late, early]).len(), 2);
    }
}
