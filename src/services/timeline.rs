// src/services/timeline.rs
//
// Normalizes irregularly sampled snapshots into at most nine representative
// points, one per ten-minute window of regulation time.

use crate::models::snapshot::MatchSnapshot;
use crate::services::completion::parse_played_minutes;

/// Half-open minute range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSegment {
    pub start: u32,
    pub end: u32,
}

impl TimeSegment {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, minute: u32) -> bool {
        minute >= self.start && minute < self.end
    }

    pub fn midpoint(&self) -> u32 {
        self.start + (self.end - self.start) / 2
    }
}

pub const MATCH_SEGMENTS: [TimeSegment; 9] = [
    TimeSegment::new(0, 10),
    TimeSegment::new(10, 20),
    TimeSegment::new(20, 30),
    TimeSegment::new(30, 40),
    TimeSegment::new(40, 50),
    TimeSegment::new(50, 60),
    TimeSegment::new(60, 70),
    TimeSegment::new(70, 80),
    TimeSegment::new(80, 90),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry<'a> {
    pub segment: TimeSegment,
    pub snapshot: &'a MatchSnapshot,
}

struct Candidate<'a> {
    minute: u32,
    snapshot: &'a MatchSnapshot,
    consumed: bool,
}

/// Picks up to one distinct snapshot per segment, ordered by segment start.
///
/// Inside a segment the snapshot closest to the midpoint wins, earliest
/// timestamp first on ties. An empty segment borrows the closest snapshot not
/// yet used anywhere; once every snapshot is used the remaining segments are
/// skipped, so the result may hold fewer than nine entries but never repeats
/// a snapshot.
pub fn reconstruct(snapshots: &[MatchSnapshot]) -> Vec<TimelineEntry<'_>> {
    let mut candidates: Vec<Candidate<'_>> = snapshots
        .iter()
        .map(|snapshot| Candidate {
            minute: snapshot
                .played_time
                .as_deref()
                .and_then(parse_played_minutes)
                .unwrap_or(0),
            snapshot,
            consumed: false,
        })
        .collect();

    let mut timeline = Vec::with_capacity(MATCH_SEGMENTS.len());

    for segment in MATCH_SEGMENTS {
        let picked = closest_unconsumed(&candidates, segment, true)
            .or_else(|| closest_unconsumed(&candidates, segment, false));

        let Some(index) = picked else {
            break;
        };

        candidates[index].consumed = true;
        timeline.push(TimelineEntry {
            segment,
            snapshot: candidates[index].snapshot,
        });
    }

    timeline
}

fn closest_unconsumed(
    candidates: &[Candidate<'_>],
    segment: TimeSegment,
    within_segment: bool,
) -> Option<usize> {
    let midpoint = segment.midpoint();

    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.consumed)
        .filter(|(_, c)| !within_segment || segment.contains(c.minute))
        .min_by_key(|(_, c)| (c.minute.abs_diff(midpoint), c.snapshot.timestamp))
        .map(|(index, _)| index)
}
