// src/services/completion.rs
use crate::models::snapshot::MatchSnapshot;

pub const FULL_TIME_MINUTE: u32 = 90;

/// Leading minute of a played-time string such as `"67:12"` or `"90+3:12"`.
/// Added time after `+` is ignored.
pub fn parse_played_minutes(played_time: &str) -> Option<u32> {
    let minutes = played_time.split(':').next()?;
    let minutes = minutes.split('+').next()?;
    minutes.trim().parse().ok()
}

/// Whether the snapshot belongs to a finished match.
pub fn is_completed(snapshot: &MatchSnapshot) -> bool {
    let reached_full_time = snapshot
        .played_time
        .as_deref()
        .and_then(parse_played_minutes)
        .is_some_and(|minute| minute >= FULL_TIME_MINUTE);
    if reached_full_time {
        return true;
    }

    let status = match snapshot.match_status.as_deref() {
        Some(status) if !status.is_empty() => status.to_lowercase(),
        _ => return false,
    };

    status.contains("ended") || status.contains("finish")
}
