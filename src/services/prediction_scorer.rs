// src/services/prediction_scorer.rs
use crate::models::prediction::{LiveStats, MatchOutcome, PredictionResult};
use crate::models::snapshot::MatchSnapshot;
use crate::services::timeline;

/// Largest gap between actual and expected goals still counted as accurate.
pub const GOAL_TOLERANCE: f64 = 1.0;

/// Parses `"H:A"`. Legacy `"H-A"` documents are normalized first.
pub fn parse_score(score: &str) -> Option<(u32, u32)> {
    let score = score.trim();
    let normalized = if score.contains(':') {
        score.to_string()
    } else {
        score.replacen('-', ":", 1)
    };

    let (home, away) = normalized.split_once(':')?;
    let home = home.trim().parse().ok()?;
    let away = away.trim().parse().ok()?;
    Some((home, away))
}

/// Scores the pre-match prediction of one match against how it played out.
///
/// The earliest snapshot must carry the prediction and the latest one a
/// parsable score; otherwise nothing is produced.
pub fn score(snapshots: &[MatchSnapshot]) -> Option<PredictionResult> {
    let mut ordered = snapshots.to_vec();
    ordered.sort_by_key(|s| s.timestamp);

    let (Some(earliest), Some(latest)) = (ordered.first(), ordered.last()) else {
        tracing::info!("No snapshots to score");
        return None;
    };
    let match_id = latest.match_id;

    if ordered.len() < 2 {
        tracing::info!(match_id, "Not enough snapshots to score prediction");
        return None;
    }

    let Some(prediction) = earliest.prediction_data.as_ref() else {
        tracing::warn!(match_id, "Earliest snapshot carries no prediction data");
        return None;
    };

    let Some((home_goals, away_goals)) = parse_score(&latest.score) else {
        tracing::warn!(match_id, score = %latest.score, "Final score could not be parsed");
        return None;
    };

    let actual_outcome = MatchOutcome::from_goals(home_goals, away_goals);
    let Some(actual_total_goals) = home_goals.checked_add(away_goals) else {
        tracing::warn!(match_id, score = %latest.score, "Final score is out of range");
        return None;
    };
    let goal_error = (f64::from(actual_total_goals) - prediction.expected_goals).abs();

    let timeline_stats = timeline::reconstruct(&ordered)
        .into_iter()
        .map(|entry| LiveStats::from(entry.snapshot))
        .collect();

    Some(PredictionResult {
        match_id,
        home_team: prediction.home_team.clone(),
        away_team: prediction.away_team.clone(),
        final_score: format!("{}:{}", home_goals, away_goals),
        match_time: latest.played_time.clone().unwrap_or_default(),
        predicted_favorite: prediction.favorite.clone(),
        prediction_confidence: prediction.confidence,
        predicted_expected_goals: prediction.expected_goals,
        actual_outcome,
        actual_total_goals,
        is_prediction_correct: prediction
            .favorite
            .trim()
            .eq_ignore_ascii_case(actual_outcome.as_str()),
        is_goal_prediction_accurate: goal_error <= GOAL_TOLERANCE,
        timeline_stats,
        final_stats: LiveStats::from(latest),
    })
}
