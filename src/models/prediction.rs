// src/models/prediction.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{MatchSnapshot, TeamStat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Home,
    Away,
    Draw,
}

impl MatchOutcome {
    pub fn from_goals(home: u32, away: u32) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => MatchOutcome::Home,
            std::cmp::Ordering::Less => MatchOutcome::Away,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::Home => "home",
            MatchOutcome::Away => "away",
            MatchOutcome::Draw => "draw",
        }
    }
}

/// Display projection of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStats {
    pub played_time: String,
    pub score: String,
    pub dangerous_attacks: TeamStat,
    pub shots_on_target: TeamStat,
    pub corners: TeamStat,
    pub timestamp: DateTime<Utc>,
}

impl From<&MatchSnapshot> for LiveStats {
    fn from(snapshot: &MatchSnapshot) -> Self {
        Self {
            played_time: snapshot.played_time.clone().unwrap_or_default(),
            score: snapshot.score.clone(),
            dangerous_attacks: snapshot.match_situation.dangerous_attacks,
            shots_on_target: snapshot.match_details.shots_on_target,
            corners: snapshot.match_details.corners,
            timestamp: snapshot.timestamp.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub match_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub final_score: String,
    pub match_time: String,
    pub predicted_favorite: String,
    pub prediction_confidence: f64,
    pub predicted_expected_goals: f64,
    pub actual_outcome: MatchOutcome,
    pub actual_total_goals: u32,
    pub is_prediction_correct: bool,
    pub is_goal_prediction_accurate: bool,
    pub timeline_stats: Vec<LiveStats>,
    pub final_stats: LiveStats,
}

// Envelope pushed to subscribers after each processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResultsPayload {
    pub results: Vec<PredictionResult>,
    pub last_updated_timestamp: DateTime<Utc>,
}
