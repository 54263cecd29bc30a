// src/models/snapshot.rs
use bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Home/away pair for a single match statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStat {
    #[serde(default)]
    pub home: i32,
    #[serde(default)]
    pub away: i32,
}

impl TeamStat {
    pub fn new(home: i32, away: i32) -> Self {
        Self { home, away }
    }
}

// Aggregated attack/defense pressure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSituation {
    #[serde(default)]
    pub attacks: TeamStat,
    #[serde(default)]
    pub dangerous_attacks: TeamStat,
    #[serde(default)]
    pub safe_possession: TeamStat,
}

// Shots and set pieces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    #[serde(default)]
    pub shots_on_target: TeamStat,
    #[serde(default)]
    pub shots_off_target: TeamStat,
    #[serde(default)]
    pub corners: TeamStat,
    #[serde(default)]
    pub yellow_cards: TeamStat,
}

/// Pre-match prediction produced upstream. Trusted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionData {
    pub home_team: String,
    pub away_team: String,
    /// "home", "away" or "draw"
    pub favorite: String,
    pub confidence: f64,
    pub expected_goals: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_win_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_win_probability: Option<f64>,
}

// One match's observed state at one instant, as persisted in `match_snapshots`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub match_id: i64,
    pub timestamp: BsonDateTime,
    #[serde(default)]
    pub score: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub match_status: Option<String>,
    #[serde(default)]
    pub played_time: Option<String>,
    #[serde(default)]
    pub match_situation: MatchSituation,
    #[serde(default)]
    pub match_details: MatchDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_data: Option<PredictionData>,
}

impl MatchSnapshot {
    pub fn from_observed(match_id: i64, observed: ObservedState, timestamp: BsonDateTime) -> Self {
        Self {
            id: ObjectId::new(),
            match_id,
            timestamp,
            score: observed.score,
            period: observed.period,
            match_status: observed.match_status,
            played_time: observed.played_time,
            match_situation: observed.match_situation,
            match_details: observed.match_details,
            prediction_data: observed.prediction_data,
        }
    }
}

// Observed state handed over by the enrichment cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ObservedState {
    #[serde(default)]
    #[validate(length(max = 16, message = "Score must be at most 16 characters"))]
    pub score: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "Period must be at most 64 characters"))]
    pub period: Option<String>,

    #[serde(default)]
    #[validate(length(max = 128, message = "Match status must be at most 128 characters"))]
    pub match_status: Option<String>,

    #[serde(default)]
    #[validate(length(max = 16, message = "Played time must be at most 16 characters"))]
    pub played_time: Option<String>,

    #[serde(default)]
    pub match_situation: MatchSituation,

    #[serde(default)]
    pub match_details: MatchDetails,

    #[serde(default)]
    pub prediction_data: Option<PredictionData>,
}
