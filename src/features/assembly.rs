//! Feature row assembly
//!
//! Joins each game to both sides' season-to-date aggregates and to the
//! prior meeting between the two teams, producing one model-ready row per
//! game in (date, id) order. Rows for pending games carry no label and
//! exist so upcoming games can be scored live.

use crate::features::history::{HistoricalAggregate, HistoryIndex};
use crate::{GameId, GameRecord, Outcome, TeamId};
use chrono::NaiveDate;

/// One side's season history as carried on a feature row
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideHistory {
    pub games_played: u32,
    pub won_pct: f64,
    pub goals_per_game: f64,
    pub opp_goals_per_game: f64,
    pub points_to_date: u32,
    /// Ordinal of this game within the team's season (prior games + 1)
    pub game_of_season: u32,
}

impl SideHistory {
    fn from_aggregate(agg: HistoricalAggregate) -> Self {
        SideHistory {
            games_played: agg.games_played,
            won_pct: agg.won_pct,
            goals_per_game: agg.goals_per_game,
            opp_goals_per_game: agg.opp_goals_per_game,
            points_to_date: agg.points_to_date,
            game_of_season: agg.games_played + 1,
        }
    }
}

/// One fully assembled row per game.
///
/// Absence of a prior meeting is encoded as outcome 0 with the
/// has-previous flag down, so the numeric columns are always populated.
/// `date_played` orders the walk-forward loop and is never a model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub game_id: GameId,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home: SideHistory,
    pub away: SideHistory,
    pub prev_matchup_outcome: i64,
    pub prev_matchup_in_ot: bool,
    pub has_prev_matchup: bool,
    pub outcome: Option<Outcome>,
    pub in_ot: Option<bool>,
    pub date_played: NaiveDate,
}

impl FeatureRow {
    /// Training label, present only for completed games
    pub fn label(&self) -> Option<f32> {
        self.outcome.map(|o| o.label())
    }
}

/// Assemble feature rows for every game with resolvable team references.
///
/// Games carrying the unknown-team sentinel are excluded here; history is
/// drawn only from completed games in `games`.
pub fn assemble(games: &[GameRecord]) -> Vec<FeatureRow> {
    let index = HistoryIndex::build(games);

    let mut rows: Vec<FeatureRow> = games
        .iter()
        .filter(|g| !g.home_team.is_unknown() && !g.away_team.is_unknown())
        .map(|game| {
            let home = index.aggregate_before(game.home_team, game.season, game.date_played);
            let away = index.aggregate_before(game.away_team, game.season, game.date_played);
            let prior = index.prior_matchup(game.home_team, game.away_team, game.date_played);

            FeatureRow {
                game_id: game.id,
                home_team: game.home_team,
                away_team: game.away_team,
                home: SideHistory::from_aggregate(home),
                away: SideHistory::from_aggregate(away),
                prev_matchup_outcome: prior.map(|p| p.outcome.code()).unwrap_or(0),
                prev_matchup_in_ot: prior.map(|p| p.in_ot).unwrap_or(false),
                has_prev_matchup: prior.is_some(),
                outcome: game.result.map(|r| r.outcome),
                in_ot: game.result.map(|r| r.in_ot),
                date_played: game.date_played,
            }
        })
        .collect();

    rows.sort_by_key(|r| (r.date_played, r.game_id));
    rows
}
