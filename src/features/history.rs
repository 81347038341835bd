//! As-of historical aggregates and prior-meeting resolution
//!
//! Both lookups answer questions about a team's past strictly before a
//! given date, from an index built once per assembly pass. Recomputing
//! the index for the same games always yields the same answers.

use crate::features::expansion::expand;
use crate::{GameId, GameRecord, Outcome, SeasonId, TeamId};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Season-to-date summary for one team as of (strictly before) a date.
///
/// With zero prior games every rate and average is exactly 0. That
/// zero fill is a fixed numerical convention, not a missing-data signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoricalAggregate {
    pub games_played: u32,
    pub won_pct: f64,
    pub goals_per_game: f64,
    pub opp_goals_per_game: f64,
    pub points_to_date: u32,
}

/// The most recent earlier completed meeting between two teams
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorMatchup {
    pub game_id: GameId,
    /// The earlier game's own stored outcome (home perspective of that game)
    pub outcome: Outcome,
    pub in_ot: bool,
}

/// Running totals at one point in a team's season log
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    games: u32,
    wins: u32,
    goals_for: u64,
    goals_against: u64,
    points: u32,
}

/// One team's completed games within one season, in (date, game id) order,
/// with cumulative totals alongside
#[derive(Debug, Default)]
struct SeasonLog {
    dates: Vec<NaiveDate>,
    cumulative: Vec<Totals>,
}

#[derive(Debug, Clone, Copy)]
struct MatchupEntry {
    date: NaiveDate,
    game_id: GameId,
    outcome: Outcome,
    in_ot: bool,
}

/// Index over completed games answering both history lookups in O(log n)
pub struct HistoryIndex {
    seasons: HashMap<(TeamId, SeasonId), SeasonLog>,
    matchups: HashMap<(TeamId, TeamId), Vec<MatchupEntry>>,
}

impl HistoryIndex {
    /// Build the index from a set of games; pending games are ignored
    pub fn build(games: &[GameRecord]) -> Self {
        let mut rows = expand(games);
        rows.sort_by_key(|r| (r.date_played, r.game_id));

        let mut seasons: HashMap<(TeamId, SeasonId), SeasonLog> = HashMap::new();
        for row in &rows {
            let log = seasons.entry((row.team, row.season)).or_default();
            let prev = log.cumulative.last().copied().unwrap_or_default();
            log.dates.push(row.date_played);
            log.cumulative.push(Totals {
                games: prev.games + 1,
                wins: prev.wins + u32::from(row.won),
                goals_for: prev.goals_for + u64::from(row.goals_for),
                goals_against: prev.goals_against + u64::from(row.goals_against),
                points: prev.points + u32::from(row.points_awarded),
            });
        }

        let mut matchups: HashMap<(TeamId, TeamId), Vec<MatchupEntry>> = HashMap::new();
        let mut completed: Vec<(&GameRecord, crate::GameResult)> = games
            .iter()
            .filter_map(|g| g.result.map(|r| (g, r)))
            .collect();
        completed.sort_by_key(|(g, _)| (g.date_played, g.id));
        for (game, result) in completed {
            matchups
                .entry(pair_key(game.home_team, game.away_team))
                .or_default()
                .push(MatchupEntry {
                    date: game.date_played,
                    game_id: game.id,
                    outcome: result.outcome,
                    in_ot: result.in_ot,
                });
        }

        HistoryIndex { seasons, matchups }
    }

    /// Season-to-date aggregate for a team over its games strictly before
    /// `date`. Games on `date` itself never count, including doubleheaders.
    pub fn aggregate_before(
        &self,
        team: TeamId,
        season: SeasonId,
        date: NaiveDate,
    ) -> HistoricalAggregate {
        let Some(log) = self.seasons.get(&(team, season)) else {
            return HistoricalAggregate::default();
        };
        let idx = log.dates.partition_point(|d| *d < date);
        if idx == 0 {
            return HistoricalAggregate::default();
        }
        let totals = log.cumulative[idx - 1];
        let n = f64::from(totals.games);
        HistoricalAggregate {
            games_played: totals.games,
            won_pct: f64::from(totals.wins) / n,
            goals_per_game: totals.goals_for as f64 / n,
            opp_goals_per_game: totals.goals_against as f64 / n,
            points_to_date: totals.points,
        }
    }

    /// Most recent completed meeting between two teams strictly before
    /// `date`, in either venue and any season. Equal dates resolve to the
    /// highest game id.
    pub fn prior_matchup(
        &self,
        home: TeamId,
        away: TeamId,
        date: NaiveDate,
    ) -> Option<PriorMatchup> {
        let entries = self.matchups.get(&pair_key(home, away))?;
        let idx = entries.partition_point(|e| e.date < date);
        if idx == 0 {
            return None;
        }
        let entry = entries[idx - 1];
        Some(PriorMatchup {
            game_id: entry.game_id,
            outcome: entry.outcome,
            in_ot: entry.in_ot,
        })
    }
}

/// Order-independent key for a pair of teams
fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameResult;

    fn game(
        id: i64,
        season: i64,
        home: i64,
        away: i64,
        date: (i32, u32, u32),
        score: Option<(u32, u32)>,
    ) -> GameRecord {
        GameRecord {
            id: GameId(id),
            api_id: id,
            season: SeasonId(season),
            home_team: TeamId(home),
            away_team: TeamId(away),
            date_played: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time_played: None,
            day_of_year: 1,
            year_played: date.0,
            game_type: 2,
            last_period_type: None,
            result: score.and_then(|(h, a)| GameResult::from_goals(h, a, "REG")),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zero_prior_games_zero_fills() {
        let games = vec![game(1, 1, 6, 8, (2024, 10, 12), Some((3, 2)))];
        let index = HistoryIndex::build(&games);

        let agg = index.aggregate_before(TeamId(6), SeasonId(1), date(2024, 10, 12));
        assert_eq!(agg.games_played, 0);
        assert_eq!(agg.won_pct, 0.0);
        assert_eq!(agg.goals_per_game, 0.0);
        assert_eq!(agg.opp_goals_per_game, 0.0);
        assert_eq!(agg.points_to_date, 0);
    }

    #[test]
    fn test_aggregate_counts_strictly_earlier_games() {
        let games = vec![
            game(1, 1, 6, 8, (2024, 10, 12), Some((3, 2))),
            game(2, 1, 8, 6, (2024, 10, 14), Some((4, 1))),
            game(3, 1, 6, 8, (2024, 10, 16), Some((2, 1))),
        ];
        let index = HistoryIndex::build(&games);

        // Before game 3: team 6 won game 1 (3-2 at home), lost game 2 (1-4 away)
        let agg = index.aggregate_before(TeamId(6), SeasonId(1), date(2024, 10, 16));
        assert_eq!(agg.games_played, 2);
        assert_eq!(agg.won_pct, 0.5);
        assert_eq!(agg.goals_per_game, 2.0);
        assert_eq!(agg.opp_goals_per_game, 3.0);
        assert_eq!(agg.points_to_date, 2);
    }

    #[test]
    fn test_aggregate_never_crosses_season_boundary() {
        let games = vec![
            game(1, 1, 6, 8, (2024, 4, 10), Some((5, 0))),
            game(2, 2, 6, 8, (2024, 10, 12), Some((2, 1))),
            game(3, 2, 8, 6, (2024, 10, 14), Some((1, 3))),
        ];
        let index = HistoryIndex::build(&games);

        // Season 2 aggregate before game 3 sees only game 2
        let agg = index.aggregate_before(TeamId(6), SeasonId(2), date(2024, 10, 14));
        assert_eq!(agg.games_played, 1);
        assert_eq!(agg.goals_per_game, 2.0);
    }

    #[test]
    fn test_same_day_games_do_not_count_each_other() {
        let games = vec![
            game(1, 1, 6, 8, (2024, 10, 12), Some((3, 2))),
            game(2, 1, 6, 9, (2024, 10, 12), Some((1, 4))),
        ];
        let index = HistoryIndex::build(&games);

        let agg = index.aggregate_before(TeamId(6), SeasonId(1), date(2024, 10, 12));
        assert_eq!(agg.games_played, 0);
    }

    #[test]
    fn test_prior_matchup_chain() {
        let games = vec![
            game(1, 1, 6, 8, (2024, 10, 12), Some((3, 2))),
            game(2, 1, 8, 6, (2024, 10, 14), Some((4, 1))),
            game(3, 1, 6, 8, (2024, 10, 16), Some((2, 1))),
        ];
        let index = HistoryIndex::build(&games);

        // First meeting has no predecessor
        assert!(index
            .prior_matchup(TeamId(6), TeamId(8), date(2024, 10, 12))
            .is_none());

        // Second meeting points at the first
        let prior = index
            .prior_matchup(TeamId(8), TeamId(6), date(2024, 10, 14))
            .unwrap();
        assert_eq!(prior.game_id, GameId(1));
        assert_eq!(prior.outcome, Outcome::HomeWin);

        // Third meeting points at the second, venue-independent
        let prior = index
            .prior_matchup(TeamId(6), TeamId(8), date(2024, 10, 16))
            .unwrap();
        assert_eq!(prior.game_id, GameId(2));
        assert_eq!(prior.outcome, Outcome::HomeWin);
    }

    #[test]
    fn test_prior_matchup_crosses_seasons() {
        let games = vec![
            game(1, 1, 6, 8, (2024, 4, 10), Some((5, 0))),
            game(2, 2, 8, 6, (2024, 10, 12), Some((2, 3))),
        ];
        let index = HistoryIndex::build(&games);

        let prior = index
            .prior_matchup(TeamId(8), TeamId(6), date(2024, 10, 12))
            .unwrap();
        assert_eq!(prior.game_id, GameId(1));
    }

    #[test]
    fn test_prior_matchup_date_tie_takes_highest_id() {
        let games = vec![
            game(7, 1, 6, 8, (2024, 10, 12), Some((3, 2))),
            game(4, 1, 8, 6, (2024, 10, 12), Some((2, 0))),
            game(9, 1, 6, 8, (2024, 10, 20), Some((1, 2))),
        ];
        let index = HistoryIndex::build(&games);

        let prior = index
            .prior_matchup(TeamId(6), TeamId(8), date(2024, 10, 20))
            .unwrap();
        assert_eq!(prior.game_id, GameId(7));
    }

    #[test]
    fn test_pending_game_is_never_a_prior_matchup() {
        let games = vec![
            game(1, 1, 6, 8, (2024, 10, 12), None),
            game(2, 1, 8, 6, (2024, 10, 14), Some((2, 1))),
        ];
        let index = HistoryIndex::build(&games);

        assert!(index
            .prior_matchup(TeamId(8), TeamId(6), date(2024, 10, 14))
            .is_none());
    }
}
