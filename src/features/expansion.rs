//! Per-team expansion of game records
//!
//! Every completed game becomes two mirror-image rows, one per side, so
//! that season history can be aggregated per team. Pending games
//! contribute no rows: a game with no result never supplies statistics.

use crate::{GameId, GameRecord, Outcome, SeasonId, TeamId};
use chrono::NaiveDate;

/// One side's view of a completed game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamGameRow {
    pub game_id: GameId,
    pub team: TeamId,
    pub opponent: TeamId,
    pub won: bool,
    pub in_ot: bool,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points_awarded: u8,
    pub date_played: NaiveDate,
    pub season: SeasonId,
}

/// Expand completed games into per-team rows, two per game
pub fn expand(games: &[GameRecord]) -> Vec<TeamGameRow> {
    let mut rows = Vec::with_capacity(games.len() * 2);
    for game in games {
        let Some(result) = game.result else {
            continue;
        };
        rows.push(TeamGameRow {
            game_id: game.id,
            team: game.home_team,
            opponent: game.away_team,
            won: result.outcome == Outcome::HomeWin,
            in_ot: result.in_ot,
            goals_for: result.home_goals,
            goals_against: result.away_goals,
            points_awarded: result.home_points(),
            date_played: game.date_played,
            season: game.season,
        });
        rows.push(TeamGameRow {
            game_id: game.id,
            team: game.away_team,
            opponent: game.home_team,
            won: result.outcome == Outcome::AwayWin,
            in_ot: result.in_ot,
            goals_for: result.away_goals,
            goals_against: result.home_goals,
            points_awarded: result.away_points(),
            date_played: game.date_played,
            season: game.season,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameResult;

    fn make_game(
        id: i64,
        home: i64,
        away: i64,
        result: Option<GameResult>,
    ) -> GameRecord {
        GameRecord {
            id: GameId(id),
            api_id: id,
            season: SeasonId(1),
            home_team: TeamId(home),
            away_team: TeamId(away),
            date_played: NaiveDate::from_ymd_opt(2024, 10, 12).unwrap(),
            time_played: None,
            day_of_year: 286,
            year_played: 2024,
            game_type: 2,
            last_period_type: None,
            result,
        }
    }

    #[test]
    fn test_expand_mirrors_sides() {
        let game = make_game(1, 6, 8, GameResult::from_goals(4, 2, "OT"));
        let rows = expand(&[game]);
        assert_eq!(rows.len(), 2);

        let home = &rows[0];
        assert_eq!(home.team, TeamId(6));
        assert_eq!(home.opponent, TeamId(8));
        assert!(home.won);
        assert!(home.in_ot);
        assert_eq!(home.goals_for, 4);
        assert_eq!(home.goals_against, 2);
        assert_eq!(home.points_awarded, 2);

        let away = &rows[1];
        assert_eq!(away.team, TeamId(8));
        assert_eq!(away.opponent, TeamId(6));
        assert!(!away.won);
        assert_eq!(away.goals_for, 2);
        assert_eq!(away.goals_against, 4);
        // Overtime loser keeps a point
        assert_eq!(away.points_awarded, 1);
    }

    #[test]
    fn test_rows_agree_with_record_helpers() {
        let game = make_game(1, 6, 8, GameResult::from_goals(4, 2, "REG"));
        let rows = expand(&[game.clone()]);

        for row in &rows {
            assert_eq!(game.opponent(row.team), Some(row.opponent));
            assert_eq!(game.did_win(row.team), Some(row.won));
            assert_eq!(game.goals_for(row.team), Some(row.goals_for));
            assert_eq!(game.goals_against(row.team), Some(row.goals_against));
        }
        // A team not in the game resolves to nothing
        assert_eq!(game.did_win(TeamId(99)), None);
    }

    #[test]
    fn test_pending_game_contributes_nothing() {
        let games = vec![
            make_game(1, 6, 8, GameResult::from_goals(3, 1, "REG")),
            make_game(2, 8, 6, None),
        ];
        let rows = expand(&games);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.game_id == GameId(1)));
    }
}
