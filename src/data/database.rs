//! SQLite storage for games, teams, seasons, and predictions

use crate::{
    GameId, GameRecord, GameResult, Outcome, PuckError, Result, Season, SeasonId, Team, TeamId,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                abbrev TEXT NOT NULL UNIQUE,
                conference TEXT NOT NULL DEFAULT 'Unknown',
                division TEXT NOT NULL DEFAULT 'Unknown'
            );

            CREATE TABLE IF NOT EXISTS seasons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                api_id INTEGER NOT NULL UNIQUE,
                start_year INTEGER NOT NULL,
                end_year INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                api_id INTEGER NOT NULL UNIQUE,
                season_id INTEGER NOT NULL REFERENCES seasons(id),
                home_team_id INTEGER NOT NULL REFERENCES teams(id),
                away_team_id INTEGER NOT NULL REFERENCES teams(id),
                date_played TEXT NOT NULL,
                time_played TEXT,
                day_of_year INTEGER NOT NULL,
                year_played INTEGER NOT NULL,
                game_type INTEGER NOT NULL DEFAULT 2,
                last_period_type TEXT,
                home_goals INTEGER,
                away_goals INTEGER,
                outcome INTEGER,
                in_ot INTEGER,
                home_points INTEGER,
                away_points INTEGER,
                record_created TEXT NOT NULL DEFAULT (date('now'))
            );

            CREATE TABLE IF NOT EXISTS predicters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                trainable INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS predictions (
                game_id INTEGER NOT NULL REFERENCES games(id),
                predicter_id INTEGER NOT NULL REFERENCES predicters(id),
                score REAL NOT NULL,
                score_binary INTEGER NOT NULL,
                predicted_on TEXT NOT NULL DEFAULT (date('now')),
                PRIMARY KEY (game_id, predicter_id)
            );

            CREATE TABLE IF NOT EXISTS last_training (
                predicter_id INTEGER PRIMARY KEY REFERENCES predicters(id),
                last_date TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(date_played);
            CREATE INDEX IF NOT EXISTS idx_games_teams ON games(home_team_id, away_team_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Register a team if its abbreviation is unseen, with placeholder
    /// reference data. Returns the team id either way.
    pub fn ensure_team(&self, abbrev: &str) -> Result<TeamId> {
        if let Some(team) = self.find_team_by_abbrev(abbrev)? {
            return Ok(team.id);
        }
        self.conn.execute(
            "INSERT INTO teams (name, abbrev) VALUES ('Unknown', ?1)",
            params![abbrev],
        )?;
        Ok(TeamId(self.conn.last_insert_rowid()))
    }

    /// Insert or update full team reference data
    pub fn upsert_team(&self, name: &str, abbrev: &str, conference: &str, division: &str) -> Result<TeamId> {
        self.conn.execute(
            r#"
            INSERT INTO teams (name, abbrev, conference, division)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(abbrev) DO UPDATE SET
                name = excluded.name,
                conference = excluded.conference,
                division = excluded.division
            "#,
            params![name, abbrev, conference, division],
        )?;
        let team = self
            .find_team_by_abbrev(abbrev)?
            .ok_or_else(|| PuckError::UnknownTeam(abbrev.to_string()))?;
        Ok(team.id)
    }

    /// Find a team by abbreviation
    pub fn find_team_by_abbrev(&self, abbrev: &str) -> Result<Option<Team>> {
        let team = self
            .conn
            .query_row(
                "SELECT id, name, abbrev, conference, division FROM teams WHERE abbrev = ?1",
                params![abbrev],
                Self::row_to_team,
            )
            .optional()?;
        Ok(team)
    }

    /// Get team by ID
    pub fn get_team(&self, id: TeamId) -> Result<Team> {
        self.conn
            .query_row(
                "SELECT id, name, abbrev, conference, division FROM teams WHERE id = ?1",
                params![id.0],
                Self::row_to_team,
            )
            .map_err(|_| PuckError::TeamNotFound(id))
    }

    /// Get all teams
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, abbrev, conference, division FROM teams ORDER BY abbrev")?;
        let teams = stmt
            .query_map([], Self::row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    fn row_to_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
        Ok(Team {
            id: TeamId(row.get(0)?),
            name: row.get(1)?,
            abbrev: row.get(2)?,
            conference: row.get(3)?,
            division: row.get(4)?,
        })
    }

    // ==================== Season Operations ====================

    /// Register a season if its external id is unseen. Returns the season id.
    pub fn ensure_season(&self, api_id: i64) -> Result<SeasonId> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM seasons WHERE api_id = ?1",
                params![api_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(SeasonId(id));
        }
        let (start_year, end_year) = Season::years_from_api_id(api_id);
        self.conn.execute(
            "INSERT INTO seasons (api_id, start_year, end_year) VALUES (?1, ?2, ?3)",
            params![api_id, start_year, end_year],
        )?;
        Ok(SeasonId(self.conn.last_insert_rowid()))
    }

    /// Get all seasons
    pub fn get_all_seasons(&self) -> Result<Vec<Season>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, api_id, start_year, end_year FROM seasons ORDER BY start_year")?;
        let seasons = stmt
            .query_map([], |row| {
                Ok(Season {
                    id: SeasonId(row.get(0)?),
                    api_id: row.get(1)?,
                    start_year: row.get(2)?,
                    end_year: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(seasons)
    }

    // ==================== Game Operations ====================

    /// Insert a game, or attach its result if it exists without one.
    ///
    /// A stored outcome is never overwritten unless `overwrite` is set;
    /// results are attached in place exactly once.
    pub fn upsert_game(&self, record: &GameRecord, overwrite: bool) -> Result<GameId> {
        let existing: Option<(i64, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT id, outcome FROM games WHERE api_id = ?1",
                params![record.api_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            None => {
                self.conn.execute(
                    r#"
                    INSERT INTO games (api_id, season_id, home_team_id, away_team_id,
                                       date_played, time_played, day_of_year, year_played,
                                       game_type, last_period_type, home_goals, away_goals,
                                       outcome, in_ot, home_points, away_points)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                    "#,
                    params![
                        record.api_id,
                        record.season.0,
                        record.home_team.0,
                        record.away_team.0,
                        record.date_played.format("%Y-%m-%d").to_string(),
                        record.time_played.map(|t| t.format("%H:%M:%S").to_string()),
                        record.day_of_year,
                        record.year_played,
                        record.game_type,
                        record.last_period_type,
                        record.result.map(|r| r.home_goals),
                        record.result.map(|r| r.away_goals),
                        record.result.map(|r| r.outcome.code()),
                        record.result.map(|r| r.in_ot),
                        record.result.map(|r| r.home_points()),
                        record.result.map(|r| r.away_points()),
                    ],
                )?;
                Ok(GameId(self.conn.last_insert_rowid()))
            }
            Some((id, outcome)) => {
                if outcome.is_none() || overwrite {
                    self.conn.execute(
                        r#"
                        UPDATE games SET
                            home_goals = ?1, away_goals = ?2, outcome = ?3, in_ot = ?4,
                            home_points = ?5, away_points = ?6, last_period_type = ?7
                        WHERE id = ?8
                        "#,
                        params![
                            record.result.map(|r| r.home_goals),
                            record.result.map(|r| r.away_goals),
                            record.result.map(|r| r.outcome.code()),
                            record.result.map(|r| r.in_ot),
                            record.result.map(|r| r.home_points()),
                            record.result.map(|r| r.away_points()),
                            record.last_period_type,
                            id,
                        ],
                    )?;
                } else {
                    log::debug!(
                        "Game with api id {} already has an outcome, skipping",
                        record.api_id
                    );
                }
                Ok(GameId(id))
            }
        }
    }

    /// Get games in a date range (either bound optional), ordered by
    /// date then id. This is the single bulk read the strategies slice.
    pub fn games_in_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<GameRecord>> {
        let start = start
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "0000-01-01".to_string());
        let end = end
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "9999-12-31".to_string());
        let mut stmt = self.conn.prepare(
            "SELECT id, api_id, season_id, home_team_id, away_team_id, date_played,
                    time_played, day_of_year, year_played, game_type, last_period_type,
                    home_goals, away_goals, outcome, in_ot
             FROM games
             WHERE date_played >= ?1 AND date_played <= ?2
             ORDER BY date_played, id",
        )?;
        let games = stmt
            .query_map(params![start, end], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(games)
    }

    /// Earliest date with a game on record
    pub fn earliest_date_played(&self) -> Result<Option<NaiveDate>> {
        let date: Option<String> = self
            .conn
            .query_row("SELECT MIN(date_played) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let date_str: String = row.get(5)?;
        let date_played = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        let time_str: Option<String> = row.get(6)?;
        let time_played =
            time_str.and_then(|s| chrono::NaiveTime::parse_from_str(&s, "%H:%M:%S").ok());

        let home_goals: Option<u32> = row.get(11)?;
        let away_goals: Option<u32> = row.get(12)?;
        let outcome: Option<i64> = row.get(13)?;
        let in_ot: Option<bool> = row.get(14)?;
        let result = match (home_goals, away_goals, outcome) {
            (Some(hg), Some(ag), Some(code)) => Outcome::from_code(code).map(|outcome| GameResult {
                home_goals: hg,
                away_goals: ag,
                outcome,
                in_ot: in_ot.unwrap_or(false),
            }),
            _ => None,
        };

        Ok(GameRecord {
            id: GameId(row.get(0)?),
            api_id: row.get(1)?,
            season: SeasonId(row.get(2)?),
            home_team: TeamId(row.get(3)?),
            away_team: TeamId(row.get(4)?),
            date_played,
            time_played,
            day_of_year: row.get(7)?,
            year_played: row.get(8)?,
            game_type: row.get(9)?,
            last_period_type: row.get(10)?,
            result,
        })
    }

    // ==================== Predicter Operations ====================

    /// Register a predicter by name, or return the existing registration
    pub fn ensure_predicter(&self, name: &str, kind: &str, trainable: bool) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO predicters (name, kind, trainable, active)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(name) DO UPDATE SET kind = excluded.kind, trainable = excluded.trainable
            "#,
            params![name, kind, trainable],
        )?;
        self.predicter_id(name)
    }

    /// Look up a registered predicter's id
    pub fn predicter_id(&self, name: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT id FROM predicters WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| PuckError::PredicterNotFound(name.to_string()))
    }

    /// Record a prediction; repeated calls for the same (game, predicter)
    /// keep only the latest score
    pub fn record_prediction(&self, game_id: GameId, predicter_id: i64, score: f32) -> Result<()> {
        let score_binary = score > 0.5;
        self.conn.execute(
            r#"
            INSERT INTO predictions (game_id, predicter_id, score, score_binary)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(game_id, predicter_id) DO UPDATE SET
                score = excluded.score,
                score_binary = excluded.score_binary,
                predicted_on = date('now')
            "#,
            params![game_id.0, predicter_id, score, score_binary],
        )?;
        Ok(())
    }

    /// Update a predicter's last training date
    pub fn set_last_training_date(&self, predicter_id: i64, date: NaiveDate) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO last_training (predicter_id, last_date)
            VALUES (?1, ?2)
            ON CONFLICT(predicter_id) DO UPDATE SET last_date = excluded.last_date
            "#,
            params![predicter_id, date.format("%Y-%m-%d").to_string()],
        )?;
        Ok(())
    }

    /// Get a predicter's last training date
    pub fn last_training_date(&self, predicter_id: i64) -> Result<Option<NaiveDate>> {
        let date: Option<String> = self
            .conn
            .query_row(
                "SELECT last_date FROM last_training WHERE predicter_id = ?1",
                params![predicter_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
    }

    // ==================== Reporting ====================

    /// Games joined with their recorded predictions for a date range
    pub fn games_with_predictions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PredictionReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.date_played, home.abbrev, away.abbrev, g.home_goals, g.away_goals,
                    g.outcome, p.score, pr.name
             FROM games g
             INNER JOIN predictions p ON g.id = p.game_id
             INNER JOIN predicters pr ON p.predicter_id = pr.id
             INNER JOIN teams home ON g.home_team_id = home.id
             INNER JOIN teams away ON g.away_team_id = away.id
             WHERE pr.active = 1 AND g.date_played >= ?1 AND g.date_played <= ?2
             ORDER BY g.date_played, g.id",
        )?;
        let rows = stmt
            .query_map(
                params![
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    let date_str: String = row.get(0)?;
                    let outcome: Option<i64> = row.get(5)?;
                    Ok(PredictionReport {
                        date_played: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()),
                        home_abbrev: row.get(1)?,
                        away_abbrev: row.get(2)?,
                        home_goals: row.get(3)?,
                        away_goals: row.get(4)?,
                        outcome: outcome.and_then(Outcome::from_code),
                        score: row.get(6)?,
                        predicter_name: row.get(7)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let team_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;
        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        let completed_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM games WHERE outcome IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date_played) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: team_count as usize,
            game_count: game_count as usize,
            completed_count: completed_count as usize,
            earliest_game: self.earliest_date_played()?,
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

/// One row of the games-with-predictions report
#[derive(Debug, Clone)]
pub struct PredictionReport {
    pub date_played: NaiveDate,
    pub home_abbrev: String,
    pub away_abbrev: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub outcome: Option<Outcome>,
    pub score: f32,
    pub predicter_name: String,
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub game_count: usize,
    pub completed_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game(api_id: i64, season: SeasonId, home: TeamId, away: TeamId) -> GameRecord {
        GameRecord {
            id: GameId(0),
            api_id,
            season,
            home_team: home,
            away_team: away,
            date_played: NaiveDate::from_ymd_opt(2024, 10, 12).unwrap(),
            time_played: None,
            day_of_year: 286,
            year_played: 2024,
            game_type: 2,
            last_period_type: None,
            result: None,
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.team_count, 0);
        assert_eq!(stats.game_count, 0);
    }

    #[test]
    fn test_ensure_team_idempotent() {
        let db = Database::in_memory().unwrap();
        let id = db.ensure_team("BOS").unwrap();
        let id2 = db.ensure_team("BOS").unwrap();
        assert_eq!(id, id2);

        let team = db.get_team(id).unwrap();
        assert_eq!(team.abbrev, "BOS");
        assert_eq!(team.name, "Unknown");
    }

    #[test]
    fn test_ensure_season_splits_years() {
        let db = Database::in_memory().unwrap();
        let id = db.ensure_season(20242025).unwrap();
        assert_eq!(db.ensure_season(20242025).unwrap(), id);

        let seasons = db.get_all_seasons().unwrap();
        assert_eq!(seasons.len(), 1);
        assert_eq!(seasons[0].start_year, 2024);
        assert_eq!(seasons[0].end_year, 2025);
    }

    #[test]
    fn test_upsert_game_attaches_result_once() {
        let db = Database::in_memory().unwrap();
        let season = db.ensure_season(20242025).unwrap();
        let bos = db.ensure_team("BOS").unwrap();
        let mtl = db.ensure_team("MTL").unwrap();

        let mut game = make_game(101, season, bos, mtl);
        let id = db.upsert_game(&game, false).unwrap();

        // Pending game has no result
        let stored = &db.games_in_range(None, None).unwrap()[0];
        assert!(stored.is_pending());

        // Attach the result
        game.result = GameResult::from_goals(3, 2, "REG");
        let id2 = db.upsert_game(&game, false).unwrap();
        assert_eq!(id, id2);
        let stored = &db.games_in_range(None, None).unwrap()[0];
        let result = stored.result.unwrap();
        assert_eq!(result.outcome, Outcome::HomeWin);
        assert_eq!(result.home_goals, 3);

        // A second result never overwrites without the flag
        game.result = GameResult::from_goals(0, 5, "REG");
        db.upsert_game(&game, false).unwrap();
        let stored = &db.games_in_range(None, None).unwrap()[0];
        assert_eq!(stored.result.unwrap().outcome, Outcome::HomeWin);
    }

    #[test]
    fn test_record_prediction_idempotent() {
        let db = Database::in_memory().unwrap();
        let season = db.ensure_season(20242025).unwrap();
        let bos = db.ensure_team("BOS").unwrap();
        let mtl = db.ensure_team("MTL").unwrap();
        let mut game = make_game(101, season, bos, mtl);
        game.result = GameResult::from_goals(3, 2, "REG");
        let game_id = db.upsert_game(&game, false).unwrap();

        let predicter = db.ensure_predicter("nn-incremental", "EmbedNet", true).unwrap();
        db.record_prediction(game_id, predicter, 0.7).unwrap();
        db.record_prediction(game_id, predicter, 0.3).unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 10, 12).unwrap();
        let report = db.games_with_predictions(date, date).unwrap();
        assert_eq!(report.len(), 1);
        assert!((report[0].score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_last_training_date_roundtrip() {
        let db = Database::in_memory().unwrap();
        let predicter = db.ensure_predicter("nn-incremental", "EmbedNet", true).unwrap();
        assert!(db.last_training_date(predicter).unwrap().is_none());

        let date = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        db.set_last_training_date(predicter, date).unwrap();
        assert_eq!(db.last_training_date(predicter).unwrap(), Some(date));
    }
}
