//! File-based ingestion of the external downloader's CSV exports
//!
//! Network retrieval lives outside this crate; the downloader leaves
//! `seasons.txt`, `teams.txt`, and `games.txt` in the data directory and
//! everything here loads those into the store. Data-integrity problems
//! (bad field counts, malformed dates) fail here, before any game can
//! reach the feature pipeline.

use crate::data::Database;
use crate::{GameId, GameRecord, GameResult, PuckError, Result, TeamId};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::path::Path;

/// Cache of team abbreviation/id lookups, populated from the store.
///
/// Misses resolve to `TeamId::UNKNOWN` with a warning, never an error;
/// downstream feature assembly excludes sentinel rows.
pub struct TeamDirectory {
    abbrev_to_id: HashMap<String, TeamId>,
    id_to_abbrev: HashMap<TeamId, String>,
}

impl TeamDirectory {
    /// Build the directory from all teams currently in the store
    pub fn from_database(db: &Database) -> Result<Self> {
        let mut abbrev_to_id = HashMap::new();
        let mut id_to_abbrev = HashMap::new();
        for team in db.get_all_teams()? {
            abbrev_to_id.insert(team.abbrev.clone(), team.id);
            id_to_abbrev.insert(team.id, team.abbrev);
        }
        Ok(TeamDirectory {
            abbrev_to_id,
            id_to_abbrev,
        })
    }

    pub fn insert(&mut self, abbrev: &str, id: TeamId) {
        self.abbrev_to_id.insert(abbrev.to_string(), id);
        self.id_to_abbrev.insert(id, abbrev.to_string());
    }

    /// Resolve an abbreviation, returning the unknown sentinel on a miss
    pub fn id_from_abbrev(&self, abbrev: &str) -> TeamId {
        match self.abbrev_to_id.get(abbrev) {
            Some(id) => *id,
            None => {
                log::warn!("ID for team with abbreviation {} not found", abbrev);
                TeamId::UNKNOWN
            }
        }
    }

    /// Resolve an id back to its abbreviation, "N/A" on a miss
    pub fn abbrev_from_id(&self, id: TeamId) -> &str {
        match self.id_to_abbrev.get(&id) {
            Some(abbrev) => abbrev,
            None => {
                log::warn!("Abbreviation for team with ID {} not found", id);
                "N/A"
            }
        }
    }
}

/// Loads CSV exports into the store
pub struct Loader<'a> {
    db: &'a Database,
}

/// Counts of rows touched by a load pass
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSummary {
    pub seasons: usize,
    pub teams: usize,
    pub games: usize,
    pub skipped: usize,
}

impl<'a> Loader<'a> {
    pub fn new(db: &'a Database) -> Self {
        Loader { db }
    }

    /// Load seasons, teams, then games from a data directory
    pub fn load_dir<P: AsRef<Path>>(&self, dir: P) -> Result<LoadSummary> {
        let dir = dir.as_ref();
        let mut summary = LoadSummary::default();
        let seasons_path = dir.join("seasons.txt");
        if seasons_path.exists() {
            summary.seasons = self.load_seasons(&seasons_path)?;
        }
        let teams_path = dir.join("teams.txt");
        if teams_path.exists() {
            summary.teams = self.load_teams(&teams_path)?;
        }
        let games = self.load_games(dir.join("games.txt"))?;
        summary.games = games.0;
        summary.skipped = games.1;
        Ok(summary)
    }

    /// Load seasons from a text export: `api_id, start_year, end_year`
    pub fn load_seasons<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut count = 0;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let fields = split_csv_line(line);
            if fields.len() != 3 {
                return Err(PuckError::Parse(format!(
                    "Expected 3 season fields, got {}: {}",
                    fields.len(),
                    line
                )));
            }
            let api_id = parse_i64(&fields[0], "season api id")?;
            self.db.ensure_season(api_id)?;
            count += 1;
        }
        Ok(count)
    }

    /// Load teams from a text export: `name, abbrev, conference, division`
    pub fn load_teams<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut count = 0;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let fields = split_csv_line(line);
            if fields.len() != 4 {
                return Err(PuckError::Parse(format!(
                    "Expected 4 team fields, got {}: {}",
                    fields.len(),
                    line
                )));
            }
            self.db
                .upsert_team(&fields[0], &fields[1], &fields[2], &fields[3])?;
            count += 1;
        }
        Ok(count)
    }

    /// Load games from the 14-field downloader export. Unseen seasons and
    /// team abbreviations are auto-registered so every stored game carries
    /// resolvable references. Returns (loaded, skipped) counts.
    pub fn load_games<P: AsRef<Path>>(&self, path: P) -> Result<(usize, usize)> {
        let content = std::fs::read_to_string(path)?;
        let mut loaded = 0;
        let mut skipped = 0;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match self.parse_game_line(line)? {
                Some(record) => {
                    self.db.upsert_game(&record, false)?;
                    loaded += 1;
                }
                None => skipped += 1,
            }
        }
        Ok((loaded, skipped))
    }

    /// Parse one game line:
    /// `api_id, season, home_id, home_abbrev, away_id, away_abbrev, date,
    ///  day_of_year, year, time, home_goals, away_goals, type, last_period`
    ///
    /// Returns Ok(None) for a game whose two sides are the same team
    /// (malformed upstream record, logged and skipped).
    fn parse_game_line(&self, line: &str) -> Result<Option<GameRecord>> {
        let fields = split_csv_line(line);
        if fields.len() != 14 {
            return Err(PuckError::Parse(format!(
                "Expected 14 game fields, got {}: {}",
                fields.len(),
                line
            )));
        }

        let api_id = parse_i64(&fields[0], "game api id")?;
        let season_api_id = parse_i64(&fields[1], "season id")?;
        let season = self.db.ensure_season(season_api_id)?;
        let home_team = self.db.ensure_team(&fields[3])?;
        let away_team = self.db.ensure_team(&fields[5])?;
        if home_team == away_team {
            log::warn!("Game {} lists the same team on both sides, skipping", api_id);
            return Ok(None);
        }

        let date_played = NaiveDate::parse_from_str(&fields[6], "%Y-%m-%d")
            .map_err(|e| PuckError::Parse(format!("Bad game date '{}': {}", fields[6], e)))?;
        let time_played = if fields[9].is_empty() {
            None
        } else {
            Some(
                NaiveTime::parse_from_str(&fields[9], "%H:%M:%S")
                    .map_err(|e| PuckError::Parse(format!("Bad game time '{}': {}", fields[9], e)))?,
            )
        };
        let day_of_year = parse_i64(&fields[7], "day of year")? as u16;
        let year_played = parse_i64(&fields[8], "year")? as i32;
        let game_type = parse_i64(&fields[12], "game type")? as i32;
        let last_period_type = if fields[13].is_empty() {
            None
        } else {
            Some(fields[13].clone())
        };

        let home_goals = parse_optional_u32(&fields[10], "home goals")?;
        let away_goals = parse_optional_u32(&fields[11], "away goals")?;
        let result = match (home_goals, away_goals, &last_period_type) {
            (Some(hg), Some(ag), Some(period)) => {
                let result = GameResult::from_goals(hg, ag, period);
                if result.is_none() {
                    log::warn!(
                        "Game {} ended {}-{}, a tie, which is not usually possible",
                        api_id,
                        hg,
                        ag
                    );
                }
                result
            }
            _ => None,
        };

        Ok(Some(GameRecord {
            id: GameId(0), // assigned by the store
            api_id,
            season,
            home_team,
            away_team,
            date_played,
            time_played,
            day_of_year,
            year_played,
            game_type,
            last_period_type,
            result,
        }))
    }
}

/// Split a CSV line into trimmed fields
fn split_csv_line(line: &str) -> Vec<String> {
    line.split(',').map(|f| f.trim().to_string()).collect()
}

fn parse_i64(field: &str, what: &str) -> Result<i64> {
    field
        .parse::<i64>()
        .map_err(|e| PuckError::Parse(format!("Bad {} '{}': {}", what, field, e)))
}

fn parse_optional_u32(field: &str, what: &str) -> Result<Option<u32>> {
    if field.is_empty() || field == "None" {
        return Ok(None);
    }
    field
        .parse::<u32>()
        .map(Some)
        .map_err(|e| PuckError::Parse(format!("Bad {} '{}': {}", what, field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Outcome;

    const GAME_LINE: &str =
        "2024020001, 20242025, 6, BOS, 8, MTL, 2024-10-12, 286, 2024, 19:00:00, 3, 2, 2, REG";

    #[test]
    fn test_load_game_line() {
        let db = Database::in_memory().unwrap();
        let loader = Loader::new(&db);
        let record = loader.parse_game_line(GAME_LINE).unwrap().unwrap();

        assert_eq!(record.api_id, 2024020001);
        assert_eq!(record.date_played, NaiveDate::from_ymd_opt(2024, 10, 12).unwrap());
        let result = record.result.unwrap();
        assert_eq!(result.outcome, Outcome::HomeWin);
        assert!(!result.in_ot);
        assert_eq!(result.home_points(), 2);
        assert_eq!(result.away_points(), 0);
    }

    #[test]
    fn test_overtime_loser_point() {
        let db = Database::in_memory().unwrap();
        let loader = Loader::new(&db);
        let line =
            "2024020002, 20242025, 6, BOS, 8, MTL, 2024-10-13, 287, 2024, 19:00:00, 2, 3, 2, OT";
        let record = loader.parse_game_line(line).unwrap().unwrap();
        let result = record.result.unwrap();
        assert_eq!(result.outcome, Outcome::AwayWin);
        assert!(result.in_ot);
        assert_eq!(result.home_points(), 1);
        assert_eq!(result.away_points(), 2);
    }

    #[test]
    fn test_pending_game_has_no_result() {
        let db = Database::in_memory().unwrap();
        let loader = Loader::new(&db);
        let line = "2024020003, 20242025, 6, BOS, 8, MTL, 2024-10-14, 288, 2024, 19:00:00, , , 2, ";
        let record = loader.parse_game_line(line).unwrap().unwrap();
        assert!(record.is_pending());
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let db = Database::in_memory().unwrap();
        let loader = Loader::new(&db);
        assert!(loader.parse_game_line("1, 2, 3").is_err());

        let bad_date =
            "2024020001, 20242025, 6, BOS, 8, MTL, 12/10/2024, 286, 2024, 19:00:00, 3, 2, 2, REG";
        assert!(loader.parse_game_line(bad_date).is_err());
    }

    #[test]
    fn test_directory_miss_returns_sentinel() {
        let db = Database::in_memory().unwrap();
        db.upsert_team("Boston Bruins", "BOS", "Eastern", "Atlantic")
            .unwrap();
        let directory = TeamDirectory::from_database(&db).unwrap();

        assert!(!directory.id_from_abbrev("BOS").is_unknown());
        assert!(directory.id_from_abbrev("XXX").is_unknown());
        assert_eq!(directory.abbrev_from_id(TeamId::UNKNOWN), "N/A");
    }
}
