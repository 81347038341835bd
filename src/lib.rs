//! NHL game outcome prediction
//!
//! Ingests schedule/result exports, derives leakage-free per-team historical
//! features, and backtests an embedding network with a day-by-day
//! walk-forward strategy.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl TeamId {
    /// Sentinel for a team reference that could not be resolved
    pub const UNKNOWN: TeamId = TeamId(-1);

    pub fn is_unknown(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

/// Unique identifier for a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonId(pub i64);

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Season({})", self.0)
    }
}

/// An NHL team. Static reference data, looked up by abbreviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub abbrev: String,
    pub conference: String,
    pub division: String,
}

/// A season, bounded by its start and end years. Historical aggregates
/// never cross a season boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    /// External id encoding the year span, e.g. 20242025
    pub api_id: i64,
    pub start_year: i32,
    pub end_year: i32,
}

impl Season {
    /// Split an external season id like 20242025 into its year boundary
    pub fn years_from_api_id(api_id: i64) -> (i32, i32) {
        ((api_id / 10000) as i32, (api_id % 10000) as i32)
    }
}

/// Final outcome of a completed game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    AwayWin,
}

impl Outcome {
    /// Stored code: 1 = home won, 0 = away won
    pub fn code(&self) -> i64 {
        match self {
            Outcome::HomeWin => 1,
            Outcome::AwayWin => 0,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Outcome::HomeWin),
            0 => Some(Outcome::AwayWin),
            _ => None,
        }
    }

    /// Training label: 1.0 if the home team won
    pub fn label(&self) -> f32 {
        match self {
            Outcome::HomeWin => 1.0,
            Outcome::AwayWin => 0.0,
        }
    }
}

/// Last period type code for a game decided in regulation
pub const REGULATION: &str = "REG";

/// Result of a completed game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub home_goals: u32,
    pub away_goals: u32,
    pub outcome: Outcome,
    /// Decided past regulation (overtime or shootout)
    pub in_ot: bool,
}

impl GameResult {
    /// Build a result from final goals and the last period type.
    ///
    /// Returns None for equal goals: a tie is not a valid final state in
    /// this sport, and such a game stays pending.
    pub fn from_goals(home_goals: u32, away_goals: u32, last_period_type: &str) -> Option<Self> {
        let outcome = match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => return None,
        };
        Some(GameResult {
            home_goals,
            away_goals,
            outcome,
            in_ot: last_period_type != REGULATION,
        })
    }

    /// Standings points for the home side: 2 for a win, 1 for an
    /// overtime/shootout loss, 0 otherwise
    pub fn home_points(&self) -> u8 {
        match self.outcome {
            Outcome::HomeWin => 2,
            Outcome::AwayWin if self.in_ot => 1,
            Outcome::AwayWin => 0,
        }
    }

    /// Standings points for the away side
    pub fn away_points(&self) -> u8 {
        match self.outcome {
            Outcome::AwayWin => 2,
            Outcome::HomeWin if self.in_ot => 1,
            Outcome::HomeWin => 0,
        }
    }
}

/// A single scheduled or completed game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub api_id: i64,
    pub season: SeasonId,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub date_played: NaiveDate,
    pub time_played: Option<NaiveTime>,
    pub day_of_year: u16,
    pub year_played: i32,
    pub game_type: i32,
    pub last_period_type: Option<String>,
    /// None until the game has been played (a "pending" game)
    pub result: Option<GameResult>,
}

impl GameRecord {
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }

    /// Get the opponent for a given team
    pub fn opponent(&self, team: TeamId) -> Option<TeamId> {
        if team == self.home_team {
            Some(self.away_team)
        } else if team == self.away_team {
            Some(self.home_team)
        } else {
            None
        }
    }

    /// Check if the given team won this game (None if pending or not playing)
    pub fn did_win(&self, team: TeamId) -> Option<bool> {
        let result = self.result.as_ref()?;
        if team == self.home_team {
            Some(result.outcome == Outcome::HomeWin)
        } else if team == self.away_team {
            Some(result.outcome == Outcome::AwayWin)
        } else {
            None
        }
    }

    /// Goals scored by a specific team
    pub fn goals_for(&self, team: TeamId) -> Option<u32> {
        let result = self.result.as_ref()?;
        if team == self.home_team {
            Some(result.home_goals)
        } else if team == self.away_team {
            Some(result.away_goals)
        } else {
            None
        }
    }

    /// Goals conceded by a specific team
    pub fn goals_against(&self, team: TeamId) -> Option<u32> {
        let result = self.result.as_ref()?;
        if team == self.home_team {
            Some(result.away_goals)
        } else if team == self.away_team {
            Some(result.home_goals)
        } else {
            None
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum PuckError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Team not found with ID: {0}")]
    TeamNotFound(TeamId),

    #[error("Predicter not registered: {0}")]
    PredicterNotFound(String),

    #[error("Model not trained - run `puckcast backtest --record` first")]
    NoModel,

    #[error("Scaler used before fit")]
    ScalerNotFitted,

    #[error("No completed games between {start} and {end}")]
    NoTrainingData { start: NaiveDate, end: NaiveDate },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, PuckError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Epochs for the one-split strategy (walk-forward always trains a
    /// single pass per day)
    pub epochs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub hidden_size: usize,
    pub embed_dim: usize,
    /// Embedding table capacity; must exceed the dense team count
    pub num_teams: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_dir: String,
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig {
                learning_rate: 1e-3,
                batch_size: 32,
                epochs: 10,
            },
            model: ModelConfig {
                hidden_size: 8,
                embed_dim: 5,
                num_teams: 50,
            },
            data: DataConfig {
                database_path: "data/puckcast.db".to_string(),
                model_dir: "model".to_string(),
                data_dir: "data".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PuckError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| PuckError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PuckError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
