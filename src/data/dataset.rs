//! In-memory dataset of assembled feature rows
//!
//! The strategies read the store once, assemble rows, and slice this
//! dataset by date instead of re-querying storage per day.

use crate::features::FeatureRow;
use crate::training::scaler::StandardScaler;
use crate::{GameId, Result, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of continuous model inputs per row
pub const CONT_DIM: usize = 13;

/// The continuous (scaled) inputs, in fixed column order: five season
/// history fields per side, then the prior-meeting columns. Team ids and
/// the played date are deliberately absent.
pub fn continuous_features(row: &FeatureRow) -> [f32; CONT_DIM] {
    [
        row.home.won_pct as f32,
        row.home.goals_per_game as f32,
        row.home.opp_goals_per_game as f32,
        row.home.points_to_date as f32,
        row.home.game_of_season as f32,
        row.away.won_pct as f32,
        row.away.goals_per_game as f32,
        row.away.opp_goals_per_game as f32,
        row.away.points_to_date as f32,
        row.away.game_of_season as f32,
        row.prev_matchup_outcome as f32,
        f32::from(u8::from(row.prev_matchup_in_ot)),
        f32::from(u8::from(row.has_prev_matchup)),
    ]
}

/// Date-ordered collection of feature rows
#[derive(Debug, Clone, Default)]
pub struct GameDataset {
    rows: Vec<FeatureRow>,
}

impl GameDataset {
    /// Create a dataset, enforcing (date, game id) order
    pub fn new(mut rows: Vec<FeatureRow>) -> Self {
        rows.sort_by_key(|r| (r.date_played, r.game_id));
        GameDataset { rows }
    }

    /// Only the rows with a known outcome
    pub fn labeled(&self) -> GameDataset {
        GameDataset {
            rows: self
                .rows
                .iter()
                .filter(|r| r.outcome.is_some())
                .cloned()
                .collect(),
        }
    }

    /// Rows with dates in `[begin, end]`, either bound optional
    pub fn select_by_date(&self, begin: Option<NaiveDate>, end: Option<NaiveDate>) -> &[FeatureRow] {
        let lo = match begin {
            Some(date) => self.rows.partition_point(|r| r.date_played < date),
            None => 0,
        };
        let hi = match end {
            Some(date) => self.rows.partition_point(|r| r.date_played <= date),
            None => self.rows.len(),
        };
        &self.rows[lo.min(hi)..hi]
    }

    /// First and last dates present, None when empty
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.first()?.date_played;
        let last = self.rows.last()?.date_played;
        Some((first, last))
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Dense mapping from raw team ids to embedding slots.
///
/// Built from the full dataset; identity only, so sharing it across a
/// walk-forward run leaks nothing. Unseen ids map to slot 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamIndexer {
    map: HashMap<i64, u32>,
}

impl TeamIndexer {
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let mut ids: Vec<i64> = rows
            .iter()
            .flat_map(|r| [r.home_team.0, r.away_team.0])
            .collect();
        ids.sort_unstable();
        ids.dedup();
        TeamIndexer {
            map: ids
                .into_iter()
                .enumerate()
                .map(|(idx, id)| (id, idx as u32))
                .collect(),
        }
    }

    pub fn index_of(&self, team: TeamId) -> u32 {
        self.map.get(&team.0).copied().unwrap_or(0)
    }

    pub fn num_teams(&self) -> usize {
        self.map.len()
    }
}

/// One plain-data batch of rows ready for the model contract
#[derive(Debug, Clone)]
pub struct GameBatch {
    /// Scaled continuous inputs, one array per row
    pub continuous: Vec<[f32; CONT_DIM]>,
    /// Dense (home, away) embedding indices per row
    pub teams: Vec<[u32; 2]>,
    /// Outcome labels; 0.0 placeholder for unlabeled rows
    pub labels: Vec<f32>,
    pub game_ids: Vec<GameId>,
}

impl GameBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Scale and chunk rows into batches of at most `batch_size`
pub fn build_batches(
    rows: &[FeatureRow],
    scaler: &StandardScaler,
    indexer: &TeamIndexer,
    batch_size: usize,
) -> Result<Vec<GameBatch>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(rows.len().div_ceil(batch_size));
    for chunk in rows.chunks(batch_size) {
        let mut continuous = Vec::with_capacity(chunk.len());
        let mut teams = Vec::with_capacity(chunk.len());
        let mut labels = Vec::with_capacity(chunk.len());
        let mut game_ids = Vec::with_capacity(chunk.len());
        for row in chunk {
            continuous.push(scaler.transform(&continuous_features(row))?);
            teams.push([indexer.index_of(row.home_team), indexer.index_of(row.away_team)]);
            labels.push(row.label().unwrap_or(0.0));
            game_ids.push(row.game_id);
        }
        batches.push(GameBatch {
            continuous,
            teams,
            labels,
            game_ids,
        });
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SideHistory;
    use crate::Outcome;

    fn row(id: i64, date: (i32, u32, u32), outcome: Option<Outcome>) -> FeatureRow {
        FeatureRow {
            game_id: GameId(id),
            home_team: TeamId(6),
            away_team: TeamId(8),
            home: SideHistory::default(),
            away: SideHistory::default(),
            prev_matchup_outcome: 0,
            prev_matchup_in_ot: false,
            has_prev_matchup: false,
            outcome,
            in_ot: outcome.map(|_| false),
            date_played: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    #[test]
    fn test_select_by_date() {
        let dataset = GameDataset::new(vec![
            row(1, (2024, 10, 12), Some(Outcome::HomeWin)),
            row(2, (2024, 10, 14), Some(Outcome::AwayWin)),
            row(3, (2024, 10, 16), Some(Outcome::HomeWin)),
        ]);

        let begin = NaiveDate::from_ymd_opt(2024, 10, 13).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 10, 15).unwrap();
        let slice = dataset.select_by_date(Some(begin), Some(end));
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].game_id, GameId(2));

        assert_eq!(dataset.select_by_date(None, None).len(), 3);
        assert!(dataset
            .select_by_date(Some(end), Some(begin))
            .is_empty());
    }

    #[test]
    fn test_labeled_filters_pending() {
        let dataset = GameDataset::new(vec![
            row(1, (2024, 10, 12), Some(Outcome::HomeWin)),
            row(2, (2024, 10, 14), None),
        ]);
        assert_eq!(dataset.labeled().len(), 1);
    }

    #[test]
    fn test_indexer_is_dense_and_sorted() {
        let rows = vec![row(1, (2024, 10, 12), None)];
        let indexer = TeamIndexer::from_rows(&rows);
        assert_eq!(indexer.num_teams(), 2);
        assert_eq!(indexer.index_of(TeamId(6)), 0);
        assert_eq!(indexer.index_of(TeamId(8)), 1);
        // Unseen ids fall back to slot 0
        assert_eq!(indexer.index_of(TeamId(99)), 0);
    }

    #[test]
    fn test_build_batches_chunks() {
        let rows: Vec<FeatureRow> = (0..5)
            .map(|i| row(i, (2024, 10, 12), Some(Outcome::HomeWin)))
            .collect();
        let indexer = TeamIndexer::from_rows(&rows);
        let mut scaler = StandardScaler::new();
        let features: Vec<_> = rows.iter().map(continuous_features).collect();
        scaler.fit(&features);

        let batches = build_batches(&rows, &scaler, &indexer, 2).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[2].len(), 1);
        assert_eq!(batches[2].game_ids[0], GameId(4));
    }
}
