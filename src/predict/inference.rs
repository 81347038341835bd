//! Inference over assembled feature rows with a trained checkpoint

use crate::data::dataset::{build_batches, TeamIndexer};
use crate::features::FeatureRow;
use crate::model::{EmbedNet, ModelStore};
use crate::training::scaler::StandardScaler;
use crate::training::trainer::batch_to_tensors;
use crate::{GameId, Result, TeamId};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;

/// One scored game
#[derive(Debug, Clone)]
pub struct GamePrediction {
    pub game_id: GameId,
    pub home_team: TeamId,
    pub away_team: TeamId,
    /// P(home team wins)
    pub score: f32,
    /// Binarized pick at the 0.5 boundary
    pub home_win: bool,
}

/// Forward-only predictor over a loaded checkpoint
pub struct Predictor<B: Backend> {
    model: EmbedNet<B>,
    scaler: StandardScaler,
    indexer: TeamIndexer,
    device: B::Device,
}

impl<B: Backend> Predictor<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Load the latest checkpoint from a model store
    pub fn load(store: &ModelStore, device: B::Device) -> Result<Self> {
        let (model, state) = store.load::<B>(&device)?;
        Ok(Predictor {
            model,
            scaler: state.scaler,
            indexer: state.team_index,
            device,
        })
    }

    /// Score rows with the checkpointed scaler and weights. Works for
    /// pending games; labels are never consulted.
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<GamePrediction>> {
        let mut predictions = Vec::with_capacity(rows.len());
        for batch in build_batches(rows, &self.scaler, &self.indexer, rows.len().max(1))? {
            let (continuous, teams, _labels) = batch_to_tensors::<B>(&batch, &self.device);
            let scores_data = sigmoid(self.model.forward(continuous, teams)).into_data();
            let scores = scores_data.as_slice::<f32>().unwrap();

            for (i, game_id) in batch.game_ids.iter().enumerate() {
                let row = &rows[predictions.len()];
                debug_assert_eq!(row.game_id, *game_id);
                predictions.push(GamePrediction {
                    game_id: *game_id,
                    home_team: row.home_team,
                    away_team: row.away_team,
                    score: scores[i],
                    home_win: scores[i] > 0.5,
                });
            }
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{continuous_features, CONT_DIM};
    use crate::features::SideHistory;
    use crate::model::{CheckpointState, EmbedNetConfig};
    use burn::backend::NdArray;
    use chrono::NaiveDate;

    type TestBackend = NdArray<f32>;

    fn row(id: i64, home: i64, away: i64) -> FeatureRow {
        FeatureRow {
            game_id: GameId(id),
            home_team: TeamId(home),
            away_team: TeamId(away),
            home: SideHistory {
                games_played: 3,
                won_pct: 0.66,
                goals_per_game: 3.2,
                opp_goals_per_game: 2.1,
                points_to_date: 5,
                game_of_season: 4,
            },
            away: SideHistory::default(),
            prev_matchup_outcome: 1,
            prev_matchup_in_ot: false,
            has_prev_matchup: true,
            outcome: None,
            in_ot: None,
            date_played: NaiveDate::from_ymd_opt(2024, 10, 20).unwrap(),
        }
    }

    #[test]
    fn test_predict_pending_games() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let rows = vec![row(1, 6, 8), row(2, 8, 9)];

        let config = EmbedNetConfig::default();
        let model = EmbedNet::<TestBackend>::new(&device, &config);
        let mut scaler = StandardScaler::new();
        let features: Vec<[f32; CONT_DIM]> = rows.iter().map(continuous_features).collect();
        scaler.fit(&features);

        let predictor = Predictor {
            model,
            scaler,
            indexer: TeamIndexer::from_rows(&rows),
            device,
        };

        let predictions = predictor.predict(&rows).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].game_id, GameId(1));
        assert!(predictions.iter().all(|p| (0.0..=1.0).contains(&p.score)));
        for p in &predictions {
            assert_eq!(p.home_win, p.score > 0.5);
        }
    }
}
