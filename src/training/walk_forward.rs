//! Sequential training/evaluation strategies
//!
//! `IncrementalStrategy` walks the dataset one calendar day at a time:
//! scale on everything strictly before today, train once on yesterday,
//! predict today. The ordering is the leakage guarantee - nothing from
//! the current day or later ever reaches the scaler or a training step
//! before that day is predicted. `OneSplitStrategy` is the simpler
//! train-before/test-after split.

use crate::data::dataset::{build_batches, continuous_features, GameDataset, TeamIndexer};
use crate::training::scaler::StandardScaler;
use crate::training::trainer::TrainableModel;
use crate::{GameId, PuckError, Result};
use chrono::{Duration, NaiveDate};

/// Accumulated out-of-sample results of a strategy run
#[derive(Debug, Clone, Default)]
pub struct StrategyOutcome {
    /// Scores in day order, within-day row order preserved
    pub predictions: Vec<f32>,
    /// True labels aligned with `predictions`
    pub labels: Vec<f32>,
    /// Game ids aligned with `predictions`
    pub game_ids: Vec<GameId>,
    pub days_trained: usize,
    pub days_evaluated: usize,
}

/// Day-by-day walk-forward: refit scaler on the past, train on yesterday,
/// predict today
pub struct IncrementalStrategy {
    dataset: GameDataset,
    batch_size: usize,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl IncrementalStrategy {
    /// Build a strategy over the labeled rows of `dataset`
    pub fn new(dataset: &GameDataset, batch_size: usize) -> Self {
        IncrementalStrategy {
            dataset: dataset.labeled(),
            batch_size,
            start: None,
            end: None,
        }
    }

    /// Restrict the run to an explicit date window
    pub fn with_bounds(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Run the walk-forward loop, mutating `model` in place.
    ///
    /// Each day of data is trained on at most once, the day after it
    /// occurs. The scaler is rebuilt from scratch every day over the
    /// window [start, current - 1]; on the very first day (no history
    /// yet) it bootstraps on the day's own rows before evaluating them.
    pub fn run<M: TrainableModel>(&self, model: &mut M, indexer: &TeamIndexer) -> Result<StrategyOutcome> {
        let window = GameDataset::new(self.dataset.select_by_date(self.start, self.end).to_vec());
        let Some((first, last)) = window.date_bounds() else {
            return Err(PuckError::NoTrainingData {
                start: self.start.unwrap_or_else(|| NaiveDate::MIN),
                end: self.end.unwrap_or_else(|| NaiveDate::MAX),
            });
        };
        let start = self.start.unwrap_or(first);
        let end = self.end.unwrap_or(last);
        log::info!("Walk-forward run from {} to {}", start, end);

        let mut outcome = StrategyOutcome::default();
        let mut current = start;
        while current <= end {
            let mut scaler = StandardScaler::new();

            if current != start {
                let yesterday = current - Duration::days(1);

                // Fit on every row strictly before today, accumulated
                // since the run began
                let history = window.select_by_date(Some(start), Some(yesterday));
                let history_features: Vec<_> = history.iter().map(continuous_features).collect();
                scaler.fit(&history_features);

                // Train exactly once on yesterday's games
                let trainable = window.select_by_date(Some(yesterday), Some(yesterday));
                if !trainable.is_empty() {
                    log::debug!("Training on {} games from {}", trainable.len(), yesterday);
                    for batch in build_batches(trainable, &scaler, indexer, self.batch_size)? {
                        model.train_step(&batch)?;
                    }
                    outcome.days_trained += 1;
                }
            }

            let today = window.select_by_date(Some(current), Some(current));
            if !today.is_empty() {
                if !scaler.is_fitted() {
                    // First day (or an empty history window): bootstrap
                    // on today's own rows
                    let today_features: Vec<_> = today.iter().map(continuous_features).collect();
                    scaler.fit(&today_features);
                }
                for batch in build_batches(today, &scaler, indexer, self.batch_size)? {
                    let eval = model.evaluate(&batch)?;
                    outcome.predictions.extend(eval.scores);
                    outcome.labels.extend(eval.labels);
                    outcome.game_ids.extend(batch.game_ids);
                }
                outcome.days_evaluated += 1;
            }

            current += Duration::days(1);
        }

        Ok(outcome)
    }
}

/// Train on everything strictly before a split date, evaluate once on the
/// rest
pub struct OneSplitStrategy {
    dataset: GameDataset,
    batch_size: usize,
    split_date: NaiveDate,
    epochs: usize,
}

impl OneSplitStrategy {
    pub fn new(dataset: &GameDataset, split_date: NaiveDate, batch_size: usize, epochs: usize) -> Self {
        OneSplitStrategy {
            dataset: dataset.labeled(),
            batch_size,
            split_date,
            epochs,
        }
    }

    pub fn run<M: TrainableModel>(&self, model: &mut M, indexer: &TeamIndexer) -> Result<StrategyOutcome> {
        let train = self
            .dataset
            .select_by_date(None, Some(self.split_date - Duration::days(1)));
        let test = self.dataset.select_by_date(Some(self.split_date), None);
        if train.is_empty() || test.is_empty() {
            let (first, last) = self.dataset.date_bounds().unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
            return Err(PuckError::NoTrainingData { start: first, end: last });
        }

        // Scaler sees only the training window
        let mut scaler = StandardScaler::new();
        let train_features: Vec<_> = train.iter().map(continuous_features).collect();
        scaler.fit(&train_features);

        let train_batches = build_batches(train, &scaler, indexer, self.batch_size)?;
        for epoch in 0..self.epochs {
            let mut epoch_loss = 0.0;
            for batch in &train_batches {
                epoch_loss += model.train_step(batch)?;
            }
            log::info!(
                "Epoch [{}/{}], Train loss: {:.4}",
                epoch + 1,
                self.epochs,
                epoch_loss / train_batches.len() as f32
            );
        }

        let mut outcome = StrategyOutcome {
            days_trained: self.epochs,
            days_evaluated: 1,
            ..Default::default()
        };
        for batch in build_batches(test, &scaler, indexer, self.batch_size)? {
            let eval = model.evaluate(&batch)?;
            outcome.predictions.extend(eval.scores);
            outcome.labels.extend(eval.labels);
            outcome.game_ids.extend(batch.game_ids);
        }
        Ok(outcome)
    }
}
