//! Model contract and the burn-backed trainer
//!
//! The strategies only see `TrainableModel`: one gradient step per batch,
//! one forward-only evaluation per batch. `Trainer` implements it with an
//! embedding network and Adam; tests implement it with mocks.

use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};

use crate::data::dataset::GameBatch;
use crate::model::EmbedNet;
use crate::Result;

/// Output of one forward-only evaluation pass
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub loss: f32,
    /// Sigmoid scores in [0, 1], one per row, batch order preserved
    pub scores: Vec<f32>,
    /// Labels echoed back in the same order
    pub labels: Vec<f32>,
}

/// The training/evaluation surface the strategies drive
pub trait TrainableModel {
    /// One pass of forward + backward + optimizer update on a batch,
    /// returning the loss
    fn train_step(&mut self, batch: &GameBatch) -> Result<f32>;

    /// Forward-only evaluation of a batch
    fn evaluate(&mut self, batch: &GameBatch) -> Result<Evaluation>;
}

/// Convert a plain batch into backend tensors
pub fn batch_to_tensors<B: Backend>(
    batch: &GameBatch,
    device: &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 2, Int>, Tensor<B, 1>) {
    let batch_size = batch.len();
    let cont_dim = crate::data::dataset::CONT_DIM;

    let mut continuous = Vec::with_capacity(batch_size * cont_dim);
    for row in &batch.continuous {
        continuous.extend_from_slice(row);
    }
    let continuous = Tensor::<B, 1>::from_floats(continuous.as_slice(), device)
        .reshape([batch_size, cont_dim]);

    let mut team_ids = Vec::with_capacity(batch_size * 2);
    for pair in &batch.teams {
        team_ids.push(pair[0] as i32);
        team_ids.push(pair[1] as i32);
    }
    let teams =
        Tensor::<B, 1, Int>::from_ints(team_ids.as_slice(), device).reshape([batch_size, 2]);

    let labels = Tensor::<B, 1>::from_floats(batch.labels.as_slice(), device);

    (continuous, teams, labels)
}

/// Binary cross-entropy on logits (numerically stable)
fn binary_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let probs = sigmoid(logits);
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

/// Trainer owning the network, optimizer, and learning rate.
///
/// Mutated in place across a whole strategy run; never share one instance
/// between concurrent runs.
pub struct Trainer<B: AutodiffBackend> {
    model: EmbedNet<B>,
    optimizer: OptimizerAdaptor<Adam, EmbedNet<B>, B>,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(model: EmbedNet<B>, learning_rate: f64, device: B::Device) -> Self {
        Trainer {
            model,
            optimizer: AdamConfig::new().init(),
            learning_rate,
            device,
        }
    }

    /// Get the current model
    pub fn model(&self) -> &EmbedNet<B> {
        &self.model
    }

    /// Get the model, consuming the trainer
    pub fn into_model(self) -> EmbedNet<B> {
        self.model
    }
}

impl<B: AutodiffBackend> TrainableModel for Trainer<B> {
    fn train_step(&mut self, batch: &GameBatch) -> Result<f32> {
        let (continuous, teams, labels) = batch_to_tensors::<B>(batch, &self.device);

        let logits = self.model.forward(continuous, teams);
        let loss = binary_cross_entropy(logits, labels.unsqueeze_dim(1));
        let loss_value: f32 = loss.clone().into_scalar().elem();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        Ok(loss_value)
    }

    fn evaluate(&mut self, batch: &GameBatch) -> Result<Evaluation> {
        let (continuous, teams, labels) = batch_to_tensors::<B>(batch, &self.device);

        let logits = self.model.forward(continuous, teams);
        let loss = binary_cross_entropy(logits.clone(), labels.unsqueeze_dim(1));
        let loss_value: f32 = loss.into_scalar().elem();

        let scores_data = sigmoid(logits).into_data();
        let scores: Vec<f32> = scores_data.as_slice::<f32>().unwrap().to_vec();

        Ok(Evaluation {
            loss: loss_value,
            scores,
            labels: batch.labels.clone(),
        })
    }
}
