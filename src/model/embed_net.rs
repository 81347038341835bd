//! Embedding network for game outcome prediction
//!
//! Architecture: shared team embedding applied to the home and away ids,
//! concatenated with the scaled continuous features, then
//! Linear → ReLU → Linear producing a single win logit.

use burn::module::Module;
use burn::nn::{Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

/// Configuration for the embedding network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedNetConfig {
    /// Continuous input width
    pub continuous_dim: usize,
    /// Hidden layer width
    pub hidden_size: usize,
    /// Embedding table capacity (dense team slots)
    pub num_teams: usize,
    /// Embedding width per team
    pub embed_dim: usize,
}

impl Default for EmbedNetConfig {
    fn default() -> Self {
        EmbedNetConfig {
            continuous_dim: crate::data::dataset::CONT_DIM,
            hidden_size: 8,
            num_teams: 50,
            embed_dim: 5,
        }
    }
}

/// Two-layer network over continuous features plus team embeddings.
///
/// Home and away share one embedding table; both lookups are concatenated
/// onto the continuous inputs before the hidden layer.
#[derive(Module, Debug)]
pub struct EmbedNet<B: Backend> {
    team_embedding: Embedding<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    embed_dim: usize,
}

impl<B: Backend> EmbedNet<B> {
    /// Create a new network with freshly initialized weights
    pub fn new(device: &B::Device, config: &EmbedNetConfig) -> Self {
        let linear_inputs = config.continuous_dim + 2 * config.embed_dim;
        EmbedNet {
            team_embedding: EmbeddingConfig::new(config.num_teams, config.embed_dim).init(device),
            fc1: LinearConfig::new(linear_inputs, config.hidden_size).init(device),
            fc2: LinearConfig::new(config.hidden_size, 1).init(device),
            embed_dim: config.embed_dim,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `continuous` - Scaled continuous features [batch, continuous_dim]
    /// * `teams` - Dense (home, away) team indices [batch, 2]
    ///
    /// # Returns
    /// Win logit [batch, 1] (apply sigmoid for P(home wins))
    pub fn forward(&self, continuous: Tensor<B, 2>, teams: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _] = continuous.dims();
        let embedded = self
            .team_embedding
            .forward(teams)
            .reshape([batch_size, 2 * self.embed_dim]);
        let x = Tensor::cat(vec![continuous, embedded], 1);
        let x = relu(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Save model weights to file
    pub fn save(&self, path: &str) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| crate::PuckError::Io(std::io::Error::other(e.to_string())))
    }

    /// Load model weights from file
    pub fn load(device: &B::Device, path: &str, config: &EmbedNetConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| crate::PuckError::Io(std::io::Error::other(e.to_string())))?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let config = EmbedNetConfig::default();
        let model = EmbedNet::<TestBackend>::new(&device, &config);

        let continuous = Tensor::random(
            [4, config.continuous_dim],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let teams = Tensor::<TestBackend, 1, Int>::from_ints(
            [0, 1, 2, 3, 4, 5, 6, 7].as_slice(),
            &device,
        )
        .reshape([4, 2]);

        let logits = model.forward(continuous, teams);
        assert_eq!(logits.dims(), [4, 1]);
    }

    #[test]
    fn test_forward_is_deterministic() {
        let device = Default::default();
        let config = EmbedNetConfig::default();
        let model = EmbedNet::<TestBackend>::new(&device, &config);

        let continuous = Tensor::zeros([2, config.continuous_dim], &device);
        let teams =
            Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 0, 1].as_slice(), &device)
                .reshape([2, 2]);

        let a = model.forward(continuous.clone(), teams.clone()).into_data();
        let b = model.forward(continuous, teams).into_data();
        assert_eq!(a.as_slice::<f32>().unwrap(), b.as_slice::<f32>().unwrap());
    }
}
