//! Checkpoint persistence for a trained model
//!
//! A checkpoint is a directory holding the burn weight record plus a JSON
//! sidecar with everything needed to use the weights again: model
//! dimensions, fitted scaler statistics, and the dense team mapping.

use crate::data::dataset::TeamIndexer;
use crate::model::{EmbedNet, EmbedNetConfig};
use crate::training::scaler::StandardScaler;
use crate::{PuckError, Result};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const WEIGHTS_FILE: &str = "embed_net";
const STATE_FILE: &str = "state.json";

/// Everything beside the weights that a checkpoint must carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub model: EmbedNetConfig,
    pub scaler: StandardScaler,
    pub team_index: TeamIndexer,
}

/// Directory-rooted save/load of model checkpoints
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ModelStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn weights_path(&self) -> String {
        self.dir.join(WEIGHTS_FILE).to_string_lossy().into_owned()
    }

    /// Save weights and sidecar state, creating the directory if needed
    pub fn save<B: Backend>(&self, model: &EmbedNet<B>, state: &CheckpointState) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        std::fs::create_dir_all(&self.dir)?;
        model.save(&self.weights_path())?;
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| PuckError::Parse(format!("Failed to serialize checkpoint: {}", e)))?;
        std::fs::write(self.dir.join(STATE_FILE), json)?;
        log::info!("Saved checkpoint to {}", self.dir.display());
        Ok(())
    }

    /// Load the checkpoint, erroring with `NoModel` when none exists
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<(EmbedNet<B>, CheckpointState)>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let state_path = self.dir.join(STATE_FILE);
        if !state_path.exists() {
            return Err(PuckError::NoModel);
        }
        let json = std::fs::read_to_string(state_path)?;
        let state: CheckpointState = serde_json::from_str(&json)
            .map_err(|e| PuckError::Parse(format!("Failed to parse checkpoint: {}", e)))?;

        let model = EmbedNet::load(device, &self.weights_path(), &state.model)?;
        Ok((model, state))
    }
}
