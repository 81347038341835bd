//! Neural network architecture and checkpointing

pub mod checkpoint;
pub mod embed_net;

pub use checkpoint::{CheckpointState, ModelStore};
pub use embed_net::{EmbedNet, EmbedNetConfig};
