//! Data ingestion and storage
//!
//! SQLite persistence, CSV ingestion of the downloader's exports, and the
//! in-memory dataset the training strategies slice by date.

pub mod database;
pub mod dataset;
pub mod ingest;

pub use database::Database;
pub use dataset::{GameBatch, GameDataset, TeamIndexer};
pub use ingest::{Loader, TeamDirectory};
