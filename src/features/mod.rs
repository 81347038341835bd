//! Feature derivation
//!
//! Pure transformations from the game log to model-ready rows: per-team
//! expansion, as-of season aggregates, prior-meeting resolution, and
//! final row assembly.

pub mod assembly;
pub mod expansion;
pub mod history;

pub use assembly::{assemble, FeatureRow, SideHistory};
pub use expansion::TeamGameRow;
pub use history::{HistoricalAggregate, HistoryIndex, PriorMatchup};
