//! Rewards, levels and unlocks
//!
//! `ProgressionStore` owns the persisted `ProgressionState`, applies the
//! static `RewardCatalog` to reading events, and saves after every mutation
//! through a `KeyValueStore`.

mod catalog;
mod kv;
mod state;
mod store;

pub use catalog::{Companion, RewardCatalog, RewardTable, Stage, Tier};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use state::{ProgressionState, ProgressionSummary, RewardOutcome};
pub use store::{ProgressionStore, STORAGE_KEY};
