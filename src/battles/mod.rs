pub mod actions;
pub mod engine;
pub mod metrics;

pub use engine::{BattleEngine, BattleInput, BattleUpdate, NonplayerEntry, PlayerEntry};
