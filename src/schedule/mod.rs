pub mod scheduler;

pub use scheduler::{
    run_scheduler_loop, BattleScheduler, ManualBattleOutcome, ScheduleInfo, TickOutcome,
};
