//! Battle scheduler — advances the global battle cadence.
//!
//! Runs off an external timer, not its own reactor. Every tick is
//! idempotent: the master-battle existence check (plus Conflict-as-skip on
//! the insert) is the sole guard against duplicate creation from overlapping
//! or repeated ticks, so at-least-once invocation is safe.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::time;
use tracing::{debug, info, warn};

use crate::db::models::{MasterBattle, ScheduleSetting};
use crate::db::store::ScheduleStore;
use crate::error::{CoordinatorError, Result};
use crate::gametime;

/// Days between consecutive battle windows.
const CADENCE_DAYS: u64 = 3;

/// What a schedule check decided. Logged each tick; also returned so tests
/// can assert on the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Scheduler disabled or never initialized.
    Disabled,
    /// Next battle date is still in the future.
    NotDue,
    /// Created a master battle and advanced the date.
    Created(String),
    /// A master battle for the date already existed; advanced the date only.
    SkippedExisting(String),
}

/// Result of a manual override creation.
#[derive(Debug, Clone, Serialize)]
pub struct ManualBattleOutcome {
    pub battle: MasterBattle,
    pub created: bool,
}

/// Schedule state readout for admin surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleInfo {
    pub setting: Option<ScheduleSetting>,
    pub recent_battles: Vec<MasterBattle>,
}

pub struct BattleScheduler<S> {
    store: Arc<S>,
}

impl<S: ScheduleStore> BattleScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Host-facing entry point. Never propagates failures — any error is
    /// logged and retried from persisted state on the next tick.
    pub async fn tick(&self) {
        match self.check_and_advance(Utc::now()).await {
            Ok(TickOutcome::Created(battle_id)) => {
                info!(%battle_id, "scheduled master battle created");
            }
            Ok(TickOutcome::SkippedExisting(battle_id)) => {
                info!(%battle_id, "master battle already existed, advanced date only");
            }
            Ok(TickOutcome::NotDue) => debug!("next battle not due yet"),
            Ok(TickOutcome::Disabled) => debug!("scheduler disabled"),
            Err(e) => warn!(error = %e, "schedule check failed, will retry next tick"),
        }
    }

    /// One schedule check at instant `now`.
    ///
    /// If the scheduler is enabled and the next battle date has arrived,
    /// create the master battle for that date (unless it already exists) and
    /// advance the date by the fixed cadence either way.
    pub async fn check_and_advance(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let Some(setting) = self.store.get_schedule_setting().await? else {
            return Ok(TickOutcome::Disabled);
        };
        if !setting.scheduler_enabled {
            return Ok(TickOutcome::Disabled);
        }
        // Fixed offset: comparing UTC instants is comparing Game-Time instants.
        if now < setting.next_battle_start {
            return Ok(TickOutcome::NotDue);
        }

        let battle_date = gametime::to_game_time(setting.next_battle_start).date_naive();
        let battle_id = gametime::battle_id_for_date(battle_date);

        let outcome = if self.store.get_master_battle(&battle_id).await?.is_some() {
            TickOutcome::SkippedExisting(battle_id)
        } else {
            let (start_time, end_time) = gametime::battle_window(battle_date);
            let battle = MasterBattle {
                battle_id: battle_id.clone(),
                start_time,
                end_time,
                created_by: None,
                notes: None,
                created_at: now,
            };
            match self.store.insert_master_battle(&battle).await {
                Ok(()) => TickOutcome::Created(battle_id),
                // Lost a race with a concurrent tick; same as the existence
                // check firing.
                Err(CoordinatorError::Conflict(_)) => TickOutcome::SkippedExisting(battle_id),
                Err(e) => return Err(e),
            }
        };

        let advanced = ScheduleSetting {
            next_battle_start: gametime::advance_days(setting.next_battle_start, CADENCE_DAYS),
            scheduler_enabled: setting.scheduler_enabled,
        };
        self.store.put_schedule_setting(&advanced).await?;

        Ok(outcome)
    }

    /// Create a master battle for an arbitrary Game-Time date, outside the
    /// automatic cadence. Same existence check as the scheduled path; an
    /// already-present window is reported, not an error.
    pub async fn manually_create_battle(
        &self,
        date: NaiveDate,
        actor: &str,
    ) -> Result<ManualBattleOutcome> {
        let battle_id = gametime::battle_id_for_date(date);

        if let Some(existing) = self.store.get_master_battle(&battle_id).await? {
            return Ok(ManualBattleOutcome {
                battle: existing,
                created: false,
            });
        }

        let (start_time, end_time) = gametime::battle_window(date);
        let battle = MasterBattle {
            battle_id: battle_id.clone(),
            start_time,
            end_time,
            created_by: Some(actor.to_string()),
            notes: None,
            created_at: Utc::now(),
        };
        match self.store.insert_master_battle(&battle).await {
            Ok(()) => {
                info!(%battle_id, actor, "master battle created manually");
                Ok(ManualBattleOutcome {
                    battle,
                    created: true,
                })
            }
            Err(CoordinatorError::Conflict(_)) => {
                let existing = self
                    .store
                    .get_master_battle(&battle_id)
                    .await?
                    .ok_or_else(|| CoordinatorError::not_found("master battle vanished"))?;
                Ok(ManualBattleOutcome {
                    battle: existing,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Seed the singleton setting on a fresh database. Starts disabled so a
    /// new deployment never creates windows before an operator confirms the
    /// cadence anchor.
    pub async fn ensure_initialized(&self, default_start: DateTime<Utc>) -> Result<()> {
        let seeded = self
            .store
            .init_schedule_setting(&ScheduleSetting {
                next_battle_start: default_start,
                scheduler_enabled: false,
            })
            .await?;
        if seeded {
            info!(
                next_battle_start = %default_start,
                "schedule setting seeded (disabled)"
            );
        }
        Ok(())
    }

    pub async fn schedule_info(&self) -> Result<ScheduleInfo> {
        let setting = self.store.get_schedule_setting().await?;
        let recent_battles = self.store.recent_master_battles(10).await?;
        Ok(ScheduleInfo {
            setting,
            recent_battles,
        })
    }

    pub async fn next_battle_date(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .store
            .get_schedule_setting()
            .await?
            .map(|s| s.next_battle_start))
    }

    /// Manual override of the schedule state.
    pub async fn update_next_battle_date(
        &self,
        next_battle_start: DateTime<Utc>,
        scheduler_enabled: bool,
    ) -> Result<()> {
        self.store
            .put_schedule_setting(&ScheduleSetting {
                next_battle_start,
                scheduler_enabled,
            })
            .await?;
        info!(
            next_battle_start = %next_battle_start,
            scheduler_enabled,
            "schedule setting updated"
        );
        Ok(())
    }
}

/// Drive the scheduler on a fixed interval until the task is aborted.
pub async fn run_scheduler_loop<S: ScheduleStore>(
    scheduler: Arc<BattleScheduler<S>>,
    tick_interval: Duration,
) {
    info!(interval_secs = tick_interval.as_secs(), "scheduler loop started");
    let mut ticker = time::interval(tick_interval);
    loop {
        ticker.tick().await;
        scheduler.tick().await;
    }
}
