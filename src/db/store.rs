//! Store seam — the traits the engines are written against.
//!
//! Two implementations: [`super::postgres::PgStore`] (durable, sqlx) and
//! [`super::memory::MemoryStore`] (in-process, used by the test suite).
//! Changing the implementation changes which database backs the service,
//! not the engine semantics: both enforce the same uniqueness rules and the
//! same all-or-nothing write units.

use super::models::*;
use crate::error::Result;

/// A roster state transition resolved from an action code. Applied inside
/// the same write unit as the battle record it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterMutation {
    /// Deactivate a roster member (the "kick" disposition).
    Deactivate { clan_id: String, player_id: String },
}

/// Master battle schedule entries plus the singleton scheduler setting.
#[allow(async_fn_in_trait)]
pub trait ScheduleStore {
    async fn get_master_battle(&self, battle_id: &str) -> Result<Option<MasterBattle>>;

    /// Insert a new master battle. `Conflict` if the battle id exists.
    async fn insert_master_battle(&self, battle: &MasterBattle) -> Result<()>;

    /// Most recent master battles, newest first.
    async fn recent_master_battles(&self, limit: i64) -> Result<Vec<MasterBattle>>;

    async fn get_schedule_setting(&self) -> Result<Option<ScheduleSetting>>;

    /// Create or overwrite the singleton setting.
    async fn put_schedule_setting(&self, setting: &ScheduleSetting) -> Result<()>;

    /// Insert the singleton setting only if none exists. Returns whether a
    /// row was written.
    async fn init_schedule_setting(&self, setting: &ScheduleSetting) -> Result<bool>;
}

/// Clan battle records, their stat rows, and the roster they mutate.
#[allow(async_fn_in_trait)]
pub trait BattleStore {
    /// Persist a battle with all stat rows and roster mutations atomically.
    /// `Conflict` if a record for (clan_id, battle_id) already exists — the
    /// uniqueness constraint is the arbiter for concurrent creates.
    async fn insert_clan_battle(
        &self,
        battle: &ClanBattle,
        players: &[PlayerStat],
        nonplayers: &[NonplayerStat],
        roster: &[RosterMutation],
    ) -> Result<()>;

    /// Replace an existing battle and all stat rows atomically, never
    /// exposing a transient empty state. `NotFound` if absent.
    async fn replace_clan_battle(
        &self,
        battle: &ClanBattle,
        players: &[PlayerStat],
        nonplayers: &[NonplayerStat],
        roster: &[RosterMutation],
    ) -> Result<()>;

    /// Delete a battle and its stat rows. Returns whether a row existed.
    async fn delete_clan_battle(&self, clan_id: &str, battle_id: &str) -> Result<bool>;

    async fn get_clan_battle(
        &self,
        clan_id: &str,
        battle_id: &str,
    ) -> Result<Option<ClanBattleDetail>>;

    /// All battles for a clan, newest battle id first.
    async fn list_clan_battles(&self, clan_id: &str) -> Result<Vec<ClanBattle>>;

    /// Battles whose battle id starts with `prefix` — the period query the
    /// aggregation engine relies on.
    async fn clan_battles_by_prefix(&self, clan_id: &str, prefix: &str)
        -> Result<Vec<ClanBattle>>;

    async fn upsert_clan_member(&self, member: &ClanMember) -> Result<()>;

    async fn get_clan_member(&self, clan_id: &str, player_id: &str)
        -> Result<Option<ClanMember>>;
}

/// Monthly and yearly performance projections.
#[allow(async_fn_in_trait)]
pub trait SummaryStore {
    async fn get_monthly_performance(
        &self,
        clan_id: &str,
        month_id: &str,
    ) -> Result<Option<MonthlyPerformance>>;

    /// Insert or overwrite a monthly summary. The independently-set
    /// `completed` flag on an existing row is preserved.
    async fn upsert_monthly_performance(&self, row: &MonthlyPerformance) -> Result<()>;

    async fn delete_monthly_performance(&self, clan_id: &str, month_id: &str) -> Result<bool>;

    async fn set_monthly_completed(
        &self,
        clan_id: &str,
        month_id: &str,
        completed: bool,
    ) -> Result<bool>;

    async fn get_yearly_performance(
        &self,
        clan_id: &str,
        year_id: &str,
    ) -> Result<Option<YearlyPerformance>>;

    /// Insert or overwrite a yearly summary, preserving `completed`.
    async fn upsert_yearly_performance(&self, row: &YearlyPerformance) -> Result<()>;

    async fn delete_yearly_performance(&self, clan_id: &str, year_id: &str) -> Result<bool>;

    async fn set_yearly_completed(
        &self,
        clan_id: &str,
        year_id: &str,
        completed: bool,
    ) -> Result<bool>;
}
