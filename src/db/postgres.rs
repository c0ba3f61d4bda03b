//! Durable store implementation — PostgreSQL via sqlx.
//!
//! A thin adapter over the query functions in [`super::queries`]; atomicity
//! and uniqueness enforcement live in the SQL layer.

use sqlx::PgPool;

use super::models::*;
use super::queries;
use super::store::{BattleStore, RosterMutation, ScheduleStore, SummaryStore};
use crate::error::Result;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ScheduleStore for PgStore {
    async fn get_master_battle(&self, battle_id: &str) -> Result<Option<MasterBattle>> {
        queries::get_master_battle(&self.pool, battle_id).await
    }

    async fn insert_master_battle(&self, battle: &MasterBattle) -> Result<()> {
        queries::insert_master_battle(&self.pool, battle).await
    }

    async fn recent_master_battles(&self, limit: i64) -> Result<Vec<MasterBattle>> {
        queries::recent_master_battles(&self.pool, limit).await
    }

    async fn get_schedule_setting(&self) -> Result<Option<ScheduleSetting>> {
        queries::get_schedule_setting(&self.pool).await
    }

    async fn put_schedule_setting(&self, setting: &ScheduleSetting) -> Result<()> {
        queries::put_schedule_setting(&self.pool, setting).await
    }

    async fn init_schedule_setting(&self, setting: &ScheduleSetting) -> Result<bool> {
        queries::init_schedule_setting(&self.pool, setting).await
    }
}

impl BattleStore for PgStore {
    async fn insert_clan_battle(
        &self,
        battle: &ClanBattle,
        players: &[PlayerStat],
        nonplayers: &[NonplayerStat],
        roster: &[RosterMutation],
    ) -> Result<()> {
        queries::insert_clan_battle(&self.pool, battle, players, nonplayers, roster).await
    }

    async fn replace_clan_battle(
        &self,
        battle: &ClanBattle,
        players: &[PlayerStat],
        nonplayers: &[NonplayerStat],
        roster: &[RosterMutation],
    ) -> Result<()> {
        queries::replace_clan_battle(&self.pool, battle, players, nonplayers, roster).await
    }

    async fn delete_clan_battle(&self, clan_id: &str, battle_id: &str) -> Result<bool> {
        queries::delete_clan_battle(&self.pool, clan_id, battle_id).await
    }

    async fn get_clan_battle(
        &self,
        clan_id: &str,
        battle_id: &str,
    ) -> Result<Option<ClanBattleDetail>> {
        queries::get_clan_battle(&self.pool, clan_id, battle_id).await
    }

    async fn list_clan_battles(&self, clan_id: &str) -> Result<Vec<ClanBattle>> {
        queries::list_clan_battles(&self.pool, clan_id).await
    }

    async fn clan_battles_by_prefix(
        &self,
        clan_id: &str,
        prefix: &str,
    ) -> Result<Vec<ClanBattle>> {
        queries::clan_battles_by_prefix(&self.pool, clan_id, prefix).await
    }

    async fn upsert_clan_member(&self, member: &ClanMember) -> Result<()> {
        queries::upsert_clan_member(&self.pool, member).await
    }

    async fn get_clan_member(
        &self,
        clan_id: &str,
        player_id: &str,
    ) -> Result<Option<ClanMember>> {
        queries::get_clan_member(&self.pool, clan_id, player_id).await
    }
}

impl SummaryStore for PgStore {
    async fn get_monthly_performance(
        &self,
        clan_id: &str,
        month_id: &str,
    ) -> Result<Option<MonthlyPerformance>> {
        queries::get_monthly_performance(&self.pool, clan_id, month_id).await
    }

    async fn upsert_monthly_performance(&self, row: &MonthlyPerformance) -> Result<()> {
        queries::upsert_monthly_performance(&self.pool, row).await
    }

    async fn delete_monthly_performance(&self, clan_id: &str, month_id: &str) -> Result<bool> {
        queries::delete_monthly_performance(&self.pool, clan_id, month_id).await
    }

    async fn set_monthly_completed(
        &self,
        clan_id: &str,
        month_id: &str,
        completed: bool,
    ) -> Result<bool> {
        queries::set_monthly_completed(&self.pool, clan_id, month_id, completed).await
    }

    async fn get_yearly_performance(
        &self,
        clan_id: &str,
        year_id: &str,
    ) -> Result<Option<YearlyPerformance>> {
        queries::get_yearly_performance(&self.pool, clan_id, year_id).await
    }

    async fn upsert_yearly_performance(&self, row: &YearlyPerformance) -> Result<()> {
        queries::upsert_yearly_performance(&self.pool, row).await
    }

    async fn delete_yearly_performance(&self, clan_id: &str, year_id: &str) -> Result<bool> {
        queries::delete_yearly_performance(&self.pool, clan_id, year_id).await
    }

    async fn set_yearly_completed(
        &self,
        clan_id: &str,
        year_id: &str,
        completed: bool,
    ) -> Result<bool> {
        queries::set_yearly_completed(&self.pool, clan_id, year_id, completed).await
    }
}
