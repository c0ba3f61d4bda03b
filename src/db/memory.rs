//! In-memory store implementation.
//!
//! Backs the integration test suite and local experimentation. One mutex
//! guards all tables, so every multi-row write is observed all-or-nothing —
//! the same write-unit semantics the Postgres transactions give. No await
//! points are reached while the lock is held.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::models::*;
use super::store::{BattleStore, RosterMutation, ScheduleStore, SummaryStore};
use crate::error::{CoordinatorError, Result};

type Key = (String, String);

#[derive(Default)]
struct Tables {
    master_battles: BTreeMap<String, MasterBattle>,
    schedule_setting: Option<ScheduleSetting>,
    clan_battles: BTreeMap<Key, ClanBattle>,
    player_stats: BTreeMap<Key, Vec<PlayerStat>>,
    nonplayer_stats: BTreeMap<Key, Vec<NonplayerStat>>,
    clan_members: BTreeMap<Key, ClanMember>,
    monthly: BTreeMap<Key, MonthlyPerformance>,
    yearly: BTreeMap<Key, YearlyPerformance>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(a: &str, b: &str) -> Key {
    (a.to_string(), b.to_string())
}

fn apply_roster(tables: &mut Tables, roster: &[RosterMutation]) {
    for mutation in roster {
        match mutation {
            RosterMutation::Deactivate { clan_id, player_id } => {
                if let Some(member) = tables.clan_members.get_mut(&key(clan_id, player_id)) {
                    member.active = false;
                }
            }
        }
    }
}

impl ScheduleStore for MemoryStore {
    async fn get_master_battle(&self, battle_id: &str) -> Result<Option<MasterBattle>> {
        Ok(self.inner.lock().master_battles.get(battle_id).cloned())
    }

    async fn insert_master_battle(&self, battle: &MasterBattle) -> Result<()> {
        let mut tables = self.inner.lock();
        if tables.master_battles.contains_key(&battle.battle_id) {
            return Err(CoordinatorError::conflict("master battle already exists"));
        }
        tables
            .master_battles
            .insert(battle.battle_id.clone(), battle.clone());
        Ok(())
    }

    async fn recent_master_battles(&self, limit: i64) -> Result<Vec<MasterBattle>> {
        let tables = self.inner.lock();
        Ok(tables
            .master_battles
            .values()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get_schedule_setting(&self) -> Result<Option<ScheduleSetting>> {
        Ok(self.inner.lock().schedule_setting.clone())
    }

    async fn put_schedule_setting(&self, setting: &ScheduleSetting) -> Result<()> {
        self.inner.lock().schedule_setting = Some(setting.clone());
        Ok(())
    }

    async fn init_schedule_setting(&self, setting: &ScheduleSetting) -> Result<bool> {
        let mut tables = self.inner.lock();
        if tables.schedule_setting.is_some() {
            return Ok(false);
        }
        tables.schedule_setting = Some(setting.clone());
        Ok(true)
    }
}

impl BattleStore for MemoryStore {
    async fn insert_clan_battle(
        &self,
        battle: &ClanBattle,
        players: &[PlayerStat],
        nonplayers: &[NonplayerStat],
        roster: &[RosterMutation],
    ) -> Result<()> {
        let mut tables = self.inner.lock();
        let k = key(&battle.clan_id, &battle.battle_id);
        if tables.clan_battles.contains_key(&k) {
            return Err(CoordinatorError::conflict(
                "clan battle already recorded for this battle id",
            ));
        }
        tables.clan_battles.insert(k.clone(), battle.clone());
        tables.player_stats.insert(k.clone(), players.to_vec());
        tables.nonplayer_stats.insert(k, nonplayers.to_vec());
        apply_roster(&mut tables, roster);
        Ok(())
    }

    async fn replace_clan_battle(
        &self,
        battle: &ClanBattle,
        players: &[PlayerStat],
        nonplayers: &[NonplayerStat],
        roster: &[RosterMutation],
    ) -> Result<()> {
        let mut tables = self.inner.lock();
        let k = key(&battle.clan_id, &battle.battle_id);
        if !tables.clan_battles.contains_key(&k) {
            return Err(CoordinatorError::not_found(format!(
                "no battle record for clan {} battle {}",
                battle.clan_id, battle.battle_id
            )));
        }
        tables.clan_battles.insert(k.clone(), battle.clone());
        tables.player_stats.insert(k.clone(), players.to_vec());
        tables.nonplayer_stats.insert(k, nonplayers.to_vec());
        apply_roster(&mut tables, roster);
        Ok(())
    }

    async fn delete_clan_battle(&self, clan_id: &str, battle_id: &str) -> Result<bool> {
        let mut tables = self.inner.lock();
        let k = key(clan_id, battle_id);
        let existed = tables.clan_battles.remove(&k).is_some();
        tables.player_stats.remove(&k);
        tables.nonplayer_stats.remove(&k);
        Ok(existed)
    }

    async fn get_clan_battle(
        &self,
        clan_id: &str,
        battle_id: &str,
    ) -> Result<Option<ClanBattleDetail>> {
        let tables = self.inner.lock();
        let k = key(clan_id, battle_id);
        Ok(tables.clan_battles.get(&k).map(|battle| {
            let mut players = tables.player_stats.get(&k).cloned().unwrap_or_default();
            players.sort_by_key(|p| p.ratio_rank);
            let mut nonplayers = tables.nonplayer_stats.get(&k).cloned().unwrap_or_default();
            nonplayers.sort_by(|a, b| a.player_id.cmp(&b.player_id));
            ClanBattleDetail {
                battle: battle.clone(),
                players,
                nonplayers,
            }
        }))
    }

    async fn list_clan_battles(&self, clan_id: &str) -> Result<Vec<ClanBattle>> {
        let tables = self.inner.lock();
        Ok(tables
            .clan_battles
            .iter()
            .filter(|((clan, _), _)| clan == clan_id)
            .rev()
            .map(|(_, battle)| battle.clone())
            .collect())
    }

    async fn clan_battles_by_prefix(
        &self,
        clan_id: &str,
        prefix: &str,
    ) -> Result<Vec<ClanBattle>> {
        let tables = self.inner.lock();
        Ok(tables
            .clan_battles
            .iter()
            .filter(|((clan, battle_id), _)| clan == clan_id && battle_id.starts_with(prefix))
            .map(|(_, battle)| battle.clone())
            .collect())
    }

    async fn upsert_clan_member(&self, member: &ClanMember) -> Result<()> {
        self.inner
            .lock()
            .clan_members
            .insert(key(&member.clan_id, &member.player_id), member.clone());
        Ok(())
    }

    async fn get_clan_member(
        &self,
        clan_id: &str,
        player_id: &str,
    ) -> Result<Option<ClanMember>> {
        Ok(self
            .inner
            .lock()
            .clan_members
            .get(&key(clan_id, player_id))
            .cloned())
    }
}

impl SummaryStore for MemoryStore {
    async fn get_monthly_performance(
        &self,
        clan_id: &str,
        month_id: &str,
    ) -> Result<Option<MonthlyPerformance>> {
        Ok(self.inner.lock().monthly.get(&key(clan_id, month_id)).cloned())
    }

    async fn upsert_monthly_performance(&self, row: &MonthlyPerformance) -> Result<()> {
        let mut tables = self.inner.lock();
        let k = key(&row.clan_id, &row.month_id);
        let mut row = row.clone();
        if let Some(existing) = tables.monthly.get(&k) {
            row.completed = existing.completed;
        }
        tables.monthly.insert(k, row);
        Ok(())
    }

    async fn delete_monthly_performance(&self, clan_id: &str, month_id: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .monthly
            .remove(&key(clan_id, month_id))
            .is_some())
    }

    async fn set_monthly_completed(
        &self,
        clan_id: &str,
        month_id: &str,
        completed: bool,
    ) -> Result<bool> {
        let mut tables = self.inner.lock();
        match tables.monthly.get_mut(&key(clan_id, month_id)) {
            Some(row) => {
                row.completed = completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_yearly_performance(
        &self,
        clan_id: &str,
        year_id: &str,
    ) -> Result<Option<YearlyPerformance>> {
        Ok(self.inner.lock().yearly.get(&key(clan_id, year_id)).cloned())
    }

    async fn upsert_yearly_performance(&self, row: &YearlyPerformance) -> Result<()> {
        let mut tables = self.inner.lock();
        let k = key(&row.clan_id, &row.year_id);
        let mut row = row.clone();
        if let Some(existing) = tables.yearly.get(&k) {
            row.completed = existing.completed;
        }
        tables.yearly.insert(k, row);
        Ok(())
    }

    async fn delete_yearly_performance(&self, clan_id: &str, year_id: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .yearly
            .remove(&key(clan_id, year_id))
            .is_some())
    }

    async fn set_yearly_completed(
        &self,
        clan_id: &str,
        year_id: &str,
        completed: bool,
    ) -> Result<bool> {
        let mut tables = self.inner.lock();
        match tables.yearly.get_mut(&key(clan_id, year_id)) {
            Some(row) => {
                row.completed = completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
