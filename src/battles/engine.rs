//! Battle record engine — validated create/update/delete of one clan's
//! battle results.
//!
//! Every write recomputes all derived fields from raw inputs and persists
//! the record, stat rows, and roster mutations in one atomic store call.
//! Summary recomputation runs after the commit and is best-effort: a failed
//! recomputation is logged and retried by the next write to the same period.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::battles::{actions, metrics};
use crate::db::models::{ClanBattle, ClanBattleDetail, NonplayerStat, PlayerStat};
use crate::db::store::{BattleStore, RosterMutation, ScheduleStore, SummaryStore};
use crate::error::{CoordinatorError, Result};
use crate::performance::Aggregator;

/// A playing participant in a battle submission.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerEntry {
    pub player_id: String,
    #[serde(default)]
    pub player_name: Option<String>,
    pub score: i64,
    pub fp: i64,
    /// In-game leaderboard position, taken as-is.
    pub rank: i32,
    #[serde(default)]
    pub action: Option<String>,
}

/// A roster member who did not play.
#[derive(Debug, Clone, Deserialize)]
pub struct NonplayerEntry {
    pub player_id: String,
    #[serde(default)]
    pub player_name: Option<String>,
    pub fp: i64,
    #[serde(default)]
    pub reserve: bool,
    #[serde(default)]
    pub action: Option<String>,
}

/// Full raw input for one clan's battle record.
#[derive(Debug, Clone, Deserialize)]
pub struct BattleInput {
    pub battle_id: String,
    #[serde(default)]
    pub opponent_name: Option<String>,
    pub score: i64,
    pub opponent_score: i64,
    pub baseline_fp: i64,
    pub opponent_fp: i64,
    #[serde(default)]
    pub notes: Option<String>,
    pub players: Vec<PlayerEntry>,
    #[serde(default)]
    pub nonplayers: Vec<NonplayerEntry>,
}

/// Partial update — supplied fields are merged over the persisted inputs,
/// then the whole record is recomputed. `battle_id` is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BattleUpdate {
    #[serde(default)]
    pub opponent_name: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub opponent_score: Option<i64>,
    #[serde(default)]
    pub baseline_fp: Option<i64>,
    #[serde(default)]
    pub opponent_fp: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub players: Option<Vec<PlayerEntry>>,
    #[serde(default)]
    pub nonplayers: Option<Vec<NonplayerEntry>>,
}

pub struct BattleEngine<S> {
    store: Arc<S>,
    aggregator: Aggregator<S>,
}

impl<S: ScheduleStore + BattleStore + SummaryStore> BattleEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            aggregator: Aggregator::new(store.clone()),
            store,
        }
    }

    /// Record a clan's results for one scheduled battle.
    pub async fn create_battle(&self, clan_id: &str, input: BattleInput) -> Result<ClanBattleDetail> {
        validate_input(&input)?;

        if self.store.get_master_battle(&input.battle_id).await?.is_none() {
            return Err(CoordinatorError::not_found(format!(
                "no master battle with id {}",
                input.battle_id
            )));
        }

        let now = Utc::now();
        let record = build_record(clan_id, &input, now, now)?;
        self.store
            .insert_clan_battle(
                &record.battle,
                &record.players,
                &record.nonplayers,
                &record.roster,
            )
            .await?;

        self.refresh_summaries(clan_id, &input.battle_id).await;

        self.store
            .get_clan_battle(clan_id, &input.battle_id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found("battle record vanished after insert"))
    }

    /// Merge `patch` over the persisted raw inputs and recompute-and-replace
    /// the whole record. Equivalent to delete+recreate, but atomic.
    pub async fn update_battle(
        &self,
        clan_id: &str,
        battle_id: &str,
        patch: BattleUpdate,
    ) -> Result<ClanBattleDetail> {
        let existing = self
            .store
            .get_clan_battle(clan_id, battle_id)
            .await?
            .ok_or_else(|| {
                CoordinatorError::not_found(format!(
                    "no battle record for clan {clan_id} battle {battle_id}"
                ))
            })?;

        let input = merge_update(&existing, patch);
        validate_input(&input)?;

        let record = build_record(clan_id, &input, existing.battle.created_at, Utc::now())?;
        self.store
            .replace_clan_battle(
                &record.battle,
                &record.players,
                &record.nonplayers,
                &record.roster,
            )
            .await?;

        self.refresh_summaries(clan_id, battle_id).await;

        self.store
            .get_clan_battle(clan_id, battle_id)
            .await?
            .ok_or_else(|| CoordinatorError::not_found("battle record vanished after replace"))
    }

    /// Remove a battle record and its stat rows.
    pub async fn delete_battle(&self, clan_id: &str, battle_id: &str) -> Result<()> {
        let existed = self.store.delete_clan_battle(clan_id, battle_id).await?;
        if !existed {
            return Err(CoordinatorError::not_found(format!(
                "no battle record for clan {clan_id} battle {battle_id}"
            )));
        }
        self.refresh_summaries(clan_id, battle_id).await;
        Ok(())
    }

    pub async fn get_battles(&self, clan_id: &str) -> Result<Vec<ClanBattle>> {
        self.store.list_clan_battles(clan_id).await
    }

    pub async fn get_battle(&self, clan_id: &str, battle_id: &str) -> Result<ClanBattleDetail> {
        self.store
            .get_clan_battle(clan_id, battle_id)
            .await?
            .ok_or_else(|| {
                CoordinatorError::not_found(format!(
                    "no battle record for clan {clan_id} battle {battle_id}"
                ))
            })
    }

    /// Post-commit summary recomputation. Failures never surface to the
    /// battle write; the next write to the period recomputes from scratch.
    async fn refresh_summaries(&self, clan_id: &str, battle_id: &str) {
        if let Err(e) = self.aggregator.recompute_for_battle(clan_id, battle_id).await {
            warn!(
                clan_id,
                battle_id,
                error = %e,
                "summary recomputation failed after battle write"
            );
        }
    }
}

struct BattleRecord {
    battle: ClanBattle,
    players: Vec<PlayerStat>,
    nonplayers: Vec<NonplayerStat>,
    roster: Vec<RosterMutation>,
}

fn validate_input(input: &BattleInput) -> Result<()> {
    if input.battle_id.len() != 8 || !input.battle_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoordinatorError::validation(
            "battle id must be an 8-digit date identifier",
        ));
    }
    if input.score < 0 || input.opponent_score < 0 {
        return Err(CoordinatorError::validation("scores must be non-negative"));
    }
    if input.baseline_fp <= 0 {
        return Err(CoordinatorError::validation("baseline fp must be positive"));
    }
    if input.opponent_fp < 0 {
        return Err(CoordinatorError::validation("opponent fp must be non-negative"));
    }
    if input.players.is_empty() {
        return Err(CoordinatorError::validation(
            "at least one playing participant is required",
        ));
    }

    let mut seen = HashSet::new();
    for p in &input.players {
        if p.fp <= 0 {
            return Err(CoordinatorError::validation(format!(
                "player {} fp must be positive",
                p.player_id
            )));
        }
        if p.score < 0 {
            return Err(CoordinatorError::validation(format!(
                "player {} score must be non-negative",
                p.player_id
            )));
        }
        if !seen.insert(p.player_id.as_str()) {
            return Err(CoordinatorError::validation(format!(
                "duplicate participant: {}",
                p.player_id
            )));
        }
    }
    for n in &input.nonplayers {
        if n.fp < 0 {
            return Err(CoordinatorError::validation(format!(
                "nonplayer {} fp must be non-negative",
                n.player_id
            )));
        }
        if !seen.insert(n.player_id.as_str()) {
            return Err(CoordinatorError::validation(format!(
                "duplicate participant: {}",
                n.player_id
            )));
        }
    }

    Ok(())
}

/// Compute every derived field and assemble the rows to persist. Pure — runs
/// entirely before the store write, so a bad action code has no side effects.
fn build_record(
    clan_id: &str,
    input: &BattleInput,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<BattleRecord> {
    let mut roster = Vec::new();
    for (player_id, code) in input
        .players
        .iter()
        .map(|p| (&p.player_id, p.action.as_deref()))
        .chain(
            input
                .nonplayers
                .iter()
                .map(|n| (&n.player_id, n.action.as_deref())),
        )
    {
        if let Some(code) = code {
            let action = actions::resolve(code)?;
            if let Some(mutation) = actions::mutation_for(clan_id, player_id, action) {
                roster.push(mutation);
            }
        }
    }

    let ratios: Vec<f64> = input
        .players
        .iter()
        .map(|p| metrics::player_ratio(p.score, p.fp))
        .collect();
    let ranks = metrics::ratio_ranks(&ratios);

    let players: Vec<PlayerStat> = input
        .players
        .iter()
        .zip(ratios.iter().zip(ranks.iter()))
        .map(|(p, (&ratio, &ratio_rank))| PlayerStat {
            clan_id: clan_id.to_string(),
            battle_id: input.battle_id.clone(),
            player_id: p.player_id.clone(),
            player_name: p.player_name.clone(),
            score: p.score,
            fp: p.fp,
            rank: p.rank,
            ratio,
            ratio_rank,
        })
        .collect();

    let nonplayers: Vec<NonplayerStat> = input
        .nonplayers
        .iter()
        .map(|n| NonplayerStat {
            clan_id: clan_id.to_string(),
            battle_id: input.battle_id.clone(),
            player_id: n.player_id.clone(),
            player_name: n.player_name.clone(),
            fp: n.fp,
            reserve: n.reserve,
        })
        .collect();

    let playing_fp: Vec<i64> = input.players.iter().map(|p| p.fp).collect();
    let nonplaying_fp: Vec<(i64, bool)> =
        input.nonplayers.iter().map(|n| (n.fp, n.reserve)).collect();
    let totals = metrics::battle_totals(&playing_fp, &nonplaying_fp);
    let derived = metrics::derive_battle_metrics(
        input.score,
        input.opponent_score,
        input.baseline_fp,
        input.opponent_fp,
        totals,
    );

    let battle = ClanBattle {
        clan_id: clan_id.to_string(),
        battle_id: input.battle_id.clone(),
        opponent_name: input.opponent_name.clone(),
        score: input.score,
        opponent_score: input.opponent_score,
        baseline_fp: input.baseline_fp,
        opponent_fp: input.opponent_fp,
        total_fp: totals.total_fp,
        nonplaying_fp: totals.nonplaying_fp,
        reserve_fp: totals.reserve_fp,
        result: derived.result,
        ratio: derived.ratio,
        average_ratio: derived.average_ratio,
        projected_score: derived.projected_score,
        margin_ratio: derived.margin_ratio,
        fp_margin: derived.fp_margin,
        nonplaying_fp_ratio: derived.nonplaying_fp_ratio,
        reserve_fp_ratio: derived.reserve_fp_ratio,
        notes: input.notes.clone(),
        created_at,
        updated_at,
    };

    Ok(BattleRecord {
        battle,
        players,
        nonplayers,
        roster,
    })
}

/// Rebuild the raw input set from a persisted record, with `patch` fields
/// merged over it. Action codes are one-shot commands and are never carried
/// over from a previous submission.
fn merge_update(existing: &ClanBattleDetail, patch: BattleUpdate) -> BattleInput {
    let players = patch.players.unwrap_or_else(|| {
        existing
            .players
            .iter()
            .map(|p| PlayerEntry {
                player_id: p.player_id.clone(),
                player_name: p.player_name.clone(),
                score: p.score,
                fp: p.fp,
                rank: p.rank,
                action: None,
            })
            .collect()
    });
    let nonplayers = patch.nonplayers.unwrap_or_else(|| {
        existing
            .nonplayers
            .iter()
            .map(|n| NonplayerEntry {
                player_id: n.player_id.clone(),
                player_name: n.player_name.clone(),
                fp: n.fp,
                reserve: n.reserve,
                action: None,
            })
            .collect()
    });

    let battle = &existing.battle;
    BattleInput {
        battle_id: battle.battle_id.clone(),
        opponent_name: patch.opponent_name.or_else(|| battle.opponent_name.clone()),
        score: patch.score.unwrap_or(battle.score),
        opponent_score: patch.opponent_score.unwrap_or(battle.opponent_score),
        baseline_fp: patch.baseline_fp.unwrap_or(battle.baseline_fp),
        opponent_fp: patch.opponent_fp.unwrap_or(battle.opponent_fp),
        notes: patch.notes.or_else(|| battle.notes.clone()),
        players,
        nonplayers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_input() -> BattleInput {
        BattleInput {
            battle_id: "20251108".into(),
            opponent_name: None,
            score: 1000,
            opponent_score: 900,
            baseline_fp: 2000,
            opponent_fp: 1800,
            notes: None,
            players: vec![PlayerEntry {
                player_id: "p1".into(),
                player_name: None,
                score: 1000,
                fp: 2000,
                rank: 1,
                action: None,
            }],
            nonplayers: vec![],
        }
    }

    #[test]
    fn rejects_malformed_battle_id() {
        let mut input = minimal_input();
        input.battle_id = "2025118".into();
        assert!(validate_input(&input).is_err());
        input.battle_id = "2025110a".into();
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn rejects_duplicate_participants_across_lists() {
        let mut input = minimal_input();
        input.nonplayers.push(NonplayerEntry {
            player_id: "p1".into(),
            player_name: None,
            fp: 100,
            reserve: false,
            action: None,
        });
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn rejects_empty_player_list() {
        let mut input = minimal_input();
        input.players.clear();
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn unknown_action_code_fails_before_any_rows_are_built() {
        let mut input = minimal_input();
        input.players[0].action = Some("obliterate".into());
        let now = Utc::now();
        assert!(build_record("clan", &input, now, now).is_err());
    }

    #[test]
    fn build_record_assigns_ratio_ranks() {
        let mut input = minimal_input();
        input.players = vec![
            PlayerEntry {
                player_id: "low".into(),
                player_name: None,
                score: 100,
                fp: 1000,
                rank: 2,
                action: None,
            },
            PlayerEntry {
                player_id: "high".into(),
                player_name: None,
                score: 900,
                fp: 1000,
                rank: 1,
                action: None,
            },
        ];
        let now = Utc::now();
        let record = build_record("clan", &input, now, now).unwrap();
        assert_eq!(record.players[0].ratio_rank, 2);
        assert_eq!(record.players[1].ratio_rank, 1);
    }
}
