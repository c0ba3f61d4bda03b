//! Aggregation engine — monthly and yearly per-clan summaries.
//!
//! Summaries are pure projections of the current battle set for a period:
//! always recomputed from scratch, never patched incrementally. Recomputing
//! with no intervening writes is a no-op by construction.

use std::sync::Arc;

use chrono::Utc;

use crate::db::models::{ClanBattle, MonthlyPerformance, YearlyPerformance};
use crate::db::store::{BattleStore, SummaryStore};
use crate::error::Result;
use crate::gametime;

/// Which summary table a period id addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    /// 6-digit `YYYYMM` period.
    Month,
    /// 4-digit `YYYY` period.
    Year,
}

/// Counts and arithmetic means over one period's battle set.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTotals {
    pub battle_count: i64,
    pub won_count: i64,
    pub lost_count: i64,
    pub tied_count: i64,
    pub avg_ratio: f64,
    pub avg_average_ratio: f64,
    pub avg_projected_score: f64,
    pub avg_margin_ratio: f64,
    pub avg_fp_margin: f64,
    pub avg_nonplaying_fp_ratio: f64,
    pub avg_reserve_fp_ratio: f64,
}

/// Summarize a non-empty battle set.
pub fn summarize(battles: &[ClanBattle]) -> PeriodTotals {
    let n = battles.len() as f64;
    let mean = |f: fn(&ClanBattle) -> f64| battles.iter().map(f).sum::<f64>() / n;

    PeriodTotals {
        battle_count: battles.len() as i64,
        won_count: battles.iter().filter(|b| b.result > 0).count() as i64,
        lost_count: battles.iter().filter(|b| b.result < 0).count() as i64,
        tied_count: battles.iter().filter(|b| b.result == 0).count() as i64,
        avg_ratio: mean(|b| b.ratio),
        avg_average_ratio: mean(|b| b.average_ratio),
        avg_projected_score: mean(|b| b.projected_score),
        avg_margin_ratio: mean(|b| b.margin_ratio),
        avg_fp_margin: mean(|b| b.fp_margin),
        avg_nonplaying_fp_ratio: mean(|b| b.nonplaying_fp_ratio),
        avg_reserve_fp_ratio: mean(|b| b.reserve_fp_ratio),
    }
}

pub struct Aggregator<S> {
    store: Arc<S>,
}

impl<S: BattleStore + SummaryStore> Aggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Recompute both periods a battle id belongs to. This is the trigger
    /// the battle record engine fires after every commit.
    pub async fn recompute_for_battle(&self, clan_id: &str, battle_id: &str) -> Result<()> {
        self.recompute_period(clan_id, gametime::month_prefix(battle_id), PeriodKind::Month)
            .await?;
        self.recompute_period(clan_id, gametime::year_prefix(battle_id), PeriodKind::Year)
            .await
    }

    /// Recompute one period summary from the current battle set. An empty
    /// set deletes the summary row; otherwise the row is upserted with the
    /// independently-set `completed` flag preserved by the store.
    pub async fn recompute_period(
        &self,
        clan_id: &str,
        period_id: &str,
        kind: PeriodKind,
    ) -> Result<()> {
        let battles = self.store.clan_battles_by_prefix(clan_id, period_id).await?;

        if battles.is_empty() {
            match kind {
                PeriodKind::Month => {
                    self.store.delete_monthly_performance(clan_id, period_id).await?;
                }
                PeriodKind::Year => {
                    self.store.delete_yearly_performance(clan_id, period_id).await?;
                }
            }
            return Ok(());
        }

        let totals = summarize(&battles);
        let now = Utc::now();
        match kind {
            PeriodKind::Month => {
                self.store
                    .upsert_monthly_performance(&MonthlyPerformance {
                        clan_id: clan_id.to_string(),
                        month_id: period_id.to_string(),
                        battle_count: totals.battle_count,
                        won_count: totals.won_count,
                        lost_count: totals.lost_count,
                        tied_count: totals.tied_count,
                        avg_ratio: totals.avg_ratio,
                        avg_average_ratio: totals.avg_average_ratio,
                        avg_projected_score: totals.avg_projected_score,
                        avg_margin_ratio: totals.avg_margin_ratio,
                        avg_fp_margin: totals.avg_fp_margin,
                        avg_nonplaying_fp_ratio: totals.avg_nonplaying_fp_ratio,
                        avg_reserve_fp_ratio: totals.avg_reserve_fp_ratio,
                        completed: false,
                        updated_at: now,
                    })
                    .await
            }
            PeriodKind::Year => {
                self.store
                    .upsert_yearly_performance(&YearlyPerformance {
                        clan_id: clan_id.to_string(),
                        year_id: period_id.to_string(),
                        battle_count: totals.battle_count,
                        won_count: totals.won_count,
                        lost_count: totals.lost_count,
                        tied_count: totals.tied_count,
                        avg_ratio: totals.avg_ratio,
                        avg_average_ratio: totals.avg_average_ratio,
                        avg_projected_score: totals.avg_projected_score,
                        avg_margin_ratio: totals.avg_margin_ratio,
                        avg_fp_margin: totals.avg_fp_margin,
                        avg_nonplaying_fp_ratio: totals.avg_nonplaying_fp_ratio,
                        avg_reserve_fp_ratio: totals.avg_reserve_fp_ratio,
                        completed: false,
                        updated_at: now,
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn battle(battle_id: &str, result: i32, ratio: f64) -> ClanBattle {
        let now = Utc::now();
        ClanBattle {
            clan_id: "clan".into(),
            battle_id: battle_id.into(),
            opponent_name: None,
            score: 0,
            opponent_score: 0,
            baseline_fp: 1,
            opponent_fp: 1,
            total_fp: 1,
            nonplaying_fp: 0,
            reserve_fp: 0,
            result,
            ratio,
            average_ratio: ratio / 2.0,
            projected_score: 100.0,
            margin_ratio: 10.0,
            fp_margin: 5.0,
            nonplaying_fp_ratio: 0.0,
            reserve_fp_ratio: 0.0,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counts_and_means_over_mixed_results() {
        let battles = vec![
            battle("20251101", 1, 12.0),
            battle("20251104", -1, 6.0),
            battle("20251107", 0, 9.0),
        ];
        let totals = summarize(&battles);
        assert_eq!(totals.battle_count, 3);
        assert_eq!(totals.won_count, 1);
        assert_eq!(totals.lost_count, 1);
        assert_eq!(totals.tied_count, 1);
        assert_eq!(totals.avg_ratio, 9.0);
        assert_eq!(totals.avg_average_ratio, 4.5);
    }

    #[test]
    fn summarize_is_deterministic() {
        let battles = vec![battle("20251101", 1, 12.0), battle("20251104", -1, 6.0)];
        assert_eq!(summarize(&battles), summarize(&battles));
    }
}
