//! Derived battle metrics — pure arithmetic over raw battle inputs.
//!
//! Every calculated field on a battle record comes from here, so a full
//! recompute from raw inputs always reproduces the persisted values.

use std::cmp::Ordering;

/// FP pools for one battle. Reserves are excluded from `total_fp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleTotals {
    pub total_fp: i64,
    pub nonplaying_fp: i64,
    pub reserve_fp: i64,
}

/// Battle-level calculated fields.
#[derive(Debug, Clone, Copy)]
pub struct DerivedMetrics {
    pub result: i32,
    pub ratio: f64,
    pub average_ratio: f64,
    pub projected_score: f64,
    pub margin_ratio: f64,
    pub fp_margin: f64,
    pub nonplaying_fp_ratio: f64,
    pub reserve_fp_ratio: f64,
}

/// Score-to-FP ratio, scaled by 10.
pub fn player_ratio(score: i64, fp: i64) -> f64 {
    score as f64 / fp as f64 * 10.0
}

/// Rank per input position by descending ratio. The sort is stable, so equal
/// ratios keep their input order.
pub fn ratio_ranks(ratios: &[f64]) -> Vec<i32> {
    let mut order: Vec<usize> = (0..ratios.len()).collect();
    order.sort_by(|&a, &b| ratios[b].partial_cmp(&ratios[a]).unwrap_or(Ordering::Equal));
    let mut ranks = vec![0; ratios.len()];
    for (pos, &idx) in order.iter().enumerate() {
        ranks[idx] = (pos + 1) as i32;
    }
    ranks
}

/// FP pools from playing FPs and nonplaying (fp, reserve) pairs.
pub fn battle_totals(playing_fp: &[i64], nonplaying: &[(i64, bool)]) -> BattleTotals {
    let playing: i64 = playing_fp.iter().sum();
    let mut nonplaying_fp = 0;
    let mut reserve_fp = 0;
    for &(fp, reserve) in nonplaying {
        if reserve {
            reserve_fp += fp;
        } else {
            nonplaying_fp += fp;
        }
    }
    BattleTotals {
        total_fp: playing + nonplaying_fp,
        nonplaying_fp,
        reserve_fp,
    }
}

/// All battle-level calculated fields.
///
/// Callers guarantee `baseline_fp > 0` and `totals.total_fp > 0` (validated
/// input). A zero score yields a zero margin ratio rather than a division by
/// zero.
pub fn derive_battle_metrics(
    score: i64,
    opponent_score: i64,
    baseline_fp: i64,
    opponent_fp: i64,
    totals: BattleTotals,
) -> DerivedMetrics {
    let total_fp = totals.total_fp as f64;
    let nonplaying_frac = totals.nonplaying_fp as f64 / total_fp;
    let reserve_frac = totals.reserve_fp as f64 / total_fp;

    let margin_ratio = if score == 0 {
        0.0
    } else {
        (score - opponent_score) as f64 / score as f64 * 100.0
    };

    DerivedMetrics {
        result: (score - opponent_score).signum() as i32,
        ratio: score as f64 / baseline_fp as f64 * 10.0,
        average_ratio: score as f64 / total_fp * 10.0,
        projected_score: score as f64 * (1.0 + nonplaying_frac),
        margin_ratio,
        fp_margin: (baseline_fp - opponent_fp) as f64 / baseline_fp as f64 * 100.0,
        nonplaying_fp_ratio: nonplaying_frac * 100.0,
        reserve_fp_ratio: reserve_frac * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_ratio_scales_by_ten() {
        assert_eq!(player_ratio(500, 1000), 5.0);
        assert_eq!(player_ratio(0, 800), 0.0);
    }

    #[test]
    fn ratio_ranks_descend_with_stable_ties() {
        let ranks = ratio_ranks(&[4.0, 9.0, 4.0, 1.5]);
        // 9.0 first; the two 4.0s keep input order.
        assert_eq!(ranks, vec![2, 1, 3, 4]);
    }

    #[test]
    fn reserves_are_excluded_from_total_fp() {
        let totals = battle_totals(&[1000, 1200], &[(300, false), (400, true), (200, false)]);
        assert_eq!(
            totals,
            BattleTotals {
                total_fp: 2700,
                nonplaying_fp: 500,
                reserve_fp: 400,
            }
        );
    }

    #[test]
    fn derived_metrics_match_the_formulas() {
        let totals = battle_totals(&[1500, 500], &[(500, false), (1000, true)]);
        assert_eq!(totals.total_fp, 2500);

        let m = derive_battle_metrics(3000, 2000, 2000, 1000, totals);
        assert_eq!(m.result, 1);
        assert_eq!(m.ratio, 15.0); // 3000/2000 × 10
        assert_eq!(m.average_ratio, 12.0); // 3000/2500 × 10
        assert_eq!(m.projected_score, 3600.0); // 3000 × (1 + 500/2500)
        assert!((m.margin_ratio - 33.333333333333336).abs() < 1e-9);
        assert_eq!(m.fp_margin, 50.0); // (2000−1000)/2000 × 100
        assert_eq!(m.nonplaying_fp_ratio, 20.0);
        assert_eq!(m.reserve_fp_ratio, 40.0);
    }

    #[test]
    fn result_covers_all_signs() {
        let totals = battle_totals(&[100], &[]);
        assert_eq!(derive_battle_metrics(5, 9, 100, 100, totals).result, -1);
        assert_eq!(derive_battle_metrics(9, 9, 100, 100, totals).result, 0);
        assert_eq!(derive_battle_metrics(9, 5, 100, 100, totals).result, 1);
    }

    #[test]
    fn zero_score_margin_is_zero_not_nan() {
        let totals = battle_totals(&[100], &[]);
        let m = derive_battle_metrics(0, 50, 100, 100, totals);
        assert_eq!(m.margin_ratio, 0.0);
        assert_eq!(m.result, -1);
    }
}
