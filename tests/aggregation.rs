use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use clan_battle_coordinator::battles::{BattleEngine, BattleInput, PlayerEntry};
use clan_battle_coordinator::db::memory::MemoryStore;
use clan_battle_coordinator::db::models::{MasterBattle, MonthlyPerformance};
use clan_battle_coordinator::db::store::{ScheduleStore, SummaryStore};
use clan_battle_coordinator::gametime;
use clan_battle_coordinator::performance::{Aggregator, PeriodKind};

const CLAN: &str = "thunderbirds";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

async fn seed_master(store: &MemoryStore, day: NaiveDate) -> String {
    let battle_id = gametime::battle_id_for_date(day);
    let (start_time, end_time) = gametime::battle_window(day);
    store
        .insert_master_battle(&MasterBattle {
            battle_id: battle_id.clone(),
            start_time,
            end_time,
            created_by: None,
            notes: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    battle_id
}

/// One-player battle so ratio arithmetic stays readable: score/2000 × 10.
fn battle_input(battle_id: &str, score: i64, opponent_score: i64) -> BattleInput {
    BattleInput {
        battle_id: battle_id.into(),
        opponent_name: None,
        score,
        opponent_score,
        baseline_fp: 2000,
        opponent_fp: 2000,
        notes: None,
        players: vec![PlayerEntry {
            player_id: "alice".into(),
            player_name: None,
            score,
            fp: 2000,
            rank: 1,
            action: None,
        }],
        nonplayers: vec![],
    }
}

async fn record_battle(
    store: &Arc<MemoryStore>,
    engine: &BattleEngine<MemoryStore>,
    day: NaiveDate,
    score: i64,
    opponent_score: i64,
) -> String {
    let battle_id = seed_master(store, day).await;
    engine
        .create_battle(CLAN, battle_input(&battle_id, score, opponent_score))
        .await
        .unwrap();
    battle_id
}

/// The derived content of a summary, ignoring the recomputation timestamp.
fn content(row: &MonthlyPerformance) -> (i64, i64, i64, i64, f64, f64, f64, f64) {
    (
        row.battle_count,
        row.won_count,
        row.lost_count,
        row.tied_count,
        row.avg_ratio,
        row.avg_average_ratio,
        row.avg_margin_ratio,
        row.avg_fp_margin,
    )
}

#[tokio::test]
async fn monthly_summary_counts_mixed_results() {
    let store = Arc::new(MemoryStore::new());
    let engine = BattleEngine::new(store.clone());

    // Results [1, −1, 0] with ratios [15, 5, 10].
    record_battle(&store, &engine, date(2025, 11, 1), 3000, 2000).await;
    record_battle(&store, &engine, date(2025, 11, 4), 1000, 2000).await;
    record_battle(&store, &engine, date(2025, 11, 7), 2000, 2000).await;

    let monthly = store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .expect("monthly summary");
    assert_eq!(monthly.battle_count, 3);
    assert_eq!(monthly.won_count, 1);
    assert_eq!(monthly.lost_count, 1);
    assert_eq!(monthly.tied_count, 1);
    assert_eq!(monthly.avg_ratio, 10.0); // mean of 15, 5, 10
}

#[tokio::test]
async fn yearly_summary_spans_months() {
    let store = Arc::new(MemoryStore::new());
    let engine = BattleEngine::new(store.clone());

    record_battle(&store, &engine, date(2025, 11, 1), 3000, 2000).await;
    record_battle(&store, &engine, date(2025, 12, 2), 1000, 2000).await;

    let november = store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .unwrap();
    let december = store
        .get_monthly_performance(CLAN, "202512")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(november.battle_count, 1);
    assert_eq!(december.battle_count, 1);

    let yearly = store
        .get_yearly_performance(CLAN, "2025")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(yearly.battle_count, 2);
    assert_eq!(yearly.won_count, 1);
    assert_eq!(yearly.lost_count, 1);
    assert_eq!(yearly.avg_ratio, 10.0); // mean of 15, 5
}

#[tokio::test]
async fn recomputation_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let engine = BattleEngine::new(store.clone());
    let aggregator = Aggregator::new(store.clone());

    record_battle(&store, &engine, date(2025, 11, 1), 3000, 2000).await;
    record_battle(&store, &engine, date(2025, 11, 4), 1000, 2000).await;

    let first = store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .unwrap();
    aggregator
        .recompute_period(CLAN, "202511", PeriodKind::Month)
        .await
        .unwrap();
    let second = store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(content(&first), content(&second));
}

#[tokio::test]
async fn deleting_the_last_battle_removes_the_period_rows() {
    let store = Arc::new(MemoryStore::new());
    let engine = BattleEngine::new(store.clone());

    let november = record_battle(&store, &engine, date(2025, 11, 1), 3000, 2000).await;
    let december = record_battle(&store, &engine, date(2025, 12, 2), 1000, 2000).await;

    engine.delete_battle(CLAN, &december).await.unwrap();

    // December emptied; November and the year (still one battle) remain.
    assert!(store
        .get_monthly_performance(CLAN, "202512")
        .await
        .unwrap()
        .is_none());
    assert!(store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .is_some());
    let yearly = store
        .get_yearly_performance(CLAN, "2025")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(yearly.battle_count, 1);

    engine.delete_battle(CLAN, &november).await.unwrap();
    assert!(store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .is_none());
    assert!(store
        .get_yearly_performance(CLAN, "2025")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn completed_flag_survives_recomputation() {
    let store = Arc::new(MemoryStore::new());
    let engine = BattleEngine::new(store.clone());

    record_battle(&store, &engine, date(2025, 11, 1), 3000, 2000).await;
    assert!(store
        .set_monthly_completed(CLAN, "202511", true)
        .await
        .unwrap());

    // A later write to the same month recomputes the summary.
    record_battle(&store, &engine, date(2025, 11, 4), 1000, 2000).await;

    let monthly = store
        .get_monthly_performance(CLAN, "202511")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(monthly.battle_count, 2);
    assert!(monthly.completed);
}
