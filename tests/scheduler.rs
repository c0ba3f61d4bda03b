use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use clan_battle_coordinator::db::memory::MemoryStore;
use clan_battle_coordinator::db::models::ScheduleSetting;
use clan_battle_coordinator::db::store::ScheduleStore;
use clan_battle_coordinator::gametime;
use clan_battle_coordinator::schedule::{BattleScheduler, TickOutcome};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

async fn scheduler_with_setting(
    next: NaiveDate,
    enabled: bool,
) -> (Arc<MemoryStore>, BattleScheduler<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .put_schedule_setting(&ScheduleSetting {
            next_battle_start: gametime::game_midnight(next),
            scheduler_enabled: enabled,
        })
        .await
        .unwrap();
    let scheduler = BattleScheduler::new(store.clone());
    (store, scheduler)
}

#[tokio::test]
async fn disabled_scheduler_is_a_noop() {
    let battle_date = date(2025, 11, 8);
    let (store, scheduler) = scheduler_with_setting(battle_date, false).await;

    let now = gametime::game_midnight(battle_date) + Duration::hours(1);
    let outcome = scheduler.check_and_advance(now).await.unwrap();
    assert_eq!(outcome, TickOutcome::Disabled);

    assert!(store.get_master_battle("20251108").await.unwrap().is_none());
    let setting = store.get_schedule_setting().await.unwrap().unwrap();
    assert_eq!(setting.next_battle_start, gametime::game_midnight(battle_date));
}

#[tokio::test]
async fn uninitialized_scheduler_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = BattleScheduler::new(store.clone());
    let outcome = scheduler.check_and_advance(Utc::now()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Disabled);
}

#[tokio::test]
async fn future_date_is_not_due() {
    let battle_date = date(2025, 11, 8);
    let (store, scheduler) = scheduler_with_setting(battle_date, true).await;

    let now = gametime::game_midnight(battle_date) - Duration::seconds(1);
    let outcome = scheduler.check_and_advance(now).await.unwrap();
    assert_eq!(outcome, TickOutcome::NotDue);
    assert!(store.get_master_battle("20251108").await.unwrap().is_none());
}

#[tokio::test]
async fn due_date_creates_one_battle_and_advances_three_days() {
    let battle_date = date(2025, 11, 8);
    let (store, scheduler) = scheduler_with_setting(battle_date, true).await;

    let now = gametime::game_midnight(battle_date) + Duration::hours(1);
    let outcome = scheduler.check_and_advance(now).await.unwrap();
    assert_eq!(outcome, TickOutcome::Created("20251108".into()));

    let battle = store.get_master_battle("20251108").await.unwrap().unwrap();
    let (expected_start, expected_end) = gametime::battle_window(battle_date);
    assert_eq!(battle.start_time, expected_start);
    assert_eq!(battle.end_time, expected_end);
    assert_eq!(battle.created_by, None);

    let setting = store.get_schedule_setting().await.unwrap().unwrap();
    assert_eq!(
        setting.next_battle_start,
        gametime::game_midnight(date(2025, 11, 11))
    );

    // An immediate second tick finds the advanced date and does nothing.
    let outcome = scheduler.check_and_advance(now).await.unwrap();
    assert_eq!(outcome, TickOutcome::NotDue);
    assert_eq!(store.recent_master_battles(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn existing_battle_skips_creation_but_still_advances() {
    let battle_date = date(2025, 11, 8);
    let (store, scheduler) = scheduler_with_setting(battle_date, true).await;

    // The window already exists (e.g. created by a manual override).
    scheduler
        .manually_create_battle(battle_date, "admin")
        .await
        .unwrap();

    let now = gametime::game_midnight(battle_date) + Duration::hours(1);
    let outcome = scheduler.check_and_advance(now).await.unwrap();
    assert_eq!(outcome, TickOutcome::SkippedExisting("20251108".into()));

    // The manual row is untouched and the cadence moved on.
    let battle = store.get_master_battle("20251108").await.unwrap().unwrap();
    assert_eq!(battle.created_by.as_deref(), Some("admin"));
    let setting = store.get_schedule_setting().await.unwrap().unwrap();
    assert_eq!(
        setting.next_battle_start,
        gametime::game_midnight(date(2025, 11, 11))
    );
}

#[tokio::test]
async fn overlapping_ticks_create_exactly_one_battle() {
    let battle_date = date(2025, 11, 8);
    let (store, scheduler) = scheduler_with_setting(battle_date, true).await;
    let scheduler = Arc::new(scheduler);

    let now = gametime::game_midnight(battle_date) + Duration::hours(1);
    let a = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.check_and_advance(now).await.unwrap() })
    };
    let b = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.check_and_advance(now).await.unwrap() })
    };
    let outcomes = [a.await.unwrap(), b.await.unwrap()];

    let created = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::Created(_)))
        .count();
    assert_eq!(created, 1, "exactly one tick creates the battle: {outcomes:?}");
    assert_eq!(store.recent_master_battles(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn manual_create_reports_existing_windows() {
    let (_store, scheduler) = scheduler_with_setting(date(2025, 12, 1), true).await;

    let first = scheduler
        .manually_create_battle(date(2025, 11, 20), "alice")
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.battle.battle_id, "20251120");
    assert_eq!(first.battle.created_by.as_deref(), Some("alice"));

    let second = scheduler
        .manually_create_battle(date(2025, 11, 20), "bob")
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.battle.created_by.as_deref(), Some("alice"));
}

#[tokio::test]
async fn ensure_initialized_seeds_once_and_never_overwrites() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = BattleScheduler::new(store.clone());

    let anchor = gametime::game_midnight(date(2025, 11, 8));
    scheduler.ensure_initialized(anchor).await.unwrap();
    let setting = store.get_schedule_setting().await.unwrap().unwrap();
    assert_eq!(setting.next_battle_start, anchor);
    assert!(!setting.scheduler_enabled);

    // Re-running startup must not clobber operator changes.
    scheduler
        .update_next_battle_date(gametime::game_midnight(date(2025, 12, 1)), true)
        .await
        .unwrap();
    scheduler.ensure_initialized(anchor).await.unwrap();
    let setting = store.get_schedule_setting().await.unwrap().unwrap();
    assert_eq!(
        setting.next_battle_start,
        gametime::game_midnight(date(2025, 12, 1))
    );
    assert!(setting.scheduler_enabled);
}
