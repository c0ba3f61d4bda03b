//! SQL query functions for all tables.

use sqlx::{PgPool, Postgres, Transaction};

use super::models::*;
use super::store::RosterMutation;
use crate::error::{CoordinatorError, Result};

/// Map a unique-constraint violation to `Conflict`; pass everything else
/// through as a database error.
fn conflict_on_unique(err: sqlx::Error, msg: &str) -> CoordinatorError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CoordinatorError::conflict(msg.to_string())
        }
        _ => err.into(),
    }
}

// ── Master battles ───────────────────────────────────────────────

pub async fn get_master_battle(pool: &PgPool, battle_id: &str) -> Result<Option<MasterBattle>> {
    let row = sqlx::query_as::<_, MasterBattle>(
        "SELECT * FROM master_battles WHERE battle_id = $1"
    )
    .bind(battle_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn insert_master_battle(pool: &PgPool, battle: &MasterBattle) -> Result<()> {
    sqlx::query(
        "INSERT INTO master_battles (battle_id, start_time, end_time, created_by, notes, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)"
    )
    .bind(&battle.battle_id)
    .bind(battle.start_time)
    .bind(battle.end_time)
    .bind(&battle.created_by)
    .bind(&battle.notes)
    .bind(battle.created_at)
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "master battle already exists"))?;
    Ok(())
}

pub async fn recent_master_battles(pool: &PgPool, limit: i64) -> Result<Vec<MasterBattle>> {
    let rows = sqlx::query_as::<_, MasterBattle>(
        "SELECT * FROM master_battles ORDER BY battle_id DESC LIMIT $1"
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Schedule setting ─────────────────────────────────────────────

pub async fn get_schedule_setting(pool: &PgPool) -> Result<Option<ScheduleSetting>> {
    let row = sqlx::query_as::<_, ScheduleSetting>(
        "SELECT next_battle_start, scheduler_enabled FROM schedule_settings WHERE singleton"
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn put_schedule_setting(pool: &PgPool, setting: &ScheduleSetting) -> Result<()> {
    sqlx::query(
        "INSERT INTO schedule_settings (singleton, next_battle_start, scheduler_enabled)
         VALUES (TRUE, $1, $2)
         ON CONFLICT (singleton)
         DO UPDATE SET next_battle_start = EXCLUDED.next_battle_start,
                       scheduler_enabled = EXCLUDED.scheduler_enabled"
    )
    .bind(setting.next_battle_start)
    .bind(setting.scheduler_enabled)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn init_schedule_setting(pool: &PgPool, setting: &ScheduleSetting) -> Result<bool> {
    let done = sqlx::query(
        "INSERT INTO schedule_settings (singleton, next_battle_start, scheduler_enabled)
         VALUES (TRUE, $1, $2)
         ON CONFLICT (singleton) DO NOTHING"
    )
    .bind(setting.next_battle_start)
    .bind(setting.scheduler_enabled)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}

// ── Clan battles ─────────────────────────────────────────────────

async fn insert_battle_rows(
    tx: &mut Transaction<'_, Postgres>,
    battle: &ClanBattle,
    players: &[PlayerStat],
    nonplayers: &[NonplayerStat],
    roster: &[RosterMutation],
) -> Result<()> {
    sqlx::query(
        "INSERT INTO clan_battles (clan_id, battle_id, opponent_name, score, opponent_score,
         baseline_fp, opponent_fp, total_fp, nonplaying_fp, reserve_fp, result, ratio,
         average_ratio, projected_score, margin_ratio, fp_margin, nonplaying_fp_ratio,
         reserve_fp_ratio, notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                 $17, $18, $19, $20, $21)"
    )
    .bind(&battle.clan_id)
    .bind(&battle.battle_id)
    .bind(&battle.opponent_name)
    .bind(battle.score)
    .bind(battle.opponent_score)
    .bind(battle.baseline_fp)
    .bind(battle.opponent_fp)
    .bind(battle.total_fp)
    .bind(battle.nonplaying_fp)
    .bind(battle.reserve_fp)
    .bind(battle.result)
    .bind(battle.ratio)
    .bind(battle.average_ratio)
    .bind(battle.projected_score)
    .bind(battle.margin_ratio)
    .bind(battle.fp_margin)
    .bind(battle.nonplaying_fp_ratio)
    .bind(battle.reserve_fp_ratio)
    .bind(&battle.notes)
    .bind(battle.created_at)
    .bind(battle.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| conflict_on_unique(e, "clan battle already recorded for this battle id"))?;

    for stat in players {
        sqlx::query(
            "INSERT INTO player_stats (clan_id, battle_id, player_id, player_name, score, fp,
             rank, ratio, ratio_rank)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        )
        .bind(&stat.clan_id)
        .bind(&stat.battle_id)
        .bind(&stat.player_id)
        .bind(&stat.player_name)
        .bind(stat.score)
        .bind(stat.fp)
        .bind(stat.rank)
        .bind(stat.ratio)
        .bind(stat.ratio_rank)
        .execute(&mut **tx)
        .await?;
    }

    for stat in nonplayers {
        sqlx::query(
            "INSERT INTO nonplayer_stats (clan_id, battle_id, player_id, player_name, fp, reserve)
             VALUES ($1, $2, $3, $4, $5, $6)"
        )
        .bind(&stat.clan_id)
        .bind(&stat.battle_id)
        .bind(&stat.player_id)
        .bind(&stat.player_name)
        .bind(stat.fp)
        .bind(stat.reserve)
        .execute(&mut **tx)
        .await?;
    }

    for mutation in roster {
        match mutation {
            RosterMutation::Deactivate { clan_id, player_id } => {
                sqlx::query(
                    "UPDATE clan_members SET active = FALSE
                     WHERE clan_id = $1 AND player_id = $2"
                )
                .bind(clan_id)
                .bind(player_id)
                .execute(&mut **tx)
                .await?;
            }
        }
    }

    Ok(())
}

pub async fn insert_clan_battle(
    pool: &PgPool,
    battle: &ClanBattle,
    players: &[PlayerStat],
    nonplayers: &[NonplayerStat],
    roster: &[RosterMutation],
) -> Result<()> {
    let mut tx = pool.begin().await?;
    insert_battle_rows(&mut tx, battle, players, nonplayers, roster).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn replace_clan_battle(
    pool: &PgPool,
    battle: &ClanBattle,
    players: &[PlayerStat],
    nonplayers: &[NonplayerStat],
    roster: &[RosterMutation],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    // Stat rows go with the battle via ON DELETE CASCADE. Inside the
    // transaction the replacement is invisible until commit.
    let deleted = sqlx::query(
        "DELETE FROM clan_battles WHERE clan_id = $1 AND battle_id = $2"
    )
    .bind(&battle.clan_id)
    .bind(&battle.battle_id)
    .execute(&mut *tx)
    .await?;
    if deleted.rows_affected() == 0 {
        return Err(CoordinatorError::not_found(format!(
            "no battle record for clan {} battle {}",
            battle.clan_id, battle.battle_id
        )));
    }

    insert_battle_rows(&mut tx, battle, players, nonplayers, roster).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn delete_clan_battle(pool: &PgPool, clan_id: &str, battle_id: &str) -> Result<bool> {
    let done = sqlx::query(
        "DELETE FROM clan_battles WHERE clan_id = $1 AND battle_id = $2"
    )
    .bind(clan_id)
    .bind(battle_id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn get_clan_battle(
    pool: &PgPool,
    clan_id: &str,
    battle_id: &str,
) -> Result<Option<ClanBattleDetail>> {
    let battle = sqlx::query_as::<_, ClanBattle>(
        "SELECT * FROM clan_battles WHERE clan_id = $1 AND battle_id = $2"
    )
    .bind(clan_id)
    .bind(battle_id)
    .fetch_optional(pool)
    .await?;

    let Some(battle) = battle else {
        return Ok(None);
    };

    let players = sqlx::query_as::<_, PlayerStat>(
        "SELECT * FROM player_stats WHERE clan_id = $1 AND battle_id = $2 ORDER BY ratio_rank"
    )
    .bind(clan_id)
    .bind(battle_id)
    .fetch_all(pool)
    .await?;

    let nonplayers = sqlx::query_as::<_, NonplayerStat>(
        "SELECT * FROM nonplayer_stats WHERE clan_id = $1 AND battle_id = $2 ORDER BY player_id"
    )
    .bind(clan_id)
    .bind(battle_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(ClanBattleDetail {
        battle,
        players,
        nonplayers,
    }))
}

pub async fn list_clan_battles(pool: &PgPool, clan_id: &str) -> Result<Vec<ClanBattle>> {
    let rows = sqlx::query_as::<_, ClanBattle>(
        "SELECT * FROM clan_battles WHERE clan_id = $1 ORDER BY battle_id DESC"
    )
    .bind(clan_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn clan_battles_by_prefix(
    pool: &PgPool,
    clan_id: &str,
    prefix: &str,
) -> Result<Vec<ClanBattle>> {
    let rows = sqlx::query_as::<_, ClanBattle>(
        "SELECT * FROM clan_battles WHERE clan_id = $1 AND battle_id LIKE $2 || '%'
         ORDER BY battle_id"
    )
    .bind(clan_id)
    .bind(prefix)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Roster ───────────────────────────────────────────────────────

pub async fn upsert_clan_member(pool: &PgPool, member: &ClanMember) -> Result<()> {
    sqlx::query(
        "INSERT INTO clan_members (clan_id, player_id, player_name, active)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (clan_id, player_id)
         DO UPDATE SET player_name = EXCLUDED.player_name, active = EXCLUDED.active"
    )
    .bind(&member.clan_id)
    .bind(&member.player_id)
    .bind(&member.player_name)
    .bind(member.active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_clan_member(
    pool: &PgPool,
    clan_id: &str,
    player_id: &str,
) -> Result<Option<ClanMember>> {
    let row = sqlx::query_as::<_, ClanMember>(
        "SELECT * FROM clan_members WHERE clan_id = $1 AND player_id = $2"
    )
    .bind(clan_id)
    .bind(player_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ── Performance summaries ────────────────────────────────────────

pub async fn get_monthly_performance(
    pool: &PgPool,
    clan_id: &str,
    month_id: &str,
) -> Result<Option<MonthlyPerformance>> {
    let row = sqlx::query_as::<_, MonthlyPerformance>(
        "SELECT * FROM monthly_performance WHERE clan_id = $1 AND month_id = $2"
    )
    .bind(clan_id)
    .bind(month_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn upsert_monthly_performance(pool: &PgPool, row: &MonthlyPerformance) -> Result<()> {
    // `completed` is set independently and deliberately left out of the
    // update list.
    sqlx::query(
        "INSERT INTO monthly_performance (clan_id, month_id, battle_count, won_count,
         lost_count, tied_count, avg_ratio, avg_average_ratio, avg_projected_score,
         avg_margin_ratio, avg_fp_margin, avg_nonplaying_fp_ratio, avg_reserve_fp_ratio,
         completed, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         ON CONFLICT (clan_id, month_id)
         DO UPDATE SET battle_count = EXCLUDED.battle_count,
                       won_count = EXCLUDED.won_count,
                       lost_count = EXCLUDED.lost_count,
                       tied_count = EXCLUDED.tied_count,
                       avg_ratio = EXCLUDED.avg_ratio,
                       avg_average_ratio = EXCLUDED.avg_average_ratio,
                       avg_projected_score = EXCLUDED.avg_projected_score,
                       avg_margin_ratio = EXCLUDED.avg_margin_ratio,
                       avg_fp_margin = EXCLUDED.avg_fp_margin,
                       avg_nonplaying_fp_ratio = EXCLUDED.avg_nonplaying_fp_ratio,
                       avg_reserve_fp_ratio = EXCLUDED.avg_reserve_fp_ratio,
                       updated_at = EXCLUDED.updated_at"
    )
    .bind(&row.clan_id)
    .bind(&row.month_id)
    .bind(row.battle_count)
    .bind(row.won_count)
    .bind(row.lost_count)
    .bind(row.tied_count)
    .bind(row.avg_ratio)
    .bind(row.avg_average_ratio)
    .bind(row.avg_projected_score)
    .bind(row.avg_margin_ratio)
    .bind(row.avg_fp_margin)
    .bind(row.avg_nonplaying_fp_ratio)
    .bind(row.avg_reserve_fp_ratio)
    .bind(row.completed)
    .bind(row.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_monthly_performance(
    pool: &PgPool,
    clan_id: &str,
    month_id: &str,
) -> Result<bool> {
    let done = sqlx::query(
        "DELETE FROM monthly_performance WHERE clan_id = $1 AND month_id = $2"
    )
    .bind(clan_id)
    .bind(month_id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn set_monthly_completed(
    pool: &PgPool,
    clan_id: &str,
    month_id: &str,
    completed: bool,
) -> Result<bool> {
    let done = sqlx::query(
        "UPDATE monthly_performance SET completed = $3
         WHERE clan_id = $1 AND month_id = $2"
    )
    .bind(clan_id)
    .bind(month_id)
    .bind(completed)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn get_yearly_performance(
    pool: &PgPool,
    clan_id: &str,
    year_id: &str,
) -> Result<Option<YearlyPerformance>> {
    let row = sqlx::query_as::<_, YearlyPerformance>(
        "SELECT * FROM yearly_performance WHERE clan_id = $1 AND year_id = $2"
    )
    .bind(clan_id)
    .bind(year_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn upsert_yearly_performance(pool: &PgPool, row: &YearlyPerformance) -> Result<()> {
    sqlx::query(
        "INSERT INTO yearly_performance (clan_id, year_id, battle_count, won_count,
         lost_count, tied_count, avg_ratio, avg_average_ratio, avg_projected_score,
         avg_margin_ratio, avg_fp_margin, avg_nonplaying_fp_ratio, avg_reserve_fp_ratio,
         completed, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         ON CONFLICT (clan_id, year_id)
         DO UPDATE SET battle_count = EXCLUDED.battle_count,
                       won_count = EXCLUDED.won_count,
                       lost_count = EXCLUDED.lost_count,
                       tied_count = EXCLUDED.tied_count,
                       avg_ratio = EXCLUDED.avg_ratio,
                       avg_average_ratio = EXCLUDED.avg_average_ratio,
                       avg_projected_score = EXCLUDED.avg_projected_score,
                       avg_margin_ratio = EXCLUDED.avg_margin_ratio,
                       avg_fp_margin = EXCLUDED.avg_fp_margin,
                       avg_nonplaying_fp_ratio = EXCLUDED.avg_nonplaying_fp_ratio,
                       avg_reserve_fp_ratio = EXCLUDED.avg_reserve_fp_ratio,
                       updated_at = EXCLUDED.updated_at"
    )
    .bind(&row.clan_id)
    .bind(&row.year_id)
    .bind(row.battle_count)
    .bind(row.won_count)
    .bind(row.lost_count)
    .bind(row.tied_count)
    .bind(row.avg_ratio)
    .bind(row.avg_average_ratio)
    .bind(row.avg_projected_score)
    .bind(row.avg_margin_ratio)
    .bind(row.avg_fp_margin)
    .bind(row.avg_nonplaying_fp_ratio)
    .bind(row.avg_reserve_fp_ratio)
    .bind(row.completed)
    .bind(row.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_yearly_performance(
    pool: &PgPool,
    clan_id: &str,
    year_id: &str,
) -> Result<bool> {
    let done = sqlx::query(
        "DELETE FROM yearly_performance WHERE clan_id = $1 AND year_id = $2"
    )
    .bind(clan_id)
    .bind(year_id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn set_yearly_completed(
    pool: &PgPool,
    clan_id: &str,
    year_id: &str,
    completed: bool,
) -> Result<bool> {
    let done = sqlx::query(
        "UPDATE yearly_performance SET completed = $3
         WHERE clan_id = $1 AND year_id = $2"
    )
    .bind(clan_id)
    .bind(year_id)
    .bind(completed)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}
