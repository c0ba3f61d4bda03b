//! Database row types for all tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One global battle window, shared by every clan. Never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MasterBattle {
    pub battle_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// `None` when the scheduler created the window automatically.
    pub created_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Singleton scheduler state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleSetting {
    /// Instant whose Game-Time reading is midnight of the next battle date.
    pub next_battle_start: DateTime<Utc>,
    pub scheduler_enabled: bool,
}

/// One clan's record of one battle, raw inputs plus calculated fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClanBattle {
    pub clan_id: String,
    pub battle_id: String,
    pub opponent_name: Option<String>,
    pub score: i64,
    pub opponent_score: i64,
    pub baseline_fp: i64,
    pub opponent_fp: i64,
    pub total_fp: i64,
    pub nonplaying_fp: i64,
    pub reserve_fp: i64,
    /// sign(score − opponent_score): 1 won, 0 tied, −1 lost.
    pub result: i32,
    pub ratio: f64,
    pub average_ratio: f64,
    pub projected_score: f64,
    pub margin_ratio: f64,
    pub fp_margin: f64,
    pub nonplaying_fp_ratio: f64,
    pub reserve_fp_ratio: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-player result for a playing participant.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlayerStat {
    pub clan_id: String,
    pub battle_id: String,
    pub player_id: String,
    pub player_name: Option<String>,
    pub score: i64,
    pub fp: i64,
    /// Rank as supplied by the input (in-game leaderboard position).
    pub rank: i32,
    pub ratio: f64,
    /// Rank by descending ratio, ties kept in input order.
    pub ratio_rank: i32,
}

/// Roster member who did not play; reserves are excluded from the FP pool.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NonplayerStat {
    pub clan_id: String,
    pub battle_id: String,
    pub player_id: String,
    pub player_name: Option<String>,
    pub fp: i64,
    pub reserve: bool,
}

/// Roster row. Owned by an external roster surface; action codes only flip
/// `active`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClanMember {
    pub clan_id: String,
    pub player_id: String,
    pub player_name: Option<String>,
    pub active: bool,
}

/// Monthly per-clan summary — a pure projection of the month's battle set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyPerformance {
    pub clan_id: String,
    pub month_id: String,
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
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Yearly per-clan summary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct YearlyPerformance {
    pub clan_id: String,
    pub year_id: String,
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
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// A clan battle with its stat rows, as returned by single-battle reads.
#[derive(Debug, Clone, Serialize)]
pub struct ClanBattleDetail {
    pub battle: ClanBattle,
    pub players: Vec<PlayerStat>,
    pub nonplayers: Vec<NonplayerStat>,
}
