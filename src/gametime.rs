//! Game-Time arithmetic — the single source of truth for battle timing.
//!
//! All scheduling semantics run in "Game Time", a fixed UTC−5 zone with no
//! DST. Storage keeps UTC instants; calendar decisions (battle ids, window
//! boundaries, cadence advancement) are made on the Game-Time reading of the
//! instant. The fixed offset makes the conversions exact inverses.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Seconds west of UTC for Game Time.
const GAME_TIME_OFFSET_SECS: i32 = 5 * 3600;

/// The fixed Game-Time offset (UTC−5, never DST).
pub fn game_time_offset() -> FixedOffset {
    FixedOffset::west_opt(GAME_TIME_OFFSET_SECS).expect("offset is in range")
}

/// Convert a UTC instant to its Game-Time reading.
pub fn to_game_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&game_time_offset())
}

/// Convert a Game-Time reading back to UTC. Exact inverse of [`to_game_time`].
pub fn to_utc(instant: DateTime<FixedOffset>) -> DateTime<Utc> {
    instant.with_timezone(&Utc)
}

/// Canonical 8-digit `YYYYMMDD` battle id for the Game-Time calendar date of
/// `instant`.
pub fn battle_id_for(instant: DateTime<Utc>) -> String {
    battle_id_for_date(to_game_time(instant).date_naive())
}

/// Battle id for an already-resolved Game-Time calendar date.
pub fn battle_id_for_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// 6-digit `YYYYMM` month id — textual prefix of the battle id.
pub fn month_id_for(instant: DateTime<Utc>) -> String {
    to_game_time(instant).date_naive().format("%Y%m").to_string()
}

/// 4-digit `YYYY` year id — textual prefix of the battle id.
pub fn year_id_for(instant: DateTime<Utc>) -> String {
    to_game_time(instant).date_naive().format("%Y").to_string()
}

/// Month prefix of an 8-digit battle id.
pub fn month_prefix(battle_id: &str) -> &str {
    &battle_id[..6]
}

/// Year prefix of an 8-digit battle id.
pub fn year_prefix(battle_id: &str) -> &str {
    &battle_id[..4]
}

/// The UTC instant of Game-Time midnight on `date`.
pub fn game_midnight(date: NaiveDate) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    to_utc(
        game_time_offset()
            .from_local_datetime(&local)
            .single()
            .expect("fixed offset has no ambiguous local times"),
    )
}

/// The global battle window for a Game-Time start date, as UTC instants.
///
/// Starts at Game-Time midnight on `date` and ends at 23:59:59.999 Game Time
/// one calendar day later. Calendar-day addition, not a fixed 24h offset, so
/// the end lands correctly across month and year boundaries.
pub fn battle_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = game_midnight(date);
    let end_date = date
        .checked_add_days(Days::new(1))
        .expect("date stays in range");
    let end_local = end_date.and_time(
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("valid time"),
    );
    let end = to_utc(
        game_time_offset()
            .from_local_datetime(&end_local)
            .single()
            .expect("fixed offset has no ambiguous local times"),
    );
    (start, end)
}

/// Advance an instant by `days` Game-Time calendar days, landing on Game-Time
/// midnight of the resulting date. Used for the scheduler's fixed cadence.
pub fn advance_days(instant: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    let date = to_game_time(instant)
        .date_naive()
        .checked_add_days(Days::new(days))
        .expect("date stays in range");
    game_midnight(date)
}
