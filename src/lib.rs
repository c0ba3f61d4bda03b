//! Clan battle coordination — shared battle schedule and per-clan records.
//!
//! Battles run in fixed 48-hour windows on a global 3-day cadence, timed in
//! a fixed UTC−5 "Game Time". The crate provides the time-normalization
//! layer, the idempotent schedule advancer, the battle record engine with
//! its derived metrics, and the monthly/yearly aggregation engine. Storage
//! sits behind the traits in [`db::store`]; PostgreSQL backs deployments and
//! an in-memory store backs the tests.

pub mod battles;
pub mod config;
pub mod db;
pub mod error;
pub mod gametime;
pub mod logging;
pub mod performance;
pub mod schedule;
pub mod web;
