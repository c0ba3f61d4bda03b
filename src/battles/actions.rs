//! Action codes — post-battle roster dispositions.
//!
//! A battle submission can tag any participant with an action code; the
//! resulting roster mutation is applied inside the same write unit as the
//! battle record. Dispatch is a flat code table.

use crate::db::store::RosterMutation;
use crate::error::{CoordinatorError, Result};

/// Disposition for one roster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterAction {
    /// No roster change.
    Keep,
    /// Deactivate the member.
    Kick,
}

const ACTION_TABLE: &[(&str, RosterAction)] = &[
    ("keep", RosterAction::Keep),
    ("kick", RosterAction::Kick),
];

/// Look up an action code. Unknown codes are a validation error so a typo
/// never silently drops a roster mutation.
pub fn resolve(code: &str) -> Result<RosterAction> {
    ACTION_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(code))
        .map(|(_, action)| *action)
        .ok_or_else(|| CoordinatorError::validation(format!("unknown action code: {code}")))
}

/// The store mutation for an action, if it has one.
pub fn mutation_for(clan_id: &str, player_id: &str, action: RosterAction) -> Option<RosterMutation> {
    match action {
        RosterAction::Keep => None,
        RosterAction::Kick => Some(RosterMutation::Deactivate {
            clan_id: clan_id.to_string(),
            player_id: player_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_case_insensitively() {
        assert_eq!(resolve("kick").unwrap(), RosterAction::Kick);
        assert_eq!(resolve("KICK").unwrap(), RosterAction::Kick);
        assert_eq!(resolve("keep").unwrap(), RosterAction::Keep);
    }

    #[test]
    fn unknown_codes_fail_validation() {
        assert!(resolve("banish").is_err());
    }

    #[test]
    fn only_kick_mutates_the_roster() {
        assert_eq!(mutation_for("c1", "p1", RosterAction::Keep), None);
        assert_eq!(
            mutation_for("c1", "p1", RosterAction::Kick),
            Some(RosterMutation::Deactivate {
                clan_id: "c1".into(),
                player_id: "p1".into(),
            })
        );
    }
}
