// Raffle Keeper - Upkeep eligibility
use solana_program::{clock::UnixTimestamp, msg};

use crate::state::RaffleCycle;

/// Individual conditions behind `is_draw_due`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub is_open: bool,
    pub interval_elapsed: bool,
    pub has_entrants: bool,
    pub has_pool: bool,
}

impl UpkeepCheck {
    pub fn upkeep_needed(&self) -> bool {
        self.is_open && self.interval_elapsed && self.has_entrants && self.has_pool
    }

    pub fn log(&self) {
        msg!(
            "Upkeep: open={}, interval_elapsed={}, has_entrants={}, has_pool={}",
            self.is_open,
            self.interval_elapsed,
            self.has_entrants,
            self.has_pool
        );
    }
}

/// Evaluate each drawing precondition at `now`. Has no side effects.
pub fn check_upkeep(cycle: &RaffleCycle, now: UnixTimestamp) -> UpkeepCheck {
    let interval = i64::try_from(cycle.config.draw_interval_seconds).unwrap_or(i64::MAX);
    let elapsed = now.saturating_sub(cycle.last_draw_timestamp);

    UpkeepCheck {
        is_open: cycle.is_open(),
        interval_elapsed: elapsed >= interval,
        has_entrants: !cycle.entrants.is_empty(),
        has_pool: cycle.pool_amount > 0,
    }
}

/// Whether a drawing may be triggered at `now`.
///
/// Used both by external pollers and as the gate in `request_drawing`.
pub fn is_draw_due(cycle: &RaffleCycle, now: UnixTimestamp) -> bool {
    check_upkeep(cycle, now).upkeep_needed()
}
