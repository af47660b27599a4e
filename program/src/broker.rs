// Raffle Keeper - Randomness request broker
use solana_program::{clock::UnixTimestamp, msg};

use crate::{
    eligibility::check_upkeep,
    error::RaffleError,
    events::RaffleEvent,
    state::{CorrelationId, PendingRandomnessRequest, RaffleCycle, RaffleState},
};

/// Request side of an external randomness oracle.
///
/// The oracle answers later, out of band, by delivering a random value
/// against the returned correlation id.
pub trait RandomnessOracle {
    fn request_randomness(&mut self) -> Result<CorrelationId, RaffleError>;
}

/// Move an open, due cycle into `Drawing` and issue a randomness request.
///
/// The oracle is only called once every guard has passed, and the cycle is
/// only touched once the oracle has answered.
pub fn request_drawing<O: RandomnessOracle + ?Sized>(
    cycle: &mut RaffleCycle,
    oracle: &mut O,
    now: UnixTimestamp,
) -> Result<RaffleEvent, RaffleError> {
    if let Some(pending) = cycle.pending_request() {
        msg!(
            "Drawing already requested: correlation_id={}",
            pending.correlation_id
        );
        return Err(RaffleError::AlreadyDrawing);
    }

    let check = check_upkeep(cycle, now);
    if !check.upkeep_needed() {
        msg!(
            "Upkeep not needed: pool={}, entrants={}",
            cycle.pool_amount,
            cycle.entrants.len()
        );
        check.log();
        return Err(RaffleError::UpkeepNotNeeded);
    }

    let correlation_id = oracle.request_randomness()?;

    cycle.state = RaffleState::Drawing {
        request: PendingRandomnessRequest {
            correlation_id,
            issued_at: now,
        },
    };

    Ok(RaffleEvent::DrawingRequested { correlation_id })
}
