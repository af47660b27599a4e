// Raffle Keeper - Errors
use solana_program::{decode_error::DecodeError, program_error::ProgramError};
use thiserror::Error;

/// Errors that may be returned by the raffle engine
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Stake is below the configured minimum entry stake
    #[error("Stake is below the minimum entry stake")]
    InsufficientStake,

    /// Entries are only accepted while the raffle is open
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// A drawing was requested but the raffle is not due
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// A drawing is already in flight for this cycle
    #[error("A drawing is already in progress")]
    AlreadyDrawing,

    /// No pending randomness request matches the correlation id
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Raffle state is inconsistent; requires operator attention
    #[error("Raffle invariant violated")]
    InvariantViolation,

    /// Prize transfer to the winner could not complete
    #[error("Payout to winner failed")]
    PayoutFailed,

    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Raffle configuration is out of range
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Entrant list has reached the configured capacity
    #[error("Raffle has reached its entrant capacity")]
    RaffleFull,

    /// Arithmetic overflow on the prize pool
    #[error("Arithmetic overflow")]
    Overflow,

    /// Randomness was delivered by an account other than the configured oracle
    #[error("Signer is not the raffle oracle")]
    NotRaffleOracle,

    /// The oracle could not accept a randomness request
    #[error("Randomness oracle unavailable")]
    OracleUnavailable,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_follow_declaration_order() {
        assert_eq!(
            ProgramError::from(RaffleError::InsufficientStake),
            ProgramError::Custom(0)
        );
        assert_eq!(
            ProgramError::from(RaffleError::PayoutFailed),
            ProgramError::Custom(6)
        );
        assert_eq!(
            ProgramError::from(RaffleError::OracleUnavailable),
            ProgramError::Custom(12)
        );
        assert_eq!(
            <RaffleError as DecodeError<RaffleError>>::type_of(),
            "Raffle Error"
        );
    }
}
