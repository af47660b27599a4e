// Raffle Keeper - Instructions
use arrayref::{array_ref, array_refs};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    error::RaffleError,
    state::{CorrelationId, RaffleConfig},
    utils::find_raffle_address,
};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the raffle PDA and open its first cycle
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority, pays for the raffle account
    /// 1. `[writable]` The raffle account (PDA of `[b"raffle", authority]`)
    /// 2. `[]` The system program
    InitializeRaffle { config: RaffleConfig },

    /// Enter the current cycle with `stake` lamports
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The entrant, pays the stake
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle { stake: u64 },

    /// Report whether a drawing is due. Writes a one-byte flag as return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep,

    /// Request randomness for a due raffle. Anyone may call this.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The caller
    /// 1. `[writable]` The raffle account
    RequestDrawing,

    /// Oracle callback: settle the cycle with the delivered random value
    ///
    /// Accounts expected:
    /// 0. `[signer]` The oracle authority configured for the raffle
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winner, `entrants[random_value % entrants.len()]`
    DeliverRandomness {
        correlation_id: CorrelationId,
        random_value: u64,
    },
}

impl RaffleInstruction {
    const INITIALIZE_LEN: usize = 8 + 8 + 4 + 2 + 32;
    const DELIVER_LEN: usize = CorrelationId::LEN + 8;

    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                if rest.len() < Self::INITIALIZE_LEN {
                    return Err(RaffleError::InvalidInstructionData.into());
                }
                let src = array_ref![rest, 0, RaffleInstruction::INITIALIZE_LEN];
                let (min_entry_stake, draw_interval_seconds, max_entrants, request_confirmations, oracle) =
                    array_refs![src, 8, 8, 4, 2, 32];
                Self::InitializeRaffle {
                    config: RaffleConfig {
                        min_entry_stake: u64::from_le_bytes(*min_entry_stake),
                        draw_interval_seconds: u64::from_le_bytes(*draw_interval_seconds),
                        max_entrants: u32::from_le_bytes(*max_entrants),
                        oracle: Pubkey::new_from_array(*oracle),
                        request_confirmations: u16::from_le_bytes(*request_confirmations),
                    },
                }
            }
            1 => {
                let (stake, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { stake }
            }
            2 => Self::CheckUpkeep,
            3 => Self::RequestDrawing,
            4 => {
                if rest.len() < Self::DELIVER_LEN {
                    return Err(RaffleError::InvalidInstructionData.into());
                }
                let src = array_ref![rest, 0, RaffleInstruction::DELIVER_LEN];
                let (correlation_id, random_value) = array_refs![src, 32, 8];
                Self::DeliverRandomness {
                    correlation_id: CorrelationId(*correlation_id),
                    random_value: u64::from_le_bytes(*random_value),
                }
            }
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + Self::INITIALIZE_LEN);
        match self {
            Self::InitializeRaffle { config } => {
                buf.push(0);
                buf.extend_from_slice(&config.min_entry_stake.to_le_bytes());
                buf.extend_from_slice(&config.draw_interval_seconds.to_le_bytes());
                buf.extend_from_slice(&config.max_entrants.to_le_bytes());
                buf.extend_from_slice(&config.request_confirmations.to_le_bytes());
                buf.extend_from_slice(config.oracle.as_ref());
            }
            Self::EnterRaffle { stake } => {
                buf.push(1);
                buf.extend_from_slice(&stake.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::RequestDrawing => buf.push(3),
            Self::DeliverRandomness {
                correlation_id,
                random_value,
            } => {
                buf.push(4);
                buf.extend_from_slice(&correlation_id.0);
                buf.extend_from_slice(&random_value.to_le_bytes());
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (value, rest) = input.split_at(8);
        Ok((u64::from_le_bytes(*array_ref![value, 0, 8]), rest))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    config: RaffleConfig,
) -> Instruction {
    let (raffle, _) = find_raffle_address(program_id, authority);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::InitializeRaffle { config }.pack(),
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    entrant: &Pubkey,
    raffle: &Pubkey,
    stake: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*entrant, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { stake }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*raffle, false)],
        data: RaffleInstruction::CheckUpkeep.pack(),
    }
}

/// Create request_drawing instruction
pub fn request_drawing(program_id: &Pubkey, caller: &Pubkey, raffle: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*raffle, false),
        ],
        data: RaffleInstruction::RequestDrawing.pack(),
    }
}

/// Create deliver_randomness instruction
pub fn deliver_randomness(
    program_id: &Pubkey,
    oracle: &Pubkey,
    raffle: &Pubkey,
    winner: &Pubkey,
    correlation_id: CorrelationId,
    random_value: u64,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*oracle, true),
            AccountMeta::new(*raffle, false),
            AccountMeta::new(*winner, false),
        ],
        data: RaffleInstruction::DeliverRandomness {
            correlation_id,
            random_value,
        }
        .pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_carries_full_config() {
        let mut config = RaffleConfig::new(30, 30, Pubkey::new_unique());
        config.max_entrants = 64;
        config.request_confirmations = 5;
        let packed = RaffleInstruction::InitializeRaffle { config }.pack();

        assert_eq!(packed.len(), 1 + 54);
        assert_eq!(
            RaffleInstruction::unpack(&packed).unwrap(),
            RaffleInstruction::InitializeRaffle { config }
        );
    }

    #[test]
    fn deliver_layout_is_id_then_value() {
        let packed = RaffleInstruction::DeliverRandomness {
            correlation_id: CorrelationId([5; 32]),
            random_value: 42,
        }
        .pack();

        assert_eq!(packed[0], 4);
        assert_eq!(&packed[1..33], &[5u8; 32]);
        assert_eq!(&packed[33..], &42u64.to_le_bytes());
    }

    #[test]
    fn truncated_or_unknown_data_is_rejected() {
        let invalid: ProgramError = RaffleError::InvalidInstructionData.into();
        assert_eq!(RaffleInstruction::unpack(&[]), Err(invalid.clone()));
        assert_eq!(RaffleInstruction::unpack(&[1, 0, 0]), Err(invalid.clone()));
        assert_eq!(RaffleInstruction::unpack(&[4; 20]), Err(invalid.clone()));
        assert_eq!(RaffleInstruction::unpack(&[0; 10]), Err(invalid.clone()));
        assert_eq!(RaffleInstruction::unpack(&[9]), Err(invalid));
    }
}
