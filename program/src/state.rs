// Raffle Keeper - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    clock::UnixTimestamp,
    hash::Hash,
    msg,
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
};
use std::fmt;

use crate::error::RaffleError;

/// Upper bound on `RaffleConfig::max_entrants`.
/// Keeps `RaffleAccount::space` under the 10 KiB a CPI may allocate.
pub const MAX_ENTRANTS: u32 = 300;

/// Confirmations requested from the oracle unless configured otherwise
pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;

/// Oracle-issued token linking a randomness request to its delivery
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub [u8; 32]);

impl CorrelationId {
    pub const LEN: usize = 32;
}

impl From<Hash> for CorrelationId {
    fn from(hash: Hash) -> Self {
        Self(hash.to_bytes())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Hash::new_from_array(self.0), f)
    }
}

/// Immutable configuration supplied when the raffle is created
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum stake per entry in lamports
    pub min_entry_stake: u64,
    /// Minimum elapsed time between drawings
    pub draw_interval_seconds: u64,
    /// Capacity of the entrant list for one cycle
    pub max_entrants: u32,
    /// Oracle authority allowed to deliver randomness
    pub oracle: Pubkey,
    /// Confirmations the oracle should wait before answering
    pub request_confirmations: u16,
}

impl RaffleConfig {
    pub const LEN: usize = 8 + 8 + 4 + 32 + 2;

    pub fn new(min_entry_stake: u64, draw_interval_seconds: u64, oracle: Pubkey) -> Self {
        Self {
            min_entry_stake,
            draw_interval_seconds,
            max_entrants: MAX_ENTRANTS,
            oracle,
            request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
        }
    }

    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.max_entrants == 0 || self.max_entrants > MAX_ENTRANTS {
            msg!(
                "max_entrants must be between 1 and {}, got {}",
                MAX_ENTRANTS,
                self.max_entrants
            );
            return Err(RaffleError::InvalidConfig);
        }
        if i64::try_from(self.draw_interval_seconds).is_err() {
            msg!("draw_interval_seconds out of range: {}", self.draw_interval_seconds);
            return Err(RaffleError::InvalidConfig);
        }
        Ok(())
    }
}

/// Randomness request awaiting delivery
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRandomnessRequest {
    pub correlation_id: CorrelationId,
    pub issued_at: UnixTimestamp,
}

impl PendingRandomnessRequest {
    pub const LEN: usize = CorrelationId::LEN + 8;
}

/// Lifecycle of a cycle. The pending request only exists while drawing.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries and draw triggers
    Open,
    /// Waiting for the oracle to deliver randomness
    Drawing { request: PendingRandomnessRequest },
}

impl RaffleState {
    pub const LEN: usize = 1 + PendingRandomnessRequest::LEN;

    pub fn is_open(&self) -> bool {
        matches!(self, RaffleState::Open)
    }

    pub fn pending_request(&self) -> Option<&PendingRandomnessRequest> {
        match self {
            RaffleState::Open => None,
            RaffleState::Drawing { request } => Some(request),
        }
    }
}

/// The current raffle cycle
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleCycle {
    pub config: RaffleConfig,
    pub state: RaffleState,
    /// Entrants in insertion order; an entrant appears once per entry
    pub entrants: Vec<Pubkey>,
    /// Sum of stakes received since the last settlement
    pub pool_amount: u64,
    /// Previous settlement time, or creation time for the first cycle
    pub last_draw_timestamp: UnixTimestamp,
    /// Winner of the previous cycle
    pub recent_winner: Option<Pubkey>,
}

impl RaffleCycle {
    pub fn new(config: RaffleConfig, now: UnixTimestamp) -> Self {
        Self {
            config,
            state: RaffleState::Open,
            entrants: Vec::new(),
            pool_amount: 0,
            last_draw_timestamp: now,
            recent_winner: None,
        }
    }

    /// Serialized size of a cycle holding `max_entrants` entrants
    pub const fn space(max_entrants: u32) -> usize {
        RaffleConfig::LEN
            + RaffleState::LEN
            + 4 // entrants length prefix
            + 32 * max_entrants as usize
            + 8 // pool_amount
            + 8 // last_draw_timestamp
            + 1 + 32 // recent_winner
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn pending_request(&self) -> Option<&PendingRandomnessRequest> {
        self.state.pending_request()
    }

    pub fn entrant(&self, index: usize) -> Option<&Pubkey> {
        self.entrants.get(index)
    }

    pub fn entrant_count(&self) -> usize {
        self.entrants.len()
    }

    pub fn min_entry_stake(&self) -> u64 {
        self.config.min_entry_stake
    }

    pub fn draw_interval_seconds(&self) -> u64 {
        self.config.draw_interval_seconds
    }
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleAccount {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Creator of the raffle, part of the PDA seeds
    pub authority: Pubkey,
    /// PDA bump seed
    pub bump: u8,
    /// Number of randomness requests issued so far
    pub request_count: u64,
    /// The current cycle
    pub cycle: RaffleCycle,
}

impl IsInitialized for RaffleAccount {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl RaffleAccount {
    /// Account size needed for the given entrant capacity
    pub const fn space(max_entrants: u32) -> usize {
        1 + 32 + 1 + 8 + RaffleCycle::space(max_entrants)
    }

    /// Read an initialized raffle owned by `program_id`
    pub fn load(info: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let account = Self::deserialize(&mut &info.data.borrow()[..])?;
        if !account.is_initialized {
            msg!("Raffle account is not initialized");
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(account)
    }

    pub fn save(&self, info: &AccountInfo) -> Result<(), ProgramError> {
        self.serialize(&mut *info.data.borrow_mut())?;
        Ok(())
    }
}
