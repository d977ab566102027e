//! Error types
use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Errors that may be returned by the FlightSurety program.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlightSuretyError {
    /// Invalid instruction
    #[error("Invalid Instruction")]
    InvalidInstruction,
    /// Ledger not initialized
    #[error("Not initialized")]
    NotInitialized,
    /// Ledger already initialized
    #[error("Already initialized")]
    AlreadyInitialized,
    /// Caller lacks the registered/funded/oracle role the operation needs
    #[error("Unauthorized")]
    Unauthorized,
    /// Funding or premium outside the accepted bounds
    #[error("Invalid amount")]
    InvalidAmount,
    /// Duplicate airline vote, flight, policy or status resolution
    #[error("Conflict")]
    Conflict,
    /// Unknown airline, flight or policy
    #[error("Not found")]
    NotFound,
    /// Policy already withdrawn
    #[error("Already paid")]
    AlreadyPaid,
    /// Policy carries no credit
    #[error("Nothing due")]
    NothingDue,
    /// Status code is not a resolved flight status
    #[error("Invalid flight status")]
    InvalidStatus,
    /// Flight code is empty or too long
    #[error("Invalid flight code")]
    InvalidFlightCode,
    /// Arithmetic overflow on an amount or counter
    #[error("Amount overflow")]
    AmountOverflow,
}

impl From<FlightSuretyError> for ProgramError {
    fn from(e: FlightSuretyError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
