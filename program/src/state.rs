//! State transition types
use crate::error::FlightSuretyError;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    hash::hashv, msg, native_token::LAMPORTS_PER_SOL, program_error::ProgramError,
    pubkey::Pubkey,
};
use std::io;

/// Minimum cumulative funding before an airline may take part in the registry
pub const MIN_FUNDING: u64 = 10 * LAMPORTS_PER_SOL;
/// Upper bound of a single passenger premium
pub const MAX_PREMIUM: u64 = LAMPORTS_PER_SOL;
/// Registry size below which a funded airline admits candidates on its own
pub const DIRECT_REGISTRATION_LIMIT: u32 = 4;
/// Payout ratio applied to a premium when the airline caused the delay
pub const PAYOUT_NUMERATOR: u64 = 3;
pub const PAYOUT_DENOMINATOR: u64 = 2;
/// Longest accepted flight code, in bytes
pub const MAX_FLIGHT_CODE_LEN: usize = 32;

pub const LEDGER_DATA_LEN: usize = 1 + 32 + 32 + 4 + 4 + 4;
pub const AIRLINE_DATA_LEN: usize = 1 + 32 + 1 + 8 + 4;
pub const BALLOT_DATA_LEN: usize = 1 + 32 + 32;
pub const FLIGHT_DATA_LEN: usize = 1 + 32 + 4 + MAX_FLIGHT_CODE_LEN + 8 + 1;
pub const POLICY_DATA_LEN: usize =
    1 + 32 + 32 + 32 + 4 + MAX_FLIGHT_CODE_LEN + 8 + 8 + 8 + 1 + 1 + 1;

pub const AIRLINE_SEED: &[u8] = b"airline";
pub const BALLOT_SEED: &[u8] = b"ballot";
pub const FLIGHT_SEED: &[u8] = b"flight";
pub const POLICY_SEED: &[u8] = b"policy";

/// Raw public key bytes, as persisted in records
pub type AccountId = [u8; 32];
/// Content hash identifying a flight
pub type FlightKey = [u8; 32];

/// Derives the key of a flight from its airline, code and departure time.
pub fn flight_key(airline: &Pubkey, code: &str, departure: i64) -> FlightKey {
    hashv(&[airline.as_ref(), code.as_bytes(), &departure.to_le_bytes()]).to_bytes()
}

pub fn airline_seeds<'a>(ledger: &'a Pubkey, airline: &'a Pubkey) -> [&'a [u8]; 3] {
    [AIRLINE_SEED, ledger.as_ref(), airline.as_ref()]
}

/// Seeds of the record proving `voter` already voted for `candidate`
pub fn ballot_seeds<'a>(
    ledger: &'a Pubkey,
    candidate: &'a Pubkey,
    voter: &'a Pubkey,
) -> [&'a [u8]; 4] {
    [BALLOT_SEED, ledger.as_ref(), candidate.as_ref(), voter.as_ref()]
}

pub fn flight_seeds<'a>(ledger: &'a Pubkey, flight: &'a FlightKey) -> [&'a [u8]; 3] {
    [FLIGHT_SEED, ledger.as_ref(), &flight[..]]
}

pub fn policy_seeds<'a>(
    ledger: &'a Pubkey,
    passenger: &'a Pubkey,
    flight: &'a FlightKey,
) -> [&'a [u8]; 4] {
    [POLICY_SEED, ledger.as_ref(), passenger.as_ref(), &flight[..]]
}

pub fn find_airline_address(program_id: &Pubkey, ledger: &Pubkey, airline: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&airline_seeds(ledger, airline), program_id).0
}

pub fn find_ballot_address(
    program_id: &Pubkey,
    ledger: &Pubkey,
    candidate: &Pubkey,
    voter: &Pubkey,
) -> Pubkey {
    Pubkey::find_program_address(&ballot_seeds(ledger, candidate, voter), program_id).0
}

pub fn find_flight_address(program_id: &Pubkey, ledger: &Pubkey, flight: &FlightKey) -> Pubkey {
    Pubkey::find_program_address(&flight_seeds(ledger, flight), program_id).0
}

pub fn find_policy_address(
    program_id: &Pubkey,
    ledger: &Pubkey,
    passenger: &Pubkey,
    flight: &FlightKey,
) -> Pubkey {
    Pubkey::find_program_address(&policy_seeds(ledger, passenger, flight), program_id).0
}

/// Fixed-size state stored in an account of its own.
pub trait Record: BorshSerialize + BorshDeserialize {
    /// Account size reserved for the record
    const LEN: usize;

    fn is_initialized(&self) -> bool;

    /// Decodes a record from account data. Trailing bytes are ignored.
    fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let mut buf = data;
        Self::deserialize(&mut buf).map_err(|_| ProgramError::InvalidAccountData)
    }

    /// Encodes the record into account data.
    fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let bytes = self
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if bytes.len() > dst.len() {
            msg!("Record needs {} bytes, account holds {}", bytes.len(), dst.len());
            return Err(ProgramError::AccountDataTooSmall);
        }
        dst[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }
}

/// Resolved outcome of a flight, as reported by the oracle.
#[repr(u8)]
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FlightStatus {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl Default for FlightStatus {
    fn default() -> Self {
        FlightStatus::Unknown
    }
}

impl FlightStatus {
    /// Status for a wire code, if the code is known
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Unknown,
            10 => Self::OnTime,
            20 => Self::LateAirline,
            30 => Self::LateWeather,
            40 => Self::LateTechnical,
            50 => Self::LateOther,
            _ => return None,
        })
    }

    /// Wire code of the status
    pub fn code(self) -> u8 {
        self as u8
    }
}

// Persisted as the wire code rather than the variant index
impl BorshSerialize for FlightStatus {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        self.code().serialize(writer)
    }
}

impl BorshDeserialize for FlightStatus {
    fn deserialize(buf: &mut &[u8]) -> io::Result<Self> {
        let code = u8::deserialize(buf)?;
        Self::from_code(code)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unknown flight status"))
    }
}

/// Registry counters and the oracle key. The ledger account also holds the
/// lamports paid in by airlines and passengers.
#[derive(BorshSerialize, BorshDeserialize, PartialEq, Clone, Copy, Debug, Default)]
pub struct Ledger {
    pub is_initialized: bool,
    pub authority: AccountId,
    /// Only key allowed to resolve flight statuses
    pub oracle: AccountId,
    pub number_of_airlines: u32,
    pub number_of_flights: u32,
    pub number_of_insured_passengers: u32,
}

impl Record for Ledger {
    const LEN: usize = LEDGER_DATA_LEN;

    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Ledger {
    /// Sets up an empty ledger and returns the authority's record, the
    /// first registered (and still unfunded) airline.
    pub fn initialize(
        &mut self,
        authority: &Pubkey,
        oracle: &Pubkey,
    ) -> Result<Airline, FlightSuretyError> {
        if self.is_initialized {
            return Err(FlightSuretyError::AlreadyInitialized);
        }
        self.is_initialized = true;
        self.authority = authority.to_bytes();
        self.oracle = oracle.to_bytes();
        self.number_of_airlines = 1;
        Ok(Airline {
            registered: true,
            ..Airline::new(authority)
        })
    }
}

#[derive(BorshSerialize, BorshDeserialize, PartialEq, Clone, Copy, Debug, Default)]
pub struct Airline {
    pub is_initialized: bool,
    pub id: AccountId,
    pub registered: bool,
    pub funded_amount: u64,
    /// Votes collected while a candidate
    pub votes: u32,
}

impl Record for Airline {
    const LEN: usize = AIRLINE_DATA_LEN;

    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Airline {
    pub fn new(id: &Pubkey) -> Self {
        Self {
            is_initialized: true,
            id: id.to_bytes(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Pubkey {
        Pubkey::new_from_array(self.id)
    }

    /// Whether the airline has paid in at least the minimum funding
    pub fn is_funded(&self) -> bool {
        self.funded_amount >= MIN_FUNDING
    }
}

/// A vote of one airline for one candidate. Existence alone matters.
#[derive(BorshSerialize, BorshDeserialize, PartialEq, Clone, Copy, Debug, Default)]
pub struct Ballot {
    pub is_initialized: bool,
    pub candidate: AccountId,
    pub voter: AccountId,
}

impl Record for Ballot {
    const LEN: usize = BALLOT_DATA_LEN;

    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Ballot {
    /// A ballot not cast yet
    pub fn new(candidate: &Pubkey, voter: &Pubkey) -> Self {
        Self {
            is_initialized: false,
            candidate: candidate.to_bytes(),
            voter: voter.to_bytes(),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, PartialEq, Clone, Debug, Default)]
pub struct Flight {
    pub is_initialized: bool,
    pub airline: AccountId,
    pub code: String,
    pub departure: i64,
    pub status: FlightStatus,
}

impl Record for Flight {
    const LEN: usize = FLIGHT_DATA_LEN;

    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Flight {
    pub fn airline(&self) -> Pubkey {
        Pubkey::new_from_array(self.airline)
    }

    pub fn key(&self) -> FlightKey {
        flight_key(&self.airline(), &self.code, self.departure)
    }
}

#[derive(BorshSerialize, BorshDeserialize, PartialEq, Clone, Debug, Default)]
pub struct InsurancePolicy {
    pub is_initialized: bool,
    pub passenger: AccountId,
    pub flight: FlightKey,
    pub airline: AccountId,
    pub code: String,
    pub departure: i64,
    pub premium: u64,
    /// Amount the passenger may currently withdraw
    pub credited_amount: u64,
    /// The delay payout has already been applied to `credited_amount`
    pub credit_applied: bool,
    pub insured: bool,
    pub paid: bool,
}

impl Record for InsurancePolicy {
    const LEN: usize = POLICY_DATA_LEN;

    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}
