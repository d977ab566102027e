//! Insurance ledger: passenger policies and their credit
use crate::{
    error::FlightSuretyError,
    state::{
        Flight, FlightStatus, InsurancePolicy, Ledger, MAX_PREMIUM, PAYOUT_DENOMINATOR,
        PAYOUT_NUMERATOR,
    },
};
use solana_program::{msg, pubkey::Pubkey};

/// Amount credited for a premium when the airline delayed the flight.
pub fn delayed_payout(premium: u64) -> Result<u64, FlightSuretyError> {
    premium
        .checked_mul(PAYOUT_NUMERATOR)
        .map(|amount| amount / PAYOUT_DENOMINATOR)
        .ok_or(FlightSuretyError::AmountOverflow)
}

/// Returns the passenger's policy on the flight with `code` departing at
/// `departure`, out of the record stored for them.
pub fn show_policy(
    record: Option<InsurancePolicy>,
    passenger: &Pubkey,
    code: &str,
    departure: i64,
) -> Result<InsurancePolicy, FlightSuretyError> {
    record
        .filter(|policy| {
            policy.passenger == passenger.to_bytes()
                && policy.code == code
                && policy.departure == departure
        })
        .ok_or(FlightSuretyError::NotFound)
}

impl Ledger {
    /// Insures `passenger` on a registered flight that has not been resolved yet.
    ///
    /// `existing` is the passenger's policy already stored for the flight, if any.
    pub fn buy_insurance(
        &mut self,
        passenger: &Pubkey,
        flight: Option<&Flight>,
        existing: Option<&InsurancePolicy>,
        premium: u64,
    ) -> Result<InsurancePolicy, FlightSuretyError> {
        let flight = flight.ok_or(FlightSuretyError::NotFound)?;
        if flight.status != FlightStatus::Unknown {
            msg!("Flight {} at {} is already resolved", flight.code, flight.departure);
            return Err(FlightSuretyError::Conflict);
        }
        if premium == 0 || premium > MAX_PREMIUM {
            msg!("Premium {} outside of (0, {}]", premium, MAX_PREMIUM);
            return Err(FlightSuretyError::InvalidAmount);
        }
        if existing.is_some() {
            msg!("Passenger {} already insured on {}", passenger, flight.code);
            return Err(FlightSuretyError::Conflict);
        }
        self.number_of_insured_passengers = self
            .number_of_insured_passengers
            .checked_add(1)
            .ok_or(FlightSuretyError::AmountOverflow)?;

        msg!("Passenger {} insured on {} for {}", passenger, flight.code, premium);
        Ok(InsurancePolicy {
            is_initialized: true,
            passenger: passenger.to_bytes(),
            flight: flight.key(),
            airline: flight.airline,
            code: flight.code.clone(),
            departure: flight.departure,
            premium,
            credited_amount: premium,
            credit_applied: false,
            insured: true,
            paid: false,
        })
    }
}

impl InsurancePolicy {
    /// Brings the credit up to date with the flight's status and returns it.
    ///
    /// Only a LATE_AIRLINE outcome changes the credit, and only once.
    pub fn refresh_credit(&mut self, flight: &Flight) -> Result<u64, FlightSuretyError> {
        if flight.key() != self.flight {
            return Err(FlightSuretyError::NotFound);
        }
        if flight.status == FlightStatus::LateAirline && !self.credit_applied && !self.paid {
            self.credited_amount = delayed_payout(self.premium)?;
            self.credit_applied = true;
            msg!(
                "Passenger {} credited with {} on {}",
                Pubkey::new_from_array(self.passenger),
                self.credited_amount,
                self.code
            );
        }
        Ok(self.credited_amount)
    }
}
