//! Airline registry: funding, direct registration and consensus votes
use crate::{
    error::FlightSuretyError,
    state::{Airline, Ballot, Ledger, DIRECT_REGISTRATION_LIMIT, MIN_FUNDING},
};
use solana_program::msg;

impl Airline {
    /// Fails unless the airline is registered and holds the minimum funding.
    pub fn require_funded(&self) -> Result<(), FlightSuretyError> {
        if self.registered && self.is_funded() {
            return Ok(());
        }
        msg!("Airline {} is not registered and funded", self.id());
        Err(FlightSuretyError::Unauthorized)
    }

    /// Adds `amount` to the airline's funding and returns the new total.
    pub fn fund(&mut self, amount: u64) -> Result<u64, FlightSuretyError> {
        if amount < MIN_FUNDING {
            msg!("Funding of {} is below the minimum of {}", amount, MIN_FUNDING);
            return Err(FlightSuretyError::InvalidAmount);
        }
        self.funded_amount = self
            .funded_amount
            .checked_add(amount)
            .ok_or(FlightSuretyError::AmountOverflow)?;

        msg!("Airline {} funded with {}", self.id(), self.funded_amount);
        Ok(self.funded_amount)
    }
}

impl Ledger {
    /// Registers `candidate` on behalf of `sponsor`.
    ///
    /// While fewer than [`DIRECT_REGISTRATION_LIMIT`] airlines are registered the
    /// candidate is admitted at once. Past that the call casts the sponsor's
    /// `ballot`. Returns whether the candidate is registered afterwards.
    pub fn register_airline(
        &mut self,
        sponsor: &Airline,
        candidate: &mut Airline,
        ballot: &mut Ballot,
    ) -> Result<bool, FlightSuretyError> {
        sponsor.require_funded()?;

        if candidate.registered {
            msg!("Airline {} already registered", candidate.id());
            return Ok(true);
        }

        if self.number_of_airlines < DIRECT_REGISTRATION_LIMIT {
            self.admit(candidate)?;
            return Ok(true);
        }

        let (_, registered) = self.record_vote(candidate, ballot)?;
        Ok(registered)
    }

    /// Casts `voter`'s ballot for `candidate`, returning the candidate's vote count.
    pub fn cast_vote(
        &mut self,
        voter: &Airline,
        candidate: &mut Airline,
        ballot: &mut Ballot,
    ) -> Result<u32, FlightSuretyError> {
        voter.require_funded()?;

        if candidate.registered {
            msg!("Airline {} already registered", candidate.id());
            return Err(FlightSuretyError::Conflict);
        }

        let (votes, _) = self.record_vote(candidate, ballot)?;
        Ok(votes)
    }

    // Majority is checked against the registry size at the time of the vote.
    fn record_vote(
        &mut self,
        candidate: &mut Airline,
        ballot: &mut Ballot,
    ) -> Result<(u32, bool), FlightSuretyError> {
        if ballot.is_initialized {
            msg!("Duplicate vote for airline {}", candidate.id());
            return Err(FlightSuretyError::Conflict);
        }
        let votes = candidate
            .votes
            .checked_add(1)
            .ok_or(FlightSuretyError::AmountOverflow)?;
        ballot.is_initialized = true;
        candidate.votes = votes;
        msg!("Airline {} has {} vote(s)", candidate.id(), votes);

        let admitted = u64::from(votes) * 2 > u64::from(self.number_of_airlines);
        if admitted {
            self.admit(candidate)?;
        }
        Ok((votes, admitted))
    }

    fn admit(&mut self, candidate: &mut Airline) -> Result<(), FlightSuretyError> {
        let number_of_airlines = self
            .number_of_airlines
            .checked_add(1)
            .ok_or(FlightSuretyError::AmountOverflow)?;

        candidate.registered = true;
        self.number_of_airlines = number_of_airlines;

        msg!(
            "Airline {} registered, {} airline(s) in registry",
            candidate.id(),
            number_of_airlines
        );
        Ok(())
    }
}
