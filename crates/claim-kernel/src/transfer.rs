//! Time-bounded ownership transfers. An owner offers a claim to a candidate;
//! the offer lives for a fixed window and the candidate accepts within it.
//!
//! Expiry is lazy: the kernel owns no timers, so an entry whose expiry is at
//! or before the caller-supplied `now` is simply treated as absent on read and
//! purged the next time the claim is written.

use chrono::{DateTime, Duration, Utc};
use contracts::{Claim, ClaimId, ClaimOwner, PlayerId};
use tracing::debug;

use crate::geometry;
use crate::repo::{
    ClaimRepository, PartitionRepository, PlayerMetadataService, StorageError, StorageResult,
};

/// How long an offer stays open.
pub const TRANSFER_REQUEST_TTL_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferTransferResult {
    Success { expires_at: DateTime<Utc> },
    ClaimNotFound,
    RequestAlreadyPending,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanAcceptResult {
    Success,
    ClaimNotFound,
    PlayerOwnsClaim,
    ClaimLimitExceeded,
    BlockLimitExceeded,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcceptTransferResult {
    Success(Claim),
    ClaimNotFound,
    PlayerOwnsClaim,
    ClaimLimitExceeded,
    BlockLimitExceeded,
    NoActiveTransferRequest,
    NameAlreadyExists,
    StorageError(StorageError),
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Ownership transfer operations over the claim and partition repositories.
pub struct TransferWorkflow<'a, S: ?Sized> {
    pub store: &'a mut S,
    pub metadata: &'a dyn PlayerMetadataService,
}

impl<'a, S> TransferWorkflow<'a, S>
where
    S: ClaimRepository + PartitionRepository + ?Sized,
{
    /// Record an offer to `candidate`, expiring after the fixed window.
    /// Distinct candidates may hold simultaneous offers on one claim.
    pub fn offer(
        &mut self,
        claim_id: ClaimId,
        candidate: PlayerId,
        now: DateTime<Utc>,
    ) -> OfferTransferResult {
        match self.try_offer(claim_id, candidate, now) {
            Ok(result) => result,
            Err(error) => OfferTransferResult::StorageError(error),
        }
    }

    fn try_offer(
        &mut self,
        claim_id: ClaimId,
        candidate: PlayerId,
        now: DateTime<Utc>,
    ) -> StorageResult<OfferTransferResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(OfferTransferResult::ClaimNotFound);
        };
        if claim
            .transfer_requests
            .get(&candidate)
            .is_some_and(|expiry| *expiry > now)
        {
            return Ok(OfferTransferResult::RequestAlreadyPending);
        }

        claim.transfer_requests.retain(|_, expiry| *expiry > now);
        let expires_at = now + Duration::seconds(TRANSFER_REQUEST_TTL_SECS);
        claim.transfer_requests.insert(candidate, expires_at);
        self.store.update_claim(&claim)?;
        debug!(claim = %claim_id, %candidate, %expires_at, "transfer offered");
        Ok(OfferTransferResult::Success { expires_at })
    }

    /// Whether `candidate` could take ownership right now, ignoring whether an
    /// offer actually exists.
    pub fn can_accept(&self, claim_id: ClaimId, candidate: PlayerId) -> CanAcceptResult {
        match self.try_can_accept(claim_id, candidate) {
            Ok(result) => result,
            Err(error) => CanAcceptResult::StorageError(error),
        }
    }

    fn try_can_accept(
        &self,
        claim_id: ClaimId,
        candidate: PlayerId,
    ) -> StorageResult<CanAcceptResult> {
        let Some(claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(CanAcceptResult::ClaimNotFound);
        };
        if claim.owner.is_player(candidate) {
            return Ok(CanAcceptResult::PlayerOwnsClaim);
        }

        let owner = ClaimOwner::Player(candidate);
        let owned = self.store.claims_by_owner(&owner)?;
        if owned.len() as u32 >= self.metadata.claim_limit(&owner) {
            return Ok(CanAcceptResult::ClaimLimitExceeded);
        }

        let mut wanted = 0;
        for existing in &owned {
            wanted += self.claim_footprint(existing.id)?;
        }
        wanted += self.claim_footprint(claim_id)?;
        if wanted > self.metadata.block_allowance(&owner) {
            return Ok(CanAcceptResult::BlockLimitExceeded);
        }

        Ok(CanAcceptResult::Success)
    }

    /// Consume an active offer and reassign ownership to `candidate`. All
    /// pending offers on the claim are cleared with the same write.
    pub fn accept(
        &mut self,
        claim_id: ClaimId,
        candidate: PlayerId,
        now: DateTime<Utc>,
    ) -> AcceptTransferResult {
        match self.try_accept(claim_id, candidate, now) {
            Ok(result) => result,
            Err(error) => AcceptTransferResult::StorageError(error),
        }
    }

    fn try_accept(
        &mut self,
        claim_id: ClaimId,
        candidate: PlayerId,
        now: DateTime<Utc>,
    ) -> StorageResult<AcceptTransferResult> {
        match self.try_can_accept(claim_id, candidate)? {
            CanAcceptResult::Success => {}
            CanAcceptResult::ClaimNotFound => return Ok(AcceptTransferResult::ClaimNotFound),
            CanAcceptResult::PlayerOwnsClaim => return Ok(AcceptTransferResult::PlayerOwnsClaim),
            CanAcceptResult::ClaimLimitExceeded => {
                return Ok(AcceptTransferResult::ClaimLimitExceeded)
            }
            CanAcceptResult::BlockLimitExceeded => {
                return Ok(AcceptTransferResult::BlockLimitExceeded)
            }
            CanAcceptResult::StorageError(error) => {
                return Ok(AcceptTransferResult::StorageError(error))
            }
        }

        // can_accept guarantees the claim exists.
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(AcceptTransferResult::ClaimNotFound);
        };
        if !claim
            .transfer_requests
            .get(&candidate)
            .is_some_and(|expiry| *expiry > now)
        {
            return Ok(AcceptTransferResult::NoActiveTransferRequest);
        }

        let owner = ClaimOwner::Player(candidate);
        if self.store.claim_by_name(&owner, &claim.name)?.is_some() {
            return Ok(AcceptTransferResult::NameAlreadyExists);
        }

        claim.owner = owner;
        claim.transfer_requests.clear();
        self.store.update_claim(&claim)?;
        debug!(claim = %claim_id, %candidate, "transfer accepted");
        Ok(AcceptTransferResult::Success(claim))
    }

    fn claim_footprint(&self, claim_id: ClaimId) -> StorageResult<u64> {
        let mut total = 0;
        for partition in self.store.partitions_by_claim(claim_id)? {
            total += geometry::footprint_area(&partition.area);
        }
        Ok(total)
    }
}
