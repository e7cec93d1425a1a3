//! The anchor break countdown. Breaking a claim's anchor block repeatedly is
//! the only path to claim deletion; each break resets the countdown to the
//! configured initial value and then decrements it, so destruction requires
//! the full sequence of breaks inside one reset window. Hosts re-arm the
//! countdown with [`AnchorLifecycle::reset_break_count`] when their break
//! timer lapses.
//!
//! Break events for one claim must be serialized by the caller.

use contracts::{Claim, ClaimId, ClaimsConfig, Position3D, WorldId};
use tracing::debug;

use crate::repo::{
    ClaimFlagRepository, ClaimPermissionRepository, ClaimRepository, PartitionRepository,
    PlayerAccessRepository, StorageError, StorageResult,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Where a claim stands in the break countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    /// No breaks outstanding.
    Intact,
    /// Mid-countdown: `remaining` further breaks destroy the claim.
    Breaking { remaining: u32 },
    /// Terminal; observed only as the report of the final break.
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleBreakResult {
    /// No claim is anchored at the position; nothing happened.
    NoClaim,
    Breaking { claim_id: ClaimId, remaining: u32 },
    Destroyed { claim_id: ClaimId },
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetBreakCountResult {
    Success,
    ClaimNotFound,
    StorageError(StorageError),
}

/// Classify a claim's position in the countdown.
pub fn anchor_state(claim: &Claim, config: &ClaimsConfig) -> AnchorState {
    if claim.break_count >= config.initial_break_count {
        AnchorState::Intact
    } else if claim.break_count > 0 {
        AnchorState::Breaking {
            remaining: claim.break_count,
        }
    } else {
        AnchorState::Destroyed
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Anchor break handling and the destruction cascade.
pub struct AnchorLifecycle<'a, S: ?Sized> {
    pub store: &'a mut S,
    pub config: &'a ClaimsConfig,
}

impl<'a, S> AnchorLifecycle<'a, S>
where
    S: ClaimRepository
        + PartitionRepository
        + ClaimFlagRepository
        + ClaimPermissionRepository
        + PlayerAccessRepository
        + ?Sized,
{
    /// React to a block break at `position`. A break against a claim anchor
    /// re-arms the countdown to the configured initial value and consumes one
    /// step of it; once the countdown falls past one the claim is destroyed
    /// with everything attached to it.
    pub fn handle_break(&mut self, world: WorldId, position: Position3D) -> HandleBreakResult {
        match self.try_handle_break(world, position) {
            Ok(result) => result,
            Err(error) => HandleBreakResult::StorageError(error),
        }
    }

    fn try_handle_break(
        &mut self,
        world: WorldId,
        position: Position3D,
    ) -> StorageResult<HandleBreakResult> {
        let Some(mut claim) = self.store.claim_by_anchor(world, position)? else {
            return Ok(HandleBreakResult::NoClaim);
        };

        claim.break_count = self.config.initial_break_count.saturating_sub(1);
        if claim.break_count > 1 {
            self.store.update_claim(&claim)?;
            debug!(claim = %claim.id, remaining = claim.break_count, "anchor breaking");
            return Ok(HandleBreakResult::Breaking {
                claim_id: claim.id,
                remaining: claim.break_count,
            });
        }

        self.destroy(claim.id)?;
        Ok(HandleBreakResult::Destroyed { claim_id: claim.id })
    }

    /// Cascade delete: access entries, claim-wide grants, flags, partitions,
    /// then the claim itself.
    fn destroy(&mut self, claim_id: ClaimId) -> StorageResult<()> {
        self.store.remove_accesses_by_claim(claim_id)?;
        self.store.remove_claim_permissions_by_claim(claim_id)?;
        self.store.remove_flags_by_claim(claim_id)?;
        self.store.remove_partitions_by_claim(claim_id)?;
        self.store.remove_claim(claim_id)?;
        debug!(claim = %claim_id, "claim destroyed");
        Ok(())
    }

    /// Re-arm the countdown to the configured initial value. Host timers call
    /// this when the break window lapses without the claim being destroyed.
    pub fn reset_break_count(&mut self, claim_id: ClaimId) -> ResetBreakCountResult {
        match self.try_reset_break_count(claim_id) {
            Ok(result) => result,
            Err(error) => ResetBreakCountResult::StorageError(error),
        }
    }

    fn try_reset_break_count(&mut self, claim_id: ClaimId) -> StorageResult<ResetBreakCountResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(ResetBreakCountResult::ClaimNotFound);
        };
        claim.break_count = self.config.initial_break_count;
        self.store.update_claim(&claim)?;
        Ok(ResetBreakCountResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::repo::PlayerStateRepository;
    use chrono::Utc;
    use contracts::{
        AccessLevel, Area, ClaimOwner, ClaimPermission, Flag, Partition, Position2D,
    };
    use uuid::Uuid;

    fn seed_claim(store: &mut MemoryStore, initial_break_count: u32) -> Claim {
        let claim = Claim::new(
            Uuid::new_v4(),
            ClaimOwner::Player(Uuid::new_v4()),
            "Home",
            Position3D::new(4, 64, 4),
            Utc::now(),
            initial_break_count,
        );
        store.add_claim(&claim).unwrap();
        store
            .add_partition(&Partition::new(
                claim.id,
                Area::new(Position2D::new(0, 0), Position2D::new(8, 8)),
            ))
            .unwrap();
        claim
    }

    #[test]
    fn state_classification_tracks_the_countdown() {
        let config = ClaimsConfig::default();
        let mut claim = Claim::new(
            Uuid::new_v4(),
            ClaimOwner::Player(Uuid::new_v4()),
            "Home",
            Position3D::new(0, 64, 0),
            Utc::now(),
            config.initial_break_count,
        );
        assert_eq!(anchor_state(&claim, &config), AnchorState::Intact);

        claim.break_count = 2;
        assert_eq!(
            anchor_state(&claim, &config),
            AnchorState::Breaking { remaining: 2 }
        );

        claim.break_count = 0;
        assert_eq!(anchor_state(&claim, &config), AnchorState::Destroyed);
    }

    #[test]
    fn breaking_somewhere_else_is_a_no_op() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, 3);
        let config = ClaimsConfig::default();
        let mut lifecycle = AnchorLifecycle {
            store: &mut store,
            config: &config,
        };

        assert_eq!(
            lifecycle.handle_break(claim.world_id, Position3D::new(4, 63, 4)),
            HandleBreakResult::NoClaim
        );
        assert!(lifecycle.store.claim_by_id(claim.id).unwrap().is_some());
    }

    #[test]
    fn each_break_rearms_before_decrementing() {
        // With the default countdown of three, every break lands on
        // remaining = 2 and the claim survives indefinitely.
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, 3);
        let config = ClaimsConfig::default();
        let mut lifecycle = AnchorLifecycle {
            store: &mut store,
            config: &config,
        };

        for _ in 0..5 {
            assert_eq!(
                lifecycle.handle_break(claim.world_id, claim.anchor),
                HandleBreakResult::Breaking {
                    claim_id: claim.id,
                    remaining: 2
                }
            );
        }
        assert!(lifecycle.store.claim_by_id(claim.id).unwrap().is_some());
    }

    #[test]
    fn countdown_of_two_destroys_on_the_first_break() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, 2);
        let config = ClaimsConfig {
            initial_break_count: 2,
            ..ClaimsConfig::default()
        };
        let mut lifecycle = AnchorLifecycle {
            store: &mut store,
            config: &config,
        };

        assert_eq!(
            lifecycle.handle_break(claim.world_id, claim.anchor),
            HandleBreakResult::Destroyed { claim_id: claim.id }
        );
    }

    #[test]
    fn destruction_cascades_to_everything_attached() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, 2);
        let visitor = Uuid::new_v4();
        store.enable_flag(claim.id, Flag::Explosions).unwrap();
        store
            .add_claim_permission(claim.id, ClaimPermission::Door)
            .unwrap();
        store
            .set_player_access(claim.id, visitor, ClaimPermission::Build, AccessLevel::Allow)
            .unwrap();
        store.get_or_create_player_state(visitor).unwrap();

        let config = ClaimsConfig {
            initial_break_count: 2,
            ..ClaimsConfig::default()
        };
        let mut lifecycle = AnchorLifecycle {
            store: &mut store,
            config: &config,
        };
        lifecycle.handle_break(claim.world_id, claim.anchor);

        assert!(store.claim_by_id(claim.id).unwrap().is_none());
        assert!(store.partitions_by_claim(claim.id).unwrap().is_empty());
        assert!(store.enabled_flags(claim.id).unwrap().is_empty());
        assert!(store.claim_permissions(claim.id).unwrap().is_empty());
        assert!(store.player_accesses(claim.id, visitor).unwrap().is_empty());
        // Player session state is never part of the cascade.
        assert!(store.player_state(visitor).unwrap().is_some());
    }

    #[test]
    fn reset_rearms_the_countdown() {
        let mut store = MemoryStore::new();
        let mut claim = seed_claim(&mut store, 3);
        claim.break_count = 2;
        store.update_claim(&claim).unwrap();

        let config = ClaimsConfig::default();
        let mut lifecycle = AnchorLifecycle {
            store: &mut store,
            config: &config,
        };
        assert_eq!(
            lifecycle.reset_break_count(claim.id),
            ResetBreakCountResult::Success
        );
        assert_eq!(
            lifecycle.store.claim_by_id(claim.id).unwrap().unwrap().break_count,
            3
        );
        assert_eq!(
            lifecycle.reset_break_count(Uuid::new_v4()),
            ResetBreakCountResult::ClaimNotFound
        );
    }
}
