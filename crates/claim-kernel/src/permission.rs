//! Layered permission resolution and the grant/revoke surface.
//!
//! Player actions resolve through four layers in strict precedence: admin
//! override, the per-player ACL entry, the claim-wide grant, then ownership.
//! World actions resolve through the claim's enabled flag set. All grant and
//! revoke operations are idempotent; re-applying a grant reports the no-op
//! rather than failing.

use contracts::{
    AccessLevel, ClaimId, ClaimOwner, ClaimPermission, Flag, PlayerAction, PlayerId, WorldAction,
};
use tracing::debug;

use crate::repo::{
    ClaimFlagRepository, ClaimPermissionRepository, ClaimRepository, PlayerAccessRepository,
    PlayerStateRepository, StorageError, StorageResult, TeamRoleResolver,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResolution {
    Allowed,
    Denied,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldActionResolution {
    Allowed,
    Denied,
    /// The action has no governing flag; policy is the caller's.
    NoAssociatedFlag,
    StorageError(StorageError),
}

/// Outcome of a single grant/revoke/enable/disable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutateEntryResult {
    Success,
    AlreadyExists,
    DoesNotExist,
    StorageError(StorageError),
}

/// Outcome of a bulk grant/revoke over an entire enumeration. Entries are
/// applied independently; Success means at least one entry changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutateAllResult {
    Success,
    AllAlreadyGranted,
    AllAlreadyRevoked,
    AllAlreadyEnabled,
    AllAlreadyDisabled,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStateResult {
    Success,
    StorageError(StorageError),
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Permission and flag queries and mutation over the access repositories.
pub struct PermissionResolver<'a, S: ?Sized> {
    pub store: &'a mut S,
    pub roles: &'a dyn TeamRoleResolver,
}

impl<'a, S> PermissionResolver<'a, S>
where
    S: ClaimRepository
        + PlayerAccessRepository
        + ClaimPermissionRepository
        + ClaimFlagRepository
        + PlayerStateRepository
        + ?Sized,
{
    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Decide whether `player` may perform `action` inside `claim`.
    pub fn resolve_player_action(
        &self,
        claim: ClaimId,
        player: PlayerId,
        action: PlayerAction,
    ) -> ActionResolution {
        match self.try_resolve_player_action(claim, player, action) {
            Ok(result) => result,
            Err(error) => ActionResolution::StorageError(error),
        }
    }

    fn try_resolve_player_action(
        &self,
        claim: ClaimId,
        player: PlayerId,
        action: PlayerAction,
    ) -> StorageResult<ActionResolution> {
        let permission = action.required_permission();

        // Admin override wins over everything, an explicit Deny included.
        let overriding = self
            .store
            .player_state(player)?
            .is_some_and(|state| state.claim_override);
        if overriding {
            return Ok(ActionResolution::Allowed);
        }

        if let Some(level) = self.store.player_access(claim, player, permission)? {
            return Ok(match level {
                AccessLevel::Allow => ActionResolution::Allowed,
                AccessLevel::Deny => ActionResolution::Denied,
            });
        }

        if self.store.has_claim_permission(claim, permission)? {
            return Ok(ActionResolution::Allowed);
        }

        match self.store.claim_by_id(claim)?.map(|claim| claim.owner) {
            Some(ClaimOwner::Player(owner)) if owner == player => Ok(ActionResolution::Allowed),
            Some(ClaimOwner::Team(_)) if self.roles.has_permission(player, claim, permission) => {
                Ok(ActionResolution::Allowed)
            }
            _ => Ok(ActionResolution::Denied),
        }
    }

    /// Decide whether the world event `action` may proceed inside `claim`.
    pub fn resolve_world_action(&self, claim: ClaimId, action: WorldAction) -> WorldActionResolution {
        match self.try_resolve_world_action(claim, action) {
            Ok(result) => result,
            Err(error) => WorldActionResolution::StorageError(error),
        }
    }

    fn try_resolve_world_action(
        &self,
        claim: ClaimId,
        action: WorldAction,
    ) -> StorageResult<WorldActionResolution> {
        let Some(flag) = action.associated_flag() else {
            return Ok(WorldActionResolution::NoAssociatedFlag);
        };
        if self.store.is_flag_enabled(claim, flag)? {
            Ok(WorldActionResolution::Allowed)
        } else {
            Ok(WorldActionResolution::Denied)
        }
    }

    // -----------------------------------------------------------------------
    // Per-player ACL entries
    // -----------------------------------------------------------------------

    pub fn grant_player_permission(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> MutateEntryResult {
        self.set_player_entry(claim, player, permission, AccessLevel::Allow)
    }

    /// Write an explicit Deny entry, shadowing any claim-wide grant.
    pub fn deny_player_permission(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> MutateEntryResult {
        self.set_player_entry(claim, player, permission, AccessLevel::Deny)
    }

    fn set_player_entry(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
        level: AccessLevel,
    ) -> MutateEntryResult {
        let existing = match self.store.player_access(claim, player, permission) {
            Ok(existing) => existing,
            Err(error) => return MutateEntryResult::StorageError(error),
        };
        if existing == Some(level) {
            return MutateEntryResult::AlreadyExists;
        }
        if let Err(error) = self.store.set_player_access(claim, player, permission, level) {
            return MutateEntryResult::StorageError(error);
        }
        debug!(%claim, %player, ?permission, ?level, "player access set");
        MutateEntryResult::Success
    }

    /// Remove the player's ACL entry, restoring layered resolution.
    pub fn revoke_player_permission(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> MutateEntryResult {
        let existing = match self.store.player_access(claim, player, permission) {
            Ok(existing) => existing,
            Err(error) => return MutateEntryResult::StorageError(error),
        };
        if existing.is_none() {
            return MutateEntryResult::DoesNotExist;
        }
        if let Err(error) = self.store.clear_player_access(claim, player, permission) {
            return MutateEntryResult::StorageError(error);
        }
        MutateEntryResult::Success
    }

    pub fn grant_all_player_permissions(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
    ) -> MutateAllResult {
        let mut changed = false;
        for permission in ClaimPermission::ALL {
            match self.grant_player_permission(claim, player, permission) {
                MutateEntryResult::Success => changed = true,
                MutateEntryResult::StorageError(error) => {
                    return MutateAllResult::StorageError(error)
                }
                _ => {}
            }
        }
        if changed {
            MutateAllResult::Success
        } else {
            MutateAllResult::AllAlreadyGranted
        }
    }

    pub fn revoke_all_player_permissions(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
    ) -> MutateAllResult {
        let mut changed = false;
        for permission in ClaimPermission::ALL {
            match self.revoke_player_permission(claim, player, permission) {
                MutateEntryResult::Success => changed = true,
                MutateEntryResult::StorageError(error) => {
                    return MutateAllResult::StorageError(error)
                }
                _ => {}
            }
        }
        if changed {
            MutateAllResult::Success
        } else {
            MutateAllResult::AllAlreadyRevoked
        }
    }

    // -----------------------------------------------------------------------
    // Claim-wide grants
    // -----------------------------------------------------------------------

    pub fn grant_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> MutateEntryResult {
        let granted = match self.store.has_claim_permission(claim, permission) {
            Ok(granted) => granted,
            Err(error) => return MutateEntryResult::StorageError(error),
        };
        if granted {
            return MutateEntryResult::AlreadyExists;
        }
        if let Err(error) = self.store.add_claim_permission(claim, permission) {
            return MutateEntryResult::StorageError(error);
        }
        debug!(%claim, ?permission, "claim permission granted");
        MutateEntryResult::Success
    }

    pub fn revoke_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> MutateEntryResult {
        let granted = match self.store.has_claim_permission(claim, permission) {
            Ok(granted) => granted,
            Err(error) => return MutateEntryResult::StorageError(error),
        };
        if !granted {
            return MutateEntryResult::DoesNotExist;
        }
        if let Err(error) = self.store.remove_claim_permission(claim, permission) {
            return MutateEntryResult::StorageError(error);
        }
        MutateEntryResult::Success
    }

    pub fn grant_all_claim_permissions(&mut self, claim: ClaimId) -> MutateAllResult {
        let mut changed = false;
        for permission in ClaimPermission::ALL {
            match self.grant_claim_permission(claim, permission) {
                MutateEntryResult::Success => changed = true,
                MutateEntryResult::StorageError(error) => {
                    return MutateAllResult::StorageError(error)
                }
                _ => {}
            }
        }
        if changed {
            MutateAllResult::Success
        } else {
            MutateAllResult::AllAlreadyGranted
        }
    }

    pub fn revoke_all_claim_permissions(&mut self, claim: ClaimId) -> MutateAllResult {
        let mut changed = false;
        for permission in ClaimPermission::ALL {
            match self.revoke_claim_permission(claim, permission) {
                MutateEntryResult::Success => changed = true,
                MutateEntryResult::StorageError(error) => {
                    return MutateAllResult::StorageError(error)
                }
                _ => {}
            }
        }
        if changed {
            MutateAllResult::Success
        } else {
            MutateAllResult::AllAlreadyRevoked
        }
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    pub fn enable_flag(&mut self, claim: ClaimId, flag: Flag) -> MutateEntryResult {
        let enabled = match self.store.is_flag_enabled(claim, flag) {
            Ok(enabled) => enabled,
            Err(error) => return MutateEntryResult::StorageError(error),
        };
        if enabled {
            return MutateEntryResult::AlreadyExists;
        }
        if let Err(error) = self.store.enable_flag(claim, flag) {
            return MutateEntryResult::StorageError(error);
        }
        debug!(%claim, ?flag, "flag enabled");
        MutateEntryResult::Success
    }

    pub fn disable_flag(&mut self, claim: ClaimId, flag: Flag) -> MutateEntryResult {
        let enabled = match self.store.is_flag_enabled(claim, flag) {
            Ok(enabled) => enabled,
            Err(error) => return MutateEntryResult::StorageError(error),
        };
        if !enabled {
            return MutateEntryResult::DoesNotExist;
        }
        if let Err(error) = self.store.disable_flag(claim, flag) {
            return MutateEntryResult::StorageError(error);
        }
        MutateEntryResult::Success
    }

    pub fn enable_all_flags(&mut self, claim: ClaimId) -> MutateAllResult {
        let mut changed = false;
        for flag in Flag::ALL {
            match self.enable_flag(claim, flag) {
                MutateEntryResult::Success => changed = true,
                MutateEntryResult::StorageError(error) => {
                    return MutateAllResult::StorageError(error)
                }
                _ => {}
            }
        }
        if changed {
            MutateAllResult::Success
        } else {
            MutateAllResult::AllAlreadyEnabled
        }
    }

    pub fn disable_all_flags(&mut self, claim: ClaimId) -> MutateAllResult {
        let mut changed = false;
        for flag in Flag::ALL {
            match self.disable_flag(claim, flag) {
                MutateEntryResult::Success => changed = true,
                MutateEntryResult::StorageError(error) => {
                    return MutateAllResult::StorageError(error)
                }
                _ => {}
            }
        }
        if changed {
            MutateAllResult::Success
        } else {
            MutateAllResult::AllAlreadyDisabled
        }
    }

    // -----------------------------------------------------------------------
    // Session state
    // -----------------------------------------------------------------------

    pub fn has_claim_override(&self, player: PlayerId) -> Result<bool, StorageError> {
        Ok(self
            .store
            .player_state(player)?
            .is_some_and(|state| state.claim_override))
    }

    pub fn set_claim_override(&mut self, player: PlayerId, enabled: bool) -> PlayerStateResult {
        match self.try_set_claim_override(player, enabled) {
            Ok(()) => PlayerStateResult::Success,
            Err(error) => PlayerStateResult::StorageError(error),
        }
    }

    fn try_set_claim_override(&mut self, player: PlayerId, enabled: bool) -> StorageResult<()> {
        let mut state = self.store.get_or_create_player_state(player)?;
        state.claim_override = enabled;
        self.store.update_player_state(&state)?;
        debug!(%player, enabled, "claim override set");
        Ok(())
    }

    pub fn set_claim_menu(&mut self, player: PlayerId, menu: Option<ClaimId>) -> PlayerStateResult {
        match self.try_set_claim_menu(player, menu) {
            Ok(()) => PlayerStateResult::Success,
            Err(error) => PlayerStateResult::StorageError(error),
        }
    }

    fn try_set_claim_menu(&mut self, player: PlayerId, menu: Option<ClaimId>) -> StorageResult<()> {
        let mut state = self.store.get_or_create_player_state(player)?;
        state.in_claim_menu = menu;
        self.store.update_player_state(&state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, NoTeamRoles};
    use crate::repo::ClaimRepository;
    use chrono::Utc;
    use contracts::{Claim, Position3D, TeamId};
    use uuid::Uuid;

    /// Grants a single fixed permission to a single fixed player.
    struct OnePermissionRole {
        player: PlayerId,
        permission: ClaimPermission,
    }

    impl TeamRoleResolver for OnePermissionRole {
        fn has_permission(
            &self,
            player: PlayerId,
            _claim: ClaimId,
            permission: ClaimPermission,
        ) -> bool {
            player == self.player && permission == self.permission
        }
    }

    fn seed_claim(store: &mut MemoryStore, owner: ClaimOwner) -> Claim {
        let claim = Claim::new(
            Uuid::new_v4(),
            owner,
            "Home",
            Position3D::new(0, 64, 0),
            Utc::now(),
            3,
        );
        store.add_claim(&claim).unwrap();
        claim
    }

    fn resolver<'a>(
        store: &'a mut MemoryStore,
        roles: &'a dyn TeamRoleResolver,
    ) -> PermissionResolver<'a, MemoryStore> {
        PermissionResolver { store, roles }
    }

    #[test]
    fn owner_is_always_allowed() {
        let mut store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let claim = seed_claim(&mut store, ClaimOwner::Player(owner));
        let resolver = resolver(&mut store, &NoTeamRoles);

        assert_eq!(
            resolver.resolve_player_action(claim.id, owner, PlayerAction::BreakBlock),
            ActionResolution::Allowed
        );
    }

    #[test]
    fn strangers_are_denied_by_default() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, ClaimOwner::Player(Uuid::new_v4()));
        let resolver = resolver(&mut store, &NoTeamRoles);

        assert_eq!(
            resolver.resolve_player_action(claim.id, Uuid::new_v4(), PlayerAction::OpenDoor),
            ActionResolution::Denied
        );
    }

    #[test]
    fn player_entry_shadows_the_claim_wide_grant() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, ClaimOwner::Player(Uuid::new_v4()));
        let visitor = Uuid::new_v4();
        let mut resolver = resolver(&mut store, &NoTeamRoles);

        resolver.grant_claim_permission(claim.id, ClaimPermission::Door);
        assert_eq!(
            resolver.resolve_player_action(claim.id, visitor, PlayerAction::OpenDoor),
            ActionResolution::Allowed
        );

        resolver.deny_player_permission(claim.id, visitor, ClaimPermission::Door);
        assert_eq!(
            resolver.resolve_player_action(claim.id, visitor, PlayerAction::OpenDoor),
            ActionResolution::Denied
        );

        // Clearing the entry falls back to the claim-wide layer.
        resolver.revoke_player_permission(claim.id, visitor, ClaimPermission::Door);
        assert_eq!(
            resolver.resolve_player_action(claim.id, visitor, PlayerAction::OpenDoor),
            ActionResolution::Allowed
        );
    }

    #[test]
    fn admin_override_beats_an_explicit_deny() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, ClaimOwner::Player(Uuid::new_v4()));
        let admin = Uuid::new_v4();
        let mut resolver = resolver(&mut store, &NoTeamRoles);

        resolver.deny_player_permission(claim.id, admin, ClaimPermission::Build);
        resolver.set_claim_override(admin, true);
        assert_eq!(
            resolver.resolve_player_action(claim.id, admin, PlayerAction::PlaceBlock),
            ActionResolution::Allowed
        );

        resolver.set_claim_override(admin, false);
        assert_eq!(
            resolver.resolve_player_action(claim.id, admin, PlayerAction::PlaceBlock),
            ActionResolution::Denied
        );
    }

    #[test]
    fn team_claims_delegate_the_owner_layer() {
        let mut store = MemoryStore::new();
        let team: TeamId = Uuid::new_v4();
        let claim = seed_claim(&mut store, ClaimOwner::Team(team));
        let member = Uuid::new_v4();
        let roles = OnePermissionRole {
            player: member,
            permission: ClaimPermission::Container,
        };
        let resolver = resolver(&mut store, &roles);

        assert_eq!(
            resolver.resolve_player_action(claim.id, member, PlayerAction::OpenContainer),
            ActionResolution::Allowed
        );
        assert_eq!(
            resolver.resolve_player_action(claim.id, member, PlayerAction::BreakBlock),
            ActionResolution::Denied
        );
    }

    #[test]
    fn world_actions_follow_the_flag_set() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, ClaimOwner::Player(Uuid::new_v4()));
        let mut resolver = resolver(&mut store, &NoTeamRoles);

        assert_eq!(
            resolver.resolve_world_action(claim.id, WorldAction::ExplosionDamage),
            WorldActionResolution::Denied
        );
        resolver.enable_flag(claim.id, Flag::Explosions);
        assert_eq!(
            resolver.resolve_world_action(claim.id, WorldAction::ExplosionDamage),
            WorldActionResolution::Allowed
        );
        assert_eq!(
            resolver.resolve_world_action(claim.id, WorldAction::PortalCreation),
            WorldActionResolution::NoAssociatedFlag
        );
    }

    #[test]
    fn grants_and_revokes_are_idempotent() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, ClaimOwner::Player(Uuid::new_v4()));
        let visitor = Uuid::new_v4();
        let mut resolver = resolver(&mut store, &NoTeamRoles);

        assert_eq!(
            resolver.grant_player_permission(claim.id, visitor, ClaimPermission::Build),
            MutateEntryResult::Success
        );
        assert_eq!(
            resolver.grant_player_permission(claim.id, visitor, ClaimPermission::Build),
            MutateEntryResult::AlreadyExists
        );
        // Flipping Allow to Deny is a change, not a no-op.
        assert_eq!(
            resolver.deny_player_permission(claim.id, visitor, ClaimPermission::Build),
            MutateEntryResult::Success
        );
        assert_eq!(
            resolver.revoke_player_permission(claim.id, visitor, ClaimPermission::Build),
            MutateEntryResult::Success
        );
        assert_eq!(
            resolver.revoke_player_permission(claim.id, visitor, ClaimPermission::Build),
            MutateEntryResult::DoesNotExist
        );

        assert_eq!(
            resolver.enable_flag(claim.id, Flag::Pistons),
            MutateEntryResult::Success
        );
        assert_eq!(
            resolver.enable_flag(claim.id, Flag::Pistons),
            MutateEntryResult::AlreadyExists
        );
        assert_eq!(
            resolver.disable_flag(claim.id, Flag::Fluids),
            MutateEntryResult::DoesNotExist
        );
    }

    #[test]
    fn bulk_operations_report_whether_anything_changed() {
        let mut store = MemoryStore::new();
        let claim = seed_claim(&mut store, ClaimOwner::Player(Uuid::new_v4()));
        let visitor = Uuid::new_v4();
        let mut resolver = resolver(&mut store, &NoTeamRoles);

        assert_eq!(
            resolver.enable_all_flags(claim.id),
            MutateAllResult::Success
        );
        assert_eq!(
            resolver.enable_all_flags(claim.id),
            MutateAllResult::AllAlreadyEnabled
        );
        for action in [
            WorldAction::ExplosionDamage,
            WorldAction::FireSpread,
            WorldAction::PistonExtend,
            WorldAction::FallingBlockLand,
        ] {
            assert_eq!(
                resolver.resolve_world_action(claim.id, action),
                WorldActionResolution::Allowed
            );
        }
        assert_eq!(
            resolver.disable_all_flags(claim.id),
            MutateAllResult::Success
        );
        assert_eq!(
            resolver.disable_all_flags(claim.id),
            MutateAllResult::AllAlreadyDisabled
        );

        // Partial coverage still counts as a change.
        resolver.grant_player_permission(claim.id, visitor, ClaimPermission::Build);
        assert_eq!(
            resolver.grant_all_player_permissions(claim.id, visitor),
            MutateAllResult::Success
        );
        assert_eq!(
            resolver.grant_all_player_permissions(claim.id, visitor),
            MutateAllResult::AllAlreadyGranted
        );
        assert_eq!(
            resolver.revoke_all_player_permissions(claim.id, visitor),
            MutateAllResult::Success
        );
        assert_eq!(
            resolver.revoke_all_player_permissions(claim.id, visitor),
            MutateAllResult::AllAlreadyRevoked
        );

        assert_eq!(
            resolver.grant_all_claim_permissions(claim.id),
            MutateAllResult::Success
        );
        assert_eq!(
            resolver.revoke_all_claim_permissions(claim.id),
            MutateAllResult::Success
        );
        assert_eq!(
            resolver.revoke_all_claim_permissions(claim.id),
            MutateAllResult::AllAlreadyRevoked
        );
    }

    #[test]
    fn claim_menu_pointer_round_trips() {
        let mut store = MemoryStore::new();
        let player = Uuid::new_v4();
        let menu = Uuid::new_v4();
        let mut resolver = resolver(&mut store, &NoTeamRoles);

        assert_eq!(
            resolver.set_claim_menu(player, Some(menu)),
            PlayerStateResult::Success
        );
        assert!(!resolver.has_claim_override(player).unwrap());
        assert_eq!(
            resolver.set_claim_menu(player, None),
            PlayerStateResult::Success
        );
    }
}
