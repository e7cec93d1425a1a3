//! Repository and service collaborator traits. The kernel consumes these;
//! it never implements durable storage itself. Every repository failure
//! surfaces as a [`StorageError`], converted to a dedicated result variant at
//! each operation boundary — never retried, never silently discarded.

use contracts::{
    AccessLevel, Claim, ClaimId, ClaimOwner, ClaimPermission, Flag, Partition, PartitionId,
    PlayerId, PlayerState, Position2D, Position3D, TeamId, WorldId,
};

/// An unexpected persistence failure, opaque to the kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);

pub type StorageResult<T> = Result<T, StorageError>;

/// Claim aggregate storage. Updates replace the stored snapshot wholesale.
pub trait ClaimRepository {
    fn claim_by_id(&self, id: ClaimId) -> StorageResult<Option<Claim>>;
    fn claims_by_owner(&self, owner: &ClaimOwner) -> StorageResult<Vec<Claim>>;
    fn claims_by_player(&self, player: PlayerId) -> StorageResult<Vec<Claim>>;
    fn claim_by_name(&self, owner: &ClaimOwner, name: &str) -> StorageResult<Option<Claim>>;
    fn claim_by_anchor(&self, world: WorldId, anchor: Position3D) -> StorageResult<Option<Claim>>;
    fn add_claim(&mut self, claim: &Claim) -> StorageResult<()>;
    fn update_claim(&mut self, claim: &Claim) -> StorageResult<()>;
    fn remove_claim(&mut self, id: ClaimId) -> StorageResult<()>;
}

/// Partition storage and spatial queries.
pub trait PartitionRepository {
    fn partition_by_id(&self, id: PartitionId) -> StorageResult<Option<Partition>>;
    fn partitions_by_claim(&self, claim: ClaimId) -> StorageResult<Vec<Partition>>;
    /// Every partition belonging to any claim in the given world.
    fn partitions_in_world(&self, world: WorldId) -> StorageResult<Vec<Partition>>;
    fn partition_at_position(
        &self,
        world: WorldId,
        position: Position2D,
    ) -> StorageResult<Option<Partition>>;
    fn add_partition(&mut self, partition: &Partition) -> StorageResult<()>;
    fn update_partition(&mut self, partition: &Partition) -> StorageResult<()>;
    fn remove_partition(&mut self, id: PartitionId) -> StorageResult<()>;
    fn remove_partitions_by_claim(&mut self, claim: ClaimId) -> StorageResult<()>;
}

/// Membership set of enabled world-behavior flags per claim.
pub trait ClaimFlagRepository {
    fn is_flag_enabled(&self, claim: ClaimId, flag: Flag) -> StorageResult<bool>;
    fn enabled_flags(&self, claim: ClaimId) -> StorageResult<Vec<Flag>>;
    fn enable_flag(&mut self, claim: ClaimId, flag: Flag) -> StorageResult<()>;
    fn disable_flag(&mut self, claim: ClaimId, flag: Flag) -> StorageResult<()>;
    fn remove_flags_by_claim(&mut self, claim: ClaimId) -> StorageResult<()>;
}

/// Claim-wide permission grants, visible to all non-owner occupants.
pub trait ClaimPermissionRepository {
    fn has_claim_permission(
        &self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<bool>;
    fn claim_permissions(&self, claim: ClaimId) -> StorageResult<Vec<ClaimPermission>>;
    fn add_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<()>;
    fn remove_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<()>;
    fn remove_claim_permissions_by_claim(&mut self, claim: ClaimId) -> StorageResult<()>;
}

/// Per-player ACL entries scoped to one claim.
pub trait PlayerAccessRepository {
    fn player_access(
        &self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> StorageResult<Option<AccessLevel>>;
    fn player_accesses(
        &self,
        claim: ClaimId,
        player: PlayerId,
    ) -> StorageResult<Vec<(ClaimPermission, AccessLevel)>>;
    fn set_player_access(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
        level: AccessLevel,
    ) -> StorageResult<()>;
    fn clear_player_access(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> StorageResult<()>;
    /// Bulk removal on claim deletion.
    fn remove_accesses_by_claim(&mut self, claim: ClaimId) -> StorageResult<()>;
}

/// Per-player session state, created lazily on first access.
pub trait PlayerStateRepository {
    fn player_state(&self, player: PlayerId) -> StorageResult<Option<PlayerState>>;
    fn get_or_create_player_state(&mut self, player: PlayerId) -> StorageResult<PlayerState>;
    fn update_player_state(&mut self, state: &PlayerState) -> StorageResult<()>;
}

/// Per-player/team policy limits. Hosts may back these with ranks.
pub trait PlayerMetadataService {
    fn claim_limit(&self, owner: &ClaimOwner) -> u32;
    fn block_allowance(&self, owner: &ClaimOwner) -> u64;
}

/// World-border query. The kernel never manipulates blocks; it only asks
/// whether a prospective anchor keeps the configured margin to the border.
pub trait WorldBorderService {
    fn is_inside_border(&self, world: WorldId, position: Position2D, margin: u32) -> bool;
}

/// Team membership lookup for ownership conversion.
pub trait TeamDirectory {
    fn primary_team(&self, player: PlayerId) -> Option<TeamId>;
}

/// Delegated owner-side permission check for team-owned claims.
pub trait TeamRoleResolver {
    fn has_permission(
        &self,
        player: PlayerId,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> bool;
}
