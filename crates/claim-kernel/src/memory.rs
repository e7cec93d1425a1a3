//! In-memory storage double: one [`MemoryStore`] implementing every
//! repository trait, plus fixed-policy service doubles. Used by the kernel's
//! own tests and suitable for hosts that want a throwaway backend.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{
    AccessLevel, Claim, ClaimId, ClaimOwner, ClaimPermission, Flag, Partition, PartitionId,
    PlayerId, PlayerState, Position2D, Position3D, TeamId, WorldId,
};

use crate::geometry;
use crate::repo::{
    ClaimFlagRepository, ClaimPermissionRepository, ClaimRepository, PartitionRepository,
    PlayerAccessRepository, PlayerMetadataService, PlayerStateRepository, StorageError,
    StorageResult, TeamDirectory, TeamRoleResolver, WorldBorderService,
};

/// BTreeMap-backed implementation of all repository traits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    claims: BTreeMap<ClaimId, Claim>,
    partitions: BTreeMap<PartitionId, Partition>,
    flags: BTreeMap<ClaimId, BTreeSet<Flag>>,
    claim_permissions: BTreeMap<ClaimId, BTreeSet<ClaimPermission>>,
    player_accesses: BTreeMap<(ClaimId, PlayerId, ClaimPermission), AccessLevel>,
    player_states: BTreeMap<PlayerId, PlayerState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimRepository for MemoryStore {
    fn claim_by_id(&self, id: ClaimId) -> StorageResult<Option<Claim>> {
        Ok(self.claims.get(&id).cloned())
    }

    fn claims_by_owner(&self, owner: &ClaimOwner) -> StorageResult<Vec<Claim>> {
        Ok(self
            .claims
            .values()
            .filter(|claim| claim.owner == *owner)
            .cloned()
            .collect())
    }

    fn claims_by_player(&self, player: PlayerId) -> StorageResult<Vec<Claim>> {
        Ok(self
            .claims
            .values()
            .filter(|claim| claim.owner.is_player(player))
            .cloned()
            .collect())
    }

    fn claim_by_name(&self, owner: &ClaimOwner, name: &str) -> StorageResult<Option<Claim>> {
        Ok(self
            .claims
            .values()
            .find(|claim| claim.owner == *owner && claim.name == name)
            .cloned())
    }

    fn claim_by_anchor(&self, world: WorldId, anchor: Position3D) -> StorageResult<Option<Claim>> {
        Ok(self
            .claims
            .values()
            .find(|claim| claim.world_id == world && claim.anchor == anchor)
            .cloned())
    }

    fn add_claim(&mut self, claim: &Claim) -> StorageResult<()> {
        self.claims.insert(claim.id, claim.clone());
        Ok(())
    }

    fn update_claim(&mut self, claim: &Claim) -> StorageResult<()> {
        match self.claims.get_mut(&claim.id) {
            Some(existing) => {
                *existing = claim.clone();
                Ok(())
            }
            None => Err(StorageError(format!("unknown claim {}", claim.id))),
        }
    }

    fn remove_claim(&mut self, id: ClaimId) -> StorageResult<()> {
        self.claims.remove(&id);
        Ok(())
    }
}

impl PartitionRepository for MemoryStore {
    fn partition_by_id(&self, id: PartitionId) -> StorageResult<Option<Partition>> {
        Ok(self.partitions.get(&id).copied())
    }

    fn partitions_by_claim(&self, claim: ClaimId) -> StorageResult<Vec<Partition>> {
        Ok(self
            .partitions
            .values()
            .filter(|partition| partition.claim_id == claim)
            .copied()
            .collect())
    }

    fn partitions_in_world(&self, world: WorldId) -> StorageResult<Vec<Partition>> {
        Ok(self
            .partitions
            .values()
            .filter(|partition| {
                self.claims
                    .get(&partition.claim_id)
                    .is_some_and(|claim| claim.world_id == world)
            })
            .copied()
            .collect())
    }

    fn partition_at_position(
        &self,
        world: WorldId,
        position: Position2D,
    ) -> StorageResult<Option<Partition>> {
        Ok(self
            .partitions
            .values()
            .find(|partition| {
                geometry::contains_point(&partition.area, position)
                    && self
                        .claims
                        .get(&partition.claim_id)
                        .is_some_and(|claim| claim.world_id == world)
            })
            .copied())
    }

    fn add_partition(&mut self, partition: &Partition) -> StorageResult<()> {
        self.partitions.insert(partition.id, *partition);
        Ok(())
    }

    fn update_partition(&mut self, partition: &Partition) -> StorageResult<()> {
        match self.partitions.get_mut(&partition.id) {
            Some(existing) => {
                *existing = *partition;
                Ok(())
            }
            None => Err(StorageError(format!("unknown partition {}", partition.id))),
        }
    }

    fn remove_partition(&mut self, id: PartitionId) -> StorageResult<()> {
        self.partitions.remove(&id);
        Ok(())
    }

    fn remove_partitions_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.partitions.retain(|_, partition| partition.claim_id != claim);
        Ok(())
    }
}

impl ClaimFlagRepository for MemoryStore {
    fn is_flag_enabled(&self, claim: ClaimId, flag: Flag) -> StorageResult<bool> {
        Ok(self
            .flags
            .get(&claim)
            .is_some_and(|enabled| enabled.contains(&flag)))
    }

    fn enabled_flags(&self, claim: ClaimId) -> StorageResult<Vec<Flag>> {
        Ok(self
            .flags
            .get(&claim)
            .map(|enabled| enabled.iter().copied().collect())
            .unwrap_or_default())
    }

    fn enable_flag(&mut self, claim: ClaimId, flag: Flag) -> StorageResult<()> {
        self.flags.entry(claim).or_default().insert(flag);
        Ok(())
    }

    fn disable_flag(&mut self, claim: ClaimId, flag: Flag) -> StorageResult<()> {
        if let Some(enabled) = self.flags.get_mut(&claim) {
            enabled.remove(&flag);
        }
        Ok(())
    }

    fn remove_flags_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.flags.remove(&claim);
        Ok(())
    }
}

impl ClaimPermissionRepository for MemoryStore {
    fn has_claim_permission(
        &self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<bool> {
        Ok(self
            .claim_permissions
            .get(&claim)
            .is_some_and(|granted| granted.contains(&permission)))
    }

    fn claim_permissions(&self, claim: ClaimId) -> StorageResult<Vec<ClaimPermission>> {
        Ok(self
            .claim_permissions
            .get(&claim)
            .map(|granted| granted.iter().copied().collect())
            .unwrap_or_default())
    }

    fn add_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<()> {
        self.claim_permissions
            .entry(claim)
            .or_default()
            .insert(permission);
        Ok(())
    }

    fn remove_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<()> {
        if let Some(granted) = self.claim_permissions.get_mut(&claim) {
            granted.remove(&permission);
        }
        Ok(())
    }

    fn remove_claim_permissions_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.claim_permissions.remove(&claim);
        Ok(())
    }
}

impl PlayerAccessRepository for MemoryStore {
    fn player_access(
        &self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> StorageResult<Option<AccessLevel>> {
        Ok(self.player_accesses.get(&(claim, player, permission)).copied())
    }

    fn player_accesses(
        &self,
        claim: ClaimId,
        player: PlayerId,
    ) -> StorageResult<Vec<(ClaimPermission, AccessLevel)>> {
        Ok(self
            .player_accesses
            .iter()
            .filter(|((c, p, _), _)| *c == claim && *p == player)
            .map(|((_, _, permission), level)| (*permission, *level))
            .collect())
    }

    fn set_player_access(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
        level: AccessLevel,
    ) -> StorageResult<()> {
        self.player_accesses.insert((claim, player, permission), level);
        Ok(())
    }

    fn clear_player_access(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> StorageResult<()> {
        self.player_accesses.remove(&(claim, player, permission));
        Ok(())
    }

    fn remove_accesses_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.player_accesses.retain(|(c, _, _), _| *c != claim);
        Ok(())
    }
}

impl PlayerStateRepository for MemoryStore {
    fn player_state(&self, player: PlayerId) -> StorageResult<Option<PlayerState>> {
        Ok(self.player_states.get(&player).cloned())
    }

    fn get_or_create_player_state(&mut self, player: PlayerId) -> StorageResult<PlayerState> {
        Ok(self
            .player_states
            .entry(player)
            .or_insert_with(|| PlayerState::new(player))
            .clone())
    }

    fn update_player_state(&mut self, state: &PlayerState) -> StorageResult<()> {
        self.player_states.insert(state.player_id, state.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service doubles
// ---------------------------------------------------------------------------

/// Fixed limits for every owner.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetadata {
    pub claim_limit: u32,
    pub block_allowance: u64,
}

impl PlayerMetadataService for FixedMetadata {
    fn claim_limit(&self, _owner: &ClaimOwner) -> u32 {
        self.claim_limit
    }

    fn block_allowance(&self, _owner: &ClaimOwner) -> u64 {
        self.block_allowance
    }
}

/// A border that never rejects a position.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWorldBorder;

impl WorldBorderService for OpenWorldBorder {
    fn is_inside_border(&self, _world: WorldId, _position: Position2D, _margin: u32) -> bool {
        true
    }
}

/// A square border of the given radius centred on the origin.
#[derive(Debug, Clone, Copy)]
pub struct SquareWorldBorder {
    pub radius: u32,
}

impl WorldBorderService for SquareWorldBorder {
    fn is_inside_border(&self, _world: WorldId, position: Position2D, margin: u32) -> bool {
        let limit = self.radius.saturating_sub(margin) as i64;
        (position.x as i64).abs() <= limit && (position.z as i64).abs() <= limit
    }
}

/// Fixed player-to-team mapping.
#[derive(Debug, Clone, Default)]
pub struct StaticTeams {
    pub teams: BTreeMap<PlayerId, TeamId>,
}

impl TeamDirectory for StaticTeams {
    fn primary_team(&self, player: PlayerId) -> Option<TeamId> {
        self.teams.get(&player).copied()
    }
}

/// A role resolver that grants nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTeamRoles;

impl TeamRoleResolver for NoTeamRoles {
    fn has_permission(
        &self,
        _player: PlayerId,
        _claim: ClaimId,
        _permission: ClaimPermission,
    ) -> bool {
        false
    }
}
