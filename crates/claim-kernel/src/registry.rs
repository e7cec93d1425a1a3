//! Claim lifecycle: creation, renaming, description/icon edits, anchor
//! relocation, one-way conversion to team ownership, and position lookup.
//!
//! Every operation returns a closed result enum; callers match exhaustively.
//! A failed check leaves storage untouched.

use chrono::{DateTime, Utc};
use contracts::{
    is_valid_claim_description, is_valid_claim_name, Claim, ClaimId, ClaimOwner, ClaimsConfig,
    PlayerId, Position2D, Position3D, WorldId,
};
use tracing::debug;

use crate::geometry;
use crate::repo::{
    ClaimRepository, PartitionRepository, PlayerMetadataService, PlayerStateRepository,
    StorageError, StorageResult, TeamDirectory, WorldBorderService,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CreateClaimResult {
    Success(Claim),
    NameInvalid,
    NameConflict,
    LimitExceeded { limit: u32 },
    TooCloseToWorldBorder,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenameClaimResult {
    Success(Claim),
    ClaimNotFound,
    NameInvalid,
    NameConflict,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateClaimResult {
    Success(Claim),
    ClaimNotFound,
    DescriptionInvalid,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveAnchorResult {
    Success(Claim),
    ClaimNotFound,
    NoPermission,
    InvalidPosition,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConvertOwnershipResult {
    Success(Claim),
    ClaimNotFound,
    AlreadyTeamOwned,
    NotClaimOwner,
    PlayerNotInTeam,
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimAtPositionResult {
    Success(Claim),
    NoClaimFound,
    StorageError(StorageError),
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Claim lifecycle operations over the claim and partition repositories.
pub struct ClaimRegistry<'a, S: ?Sized> {
    pub store: &'a mut S,
    pub metadata: &'a dyn PlayerMetadataService,
    pub border: &'a dyn WorldBorderService,
    pub teams: &'a dyn TeamDirectory,
    pub config: &'a ClaimsConfig,
}

impl<'a, S> ClaimRegistry<'a, S>
where
    S: ClaimRepository + PartitionRepository + PlayerStateRepository + ?Sized,
{
    /// Register a new claim anchored at `anchor`. The claim starts with no
    /// partitions; carving the initial partition is the caller's next step.
    pub fn create(
        &mut self,
        world: WorldId,
        owner: ClaimOwner,
        name: &str,
        anchor: Position3D,
        now: DateTime<Utc>,
    ) -> CreateClaimResult {
        match self.try_create(world, owner, name, anchor, now) {
            Ok(result) => result,
            Err(error) => CreateClaimResult::StorageError(error),
        }
    }

    fn try_create(
        &mut self,
        world: WorldId,
        owner: ClaimOwner,
        name: &str,
        anchor: Position3D,
        now: DateTime<Utc>,
    ) -> StorageResult<CreateClaimResult> {
        if !is_valid_claim_name(name) {
            return Ok(CreateClaimResult::NameInvalid);
        }
        if self.store.claim_by_name(&owner, name.trim())?.is_some() {
            return Ok(CreateClaimResult::NameConflict);
        }
        let limit = self.metadata.claim_limit(&owner);
        if self.store.claims_by_owner(&owner)?.len() as u32 >= limit {
            return Ok(CreateClaimResult::LimitExceeded { limit });
        }
        if !self
            .border
            .is_inside_border(world, anchor.ground(), self.config.world_border_margin)
        {
            return Ok(CreateClaimResult::TooCloseToWorldBorder);
        }

        let claim = Claim::new(
            world,
            owner,
            name.trim(),
            anchor,
            now,
            self.config.initial_break_count,
        );
        self.store.add_claim(&claim)?;
        debug!(claim = %claim.id, name = %claim.name, "claim created");
        Ok(CreateClaimResult::Success(claim))
    }

    pub fn rename(&mut self, claim_id: ClaimId, new_name: &str) -> RenameClaimResult {
        match self.try_rename(claim_id, new_name) {
            Ok(result) => result,
            Err(error) => RenameClaimResult::StorageError(error),
        }
    }

    fn try_rename(&mut self, claim_id: ClaimId, new_name: &str) -> StorageResult<RenameClaimResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(RenameClaimResult::ClaimNotFound);
        };
        if !is_valid_claim_name(new_name) {
            return Ok(RenameClaimResult::NameInvalid);
        }
        // Renaming a claim to its current name is a no-op, not a conflict.
        if let Some(holder) = self.store.claim_by_name(&claim.owner, new_name.trim())? {
            if holder.id != claim_id {
                return Ok(RenameClaimResult::NameConflict);
            }
        }

        claim.name = new_name.trim().to_string();
        self.store.update_claim(&claim)?;
        debug!(claim = %claim.id, name = %claim.name, "claim renamed");
        Ok(RenameClaimResult::Success(claim))
    }

    pub fn update_description(&mut self, claim_id: ClaimId, text: &str) -> UpdateClaimResult {
        match self.try_update_description(claim_id, text) {
            Ok(result) => result,
            Err(error) => UpdateClaimResult::StorageError(error),
        }
    }

    fn try_update_description(
        &mut self,
        claim_id: ClaimId,
        text: &str,
    ) -> StorageResult<UpdateClaimResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(UpdateClaimResult::ClaimNotFound);
        };
        if !is_valid_claim_description(text) {
            return Ok(UpdateClaimResult::DescriptionInvalid);
        }

        claim.description = text.to_string();
        self.store.update_claim(&claim)?;
        Ok(UpdateClaimResult::Success(claim))
    }

    pub fn update_icon(&mut self, claim_id: ClaimId, icon: &str) -> UpdateClaimResult {
        match self.try_update_icon(claim_id, icon) {
            Ok(result) => result,
            Err(error) => UpdateClaimResult::StorageError(error),
        }
    }

    fn try_update_icon(&mut self, claim_id: ClaimId, icon: &str) -> StorageResult<UpdateClaimResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(UpdateClaimResult::ClaimNotFound);
        };

        claim.icon = icon.to_string();
        self.store.update_claim(&claim)?;
        Ok(UpdateClaimResult::Success(claim))
    }

    /// Relocate the anchor within the claim's existing footprint. Partitions
    /// are never touched.
    pub fn move_anchor(
        &mut self,
        claim_id: ClaimId,
        acting_player: PlayerId,
        new_position: Position3D,
    ) -> MoveAnchorResult {
        match self.try_move_anchor(claim_id, acting_player, new_position) {
            Ok(result) => result,
            Err(error) => MoveAnchorResult::StorageError(error),
        }
    }

    fn try_move_anchor(
        &mut self,
        claim_id: ClaimId,
        acting_player: PlayerId,
        new_position: Position3D,
    ) -> StorageResult<MoveAnchorResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(MoveAnchorResult::ClaimNotFound);
        };

        let overriding = self
            .store
            .player_state(acting_player)?
            .is_some_and(|state| state.claim_override);
        if !claim.owner.is_player(acting_player) && !overriding {
            return Ok(MoveAnchorResult::NoPermission);
        }

        let areas: Vec<_> = self
            .store
            .partitions_by_claim(claim_id)?
            .into_iter()
            .map(|partition| partition.area)
            .collect();
        if !geometry::anchor_enclosed(&areas, new_position) {
            return Ok(MoveAnchorResult::InvalidPosition);
        }

        claim.anchor = new_position;
        self.store.update_claim(&claim)?;
        debug!(claim = %claim.id, anchor = %claim.anchor, "claim anchor moved");
        Ok(MoveAnchorResult::Success(claim))
    }

    /// Hand a player-owned claim to the acting player's primary team. One-way:
    /// team-owned claims never revert.
    pub fn convert_to_team_ownership(
        &mut self,
        claim_id: ClaimId,
        acting_player: PlayerId,
    ) -> ConvertOwnershipResult {
        match self.try_convert_to_team_ownership(claim_id, acting_player) {
            Ok(result) => result,
            Err(error) => ConvertOwnershipResult::StorageError(error),
        }
    }

    fn try_convert_to_team_ownership(
        &mut self,
        claim_id: ClaimId,
        acting_player: PlayerId,
    ) -> StorageResult<ConvertOwnershipResult> {
        let Some(mut claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(ConvertOwnershipResult::ClaimNotFound);
        };
        if claim.owner.is_team() {
            return Ok(ConvertOwnershipResult::AlreadyTeamOwned);
        }
        if !claim.owner.is_player(acting_player) {
            return Ok(ConvertOwnershipResult::NotClaimOwner);
        }
        let Some(team) = self.teams.primary_team(acting_player) else {
            return Ok(ConvertOwnershipResult::PlayerNotInTeam);
        };

        claim.owner = ClaimOwner::Team(team);
        self.store.update_claim(&claim)?;
        debug!(claim = %claim.id, team = %team, "claim converted to team ownership");
        Ok(ConvertOwnershipResult::Success(claim))
    }

    /// Resolve the claim covering a ground position, via its partitions.
    pub fn claim_at_position(&self, world: WorldId, position: Position2D) -> ClaimAtPositionResult {
        match self.try_claim_at_position(world, position) {
            Ok(result) => result,
            Err(error) => ClaimAtPositionResult::StorageError(error),
        }
    }

    fn try_claim_at_position(
        &self,
        world: WorldId,
        position: Position2D,
    ) -> StorageResult<ClaimAtPositionResult> {
        let Some(partition) = self.store.partition_at_position(world, position)? else {
            return Ok(ClaimAtPositionResult::NoClaimFound);
        };
        match self.store.claim_by_id(partition.claim_id)? {
            Some(claim) => Ok(ClaimAtPositionResult::Success(claim)),
            None => Ok(ClaimAtPositionResult::NoClaimFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        FixedMetadata, MemoryStore, OpenWorldBorder, SquareWorldBorder, StaticTeams,
    };
    use contracts::{Area, Partition, PlayerState};
    use uuid::Uuid;

    const METADATA: FixedMetadata = FixedMetadata {
        claim_limit: 2,
        block_allowance: 5_000,
    };

    fn registry<'a>(
        store: &'a mut MemoryStore,
        border: &'a dyn crate::repo::WorldBorderService,
        teams: &'a StaticTeams,
        config: &'a ClaimsConfig,
    ) -> ClaimRegistry<'a, MemoryStore> {
        ClaimRegistry {
            store,
            metadata: &METADATA,
            border,
            teams,
            config,
        }
    }

    fn seed_claim(store: &mut MemoryStore, owner: ClaimOwner, name: &str) -> Claim {
        let claim = Claim::new(
            Uuid::new_v4(),
            owner,
            name,
            Position3D::new(0, 64, 0),
            Utc::now(),
            3,
        );
        store.add_claim(&claim).unwrap();
        claim
    }

    #[test]
    fn create_registers_a_claim_with_policy_break_count() {
        let mut store = MemoryStore::new();
        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        let owner = ClaimOwner::Player(Uuid::new_v4());
        let result = registry.create(
            Uuid::new_v4(),
            owner,
            "  Home  ",
            Position3D::new(10, 70, 10),
            Utc::now(),
        );
        let CreateClaimResult::Success(claim) = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(claim.name, "Home");
        assert_eq!(claim.break_count, config.initial_break_count);
        assert!(claim.transfer_requests.is_empty());
    }

    #[test]
    fn create_rejects_invalid_and_duplicate_names() {
        let mut store = MemoryStore::new();
        let owner = ClaimOwner::Player(Uuid::new_v4());
        let existing = seed_claim(&mut store, owner, "Home");
        let world = existing.world_id;

        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        assert_eq!(
            registry.create(world, owner, "   ", Position3D::new(0, 0, 0), Utc::now()),
            CreateClaimResult::NameInvalid
        );
        assert_eq!(
            registry.create(world, owner, "Home", Position3D::new(0, 0, 0), Utc::now()),
            CreateClaimResult::NameConflict
        );
    }

    #[test]
    fn create_enforces_the_owner_claim_limit() {
        let mut store = MemoryStore::new();
        let owner = ClaimOwner::Player(Uuid::new_v4());
        seed_claim(&mut store, owner, "First");
        seed_claim(&mut store, owner, "Second");

        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        assert_eq!(
            registry.create(
                Uuid::new_v4(),
                owner,
                "Third",
                Position3D::new(0, 0, 0),
                Utc::now()
            ),
            CreateClaimResult::LimitExceeded { limit: 2 }
        );
    }

    #[test]
    fn create_respects_the_world_border_margin() {
        let mut store = MemoryStore::new();
        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let border = SquareWorldBorder { radius: 100 };
        let mut registry = registry(&mut store, &border, &teams, &config);

        let owner = ClaimOwner::Player(Uuid::new_v4());
        // margin 16 shrinks the usable square to |x|,|z| <= 84.
        assert_eq!(
            registry.create(
                Uuid::new_v4(),
                owner,
                "Edge",
                Position3D::new(90, 64, 0),
                Utc::now()
            ),
            CreateClaimResult::TooCloseToWorldBorder
        );
        assert!(matches!(
            registry.create(
                Uuid::new_v4(),
                owner,
                "Edge",
                Position3D::new(84, 64, 0),
                Utc::now()
            ),
            CreateClaimResult::Success(_)
        ));
    }

    #[test]
    fn rename_allows_own_name_and_rejects_siblings() {
        let mut store = MemoryStore::new();
        let owner = ClaimOwner::Player(Uuid::new_v4());
        let home = seed_claim(&mut store, owner, "Home");
        seed_claim(&mut store, owner, "Farm");

        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        assert!(matches!(
            registry.rename(home.id, "Home"),
            RenameClaimResult::Success(_)
        ));
        assert_eq!(registry.rename(home.id, "Farm"), RenameClaimResult::NameConflict);
        assert_eq!(registry.rename(home.id, ""), RenameClaimResult::NameInvalid);
        assert_eq!(
            registry.rename(Uuid::new_v4(), "Other"),
            RenameClaimResult::ClaimNotFound
        );
    }

    #[test]
    fn description_and_icon_edits() {
        let mut store = MemoryStore::new();
        let owner = ClaimOwner::Player(Uuid::new_v4());
        let claim = seed_claim(&mut store, owner, "Home");

        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        let UpdateClaimResult::Success(updated) =
            registry.update_description(claim.id, "A cosy base")
        else {
            panic!("expected success");
        };
        assert_eq!(updated.description, "A cosy base");

        assert_eq!(
            registry.update_description(claim.id, &"d".repeat(301)),
            UpdateClaimResult::DescriptionInvalid
        );

        let UpdateClaimResult::Success(updated) = registry.update_icon(claim.id, "chest") else {
            panic!("expected success");
        };
        assert_eq!(updated.icon, "chest");
    }

    #[test]
    fn move_anchor_requires_ownership_or_override() {
        let mut store = MemoryStore::new();
        let owner_id = Uuid::new_v4();
        let claim = seed_claim(&mut store, ClaimOwner::Player(owner_id), "Home");
        store
            .add_partition(&Partition::new(
                claim.id,
                Area::new(Position2D::new(0, 0), Position2D::new(8, 8)),
            ))
            .unwrap();

        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let stranger = Uuid::new_v4();

        {
            let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);
            assert_eq!(
                registry.move_anchor(claim.id, stranger, Position3D::new(4, 70, 4)),
                MoveAnchorResult::NoPermission
            );
            assert!(matches!(
                registry.move_anchor(claim.id, owner_id, Position3D::new(4, 70, 4)),
                MoveAnchorResult::Success(_)
            ));
            // Outside every partition.
            assert_eq!(
                registry.move_anchor(claim.id, owner_id, Position3D::new(20, 70, 20)),
                MoveAnchorResult::InvalidPosition
            );
        }

        // Admin override lets a non-owner relocate the anchor.
        let mut state = PlayerState::new(stranger);
        state.claim_override = true;
        store.update_player_state(&state).unwrap();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);
        assert!(matches!(
            registry.move_anchor(claim.id, stranger, Position3D::new(2, 70, 2)),
            MoveAnchorResult::Success(_)
        ));
    }

    #[test]
    fn conversion_is_one_way_and_requires_a_team() {
        let mut store = MemoryStore::new();
        let owner_id = Uuid::new_v4();
        let teamless = Uuid::new_v4();
        let team_id = Uuid::new_v4();
        let claim = seed_claim(&mut store, ClaimOwner::Player(owner_id), "Home");
        let orphan = seed_claim(&mut store, ClaimOwner::Player(teamless), "Camp");

        let mut teams = StaticTeams::default();
        teams.teams.insert(owner_id, team_id);
        let config = ClaimsConfig::default();
        let mut registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        assert_eq!(
            registry.convert_to_team_ownership(claim.id, teamless),
            ConvertOwnershipResult::NotClaimOwner
        );
        assert_eq!(
            registry.convert_to_team_ownership(orphan.id, teamless),
            ConvertOwnershipResult::PlayerNotInTeam
        );

        let ConvertOwnershipResult::Success(converted) =
            registry.convert_to_team_ownership(claim.id, owner_id)
        else {
            panic!("expected success");
        };
        assert_eq!(converted.owner, ClaimOwner::Team(team_id));

        assert_eq!(
            registry.convert_to_team_ownership(claim.id, owner_id),
            ConvertOwnershipResult::AlreadyTeamOwned
        );
    }

    #[test]
    fn claim_lookup_by_ground_position() {
        let mut store = MemoryStore::new();
        let owner = ClaimOwner::Player(Uuid::new_v4());
        let claim = seed_claim(&mut store, owner, "Home");
        store
            .add_partition(&Partition::new(
                claim.id,
                Area::new(Position2D::new(0, 0), Position2D::new(8, 8)),
            ))
            .unwrap();

        let teams = StaticTeams::default();
        let config = ClaimsConfig::default();
        let registry = registry(&mut store, &OpenWorldBorder, &teams, &config);

        let ClaimAtPositionResult::Success(found) =
            registry.claim_at_position(claim.world_id, Position2D::new(3, 3))
        else {
            panic!("expected a claim");
        };
        assert_eq!(found.id, claim.id);

        assert_eq!(
            registry.claim_at_position(claim.world_id, Position2D::new(30, 30)),
            ClaimAtPositionResult::NoClaimFound
        );
    }
}
