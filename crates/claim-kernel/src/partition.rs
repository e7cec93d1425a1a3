//! Partition lifecycle: adding, resizing, and removing the rectangular
//! sub-regions that give a claim its shape. Checks run before any write, so a
//! rejected operation leaves storage exactly as it found it.

use contracts::{Area, Claim, ClaimId, ClaimsConfig, Partition, PartitionId};
use tracing::debug;

use crate::geometry;
use crate::repo::{
    ClaimRepository, PartitionRepository, PlayerMetadataService, StorageError, StorageResult,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum AddPartitionResult {
    Success { claim: Claim, partition: Partition },
    ClaimNotFound,
    Overlaps,
    TooClose,
    Disconnected,
    TooSmall { minimum: u64 },
    InsufficientBlocks { shortfall: u64 },
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResizePartitionResult {
    Success { remaining_blocks: u64 },
    DoesNotExist,
    Overlaps,
    TooClose,
    Disconnected,
    ExposedClaimAnchor,
    TooSmall { minimum: u64 },
    InsufficientBlocks { shortfall: u64 },
    StorageError(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemovePartitionResult {
    Success,
    DoesNotExist,
    Disconnected,
    ExposedClaimAnchor,
    StorageError(StorageError),
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Partition operations over the claim and partition repositories.
pub struct PartitionManager<'a, S: ?Sized> {
    pub store: &'a mut S,
    pub metadata: &'a dyn PlayerMetadataService,
    pub config: &'a ClaimsConfig,
}

impl<'a, S> PartitionManager<'a, S>
where
    S: ClaimRepository + PartitionRepository + ?Sized,
{
    /// Attach a new partition to the claim. The first partition of a claim
    /// skips the connectivity check; later ones must be edge-adjacent to the
    /// existing body.
    pub fn add_partition(&mut self, claim_id: ClaimId, area: Area) -> AddPartitionResult {
        match self.try_add_partition(claim_id, area) {
            Ok(result) => result,
            Err(error) => AddPartitionResult::StorageError(error),
        }
    }

    fn try_add_partition(
        &mut self,
        claim_id: ClaimId,
        area: Area,
    ) -> StorageResult<AddPartitionResult> {
        let Some(claim) = self.store.claim_by_id(claim_id)? else {
            return Ok(AddPartitionResult::ClaimNotFound);
        };

        if let Some(conflict) = self.spatial_conflict(&claim, &area, None)? {
            return Ok(match conflict {
                SpatialConflict::Overlaps => AddPartitionResult::Overlaps,
                SpatialConflict::TooClose => AddPartitionResult::TooClose,
            });
        }

        let own_areas: Vec<_> = self
            .store
            .partitions_by_claim(claim_id)?
            .into_iter()
            .map(|partition| partition.area)
            .collect();
        if !own_areas.is_empty() && !own_areas.iter().any(|own| geometry::adjacent(own, &area)) {
            return Ok(AddPartitionResult::Disconnected);
        }

        let minimum = self.config.minimum_partition_area;
        if geometry::footprint_area(&area) < minimum {
            return Ok(AddPartitionResult::TooSmall { minimum });
        }

        let used = self.blocks_used_by_owner(&claim)?;
        let allowance = self.metadata.block_allowance(&claim.owner);
        let wanted = used + geometry::footprint_area(&area);
        if wanted > allowance {
            return Ok(AddPartitionResult::InsufficientBlocks {
                shortfall: wanted - allowance,
            });
        }

        let partition = Partition::new(claim_id, area);
        self.store.add_partition(&partition)?;
        debug!(claim = %claim_id, partition = %partition.id, "partition added");
        Ok(AddPartitionResult::Success { claim, partition })
    }

    /// Replace a partition's footprint. The replacement must keep the claim
    /// one connected body and keep the anchor enclosed.
    pub fn resize_partition(
        &mut self,
        partition_id: PartitionId,
        new_area: Area,
    ) -> ResizePartitionResult {
        match self.try_resize_partition(partition_id, new_area) {
            Ok(result) => result,
            Err(error) => ResizePartitionResult::StorageError(error),
        }
    }

    fn try_resize_partition(
        &mut self,
        partition_id: PartitionId,
        new_area: Area,
    ) -> StorageResult<ResizePartitionResult> {
        let Some(mut partition) = self.store.partition_by_id(partition_id)? else {
            return Ok(ResizePartitionResult::DoesNotExist);
        };
        let Some(claim) = self.store.claim_by_id(partition.claim_id)? else {
            return Ok(ResizePartitionResult::DoesNotExist);
        };

        if let Some(conflict) = self.spatial_conflict(&claim, &new_area, Some(partition_id))? {
            return Ok(match conflict {
                SpatialConflict::Overlaps => ResizePartitionResult::Overlaps,
                SpatialConflict::TooClose => ResizePartitionResult::TooClose,
            });
        }

        let replaced: Vec<_> = self
            .store
            .partitions_by_claim(claim.id)?
            .into_iter()
            .map(|existing| {
                if existing.id == partition_id {
                    new_area
                } else {
                    existing.area
                }
            })
            .collect();
        if !geometry::is_connected(&replaced) {
            return Ok(ResizePartitionResult::Disconnected);
        }
        if !geometry::anchor_enclosed(&replaced, claim.anchor) {
            return Ok(ResizePartitionResult::ExposedClaimAnchor);
        }

        let minimum = self.config.minimum_partition_area;
        if geometry::footprint_area(&new_area) < minimum {
            return Ok(ResizePartitionResult::TooSmall { minimum });
        }

        let used = self.blocks_used_by_owner(&claim)?;
        let allowance = self.metadata.block_allowance(&claim.owner);
        let wanted = used - geometry::footprint_area(&partition.area)
            + geometry::footprint_area(&new_area);
        if wanted > allowance {
            return Ok(ResizePartitionResult::InsufficientBlocks {
                shortfall: wanted - allowance,
            });
        }

        partition.area = new_area;
        self.store.update_partition(&partition)?;
        debug!(claim = %claim.id, partition = %partition.id, "partition resized");
        Ok(ResizePartitionResult::Success {
            remaining_blocks: allowance - wanted,
        })
    }

    /// Pre-flight check for `remove_partition`; performs no writes.
    pub fn can_remove(&self, partition_id: PartitionId) -> RemovePartitionResult {
        match self.try_can_remove(partition_id) {
            Ok(result) => result,
            Err(error) => RemovePartitionResult::StorageError(error),
        }
    }

    fn try_can_remove(&self, partition_id: PartitionId) -> StorageResult<RemovePartitionResult> {
        let Some(partition) = self.store.partition_by_id(partition_id)? else {
            return Ok(RemovePartitionResult::DoesNotExist);
        };
        let Some(claim) = self.store.claim_by_id(partition.claim_id)? else {
            return Ok(RemovePartitionResult::DoesNotExist);
        };

        let remaining: Vec<_> = self
            .store
            .partitions_by_claim(claim.id)?
            .into_iter()
            .filter(|existing| existing.id != partition_id)
            .map(|existing| existing.area)
            .collect();
        if !geometry::is_connected(&remaining) {
            return Ok(RemovePartitionResult::Disconnected);
        }
        // Claim deletion happens only through anchor destruction, so the
        // last partition can never be removed here.
        if !geometry::anchor_enclosed(&remaining, claim.anchor) {
            return Ok(RemovePartitionResult::ExposedClaimAnchor);
        }

        Ok(RemovePartitionResult::Success)
    }

    pub fn remove_partition(&mut self, partition_id: PartitionId) -> RemovePartitionResult {
        match self.try_remove_partition(partition_id) {
            Ok(result) => result,
            Err(error) => RemovePartitionResult::StorageError(error),
        }
    }

    fn try_remove_partition(
        &mut self,
        partition_id: PartitionId,
    ) -> StorageResult<RemovePartitionResult> {
        match self.try_can_remove(partition_id)? {
            RemovePartitionResult::Success => {}
            failure => return Ok(failure),
        }
        self.store.remove_partition(partition_id)?;
        debug!(partition = %partition_id, "partition removed");
        Ok(RemovePartitionResult::Success)
    }

    // -----------------------------------------------------------------------
    // Shared checks
    // -----------------------------------------------------------------------

    /// Overlap against every partition in the world, proximity against
    /// foreign claims only. `exclude` skips the partition being resized.
    fn spatial_conflict(
        &self,
        claim: &Claim,
        area: &Area,
        exclude: Option<PartitionId>,
    ) -> StorageResult<Option<SpatialConflict>> {
        let buffer = self.config.distance_between_claims;
        for other in self.store.partitions_in_world(claim.world_id)? {
            if exclude == Some(other.id) {
                continue;
            }
            if geometry::overlaps(&other.area, area) {
                return Ok(Some(SpatialConflict::Overlaps));
            }
            if other.claim_id != claim.id && geometry::too_close(&other.area, area, buffer) {
                return Ok(Some(SpatialConflict::TooClose));
            }
        }
        Ok(None)
    }

    /// Aggregate footprint of every claim held by this claim's owner.
    fn blocks_used_by_owner(&self, claim: &Claim) -> StorageResult<u64> {
        let mut used = 0;
        for owned in self.store.claims_by_owner(&claim.owner)? {
            for partition in self.store.partitions_by_claim(owned.id)? {
                used += geometry::footprint_area(&partition.area);
            }
        }
        Ok(used)
    }
}

enum SpatialConflict {
    Overlaps,
    TooClose,
}
