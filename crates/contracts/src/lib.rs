//! Cross-boundary value types for the claim engine: ids, positions, areas,
//! claims, partitions, player state, permission/flag enumerations, and the
//! policy configuration object.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ClaimId = Uuid;
pub type PartitionId = Uuid;
pub type PlayerId = Uuid;
pub type TeamId = Uuid;
pub type WorldId = Uuid;

/// Longest permitted claim name, in characters.
pub const MAX_NAME_LENGTH: usize = 50;
/// Longest permitted claim description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

// ---------------------------------------------------------------------------
// Positions and areas
// ---------------------------------------------------------------------------

/// A horizontal block coordinate (the footprint plane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position2D {
    pub x: i32,
    pub z: i32,
}

impl Position2D {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// A full block coordinate. Only `x` and `z` participate in footprint
/// geometry; `y` is carried for the physical anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position3D {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Projection onto the footprint plane.
    pub fn ground(&self) -> Position2D {
        Position2D {
            x: self.x,
            z: self.z,
        }
    }
}

impl fmt::Display for Position3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// An axis-aligned rectangle of blocks, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub lower: Position2D,
    pub upper: Position2D,
}

impl Area {
    /// Build an area from any two opposing corners; corners are normalized so
    /// that `lower` holds the minima and `upper` the maxima.
    pub fn new(a: Position2D, b: Position2D) -> Self {
        Self {
            lower: Position2D::new(a.x.min(b.x), a.z.min(b.z)),
            upper: Position2D::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    /// Extent along x, in blocks. Computed in i64 so corner coordinates may
    /// span the whole i32 domain.
    pub fn width(&self) -> u64 {
        (self.upper.x as i64 - self.lower.x as i64) as u64 + 1
    }

    /// Extent along z, in blocks.
    pub fn depth(&self) -> u64 {
        (self.upper.z as i64 - self.lower.z as i64) as u64 + 1
    }

    /// Footprint block count (width × depth). Height never counts toward the
    /// block budget.
    pub fn block_count(&self) -> u64 {
        self.width() * self.depth()
    }
}

// ---------------------------------------------------------------------------
// Claims and partitions
// ---------------------------------------------------------------------------

/// The owner of a claim: exactly one player or one team, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOwner {
    Player(PlayerId),
    Team(TeamId),
}

impl ClaimOwner {
    pub fn is_player(&self, player_id: PlayerId) -> bool {
        matches!(self, ClaimOwner::Player(id) if *id == player_id)
    }

    pub fn is_team(&self) -> bool {
        matches!(self, ClaimOwner::Team(_))
    }
}

/// A named, owned protected region anchored at a fixed point. Its shape is
/// defined entirely by its partitions; the claim itself carries only the
/// anchor position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub world_id: WorldId,
    pub owner: ClaimOwner,
    pub name: String,
    pub description: String,
    pub anchor: Position3D,
    pub icon: String,
    pub creation_time: DateTime<Utc>,
    /// Remaining anchor breaks before destruction.
    pub break_count: u32,
    /// Pending ownership-transfer offers: candidate player -> expiry.
    pub transfer_requests: BTreeMap<PlayerId, DateTime<Utc>>,
}

impl Claim {
    /// Compile a new claim from the minimum details. `initial_break_count`
    /// comes from policy configuration.
    pub fn new(
        world_id: WorldId,
        owner: ClaimOwner,
        name: impl Into<String>,
        anchor: Position3D,
        creation_time: DateTime<Utc>,
        initial_break_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            world_id,
            owner,
            name: name.into(),
            description: String::new(),
            anchor,
            icon: "bell".to_string(),
            creation_time,
            break_count: initial_break_count,
            transfer_requests: BTreeMap::new(),
        }
    }
}

/// An axis-aligned rectangular sub-region of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub id: PartitionId,
    pub claim_id: ClaimId,
    pub area: Area,
}

impl Partition {
    pub fn new(claim_id: ClaimId, area: Area) -> Self {
        Self {
            id: Uuid::new_v4(),
            claim_id,
            area,
        }
    }
}

/// Per-player session state. Created lazily on first access; session cleanup
/// belongs to the host, never to the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    /// Admin bypass: when set, every claim permission check passes.
    pub claim_override: bool,
    /// Ephemeral UI pointer to the claim menu the player has open.
    pub in_claim_menu: Option<ClaimId>,
}

impl PlayerState {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            claim_override: false,
            in_claim_menu: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Permissions, flags, and actions
// ---------------------------------------------------------------------------

/// A grantable category of in-claim activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPermission {
    Build,
    Harvest,
    Container,
    Display,
    Vehicle,
    Sign,
    Redstone,
    Door,
    Trade,
    Husbandry,
    Detonate,
    Event,
    Sleep,
    View,
}

impl ClaimPermission {
    pub const ALL: [ClaimPermission; 14] = [
        ClaimPermission::Build,
        ClaimPermission::Harvest,
        ClaimPermission::Container,
        ClaimPermission::Display,
        ClaimPermission::Vehicle,
        ClaimPermission::Sign,
        ClaimPermission::Redstone,
        ClaimPermission::Door,
        ClaimPermission::Trade,
        ClaimPermission::Husbandry,
        ClaimPermission::Detonate,
        ClaimPermission::Event,
        ClaimPermission::Sleep,
        ClaimPermission::View,
    ];
}

/// A claim-wide world-behavior toggle. A claim's enabled set is
/// membership-based: a flag is either present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Explosions,
    FireSpread,
    MobGriefing,
    Pistons,
    Fluids,
    TreeGrowth,
    SculkSpread,
    Dispensers,
    Lightning,
    FallingBlocks,
}

impl Flag {
    pub const ALL: [Flag; 10] = [
        Flag::Explosions,
        Flag::FireSpread,
        Flag::MobGriefing,
        Flag::Pistons,
        Flag::Fluids,
        Flag::TreeGrowth,
        Flag::SculkSpread,
        Flag::Dispensers,
        Flag::Lightning,
        Flag::FallingBlocks,
    ];
}

/// A concrete player interaction inside a claim. Every action maps to the
/// permission that governs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    BreakBlock,
    PlaceBlock,
    PlaceFluid,
    FertilizeLand,
    HarvestCrop,
    FertilizeCrop,
    OpenContainer,
    TakeLecternBook,
    ModifyBlock,
    PlaceVehicle,
    DestroyVehicle,
    EditSign,
    DyeSign,
    UseRedstone,
    OpenDoor,
    TradeVillager,
    DamageAnimal,
    InteractWithAnimal,
    DetachLead,
    PrimeTnt,
    DetonateBlock,
    TriggerRaid,
    SleepInBed,
    SetRespawnPoint,
    ViewLecternBook,
}

impl PlayerAction {
    /// The permission governing this action.
    pub fn required_permission(&self) -> ClaimPermission {
        match self {
            PlayerAction::BreakBlock
            | PlayerAction::PlaceBlock
            | PlayerAction::PlaceFluid
            | PlayerAction::FertilizeLand => ClaimPermission::Build,
            PlayerAction::HarvestCrop | PlayerAction::FertilizeCrop => ClaimPermission::Harvest,
            PlayerAction::OpenContainer => ClaimPermission::Container,
            PlayerAction::TakeLecternBook | PlayerAction::ModifyBlock => ClaimPermission::Display,
            PlayerAction::PlaceVehicle | PlayerAction::DestroyVehicle => ClaimPermission::Vehicle,
            PlayerAction::EditSign | PlayerAction::DyeSign => ClaimPermission::Sign,
            PlayerAction::UseRedstone => ClaimPermission::Redstone,
            PlayerAction::OpenDoor => ClaimPermission::Door,
            PlayerAction::TradeVillager => ClaimPermission::Trade,
            PlayerAction::DamageAnimal
            | PlayerAction::InteractWithAnimal
            | PlayerAction::DetachLead => ClaimPermission::Husbandry,
            PlayerAction::PrimeTnt | PlayerAction::DetonateBlock => ClaimPermission::Detonate,
            PlayerAction::TriggerRaid => ClaimPermission::Event,
            PlayerAction::SleepInBed | PlayerAction::SetRespawnPoint => ClaimPermission::Sleep,
            PlayerAction::ViewLecternBook => ClaimPermission::View,
        }
    }
}

/// A world-behavior event occurring inside a claim. Not every world action is
/// governed by a flag; unmapped actions are left to the caller's default
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldAction {
    ExplosionDamage,
    FireSpread,
    MobGriefing,
    PistonExtend,
    FluidFlow,
    TreeGrowth,
    SculkSpread,
    DispenserFire,
    LightningDamage,
    FallingBlockLand,
    PortalCreation,
    CropTrample,
}

impl WorldAction {
    /// The flag governing this action, if any.
    pub fn associated_flag(&self) -> Option<Flag> {
        match self {
            WorldAction::ExplosionDamage => Some(Flag::Explosions),
            WorldAction::FireSpread => Some(Flag::FireSpread),
            WorldAction::MobGriefing => Some(Flag::MobGriefing),
            WorldAction::PistonExtend => Some(Flag::Pistons),
            WorldAction::FluidFlow => Some(Flag::Fluids),
            WorldAction::TreeGrowth => Some(Flag::TreeGrowth),
            WorldAction::SculkSpread => Some(Flag::SculkSpread),
            WorldAction::DispenserFire => Some(Flag::Dispensers),
            WorldAction::LightningDamage => Some(Flag::Lightning),
            WorldAction::FallingBlockLand => Some(Flag::FallingBlocks),
            WorldAction::PortalCreation | WorldAction::CropTrample => None,
        }
    }
}

/// A per-player ACL verdict stored against (claim, player, permission).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Allow,
    Deny,
}

// ---------------------------------------------------------------------------
// Policy configuration
// ---------------------------------------------------------------------------

/// Claim policy knobs, constructed once at startup and passed by reference to
/// every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsConfig {
    /// Fallback per-owner claim count limit.
    pub claim_limit: u32,
    /// Fallback per-owner aggregate block allowance.
    pub claim_block_limit: u64,
    /// Side length of the square partition created alongside a new claim.
    pub initial_claim_size: u32,
    /// Smallest permitted partition footprint, in blocks.
    pub minimum_partition_area: u64,
    /// Required gap, in blocks, between partitions of unrelated claims.
    pub distance_between_claims: u32,
    /// Required distance, in blocks, between a new anchor and the world border.
    pub world_border_margin: u32,
    /// Anchor breaks required to destroy a claim.
    pub initial_break_count: u32,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            claim_limit: 5,
            claim_block_limit: 5_000,
            initial_claim_size: 9,
            minimum_partition_area: 25,
            distance_between_claims: 3,
            world_border_margin: 16,
            initial_break_count: 3,
        }
    }
}

/// Whether a proposed claim name passes validation: non-blank after trimming
/// and at most [`MAX_NAME_LENGTH`] characters.
pub fn is_valid_claim_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_NAME_LENGTH
}

/// Whether a proposed claim description passes validation.
pub fn is_valid_claim_description(description: &str) -> bool {
    description.chars().count() <= MAX_DESCRIPTION_LENGTH
}
