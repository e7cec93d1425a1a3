//! Durable storage for the claim kernel: one [`SqliteStore`] implementing
//! every repository trait over a single rusqlite connection. The schema is
//! migrated on open; child tables cascade on claim deletion, mirroring the
//! ordered removal the kernel issues itself.
//!
//! Every rusqlite or serde failure is converted to [`StorageError`] at the
//! trait boundary with a warning; nothing is retried.

use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Utc};
use contracts::{
    AccessLevel, Area, Claim, ClaimId, ClaimOwner, ClaimPermission, Flag, Partition, PartitionId,
    PlayerId, PlayerState, Position2D, Position3D, WorldId,
};
use claim_kernel::repo::{
    ClaimFlagRepository, ClaimPermissionRepository, ClaimRepository, PartitionRepository,
    PlayerAccessRepository, PlayerStateRepository, StorageError, StorageResult,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;
use uuid::Uuid;

const CLAIM_COLUMNS: &str = "id, world_id, owner_kind, owner_id, name, description, \
     anchor_x, anchor_y, anchor_z, icon, creation_time, break_count, transfer_requests_json";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::prepare(conn)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> StorageResult<Self> {
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&mut self) -> StorageResult<()> {
        self.conn
            .pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        self.conn
            .pragma_update(None, "foreign_keys", "ON")
            .map_err(db_err)?;
        Ok(())
    }

    fn migrate(&mut self) -> StorageResult<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS schema_migrations (
                    version INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    applied_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS claims (
                    id TEXT PRIMARY KEY,
                    world_id TEXT NOT NULL,
                    owner_kind TEXT NOT NULL,
                    owner_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    anchor_x INTEGER NOT NULL,
                    anchor_y INTEGER NOT NULL,
                    anchor_z INTEGER NOT NULL,
                    icon TEXT NOT NULL,
                    creation_time TEXT NOT NULL,
                    break_count INTEGER NOT NULL,
                    transfer_requests_json TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS partitions (
                    id TEXT PRIMARY KEY,
                    claim_id TEXT NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
                    lower_x INTEGER NOT NULL,
                    lower_z INTEGER NOT NULL,
                    upper_x INTEGER NOT NULL,
                    upper_z INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS claim_flags (
                    claim_id TEXT NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
                    flag TEXT NOT NULL,
                    PRIMARY KEY (claim_id, flag)
                );

                CREATE TABLE IF NOT EXISTS claim_permissions (
                    claim_id TEXT NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
                    permission TEXT NOT NULL,
                    PRIMARY KEY (claim_id, permission)
                );

                CREATE TABLE IF NOT EXISTS player_accesses (
                    claim_id TEXT NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
                    player_id TEXT NOT NULL,
                    permission TEXT NOT NULL,
                    level TEXT NOT NULL,
                    PRIMARY KEY (claim_id, player_id, permission)
                );

                CREATE TABLE IF NOT EXISTS player_states (
                    player_id TEXT PRIMARY KEY,
                    claim_override INTEGER NOT NULL,
                    in_claim_menu TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_claims_world ON claims(world_id);
                CREATE INDEX IF NOT EXISTS idx_claims_owner ON claims(owner_kind, owner_id);
                CREATE INDEX IF NOT EXISTS idx_partitions_claim ON partitions(claim_id);
                CREATE INDEX IF NOT EXISTS idx_accesses_claim_player
                    ON player_accesses(claim_id, player_id);
                ",
            )
            .map_err(db_err)?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
                 VALUES(1, 'initial_v1', ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;

        Ok(())
    }

    fn claims_where(
        &self,
        condition: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<Claim>> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE {condition}");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt.query_map(bind, read_raw_claim).map_err(db_err)?;

        let mut claims = Vec::new();
        for row in rows {
            claims.push(claim_from_raw(row.map_err(db_err)?)?);
        }
        Ok(claims)
    }

    fn claim_where(
        &self,
        condition: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Option<Claim>> {
        Ok(self.claims_where(condition, bind)?.into_iter().next())
    }
}

impl ClaimRepository for SqliteStore {
    fn claim_by_id(&self, id: ClaimId) -> StorageResult<Option<Claim>> {
        self.claim_where("id = ?1", &[&id.to_string()])
    }

    fn claims_by_owner(&self, owner: &ClaimOwner) -> StorageResult<Vec<Claim>> {
        let (kind, owner_id) = owner_columns(owner);
        self.claims_where("owner_kind = ?1 AND owner_id = ?2", &[&kind, &owner_id])
    }

    fn claims_by_player(&self, player: PlayerId) -> StorageResult<Vec<Claim>> {
        self.claims_where(
            "owner_kind = 'player' AND owner_id = ?1",
            &[&player.to_string()],
        )
    }

    fn claim_by_name(&self, owner: &ClaimOwner, name: &str) -> StorageResult<Option<Claim>> {
        let (kind, owner_id) = owner_columns(owner);
        self.claim_where(
            "owner_kind = ?1 AND owner_id = ?2 AND name = ?3",
            &[&kind, &owner_id, &name],
        )
    }

    fn claim_by_anchor(&self, world: WorldId, anchor: Position3D) -> StorageResult<Option<Claim>> {
        self.claim_where(
            "world_id = ?1 AND anchor_x = ?2 AND anchor_y = ?3 AND anchor_z = ?4",
            &[&world.to_string(), &anchor.x, &anchor.y, &anchor.z],
        )
    }

    fn add_claim(&mut self, claim: &Claim) -> StorageResult<()> {
        let (kind, owner_id) = owner_columns(&claim.owner);
        let transfer_requests =
            serde_json::to_string(&claim.transfer_requests).map_err(db_err)?;
        self.conn
            .execute(
                "INSERT INTO claims (
                    id, world_id, owner_kind, owner_id, name, description,
                    anchor_x, anchor_y, anchor_z, icon, creation_time,
                    break_count, transfer_requests_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    claim.id.to_string(),
                    claim.world_id.to_string(),
                    kind,
                    owner_id,
                    claim.name,
                    claim.description,
                    claim.anchor.x,
                    claim.anchor.y,
                    claim.anchor.z,
                    claim.icon,
                    claim.creation_time.to_rfc3339(),
                    i64::from(claim.break_count),
                    transfer_requests,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn update_claim(&mut self, claim: &Claim) -> StorageResult<()> {
        let (kind, owner_id) = owner_columns(&claim.owner);
        let transfer_requests =
            serde_json::to_string(&claim.transfer_requests).map_err(db_err)?;
        let changed = self
            .conn
            .execute(
                "UPDATE claims SET
                    world_id = ?2, owner_kind = ?3, owner_id = ?4, name = ?5,
                    description = ?6, anchor_x = ?7, anchor_y = ?8, anchor_z = ?9,
                    icon = ?10, creation_time = ?11, break_count = ?12,
                    transfer_requests_json = ?13
                 WHERE id = ?1",
                params![
                    claim.id.to_string(),
                    claim.world_id.to_string(),
                    kind,
                    owner_id,
                    claim.name,
                    claim.description,
                    claim.anchor.x,
                    claim.anchor.y,
                    claim.anchor.z,
                    claim.icon,
                    claim.creation_time.to_rfc3339(),
                    i64::from(claim.break_count),
                    transfer_requests,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StorageError(format!("unknown claim {}", claim.id)));
        }
        Ok(())
    }

    fn remove_claim(&mut self, id: ClaimId) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM claims WHERE id = ?1", params![id.to_string()])
            .map_err(db_err)?;
        Ok(())
    }
}

impl PartitionRepository for SqliteStore {
    fn partition_by_id(&self, id: PartitionId) -> StorageResult<Option<Partition>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, claim_id, lower_x, lower_z, upper_x, upper_z
                 FROM partitions WHERE id = ?1",
                params![id.to_string()],
                read_raw_partition,
            )
            .optional()
            .map_err(db_err)?;
        raw.map(partition_from_raw).transpose()
    }

    fn partitions_by_claim(&self, claim: ClaimId) -> StorageResult<Vec<Partition>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, claim_id, lower_x, lower_z, upper_x, upper_z
                 FROM partitions WHERE claim_id = ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![claim.to_string()], read_raw_partition)
            .map_err(db_err)?;

        let mut partitions = Vec::new();
        for row in rows {
            partitions.push(partition_from_raw(row.map_err(db_err)?)?);
        }
        Ok(partitions)
    }

    fn partitions_in_world(&self, world: WorldId) -> StorageResult<Vec<Partition>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.id, p.claim_id, p.lower_x, p.lower_z, p.upper_x, p.upper_z
                 FROM partitions p JOIN claims c ON c.id = p.claim_id
                 WHERE c.world_id = ?1",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![world.to_string()], read_raw_partition)
            .map_err(db_err)?;

        let mut partitions = Vec::new();
        for row in rows {
            partitions.push(partition_from_raw(row.map_err(db_err)?)?);
        }
        Ok(partitions)
    }

    fn partition_at_position(
        &self,
        world: WorldId,
        position: Position2D,
    ) -> StorageResult<Option<Partition>> {
        let raw = self
            .conn
            .query_row(
                "SELECT p.id, p.claim_id, p.lower_x, p.lower_z, p.upper_x, p.upper_z
                 FROM partitions p JOIN claims c ON c.id = p.claim_id
                 WHERE c.world_id = ?1
                   AND p.lower_x <= ?2 AND ?2 <= p.upper_x
                   AND p.lower_z <= ?3 AND ?3 <= p.upper_z
                 LIMIT 1",
                params![world.to_string(), position.x, position.z],
                read_raw_partition,
            )
            .optional()
            .map_err(db_err)?;
        raw.map(partition_from_raw).transpose()
    }

    fn add_partition(&mut self, partition: &Partition) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT INTO partitions (id, claim_id, lower_x, lower_z, upper_x, upper_z)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    partition.id.to_string(),
                    partition.claim_id.to_string(),
                    partition.area.lower.x,
                    partition.area.lower.z,
                    partition.area.upper.x,
                    partition.area.upper.z,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn update_partition(&mut self, partition: &Partition) -> StorageResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE partitions SET
                    claim_id = ?2, lower_x = ?3, lower_z = ?4, upper_x = ?5, upper_z = ?6
                 WHERE id = ?1",
                params![
                    partition.id.to_string(),
                    partition.claim_id.to_string(),
                    partition.area.lower.x,
                    partition.area.lower.z,
                    partition.area.upper.x,
                    partition.area.upper.z,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StorageError(format!("unknown partition {}", partition.id)));
        }
        Ok(())
    }

    fn remove_partition(&mut self, id: PartitionId) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM partitions WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn remove_partitions_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM partitions WHERE claim_id = ?1",
                params![claim.to_string()],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

impl ClaimFlagRepository for SqliteStore {
    fn is_flag_enabled(&self, claim: ClaimId, flag: Flag) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM claim_flags WHERE claim_id = ?1 AND flag = ?2",
                params![claim.to_string(), enum_to_text(&flag)?],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn enabled_flags(&self, claim: ClaimId) -> StorageResult<Vec<Flag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT flag FROM claim_flags WHERE claim_id = ?1 ORDER BY flag")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![claim.to_string()], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut flags = Vec::new();
        for row in rows {
            flags.push(enum_from_text(&row.map_err(db_err)?)?);
        }
        Ok(flags)
    }

    fn enable_flag(&mut self, claim: ClaimId, flag: Flag) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO claim_flags (claim_id, flag) VALUES (?1, ?2)",
                params![claim.to_string(), enum_to_text(&flag)?],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn disable_flag(&mut self, claim: ClaimId, flag: Flag) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM claim_flags WHERE claim_id = ?1 AND flag = ?2",
                params![claim.to_string(), enum_to_text(&flag)?],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn remove_flags_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM claim_flags WHERE claim_id = ?1",
                params![claim.to_string()],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

impl ClaimPermissionRepository for SqliteStore {
    fn has_claim_permission(
        &self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM claim_permissions WHERE claim_id = ?1 AND permission = ?2",
                params![claim.to_string(), enum_to_text(&permission)?],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn claim_permissions(&self, claim: ClaimId) -> StorageResult<Vec<ClaimPermission>> {
        let mut stmt = self
            .conn
            .prepare("SELECT permission FROM claim_permissions WHERE claim_id = ?1 ORDER BY permission")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![claim.to_string()], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut permissions = Vec::new();
        for row in rows {
            permissions.push(enum_from_text(&row.map_err(db_err)?)?);
        }
        Ok(permissions)
    }

    fn add_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO claim_permissions (claim_id, permission) VALUES (?1, ?2)",
                params![claim.to_string(), enum_to_text(&permission)?],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn remove_claim_permission(
        &mut self,
        claim: ClaimId,
        permission: ClaimPermission,
    ) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM claim_permissions WHERE claim_id = ?1 AND permission = ?2",
                params![claim.to_string(), enum_to_text(&permission)?],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn remove_claim_permissions_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM claim_permissions WHERE claim_id = ?1",
                params![claim.to_string()],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

impl PlayerAccessRepository for SqliteStore {
    fn player_access(
        &self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> StorageResult<Option<AccessLevel>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT level FROM player_accesses
                 WHERE claim_id = ?1 AND player_id = ?2 AND permission = ?3",
                params![
                    claim.to_string(),
                    player.to_string(),
                    enum_to_text(&permission)?
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        raw.map(|level| enum_from_text(&level)).transpose()
    }

    fn player_accesses(
        &self,
        claim: ClaimId,
        player: PlayerId,
    ) -> StorageResult<Vec<(ClaimPermission, AccessLevel)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT permission, level FROM player_accesses
                 WHERE claim_id = ?1 AND player_id = ?2 ORDER BY permission",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![claim.to_string(), player.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (permission, level) = row.map_err(db_err)?;
            entries.push((enum_from_text(&permission)?, enum_from_text(&level)?));
        }
        Ok(entries)
    }

    fn set_player_access(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
        level: AccessLevel,
    ) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT INTO player_accesses (claim_id, player_id, permission, level)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(claim_id, player_id, permission)
                 DO UPDATE SET level = excluded.level",
                params![
                    claim.to_string(),
                    player.to_string(),
                    enum_to_text(&permission)?,
                    enum_to_text(&level)?
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn clear_player_access(
        &mut self,
        claim: ClaimId,
        player: PlayerId,
        permission: ClaimPermission,
    ) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM player_accesses
                 WHERE claim_id = ?1 AND player_id = ?2 AND permission = ?3",
                params![
                    claim.to_string(),
                    player.to_string(),
                    enum_to_text(&permission)?
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn remove_accesses_by_claim(&mut self, claim: ClaimId) -> StorageResult<()> {
        self.conn
            .execute(
                "DELETE FROM player_accesses WHERE claim_id = ?1",
                params![claim.to_string()],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

impl PlayerStateRepository for SqliteStore {
    fn player_state(&self, player: PlayerId) -> StorageResult<Option<PlayerState>> {
        let raw = self
            .conn
            .query_row(
                "SELECT player_id, claim_override, in_claim_menu
                 FROM player_states WHERE player_id = ?1",
                params![player.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        let Some((player_id, claim_override, in_claim_menu)) = raw else {
            return Ok(None);
        };
        Ok(Some(PlayerState {
            player_id: parse_uuid(&player_id)?,
            claim_override: claim_override != 0,
            in_claim_menu: in_claim_menu.as_deref().map(parse_uuid).transpose()?,
        }))
    }

    fn get_or_create_player_state(&mut self, player: PlayerId) -> StorageResult<PlayerState> {
        if let Some(state) = self.player_state(player)? {
            return Ok(state);
        }
        let state = PlayerState::new(player);
        self.update_player_state(&state)?;
        Ok(state)
    }

    fn update_player_state(&mut self, state: &PlayerState) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT INTO player_states (player_id, claim_override, in_claim_menu)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(player_id) DO UPDATE SET
                    claim_override = excluded.claim_override,
                    in_claim_menu = excluded.in_claim_menu",
                params![
                    state.player_id.to_string(),
                    if state.claim_override { 1_i64 } else { 0_i64 },
                    state.in_claim_menu.map(|id| id.to_string()),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct RawClaim {
    id: String,
    world_id: String,
    owner_kind: String,
    owner_id: String,
    name: String,
    description: String,
    anchor_x: i32,
    anchor_y: i32,
    anchor_z: i32,
    icon: String,
    creation_time: String,
    break_count: i64,
    transfer_requests_json: String,
}

fn read_raw_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawClaim> {
    Ok(RawClaim {
        id: row.get(0)?,
        world_id: row.get(1)?,
        owner_kind: row.get(2)?,
        owner_id: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        anchor_x: row.get(6)?,
        anchor_y: row.get(7)?,
        anchor_z: row.get(8)?,
        icon: row.get(9)?,
        creation_time: row.get(10)?,
        break_count: row.get(11)?,
        transfer_requests_json: row.get(12)?,
    })
}

fn claim_from_raw(raw: RawClaim) -> StorageResult<Claim> {
    let owner_id = parse_uuid(&raw.owner_id)?;
    let owner = match raw.owner_kind.as_str() {
        "player" => ClaimOwner::Player(owner_id),
        "team" => ClaimOwner::Team(owner_id),
        other => return Err(db_err(format!("unknown owner kind '{other}'"))),
    };
    let creation_time = DateTime::parse_from_rfc3339(&raw.creation_time)
        .map_err(db_err)?
        .with_timezone(&Utc);
    let transfer_requests =
        serde_json::from_str(&raw.transfer_requests_json).map_err(db_err)?;

    Ok(Claim {
        id: parse_uuid(&raw.id)?,
        world_id: parse_uuid(&raw.world_id)?,
        owner,
        name: raw.name,
        description: raw.description,
        anchor: Position3D::new(raw.anchor_x, raw.anchor_y, raw.anchor_z),
        icon: raw.icon,
        creation_time,
        break_count: u32::try_from(raw.break_count).map_err(db_err)?,
        transfer_requests,
    })
}

type RawPartition = (String, String, i32, i32, i32, i32);

fn read_raw_partition(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPartition> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn partition_from_raw(raw: RawPartition) -> StorageResult<Partition> {
    let (id, claim_id, lower_x, lower_z, upper_x, upper_z) = raw;
    Ok(Partition {
        id: parse_uuid(&id)?,
        claim_id: parse_uuid(&claim_id)?,
        area: Area::new(
            Position2D::new(lower_x, lower_z),
            Position2D::new(upper_x, upper_z),
        ),
    })
}

fn owner_columns(owner: &ClaimOwner) -> (&'static str, String) {
    match owner {
        ClaimOwner::Player(id) => ("player", id.to_string()),
        ClaimOwner::Team(id) => ("team", id.to_string()),
    }
}

fn enum_to_text<T: serde::Serialize>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)
        .map_err(db_err)?
        .trim_matches('"')
        .to_string())
}

fn enum_from_text<T: serde::de::DeserializeOwned>(raw: &str) -> StorageResult<T> {
    serde_json::from_str(&format!("\"{raw}\"")).map_err(db_err)
}

fn parse_uuid(raw: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(raw).map_err(db_err)
}

fn db_err(error: impl Display) -> StorageError {
    warn!(%error, "storage operation failed");
    StorageError(error.to_string())
}
