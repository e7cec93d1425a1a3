//! The claim domain engine: geometric validation, claim and partition
//! lifecycle, layered permission resolution, the anchor break countdown, and
//! time-bounded ownership transfers.
//!
//! The engine is storage-agnostic: every component works against the
//! repository traits in [`repo`] and performs no side effects beyond them.
//! All operations are synchronous and receive timestamps from the caller;
//! serialization of concurrent access to one claim/partition/player aggregate
//! is the host's responsibility.

pub mod anchor;
pub mod geometry;
pub mod memory;
pub mod partition;
pub mod permission;
pub mod registry;
pub mod repo;
pub mod transfer;
