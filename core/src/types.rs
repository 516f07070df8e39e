//! Shared primitive types used across the entire simulation core.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A simulation tick. One tick = one fixed timestep.
pub type Tick = u64;

/// The canonical run identifier.
pub type RunId = String;

/// Per-entity bitset marking which registered types were present at capture.
/// Bit `i` corresponds to the type with stable registry index `i`.
pub type PresenceMask = u64;

/// Hard cap on simultaneously registered snapshot types.
/// Presence masks are 64-bit, so this can never be raised past 64.
pub const MAX_REGISTERED_TYPES: usize = 64;

/// A generational entity handle.
///
/// Two identities are equal iff both slot and generation match.
/// A stale identity (right slot, wrong generation) is never live.
/// Pod so identities can be embedded in snapshot component state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct EntityId {
    pub slot:       u32,
    pub generation: u32,
}

impl EntityId {
    /// Sentinel for "no entity". Never returned by a spawn.
    pub const INVALID: EntityId = EntityId {
        slot:       u32::MAX,
        generation: u32::MAX,
    };

    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}v{}", self.slot, self.generation)
    }
}
