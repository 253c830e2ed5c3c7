//! Resource handle identity.
//!
//! A [`ResourceHandle`] is an opaque identity for a buffer, texture, or other
//! GPU-side object. It is intentionally small and `Copy` — handles are
//! compared, hashed, and threaded through the compiler by value, never by
//! reference, and packed with enough bits to detect cross-frame misuse of
//! transient handles without a side lookup.

use std::fmt;

/// What kind of GPU object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResourceKind {
    Buffer = 0,
    Texture = 1,
    ArgumentBuffer = 2,
    ArgumentBufferArray = 3,
    Heap = 4,
    Sampler = 5,
    AccelerationStructure = 6,
    VisibleFunctionTable = 7,
    IntersectionFunctionTable = 8,
}

/// Whether a resource lives across frames or only within the frame that
/// created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Lifetime {
    /// Lives across frames; client-owned, materialised by the backend on
    /// first use.
    Persistent = 0,
    /// Valid only for the frame that allocated it.
    Transient = 1,
}

/// Opaque identity for a GPU resource.
///
/// Two handles are equal iff `kind`, `lifetime`, `registry_index`,
/// `generation`, and `index` all match (spec §3 "Resource handle").
///
/// - `index` densely addresses per-kind side-tables (C9's transient side and
///   the row within a persistent chunk).
/// - `registry_index` is the frame-graph slot that allocated a *transient*
///   handle; for persistent handles it is always `0`. Using a transient
///   handle whose `registry_index` does not match the currently compiling
///   frame's slot is a programmer error, detected at dependency-table
///   construction time (§4.5) — see `TransientRegistry::validate_handle`.
/// - `generation` is bumped every time a registry slot is reused, so a stale
///   handle captured before a `dispose`+reallocate cannot alias the new
///   occupant.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub lifetime: Lifetime,
    pub registry_index: u32,
    pub generation: u32,
    pub index: u32,
}

impl ResourceHandle {
    #[must_use]
    pub fn new(
        kind: ResourceKind,
        lifetime: Lifetime,
        registry_index: u32,
        generation: u32,
        index: u32,
    ) -> Self {
        Self {
            kind,
            lifetime,
            registry_index,
            generation,
            index,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.lifetime, Lifetime::Persistent)
    }

    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.lifetime, Lifetime::Transient)
    }

    /// Packs the handle into a 64-bit opaque identity, as described by spec
    /// §3. Layout (MSB to LSB): kind:4 | lifetime:1 | generation:11 |
    /// registry_index:16 | index:32.
    #[must_use]
    pub fn to_bits(self) -> u64 {
        let kind = (self.kind as u64) & 0xF;
        let lifetime = (self.lifetime as u64) & 0x1;
        let generation = u64::from(self.generation) & 0x7FF;
        let registry_index = u64::from(self.registry_index) & 0xFFFF;
        let index = u64::from(self.index);
        (kind << 60) | (lifetime << 59) | (generation << 48) | (registry_index << 32) | index
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &self.kind)
            .field("lifetime", &self.lifetime)
            .field("registry_index", &self.registry_index)
            .field("generation", &self.generation)
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_all_fields_to_match() {
        let a = ResourceHandle::new(ResourceKind::Texture, Lifetime::Persistent, 0, 3, 7);
        let b = ResourceHandle::new(ResourceKind::Texture, Lifetime::Persistent, 0, 3, 7);
        let c = ResourceHandle::new(ResourceKind::Texture, Lifetime::Persistent, 0, 4, 7);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn bit_packing_round_trips_through_masked_fields() {
        let h = ResourceHandle::new(ResourceKind::Buffer, Lifetime::Transient, 12, 5, 99);
        let bits = h.to_bits();
        assert_eq!((bits >> 60) & 0xF, ResourceKind::Buffer as u64);
        assert_eq!((bits >> 59) & 0x1, Lifetime::Transient as u64);
        assert_eq!((bits >> 32) & 0xFFFF, 12);
        assert_eq!(bits & 0xFFFF_FFFF, 99);
    }
}
