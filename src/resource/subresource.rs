//! Subresource masks (§3 "Subresource mask").
//!
//! A compact representation of "which parts of a resource were touched": a
//! bitset over `(slice, mip)` pairs for a texture, or a sorted disjoint
//! interval list over byte ranges for a buffer. [`SubresourceMask::Full`]
//! denotes the whole resource without enumerating its subresources — the
//! common case for buffers and for textures used without sub-binding.

use smallvec::SmallVec;

/// A bitset over `(slice, mip)` pairs, sized for one texture's dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TextureSubresourceMask {
    mip_levels: u32,
    /// One bit per `(slice, mip)`, packed as `slice * mip_levels + mip`.
    bits: SmallVec<[u64; 2]>,
}

impl TextureSubresourceMask {
    #[must_use]
    pub fn new(array_length: u32, mip_levels: u32) -> Self {
        let total_bits = (array_length * mip_levels) as usize;
        let words = total_bits.div_ceil(64);
        Self {
            mip_levels,
            bits: SmallVec::from_elem(0u64, words),
        }
    }

    fn bit_index(&self, slice: u32, mip: u32) -> usize {
        (slice * self.mip_levels + mip) as usize
    }

    pub fn set(&mut self, slice: u32, mip: u32) {
        let bit = self.bit_index(slice, mip);
        let word = bit / 64;
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1u64 << (bit % 64);
    }

    #[must_use]
    pub fn is_set(&self, slice: u32, mip: u32) -> bool {
        let bit = self.bit_index(slice, mip);
        let word = bit / 64;
        self.bits
            .get(word)
            .is_some_and(|w| (w >> (bit % 64)) & 1 != 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    pub fn union_with(&mut self, other: &Self) {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a |= *b;
        }
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .any(|(a, b)| (a & b) != 0)
    }
}

/// A sorted, disjoint set of `[start, end)` byte ranges.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ByteRangeMask {
    ranges: SmallVec<[(u64, u64); 4]>,
}

impl ByteRangeMask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_range(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        self.ranges.push((start, end));
        self.normalize();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn union_with(&mut self, other: &Self) {
        self.ranges.extend(other.ranges.iter().copied());
        self.normalize();
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        for &(a0, a1) in &self.ranges {
            for &(b0, b1) in &other.ranges {
                if a0 < b1 && b0 < a1 {
                    return true;
                }
            }
        }
        false
    }

    fn normalize(&mut self) {
        if self.ranges.is_empty() {
            return;
        }
        self.ranges.sort_unstable_by_key(|r| r.0);
        let mut merged: SmallVec<[(u64, u64); 4]> = SmallVec::new();
        for &(start, end) in &self.ranges {
            if let Some(last) = merged.last_mut() {
                if start <= last.1 {
                    last.1 = last.1.max(end);
                    continue;
                }
            }
            merged.push((start, end));
        }
        self.ranges = merged;
    }
}

/// Which part of a resource a usage touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubresourceMask {
    /// Every subresource — `fullResource` in spec terms.
    Full,
    Texture(TextureSubresourceMask),
    Buffer(ByteRangeMask),
}

impl SubresourceMask {
    #[must_use]
    pub fn full() -> Self {
        Self::Full
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Full => false,
            Self::Texture(m) => m.is_empty(),
            Self::Buffer(m) => m.is_empty(),
        }
    }

    /// Merges `other` into `self` in place.
    ///
    /// `Full` absorbs anything; unioning two same-shaped masks merges bit by
    /// bit / range by range; mismatched variants (a programmer error — e.g.
    /// comparing a texture mask against a buffer mask) degrade to `Full` so
    /// that conservative synchronisation still holds.
    pub fn union_with(&mut self, other: &Self) {
        match (&mut *self, other) {
            (Self::Full, _) => {}
            (_, Self::Full) => *self = Self::Full,
            (Self::Texture(a), Self::Texture(b)) => a.union_with(b),
            (Self::Buffer(a), Self::Buffer(b)) => a.union_with(b),
            _ => *self = Self::Full,
        }
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Full, _) | (_, Self::Full) => true,
            (Self::Texture(a), Self::Texture(b)) => a.intersects(b),
            (Self::Buffer(a), Self::Buffer(b)) => a.intersects(b),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_mask_set_is_set_round_trip() {
        let mut m = TextureSubresourceMask::new(4, 8);
        assert!(!m.is_set(2, 3));
        m.set(2, 3);
        assert!(m.is_set(2, 3));
        assert!(!m.is_set(2, 4));
    }

    #[test]
    fn texture_mask_union_and_intersects() {
        let mut a = TextureSubresourceMask::new(2, 4);
        a.set(0, 0);
        let mut b = TextureSubresourceMask::new(2, 4);
        b.set(1, 1);
        assert!(!a.intersects(&b));
        a.union_with(&b);
        assert!(a.is_set(0, 0));
        assert!(a.is_set(1, 1));
        assert!(a.intersects(&b));
    }

    #[test]
    fn byte_range_mask_merges_overlapping_ranges() {
        let mut m = ByteRangeMask::new();
        m.set_range(0, 10);
        m.set_range(8, 20);
        assert_eq!(m.ranges.as_slice(), &[(0, 20)]);
    }

    #[test]
    fn full_absorbs_everything() {
        let mut full = SubresourceMask::full();
        let tex = SubresourceMask::Texture(TextureSubresourceMask::new(1, 1));
        full.union_with(&tex);
        assert_eq!(full, SubresourceMask::Full);
        assert!(full.intersects(&tex));
    }
}
