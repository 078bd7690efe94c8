//! `hexrec_memory` is the sparse, byte-addressed memory model shared by every
//! record format: an ordered sequence of non-overlapping, non-touching
//! blocks, with editing operations (`write`, `clear`, `delete`, `fill`,
//! `flood`, `crop`, `shift`, `merge`) and scoped, contiguous views.
//!
//! The block algebra itself (splitting, shifting, coalescing) lives in
//! [`ops`] as plain functions over `(u64, Vec<u8>)` pairs; [`Memory`] is a
//! validated, bound-aware wrapper around them.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

pub mod ops;

use hexrec_errors::{Error, Result};
use ops::RawBlock;

/// Default cap, in bytes, on the span a single `read`/`fill`/`flood` call
/// will materialize. A heuristic safety net against a malformed address
/// accidentally requesting a multi-gigabyte allocation, not a hard
/// specification invariant; see [`Memory::set_size_guard`].
pub const DEFAULT_SIZE_GUARD: u64 = 64 * 1024 * 1024;

/// A contiguous run of bytes starting at `start`, as returned by
/// [`Memory::to_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The block's start address.
    pub start: u64,
    /// The block's bytes.
    pub data: Vec<u8>,
}

impl Block {
    /// The address just past the block's last byte.
    pub fn endex(&self) -> u64 {
        self.start + self.data.len() as u64
    }
}

/// A sparse, byte-addressed memory image.
///
/// Internally, `Memory` keeps an ordered, disjoint, non-touching list of
/// blocks. Every mutator re-establishes this invariant before returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    blocks: Vec<RawBlock>,
    bound: Option<(u64, u64)>,
    size_guard: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Creates an empty memory, with no bound and the default size guard.
    pub fn new() -> Self {
        Self { blocks: Vec::new(), bound: None, size_guard: DEFAULT_SIZE_GUARD }
    }

    /// Creates a memory holding a single block of `data` starting at
    /// `offset`. An empty `data` yields an empty memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>, offset: u64) -> Self {
        let data = data.into();
        let mut memory = Self::new();

        if !data.is_empty() {
            memory.blocks.push((offset, data));
        }

        memory
    }

    /// Creates a memory from a list of blocks, given in any order and
    /// possibly overlapping or touching. Overlaps are resolved by letting
    /// later blocks (in iteration order) win, exactly as repeated calls to
    /// [`Memory::write`] would.
    pub fn from_blocks(blocks: impl IntoIterator<Item = (u64, Vec<u8>)>) -> Self {
        let blocks: Vec<RawBlock> = blocks.into_iter().filter(|(_, data)| !data.is_empty()).collect();

        Self { blocks: ops::normalize(&blocks), bound: None, size_guard: DEFAULT_SIZE_GUARD }
    }

    /// Returns the canonical `[(start, data), …]` list: sorted, disjoint,
    /// non-touching.
    pub fn to_blocks(&self) -> Vec<Block> {
        self.blocks.iter().map(|(start, data)| Block { start: *start, data: data.clone() }).collect()
    }

    /// `true` if the memory has no mapped bytes at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The total number of mapped bytes (not the address span).
    pub fn len(&self) -> u64 {
        self.blocks.iter().map(|(_, data)| data.len() as u64).sum()
    }

    /// The `[start, endex)` address span covered by the lowest and highest
    /// mapped bytes, or `None` if the memory is empty.
    pub fn span(&self) -> Option<(u64, u64)> {
        let first = self.blocks.first()?.0;
        let (last_start, last_data) = self.blocks.last()?;

        Some((first, last_start + last_data.len() as u64))
    }

    /// Sets or clears the explicit `[start, endex)` bound. Subsequent
    /// mutators that would place content outside the bound fail with
    /// [`Error::BoundsViolation`] instead of silently clipping.
    pub fn set_bound(&mut self, bound: Option<(u64, u64)>) {
        self.bound = bound;
    }

    /// The memory's current explicit bound, if any.
    pub fn bound(&self) -> Option<(u64, u64)> {
        self.bound
    }

    /// Overrides the size guard used by [`Memory::read`], [`Memory::fill`],
    /// and [`Memory::flood`]. Pass `u64::MAX` to effectively disable it.
    pub fn set_size_guard(&mut self, size_guard: u64) {
        self.size_guard = size_guard;
    }

    /// The memory's current size guard.
    pub fn size_guard(&self) -> u64 {
        self.size_guard
    }

    fn check_bound(&self, start: u64, endex: u64) -> Result<(), Error> {
        if let Some((bound_start, bound_endex)) = self.bound {
            if start < bound_start || endex > bound_endex {
                return Err(Error::BoundsViolation(start, endex));
            }
        }

        Ok(())
    }

    fn check_size_guard(&self, start: u64, endex: u64) -> Result<(), Error> {
        if endex.saturating_sub(start) > self.size_guard {
            return Err(Error::SizeGuardExceeded(start, endex));
        }

        Ok(())
    }

    /// Replaces bytes at `[address, address + data.len())`, splitting and
    /// overwriting any overlapping blocks; touching result blocks coalesce.
    pub fn write(&mut self, address: u64, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        let endex = address + data.len() as u64;
        self.check_bound(address, endex)?;

        self.blocks = ops::coalesce(&ops::write(&self.blocks, (address, data.to_vec())));
        Ok(())
    }

    /// Inserts `data` at `address`, shifting everything at or after
    /// `address` up by `data.len()`. Unlike [`Memory::write`], nothing is
    /// overwritten.
    pub fn insert(&mut self, address: u64, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }

        if let Some((_, bound_endex)) = self.bound {
            let shifted_endex = self.span().map(|(_, e)| e).unwrap_or(address) + data.len() as u64;

            if shifted_endex > bound_endex {
                return Err(Error::BoundsViolation(address, shifted_endex));
            }
        }

        self.blocks = ops::coalesce(&ops::insert(&self.blocks, (address, data.to_vec())));
        Ok(())
    }

    /// Deletes bytes in `[start, endex)`, splitting blocks as needed. Leaves
    /// a hole; nothing is shifted.
    pub fn clear(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        if start >= endex {
            return Ok(());
        }

        self.blocks = ops::clear(&self.blocks, start, endex);
        Ok(())
    }

    /// Deletes bytes in `[start, endex)` and shifts everything at or after
    /// `endex` down by `endex - start`.
    pub fn delete(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        if start >= endex {
            return Ok(());
        }

        self.blocks = ops::coalesce(&ops::delete(&self.blocks, start, endex));
        Ok(())
    }

    /// Removes all content outside `[start, endex)`.
    pub fn crop(&mut self, start: u64, endex: u64) -> Result<(), Error> {
        let cleared_before = if start > 0 { ops::clear(&self.blocks, 0, start) } else { self.blocks.clone() };
        let cleared_after = ops::clear(&cleared_before, endex, u64::MAX);

        self.blocks = cleared_after;
        Ok(())
    }

    /// Adds `amount` to every block's start address.
    pub fn shift(&mut self, amount: i64) -> Result<(), Error> {
        let shifted = ops::shift(&self.blocks, amount);

        if let Some((bound_start, bound_endex)) = self.bound {
            for (start, data) in &shifted {
                let endex = start + data.len() as u64;

                if *start < bound_start || endex > bound_endex {
                    return Err(Error::BoundsViolation(*start, endex));
                }
            }
        }

        self.blocks = shifted;
        Ok(())
    }

    /// Writes `pattern`, repeated cyclically, across `[start, endex)`,
    /// overwriting any existing content.
    pub fn fill(&mut self, start: u64, endex: u64, pattern: &[u8]) -> Result<(), Error> {
        if start >= endex || pattern.is_empty() {
            return Ok(());
        }

        self.check_bound(start, endex)?;
        self.check_size_guard(start, endex)?;

        let span = (endex - start) as usize;
        let data = repeat_pattern(pattern, span);

        self.blocks = ops::coalesce(&ops::write(&self.blocks, (start, data)));
        Ok(())
    }

    /// Writes `pattern`, repeated cyclically, only into holes within
    /// `[start, endex)`. Existing content is left untouched.
    pub fn flood(&mut self, start: u64, endex: u64, pattern: &[u8]) -> Result<(), Error> {
        if start >= endex || pattern.is_empty() {
            return Ok(());
        }

        self.check_bound(start, endex)?;
        self.check_size_guard(start, endex)?;

        let mut cursor = start;
        let mut holes: Vec<(u64, u64)> = Vec::new();

        for (block_start, block_data) in &self.blocks {
            let block_start = *block_start;
            let block_endex = block_start + block_data.len() as u64;

            if block_endex <= cursor || block_start >= endex {
                continue;
            }

            if cursor < block_start {
                holes.push((cursor, block_start.min(endex)));
            }

            cursor = cursor.max(block_endex);
        }

        if cursor < endex {
            holes.push((cursor, endex));
        }

        for (hole_start, hole_endex) in holes {
            let span = (hole_endex - hole_start) as usize;
            let data = repeat_pattern(pattern, span);

            self.blocks = ops::write(&self.blocks, (hole_start, data));
        }

        self.blocks = ops::coalesce(&self.blocks);
        Ok(())
    }

    /// Overlays `other` onto `self`. Addresses that `other` maps overwrite
    /// `self`'s content there. If `clear` is `true`, the destination range
    /// spanned by `other` is cleared first, so holes in `other` become holes
    /// in `self` rather than leftover `self` content; otherwise holes in
    /// `other` leave `self`'s bytes untouched.
    pub fn merge(&mut self, other: &Memory, clear: bool) -> Result<(), Error> {
        if let Some((other_start, other_endex)) = other.span() {
            self.check_bound(other_start, other_endex)?;

            if clear {
                self.blocks = ops::clear(&self.blocks, other_start, other_endex);
            }
        }

        for (start, data) in &other.blocks {
            self.blocks = ops::write(&self.blocks, (*start, data.clone()));
        }

        self.blocks = ops::coalesce(&self.blocks);
        Ok(())
    }

    /// Returns a read-only, borrowed slice over `[start, endex)`.
    ///
    /// Fails with [`Error::NonContiguousView`] unless the whole range is
    /// covered by a single block; the returned slice's lifetime is tied to
    /// `&self`, so no mutation can happen while the view is alive — this is
    /// the borrow-checker's enforcement of the scoped-view contract.
    pub fn view(&self, start: u64, endex: u64) -> Result<&[u8], Error> {
        if start >= endex {
            return Ok(&[]);
        }

        for (block_start, block_data) in &self.blocks {
            let block_start = *block_start;
            let block_endex = block_start + block_data.len() as u64;

            if block_start <= start && endex <= block_endex {
                let offset = (start - block_start) as usize;
                let length = (endex - start) as usize;

                return Ok(&block_data[offset..offset + length]);
            }
        }

        Err(Error::NonContiguousView(start, endex))
    }

    /// Returns the `endex - start` bytes in `[start, endex)`, substituting
    /// `fill` for any hole. Fails with [`Error::UnfilledHole`] if a hole is
    /// found and `fill` is `None`.
    pub fn read(&self, start: u64, endex: u64, fill: Option<u8>) -> Result<Vec<u8>, Error> {
        if start >= endex {
            return Ok(Vec::new());
        }

        self.check_size_guard(start, endex)?;

        let mut out = vec![fill.unwrap_or(0); (endex - start) as usize];
        let mut covered = vec![false; out.len()];

        for (block_start, block_data) in &self.blocks {
            let block_start = *block_start;
            let block_endex = block_start + block_data.len() as u64;

            let overlap_start = start.max(block_start);
            let overlap_endex = endex.min(block_endex);

            if overlap_start >= overlap_endex {
                continue;
            }

            let dst_offset = (overlap_start - start) as usize;
            let src_offset = (overlap_start - block_start) as usize;
            let length = (overlap_endex - overlap_start) as usize;

            out[dst_offset..dst_offset + length]
                .copy_from_slice(&block_data[src_offset..src_offset + length]);

            for flag in &mut covered[dst_offset..dst_offset + length] {
                *flag = true;
            }
        }

        if fill.is_none() && covered.iter().any(|covered| !covered) {
            return Err(Error::UnfilledHole(start, endex));
        }

        Ok(out)
    }
}

fn repeat_pattern(pattern: &[u8], length: usize) -> Vec<u8> {
    pattern.iter().copied().cycle().take(length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_splits_and_coalesces() {
        let mut memory = Memory::from_blocks([(1, b"ABCD".to_vec()), (6, b"!".to_vec()), (8, b"xy".to_vec())]);

        memory.write(3, b"123456").unwrap();

        assert_eq!(
            memory.to_blocks(),
            vec![
                Block { start: 1, data: b"AB".to_vec() },
                Block { start: 3, data: b"123456".to_vec() },
                Block { start: 9, data: b"y".to_vec() },
            ]
        );
    }

    #[test]
    fn test_clear_then_write_restores_region() {
        let mut memory = Memory::from_bytes(b"Hello, World!".to_vec(), 0);

        memory.clear(0, 5).unwrap();
        memory.write(0, b"HELLO").unwrap();

        assert_eq!(memory.read(0, 13, None).unwrap(), b"HELLO, World!");
    }

    #[test]
    fn test_delete_shortens_and_preserves_suffix() {
        let mut memory = Memory::from_bytes(b"Hello, World!".to_vec(), 0);
        let before = memory.len();

        memory.delete(0, 7).unwrap();

        assert_eq!(memory.len(), before - 7);
        assert_eq!(memory.read(0, 6, None).unwrap(), b"World!");
    }

    #[test]
    fn test_shift_roundtrip_is_identity() {
        let mut memory = Memory::from_bytes(b"ABCD".to_vec(), 100);
        let original = memory.clone();

        memory.shift(42).unwrap();
        memory.shift(-42).unwrap();

        assert_eq!(memory, original);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let mut memory = Memory::from_bytes(b"ABCD".to_vec(), 10);
        let original = memory.clone();

        memory.merge(&Memory::new(), false).unwrap();

        assert_eq!(memory, original);
    }

    #[test]
    fn test_merge_overlay_overwrites() {
        let mut base = Memory::from_bytes(b"AAAAAAAA".to_vec(), 0);
        let overlay = Memory::from_bytes(b"BB".to_vec(), 2);

        base.merge(&overlay, false).unwrap();

        assert_eq!(base.read(0, 8, None).unwrap(), b"AABBAAAA");
    }

    #[test]
    fn test_fill_overwrites_range() {
        let mut memory = Memory::new();

        memory.fill(0, 4, &[0xFF]).unwrap();

        assert_eq!(memory.read(0, 4, None).unwrap(), vec![0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_flood_only_fills_holes() {
        let mut memory = Memory::from_bytes(b"AB".to_vec(), 0);

        memory.flood(0, 4, &[0x00]).unwrap();

        assert_eq!(memory.read(0, 4, None).unwrap(), vec![b'A', b'B', 0x00, 0x00]);
    }

    #[test]
    fn test_crop_removes_outside_content() {
        let mut memory = Memory::from_bytes(b"Hello, World!".to_vec(), 0);

        memory.crop(7, 12).unwrap();

        assert_eq!(memory.to_blocks(), vec![Block { start: 7, data: b"World".to_vec() }]);
    }

    #[test]
    fn test_view_fails_on_hole() {
        let memory = Memory::from_blocks([(0, b"AB".to_vec()), (4, b"CD".to_vec())]);

        assert!(matches!(memory.view(0, 6), Err(Error::NonContiguousView(0, 6))));
        assert_eq!(memory.view(0, 2).unwrap(), b"AB");
    }

    #[test]
    fn test_read_fails_without_fill_on_hole() {
        let memory = Memory::from_bytes(b"AB".to_vec(), 0);

        assert!(matches!(memory.read(0, 4, None), Err(Error::UnfilledHole(0, 4))));
        assert_eq!(memory.read(0, 4, Some(0)).unwrap(), vec![b'A', b'B', 0, 0]);
    }

    #[test]
    fn test_bound_rejects_out_of_range_write() {
        let mut memory = Memory::new();
        memory.set_bound(Some((0, 10)));

        assert!(matches!(memory.write(8, b"ABCD"), Err(Error::BoundsViolation(8, 12))));
        assert!(memory.write(0, b"ABCD").is_ok());
    }

    #[test]
    fn test_size_guard_rejects_wide_read() {
        let memory = Memory::new();

        assert!(matches!(
            memory.read(0, DEFAULT_SIZE_GUARD + 1, Some(0)),
            Err(Error::SizeGuardExceeded(_, _))
        ));
    }
}
