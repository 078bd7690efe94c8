//! Free functions operating directly on a block list.
//!
//! These mirror the algebra of the historic `blocks.py` operators (shift,
//! clear, delete, insert, write, merge-touching): each takes an ordered,
//! disjoint, non-touching block list and returns a new one that still
//! satisfies the invariant. [`Memory`][crate::Memory] is a thin, validated
//! wrapper around these.

/// One contiguous run of bytes starting at `start`.
pub type RawBlock = (u64, Vec<u8>);

fn endex_of(block: &RawBlock) -> u64 {
    block.0 + block.1.len() as u64
}

/// Shifts every block's start address by `amount`, preserving content and
/// order.
///
/// ```text
/// [A B C D]      [x y z]        ->    [A B C D]   [x y z]
///      1 2 3 4 5 6 7 8 9                0 1 2 3       6 7 8
/// ```
pub fn shift(blocks: &[RawBlock], amount: i64) -> Vec<RawBlock> {
    blocks
        .iter()
        .map(|(start, data)| {
            let shifted = if amount >= 0 {
                start.wrapping_add(amount as u64)
            } else {
                start.wrapping_sub((-amount) as u64)
            };

            (shifted, data.clone())
        })
        .collect()
}

/// Deletes all bytes within `[range_start, range_endex)`, splitting blocks as
/// needed. Addresses of surviving bytes are **not** shifted: the deleted
/// range becomes a hole.
pub fn clear(blocks: &[RawBlock], range_start: u64, range_endex: u64) -> Vec<RawBlock> {
    let mut result = Vec::with_capacity(blocks.len());

    for (start, data) in blocks {
        let start = *start;
        let endex = endex_of(&(start, data.clone()));

        if range_start <= start && endex <= range_endex {
            // Fully deleted.
        } else if start < range_start && range_start < range_endex && range_endex < endex {
            result.push((start, data[..(range_start - start) as usize].to_vec()));
            result.push((range_endex, data[(range_endex - start) as usize..].to_vec()));
        } else if start < range_start && range_start < endex && endex <= range_endex {
            result.push((start, data[..(range_start - start) as usize].to_vec()));
        } else if range_start <= start && start < range_endex && range_endex < endex {
            result.push((range_endex, data[(range_endex - start) as usize..].to_vec()));
        } else {
            result.push((start, data.clone()));
        }
    }

    result
}

/// Deletes all bytes within `[range_start, range_endex)` and shifts every
/// byte at or after `range_endex` down by `range_endex - range_start`.
pub fn delete(blocks: &[RawBlock], range_start: u64, range_endex: u64) -> Vec<RawBlock> {
    let span = range_endex - range_start;
    let mut result = Vec::with_capacity(blocks.len());

    for (start, data) in blocks {
        let start = *start;
        let endex = endex_of(&(start, data.clone()));

        if range_start <= start && endex <= range_endex {
            // Fully deleted.
        } else if start < range_start && range_start < range_endex && range_endex < endex {
            result.push((start, data[..(range_start - start) as usize].to_vec()));
            result.push((range_start, data[(range_endex - start) as usize..].to_vec()));
        } else if start < range_start && range_start < endex && endex <= range_endex {
            result.push((start, data[..(range_start - start) as usize].to_vec()));
        } else if range_start <= start && start < range_endex && range_endex < endex {
            result.push((range_start, data[(range_endex - start) as usize..].to_vec()));
        } else if range_endex <= start {
            result.push((start - span, data.clone()));
        } else {
            result.push((start, data.clone()));
        }
    }

    result
}

/// Inserts `inserted` into `blocks`, shifting every byte at or after its
/// start up by its length. Unlike [`write`], nothing is overwritten.
pub fn insert(blocks: &[RawBlock], inserted: RawBlock) -> Vec<RawBlock> {
    let (inserted_start, inserted_data) = &inserted;
    let inserted_start = *inserted_start;
    let inserted_len = inserted_data.len() as u64;
    let inserted_endex = inserted_start + inserted_len;

    for (pivot, (pivot_start, pivot_data)) in blocks.iter().enumerate() {
        let pivot_start = *pivot_start;
        let pivot_endex = endex_of(&(pivot_start, pivot_data.clone()));

        if inserted_start <= pivot_start {
            let mut result = blocks[..pivot].to_vec();
            result.push(inserted.clone());
            result.extend(blocks[pivot..].iter().map(|(s, d)| (s + inserted_len, d.clone())));
            return result;
        } else if pivot_start < inserted_start && inserted_start < pivot_endex {
            let split = (inserted_start - pivot_start) as usize;

            let mut result = blocks[..pivot].to_vec();
            result.push((pivot_start, pivot_data[..split].to_vec()));
            result.push(inserted.clone());
            result.push((inserted_endex, pivot_data[split..].to_vec()));
            result.extend(blocks[(pivot + 1)..].iter().map(|(s, d)| (s + inserted_len, d.clone())));
            return result;
        }
    }

    let mut result = blocks.to_vec();
    result.push(inserted);
    result
}

/// Writes `written` onto `blocks`, overwriting anything it overlaps without
/// shifting surrounding content.
pub fn write(blocks: &[RawBlock], written: RawBlock) -> Vec<RawBlock> {
    let (start, data) = &written;

    if data.is_empty() {
        return blocks.to_vec();
    }

    let endex = start + data.len() as u64;

    let mut result = clear(blocks, *start, endex);
    result.push(written);
    result.sort_by_key(|(start, _)| *start);
    result
}

/// Merges touching or overlapping blocks of an already-sorted list into
/// single contiguous runs. Overlapping input is resolved by letting later
/// blocks (in iteration order) win, matching [`write`]'s overwrite rule.
pub fn normalize(blocks: &[RawBlock]) -> Vec<RawBlock> {
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|(start, _)| *start);

    let mut result: Vec<RawBlock> = Vec::new();

    for block in sorted {
        result = write(&result, block);
    }

    coalesce(&result)
}

/// Joins adjacent blocks whose ranges touch (`endex == next.start`) into one.
/// Assumes `blocks` is already sorted and disjoint.
pub fn coalesce(blocks: &[RawBlock]) -> Vec<RawBlock> {
    let mut result: Vec<RawBlock> = Vec::with_capacity(blocks.len());

    for (start, data) in blocks {
        if data.is_empty() {
            continue;
        }

        match result.last_mut() {
            Some((last_start, last_data)) if *last_start + last_data.len() as u64 == *start => {
                last_data.extend_from_slice(data);
            }
            _ => result.push((*start, data.clone())),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(pairs: &[(u64, &[u8])]) -> Vec<RawBlock> {
        pairs.iter().map(|(start, data)| (*start, data.to_vec())).collect()
    }

    #[test]
    fn test_shift() {
        let input = blocks(&[(1, b"ABCD"), (7, b"xyz")]);

        assert_eq!(shift(&input, -1), blocks(&[(0, b"ABCD"), (6, b"xyz")]));
    }

    #[test]
    fn test_clear() {
        let input = blocks(&[(1, b"ABCD"), (6, b"!"), (8, b"xyz")]);

        let step1 = clear(&input, 4, 9);
        let step2 = clear(&step1, 2, 2);
        let step3 = clear(&step2, 2, 3);

        assert_eq!(step3, blocks(&[(1, b"A"), (3, b"C"), (9, b"yz")]));
    }

    #[test]
    fn test_delete() {
        let input = blocks(&[(1, b"ABCD"), (6, b"!"), (8, b"xyz")]);

        let step1 = delete(&input, 4, 9);
        let step2 = delete(&step1, 2, 2);
        let step3 = delete(&step2, 2, 3);

        assert_eq!(step3, blocks(&[(1, b"A"), (2, b"C"), (3, b"yz")]));
    }

    #[test]
    fn test_insert() {
        let input = blocks(&[(1, b"ABCD"), (8, b"xyz")]);

        let step1 = insert(&input, (12, b"13".to_vec()));
        let step2 = insert(&step1, (2, b"2".to_vec()));

        assert_eq!(step2, blocks(&[(1, b"A"), (2, b"2"), (3, b"BCD"), (9, b"xyz"), (13, b"13")]));
    }

    #[test]
    fn test_write() {
        let input = blocks(&[(1, b"ABCD"), (6, b"!"), (8, b"xy")]);

        assert_eq!(
            write(&input, (3, b"123456".to_vec())),
            blocks(&[(1, b"AB"), (3, b"123456"), (9, b"y")])
        );
    }

    #[test]
    fn test_normalize_merges_touching() {
        let input = blocks(&[(1, b"Hello,"), (7, b" "), (8, b"World"), (13, b"!")]);

        assert_eq!(normalize(&input), blocks(&[(1, b"Hello, World!")]));
    }

    #[test]
    fn test_normalize_resolves_overlap_last_wins() {
        let input = blocks(&[(0, b"AAAA"), (2, b"BB")]);

        assert_eq!(normalize(&input), blocks(&[(0, b"AABB")]));
    }

    #[test]
    fn test_shift_roundtrip() {
        let input = blocks(&[(10, b"ABCD"), (20, b"xyz")]);
        let forward = shift(&input, 5);
        let back = shift(&forward, -5);

        assert_eq!(back, input);
    }
}
