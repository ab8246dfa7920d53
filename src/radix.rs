//! Linear-time helpers used by the recompression phases.

const DIGIT_BITS: u32 = 8;
const BUCKETS: usize = 1 << DIGIT_BITS;

/// Stable LSD radix sort on a `u32` key.
///
/// Runs in `O(n)` passes over the data: only as many byte-digits as the
/// largest key needs are processed.
pub(crate) fn radix_sort_by_key<T, F>(items: &mut Vec<T>, key: F)
where
    F: Fn(&T) -> u32,
{
    if items.len() < 2 {
        return;
    }
    let max = items.iter().map(&key).max().unwrap_or(0);
    let mut shift = 0;
    let mut scratch: Vec<Option<T>> = Vec::with_capacity(items.len());

    while shift < u32::BITS && (max >> shift) > 0 {
        let mut counts = [0usize; BUCKETS + 1];
        for item in items.iter() {
            counts[digit(key(item), shift) + 1] += 1;
        }
        for i in 0..BUCKETS {
            counts[i + 1] += counts[i];
        }

        scratch.clear();
        scratch.resize_with(items.len(), || None);
        for item in items.drain(..) {
            let d = digit(key(&item), shift);
            scratch[counts[d]] = Some(item);
            counts[d] += 1;
        }
        items.extend(scratch.drain(..).flatten());

        shift += DIGIT_BITS;
    }
}

#[inline]
fn digit(key: u32, shift: u32) -> usize {
    ((key >> shift) as usize) & (BUCKETS - 1)
}

/// Whether a letter of rank `rank` is a left letter of partition `index`.
///
/// Partition `index = 2 * bit + side` puts on the left every rank whose
/// `bit` equals `side`. A pair of distinct ranks is covered by the partition
/// of their lowest differing bit, on the side of the left rank, so every pair
/// is covered by some partition below [`partition_count`].
pub(crate) fn left_in_partition(rank: u32, index: u32) -> bool {
    let (bit, side) = (index / 2, index % 2);
    bit < u32::BITS && (rank >> bit) & 1 == side
}

/// Number of partitions needed for ids below `bound`.
pub(crate) fn partition_count(bound: u32) -> u32 {
    let bits = u32::BITS - bound.saturating_sub(1).leading_zeros();
    2 * bits.max(1)
}
