//! Sequence-matcher similarity ratio.
//!
//! The ratio of two strings is `2 * M / T`, where `T` is their combined
//! length and `M` the number of characters covered by their matching
//! blocks. Matching blocks are found recursively: take the longest common
//! contiguous block, then repeat on the pieces to its left and to its
//! right. Among equally long blocks the one starting earliest in `a`
//! wins, then the one starting earliest in `b`.
//!
//! Lengths are counted in Unicode scalar values. No characters are
//! treated as junk.

/// Similarity ratio of `a` and `b` in `[0, 1]`.
///
/// Not symmetric: blocks are searched in `a` first, so swapping the
/// arguments can change which blocks are found. Two empty strings are
/// identical (`1.0`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Total length of the matching blocks of `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;

        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`, as
/// `(start_in_a, start_in_b, length)`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // run[j + 1 - blo] = length of the common run ending at a[i], b[j]
    let width = bhi.saturating_sub(blo) + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j + 1 - blo;
            curr[k] = if a[i] == b[j] { prev[k - 1] + 1 } else { 0 };
            if curr[k] > best_size {
                best_size = curr[k];
                best_i = i + 1 - best_size;
                best_j = j + 1 - best_size;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}
