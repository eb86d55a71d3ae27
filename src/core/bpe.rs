//! Rank-greedy byte-pair merging, the encode half of BPE.
//!
//! A chunk starts as individual bytes. While any adjacent pair of spans
//! concatenates to a vocabulary entry, the pair with the lowest rank merges
//! first. Lower rank means the merge was learned earlier, so replaying merges
//! in rank order reproduces the training segmentation deterministically.

use rustc_hash::FxHashMap;

/// Encode one pre-split chunk into token ids.
///
/// On failure returns the offset (within `piece`) of a byte that has no
/// vocabulary entry, which can only happen with a table that does not cover
/// all 256 single bytes.
pub fn byte_pair_encode(
    piece: &[u8],
    ranks: &FxHashMap<Vec<u8>, u32>,
) -> Result<Vec<u32>, usize> {
    if piece.len() == 1 {
        return match ranks.get(piece) {
            Some(&rank) => Ok(vec![rank]),
            None => Err(0),
        };
    }

    // Current segmentation as (start, end) byte spans over `piece`.
    let mut parts: Vec<(usize, usize)> = (0..piece.len()).map(|i| (i, i + 1)).collect();

    loop {
        let mut best: Option<(u32, usize)> = None;
        for i in 0..parts.len() - 1 {
            let candidate = &piece[parts[i].0..parts[i + 1].1];
            if let Some(&rank) = ranks.get(candidate) {
                if best.map_or(true, |(r, _)| rank < r) {
                    best = Some((rank, i));
                }
            }
        }

        match best {
            Some((_, i)) => {
                parts[i].1 = parts[i + 1].1;
                parts.remove(i + 1);
            }
            None => break,
        }
    }

    parts
        .into_iter()
        .map(|(start, end)| ranks.get(&piece[start..end]).copied().ok_or(start))
        .collect()
}
