//! Merge-step simulation: replay the byte-pair learning process on one input.
//!
//! This is the algorithmic rendition of the learning step, not a canned
//! table: the symbol sequence starts as the input's characters, every round
//! counts real adjacent-pair frequencies, and the most frequent pair merges
//! everywhere at once. Ties break toward the pair whose first occurrence is
//! leftmost in scan order. Simulation stops at the step bound or as soon as
//! no pair occurs more than once.

use rustc_hash::FxHashMap;

use crate::types::MergeStep;

/// Ids assigned to simulated merges start here, right after the single-byte
/// range of a real vocabulary.
const FIRST_MERGE_ID: u32 = 256;

/// Simulate up to `max_steps` merge events for `text`.
pub fn simulate_merges(text: &str, max_steps: usize) -> Vec<MergeStep> {
    let mut symbols: Vec<String> = text.chars().map(String::from).collect();
    let mut steps = Vec::new();

    for step in 1..=max_steps {
        if symbols.len() < 2 {
            break;
        }

        // Count adjacent pairs, remembering each pair's first occurrence for
        // the tie-break.
        let mut frequencies: FxHashMap<(&str, &str), (u32, usize)> = FxHashMap::default();
        for (i, pair) in symbols.windows(2).enumerate() {
            let key = (pair[0].as_str(), pair[1].as_str());
            let entry = frequencies.entry(key).or_insert((0, i));
            entry.0 += 1;
        }

        let best = frequencies
            .iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
            .map(|(&(a, b), &(freq, _))| (a.to_string(), b.to_string(), freq));
        drop(frequencies);

        let Some((first, second, frequency)) = best else {
            break;
        };
        if frequency < 2 {
            break;
        }

        let new_token = format!("{first}{second}");

        // Merge every non-overlapping occurrence left to right.
        let mut merged = Vec::with_capacity(symbols.len());
        let mut i = 0;
        while i < symbols.len() {
            if i + 1 < symbols.len() && symbols[i] == first && symbols[i + 1] == second {
                merged.push(new_token.clone());
                i += 2;
            } else {
                merged.push(symbols[i].clone());
                i += 1;
            }
        }
        symbols = merged;

        steps.push(MergeStep {
            step,
            pair: (first, second),
            frequency,
            new_token,
            token_id: FIRST_MERGE_ID + (step as u32 - 1),
        });
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_contiguous_and_consistent() {
        let steps = simulate_merges("the theme and the thesis", 5);
        assert!(!steps.is_empty());
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step, i + 1);
            assert_eq!(step.new_token, format!("{}{}", step.pair.0, step.pair.1));
            assert_eq!(step.token_id, FIRST_MERGE_ID + i as u32);
        }
    }

    #[test]
    fn respects_the_step_bound() {
        let text = "aa bb aa bb aa bb aa bb cc dd cc dd";
        assert!(simulate_merges(text, 3).len() <= 3);
        assert!(simulate_merges(text, 1).len() == 1);
    }

    #[test]
    fn most_frequent_pair_merges_first() {
        // "ab" occurs three times, nothing else more than once besides "ba"
        // (twice, later in scan order at equal count is impossible here).
        let steps = simulate_merges("ababab", 1);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].pair, ("a".to_string(), "b".to_string()));
        assert_eq!(steps[0].frequency, 3);
    }

    #[test]
    fn ties_break_leftmost() {
        // "ab" and "cd" both occur twice; "ab" is seen first.
        let steps = simulate_merges("abcdabcd", 1);
        assert_eq!(steps[0].pair, ("a".to_string(), "b".to_string()));
    }

    #[test]
    fn stops_when_no_pair_repeats() {
        assert!(simulate_merges("abcdefg", 5).is_empty());
        assert!(simulate_merges("x", 5).is_empty());
        assert!(simulate_merges("", 5).is_empty());
    }

    #[test]
    fn merged_symbols_feed_later_steps() {
        // First "ab" merges; then "ab"+"c" repeats and merges.
        let steps = simulate_merges("abcabcabc", 3);
        assert_eq!(steps[0].pair, ("a".to_string(), "b".to_string()));
        assert_eq!(steps[1].pair, ("ab".to_string(), "c".to_string()));
        assert_eq!(steps[1].new_token, "abc");
    }

    #[test]
    fn deterministic() {
        let a = simulate_merges("deterministic output required", 5);
        let b = simulate_merges("deterministic output required", 5);
        assert_eq!(a, b);
    }
}
