//! Runtime invariant assertions for tokenizer correctness.
//!
//! Debug-mode checks that the encoding engines maintain their internal
//! contracts. In release builds every function here compiles to a no-op.
//!
//! # Invariants Enforced
//!
//! 1. **Pair-table consistency**: during BPE reduction the pair table has
//!    exactly `max(0, |word| - 1)` entries and entry `i` equals the merge
//!    lookup for `(word[i], word[i + 1])`
//! 2. **Output sign**: encode methods never emit a negative id; negative
//!    values exist only as internal sentinels

use crate::bpe::PairMerge;
use crate::TokenId;

/// Asserts that the merge engine's pair table mirrors the word's adjacent
/// pairs. Called at every reduction-loop boundary.
///
/// # Panics
///
/// Panics in debug builds if the table length or any entry is stale.
#[inline]
pub fn assert_pair_table(
    word: &[TokenId],
    pairs: &[PairMerge],
    lookup: impl Fn(TokenId, TokenId) -> PairMerge,
) {
    #[cfg(debug_assertions)]
    {
        debug_assert_eq!(
            pairs.len(),
            word.len().saturating_sub(1),
            "Invariant violation: {} pair entries for a {}-token word",
            pairs.len(),
            word.len()
        );
        for i in 0..pairs.len() {
            let expected = lookup(word[i], word[i + 1]);
            debug_assert_eq!(
                pairs[i], expected,
                "Invariant violation: pair[{i}] is stale for ({}, {})",
                word[i],
                word[i + 1]
            );
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (word, pairs, lookup);
    }
}

/// Asserts that a finished encoding contains no internal sentinel ids.
///
/// # Panics
///
/// Panics in debug builds if any id is negative.
#[inline]
pub fn assert_ids_nonnegative(ids: &[TokenId]) {
    #[cfg(debug_assertions)]
    {
        for (i, &id) in ids.iter().enumerate() {
            debug_assert!(
                id >= 0,
                "Invariant violation: ids[{i}] = {id} is a sentinel, not a token"
            );
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = ids;
    }
}
