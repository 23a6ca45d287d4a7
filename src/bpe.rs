//! Byte-level BPE (Byte Pair Encoding) tokenizer
//!
//! GPT-2 style: input is pre-tokenized into word fragments by a regex, each
//! fragment's raw bytes are mapped to seed ids through a 256-entry table,
//! and a learned merge table repeatedly rewrites the lowest-priority
//! adjacent pair until no rule applies. Every byte has a seed, so there is
//! no out-of-vocabulary input at the byte stage.

use crate::assets;
use crate::invariants;
use crate::{Error, TokenId};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// Reference: the `pat` regex in https://github.com/openai/gpt-2/blob/master/src/encoder.py

/// GPT-2 pre-tokenizer pattern.
/// The trailing-whitespace alternative `\s+(?!\S)` needs negative lookahead,
/// hence fancy-regex rather than the plain regex crate.
const PRETOKENIZE_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Merge table record: `priority` is the rule's line number in the
/// `.merges` file (lower applies earlier), `id` is the token the pair
/// rewrites to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairMerge {
    pub priority: i32,
    pub id: TokenId,
}

impl PairMerge {
    /// Sentinel meaning "no merge applies to this pair".
    pub const NONE: PairMerge = PairMerge {
        priority: i32::MAX,
        id: -1,
    };
}

/// Special token ids declared in a `.specials` file.
///
/// A slot whose name is absent from the file stays at the default id 0.
/// The format cannot distinguish "absent" from "declared as id 0", so a
/// slot should only be queried when the model is known to define it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BpeSpecials {
    pub pad: TokenId,
    pub bos: TokenId,
    pub eos: TokenId,
    pub unk: TokenId,
    pub mask: TokenId,
}

/// Byte-level BPE tokenizer loaded from `.merges` / `.bytes` / `.specials`
/// side files. Immutable after construction; encoding takes `&self` and
/// allocates its scratch per call.
pub struct ByteLevelBpe {
    merges: HashMap<u64, PairMerge>,
    byte_seeds: [TokenId; 256],
    specials: BpeSpecials,
    pattern: fancy_regex::Regex,
}

/// Pack an ordered id pair into the 64-bit merge-table key.
/// `(a, b)` and `(b, a)` are distinct keys.
fn join_ids(first: TokenId, second: TokenId) -> u64 {
    ((first as u32 as u64) << 32) | (second as u32 as u64)
}

/// `<prefix>.merges` etc. The prefix is an opaque path fragment, so the
/// suffix is appended textually rather than via `Path::with_extension`
/// (which would clobber anything after a dot in the file name).
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut os = prefix.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

impl ByteLevelBpe {
    /// Load a BPE model from its three side files.
    ///
    /// Opens `<prefix>.merges`, `<prefix>.bytes` and `<prefix>.specials`.
    /// Any missing file or malformed line is a fatal error naming the path.
    pub fn from_files<P: AsRef<Path>>(prefix: P) -> Result<Self, Error> {
        let prefix = prefix.as_ref();
        let rules = assets::read_merges(with_suffix(prefix, ".merges"))?;
        let byte_seeds = assets::read_byte_map(with_suffix(prefix, ".bytes"))?;
        let specials = assets::read_specials(with_suffix(prefix, ".specials"))?;

        let mut merges = HashMap::with_capacity(rules.len());
        for (priority, rule) in rules.iter().enumerate() {
            merges.insert(
                join_ids(rule.first, rule.second),
                PairMerge {
                    priority: priority as i32,
                    id: rule.result,
                },
            );
        }

        let pattern = fancy_regex::Regex::new(PRETOKENIZE_PATTERN)
            .map_err(|e| Error::Pattern(e.to_string()))?;

        Ok(Self {
            merges,
            byte_seeds,
            specials,
            pattern,
        })
    }

    /// Encode text into token ids.
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        let mut ids = Vec::new();
        self.encode_into(&mut ids, text);
        ids
    }

    /// Destination variant of [`encode`](Self::encode): appends the ids for
    /// `text` to `dest`, reusing its capacity.
    pub fn encode_into(&self, dest: &mut Vec<TokenId>, text: &str) {
        let start = dest.len();
        for m in self.pattern.find_iter(text).filter_map(|m| m.ok()) {
            self.reduce_fragment(dest, m.as_str());
        }
        invariants::assert_ids_nonnegative(&dest[start..]);
    }

    /// Encode multiple texts in parallel.
    ///
    /// Output order matches input order. Each text is encoded independently
    /// with its own scratch, so this is safe on a shared tokenizer.
    pub fn encode_batch(&self, texts: &[&str]) -> Vec<Vec<TokenId>> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Merge-table lookup for an adjacent pair, [`PairMerge::NONE`] when
    /// the pair has no rule.
    fn lookup(&self, first: TokenId, second: TokenId) -> PairMerge {
        self.merges
            .get(&join_ids(first, second))
            .copied()
            .unwrap_or(PairMerge::NONE)
    }

    /// Reduce one pre-tokenized fragment and append the surviving ids.
    ///
    /// `word` holds the current token ids and `pairs` the merge lookup for
    /// every adjacent pair, so `pairs.len() == word.len() - 1` at every
    /// loop boundary. Each round applies the leftmost lowest-priority rule
    /// and refreshes only the two pair entries adjacent to the merge site.
    fn reduce_fragment(&self, dest: &mut Vec<TokenId>, fragment: &str) {
        let mut word: Vec<TokenId> = fragment
            .bytes()
            .map(|b| self.byte_seeds[b as usize])
            .collect();

        if word.len() > 1 {
            let mut pairs: Vec<PairMerge> = word
                .windows(2)
                .map(|w| self.lookup(w[0], w[1]))
                .collect();

            while !pairs.is_empty() {
                invariants::assert_pair_table(&word, &pairs, |a, b| self.lookup(a, b));

                let mut best = 0usize;
                let mut best_merge = PairMerge::NONE;
                for (i, &pair) in pairs.iter().enumerate() {
                    // Strict comparison: ties keep the leftmost candidate.
                    if pair.priority < best_merge.priority {
                        best_merge = pair;
                        best = i;
                    }
                }
                if best_merge.priority == PairMerge::NONE.priority {
                    break;
                }

                word[best] = best_merge.id;
                word.remove(best + 1);
                if best + 1 < pairs.len() {
                    pairs.remove(best + 1);
                    pairs[best] = self.lookup(word[best], word[best + 1]);
                } else {
                    pairs.remove(best);
                }
                if best > 0 {
                    pairs[best - 1] = self.lookup(word[best - 1], word[best]);
                }
            }
        }

        dest.extend_from_slice(&word);
    }

    /// The special-id slots as loaded from the `.specials` file.
    pub fn specials(&self) -> BpeSpecials {
        self.specials
    }

    pub fn pad_id(&self) -> TokenId {
        self.specials.pad
    }

    pub fn bos_id(&self) -> TokenId {
        self.specials.bos
    }

    pub fn eos_id(&self) -> TokenId {
        self.specials.eos
    }

    pub fn unk_id(&self) -> TokenId {
        self.specials.unk
    }

    pub fn mask_id(&self) -> TokenId {
        self.specials.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a tokenizer straight from tables, bypassing the asset files.
    fn tokenizer(
        byte_seeds: [TokenId; 256],
        rules: &[(TokenId, TokenId, TokenId)],
    ) -> ByteLevelBpe {
        let merges = rules
            .iter()
            .enumerate()
            .map(|(priority, &(first, second, result))| {
                (
                    join_ids(first, second),
                    PairMerge {
                        priority: priority as i32,
                        id: result,
                    },
                )
            })
            .collect();
        ByteLevelBpe {
            merges,
            byte_seeds,
            specials: BpeSpecials::default(),
            pattern: fancy_regex::Regex::new(PRETOKENIZE_PATTERN).unwrap(),
        }
    }

    /// Identity-style seed table: byte value == seed id.
    fn identity_seeds() -> [TokenId; 256] {
        let mut seeds = [0; 256];
        for (b, seed) in seeds.iter_mut().enumerate() {
            *seed = b as TokenId;
        }
        seeds
    }

    #[test]
    fn empty_fragment_yields_nothing() {
        let tok = tokenizer(identity_seeds(), &[]);
        let mut dest = Vec::new();
        tok.reduce_fragment(&mut dest, "");
        assert!(dest.is_empty());
    }

    #[test]
    fn single_byte_uses_seed_table() {
        let mut seeds = identity_seeds();
        seeds[b'a' as usize] = 65;
        let tok = tokenizer(seeds, &[]);
        assert_eq!(tok.encode("a"), vec![65]);
    }

    #[test]
    fn merge_chain_collapses_pair() {
        // one rule: (h, e) -> 257
        let tok = tokenizer(identity_seeds(), &[(104, 101, 257)]);
        let mut dest = Vec::new();
        tok.reduce_fragment(&mut dest, "he");
        assert_eq!(dest, vec![257]);
    }

    #[test]
    fn tie_break_prefers_leftmost() {
        // word seeds [97, 98, 98, 98]: the (98, 98) rule matches at index 1
        // and index 2; the leftmost site must win.
        let tok = tokenizer(identity_seeds(), &[(98, 98, 300)]);
        let mut dest = Vec::new();
        tok.reduce_fragment(&mut dest, "abbb");
        assert_eq!(dest, vec![97, 300, 98]);
    }

    #[test]
    fn merge_refreshes_left_neighbor() {
        // (b, c) merges first, then the refreshed (a, X) pair fires.
        let tok = tokenizer(identity_seeds(), &[(98, 99, 300), (97, 300, 301)]);
        let mut dest = Vec::new();
        tok.reduce_fragment(&mut dest, "abc");
        assert_eq!(dest, vec![301]);
    }

    #[test]
    fn merge_refreshes_right_neighbor() {
        // (a, b) merges first, then the refreshed (X, c) pair fires.
        let tok = tokenizer(identity_seeds(), &[(97, 98, 300), (300, 99, 301)]);
        let mut dest = Vec::new();
        tok.reduce_fragment(&mut dest, "abc");
        assert_eq!(dest, vec![301]);
    }

    #[test]
    fn no_applicable_merges_emits_seeds() {
        let tok = tokenizer(identity_seeds(), &[(104, 101, 257)]);
        let mut dest = Vec::new();
        tok.reduce_fragment(&mut dest, "xyz");
        assert_eq!(dest, vec![120, 121, 122]);
    }

    #[test]
    fn pretokenize_splits_words_and_space_prefix() {
        let tok = tokenizer(identity_seeds(), &[]);
        let fragments: Vec<&str> = tok
            .pattern
            .find_iter("Hello world")
            .filter_map(|m| m.ok())
            .map(|m| m.as_str())
            .collect();
        assert_eq!(fragments, vec!["Hello", " world"]);
    }

    #[test]
    fn pretokenize_isolates_contractions() {
        let tok = tokenizer(identity_seeds(), &[]);
        let fragments: Vec<&str> = tok
            .pattern
            .find_iter("don't")
            .filter_map(|m| m.ok())
            .map(|m| m.as_str())
            .collect();
        assert_eq!(fragments, vec!["don", "'t"]);
    }

    #[test]
    fn pretokenize_keeps_last_space_with_next_word() {
        // Of three interior spaces, two go to the whitespace run and the
        // third prefixes the following word.
        let tok = tokenizer(identity_seeds(), &[]);
        let fragments: Vec<&str> = tok
            .pattern
            .find_iter("a   b")
            .filter_map(|m| m.ok())
            .map(|m| m.as_str())
            .collect();
        assert_eq!(fragments, vec!["a", "  ", " b"]);
    }

    #[test]
    fn pretokenize_splits_punctuation_and_digits() {
        let tok = tokenizer(identity_seeds(), &[]);
        let fragments: Vec<&str> = tok
            .pattern
            .find_iter("It costs 42 dollars!")
            .filter_map(|m| m.ok())
            .map(|m| m.as_str())
            .collect();
        assert_eq!(fragments, vec!["It", " costs", " 42", " dollars", "!"]);
    }

    #[test]
    fn multibyte_input_reduces_per_byte() {
        // U+4E2D is three UTF-8 bytes; with no merges each byte's seed
        // comes through.
        let tok = tokenizer(identity_seeds(), &[]);
        let ids = tok.encode("中");
        assert_eq!(ids, vec![0xE4, 0xB8, 0xAD]);
    }

    #[test]
    fn join_ids_orders_pair() {
        assert_ne!(join_ids(1, 2), join_ids(2, 1));
        assert_eq!(join_ids(1, 2), (1u64 << 32) | 2);
    }
}
