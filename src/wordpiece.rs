//! WordPiece tokenizer
//!
//! BERT style: the vocab file is line-oriented (id = line number) and a
//! leading `##` marks a continuation piece. Input is split into words on
//! whitespace, with every punctuation or CJK code point forming a
//! single-character word of its own. Each word is then segmented by greedy
//! longest match: the first piece comes from the word-initial vocabulary,
//! later pieces from the `##` continuation vocabulary, and a word that
//! cannot be fully covered rolls back its partial pieces and becomes a
//! single unknown token.
//!
//! All matching happens on Unicode code points, never on bytes or UTF-16
//! units, so multi-byte and astral-plane input segments correctly.

use crate::assets;
use crate::invariants;
use crate::{Error, TokenId};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Special token ids recognized in a WordPiece vocab.
///
/// A slot is set when a vocab line is literally the bracketed name
/// (`[UNK]`, `[PAD]`, `[SEP]`, `[BOS]`, `[EOS]`, `[CLS]`); alternative
/// spellings are not recognized. A slot whose name never appears stays at
/// the default id 0, indistinguishable from a special declared on line 0,
/// so a slot should only be queried when the vocab is known to define it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordPieceSpecials {
    pub unk: TokenId,
    pub pad: TokenId,
    pub sep: TokenId,
    pub bos: TokenId,
    pub eos: TokenId,
    pub cls: TokenId,
}

/// WordPiece tokenizer loaded from a line-oriented vocab file.
/// Immutable after construction; encoding takes `&self` and allocates its
/// scratch per call.
pub struct WordPieceTokenizer {
    /// Piece text per id, `##` already stripped from continuations.
    pieces: Vec<String>,
    /// `true` for word-initial pieces, `false` for continuations.
    is_prefix: Vec<bool>,
    prefix_to_id: HashMap<Vec<char>, TokenId>,
    continuation_to_id: HashMap<Vec<char>, TokenId>,
    specials: WordPieceSpecials,
}

impl WordPieceTokenizer {
    /// Load a WordPiece vocab file, one piece per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::from_lines(assets::read_vocab_lines(path)?))
    }

    /// Build a tokenizer from vocab lines; the id of a piece is its index.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pieces = Vec::new();
        let mut is_prefix = Vec::new();
        let mut specials = WordPieceSpecials::default();

        for line in lines {
            let line = line.as_ref();
            let id = pieces.len() as TokenId;

            // Specials match against the raw line, before the `##` check;
            // the bracketed form itself is stored as a normal prefix piece.
            match line {
                "[UNK]" => specials.unk = id,
                "[PAD]" => specials.pad = id,
                "[SEP]" => specials.sep = id,
                "[BOS]" => specials.bos = id,
                "[EOS]" => specials.eos = id,
                "[CLS]" => specials.cls = id,
                _ => {}
            }

            if line.len() > 2 && line.starts_with("##") {
                is_prefix.push(false);
                pieces.push(line[2..].to_string());
            } else {
                is_prefix.push(true);
                pieces.push(line.to_string());
            }
        }

        let mut prefix_to_id = HashMap::new();
        let mut continuation_to_id = HashMap::new();
        for (id, piece) in pieces.iter().enumerate() {
            let key: Vec<char> = piece.chars().collect();
            if is_prefix[id] {
                prefix_to_id.insert(key, id as TokenId);
            } else {
                continuation_to_id.insert(key, id as TokenId);
            }
        }

        Self {
            pieces,
            is_prefix,
            prefix_to_id,
            continuation_to_id,
            specials,
        }
    }

    /// Encode text into token ids.
    ///
    /// With `add_special_tokens` the output is wrapped in `cls` / `sep`.
    pub fn encode_ids(&self, text: &str, add_special_tokens: bool) -> Vec<TokenId> {
        let chars: Vec<char> = text.chars().collect();
        let mut ids = Vec::new();

        if add_special_tokens {
            ids.push(self.specials.cls);
        }
        for (start, end) in split(&chars) {
            self.segment_word(&chars[start..end], &mut ids);
        }
        if add_special_tokens {
            ids.push(self.specials.sep);
        }

        invariants::assert_ids_nonnegative(&ids);
        ids
    }

    /// Encode text into piece strings, continuations rendered with their
    /// on-disk `##` prefix.
    pub fn encode_pieces(&self, text: &str, add_special_tokens: bool) -> Vec<String> {
        self.encode_ids(text, add_special_tokens)
            .into_iter()
            .map(|id| {
                let id = id as usize;
                if self.is_prefix[id] {
                    self.pieces[id].clone()
                } else {
                    format!("##{}", self.pieces[id])
                }
            })
            .collect()
    }

    /// Encode multiple texts in parallel.
    ///
    /// Output order matches input order. Each text is encoded independently
    /// with its own scratch, so this is safe on a shared tokenizer.
    pub fn encode_batch(&self, texts: &[&str], add_special_tokens: bool) -> Vec<Vec<TokenId>> {
        texts
            .par_iter()
            .map(|text| self.encode_ids(text, add_special_tokens))
            .collect()
    }

    /// Segment one word by greedy longest match, appending piece ids.
    ///
    /// The first piece is looked up in the word-initial vocabulary, later
    /// pieces in the continuation vocabulary. If some position cannot be
    /// matched at any length, every piece committed for this word is
    /// removed and a single `unk` takes its place. Returns the number of
    /// ids the word contributed.
    fn segment_word(&self, word: &[char], dest: &mut Vec<TokenId>) -> usize {
        let end = word.len();
        let mut start = 0usize;
        let mut num_encoded = 0usize;

        while start < end {
            let mut token_end = end;
            loop {
                let map = if num_encoded == 0 {
                    &self.prefix_to_id
                } else {
                    &self.continuation_to_id
                };
                if let Some(&id) = map.get(&word[start..token_end]) {
                    dest.push(id);
                    num_encoded += 1;
                    start = token_end;
                    break;
                }
                token_end -= 1;
                if token_end == start {
                    dest.truncate(dest.len() - num_encoded);
                    dest.push(self.specials.unk);
                    return 1;
                }
            }
        }

        num_encoded
    }

    /// Number of pieces in the vocabulary.
    pub fn n_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// The special-id slots as recognized while loading the vocab.
    pub fn specials(&self) -> WordPieceSpecials {
        self.specials
    }

    pub fn unk_id(&self) -> TokenId {
        self.specials.unk
    }

    pub fn pad_id(&self) -> TokenId {
        self.specials.pad
    }

    pub fn sep_id(&self) -> TokenId {
        self.specials.sep
    }

    pub fn bos_id(&self) -> TokenId {
        self.specials.bos
    }

    pub fn eos_id(&self) -> TokenId {
        self.specials.eos
    }

    pub fn cls_id(&self) -> TokenId {
        self.specials.cls
    }
}

/// Split input code points into word spans.
///
/// Whitespace separates words and produces nothing itself; every
/// punctuation or CJK code point becomes a single-character word even with
/// no surrounding spaces. Punctuation here is the ASCII set, matching the
/// single-byte `ispunct` classifier of the reference models.
fn split(chars: &[char]) -> Vec<(usize, usize)> {
    let mut words = Vec::new();
    let mut start = 0usize;

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_whitespace() {
            if i > start {
                words.push((start, i));
            }
            start = i + 1;
        } else if ch.is_ascii_punctuation() || is_cjk(ch) {
            if i > start {
                words.push((start, i));
            }
            words.push((i, i + 1));
            start = i + 1;
        }
    }
    if chars.len() > start {
        words.push((start, chars.len()));
    }

    words
}

/// Check if a code point is in the CJK unified/compatibility ranges.
/// These are treated as single-character words.
fn is_cjk(ch: char) -> bool {
    let cp = ch as u32;
    // CJK Unified Ideographs
    (0x4E00..=0x9FFF).contains(&cp)
        // CJK Unified Ideographs Extension A
        || (0x3400..=0x4DBF).contains(&cp)
        // CJK Unified Ideographs Extension B
        || (0x20000..=0x2A6DF).contains(&cp)
        // CJK Unified Ideographs Extension C
        || (0x2A700..=0x2B73F).contains(&cp)
        // CJK Unified Ideographs Extension D
        || (0x2B740..=0x2B81F).contains(&cp)
        // CJK Unified Ideographs Extension E
        || (0x2B820..=0x2CEAF).contains(&cp)
        // CJK Compatibility Ideographs
        || (0xF900..=0xFAFF).contains(&cp)
        // CJK Compatibility Ideographs Supplement
        || (0x2F800..=0x2FA1F).contains(&cp)
}
