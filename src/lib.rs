//! # subpiece
//!
//! Byte-level BPE and WordPiece tokenizers driven by plain-text model assets.
//!
//! ## Features
//!
//! - 🦀 Pure Rust - no C++ dependencies
//! - 📦 Loads trained models from simple text side files
//! - ✂️ GPT-2 style byte-level BPE with integer-id merge tables
//! - 🧩 BERT style WordPiece with prefix/continuation vocabularies
//! - 🎯 Small API - construct once, encode many times
//!
//! ## Example
//!
//! ```no_run
//! use subpiece::{ByteLevelBpe, WordPieceTokenizer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Opens gpt2.merges, gpt2.bytes and gpt2.specials
//! let bpe = ByteLevelBpe::from_files("models/gpt2")?;
//! let ids = bpe.encode("Hello world");
//!
//! let wp = WordPieceTokenizer::from_file("models/bert.vocab")?;
//! let ids = wp.encode_ids("Hello world", true);
//! let pieces = wp.encode_pieces("Hello world", true);
//! # Ok(())
//! # }
//! ```
//!
//! Both tokenizers are immutable after construction; a shared reference can
//! be queried from many threads at once. Encoding allocates its scratch per
//! call and never fails - only loading a model can return an error.

pub mod assets;
pub mod bpe;
pub mod invariants;
pub mod wordpiece;

pub use bpe::{BpeSpecials, ByteLevelBpe};
pub use wordpiece::{WordPieceSpecials, WordPieceTokenizer};

/// Type alias for token IDs
///
/// Token IDs are represented as i32 to match the on-disk asset formats,
/// where every id field is a signed 32-bit integer. Negative values appear
/// only as internal sentinels (the merge engine's "no merge" marker) and
/// are never emitted by any encode method.
pub type TokenId = i32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open asset file: {0}")]
    AssetOpen(String),

    #[error("Malformed asset: {0}")]
    AssetParse(String),

    #[error("Unknown special token name: {0}")]
    UnknownSpecial(String),

    #[error("Invalid pre-tokenizer pattern: {0}")]
    Pattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
