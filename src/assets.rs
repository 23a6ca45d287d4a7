//! Plain-text model asset readers
//!
//! A trained BPE model is stored as three side files sharing a path prefix:
//! `<prefix>.merges` (one `first second result` id triple per line, the
//! line number is the merge priority), `<prefix>.bytes` (256 whitespace
//! separated seed ids, one per byte value) and `<prefix>.specials`
//! (`NAME id` lines drawn from a closed name set). A WordPiece model is a
//! single vocab file with one piece per line, id = line number.
//!
//! Any missing file or malformed content is a fatal load error naming the
//! offending path.

use crate::bpe::BpeSpecials;
use crate::{Error, TokenId};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// One line of a `.merges` file: the pair `(first, second)` rewrites to
/// `result` with priority equal to the line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRule {
    pub first: TokenId,
    pub second: TokenId,
    pub result: TokenId,
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    let file = File::open(path)
        .map_err(|e| Error::AssetOpen(format!("'{}': {}", path.display(), e)))?;
    Ok(BufReader::new(file))
}

fn parse_id(field: &str, path: &Path, line_no: usize) -> Result<TokenId, Error> {
    field.parse::<TokenId>().map_err(|_| {
        Error::AssetParse(format!(
            "'{}' line {}: '{}' is not a 32-bit integer id",
            path.display(),
            line_no + 1,
            field
        ))
    })
}

/// Read a `.merges` file in priority order.
pub fn read_merges<P: AsRef<Path>>(path: P) -> Result<Vec<MergeRule>, Error> {
    let path = path.as_ref();
    let reader = open(path)?;

    let mut rules = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(Error::AssetParse(format!(
                "'{}' line {}: expected 'first second result', got {} fields",
                path.display(),
                line_no + 1,
                fields.len()
            )));
        }
        rules.push(MergeRule {
            first: parse_id(fields[0], path, line_no)?,
            second: parse_id(fields[1], path, line_no)?,
            result: parse_id(fields[2], path, line_no)?,
        });
    }

    Ok(rules)
}

/// Read a `.bytes` file: exactly 256 seed ids in byte-value order.
pub fn read_byte_map<P: AsRef<Path>>(path: P) -> Result<[TokenId; 256], Error> {
    let path = path.as_ref();
    let mut reader = open(path)?;

    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;

    let mut map = [0 as TokenId; 256];
    let mut count = 0usize;
    for field in contents.split_whitespace() {
        if count == 256 {
            return Err(Error::AssetParse(format!(
                "'{}': more than 256 byte seed ids",
                path.display()
            )));
        }
        map[count] = field.parse::<TokenId>().map_err(|_| {
            Error::AssetParse(format!(
                "'{}': '{}' is not a 32-bit integer id",
                path.display(),
                field
            ))
        })?;
        count += 1;
    }
    if count != 256 {
        return Err(Error::AssetParse(format!(
            "'{}': expected 256 byte seed ids, got {}",
            path.display(),
            count
        )));
    }

    Ok(map)
}

/// Read a `.specials` file into the BPE special-id slots.
///
/// Recognized names are exactly `PAD`, `BOS`, `EOS`, `UNK` and `MASK`; any
/// other name is a fatal error. Names absent from the file leave their slot
/// at the default id 0.
pub fn read_specials<P: AsRef<Path>>(path: P) -> Result<BpeSpecials, Error> {
    let path = path.as_ref();
    let reader = open(path)?;

    let mut specials = BpeSpecials::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(Error::AssetParse(format!(
                "'{}' line {}: expected 'NAME id', got {} fields",
                path.display(),
                line_no + 1,
                fields.len()
            )));
        }
        let id = parse_id(fields[1], path, line_no)?;
        match fields[0] {
            "PAD" => specials.pad = id,
            "BOS" => specials.bos = id,
            "EOS" => specials.eos = id,
            "UNK" => specials.unk = id,
            "MASK" => specials.mask = id,
            name => {
                return Err(Error::UnknownSpecial(format!(
                    "'{}' in '{}'",
                    name,
                    path.display()
                )))
            }
        }
    }

    Ok(specials)
}

/// Read a WordPiece vocab file as raw lines; the id of a piece is its
/// 0-based line number.
pub fn read_vocab_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    let reader = open(path)?;
    reader
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .map_err(Error::Io)
}
