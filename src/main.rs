//! Reference CLI: tokenize input lines with a model loaded from disk.
//!
//! `tokenize <asset-prefix> <input>` loads a byte-level BPE model from
//! `<asset-prefix>.merges` / `.bytes` / `.specials` and prints the ids for
//! each input line. With `--wordpiece` the first argument is a vocab file
//! path instead.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use subpiece::{ByteLevelBpe, TokenId, WordPieceTokenizer};

#[derive(Parser)]
#[command(
    name = "tokenize",
    version,
    about = "Tokenize text with a byte-level BPE or WordPiece model"
)]
struct Args {
    /// BPE asset prefix (opens <prefix>.merges, <prefix>.bytes and
    /// <prefix>.specials), or the vocab file path with --wordpiece
    assets: String,

    /// Input text file with one string per line, or '-' for stdin
    input: String,

    /// Treat ASSETS as a WordPiece vocab file
    #[arg(long)]
    wordpiece: bool,

    /// Print piece strings instead of ids (WordPiece only)
    #[arg(long, requires = "wordpiece")]
    pieces: bool,
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, Box<dyn std::error::Error>> {
    if path == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        let file =
            File::open(path).map_err(|e| format!("cannot open input '{path}': {e}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn join_ids(ids: &[TokenId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let input = open_input(&args.input)?;
    let mut out = io::BufWriter::new(io::stdout().lock());

    if args.wordpiece {
        let tokenizer = WordPieceTokenizer::from_file(&args.assets)?;
        for line in input.lines() {
            let line = line?;
            if args.pieces {
                writeln!(out, "{}", tokenizer.encode_pieces(&line, true).join(" "))?;
            } else {
                writeln!(out, "{}", join_ids(&tokenizer.encode_ids(&line, true)))?;
            }
        }
    } else {
        let tokenizer = ByteLevelBpe::from_files(&args.assets)?;
        let mut ids = Vec::new();
        for line in input.lines() {
            let line = line?;
            ids.clear();
            tokenizer.encode_into(&mut ids, &line);
            writeln!(out, "{}", join_ids(&ids))?;
        }
    }

    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tokenize: {e}");
            ExitCode::FAILURE
        }
    }
}
