//! Text formats for source graphs (`.gr`) and tree decompositions (`.td`).

use derive_more::Display;
use thiserror::Error;

mod gr;
mod td;

pub use gr::{SourceGraph, parse_source_graph, write_source_graph};
pub use td::{parse_decomposition, write_decomposition};

/// A line that could not be read. Line numbers are 1-based.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("line {line}: `{token}` is not a valid vertex id")]
    InvalidVertex { line: usize, token: String },
    #[error("line {line}: malformed header `{text}`")]
    InvalidHeader { line: usize, text: String },
    #[error("line {line}: malformed bag `{text}`")]
    InvalidBag { line: usize, text: String },
    #[error("line {line}: tree edge refers to unknown bag {bag}")]
    UnknownBag { line: usize, bag: u32 },
    #[error("line {line}: bag {bag} is declared twice")]
    DuplicateBag { line: usize, bag: u32 },
    #[error("line {line}: unexpected `{text}`")]
    UnexpectedLine { line: usize, text: String },
}

/// Disagreement between a header and the body that follows it.
///
/// These never abort parsing.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum StructuralMismatch {
    #[display("header declares {declared} vertices, found {found}")]
    VertexCount { declared: usize, found: usize },
    #[display("header declares {declared} edges, found {found}")]
    EdgeCount { declared: usize, found: usize },
    #[display("header declares {declared} bags, found {found}")]
    BagCount { declared: usize, found: usize },
    #[display("header declares largest bag size {declared}, found {found}")]
    BagSize { declared: usize, found: usize },
    #[display("expected {expected} tree edges, found {found}")]
    TreeEdgeCount { expected: usize, found: usize },
}

/// A parse result together with the mismatches noticed on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub mismatches: Vec<StructuralMismatch>,
}

impl<T> Parsed<T> {
    fn check(&mut self, mismatch: Option<StructuralMismatch>) {
        if let Some(mismatch) = mismatch {
            tracing::warn!("{mismatch}");
            self.mismatches.push(mismatch);
        }
    }
}

/// Meaningful lines with their 1-based numbers, split into tokens.
fn tokenized_lines(text: &str) -> impl Iterator<Item = (usize, &str, Vec<&str>)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('c'))
        .map(|(number, line)| (number, line, line.split_whitespace().collect::<Vec<_>>()))
}

fn parse_id(line: usize, token: &str) -> Result<u32, FormatError> {
    match token.parse::<u32>() {
        // the largest id is kept free so the store's counter cannot overflow
        Ok(id) if id > 0 && id < u32::MAX => Ok(id),
        _ => Err(FormatError::InvalidVertex {
            line,
            token: token.to_owned(),
        }),
    }
}

fn parse_count(token: &str) -> Option<usize> {
    token.parse().ok()
}
