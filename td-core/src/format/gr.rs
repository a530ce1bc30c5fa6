use std::{collections::BTreeSet, fmt::Write};

use itertools::Itertools;

use super::{FormatError, Parsed, StructuralMismatch, parse_count, parse_id, tokenized_lines};
use crate::graph::{EdgeKey, GraphStore, VertexId};

/// Contents of a `.gr` file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceGraph {
    /// Ascending.
    pub vertices: Vec<VertexId>,
    /// Canonical and ascending.
    pub edges: Vec<EdgeKey>,
}

/// Reads a source graph.
///
/// ```text
/// p tw <vertices> <edges>
/// <u> <v>
/// <isolated>
/// ```
///
/// Blank lines and lines starting with `c` are skipped. Header counts are compared with
/// what was read and disagreements are reported, not rejected.
///
/// # Errors
/// Returns an error for ids that are not positive integers, a malformed
/// header, or lines with more than two tokens.
pub fn parse_source_graph(text: &str) -> Result<Parsed<SourceGraph>, FormatError> {
    let mut header = None;
    let mut vertices = BTreeSet::new();
    let mut edges = BTreeSet::new();

    for (line, raw, tokens) in tokenized_lines(text) {
        match tokens.as_slice() {
            ["p", _, n, m, ..] => {
                let (Some(n), Some(m)) = (parse_count(n), parse_count(m)) else {
                    return Err(FormatError::InvalidHeader {
                        line,
                        text: raw.to_owned(),
                    });
                };
                header = Some((n, m));
            }
            ["p", ..] => {
                return Err(FormatError::InvalidHeader {
                    line,
                    text: raw.to_owned(),
                });
            }
            [v] => {
                vertices.insert(VertexId(parse_id(line, v)?));
            }
            [u, v] => {
                let u = VertexId(parse_id(line, u)?);
                let v = VertexId(parse_id(line, v)?);
                vertices.insert(u);
                vertices.insert(v);
                if let Some(key) = EdgeKey::new(u, v) {
                    edges.insert(key);
                }
            }
            _ => {
                return Err(FormatError::UnexpectedLine {
                    line,
                    text: raw.to_owned(),
                });
            }
        }
    }

    let mut parsed = Parsed {
        value: SourceGraph {
            vertices: vertices.into_iter().collect(),
            edges: edges.into_iter().collect(),
        },
        mismatches: Vec::new(),
    };
    if let Some((n, m)) = header {
        let found_vertices = parsed.value.vertices.len();
        let found_edges = parsed.value.edges.len();
        parsed.check((n != found_vertices).then_some(StructuralMismatch::VertexCount {
            declared: n,
            found: found_vertices,
        }));
        parsed.check((m != found_edges).then_some(StructuralMismatch::EdgeCount {
            declared: m,
            found: found_edges,
        }));
    }
    tracing::debug!(
        vertices = parsed.value.vertices.len(),
        edges = parsed.value.edges.len(),
        "parsed source graph"
    );
    Ok(parsed)
}

/// Writes a store as `.gr` text: the header, every edge in ascending order,
/// then one line per isolated vertex.
#[must_use]
pub fn write_source_graph(store: &GraphStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "p tw {} {}", store.vertex_count(), store.edge_count());
    for key in store.edges().sorted_unstable() {
        let _ = writeln!(out, "{} {}", key.u(), key.v());
    }
    for id in store.isolated_vertices() {
        let _ = writeln!(out, "{id}");
    }
    out
}
