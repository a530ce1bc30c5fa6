use std::fmt::Write;

use indexmap::IndexMap;

use super::{FormatError, Parsed, StructuralMismatch, parse_count, parse_id, tokenized_lines};
use crate::{
    decomposition::{Bag, BagId, Decomposition},
    graph::VertexId,
};

/// Reads a tree decomposition.
///
/// ```text
/// s td <bags> <largest bag size> <vertices>
/// b <bag> <v1> ... <vk>
/// <bag> <bag>
/// ```
///
/// # Errors
/// Returns an error for malformed lines, repeated bag ids, or tree edges
/// naming a bag that is never declared.
pub fn parse_decomposition(text: &str) -> Result<Parsed<Decomposition>, FormatError> {
    let mut header = None;
    let mut bags: IndexMap<BagId, (usize, Vec<VertexId>)> = IndexMap::new();
    let mut tree_edges = Vec::new();

    for (line, raw, tokens) in tokenized_lines(text) {
        let invalid_header = || FormatError::InvalidHeader {
            line,
            text: raw.to_owned(),
        };
        match tokens.as_slice() {
            ["s", "td", counts @ ..] => {
                let [b, w, v] = counts else {
                    return Err(invalid_header());
                };
                let (Some(b), Some(w), Some(v)) = (parse_count(b), parse_count(w), parse_count(v))
                else {
                    return Err(invalid_header());
                };
                header = Some((b, w, v));
            }
            ["s", ..] => return Err(invalid_header()),
            ["b", rest @ ..] => {
                let Some((id, contents)) = rest.split_first() else {
                    return Err(FormatError::InvalidBag {
                        line,
                        text: raw.to_owned(),
                    });
                };
                let id = id.parse::<u32>().ok().filter(|id| *id > 0).ok_or_else(|| {
                    FormatError::InvalidBag {
                        line,
                        text: raw.to_owned(),
                    }
                })?;
                let contents = contents
                    .iter()
                    .map(|token| parse_id(line, token).map(VertexId))
                    .collect::<Result<Vec<_>, _>>()?;
                if bags.insert(BagId(id), (line, contents)).is_some() {
                    return Err(FormatError::DuplicateBag { line, bag: id });
                }
            }
            [a, b] => {
                let a = parse_id(line, a)?;
                let b = parse_id(line, b)?;
                tree_edges.push((line, BagId(a), BagId(b)));
            }
            _ => {
                return Err(FormatError::UnexpectedLine {
                    line,
                    text: raw.to_owned(),
                });
            }
        }
    }

    for (line, a, b) in &tree_edges {
        if let Some(missing) = [a, b].into_iter().find(|id| !bags.contains_key(*id)) {
            return Err(FormatError::UnknownBag {
                line: *line,
                bag: missing.0,
            });
        }
    }

    let decomposition = Decomposition::new(
        bags.into_iter()
            .map(|(id, (_, contents))| Bag { id, contents }),
        tree_edges.into_iter().map(|(_, a, b)| (a, b)),
    );
    let mut parsed = Parsed {
        value: decomposition,
        mismatches: Vec::new(),
    };
    let bag_count = parsed.value.bag_count();
    if let Some((b, w, v)) = header {
        let largest = parsed.value.max_bag_size();
        let vertices = parsed.value.vertex_count();
        parsed.check((b != bag_count).then_some(StructuralMismatch::BagCount {
            declared: b,
            found: bag_count,
        }));
        parsed.check((w != largest).then_some(StructuralMismatch::BagSize {
            declared: w,
            found: largest,
        }));
        parsed.check((v != vertices).then_some(StructuralMismatch::VertexCount {
            declared: v,
            found: vertices,
        }));
    }
    let tree_edge_count = parsed.value.tree_edges().len();
    if bag_count > 0 {
        parsed.check(
            (tree_edge_count != bag_count - 1).then_some(StructuralMismatch::TreeEdgeCount {
                expected: bag_count - 1,
                found: tree_edge_count,
            }),
        );
    }
    Ok(parsed)
}

/// Writes a decomposition as `.td` text.
///
/// The header's second count is the largest bag size, one more than the
/// width.
#[must_use]
pub fn write_decomposition(decomposition: &Decomposition) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "s td {} {} {}",
        decomposition.bag_count(),
        decomposition.max_bag_size(),
        decomposition.vertex_count()
    );
    for bag in decomposition.bags() {
        let _ = write!(out, "b {}", bag.id);
        for vertex in &bag.contents {
            let _ = write!(out, " {vertex}");
        }
        out.push('\n');
    }
    for (a, b) in decomposition.tree_edges() {
        let _ = writeln!(out, "{a} {b}");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use insta::assert_snapshot;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{parse_decomposition, write_decomposition};
    use crate::{
        decomposition::{BagId, Decomposition},
        format::{FormatError, StructuralMismatch},
        graph::VertexId,
    };

    fn ids(raw: &[u32]) -> Vec<VertexId> {
        raw.iter().copied().map(VertexId).collect()
    }

    #[test]
    fn path_exports_largest_bag_size() {
        let decomposition = Decomposition::from_indexed([ids(&[1, 2]), ids(&[2, 3])], [(0, 1)]);
        assert_eq!(
            write_decomposition(&decomposition),
            "s td 2 2 3\nb 1 1 2\nb 2 2 3\n1 2\n"
        );
    }

    #[test]
    fn bag_contents_keep_engine_order() {
        let decomposition = Decomposition::from_indexed(
            [ids(&[3, 1, 2]), ids(&[]), ids(&[4, 3])],
            [(0, 2), (1, 2)],
        );
        assert_snapshot!(write_decomposition(&decomposition), @r"
        s td 3 3 4
        b 1 3 1 2
        b 2
        b 3 4 3
        1 3
        2 3
        ");
    }

    #[test]
    fn bags_are_read_in_any_order() {
        let parsed = parse_decomposition("c out of order\ns td 2 2 3\n2 1\nb 2 3 2\nb 1 1 2\n")
            .unwrap();
        assert!(parsed.mismatches.is_empty());
        assert_eq!(
            parsed.value.bags().map(|bag| bag.id).collect::<Vec<_>>(),
            vec![BagId(1), BagId(2)]
        );
        assert_eq!(parsed.value.bag(BagId(2)).unwrap().contents, ids(&[3, 2]));
    }

    #[test]
    fn header_disagreements_are_recorded() {
        let parsed = parse_decomposition("s td 3 2 2\nb 1 1 2 3\nb 2 3\n").unwrap();
        assert_eq!(
            parsed.mismatches,
            vec![
                StructuralMismatch::BagCount {
                    declared: 3,
                    found: 2
                },
                StructuralMismatch::BagSize {
                    declared: 2,
                    found: 3
                },
                StructuralMismatch::VertexCount {
                    declared: 2,
                    found: 3
                },
                StructuralMismatch::TreeEdgeCount {
                    expected: 1,
                    found: 0
                },
            ]
        );
    }

    #[rstest]
    #[case("s td 1 1\n", FormatError::InvalidHeader { line: 1, text: "s td 1 1".to_owned() })]
    #[case("b\n", FormatError::InvalidBag { line: 1, text: "b".to_owned() })]
    #[case("b x 1\n", FormatError::InvalidBag { line: 1, text: "b x 1".to_owned() })]
    #[case("b 1 1\nb 1 2\n", FormatError::DuplicateBag { line: 2, bag: 1 })]
    #[case("b 1 1\n1 2\n", FormatError::UnknownBag { line: 2, bag: 2 })]
    #[case("b 1 y\n", FormatError::InvalidVertex { line: 1, token: "y".to_owned() })]
    fn malformed_input(#[case] input: &str, #[case] expected: FormatError) {
        assert_eq!(parse_decomposition(input), Err(expected));
    }

    fn arb_decomposition() -> impl Strategy<Value = Decomposition> {
        prop::collection::vec(prop::collection::btree_set(1..20_u32, 0..6), 1..8).prop_flat_map(
            |bags| {
                let n = bags.len();
                // each bag after the first hangs off an earlier one
                let parents: Vec<_> = (1..n).map(|i| 0..i).collect();
                (Just(bags), parents).prop_map(|(bags, parents)| {
                    Decomposition::from_indexed(
                        bags.into_iter()
                            .map(|bag| bag.into_iter().map(VertexId).collect()),
                        parents.into_iter().enumerate().map(|(i, p)| (p, i + 1)),
                    )
                })
            },
        )
    }

    proptest! {
        #[test]
        fn round_trip_preserves_bags_and_tree(decomposition in arb_decomposition()) {
            let parsed = parse_decomposition(&write_decomposition(&decomposition)).unwrap();
            prop_assert!(parsed.mismatches.is_empty());

            let contents = |d: &Decomposition| {
                d.bags()
                    .map(|bag| (bag.id, bag.contents.iter().copied().collect::<BTreeSet<_>>()))
                    .collect::<Vec<_>>()
            };
            let tree = |d: &Decomposition| d.tree_edges().iter().copied().collect::<BTreeSet<_>>();
            prop_assert_eq!(contents(&parsed.value), contents(&decomposition));
            prop_assert_eq!(tree(&parsed.value), tree(&decomposition));
        }
    }
}
