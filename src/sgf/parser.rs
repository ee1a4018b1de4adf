use anyhow::Result;
use pest_consume::{Parser, match_nodes};

use crate::sgf::tree::{GameTree, NodeId};

type Node<'i> = pest_consume::Node<'i, Rule, ()>;
type ParseResult<T> = std::result::Result<T, pest_consume::Error<Rule>>;

/// Recursive intermediate representation that mirrors the SGF grammar.
/// Private to this module — callers only see `GameTree`.
struct ParsedObject {
    nodes: Vec<Vec<(String, Vec<String>)>>,
    children: Vec<ParsedObject>,
}

/// Drop every escape slash, keeping the byte it protected. The store holds
/// values in decoded form; escaping only exists in the textual format.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Parser)]
#[grammar = "sgf.pest"]
struct SgfParser;

#[pest_consume::parser]
impl SgfParser {
    fn EOI(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn value_text(input: Node) -> ParseResult<String> {
        Ok(unescape(input.as_str()))
    }

    fn prop_value(input: Node) -> ParseResult<String> {
        match_nodes!(input.into_children();
            [value_text(v)] => Ok(v)
        )
    }

    fn prop_ident(input: Node) -> ParseResult<String> {
        // Lowercase letters are FF[3] identifier noise ("CoPyright" is CP).
        Ok(input.as_str().chars().filter(char::is_ascii_uppercase).collect())
    }

    fn property(input: Node) -> ParseResult<(String, Vec<String>)> {
        match_nodes!(input.into_children();
            [prop_ident(ident), prop_value(values)..] => Ok((ident, values.collect()))
        )
    }

    fn node(input: Node) -> ParseResult<Vec<(String, Vec<String>)>> {
        match_nodes!(input.into_children();
            [property(props)..] => Ok(props.collect())
        )
    }

    fn object(input: Node) -> ParseResult<ParsedObject> {
        let mut nodes: Vec<Vec<(String, Vec<String>)>> = Vec::new();
        let mut children: Vec<ParsedObject> = Vec::new();

        for child in input.into_children() {
            match child.as_rule() {
                Rule::node => nodes.push(Self::node(child)?),
                Rule::object => children.push(Self::object(child)?),
                _ => {}
            }
        }

        Ok(ParsedObject { nodes, children })
    }

    fn file(input: Node) -> ParseResult<Vec<ParsedObject>> {
        match_nodes!(input.into_children();
            [object(trees).., EOI(_)] => Ok(trees.collect())
        )
    }
}

// ---------------------------------------------------------------------------
// Arena ingestion — defined here because ParsedObject is private to this module
// ---------------------------------------------------------------------------

impl GameTree {
    /// Flatten a list of `ParsedObject`s into an arena-based `GameTree`,
    /// one root per top-level record.
    fn ingest(parsed_objects: Vec<ParsedObject>) -> Self {
        let mut tree = GameTree { nodes: Vec::new(), roots: Vec::new() };
        for parsed in parsed_objects {
            if let Some(root_id) = tree.ingest_object(parsed, None) {
                tree.roots.push(root_id);
            }
        }
        tree
    }

    /// Recursively insert one `ParsedObject` into the arena, linking nodes
    /// to `parent`. Returns the `NodeId` of the first node created (the
    /// local root of this branch).
    fn ingest_object(&mut self, parsed: ParsedObject, parent: Option<NodeId>) -> Option<NodeId> {
        let mut first_id: Option<NodeId> = None;
        let mut last_id = parent;

        for props in parsed.nodes {
            let id = self.alloc(last_id);
            // Funnel through add_value so repeated values collapse the same
            // way they would through the editing API.
            for (key, values) in props {
                for value in values {
                    self.add_value(id, &key, &value);
                }
            }
            first_id.get_or_insert(id);
            last_id = Some(id);
        }

        for child in parsed.children {
            self.ingest_object(child, last_id);
        }

        first_id
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn parse_sgf(input: &str) -> Result<GameTree> {
    let inputs = SgfParser::parse(Rule::file, input)?;
    let input = inputs.single()?;
    let parsed_objects = SgfParser::file(input)?;
    Ok(GameTree::ingest(parsed_objects))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_game() {
        let tree = parse_sgf("(;GM[1]FF[4]SZ[19];B[dd];W[pd];B[dp])").unwrap();
        assert_eq!(tree.roots().len(), 1);
        let root = tree.roots()[0];
        assert_eq!(tree.tree_size(root), 4);
        assert_eq!(tree.node(root).get_value("SZ"), Some("19"));
        let end = tree.get_end(root);
        assert_eq!(tree.node(end).get_value("B"), Some("dp"));
    }

    #[test]
    fn variations() {
        let tree = parse_sgf("(;SZ[19];B[dd](;W[pd])(;W[dp];B[pp]))").unwrap();
        let root = tree.roots()[0];
        let b = tree.node(root).main_child().unwrap();
        assert_eq!(tree.node(b).children().len(), 2);
        assert_eq!(tree.tree_size(root), 5);
    }

    #[test]
    fn collections() {
        let tree = parse_sgf("(;B[aa])(;B[bb];W[cc])(;B[dd])").unwrap();
        assert_eq!(tree.roots().len(), 3);
        assert_eq!(tree.tree_size(tree.roots()[1]), 2);
    }

    #[test]
    fn multiple_values() {
        let tree = parse_sgf("(;AB[dd][pp][dp])").unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).all_values("AB"), ["dd", "pp", "dp"]);
    }

    #[test]
    fn duplicate_values_collapse() {
        let tree = parse_sgf("(;AB[dd][dd][pp])").unwrap();
        assert_eq!(tree.node(tree.roots()[0]).all_values("AB"), ["dd", "pp"]);
    }

    #[test]
    fn escapes_are_decoded() {
        let tree = parse_sgf(r"(;LB[pd:\\]C[This comment has a \\ character.])").unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("LB"), Some(r"pd:\"));
        assert_eq!(
            tree.node(root).get_value("C"),
            Some(r"This comment has a \ character.")
        );

        let tree = parse_sgf(r"(;C[a \] bracket])").unwrap();
        assert_eq!(tree.node(tree.roots()[0]).get_value("C"), Some("a ] bracket"));
    }

    #[test]
    fn values_keep_whitespace_and_unicode() {
        let tree = parse_sgf("(;C[two\nlines  spaced]PB[播放機]PW[戰鬥機])").unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("C"), Some("two\nlines  spaced"));
        assert_eq!(tree.node(root).get_value("PB"), Some("播放機"));
        assert_eq!(tree.node(root).get_value("PW"), Some("戰鬥機"));
    }

    #[test]
    fn empty_value_is_kept() {
        let tree = parse_sgf("(;B[])").unwrap();
        assert_eq!(tree.node(tree.roots()[0]).get_value("B"), Some(""));
    }

    #[test]
    fn lowercase_outside_values_is_ignored() {
        let tree = parse_sgf("(;CoPyright[x]garbage;B[dd]junk)").unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("CP"), Some("x"));
        assert_eq!(tree.tree_size(root), 2);
    }

    #[test]
    fn whitespace_everywhere() {
        let tree = parse_sgf("  (\n ; SZ [19]\n ; B [dd]\n )\n").unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("SZ"), Some("19"));
        assert_eq!(tree.tree_size(root), 2);
    }

    #[test]
    fn truncated_input_still_loads() {
        let tree = parse_sgf("(;SZ[19];B[dd];W[pp]").unwrap();
        assert_eq!(tree.tree_size(tree.roots()[0]), 3);
        let tree = parse_sgf("(;SZ[19];B[dd](;W[pp]").unwrap();
        assert_eq!(tree.tree_size(tree.roots()[0]), 3);
    }

    #[test]
    fn bad_inputs_error() {
        assert!(parse_sgf("").is_err());
        assert!(parse_sgf("()").is_err());
        assert!(parse_sgf("1(;B[aa])").is_err());
        assert!(parse_sgf(";B[aa]").is_err());
        assert!(parse_sgf(r"(;C[escape at end \").is_err());
    }

    #[test]
    fn key_order_is_stable() {
        let tree = parse_sgf("(;GM[1]FF[4]CA[UTF-8]SZ[19]PB[x]PW[y])").unwrap();
        assert_eq!(
            tree.node(tree.roots()[0]).all_keys(),
            ["GM", "FF", "CA", "SZ", "PB", "PW"]
        );
    }
}
