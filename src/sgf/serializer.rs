use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::sgf::tree::{GameTree, NodeId};

/// Serialise an entire [`GameTree`] back to SGF text.
///
/// Each top-level game record (root) is written as its own `(…)` tree,
/// one per line. Property keys and values come out in stable insertion
/// order, so parse → write → parse is byte-stable.
pub fn write_sgf(tree: &GameTree) -> String {
    let mut out = String::new();
    for &root in tree.roots() {
        write_record(tree, root, &mut out);
        out.push('\n');
    }
    out
}

/// Write a tree to disk as SGF.
pub fn save(tree: &GameTree, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, write_sgf(tree)).with_context(|| format!("writing {}", path.display()))
}

/// Write one game record rooted at `root` into `out`.
///
/// Branching rules:
/// - **0 children** — the line ends.
/// - **1 child** — continue inline (no extra parentheses).
/// - **2+ children** — each child is a separate variation, wrapped in `(…)`.
///
/// The single-child spine is iterated rather than recursed so that a long
/// game costs constant stack; recursion happens only at branch points.
fn write_record(tree: &GameTree, root: NodeId, out: &mut String) {
    out.push('(');
    let mut id = root;
    loop {
        out.push(';');
        for (key, values) in tree.node(id).all_properties() {
            out.push_str(&key);
            for value in &values {
                out.push('[');
                escape_into(value, out);
                out.push(']');
            }
        }
        let children = tree.node(id).children();
        match children.len() {
            0 => break,
            1 => id = children[0],
            _ => {
                for &child in children {
                    write_record(tree, child, out);
                }
                break;
            }
        }
    }
    out.push(')');
}

// ']' and '\' must be escaped inside a value; everything else passes
// through untouched.
fn escape_into(value: &str, out: &mut String) {
    for c in value.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}
