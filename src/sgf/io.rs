use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::sgf::gib::load_gib;
use crate::sgf::ngf::load_ngf;
use crate::sgf::parser::parse_sgf;
use crate::sgf::tree::GameTree;

/// Load a game record from disk, choosing the reader by filename suffix:
/// `.gib` (Tygem) and `.ngf` (WBaduk) go through the foreign-format
/// readers, anything else is treated as SGF.
///
/// Real kifu files are frequently not valid UTF-8; bytes that do not
/// decode are replaced rather than refused.
pub fn load(path: impl AsRef<Path>) -> Result<GameTree> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("gib") => load_gib(&text),
        Some(ext) if ext.eq_ignore_ascii_case("ngf") => load_ngf(&text),
        _ => parse_sgf(&text),
    }
}

/// Like [`load`], but keeps only the main line of each game record.
pub fn load_main_line(path: impl AsRef<Path>) -> Result<GameTree> {
    let mut tree = load(path)?;
    let roots = tree.roots().to_vec();
    for root in roots {
        tree.strip_variations(root);
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgf::write_sgf;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("kifu-test-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = scratch_path("roundtrip.sgf");
        let tree = parse_sgf("(;GM[1]FF[4]SZ[19];B[dd](;W[pp])(;W[dp]))").unwrap();
        crate::sgf::save(&tree, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(write_sgf(&loaded), write_sgf(&tree));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn main_line_loader_drops_variations() {
        let path = scratch_path("mainline.sgf");
        fs::write(&path, "(;SZ[19];B[dd](;W[pp];B[qq])(;W[dp]))").unwrap();

        let tree = load_main_line(&path).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.tree_size(root), 4);
        let end = tree.get_end(root);
        assert_eq!(tree.node(end).get_value("B"), Some("qq"));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load("no-such-file-anywhere.sgf").unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
