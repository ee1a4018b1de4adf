//! Reader for Tygem's .gib format.
//!
//! Line-oriented and mostly undocumented; this reads the fields that have
//! SGF equivalents and ignores the rest. Anything absent from the source
//! stays absent from the tree.

use anyhow::Result;
use chrono::NaiveDate;

use crate::sgf::coords::{handicap_points, point};
use crate::sgf::tree::GameTree;

pub fn load_gib(gib: &str) -> Result<GameTree> {
    let mut tree = GameTree::new(19);
    let root = tree.roots()[0];
    let mut node = root;

    for line in gib.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("\\[GAMEBLACKNAME=") {
            if let Some(name) = rest.strip_suffix("\\]") {
                tree.set_value(root, "PB", name);
            }
        }
        if let Some(rest) = line.strip_prefix("\\[GAMEWHITENAME=") {
            if let Some(name) = rest.strip_suffix("\\]") {
                tree.set_value(root, "PW", name);
            }
        }

        if line.starts_with("\\[GAMETAG=") {
            let (dt, re, km) = parse_gametag(line);
            if let Some(dt) = dt {
                tree.set_value(root, "DT", &dt);
            }
            if let Some(re) = re {
                tree.set_value(root, "RE", &re);
            }
            if let Some(km) = km {
                tree.set_value(root, "KM", &km);
            }
        }

        let fields: Vec<&str> = line.split_whitespace().collect();

        // INI carries the handicap in its fourth field.
        if fields.len() >= 4 && fields[0] == "INI" {
            if let Ok(handicap) = fields[3].parse::<usize>() {
                if (2..=9).contains(&handicap) {
                    tree.set_value(root, "HA", &handicap.to_string());
                    tree.set_values(root, "AB", &handicap_points(19, handicap, true));
                }
            }
        }

        // STO lines are the moves: "STO 0 2 <colour> <x> <y>", colour 2
        // meaning white.
        if fields.len() == 6 && fields[0] == "STO" {
            let x = fields[4].parse::<usize>().unwrap_or(usize::MAX);
            let y = fields[5].parse::<usize>().unwrap_or(usize::MAX);
            let key = if fields[3] == "2" { "W" } else { "B" };
            let child = tree.new_child(node);
            tree.set_value(child, key, &point(x, y));
            node = child;
        }
    }

    Ok(tree)
}

// The GAMETAG line is a comma-separated bag of single-letter-prefixed
// fields: C is the date, W the result code, G the komi in tenths, Z the
// winning margin in tenths.
fn parse_gametag(line: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut dt = None;
    let mut re: Option<String> = None;
    let mut km = None;
    let mut zipsu = 0i64;

    for s in line.split(',') {
        let mut chars = s.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        let rest = chars.as_str();
        match first {
            'C' => {
                // e.g. C2016:03:10:21:39 — keep the date part
                let raw = rest.get(..10).unwrap_or(rest);
                dt = NaiveDate::parse_from_str(raw, "%Y:%m:%d")
                    .ok()
                    .map(|d| d.format("%Y-%m-%d").to_string());
            }
            'W' => {
                if let Ok(grlt) = rest.parse::<i64>() {
                    re = match grlt {
                        0 => Some("B+".to_string()),
                        1 => Some("W+".to_string()),
                        3 => Some("B+R".to_string()),
                        4 => Some("W+R".to_string()),
                        7 => Some("B+T".to_string()),
                        8 => Some("W+T".to_string()),
                        _ => None,
                    };
                }
            }
            'G' => {
                if let Ok(gongje) = rest.parse::<i64>() {
                    km = Some(format!("{:.1}", gongje as f64 / 10.0));
                }
            }
            'Z' => {
                zipsu = rest.parse().unwrap_or(0);
            }
            _ => {}
        }
    }

    if zipsu > 0 {
        if let Some(r) = &re {
            if r == "B+" || r == "W+" {
                re = Some(format!("{}{:.1}", r, zipsu as f64 / 10.0));
            }
        }
    }

    (dt, re, km)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgf::Colour;

    const SAMPLE: &str = "\
\\[GAMEBLACKNAME=Lee Sedol\\]
\\[GAMEWHITENAME=Gu Li\\]
\\[GAMETAG=S1,R3,W4,G65,Z0,T30-3-1200,C2016:03:10:21:39\\]
INI 0 1 3 &4
STO 0 2 2 15 15
STO 0 3 1 2 3
STO 0 4 2 16 3
";

    #[test]
    fn metadata() {
        let tree = load_gib(SAMPLE).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("SZ"), Some("19"));
        assert_eq!(tree.node(root).get_value("PB"), Some("Lee Sedol"));
        assert_eq!(tree.node(root).get_value("PW"), Some("Gu Li"));
        assert_eq!(tree.node(root).get_value("DT"), Some("2016-03-10"));
        assert_eq!(tree.node(root).get_value("RE"), Some("W+R"));
        assert_eq!(tree.node(root).get_value("KM"), Some("6.5"));
    }

    #[test]
    fn handicap_stones() {
        let tree = load_gib(SAMPLE).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("HA"), Some("3"));
        // Tygem layout: the third stone is top left
        assert_eq!(tree.node(root).all_values("AB"), ["pd", "dp", "dd"]);
    }

    #[test]
    fn moves_form_the_main_line() {
        let mut tree = load_gib(SAMPLE).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.tree_size(root), 4);
        let first = tree.node(root).main_child().unwrap();
        assert_eq!(tree.node(first).get_value("W"), Some("pp"));
        let end = tree.get_end(root);
        assert_eq!(tree.node(end).get_value("W"), Some("qd"));
        assert_eq!(tree.board(end).get("cd"), Colour::Black);
    }

    #[test]
    fn margin_results() {
        let (_, re, _) = parse_gametag("\\[GAMETAG=S1,W0,Z35,G65\\]");
        assert_eq!(re.as_deref(), Some("B+3.5"));
        // the margin is only appended to a bare B+/W+
        let (_, re, _) = parse_gametag("\\[GAMETAG=S1,W4,Z35,G65\\]");
        assert_eq!(re.as_deref(), Some("W+R"));
    }

    #[test]
    fn bad_date_is_omitted() {
        let tree = load_gib("\\[GAMETAG=S1,Cnot-a-date,W0,G0\\]\n").unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("DT"), None);
        assert_eq!(tree.node(root).get_value("RE"), Some("B+"));
    }
}
