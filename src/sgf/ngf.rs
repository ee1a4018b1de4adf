//! Reader for WBaduk's .ngf format: a fixed header of numbered lines
//! followed by `PM` move rows whose coordinates are letters counted from
//! `'B'`. Lossy, like the .gib reader.

use anyhow::{Result, ensure};
use chrono::NaiveDate;

use crate::sgf::coords::{MAX_SIZE, handicap_points, point};
use crate::sgf::tree::GameTree;

pub fn load_ngf(ngf: &str) -> Result<GameTree> {
    let lines: Vec<&str> = ngf.trim().lines().collect();

    let mut boardsize = 0i64;
    let mut handicap = 0i64;
    let mut pb = "";
    let mut pw = "";
    let mut rawdate = "";
    let mut komi = 0.0f64;
    let mut re = "";

    if lines.len() >= 9 {
        boardsize = lines[1].trim().parse().unwrap_or(0);
        pw = lines[2].split_whitespace().next().unwrap_or("");
        pb = lines[3].split_whitespace().next().unwrap_or("");
        handicap = lines[5].trim().parse().unwrap_or(0);
        komi = lines[7].trim().parse().unwrap_or(0.0);
        rawdate = lines[8].get(..8).unwrap_or("");
    }

    if lines.len() >= 11 {
        if lines[10].contains("hite win") {
            re = "W+";
        } else if lines[10].contains("lack win") {
            re = "B+";
        }
    }

    ensure!((0..=9).contains(&handicap), "load_ngf(): got bad handicap");
    ensure!(
        (1..=MAX_SIZE as i64).contains(&boardsize),
        "load_ngf(): bad board size {boardsize}"
    );
    let boardsize = boardsize as usize;

    let mut tree = GameTree::new(boardsize);
    let root = tree.roots()[0];
    let mut node = root;

    if handicap > 1 {
        tree.set_value(root, "HA", &handicap.to_string());
        tree.set_values(root, "AB", &handicap_points(boardsize, handicap as usize, true));
    }
    if komi != 0.0 {
        tree.set_value(root, "KM", &format!("{komi:.1}"));
    }
    if let Ok(date) = NaiveDate::parse_from_str(rawdate, "%Y%m%d") {
        tree.set_value(root, "DT", &date.format("%Y-%m-%d").to_string());
    }
    if !pw.is_empty() {
        tree.set_value(root, "PW", pw);
    }
    if !pb.is_empty() {
        tree.set_value(root, "PB", pb);
    }
    if !re.is_empty() {
        tree.set_value(root, "RE", re);
    }

    for line in &lines {
        let line = line.trim().to_ascii_uppercase();
        let bytes = line.as_bytes();
        if bytes.len() < 7 || !line.starts_with("PM") {
            continue;
        }
        let key = match bytes[4] {
            b'B' => "B",
            b'W' => "W",
            _ => continue,
        };
        // Coordinates run from 'B' (so 66 maps to 0; presumably 'A'
        // would have been 0-less).
        let x = bytes[5] as i64 - 66;
        let y = bytes[6] as i64 - 66;
        if (0..boardsize as i64).contains(&x) && (0..boardsize as i64).contains(&y) {
            node = tree.new_child(node);
            tree.set_value(node, key, &point(x as usize, y as usize));
        }
    }

    ensure!(
        !tree.node(root).children().is_empty(),
        "load_ngf(): no moves found"
    );

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
GO Gametape
19
whiteplayer 5D
blackplayer 3D
nothing
3
nothing
6.5
20160310 [13:55]
0
White win by resignation
PM01BCD
PM02WDD
PM03BQD
";

    #[test]
    fn metadata() {
        let tree = load_ngf(SAMPLE).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("SZ"), Some("19"));
        assert_eq!(tree.node(root).get_value("PW"), Some("whiteplayer"));
        assert_eq!(tree.node(root).get_value("PB"), Some("blackplayer"));
        assert_eq!(tree.node(root).get_value("KM"), Some("6.5"));
        assert_eq!(tree.node(root).get_value("DT"), Some("2016-03-10"));
        assert_eq!(tree.node(root).get_value("RE"), Some("W+"));
    }

    #[test]
    fn handicap_stones() {
        let tree = load_ngf(SAMPLE).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).get_value("HA"), Some("3"));
        assert_eq!(tree.node(root).all_values("AB"), ["pd", "dp", "dd"]);
    }

    #[test]
    fn moves_form_the_main_line() {
        let tree = load_ngf(SAMPLE).unwrap();
        let root = tree.roots()[0];
        assert_eq!(tree.tree_size(root), 4);
        let first = tree.node(root).main_child().unwrap();
        // C is 1, D is 2: "bc" in SGF letters
        assert_eq!(tree.node(first).get_value("B"), Some("bc"));
        let end = tree.get_end(root);
        assert_eq!(tree.node(end).get_value("B"), Some("pc"));
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(load_ngf("").is_err());
        let junk = SAMPLE.replace("\n19\n", "\n0\n");
        assert!(load_ngf(&junk).is_err());
        let junk = SAMPLE.replace("\n3\n", "\n77\n");
        assert!(load_ngf(&junk).is_err());
    }

    #[test]
    fn rejects_move_free_tapes() {
        let junk = SAMPLE
            .lines()
            .filter(|l| !l.starts_with("PM"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(load_ngf(&junk).is_err());
    }
}
