//! Move-level operations on tree nodes: playing legal moves and passing,
//! creating a child node or reusing an existing one.

use anyhow::Result;

use crate::sgf::board::Colour;
use crate::sgf::coords::valid_point;
use crate::sgf::tree::{GameTree, NodeId};

impl GameTree {
    /// Play a move at the node, with full legality checks; the colour is
    /// the next player of the node's board.
    ///
    /// On success, the move's node is returned: an existing child already
    /// carrying exactly this move if there is one, otherwise a new child
    /// attached as the last sibling. On an illegal move an error is
    /// returned and the tree is left untouched.
    ///
    /// Passes cannot be played this way; use [`pass`](GameTree::pass).
    pub fn play(&mut self, id: NodeId, p: &str) -> Result<NodeId> {
        let colour = self.board(id).player;
        self.play_colour(id, p, colour)
    }

    /// Like [`play`](GameTree::play) with the colour given explicitly.
    pub fn play_colour(&mut self, id: NodeId, p: &str, colour: Colour) -> Result<NodeId> {
        self.board(id).legal_colour(p, colour)?;

        let key = colour.short_name();

        // Reuse the already-extant child if there is such a thing. A child
        // with two or more values under the move key is malformed; skip it.
        let existing = self.nodes[id].children.iter().copied().find(|&child| {
            self.nodes[child].value_count(key) == 1
                && self.nodes[child].get_value(key) == Some(p)
        });
        if let Some(child) = existing {
            return Ok(child);
        }

        let child = self.new_child(id);
        self.set_value(child, key, p);
        Ok(child)
    }

    /// Pass at the node, returning an existing pass child if there is one
    /// and a new child with an empty move value otherwise.
    pub fn pass(&mut self, id: NodeId) -> NodeId {
        let colour = self.natural_pass_colour(id);
        self.pass_colour(id, colour)
    }

    // Work out who is passing without materializing a board where we can
    // avoid it: a line showing only one colour's moves and setup stones
    // (and no PL override) means the other colour acts next. Anything
    // murkier defers to the board.
    fn natural_pass_colour(&mut self, id: NodeId) -> Colour {
        let mut saw_black = false;
        let mut saw_white = false;
        let mut saw_pl = false;
        for nid in self.get_line(id) {
            let node = self.node(nid);
            saw_black |= node.get_value("B").is_some() || node.get_value("AB").is_some();
            saw_white |= node.get_value("W").is_some() || node.get_value("AW").is_some();
            saw_pl |= node.get_value("PL").is_some();
        }
        match (saw_black, saw_white, saw_pl) {
            (true, false, false) => Colour::White,
            (false, true, false) => Colour::Black,
            _ => self.board(id).player,
        }
    }

    /// Like [`pass`](GameTree::pass) with the colour given explicitly.
    /// `Empty` is a programming error.
    pub fn pass_colour(&mut self, id: NodeId, colour: Colour) -> NodeId {
        assert!(colour != Colour::Empty, "GameTree::pass_colour(): no colour");

        let key = colour.short_name();
        let size = self.root_board_size(id);

        // Any single off-board move value under the key is a pass already.
        let existing = self.nodes[id].children.iter().copied().find(|&child| {
            let node = &self.nodes[child];
            node.value_count(key) == 1
                && node.get_value(key).is_some_and(|mv| !valid_point(mv, size))
        });
        if let Some(child) = existing {
            return child;
        }

        let child = self.new_child(id);
        self.set_value(child, key, "");
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgf::parse_sgf;

    #[test]
    fn play_creates_move_child() {
        let mut tree = crate::sgf::GameTree::new(19);
        let root = tree.roots()[0];
        let child = tree.play(root, "dd").unwrap();
        assert_eq!(tree.node(child).parent(), Some(root));
        assert_eq!(tree.node(child).all_keys(), ["B"]);
        assert_eq!(tree.node(child).get_value("B"), Some("dd"));

        let grandchild = tree.play(child, "pp").unwrap();
        assert_eq!(tree.node(grandchild).get_value("W"), Some("pp"));
    }

    #[test]
    fn play_is_idempotent() {
        let mut tree = crate::sgf::GameTree::new(19);
        let root = tree.roots()[0];
        let a = tree.play(root, "dd").unwrap();
        let b = tree.play(root, "dd").unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.node(root).children().len(), 1);
    }

    #[test]
    fn play_reuses_parsed_children() {
        let mut tree = parse_sgf("(;SZ[19](;B[dd])(;B[pp]))").unwrap();
        let root = tree.roots()[0];
        let existing = tree.node(root).children()[1];
        assert_eq!(tree.play(root, "pp").unwrap(), existing);
        assert_eq!(tree.node(root).children().len(), 2);
    }

    #[test]
    fn illegal_play_leaves_tree_alone() {
        let mut tree = parse_sgf("(;SZ[19];B[dd])").unwrap();
        let end = tree.get_end(tree.roots()[0]);
        let before = tree.tree_size(end);
        let board_before = tree.board(end);

        let err = tree.play(end, "dd").unwrap_err();
        assert!(err.to_string().contains("not empty"));
        let err = tree.play(end, "zz").unwrap_err();
        assert!(err.to_string().contains("off-board"));

        assert_eq!(tree.tree_size(end), before);
        assert!(tree.node(end).children().is_empty());
        assert_eq!(tree.board(end), board_before);
    }

    #[test]
    fn ko_recapture_via_tree() {
        // black takes the ko at ed, white retakes at dd, black may not
        // recapture immediately
        let mut tree = parse_sgf(
            "(;SZ[19];B[dc];W[ec];B[cd];W[fd];B[de];W[ee];B[ed];W[dd])",
        )
        .unwrap();
        let end = tree.get_end(tree.roots()[0]);
        assert_eq!(tree.board(end).ko.as_deref(), Some("ed"));

        let err = tree.play(end, "ed").unwrap_err();
        assert!(err.to_string().contains("ko recapture forbidden"));
        // the ko binds only the player to move
        assert!(tree.play_colour(end, "ed", Colour::White).is_ok());
    }

    #[test]
    fn suicide_via_tree() {
        let mut tree = parse_sgf("(;SZ[19]AW[ab][ba][bb]PL[B])").unwrap();
        let root = tree.roots()[0];
        let err = tree.play(root, "aa").unwrap_err();
        assert!(err.to_string().contains("suicide forbidden"));
    }

    #[test]
    fn pass_alternates_colours() {
        let mut tree = crate::sgf::GameTree::new(19);
        let root = tree.roots()[0];
        let first = tree.pass(root);
        let second = tree.pass(first);
        let third = tree.pass(second);
        assert_eq!(tree.node(first).all_keys(), ["B"]);
        assert_eq!(tree.node(second).all_keys(), ["W"]);
        assert_eq!(tree.node(third).all_keys(), ["B"]);
        assert_eq!(tree.node(third).get_value("B"), Some(""));
    }

    #[test]
    fn pass_is_idempotent() {
        let mut tree = crate::sgf::GameTree::new(19);
        let root = tree.roots()[0];
        let a = tree.pass(root);
        let b = tree.pass(root);
        assert_eq!(a, b);
        assert_eq!(tree.node(root).children().len(), 1);
    }

    #[test]
    fn pass_colour_follows_one_sided_lines() {
        // only black stones seen: white is the one to pass
        let mut tree = parse_sgf("(;SZ[19]AB[pd][dp][pp])").unwrap();
        let root = tree.roots()[0];
        let child = tree.pass(root);
        assert_eq!(tree.node(child).all_keys(), ["W"]);

        // a PL override defers to the board
        let mut tree = parse_sgf("(;SZ[19]AB[pd]PL[B])").unwrap();
        let root = tree.roots()[0];
        let child = tree.pass(root);
        assert_eq!(tree.node(child).all_keys(), ["B"]);
    }

    #[test]
    fn pass_reuses_off_board_move_child() {
        // tt is off-board at 19, so that child is already a pass
        let mut tree = parse_sgf("(;SZ[19]AB[dd](;W[tt]))").unwrap();
        let root = tree.roots()[0];
        let existing = tree.node(root).children()[0];
        assert_eq!(tree.pass(root), existing);
    }

    #[test]
    #[should_panic]
    fn pass_empty_colour_panics() {
        let mut tree = crate::sgf::GameTree::new(19);
        let root = tree.roots()[0];
        tree.pass_colour(root, Colour::Empty);
    }
}
