//! Per-node memoized boards.
//!
//! Boards are created only as needed; plenty of tree manipulation happens
//! without ever building one. The cache obeys one structural rule: if a
//! node's cache is present, so is every ancestor's, because materializing
//! a board fills in the whole line above it. Equivalently, once a purge
//! meets a node whose cache is already empty, everything below it is
//! empty too — which is what keeps invalidation proportional to the dirty
//! subtree rather than the whole tree.

use crate::sgf::board::{Board, Colour};
use crate::sgf::tree::{GameTree, MUTORS, NodeId};

fn is_rectangle(value: &str) -> bool {
    value.len() == 5 && value.as_bytes()[2] == b':'
}

impl GameTree {
    /// Called by every property edit: a board-altering key invalidates the
    /// node's subtree's cached boards.
    pub(crate) fn mutor_check(&mut self, id: NodeId, key: &str) {
        if MUTORS.contains(&key) {
            self.clear_board_cache_recursive(id);
        }
    }

    /// Purge the cached boards of `id`'s subtree, stopping at nodes whose
    /// cache is already empty (their descendants' caches are empty too).
    pub(crate) fn clear_board_cache_recursive(&mut self, id: NodeId) {
        if self.nodes[id].board_cache.is_none() {
            return;
        }
        self.nodes[id].board_cache = None;
        for i in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[i];
            self.clear_board_cache_recursive(child);
        }
    }

    /// The board position implied by the whole history from the root down
    /// to this node.
    ///
    /// The result is cached on the node (and on every uncached ancestor
    /// visited on the way), so repeat requests are a copy. Callers always
    /// receive their own copy: editing it has no effect on the tree.
    pub fn board(&mut self, id: NodeId) -> Board {
        if let Some(cached) = &self.nodes[id].board_cache {
            return cached.clone();
        }

        // Replay from the deepest cached ancestor (or a fresh root board),
        // filling in every empty cache on the line as we go.
        let line = self.get_line(id);
        let mut seed: Option<NodeId> = None;
        let mut work: Option<Board> = None;

        for &nid in &line {
            if self.nodes[nid].board_cache.is_some() {
                seed = Some(nid);
                continue;
            }
            let mut board = match work.take() {
                Some(b) => b,
                None => match seed {
                    Some(s) => self.nodes[s].board_cache.as_ref().unwrap().clone(),
                    None => Board::new(self.root_board_size(id)),
                },
            };
            self.update_from_node(&mut board, nid);
            self.nodes[nid].board_cache = Some(board.clone());
            work = Some(board);
        }

        // The line ends at this node, whose cache was empty, so work was
        // filled on the last step. Only copies of it were stored, so it is
        // safe to hand out.
        work.expect("GameTree::board(): nothing materialized")
    }

    // Apply one node's properties to a working board. AB, AW and AE go
    // through add_stone/add_list, which can create illegal positions;
    // that is normal for setup properties. B and W go through
    // force_stone, which performs captures, flips the player and
    // maintains the ko square.
    fn update_from_node(&self, board: &mut Board, id: NodeId) {
        let node = &self.nodes[id];

        for (key, colour) in [
            ("AB", Colour::Black),
            ("AW", Colour::White), // player set last wins, so AW beats AB
            ("AE", Colour::Empty),
        ] {
            for p in node.all_values(key) {
                if is_rectangle(&p) {
                    board.add_list(&p, colour);
                } else {
                    board.add_stone(&p, colour);
                }
            }
        }

        for p in node.all_values("B") {
            board.force_stone(&p, Colour::Black);
        }
        for p in node.all_values("W") {
            board.force_stone(&p, Colour::White);
        }

        match node.get_value("PL") {
            Some("B") | Some("b") => board.player = Colour::Black,
            Some("W") | Some("w") => board.player = Colour::White,
            _ => {}
        }
    }
}
