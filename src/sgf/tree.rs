use crate::sgf::board::{Board, Colour};
use crate::sgf::coords::{MAX_SIZE, valid_point};

pub type NodeId = usize;

/// The property keys that change the derived board position. Touching one
/// of these on a node invalidates every cached board in its subtree.
pub(crate) const MUTORS: [&str; 7] = ["B", "W", "AB", "AW", "AE", "PL", "SZ"];

/// One key and its ordered, duplicate-free values. A key is present in a
/// node exactly when its value list is non-empty.
#[derive(Debug, Clone)]
struct Property {
    key: String,
    values: Vec<String>,
}

/// A node of the game tree: an ordered, keyed multimap of unescaped string
/// values, links to the parent and children, and the memoized board for
/// the position it implies.
///
/// All reads live here. Every mutation — properties or structure — goes
/// through [`GameTree`], which knows how to invalidate the board caches
/// of the affected subtree.
#[derive(Debug)]
pub struct TreeNode {
    props: Vec<Property>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) board_cache: Option<Board>,
}

impl TreeNode {
    fn key_index(&self, key: &str) -> Option<usize> {
        self.props.iter().position(|p| p.key == key)
    }

    /// The first value for the key, if any.
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.props[self.key_index(key)?].values.first().map(String::as_str)
    }

    /// Every value the key has, as a fresh Vec that is safe to modify.
    pub fn all_values(&self, key: &str) -> Vec<String> {
        match self.key_index(key) {
            Some(ki) => self.props[ki].values.clone(),
            None => Vec::new(),
        }
    }

    /// Every key of the node, in stable insertion order.
    pub fn all_keys(&self) -> Vec<String> {
        self.props.iter().map(|p| p.key.clone()).collect()
    }

    /// The whole property set as (key, values) pairs, in stable order.
    pub fn all_properties(&self) -> Vec<(String, Vec<String>)> {
        self.props
            .iter()
            .map(|p| (p.key.clone(), p.values.clone()))
            .collect()
    }

    pub fn key_count(&self) -> usize {
        self.props.len()
    }

    pub fn value_count(&self, key: &str) -> usize {
        match self.key_index(key) {
            Some(ki) => self.props[ki].values.len(),
            None => 0,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The first child — the continuation of the main line — if any.
    pub fn main_child(&self) -> Option<NodeId> {
        self.children.first().copied()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// An arena-backed SGF game tree.
///
/// Nodes are owned by the arena and addressed by `NodeId`; `roots` holds
/// one id per top-level game record (an SGF file may be a collection of
/// several). Detached subtrees stay in the arena as orphans and are never
/// reclaimed, so the arena only grows — negligible for editing sessions on
/// real game records (a full 300-move game is ~300 nodes).
#[derive(Debug)]
pub struct GameTree {
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) roots: Vec<NodeId>,
}

impl GameTree {
    /// A new single-record tree whose root carries `GM[1]FF[4]SZ[size]`.
    /// Sizes outside 1..=52 are a programming error.
    pub fn new(size: usize) -> GameTree {
        assert!(
            (1..=MAX_SIZE).contains(&size),
            "GameTree::new(): invalid size {size}"
        );
        let mut tree = GameTree { nodes: Vec::new(), roots: Vec::new() };
        let root = tree.new_root();
        tree.set_value(root, "GM", "1");
        tree.set_value(root, "FF", "4");
        tree.set_value(root, "SZ", &size.to_string());
        tree
    }

    /// A new tree whose root also carries setup stones and, when `next` is
    /// a real colour, a `PL` override. Useful for handicap positions.
    pub fn new_setup<S: AsRef<str>>(
        size: usize,
        black: &[S],
        white: &[S],
        next: Colour,
    ) -> GameTree {
        let mut tree = GameTree::new(size);
        let root = tree.roots[0];
        for p in black {
            tree.add_value(root, "AB", p.as_ref());
        }
        for p in white {
            tree.add_value(root, "AW", p.as_ref());
        }
        if next != Colour::Empty {
            tree.set_value(root, "PL", next.short_name());
        }
        tree
    }

    /// The top-level game records of this tree, one per `(…)` collection
    /// entry in the source file.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub(crate) fn alloc(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            props: Vec::new(),
            parent,
            children: Vec::new(),
            board_cache: None,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    /// Append a new bare node as the last child of `parent`.
    pub fn new_child(&mut self, parent: NodeId) -> NodeId {
        self.alloc(Some(parent))
    }

    /// Create a new free root node and register it as a game record.
    pub fn new_root(&mut self) -> NodeId {
        let id = self.alloc(None);
        self.roots.push(id);
        id
    }

    /// Deep-copy a node's properties into a new free node with no parent,
    /// no children, and no cached board.
    pub fn copy_detached(&mut self, id: NodeId) -> NodeId {
        let props = self.nodes[id].props.clone();
        let copy = self.alloc(None);
        self.nodes[copy].props = props;
        copy
    }

    // -- property editing ---------------------------------------------------
    //
    // These adjust the store directly and so must run the mutor check,
    // purging cached boards when a board-altering key is touched. Everything
    // else in the crate edits properties through them.

    /// Add a value under the key, creating the key if needed. Adding a
    /// value the key already has is a no-op.
    pub fn add_value(&mut self, id: NodeId, key: &str, value: &str) {
        self.mutor_check(id, key);
        let node = &mut self.nodes[id];
        match node.key_index(key) {
            None => node.props.push(Property {
                key: key.to_string(),
                values: vec![value.to_string()],
            }),
            Some(ki) => {
                let values = &mut node.props[ki].values;
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
        }
    }

    /// Make `value` the one and only value of the key.
    pub fn set_value(&mut self, id: NodeId, key: &str, value: &str) {
        self.delete_key(id, key);
        self.add_value(id, key, value);
    }

    /// Replace the key's values wholesale, preserving the given order and
    /// dropping duplicates. An empty list removes the key.
    pub fn set_values<S: AsRef<str>>(&mut self, id: NodeId, key: &str, values: &[S]) {
        self.delete_key(id, key);
        for v in values {
            self.add_value(id, key, v.as_ref());
        }
    }

    /// Remove one value from the key; removing the last value removes the
    /// key itself.
    pub fn delete_value(&mut self, id: NodeId, key: &str, value: &str) {
        let Some(ki) = self.nodes[id].key_index(key) else {
            return;
        };
        self.mutor_check(id, key);
        let node = &mut self.nodes[id];
        node.props[ki].values.retain(|v| v != value);
        if node.props[ki].values.is_empty() {
            node.props.remove(ki);
        }
    }

    /// Remove the key and all of its values.
    pub fn delete_key(&mut self, id: NodeId, key: &str) {
        let Some(ki) = self.nodes[id].key_index(key) else {
            return;
        };
        self.mutor_check(id, key);
        self.nodes[id].props.remove(ki);
    }

    // -- structural editing -------------------------------------------------

    /// Detach `id` from its current parent (sibling order is preserved) and
    /// attach it as the new last child of `new_parent`, or leave it as a
    /// free root for `None`.
    ///
    /// Attaching a node underneath itself or one of its descendants would
    /// create a cycle; that is a programming error and panics before the
    /// tree is touched. The moved subtree's board caches are invalidated.
    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>) {
        let mut walk = new_parent;
        while let Some(n) = walk {
            assert!(n != id, "GameTree::set_parent(): cyclic attachment");
            walk = self.nodes[n].parent;
        }

        if let Some(old) = self.nodes[id].parent {
            self.nodes[old].children.retain(|&c| c != id);
        }
        self.nodes[id].parent = new_parent;
        if let Some(np) = new_parent {
            self.nodes[np].children.push(id);
        }

        self.clear_board_cache_recursive(id);
    }

    /// Detach `id`, making it a free root.
    pub fn detach(&mut self, id: NodeId) {
        self.set_parent(id, None);
    }

    // -- navigation ---------------------------------------------------------

    /// Walk parent links up to the root of `id`'s tree.
    pub fn get_root(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(parent) = self.nodes[node].parent {
            node = parent;
        }
        node
    }

    /// Follow first children down from `id` to a leaf. Called off the main
    /// line, this is the end of the current branch, not of the game.
    pub fn get_end(&self, id: NodeId) -> NodeId {
        self.iter_mainline(id).last().map(|(nid, _)| nid).unwrap_or(id)
    }

    /// Every node from the root down to `id`, inclusive, in order.
    pub fn get_line(&self, id: NodeId) -> Vec<NodeId> {
        let mut ret = Vec::new();
        let mut node = Some(id);
        while let Some(n) = node {
            ret.push(n);
            node = self.nodes[n].parent;
        }
        ret.reverse();
        ret
    }

    /// Reorder sibling lists so that the main line leads to `id`. Pure
    /// sibling reordering: no node changes parent, so no cache is touched.
    pub fn make_main_line(&mut self, id: NodeId) {
        let mut node = id;
        while let Some(parent) = self.nodes[node].parent {
            let children = &mut self.nodes[parent].children;
            if let Some(pos) = children.iter().position(|&c| c == node) {
                children.swap(0, pos);
            }
            node = parent;
        }
    }

    pub fn iter_mainline(&self, start: NodeId) -> MainlineIter<'_> {
        MainlineIter { tree: self, current: Some(start) }
    }

    pub fn iter_subtree(&self, start: NodeId) -> SubtreeIter<'_> {
        SubtreeIter { tree: self, stack: vec![start] }
    }

    // -- aggregates ---------------------------------------------------------

    /// Number of nodes in `id`'s subtree, including itself.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.iter_subtree(id).count()
    }

    /// Number of nodes in the whole tree `id` belongs to.
    pub fn tree_size(&self, id: NodeId) -> usize {
        self.subtree_size(self.get_root(id))
    }

    /// Every node of `id`'s subtree, depth first, `id` first.
    pub fn subtree_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.iter_subtree(id).map(|(nid, _)| nid).collect()
    }

    pub fn tree_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree_nodes(self.get_root(id))
    }

    /// Total (keys, values) in `id`'s subtree.
    pub fn subtree_key_value_count(&self, id: NodeId) -> (usize, usize) {
        let mut keys = 0;
        let mut vals = 0;
        for (_, node) in self.iter_subtree(id) {
            keys += node.key_count();
            for key in node.all_keys() {
                vals += node.value_count(&key);
            }
        }
        (keys, vals)
    }

    pub fn tree_key_value_count(&self, id: NodeId) -> (usize, usize) {
        self.subtree_key_value_count(self.get_root(id))
    }

    // -- root helpers -------------------------------------------------------

    /// The root `SZ` value clamped to 1..=52, defaulting to 19 when
    /// missing or unparseable. Walks to the root; callers that need it
    /// repeatedly should keep the result.
    pub fn root_board_size(&self, id: NodeId) -> usize {
        let root = self.get_root(id);
        let sz = self.nodes[root]
            .get_value("SZ")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        if sz < 1 {
            19
        } else if sz > MAX_SIZE as i64 {
            MAX_SIZE
        } else {
            sz as usize
        }
    }

    /// The root `KM` value, defaulting to 0.
    pub fn root_komi(&self, id: NodeId) -> f64 {
        let root = self.get_root(id);
        self.nodes[root]
            .get_value("KM")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// The Dyer signature of the tree: the points played on main-line
    /// plies 20, 40, 60, 31, 51 and 71, concatenated in that order, with
    /// `??` standing in for missing or off-board moves.
    pub fn dyer(&self, id: NodeId) -> String {
        const PLIES: [usize; 6] = [20, 40, 60, 31, 51, 71];

        let root = self.get_root(id);
        let size = self.root_board_size(root);
        let mut sig = ["??", "??", "??", "??", "??", "??"].map(String::from);
        let mut move_count = 0;

        for (_, node) in self.iter_mainline(root) {
            for key in ["B", "W"] {
                // one value per node, as per the format's conventions
                if let Some(mv) = node.get_value(key) {
                    move_count += 1;
                    if let Some(i) = PLIES.iter().position(|&ply| ply == move_count) {
                        if valid_point(mv, size) {
                            sig[i] = mv.to_string();
                        }
                    }
                }
            }
            if move_count > 71 {
                break;
            }
        }
        sig.concat()
    }

    // -- whole-tree transforms ----------------------------------------------

    /// Build a tree isomorphic to `id`'s tree. The mutator is called for
    /// every node in depth-first order with the node and the board size,
    /// and returns the ordered property set the image node should carry.
    /// Returns the new tree and the image of `id`. The original tree is
    /// untouched.
    pub fn mutate_tree<F>(&self, id: NodeId, mut mutator: F) -> (GameTree, NodeId)
    where
        F: FnMut(&TreeNode, usize) -> Vec<(String, Vec<String>)>,
    {
        let root = self.get_root(id);
        let size = self.root_board_size(root);
        let mut out = GameTree { nodes: Vec::new(), roots: Vec::new() };
        let mut image = None;
        let new_root = self.mutate_recursive(root, size, &mut mutator, id, &mut image, &mut out, None);
        out.roots.push(new_root);
        let image = image.expect("GameTree::mutate_tree(): image of node not found");
        (out, image)
    }

    fn mutate_recursive<F>(
        &self,
        nid: NodeId,
        size: usize,
        mutator: &mut F,
        target: NodeId,
        image: &mut Option<NodeId>,
        out: &mut GameTree,
        parent: Option<NodeId>,
    ) -> NodeId
    where
        F: FnMut(&TreeNode, usize) -> Vec<(String, Vec<String>)>,
    {
        let mutant = out.alloc(parent);
        if nid == target {
            *image = Some(mutant);
        }
        for (key, values) in mutator(&self.nodes[nid], size) {
            for v in values {
                out.add_value(mutant, &key, &v);
            }
        }
        for i in 0..self.nodes[nid].children.len() {
            let child = self.nodes[nid].children[i];
            self.mutate_recursive(child, size, mutator, target, image, out, Some(mutant));
        }
        mutant
    }

    /// Detach every variation along `id`'s tree so only the main line from
    /// the root survives.
    pub fn strip_variations(&mut self, id: NodeId) {
        let mut node = self.get_root(id);
        loop {
            let extras: Vec<NodeId> =
                self.nodes[node].children.iter().skip(1).copied().collect();
            for extra in extras {
                self.detach(extra);
            }
            match self.nodes[node].main_child() {
                Some(child) => node = child,
                None => break,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Follows the first child of each node (the main line of play).
pub struct MainlineIter<'a> {
    tree: &'a GameTree,
    current: Option<NodeId>,
}

impl<'a> Iterator for MainlineIter<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = &self.tree.nodes[id];
        self.current = node.main_child();
        Some((id, node))
    }
}

/// DFS pre-order traversal over every node reachable from a given start.
pub struct SubtreeIter<'a> {
    tree: &'a GameTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for SubtreeIter<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id];
        // Push children in reverse so the leftmost child is visited first.
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
