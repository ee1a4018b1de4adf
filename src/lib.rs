pub mod sgf;

pub use sgf::{
    Board, Colour, GameTree, NodeId, TreeNode, load, load_main_line, parse_sgf, save, write_sgf,
};
