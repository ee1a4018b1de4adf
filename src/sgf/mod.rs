pub mod board;
pub mod coords;
pub mod tree;
mod cache;
mod gib;
mod io;
mod ngf;
mod parser;
mod play;
mod serializer;

pub use board::{Board, Colour};
pub use gib::load_gib;
pub use io::{load, load_main_line};
pub use ngf::load_ngf;
pub use parser::parse_sgf;
pub use serializer::{save, write_sgf};
pub use tree::{GameTree, MainlineIter, NodeId, SubtreeIter, TreeNode};
