pub use self::pc_tree::*;

mod errors;
mod node;
mod pc_tree;
mod restrict;
mod sequence;
