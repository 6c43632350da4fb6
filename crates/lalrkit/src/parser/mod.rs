//! Table driven LALR(1) parsing.

mod lr;
mod tree;

pub use lr::{ParseError, ParseStats, Parser, Token};
pub use tree::{Leaves, ParseNode, ParseNodeDisplay};
