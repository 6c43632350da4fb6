use std::fmt;

use crate::grammar::{Grammar, ProdIdx, Symbol};

use super::Token;

/// Parse tree built by the table driven parser. Leaves own the input tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseNode<T> {
    Leaf(T),
    Composite {
        production: ProdIdx,
        lhs: Symbol,
        children: Vec<ParseNode<T>>,
    },
}

impl<T> ParseNode<T> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, ParseNode::Leaf(_))
    }

    /// Children in left-to-right order; empty for leaves and epsilon reductions.
    pub fn children(&self) -> &[ParseNode<T>] {
        match self {
            ParseNode::Leaf(_) => &[],
            ParseNode::Composite { children, .. } => children,
        }
    }

    /// Leaf tokens in input order.
    pub fn leaves(&self) -> Leaves<'_, T> {
        Leaves { stack: vec![self] }
    }

    pub fn into_leaves(self) -> Vec<T> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                ParseNode::Leaf(token) => result.push(token),
                ParseNode::Composite { children, .. } => stack.extend(children.into_iter().rev()),
            }
        }
        result
    }
}

impl<T: Token> ParseNode<T> {
    /// Symbol this node stands for: the token kind for leaves, the lhs otherwise.
    pub fn symbol(&self) -> Symbol {
        match self {
            ParseNode::Leaf(token) => Symbol::Terminal(token.kind()),
            ParseNode::Composite { lhs, .. } => *lhs,
        }
    }

    /// S-expression like rendering, e.g. `E(E(T(id)) + T(id))`.
    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> ParseNodeDisplay<'a, T> {
        ParseNodeDisplay { node: self, grammar }
    }
}

pub struct Leaves<'a, T> {
    stack: Vec<&'a ParseNode<T>>,
}

impl<'a, T> Iterator for Leaves<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                ParseNode::Leaf(token) => return Some(token),
                ParseNode::Composite { children, .. } => self.stack.extend(children.iter().rev()),
            }
        }
        None
    }
}

pub struct ParseNodeDisplay<'a, T> {
    node: &'a ParseNode<T>,
    grammar: &'a Grammar,
}

impl<T: Token> fmt::Display for ParseNodeDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grammar.symbol_name(self.node.symbol()))?;
        if let ParseNode::Composite { children, .. } = self.node {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", child.display(self.grammar))?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
