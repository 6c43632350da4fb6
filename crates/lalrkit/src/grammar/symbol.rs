use std::fmt;

use bit_set::BitSet;
use serde::{Deserialize, Serialize};

/// A grammar symbol.
///
/// Terminals carry the token kind produced by the scanner, nonterminals carry an id
/// assigned by [`GrammarBuilder`](super::GrammarBuilder). Nonterminal id 0 is reserved
/// for the augmented start symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Terminal(u32),
    Nonterminal(u32),
    EndOfInput,
    Epsilon,
}

impl Symbol {
    pub const END_OF_INPUT: Symbol = Symbol::EndOfInput;
    pub const EPSILON: Symbol = Symbol::Epsilon;
    pub const AUGMENTED_START: Symbol = Symbol::Nonterminal(0);

    /// Terminals in the sense of the ACTION table: real token kinds plus end of input.
    pub fn is_terminal(self) -> bool {
        matches!(self, Symbol::Terminal(_) | Symbol::EndOfInput)
    }

    pub fn is_nonterminal(self) -> bool {
        matches!(self, Symbol::Nonterminal(_))
    }

    pub fn nonterminal_id(self) -> Option<usize> {
        match self {
            Symbol::Nonterminal(id) => Some(id as usize),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(t) => write!(f, "t{}", t),
            Symbol::Nonterminal(0) => write!(f, "S'"),
            Symbol::Nonterminal(nt) => write!(f, "N{}", nt),
            Symbol::EndOfInput => write!(f, "$"),
            Symbol::Epsilon => write!(f, "ε"),
        }
    }
}

/// Largest terminal code a grammar may use. Terminal sets are dense bitsets indexed by
/// code, so a set costs a bit per code up to its largest member.
pub const MAX_TERMINAL_CODE: u32 = u16::MAX as u32;

// slot 0 = end of input, slot 1 = epsilon, terminal t lives at t + 2
const EOI_SLOT: usize = 0;
const EPSILON_SLOT: usize = 1;
const TERMINAL_BASE: usize = 2;

fn slot(symbol: Symbol) -> Option<usize> {
    match symbol {
        Symbol::EndOfInput => Some(EOI_SLOT),
        Symbol::Epsilon => Some(EPSILON_SLOT),
        Symbol::Terminal(t) => Some(t as usize + TERMINAL_BASE),
        Symbol::Nonterminal(_) => None,
    }
}

fn from_slot(slot: usize) -> Symbol {
    match slot {
        EOI_SLOT => Symbol::EndOfInput,
        EPSILON_SLOT => Symbol::Epsilon,
        x => Symbol::Terminal((x - TERMINAL_BASE) as u32),
    }
}

/// Set of terminals, end of input and epsilon. Used for FIRST/FOLLOW sets and item
/// lookaheads. Nonterminals can't be stored, and terminal codes should stay within
/// [`MAX_TERMINAL_CODE`] (checked by `GrammarBuilder::build`).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TerminalSet {
    data: BitSet,
}

impl TerminalSet {
    pub fn new() -> TerminalSet {
        TerminalSet { data: BitSet::new() }
    }

    pub fn singleton(symbol: Symbol) -> TerminalSet {
        let mut set = TerminalSet::new();
        set.insert(symbol);
        set
    }

    /// Returns whether the symbol was newly inserted.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        debug_assert!(!symbol.is_nonterminal(), "nonterminal {} inserted into terminal set", symbol);
        match slot(symbol) {
            Some(i) => self.data.insert(i),
            None => false,
        }
    }

    pub fn remove(&mut self, symbol: Symbol) -> bool {
        match slot(symbol) {
            Some(i) => self.data.remove(i),
            None => false,
        }
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        slot(symbol).is_some_and(|i| self.data.contains(i))
    }

    pub fn contains_epsilon(&self) -> bool {
        self.data.contains(EPSILON_SLOT)
    }

    pub fn contains_end_of_input(&self) -> bool {
        self.data.contains(EOI_SLOT)
    }

    /// Returns whether the set grew.
    pub fn union_with(&mut self, other: &TerminalSet) -> bool {
        let before = self.data.len();
        self.data.union_with(&other.data);
        self.data.len() != before
    }

    /// Union that skips epsilon, used when folding FIRST into lookaheads / FOLLOW.
    /// Returns whether the set grew.
    pub fn union_without_epsilon(&mut self, other: &TerminalSet) -> bool {
        let mut grew = false;
        for i in other.data.iter().filter(|i| *i != EPSILON_SLOT) {
            grew |= self.data.insert(i);
        }
        grew
    }

    pub fn without_epsilon(&self) -> TerminalSet {
        let mut result = self.clone();
        result.data.remove(EPSILON_SLOT);
        result
    }

    pub fn is_subset(&self, other: &TerminalSet) -> bool {
        self.data.is_subset(&other.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ascending order: end of input, epsilon, then terminals by code.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.data.iter().map(from_slot)
    }
}

impl FromIterator<Symbol> for TerminalSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = TerminalSet::new();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_sort_first() {
        let set: TerminalSet = [Symbol::Terminal(4), Symbol::Epsilon, Symbol::Terminal(0), Symbol::EndOfInput]
            .into_iter()
            .collect();

        let members: Vec<Symbol> = set.iter().collect();
        assert_eq!(
            members,
            vec![Symbol::EndOfInput, Symbol::Epsilon, Symbol::Terminal(0), Symbol::Terminal(4)]
        );
    }

    #[test]
    fn union_reports_growth() {
        let mut a = TerminalSet::singleton(Symbol::Terminal(1));
        let b: TerminalSet = [Symbol::Terminal(1)].into_iter().collect();
        assert!(!a.union_with(&b));

        let c = TerminalSet::singleton(Symbol::Terminal(2));
        assert!(a.union_with(&c));
        assert!(a.contains(Symbol::Terminal(2)));
    }

    #[test]
    fn epsilon_is_stripped() {
        let mut lookahead = TerminalSet::singleton(Symbol::EndOfInput);
        let first: TerminalSet = [Symbol::Epsilon].into_iter().collect();
        assert!(!lookahead.union_without_epsilon(&first));
        assert!(!lookahead.contains_epsilon());

        let first: TerminalSet = [Symbol::Epsilon, Symbol::Terminal(3)].into_iter().collect();
        assert!(lookahead.union_without_epsilon(&first));
        assert_eq!(lookahead.iter().collect::<Vec<_>>(), vec![Symbol::EndOfInput, Symbol::Terminal(3)]);
    }
}
