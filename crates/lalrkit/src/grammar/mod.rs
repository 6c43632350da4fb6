use std::{collections::HashMap, fmt, ops::Range};

use lalrkit_util::make_type_idx;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod symbol;

pub use symbol::{Symbol, TerminalSet, MAX_TERMINAL_CODE};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Production {
    lhs: Symbol,
    // empty for epsilon productions
    rhs: Vec<Symbol>,
}

make_type_idx!(ProdIdx, Production);

impl Production {
    pub fn new(lhs: Symbol, rhs: Vec<Symbol>) -> Production {
        Production { lhs, rhs }
    }

    pub fn lhs(&self) -> Symbol {
        self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("nonterminal `{0}` is referenced but has no productions")]
    UndefinedNonterminal(String),
    #[error("symbol {0} can't appear in a production")]
    InvalidSymbol(Symbol),
    #[error("start symbol {0} is not a nonterminal")]
    StartNotNonterminal(Symbol),
    #[error("terminal code {0} is above the limit of {max}", max = MAX_TERMINAL_CODE)]
    TerminalCodeTooLarge(u32),
}

/// Productions grouped contiguously by left hand side, production 0 being the
/// augmented start production. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grammar {
    productions: Vec<Production>,
    // nonterminal id -> [start, end) into productions
    ranges: Vec<Range<usize>>,
    nonterminal_names: Vec<String>,
    terminal_names: HashMap<u32, String>,
}

impl Grammar {
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, idx: ProdIdx) -> &Production {
        &self.productions[idx]
    }

    pub fn n_productions(&self) -> usize {
        self.productions.len()
    }

    pub fn n_nonterminals(&self) -> usize {
        self.ranges.len()
    }

    /// The real start symbol, i.e. the rhs of the augmented start production.
    pub fn start_symbol(&self) -> Symbol {
        self.productions[self.augmented_production()].rhs[0]
    }

    pub fn augmented_production(&self) -> ProdIdx {
        ProdIdx::new(0)
    }

    /// Index range of the productions with `nt` on the left hand side. Empty for
    /// anything that isn't a nonterminal of this grammar.
    pub fn productions_for(&self, nt: Symbol) -> Range<usize> {
        match nt.nonterminal_id() {
            Some(id) if id < self.ranges.len() => self.ranges[id].clone(),
            _ => 0..0,
        }
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = Symbol> + '_ {
        (0..self.ranges.len()).map(|id| Symbol::Nonterminal(id as u32))
    }

    /// Every terminal that occurs in some production, sorted by code.
    pub fn terminals(&self) -> Vec<Symbol> {
        let mut terminals: Vec<Symbol> = self
            .productions
            .iter()
            .flat_map(|p| p.rhs.iter().copied())
            .filter(|s| matches!(s, Symbol::Terminal(_)))
            .collect();
        terminals.sort();
        terminals.dedup();
        terminals
    }

    pub fn symbol_name(&self, symbol: Symbol) -> String {
        match symbol {
            Symbol::Nonterminal(id) => self
                .nonterminal_names
                .get(id as usize)
                .cloned()
                .unwrap_or_else(|| symbol.to_string()),
            Symbol::Terminal(t) => self
                .terminal_names
                .get(&t)
                .cloned()
                .unwrap_or_else(|| symbol.to_string()),
            _ => symbol.to_string(),
        }
    }

    /// Looks up a symbol by the name given to the builder.
    pub fn symbol_by_name(&self, name: &str) -> Option<Symbol> {
        if let Some(id) = self.nonterminal_names.iter().position(|x| x == name) {
            return Some(Symbol::Nonterminal(id as u32));
        }
        self.terminal_names
            .iter()
            .find(|(_, x)| *x == name)
            .map(|(t, _)| Symbol::Terminal(*t))
    }

    pub fn display_production(&self, idx: ProdIdx) -> ProductionDisplay<'_> {
        ProductionDisplay {
            grammar: self,
            production: &self.productions[idx],
            dot: None,
        }
    }

    pub(crate) fn display_item(&self, idx: ProdIdx, dot: usize) -> ProductionDisplay<'_> {
        ProductionDisplay {
            grammar: self,
            production: &self.productions[idx],
            dot: Some(dot),
        }
    }
}

pub struct ProductionDisplay<'a> {
    grammar: &'a Grammar,
    production: &'a Production,
    dot: Option<usize>,
}

impl fmt::Display for ProductionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.grammar.symbol_name(self.production.lhs))?;
        for (i, symbol) in self.production.rhs.iter().enumerate() {
            if self.dot == Some(i) {
                write!(f, " .")?;
            }
            write!(f, " {}", self.grammar.symbol_name(*symbol))?;
        }
        if self.dot == Some(self.production.rhs.len()) {
            write!(f, " .")?;
        }
        if self.production.rhs.is_empty() && self.dot.is_none() {
            write!(f, " ε")?;
        }
        Ok(())
    }
}

/// Builds a [`Grammar`] from productions added in any order.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    nonterminal_names: Vec<String>,
    name_to_nonterminal: HashMap<String, u32>,
    terminal_names: HashMap<u32, String>,
    rules: Vec<Production>,
}

impl GrammarBuilder {
    pub fn new() -> GrammarBuilder {
        GrammarBuilder {
            nonterminal_names: vec!["S'".to_string()],
            ..Default::default()
        }
    }

    /// Returns the nonterminal with this name, allocating it on first use.
    pub fn nonterminal(&mut self, name: &str) -> Symbol {
        if let Some(id) = self.name_to_nonterminal.get(name) {
            return Symbol::Nonterminal(*id);
        }
        let id = self.nonterminal_names.len() as u32;
        self.nonterminal_names.push(name.to_string());
        self.name_to_nonterminal.insert(name.to_string(), id);
        Symbol::Nonterminal(id)
    }

    /// Names a token kind for diagnostics.
    pub fn terminal(&mut self, code: u32, name: &str) -> Symbol {
        self.terminal_names.insert(code, name.to_string());
        Symbol::Terminal(code)
    }

    /// Adds `lhs -> rhs`. An empty rhs is an epsilon production.
    pub fn rule(&mut self, lhs: Symbol, rhs: impl IntoIterator<Item = Symbol>) -> &mut Self {
        self.rules.push(Production::new(lhs, rhs.into_iter().collect()));
        self
    }

    pub fn build(self, start: Symbol) -> Result<Grammar, GrammarError> {
        let n_nonterminals = self.nonterminal_names.len();
        let name_of = |symbol: Symbol| match symbol {
            Symbol::Nonterminal(id) => self
                .nonterminal_names
                .get(id as usize)
                .cloned()
                .unwrap_or_else(|| symbol.to_string()),
            _ => symbol.to_string(),
        };

        if !start.is_nonterminal() {
            return Err(GrammarError::StartNotNonterminal(start));
        }
        if start == Symbol::AUGMENTED_START {
            return Err(GrammarError::InvalidSymbol(start));
        }

        // pass 1: bucket alternatives by lhs, keeping their relative order
        let mut buckets: Vec<Vec<Vec<Symbol>>> = vec![Vec::new(); n_nonterminals];
        for rule in &self.rules {
            let lhs = match rule.lhs {
                Symbol::Nonterminal(id) if id != 0 && (id as usize) < n_nonterminals => id as usize,
                other => return Err(GrammarError::InvalidSymbol(other)),
            };
            for symbol in &rule.rhs {
                match *symbol {
                    Symbol::Terminal(t) if t > MAX_TERMINAL_CODE => {
                        return Err(GrammarError::TerminalCodeTooLarge(t));
                    }
                    Symbol::Terminal(_) => {}
                    Symbol::Nonterminal(id) if id != 0 && (id as usize) < n_nonterminals => {}
                    other => return Err(GrammarError::InvalidSymbol(other)),
                }
            }
            buckets[lhs].push(rule.rhs.clone());
        }

        // pass 2: closedness - everything referenced must be defined
        let referenced = self
            .rules
            .iter()
            .flat_map(|p| p.rhs.iter().copied())
            .chain(std::iter::once(start));
        for symbol in referenced {
            if let Some(id) = symbol.nonterminal_id() {
                if id >= n_nonterminals || buckets[id].is_empty() {
                    return Err(GrammarError::UndefinedNonterminal(name_of(symbol)));
                }
            }
        }

        // pass 3: lay out contiguously, augmented production first
        let mut productions = vec![Production::new(Symbol::AUGMENTED_START, vec![start])];
        let mut ranges = vec![0..1];
        for (id, bucket) in buckets.into_iter().enumerate().skip(1) {
            let begin = productions.len();
            productions.extend(
                bucket
                    .into_iter()
                    .map(|rhs| Production::new(Symbol::Nonterminal(id as u32), rhs)),
            );
            ranges.push(begin..productions.len());
        }

        Ok(Grammar {
            productions,
            ranges,
            nonterminal_names: self.nonterminal_names,
            terminal_names: self.terminal_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn productions_are_grouped_by_lhs() {
        let mut g = GrammarBuilder::new();
        let e = g.nonterminal("E");
        let t = g.nonterminal("T");
        let plus = g.terminal(0, "+");
        let id = g.terminal(1, "id");
        g.rule(t, [id]);
        g.rule(e, [e, plus, t]);
        g.rule(t, [Symbol::Terminal(2)]);
        g.rule(e, [t]);
        let grammar = g.build(e).expect("valid grammar");

        assert_eq!(grammar.production(ProdIdx::new(0)), &Production::new(Symbol::AUGMENTED_START, vec![e]));
        assert_eq!(grammar.productions_for(e), 1..3);
        assert_eq!(grammar.productions_for(t), 3..5);
        assert_eq!(grammar.production(ProdIdx::new(1)).rhs(), &[e, plus, t]);
        assert_eq!(grammar.production(ProdIdx::new(2)).rhs(), &[t]);
        assert_eq!(grammar.production(ProdIdx::new(3)).rhs(), &[id]);
        assert_eq!(grammar.start_symbol(), e);
        assert_eq!(grammar.terminals(), vec![plus, id, Symbol::Terminal(2)]);
    }

    #[test]
    fn undefined_nonterminal_is_rejected() {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        let missing = g.nonterminal("Missing");
        g.rule(s, [missing, Symbol::Terminal(0)]);

        assert_eq!(
            g.build(s).unwrap_err(),
            GrammarError::UndefinedNonterminal("Missing".to_string())
        );
    }

    #[test]
    fn sentinels_are_rejected_in_rhs() {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        g.rule(s, [Symbol::EndOfInput]);
        assert_eq!(g.build(s).unwrap_err(), GrammarError::InvalidSymbol(Symbol::EndOfInput));

        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        g.rule(s, []);
        assert!(g.build(Symbol::Terminal(0)).is_err());
    }

    #[test]
    fn terminal_codes_are_bounded() {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        let last = g.terminal(MAX_TERMINAL_CODE, "last");
        g.rule(s, [last]);
        assert!(g.build(s).is_ok());

        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        let huge = g.terminal(u32::MAX, "huge");
        g.rule(s, [huge, s]).rule(s, []);
        assert_eq!(g.build(s).unwrap_err(), GrammarError::TerminalCodeTooLarge(u32::MAX));
    }

    #[test]
    fn epsilon_production_prints() {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        let a = g.terminal(7, "a");
        g.rule(s, [a, s]);
        g.rule(s, []);
        let grammar = g.build(s).expect("valid grammar");

        assert_eq!(grammar.display_production(ProdIdx::new(1)).to_string(), "S -> a S");
        assert_eq!(grammar.display_production(ProdIdx::new(2)).to_string(), "S -> ε");
        assert_eq!(grammar.display_item(ProdIdx::new(1), 1).to_string(), "S -> a . S");
        assert_eq!(grammar.display_item(ProdIdx::new(2), 0).to_string(), "S -> .");
        assert_eq!(grammar.symbol_by_name("a"), Some(a));
    }
}
