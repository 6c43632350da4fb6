use std::collections::{HashMap, VecDeque};

use crate::analysis::FirstFollow;
use crate::grammar::{Grammar, ProdIdx, Symbol, TerminalSet};

/// LR(0) item: a production with a dot position. `dot == rhs.len()` means complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lr0Item {
    pub production: ProdIdx,
    pub dot: usize,
}

impl Lr0Item {
    pub fn new(production: ProdIdx, dot: usize) -> Lr0Item {
        Lr0Item { production, dot }
    }

    /// Symbol right after the dot, if any.
    pub fn mark(&self, grammar: &Grammar) -> Option<Symbol> {
        grammar.production(self.production).rhs().get(self.dot).copied()
    }

    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        self.dot >= grammar.production(self.production).len()
    }

    fn advance(&self) -> Lr0Item {
        Lr0Item {
            production: self.production,
            dot: self.dot + 1,
        }
    }
}

/// LR(0) core plus the terminals that may follow a reduction by it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lalr1Item {
    pub core: Lr0Item,
    pub lookahead: TerminalSet,
}

impl Lalr1Item {
    pub fn new(core: Lr0Item, lookahead: TerminalSet) -> Lalr1Item {
        Lalr1Item { core, lookahead }
    }

    /// The production to reduce by, if the dot is at the end.
    pub fn reduces(&self, grammar: &Grammar) -> Option<ProdIdx> {
        self.core.is_complete(grammar).then_some(self.core.production)
    }
}

/// Expands `kernel` with every item reachable by descending into the nonterminal at a
/// dot. Items with an equal core share one entry whose lookahead is the union; growth
/// of a lookahead is pushed down again until nothing changes.
pub fn closure(grammar: &Grammar, sets: &FirstFollow, kernel: Vec<Lalr1Item>) -> Vec<Lalr1Item> {
    let mut items: Vec<Lalr1Item> = Vec::with_capacity(kernel.len());
    let mut index: HashMap<Lr0Item, usize> = HashMap::new();
    for item in kernel {
        match index.get(&item.core) {
            Some(&i) => {
                items[i].lookahead.union_with(&item.lookahead);
            }
            None => {
                index.insert(item.core, items.len());
                items.push(item);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..items.len()).collect();
    while let Some(i) = queue.pop_front() {
        let core = items[i].core;
        let Some(nt @ Symbol::Nonterminal(_)) = core.mark(grammar) else {
            continue;
        };

        let production = grammar.production(core.production);
        let mut lookahead = sets.first_of(production.rhs(), core.dot + 1);
        if lookahead.remove(Symbol::Epsilon) {
            lookahead.union_with(&items[i].lookahead);
        }

        for p in grammar.productions_for(nt) {
            let new_core = Lr0Item::new(ProdIdx::new(p), 0);
            match index.get(&new_core) {
                Some(&j) => {
                    if items[j].lookahead.union_with(&lookahead) {
                        queue.push_back(j);
                    }
                }
                None => {
                    index.insert(new_core, items.len());
                    queue.push_back(items.len());
                    items.push(Lalr1Item::new(new_core, lookahead.clone()));
                }
            }
        }
    }

    items
}

/// Advances the dot over `symbol` in every item marked by it and closes the result.
/// Empty when no item has `symbol` after its dot.
pub fn goto(grammar: &Grammar, sets: &FirstFollow, items: &[Lalr1Item], symbol: Symbol) -> Vec<Lalr1Item> {
    let kernel: Vec<Lalr1Item> = items
        .iter()
        .filter(|item| item.core.mark(grammar) == Some(symbol))
        .map(|item| Lalr1Item::new(item.core.advance(), item.lookahead.clone()))
        .collect();

    if kernel.is_empty() {
        return kernel;
    }
    closure(grammar, sets, kernel)
}

/// Sorted item cores, the identity of a state for merging.
pub fn core_signature(items: &[Lalr1Item]) -> Vec<Lr0Item> {
    let mut cores: Vec<Lr0Item> = items.iter().map(|x| x.core).collect();
    cores.sort();
    cores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;

    fn start_kernel() -> Vec<Lalr1Item> {
        vec![Lalr1Item::new(
            Lr0Item::new(ProdIdx::new(0), 0),
            TerminalSet::singleton(Symbol::EndOfInput),
        )]
    }

    #[test]
    fn closure_of_start() {
        let grammar = samples::expression();
        let sets = FirstFollow::compute(&grammar);
        let items = closure(&grammar, &sets, start_kernel());

        // S' -> . E, E -> . E + T, E -> . T, T -> . id
        let cores: Vec<Lr0Item> = items.iter().map(|x| x.core).collect();
        assert_eq!(
            cores,
            (0..4).map(|p| Lr0Item::new(ProdIdx::new(p), 0)).collect::<Vec<_>>()
        );

        let plus = Symbol::Terminal(samples::PLUS);
        let expected: TerminalSet = [Symbol::EndOfInput, plus].into_iter().collect();
        assert_eq!(items[1].lookahead, expected);
        assert_eq!(items[2].lookahead, expected);
        assert_eq!(items[3].lookahead, expected);
    }

    #[test]
    fn closure_is_idempotent() {
        for grammar in [samples::arithmetic(), samples::list(), samples::lalr_not_slr()] {
            let sets = FirstFollow::compute(&grammar);
            let items = closure(&grammar, &sets, start_kernel());
            let again = closure(&grammar, &sets, items.clone());
            assert_eq!(again, items);

            for symbol in items.iter().filter_map(|x| x.core.mark(&grammar)) {
                let next = goto(&grammar, &sets, &items, symbol);
                assert_eq!(closure(&grammar, &sets, next.clone()), next);
            }
        }
    }

    #[test]
    fn goto_without_mark_is_empty() {
        let grammar = samples::expression();
        let sets = FirstFollow::compute(&grammar);
        let items = closure(&grammar, &sets, start_kernel());
        assert!(goto(&grammar, &sets, &items, Symbol::Terminal(samples::PLUS)).is_empty());
    }

    #[test]
    fn epsilon_lookahead_falls_through() {
        // L -> id L' ; L' -> , id L' | ε
        let grammar = samples::list();
        let sets = FirstFollow::compute(&grammar);
        let items = closure(&grammar, &sets, start_kernel());
        let after_id = goto(&grammar, &sets, &items, Symbol::Terminal(samples::ID));

        // L -> id . L', L' -> . , id L', L' -> .
        assert_eq!(after_id.len(), 3);
        for item in &after_id {
            assert_eq!(item.lookahead, TerminalSet::singleton(Symbol::EndOfInput));
        }
        assert!(after_id.iter().any(|x| x.core.is_complete(&grammar)));
    }
}
