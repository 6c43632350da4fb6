use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use lalrkit_util::make_type_idx;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::analysis::FirstFollow;
use crate::grammar::{Grammar, Symbol, TerminalSet};

mod item;

pub use item::{closure, core_signature, goto, Lalr1Item, Lr0Item};

/// A closed item set plus its outgoing transitions. The first `kernel_len` items are
/// the kernel, the rest were added by closure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    items: Vec<Lalr1Item>,
    kernel_len: usize,
    transitions: BTreeMap<Symbol, StateIdx>,
}

make_type_idx!(StateIdx, State);

impl State {
    fn new(items: Vec<Lalr1Item>, kernel_len: usize) -> State {
        State {
            items,
            kernel_len,
            transitions: BTreeMap::new(),
        }
    }

    pub fn items(&self) -> &[Lalr1Item] {
        &self.items
    }

    pub fn kernel(&self) -> &[Lalr1Item] {
        &self.items[..self.kernel_len]
    }

    pub fn transitions(&self) -> &BTreeMap<Symbol, StateIdx> {
        &self.transitions
    }

    pub fn core_signature(&self) -> Vec<Lr0Item> {
        core_signature(&self.items)
    }

    pub fn lookahead(&self, core: Lr0Item) -> Option<&TerminalSet> {
        self.items.iter().find(|x| x.core == core).map(|x| &x.lookahead)
    }

    // unions lookaheads of core-equal items in; returns whether anything grew
    fn absorb_lookaheads(&mut self, items: &[Lalr1Item]) -> bool {
        let positions: HashMap<Lr0Item, usize> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, x)| (x.core, i))
            .collect();

        let mut grew = false;
        for item in items {
            if let Some(&i) = positions.get(&item.core) {
                grew |= self.items[i].lookahead.union_with(&item.lookahead);
            }
        }
        grew
    }
}

/// The LALR state machine. State 0 is the start state.
#[derive(Clone, Debug)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    /// Builds the collection of item sets, merging states with equal item cores as
    /// they are discovered, then runs [`merge_equivalent_states`] over the result.
    ///
    /// Lookaheads merged into a state that was already expanded are not pushed on to
    /// its successors. For some grammars the result is therefore smaller than the
    /// LALR(1) lookahead sets, and inputs that need the missing lookaheads are
    /// rejected at parse time.
    pub fn build(grammar: &Grammar, sets: &FirstFollow) -> Automaton {
        let start_kernel = vec![Lalr1Item::new(
            Lr0Item::new(grammar.augmented_production(), 0),
            TerminalSet::singleton(Symbol::EndOfInput),
        )];

        let mut states: Vec<State> = Vec::new();
        // item core set -> state
        let mut known: HashMap<Vec<Lr0Item>, StateIdx> = HashMap::new();
        let mut work_queue: VecDeque<StateIdx> = VecDeque::new();

        let start_items = closure(grammar, sets, start_kernel);
        known.insert(core_signature(&start_items), StateIdx::new(0));
        let start = StateIdx::from_push(&mut states, State::new(start_items, 1));
        work_queue.push_back(start);

        let mut late_merges = 0;
        while let Some(q) = work_queue.pop_front() {
            let marks: BTreeSet<Symbol> = states[q]
                .items
                .iter()
                .filter_map(|x| x.core.mark(grammar))
                .collect();

            for symbol in marks {
                let kernel_len = states[q]
                    .items
                    .iter()
                    .filter(|x| x.core.mark(grammar) == Some(symbol))
                    .count();
                let t = goto(grammar, sets, &states[q].items, symbol);
                if t.is_empty() {
                    continue;
                }

                let signature = core_signature(&t);
                let target = match known.get(&signature) {
                    Some(&existing) => {
                        // same cores reached along another path: union lookaheads into the
                        // existing state only. If it was already expanded, its successors
                        // keep the lookaheads they were built with.
                        if states[existing].absorb_lookaheads(&t) {
                            late_merges += 1;
                        }
                        existing
                    }
                    None => {
                        let new = StateIdx::from_push(&mut states, State::new(t, kernel_len));
                        known.insert(signature, new);
                        work_queue.push_back(new);
                        new
                    }
                };
                states[q].transitions.insert(symbol, target);
            }
        }

        log::debug!(
            "built {} states ({} lookahead merges into known states)",
            states.len(),
            late_merges
        );

        let before = states.len();
        let states = merge_equivalent_states(&states);
        if states.len() != before {
            log::debug!("post-pass merged {} duplicate states", before - states.len());
        }

        Automaton { states }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, idx: StateIdx) -> &State {
        &self.states[idx]
    }

    pub fn start(&self) -> StateIdx {
        StateIdx::new(0)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Transition graph, nodes labelled with kernel items and edges with symbols.
    pub fn to_graph(&self, grammar: &Grammar) -> DiGraph<String, String> {
        let mut graph: DiGraph<String, String> = DiGraph::new();
        let nodes: Vec<NodeIndex> = self
            .states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let mut label = format!("I{}", i);
                for item in state.kernel() {
                    label.push('\n');
                    label.push_str(&grammar.display_item(item.core.production, item.core.dot).to_string());
                }
                graph.add_node(label)
            })
            .collect();

        for (i, state) in self.states.iter().enumerate() {
            for (symbol, target) in &state.transitions {
                graph.add_edge(nodes[i], nodes[target.index()], grammar.symbol_name(*symbol));
            }
        }

        graph
    }

    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> AutomatonDisplay<'a> {
        AutomatonDisplay {
            automaton: self,
            grammar,
        }
    }
}

/// Post-pass merge: folds every state whose item-core set equals that of an earlier
/// state into the earlier one (lookaheads unioned item by item), redirects all
/// transitions to the retained state and drops the duplicate. Returns a new list;
/// the input is left untouched.
pub fn merge_equivalent_states(states: &[State]) -> Vec<State> {
    let mut merged: Vec<State> = Vec::with_capacity(states.len());
    let mut remap: Vec<StateIdx> = Vec::with_capacity(states.len());
    let mut seen: HashMap<Vec<Lr0Item>, StateIdx> = HashMap::new();

    for state in states {
        let signature = state.core_signature();
        match seen.get(&signature) {
            Some(&retained) => {
                merged[retained].absorb_lookaheads(&state.items);
                remap.push(retained);
            }
            None => {
                let retained = StateIdx::from_push(&mut merged, state.clone());
                seen.insert(signature, retained);
                remap.push(retained);
            }
        }
    }

    for state in merged.iter_mut() {
        for target in state.transitions.values_mut() {
            *target = remap[target.index()];
        }
    }

    merged
}

pub struct AutomatonDisplay<'a> {
    automaton: &'a Automaton,
    grammar: &'a Grammar,
}

impl fmt::Display for AutomatonDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.automaton.states.iter().enumerate() {
            writeln!(f, "I{}:", i)?;
            for (n, item) in state.items.iter().enumerate() {
                let lookahead: Vec<String> = item
                    .lookahead
                    .iter()
                    .map(|x| self.grammar.symbol_name(x))
                    .collect();
                writeln!(
                    f,
                    "  {}[{}, {}]",
                    if n < state.kernel_len { "" } else { "+" },
                    self.grammar.display_item(item.core.production, item.core.dot),
                    lookahead.join("/")
                )?;
            }
            for (symbol, target) in &state.transitions {
                writeln!(f, "  {} => I{}", self.grammar.symbol_name(*symbol), target)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::grammar::{GrammarBuilder, ProdIdx};
    use crate::samples;

    fn build(grammar: &Grammar) -> Automaton {
        let sets = FirstFollow::compute(grammar);
        Automaton::build(grammar, &sets)
    }

    // S -> a A c | b b A d ; A -> x y
    // The A -> x . y state is first reached after `a` and expanded before the
    // `b b` path reaches it again with lookahead d.
    fn shared_tail() -> Grammar {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("S");
        let a_nt = g.nonterminal("A");
        let a = g.terminal(0, "a");
        let b = g.terminal(1, "b");
        let c = g.terminal(2, "c");
        let d = g.terminal(3, "d");
        let x = g.terminal(4, "x");
        let y = g.terminal(5, "y");
        g.rule(s, [a, a_nt, c]).rule(s, [b, b, a_nt, d]).rule(a_nt, [x, y]);
        g.build(s).expect("valid grammar")
    }

    #[test]
    fn expression_state_count() {
        // I0 start, I1 S'->E., I2 E->T., I3 T->id., I4 E->E+.T, I5 E->E+T.
        let grammar = samples::expression();
        let automaton = build(&grammar);
        assert_eq!(automaton.len(), 6);

        let start = automaton.state(automaton.start());
        let e = grammar.start_symbol();
        let accept_state = automaton.state(start.transitions()[&e]);
        let accept_core = Lr0Item::new(grammar.augmented_production(), 1);
        assert_eq!(
            accept_state.lookahead(accept_core),
            Some(&TerminalSet::singleton(Symbol::EndOfInput))
        );
    }

    #[test]
    fn no_duplicate_cores() {
        for grammar in [
            samples::expression(),
            samples::arithmetic(),
            samples::list(),
            samples::dangling_else(),
            samples::lalr_not_slr(),
        ] {
            let automaton = build(&grammar);
            let signatures: HashSet<Vec<Lr0Item>> =
                automaton.states().iter().map(|s| s.core_signature()).collect();
            assert_eq!(signatures.len(), automaton.len());
        }
    }

    #[test]
    fn states_are_closed() {
        let grammar = samples::arithmetic();
        let sets = FirstFollow::compute(&grammar);
        let automaton = Automaton::build(&grammar, &sets);
        for state in automaton.states() {
            assert_eq!(closure(&grammar, &sets, state.items().to_vec()), state.items());
        }
    }

    #[test]
    fn transitions_match_goto() {
        let grammar = samples::lalr_not_slr();
        let sets = FirstFollow::compute(&grammar);
        let automaton = Automaton::build(&grammar, &sets);
        for state in automaton.states() {
            for (symbol, target) in state.transitions() {
                let next = goto(&grammar, &sets, state.items(), *symbol);
                assert_eq!(core_signature(&next), automaton.state(*target).core_signature());
                // the merged target carries at least the lookaheads of this path
                for item in &next {
                    let merged = automaton.state(*target).lookahead(item.core).expect("same cores");
                    assert!(item.lookahead.is_subset(merged));
                }
            }
        }
    }

    #[test]
    fn post_pass_folds_duplicates() {
        let grammar = samples::expression();
        let automaton = build(&grammar);
        let mut states = automaton.states().to_vec();

        // clone I3 (T -> id .) with a different lookahead and point I0's id edge at it
        let id = Symbol::Terminal(samples::ID);
        let original = states[automaton.start().index()].transitions[&id];
        let mut duplicate = states[original.index()].clone();
        for item in duplicate.items.iter_mut() {
            item.lookahead = TerminalSet::singleton(Symbol::Terminal(99));
        }
        let duplicate = StateIdx::from_push(&mut states, duplicate);
        states[automaton.start().index()].transitions.insert(id, duplicate);

        let merged = merge_equivalent_states(&states);
        assert_eq!(merged.len(), automaton.len());
        assert_eq!(merged[automaton.start().index()].transitions[&id], original);

        let core = merged[original.index()].items[0].core;
        let lookahead = merged[original.index()].lookahead(core).expect("kept item");
        assert!(lookahead.contains(Symbol::Terminal(99)));
        assert!(lookahead.contains(Symbol::EndOfInput));

        // input untouched
        assert_eq!(states.len(), automaton.len() + 1);
    }

    #[test]
    fn expanded_state_keeps_its_successors() {
        let grammar = shared_tail();
        let automaton = build(&grammar);
        let a_nt = grammar.symbol_by_name("A").unwrap();
        let xy = ProdIdx::new(grammar.productions_for(a_nt).start);
        let (a, b, c, d, x, y) = (
            Symbol::Terminal(0),
            Symbol::Terminal(1),
            Symbol::Terminal(2),
            Symbol::Terminal(3),
            Symbol::Terminal(4),
            Symbol::Terminal(5),
        );

        let walk = |path: &[Symbol]| {
            path.iter()
                .fold(automaton.start(), |q, symbol| automaton.state(q).transitions()[symbol])
        };
        let after_x = walk(&[a, x]);
        assert_eq!(walk(&[b, b, x]), after_x);

        // both paths met in the state after x
        let mut cd = TerminalSet::singleton(c);
        cd.insert(d);
        assert_eq!(automaton.state(after_x).lookahead(Lr0Item::new(xy, 1)), Some(&cd));

        // but its successor was built before d arrived and isn't revisited
        let after_xy = automaton.state(after_x).transitions()[&y];
        assert_eq!(
            automaton.state(after_xy).lookahead(Lr0Item::new(xy, 2)),
            Some(&TerminalSet::singleton(c))
        );
        assert_eq!(walk(&[b, b, x, y]), after_xy);
    }

    #[test]
    fn graph_has_one_edge_per_transition() {
        let grammar = samples::arithmetic();
        let automaton = build(&grammar);
        let graph = automaton.to_graph(&grammar);
        let transitions: usize = automaton.states().iter().map(|s| s.transitions().len()).sum();
        assert_eq!(graph.node_count(), automaton.len());
        assert_eq!(graph.edge_count(), transitions);
    }
}
