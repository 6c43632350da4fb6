// ACTION / GOTO table construction from the merged automaton

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::automaton::{Automaton, StateIdx};
use crate::diagnostics::ErrorSink;
use crate::grammar::{Grammar, ProdIdx, Symbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Shift(StateIdx),
    Reduce(ProdIdx),
    Accept,
}

/// state -> terminal (or end of input) -> action
pub type ActionTable = Vec<BTreeMap<Symbol, Action>>;
/// state -> nonterminal -> state
pub type GotoTable = Vec<BTreeMap<Symbol, StateIdx>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateIdx,
    pub terminal: Symbol,
    pub existing: Action,
    pub incoming: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match (self.existing, self.incoming) {
            (Action::Reduce(_), Action::Reduce(_)) => ConflictKind::ReduceReduce,
            _ => ConflictKind::ShiftReduce,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("grammar is not LALR(1): {} conflict(s)", .0.len())]
    Conflicts(Vec<Conflict>),
}

/// Compiled tables plus the per-production data the parser needs to reduce
/// (lhs and rhs length), so parsing doesn't need the grammar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTables {
    action: ActionTable,
    goto: GotoTable,
    reductions: Vec<(Symbol, usize)>,
}

impl ParseTables {
    /// Fills ACTION/GOTO from the automaton. Every conflict is reported to `sink` and
    /// collected; its cell is left empty. Any conflict means no tables.
    pub fn compile(grammar: &Grammar, automaton: &Automaton, sink: &mut dyn ErrorSink) -> Result<ParseTables, TableError> {
        let failures_before = sink.failure_count();
        let n_states = automaton.len();
        let mut builder = TableBuilder {
            grammar,
            sink,
            action: vec![BTreeMap::new(); n_states],
            conflicts: Vec::new(),
            conflicting_cells: HashSet::new(),
        };
        let mut goto: GotoTable = vec![BTreeMap::new(); n_states];

        for (i, state) in automaton.states().iter().enumerate() {
            let idx = StateIdx::new(i);
            for (&symbol, &target) in state.transitions() {
                if symbol.is_nonterminal() {
                    goto[i].insert(symbol, target);
                } else {
                    builder.set(idx, symbol, Action::Shift(target));
                }
            }

            for item in state.items() {
                let Some(production) = item.reduces(grammar) else {
                    continue;
                };
                if production == grammar.augmented_production() {
                    builder.set(idx, Symbol::EndOfInput, Action::Accept);
                } else {
                    for terminal in item.lookahead.iter() {
                        builder.set(idx, terminal, Action::Reduce(production));
                    }
                }
            }
        }

        let TableBuilder {
            mut action,
            conflicts,
            conflicting_cells,
            sink,
            ..
        } = builder;

        for (state, terminal) in conflicting_cells {
            action[state.index()].remove(&terminal);
        }

        if !conflicts.is_empty() || sink.failure_count() > failures_before {
            log::debug!("table compilation failed with {} conflicts", conflicts.len());
            return Err(TableError::Conflicts(conflicts));
        }

        let reductions = grammar
            .productions()
            .iter()
            .map(|p| (p.lhs(), p.len()))
            .collect();

        log::debug!("compiled tables for {} states", n_states);
        Ok(ParseTables {
            action,
            goto,
            reductions,
        })
    }

    pub fn start(&self) -> StateIdx {
        StateIdx::new(0)
    }

    pub fn n_states(&self) -> usize {
        self.action.len()
    }

    pub fn action(&self, state: StateIdx, terminal: Symbol) -> Option<Action> {
        self.action.get(state.index())?.get(&terminal).copied()
    }

    pub fn goto(&self, state: StateIdx, nonterminal: Symbol) -> Option<StateIdx> {
        self.goto.get(state.index())?.get(&nonterminal).copied()
    }

    /// (lhs, rhs length) of a production.
    pub fn reduction(&self, production: ProdIdx) -> Option<(Symbol, usize)> {
        self.reductions.get(production.index()).copied()
    }

    /// Terminals with an action in this state.
    pub fn expected(&self, state: StateIdx) -> Vec<Symbol> {
        self.action
            .get(state.index())
            .map(|row| row.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn action_table(&self) -> &ActionTable {
        &self.action
    }

    pub fn goto_table(&self) -> &GotoTable {
        &self.goto
    }

    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> TablesDisplay<'a> {
        TablesDisplay {
            tables: self,
            grammar,
        }
    }
}

struct TableBuilder<'a> {
    grammar: &'a Grammar,
    sink: &'a mut dyn ErrorSink,
    action: ActionTable,
    conflicts: Vec<Conflict>,
    conflicting_cells: HashSet<(StateIdx, Symbol)>,
}

impl TableBuilder<'_> {
    fn set(&mut self, state: StateIdx, terminal: Symbol, incoming: Action) {
        let row = &mut self.action[state.index()];
        let Some(&existing) = row.get(&terminal) else {
            row.insert(terminal, incoming);
            return;
        };
        if existing == incoming {
            return;
        }

        let conflict = Conflict {
            state,
            terminal,
            existing,
            incoming,
        };
        self.sink.report(format!(
            "{} conflict in state {} on {}: {} vs {}",
            match conflict.kind() {
                ConflictKind::ShiftReduce => "shift/reduce",
                ConflictKind::ReduceReduce => "reduce/reduce",
            },
            state,
            self.grammar.symbol_name(terminal),
            describe(self.grammar, existing),
            describe(self.grammar, incoming),
        ));
        self.conflicts.push(conflict);
        self.conflicting_cells.insert((state, terminal));
    }
}

fn describe(grammar: &Grammar, action: Action) -> String {
    match action {
        Action::Shift(state) => format!("shift {}", state),
        Action::Reduce(production) => format!("reduce {}", grammar.display_production(production)),
        Action::Accept => "accept".to_string(),
    }
}

pub struct TablesDisplay<'a> {
    tables: &'a ParseTables,
    grammar: &'a Grammar,
}

impl fmt::Display for TablesDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in 0..self.tables.n_states() {
            writeln!(f, "state {}:", state)?;
            for (terminal, action) in &self.tables.action[state] {
                let action = match action {
                    Action::Shift(target) => format!("s{}", target),
                    Action::Reduce(production) => format!("r{} ({})", production, self.grammar.display_production(*production)),
                    Action::Accept => "acc".to_string(),
                };
                writeln!(f, "  {:>8}  {}", self.grammar.symbol_name(*terminal), action)?;
            }
            for (nonterminal, target) in &self.tables.goto[state] {
                writeln!(f, "  {:>8}  g{}", self.grammar.symbol_name(*nonterminal), target)?;
            }
        }
        Ok(())
    }
}
