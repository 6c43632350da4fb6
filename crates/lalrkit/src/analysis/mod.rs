// FIRST / FOLLOW / nullable analysis over a Grammar

use crate::grammar::{Grammar, Symbol, TerminalSet};

mod parallel;

// n^2 in size of grammar, more efficient algorithm does exist
pub fn compute_nullable_nonterminals(grammar: &Grammar) -> Vec<bool> {
    let mut nullable = vec![false; grammar.n_nonterminals()];
    loop {
        let mut changed = false;
        for production in grammar.productions() {
            let all_nullable = production.rhs().iter().all(|x| match x {
                Symbol::Nonterminal(nt) => nullable[*nt as usize],
                _ => false,
            });

            if let Some(lhs) = production.lhs().nonterminal_id() {
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }

    nullable
}

/// FIRST and FOLLOW sets for every nonterminal of a grammar, indexed by nonterminal id.
///
/// FIRST sets contain [`Symbol::Epsilon`] exactly when the nonterminal is nullable.
/// FOLLOW sets never contain epsilon; FOLLOW of the augmented start is `{$}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirstFollow {
    nullable: Vec<bool>,
    first: Vec<TerminalSet>,
    follow: Vec<TerminalSet>,
}

impl FirstFollow {
    /// Sequential fixed-point computation.
    pub fn compute(grammar: &Grammar) -> FirstFollow {
        let nullable = compute_nullable_nonterminals(grammar);
        let first = compute_first_sets(grammar, &nullable);
        let follow = compute_follow_sets(grammar, &nullable, &first);

        log::debug!(
            "computed FIRST/FOLLOW for {} nonterminals",
            grammar.n_nonterminals()
        );

        FirstFollow {
            nullable,
            first,
            follow,
        }
    }

    /// Computes each nonterminal's sets independently on up to `parallelism` worker
    /// threads (capped by the available hardware concurrency).
    pub fn compute_parallel(grammar: &Grammar, parallelism: usize) -> FirstFollow {
        let nullable = compute_nullable_nonterminals(grammar);
        let (first, follow) = parallel::compute(grammar, &nullable, parallelism);
        FirstFollow {
            nullable,
            first,
            follow,
        }
    }

    pub fn is_nullable(&self, nt: Symbol) -> bool {
        nt.nonterminal_id()
            .is_some_and(|id| self.nullable.get(id).copied().unwrap_or(false))
    }

    pub fn first(&self, nt: Symbol) -> Option<&TerminalSet> {
        nt.nonterminal_id().and_then(|id| self.first.get(id))
    }

    pub fn follow(&self, nt: Symbol) -> Option<&TerminalSet> {
        nt.nonterminal_id().and_then(|id| self.follow.get(id))
    }

    /// FIRST of the suffix `rhs[offset..]`. Contains epsilon iff the suffix is nullable
    /// (so always for an empty suffix).
    pub fn first_of(&self, rhs: &[Symbol], offset: usize) -> TerminalSet {
        first_of_sequence(&self.first, &self.nullable, rhs.get(offset..).unwrap_or(&[]))
    }
}

fn first_of_sequence(first: &[TerminalSet], nullable: &[bool], symbols: &[Symbol]) -> TerminalSet {
    let mut result = TerminalSet::new();
    for symbol in symbols {
        match *symbol {
            Symbol::Nonterminal(nt) => {
                result.union_without_epsilon(&first[nt as usize]);
                if !nullable[nt as usize] {
                    return result;
                }
            }
            Symbol::Epsilon => {}
            terminal => {
                result.insert(terminal);
                return result;
            }
        }
    }

    result.insert(Symbol::Epsilon);
    result
}

fn compute_first_sets(grammar: &Grammar, nullable: &[bool]) -> Vec<TerminalSet> {
    let mut first = vec![TerminalSet::new(); grammar.n_nonterminals()];
    loop {
        let mut changed = false;
        for production in grammar.productions() {
            let Some(lhs) = production.lhs().nonterminal_id() else {
                continue;
            };
            let contribution = first_of_sequence(&first, nullable, production.rhs());
            changed |= first[lhs].union_with(&contribution);
        }

        if !changed {
            break;
        }
    }

    first
}

fn compute_follow_sets(grammar: &Grammar, nullable: &[bool], first: &[TerminalSet]) -> Vec<TerminalSet> {
    let mut follow = vec![TerminalSet::new(); grammar.n_nonterminals()];
    follow[0].insert(Symbol::EndOfInput);

    loop {
        let mut changed = false;
        for production in grammar.productions() {
            let Some(lhs) = production.lhs().nonterminal_id() else {
                continue;
            };
            let rhs = production.rhs();
            for (i, symbol) in rhs.iter().enumerate() {
                let Some(nt) = symbol.nonterminal_id() else {
                    continue;
                };
                let rest = first_of_sequence(first, nullable, &rhs[i + 1..]);
                changed |= follow[nt].union_without_epsilon(&rest);
                if rest.contains_epsilon() && nt != lhs {
                    let lhs_follow = follow[lhs].clone();
                    changed |= follow[nt].union_with(&lhs_follow);
                }
            }
        }

        if !changed {
            break;
        }
    }

    follow
}
