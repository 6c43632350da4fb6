// Per-nonterminal FIRST/FOLLOW queries, fanned out over scoped worker threads.
// Each query only reads the grammar and the nullable table; workers hand back owned
// results which are folded into the final tables once every worker has finished.

use std::thread;

use bit_set::BitSet;

use crate::grammar::{Grammar, Symbol, TerminalSet};

type QueryResult = (usize, TerminalSet, TerminalSet);

pub(super) fn compute(grammar: &Grammar, nullable: &[bool], parallelism: usize) -> (Vec<TerminalSet>, Vec<TerminalSet>) {
    let n_nonterminals = grammar.n_nonterminals();
    let available = thread::available_parallelism().map_or(1, |n| n.get());
    let workers = parallelism.min(available).clamp(1, n_nonterminals.max(1));

    log::debug!(
        "computing FIRST/FOLLOW for {} nonterminals on {} workers",
        n_nonterminals,
        workers
    );

    let results: Vec<Vec<QueryResult>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    (worker..n_nonterminals)
                        .step_by(workers)
                        .map(|nt| {
                            let query = Query { grammar, nullable };
                            (nt, query.first(nt), query.follow(nt))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let mut first = vec![TerminalSet::new(); n_nonterminals];
    let mut follow = vec![TerminalSet::new(); n_nonterminals];
    for (nt, nt_first, nt_follow) in results.into_iter().flatten() {
        first[nt] = nt_first;
        follow[nt] = nt_follow;
    }

    (first, follow)
}

#[derive(Clone, Copy)]
struct Query<'a> {
    grammar: &'a Grammar,
    nullable: &'a [bool],
}

impl Query<'_> {
    fn first(&self, nt: usize) -> TerminalSet {
        let mut result = TerminalSet::new();
        let mut visited = BitSet::with_capacity(self.nullable.len());
        self.first_into(nt, &mut visited, &mut result);
        if self.nullable[nt] {
            result.insert(Symbol::Epsilon);
        }
        result
    }

    // accumulates every terminal reachable in first position from nt. visited lives
    // for the whole top-level query, so a nonterminal is expanded at most once
    fn first_into(&self, nt: usize, visited: &mut BitSet, result: &mut TerminalSet) {
        if !visited.insert(nt) {
            return;
        }

        for production in &self.grammar.productions()[self.grammar.productions_for(Symbol::Nonterminal(nt as u32))] {
            self.sequence_first_into(production.rhs(), visited, result);
        }
    }

    // returns whether the whole sequence is nullable
    fn sequence_first_into(&self, symbols: &[Symbol], visited: &mut BitSet, result: &mut TerminalSet) -> bool {
        for symbol in symbols {
            match *symbol {
                Symbol::Nonterminal(m) => {
                    self.first_into(m as usize, visited, result);
                    if !self.nullable[m as usize] {
                        return false;
                    }
                }
                Symbol::Epsilon => {}
                terminal => {
                    result.insert(terminal);
                    return false;
                }
            }
        }
        true
    }

    fn follow(&self, nt: usize) -> TerminalSet {
        let mut result = TerminalSet::new();
        let mut visited = BitSet::with_capacity(self.nullable.len());
        self.follow_into(nt, &mut visited, &mut result);
        result
    }

    fn follow_into(&self, nt: usize, visited: &mut BitSet, result: &mut TerminalSet) {
        if !visited.insert(nt) {
            return;
        }
        if nt == 0 {
            result.insert(Symbol::EndOfInput);
        }

        let target = Symbol::Nonterminal(nt as u32);
        for production in self.grammar.productions() {
            let rhs = production.rhs();
            for (i, _) in rhs.iter().enumerate().filter(|(_, x)| **x == target) {
                // FIRST of the tail gets its own visited set; it is an independent query
                let mut first_visited = BitSet::with_capacity(self.nullable.len());
                let tail_nullable = self.sequence_first_into(&rhs[i + 1..], &mut first_visited, result);
                if tail_nullable {
                    if let Some(lhs) = production.lhs().nonterminal_id() {
                        self.follow_into(lhs, visited, result);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::FirstFollow;
    use crate::samples;

    #[test]
    fn matches_sequential() {
        let grammars = [
            samples::expression(),
            samples::arithmetic(),
            samples::list(),
            samples::dangling_else(),
            samples::lalr_not_slr(),
        ];
        for grammar in grammars {
            let sequential = FirstFollow::compute(&grammar);
            for parallelism in [1, 2, 4, 64] {
                assert_eq!(FirstFollow::compute_parallel(&grammar, parallelism), sequential);
            }
        }
    }
}
