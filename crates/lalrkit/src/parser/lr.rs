use thiserror::Error;

use crate::automaton::StateIdx;
use crate::diagnostics::ErrorSink;
use crate::grammar::Symbol;
use crate::table::{Action, ParseTables};

use super::tree::ParseNode;

/// Anything the scanner hands over. The kind is used directly as a terminal code.
pub trait Token {
    fn kind(&self) -> u32;
}

impl Token for u32 {
    fn kind(&self) -> u32 {
        *self
    }
}

/// Kind plus an arbitrary payload (lexeme text, span, ...).
impl<P> Token for (u32, P) {
    fn kind(&self) -> u32 {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected {found} in state {state}, expected one of {expected:?}")]
    UnexpectedToken {
        state: StateIdx,
        found: Symbol,
        expected: Vec<Symbol>,
    },
    #[error("no goto from state {state} on {nonterminal}")]
    MissingGoto { state: StateIdx, nonterminal: Symbol },
    #[error("parser stack underflow in state {0}")]
    StackUnderflow(StateIdx),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub shifts: usize,
    pub reductions: usize,
}

/// Shift/reduce driver over compiled tables. Keeps no state between runs except stats.
pub struct Parser<'t> {
    tables: &'t ParseTables,
    stats: ParseStats,
}

impl<'t> Parser<'t> {
    pub fn new(tables: &'t ParseTables) -> Parser<'t> {
        Parser {
            tables,
            stats: ParseStats::default(),
        }
    }

    /// Counters of the last `parse` call.
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Same as [`Parser::parse`], and a failure is also reported to `sink`.
    pub fn parse_with_sink<T: Token>(
        &mut self,
        tokens: impl IntoIterator<Item = T>,
        sink: &mut dyn ErrorSink,
    ) -> Result<ParseNode<T>, ParseError> {
        self.parse(tokens).inspect_err(|err| sink.report(err.to_string()))
    }

    pub fn parse<T: Token>(&mut self, tokens: impl IntoIterator<Item = T>) -> Result<ParseNode<T>, ParseError> {
        self.stats = ParseStats::default();

        let mut tokens = tokens.into_iter();
        let mut states: Vec<StateIdx> = vec![self.tables.start()];
        let mut nodes: Vec<ParseNode<T>> = Vec::new();
        let mut lookahead: Option<T> = tokens.next();

        loop {
            let state = *states.last().ok_or(ParseError::StackUnderflow(self.tables.start()))?;
            let symbol = match &lookahead {
                Some(token) => Symbol::Terminal(token.kind()),
                None => Symbol::EndOfInput,
            };

            let Some(action) = self.tables.action(state, symbol) else {
                log::trace!("state {}: no action on {}", state, symbol);
                return Err(ParseError::UnexpectedToken {
                    state,
                    found: symbol,
                    expected: self.tables.expected(state),
                });
            };

            match action {
                Action::Shift(target) => {
                    log::trace!("state {}: shift {} -> {}", state, symbol, target);
                    // Shift is only ever compiled for real terminals.
                    let token = lookahead.take().ok_or_else(|| ParseError::UnexpectedToken {
                        state,
                        found: symbol,
                        expected: self.tables.expected(state),
                    })?;
                    nodes.push(ParseNode::Leaf(token));
                    states.push(target);
                    lookahead = tokens.next();
                    self.stats.shifts += 1;
                }

                Action::Reduce(production) => {
                    let (lhs, len) = self
                        .tables
                        .reduction(production)
                        .ok_or(ParseError::StackUnderflow(state))?;
                    if len > nodes.len() || len >= states.len() {
                        return Err(ParseError::StackUnderflow(state));
                    }

                    let children = nodes.split_off(nodes.len() - len);
                    states.truncate(states.len() - len);
                    let exposed = *states.last().ok_or(ParseError::StackUnderflow(state))?;
                    let target = self.tables.goto(exposed, lhs).ok_or(ParseError::MissingGoto {
                        state: exposed,
                        nonterminal: lhs,
                    })?;

                    log::trace!(
                        "state {}: reduce by {} ({} pops), goto {} -> {}",
                        state,
                        production,
                        len,
                        lhs,
                        target
                    );
                    nodes.push(ParseNode::Composite {
                        production,
                        lhs,
                        children,
                    });
                    states.push(target);
                    self.stats.reductions += 1;
                }

                Action::Accept => {
                    log::trace!(
                        "state {}: accept after {} shifts, {} reductions",
                        state,
                        self.stats.shifts,
                        self.stats.reductions
                    );
                    let root = nodes.pop().ok_or(ParseError::StackUnderflow(state))?;
                    if !nodes.is_empty() {
                        return Err(ParseError::StackUnderflow(state));
                    }
                    return Ok(root);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FirstFollow;
    use crate::automaton::Automaton;
    use crate::diagnostics::{Diagnostics, ErrorSink};
    use crate::grammar::{Grammar, ProdIdx};
    use crate::samples::{self, COMMA, ID, PLUS};

    fn tables(grammar: &Grammar) -> ParseTables {
        let sets = FirstFollow::compute(grammar);
        let automaton = Automaton::build(grammar, &sets);
        ParseTables::compile(grammar, &automaton, &mut Diagnostics::new()).expect("LALR(1) grammar")
    }

    #[test]
    fn expression_shape() {
        let grammar = samples::expression();
        let tables = tables(&grammar);
        let mut parser = Parser::new(&tables);
        let tree = parser.parse([ID, PLUS, ID]).unwrap();

        assert_eq!(tree.display(&grammar).to_string(), "E(E(T(id)) + T(id))");
        assert_eq!(tree.leaves().copied().collect::<Vec<_>>(), vec![ID, PLUS, ID]);
        assert_eq!(parser.stats(), ParseStats { shifts: 3, reductions: 4 });
    }

    #[test]
    fn epsilon_reduction_pops_nothing() {
        let grammar = samples::list();
        let tables = tables(&grammar);
        let mut parser = Parser::new(&tables);
        let tree = parser.parse([ID]).unwrap();

        // L(id L'()) with L' -> ε
        let ParseNode::Composite { children, .. } = &tree else {
            panic!("expected composite root");
        };
        assert_eq!(children.len(), 2);
        let ParseNode::Composite { production, children: empty, .. } = &children[1] else {
            panic!("expected L' node");
        };
        assert_eq!(*production, ProdIdx::new(3));
        assert!(empty.is_empty());
        assert_eq!(parser.stats().shifts, 1);

        let tree = parser.parse([ID, COMMA, ID, COMMA, ID]).unwrap();
        assert_eq!(tree.into_leaves(), vec![ID, COMMA, ID, COMMA, ID]);
    }

    #[test]
    fn premature_end_of_input() {
        let grammar = samples::expression();
        let tables = tables(&grammar);
        let err = Parser::new(&tables).parse([ID, PLUS]).unwrap_err();

        let ParseError::UnexpectedToken { found, expected, .. } = err else {
            panic!("expected UnexpectedToken");
        };
        assert_eq!(found, Symbol::EndOfInput);
        assert_eq!(expected, vec![Symbol::Terminal(ID)]);
    }

    #[test]
    fn unexpected_terminal_keeps_payload_out_of_error() {
        let grammar = samples::expression();
        let tables = tables(&grammar);
        let err = Parser::new(&tables)
            .parse([(ID, "x"), (ID, "y")])
            .unwrap_err();

        assert!(matches!(
            err,
            ParseError::UnexpectedToken { found: Symbol::Terminal(ID), .. }
        ));
    }

    #[test]
    fn failures_reach_the_sink() {
        let grammar = samples::expression();
        let tables = tables(&grammar);
        let mut parser = Parser::new(&tables);
        let mut diagnostics = Diagnostics::new();

        parser.parse_with_sink([ID, PLUS, ID], &mut diagnostics).unwrap();
        assert_eq!(diagnostics.failure_count(), 0);

        let err = parser.parse_with_sink([ID, ID], &mut diagnostics).unwrap_err();
        assert_eq!(diagnostics.failure_count(), 1);
        assert_eq!(diagnostics.messages()[0], err.to_string());
    }

    #[test]
    fn empty_input_is_rejected() {
        let grammar = samples::expression();
        let tables = tables(&grammar);
        let err = Parser::new(&tables).parse(Vec::<u32>::new()).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { found: Symbol::EndOfInput, .. }));
    }
}
