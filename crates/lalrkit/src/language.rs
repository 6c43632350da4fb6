use std::sync::OnceLock;

use thiserror::Error;

use crate::analysis::FirstFollow;
use crate::automaton::Automaton;
use crate::diagnostics::{Diagnostics, ErrorSink};
use crate::grammar::Grammar;
use crate::parser::{ParseError, ParseNode, Parser, Token};
use crate::table::{ParseTables, TableError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Worker count for FIRST/FOLLOW. `None` runs the sequential fixed point.
    pub parallelism: Option<usize>,
}

#[derive(Debug)]
struct Compiled {
    sets: FirstFollow,
    automaton: Automaton,
    tables: Result<ParseTables, TableError>,
    diagnostics: Vec<String>,
}

/// A grammar together with its lazily built tables. Construction happens once,
/// on first use, and the outcome (tables or conflicts) is kept for the lifetime
/// of the value. Safe to share between threads; every parse reads the same tables.
#[derive(Debug)]
pub struct Language {
    grammar: Grammar,
    options: AnalysisOptions,
    compiled: OnceLock<Compiled>,
}

impl Language {
    pub fn new(grammar: Grammar) -> Language {
        Language::with_options(grammar, AnalysisOptions::default())
    }

    pub fn with_options(grammar: Grammar, options: AnalysisOptions) -> Language {
        Language {
            grammar,
            options,
            compiled: OnceLock::new(),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn sets(&self) -> &FirstFollow {
        &self.compiled().sets
    }

    pub fn automaton(&self) -> &Automaton {
        &self.compiled().automaton
    }

    pub fn tables(&self) -> Result<&ParseTables, LanguageError> {
        self.compiled().tables.as_ref().map_err(|e| e.clone().into())
    }

    /// Conflict messages reported while compiling the tables.
    pub fn diagnostics(&self) -> &[String] {
        &self.compiled().diagnostics
    }

    pub fn parse<T: Token>(&self, tokens: impl IntoIterator<Item = T>) -> Result<ParseNode<T>, LanguageError> {
        let tables = self.tables()?;
        Ok(Parser::new(tables).parse(tokens)?)
    }

    /// Parses like [`Language::parse`] and reports any failure, table or parse, to `sink`.
    pub fn parse_with_sink<T: Token>(
        &self,
        tokens: impl IntoIterator<Item = T>,
        sink: &mut dyn ErrorSink,
    ) -> Result<ParseNode<T>, LanguageError> {
        self.parse(tokens).inspect_err(|err| sink.report(err.to_string()))
    }

    fn compiled(&self) -> &Compiled {
        self.compiled.get_or_init(|| {
            let sets = match self.options.parallelism {
                Some(workers) => FirstFollow::compute_parallel(&self.grammar, workers),
                None => FirstFollow::compute(&self.grammar),
            };
            let automaton = Automaton::build(&self.grammar, &sets);
            let mut diagnostics = Diagnostics::new();
            let tables = ParseTables::compile(&self.grammar, &automaton, &mut diagnostics);
            Compiled {
                sets,
                automaton,
                tables,
                diagnostics: diagnostics.into_messages(),
            }
        })
    }
}
