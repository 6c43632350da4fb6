pub mod analysis;
pub mod automaton;
pub mod diagnostics;
pub mod grammar;
pub mod language;
pub mod parser;
pub mod samples;
pub mod table;

pub use analysis::FirstFollow;
pub use automaton::{Automaton, StateIdx};
pub use diagnostics::{Diagnostics, ErrorSink, LogSink};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, ProdIdx, Symbol, TerminalSet, MAX_TERMINAL_CODE};
pub use language::{AnalysisOptions, Language, LanguageError};
pub use parser::{ParseError, ParseNode, Parser, Token};
pub use table::{Action, ParseTables, TableError};
