//! Command line front end over the bundled sample grammars: prints the
//! FIRST/FOLLOW sets, the LALR(1) automaton and its tables, dumps compiled
//! tables to disk and parses token name sequences.

use std::{fs, path::PathBuf, time::Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{builder::PossibleValuesParser, Parser as ClapParser, Subcommand};
use lalrkit::{
    samples, AnalysisOptions, FirstFollow, Grammar, Language, LanguageError, Symbol, TableError,
    TerminalSet,
};
use petgraph::dot::Dot;
use serde_binary::binary_stream::Endian;

#[derive(ClapParser, Debug)]
#[command(version, about = "LALR(1) table construction over the sample grammars", long_about = None)]
struct Args {
    /// Sample grammar to work with
    #[arg(value_parser = PossibleValuesParser::new(samples::NAMES))]
    grammar: String,

    /// Compute FIRST/FOLLOW with this many worker threads
    #[arg(short, long, global = true)]
    parallel: Option<usize>,

    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print FIRST sets
    First,
    /// Print FOLLOW sets
    Follow,
    /// Print the LALR(1) states
    States,
    /// Print ACTION/GOTO tables, or the conflicts preventing them
    Table,
    /// Print the automaton as Graphviz DOT
    Dot,
    /// Write the compiled tables in binary form
    Compile {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Parse a sequence of terminal names, e.g. `id + id`
    Parse {
        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

fn print_sets<'a>(grammar: &Grammar, sets: impl Iterator<Item = (Symbol, Option<&'a TerminalSet>)>) {
    for (nt, set) in sets {
        let names: Vec<String> = set
            .into_iter()
            .flat_map(|s| s.iter())
            .map(|s| grammar.symbol_name(s))
            .collect();
        println!("{:>8}  {{{}}}", grammar.symbol_name(nt), names.join(", "));
    }
}

fn tokens_from_names(grammar: &Grammar, names: &[String]) -> Result<Vec<u32>> {
    names
        .iter()
        .map(|name| match grammar.symbol_by_name(name) {
            Some(Symbol::Terminal(code)) => Ok(code),
            Some(_) => Err(anyhow!("{} is not a terminal", name)),
            None => Err(anyhow!("unknown terminal {}", name)),
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let grammar = samples::by_name(&args.grammar).ok_or_else(|| anyhow!("no grammar named {}", args.grammar))?;
    let options = AnalysisOptions {
        parallelism: args.parallel,
    };
    let language = Language::with_options(grammar, options);
    let grammar = language.grammar();

    match args.command {
        Commands::First => {
            let sets: &FirstFollow = language.sets();
            print_sets(grammar, grammar.nonterminals().map(|nt| (nt, sets.first(nt))));
        }

        Commands::Follow => {
            let sets: &FirstFollow = language.sets();
            print_sets(grammar, grammar.nonterminals().map(|nt| (nt, sets.follow(nt))));
        }

        Commands::States => {
            print!("{}", language.automaton().display(grammar));
        }

        Commands::Table => match language.tables() {
            Ok(tables) => print!("{}", tables.display(grammar)),
            Err(LanguageError::Table(TableError::Conflicts(_))) => {
                for message in language.diagnostics() {
                    println!("{}", message);
                }
                bail!("{} is not LALR(1)", args.grammar);
            }
            Err(err) => return Err(err.into()),
        },

        Commands::Dot => {
            let graph = language.automaton().to_graph(grammar);
            println!("{}", Dot::new(&graph));
        }

        Commands::Compile { output } => {
            let now = Instant::now();
            let tables = language.tables()?;
            log::debug!("table construction took {:.2?}", now.elapsed());

            let serialized = serde_binary::to_vec(tables, Endian::Little)?;
            fs::write(&output, &serialized).with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {}, {} bytes", output.display(), serialized.len());
        }

        Commands::Parse { tokens } => {
            let tokens = tokens_from_names(grammar, &tokens)?;
            let tree = language.parse(tokens)?;
            println!("{}", tree.display(grammar));
        }
    }

    Ok(())
}
