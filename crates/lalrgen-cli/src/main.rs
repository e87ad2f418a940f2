use anyhow::Context as _;
use clap::Parser;
use lalrgen::{
    grammar::{Grammar, NonterminalID},
    lalr::{lr0::LR0Automaton, Config},
    parser,
};
use std::{fs, path::PathBuf, process};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    input: PathBuf,

    /// Print the grammar and the parser tables.
    #[arg(long)]
    dump: bool,

    /// Keep the states of the LR(0) automaton as they are.
    #[arg(long)]
    no_minimize: bool,

    /// The names of terminal symbols to be parsed.
    tokens: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let in_file =
        fs::canonicalize(&args.input).context("failed to canonicalize the input file name")?;

    let grammar = Grammar::from_file(&in_file)
        .with_context(|| format!("failed to load the grammar from {}", in_file.display()))?;

    let mut empty_nonterminals = vec![];
    for nonterminal in grammar.nonterminals() {
        if nonterminal.id() != NonterminalID::START
            && grammar.productions(nonterminal.id()).next().is_none()
        {
            empty_nonterminals.push(nonterminal.name());
        }
    }
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    let tables = Config::new()
        .minimize(!args.no_minimize)
        .build(&grammar)
        .context("failed to build the parser tables")?;

    let num_conflicts = tables.conflicting_states().count();
    if num_conflicts > 0 {
        let suffix = if num_conflicts == 1 { "" } else { "s" };
        println!(
            "[warning] The tables have {} state{} with conflicting actions.",
            num_conflicts, suffix
        );
    }

    if args.dump {
        let augmented = grammar.augmented();
        println!("{}", augmented);
        println!("{}", LR0Automaton::build(&augmented).display(&augmented));
        println!("{}", tables.display(&augmented));
    }

    if !args.tokens.is_empty() {
        let mut tokens = vec![];
        for name in &args.tokens {
            let id = grammar
                .terminal_by_name(name)
                .with_context(|| format!("unknown terminal symbol: `{}'", name))?;
            tokens.push(id);
        }

        if parser::parse(&tables, tokens) {
            println!("accepted");
        } else {
            println!("rejected");
            process::exit(1);
        }
    }

    Ok(())
}
