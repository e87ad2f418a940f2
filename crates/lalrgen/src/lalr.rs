//! LALR(1) parse table construction.
//!
//! The look-ahead sets are computed with DeRemer and Pennello's method\[1\].
//! The resulting LR(0) states, annotated with their actions, are assembled into
//! a finite automaton over grammar symbols and minimized.
//!
//! \[1\]: DeRemer and Pennello, Efficient Computation of LALR(1) Look-Ahead Sets
//!       <https://dl.acm.org/doi/10.1145/69622.357187>

pub mod digraph;
pub mod lookahead;
pub mod lr0;
pub mod table;

pub use self::table::{Action, Config, ParserTables, ReduceAction};

use self::lr0::{Item, StateID};
use crate::{automaton::AutomatonError, grammar::Grammar, grammar::SymbolID};

/// Build the parser tables of the specified grammar with the default configuration.
pub fn build(g: &Grammar) -> Result<ParserTables, BuildError> {
    Config::new().build(g)
}

/// Inconsistencies detected while constructing the tables.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no transition from {:?} on {:?}", from, symbol)]
    MissingTransition { from: StateID, symbol: SymbolID },

    #[error("the state {:?} does not contain the reduction item {:?}", state, item)]
    MissingReduction { state: StateID, item: Item },

    #[error("the item {:?} does not refer to a production", item)]
    UnknownItem { item: Item },

    #[error("failed to assemble the automaton")]
    Automaton(#[from] AutomatonError),
}
