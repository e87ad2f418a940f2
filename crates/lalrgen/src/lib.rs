//! LALR(1) parse table construction and a table-driven shift/reduce parser.
//!
//! ```
//! use lalrgen::{grammar::{Grammar, SymbolID::*}, lalr, parser};
//!
//! let mut ids = None;
//! let grammar = Grammar::define(|g| {
//!     let plus = g.terminal("PLUS")?;
//!     let id = g.terminal("ID")?;
//!     let e = g.nonterminal("E")?;
//!     g.rule(e, [N(e), T(plus), N(e)])?;
//!     g.rule(e, [T(id)])?;
//!     ids = Some((plus, id));
//!     Ok(())
//! })
//! .unwrap();
//! let (plus, id) = ids.unwrap();
//!
//! let tables = lalr::build(&grammar).unwrap();
//! assert!(parser::parse(&tables, [id, plus, id, plus, id]));
//! assert!(!parser::parse(&tables, [id, id]));
//! ```

pub mod automaton;
pub mod grammar;
pub mod lalr;
pub mod parser;
pub mod syntax;
pub mod types;
pub mod util;
