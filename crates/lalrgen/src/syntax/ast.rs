//! Syntax tree of grammar definition files.

#[derive(Debug)]
pub struct Grammar {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    TerminalDesc(TerminalDesc),
    NonterminalDesc(NonterminalDesc),
    RuleDesc(RuleDesc),
    StartDesc(StartDesc),
}

/// `@terminal A, B, C;`
#[derive(Debug)]
pub struct TerminalDesc {
    pub idents: Vec<String>,
}

/// `@nonterminal A, B, C;`
#[derive(Debug)]
pub struct NonterminalDesc {
    pub idents: Vec<String>,
}

/// `@rule A := B C | @empty;`
#[derive(Debug)]
pub struct RuleDesc {
    pub left: String,
    pub productions: Vec<Production>,
}

/// `@start A;`
#[derive(Debug)]
pub struct StartDesc {
    pub name: String,
}

#[derive(Debug)]
pub struct Production {
    /// The symbol names of the right-hand side, empty for `@empty`.
    pub elems: Vec<String>,
}
