//! Grammar types.

use crate::{
    syntax::{self, ast as s},
    types::{Map, Set},
    util::display_fn,
};
use std::{fmt, fs, hash::Hash, io, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TerminalID::EOI => f.write_str("$eoi"),
            _ => f.write_str(&self.name),
        }
    }
}

/// A set of terminal symbols, used as look-ahead sets.
#[derive(Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.raw.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.raw.into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        // every element was inserted from a `u16`.
        self.inner.iter().map(|raw| TerminalID::new(raw as u16))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            f.write_str("[")?;
            for (i, t) in self.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                match g.terminals.get(&t) {
                    Some(t) => write!(f, "{}", t)?,
                    None => write!(f, "{:?}", t)?,
                }
            }
            f.write_str("]")
        })
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.raw.into()).collect(),
        }
    }
}
impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
// Compared by elements, not by the capacity of the underlying bit vector.
impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for TerminalSet {}
impl Hash for TerminalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for t in self.iter() {
            t.hash(state);
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The start symbol of augmented grammars.
    pub const START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            NonterminalID::START => f.write_str("$start"),
            _ => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The production `$start := S` added by the augmentation.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    alternative: u16,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the position of this production among the alternatives of its left-hand side.
    pub fn alternative(&self) -> u16 {
        self.alternative
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} :=", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                f.write_str(" @empty")?;
            }
            for symbol in self.right() {
                write!(f, " {}", g.symbol_display(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug, Clone)]
pub struct Grammar {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    productions: Map<NonterminalID, Vec<RuleID>>,
    start_symbol: NonterminalID,
    nullables: Map<NonterminalID, Set<u16>>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            if self.is_nullable(nonterminal.id()) {
                write!(f, " (nullable)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let grammar = syntax::parse(source).map_err(GrammarDefError::Syntax)?;
        Grammar::define(|g| define_grammar_from_syntax(g, grammar))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$eoi".into(),
            },
        );
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: "$start".into(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals.values()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals.values()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[&id]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Look up a user-defined terminal symbol by its name.
    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.id != TerminalID::EOI && t.name == name)
            .map(|t| t.id)
    }

    /// Look up a user-defined nonterminal symbol by its name.
    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.id != NonterminalID::START && n.name == name)
            .map(|n| n.id)
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    /// Return the alternatives of the specified nonterminal, in declaration order.
    pub fn productions(&self, n: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.productions
            .get(&n)
            .into_iter()
            .flatten()
            .map(|id| &self.rules[id])
    }

    /// Return the `alternative`-th production of the specified nonterminal.
    pub fn production(&self, n: NonterminalID, alternative: u16) -> Option<&Rule> {
        let id = self.productions.get(&n)?.get(usize::from(alternative))?;
        Some(&self.rules[id])
    }

    /// Return the alternatives deriving the empty string, for each nonterminal.
    ///
    /// An empty set means that the nonterminal is not nullable.
    pub fn nullable(&self) -> &Map<NonterminalID, Set<u16>> {
        &self.nullables
    }

    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nullables.get(&n).map_or(false, |alts| !alts.is_empty())
    }

    pub fn is_augmented(&self) -> bool {
        self.rules.contains_key(&RuleID::ACCEPT)
    }

    /// Return a copy of this grammar with the production `$start := S` added,
    /// where `S` is the start symbol.
    pub fn augmented(&self) -> Grammar {
        if self.is_augmented() {
            return self.clone();
        }

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                alternative: 0,
                right: vec![SymbolID::N(self.start_symbol)],
            },
        );
        rules.extend(self.rules.iter().map(|(id, rule)| (*id, rule.clone())));

        let mut productions = self.productions.clone();
        productions.insert(NonterminalID::START, vec![RuleID::ACCEPT]);

        let nullables = nullables(&self.nonterminals, &rules);

        Grammar {
            terminals: self.terminals.clone(),
            nonterminals: self.nonterminals.clone(),
            rules,
            productions,
            start_symbol: self.start_symbol,
            nullables,
        }
    }

    pub(crate) fn symbol_display(&self, symbol: SymbolID) -> impl fmt::Display + '_ {
        display_fn(move |f| match symbol {
            SymbolID::T(t) => write!(f, "{}", self.terminals[&t]),
            SymbolID::N(n) => write!(f, "{}", self.nonterminals[&n]),
        })
    }
}

fn nullables(
    nonterminals: &Map<NonterminalID, Nonterminal>,
    rules: &Map<RuleID, Rule>,
) -> Map<NonterminalID, Set<u16>> {
    let mut nullables: Map<NonterminalID, Set<u16>> = nonterminals
        .keys()
        .map(|n| (*n, Set::default()))
        .collect();
    loop {
        let mut changed = false;
        for rule in rules.values() {
            let is_nullable = rule.right.iter().all(|s| match s {
                SymbolID::N(n) => nullables.get(n).map_or(false, |alts| !alts.is_empty()),
                SymbolID::T(..) => false,
            });
            if is_nullable {
                changed |= nullables
                    .entry(rule.left)
                    .or_default()
                    .insert(rule.alternative);
            }
        }
        if !changed {
            break;
        }
    }
    nullables
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef,
    grammar: s::Grammar,
) -> Result<(), GrammarDefError> {
    let mut terminals = Map::<String, TerminalID>::default();
    let mut nonterminals = Map::<String, NonterminalID>::default();

    // Declarations are visible from every rule regardless of their position.
    for stmt in &grammar.stmts {
        match stmt {
            s::Stmt::TerminalDesc(s::TerminalDesc { idents }) => {
                for name in idents {
                    let id = g.terminal(name)?;
                    terminals.insert(name.clone(), id);
                }
            }
            s::Stmt::NonterminalDesc(s::NonterminalDesc { idents }) => {
                for name in idents {
                    let id = g.nonterminal(name)?;
                    nonterminals.insert(name.clone(), id);
                }
            }
            _ => (),
        }
    }

    let mut nonterminal = |g: &mut GrammarDef, name: &str| -> Result<_, GrammarDefError> {
        if let Some(id) = nonterminals.get(name) {
            return Ok(*id);
        }
        // Undeclared symbols are treated as nonterminals.
        let id = g.nonterminal(name)?;
        nonterminals.insert(name.to_owned(), id);
        Ok(id)
    };

    let mut start: Option<&str> = None;
    for stmt in &grammar.stmts {
        match stmt {
            s::Stmt::RuleDesc(s::RuleDesc { left, productions }) => {
                let left = nonterminal(g, left)?;
                for production in productions {
                    let mut right = vec![];
                    for elem in &production.elems {
                        let symbol = match terminals.get(elem.as_str()) {
                            Some(t) => SymbolID::T(*t),
                            None => SymbolID::N(nonterminal(g, elem)?),
                        };
                        right.push(symbol);
                    }
                    g.rule(left, right)?;
                }
            }
            s::Stmt::StartDesc(s::StartDesc { name }) => {
                start.replace(name.as_str());
            }
            _ => (),
        }
    }

    if let Some(name) = start {
        let start_symbol = match nonterminals.get(name) {
            Some(id) => *id,
            None => return Err(GrammarDefError::UnknownStartSymbol { name: name.into() }),
        };
        g.start_symbol(start_symbol)?;
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    productions: Map<NonterminalID, Vec<RuleID>>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        verify_ident(name)?;
        if self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name)
        {
            return Err(GrammarDefError::DuplicateSymbol {
                kind: "terminal",
                name: name.into(),
            });
        }

        let id = TerminalID::new(next_id(&mut self.next_terminal_id, "terminal")?);
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.into(),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        verify_ident(name)?;
        if self.nonterminals.values().any(|n| n.name == name)
            || self.terminals.values().any(|t| t.name == name)
        {
            return Err(GrammarDefError::DuplicateSymbol {
                kind: "nonterminal",
                name: name.into(),
            });
        }

        let id = NonterminalID::new(next_id(&mut self.next_nonterminal_id, "nonterminal")?);
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.into(),
            },
        );

        Ok(id)
    }

    /// Specify a production rule into this grammer.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();

        if left == NonterminalID::START || !self.nonterminals.contains_key(&left) {
            return Err(GrammarDefError::UnknownSymbol);
        }
        // The dot position of items is stored in `u16`.
        if u16::try_from(right.len()).is_err() {
            return Err(GrammarDefError::RuleTooLong {
                left: self.nonterminals[&left].name.clone(),
                len: right.len(),
            });
        }
        for symbol in &right {
            let declared = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => *n != NonterminalID::START && self.nonterminals.contains_key(n),
            };
            if !declared {
                return Err(GrammarDefError::UnknownSymbol);
            }
        }

        let alternatives = self.productions.entry(left).or_default();
        for id in alternatives.iter() {
            if self.rules[id].right == right {
                return Err(GrammarDefError::DuplicateRule {
                    left: self.nonterminals[&left].name.clone(),
                });
            }
        }

        let alternative =
            u16::try_from(alternatives.len()).map_err(|_| GrammarDefError::TooManyAlternatives {
                left: self.nonterminals[&left].name.clone(),
            })?;
        let id = RuleID::new(next_id(&mut self.next_rule_id, "rule")?);
        alternatives.push(id);
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                alternative,
                right,
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarDefError::UnknownSymbol);
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // The first declared nonterminal is used when no start symbol is specified.
        let start_symbol = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarDefError::EmptyNonterminals)?,
        };

        let nullables = nullables(&self.nonterminals, &self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            productions: self.productions,
            start_symbol,
            nullables,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(#[from] io::Error),

    #[error("Syntax error: {}", _0)]
    Syntax(anyhow::Error),

    #[error("incorrect symbol name: `{}'", name)]
    InvalidIdent { name: String },

    #[error("the {} `{}' has already been declared", kind, name)]
    DuplicateSymbol { kind: &'static str, name: String },

    #[error("duplicate production rule detected for `{}'", left)]
    DuplicateRule { left: String },

    #[error("undeclared symbol used")]
    UnknownSymbol,

    #[error("unknown start symbol: `{}'", name)]
    UnknownStartSymbol { name: String },

    #[error("empty nonterminal symbols")]
    EmptyNonterminals,

    #[error("too many {} definitions", kind)]
    TooManyDefinitions { kind: &'static str },

    #[error("too many production rules for `{}'", left)]
    TooManyAlternatives { left: String },

    #[error("the production rule for `{}' is too long ({} symbols)", left, len)]
    RuleTooLong { left: String, len: usize },
}

fn next_id(counter: &mut u16, kind: &'static str) -> Result<u16, GrammarDefError> {
    let id = *counter;
    *counter = id
        .checked_add(1)
        .ok_or(GrammarDefError::TooManyDefinitions { kind })?;
    Ok(id)
}

fn verify_ident(s: &str) -> Result<(), GrammarDefError> {
    let mut chars = s.chars();
    let is_ident = match chars.next() {
        Some(first) => is_ident_start(first) && chars.all(is_ident_continue),
        None => false,
    };
    if !is_ident {
        return Err(GrammarDefError::InvalidIdent { name: s.into() });
    }
    Ok(())
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    #[test]
    fn nullable_alternatives() {
        // A := @empty | B ;  B := @empty ;  S := A x
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.rule(s, [N(a), T(x)])?;
            g.rule(a, [])?;
            g.rule(a, [N(b)])?;
            g.rule(b, [])?;
            Ok(())
        })
        .unwrap();

        let s = grammar.nonterminal_by_name("S").unwrap();
        let a = grammar.nonterminal_by_name("A").unwrap();
        let b = grammar.nonterminal_by_name("B").unwrap();
        assert!(!grammar.is_nullable(s));
        assert!(grammar.is_nullable(a));
        assert!(grammar.is_nullable(b));
        assert_eq!(grammar.nullable()[&a].iter().copied().collect::<Vec<_>>(), [0, 1]);
        assert!(grammar.nullable()[&s].is_empty());
    }

    #[test]
    fn augmentation() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [])?;
            g.rule(s, [T(a), N(s)])?;
            Ok(())
        })
        .unwrap();
        assert!(!grammar.is_augmented());
        assert_eq!(grammar.productions(NonterminalID::START).count(), 0);

        let augmented = grammar.augmented();
        assert!(augmented.is_augmented());
        let accept = augmented.production(NonterminalID::START, 0).unwrap();
        assert_eq!(accept.id(), RuleID::ACCEPT);
        assert_eq!(accept.right(), [N(grammar.start_symbol())]);
        assert!(augmented.is_nullable(NonterminalID::START));
        assert_eq!(augmented.rules().count(), grammar.rules().count() + 1);

        // idempotent
        assert_eq!(augmented.augmented().rules().count(), augmented.rules().count());
    }

    #[test]
    fn definition_errors() {
        let err = Grammar::define(|g| {
            g.terminal("a")?;
            g.terminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol { .. }));

        let err = Grammar::define(|g| {
            g.terminal("1abc")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::InvalidIdent { .. }));

        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateRule { .. }));

        let err = Grammar::define(|g| {
            g.terminal("a")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::EmptyNonterminals));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [T(TerminalID::EOI)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::UnknownSymbol));
    }

    #[test]
    fn rule_length_limit() {
        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, vec![T(a); usize::from(u16::MAX)])?;
            g.rule(s, vec![T(a); usize::from(u16::MAX) + 1])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            GrammarDefError::RuleTooLong { len: 65536, .. }
        ));
    }

    #[test]
    fn id_exhaustion() {
        let mut counter = u16::MAX - 1;
        assert_eq!(next_id(&mut counter, "rule").unwrap(), u16::MAX - 1);
        assert!(matches!(
            next_id(&mut counter, "rule"),
            Err(GrammarDefError::TooManyDefinitions { kind: "rule" })
        ));
        // the counter stays exhausted
        assert!(next_id(&mut counter, "rule").is_err());
    }

    #[test]
    fn from_str() {
        let grammar = Grammar::from_str(
            "
            @terminal PLUS, ID;
            @start E;
            @rule E := E PLUS T | T;
            @rule T := ID | @empty;
            ",
        )
        .unwrap();
        let e = grammar.nonterminal_by_name("E").unwrap();
        let t = grammar.nonterminal_by_name("T").unwrap();
        let plus = grammar.terminal_by_name("PLUS").unwrap();
        assert_eq!(grammar.start_symbol(), e);
        assert_eq!(grammar.productions(e).count(), 2);
        assert_eq!(
            grammar.production(e, 0).unwrap().right(),
            [N(e), T(plus), N(t)]
        );
        assert!(grammar.production(t, 1).unwrap().right().is_empty());
        assert!(grammar.is_nullable(t));
        assert!(grammar.is_nullable(e));
    }

    #[test]
    fn from_str_unknown_start() {
        let err = Grammar::from_str("@terminal a; @start X; @rule S := a;").unwrap_err();
        assert!(matches!(err, GrammarDefError::UnknownStartSymbol { .. }));
    }
}
