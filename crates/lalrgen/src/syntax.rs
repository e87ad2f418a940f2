//! Grammar definition files.
//!
//! The files are parsed by the table-driven parser of this crate, using the
//! tables built from the grammar below.
//!
//! ```text
//! Grammar := Stmts ;
//! Stmts := @empty | Stmts Stmt SEMICOLON ;
//! Stmt := KW_TERMINAL Idents
//!       | KW_NONTERMINAL Idents
//!       | KW_START IDENT
//!       | KW_RULE IDENT COLON_EQ Productions ;
//! Idents := IDENT | Idents COMMA IDENT ;
//! Productions := Production | Productions VERT_BAR Production ;
//! Production := KW_EMPTY | Elems ;
//! Elems := IDENT | Elems IDENT ;
//! ```

pub mod ast;
pub mod lexer;

use self::lexer::{Keyword, Lexer, Token};
use crate::{
    grammar::{Grammar, GrammarDef, GrammarDefError, NonterminalID, RuleID, SymbolID, TerminalID},
    lalr::{self, ParserTables},
    parser::{ParseEvent, ParseItem, Parser},
    types::Map,
};
use anyhow::Context as _;
use StackItem as s;

enum StackItem {
    Grammar(ast::Grammar),
    Stmts(Vec<ast::Stmt>),
    Stmt(ast::Stmt),
    Idents(Vec<String>),
    Productions(Vec<ast::Production>),
    Production(ast::Production),
    Elems(Vec<String>),
}

#[derive(Debug, Copy, Clone)]
enum Reduction {
    Grammar,
    StmtsEmpty,
    StmtsPush,
    TerminalDesc,
    NonterminalDesc,
    StartDesc,
    RuleDesc,
    IdentsFirst,
    IdentsPush,
    ProductionsFirst,
    ProductionsPush,
    ProductionEmpty,
    ProductionElems,
    ElemsFirst,
    ElemsPush,
}

struct MetaTerminals {
    colon_eq: TerminalID,
    comma: TerminalID,
    semicolon: TerminalID,
    vert_bar: TerminalID,
    kw_terminal: TerminalID,
    kw_nonterminal: TerminalID,
    kw_start: TerminalID,
    kw_rule: TerminalID,
    kw_empty: TerminalID,
    ident: TerminalID,
}

impl MetaTerminals {
    fn terminal(&self, token: &Token<'_>) -> TerminalID {
        match token {
            Token::ColonEq => self.colon_eq,
            Token::Comma => self.comma,
            Token::Semicolon => self.semicolon,
            Token::VertBar => self.vert_bar,
            Token::Kw(Keyword::Terminal) => self.kw_terminal,
            Token::Kw(Keyword::Nonterminal) => self.kw_nonterminal,
            Token::Kw(Keyword::Start) => self.kw_start,
            Token::Kw(Keyword::Rule) => self.kw_rule,
            Token::Kw(Keyword::Empty) => self.kw_empty,
            Token::Ident(..) => self.ident,
        }
    }
}

struct MetaGrammar {
    terminals: MetaTerminals,
    reductions: Map<RuleID, Reduction>,
    tables: ParserTables,
}

impl MetaGrammar {
    fn new() -> anyhow::Result<Self> {
        use SymbolID::*;

        let mut terminals = None;
        let mut reductions = Map::default();
        let grammar = Grammar::define(|g| {
            let t = MetaTerminals {
                colon_eq: g.terminal("COLON_EQ")?,
                comma: g.terminal("COMMA")?,
                semicolon: g.terminal("SEMICOLON")?,
                vert_bar: g.terminal("VERT_BAR")?,
                kw_terminal: g.terminal("KW_TERMINAL")?,
                kw_nonterminal: g.terminal("KW_NONTERMINAL")?,
                kw_start: g.terminal("KW_START")?,
                kw_rule: g.terminal("KW_RULE")?,
                kw_empty: g.terminal("KW_EMPTY")?,
                ident: g.terminal("IDENT")?,
            };

            let grammar = g.nonterminal("Grammar")?;
            let stmts = g.nonterminal("Stmts")?;
            let stmt = g.nonterminal("Stmt")?;
            let idents = g.nonterminal("Idents")?;
            let productions = g.nonterminal("Productions")?;
            let production = g.nonterminal("Production")?;
            let elems = g.nonterminal("Elems")?;
            g.start_symbol(grammar)?;

            let mut rule = |g: &mut GrammarDef,
                            left: NonterminalID,
                            right: &[SymbolID],
                            reduction: Reduction|
             -> Result<(), GrammarDefError> {
                let id = g.rule(left, right.iter().copied())?;
                reductions.insert(id, reduction);
                Ok(())
            };

            rule(g, grammar, &[N(stmts)], Reduction::Grammar)?;

            rule(g, stmts, &[], Reduction::StmtsEmpty)?;
            rule(
                g,
                stmts,
                &[N(stmts), N(stmt), T(t.semicolon)],
                Reduction::StmtsPush,
            )?;

            rule(
                g,
                stmt,
                &[T(t.kw_terminal), N(idents)],
                Reduction::TerminalDesc,
            )?;
            rule(
                g,
                stmt,
                &[T(t.kw_nonterminal), N(idents)],
                Reduction::NonterminalDesc,
            )?;
            rule(
                g,
                stmt,
                &[T(t.kw_start), T(t.ident)],
                Reduction::StartDesc,
            )?;
            rule(
                g,
                stmt,
                &[T(t.kw_rule), T(t.ident), T(t.colon_eq), N(productions)],
                Reduction::RuleDesc,
            )?;

            rule(g, idents, &[T(t.ident)], Reduction::IdentsFirst)?;
            rule(
                g,
                idents,
                &[N(idents), T(t.comma), T(t.ident)],
                Reduction::IdentsPush,
            )?;

            rule(
                g,
                productions,
                &[N(production)],
                Reduction::ProductionsFirst,
            )?;
            rule(
                g,
                productions,
                &[N(productions), T(t.vert_bar), N(production)],
                Reduction::ProductionsPush,
            )?;

            rule(g, production, &[T(t.kw_empty)], Reduction::ProductionEmpty)?;
            rule(g, production, &[N(elems)], Reduction::ProductionElems)?;

            rule(g, elems, &[T(t.ident)], Reduction::ElemsFirst)?;
            rule(g, elems, &[N(elems), T(t.ident)], Reduction::ElemsPush)?;

            terminals = Some(t);
            Ok(())
        })
        .context("failed to define the grammar of definition files")?;

        let tables = lalr::build(&grammar)?;
        let terminals = terminals.context("missing terminal symbols")?;

        Ok(Self {
            terminals,
            reductions,
            tables,
        })
    }
}

fn ident(item: Option<&ParseItem<(TerminalID, Token<'_>)>>) -> anyhow::Result<String> {
    match item {
        Some(ParseItem::T((_, Token::Ident(name)))) => Ok(name.to_string()),
        _ => anyhow::bail!("unexpected argument, expecting an identifier"),
    }
}

pub fn parse(source: &str) -> anyhow::Result<ast::Grammar> {
    let span = tracing::debug_span!("parse");
    let _entered = span.enter();

    let meta = MetaGrammar::new()?;

    let tokens = Lexer::new(source)
        .map(|res| res.map(|(_, token, _)| (meta.terminals.terminal(&token), token)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow::anyhow!("lexer error: {:?}", err))?;
    tracing::trace!("{} tokens", tokens.len());

    let mut tokens = tokens.into_iter();
    let mut parser = Parser::new(&meta.tables);
    let mut args = vec![];
    let mut stack: Vec<StackItem> = vec![];
    macro_rules! pop_stack {
        ($Variant:ident) => {
            match stack.pop() {
                Some(StackItem::$Variant(item)) => item,
                _ => anyhow::bail!(concat!(
                    "unexpected stack item, expecting ",
                    stringify!($Variant)
                )),
            }
        };
    }
    macro_rules! peek_stack {
        ($Variant:ident) => {
            match stack.last_mut() {
                Some(StackItem::$Variant(item)) => item,
                _ => anyhow::bail!(concat!(
                    "unexpected stack item, expecting ",
                    stringify!($Variant)
                )),
            }
        };
    }

    loop {
        match parser.next_event(&mut tokens, &mut args) {
            ParseEvent::Reduce(rule) => {
                let reduction = *meta
                    .reductions
                    .get(&rule)
                    .context("unknown production rule")?;
                tracing::trace!("reducing: {:?} -> {:?}", reduction, args);
                match reduction {
                    Reduction::Grammar => {
                        let stmts = pop_stack!(Stmts);
                        stack.push(s::Grammar(ast::Grammar { stmts }));
                    }

                    Reduction::StmtsEmpty => {
                        stack.push(s::Stmts(vec![]));
                    }
                    Reduction::StmtsPush => {
                        let stmt = pop_stack!(Stmt);
                        let stmts = peek_stack!(Stmts);
                        stmts.push(stmt);
                    }

                    Reduction::TerminalDesc => {
                        let idents = pop_stack!(Idents);
                        stack.push(s::Stmt(ast::Stmt::TerminalDesc(ast::TerminalDesc {
                            idents,
                        })));
                    }
                    Reduction::NonterminalDesc => {
                        let idents = pop_stack!(Idents);
                        stack.push(s::Stmt(ast::Stmt::NonterminalDesc(
                            ast::NonterminalDesc { idents },
                        )));
                    }
                    Reduction::StartDesc => {
                        let name = ident(args.get(1))?;
                        stack.push(s::Stmt(ast::Stmt::StartDesc(ast::StartDesc { name })));
                    }
                    Reduction::RuleDesc => {
                        let left = ident(args.get(1))?;
                        let productions = pop_stack!(Productions);
                        stack.push(s::Stmt(ast::Stmt::RuleDesc(ast::RuleDesc {
                            left,
                            productions,
                        })));
                    }

                    Reduction::IdentsFirst => {
                        stack.push(s::Idents(vec![ident(args.first())?]));
                    }
                    Reduction::IdentsPush => {
                        let name = ident(args.get(2))?;
                        let idents = peek_stack!(Idents);
                        idents.push(name);
                    }

                    Reduction::ProductionsFirst => {
                        let production = pop_stack!(Production);
                        stack.push(s::Productions(vec![production]));
                    }
                    Reduction::ProductionsPush => {
                        let production = pop_stack!(Production);
                        let productions = peek_stack!(Productions);
                        productions.push(production);
                    }

                    Reduction::ProductionEmpty => {
                        stack.push(s::Production(ast::Production { elems: vec![] }));
                    }
                    Reduction::ProductionElems => {
                        let elems = pop_stack!(Elems);
                        stack.push(s::Production(ast::Production { elems }));
                    }

                    Reduction::ElemsFirst => {
                        stack.push(s::Elems(vec![ident(args.first())?]));
                    }
                    Reduction::ElemsPush => {
                        let elem = ident(args.get(1))?;
                        let elems = peek_stack!(Elems);
                        elems.push(elem);
                    }
                }
            }

            ParseEvent::Accept => {
                tracing::trace!("accepted");
                let grammar = pop_stack!(Grammar);
                tracing::trace!(" --> {:?}", grammar);
                return Ok(grammar);
            }

            ParseEvent::Reject => {
                anyhow::bail!("syntax error in the grammar definition");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn smoketest() {
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .try_init();

        let input = "\
@terminal A, B, C, D;
@nonterminal E;
@rule E := A B C;
@rule E :=
      @empty
    | B C A
    | E D
    ;
@start E;
";
        let parsed = parse(input).unwrap();
        assert_eq!(parsed.stmts.len(), 5);

        match &parsed.stmts[0] {
            ast::Stmt::TerminalDesc(desc) => assert_eq!(desc.idents, ["A", "B", "C", "D"]),
            stmt => panic!("unexpected statement: {:?}", stmt),
        }
        match &parsed.stmts[1] {
            ast::Stmt::NonterminalDesc(desc) => assert_eq!(desc.idents, ["E"]),
            stmt => panic!("unexpected statement: {:?}", stmt),
        }
        match &parsed.stmts[3] {
            ast::Stmt::RuleDesc(desc) => {
                assert_eq!(desc.left, "E");
                let elems: Vec<_> = desc.productions.iter().map(|p| &p.elems[..]).collect();
                assert_eq!(elems.len(), 3);
                assert!(elems[0].is_empty());
                assert_eq!(elems[1], ["B", "C", "A"]);
                assert_eq!(elems[2], ["E", "D"]);
            }
            stmt => panic!("unexpected statement: {:?}", stmt),
        }
        match &parsed.stmts[4] {
            ast::Stmt::StartDesc(desc) => assert_eq!(desc.name, "E"),
            stmt => panic!("unexpected statement: {:?}", stmt),
        }
    }

    #[test]
    fn empty_input() {
        let parsed = parse("// nothing here\n").unwrap();
        assert!(parsed.stmts.is_empty());
    }

    #[test]
    fn syntax_errors() {
        for input in [
            "@terminal A",
            "@terminal ;",
            "@rule := A;",
            "@rule E := A | ;",
            "@start A, B;",
            "@terminal A;;",
        ] {
            assert!(parse(input).is_err(), "input = {:?}", input);
        }
    }
}
