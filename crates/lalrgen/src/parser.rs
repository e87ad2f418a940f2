//! Table-driven shift/reduce parser.

use crate::{
    grammar::{NonterminalID, RuleID, SymbolID, TerminalID},
    lalr::{
        table::{resolve, StateIndex},
        Action, ParserTables,
    },
};
use std::cmp;

/// A trait for abstracting token symbols.
pub trait Token {
    fn terminal(&self) -> TerminalID;
}

impl Token for TerminalID {
    fn terminal(&self) -> TerminalID {
        *self
    }
}

impl<T> Token for (TerminalID, T) {
    fn terminal(&self) -> TerminalID {
        self.0
    }
}

/// An entry of the item stack: a shifted token or a reduced nonterminal.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseItem<TTok> {
    T(TTok),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// The items in `args` have been reduced by the specified rule.
    Reduce(RuleID),

    /// The whole input has been accepted.
    Accept,

    /// The input cannot be parsed any further.
    Reject,
}

#[derive(Debug)]
enum ParserState {
    Reading,
    Accepted,
    Rejected,
}

/// The parser driven by the tables built from a grammar.
///
/// An instance serves a single parse.
#[derive(Debug)]
pub struct Parser<'t, TTok> {
    tables: &'t ParserTables,
    state_stack: Vec<StateIndex>,
    item_stack: Vec<ParseItem<TTok>>,
    parser_state: ParserState,
    peeked_token: Option<Option<TTok>>,
    reductions: ReductionGuard,
}

impl<'t, TTok> Parser<'t, TTok>
where
    TTok: Token,
{
    /// Create an instance of `Parser` using the specified tables.
    pub fn new(tables: &'t ParserTables) -> Self {
        Self {
            tables,
            state_stack: vec![tables.initial_state()],
            item_stack: vec![],
            parser_state: ParserState::Reading,
            peeked_token: None,
            reductions: ReductionGuard::new(1),
        }
    }

    /// Consume some tokens and drive the state machine
    /// until it matches a certain production rule.
    ///
    /// On `Reduce`, `args` holds the reduced items in order. On `Accept`, it
    /// holds the remaining items, that is, the item of the start symbol.
    /// Once the parse has finished, the last event is returned again.
    pub fn next_event<I>(
        &mut self,
        tokens: &mut I,
        args: &mut Vec<ParseItem<TTok>>,
    ) -> ParseEvent
    where
        I: Iterator<Item = TTok>,
    {
        match self.parser_state {
            ParserState::Reading => (),
            ParserState::Accepted => return ParseEvent::Accept,
            ParserState::Rejected => return ParseEvent::Reject,
        }

        let tables = self.tables;
        loop {
            let Some(&current) = self.state_stack.last() else {
                return self.reject();
            };

            let lookahead = self
                .peeked_token
                .get_or_insert_with(|| tokens.next())
                .as_ref()
                .map(|t| t.terminal());

            let action = resolve(tables.actions(current), lookahead);
            tracing::trace!(
                "state = {:?}, lookahead = {:?}, action = {:?}",
                current,
                lookahead,
                action
            );

            match action {
                Action::Shift => {
                    let Some(next) = lookahead.and_then(|t| tables.goto(current, SymbolID::T(t)))
                    else {
                        return self.reject();
                    };
                    let Some(token) = self.peeked_token.take().flatten() else {
                        return self.reject();
                    };
                    self.item_stack.push(ParseItem::T(token));
                    self.state_stack.push(next);
                    self.reductions.reset(self.state_stack.len());
                }

                Action::Reduce(reduce) => {
                    let n = reduce.len;
                    if self.item_stack.len() < n || self.state_stack.len() <= n {
                        return self.reject();
                    }
                    args.clear();
                    args.extend(self.item_stack.drain(self.item_stack.len() - n..));
                    self.state_stack.truncate(self.state_stack.len() - n);
                    self.reductions.popped(self.state_stack.len());

                    let Some(next) = self
                        .state_stack
                        .last()
                        .and_then(|top| tables.goto(*top, SymbolID::N(reduce.nonterminal)))
                    else {
                        return self.reject();
                    };
                    if self.reductions.pushes_again(&self.state_stack, next) {
                        tracing::trace!("reductions grow the stack without consuming any input");
                        return self.reject();
                    }
                    self.item_stack.push(ParseItem::N(reduce.nonterminal));
                    self.state_stack.push(next);

                    if self.reductions.cycles(&self.state_stack) {
                        tracing::trace!("reductions do not consume any input");
                        return self.reject();
                    }
                    return ParseEvent::Reduce(reduce.rule);
                }

                Action::Accept if lookahead.is_none() => {
                    args.clear();
                    args.append(&mut self.item_stack);
                    self.parser_state = ParserState::Accepted;
                    return ParseEvent::Accept;
                }

                Action::Accept | Action::Error => return self.reject(),
            }
        }
    }

    fn reject(&mut self) -> ParseEvent {
        self.parser_state = ParserState::Rejected;
        ParseEvent::Reject
    }
}

/// Detects the reductions that never end without shifting a token.
///
/// Between two shifts the look-ahead is fixed, so the reductions depend on
/// the state stack alone. They repeat forever once the stack
///
/// * comes back to an earlier stack (Brent's algorithm), or
/// * receives a state that an earlier reduction since the last shift pushed
///   and that is still on the stack.
#[derive(Debug)]
struct ReductionGuard {
    saved: Vec<StateIndex>,
    power: usize,
    steps: usize,
    /// The lowest stack depth since the last shift. The states above it were
    /// all pushed by reductions.
    floor: usize,
}

impl ReductionGuard {
    fn new(depth: usize) -> Self {
        Self {
            saved: vec![],
            power: 1,
            steps: 0,
            floor: depth,
        }
    }

    fn reset(&mut self, depth: usize) {
        self.saved.clear();
        self.power = 1;
        self.steps = 0;
        self.floor = depth;
    }

    fn popped(&mut self, depth: usize) {
        self.floor = cmp::min(self.floor, depth);
    }

    fn pushes_again(&self, stack: &[StateIndex], next: StateIndex) -> bool {
        stack
            .get(self.floor..)
            .map_or(false, |pushed| pushed.contains(&next))
    }

    fn cycles(&mut self, stack: &[StateIndex]) -> bool {
        if self.steps > 0
            && self.saved.len() == stack.len()
            && self.saved.iter().rev().eq(stack.iter().rev())
        {
            return true;
        }
        if self.steps == 0 || self.steps == self.power {
            if self.steps > 0 {
                self.power *= 2;
            }
            self.saved.clear();
            self.saved.extend_from_slice(stack);
            self.steps = 0;
        }
        self.steps += 1;
        false
    }
}

/// Parse the whole token sequence and return whether it is accepted.
pub fn parse<I>(tables: &ParserTables, tokens: I) -> bool
where
    I: IntoIterator,
    I::Item: Token,
{
    let mut tokens = tokens.into_iter();
    let mut parser = Parser::new(tables);
    let mut args = vec![];
    loop {
        match parser.next_event(&mut tokens, &mut args) {
            ParseEvent::Reduce(..) => continue,
            ParseEvent::Accept => return true,
            ParseEvent::Reject => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{Grammar, SymbolID::*},
        lalr,
    };

    #[test]
    fn reduce_events() {
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("PLUS")?;
            let num = g.terminal("NUM")?;
            let e = g.nonterminal("E")?;
            let add = g.rule(e, [N(e), T(plus), T(num)])?;
            let atom = g.rule(e, [T(num)])?;
            ids = Some((plus, num, e, add, atom));
            Ok(())
        })
        .unwrap();
        let (plus, num, e, add, atom) = ids.unwrap();
        let tables = lalr::build(&grammar).unwrap();

        // 1 + 2
        let mut tokens = [(num, 1), (plus, 0), (num, 2)].into_iter();
        let mut parser = Parser::new(&tables);
        let mut args = vec![];

        assert_eq!(parser.next_event(&mut tokens, &mut args), ParseEvent::Reduce(atom));
        assert_eq!(args, [ParseItem::T((num, 1))]);

        assert_eq!(parser.next_event(&mut tokens, &mut args), ParseEvent::Reduce(add));
        assert_eq!(
            args,
            [
                ParseItem::N(e),
                ParseItem::T((plus, 0)),
                ParseItem::T((num, 2))
            ]
        );

        assert_eq!(parser.next_event(&mut tokens, &mut args), ParseEvent::Accept);
        assert_eq!(args, [ParseItem::N(e)]);

        // finished
        assert_eq!(parser.next_event(&mut tokens, &mut args), ParseEvent::Accept);
    }

    #[test]
    fn rejects_trailing_tokens() {
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let id = g.terminal("ID")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(id)])?;
            ids = Some(id);
            Ok(())
        })
        .unwrap();
        let id = ids.unwrap();
        let tables = lalr::build(&grammar).unwrap();

        assert!(parse(&tables, [id]));
        assert!(!parse(&tables, [id, id]));
        assert!(!parse(&tables, Vec::<TerminalID>::new()));
    }

    #[test]
    fn cyclic_grammar_terminates() {
        // S := S A | x | S y ;  A := @empty
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let y = g.terminal("y")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.rule(s, [N(s), N(a)])?;
            g.rule(s, [T(x)])?;
            g.rule(s, [N(s), T(y)])?;
            g.rule(a, [])?;
            ids = Some((x, y));
            Ok(())
        })
        .unwrap();
        let (x, y) = ids.unwrap();
        let tables = lalr::build(&grammar).unwrap();

        assert!(parse(&tables, [x]));
        // `A := @empty` and `S := S A` are reduced over and over on `y`.
        assert!(!parse(&tables, [x, y]));
    }

    #[test]
    fn growing_reductions_terminate() {
        // S := A S | x ;  A := @empty
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.rule(s, [N(a), N(s)])?;
            g.rule(s, [T(x)])?;
            g.rule(a, [])?;
            ids = Some(x);
            Ok(())
        })
        .unwrap();
        let x = ids.unwrap();
        let tables = lalr::build(&grammar).unwrap();

        // `A := @empty` is preferred on `x` in every state reached by `A`.
        let mut tokens = [x].into_iter();
        let mut parser = Parser::new(&tables);
        let mut args = vec![];
        let mut events = vec![];
        for _ in 0..100 {
            let event = parser.next_event(&mut tokens, &mut args);
            events.push(event);
            if !matches!(event, ParseEvent::Reduce(..)) {
                break;
            }
        }
        assert_eq!(events.last(), Some(&ParseEvent::Reject));
        assert!(events.len() < 100);

        assert!(!parse(&tables, [x]));
    }

    #[test]
    fn empty_language_terminates() {
        // N0 := N2 N0 ;  N2 := @empty
        let grammar = Grammar::define(|g| {
            let n0 = g.nonterminal("N0")?;
            let n2 = g.nonterminal("N2")?;
            g.rule(n0, [N(n2), N(n0)])?;
            g.rule(n2, [])?;
            Ok(())
        })
        .unwrap();
        let tables = lalr::build(&grammar).unwrap();

        assert!(!parse(&tables, Vec::<TerminalID>::new()));
    }
}
