//! LALR(1) look-ahead sets computation.

use super::{
    digraph::digraph,
    lr0::{Item, LR0Automaton, StateID},
    BuildError,
};
use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Set},
};
use std::fmt;

/// A goto transition `(p, A)` on a nonterminal symbol.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition {
    pub from: StateID,
    pub symbol: NonterminalID,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.from, self.symbol)
    }
}

/// A reduction `(q, A -> ω)` in an LR(0) state.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reduce {
    pub state: StateID,
    pub rule: RuleID,
}

impl fmt::Debug for Reduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.state, self.rule)
    }
}

#[derive(Debug)]
pub struct LALRData {
    pub direct_reads: Map<Transition, TerminalSet>,
    pub reads: Map<Transition, Set<Transition>>,
    pub read_sets: Map<Transition, TerminalSet>,
    pub includes: Map<Transition, Set<Transition>>,
    pub follows: Map<Transition, TerminalSet>,
    pub lookbacks: Map<Reduce, Set<Transition>>,
    pub lookaheads: Map<Reduce, TerminalSet>,
}

impl LALRData {
    /// Return the transitions `(p, A)` such that spelling `ω` from `p` reaches `q`,
    /// for the reduction item `[A -> ω .]` in the state `q`.
    pub fn lookback(
        &self,
        g: &Grammar,
        lr0: &LR0Automaton,
        state: StateID,
        item: Item,
    ) -> Result<&Set<Transition>, BuildError> {
        let rule = item.rule(g).ok_or(BuildError::UnknownItem { item })?;
        let contains = lr0
            .states
            .get(&state)
            .map_or(false, |s| s.items.contains(&item));
        if !item.is_reduction(g) || !contains {
            return Err(BuildError::MissingReduction { state, item });
        }
        self.lookbacks
            .get(&Reduce {
                state,
                rule: rule.id(),
            })
            .ok_or(BuildError::MissingReduction { state, item })
    }

    /// Return the look-ahead set of the reduction by `rule` in `state`.
    pub fn lookahead(&self, state: StateID, rule: RuleID) -> Option<&TerminalSet> {
        self.lookaheads.get(&Reduce { state, rule })
    }
}

/// Compute the look-ahead sets corresponding to the reductions in the provided LR(0) automaton.
///
/// The grammar must be augmented.
pub fn lalr(g: &Grammar, lr0: &LR0Automaton) -> Result<LALRData, BuildError> {
    let transitions: Vec<Transition> = lr0
        .all_transitions()
        .map(|(from, symbol)| Transition { from, symbol })
        .collect();

    // Step 0: calculate the direct-read sets and the auxiliary relations.
    //
    // - DirectRead(p,A) := { t \in T | p --(A)--> r --(t)--> }
    // - (p,A) `reads` (r,C) <==> p --(A)--> r --(C)--> && C =>* ε
    // - (p,A) `includes` (p',B) <==> B -> βAγ, γ =>* ε, p' -(β)-> p
    // - (q, A->ω) `lookback` (p,A) <==> p --(ω)--> q
    let direct_reads = calc_direct_reads(g, lr0, &transitions)?;
    let reads = calc_reads(g, lr0, &transitions)?;
    let includes = calc_includes(g, lr0, &transitions)?;
    let lookbacks = calc_lookbacks(g, lr0, &transitions)?;

    // Step 1: calculate Read(p,A)
    //   Read(p,A) = DirectRead(p,A) \cup \bigcup { Read(r,C) | (p,A) `reads` (r,C) }
    let mut read_sets = direct_reads.clone();
    digraph(&mut read_sets, &reads);

    // Step 2: calculate Follow(p,A)
    //   Follow(p,A) = Read(p,A) \cup \bigcup { Follow(p',B) | (p,A) `includes` (p',B) }
    let mut follows = read_sets.clone();
    digraph(&mut follows, &includes);

    let mut data = LALRData {
        direct_reads,
        reads,
        read_sets,
        includes,
        follows,
        lookbacks,
        lookaheads: Map::default(),
    };

    // Step 3: calculate LA(q,A->ω) from Follow(p,A) and `lookback` relations.
    //   LA(q,A->ω) = \bigcup { Follow(p,A) | (q,A->ω) `lookback` (p,A) }
    let mut lookaheads = Map::<Reduce, TerminalSet>::default();
    for (&state, lr0_state) in &lr0.states {
        for &item in &lr0_state.reductions {
            // `$start -> S .` is the accepting item and has no look-ahead.
            if item.nonterminal == NonterminalID::START {
                continue;
            }
            let rule = item.rule(g).ok_or(BuildError::UnknownItem { item })?;
            let mut lookahead = TerminalSet::default();
            for transition in data.lookback(g, lr0, state, item)? {
                if let Some(follow) = data.follows.get(transition) {
                    lookahead.union_with(follow);
                }
            }
            lookaheads.insert(
                Reduce {
                    state,
                    rule: rule.id(),
                },
                lookahead,
            );
        }
    }
    data.lookaheads = lookaheads;

    Ok(data)
}

fn target(lr0: &LR0Automaton, from: StateID, symbol: SymbolID) -> Result<StateID, BuildError> {
    lr0.goto(from, symbol)
        .ok_or(BuildError::MissingTransition { from, symbol })
}

fn calc_direct_reads(
    g: &Grammar,
    lr0: &LR0Automaton,
    transitions: &[Transition],
) -> Result<Map<Transition, TerminalSet>, BuildError> {
    let mut direct_reads = Map::default();

    for t in transitions {
        let r = target(lr0, t.from, SymbolID::N(t.symbol))?;
        let mut direct_read: TerminalSet = lr0.states[&r]
            .transitions
            .keys()
            .filter_map(|symbol| match symbol {
                SymbolID::T(t) => Some(*t),
                SymbolID::N(..) => None,
            })
            .collect();
        // The end of input follows the start symbol read from the initial state.
        if t.from == StateID::INITIAL && t.symbol == g.start_symbol() {
            direct_read.insert(TerminalID::EOI);
        }
        direct_reads.insert(*t, direct_read);
    }

    Ok(direct_reads)
}

fn calc_reads(
    g: &Grammar,
    lr0: &LR0Automaton,
    transitions: &[Transition],
) -> Result<Map<Transition, Set<Transition>>, BuildError> {
    let mut reads = Map::<Transition, Set<Transition>>::default();

    for t in transitions {
        let r = target(lr0, t.from, SymbolID::N(t.symbol))?;
        reads.entry(*t).or_default().extend(
            lr0.states[&r]
                .transitions
                .keys()
                .filter_map(|symbol| match symbol {
                    SymbolID::N(c) if g.is_nullable(*c) => Some(Transition {
                        from: r,
                        symbol: *c,
                    }),
                    _ => None,
                }),
        );
    }

    Ok(reads)
}

fn calc_includes(
    g: &Grammar,
    lr0: &LR0Automaton,
    transitions: &[Transition],
) -> Result<Map<Transition, Set<Transition>>, BuildError> {
    let mut includes: Map<Transition, Set<Transition>> =
        transitions.iter().map(|t| (*t, Set::default())).collect();

    for b_key in transitions {
        for rule in g.productions(b_key.symbol) {
            let right = rule.right();

            // nullable_suffix[i] <==> right[i..] =>* ε
            let mut nullable_suffix = vec![true; right.len() + 1];
            for (i, symbol) in right.iter().enumerate().rev() {
                nullable_suffix[i] = nullable_suffix[i + 1]
                    && matches!(symbol, SymbolID::N(n) if g.is_nullable(*n));
            }

            // B -> β A γ, p' -(β)-> p
            let mut current = b_key.from;
            for (i, symbol) in right.iter().enumerate() {
                if let SymbolID::N(a) = symbol {
                    if nullable_suffix[i + 1] {
                        includes
                            .entry(Transition {
                                from: current,
                                symbol: *a,
                            })
                            .or_default()
                            .insert(*b_key);
                    }
                }
                current = target(lr0, current, *symbol)?;
            }
        }
    }

    Ok(includes)
}

fn calc_lookbacks(
    g: &Grammar,
    lr0: &LR0Automaton,
    transitions: &[Transition],
) -> Result<Map<Reduce, Set<Transition>>, BuildError> {
    let mut lookbacks = Map::<Reduce, Set<Transition>>::default();

    for (&state, lr0_state) in &lr0.states {
        for item in &lr0_state.reductions {
            let rule = item.rule(g).ok_or(BuildError::UnknownItem { item: *item })?;
            lookbacks.insert(
                Reduce {
                    state,
                    rule: rule.id(),
                },
                Set::default(),
            );
        }
    }

    for t in transitions {
        for rule in g.productions(t.symbol) {
            // p --(ω)--> q
            let mut current = t.from;
            for symbol in rule.right() {
                current = target(lr0, current, *symbol)?;
            }
            lookbacks
                .entry(Reduce {
                    state: current,
                    rule: rule.id(),
                })
                .or_default()
                .insert(*t);
        }
    }

    Ok(lookbacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn terminals(ts: &[TerminalID]) -> TerminalSet {
        ts.iter().copied().collect()
    }

    #[test]
    fn nullable_sequence() {
        // S := A A ;  A := @empty
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.rule(s, [N(a), N(a)])?;
            let empty = g.rule(a, [])?;
            ids = Some((s, a, empty));
            Ok(())
        })
        .unwrap()
        .augmented();
        let (s, a, empty) = ids.unwrap();

        let lr0 = LR0Automaton::build(&grammar);
        let data = lalr(&grammar, &lr0).unwrap();

        let s0 = StateID::INITIAL;
        let s2 = lr0.goto(s0, N(a)).unwrap();
        let t_s = Transition { from: s0, symbol: s };
        let t_a0 = Transition { from: s0, symbol: a };
        let t_a2 = Transition { from: s2, symbol: a };

        assert_eq!(data.direct_reads[&t_s], terminals(&[TerminalID::EOI]));
        assert!(data.direct_reads[&t_a0].is_empty());
        assert!(data.reads[&t_a0].contains(&t_a2));
        assert!(data.includes[&t_a0].contains(&t_s));
        assert!(data.includes[&t_a2].contains(&t_s));
        assert_eq!(data.follows[&t_a0], terminals(&[TerminalID::EOI]));
        assert_eq!(data.follows[&t_a2], terminals(&[TerminalID::EOI]));

        assert_eq!(
            data.lookahead(s0, empty),
            Some(&terminals(&[TerminalID::EOI]))
        );
        assert_eq!(
            data.lookahead(s2, empty),
            Some(&terminals(&[TerminalID::EOI]))
        );
    }

    #[test]
    fn nullable_alternatives() {
        // S := A x ;  A := @empty | B ;  B := @empty
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.rule(s, [N(a), T(x)])?;
            let a_empty = g.rule(a, [])?;
            let a_b = g.rule(a, [N(b)])?;
            let b_empty = g.rule(b, [])?;
            ids = Some((x, a, b, a_empty, a_b, b_empty));
            Ok(())
        })
        .unwrap()
        .augmented();
        let (x, a, b, a_empty, a_b, b_empty) = ids.unwrap();

        let lr0 = LR0Automaton::build(&grammar);
        let data = lalr(&grammar, &lr0).unwrap();

        let s0 = StateID::INITIAL;
        let t_a = Transition { from: s0, symbol: a };
        let t_b = Transition { from: s0, symbol: b };
        // Follow(0,B) flows from Follow(0,A) through `includes`.
        assert!(data.read_sets[&t_b].is_empty());
        assert!(data.includes[&t_b].contains(&t_a));
        assert_eq!(data.follows[&t_b], terminals(&[x]));

        assert_eq!(data.lookahead(s0, a_empty), Some(&terminals(&[x])));
        assert_eq!(data.lookahead(s0, b_empty), Some(&terminals(&[x])));
        let s_b = lr0.goto(s0, N(b)).unwrap();
        assert_eq!(data.lookahead(s_b, a_b), Some(&terminals(&[x])));
    }

    #[test]
    fn reads_through_nullable() {
        // S := A B x ;  A := a ;  B := @empty | y
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let tok_a = g.terminal("a")?;
            let x = g.terminal("x")?;
            let y = g.terminal("y")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.rule(s, [N(a), N(b), T(x)])?;
            let a_a = g.rule(a, [T(tok_a)])?;
            g.rule(b, [])?;
            g.rule(b, [T(y)])?;
            ids = Some((tok_a, x, y, a, b, a_a));
            Ok(())
        })
        .unwrap()
        .augmented();
        let (tok_a, x, y, a, b, a_a) = ids.unwrap();

        let lr0 = LR0Automaton::build(&grammar);
        let data = lalr(&grammar, &lr0).unwrap();

        let s0 = StateID::INITIAL;
        let s_a = lr0.goto(s0, N(a)).unwrap();
        let t_a = Transition { from: s0, symbol: a };
        let t_b = Transition { from: s_a, symbol: b };
        assert_eq!(data.direct_reads[&t_a], terminals(&[y]));
        assert!(data.reads[&t_a].contains(&t_b));
        assert_eq!(data.read_sets[&t_a], terminals(&[x, y]));

        let s_shift_a = lr0.goto(s0, T(tok_a)).unwrap();
        assert_eq!(data.lookahead(s_shift_a, a_a), Some(&terminals(&[x, y])));
    }

    #[test]
    fn lookback_precondition() {
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(x)])?;
            ids = Some((x, s));
            Ok(())
        })
        .unwrap()
        .augmented();
        let (x, s) = ids.unwrap();

        let lr0 = LR0Automaton::build(&grammar);
        let data = lalr(&grammar, &lr0).unwrap();

        let reduced = Item {
            nonterminal: s,
            alternative: 0,
            dot: 1,
        };
        let q = lr0.goto(StateID::INITIAL, T(x)).unwrap();
        let lookback = data.lookback(&grammar, &lr0, q, reduced).unwrap();
        assert_eq!(lookback.len(), 1);
        assert!(lookback.contains(&Transition {
            from: StateID::INITIAL,
            symbol: s
        }));

        // not in the state
        assert!(matches!(
            data.lookback(&grammar, &lr0, StateID::INITIAL, reduced),
            Err(BuildError::MissingReduction { .. })
        ));
        // not a reduction item
        let unreduced = Item { dot: 0, ..reduced };
        assert!(matches!(
            data.lookback(&grammar, &lr0, StateID::INITIAL, unreduced),
            Err(BuildError::MissingReduction { .. })
        ));
        // unknown production
        let unknown = Item {
            alternative: 3,
            ..reduced
        };
        assert!(matches!(
            data.lookback(&grammar, &lr0, q, unknown),
            Err(BuildError::UnknownItem { .. })
        ));
    }
}
