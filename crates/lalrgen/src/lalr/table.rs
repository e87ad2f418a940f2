//! Assembly of the parser tables from the LR(0) automaton and its look-ahead sets.

use super::{
    lookahead::{lalr, LALRData},
    lr0::{LR0Automaton, LR0State, StateID},
    BuildError,
};
use crate::{
    automaton::{DFA, NFA},
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Set},
    util::display_fn,
};
use std::{borrow::Borrow, fmt};

/// A state of the parser tables.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateIndex(usize);
impl fmt::Debug for StateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T#{:03}", self.0)
    }
}
impl StateIndex {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One of the actions the parser may perform in a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read the lookahead token and move to the goto state on it.
    Shift,

    /// Reduce the top of the stack by the specified production rule.
    Reduce(ReduceAction),

    /// Finish the parse successfully at the end of input.
    Accept,

    /// Reject the input.
    Error,
}

static ERROR: Action = Action::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReduceAction {
    pub rule: RuleID,
    pub nonterminal: NonterminalID,
    /// The length of the right-hand side.
    pub len: usize,
    pub lookahead: TerminalSet,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Action::Shift => f.write_str("shift"),
            Action::Reduce(reduce) => write!(
                f,
                "reduce({}) on {}",
                g.rule(reduce.rule).display(g),
                reduce.lookahead.display(g)
            ),
            Action::Accept => f.write_str("accept"),
            Action::Error => f.write_str("error"),
        })
    }
}

/// Pick the action to perform from the actions of a state.
///
/// `lookahead` is `None` at the end of input. Conflicts are resolved as follows:
///
/// * with a lookahead token, the reduction with the lowest `RuleID` whose
///   look-ahead set contains the token, otherwise a shift;
/// * at the end of input, an accept, otherwise the reduction with the lowest
///   `RuleID` whose look-ahead set contains `EOI`, otherwise the reduction with
///   the lowest `RuleID`, otherwise a shift.
///
/// `Action::Error` is returned when no action applies.
pub fn resolve(actions: &Set<Action>, lookahead: Option<TerminalID>) -> &Action {
    if actions.len() <= 1 {
        return actions.get_index(0).unwrap_or(&ERROR);
    }

    let shift = actions.iter().find(|action| matches!(action, Action::Shift));
    let chosen = match lookahead {
        Some(t) => lowest_reduce(actions, |r| r.lookahead.contains(t)).or(shift),
        None => actions
            .iter()
            .find(|action| matches!(action, Action::Accept))
            .or_else(|| lowest_reduce(actions, |r| r.lookahead.contains(TerminalID::EOI)))
            .or_else(|| lowest_reduce(actions, |_| true))
            .or(shift),
    };
    chosen.unwrap_or(&ERROR)
}

fn lowest_reduce<F>(actions: &Set<Action>, f: F) -> Option<&Action>
where
    F: Fn(&ReduceAction) -> bool,
{
    actions
        .iter()
        .filter_map(|action| match action {
            Action::Reduce(reduce) if f(reduce) => Some((reduce.rule, action)),
            _ => None,
        })
        .min_by_key(|(rule, _)| *rule)
        .map(|(_, action)| action)
}

/// The lookup structure used by the parser: a deterministic automaton over
/// grammar symbols whose states are labelled by their action sets.
#[derive(Debug, Clone)]
pub struct ParserTables {
    automaton: DFA<SymbolID, Action>,
}

impl ParserTables {
    pub fn initial_state(&self) -> StateIndex {
        StateIndex(self.automaton.initial())
    }

    pub fn num_states(&self) -> usize {
        self.automaton.num_states()
    }

    /// Return the actions of the specified state.
    ///
    /// # Panics
    /// Panics if the state does not belong to these tables.
    pub fn actions(&self, state: StateIndex) -> &Set<Action> {
        self.automaton.labels(state.0)
    }

    pub fn goto(&self, state: StateIndex, symbol: SymbolID) -> Option<StateIndex> {
        self.automaton.step(state.0, &symbol).map(StateIndex)
    }

    /// Run the whole symbol stack from the initial state and return the actions
    /// of the reached state, or `None` if the stack is not viable.
    pub fn actions_for<I>(&self, symbols: I) -> Option<&Set<Action>>
    where
        I: IntoIterator,
        I::Item: Borrow<SymbolID>,
    {
        self.automaton.run_to_end(symbols)
    }

    /// Enumerate the states where the look-ahead token does not determine a
    /// single action.
    pub fn conflicting_states(&self) -> impl Iterator<Item = StateIndex> + '_ {
        (0..self.num_states())
            .filter(|&state| self.has_conflicts(state))
            .map(StateIndex)
    }

    fn has_conflicts(&self, state: usize) -> bool {
        let mut reducible = TerminalSet::default();
        let mut accept = false;
        for action in self.automaton.labels(state) {
            match action {
                Action::Reduce(reduce) => {
                    for t in reduce.lookahead.iter() {
                        if !reducible.insert(t) {
                            return true;
                        }
                    }
                }
                Action::Accept => accept = true,
                Action::Shift | Action::Error => (),
            }
        }
        if accept && reducible.contains(TerminalID::EOI) {
            return true;
        }
        self.automaton
            .transitions(state)
            .any(|(symbol, _)| matches!(symbol, SymbolID::T(t) if reducible.contains(*t)))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for state in 0..self.num_states() {
                if state > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", StateIndex(state))?;
                writeln!(f, "## actions")?;
                for action in self.automaton.labels(state) {
                    writeln!(f, "- {}", action.display(g))?;
                }
                writeln!(f, "## gotos")?;
                for (symbol, to) in self.automaton.transitions(state) {
                    writeln!(
                        f,
                        "- {} => goto({:?})",
                        g.symbol_display(*symbol),
                        StateIndex(to)
                    )?;
                }
            }
            Ok(())
        })
    }
}

/// Configuration of the table construction.
#[derive(Debug, Clone)]
pub struct Config {
    minimize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { minimize: true }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to merge the equivalent states of the resulting automaton.
    pub fn minimize(mut self, enabled: bool) -> Self {
        self.minimize = enabled;
        self
    }

    /// Construct the parser tables of the specified grammar.
    ///
    /// The grammar is augmented with `$start := S` unless it already is.
    #[tracing::instrument(skip_all)]
    pub fn build(&self, g: &Grammar) -> Result<ParserTables, BuildError> {
        let augmented;
        let g = if g.is_augmented() {
            g
        } else {
            augmented = g.augmented();
            &augmented
        };

        let lr0 = LR0Automaton::build(g);
        tracing::debug!("LR(0) automaton: {} states", lr0.states.len());

        let lalr = lalr(g, &lr0)?;
        tracing::debug!("{} goto transitions", lalr.follows.len());

        let mut transitions = Map::<SymbolID, Vec<(usize, usize)>>::default();
        let mut accepts = Map::default();
        for (&id, state) in &lr0.states {
            for (symbol, to) in &state.transitions {
                transitions
                    .entry(*symbol)
                    .or_default()
                    .push((id.index(), to.index()));
            }
            accepts.insert(id.index(), actions(g, &lalr, id, state)?);
        }

        let nfa = NFA::new(
            lr0.states.len(),
            transitions,
            vec![],
            StateID::INITIAL.index(),
            accepts,
        )?;
        let mut automaton = nfa.dfa();
        if self.minimize {
            automaton = automaton.minimized();
            tracing::debug!("minimized: {} states", automaton.num_states());
        }

        let tables = ParserTables { automaton };
        tracing::debug!(
            "{} states with conflicting actions",
            tables.conflicting_states().count()
        );

        Ok(tables)
    }
}

fn actions(
    g: &Grammar,
    lalr: &LALRData,
    id: StateID,
    state: &LR0State,
) -> Result<Set<Action>, BuildError> {
    let mut actions = Set::default();

    for &item in &state.reductions {
        if item.nonterminal == NonterminalID::START {
            actions.insert(Action::Accept);
            continue;
        }
        let rule = item.rule(g).ok_or(BuildError::UnknownItem { item })?;
        let lookahead = lalr
            .lookahead(id, rule.id())
            .cloned()
            .ok_or(BuildError::MissingReduction { state: id, item })?;
        actions.insert(Action::Reduce(ReduceAction {
            rule: rule.id(),
            nonterminal: rule.left(),
            len: rule.right().len(),
            lookahead,
        }));
    }

    if state.items.iter().any(|item| !item.is_reduction(g)) {
        actions.insert(Action::Shift);
    }

    Ok(actions)
}
