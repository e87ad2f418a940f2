//! Finite automata over arbitrary symbols, whose states carry sets of labels.
//!
//! The parser tables are assembled as an `NFA` over grammar symbols, then
//! determinized with the subset construction and optionally minimized.

use crate::types::{Map, Set};
use bit_set::BitSet;
use std::{borrow::Borrow, hash::Hash};

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("state {} is out of range (the automaton has {} states)", state, num_states)]
    StateOutOfRange { state: usize, num_states: usize },
}

/// Nondeterministic automaton with (possibly) epsilon transitions.
#[derive(Debug, Clone)]
pub struct NFA<S, L> {
    num_states: usize,
    transitions: Map<S, Vec<(usize, usize)>>,
    epsilons: Vec<(usize, usize)>,
    initial: usize,
    accepts: Map<usize, Set<L>>,
}

impl<S, L> NFA<S, L>
where
    S: Clone + Eq + Hash,
    L: Clone + Eq + Hash,
{
    /// Create an automaton from its state count, the `(from, to)` pairs
    /// labelled by each symbol, the epsilon transitions, the initial state and
    /// the labels of accepting states.
    pub fn new(
        num_states: usize,
        transitions: Map<S, Vec<(usize, usize)>>,
        epsilons: Vec<(usize, usize)>,
        initial: usize,
        accepts: Map<usize, Set<L>>,
    ) -> Result<Self, AutomatonError> {
        let check = |state: usize| {
            if state < num_states {
                Ok(())
            } else {
                Err(AutomatonError::StateOutOfRange { state, num_states })
            }
        };
        check(initial)?;
        for &(from, to) in transitions.values().flatten().chain(&epsilons) {
            check(from)?;
            check(to)?;
        }
        for &state in accepts.keys() {
            check(state)?;
        }

        Ok(Self {
            num_states,
            transitions,
            epsilons,
            initial,
            accepts,
        })
    }

    /// Convert into a deterministic automaton using the subset construction.
    ///
    /// Only the subsets reachable from the initial state are materialized, and
    /// the initial subset becomes the state `0`.
    pub fn dfa(&self) -> DFA<S, L> {
        let mut outgoing = vec![vec![]; self.num_states];
        for (symbol, pairs) in self.transitions.values().enumerate() {
            for &(from, to) in pairs {
                outgoing[from].push((symbol, to));
            }
        }
        let mut epsilons = vec![vec![]; self.num_states];
        for &(from, to) in &self.epsilons {
            epsilons[from].push(to);
        }

        // basic DFS to compute epsilon closure
        let closure = |set: &mut BitSet| {
            let mut stack: Vec<usize> = set.iter().collect();
            while let Some(state) = stack.pop() {
                for &next in &epsilons[state] {
                    if set.insert(next) {
                        stack.push(next);
                    }
                }
            }
        };

        let mut initial = BitSet::with_capacity(self.num_states);
        initial.insert(self.initial);
        closure(&mut initial);

        // configuration -> id
        let mut subsets = Set::<Vec<usize>>::default();
        subsets.insert(initial.iter().collect());

        let mut states = vec![];
        let mut current = 0;
        while let Some(subset) = subsets.get_index(current).cloned() {
            let mut labels = Set::default();
            let mut next_subsets = Map::<usize, BitSet>::default();
            for &member in &subset {
                if let Some(accepts) = self.accepts.get(&member) {
                    labels.extend(accepts.iter().cloned());
                }
                for &(symbol, to) in &outgoing[member] {
                    next_subsets.entry(symbol).or_default().insert(to);
                }
            }

            let mut transitions = Map::default();
            for (symbol, mut next) in next_subsets {
                closure(&mut next);
                let (id, _) = subsets.insert_full(next.iter().collect());
                if let Some((symbol, _)) = self.transitions.get_index(symbol) {
                    transitions.insert(symbol.clone(), id);
                }
            }

            states.push(DFAState {
                transitions,
                labels,
            });
            current += 1;
        }

        DFA { states, initial: 0 }
    }
}

#[derive(Debug, Clone)]
struct DFAState<S, L> {
    transitions: Map<S, usize>,
    labels: Set<L>,
}

/// Deterministic automaton. A missing transition means that the input is rejected.
#[derive(Debug, Clone)]
pub struct DFA<S, L> {
    states: Vec<DFAState<S, L>>,
    initial: usize,
}

impl<S, L> DFA<S, L>
where
    S: Clone + Eq + Hash,
    L: Clone + Eq + Hash,
{
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Return the labels attached to the specified state.
    ///
    /// # Panics
    /// Panics if `state` is out of range.
    pub fn labels(&self, state: usize) -> &Set<L> {
        &self.states[state].labels
    }

    pub fn step(&self, state: usize, symbol: &S) -> Option<usize> {
        self.states.get(state)?.transitions.get(symbol).copied()
    }

    pub fn transitions(&self, state: usize) -> impl Iterator<Item = (&S, usize)> + '_ {
        self.states
            .get(state)
            .into_iter()
            .flat_map(|state| state.transitions.iter().map(|(symbol, to)| (symbol, *to)))
    }

    /// Run the automaton from the initial state, yielding the labels of each
    /// state reached. The iteration stops at the first symbol without transition.
    pub fn run<I>(&self, input: I) -> Run<'_, S, L, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Borrow<S>,
    {
        Run {
            dfa: self,
            current: Some(self.initial),
            input: input.into_iter(),
        }
    }

    /// Run the whole input and return the labels of the last state, or `None`
    /// if the input leaves the automaton.
    pub fn run_to_end<I>(&self, input: I) -> Option<&Set<L>>
    where
        I: IntoIterator,
        I::Item: Borrow<S>,
    {
        let mut current = self.initial;
        for symbol in input {
            current = self.step(current, symbol.borrow())?;
        }
        Some(self.labels(current))
    }

    /// Merge the states that cannot be distinguished by any input, that is,
    /// states with identical labels whose transitions lead to equivalent states.
    pub fn minimized(&self) -> DFA<S, L> {
        let alphabet: Set<&S> = self
            .states
            .iter()
            .flat_map(|state| state.transitions.keys())
            .collect();

        // The initial partition separates the states by their labels.
        let mut classes: Vec<&Set<L>> = vec![];
        let mut block_of: Vec<usize> = Vec::with_capacity(self.states.len());
        for state in &self.states {
            let block = match classes.iter().position(|labels| **labels == state.labels) {
                Some(block) => block,
                None => {
                    classes.push(&state.labels);
                    classes.len() - 1
                }
            };
            block_of.push(block);
        }
        let mut num_blocks = classes.len();

        // Refine until no block is split anymore.
        loop {
            let mut signatures = Map::<(usize, Vec<(usize, usize)>), usize>::default();
            let mut next_block_of = Vec::with_capacity(self.states.len());
            for (id, state) in self.states.iter().enumerate() {
                let mut edges: Vec<(usize, usize)> = state
                    .transitions
                    .iter()
                    .filter_map(|(symbol, to)| Some((alphabet.get_index_of(symbol)?, block_of[*to])))
                    .collect();
                edges.sort_unstable();
                let next_block = signatures.len();
                let block = *signatures.entry((block_of[id], edges)).or_insert(next_block);
                next_block_of.push(block);
            }

            block_of = next_block_of;
            if signatures.len() == num_blocks {
                break;
            }
            num_blocks = signatures.len();
        }

        let mut states: Vec<Option<DFAState<S, L>>> = vec![None; num_blocks];
        for (id, state) in self.states.iter().enumerate() {
            let slot = &mut states[block_of[id]];
            if slot.is_some() {
                continue;
            }
            slot.replace(DFAState {
                transitions: state
                    .transitions
                    .iter()
                    .map(|(symbol, to)| (symbol.clone(), block_of[*to]))
                    .collect(),
                labels: state.labels.clone(),
            });
        }

        DFA {
            // every block has at least one member.
            states: states.into_iter().flatten().collect(),
            initial: block_of[self.initial],
        }
    }
}

/// The iterator returned by [`DFA::run`].
#[derive(Debug)]
pub struct Run<'a, S, L, I> {
    dfa: &'a DFA<S, L>,
    current: Option<usize>,
    input: I,
}

impl<'a, S, L, I> Iterator for Run<'a, S, L, I>
where
    S: Clone + Eq + Hash,
    L: Clone + Eq + Hash,
    I: Iterator,
    I::Item: Borrow<S>,
{
    type Item = &'a Set<L>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        let symbol = self.input.next()?;
        self.current = self.dfa.step(current, symbol.borrow());
        self.current.map(|next| self.dfa.labels(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(labels: &[&'static str]) -> Set<&'static str> {
        labels.iter().copied().collect()
    }

    // (a|b)*abb, with the accepting state labelled "abb".
    fn abb() -> NFA<char, &'static str> {
        let mut transitions = Map::default();
        transitions.insert('a', vec![(0, 0), (0, 1)]);
        transitions.insert('b', vec![(0, 0), (1, 2), (2, 3)]);
        let mut accepts = Map::default();
        accepts.insert(3, labels(&["abb"]));
        NFA::new(4, transitions, vec![], 0, accepts).unwrap()
    }

    #[test]
    fn subset_construction() {
        let dfa = abb().dfa();
        assert_eq!(dfa.initial(), 0);
        assert_eq!(dfa.run_to_end("abb".chars()), Some(&labels(&["abb"])));
        assert_eq!(dfa.run_to_end("babb".chars()), Some(&labels(&["abb"])));
        assert_eq!(dfa.run_to_end("abba".chars()), Some(&labels(&[])));
        assert_eq!(dfa.run_to_end("abc".chars()), None);
        assert_eq!(dfa.run_to_end("".chars()), Some(&labels(&[])));
    }

    #[test]
    fn epsilon_transitions() {
        // 0 -ε-> 1 -x-> 2 ; 0 -x-> 3 -ε-> 4
        let mut transitions = Map::default();
        transitions.insert('x', vec![(1, 2), (0, 3)]);
        let mut accepts = Map::default();
        accepts.insert(2, labels(&["two"]));
        accepts.insert(4, labels(&["four"]));
        let nfa = NFA::new(5, transitions, vec![(0, 1), (3, 4)], 0, accepts).unwrap();

        let dfa = nfa.dfa();
        assert_eq!(dfa.num_states(), 2);
        assert_eq!(dfa.run_to_end(['x']), Some(&labels(&["two", "four"])));
    }

    #[test]
    fn minimization_merges_equivalent_states() {
        // 0 -a-> 1 -c-> 3
        // 0 -b-> 2 -c-> 4
        // where 3 and 4 carry the same label.
        let mut transitions = Map::default();
        transitions.insert('a', vec![(0, 1)]);
        transitions.insert('b', vec![(0, 2)]);
        transitions.insert('c', vec![(1, 3), (2, 4)]);
        let mut accepts = Map::default();
        accepts.insert(3, labels(&["end"]));
        accepts.insert(4, labels(&["end"]));
        let nfa = NFA::new(5, transitions, vec![], 0, accepts).unwrap();

        let dfa = nfa.dfa();
        assert_eq!(dfa.num_states(), 5);

        let minimized = dfa.minimized();
        assert_eq!(minimized.num_states(), 3);
        for input in ["ac", "bc"] {
            assert_eq!(
                minimized.run_to_end(input.chars()),
                dfa.run_to_end(input.chars())
            );
        }
        assert_eq!(minimized.run_to_end("cc".chars()), None);
    }

    #[test]
    fn minimization_keeps_distinct_labels() {
        let dfa = abb().dfa();
        let minimized = dfa.minimized();
        // the classic (a|b)*abb automaton is already minimal.
        assert_eq!(minimized.num_states(), 4);
        for input in ["", "a", "ab", "abb", "aabb", "abab", "bbbabb"] {
            assert_eq!(
                minimized.run_to_end(input.chars()),
                dfa.run_to_end(input.chars()),
                "input = {:?}",
                input
            );
        }
    }

    #[test]
    fn run_stops_at_missing_transition() {
        let dfa = abb().dfa();
        let visited: Vec<_> = dfa.run("abxb".chars()).collect();
        assert_eq!(visited.len(), 2);
        assert!(visited.iter().all(|l| l.is_empty()));

        let visited: Vec<_> = dfa.run("abb".chars()).collect();
        assert_eq!(visited.last(), Some(&&labels(&["abb"])));
    }

    #[test]
    fn out_of_range_states() {
        let mut transitions = Map::default();
        transitions.insert('a', vec![(0, 2)]);
        let err = NFA::<char, ()>::new(2, transitions, vec![], 0, Map::default()).unwrap_err();
        assert!(matches!(
            err,
            AutomatonError::StateOutOfRange {
                state: 2,
                num_states: 2
            }
        ));

        let err = NFA::<char, ()>::new(1, Map::default(), vec![], 1, Map::default()).unwrap_err();
        assert!(matches!(err, AutomatonError::StateOutOfRange { state: 1, .. }));
    }
}
