use crate::{
    grammar::{Grammar, NonterminalID, Rule, SymbolID},
    types::{Map, Set},
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl StateID {
    /// The state that contains the initial item `[$start -> . S]`.
    pub const INITIAL: Self = Self(0);

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The LR(0) item, a.k.a. LR item core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub nonterminal: NonterminalID,
    pub alternative: u16,
    pub dot: u16,
}

impl Item {
    /// `[$start -> . S]`
    pub const START: Self = Self {
        nonterminal: NonterminalID::START,
        alternative: 0,
        dot: 0,
    };

    pub fn rule<'g>(&self, g: &'g Grammar) -> Option<&'g Rule> {
        g.production(self.nonterminal, self.alternative)
    }

    /// Return the symbol right after the dot, or `None` at the end of the production.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        self.rule(g)?.right().get(usize::from(self.dot)).copied()
    }

    pub fn is_reduction(&self, g: &Grammar) -> bool {
        self.rule(g)
            .map_or(false, |rule| usize::from(self.dot) >= rule.right().len())
    }

    /// Move the dot over the next symbol, or return `None` if the dot is
    /// already at the end of the production.
    pub fn advance(self, g: &Grammar) -> Option<Self> {
        self.next_symbol(g)?;
        Some(Self {
            dot: self.dot.checked_add(1)?,
            ..self
        })
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(|f| {
            write!(f, "{} -> [", g.nonterminal(self.nonterminal))?;
            let right = self.rule(g).map_or(&[][..], |rule| rule.right());
            for (i, symbol) in right.iter().enumerate() {
                if i == usize::from(self.dot) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_display(*symbol))?;
            }
            if usize::from(self.dot) >= right.len() {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

/// A set of LR(0) items, kept sorted and deduplicated so that equal sets
/// compare and hash equally regardless of how they were derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ItemSet {
    items: Vec<Item>,
}

impl ItemSet {
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.items.binary_search(item).is_ok()
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        let mut items: Vec<Item> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self { items }
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Add the initial items of every nonterminal that appears right after a dot,
/// until no more items are added.
pub fn closure<I>(g: &Grammar, kernels: I) -> ItemSet
where
    I: IntoIterator<Item = Item>,
{
    let mut items: Set<Item> = kernels.into_iter().collect();
    let mut i = 0;
    while let Some(item) = items.get_index(i).copied() {
        if let Some(SymbolID::N(n)) = item.next_symbol(g) {
            for rule in g.productions(n) {
                items.insert(Item {
                    nonterminal: n,
                    alternative: rule.alternative(),
                    dot: 0,
                });
            }
        }
        i += 1;
    }
    items.into_iter().collect()
}

/// Advance the items whose next symbol is `symbol` and close the result.
///
/// The returned set is empty when no item in `items` expects `symbol`.
pub fn goto(g: &Grammar, items: &ItemSet, symbol: SymbolID) -> ItemSet {
    closure(
        g,
        items
            .iter()
            .filter(|item| item.next_symbol(g) == Some(symbol))
            .filter_map(|item| item.advance(g)),
    )
}

#[derive(Debug, Clone)]
pub struct LR0State {
    pub items: ItemSet,
    pub transitions: Map<SymbolID, StateID>,
    pub reductions: Vec<Item>,
}

impl LR0State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(|f| {
            writeln!(f, "## items:")?;
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.transitions.is_empty() {
                writeln!(f, "## transitions:")?;
                for (symbol, to) in &self.transitions {
                    writeln!(f, "- {} => {:?}", g.symbol_display(*symbol), to)?;
                }
            }
            if !self.reductions.is_empty() {
                writeln!(f, "## reductions:")?;
                for item in &self.reductions {
                    writeln!(f, "- {}", item.display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// The canonical collection of LR(0) item sets and the goto graph between them.
#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
}

impl LR0Automaton {
    /// Calculate the LR(0) automaton of the specified grammar.
    ///
    /// The grammar is expected to be augmented. States are numbered in the
    /// order they are discovered, starting from `StateID::INITIAL`.
    pub fn build(g: &Grammar) -> Self {
        let mut isocores = Set::<ItemSet>::default();
        isocores.insert(closure(g, [Item::START]));

        let mut states = Map::default();
        let mut current = 0;
        while let Some(items) = isocores.get_index(current).cloned() {
            let symbols: Set<SymbolID> = items
                .iter()
                .filter_map(|item| item.next_symbol(g))
                .collect();

            let mut transitions = Map::default();
            for symbol in symbols {
                let next = goto(g, &items, symbol);
                debug_assert!(!next.is_empty());
                let (index, _) = isocores.insert_full(next);
                transitions.insert(symbol, StateID(index as u32));
            }

            let reductions = items
                .iter()
                .filter(|item| item.is_reduction(g))
                .copied()
                .collect();

            states.insert(
                StateID(current as u32),
                LR0State {
                    items,
                    transitions,
                    reductions,
                },
            );
            current += 1;
        }

        LR0Automaton { states }
    }

    pub fn goto(&self, from: StateID, symbol: SymbolID) -> Option<StateID> {
        self.states.get(&from)?.transitions.get(&symbol).copied()
    }

    /// Return the state reached from the initial state by the start symbol.
    pub fn final_state(&self, g: &Grammar) -> Option<StateID> {
        self.goto(StateID::INITIAL, SymbolID::N(g.start_symbol()))
    }

    /// Enumerate the goto transitions `(state, nonterminal)` of this automaton.
    pub fn all_transitions(&self) -> impl Iterator<Item = (StateID, NonterminalID)> + '_ {
        self.states.iter().flat_map(|(id, state)| {
            state.transitions.keys().filter_map(move |symbol| match symbol {
                SymbolID::N(n) => Some((*id, *n)),
                SymbolID::T(..) => None,
            })
        })
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(|f| {
            for (id, state) in &self.states {
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}
