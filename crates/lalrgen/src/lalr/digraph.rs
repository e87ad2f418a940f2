use crate::{grammar::TerminalSet, types::Map};
use indexmap::map::Slice;
use std::{cmp, hash::Hash};

pub trait Set {
    fn union_with(&mut self, other: &Self);
}

impl<T> Set for crate::types::Set<T>
where
    T: Clone + Eq + Hash,
{
    fn union_with(&mut self, other: &Self) {
        self.extend(other.iter().cloned())
    }
}

impl<B> Set for bit_set::BitSet<B>
where
    B: bit_vec::BitBlock,
{
    fn union_with(&mut self, other: &Self) {
        self.union_with(other)
    }
}

impl Set for TerminalSet {
    fn union_with(&mut self, other: &Self) {
        self.union_with(other)
    }
}

/// Calculate the smallest `F` satisfying `F(x) = F'(x) ∪ ⋃{ F(y) | x R y }`.
///
/// `result` holds the base values `F'(x)` on input and is updated in place.
/// The relation `R` is given as an adjacency map, and nodes missing from
/// `result` are ignored. The nodes in a strongly connected component end up
/// with the same value.
pub fn digraph<K, T>(result: &mut Map<K, T>, relation: &Map<K, crate::types::Set<K>>)
where
    K: Eq + Hash,
    T: Set,
{
    let len = result.len();
    Digraph {
        result,
        relation,
        n: vec![0usize; len],
        stack: vec![],
    }
    .run()
}

struct Digraph<'a, K, T> {
    result: &'a mut Map<K, T>,
    relation: &'a Map<K, crate::types::Set<K>>,
    n: Vec<usize>,
    stack: Vec<usize>,
}

impl<K, T> Digraph<'_, K, T>
where
    K: Eq + Hash,
    T: Set,
{
    fn run(&mut self) {
        for x in 0..self.n.len() {
            if self.n[x] == 0 {
                self.traverse(x);
            }
        }
    }

    fn traverse(&mut self, x: usize) {
        self.stack.push(x);
        let d = self.stack.len();
        self.n[x] = d;

        let relation = self.relation;
        let related = self
            .result
            .get_index(x)
            .and_then(|(x_key, _)| relation.get(x_key));
        for y_key in related.into_iter().flatten() {
            let Some(y) = self.result.get_index_of(y_key) else {
                continue;
            };

            if self.n[y] == 0 {
                self.traverse(y);
            }
            self.n[x] = cmp::min(self.n[x], self.n[y]);

            if x != y {
                // F(x) <- F(x) \cup F(y)
                let (slot, added) = get_two_mut(self.result.as_mut_slice(), x, y);
                slot.union_with(added);
            }
        }

        if self.n[x] != d {
            return;
        }

        while let Some(s) = self.stack.pop() {
            self.n[s] = usize::MAX;
            if s == x {
                break;
            }
            // F(s) <- F(x)
            let (slot, added) = get_two_mut(self.result.as_mut_slice(), s, x);
            slot.union_with(added);
        }
    }
}

fn get_two_mut<K, V>(slice: &mut Slice<K, V>, x: usize, y: usize) -> (&mut V, &mut V) {
    assert!(
        x != y && cmp::max(x, y) < slice.len(),
        "index condition not satisfied"
    );
    let i = (x + y) / 2 + 1;
    let (a, b) = slice.split_at_mut(i);
    if x < y {
        (&mut a[x], &mut b[y - i])
    } else {
        (&mut b[x - i], &mut a[y])
    }
}
