// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A growable dense bit set over index types, used as the large representation
//! of points-to sets.

use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::slice;

type Word = u64;
const WORD_BITS: usize = Word::BITS as usize;

/// Represents some newtyped `usize` wrapper.
///
/// Purpose: avoid mixing indexes for different bitvector domains.
pub trait Idx: Copy + 'static + Eq + PartialEq + Debug + Hash {
    fn new(idx: usize) -> Self;

    fn index(self) -> usize;
}

impl Idx for usize {
    #[inline]
    fn new(idx: usize) -> Self {
        idx
    }
    #[inline]
    fn index(self) -> usize {
        self
    }
}

impl Idx for u32 {
    #[inline]
    fn new(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize);
        idx as u32
    }
    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// A bit set that grows on insertion. Bits beyond the allocated words are
/// implicitly zero, so two sets of different word lengths can be combined.
#[derive(Eq, PartialEq, Hash)]
pub struct BitVec<T> {
    words: Vec<Word>,
    marker: PhantomData<T>,
}

impl<T: Idx> BitVec<T> {
    #[inline]
    pub fn new_empty() -> BitVec<T> {
        BitVec {
            words: Vec::new(),
            marker: PhantomData,
        }
    }

    pub fn from_slice(elems: &[T]) -> BitVec<T> {
        let mut set = Self::new_empty();
        for elem in elems {
            set.insert(*elem);
        }
        set
    }

    #[inline]
    fn ensure(&mut self, bit: usize) {
        let needed = bit / WORD_BITS + 1;
        if self.words.len() < needed {
            self.words.resize(needed, 0);
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    #[inline]
    pub fn contains(&self, elem: T) -> bool {
        let (word, mask) = locate(elem);
        self.words.get(word).map_or(false, |w| w & mask != 0)
    }

    /// Inserts `elem`. Returns whether the set has changed.
    #[inline]
    pub fn insert(&mut self, elem: T) -> bool {
        self.ensure(elem.index());
        let (word, mask) = locate(elem);
        let old = self.words[word];
        self.words[word] = old | mask;
        old & mask == 0
    }

    /// Is `self` a (non-strict) superset of `other`?
    pub fn superset(&self, other: &BitVec<T>) -> bool {
        other.words.iter().enumerate().all(|(i, theirs)| {
            let ours = self.words.get(i).copied().unwrap_or(0);
            ours & theirs == *theirs
        })
    }

    pub fn union(&mut self, other: &BitVec<T>) -> bool {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = 0;
        for (ours, theirs) in self.words.iter_mut().zip(&other.words) {
            let old = *ours;
            *ours |= *theirs;
            changed |= old ^ *ours;
        }
        changed != 0
    }

    pub fn subtract(&mut self, other: &BitVec<T>) -> bool {
        let mut changed = 0;
        for (ours, theirs) in self.words.iter_mut().zip(&other.words) {
            let old = *ours;
            *ours &= !*theirs;
            changed |= old ^ *ours;
        }
        changed != 0
    }

    /// Iterates over the set bits in ascending order.
    #[inline]
    pub fn iter(&self) -> BitIter<'_, T> {
        BitIter {
            current: 0,
            base: 0,
            started: false,
            words: self.words.iter(),
            marker: PhantomData,
        }
    }
}

impl<T> Clone for BitVec<T> {
    fn clone(&self) -> Self {
        BitVec {
            words: self.words.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: Idx> Debug for BitVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

pub struct BitIter<'a, T: Idx> {
    /// The word being scanned, with already yielded bits cleared.
    current: Word,
    /// Bit offset of `current`.
    base: usize,
    started: bool,
    words: slice::Iter<'a, Word>,
    marker: PhantomData<T>,
}

impl<'a, T: Idx> Iterator for BitIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while self.current == 0 {
            self.current = *self.words.next()?;
            if self.started {
                self.base += WORD_BITS;
            }
            self.started = true;
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(T::new(self.base + bit))
    }
}

#[inline]
fn locate<T: Idx>(elem: T) -> (usize, Word) {
    let bit = elem.index();
    (bit / WORD_BITS, 1 << (bit % WORD_BITS))
}

#[cfg(test)]
mod test {
    use super::BitVec;

    #[test]
    fn iter_crosses_word_boundaries() {
        let set = BitVec::<usize>::from_slice(&[0, 63, 64, 200]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 63, 64, 200]);
        assert_eq!(set.count(), 4);
    }

    #[test]
    fn iter_skips_leading_empty_words() {
        let mut set = BitVec::<usize>::new_empty();
        set.insert(130);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![130]);
    }

    #[test]
    fn superset_with_shorter_words() {
        let small = BitVec::<u32>::from_slice(&[1, 2]);
        let large = BitVec::<u32>::from_slice(&[1, 2, 300]);
        assert!(large.superset(&small));
        assert!(!small.superset(&large));
    }

    #[test]
    fn union_and_subtract_report_changes() {
        let mut a = BitVec::<u32>::from_slice(&[3, 5]);
        let b = BitVec::<u32>::from_slice(&[5, 99]);
        assert!(a.union(&b));
        assert!(!a.union(&b));
        assert!(a.subtract(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![3]);
    }
}
