// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use arrayvec::ArrayVec;
use std::fmt::{Debug, Formatter, Result};

// The maximum number of elements a chunk can hold.
const CHUNK_CAP: usize = 60;

/// An append-only queue stored as a list of fixed-size chunks.
///
/// Elements never move once pushed, so a [`Cursor`] taken at any time stays
/// valid while the queue keeps growing. The solver uses this to walk newly
/// reachable methods while processing them may push more.
pub struct ChunkedQueue<T> {
    chunks: Vec<ArrayVec<T, CHUNK_CAP>>,
    len: usize,
}

impl<T: Debug> Debug for ChunkedQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Default for ChunkedQueue<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChunkedQueue<T> {
    #[inline]
    pub fn new() -> Self {
        ChunkedQueue {
            chunks: vec![ArrayVec::new()],
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an element to the back of the queue.
    pub fn push(&mut self, elem: T) {
        if self.chunks.last().map_or(true, |chunk| chunk.is_full()) {
            self.chunks.push(ArrayVec::new());
        }
        if let Some(tail) = self.chunks.last_mut() {
            tail.push(elem);
            self.len += 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// A cursor positioned at the front of the queue.
    #[inline]
    pub fn cursor(&self) -> Cursor {
        Cursor { chunk: 0, index: 0 }
    }
}

impl<T: Copy> ChunkedQueue<T> {
    /// Returns the element under `cursor` and advances it, or `None` if the
    /// cursor has caught up with the back of the queue.
    pub fn next_from(&self, cursor: &mut Cursor) -> Option<T> {
        loop {
            let chunk = self.chunks.get(cursor.chunk)?;
            if let Some(elem) = chunk.get(cursor.index) {
                cursor.index += 1;
                return Some(*elem);
            }
            if cursor.index < CHUNK_CAP {
                // The tail chunk has not been filled up to here yet.
                return None;
            }
            cursor.chunk += 1;
            cursor.index = 0;
        }
    }
}

/// A position inside a [`ChunkedQueue`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    chunk: usize,
    index: usize,
}

#[cfg(test)]
mod test {
    use super::{ChunkedQueue, CHUNK_CAP};

    #[test]
    fn cursor_follows_growth() {
        let mut queue = ChunkedQueue::new();
        let mut cursor = queue.cursor();
        assert_eq!(queue.next_from(&mut cursor), None);

        for i in 0..CHUNK_CAP {
            queue.push(i);
        }
        let mut seen = Vec::new();
        while let Some(x) = queue.next_from(&mut cursor) {
            seen.push(x);
        }
        assert_eq!(seen.len(), CHUNK_CAP);

        // The cursor sits at the end of a full chunk; new elements land in a new one.
        queue.push(1000);
        queue.push(1001);
        assert_eq!(queue.next_from(&mut cursor), Some(1000));
        assert_eq!(queue.next_from(&mut cursor), Some(1001));
        assert_eq!(queue.next_from(&mut cursor), None);
        assert_eq!(queue.len(), CHUNK_CAP + 2);
        assert_eq!(queue.iter().count(), CHUNK_CAP + 2);
    }
}
