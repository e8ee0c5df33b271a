//! Gap buffer of lines.
//!
//! The buffer stores one `String` per line. Lines before the gap live in
//! `front` in order; lines after the gap live in `back` in reverse order,
//! so the line right after the gap is `back.last()`. Moving the gap costs
//! one push/pop per line crossed, and typing keeps the gap where the
//! cursor is, so splitting or joining lines near the last edit is O(1)
//! amortized. Indexing any line is O(1).

use std::fmt;

pub struct LineStore {
    front: Vec<String>,
    back: Vec<String>,
}

impl LineStore {
    /// A store holding `lines`, gap at the end.
    #[must_use]
    pub const fn new(lines: Vec<String>) -> Self {
        Self {
            front: lines,
            back: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.front.len() + self.back.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&String> {
        if i < self.front.len() {
            self.front.get(i)
        } else {
            let from_gap = i - self.front.len();
            let len = self.back.len();
            (from_gap < len).then(|| &self.back[len - 1 - from_gap])
        }
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut String> {
        if i < self.front.len() {
            self.front.get_mut(i)
        } else {
            let from_gap = i - self.front.len();
            let len = self.back.len();
            if from_gap < len {
                Some(&mut self.back[len - 1 - from_gap])
            } else {
                None
            }
        }
    }

    /// Insert `line` so it becomes line `i`. `i == len()` appends.
    ///
    /// # Panics
    ///
    /// Panics if `i > len()`.
    pub fn insert(&mut self, i: usize, line: String) {
        assert!(i <= self.len(), "line insert index {i} past end {}", self.len());
        self.move_gap(i);
        self.front.push(line);
    }

    /// Remove and return line `i`, or `None` if there is no such line.
    pub fn remove(&mut self, i: usize) -> Option<String> {
        if i >= self.len() {
            return None;
        }
        self.move_gap(i);
        self.back.pop()
    }

    /// Lines in order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &String> + '_ {
        self.front.iter().chain(self.back.iter().rev())
    }

    /// Copy every line out, in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().cloned().collect()
    }

    /// Put the gap right before line `i`.
    fn move_gap(&mut self, i: usize) {
        while self.front.len() > i {
            if let Some(line) = self.front.pop() {
                self.back.push(line);
            }
        }
        while self.front.len() < i {
            match self.back.pop() {
                Some(line) => self.front.push(line),
                None => break,
            }
        }
    }
}

impl fmt::Debug for LineStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
