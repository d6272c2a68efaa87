//! Live filtered view over a backing list
//!
//! [`FilteredList`] exposes the visible subset of a `Vec` while keeping
//! every write in step with the full list: reads and `len` reflect the
//! visible entries, and `insert`/`replace`/`remove` apply to the backing
//! entry that corresponds to the visible index. Hidden entries are never
//! touched, so saving the backing list after an edit keeps them intact.

/// Filtered, write-through view over `delegate`
///
/// `positions[i]` is the index in `delegate` of the `i`-th visible entry.
/// Positions are strictly increasing.
#[derive(Debug)]
pub struct FilteredList<'a, T> {
    delegate: &'a mut Vec<T>,
    positions: &'a mut Vec<usize>,
}

impl<'a, T> FilteredList<'a, T> {
    pub fn new(delegate: &'a mut Vec<T>, positions: &'a mut Vec<usize>) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(positions.iter().all(|&p| p < delegate.len()));
        Self {
            delegate,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.positions.get(index).map(|&p| &self.delegate[p])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.positions.iter().map(|&p| &self.delegate[p])
    }

    /// Replace the visible entry at `index`, returning the previous value
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn replace(&mut self, index: usize, value: T) -> T {
        let position = self.positions[index];
        std::mem::replace(&mut self.delegate[position], value)
    }

    /// Insert a visible entry at `index`
    ///
    /// The backing list receives it just before the entry currently visible
    /// at `index`, or just after the last visible entry when appending.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        assert!(
            index <= self.positions.len(),
            "insertion index {} out of bounds (len {})",
            index,
            self.positions.len()
        );

        let position = match (self.positions.get(index), self.positions.last()) {
            (Some(&p), _) => p,
            (None, Some(&last)) => last + 1,
            (None, None) => self.delegate.len(),
        };

        self.delegate.insert(position, value);
        for p in self.positions.iter_mut().filter(|p| **p >= position) {
            *p += 1;
        }
        self.positions.insert(index, position);
    }

    pub fn push(&mut self, value: T) {
        self.insert(self.positions.len(), value);
    }

    /// Remove the visible entry at `index` from both views
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let position = self.positions.remove(index);
        let value = self.delegate.remove(position);
        for p in self.positions.iter_mut().filter(|p| **p > position) {
            *p -= 1;
        }
        value
    }
}
