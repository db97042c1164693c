//! Forward-only cursor over a materialized result.

/// Single-pass cursor over a snapshot taken when the cursor was built.
///
/// The cursor starts before the first element: call [`advance`] and, when it
/// returns `true`, read the element with [`current`]. Later changes to the
/// underlying store are not reflected.
///
/// [`advance`]: SnapshotIter::advance
/// [`current`]: SnapshotIter::current
#[derive(Debug, Clone)]
pub struct SnapshotIter<T> {
    elems: Vec<T>,
    /// Index of the current element; `None` before the first advance.
    pos: Option<usize>,
}

impl<T> SnapshotIter<T> {
    pub fn new(elems: Vec<T>) -> Self {
        Self { elems, pos: None }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Move to the next element. Returns `false` once the snapshot is
    /// exhausted; the cursor then stays past the end.
    pub fn advance(&mut self) -> bool {
        let next = self.pos.map_or(0, |p| p + 1);
        if next < self.elems.len() {
            self.pos = Some(next);
            true
        } else {
            self.pos = Some(self.elems.len());
            false
        }
    }

    /// The element under the cursor, if it is on one.
    pub fn current(&self) -> Option<&T> {
        self.pos.and_then(|p| self.elems.get(p))
    }

    /// Number of elements in the snapshot.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

impl<T> Default for SnapshotIter<T> {
    fn default() -> Self {
        Self::empty()
    }
}
