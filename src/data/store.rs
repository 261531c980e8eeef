use std::collections::HashSet;

use crate::error::{Result, TraceError};

use super::model::{MetadataTable, Sequence};

// ---------------------------------------------------------------------------
// SequenceDataset – random access over loaded sequences
// ---------------------------------------------------------------------------

/// Indexable, length-reporting collection of sequences with a precomputed
/// maximum tick count. Implemented by the full store and by subsets of it.
pub trait SequenceDataset {
    /// Sequence at ordinal position `index`.
    fn get(&self, index: usize) -> Result<&Sequence>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest tick count in this collection (0 when empty).
    fn max_length(&self) -> usize;
}

fn longest<'a>(sequences: impl Iterator<Item = &'a Sequence>) -> usize {
    sequences.map(Sequence::tick_count).max().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// SequenceStore
// ---------------------------------------------------------------------------

/// All sequences loaded from one file or file pair, in load order.
#[derive(Debug, Clone)]
pub struct SequenceStore {
    sequences: Vec<Sequence>,
    max_length: usize,
}

impl SequenceStore {
    /// Take ownership of the sequences and compute `max_length` once.
    pub fn new(sequences: Vec<Sequence>) -> Self {
        let max_length = longest(sequences.iter());
        SequenceStore {
            sequences,
            max_length,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    pub fn as_slice(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Metadata rows for every sequence, in store order.
    pub fn metadata(&self) -> MetadataTable {
        MetadataTable::from_sequences(&self.sequences)
    }

    /// Position of the sequence with this id. Packed sequences are keyed by
    /// their ordinal position.
    pub fn position_of(&self, sequence_id: i64) -> Option<usize> {
        self.sequences
            .iter()
            .enumerate()
            .position(|(i, s)| s.sequence_id().unwrap_or(i as i64) == sequence_id)
    }

    /// View over the sequences whose id is in `ids`, in store order.
    pub fn subset_by_ids(&self, ids: &[i64]) -> StoreSubset<'_> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        let indices = self
            .sequences
            .iter()
            .enumerate()
            .filter(|(i, s)| wanted.contains(&s.sequence_id().unwrap_or(*i as i64)))
            .map(|(i, _)| i)
            .collect();
        StoreSubset::new(self, indices)
    }
}

impl SequenceDataset for SequenceStore {
    fn get(&self, index: usize) -> Result<&Sequence> {
        self.sequences.get(index).ok_or(TraceError::IndexOutOfRange {
            index,
            len: self.sequences.len(),
        })
    }

    fn len(&self) -> usize {
        self.sequences.len()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}

impl<'a> IntoIterator for &'a SequenceStore {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}

// ---------------------------------------------------------------------------
// StoreSubset
// ---------------------------------------------------------------------------

/// A borrowed selection of store positions, with its own `max_length`.
#[derive(Debug, Clone)]
pub struct StoreSubset<'a> {
    store: &'a SequenceStore,
    indices: Vec<usize>,
    max_length: usize,
}

impl<'a> StoreSubset<'a> {
    /// Out-of-range indices are dropped.
    pub fn new(store: &'a SequenceStore, indices: Vec<usize>) -> Self {
        let indices: Vec<usize> = indices.into_iter().filter(|i| *i < store.len()).collect();
        let max_length = longest(indices.iter().map(|i| &store.sequences[*i]));
        StoreSubset {
            store,
            indices,
            max_length,
        }
    }

    /// Store positions backing this view.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl SequenceDataset for StoreSubset<'_> {
    fn get(&self, index: usize) -> Result<&Sequence> {
        let pos = self
            .indices
            .get(index)
            .ok_or(TraceError::IndexOutOfRange {
                index,
                len: self.indices.len(),
            })?;
        self.store.get(*pos)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Tick;

    fn seq(len: usize, id: i64) -> Sequence {
        let ticks = (0..len)
            .map(|i| Tick::new([i as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .collect();
        Sequence::new(0, ticks, format!("p{id}"))
            .unwrap()
            .with_columnar_meta(id, "map")
    }

    #[test]
    fn max_length_over_store() {
        let store = SequenceStore::new(vec![seq(5, 1), seq(10, 2), seq(7, 3)]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.max_length(), 10);
        // recomputing over the same sequences is deterministic
        let again = SequenceStore::new(store.as_slice().to_vec());
        assert_eq!(again.max_length(), store.max_length());
    }

    #[test]
    fn get_out_of_range() {
        let store = SequenceStore::new(vec![seq(2, 1)]);
        assert_eq!(store.get(0).unwrap().tick_count(), 2);
        assert!(matches!(
            store.get(1),
            Err(TraceError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn empty_store() {
        let store = SequenceStore::new(Vec::new());
        assert!(store.is_empty());
        assert_eq!(store.max_length(), 0);
    }

    #[test]
    fn subset_keeps_store_order() {
        let store = SequenceStore::new(vec![seq(5, 10), seq(10, 20), seq(7, 30)]);
        let subset = store.subset_by_ids(&[30, 10, 99]);
        assert_eq!(subset.indices(), &[0, 2]);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.max_length(), 7);
        assert_eq!(subset.get(1).unwrap().sequence_id(), Some(30));
        assert!(subset.get(2).is_err());
        assert_eq!(store.position_of(20), Some(1));
        assert_eq!(store.position_of(21), None);
    }
}
