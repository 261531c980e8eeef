use log::debug;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::{Result, TraceError};

use super::model::{Sequence, Tick};
use super::schema::TICK_FIELD_COUNT;
use super::store::SequenceDataset;

// ---------------------------------------------------------------------------
// Padding
// ---------------------------------------------------------------------------

/// The sequence's ticks followed by copies of its last tick, `target_length`
/// items in total. Sequences at or above the target are not truncated.
pub fn padded_ticks(seq: &Sequence, target_length: usize) -> impl Iterator<Item = &Tick> {
    let missing = target_length.saturating_sub(seq.tick_count());
    seq.ticks()
        .iter()
        .chain(std::iter::repeat(seq.last_tick()).take(missing))
}

/// Owned copy of [`padded_ticks`].
pub fn pad_sequence(seq: &Sequence, target_length: usize) -> Vec<Tick> {
    padded_ticks(seq, target_length).copied().collect()
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Fixed-length batch of sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Shape `(batch, target_length, TICK_FIELD_COUNT)`, fields in registry order.
    pub ticks: Array3<f32>,
    pub start_ticks: Vec<u64>,
    pub player_names: Vec<String>,
    /// Tick counts before padding.
    pub lengths: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn target_length(&self) -> usize {
        self.ticks.len_of(Axis(1))
    }

    /// `(target_length, TICK_FIELD_COUNT)` view of one element.
    pub fn element(&self, index: usize) -> ArrayView2<'_, f32> {
        self.ticks.index_axis(Axis(0), index)
    }

    /// `true` where a tick was recorded, `false` where it is padding.
    pub fn valid_mask(&self) -> Array2<bool> {
        Array2::from_shape_fn((self.len(), self.target_length()), |(b, t)| {
            t < self.lengths[b]
        })
    }
}

/// Right-pad every sequence to `target_length` by repeating its last tick.
///
/// Fails if any sequence is longer than `target_length`; nothing is truncated.
pub fn collate(sequences: &[&Sequence], target_length: usize) -> Result<Batch> {
    if let Some((index, seq)) = sequences
        .iter()
        .enumerate()
        .find(|(_, s)| s.tick_count() > target_length)
    {
        return Err(TraceError::TargetTooShort {
            index,
            length: seq.tick_count(),
            target: target_length,
        });
    }

    let mut ticks = Array3::<f32>::zeros((sequences.len(), target_length, TICK_FIELD_COUNT));
    for (seq, mut slot) in sequences.iter().zip(ticks.outer_iter_mut()) {
        for (tick, mut row) in padded_ticks(seq, target_length).zip(slot.outer_iter_mut()) {
            for (dst, src) in row.iter_mut().zip(tick.values()) {
                *dst = *src;
            }
        }
    }

    Ok(Batch {
        ticks,
        start_ticks: sequences.iter().map(|s| s.start_tick()).collect(),
        player_names: sequences.iter().map(|s| s.player_name().to_string()).collect(),
        lengths: sequences.iter().map(|s| s.tick_count()).collect(),
    })
}

/// Collate the sequences at `indices` of a dataset.
pub fn collate_indices<D>(dataset: &D, indices: &[usize], target_length: usize) -> Result<Batch>
where
    D: SequenceDataset + ?Sized,
{
    let sequences = indices
        .iter()
        .map(|i| dataset.get(*i))
        .collect::<Result<Vec<_>>>()?;
    collate(&sequences, target_length)
}

// ---------------------------------------------------------------------------
// Batch planning
// ---------------------------------------------------------------------------

/// Disjoint groups of dataset indices, one group per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    groups: Vec<Vec<usize>>,
}

impl BatchPlan {
    /// `0..len` in order, cut into batches of `batch_size` (the last may be short).
    pub fn sequential(len: usize, batch_size: usize) -> Self {
        Self::from_order((0..len).collect(), batch_size)
    }

    /// Like [`sequential`](Self::sequential) but shuffled; the same seed gives
    /// the same plan.
    pub fn shuffled(len: usize, batch_size: usize, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        order.shuffle(&mut rng);
        Self::from_order(order, batch_size)
    }

    fn from_order(order: Vec<usize>, batch_size: usize) -> Self {
        BatchPlan {
            groups: order.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect(),
        }
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Collate every group of `plan` on the rayon pool. Results keep plan order.
pub fn collate_plan_par<D>(dataset: &D, plan: &BatchPlan, target_length: usize) -> Result<Vec<Batch>>
where
    D: SequenceDataset + Sync + ?Sized,
{
    debug!(
        "collating {} batches to {target_length} ticks",
        plan.len()
    );
    plan.groups
        .par_iter()
        .map(|group| collate_indices(dataset, group, target_length))
        .collect()
}
