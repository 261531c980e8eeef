use std::collections::HashMap;

use super::schema::{TickField, TICK_FIELD_COUNT};

// ---------------------------------------------------------------------------
// Tick – one recorded timestep
// ---------------------------------------------------------------------------

/// Player position and input state for one game tick.
///
/// Values are stored in [`TickField`] order. Flags are `0.0` / `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick([f32; TICK_FIELD_COUNT]);

impl Tick {
    pub const fn new(values: [f32; TICK_FIELD_COUNT]) -> Self {
        Tick(values)
    }

    pub fn get(&self, field: TickField) -> f32 {
        self.0[field.index()]
    }

    /// Whether a flag field (jump, fire, hook) is held.
    pub fn is_set(&self, field: TickField) -> bool {
        self.get(field) != 0.0
    }

    pub fn position(&self) -> (f32, f32) {
        (self.get(TickField::PosX), self.get(TickField::PosY))
    }

    pub fn values(&self) -> &[f32; TICK_FIELD_COUNT] {
        &self.0
    }
}

impl From<[f32; TICK_FIELD_COUNT]> for Tick {
    fn from(values: [f32; TICK_FIELD_COUNT]) -> Self {
        Tick(values)
    }
}

// ---------------------------------------------------------------------------
// Sequence – a non-empty run of ticks for one player
// ---------------------------------------------------------------------------

/// An ordered, non-empty run of ticks belonging to one player in one session.
///
/// Immutable once built; the only constructor rejects an empty tick list, so
/// every `Sequence` has a last tick to pad with.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    start_tick: u64,
    ticks: Vec<Tick>,
    player_name: String,
    sequence_id: Option<i64>,
    map_name: Option<String>,
}

impl Sequence {
    /// Build a sequence. Returns `None` when `ticks` is empty.
    pub fn new(start_tick: u64, ticks: Vec<Tick>, player_name: impl Into<String>) -> Option<Self> {
        if ticks.is_empty() {
            return None;
        }
        Some(Sequence {
            start_tick,
            ticks,
            player_name: player_name.into(),
            sequence_id: None,
            map_name: None,
        })
    }

    /// Attach the identifiers only the columnar backend carries.
    pub fn with_columnar_meta(mut self, sequence_id: i64, map_name: impl Into<String>) -> Self {
        self.sequence_id = Some(sequence_id);
        self.map_name = Some(map_name.into());
        self
    }

    pub fn start_tick(&self) -> u64 {
        self.start_tick
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn sequence_id(&self) -> Option<i64> {
        self.sequence_id
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    /// Number of ticks; always at least one.
    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    /// Game tick number of the tick at `offset`, or `None` if it does not fit
    /// in an `i64`.
    pub fn tick_number(&self, offset: usize) -> Option<i64> {
        let start = i64::try_from(self.start_tick).ok()?;
        start.checked_add(i64::try_from(offset).ok()?)
    }

    pub fn last_tick(&self) -> &Tick {
        &self.ticks[self.ticks.len() - 1]
    }

    /// Metadata row for this sequence. `position` stands in for the id when
    /// the sequence came from the packed backend.
    pub fn to_meta(&self, position: usize) -> SequenceMeta {
        SequenceMeta {
            sequence_id: self.sequence_id.unwrap_or(position as i64),
            start_tick: self.start_tick,
            tick_count: self.tick_count(),
            player_name: self.player_name.clone(),
            map_name: self.map_name.clone().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Columnar tables
// ---------------------------------------------------------------------------

/// One row of the sequence metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMeta {
    pub sequence_id: i64,
    pub start_tick: u64,
    pub tick_count: usize,
    pub player_name: String,
    pub map_name: String,
}

/// The sequence metadata table: one row per sequence, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    pub rows: Vec<SequenceMeta>,
}

impl MetadataTable {
    pub fn new(rows: Vec<SequenceMeta>) -> Self {
        MetadataTable { rows }
    }

    /// Metadata view over already-built sequences.
    pub fn from_sequences(sequences: &[Sequence]) -> Self {
        MetadataTable {
            rows: sequences
                .iter()
                .enumerate()
                .map(|(i, seq)| seq.to_meta(i))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceMeta> {
        self.rows.iter()
    }

    pub fn sequence_ids(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.sequence_id).collect()
    }
}

/// The per-tick table, kept column-wise: one row per tick, rows of a
/// sequence in the order the writer emitted them.
#[derive(Debug, Clone, PartialEq)]
pub struct TickTable {
    sequence_ids: Vec<i64>,
    tick_index: Option<Vec<i64>>,
    columns: [Vec<f32>; TICK_FIELD_COUNT],
}

impl TickTable {
    /// Assemble from columns. Returns `None` if the column lengths disagree.
    pub fn from_columns(
        sequence_ids: Vec<i64>,
        columns: [Vec<f32>; TICK_FIELD_COUNT],
        tick_index: Option<Vec<i64>>,
    ) -> Option<Self> {
        let n = sequence_ids.len();
        if columns.iter().any(|c| c.len() != n) {
            return None;
        }
        if tick_index.as_ref().is_some_and(|t| t.len() != n) {
            return None;
        }
        Some(TickTable {
            sequence_ids,
            tick_index,
            columns,
        })
    }

    /// Flatten sequences into rows; ids fall back to ordinal position.
    /// Returns `None` if a tick number overflows `i64`.
    pub fn from_sequences(sequences: &[Sequence]) -> Option<Self> {
        let total: usize = sequences.iter().map(Sequence::tick_count).sum();
        let mut sequence_ids = Vec::with_capacity(total);
        let mut tick_index = Vec::with_capacity(total);
        let mut columns: [Vec<f32>; TICK_FIELD_COUNT] =
            std::array::from_fn(|_| Vec::with_capacity(total));

        for (pos, seq) in sequences.iter().enumerate() {
            let id = seq.sequence_id().unwrap_or(pos as i64);
            for (offset, tick) in seq.ticks().iter().enumerate() {
                sequence_ids.push(id);
                tick_index.push(seq.tick_number(offset)?);
                for (col, value) in columns.iter_mut().zip(tick.values()) {
                    col.push(*value);
                }
            }
        }

        Some(TickTable {
            sequence_ids,
            tick_index: Some(tick_index),
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.sequence_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_ids.is_empty()
    }

    pub fn sequence_ids(&self) -> &[i64] {
        &self.sequence_ids
    }

    pub fn tick_index(&self) -> Option<&[i64]> {
        self.tick_index.as_deref()
    }

    pub fn column(&self, field: TickField) -> &[f32] {
        &self.columns[field.index()]
    }

    pub fn row(&self, row: usize) -> Option<Tick> {
        if row >= self.len() {
            return None;
        }
        Some(Tick(std::array::from_fn(|f| self.columns[f][row])))
    }

    /// Row positions per sequence id, each list in table order.
    pub fn rows_by_sequence(&self) -> HashMap<i64, Vec<usize>> {
        let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, id) in self.sequence_ids.iter().enumerate() {
            groups.entry(*id).or_default().push(row);
        }
        groups
    }

    /// New table holding only `rows`, in the given order. Out-of-range rows
    /// are skipped.
    pub fn take(&self, rows: &[usize]) -> TickTable {
        let rows: Vec<usize> = rows.iter().copied().filter(|r| *r < self.len()).collect();
        TickTable {
            sequence_ids: rows.iter().map(|r| self.sequence_ids[*r]).collect(),
            tick_index: self
                .tick_index
                .as_ref()
                .map(|t| rows.iter().map(|r| t[*r]).collect()),
            columns: std::array::from_fn(|f| rows.iter().map(|r| self.columns[f][*r]).collect()),
        }
    }
}
