use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::model::{MetadataTable, SequenceMeta, TickTable};
use super::schema::TickField;

// ---------------------------------------------------------------------------
// Grouping and ranking
// ---------------------------------------------------------------------------

/// Distinct sequence ids per map, most-recorded map first. Ties are broken by
/// map name so the output is deterministic.
pub fn map_counts(table: &MetadataTable) -> Vec<(String, usize)> {
    let mut per_map: BTreeMap<&str, HashSet<i64>> = BTreeMap::new();
    for row in table.iter() {
        per_map
            .entry(row.map_name.as_str())
            .or_default()
            .insert(row.sequence_id);
    }

    let mut counts: Vec<(String, usize)> = per_map
        .into_iter()
        .map(|(map, ids)| (map.to_string(), ids.len()))
        .collect();
    // BTreeMap order already sorts names; the stable sort keeps it for ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Players with the most sequences, or the most ticks when `count_ticks`.
pub fn top_k_players(table: &MetadataTable, k: usize, count_ticks: bool) -> Vec<(String, usize)> {
    let mut per_player: BTreeMap<&str, usize> = BTreeMap::new();
    for row in table.iter() {
        let increment = if count_ticks { row.tick_count } else { 1 };
        *per_player.entry(row.player_name.as_str()).or_insert(0) += increment;
    }

    let mut counts: Vec<(String, usize)> = per_player
        .into_iter()
        .map(|(player, n)| (player.to_string(), n))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(k);
    counts
}

/// Copy of the table ordered longest session first. Equal lengths keep their
/// original relative order. The tick table is not touched.
pub fn sort_by_tick_count(table: &MetadataTable) -> MetadataTable {
    let mut rows = table.rows.clone();
    rows.sort_by(|a, b| b.tick_count.cmp(&a.tick_count));
    MetadataTable::new(rows)
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Rows whose id is in `ids`, in table order. No match gives an empty table.
pub fn select_ids(table: &MetadataTable, ids: &[i64]) -> MetadataTable {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    MetadataTable::new(
        table
            .iter()
            .filter(|row| wanted.contains(&row.sequence_id))
            .cloned()
            .collect(),
    )
}

/// Rows recorded on `map_name`, in table order.
pub fn select_map(table: &MetadataTable, map_name: &str) -> MetadataTable {
    MetadataTable::new(
        table
            .iter()
            .filter(|row| row.map_name == map_name)
            .cloned()
            .collect(),
    )
}

/// Tick rows belonging to `ids`, in their original row order.
pub fn select_tick_rows(ticks: &TickTable, ids: &[i64]) -> TickTable {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    let rows: Vec<usize> = ticks
        .sequence_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| wanted.contains(*id))
        .map(|(row, _)| row)
        .collect();
    ticks.take(&rows)
}

/// `(pos_x, pos_y)` path of one sequence, in row order.
pub fn trace(ticks: &TickTable, sequence_id: i64) -> Vec<(f32, f32)> {
    let xs = ticks.column(TickField::PosX);
    let ys = ticks.column(TickField::PosY);
    ticks
        .sequence_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| **id == sequence_id)
        .map(|(row, _)| (xs[row], ys[row]))
        .collect()
}

/// Tick rows per sequence id, for tables that are not grouped on disk.
pub fn tick_rows_per_sequence(ticks: &TickTable) -> HashMap<i64, usize> {
    ticks
        .rows_by_sequence()
        .into_iter()
        .map(|(id, rows)| (id, rows.len()))
        .collect()
}

// ---------------------------------------------------------------------------
// Value filters
// ---------------------------------------------------------------------------

/// Which map / player values are selected.
///
/// `None` means "no constraint"; an empty set means nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFilter {
    pub maps: Option<BTreeSet<String>>,
    pub players: Option<BTreeSet<String>>,
    pub min_ticks: usize,
}

impl MetaFilter {
    /// Every map and player present in `table` selected.
    pub fn all(table: &MetadataTable) -> Self {
        MetaFilter {
            maps: Some(table.iter().map(|r| r.map_name.clone()).collect()),
            players: Some(table.iter().map(|r| r.player_name.clone()).collect()),
            min_ticks: 0,
        }
    }

    pub fn accepts(&self, row: &SequenceMeta) -> bool {
        let selected = |set: &Option<BTreeSet<String>>, value: &str| {
            set.as_ref().map_or(true, |s| s.contains(value))
        };
        row.tick_count >= self.min_ticks
            && selected(&self.maps, &row.map_name)
            && selected(&self.players, &row.player_name)
    }
}

/// Positions of the rows that pass `filter`.
pub fn filtered_indices(table: &MetadataTable, filter: &MetaFilter) -> Vec<usize> {
    table
        .iter()
        .enumerate()
        .filter(|(_, row)| filter.accepts(row))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Sequence, Tick};

    fn row(id: i64, map: &str, player: &str, ticks: usize) -> SequenceMeta {
        SequenceMeta {
            sequence_id: id,
            start_tick: 0,
            tick_count: ticks,
            player_name: player.into(),
            map_name: map.into(),
        }
    }

    fn table() -> MetadataTable {
        MetadataTable::new(vec![
            row(1, "A", "nameless", 50),
            row(2, "B", "Cookie", 400),
            row(3, "A", "Cookie", 120),
        ])
    }

    #[test]
    fn groups_maps_by_count() {
        assert_eq!(
            map_counts(&table()),
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
    }

    #[test]
    fn map_counts_are_distinct_ids() {
        let mut t = table();
        t.rows.push(row(3, "A", "Cookie", 120));
        assert_eq!(map_counts(&t)[0], ("A".to_string(), 2));
    }

    #[test]
    fn select_preserves_order() {
        let picked = select_ids(&table(), &[3, 1]);
        assert_eq!(picked.sequence_ids(), vec![1, 3]);
        assert!(select_ids(&table(), &[42]).is_empty());
        assert!(select_map(&table(), "Z").is_empty());
        assert_eq!(select_map(&table(), "A").sequence_ids(), vec![1, 3]);
    }

    #[test]
    fn longest_first() {
        let sorted = sort_by_tick_count(&table());
        assert_eq!(sorted.sequence_ids(), vec![2, 3, 1]);
    }

    #[test]
    fn top_players() {
        let by_sequences = top_k_players(&table(), 1, false);
        assert_eq!(by_sequences, vec![("Cookie".to_string(), 2)]);
        let by_ticks = top_k_players(&table(), 5, true);
        assert_eq!(
            by_ticks,
            vec![("Cookie".to_string(), 520), ("nameless".to_string(), 50)]
        );
    }

    #[test]
    fn value_filters() {
        let t = table();
        let mut filter = MetaFilter::all(&t);
        assert_eq!(filtered_indices(&t, &filter), vec![0, 1, 2]);

        filter.maps = Some(BTreeSet::from(["A".to_string()]));
        assert_eq!(filtered_indices(&t, &filter), vec![0, 2]);

        filter.min_ticks = 100;
        assert_eq!(filtered_indices(&t, &filter), vec![2]);

        filter.players = Some(BTreeSet::new());
        assert!(filtered_indices(&t, &filter).is_empty());

        assert_eq!(filtered_indices(&t, &MetaFilter::default()).len(), 3);
    }

    #[test]
    fn tick_rows_and_traces() {
        let tick = |x: f32| Tick::new([x, x * 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let seqs = vec![
            Sequence::new(0, vec![tick(1.0), tick(2.0)], "a").unwrap(),
            Sequence::new(0, vec![tick(7.0)], "b").unwrap(),
            Sequence::new(0, vec![tick(3.0)], "c").unwrap(),
        ];
        let ticks = TickTable::from_sequences(&seqs).unwrap();

        let picked = select_tick_rows(&ticks, &[2, 0]);
        assert_eq!(picked.sequence_ids(), &[0, 0, 2]);
        assert_eq!(trace(&ticks, 0), vec![(1.0, 2.0), (2.0, 4.0)]);
        assert!(trace(&ticks, 9).is_empty());
        assert_eq!(tick_rows_per_sequence(&ticks)[&0], 2);
    }
}
