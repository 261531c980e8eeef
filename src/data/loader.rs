use std::collections::HashSet;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, BooleanArray, Float32Array, Int64Array, LargeStringArray, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::DataType;
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use memmap2::Mmap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rmpv::Value;

use crate::config::{ColumnarFormat, DataSource, LoaderConfig, TickOrder};
use crate::error::{Result, TraceError};

use super::model::{MetadataTable, Sequence, SequenceMeta, Tick, TickTable};
use super::schema::{
    SequenceField, TickField, SEQUENCE_FIELDS, SEQUENCE_ID_COLUMN, TICK_FIELD_COUNT,
    TICK_INDEX_COLUMN,
};
use super::store::SequenceStore;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a store from either backend.
pub fn load(source: &DataSource, config: &LoaderConfig) -> Result<SequenceStore> {
    match source {
        DataSource::Columnar { dir } => load_columnar(dir, config)?.to_store(config),
        DataSource::Packed { file } => load_packed(file, config),
    }
}

/// Load from a path, picking the backend with [`DataSource::detect`]. A
/// table file's extension overrides `config.format`.
pub fn load_path(path: &Path, config: &LoaderConfig) -> Result<SequenceStore> {
    let (source, format) = DataSource::detect(path);
    match format {
        Some(format) => load(
            &source,
            &LoaderConfig {
                format,
                ..config.clone()
            },
        ),
        None => load(&source, config),
    }
}

fn keep_long_enough(sequences: Vec<Sequence>, min_ticks: usize) -> SequenceStore {
    let before = sequences.len();
    let kept: Vec<Sequence> = sequences
        .into_iter()
        .filter(|s| s.tick_count() >= min_ticks)
        .collect();
    if kept.len() < before {
        info!(
            "dropped {} sequences shorter than {min_ticks} ticks",
            before - kept.len()
        );
    }
    SequenceStore::new(kept)
}

// ---------------------------------------------------------------------------
// Columnar backend
// ---------------------------------------------------------------------------

/// The metadata and per-tick tables of one columnar dataset.
#[derive(Debug, Clone)]
pub struct ColumnarTables {
    pub sequences: MetadataTable,
    pub ticks: TickTable,
    /// Ticks file the tables were read from; used in error reports.
    origin: PathBuf,
}

/// Read `sequences.<ext>` and `ticks.<ext>` from `dir`.
///
/// Both files are checked for existence before either is opened.
pub fn load_columnar(dir: &Path, config: &LoaderConfig) -> Result<ColumnarTables> {
    let sequences_path = config.sequences_file(dir);
    let ticks_path = config.ticks_file(dir);
    for path in [&sequences_path, &ticks_path] {
        if !path.is_file() {
            return Err(TraceError::MissingFile { path: path.clone() });
        }
    }

    let t0 = Instant::now();
    let meta_batch = read_table(&sequences_path, config.format)?;
    let sequences = read_metadata(&meta_batch, &sequences_path)?;
    let tick_batch = read_table(&ticks_path, config.format)?;
    let ticks = read_ticks(&tick_batch, &ticks_path)?;
    info!(
        "loaded {} sequences / {} ticks from {} in {:.2}s",
        sequences.len(),
        ticks.len(),
        dir.display(),
        t0.elapsed().as_secs_f64()
    );

    Ok(ColumnarTables {
        sequences,
        ticks,
        origin: ticks_path,
    })
}

impl ColumnarTables {
    pub fn new(sequences: MetadataTable, ticks: TickTable, origin: impl Into<PathBuf>) -> Self {
        ColumnarTables {
            sequences,
            ticks,
            origin: origin.into(),
        }
    }

    /// Join the tables on `sequence_id` into sequences, in metadata row order.
    ///
    /// Rows of one sequence keep table order unless `config.tick_order` asks
    /// for a sort and the ticks table has a `tick` column. Fails on zero-tick
    /// sequences, `tick_count` mismatches, duplicate ids and tick rows whose
    /// id is absent from the metadata table.
    pub fn to_store(&self, config: &LoaderConfig) -> Result<SequenceStore> {
        let path = &self.origin;
        let mut groups = self.ticks.rows_by_sequence();

        let order = match (config.tick_order, self.ticks.tick_index()) {
            (TickOrder::SortByTickColumn, Some(index)) => {
                debug!("ordering tick rows by '{TICK_INDEX_COLUMN}'");
                Some(index)
            }
            (TickOrder::SortByTickColumn, None) => {
                debug!("no '{TICK_INDEX_COLUMN}' column in {}, keeping row order", path.display());
                None
            }
            (TickOrder::Emission, _) => None,
        };

        let mut seen = HashSet::with_capacity(self.sequences.len());
        let mut sequences = Vec::with_capacity(self.sequences.len());

        for (index, meta) in self.sequences.iter().enumerate() {
            if !seen.insert(meta.sequence_id) {
                return Err(TraceError::schema(
                    path,
                    format!("duplicate sequence_id {} in metadata row {index}", meta.sequence_id),
                ));
            }

            let mut rows = groups.remove(&meta.sequence_id).unwrap_or_default();
            if let Some(tick_index) = order {
                rows.sort_by_key(|r| tick_index[*r]);
            }
            let ticks: Vec<Tick> = rows.iter().filter_map(|r| self.ticks.row(*r)).collect();

            let seq = Sequence::new(meta.start_tick, ticks, meta.player_name.clone())
                .ok_or_else(|| TraceError::EmptySequence {
                    path: path.clone(),
                    index,
                })?
                .with_columnar_meta(meta.sequence_id, meta.map_name.clone());

            if seq.tick_count() != meta.tick_count {
                return Err(TraceError::schema(
                    path,
                    format!(
                        "sequence {index} (id {}): tick_count is {} but {} tick rows exist",
                        meta.sequence_id,
                        meta.tick_count,
                        seq.tick_count()
                    ),
                ));
            }
            sequences.push(seq);
        }

        if let Some(orphan) = groups.keys().min() {
            return Err(TraceError::schema(
                path,
                format!(
                    "{} sequence ids have tick rows but no metadata row (e.g. {orphan})",
                    groups.len()
                ),
            ));
        }

        Ok(keep_long_enough(sequences, config.min_ticks))
    }
}

fn read_table(path: &Path, format: ColumnarFormat) -> Result<RecordBatch> {
    match format {
        ColumnarFormat::Arrow => read_arrow_ipc(path),
        ColumnarFormat::Parquet => read_parquet(path),
    }
}

/// Read an Arrow IPC file through a read-only memory map. The map lives only
/// for the duration of this call.
fn read_arrow_ipc(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).map_err(|e| TraceError::io(path, e))?;
    // SAFETY: input files are immutable for the lifetime of a run, and the
    // map is dropped before this function returns.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| TraceError::io(path, e))?;

    let reader = FileReader::try_new(Cursor::new(&mmap[..]), None)
        .map_err(|e| TraceError::schema(path, format!("not an Arrow IPC file: {e}")))?;
    let schema = reader.schema();
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TraceError::schema(path, format!("reading record batch: {e}")))?;

    concat_batches(&schema, &batches).map_err(|e| TraceError::schema(path, e.to_string()))
}

fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).map_err(|e| TraceError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| TraceError::schema(path, format!("reading parquet metadata: {e}")))?;
    let schema = Arc::clone(builder.schema());
    let reader = builder
        .build()
        .map_err(|e| TraceError::schema(path, format!("building parquet reader: {e}")))?;
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TraceError::schema(path, format!("reading record batch: {e}")))?;

    concat_batches(&schema, &batches).map_err(|e| TraceError::schema(path, e.to_string()))
}

fn read_metadata(batch: &RecordBatch, path: &Path) -> Result<MetadataTable> {
    let ids = int_column(batch, SequenceField::SequenceId.name(), path)?;
    let counts = int_column(batch, SequenceField::TickCount.name(), path)?;
    let players = string_column(batch, SequenceField::PlayerName.name(), path)?;
    let maps = string_column(batch, SequenceField::MapName.name(), path)?;

    let start_name = SequenceField::StartTick.name();
    let starts = if batch.column_by_name(start_name).is_some() {
        int_column(batch, start_name, path)?
    } else {
        debug!("{} has no '{start_name}' column, using 0", path.display());
        vec![0; batch.num_rows()]
    };

    let rows = ids
        .into_iter()
        .zip(counts)
        .zip(starts)
        .zip(players.into_iter().zip(maps))
        .enumerate()
        .map(|(row, (((sequence_id, count), start), (player_name, map_name)))| {
            let tick_count = usize::try_from(count).map_err(|_| {
                TraceError::schema(path, format!("row {row}: negative tick_count {count}"))
            })?;
            let start_tick = u64::try_from(start).map_err(|_| {
                TraceError::schema(path, format!("row {row}: negative start_tick {start}"))
            })?;
            Ok(SequenceMeta {
                sequence_id,
                start_tick,
                tick_count,
                player_name,
                map_name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MetadataTable::new(rows))
}

fn read_ticks(batch: &RecordBatch, path: &Path) -> Result<TickTable> {
    let ids = int_column(batch, SEQUENCE_ID_COLUMN, path)?;

    let mut columns: [Vec<f32>; TICK_FIELD_COUNT] = Default::default();
    for field in TickField::ALL {
        columns[field.index()] = numeric_column(batch, field.name(), path)?;
    }

    let tick_index = if batch.column_by_name(TICK_INDEX_COLUMN).is_some() {
        Some(int_column(batch, TICK_INDEX_COLUMN, path)?)
    } else {
        None
    };

    TickTable::from_columns(ids, columns, tick_index)
        .ok_or_else(|| TraceError::schema(path, "tick columns have different lengths"))
}

// -- Arrow column helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str, path: &Path) -> Result<&'a Arc<dyn Array>> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| TraceError::schema(path, format!("missing column '{name}'")))?;
    if col.null_count() > 0 {
        return Err(TraceError::schema(
            path,
            format!("column '{name}' has {} null values", col.null_count()),
        ));
    }
    Ok(col)
}

fn int_column(batch: &RecordBatch, name: &str, path: &Path) -> Result<Vec<i64>> {
    let col = column(batch, name, path)?;
    if !col.data_type().is_integer() {
        return Err(TraceError::schema(
            path,
            format!("column '{name}' is {:?}, expected an integer type", col.data_type()),
        ));
    }
    // Values that do not fit in i64 become null.
    let widened = cast(col.as_ref(), &DataType::Int64).map_err(|e| TraceError::schema(path, e.to_string()))?;
    if widened.null_count() > 0 {
        return Err(TraceError::schema(path, format!("column '{name}' overflows i64")));
    }
    let arr = widened
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| TraceError::schema(path, format!("column '{name}' is not Int64")))?;
    Ok(arr.values().to_vec())
}

/// Read a tick field. Integers, floats and booleans are all accepted.
fn numeric_column(batch: &RecordBatch, name: &str, path: &Path) -> Result<Vec<f32>> {
    let col = column(batch, name, path)?;
    match col.data_type() {
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| TraceError::schema(path, format!("column '{name}' is not Boolean")))?;
            Ok(arr
                .iter()
                .map(|v| if v == Some(true) { 1.0 } else { 0.0 })
                .collect())
        }
        dt if dt.is_numeric() => {
            let narrowed =
                cast(col.as_ref(), &DataType::Float32).map_err(|e| TraceError::schema(path, e.to_string()))?;
            let arr = narrowed
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| TraceError::schema(path, format!("column '{name}' is not Float32")))?;
            Ok(arr.values().to_vec())
        }
        other => Err(TraceError::schema(
            path,
            format!("column '{name}' is {other:?}, expected a numeric or boolean type"),
        )),
    }
}

fn string_column(batch: &RecordBatch, name: &str, path: &Path) -> Result<Vec<String>> {
    let col = column(batch, name, path)?;
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        Ok(arr.iter().map(|v| v.unwrap_or_default().to_string()).collect())
    } else if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        Ok(arr.iter().map(|v| v.unwrap_or_default().to_string()).collect())
    } else {
        Err(TraceError::schema(
            path,
            format!("column '{name}' is {:?}, expected Utf8", col.data_type()),
        ))
    }
}

// ---------------------------------------------------------------------------
// Binary-packed backend
// ---------------------------------------------------------------------------

/// Read a msgpack file of `[start_tick, [[8 values], ...], player_name]`
/// elements. The whole file is read into memory in one go.
pub fn load_packed(file: &Path, config: &LoaderConfig) -> Result<SequenceStore> {
    if !file.is_file() {
        return Err(TraceError::MissingFile {
            path: file.to_path_buf(),
        });
    }

    let t0 = Instant::now();
    let bytes = std::fs::read(file).map_err(|e| TraceError::io(file, e))?;
    let sequences = parse_packed(&bytes, file)?;
    info!(
        "loaded {} sequences from {} in {:.2}s",
        sequences.len(),
        file.display(),
        t0.elapsed().as_secs_f64()
    );

    Ok(keep_long_enough(sequences, config.min_ticks))
}

/// Decode packed bytes. `path` is only used for error reports.
pub fn parse_packed(bytes: &[u8], path: &Path) -> Result<Vec<Sequence>> {
    let mut rest = bytes;
    let root = rmpv::decode::read_value(&mut rest)
        .map_err(|e| TraceError::schema(path, format!("undecodable msgpack: {e}")))?;
    if !rest.is_empty() {
        warn!(
            "{}: ignoring {} trailing bytes after the sequence array",
            path.display(),
            rest.len()
        );
    }

    let elements = root
        .as_array()
        .ok_or_else(|| TraceError::schema(path, "top-level value is not an array"))?;

    elements
        .iter()
        .enumerate()
        .map(|(index, element)| packed_sequence(element, index, path))
        .collect()
}

fn packed_field<'a>(fields: &'a [Value], field: SequenceField) -> Option<&'a Value> {
    field.packed_position().and_then(|pos| fields.get(pos))
}

fn packed_sequence(element: &Value, index: usize, path: &Path) -> Result<Sequence> {
    let fields = element
        .as_array()
        .filter(|f| f.len() == SEQUENCE_FIELDS.len())
        .ok_or_else(|| {
            TraceError::schema(
                path,
                format!("element {index} is not a (start_tick, ticks, player_name) tuple"),
            )
        })?;
    let bad = |what: &str| TraceError::schema(path, format!("element {index}: {what}"));

    let start_tick = packed_field(fields, SequenceField::StartTick)
        .and_then(Value::as_u64)
        .ok_or_else(|| bad("start_tick is not a non-negative integer"))?;
    let player_name = packed_field(fields, SequenceField::PlayerName)
        .and_then(Value::as_str)
        .ok_or_else(|| bad("player_name is not a UTF-8 string"))?;
    let raw_ticks = packed_field(fields, SequenceField::Ticks)
        .and_then(Value::as_array)
        .ok_or_else(|| bad("ticks is not an array"))?;

    let ticks = raw_ticks
        .iter()
        .enumerate()
        .map(|(t, raw)| {
            packed_tick(raw).ok_or_else(|| {
                bad(&format!("tick {t} is not an array of {TICK_FIELD_COUNT} numbers"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Sequence::new(start_tick, ticks, player_name).ok_or_else(|| TraceError::EmptySequence {
        path: path.to_path_buf(),
        index,
    })
}

fn packed_tick(raw: &Value) -> Option<Tick> {
    let values = raw.as_array().filter(|v| v.len() == TICK_FIELD_COUNT)?;
    let mut tick = [0.0f32; TICK_FIELD_COUNT];
    for (slot, value) in tick.iter_mut().zip(values) {
        *slot = packed_number(value)?;
    }
    Some(Tick::new(tick))
}

fn packed_number(value: &Value) -> Option<f32> {
    match value {
        Value::Integer(i) => i.as_i64().map(|v| v as f32).or_else(|| i.as_u64().map(|v| v as f32)),
        Value::F32(f) => Some(*f),
        Value::F64(f) => Some(*f as f32),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(value: Value) -> Vec<u8> {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &value).unwrap();
        buf
    }

    fn tick_value(x: i64) -> Value {
        Value::Array(vec![
            Value::from(x),
            Value::from(-x),
            Value::from(1),
            Value::from(0.5),
            Value::from(2.5f32),
            Value::from(true),
            Value::from(false),
            Value::from(true),
        ])
    }

    fn element(start: u64, ticks: Vec<Value>, name: &str) -> Value {
        Value::Array(vec![Value::from(start), Value::Array(ticks), Value::from(name)])
    }

    #[test]
    fn parses_mixed_numeric_encodings() {
        let bytes = packed(Value::Array(vec![element(
            12,
            vec![tick_value(3), tick_value(4)],
            "nameless tee",
        )]));
        let seqs = parse_packed(&bytes, Path::new("mem")).unwrap();
        assert_eq!(seqs.len(), 1);
        let s = &seqs[0];
        assert_eq!(s.start_tick(), 12);
        assert_eq!(s.player_name(), "nameless tee");
        assert_eq!(s.tick_count(), 2);
        assert_eq!(s.sequence_id(), None);
        let t = s.ticks()[1];
        assert_eq!(t.get(TickField::PosX), 4.0);
        assert_eq!(t.get(TickField::PosY), -4.0);
        assert_eq!(t.get(TickField::TargetX), 0.5);
        assert!(t.is_set(TickField::Jump));
        assert!(!t.is_set(TickField::Fire));
    }

    #[test]
    fn empty_ticks_rejected() {
        let bytes = packed(Value::Array(vec![
            element(0, vec![tick_value(1)], "a"),
            element(5, vec![], "b"),
        ]));
        let err = parse_packed(&bytes, Path::new("x.msgpack")).unwrap_err();
        assert!(matches!(err, TraceError::EmptySequence { index: 1, .. }));
    }

    #[test]
    fn non_tuple_element_is_schema_violation() {
        let bytes = packed(Value::Array(vec![Value::Array(vec![
            Value::from(0),
            Value::Array(vec![tick_value(1)]),
        ])]));
        let err = parse_packed(&bytes, Path::new("x.msgpack")).unwrap_err();
        assert!(matches!(err, TraceError::SchemaViolation { .. }));

        let bytes = packed(Value::from("not a list"));
        let err = parse_packed(&bytes, Path::new("x.msgpack")).unwrap_err();
        assert!(matches!(err, TraceError::SchemaViolation { .. }));
    }

    #[test]
    fn short_tick_is_schema_violation() {
        let bytes = packed(Value::Array(vec![element(
            0,
            vec![Value::Array(vec![Value::from(1); 7])],
            "a",
        )]));
        let err = parse_packed(&bytes, Path::new("x.msgpack")).unwrap_err();
        assert!(err.to_string().contains("tick 0"));
    }

    fn meta(id: i64, count: usize) -> SequenceMeta {
        SequenceMeta {
            sequence_id: id,
            start_tick: 0,
            tick_count: count,
            player_name: format!("p{id}"),
            map_name: "Multeasymap".into(),
        }
    }

    fn tick_table(ids: Vec<i64>, xs: Vec<f32>, tick_index: Option<Vec<i64>>) -> TickTable {
        let mut cols: [Vec<f32>; TICK_FIELD_COUNT] =
            std::array::from_fn(|_| vec![0.0; ids.len()]);
        cols[TickField::PosX.index()] = xs;
        TickTable::from_columns(ids, cols, tick_index).unwrap()
    }

    #[test]
    fn join_preserves_row_order_per_sequence() {
        let tables = ColumnarTables::new(
            MetadataTable::new(vec![meta(1, 2), meta(0, 3)]),
            tick_table(vec![0, 1, 0, 1, 0], vec![10.0, 20.0, 11.0, 21.0, 12.0], None),
            "ticks.arrow",
        );
        let store = tables.to_store(&LoaderConfig::default()).unwrap();
        let first = store.as_slice()[0].ticks();
        assert_eq!(store.as_slice()[0].sequence_id(), Some(1));
        assert_eq!(first[0].get(TickField::PosX), 20.0);
        assert_eq!(first[1].get(TickField::PosX), 21.0);
        let xs: Vec<f32> = store.as_slice()[1]
            .ticks()
            .iter()
            .map(|t| t.get(TickField::PosX))
            .collect();
        assert_eq!(xs, vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn tick_column_orders_rows_unless_emission_requested() {
        let tables = ColumnarTables::new(
            MetadataTable::new(vec![meta(0, 3)]),
            tick_table(vec![0, 0, 0], vec![3.0, 1.0, 2.0], Some(vec![102, 100, 101])),
            "ticks.arrow",
        );
        let sorted = tables.to_store(&LoaderConfig::default()).unwrap();
        let xs: Vec<f32> = sorted.as_slice()[0].ticks().iter().map(|t| t.get(TickField::PosX)).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);

        let cfg = LoaderConfig {
            tick_order: TickOrder::Emission,
            ..LoaderConfig::default()
        };
        let raw = tables.to_store(&cfg).unwrap();
        let xs: Vec<f32> = raw.as_slice()[0].ticks().iter().map(|t| t.get(TickField::PosX)).collect();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn zero_tick_metadata_row_is_empty_sequence() {
        let tables = ColumnarTables::new(
            MetadataTable::new(vec![meta(0, 1), meta(1, 0)]),
            tick_table(vec![0], vec![1.0], None),
            "ticks.arrow",
        );
        let err = tables.to_store(&LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, TraceError::EmptySequence { index: 1, .. }));
    }

    #[test]
    fn tick_count_mismatch_and_orphans() {
        let tables = ColumnarTables::new(
            MetadataTable::new(vec![meta(0, 3)]),
            tick_table(vec![0, 0], vec![1.0, 2.0], None),
            "ticks.arrow",
        );
        assert!(matches!(
            tables.to_store(&LoaderConfig::default()),
            Err(TraceError::SchemaViolation { .. })
        ));

        let tables = ColumnarTables::new(
            MetadataTable::new(vec![meta(0, 1)]),
            tick_table(vec![0, 9], vec![1.0, 2.0], None),
            "ticks.arrow",
        );
        let err = tables.to_store(&LoaderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no metadata row"));
    }

    #[test]
    fn min_ticks_filters_after_validation() {
        let tables = ColumnarTables::new(
            MetadataTable::new(vec![meta(0, 1), meta(1, 2)]),
            tick_table(vec![0, 1, 1], vec![1.0, 2.0, 3.0], None),
            "ticks.arrow",
        );
        let cfg = LoaderConfig {
            min_ticks: 2,
            ..LoaderConfig::default()
        };
        let store = tables.to_store(&cfg).unwrap();
        assert_eq!(store.as_slice().len(), 1);
        assert_eq!(store.as_slice()[0].sequence_id(), Some(1));
    }

    #[test]
    fn missing_columnar_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_columnar(dir.path(), &LoaderConfig::default()).unwrap_err();
        match err {
            TraceError::MissingFile { path } => assert!(path.ends_with("sequences.arrow")),
            other => panic!("unexpected error {other:?}"),
        }

        std::fs::write(dir.path().join("sequences.arrow"), b"").unwrap();
        let err = load_columnar(dir.path(), &LoaderConfig::default()).unwrap_err();
        match err {
            TraceError::MissingFile { path } => assert!(path.ends_with("ticks.arrow")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn garbage_arrow_file_is_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sequences.arrow"), b"definitely not arrow").unwrap();
        std::fs::write(dir.path().join("ticks.arrow"), b"nor this").unwrap();
        let err = load_columnar(dir.path(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, TraceError::SchemaViolation { .. }));
    }
}
