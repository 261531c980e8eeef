use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float32Array, Int32Array, Int64Array, StringArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use log::info;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use crate::config::{ColumnarFormat, LoaderConfig};
use crate::error::{Result, TraceError};

use super::model::{Sequence, Tick};
use super::schema::{FieldKind, SequenceField, TickField, SEQUENCE_ID_COLUMN, TICK_INDEX_COLUMN};
use super::store::SequenceStore;

// ---------------------------------------------------------------------------
// Columnar export
// ---------------------------------------------------------------------------

/// Write `sequences.<ext>` and `ticks.<ext>` into `dir` (created if needed).
///
/// Integer tick fields become Int32 columns and flags Boolean, unless a value
/// would not survive that (fractions, out-of-range numbers, flags other than
/// 0/1); such a field is written as Float32 instead.
/// Sequences without an id get their store position. Returns the two paths.
pub fn write_columnar(
    store: &SequenceStore,
    dir: &Path,
    format: ColumnarFormat,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).map_err(|e| TraceError::io(dir, e))?;
    let config = LoaderConfig {
        format,
        ..LoaderConfig::default()
    };
    let sequences_path = config.sequences_file(dir);
    let ticks_path = config.ticks_file(dir);

    let sequences = sequences_batch(store.as_slice())?;
    let ticks = ticks_batch(store.as_slice(), &ticks_path)?;
    write_batch(&sequences, &sequences_path, format)?;
    write_batch(&ticks, &ticks_path, format)?;

    info!(
        "wrote {} sequences to {} and {}",
        store.as_slice().len(),
        sequences_path.display(),
        ticks_path.display()
    );
    Ok((sequences_path, ticks_path))
}

fn sequence_id(seq: &Sequence, position: usize) -> i64 {
    seq.sequence_id().unwrap_or(position as i64)
}

fn sequences_batch(sequences: &[Sequence]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new(SequenceField::SequenceId.name(), DataType::Int64, false),
        Field::new(SequenceField::StartTick.name(), DataType::UInt64, false),
        Field::new(SequenceField::TickCount.name(), DataType::UInt64, false),
        Field::new(SequenceField::PlayerName.name(), DataType::Utf8, false),
        Field::new(SequenceField::MapName.name(), DataType::Utf8, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            sequences.iter().enumerate().map(|(i, s)| sequence_id(s, i)),
        )),
        Arc::new(UInt64Array::from_iter_values(sequences.iter().map(Sequence::start_tick))),
        Arc::new(UInt64Array::from_iter_values(
            sequences.iter().map(|s| s.tick_count() as u64),
        )),
        Arc::new(StringArray::from_iter_values(sequences.iter().map(Sequence::player_name))),
        Arc::new(StringArray::from_iter_values(
            sequences.iter().map(|s| s.map_name().unwrap_or_default()),
        )),
    ];

    Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
}

/// Whole number representable in an Int32 column.
fn fits_i32(value: f32) -> bool {
    value.fract() == 0.0 && (i32::MIN as f32..i32::MAX as f32).contains(&value)
}

fn is_flag(value: f32) -> bool {
    value == 0.0 || value == 1.0
}

fn tick_numbers(sequences: &[Sequence], path: &Path) -> Result<Vec<i64>> {
    let mut numbers = Vec::with_capacity(sequences.iter().map(Sequence::tick_count).sum());
    for (position, seq) in sequences.iter().enumerate() {
        for offset in 0..seq.tick_count() {
            let number = seq.tick_number(offset).ok_or_else(|| {
                TraceError::schema(
                    path,
                    format!(
                        "sequence {position}: tick {offset} after start_tick {} does not fit in i64",
                        seq.start_tick()
                    ),
                )
            })?;
            numbers.push(number);
        }
    }
    Ok(numbers)
}

fn ticks_batch(sequences: &[Sequence], path: &Path) -> Result<RecordBatch> {
    let ticks = || sequences.iter().flat_map(|s| s.ticks().iter());

    let mut fields = vec![
        Field::new(SEQUENCE_ID_COLUMN, DataType::Int64, false),
        Field::new(TICK_INDEX_COLUMN, DataType::Int64, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            sequences
                .iter()
                .enumerate()
                .flat_map(|(i, s)| std::iter::repeat(sequence_id(s, i)).take(s.tick_count())),
        )),
        Arc::new(Int64Array::from(tick_numbers(sequences, path)?)),
    ];

    for field in TickField::ALL {
        let lossless = match field.kind() {
            FieldKind::Integer => ticks().all(|t| fits_i32(t.get(field))),
            FieldKind::Flag => ticks().all(|t| is_flag(t.get(field))),
        };
        if !lossless {
            fields.push(Field::new(field.name(), DataType::Float32, false));
            arrays.push(Arc::new(Float32Array::from_iter_values(
                ticks().map(|t| t.get(field)),
            )));
            continue;
        }
        match field.kind() {
            FieldKind::Integer => {
                fields.push(Field::new(field.name(), DataType::Int32, false));
                arrays.push(Arc::new(Int32Array::from_iter_values(
                    ticks().map(|t| t.get(field) as i32),
                )));
            }
            FieldKind::Flag => {
                fields.push(Field::new(field.name(), DataType::Boolean, false));
                arrays.push(Arc::new(BooleanArray::from(
                    ticks().map(|t| t.is_set(field)).collect::<Vec<bool>>(),
                )));
            }
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// The first `rows` sequences of the store, rendered as the metadata table
/// `write_columnar` would write.
pub fn preview_sequences(store: &SequenceStore, rows: usize) -> Result<String> {
    let batch = sequences_batch(store.as_slice())?;
    let head = batch.slice(0, rows.min(batch.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

fn write_batch(batch: &RecordBatch, path: &Path, format: ColumnarFormat) -> Result<()> {
    let file = File::create(path).map_err(|e| TraceError::io(path, e))?;
    match format {
        ColumnarFormat::Arrow => {
            let mut writer = FileWriter::try_new(file, &batch.schema())?;
            writer.write(batch)?;
            writer.finish()?;
        }
        ColumnarFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Packed export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(untagged)]
enum PackedValue {
    Integer(i64),
    Flag(bool),
    Float(f32),
}

/// `(start_tick, ticks, player_name)`; msgpack encodes it as a 3-element array.
#[derive(Serialize)]
struct PackedSequence<'a>(u64, Vec<Vec<PackedValue>>, &'a str);

fn packed_tick(tick: &Tick) -> Vec<PackedValue> {
    TickField::ALL
        .into_iter()
        .map(|field| {
            let value = tick.get(field);
            match field.kind() {
                FieldKind::Flag if is_flag(value) => PackedValue::Flag(value == 1.0),
                _ if fits_i32(value) => PackedValue::Integer(value as i64),
                _ => PackedValue::Float(value),
            }
        })
        .collect()
}

/// Encode the store as one msgpack array of packed sequences.
pub fn to_packed_bytes(store: &SequenceStore) -> Result<Vec<u8>> {
    let packed: Vec<PackedSequence<'_>> = store
        .iter()
        .map(|s| {
            PackedSequence(
                s.start_tick(),
                s.ticks().iter().map(packed_tick).collect(),
                s.player_name(),
            )
        })
        .collect();
    Ok(rmp_serde::to_vec(&packed)?)
}

/// Write the store as a single msgpack file.
pub fn write_packed(store: &SequenceStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TraceError::io(parent, e))?;
    }
    let bytes = to_packed_bytes(store)?;
    std::fs::write(path, &bytes).map_err(|e| TraceError::io(path, e))?;
    info!(
        "wrote {} sequences ({} bytes) to {}",
        store.as_slice().len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV metadata sidecar
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MetaCsvRow<'a> {
    seq_id: i64,
    player_id: usize,
    player: String,
    start: u64,
    ticks: usize,
    map: &'a str,
}

/// Write `seq_id,player_id,player,start,ticks,map`. Player ids are handed out
/// in order of first appearance; quotes are stripped from player names.
pub fn write_meta_csv(store: &SequenceStore, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| TraceError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    let csv_error = |source: csv::Error| TraceError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut player_ids: HashMap<&str, usize> = HashMap::new();

    for (position, seq) in store.iter().enumerate() {
        let next_id = player_ids.len();
        let player_id = *player_ids.entry(seq.player_name()).or_insert(next_id);
        writer.serialize(MetaCsvRow {
            seq_id: sequence_id(seq, position),
            player_id,
            player: seq.player_name().replace('"', ""),
            start: seq.start_tick(),
            ticks: seq.tick_count(),
            map: seq.map_name().unwrap_or_default(),
        })
        .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| TraceError::io(path, e))?;
    info!("wrote {} metadata rows to {}", store.as_slice().len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_columnar, parse_packed};
    use crate::data::store::SequenceDataset;

    fn store() -> SequenceStore {
        let tick = |x: f32, jump: bool| {
            Tick::new([x, 64.0, -1.0, 12.0, -30.0, jump as u8 as f32, 0.0, 1.0])
        };
        SequenceStore::new(vec![
            Sequence::new(10, vec![tick(1.0, true), tick(2.0, false)], "nameless \"tee\"")
                .unwrap()
                .with_columnar_meta(5, "Kobra"),
            Sequence::new(99, vec![tick(8.0, false)], "Cookie")
                .unwrap()
                .with_columnar_meta(6, "Gores"),
            Sequence::new(3, vec![tick(4.0, true)], "nameless \"tee\"")
                .unwrap()
                .with_columnar_meta(7, "Kobra"),
        ])
    }

    #[test]
    fn columnar_tables_have_registry_columns() {
        let dir = tempfile::tempdir().unwrap();
        let (seq_path, tick_path) = write_columnar(&store(), dir.path(), ColumnarFormat::Arrow).unwrap();
        assert!(seq_path.ends_with("sequences.arrow"));
        assert!(tick_path.ends_with("ticks.arrow"));

        let tables = load_columnar(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(tables.sequences.sequence_ids(), vec![5, 6, 7]);
        assert_eq!(tables.ticks.len(), 4);
        assert_eq!(tables.ticks.tick_index().unwrap(), &[10, 11, 99, 3]);
        assert_eq!(tables.ticks.column(TickField::Jump), &[1.0, 0.0, 0.0, 1.0]);
    }

    fn column_type(path: &Path, name: &str) -> DataType {
        let reader =
            arrow::ipc::reader::FileReader::try_new(File::open(path).unwrap(), None).unwrap();
        reader.schema().field_with_name(name).unwrap().data_type().clone()
    }

    fn fractional_store() -> SequenceStore {
        let ticks = vec![
            Tick::new([10.4, 20.6, 0.0, 0.5, -1.5, 0.25, 0.0, 1.0]),
            Tick::new([11.0, 21.0, 1.0, 3e9, -2.0, 1.0, 2.0, 0.0]),
        ];
        SequenceStore::new(vec![Sequence::new(7, ticks, "frac")
            .unwrap()
            .with_columnar_meta(0, "Kobra")])
    }

    #[test]
    fn integral_fields_keep_compact_columns() {
        let dir = tempfile::tempdir().unwrap();
        let (_, tick_path) = write_columnar(&store(), dir.path(), ColumnarFormat::Arrow).unwrap();
        assert_eq!(column_type(&tick_path, "pos_x"), DataType::Int32);
        assert_eq!(column_type(&tick_path, "hook"), DataType::Boolean);
    }

    #[test]
    fn non_integral_values_survive_columnar_write() {
        let dir = tempfile::tempdir().unwrap();
        let original = fractional_store();
        let (_, tick_path) = write_columnar(&original, dir.path(), ColumnarFormat::Arrow).unwrap();
        assert_eq!(column_type(&tick_path, "pos_x"), DataType::Float32);
        assert_eq!(column_type(&tick_path, "target_x"), DataType::Float32);
        assert_eq!(column_type(&tick_path, "jump"), DataType::Float32);
        assert_eq!(column_type(&tick_path, "fire"), DataType::Float32);
        assert_eq!(column_type(&tick_path, "hook"), DataType::Boolean);

        let loaded = load_columnar(dir.path(), &LoaderConfig::default())
            .unwrap()
            .to_store(&LoaderConfig::default())
            .unwrap();
        assert_eq!(loaded.get(0).unwrap().ticks(), original.get(0).unwrap().ticks());
    }

    #[test]
    fn non_integral_values_survive_packed_write() {
        let original = fractional_store();
        let bytes = to_packed_bytes(&original).unwrap();
        let decoded = parse_packed(&bytes, Path::new("mem")).unwrap();
        assert_eq!(decoded[0].ticks(), original.get(0).unwrap().ticks());
    }

    #[test]
    fn overflowing_tick_number_is_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        let tick = Tick::new([0.0; 8]);
        let store = SequenceStore::new(vec![
            Sequence::new(i64::MAX as u64, vec![tick, tick], "a").unwrap()
        ]);
        let err = write_columnar(&store, dir.path(), ColumnarFormat::Arrow).unwrap_err();
        match err {
            TraceError::SchemaViolation { path, detail } => {
                assert!(path.ends_with("ticks.arrow"));
                assert!(detail.contains("sequence 0: tick 1"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!dir.path().join("sequences.arrow").exists());

        // the packed format stores start_tick as u64 and needs no tick column
        let bytes = to_packed_bytes(&store).unwrap();
        let decoded = parse_packed(&bytes, Path::new("mem")).unwrap();
        assert_eq!(decoded[0].start_tick(), i64::MAX as u64);
    }

    #[test]
    fn meta_csv_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("meta.csv");
        let err = write_meta_csv(&store(), &path).unwrap_err();
        match err {
            TraceError::Io { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn preview_is_limited_to_head() {
        let text = preview_sequences(&store(), 2).unwrap();
        assert!(text.contains("player_name"));
        assert!(text.contains("Cookie"));
        assert!(!text.contains("| 7 "));
        assert!(preview_sequences(&store(), 50).unwrap().contains("| 7 "));
    }

    #[test]
    fn packed_bytes_decode_back() {
        let original = store();
        let bytes = to_packed_bytes(&original).unwrap();
        let decoded = parse_packed(&bytes, Path::new("mem")).unwrap();
        assert_eq!(decoded.len(), original.len());
        for (a, b) in decoded.iter().zip(original.iter()) {
            assert_eq!(a.ticks(), b.ticks());
            assert_eq!(a.player_name(), b.player_name());
            assert_eq!(a.start_tick(), b.start_tick());
        }
    }

    #[test]
    fn meta_csv_assigns_player_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.csv");
        write_meta_csv(&store(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "seq_id,player_id,player,start,ticks,map");
        assert_eq!(lines[1], "5,0,nameless tee,10,2,Kobra");
        assert_eq!(lines[2], "6,1,Cookie,99,1,Gores");
        assert_eq!(lines[3], "7,0,nameless tee,3,1,Kobra");
    }
}
