//! Per-tick gameplay traces as fixed-schema sequences.
//!
//! Traces come either as a pair of columnar tables (`sequences.arrow` +
//! `ticks.arrow`, or Parquet) or as one msgpack file. Both load into a
//! [`SequenceStore`], which the collator turns into padded numeric batches
//! and the filter module queries by map, player and id.

pub mod config;
pub mod data;
pub mod error;

pub use config::{ColumnarFormat, DataSource, LoaderConfig, TickOrder};
pub use data::collate::{collate, collate_indices, collate_plan_par, pad_sequence, Batch, BatchPlan};
pub use data::loader::{load, load_columnar, load_packed, load_path, ColumnarTables};
pub use data::model::{MetadataTable, Sequence, SequenceMeta, Tick, TickTable};
pub use data::schema::{FieldKind, SequenceField, TickField, TICK_FIELDS, TICK_FIELD_COUNT};
pub use data::store::{SequenceDataset, SequenceStore, StoreSubset};
pub use error::{Result, TraceError};
