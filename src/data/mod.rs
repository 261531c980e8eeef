//! Data layer: schema, loading, storage, batching, and querying.
//!
//! Architecture:
//! ```text
//!  sequences.arrow + ticks.arrow    all_sequences.msgpack
//!        (or .parquet)                    │
//!              │                          │
//!              ▼                          ▼
//!         ┌──────────┐              ┌──────────┐
//!         │  loader   │  columnar    │  loader   │  packed
//!         └──────────┘              └──────────┘
//!              │   validated Sequences    │
//!              └────────────┬─────────────┘
//!                           ▼
//!                  ┌───────────────┐
//!                  │ SequenceStore  │  Vec<Sequence>, max_length
//!                  └───────────────┘
//!                     │          │
//!                     ▼          ▼
//!              ┌──────────┐  ┌──────────┐
//!              │ collate   │  │  filter   │
//!              └──────────┘  └──────────┘
//!           padded batches    map counts, id selection
//!
//!  SequenceStore ──► writer ──► .arrow / .parquet / .msgpack / meta.csv
//! ```
pub mod collate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod store;
pub mod writer;
