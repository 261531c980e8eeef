use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};

// ---------------------------------------------------------------------------
// Loader configuration
// ---------------------------------------------------------------------------

/// Physical format of the columnar table pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnarFormat {
    /// Arrow IPC file format, read through a memory map.
    #[default]
    Arrow,
    Parquet,
}

impl ColumnarFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ColumnarFormat::Arrow => "arrow",
            ColumnarFormat::Parquet => "parquet",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "arrow" | "ipc" | "feather" => Some(ColumnarFormat::Arrow),
            "parquet" | "pq" => Some(ColumnarFormat::Parquet),
            _ => None,
        }
    }
}

/// How rows of one sequence are ordered in the per-tick table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOrder {
    /// Use the `tick` column when the table has one, otherwise row order.
    #[default]
    SortByTickColumn,
    /// Trust the writer's row order.
    Emission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub format: ColumnarFormat,
    pub tick_order: TickOrder,
    /// Name of the packed file inside a data directory.
    pub packed_file_name: String,
    /// Sequences shorter than this are left out of the store.
    pub min_ticks: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            format: ColumnarFormat::Arrow,
            tick_order: TickOrder::SortByTickColumn,
            packed_file_name: "all_sequences.msgpack".to_string(),
            min_ticks: 1,
        }
    }
}

impl LoaderConfig {
    /// Read a JSON config; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TraceError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| TraceError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn sequences_file(&self, dir: &Path) -> PathBuf {
        dir.join(format!("sequences.{}", self.format.extension()))
    }

    pub fn ticks_file(&self, dir: &Path) -> PathBuf {
        dir.join(format!("ticks.{}", self.format.extension()))
    }
}

// ---------------------------------------------------------------------------
// Data source
// ---------------------------------------------------------------------------

/// Where a store is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Directory holding `sequences.<ext>` and `ticks.<ext>`.
    Columnar { dir: PathBuf },
    /// A single msgpack file.
    Packed { file: PathBuf },
}

impl DataSource {
    /// Pick a backend from a path: directories are columnar, `.msgpack` /
    /// `.mpk` files are packed, and a table file means its directory.
    /// Returns the format implied by a table file's extension, if any.
    pub fn detect(path: &Path) -> (DataSource, Option<ColumnarFormat>) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        if path.is_dir() {
            return (
                DataSource::Columnar {
                    dir: path.to_path_buf(),
                },
                None,
            );
        }
        match ext.as_str() {
            "msgpack" | "mpk" => (
                DataSource::Packed {
                    file: path.to_path_buf(),
                },
                None,
            ),
            other => {
                let dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                match ColumnarFormat::from_extension(other) {
                    Some(format) => (DataSource::Columnar { dir }, Some(format)),
                    // Nonexistent directory: let the loader report the missing files.
                    None => (
                        DataSource::Columnar {
                            dir: path.to_path_buf(),
                        },
                        None,
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LoaderConfig::default();
        assert_eq!(cfg.format, ColumnarFormat::Arrow);
        assert_eq!(cfg.tick_order, TickOrder::SortByTickColumn);
        assert_eq!(
            cfg.sequences_file(Path::new("data/out")),
            PathBuf::from("data/out/sequences.arrow")
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: LoaderConfig =
            serde_json::from_str(r#"{ "format": "parquet", "min_ticks": 100 }"#).unwrap();
        assert_eq!(cfg.format, ColumnarFormat::Parquet);
        assert_eq!(cfg.min_ticks, 100);
        assert_eq!(cfg.packed_file_name, "all_sequences.msgpack");
        assert_eq!(
            cfg.ticks_file(Path::new("d")),
            PathBuf::from("d/ticks.parquet")
        );
    }

    #[test]
    fn missing_config_file() {
        let err = LoaderConfig::from_json_file(Path::new("/nonexistent/loader.json")).unwrap_err();
        assert!(matches!(err, TraceError::MissingFile { .. }));
    }

    #[test]
    fn detect_by_extension() {
        let (src, fmt) = DataSource::detect(Path::new("data/out/all_sequences.msgpack"));
        assert_eq!(
            src,
            DataSource::Packed {
                file: PathBuf::from("data/out/all_sequences.msgpack")
            }
        );
        assert_eq!(fmt, None);

        let (src, fmt) = DataSource::detect(Path::new("data/out/ticks.parquet"));
        assert_eq!(
            src,
            DataSource::Columnar {
                dir: PathBuf::from("data/out")
            }
        );
        assert_eq!(fmt, Some(ColumnarFormat::Parquet));
    }
}
