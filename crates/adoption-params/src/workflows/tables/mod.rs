//! Write side of the derivation: named tables and the sinks that persist
//! them.

mod naming;

pub use naming::{pair_label, TableKey};

use crate::workflows::answers::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// A derived table: labelled index cells followed by numeric value cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub index_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub index: Vec<String>,
    pub values: Vec<f64>,
}

impl Table {
    pub fn new<I, V>(name: impl Into<String>, index_columns: I, value_columns: V) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            name: name.into(),
            index_columns: index_columns.into_iter().map(Into::into).collect(),
            value_columns: value_columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, index: Vec<String>, values: Vec<f64>) {
        debug_assert_eq!(index.len(), self.index_columns.len());
        debug_assert_eq!(values.len(), self.value_columns.len());
        self.rows.push(TableRow { index, values });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: &[&str]) -> Option<&TableRow> {
        self.rows.iter().find(|row| {
            row.index.len() == index.len()
                && row.index.iter().zip(index).all(|(cell, wanted)| cell == wanted)
        })
    }

    pub fn value(&self, index: &[&str], column: &str) -> Option<f64> {
        let position = self.value_columns.iter().position(|name| name == column)?;
        self.row(index).map(|row| row.values[position])
    }
}

/// Destination for derived tables. Each call replaces any previous table of
/// the same name in full.
pub trait TableSink: Send + Sync {
    fn save_table(&self, table: &Table) -> Result<(), StoreError>;
}

/// Keeps tables in memory; used by the HTTP surface and tests.
#[derive(Debug, Default)]
pub struct MemoryTableSink {
    tables: Mutex<BTreeMap<String, Table>>,
}

impl MemoryTableSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Table> {
        self.tables.lock().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables
            .lock()
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn into_tables(self) -> Result<Vec<Table>, StoreError> {
        let tables = self.tables.into_inner().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.into_values().collect())
    }
}

impl TableSink for MemoryTableSink {
    fn save_table(&self, table: &Table) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        tables.insert(table.name.clone(), table.clone());
        Ok(())
    }
}

/// Writes each table to `{output_folder}/{group}/{name}.csv`.
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    destination: PathBuf,
}

impl CsvTableSink {
    pub fn create<P: AsRef<Path>>(output_folder: P, group: &str) -> Result<Self, StoreError> {
        let destination = output_folder.as_ref().join(group);
        std::fs::create_dir_all(&destination).map_err(|source| StoreError::Io {
            path: destination.clone(),
            source,
        })?;
        Ok(Self { destination })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.destination.join(format!("{name}.csv"))
    }

    /// Reads a table back, treating the first `index_width` columns as index.
    pub fn read_table(&self, name: &str, index_width: usize) -> Result<Table, StoreError> {
        let path = self.table_path(name);
        let file = std::fs::File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let headers = reader.headers()?.clone();
        if headers.len() < index_width {
            return Err(StoreError::MalformedTable {
                code: name.to_string(),
                detail: format!("expected at least {index_width} index columns"),
            });
        }

        let mut table = Table::new(
            name,
            headers.iter().take(index_width),
            headers.iter().skip(index_width),
        );

        for (row_index, record) in reader.records().enumerate() {
            let record = record?;
            let index = record.iter().take(index_width).map(str::to_string).collect();
            let values = record
                .iter()
                .skip(index_width)
                .zip(&table.value_columns)
                .map(|(raw, column)| {
                    raw.parse::<f64>().map_err(|_| StoreError::InvalidCount {
                        code: name.to_string(),
                        country: column.clone(),
                        row: row_index + 1,
                        value: raw.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            table.rows.push(TableRow { index, values });
        }

        Ok(table)
    }
}

impl TableSink for CsvTableSink {
    fn save_table(&self, table: &Table) -> Result<(), StoreError> {
        if table.name.is_empty()
            || table.name.contains(['/', '\\'])
            || table.name.starts_with('.')
        {
            return Err(StoreError::Rejected {
                name: table.name.clone(),
                detail: "table names must be plain file names".to_string(),
            });
        }

        let path = self.table_path(&table.name);
        let staging = self.destination.join(format!(".{}.csv.partial", table.name));
        let io_error = |source: std::io::Error| StoreError::Io {
            path: staging.clone(),
            source,
        };

        {
            let mut writer = csv::Writer::from_path(&staging)?;
            writer.write_record(table.index_columns.iter().chain(&table.value_columns))?;
            for row in &table.rows {
                let values = row.values.iter().map(|value| value.to_string());
                writer.write_record(row.index.iter().cloned().chain(values))?;
            }
            writer.flush().map_err(io_error)?;
        }

        std::fs::rename(&staging, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(table = %table.name, rows = table.rows.len(), path = %path.display(), "table written");
        Ok(())
    }
}
