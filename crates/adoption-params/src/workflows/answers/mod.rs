//! Read side of the derivation: raw answer counts keyed by response code and
//! country.

mod distribution;
mod normalizer;
mod parser;

pub use distribution::{AnswerDistribution, DistributionError};

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Source of answer distributions. Implementations must be safe to share
/// across threads; the derivation only ever reads through `&self`.
pub trait AnswerStore: Send + Sync {
    fn fetch_distribution(
        &self,
        response_code: &str,
        country: &str,
    ) -> Result<AnswerDistribution, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no answers stored for response code '{code}'")]
    MissingResponseCode { code: String },
    #[error("response code '{code}' has no column for country '{country}'")]
    MissingCountry { code: String, country: String },
    #[error("answer table '{code}' is malformed: {detail}")]
    MalformedTable { code: String, detail: String },
    #[error("answer table '{code}' row {row} has an invalid count '{value}' for {country}")]
    InvalidCount {
        code: String,
        country: String,
        row: usize,
        value: String,
    },
    #[error("table '{name}' could not be written: {detail}")]
    Rejected { name: String, detail: String },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// All countries' answer counts for a single response code.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerTable {
    response_code: String,
    levels: Vec<String>,
    countries: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl AnswerTable {
    pub fn new(
        response_code: impl Into<String>,
        levels: Vec<String>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, StoreError> {
        let response_code = response_code.into();
        let (countries, columns): (Vec<_>, Vec<_>) = columns.into_iter().unzip();

        if let Some((country, column)) = countries
            .iter()
            .zip(&columns)
            .find(|(_, column)| column.len() != levels.len())
        {
            return Err(StoreError::MalformedTable {
                code: response_code,
                detail: format!(
                    "column '{country}' has {} cells for {} levels",
                    column.len(),
                    levels.len()
                ),
            });
        }

        Ok(Self {
            response_code,
            levels,
            countries,
            columns,
        })
    }

    pub fn from_reader<R: Read>(response_code: &str, reader: R) -> Result<Self, StoreError> {
        parser::parse_answer_table(response_code, reader)
    }

    pub fn response_code(&self) -> &str {
        &self.response_code
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn distribution(&self, country: &str) -> Result<AnswerDistribution, StoreError> {
        let column = self
            .countries
            .iter()
            .position(|candidate| candidate == country)
            .ok_or_else(|| StoreError::MissingCountry {
                code: self.response_code.clone(),
                country: country.to_string(),
            })?;

        Ok(AnswerDistribution::new(
            self.response_code.clone(),
            country,
            self.levels.clone(),
            self.columns[column].clone(),
        ))
    }
}

/// Answer tables held in memory, keyed by response code.
#[derive(Debug, Default, Clone)]
pub struct MemoryAnswerStore {
    tables: HashMap<String, AnswerTable>,
}

impl MemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: AnswerTable) -> &mut Self {
        self.tables.insert(table.response_code.clone(), table);
        self
    }

    /// Parses CSV text for one response code and stores it.
    pub fn insert_csv(&mut self, response_code: &str, csv: &str) -> Result<&mut Self, StoreError> {
        let table = AnswerTable::from_reader(response_code, csv.as_bytes())?;
        Ok(self.insert(table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl AnswerStore for MemoryAnswerStore {
    fn fetch_distribution(
        &self,
        response_code: &str,
        country: &str,
    ) -> Result<AnswerDistribution, StoreError> {
        self.tables
            .get(response_code)
            .ok_or_else(|| StoreError::MissingResponseCode {
                code: response_code.to_string(),
            })?
            .distribution(country)
    }
}

/// Directory of `{response_code}.csv` answer tables, parsed on first use.
#[derive(Debug)]
pub struct CsvAnswerStore {
    root: PathBuf,
    cache: Mutex<HashMap<String, Arc<AnswerTable>>>,
}

impl CsvAnswerStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(StoreError::Io {
                path: root,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "answer store root is not a directory",
                ),
            });
        }

        Ok(Self {
            root,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table(&self, response_code: &str) -> Result<Arc<AnswerTable>, StoreError> {
        let mut cache = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(table) = cache.get(response_code) {
            return Ok(Arc::clone(table));
        }

        let path = self.root.join(format!("{response_code}.csv"));
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::MissingResponseCode {
                    code: response_code.to_string(),
                })
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let table = Arc::new(AnswerTable::from_reader(response_code, file)?);
        debug!(response_code, path = %path.display(), "loaded answer table");
        cache.insert(response_code.to_string(), Arc::clone(&table));
        Ok(table)
    }
}

impl AnswerStore for CsvAnswerStore {
    fn fetch_distribution(
        &self,
        response_code: &str,
        country: &str,
    ) -> Result<AnswerDistribution, StoreError> {
        self.table(response_code)?.distribution(country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_serves_parsed_tables() {
        let mut store = MemoryAnswerStore::new();
        store
            .insert_csv("users_Q1", "Answer,Netherlands\nNo,4\nYes,6\nTotal,10\n")
            .expect("parses");

        let distribution = store
            .fetch_distribution("users_Q1", "Netherlands")
            .expect("distribution");
        assert_eq!(distribution.counts(), &[4.0, 6.0, 10.0]);
        assert_eq!(distribution.response_code(), "users_Q1");
    }

    #[test]
    fn memory_store_reports_missing_keys() {
        let mut store = MemoryAnswerStore::new();
        store
            .insert_csv("users_Q1", "Answer,Netherlands\nYes,6\nTotal,6\n")
            .expect("parses");

        assert!(matches!(
            store.fetch_distribution("users_Q2", "Netherlands"),
            Err(StoreError::MissingResponseCode { code }) if code == "users_Q2"
        ));
        assert!(matches!(
            store.fetch_distribution("users_Q1", "Spain"),
            Err(StoreError::MissingCountry { country, .. }) if country == "Spain"
        ));
    }

    #[test]
    fn answer_table_rejects_ragged_columns() {
        let error = AnswerTable::new(
            "users_Q1",
            vec!["Yes".into(), "Total".into()],
            vec![("Netherlands".into(), vec![1.0])],
        )
        .expect_err("ragged");
        assert!(matches!(error, StoreError::MalformedTable { .. }));
    }

    #[test]
    fn csv_store_open_requires_directory() {
        let error = CsvAnswerStore::open("./does-not-exist").expect_err("missing dir");
        assert!(matches!(error, StoreError::Io { .. }));
    }
}
