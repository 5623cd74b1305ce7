use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Planner statistics for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStats {
    name: String,
    rows: f64,
    width: i32,
    columns: Vec<String>,
    indexed: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Rc<TableStats>>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid table {table}: {reason}")]
    Invalid { table: String, reason: String },
}

/// One line of a catalog CSV file. List columns are `;`-separated.
#[derive(Deserialize)]
struct TableRecord {
    name: String,
    rows: f64,
    width: i32,
    columns: String,
    #[serde(default)]
    indexed: String,
}

impl TableStats {
    pub fn new(name: &str, rows: f64, width: i32, columns: &[&str], indexed: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            rows,
            width,
            columns: columns.iter().map(|col| col.to_string()).collect(),
            indexed: indexed.iter().map(|col| col.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> f64 {
        self.rows
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|col| col == column)
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexed.iter().any(|col| col == column)
    }
}

impl TryFrom<TableRecord> for TableStats {
    type Error = CatalogError;

    fn try_from(record: TableRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| CatalogError::Invalid {
            table: record.name.clone(),
            reason: reason.to_string(),
        };
        if record.name.is_empty() {
            return Err(invalid("empty table name"));
        }
        if !(record.rows >= 0.) {
            return Err(invalid("row count must be non-negative"));
        }
        if record.width <= 0 {
            return Err(invalid("width must be positive"));
        }

        let split = |list: &str| -> Vec<String> {
            list.split(';')
                .map(|col| col.trim())
                .filter(|col| !col.is_empty())
                .map(|col| col.to_string())
                .collect()
        };
        let columns = split(&record.columns);
        let indexed = split(&record.indexed);
        if columns.is_empty() {
            return Err(invalid("no columns"));
        }
        if let Some(col) = indexed.iter().find(|col| !columns.contains(col)) {
            return Err(invalid(&format!("indexed column {} does not exist", col)));
        }

        Ok(Self {
            name: record.name,
            rows: record.rows,
            width: record.width,
            columns,
            indexed,
        })
    }
}

impl Catalog {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_csv(path: &Path) -> Result<Self, CatalogError> {
        Self::from_reader(File::open(path)?)
    }

    /// Reads `name,rows,width,columns,indexed` records, with a header line.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut catalog = Self::new();
        for record in reader.deserialize::<TableRecord>() {
            let table = TableStats::try_from(record?)?;
            log::debug!("loaded table {} ({} rows)", table.name, table.rows);
            catalog.insert(table);
        }
        Ok(catalog)
    }

    pub fn with_table(mut self, table: TableStats) -> Self {
        self.insert(table);
        self
    }

    pub fn insert(&mut self, table: TableStats) {
        self.tables.insert(table.name.clone(), Rc::new(table));
    }

    pub fn get_table(&self, table_name: &str) -> Option<&Rc<TableStats>> {
        self.tables.get(table_name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "name,rows,width,columns,indexed\n\
             users, 1000, 32, id;name;email, id\n\
             events,250000,24,id;user_id;kind,\n"
        )
        .unwrap();

        let catalog = Catalog::from_csv(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let users = catalog.get_table("users").unwrap();
        assert_eq!(users.rows(), 1000.);
        assert_eq!(users.width(), 32);
        assert_eq!(users.columns(), ["id", "name", "email"]);
        assert!(users.is_indexed("id"));
        assert!(!users.is_indexed("email"));

        let events = catalog.get_table("events").unwrap();
        assert!(events.has_column("user_id"));
        assert!(!events.is_indexed("id"));
    }

    #[test]
    fn test_invalid_records() {
        let err = Catalog::from_reader("name,rows,width,columns,indexed\nt,10,0,a,\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Invalid { .. }));

        let err = Catalog::from_reader("name,rows,width,columns,indexed\nt,10,4,a,b\n".as_bytes())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid table t: indexed column b does not exist"
        );

        let err = Catalog::from_reader("name,rows,width,columns,indexed\nt,lots,4,a,\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Csv(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::from_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
