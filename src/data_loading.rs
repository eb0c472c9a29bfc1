use anyhow::{bail, Context, Result};
use csv::StringRecord;
use log::{info, warn};
use std::fs::File;
use std::path::Path;

/// A CSV source held as untyped strings, addressed by header name.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<StringRecord>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Every value of `name`, or `None` when the column is missing.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(""))
                .collect(),
        )
    }

    /// Replace every cell of an existing column.
    pub fn replace_column(&mut self, name: &str, values: Vec<String>) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            let mut rebuilt = StringRecord::with_capacity(row.as_slice().len(), row.len());
            for (i, field) in row.iter().enumerate() {
                if i == idx {
                    rebuilt.push_field(&value);
                } else {
                    rebuilt.push_field(field);
                }
            }
            *row = rebuilt;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of loading one source: the table, or why it is absent.
#[derive(Debug)]
pub enum SourceLoad {
    Loaded(RawTable),
    Missing,
    Unreadable(String),
}

impl SourceLoad {
    pub fn table(&self) -> Option<&RawTable> {
        match self {
            SourceLoad::Loaded(table) => Some(table),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<RawTable> {
        match self {
            SourceLoad::Loaded(table) => Some(table),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            SourceLoad::Loaded(_) => "loaded",
            SourceLoad::Missing => "missing",
            SourceLoad::Unreadable(_) => "unreadable",
        }
    }
}

pub fn read_csv_file(path: &Path) -> Result<RawTable> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("{} has no header row", path.display());
    }

    // Short rows are padded with empty cells; rows wider than the header are rejected.
    let mut rows = Vec::new();
    for record in rdr.records() {
        let mut record =
            record.with_context(|| format!("Malformed CSV data in {}", path.display()))?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            bail!(
                "{} line {}: {} fields, header has {}",
                path.display(),
                line,
                record.len(),
                headers.len()
            );
        }
        while record.len() < headers.len() {
            record.push_field("");
        }
        rows.push(record);
    }

    Ok(RawTable::new(headers, rows))
}

/// Load a source, logging and returning an absent result instead of failing.
pub fn load_source(name: &str, path: &Path) -> SourceLoad {
    if !path.exists() {
        warn!("Missing file: {}", path.display());
        warn!("{} not loaded", name);
        return SourceLoad::Missing;
    }

    match read_csv_file(path) {
        Ok(table) => {
            info!("Loaded {}: {} rows from {}", name, table.len(), path.display());
            SourceLoad::Loaded(table)
        }
        Err(e) => {
            warn!("Failed to read {}: {:#}", path.display(), e);
            warn!("{} not loaded", name);
            SourceLoad::Unreadable(format!("{:#}", e))
        }
    }
}
