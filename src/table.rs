use polars::prelude::*;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};

use crate::domain::ShelfError;

// Cell contents the loader reads as missing values.
const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: Vec<Option<String>>,
}

impl Column {
    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.data.iter().map(|v| v.as_deref())
    }
}

/// In-memory table, stored column major. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    nrows: usize,
}

/// A single record of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    idx: usize,
}

impl<'a> Row<'a> {
    /// Cell value of `column`, `None` if the column is unknown or the cell is missing.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column(column)
            .and_then(|c| c.data[self.idx].as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug)]
pub struct LoadedTable {
    pub table: Table,
    pub skipped: Vec<SkippedRow>,
    pub duration: Duration,
}

impl Table {
    /// Build a table from a header and row records. Short records are padded with missing
    /// cells, surplus cells are dropped.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<Option<String>>>) -> Self {
        let nrows = records.len();
        let mut data: Vec<Vec<Option<String>>> =
            headers.iter().map(|_| Vec::with_capacity(nrows)).collect();
        for record in records {
            let mut cells = record.into_iter();
            for column in data.iter_mut() {
                column.push(cells.next().flatten());
            }
        }
        let columns = headers
            .into_iter()
            .zip(data)
            .map(|(name, data)| Column { name, data })
            .collect();
        Table { columns, nrows }
    }

    pub fn len(&self) -> usize {
        self.nrows
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        (idx < self.nrows).then_some(Row { table: self, idx })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.nrows).map(|idx| Row { table: self, idx })
    }

    #[instrument]
    pub fn load(path: PathBuf) -> Result<LoadedTable, ShelfError> {
        let file_info = Table::get_file_info(path)?;
        debug!(
            "Loading {:?} file of {} bytes",
            file_info.file_type, file_info.file_size
        );
        let start_time = Instant::now();
        let (table, skipped) = match file_info.file_type {
            FileType::CSV => Table::load_csv(&file_info.path)?,
            FileType::PARQUET => (
                Table::from_frame(Table::load_parquet(&file_info.path)?)?,
                Vec::new(),
            ),
            FileType::ARROW => (
                Table::from_frame(Table::load_arrow(&file_info.path)?)?,
                Vec::new(),
            ),
        };
        let duration = start_time.elapsed();

        info!(
            "Loaded {} rows in {}ms, columns: {:?}",
            table.len(),
            duration.as_millis(),
            table.column_names()
        );
        for s in skipped.iter() {
            warn!("Skipped line {}: {}", s.line, s.reason);
        }

        Ok(LoadedTable {
            table,
            skipped,
            duration,
        })
    }

    fn detect_file_type(path: &Path) -> Result<FileType, ShelfError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(ShelfError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, ShelfError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ShelfError::FileNotFound,
            ErrorKind::PermissionDenied => ShelfError::PermissionDenied,
            _ => ShelfError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(ShelfError::LoadingFailed("Not a file!".into()));
        }

        let file_type = Table::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }

    fn read_cell(value: &str) -> Option<String> {
        if MISSING_MARKERS.contains(&value) {
            None
        } else {
            Some(value.to_string())
        }
    }

    // Repeated header names get a ".1", ".2", ... suffix, counted per original header.
    fn unique_headers(headers: &csv::StringRecord) -> Vec<String> {
        let mut suffixes: HashMap<&str, usize> = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        let mut names = Vec::with_capacity(headers.len());
        for header in headers.iter() {
            let mut name = header.to_string();
            if taken.contains(&name) {
                let n = suffixes.entry(header).or_insert(0);
                loop {
                    *n += 1;
                    name = format!("{header}.{n}");
                    if !taken.contains(&name) {
                        break;
                    }
                }
            }
            taken.insert(name.clone());
            names.push(name);
        }
        names
    }

    fn load_csv(path: &Path) -> Result<(Table, Vec<SkippedRow>), ShelfError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let headers = Table::unique_headers(reader.headers()?);
        Ok(Table::read_records(headers, reader.records()))
    }

    fn read_records(
        headers: Vec<String>,
        records: impl Iterator<Item = Result<csv::StringRecord, csv::Error>>,
    ) -> (Table, Vec<SkippedRow>) {
        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for result in records {
            match result {
                Ok(record) if record.len() > headers.len() => {
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    skipped.push(SkippedRow {
                        line,
                        reason: format!("Expected {} fields, saw {}", headers.len(), record.len()),
                    });
                }
                Ok(record) => {
                    rows.push(record.iter().map(Table::read_cell).collect());
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    trace!("Unreadable record: {e}");
                    skipped.push(SkippedRow {
                        line,
                        reason: e.to_string(),
                    });
                }
            }
        }
        (Table::from_records(headers, rows), skipped)
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }

    // Each column is converted to text in its own thread.
    fn from_frame(frame: LazyFrame) -> Result<Table, PolarsError> {
        let df = frame.collect()?;
        let columns: Result<Vec<Column>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Table::load_column(&df, name))
            .collect();
        Ok(Table {
            columns: columns?,
            nrows: df.height(),
        })
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let data = series
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect();
        Ok(Column {
            name: col_name.to_string(),
            data,
        })
    }
}
