use std::collections::BTreeSet;
use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

pub const DEFAULT_GROUP_COLUMN: &str = "Genre";
pub const DEFAULT_EVENT_POLL_TIME: u64 = 100;
pub const DEFAULT_STATUS_FADE_TIME: u64 = 5000;

pub const HELP_TEXT: &str = "\
o  Open a catalog file (csv, parquet, arrow)
r  Reload the current file
s  Show the catalog summary
b  Bar chart of the grouping column
p  Pie chart of the grouping column
g  Choose the grouping column
y  Copy summary / counts to the clipboard
?  Show this help
Esc  Close popup or chart
q  Quit";

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ShelfConfig {
    pub event_poll_time: u64,
    /// Milliseconds after which the status message is dimmed
    pub status_fade_time: u64,
    #[setters(into)]
    pub group_column: String,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            event_poll_time: DEFAULT_EVENT_POLL_TIME,
            status_fade_time: DEFAULT_STATUS_FADE_TIME,
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptMode {
    OpenFile,
    GroupColumn,
}

impl PromptMode {
    pub fn label(&self) -> &'static str {
        match self {
            PromptMode::OpenFile => "Open file: ",
            PromptMode::GroupColumn => "Group by column: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    OpenFile,
    Reload,
    Summary,
    BarChart,
    PieChart,
    GroupBy,
    Copy,
    Help,
    RawKey(KeyEvent),
}

/// Required columns that are absent from a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumnsError {
    pub missing: BTreeSet<String>,
}

impl fmt::Display for MissingColumnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .missing
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<String>>()
            .join(", ");
        if self.missing.len() == 1 {
            write!(f, "Column {names} not found in the file.")
        } else {
            write!(f, "Columns {names} not found in the file.")
        }
    }
}

impl std::error::Error for MissingColumnsError {}

#[derive(Debug)]
pub enum ShelfError {
    IoError(Error),
    PolarsError(PolarsError),
    CsvError(csv::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for ShelfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShelfError::IoError(e) => write!(f, "{e}"),
            ShelfError::PolarsError(e) => write!(f, "{e}"),
            ShelfError::CsvError(e) => write!(f, "{e}"),
            ShelfError::LoadingFailed(reason) => write!(f, "{reason}"),
            ShelfError::FileNotFound => write!(f, "File not found"),
            ShelfError::PermissionDenied => write!(f, "Permission denied"),
            ShelfError::UnknownFileType => write!(f, "Unknown file type"),
        }
    }
}

impl std::error::Error for ShelfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShelfError::IoError(e) => Some(e),
            ShelfError::PolarsError(e) => Some(e),
            ShelfError::CsvError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for ShelfError {
    fn from(err: Error) -> Self {
        ShelfError::IoError(err)
    }
}

impl From<PolarsError> for ShelfError {
    fn from(err: PolarsError) -> Self {
        ShelfError::PolarsError(err)
    }
}

impl From<csv::Error> for ShelfError {
    fn from(err: csv::Error) -> Self {
        ShelfError::CsvError(err)
    }
}
