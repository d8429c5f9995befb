use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};
use tracing_error::SpanTrace;

use crate::domain::{HELP_TEXT, Message, PromptMode, ShelfConfig, ShelfError};
use crate::inputter::{InputResult, Inputter};
use crate::stats::{self, FrequencyCount};
use crate::table::Table;

const NO_FILE_MESSAGE: &str = "Please select a file first!";

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    HOME,
    POPUP,
    PROMPT,
    CHART,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopupKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Popup {
    pub title: String,
    pub message: String,
    pub kind: PopupKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartKind {
    Bar,
    Pie,
}

#[derive(Debug, Clone)]
pub struct ChartView {
    pub kind: ChartKind,
    pub counts: FrequencyCount,
}

// The currently loaded file. Replaced as a whole on every successful load.
struct Session {
    path: PathBuf,
    table: Table,
}

pub struct UIData {
    pub name: String,
    pub columns: Vec<String>,
    pub nrows: usize,
    pub group_column: String,
    pub chart: Option<ChartView>,
    pub popup: Option<Popup>,
    pub prompt: Option<(PromptMode, InputResult)>,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            columns: Vec::new(),
            nrows: 0,
            group_column: String::new(),
            chart: None,
            popup: None,
            prompt: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: ShelfConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    session: Option<Session>,
    chart: Option<ChartView>,
    popup: Option<Popup>,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    prompt_mode: Option<PromptMode>,
    last_input: InputResult,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &ShelfConfig) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::HOME,
            previous_modus: Modus::HOME,
            session: None,
            chart: None,
            popup: None,
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            prompt_mode: None,
            last_input: InputResult::default(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message("Press 'o' to open a catalog file, '?' for help.");
        model.update_uidata();
        model
    }

    /// Load `path` and make it the current table. On failure the previous table stays.
    #[instrument(skip(self))]
    pub fn load_data_file(&mut self, path: PathBuf) -> Result<(), ShelfError> {
        let loaded = Table::load(path.clone())?;
        if loaded.table.is_empty() {
            warn!("{} holds no records", path.display());
        }

        let mut message = format!(
            "Loaded {} rows in {}ms",
            loaded.table.len(),
            loaded.duration.as_millis()
        );
        if !loaded.skipped.is_empty() {
            message.push_str(&format!(
                ", skipped {} malformed row(s)",
                loaded.skipped.len()
            ));
        }

        self.session = Some(Session {
            path,
            table: loaded.table,
        });
        self.set_status_message(message);
        self.refresh_chart();
        self.update_uidata();
        Ok(())
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::PROMPT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::HOME | Modus::CHART => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit => self.exit(),
                    Message::OpenFile => self.enter_prompt(PromptMode::OpenFile),
                    Message::GroupBy => self.enter_prompt(PromptMode::GroupColumn),
                    Message::Reload => self.reload(),
                    Message::Summary => self.show_summary(),
                    Message::BarChart => self.show_chart(ChartKind::Bar),
                    Message::PieChart => self.show_chart(ChartKind::Pie),
                    Message::Copy => self.copy_to_clipboard(),
                    Message::Help => self.show_help(),
                    Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit => self.exit(),
                    Message::Copy => self.copy_to_clipboard(),
                    _ => (),
                },
                Modus::PROMPT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
        self.update_uidata();
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::HOME => {}
            Modus::CHART => {
                self.chart = None;
                self.previous_modus = Modus::CHART;
                self.modus = Modus::HOME;
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.popup = None;
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::PROMPT => {}
        }
    }

    fn show_popup(&mut self, title: &str, message: String, kind: PopupKind) {
        if self.modus != Modus::POPUP {
            self.previous_modus = self.modus;
        }
        self.modus = Modus::POPUP;
        self.popup = Some(Popup {
            title: title.to_string(),
            message,
            kind,
        });
    }

    fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("Showing error: {message}");
        self.show_popup("Error", message, PopupKind::Error);
    }

    fn show_help(&mut self) {
        self.show_popup("Help", HELP_TEXT.to_string(), PopupKind::Info);
    }

    fn show_summary(&mut self) {
        let Some(session) = &self.session else {
            self.show_error(NO_FILE_MESSAGE);
            return;
        };
        match stats::compute_summary(&session.table) {
            Ok(summary) => {
                info!("Summary: {summary:?}");
                self.show_popup("Library Summary", summary.to_string(), PopupKind::Info);
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    fn show_chart(&mut self, kind: ChartKind) {
        let Some(session) = &self.session else {
            self.show_error(NO_FILE_MESSAGE);
            return;
        };
        match stats::compute_frequency(&session.table, &self.config.group_column) {
            Ok(counts) => {
                debug!(
                    "{} categories in column {}",
                    counts.len(),
                    self.config.group_column
                );
                self.chart = Some(ChartView { kind, counts });
                self.modus = Modus::CHART;
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    // Recompute an open chart after the table or the grouping column changed.
    fn refresh_chart(&mut self) {
        if let Some(kind) = self.chart.take().map(|c| c.kind) {
            if self.modus == Modus::CHART {
                self.modus = Modus::HOME;
            }
            self.show_chart(kind);
        }
    }

    fn open_file(&mut self, path: PathBuf) {
        if let Err(e) = self.load_data_file(path.clone()) {
            error!(
                "Loading {} failed: {e}\n{}",
                path.display(),
                SpanTrace::capture()
            );
            self.show_error(format!("Failed to read file: {e}"));
        }
    }

    fn reload(&mut self) {
        match self.session.as_ref().map(|s| s.path.clone()) {
            Some(path) => self.open_file(path),
            None => self.show_error(NO_FILE_MESSAGE),
        }
    }

    fn set_group_column(&mut self, column: &str) {
        let column = column.trim();
        if column.is_empty() {
            return;
        }
        info!("Grouping by column {column}");
        self.config.group_column = column.to_string();
        self.set_status_message(format!("Grouping by '{column}'"));
        self.refresh_chart();
    }

    fn enter_prompt(&mut self, mode: PromptMode) {
        trace!("Entering prompt {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::PROMPT;
        self.prompt_mode = Some(mode);

        self.input.clear();
        match mode {
            PromptMode::OpenFile => {
                if let Some(session) = &self.session {
                    self.input.set(&session.path.to_string_lossy());
                }
            }
            PromptMode::GroupColumn => self.input.set(&self.config.group_column),
        }
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_prompt_input();
        }
    }

    fn handle_prompt_input(&mut self) {
        trace!("Handle prompt input {}", self.last_input.input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::PROMPT;
        let mode = self.prompt_mode.take();

        if self.last_input.canceled {
            return;
        }
        let input = self.last_input.input.clone();
        match mode {
            Some(PromptMode::OpenFile) => match shellexpand::full(input.trim()) {
                Ok(path) if path.is_empty() => {}
                Ok(path) => self.open_file(PathBuf::from(path.as_ref())),
                Err(e) => self.show_error(format!("Failed to read file: {e}")),
            },
            Some(PromptMode::GroupColumn) => self.set_group_column(&input),
            None => warn!("Prompt input without prompt mode!"),
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn clipboard_content(&self) -> Option<String> {
        match self.modus {
            Modus::POPUP => self.popup.as_ref().map(|p| p.message.clone()),
            Modus::CHART => self.chart.as_ref().map(|chart| {
                let header = Model::wrap_cell_content(&chart.counts.column);
                let mut lines = vec![format!("{header},count")];
                lines.extend(chart.counts.iter().map(|(category, count)| {
                    let label = Model::wrap_cell_content(&category.to_string());
                    format!("{label},{count}")
                }));
                lines.join("\n")
            }),
            _ => None,
        }
    }

    fn copy_to_clipboard(&mut self) {
        let Some(content) = self.clipboard_content() else {
            self.set_status_message("Nothing to copy");
            return;
        };
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard is not available: {e:?}");
                    self.set_status_message("Clipboard is not available");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => {
                    trace!("Copied content to clipboard.");
                    self.set_status_message("Copied to clipboard");
                }
                Err(e) => {
                    trace!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copying to clipboard failed");
                }
            }
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn update_uidata(&mut self) {
        let (name, columns, nrows) = match &self.session {
            Some(session) => (
                session
                    .path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("???")
                    .to_string(),
                session
                    .table
                    .column_names()
                    .into_iter()
                    .map(String::from)
                    .collect(),
                session.table.len(),
            ),
            None => (String::new(), Vec::new(), 0),
        };
        let prompt = match (self.modus, self.prompt_mode) {
            (Modus::PROMPT, Some(mode)) => Some((mode, self.last_input.clone())),
            _ => None,
        };
        self.uidata = UIData {
            name,
            columns,
            nrows,
            group_column: self.config.group_column.clone(),
            chart: self.chart.clone(),
            popup: self.popup.clone(),
            prompt,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Category;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    fn loaded_model(name: &str) -> Model {
        let mut model = Model::init(&ShelfConfig::default());
        model.load_data_file(fixture(name)).unwrap();
        model
    }

    fn type_line(model: &mut Model, line: &str) {
        for c in line.chars() {
            model.update(Some(Message::RawKey(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            ))));
        }
        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Enter,
            KeyModifiers::NONE,
        ))));
    }

    fn popup(model: &Model) -> &Popup {
        model.get_uidata().popup.as_ref().unwrap()
    }

    #[test]
    fn operations_need_a_file() {
        let mut model = Model::init(&ShelfConfig::default());
        for msg in [Message::Summary, Message::BarChart, Message::PieChart] {
            model.update(Some(msg));
            let p = popup(&model);
            assert_eq!(p.kind, PopupKind::Error);
            assert_eq!(p.message, NO_FILE_MESSAGE);
            model.update(Some(Message::Exit));
            assert!(model.get_uidata().popup.is_none());
        }
    }

    #[test]
    fn summary_popup() {
        let mut model = loaded_model("books.csv");
        assert_eq!(model.get_uidata().nrows, 8);
        assert_eq!(model.get_uidata().name, "books.csv");
        model.update(Some(Message::Summary));
        let p = popup(&model);
        assert_eq!(p.kind, PopupKind::Info);
        assert_eq!(
            p.message,
            "Total Books: 8\nUnique Genres: 3\nUnique Authors: 6"
        );
    }

    #[test]
    fn missing_columns_are_reported() {
        let mut model = loaded_model("no_author.csv");
        model.update(Some(Message::Summary));
        let p = popup(&model);
        assert_eq!(p.kind, PopupKind::Error);
        assert_eq!(p.message, "Column 'Author' not found in the file.");
        assert!(model.get_uidata().chart.is_none());
    }

    #[test]
    fn bar_and_pie_charts() {
        let mut model = loaded_model("books.csv");
        model.update(Some(Message::BarChart));
        let chart = model.get_uidata().chart.clone().unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        let counts: Vec<(Category, usize)> = chart.counts.iter().cloned().collect();
        assert_eq!(
            counts,
            vec![
                (Category::Value("SciFi".into()), 3),
                (Category::Value("Fantasy".into()), 3),
                (Category::Value("Romance".into()), 1),
                (Category::Missing, 1),
            ]
        );

        model.update(Some(Message::PieChart));
        assert_eq!(
            model.get_uidata().chart.as_ref().unwrap().kind,
            ChartKind::Pie
        );

        model.update(Some(Message::Exit));
        assert!(model.get_uidata().chart.is_none());
    }

    #[test]
    fn group_by_prompt_regroups_open_chart() {
        let mut model = loaded_model("books.csv");
        model.update(Some(Message::BarChart));
        model.update(Some(Message::GroupBy));
        assert!(model.raw_keyevents());
        let (mode, input) = model.get_uidata().prompt.clone().unwrap();
        assert_eq!(mode, PromptMode::GroupColumn);
        assert_eq!(input.input, "Genre");

        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Char('u'),
            KeyModifiers::CONTROL,
        ))));
        type_line(&mut model, "Author");
        assert!(!model.raw_keyevents());
        let chart = model.get_uidata().chart.clone().unwrap();
        assert_eq!(chart.counts.column, "Author");
        assert_eq!(chart.counts.len(), 6);
        assert_eq!(model.get_uidata().group_column, "Author");
    }

    #[test]
    fn group_by_unknown_column_closes_chart() {
        let mut model = loaded_model("books.csv");
        model.update(Some(Message::PieChart));
        model.update(Some(Message::GroupBy));
        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Char('u'),
            KeyModifiers::CONTROL,
        ))));
        type_line(&mut model, "Publisher");
        assert_eq!(
            popup(&model).message,
            "Column 'Publisher' not found in the file."
        );
        assert!(model.get_uidata().chart.is_none());
        model.update(Some(Message::Exit));
        assert!(model.get_uidata().popup.is_none());
    }

    #[test]
    fn open_file_prompt() {
        let mut model = Model::init(&ShelfConfig::default());
        model.update(Some(Message::OpenFile));
        type_line(&mut model, &fixture("malformed.csv").to_string_lossy());
        assert_eq!(model.get_uidata().nrows, 3);
        assert!(model.get_uidata().popup.is_none());
        assert!(
            model
                .get_uidata()
                .status_message
                .ends_with("skipped 1 malformed row(s)")
        );
    }

    #[test]
    fn failed_load_keeps_previous_table() {
        let mut model = loaded_model("books.csv");
        model.update(Some(Message::OpenFile));
        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Char('u'),
            KeyModifiers::CONTROL,
        ))));
        type_line(&mut model, &fixture("missing.csv").to_string_lossy());
        let p = popup(&model);
        assert_eq!(p.message, "Failed to read file: File not found");
        assert_eq!(model.get_uidata().nrows, 8);
        assert_eq!(model.get_uidata().name, "books.csv");
    }

    #[test]
    fn empty_file() {
        let mut model = loaded_model("empty.csv");
        model.update(Some(Message::Summary));
        assert_eq!(
            popup(&model).message,
            "Total Books: 0\nUnique Genres: 0\nUnique Authors: 0"
        );
        model.update(Some(Message::Exit));
        model.update(Some(Message::BarChart));
        assert!(model.get_uidata().chart.as_ref().unwrap().counts.is_empty());
    }

    #[test]
    fn quit() {
        let mut model = Model::init(&ShelfConfig::default());
        model.update(Some(Message::Quit));
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn chart_clipboard_content() {
        let mut model = loaded_model("books.csv");
        assert!(model.clipboard_content().is_none());
        model.update(Some(Message::BarChart));
        assert_eq!(
            model.clipboard_content().unwrap(),
            "Genre,count\nSciFi,3\nFantasy,3\nRomance,1\n(unknown),1"
        );
    }
}
