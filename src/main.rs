use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use shelfview::controller::Controller;
use shelfview::domain::{DEFAULT_EVENT_POLL_TIME, DEFAULT_GROUP_COLUMN, ShelfConfig, ShelfError};
use shelfview::model::{Model, Status};
use shelfview::ui::ShelfUI;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Catalog file to open on start (csv, parquet or arrow)
    path: Option<PathBuf>,

    /// Column used to group the bar and pie charts
    #[arg(short, long, default_value = DEFAULT_GROUP_COLUMN)]
    group_by: String,

    /// Terminal event poll timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_EVENT_POLL_TIME)]
    poll_ms: u64,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(log_file) = &args.log_file
        && let Err(e) = init_logging(log_file, &args.log_level)
    {
        eprintln!("Error: could not open log file {}: {e}", log_file.display());
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(path: &Path, level: &str) -> Result<(), ShelfError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), ShelfError> {
    info!("Starting shelfview!");

    let cfg = ShelfConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_group_column(args.group_by);

    let mut model = Model::init(&cfg);
    if let Some(path) = args.path {
        model.load_data_file(path)?;
    }

    let ui = ShelfUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &ui, &controller);
    ratatui::restore();

    info!("Quitting shelfview");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &ShelfUI,
    controller: &Controller,
) -> Result<(), ShelfError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_args() {
        let args = Args::parse_from(["shelfview", "books.csv", "--group-by", "Author"]);
        assert_eq!(args.path, Some(PathBuf::from("books.csv")));
        assert_eq!(args.group_by, "Author");
        assert_eq!(args.poll_ms, DEFAULT_EVENT_POLL_TIME);
        assert!(args.log_file.is_none());

        let args = Args::parse_from(["shelfview"]);
        assert!(args.path.is_none());
        assert_eq!(args.group_by, DEFAULT_GROUP_COLUMN);
    }
}
