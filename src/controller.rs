use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, ShelfConfig, ShelfError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ShelfConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ShelfError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('o'), _) => Some(Message::OpenFile),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Char('s'), _) => Some(Message::Summary),
            (KeyCode::Char('b'), _) => Some(Message::BarChart),
            (KeyCode::Char('p'), _) => Some(Message::PieChart),
            (KeyCode::Char('g'), _) => Some(Message::GroupBy),
            (KeyCode::Char('y'), _) => Some(Message::Copy),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
