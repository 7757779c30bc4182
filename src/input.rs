//! Keyboard input handling
//!
//! Keypresses arrive out-of-band while the pool runs. Lowercase keys switch
//! the terminal into a paused log view, uppercase keys export to disk, and
//! ESC (or GS, Ctrl+`]`) resumes the live dashboard. Everything else is a
//! no-op. Pausing only stops automatic repaints; workers keep processing.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::export::ExportTarget;
use crate::logs::LogLevel;

/// Actions that can be triggered by user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Show a filtered log view and pause automatic repaints.
    ViewLogs(LogLevel),
    /// Export to disk, update export status, repaint.
    Export(ExportTarget),
    /// Unpause and repaint.
    Resume,
    Noop,
}

/// Map one keypress to an action.
pub fn action_for_key(key: &KeyEvent) -> Action {
    // GS (0x1D) is what Ctrl+] produces on a raw terminal.
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char(']') => Action::Resume,
            _ => Action::Noop,
        };
    }

    match key.code {
        KeyCode::Esc => Action::Resume,

        KeyCode::Char('e') => Action::ViewLogs(LogLevel::Error),
        KeyCode::Char('w') => Action::ViewLogs(LogLevel::Warn),
        KeyCode::Char('i') => Action::ViewLogs(LogLevel::Info),
        KeyCode::Char('l') => Action::ViewLogs(LogLevel::All),

        KeyCode::Char('E') => Action::Export(ExportTarget::Logs(LogLevel::Error)),
        KeyCode::Char('W') => Action::Export(ExportTarget::Logs(LogLevel::Warn)),
        KeyCode::Char('I') => Action::Export(ExportTarget::Logs(LogLevel::Info)),
        KeyCode::Char('A') => Action::Export(ExportTarget::Logs(LogLevel::All)),
        KeyCode::Char('F') => Action::Export(ExportTarget::FailingRecords),

        _ => Action::Noop,
    }
}

/// Forward terminal key events into `tx` from a dedicated blocking thread.
///
/// The thread exits once the receiving side is dropped. Polling (rather than
/// a blocking `read`) keeps the exit latency bounded.
pub fn spawn_key_reader(tx: UnboundedSender<KeyEvent>) {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            return;
        }
        match event::poll(Duration::from_millis(150)) {
            Ok(true) => {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press && tx.send(key).is_err() {
                        return;
                    }
                }
            }
            Ok(false) => {}
            Err(_) => return,
        }
    });
}
