use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, warn};
use std::time::Duration;

/// A discrete event from outside the replay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    CloseRequested,
    Key(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Escape,
    Other,
}

/// A state change the loop applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    ToggleLegend,
}

/// Maps an event to its command; unrecognized events map to `None`.
pub fn map_event(event: InputEvent) -> Option<Command> {
    match event {
        InputEvent::CloseRequested => Some(Command::Quit),
        InputEvent::Key(Key::Escape) => Some(Command::Quit),
        InputEvent::Key(Key::Space) => Some(Command::TogglePause),
        InputEvent::Key(Key::Char(c)) => match c.to_ascii_lowercase() {
            'q' => Some(Command::Quit),
            'p' => Some(Command::TogglePause),
            'l' => Some(Command::ToggleLegend),
            _ => None,
        },
        InputEvent::Key(Key::Other) => None,
    }
}

/// Polled once per tick; must not block.
pub trait EventSource {
    fn poll_events(&mut self) -> Result<Vec<InputEvent>>;
}

/// For unattended runs.
#[derive(Debug, Default)]
pub struct NoEvents;

impl EventSource for NoEvents {
    fn poll_events(&mut self) -> Result<Vec<InputEvent>> {
        Ok(Vec::new())
    }
}

/// Keyboard input from the controlling terminal, read in raw mode.
pub struct TerminalEvents {
    _private: (),
}

impl TerminalEvents {
    pub fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        crate::logging::set_raw_terminal(true);
        debug!("Terminal raw mode enabled");
        Ok(TerminalEvents { _private: () })
    }
}

impl Drop for TerminalEvents {
    fn drop(&mut self) {
        match crossterm::terminal::disable_raw_mode() {
            Ok(()) => crate::logging::set_raw_terminal(false),
            Err(err) => warn!("Failed to restore terminal mode: {}", err),
        }
    }
}

impl EventSource for TerminalEvents {
    fn poll_events(&mut self) -> Result<Vec<InputEvent>> {
        let mut events = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    events.push(translate_key(key));
                }
            }
        }
        Ok(events)
    }
}

fn translate_key(key: KeyEvent) -> InputEvent {
    match key.code {
        // Raw mode swallows SIGINT, so Ctrl+C arrives as a key
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputEvent::CloseRequested,
        KeyCode::Char(' ') => InputEvent::Key(Key::Space),
        KeyCode::Char(c) => InputEvent::Key(Key::Char(c)),
        KeyCode::Esc => InputEvent::Key(Key::Escape),
        _ => InputEvent::Key(Key::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designated_keys_map_to_commands() {
        assert_eq!(map_event(InputEvent::CloseRequested), Some(Command::Quit));
        assert_eq!(map_event(InputEvent::Key(Key::Escape)), Some(Command::Quit));
        assert_eq!(map_event(InputEvent::Key(Key::Char('Q'))), Some(Command::Quit));
        assert_eq!(map_event(InputEvent::Key(Key::Space)), Some(Command::TogglePause));
        assert_eq!(map_event(InputEvent::Key(Key::Char('p'))), Some(Command::TogglePause));
        assert_eq!(map_event(InputEvent::Key(Key::Char('l'))), Some(Command::ToggleLegend));
    }

    #[test]
    fn other_events_are_ignored() {
        assert_eq!(map_event(InputEvent::Key(Key::Char('x'))), None);
        assert_eq!(map_event(InputEvent::Key(Key::Other)), None);
    }

    #[test]
    fn ctrl_c_is_a_close_request() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate_key(key), InputEvent::CloseRequested);
        let plain = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(translate_key(plain), InputEvent::Key(Key::Char('c')));
    }
}
