use env_logger::Builder;
use log::{Level, LevelFilter};
use std::fmt::Display;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set while the terminal is in raw mode, where a bare `\n` no longer returns the cursor.
static RAW_TERMINAL: AtomicBool = AtomicBool::new(false);

pub fn set_raw_terminal(raw: bool) {
    RAW_TERMINAL.store(raw, Ordering::Relaxed);
}

/// One log record as written to stderr.
pub fn format_line(timestamp: &str, level: Level, target: &str, message: &dyn Display, raw: bool) -> String {
    let message = message.to_string();
    if raw {
        format!("[{} {:<5} {}] {}\r\n", timestamp, level, target, message.replace('\n', "\r\n"))
    } else {
        format!("[{} {:<5} {}] {}\n", timestamp, level, target, message)
    }
}

/// Logs at `Info` unless `RUST_LOG` says otherwise. Safe to call more than once.
pub fn init() {
    let _ = Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            let line = format_line(
                &buf.timestamp().to_string(),
                record.level(),
                record.target(),
                record.args(),
                RAW_TERMINAL.load(Ordering::Relaxed),
            );
            buf.write_all(line.as_bytes())
        })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooked_terminal_lines_end_with_newline() {
        let line = format_line("2026-01-01T00:00:00Z", Level::Info, "neat_replay", &"Generation 20", false);
        assert_eq!(line, "[2026-01-01T00:00:00Z INFO  neat_replay] Generation 20\n");
    }

    #[test]
    fn raw_terminal_lines_return_the_cursor() {
        let line = format_line("t", Level::Warn, "replay", &"first\nsecond", true);
        assert_eq!(line, "[t WARN  replay] first\r\nsecond\r\n");
        assert!(!line.replace("\r\n", "").contains('\n'));
    }
}
