use std::error::Error;
use std::io::{self, Write};

use anstyle::{AnsiColor, Color, Style};

use memolog_core::{Level, Result};

use super::ConsoleSink;
use crate::event::EventId;

/// Line renderer: `"{level}: {event_id} ({category}) - {message}"`, then the error, if any.
///
/// Information is blue, Warning yellow, Error red; the event id is green.
pub struct AnsiConsole<W> {
    out: W,
    color: bool,
}

impl AnsiConsole<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AnsiConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: true }
    }

    /// Same layout, no escape sequences.
    pub fn plain(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn level_style(&self, level: Level) -> Option<Style> {
        if !self.color {
            return None;
        }
        let color = match level {
            Level::Information => AnsiColor::Blue,
            Level::Warning => AnsiColor::Yellow,
            Level::Error => AnsiColor::Red,
            _ => return None,
        };
        Some(fg(color))
    }

    fn id_style(&self) -> Option<Style> {
        self.color.then(|| fg(AnsiColor::Green))
    }
}

fn fg(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

impl<W: Write + Send> ConsoleSink for AnsiConsole<W> {
    fn write_console(
        &mut self,
        level: Level,
        event_id: &EventId,
        category: &str,
        message: &str,
        error: Option<&dyn Error>,
    ) -> Result<()> {
        match self.level_style(level) {
            Some(style) => write!(self.out, "{}{level}: {}", style.render(), style.render_reset())?,
            None => write!(self.out, "{level}: ")?,
        }
        match self.id_style() {
            Some(style) => write!(self.out, "{}{event_id}{}", style.render(), style.render_reset())?,
            None => write!(self.out, "{event_id}")?,
        }
        writeln!(self.out, " ({category}) - {message}")?;
        if let Some(e) = error {
            writeln!(self.out, "{e}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_layout() {
        let mut console = AnsiConsole::plain(Vec::new());
        console
            .write_console(Level::Warning, &EventId::new(12), "db", "slow query", None)
            .unwrap();
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(out, "Warning: 12 (db) - slow query\n");
    }

    #[test]
    fn error_is_printed_on_its_own_line() {
        let err = io::Error::new(io::ErrorKind::Other, "disk full");
        let mut console = AnsiConsole::plain(Vec::new());
        console
            .write_console(Level::Error, &EventId::new(1), "io", "write failed", Some(&err))
            .unwrap();
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(out, "Error: 1 (io) - write failed\ndisk full\n");
    }

    #[test]
    fn colored_levels_are_wrapped_in_escapes() {
        let mut console = AnsiConsole::new(Vec::new());
        console
            .write_console(Level::Information, &EventId::new(3), "app", "hi", None)
            .unwrap();
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.starts_with("\u{1b}["));
        assert!(out.contains("Information: "));
        assert!(out.ends_with(" (app) - hi\n"));
    }
}
