//! Terminal console backed by rustyline

use rustyline::config::Config as EditorConfig;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use scriptpilot_agent::Console;
use scriptpilot_error::{Error, Result};
use std::io;
use std::path::PathBuf;

pub const HISTORY_LENGTH: usize = 1000;

pub struct TerminalConsole {
    editor: Editor<(), FileHistory>,
    history: Option<PathBuf>,
}

impl TerminalConsole {
    /// A console that persists entered requests to `history`, when given.
    pub fn new(history: Option<PathBuf>) -> Result<Self> {
        let config = EditorConfig::builder()
            .max_history_size(HISTORY_LENGTH)
            .map_err(readline_error)?
            .auto_add_history(false)
            .build();
        let mut editor = Editor::<(), FileHistory>::with_config(config).map_err(readline_error)?;

        if let Some(path) = &history {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    tracing::warn!(path = %path.display(), error = %e, "couldn't load history");
                }
            }
        }

        Ok(Self { editor, history })
    }

    /// Read one top-level request. A blank line yields `None` and is not remembered.
    pub fn read_request(&mut self, prompt: &str) -> rustyline::Result<Option<String>> {
        let line = self.editor.readline(prompt)?;
        Ok(self.accept(line))
    }

    fn accept(&mut self, line: String) -> Option<String> {
        if line.trim().is_empty() {
            return None;
        }
        self.remember(&line);
        Some(line)
    }

    /// Add `line` to the history and write the history file right away.
    pub fn remember(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::warn!(error = %e, "couldn't add to history");
        }
        if let Some(path) = &self.history {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "couldn't create history directory");
                }
            }
            if let Err(e) = self.editor.save_history(path) {
                tracing::warn!(path = %path.display(), error = %e, "couldn't save history");
            }
        }
    }
}

impl Console for TerminalConsole {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.editor.readline(prompt).map_err(answer_error)
    }
}

/// Ctrl-C and Ctrl-D at a question become the io kinds the loop matches on.
fn answer_error(e: ReadlineError) -> io::Error {
    match e {
        ReadlineError::Interrupted => io::Error::new(io::ErrorKind::Interrupted, "interrupted"),
        ReadlineError::Eof => io::Error::new(io::ErrorKind::UnexpectedEof, "EOF when reading a line"),
        ReadlineError::Io(e) => e,
        e => io::Error::other(e.to_string()),
    }
}

fn readline_error(e: ReadlineError) -> Error {
    let error = match e {
        ReadlineError::Io(e) => Error::from(e),
        e => Error::unexpected("cannot set up the line editor").set_source(e),
    };
    error.with_operation("console::new")
}
