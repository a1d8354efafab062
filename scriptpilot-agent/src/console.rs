//! Terminal seam for the execution loop

use std::io;

/// Where the loop shows scripts, outputs and errors, and asks for confirmation.
pub trait Console {
    /// Print one block of text followed by a newline.
    fn print(&mut self, text: &str);

    /// Ask a question and return the raw answer. Ctrl-C is reported as an
    /// error of kind [`io::ErrorKind::Interrupted`].
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}
