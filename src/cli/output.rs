//! Colored terminal output for release runs
//!
//! Every user-facing line goes through [`OutputManager`]; diagnostics for
//! developers go through `log`.

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new(false, false)
    }
}

fn marked(buffer: &mut Buffer, marker: &str, color: Color, message: &str, tint_message: bool) {
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(buffer, "{}", marker);
    let _ = buffer.reset();
    if tint_message {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
    }
    let _ = writeln!(buffer, " {}", message);
    let _ = buffer.reset();
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn emit(&self, marker: &str, color: Color, message: &str, tint_message: bool) {
        if self.quiet {
            return;
        }
        let mut buffer = self.stdout.buffer();
        marked(&mut buffer, marker, color, message, tint_message);
        let _ = self.stdout.print(&buffer);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        self.emit("ℹ", Color::Cyan, message, false);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.emit("✓", Color::Green, message, false);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.emit("⚠", Color::Yellow, message, true);
    }

    /// Print a note about something the operator must do by hand
    pub fn note(&self, message: &str) {
        self.emit("NOTE:", Color::Magenta, message, false);
    }

    /// Print an error message to stderr (shown even when quiet)
    pub fn error(&self, message: &str) {
        let stderr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = stderr.buffer();
        marked(&mut buffer, "✗", Color::Red, message, true);
        if stderr.print(&buffer).is_err() {
            eprintln!("✗ {}", message);
        }
    }

    /// Print a message only in verbose mode
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            self.emit("→", Color::Blue, message, false);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.stdout.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {} ═══", title);
        let _ = buffer.reset();
        let _ = self.stdout.print(&buffer);
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        self.println(&format!("    {}", message));
    }

    /// Print a plain message
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.stdout.buffer();
        let _ = writeln!(&mut buffer, "{}", message);
        let _ = self.stdout.print(&buffer);
    }
}
