//! Console diagnostics for a coverage run

use crate::files::SourceFile;
use console::{style, Term};
use std::sync::{Arc, Mutex};

/// Where UI lines go
#[derive(Debug, Clone)]
enum Sink {
    Term(Term),
    Buffer(Arc<Mutex<Vec<String>>>),
}

/// Lines captured by a buffered [`Ui`]
#[derive(Debug, Clone, Default)]
pub struct UiCapture {
    lines: Arc<Mutex<Vec<String>>>,
}

impl UiCapture {
    /// Snapshot of everything written so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// All lines joined with newlines
    #[must_use]
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

/// Prints version, network and skipped-file diagnostics
#[derive(Debug, Clone)]
pub struct Ui {
    sink: Sink,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Ui {
    /// Create a UI writing to stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            sink: Sink::Term(Term::stdout()),
            use_color,
            quiet,
        }
    }

    /// Create an uncolored UI that records lines instead of printing them
    #[must_use]
    pub fn buffered() -> (Self, UiCapture) {
        let capture = UiCapture::default();
        let ui = Self {
            sink: Sink::Buffer(Arc::clone(&capture.lines)),
            use_color: false,
            quiet: false,
        };
        (ui, capture)
    }

    fn write_line(&self, line: &str) {
        match &self.sink {
            Sink::Term(term) => {
                let _ = term.write_line(line);
            }
            Sink::Buffer(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line.to_string());
                }
            }
        }
    }

    fn prefixed(&self, colored: String, plain: &str, message: &str) {
        let prefix = if self.use_color {
            colored
        } else {
            plain.to_string()
        };
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print the version report
    pub fn versions(&self, build_tool: &str, node: &str, solcover: &str) {
        if self.quiet {
            return;
        }
        self.header("Version");
        for line in format_versions(build_tool, node, solcover) {
            self.write_line(&line);
        }
    }

    /// Print the network report
    pub fn network(&self, name: &str, network_id: &str, port: u16) {
        if self.quiet {
            return;
        }
        self.header("Network Info");
        for line in format_network(name, network_id, port) {
            self.write_line(&line);
        }
    }

    /// Print the files copied without instrumentation
    pub fn skipped(&self, files: &[SourceFile]) {
        if self.quiet || files.is_empty() {
            return;
        }
        self.header("Coverage skipped for:");
        for file in files {
            self.write_line(&format!("- {}", file.display_path()));
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed(style("ℹ").blue().bold().to_string(), "INFO", message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed(style("✓").green().bold().to_string(), "DONE", message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed(style("⚠").yellow().bold().to_string(), "WARN", message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        self.prefixed(style("✗").red().bold().to_string(), "FAIL", message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.write_line("");
        self.write_line(&styled);
    }
}

/// Lines of the version report
#[must_use]
pub fn format_versions(build_tool: &str, node: &str, solcover: &str) -> Vec<String> {
    vec![
        format!("> build tool:  {build_tool}"),
        format!("> node:        {node}"),
        format!("> solcover:    v{}", solcover.trim_start_matches('v')),
    ]
}

/// Lines of the network report
#[must_use]
pub fn format_network(name: &str, network_id: &str, port: u16) -> Vec<String> {
    vec![
        format!("> network:     {name}"),
        format!("> network_id:  {network_id}"),
        format!("> port:        {port}"),
    ]
}
