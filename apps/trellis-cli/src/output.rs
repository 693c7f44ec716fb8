//! Output formatting and display for Trellis CLI.
//!
//! This module provides utilities for formatted output to stdout.

use std::io::IsTerminal;

use trellis_core::RenderingFailure;
use trellis_core::standalone::CapturedResponse;
use trellis_views::ViewConfig;

/// Output formatter for CLI messages.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Use colors in output.
    colors_enabled: bool,
}

impl OutputFormatter {
    /// Create a new output formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new output formatter with color control.
    #[must_use]
    #[cfg_attr(not(test), allow(dead_code))]
    pub const fn with_colors(mut self, colors_enabled: bool) -> Self {
        self.colors_enabled = colors_enabled;
        self
    }

    /// Print a success message.
    pub fn success(&self, message: &str) {
        println!("{} {}", self.paint("32", "✓"), message);
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.paint("31", "✗"), message);
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        println!("{} {}", self.paint("33", "⚠"), message);
    }

    /// Print an info message.
    pub fn info(&self, message: &str) {
        println!("{} {}", self.paint("36", "ℹ"), message);
    }

    /// Print a section header.
    pub fn section(&self, title: &str) {
        println!("\n{}", self.paint("1", title));
        println!("{}", "=".repeat(title.len()));
    }

    /// Print a list item.
    pub fn list_item(&self, prefix: &str, content: &str) {
        println!("  {prefix} {content}");
    }

    /// Print a numbered list item.
    pub fn numbered(&self, index: usize, content: &str) {
        self.list_item(&format!("{index}."), content);
    }

    /// Print the list of views.
    pub fn view_list(&self, views: &[(String, Option<ViewConfig>)], verbose: bool) {
        self.section("Views");

        for (i, (name, config)) in views.iter().enumerate() {
            self.numbered(i + 1, name);
            if let (true, Some(config)) = (verbose, config) {
                self.list_item(
                    "  Content type:",
                    &format!("{:?} ({})", config.content_type, config.charset),
                );
            }
        }

        println!("\nTotal: {} views", views.len());
    }

    /// Print a rendered response.
    pub fn response(&self, response: &CapturedResponse, show_headers: bool) {
        if show_headers {
            if let Some(status) = response.status {
                println!("{}", self.paint("1", &format!("Status: {status}")));
            }
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!();
        }
        println!("{}", response.body_text());
    }

    /// Print a located rendering failure.
    pub fn failure(&self, failure: &RenderingFailure) {
        self.error(failure.title());
        self.list_item("Message:", failure.message());
        if let Some(path) = failure.source_path() {
            self.list_item("Source:", path);
        }
        if let Some(line) = failure.line() {
            self.list_item("Line:", &line.to_string());
        }
        if let Some(template) = failure.template() {
            self.list_item("Template:", template);
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.colors_enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self {
            colors_enabled: std::io::stdout().is_terminal(),
        }
    }
}
