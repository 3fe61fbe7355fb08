//! Output rendering for the chat transcript.
//!
//! The session reports every appended message and every change of the loading
//! indicator to a [`Renderer`]; what that looks like is up to the implementation.

use std::io::{self, Stdout, Write};

use time::macros::format_description;

use crate::types::{Message, Sender};

/// ANSI escape code for dim text (used for the loading indicator and timestamps).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user's label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the bot's label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for failure notices).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering the conversation.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
pub trait Renderer: Send {
    /// Display a message that was just appended to the transcript.
    fn render_message(&mut self, message: &Message);

    /// Show or hide the loading indicator.
    ///
    /// Called with `true` when a turn opens and with `false` when it resolves.
    fn set_loading(&mut self, loading: bool) {
        _ = loading;
    }

    /// Print an error message that is not part of the transcript.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Failure notices are printed in red so they stand apart from genuine replies.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    loading: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            loading: false,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// What to print before a message so it does not share a line with the indicator.
    fn loading_prefix(&self) -> &'static str {
        if self.loading && self.use_color {
            // Erase the indicator line.
            "\r\x1b[2K"
        } else {
            ""
        }
    }

    fn format_message(&self, message: &Message) -> String {
        let label = match message.sender() {
            Sender::User => "You",
            Sender::Bot => "Bot",
        };
        let stamp = message
            .sent_at()
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_default();
        if !self.use_color {
            let marker = if message.is_error() { " [error]" } else { "" };
            return format!("{label} ({stamp}){marker}: {}", message.text());
        }
        let label_color = match message.sender() {
            Sender::User => ANSI_CYAN,
            Sender::Bot => ANSI_GREEN,
        };
        if message.is_error() {
            format!(
                "{label_color}{label}{ANSI_RESET} {ANSI_DIM}{stamp}{ANSI_RESET}: {ANSI_RED}{}{ANSI_RESET}",
                message.text()
            )
        } else {
            format!(
                "{label_color}{label}{ANSI_RESET} {ANSI_DIM}{stamp}{ANSI_RESET}: {}",
                message.text()
            )
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn render_message(&mut self, message: &Message) {
        print!("{}", self.loading_prefix());
        println!("{}", self.format_message(message));
        self.flush();
    }

    fn set_loading(&mut self, loading: bool) {
        if loading && !self.loading {
            if self.use_color {
                print!("{ANSI_DIM}...{ANSI_RESET}");
            } else {
                println!("...");
            }
            self.flush();
        }
        self.loading = loading;
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }
}
