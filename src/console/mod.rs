// src/console/mod.rs

//! Console output: prompts, status icons and colours.
//!
//! The runnable units never print anything themselves. Callers (the CLI in
//! particular) use [`Console`] to turn a message plus a [`Status`] and a
//! [`Color`] into a printable line.

pub mod elapsed;
pub mod status;

use std::error::Error as StdError;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use console::{Style, Term};
use tracing::debug;

use crate::sync::lock;

pub use elapsed::{format_elapsed, format_elapsed_since};
pub use status::{Color, Status};

const GENERIC_ERROR: &str = "An unknown error occurred";

#[derive(Debug, Default)]
struct Prompt {
    text: Option<String>,
    parts: Vec<String>,
}

/// Formats and prints status lines.
///
/// Colours are used only when the terminal supports them and they are
/// enabled; icons only when enabled. Errors and warnings go to stderr,
/// everything else to stdout.
#[derive(Debug)]
pub struct Console {
    supports_colors: bool,
    colors_enabled: AtomicBool,
    icons_enabled: AtomicBool,
    allow_prompt_hierarchy: AtomicBool,
    prompt: Mutex<Prompt>,
}

impl Console {
    /// Detect colour support from the stdout terminal.
    pub fn new() -> Self {
        Self::with_color_support(Term::stdout().features().colors_supported())
    }

    pub fn with_color_support(supports_colors: bool) -> Self {
        Self {
            supports_colors,
            colors_enabled: AtomicBool::new(true),
            icons_enabled: AtomicBool::new(true),
            allow_prompt_hierarchy: AtomicBool::new(true),
            prompt: Mutex::new(Prompt::default()),
        }
    }

    pub fn supports_colors(&self) -> bool {
        self.supports_colors
    }

    pub fn colors_enabled(&self) -> bool {
        self.colors_enabled.load(Ordering::Relaxed)
    }

    pub fn set_colors_enabled(&self, enabled: bool) {
        self.colors_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn icons_enabled(&self) -> bool {
        self.icons_enabled.load(Ordering::Relaxed)
    }

    pub fn set_icons_enabled(&self, enabled: bool) {
        self.icons_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn allow_prompt_hierarchy(&self) -> bool {
        self.allow_prompt_hierarchy.load(Ordering::Relaxed)
    }

    pub fn set_allow_prompt_hierarchy(&self, allow: bool) {
        self.allow_prompt_hierarchy.store(allow, Ordering::Relaxed);
    }

    pub fn prompt(&self) -> Option<String> {
        lock(&self.prompt).text.clone()
    }

    /// Set the prompt text directly, dropping any prompt parts.
    pub fn set_prompt(&self, prompt: Option<String>) {
        let mut state = lock(&self.prompt);
        state.parts.clear();
        state.text = prompt.filter(|p| !p.is_empty());
    }

    pub fn prompt_parts(&self) -> Vec<String> {
        lock(&self.prompt).parts.clone()
    }

    /// Replace the prompt with a hierarchy, rendered as `[ a ]> [ b ]>`.
    pub fn set_prompt_parts(&self, parts: Vec<String>) {
        if !self.allow_prompt_hierarchy() {
            return;
        }
        let mut state = lock(&self.prompt);
        state.parts = parts;
        state.text = render_parts(&state.parts);
    }

    pub fn add_prompt_part(&self, part: impl Into<String>) {
        if !self.allow_prompt_hierarchy() {
            return;
        }
        let mut state = lock(&self.prompt);
        state.parts.push(part.into());
        state.text = render_parts(&state.parts);
    }

    pub fn remove_last_prompt_part(&self) {
        if !self.allow_prompt_hierarchy() {
            return;
        }
        let mut state = lock(&self.prompt);
        state.parts.pop();
        state.text = render_parts(&state.parts);
    }

    /// Compose `prompt icon message`, colouring the message.
    pub fn format(&self, message: &str, status: Status, color: Color) -> String {
        let mut line = String::new();

        if let Some(prompt) = self.prompt() {
            line.push_str(&prompt);
            line.push(' ');
        }

        if self.icons_enabled() && status != Status::None {
            line.push_str(status.icon());
            line.push(' ');
        }

        line.push_str(&self.paint(message, color));
        line
    }

    /// Colour `text` if colours are available and enabled.
    pub fn paint(&self, text: &str, color: Color) -> String {
        match color.to_console() {
            Some(c) if self.supports_colors && self.colors_enabled() => Style::new()
                .fg(c)
                .force_styling(true)
                .apply_to(text)
                .to_string(),
            _ => text.to_string(),
        }
    }

    pub fn print_message(&self, message: &str) {
        self.print_message_with(message, Status::None, Color::None);
    }

    pub fn print_message_with(&self, message: &str, status: Status, color: Color) {
        let line = self.format(message, status, color);
        write_line(&Term::stdout(), &line);
    }

    pub fn print_success_message(&self, message: &str) {
        self.print_message_with(message, Status::Success, Color::Green);
    }

    pub fn print_info_message(&self, message: &str) {
        self.print_message_with(message, Status::Info, Color::Blue);
    }

    pub fn print_warning_message(&self, message: &str) {
        let line = self.format(message, Status::Warning, Color::Yellow);
        write_line(&Term::stderr(), &line);
    }

    pub fn print_error_message(&self, message: &str) {
        let line = self.format(message, Status::Error, Color::Red);
        write_line(&Term::stderr(), &line);
    }

    /// Print an error, or a generic message when there is none.
    pub fn print_error(&self, error: Option<&dyn StdError>) {
        match error {
            Some(err) => self.print_error_message(&err.to_string()),
            None => self.print_error_message(GENERIC_ERROR),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

fn render_parts(parts: &[String]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    Some(
        parts
            .iter()
            .map(|p| format!("[ {p} ]>"))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn write_line(term: &Term, line: &str) {
    if let Err(e) = term.write_line(line) {
        debug!(error = %e, "failed to write console line");
    }
}
