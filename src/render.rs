use std::io::Write;

use colored::{Color, Colorize};

use crate::chat::session::ReplySink;
use crate::models::message::{ChatMessage, Role};
use crate::models::settings::Theme;

const CLEAR_LINE: &str = "\r\x1b[2K";

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub user: Color,
    pub assistant: Color,
    pub notice: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                user: Color::BrightCyan,
                assistant: Color::BrightWhite,
                notice: Color::BrightBlack,
            },
            Theme::Light => Self {
                user: Color::Blue,
                assistant: Color::Black,
                notice: Color::BrightBlack,
            },
        }
    }

    fn label(&self, role: Role) -> String {
        match role {
            Role::User => "you ›".color(self.user).bold().to_string(),
            Role::Assistant => "assistant ›".color(self.assistant).bold().to_string(),
        }
    }

    fn body(&self, role: Role, text: &str) -> String {
        match role {
            Role::User => text.color(self.user).to_string(),
            Role::Assistant => text.color(self.assistant).to_string(),
        }
    }
}

pub fn print_message<W: Write>(out: &mut W, palette: &Palette, message: &ChatMessage) {
    let line = format!(
        "{} {}",
        palette.label(message.role()),
        palette.body(message.role(), message.content())
    );
    if let Err(e) = writeln!(out, "{}", line) {
        log::warn!("Failed to write message: {}", e);
    }
}

pub fn print_notice<W: Write>(out: &mut W, palette: &Palette, text: &str) {
    if let Err(e) = writeln!(out, "{}", text.color(palette.notice).italic()) {
        log::warn!("Failed to write notice: {}", e);
    }
}

/// Draws the assistant reply in place as it streams in.
///
/// Each update carries the whole reply so far; only the part not yet on
/// screen is written.
pub struct ReplyRenderer<W: Write> {
    out: W,
    palette: Palette,
    rendered: String,
    typing: bool,
}

impl<W: Write> ReplyRenderer<W> {
    /// Start a reply, showing the typing indicator until the first fragment.
    pub fn start(mut out: W, palette: Palette) -> Self {
        let indicator = format!(
            "{} {}",
            palette.label(Role::Assistant),
            "…".color(palette.notice)
        );
        if let Err(e) = write!(out, "{}", indicator).and_then(|_| out.flush()) {
            log::warn!("Failed to write typing indicator: {}", e);
        }
        Self {
            out,
            palette,
            rendered: String::new(),
            typing: true,
        }
    }

    /// End the reply line and hand back the writer.
    pub fn finish(mut self) -> W {
        if self.typing {
            self.clear_indicator();
        }
        if let Err(e) = writeln!(self.out).and_then(|_| self.out.flush()) {
            log::warn!("Failed to finish reply: {}", e);
        }
        self.out
    }

    fn clear_indicator(&mut self) {
        let label = self.palette.label(Role::Assistant);
        if let Err(e) = write!(self.out, "{}{} ", CLEAR_LINE, label) {
            log::warn!("Failed to clear typing indicator: {}", e);
        }
        self.typing = false;
    }

    fn write_text(&mut self, text: &str) {
        let body = self.palette.body(Role::Assistant, text);
        if let Err(e) = write!(self.out, "{}", body).and_then(|_| self.out.flush()) {
            log::warn!("Failed to write reply: {}", e);
        }
    }
}

impl<W: Write> ReplySink for ReplyRenderer<W> {
    fn update(&mut self, text: &str) {
        if self.typing {
            self.clear_indicator();
        }
        match text.strip_prefix(self.rendered.as_str()) {
            Some(delta) => self.write_text(delta),
            None => {
                // Not an extension of what is on screen: redraw the line.
                let label = self.palette.label(Role::Assistant);
                if let Err(e) = write!(self.out, "{}{} ", CLEAR_LINE, label) {
                    log::warn!("Failed to redraw reply: {}", e);
                }
                self.write_text(text);
            }
        }
        self.rendered = text.to_string();
    }

    fn fallback(&mut self, text: &str) {
        if self.typing {
            self.clear_indicator();
        } else {
            // Keep whatever partial reply is already visible.
            if let Err(e) = writeln!(self.out) {
                log::warn!("Failed to write reply: {}", e);
            }
            let label = self.palette.label(Role::Assistant);
            if let Err(e) = write!(self.out, "{} ", label) {
                log::warn!("Failed to write reply: {}", e);
            }
        }
        self.write_text(text);
        self.rendered = text.to_string();
    }
}
