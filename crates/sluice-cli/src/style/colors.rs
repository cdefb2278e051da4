//! Semantic color palette.

use owo_colors::{OwoColorize, Style};

fn success_style() -> Style {
    Style::new().green().bold()
}

fn error_style() -> Style {
    Style::new().red().bold()
}

fn warning_style() -> Style {
    Style::new().yellow()
}

fn muted_style() -> Style {
    Style::new().dimmed()
}

fn header_style() -> Style {
    Style::new().bold()
}

fn code_style() -> Style {
    Style::new().blue()
}

/// Applies the palette to anything displayable, honoring `--no-color`.
pub trait SemanticStyle {
    fn success(&self) -> String;
    fn error(&self) -> String;
    fn warning(&self) -> String;
    fn muted(&self) -> String;
    fn header(&self) -> String;
    fn code(&self) -> String;
}

fn paint<T: std::fmt::Display + ?Sized>(value: &T, style: Style) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}

impl<T: std::fmt::Display + ?Sized> SemanticStyle for T {
    fn success(&self) -> String {
        paint(self, success_style())
    }

    fn error(&self) -> String {
        paint(self, error_style())
    }

    fn warning(&self) -> String {
        paint(self, warning_style())
    }

    fn muted(&self) -> String {
        paint(self, muted_style())
    }

    fn header(&self) -> String {
        paint(self, header_style())
    }

    fn code(&self) -> String {
        paint(self, code_style())
    }
}
