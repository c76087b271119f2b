const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Binary-prefixed size with one decimal, e.g. `1536` -> `1.5 KiB`.
pub fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `part` as a share of `whole`, one decimal, e.g. `pct(100, 200)` -> `50.0`.
/// An empty whole reads `0.0` rather than dividing by zero.
pub fn pct(part: u64, whole: u64) -> String {
    format_percent(crate::metrics::percent_of(part, whole))
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}", value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Title,
    Heading,
    Label,
    Good,
    Warn,
    Bad,
    Dim,
    Error,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Title => "\x1b[1;36m",
            Style::Heading => "\x1b[1;34m",
            Style::Label => "\x1b[1m",
            Style::Good => "\x1b[32m",
            Style::Warn => "\x1b[33m",
            Style::Bad => "\x1b[31m",
            Style::Dim => "\x1b[2m",
            Style::Error => "\x1b[1;31m",
        }
    }

    /// Severity color for a utilization percentage.
    pub fn for_percent(value: f64) -> Style {
        if value >= 85.0 {
            Style::Bad
        } else if value >= 60.0 {
            Style::Warn
        } else {
            Style::Good
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Applies ANSI styles when color is enabled. Padding must happen before
/// painting so column widths never count escape bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        Palette { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn paint(&self, style: Style, text: &str) -> String {
        if self.color {
            format!("{}{}{}", style.code(), text, RESET)
        } else {
            text.to_string()
        }
    }

    pub fn percent(&self, value: f64) -> String {
        self.paint(Style::for_percent(value), &format!("{}%", format_percent(value)))
    }
}
