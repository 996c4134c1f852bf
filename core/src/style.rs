use colored::{Color, ColoredString, Colorize};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

pub fn verdict(passed: bool) -> ColoredString {
    if passed {
        "passed".green()
    } else {
        "failed".bright_red()
    }
}

/// `Score: 72.50/100` with the earned part in bold.
pub fn score_line(label: &str, score: f64, total: f64) -> String {
    format!("{}: {}/{}", label, format!("{:.2}", score).bold(), total)
}
