/// Terminal output formatting utilities
///
/// Every operator-facing message carries a glyph and a color so errors,
/// successes and progress notes can be told apart at a glance.
use colored::Colorize;

/// Output level determines the color and glyph of the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    /// Informational messages (yellow)
    Info,
    /// Success messages (green)
    Success,
    /// Warning messages (magenta)
    Warning,
    /// Error messages (red)
    Error,
}

impl OutputLevel {
    fn color(&self) -> colored::Color {
        match self {
            OutputLevel::Info => colored::Color::Yellow,
            OutputLevel::Success => colored::Color::Green,
            OutputLevel::Warning => colored::Color::Magenta,
            OutputLevel::Error => colored::Color::Red,
        }
    }

    /// Glyph printed in front of the message
    pub fn glyph(&self) -> &'static str {
        match self {
            OutputLevel::Info => "▷",
            OutputLevel::Success => "✔",
            OutputLevel::Warning => "!",
            OutputLevel::Error => "✘",
        }
    }

    fn should_error_exit(&self) -> bool {
        matches!(self, OutputLevel::Error)
    }
}

/// Render a message the way it is printed, without the color codes
pub fn plain_msg(level: OutputLevel, message: &str) -> String {
    format!("{} {}", level.glyph(), message)
}

/// Print a formatted message to stdout
pub fn print_msg(level: OutputLevel, message: impl AsRef<str>) {
    let line = plain_msg(level, message.as_ref());
    println!("{}", line.color(level.color()));
}

/// Print an error message
pub fn print_error(message: impl AsRef<str>) {
    print_msg(OutputLevel::Error, message);
}

/// Print a warning message
pub fn print_warning(message: impl AsRef<str>) {
    print_msg(OutputLevel::Warning, message);
}

/// Print a message and exit the program
///
/// Error level exits with code 1, every other level with 0.
pub fn exit_with_msg(level: OutputLevel, message: impl AsRef<str>) -> ! {
    print_msg(level, message);
    let exit_code = if level.should_error_exit() { 1 } else { 0 };
    std::process::exit(exit_code);
}

/// Print an error message and exit with code 1
pub fn exit_error(message: impl AsRef<str>) -> ! {
    exit_with_msg(OutputLevel::Error, message);
}

/// Pretty print error
#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::tools::macros::print_error(format!($($arg)*))
    };
}

/// Pretty print warning
#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::tools::macros::print_warning(format!($($arg)*))
    };
}

/// Print error and exit
#[macro_export]
macro_rules! exit_error {
    ($($arg:tt)*) => {
        $crate::tools::macros::exit_error(format!($($arg)*))
    };
}
