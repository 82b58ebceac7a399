//! Boot progress on the VGA console.
//!
//! Each stage prints a colored status bracket in front of its message, and
//! the same line goes to the serial log.

pub mod banner;

use crate::arch::x86_64::vga::{self, Color};
use crate::{print, println};
use log::info;

/// Boot status indicators.
#[derive(Debug, Clone, Copy)]
pub enum Status {
    /// Success - `[ OK ]` in green
    Ok,
    /// Failure - `[FAIL]` in red
    Fail,
    /// Warning - `[WARN]` in yellow
    Warn,
    /// Informational - `[INFO]` in cyan
    Info,
}

impl Status {
    fn label(self) -> (&'static str, Color) {
        match self {
            Status::Ok => ("[ OK ]", Color::LightGreen),
            Status::Fail => ("[FAIL]", Color::LightRed),
            Status::Warn => ("[WARN]", Color::Yellow),
            Status::Info => ("[INFO]", Color::LightCyan),
        }
    }
}

/// Log a boot stage with status.
///
/// Format: `[ OK ] Message text`
pub fn log(status: Status, message: &str) {
    print_status(status);
    println!(" {}", message);
    info!("{} {}", status.label().0, message);
}

/// Starts a stage whose outcome is known only after it runs.
///
/// Prints the message after a blank bracket; [`log_end`] fills it in.
pub fn log_start(message: &str) {
    print!("[    ] {}", message);
    info!("{}...", message);
}

/// Finishes the stage opened by [`log_start`].
pub fn log_end(status: Status) {
    print!("\r");
    print_status(status);
    println!();
    info!("... {}", status.label().0);
}

/// Log an indented detail line (for sub-items).
pub fn log_detail(message: &str) {
    println!("       {}", message);
    info!("       {}", message);
}

fn print_status(status: Status) {
    let (text, color) = status.label();
    vga::set_color(color, Color::Black);
    print!("{}", text);
    vga::set_color(Color::White, Color::Black);
}
