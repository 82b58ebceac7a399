//! Boot banner.

use crate::arch::x86_64::vga::{self, Color};
use crate::println;

/// Print the triptych boot banner.
pub fn print_banner() {
    vga::set_color(Color::Cyan, Color::Black);
    println!("  _        _       _            _     ");
    println!(" | |_ _ __(_)_ __ | |_ _   _ ___| |__  ");
    println!(" | __| '__| | '_ \\| __| | | / __| '_ \\ ");
    println!(" | |_| |  | | |_) | |_| |_| \\__ \\ | | |");
    println!("  \\__|_|  |_| .__/ \\__|\\__, |___/_| |_|");
    println!("            |_|        |___/           ");
    println!();
    vga::set_color(Color::White, Color::Black);
    println!(" triptych v{}, three terminals", env!("CARGO_PKG_VERSION"));
    println!();
}
