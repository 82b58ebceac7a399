//! VGA text mode driver for x86_64.
//!
//! The display scans out the page at 0xB8000. Each terminal also owns a
//! shadow page right after it, which receives output while the terminal is
//! not shown. All pages are reached through the physical memory mapping.
//!
//! The boot console ([`Writer`], `print!`, `println!`) writes to the primary
//! page only and is used before the terminals start and on panic.

use crate::mm::layout::video_frame;
use core::fmt::{self, Write};
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;
use triptych_hal::{Cursor, FrameBuffer, TAB_WIDTH};
use x86_64::instructions::port::Port;

/// Number of rows in VGA text mode.
const BUFFER_HEIGHT: usize = 25;

/// Number of columns in VGA text mode.
const BUFFER_WIDTH: usize = 80;

const CRTC_INDEX: u16 = 0x3D4;
const CRTC_DATA: u16 = 0x3D5;
const CURSOR_LOW: u8 = 0x0F;
const CURSOR_HIGH: u8 = 0x0E;

/// Where physical memory is mapped. Zero until [`init`] runs; the bootloader
/// identity-maps the primary page, so the boot console works before that.
static PHYSICAL_MEMORY_OFFSET: AtomicU64 = AtomicU64::new(0);

/// VGA color codes.
///
/// Standard 16-color VGA palette for text mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    /// Black color.
    Black = 0,
    /// Blue color.
    Blue = 1,
    /// Green color.
    Green = 2,
    /// Cyan color.
    Cyan = 3,
    /// Red color.
    Red = 4,
    /// Magenta color.
    Magenta = 5,
    /// Brown color.
    Brown = 6,
    /// Light gray color.
    LightGray = 7,
    /// Dark gray color.
    DarkGray = 8,
    /// Light blue color.
    LightBlue = 9,
    /// Light green color.
    LightGreen = 10,
    /// Light cyan color.
    LightCyan = 11,
    /// Light red color.
    LightRed = 12,
    /// Pink color.
    Pink = 13,
    /// Yellow color.
    Yellow = 14,
    /// White color.
    White = 15,
}

/// Combined foreground and background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct ColorCode(u8);

impl ColorCode {
    /// Creates a new color code from foreground and background colors.
    const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }
}

/// Attribute of program output.
const TERMINAL_COLOR: ColorCode = ColorCode::new(Color::LightGray, Color::Black);

/// A single character cell in the VGA buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct ScreenChar {
    ascii_character: u8,
    color_code: ColorCode,
}

const BLANK: ScreenChar = ScreenChar {
    ascii_character: b' ',
    color_code: TERMINAL_COLOR,
};

/// The VGA text buffer layout.
#[repr(transparent)]
struct Buffer {
    chars: [[ScreenChar; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

/// Records where physical memory is mapped.
pub fn init(physical_memory_offset: u64) {
    PHYSICAL_MEMORY_OFFSET.store(physical_memory_offset, Ordering::Relaxed);
}

fn page(target: FrameBuffer) -> *mut Buffer {
    let offset = PHYSICAL_MEMORY_OFFSET.load(Ordering::Relaxed);
    (offset as usize + video_frame(target)) as *mut Buffer
}

fn write_cell(target: FrameBuffer, row: usize, col: usize, cell: ScreenChar) {
    debug_assert!(row < BUFFER_HEIGHT && col < BUFFER_WIDTH);
    // SAFETY: the indices are in range and every page lies in VGA memory,
    // which stays mapped for the kernel's lifetime. Volatile because the
    // display controller reads the primary page at any time.
    unsafe { ptr::write_volatile(&mut (*page(target)).chars[row][col], cell) }
}

fn read_cell(target: FrameBuffer, row: usize, col: usize) -> ScreenChar {
    // SAFETY: as in `write_cell`.
    unsafe { ptr::read_volatile(&(*page(target)).chars[row][col]) }
}

/// Scrolls `target` up by one line.
fn scroll(target: FrameBuffer) {
    for row in 1..BUFFER_HEIGHT {
        for col in 0..BUFFER_WIDTH {
            write_cell(target, row - 1, col, read_cell(target, row, col));
        }
    }
    for col in 0..BUFFER_WIDTH {
        write_cell(target, BUFFER_HEIGHT - 1, col, BLANK);
    }
}

fn new_line(target: FrameBuffer, cursor: &mut Cursor) {
    cursor.x = 0;
    if cursor.y + 1 < BUFFER_HEIGHT {
        cursor.y += 1;
    } else {
        scroll(target);
    }
}

fn put(target: FrameBuffer, cursor: &mut Cursor, byte: u8) {
    if cursor.x >= BUFFER_WIDTH {
        new_line(target, cursor);
    }
    write_cell(
        target,
        cursor.y,
        cursor.x,
        ScreenChar {
            ascii_character: byte,
            color_code: TERMINAL_COLOR,
        },
    );
    cursor.x += 1;
}

/// Writes `bytes` at `cursor` in `target`, wrapping and scrolling.
pub fn write_bytes(target: FrameBuffer, cursor: &mut Cursor, bytes: &[u8]) {
    for &byte in bytes {
        match byte {
            b'\n' => new_line(target, cursor),
            b'\t' => (0..TAB_WIDTH).for_each(|_| put(target, cursor, b' ')),
            byte => put(target, cursor, byte),
        }
    }
}

/// Blanks `cells` cells before `cursor`, moving back across line starts.
pub fn erase(target: FrameBuffer, cursor: &mut Cursor, cells: usize) {
    for _ in 0..cells {
        if cursor.x == 0 {
            if cursor.y == 0 {
                return;
            }
            cursor.y -= 1;
            cursor.x = BUFFER_WIDTH;
        }
        cursor.x -= 1;
        write_cell(target, cursor.y, cursor.x, BLANK);
    }
}

/// Blanks every cell of `target`.
pub fn clear(target: FrameBuffer) {
    for row in 0..BUFFER_HEIGHT {
        for col in 0..BUFFER_WIDTH {
            write_cell(target, row, col, BLANK);
        }
    }
}

/// Copies page `from` over page `to`.
pub fn copy(from: FrameBuffer, to: FrameBuffer) {
    for row in 0..BUFFER_HEIGHT {
        for col in 0..BUFFER_WIDTH {
            write_cell(to, row, col, read_cell(from, row, col));
        }
    }
}

/// Moves the blinking hardware cursor.
pub fn place_cursor(cursor: Cursor) {
    let position = (cursor.y.min(BUFFER_HEIGHT - 1) * BUFFER_WIDTH + cursor.x.min(BUFFER_WIDTH - 1)) as u16;
    let mut index = Port::<u8>::new(CRTC_INDEX);
    let mut data = Port::<u8>::new(CRTC_DATA);
    // SAFETY: the CRT controller ports are owned by this module.
    unsafe {
        index.write(CURSOR_LOW);
        data.write((position & 0xFF) as u8);
        index.write(CURSOR_HIGH);
        data.write((position >> 8) as u8);
    }
}

/// Global boot console.
pub static WRITER: Mutex<Writer> = Mutex::new(Writer::new());

/// Boot console writing to the bottom line of the primary page.
pub struct Writer {
    /// Current column position (0 to BUFFER_WIDTH-1).
    column_position: usize,
    /// Current color code for new characters.
    color_code: ColorCode,
}

impl Writer {
    const fn new() -> Self {
        Writer {
            column_position: 0,
            color_code: ColorCode::new(Color::White, Color::Black),
        }
    }

    /// Sets the foreground and background colors for subsequent writes.
    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.color_code = ColorCode::new(foreground, background);
    }

    /// Writes a single byte. `\r` returns to the start of the line.
    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            b'\r' => self.column_position = 0,
            byte => {
                if self.column_position >= BUFFER_WIDTH {
                    self.new_line();
                }
                write_cell(
                    FrameBuffer::Primary,
                    BUFFER_HEIGHT - 1,
                    self.column_position,
                    ScreenChar {
                        ascii_character: byte,
                        color_code: self.color_code,
                    },
                );
                self.column_position += 1;
            }
        }
    }

    fn new_line(&mut self) {
        scroll(FrameBuffer::Primary);
        self.column_position = 0;
    }

    /// Clears the primary page.
    pub fn clear_screen(&mut self) {
        clear(FrameBuffer::Primary);
        self.column_position = 0;
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | b'\r' => self.write_byte(byte),
                // Non-printable: show placeholder
                _ => self.write_byte(0xfe),
            }
        }
        Ok(())
    }
}

/// Prints to the VGA buffer without a newline.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::vga::_print(format_args!($($arg)*))
    };
}

/// Prints to the VGA buffer with a newline.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)))
}

/// Internal print function used by macros.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    x86_64::instructions::interrupts::without_interrupts(|| {
        let _ = WRITER.lock().write_fmt(args);
    });
}

/// Sets the VGA output color.
pub fn set_color(foreground: Color, background: Color) {
    WRITER.lock().set_color(foreground, background);
}

/// Clears the VGA screen.
pub fn clear_screen() {
    WRITER.lock().clear_screen();
}
