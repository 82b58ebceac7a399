//! triptych kernel entry point.

#![cfg_attr(all(target_arch = "x86_64", target_os = "none"), no_std, no_main)]

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod kernel {
    extern crate alloc;

    use ::x86_64::VirtAddr;
    use bootloader::{entry_point, BootInfo};
    use core::panic::PanicInfo;
    use triptych_kernel::arch::x86_64::{self, machine::Machine, memory, trap, vga, vga::Color};
    use triptych_kernel::boot::{self, Status};
    use triptych_kernel::fs::{FileSystem, ImageFs};
    use triptych_kernel::process::SHELL;
    use triptych_kernel::{allocator, selftest};
    use triptych_kernel::{println, serial_println};

    /// The file system image, embedded by the build script.
    static FSYS_IMAGE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/fsys.img"));

    entry_point!(kernel_main);

    /// Kernel entry point.
    ///
    /// Called by the bootloader with interrupts disabled.
    fn kernel_main(boot_info: &'static BootInfo) -> ! {
        // ====================================================================
        // Phase 1: Core Initialization
        // ====================================================================
        x86_64::init();
        vga::init(boot_info.physical_memory_offset);

        let phys_mem_offset = VirtAddr::new(boot_info.physical_memory_offset);
        // SAFETY: the bootloader maps all physical memory at this offset, and
        // this is the only mapper.
        let mut mapper = unsafe { memory::init_mapper(phys_mem_offset) };
        // SAFETY: the bootloader's memory map is accurate.
        let mut frame_allocator =
            unsafe { memory::BootInfoFrameAllocator::init(&boot_info.memory_map) };

        if let Err(err) = allocator::init_heap(&mut mapper, &mut frame_allocator) {
            panic!("heap initialization failed: {:?}", err);
        }

        vga::clear_screen();
        boot::banner::print_banner();

        // ====================================================================
        // Phase 2: Boot Logging
        // ====================================================================
        boot::log(Status::Ok, "Serial port initialized");
        boot::log(Status::Ok, "GDT and TSS loaded");
        boot::log(Status::Ok, "IDT configured");
        boot::log(Status::Ok, "Kernel heap ready");

        boot::log_start("Mounting file system image");
        let fs = match ImageFs::new(FSYS_IMAGE) {
            Ok(fs) => fs,
            Err(err) => {
                boot::log_end(Status::Fail);
                panic!("file system image: {}", err);
            }
        };
        boot::log_end(Status::Ok);
        boot::log_detail(&alloc::format!("{} directory entries", fs.len()));

        match fs.length_of(SHELL) {
            Ok(len) => boot::log_detail(&alloc::format!("shell: {} bytes", len)),
            Err(err) => {
                boot::log(Status::Fail, "No shell in the image");
                panic!("shell: {}", err);
            }
        }

        let mut machine = Machine::new(mapper, frame_allocator);

        boot::log_start("Running kernel self-tests");
        selftest::run_all(&mut machine, &fs);
        boot::log_end(Status::Ok);

        // ====================================================================
        // Phase 3: Terminals
        // ====================================================================
        trap::install(machine, fs);
        x86_64::start_devices();
        boot::log(Status::Ok, "PIC, PIT and RTC started");
        boot::log_detail(&alloc::format!("heap in use: {} bytes", allocator::used()));

        println!();
        boot::log(Status::Ok, "Boot complete!");
        vga::clear_screen();

        trap::start()
    }

    /// Panic handler.
    ///
    /// Called when the kernel encounters an unrecoverable error.
    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        serial_println!("KERNEL PANIC: {}", info);

        vga::set_color(Color::LightRed, Color::Black);
        println!("\n\n!!! KERNEL PANIC !!!");
        vga::set_color(Color::White, Color::Black);
        println!("{}", info);

        x86_64::halt_loop()
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
fn main() {
    eprintln!("triptych-kernel only runs on bare-metal x86_64");
}
