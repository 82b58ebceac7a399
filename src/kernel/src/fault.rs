//! What to do about a CPU exception.

use core::fmt;

/// The architecturally defined exception vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Exception {
    DivideError = 0,
    Debug = 1,
    NonMaskableInterrupt = 2,
    Breakpoint = 3,
    Overflow = 4,
    BoundRangeExceeded = 5,
    InvalidOpcode = 6,
    DeviceNotAvailable = 7,
    DoubleFault = 8,
    CoprocessorSegmentOverrun = 9,
    InvalidTss = 10,
    SegmentNotPresent = 11,
    StackSegmentFault = 12,
    GeneralProtection = 13,
    PageFault = 14,
    Reserved = 15,
    X87FloatingPoint = 16,
    AlignmentCheck = 17,
    MachineCheck = 18,
    SimdFloatingPoint = 19,
}

/// Outcome of an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// End the active process as if it had halted with the fault status.
    TerminateProcess,
    /// Nothing can be resumed; stop the machine.
    HaltSystem,
}

impl Exception {
    /// Every exception, in vector order.
    pub const ALL: [Exception; 20] = [
        Exception::DivideError,
        Exception::Debug,
        Exception::NonMaskableInterrupt,
        Exception::Breakpoint,
        Exception::Overflow,
        Exception::BoundRangeExceeded,
        Exception::InvalidOpcode,
        Exception::DeviceNotAvailable,
        Exception::DoubleFault,
        Exception::CoprocessorSegmentOverrun,
        Exception::InvalidTss,
        Exception::SegmentNotPresent,
        Exception::StackSegmentFault,
        Exception::GeneralProtection,
        Exception::PageFault,
        Exception::Reserved,
        Exception::X87FloatingPoint,
        Exception::AlignmentCheck,
        Exception::MachineCheck,
        Exception::SimdFloatingPoint,
    ];

    /// The exception raised through `vector`, if it is one.
    pub fn from_vector(vector: u8) -> Option<Self> {
        Self::ALL.get(usize::from(vector)).copied()
    }

    /// The vector number.
    pub fn vector(self) -> u8 {
        self as u8
    }

    /// Whether the machine cannot continue after this exception at all.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Exception::DoubleFault | Exception::NonMaskableInterrupt | Exception::MachineCheck
        )
    }

    /// What to do when this exception interrupts user (`from_user`) or
    /// kernel code. A fault in the kernel leaves no safe place to resume.
    pub fn action(self, from_user: bool) -> FaultAction {
        if self.is_fatal() || !from_user {
            FaultAction::HaltSystem
        } else {
            FaultAction::TerminateProcess
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (vector {})", self, self.vector())
    }
}
