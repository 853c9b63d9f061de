//! Host devices for the OK virtual machine
//!
//! The VM reaches these devices through the `INT` opcode.  Each device reads
//! its input from a fixed RAM address (a memory-mapped port), so a program
//! prints a character by storing it to the port and then triggering the
//! device's selector.
#![warn(missing_docs)]

mod serial;

pub use serial::{Serial, SharedBuffer};

use okvm::{RegistrationError, Vm};
use std::io::Write;

/// RAM address read by the standard output device
pub const PORT_STDOUT: u32 = 0xbabe;

/// RAM address read by the standard error device
pub const PORT_STDERR: u32 = 0xbeef;

/// Selector for the standard output device
pub const STDOUT: u8 = 0xc0;

/// Selector for the standard error device
pub const STDERR: u8 = 0xc1;

/// Registers serial devices for standard output and standard error
///
/// The devices write to `out` and `err`, reading from [`PORT_STDOUT`] and
/// [`PORT_STDERR`] respectively.
pub fn install<O, E>(
    vm: &mut Vm,
    out: O,
    err: E,
) -> Result<(), RegistrationError>
where
    O: Write + 'static,
    E: Write + 'static,
{
    vm.register(STDOUT, Serial::new(PORT_STDOUT, out))?;
    vm.register(STDERR, Serial::new(PORT_STDERR, err))?;
    Ok(())
}

/// Registers serial devices attached to the process's `stdout` and `stderr`
pub fn install_stdio(vm: &mut Vm) -> Result<(), RegistrationError> {
    install(vm, std::io::stdout(), std::io::stderr())
}
