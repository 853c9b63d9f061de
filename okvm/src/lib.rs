//! OK virtual machine
//!
//! A small stack machine with two 256-byte stacks, a flat RAM / ROM address
//! space sized by the machine word width, and host-supplied devices which are
//! triggered from inside the instruction stream.
//!
//! The VM is driven one instruction at a time by [`Vm::tick`]:
//!
//! ```
//! use okvm::{Instruction, Opcode, Status, Vm, Width};
//!
//! let rom = [
//!     Instruction::new(Opcode::Lit, Width::W1).encode(),
//!     0x03,
//!     Instruction::new(Opcode::Dup, Width::W1).encode(),
//!     Instruction::new(Opcode::Add, Width::W1).encode(),
//!     Instruction::HALT,
//! ];
//! let mut vm = Vm::new(&rom).unwrap();
//! vm.start();
//! while vm.tick() == Status::Running {}
//! assert_eq!(vm.status(), Status::Halted);
//! assert_eq!(vm.stack().as_slice(), &[0x06]);
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate alloc;

use log::{debug, trace, warn};

mod device;
mod error;
mod memory;
mod op;
mod stack;

pub use device::{Device, Devices, EmptyDevice, MAX_DEVICES};
pub use error::{Fault, LoadError, RegistrationError};
pub use memory::Memory;
pub use op::{Instruction, Opcode};
pub use stack::Stack;

/// Width of an operand or machine word, between 1 and 4 bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Width(u8);

impl Width {
    /// One byte
    pub const W1: Width = Width(1);
    /// Two bytes
    pub const W2: Width = Width(2);
    /// Three bytes
    pub const W3: Width = Width(3);
    /// Four bytes
    pub const W4: Width = Width(4);

    /// Builds a width from a byte count, which must be in `1..=4`
    pub const fn new(n: u8) -> Option<Self> {
        if matches!(n, 1..=4) {
            Some(Width(n))
        } else {
            None
        }
    }

    /// Builds a width from the two-bit code used in instructions
    ///
    /// Only the low two bits of `code` are used.
    pub const fn from_code(code: u8) -> Self {
        Width((code & 0b11) + 1)
    }

    /// Returns the two-bit instruction code for this width
    pub const fn code(self) -> u8 {
        self.0 - 1
    }

    /// Returns the width in bytes
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the width in bytes, as a `usize`
    pub const fn bytes(self) -> usize {
        self.0 as usize
    }

    /// Returns `2^(8 * width)`, if that fits in a `usize`
    pub const fn memory_size(self) -> Option<usize> {
        1usize.checked_shl(8 * self.0 as u32)
    }
}

impl core::fmt::Display for Width {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default machine word width (16 MiB of RAM and ROM)
pub const DEFAULT_WORD: Width = Width::W3;

/// Execution state of the VM
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Executing instructions
    Running,
    /// Stopped cleanly, either before [`Vm::start`] or by a halt instruction
    Halted,
    /// Stopped by a runtime [`Fault`]
    Panic,
}

/// The virtual machine itself
pub struct Vm {
    /// RAM and ROM
    mem: Memory,
    /// 256-byte data stack
    stack: Stack,
    /// 256-byte return stack
    ret: Stack,
    devices: Devices,
    pc: u32,
    status: Status,
    fault: Option<Fault>,
    started: bool,
}

macro_rules! op_bin {
    ($self:ident, $width:ident, $f:expr) => {{
        let b = $self.stack.pop_n($width);
        let a = $self.stack.pop_n($width);
        let f: fn(u32, u32) -> u32 = $f;
        $self.stack.push_n($width, f(a, b));
    }};
}

impl Vm {
    /// Builds a new `Vm` with the default word width, loading the given ROM
    pub fn new(rom: &[u8]) -> Result<Self, LoadError> {
        Self::with_word_size(rom, DEFAULT_WORD)
    }

    /// Builds a new `Vm` with the given word width, loading the given ROM
    ///
    /// The VM starts out [`Status::Halted`]; devices should be registered
    /// before calling [`Vm::start`].
    pub fn with_word_size(rom: &[u8], word: Width) -> Result<Self, LoadError> {
        let mem = Memory::new(word, rom)?;
        Ok(Self {
            mem,
            stack: Stack::default(),
            ret: Stack::default(),
            devices: Devices::new(),
            pc: 0,
            status: Status::Halted,
            fault: None,
            started: false,
        })
    }

    /// Builds a new `Vm`, loading a ROM image from a file
    ///
    /// Oversized files are rejected before they are read.
    #[cfg(feature = "std")]
    pub fn from_file<P: AsRef<std::path::Path>>(
        path: P,
        word: Width,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let capacity =
            word.memory_size().ok_or(LoadError::Unaddressable(word))?;
        let len = std::fs::metadata(path)?.len();
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > capacity {
            return Err(LoadError::TooLarge { len, capacity });
        }
        let rom = std::fs::read(path)?;
        Self::with_word_size(&rom, word)
    }

    /// Installs a device at the given selector
    ///
    /// This must be called before [`Vm::start`].
    pub fn register<D: Device + 'static>(
        &mut self,
        selector: u8,
        device: D,
    ) -> Result<(), RegistrationError> {
        if self.started {
            return Err(RegistrationError::Started);
        }
        self.devices.register(selector, device)?;
        debug!("registered device at selector {selector:#04x}");
        Ok(())
    }

    /// Starts execution, moving the VM to [`Status::Running`]
    ///
    /// A VM can only be started once; calling this again has no effect.
    pub fn start(&mut self) -> Status {
        if !self.started {
            self.started = true;
            self.status = Status::Running;
            debug!("starting at {:#08x}", self.pc);
        }
        self.status
    }

    /// Returns the current status
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the fault which stopped the VM, if any
    #[inline]
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Returns the program counter
    #[inline]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Sets the program counter (wrapped to the memory size)
    #[inline]
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = self.mem.wrap(pc);
    }

    /// Returns the machine word width
    #[inline]
    pub fn word(&self) -> Width {
        self.mem.word()
    }

    /// Shared borrow of the working stack
    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Mutable borrow of the working stack
    #[inline]
    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Shared borrow of the return stack
    #[inline]
    pub fn ret(&self) -> &Stack {
        &self.ret
    }

    /// Mutable borrow of the return stack
    #[inline]
    pub fn ret_mut(&mut self) -> &mut Stack {
        &mut self.ret
    }

    /// Shared borrow of RAM and ROM
    #[inline]
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Mutable borrow of RAM and ROM
    #[inline]
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Shared borrow of the device table
    #[inline]
    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    /// Runs until the VM stops, returning the final status
    ///
    /// If the VM has not been started, this returns immediately.
    pub fn run(&mut self) -> Status {
        while self.tick() == Status::Running {}
        self.status
    }

    /// Executes a single instruction, returning the resulting status
    ///
    /// Once the VM has stopped, this does nothing.
    pub fn tick(&mut self) -> Status {
        if self.status != Status::Running {
            return self.status;
        }
        let pc = self.pc;
        let i = Instruction::from(self.next());
        trace!("{pc:06x}: {i}");
        self.execute(i, pc);
        self.status
    }

    /// Reads a byte from ROM at the program counter
    #[inline]
    fn next(&mut self) -> u8 {
        let out = self.mem.fetch(self.pc);
        self.pc = self.mem.wrap(self.pc.wrapping_add(1));
        out
    }

    fn panic(&mut self, fault: Fault) {
        warn!("{fault}");
        self.fault = Some(fault);
        self.status = Status::Panic;
    }

    /// Executes an instruction which was fetched from address `pc`
    fn execute(&mut self, i: Instruction, pc: u32) {
        if i.halt {
            debug!("halted at {pc:#08x}");
            self.status = Status::Halted;
            return;
        }
        // The condition sits above the operands, so nothing else has been
        // popped when the instruction is skipped.
        if i.skip && self.stack.pop() == 0 {
            if i.opcode == Opcode::Lit {
                let pc = self.pc.wrapping_add(u32::from(i.width.get()));
                self.pc = self.mem.wrap(pc);
            }
            return;
        }
        self.op(i.opcode, i.width, pc);
    }

    fn op(&mut self, op: Opcode, w: Width, pc: u32) {
        let word = self.mem.word();
        match op {
            Opcode::Add => op_bin!(self, w, |a, b| a.wrapping_add(b)),
            Opcode::And => op_bin!(self, w, |a, b| a & b),
            Opcode::Xor => op_bin!(self, w, |a, b| a ^ b),
            Opcode::Sft => {
                let shift = self.stack.pop();
                let shr = u32::from(shift & 0xf);
                let shl = u32::from(shift >> 4);
                let v = self.stack.pop_n(w);
                self.stack.push_n(w, (v >> shr) << shl);
            }
            Opcode::Swp => {
                let b = self.stack.pop_n(w);
                let a = self.stack.pop_n(w);
                self.stack.push_n(w, b);
                self.stack.push_n(w, a);
            }
            Opcode::Cmp => {
                let b = self.stack.pop_n(w);
                let a = self.stack.pop_n(w);
                let v = match a.cmp(&b) {
                    core::cmp::Ordering::Greater => 0x01,
                    core::cmp::Ordering::Less => 0xff,
                    core::cmp::Ordering::Equal => 0x00,
                };
                self.stack.push(v);
            }
            Opcode::Str => {
                let addr = self.stack.pop_n(word);
                let v = self.stack.pop_n(w);
                self.mem.write_n(addr, w, v);
            }
            Opcode::Lod => {
                let addr = self.stack.pop_n(word);
                let v = self.mem.read_n(addr, w);
                self.stack.push_n(w, v);
            }
            Opcode::Dup => {
                let v = self.stack.pop_n(w);
                self.stack.push_n(w, v);
                self.stack.push_n(w, v);
            }
            Opcode::Drp => {
                self.stack.pop_n(w);
            }
            Opcode::Psh => {
                let v = self.stack.pop_n(w);
                self.ret.push_n(w, v);
            }
            Opcode::Pop => {
                let v = self.ret.pop_n(w);
                self.stack.push_n(w, v);
            }
            Opcode::Jmp => {
                let addr = self.stack.pop_n(w);
                self.pc = self.mem.wrap(addr);
            }
            Opcode::Lit => {
                for _ in 0..w.get() {
                    let v = self.next();
                    self.stack.push(v);
                }
            }
            Opcode::Int => {
                let mut selectors = [0u8; 4];
                let selectors = &mut selectors[..w.bytes()];
                for s in selectors.iter_mut() {
                    *s = self.stack.pop();
                }
                for &s in selectors.iter() {
                    match self.devices.dispatch(s, &mut self.mem) {
                        Ok(v) => self.stack.push(v),
                        Err(e) => {
                            self.panic(e);
                            break;
                        }
                    }
                }
            }
            Opcode::Sys => match w.code() {
                0 => {
                    let sp = self.stack.len();
                    self.stack.push(sp);
                }
                1 => {
                    let rp = self.ret.len();
                    self.stack.push(rp);
                }
                2 => self.stack.push_n(word, pc),
                _ => self.stack.push(word.get()),
            },
        }
    }
}
