use crate::Width;

const CONTINUE: u8 = 1 << 7;
const SKIP: u8 = 1 << 6;

/// OK opcode
///
/// In the stack diagrams below, `a` is popped last and `b` is popped first
/// (i.e. `b` is on top of the stack).  Every value is `width` bytes unless
/// noted otherwise; `W` is the machine word width.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Add
    ///
    /// ```text
    /// ADD a b -- a+b
    /// ```
    ///
    /// The sum wraps at the operand width.
    Add = 0x0,

    /// And
    ///
    /// ```text
    /// AND a b -- a&b
    /// ```
    And = 0x1,

    /// Exclusive Or
    ///
    /// ```text
    /// XOR a b -- a^b
    /// ```
    Xor = 0x2,

    /// Shift
    ///
    /// ```text
    /// SFT a shift8 -- c
    /// ```
    ///
    /// Shifts `a` right by the low nibble of the control byte, then left by the
    /// high nibble.  The result is truncated to the operand width.
    Sft = 0x3,

    /// Swap
    ///
    /// ```text
    /// SWP a b -- b a
    /// ```
    Swp = 0x4,

    /// Compare
    ///
    /// ```text
    /// CMP a b -- c8
    /// ```
    ///
    /// Pushes a single byte: `01` if `a > b`, `ff` if `a < b`, `00` otherwise.
    Cmp = 0x5,

    /// Store
    ///
    /// ```text
    /// STR v addrW --
    /// ```
    ///
    /// Writes `v` to RAM at `addr`, most significant byte first.
    Str = 0x6,

    /// Load
    ///
    /// ```text
    /// LOD addrW -- v
    /// ```
    Lod = 0x7,

    /// Duplicate
    ///
    /// ```text
    /// DUP a -- a a
    /// ```
    Dup = 0x8,

    /// Drop
    ///
    /// ```text
    /// DRP a --
    /// ```
    Drp = 0x9,

    /// Push to the return stack
    ///
    /// ```text
    /// PSH a -- | -- a
    /// ```
    Psh = 0xa,

    /// Pop from the return stack
    ///
    /// ```text
    /// POP -- a | a --
    /// ```
    Pop = 0xb,

    /// Jump
    ///
    /// ```text
    /// JMP addr --
    /// ```
    ///
    /// Moves the program counter to an absolute address.
    Jmp = 0xc,

    /// Literal
    ///
    /// ```text
    /// LIT -- a
    /// ```
    ///
    /// Pushes the next `width` bytes of ROM, in stream order, and moves the
    /// program counter past them.
    ///
    /// ```text
    /// LIT2 09 15      ( 09 15 )
    /// ```
    Lit = 0xd,

    /// Device interrupt
    ///
    /// ```text
    /// INT s0 .. sN -- r0 .. rN
    /// ```
    ///
    /// Pops `width` selector bytes, then runs each device in the order that
    /// its selector was popped, pushing the result byte.
    Int = 0xe,

    /// System information
    ///
    /// Consumes nothing; the width code selects what is pushed:
    /// `0` is the data stack pointer, `1` is the return stack pointer, `2` is
    /// the address of this instruction (a `W`-byte value), and `3` is `W`.
    Sys = 0xf,
}

impl From<u8> for Opcode {
    /// Decodes the low nibble of an instruction byte
    fn from(i: u8) -> Self {
        match i & 0xf {
            0x0 => Opcode::Add,
            0x1 => Opcode::And,
            0x2 => Opcode::Xor,
            0x3 => Opcode::Sft,
            0x4 => Opcode::Swp,
            0x5 => Opcode::Cmp,
            0x6 => Opcode::Str,
            0x7 => Opcode::Lod,
            0x8 => Opcode::Dup,
            0x9 => Opcode::Drp,
            0xa => Opcode::Psh,
            0xb => Opcode::Pop,
            0xc => Opcode::Jmp,
            0xd => Opcode::Lit,
            0xe => Opcode::Int,
            _ => Opcode::Sys,
        }
    }
}

impl Opcode {
    /// Returns the three-letter mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::And => "AND",
            Opcode::Xor => "XOR",
            Opcode::Sft => "SFT",
            Opcode::Swp => "SWP",
            Opcode::Cmp => "CMP",
            Opcode::Str => "STR",
            Opcode::Lod => "LOD",
            Opcode::Dup => "DUP",
            Opcode::Drp => "DRP",
            Opcode::Psh => "PSH",
            Opcode::Pop => "POP",
            Opcode::Jmp => "JMP",
            Opcode::Lit => "LIT",
            Opcode::Int => "INT",
            Opcode::Sys => "SYS",
        }
    }
}

impl core::fmt::Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction byte
///
/// ```text
/// bit  7   6   5 4   3 2 1 0
///      c   s   w w   o o o o
/// ```
///
/// `c` is the continuation bit (clear means halt), `s` is the skip flag, `ww`
/// is the operand width code (width = code + 1 bytes), and `oooo` is the
/// [`Opcode`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// The continuation bit is clear; the opcode is not executed
    pub halt: bool,

    /// Pop a condition byte first, and only execute if it is nonzero
    pub skip: bool,

    /// Operand width
    pub width: Width,

    /// Operation to execute
    pub opcode: Opcode,
}

impl Instruction {
    /// The canonical halt instruction
    pub const HALT: u8 = 0x00;

    /// Builds a (non-halting, unconditional) instruction
    pub const fn new(opcode: Opcode, width: Width) -> Self {
        Self {
            halt: false,
            skip: false,
            width,
            opcode,
        }
    }

    /// Sets the skip flag
    pub const fn skip(self) -> Self {
        Self { skip: true, ..self }
    }

    /// Encodes the instruction as a byte
    pub const fn encode(self) -> u8 {
        let mut out = self.opcode as u8 | (self.width.code() << 4);
        if !self.halt {
            out |= CONTINUE;
        }
        if self.skip {
            out |= SKIP;
        }
        out
    }
}

impl From<u8> for Instruction {
    fn from(i: u8) -> Self {
        Self {
            halt: i & CONTINUE == 0,
            skip: i & SKIP != 0,
            width: Width::from_code(i >> 4),
            opcode: Opcode::from(i),
        }
    }
}

impl From<Instruction> for u8 {
    fn from(i: Instruction) -> u8 {
        i.encode()
    }
}

impl core::fmt::Display for Instruction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.halt {
            return f.write_str("HALT");
        }
        if self.skip {
            f.write_str("?")?;
        }
        write!(f, "{}{}", self.opcode, self.width)
    }
}
