use crate::Width;

/// Simple circular stack, with room for 256 bytes
///
/// Popping an empty stack is not an error: the pointer wraps from 0 to 255
/// and the residual byte in that slot (normally zero) is returned.
#[derive(Clone, Debug)]
pub struct Stack {
    data: [u8; 256],

    /// The index points to the next free slot, and increases on `push`
    index: u8,
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            data: [0u8; 256],
            index: 0,
        }
    }
}

impl Stack {
    /// Builds a new zeroed stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a single byte
    #[inline]
    pub fn push(&mut self, v: u8) {
        self.data[usize::from(self.index)] = v;
        self.index = self.index.wrapping_add(1);
    }

    /// Pops a single byte, zeroing the slot that it occupied
    #[inline]
    pub fn pop(&mut self) -> u8 {
        self.index = self.index.wrapping_sub(1);
        core::mem::take(&mut self.data[usize::from(self.index)])
    }

    /// Pushes the low `width` bytes of `v`
    ///
    /// The most significant byte is pushed first, so the least significant
    /// byte ends up on top of the stack.
    #[inline]
    pub fn push_n(&mut self, width: Width, v: u32) {
        let bytes = v.to_be_bytes();
        for &b in &bytes[4 - width.bytes()..] {
            self.push(b);
        }
    }

    /// Pops a `width`-byte value pushed by [`Stack::push_n`]
    ///
    /// The first byte popped is the least significant.
    #[inline]
    pub fn pop_n(&mut self, width: Width) -> u32 {
        let mut out = 0;
        for i in 0..width.bytes() {
            out |= u32::from(self.pop()) << (8 * i);
        }
        out
    }

    /// Peeks at a byte, where `offset = 0` is the top of the stack
    #[inline]
    pub fn peek_byte_at(&self, offset: u8) -> u8 {
        self.data[usize::from(self.index.wrapping_sub(offset).wrapping_sub(1))]
    }

    /// Returns the stack pointer, which is also the number of bytes pushed
    ///
    /// A full stack reports a length of zero.
    #[inline]
    pub fn len(&self) -> u8 {
        self.index
    }

    /// Checks whether the stack pointer is at the bottom of the stack
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Returns the raw stack buffer
    #[inline]
    pub fn data(&self) -> &[u8; 256] {
        &self.data
    }

    /// Returns the occupied part of the stack, bottom first
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..usize::from(self.index)]
    }
}
