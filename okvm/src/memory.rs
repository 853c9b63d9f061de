use crate::{LoadError, Width};
use alloc::{boxed::Box, vec::Vec};

/// RAM and ROM for a single VM
///
/// Both regions have the same size, `2^(8 * word)` bytes.  Addresses are
/// reduced modulo the memory size, so accesses never fall outside of memory;
/// multi-byte accesses which run off the top wrap around to address 0.
///
/// Multi-byte values are stored big-endian: the byte at the lowest address is
/// the most significant.
pub struct Memory {
    word: Width,
    ram: Box<[u8]>,
    rom: Box<[u8]>,
}

impl Memory {
    /// Builds a new memory, copying `image` to the start of ROM
    ///
    /// RAM is zero-initialized.  Fails if `image` does not fit in ROM, or if
    /// memory of this word width is not addressable on the host.
    pub fn new(word: Width, image: &[u8]) -> Result<Self, LoadError> {
        let size = word
            .memory_size()
            .ok_or(LoadError::Unaddressable(word))?;
        if image.len() > size {
            return Err(LoadError::TooLarge {
                len: image.len(),
                capacity: size,
            });
        }
        let ram = zeroed(size)?;
        let mut rom = zeroed(size)?;
        rom[..image.len()].copy_from_slice(image);
        Ok(Self { word, ram, rom })
    }

    /// Returns the machine word width
    #[inline]
    pub fn word(&self) -> Width {
        self.word
    }

    /// Returns the size of RAM (and ROM) in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.ram.len()
    }

    /// Reduces an address into the valid range
    #[inline]
    fn index(&self, addr: u32) -> usize {
        // Memory sizes are powers of two
        addr as usize & (self.ram.len() - 1)
    }

    /// Wraps an address to the memory size
    #[inline]
    pub fn wrap(&self, addr: u32) -> u32 {
        self.index(addr) as u32
    }

    /// Reads a byte from ROM
    #[inline]
    pub fn fetch(&self, addr: u32) -> u8 {
        self.rom[self.index(addr)]
    }

    /// Reads a byte from RAM
    #[inline]
    pub fn read(&self, addr: u32) -> u8 {
        self.ram[self.index(addr)]
    }

    /// Writes a byte to RAM
    #[inline]
    pub fn write(&mut self, addr: u32, v: u8) {
        let i = self.index(addr);
        self.ram[i] = v;
    }

    /// Reads a big-endian value of the given width from RAM
    pub fn read_n(&self, addr: u32, width: Width) -> u32 {
        (0..width.get()).fold(0, |acc, i| {
            (acc << 8) | u32::from(self.read(addr.wrapping_add(u32::from(i))))
        })
    }

    /// Writes the low `width` bytes of `v` to RAM, big-endian
    pub fn write_n(&mut self, addr: u32, width: Width, v: u32) {
        let bytes = v.to_be_bytes();
        for (i, &b) in bytes[4 - width.bytes()..].iter().enumerate() {
            self.write(addr.wrapping_add(i as u32), b);
        }
    }

    /// Shared borrow of the entire RAM array
    #[inline]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Mutably borrows the entire RAM array
    #[inline]
    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    /// Shared borrow of the entire ROM array
    #[inline]
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }
}

/// Allocates a zeroed array, failing instead of aborting if the host is out
/// of memory
fn zeroed(size: usize) -> Result<Box<[u8]>, LoadError> {
    let mut v = Vec::new();
    v.try_reserve_exact(size)
        .map_err(|_| LoadError::OutOfMemory { size })?;
    v.resize(size, 0u8);
    Ok(v.into_boxed_slice())
}

impl core::fmt::Debug for Memory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Memory")
            .field("word", &self.word)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load() {
        let m = Memory::new(Width::W2, &[1, 2, 3]).unwrap();
        assert_eq!(m.size(), 65536);
        assert_eq!(&m.rom()[..4], &[1, 2, 3, 0]);
        assert!(m.ram().iter().all(|&b| b == 0));
    }

    #[test]
    fn too_large() {
        let image = vec![0u8; 257];
        match Memory::new(Width::W1, &image) {
            Err(LoadError::TooLarge { len, capacity }) => {
                assert_eq!(len, 257);
                assert_eq!(capacity, 256);
            }
            r => panic!("unexpected result {r:?}"),
        }
        assert!(Memory::new(Width::W1, &image[..256]).is_ok());
    }

    #[test]
    fn out_of_memory() {
        match zeroed(usize::MAX) {
            Err(LoadError::OutOfMemory { size }) => {
                assert_eq!(size, usize::MAX)
            }
            r => panic!("unexpected result {r:?}"),
        }
        assert_eq!(zeroed(16).unwrap().len(), 16);

        let err = LoadError::OutOfMemory { size: 1 << 32 };
        assert_eq!(
            err.to_string(),
            "could not allocate 4294967296 bytes of VM memory"
        );
    }

    #[test]
    fn big_endian() {
        let mut m = Memory::new(Width::W3, &[]).unwrap();
        m.write_n(69, Width::W2, 0xabcd);
        assert_eq!(m.ram()[69], 0xab);
        assert_eq!(m.ram()[70], 0xcd);
        assert_eq!(m.read_n(69, Width::W2), 0xabcd);

        m.ram_mut()[0x3e7] = 0xde;
        m.ram_mut()[0x3e8] = 0xad;
        assert_eq!(m.read_n(0x3e7, Width::W2), 0xdead);
    }

    #[test]
    fn wrapping() {
        let mut m = Memory::new(Width::W1, &[0x11]).unwrap();
        m.write_n(0xff, Width::W2, 0x1234);
        assert_eq!(m.read(0xff), 0x12);
        assert_eq!(m.read(0x00), 0x34);
        assert_eq!(m.read_n(0x1ff, Width::W2), 0x1234);
        assert_eq!(m.fetch(0x100), 0x11);
        assert_eq!(m.wrap(0x1234), 0x34);
    }
}
