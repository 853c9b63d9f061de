use log::warn;
use okvm::{Device, Memory};
use std::{
    io::Write,
    sync::{Arc, Mutex},
};

/// Serial output device
///
/// When triggered, reads one byte from its RAM port, writes it to the sink,
/// and returns it as the device result.
pub struct Serial<W> {
    port: u32,
    sink: W,
}

impl<W: Write> Serial<W> {
    /// Builds a new serial device watching the given RAM address
    pub fn new(port: u32, sink: W) -> Self {
        Self { port, sink }
    }

    /// Returns the RAM address of this device's port
    pub fn port(&self) -> u32 {
        self.port
    }

    /// Consumes the device, returning its sink
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Device for Serial<W> {
    fn operate(&mut self, _selector: u8, mem: &mut Memory) -> u8 {
        let c = mem.read(self.port);
        let r = self.sink.write_all(&[c]).and_then(|_| self.sink.flush());
        if let Err(e) = r {
            // The byte is still returned to the program
            warn!("serial write from port {:#06x} failed: {e}", self.port);
        }
        c
    }
}

/// In-memory sink which can be shared between a device and the host
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Builds an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the buffer contents, leaving it empty
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    /// Returns a copy of the buffer contents
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use okvm::Width;

    /// Sink which always fails
    struct Broken;
    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("broken pipe"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reads_port() {
        let buf = SharedBuffer::new();
        let mut dev = Serial::new(0x20, buf.clone());
        let mut mem = Memory::new(Width::W1, &[]).unwrap();
        mem.write(0x20, b'k');
        assert_eq!(dev.operate(0xc0, &mut mem), b'k');
        mem.write(0x20, b'!');
        assert_eq!(dev.operate(0xc0, &mut mem), b'!');
        assert_eq!(buf.take(), b"k!");
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn owned_sink() {
        let mut dev = Serial::new(0x1234, Vec::new());
        assert_eq!(dev.port(), 0x1234);
        let mut mem = Memory::new(Width::W2, &[]).unwrap();
        for &c in b"ok" {
            mem.write(dev.port(), c);
            dev.operate(0xc0, &mut mem);
        }
        assert_eq!(dev.into_inner(), b"ok");
    }

    #[test]
    fn write_failure_still_returns() {
        let mut dev = Serial::new(0x20, Broken);
        let mut mem = Memory::new(Width::W1, &[]).unwrap();
        mem.write(0x20, 0x41);
        assert_eq!(dev.operate(0xc0, &mut mem), 0x41);
    }
}
