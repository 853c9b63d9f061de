use crate::{Fault, Memory, RegistrationError};
use alloc::boxed::Box;

/// Maximum number of devices which can be registered with a single VM
pub const MAX_DEVICES: usize = 16;

/// Trait for a host-supplied device
///
/// Devices are triggered by the `INT` opcode and may read and write VM memory
/// as a side channel (e.g. watching a RAM address and forwarding it to the
/// host).  They should be fast and must not block: the interpreter has no
/// way to interrupt a device that never returns.
pub trait Device {
    /// Performs a device operation, returning a single result byte
    ///
    /// The result is pushed onto the data stack.
    fn operate(&mut self, selector: u8, mem: &mut Memory) -> u8;
}

impl<F> Device for F
where
    F: FnMut(u8, &mut Memory) -> u8,
{
    fn operate(&mut self, selector: u8, mem: &mut Memory) -> u8 {
        self(selector, mem)
    }
}

/// Device which does nothing and returns zero
pub struct EmptyDevice;
impl Device for EmptyDevice {
    fn operate(&mut self, _selector: u8, _mem: &mut Memory) -> u8 {
        0
    }
}

struct Binding {
    selector: u8,
    device: Box<dyn Device>,
}

/// Fixed-size table of devices, keyed by a one-byte selector
pub struct Devices {
    slots: [Option<Binding>; MAX_DEVICES],
}

impl Default for Devices {
    fn default() -> Self {
        Self::new()
    }
}

impl Devices {
    /// Builds an empty device table
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Installs a device at the given selector
    ///
    /// Registration never overwrites: it fails if the selector is taken or if
    /// every slot is in use.
    pub fn register<D: Device + 'static>(
        &mut self,
        selector: u8,
        device: D,
    ) -> Result<(), RegistrationError> {
        if self.contains(selector) {
            return Err(RegistrationError::Duplicate(selector));
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(RegistrationError::Full)?;
        *slot = Some(Binding {
            selector,
            device: Box::new(device),
        });
        Ok(())
    }

    /// Checks whether a device is registered at the given selector
    pub fn contains(&self, selector: u8) -> bool {
        self.iter().any(|b| b.selector == selector)
    }

    /// Returns the number of registered devices
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Checks whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.slots.iter().flatten()
    }

    /// Runs the device registered at `selector`
    pub fn dispatch(
        &mut self,
        selector: u8,
        mem: &mut Memory,
    ) -> Result<u8, Fault> {
        let b = self
            .slots
            .iter_mut()
            .flatten()
            .find(|b| b.selector == selector)
            .ok_or(Fault::UnknownDevice(selector))?;
        Ok(b.device.operate(selector, mem))
    }
}
