use crate::Width;
use thiserror::Error;

/// Failure to build a VM from a ROM image
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image does not fit in ROM
    #[error("ROM image is {len} bytes, but ROM only holds {capacity} bytes")]
    TooLarge {
        /// Length of the image
        len: usize,
        /// Size of ROM
        capacity: usize,
    },

    /// Memory with this word width is too large for the host
    #[error("{0}-byte memory is not addressable on this host")]
    Unaddressable(Width),

    /// The host could not allocate RAM or ROM
    #[error("could not allocate {size} bytes of VM memory")]
    OutOfMemory {
        /// Size of the failed allocation
        size: usize,
    },

    /// The ROM file could not be read
    #[cfg(feature = "std")]
    #[error("could not read ROM file")]
    Io(#[from] std::io::Error),
}

/// Failure to install a device
///
/// A failed registration leaves existing registrations untouched.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// All device slots are in use
    #[error("device table is full ({} devices)", crate::MAX_DEVICES)]
    Full,

    /// Another device is already registered with this selector
    #[error("selector {0:#04x} is already registered")]
    Duplicate(u8),

    /// Devices can only be registered before the VM starts
    #[error("cannot register devices after the VM has started")]
    Started,
}

/// Runtime fault, which drives the VM into [`Status::Panic`](crate::Status)
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A device interrupt named a selector with no registered device
    #[error("no device registered for selector {0:#04x}")]
    UnknownDevice(u8),
}
