//! # `dnetrust` - A DeviceNet master object model
//!
//! _dnetrust_ lets a single master node configure pre-known DeviceNet slaves and exchange data
//! with them.  Two hardware families are abstracted behind the same object model:
//!
//! - The [`cif`] module drives dual-port-memory interface boards with a message-passing
//!   coprocessor (Hilscher CIF family).  The master configuration is downloaded into the board
//!   as binary records and the board does the actual bus work.
//! - The [`nidnet`] module drives handle-based vendor SDKs (NI-DNET family) which expose
//!   interface, I/O, and explicit-messaging objects.
//!
//! Both backends implement the [`Interface`] and [`Device`] traits.  Devices reference their
//! interface through a weak handle, so the application owns the interface and decides when it
//! goes away.
//!
//! # Example
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use dnetrust::{cif, Baudrate, ConnectionType, Device, Interface};
//!
//! // The simulator stands in for a real board driver here.
//! let board = cif::SimulatorBoard::new();
//! board.add_slave(5, dnetrust::simulator::SimulatedSlave::new(2, 0));
//!
//! // Bring up the interface (board 0, own MAC 0):
//! // =============================================
//! let interface = Rc::new(RefCell::new(cif::CifInterface::new(
//!     Box::new(board.clone()),
//!     cif::Parameters {
//!         baudrate: Baudrate::B250k,
//!         settle_time: std::time::Duration::ZERO,
//!         ..Default::default()
//!     },
//! )));
//! interface.borrow_mut().open().unwrap();
//!
//! // Configure a polled slave with 2 input bytes:
//! // ============================================
//! let mut device = cif::CifDevice::new(5, 2, 0, ConnectionType::POLLED, 100, &interface);
//! device.allocate(dnetrust::AllocFlags::IO).unwrap();
//!
//! let mut inputs = [0u8; 2];
//! device.read_io(&mut inputs).unwrap();
//! ```

pub mod cif;
mod consts;
pub mod device;
pub mod error;
pub mod ident;
pub mod identity;
pub mod interface;
pub mod names;
pub mod nidnet;
pub mod node;
#[cfg(any(feature = "simulator", test))]
pub mod simulator;

#[cfg(test)]
pub mod test_utils;

pub use device::{Device, DeviceBase};
pub use error::{Error, Result};
pub use ident::{Classified, Kind};
pub use interface::{Interface, InterfaceBase, InterfaceRef, WeakInterfaceRef};
pub use node::Node;

/// Station address (MAC ID) of a DeviceNet node
pub type Address = u8;

/// Number of addressable nodes on one DeviceNet network
pub const MAX_DEVICES: usize = 64;

/// Baudrate for fieldbus communication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum Baudrate {
    /// 125 kbit/s
    B125k = 1,
    /// 250 kbit/s
    #[default]
    B250k = 2,
    /// 500 kbit/s
    B500k = 3,
}

impl Baudrate {
    /// Decode a numeric baudrate code.
    ///
    /// Unknown codes are substituted with the default of 250 kbit/s.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Baudrate::B125k,
            2 => Baudrate::B250k,
            3 => Baudrate::B500k,
            _ => Baudrate::default(),
        }
    }

    #[inline(always)]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Convert baudrate into its numeric value in bit/s.
    pub fn to_rate(self) -> u64 {
        match self {
            Baudrate::B125k => 125000,
            Baudrate::B250k => 250000,
            Baudrate::B500k => 500000,
        }
    }
}

bitflags::bitflags! {
    /// I/O connection types a device can be allocated with
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct ConnectionType: u8 {
        const POLLED = 0x01;
        const STROBED = 0x02;
        const CHANGE_OF_STATE = 0x04;
        const CYCLIC = 0x08;
    }
}

impl ConnectionType {
    /// Decode a numeric connection type, substituting [`ConnectionType::POLLED`] for empty or
    /// unknown bit patterns.
    pub fn from_code(code: u8) -> Self {
        ConnectionType::from_bits(code)
            .unwrap_or(ConnectionType::empty())
            .sanitize()
    }

    /// Replace an empty connection type by the default.
    pub fn sanitize(self) -> Self {
        if self.is_empty() {
            ConnectionType::POLLED
        } else {
            self
        }
    }
}

impl Default for ConnectionType {
    fn default() -> Self {
        ConnectionType::POLLED
    }
}

bitflags::bitflags! {
    /// Which connections [`Device::allocate()`] should establish
    ///
    /// Only the SDK backend distinguishes the two; the board backend always configures I/O and
    /// explicit messaging together.
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct AllocFlags: u8 {
        /// Cyclic I/O connection
        const IO = 0x01;
        /// Explicit messaging connection
        const EXPLICIT = 0x02;
    }
}
