//! Board backend: dual-port-memory interface boards with a message-passing coprocessor
//!
//! The master configuration lives on the board.  [`CifInterface::open()`] initializes the board
//! and downloads the bus parameters, [`CifDevice::allocate()`][crate::Device::allocate] downloads
//! one device record per slave.  Afterwards the coprocessor runs the network on its own and the
//! host only exchanges process images and mailbox messages with it.
//!
//! Access to the board goes through a [`CifDriver`].  With the `cif-linux` feature,
//! [`LinuxCifDriver`] binds to the vendor's driver library; the `simulator` feature provides
//! [`SimulatorBoard`].
mod device;
mod diagnostics;
mod driver;
mod interface;
#[cfg(feature = "cif-linux")]
mod linux;
mod message;
#[cfg(any(feature = "simulator", test))]
pub mod simulator;
mod status;


pub use device::CifDevice;
pub use diagnostics::{
    DeviceDiagnostics, DeviceFaults, DeviceSlot, GlobalDiagnostics, StationBits,
};
pub use driver::{CifDriver, DriverInfo, HostState};
pub use interface::{CifInterface, Parameters, Timeouts, MAX_BOARDS};
#[cfg(feature = "cif-linux")]
pub use linux::LinuxCifDriver;
pub use message::{
    dnm_connection_type, BusParameters, DeviceRecord, Message, TelegramHeader,
    MESSAGE_DATA_LEN, TELEGRAM_HEADER_LEN,
};
#[cfg(any(feature = "simulator", test))]
pub use simulator::SimulatorBoard;
pub use status::{DriverStatus, TaskError};

/// Reset modes accepted by [`CifInterface`]'s [`reset()`][crate::Interface::reset]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ResetMode {
    Coldstart = crate::consts::RESET_COLDSTART,
    Warmstart = crate::consts::RESET_WARMSTART,
    Bootstart = crate::consts::RESET_BOOTSTART,
}

impl From<ResetMode> for u16 {
    fn from(mode: ResetMode) -> u16 {
        mode as u16
    }
}
