//! SDK backend: handle-based vendor SDKs (NI-DNET family)
//!
//! The SDK runs the network itself and exposes it as objects: one interface object per network
//! (`dnet0` to `dnet31`), plus an I/O connection object and an explicit messaging object per
//! slave.  [`NiInterface::open()`][crate::Interface::open] opens and starts the interface object,
//! [`NiDevice::allocate()`][crate::Device::allocate] opens the per-slave objects requested by the
//! allocation flags.
//!
//! Calls into the SDK go through a [`NiDnetDriver`] and report an [`NcStatus`].  Warnings are
//! logged and otherwise treated as success.  The `simulator` feature provides [`SimulatorSdk`].
mod device;
mod driver;
mod interface;
#[cfg(any(feature = "simulator", test))]
pub mod simulator;
mod status;

#[cfg(test)]
mod tests;

pub use device::NiDevice;
pub use driver::{
    IoConfig, IoConnection, NiDnetDriver, ObjectHandle, ObjectState, Operation, PollMode,
};
pub use interface::{NiInterface, Parameters, MAX_INTERFACES};
#[cfg(any(feature = "simulator", test))]
pub use simulator::{SdkCall, SimulatorSdk};
pub use status::NcStatus;
