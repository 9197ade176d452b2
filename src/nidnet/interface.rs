use std::any::Any;

use super::{NcStatus, NiDnetDriver, ObjectHandle, Operation, PollMode};
use crate::{Baudrate, Classified, Interface, InterfaceBase, Kind};

/// Number of interfaces the SDK can address (`dnet0` to `dnet31`)
pub const MAX_INTERFACES: u8 = 32;

/// SDK interface parameters
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Parameters {
    /// Interface number, the interface is called `dnet{interface}`
    pub interface: u8,
    /// MAC ID of the master
    pub address: crate::Address,
    pub baudrate: Baudrate,
    /// Waiting for connections to come up and for new data (ms)
    pub wait_timeout: u32,
    /// Attribute reads and writes (ms)
    pub attribute_timeout: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            interface: 0,
            address: 0,
            baudrate: Baudrate::default(),
            wait_timeout: 10000,
            attribute_timeout: 2000,
        }
    }
}

/// DeviceNet master through the vendor SDK
pub struct NiInterface {
    base: InterfaceBase,
    interface: u8,
    wait_timeout: u32,
    attribute_timeout: u32,
    handle: Option<ObjectHandle>,
    driver: Box<dyn NiDnetDriver>,
}

impl core::fmt::Debug for NiInterface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NiInterface")
            .field("base", &self.base)
            .field("interface", &self.interface)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl NiInterface {
    pub fn new(driver: Box<dyn NiDnetDriver>, param: Parameters) -> Self {
        let mut this = Self {
            base: InterfaceBase::new(param.address, param.baudrate),
            interface: 0,
            wait_timeout: param.wait_timeout,
            attribute_timeout: param.attribute_timeout,
            handle: None,
            driver,
        };
        if let Err(e) = this.set_interface(param.interface) {
            log::warn!("{}, using interface 0", e);
        }
        this
    }

    #[inline(always)]
    pub fn interface(&self) -> u8 {
        self.interface
    }

    /// Select the interface number.  Only possible while the interface is closed.
    pub fn set_interface(&mut self, interface: u8) -> crate::Result<()> {
        if self.base.node().is_active() {
            return Err(crate::Error::MustNotBeOperational("SetIntfID"));
        }
        if interface >= MAX_INTERFACES {
            return Err(crate::Error::InvalidArgument {
                parameter: "ucIID",
                value: interface.to_string(),
                function: "SetIntfID",
            });
        }
        self.interface = interface;
        Ok(())
    }

    /// SDK name of this interface, e.g. `dnet0`.
    pub fn name(&self) -> String {
        format!("dnet{}", self.interface)
    }

    #[inline(always)]
    pub fn wait_timeout(&self) -> u32 {
        self.wait_timeout
    }

    #[inline(always)]
    pub fn attribute_timeout(&self) -> u32 {
        self.attribute_timeout
    }

    pub(crate) fn driver(&mut self) -> &mut dyn NiDnetDriver {
        &mut *self.driver
    }

    /// Check an SDK status: errors abort, warnings are only logged.
    pub(crate) fn check(&self, status: NcStatus, device: crate::Address) -> crate::Result<()> {
        if status.is_error() {
            return Err(crate::Error::NiDnet {
                interface: self.interface,
                device,
                status: status.0,
                message: self.driver.status_to_string(status),
            });
        }
        if status.is_warning() {
            log::warn!(
                "NI-DNET (Intf:dnet{} Dev:{}): {}",
                self.interface,
                device,
                self.driver.status_to_string(status)
            );
        }
        Ok(())
    }

    fn open_inner(&mut self) -> crate::Result<()> {
        if self.base.node().is_active() {
            return Ok(());
        }

        let name = self.name();
        let address = self.address();
        let mut handle = ObjectHandle(0);
        let status = self.driver.open_interface(
            &name,
            address,
            self.base.baudrate(),
            PollMode::Individual,
            &mut handle,
        );
        self.check(status, address)?;

        let status = self.driver.operate_interface(handle, Operation::Start);
        if let Err(e) = self.check(status, address) {
            let status = self.driver.close_object(handle);
            if !status.is_success() {
                log::debug!("Closing {} after failed start returned {}", name, status);
            }
            return Err(e);
        }

        self.handle = Some(handle);
        self.base.node.set_active(true);
        log::info!("Interface {} started", name);
        Ok(())
    }

    fn close_inner(&mut self) -> crate::Result<()> {
        if !self.base.node().is_active() {
            return Ok(());
        }
        let address = self.address();
        let mut result = Ok(());
        if let Some(handle) = self.handle.take() {
            let stop = self.driver.operate_interface(handle, Operation::Stop);
            let close = self.driver.close_object(handle);
            result = self.check(stop, address).and(self.check(close, address));
        }
        self.base.node.set_active(false);
        log::info!("Interface {} closed", self.name());
        result
    }

    fn reset_inner(&mut self) -> crate::Result<()> {
        let name = self.name();
        let status = self.driver.reset(&name);
        self.check(status, self.address())?;
        log::info!("Interface {} reset", name);
        Ok(())
    }
}

impl Classified for NiInterface {
    fn kind(&self) -> Kind {
        Kind::NiInterface
    }
}

impl Interface for NiInterface {
    fn base(&self) -> &InterfaceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut InterfaceBase {
        &mut self.base
    }

    fn open(&mut self) -> crate::Result<()> {
        crate::error::track(self.open_inner())
    }

    fn close(&mut self) -> crate::Result<()> {
        crate::error::track(self.close_inner())
    }

    /// Reset the interface.  The SDK knows only one kind of reset, `mode` is ignored.
    fn reset(&mut self, _mode: u16) -> crate::Result<()> {
        crate::error::track(self.reset_inner())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for NiInterface {
    fn drop(&mut self) {
        if self.base.node().is_active() {
            if let Err(e) = self.close_inner() {
                log::debug!("Closing {} on drop failed: {}", self.name(), e);
            }
        }
    }
}
