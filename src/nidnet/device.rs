use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use super::{IoConfig, NcStatus, NiInterface, ObjectHandle, ObjectState};
use crate::interface::{borrow, downcast, require_open};
use crate::{AllocFlags, Classified, ConnectionType, Device, DeviceBase, Kind};

/// Slave device reached through an [`NiInterface`]
///
/// I/O data and explicit messaging use separate SDK objects.  [`Device::allocate()`] opens the
/// ones requested by its flags.
#[derive(Debug)]
pub struct NiDevice {
    base: DeviceBase,
    io: Option<ObjectHandle>,
    explicit: Option<ObjectHandle>,
}

impl NiDevice {
    pub fn new(
        address: crate::Address,
        consumed_size: u8,
        produced_size: u8,
        connection_type: ConnectionType,
        expected_packet_rate: u16,
        interface: &Rc<RefCell<NiInterface>>,
    ) -> Self {
        Self::from_base(DeviceBase::new(
            address,
            consumed_size,
            produced_size,
            connection_type,
            expected_packet_rate,
            interface,
        ))
    }

    pub fn from_base(base: DeviceBase) -> Self {
        Self {
            base,
            io: None,
            explicit: None,
        }
    }

    /// Whether the I/O connection object is open.
    pub fn has_io_connection(&self) -> bool {
        self.io.is_some()
    }

    /// Whether the explicit messaging object is open.
    pub fn has_explicit_connection(&self) -> bool {
        self.explicit.is_some()
    }

    fn allocate_inner(&mut self, flags: AllocFlags) -> crate::Result<()> {
        let address = self.address();
        let strong = self.base.interface();
        let intf = borrow(&strong, address)?;
        let mut ni = downcast::<NiInterface>(intf, address, Kind::NiInterface)?;
        require_open(&*ni, "Allocate")?;

        let name = ni.name();
        if self.io.is_none() && flags.contains(AllocFlags::IO) {
            let node = self.base.node();
            let config = IoConfig {
                connection: self.base.connection_type().into(),
                input_length: node.consumed_size(),
                output_length: node.produced_size(),
                expected_packet_rate: self.base.expected_packet_rate(),
            };
            log::debug!("{}: opening I/O connection to #{}: {:?}", name, address, config);
            let mut handle = ObjectHandle(0);
            let status = ni.driver().open_io(&name, address, config, &mut handle);
            ni.check(status, address)?;
            self.io = Some(handle);
        }
        if self.explicit.is_none() && flags.contains(AllocFlags::EXPLICIT) {
            let mut handle = ObjectHandle(0);
            let status = ni.driver().open_explicit(&name, address, &mut handle);
            ni.check(status, address)?;
            self.explicit = Some(handle);
        }
        if let Some(handle) = self.explicit {
            wait_for(&mut ni, handle, ObjectState::ESTABLISHED, address)?;
        }

        self.base.node.set_active(true);
        log::info!("Device #{} allocated on {}", address, name);
        Ok(())
    }

    fn unallocate_inner(&mut self) -> crate::Result<()> {
        let address = self.address();
        let io = self.io.take();
        let explicit = self.explicit.take();
        self.base.node.set_active(false);

        let strong = self.base.interface();
        let intf = borrow(&strong, address)?;
        let mut ni = downcast::<NiInterface>(intf, address, Kind::NiInterface)?;

        let mut result = Ok(());
        for handle in [io, explicit].into_iter().flatten() {
            let status = ni.driver().close_object(handle);
            let closed = ni.check(status, address);
            result = result.and(closed);
        }
        log::info!("Device #{} unallocated on {}", address, ni.name());
        result
    }

    /// Borrow the interface for an I/O or explicit operation and hand out the required handle.
    fn connection(
        &self,
        function: &'static str,
        explicit: bool,
    ) -> crate::Result<(Option<crate::InterfaceRef>, ObjectHandle)> {
        let address = self.address();
        let strong = self.base.interface();
        {
            let intf = borrow(&strong, address)?;
            let ni = downcast::<NiInterface>(intf, address, Kind::NiInterface)?;
            require_open(&*ni, function)?;
        }
        let handle = if explicit {
            self.explicit
                .ok_or(crate::Error::NotUsingExplicitConnection(address))?
        } else {
            self.io.ok_or(crate::Error::NotUsingIoConnection(address))?
        };
        Ok((strong, handle))
    }

    fn read_io_inner(&mut self, data: &mut [u8]) -> crate::Result<()> {
        let address = self.address();
        let (strong, handle) = self.connection("ReadIOData", false)?;
        let mut ni = ni_mut(&strong, address)?;
        wait_for(&mut ni, handle, ObjectState::READ_AVAILABLE, address)?;
        let status = ni.driver().read_io(handle, data);
        ni.check(status, address)
    }

    fn write_io_inner(&mut self, data: &[u8]) -> crate::Result<()> {
        let address = self.address();
        let (strong, handle) = self.connection("WriteIOData", false)?;
        let mut ni = ni_mut(&strong, address)?;
        let status = ni.driver().write_io(handle, data);
        ni.check(status, address)
    }

    fn get_attribute_inner(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &mut [u8],
    ) -> crate::Result<usize> {
        let address = self.address();
        let (strong, handle) = self.connection("GetAttribute", true)?;
        let mut ni = ni_mut(&strong, address)?;
        let timeout = ni.attribute_timeout();
        let mut actual = 0;
        let mut device_error = 0;
        let status = ni.driver().get_attribute(
            handle,
            class,
            instance,
            attribute,
            timeout,
            data,
            &mut actual,
            &mut device_error,
        );
        explicit_outcome(&ni, status, device_error, address)?;
        Ok(actual)
    }

    fn set_attribute_inner(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &[u8],
    ) -> crate::Result<()> {
        let address = self.address();
        let (strong, handle) = self.connection("SetAttribute", true)?;
        let mut ni = ni_mut(&strong, address)?;
        let timeout = ni.attribute_timeout();
        let mut device_error = 0;
        let status = ni.driver().set_attribute(
            handle,
            class,
            instance,
            attribute,
            timeout,
            data,
            &mut device_error,
        );
        explicit_outcome(&ni, status, device_error, address)
    }

    fn exec_service_inner(
        &mut self,
        service: u8,
        class: u16,
        instance: u16,
        data: &mut [u8],
    ) -> crate::Result<()> {
        let address = self.address();
        let (strong, handle) = self.connection("ExecService", true)?;
        let mut ni = ni_mut(&strong, address)?;

        let status = ni
            .driver()
            .write_explicit(handle, service, class, instance, data);
        ni.check(status, address)?;

        wait_for(&mut ni, handle, ObjectState::READ_AVAILABLE, address)?;

        let mut reply_service = 0;
        let mut actual = 0;
        let status = ni
            .driver()
            .read_explicit(handle, &mut reply_service, data, &mut actual);
        ni.check(status, address)?;
        if reply_service != service | 0x80 || actual > data.len() {
            log::debug!(
                "Device #{}: service 0x{:02x} answered with service 0x{:02x} and {} bytes",
                address,
                service,
                reply_service,
                actual
            );
        }
        Ok(())
    }
}

fn ni_mut(
    strong: &Option<crate::InterfaceRef>,
    address: crate::Address,
) -> crate::Result<RefMut<'_, NiInterface>> {
    downcast::<NiInterface>(borrow(strong, address)?, address, Kind::NiInterface)
}

fn wait_for(
    ni: &mut NiInterface,
    handle: ObjectHandle,
    state: ObjectState,
    address: crate::Address,
) -> crate::Result<()> {
    let timeout = ni.wait_timeout();
    let mut current = ObjectState::empty();
    let status = ni
        .driver()
        .wait_for_state(handle, state, timeout, &mut current);
    ni.check(status, address)
}

/// Map the status of an attribute access, turning the device's error response into
/// [`crate::Error::Explicit`].
fn explicit_outcome(
    ni: &NiInterface,
    status: NcStatus,
    device_error: u16,
    address: crate::Address,
) -> crate::Result<()> {
    if status == NcStatus::ERR_DNET_ERR_RESP {
        let [general, additional] = device_error.to_le_bytes();
        return Err(crate::Error::explicit(address, general, additional));
    }
    ni.check(status, address)
}

impl Classified for NiDevice {
    fn kind(&self) -> Kind {
        Kind::NiDevice
    }
}

impl Device for NiDevice {
    fn base(&self) -> &DeviceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DeviceBase {
        &mut self.base
    }

    fn allocate(&mut self, flags: AllocFlags) -> crate::Result<()> {
        crate::error::track(self.allocate_inner(flags))
    }

    fn unallocate(&mut self) -> crate::Result<()> {
        crate::error::track(self.unallocate_inner())
    }

    fn read_io(&mut self, data: &mut [u8]) -> crate::Result<()> {
        crate::error::track(self.read_io_inner(data))
    }

    fn write_io(&mut self, data: &[u8]) -> crate::Result<()> {
        crate::error::track(self.write_io_inner(data))
    }

    fn get_attribute(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &mut [u8],
    ) -> crate::Result<usize> {
        crate::error::track(self.get_attribute_inner(class, instance, attribute, data))
    }

    fn set_attribute(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &[u8],
    ) -> crate::Result<()> {
        crate::error::track(self.set_attribute_inner(class, instance, attribute, data))
    }

    fn exec_service(
        &mut self,
        service: u8,
        class: u16,
        instance: u16,
        data: &mut [u8],
    ) -> crate::Result<()> {
        crate::error::track(self.exec_service_inner(service, class, instance, data))
    }
}

impl Drop for NiDevice {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.unallocate_inner() {
                log::debug!("Unallocating device #{} on drop failed: {}", self.address(), e);
            }
        }
    }
}
