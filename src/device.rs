//! Slave devices configured by the master
use std::cell::RefCell;
use std::rc::Rc;

use crate::{AllocFlags, Classified, ConnectionType, InterfaceRef, Node, WeakInterfaceRef};

/// Configuration common to all device backends
#[derive(Debug, Clone)]
pub struct DeviceBase {
    pub(crate) node: Node,
    connection_type: ConnectionType,
    expected_packet_rate: u16,
    interface: Option<WeakInterfaceRef>,
}

impl DeviceBase {
    pub fn new<I: crate::Interface>(
        address: crate::Address,
        consumed_size: u8,
        produced_size: u8,
        connection_type: ConnectionType,
        expected_packet_rate: u16,
        interface: &Rc<RefCell<I>>,
    ) -> Self {
        let interface: InterfaceRef = interface.clone();
        Self {
            node: Node::new(address, consumed_size, produced_size),
            connection_type: connection_type.sanitize(),
            expected_packet_rate,
            interface: Some(Rc::downgrade(&interface)),
        }
    }

    /// A device which is not attached to any interface.
    ///
    /// Every operation on it fails with [`crate::Error::InvalidPointer`].
    pub fn detached(address: crate::Address, consumed_size: u8, produced_size: u8) -> Self {
        Self {
            node: Node::new(address, consumed_size, produced_size),
            connection_type: ConnectionType::default(),
            expected_packet_rate: 0,
            interface: None,
        }
    }

    #[inline(always)]
    pub fn node(&self) -> &Node {
        &self.node
    }

    #[inline(always)]
    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    #[inline(always)]
    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// Change the I/O connection type.  Ignored while allocated, an empty set selects
    /// [`ConnectionType::POLLED`].
    pub fn set_connection_type(&mut self, connection_type: ConnectionType) {
        if !self.node.is_active() {
            self.connection_type = connection_type.sanitize();
        }
    }

    /// Expected packet rate of the I/O connection in milliseconds.
    #[inline(always)]
    pub fn expected_packet_rate(&self) -> u16 {
        self.expected_packet_rate
    }

    pub fn set_expected_packet_rate(&mut self, epr: u16) {
        if !self.node.is_active() {
            self.expected_packet_rate = epr;
        }
    }

    /// The interface this device is attached to, if it still exists.
    pub fn interface(&self) -> Option<InterfaceRef> {
        self.interface.as_ref().and_then(|w| w.upgrade())
    }
}

/// A slave device on the network, seen from the master
///
/// I/O functions need an allocated device.  Explicit messaging functions additionally need an
/// open interface.
pub trait Device: Classified {
    fn base(&self) -> &DeviceBase;
    fn base_mut(&mut self) -> &mut DeviceBase;

    /// Configure the device in the master and establish the requested connections.
    fn allocate(&mut self, flags: AllocFlags) -> crate::Result<()>;

    /// Tear down the connections to this device.  The device is inactive afterwards, even when
    /// an error is returned.
    fn unallocate(&mut self) -> crate::Result<()>;

    /// Read the latest input data of the device into `data`.
    fn read_io(&mut self, data: &mut [u8]) -> crate::Result<()>;

    /// Write output data for the device.
    fn write_io(&mut self, data: &[u8]) -> crate::Result<()>;

    /// Read an attribute into `data`, returning the number of bytes the device answered with.
    fn get_attribute(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &mut [u8],
    ) -> crate::Result<usize>;

    fn set_attribute(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &[u8],
    ) -> crate::Result<()>;

    /// Execute an explicit service.  `data` holds the request data and receives the response.
    fn exec_service(
        &mut self,
        service: u8,
        class: u16,
        instance: u16,
        data: &mut [u8],
    ) -> crate::Result<()>;

    /// Reset the device through its identity object.
    fn reset(&mut self) -> crate::Result<()> {
        let mut data = [0u8; 1];
        self.exec_service(
            crate::consts::SERVICE_RESET,
            crate::consts::CLASS_IDENTITY,
            1,
            &mut data,
        )
    }

    #[inline(always)]
    fn is_active(&self) -> bool {
        self.base().node().is_active()
    }

    #[inline(always)]
    fn address(&self) -> crate::Address {
        self.base().node().address()
    }
}
