use super::NcStatus;
use crate::{Baudrate, ConnectionType};

/// Handle of an open SDK object (interface, I/O connection, or explicit messaging connection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(pub u32);

/// How the interface polls its I/O connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Every I/O connection uses its own expected packet rate.
    Individual,
    /// All I/O connections are polled together at the scan rate.
    Scanner,
    Automatic,
}

/// Commands for a running interface object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
}

bitflags::bitflags! {
    /// States an object can be waited for
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct ObjectState: u32 {
        /// New data can be read.
        const READ_AVAILABLE = 0x0001;
        const WRITE_SUCCESS = 0x0002;
        /// The connection to the device is established.
        const ESTABLISHED = 0x0008;
    }
}

bitflags::bitflags! {
    /// I/O connection types as understood by the SDK
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct IoConnection: u8 {
        const POLL = 0x01;
        const STROBE = 0x02;
        const CHANGE_OF_STATE = 0x04;
        const CYCLIC = 0x08;
    }
}

impl From<ConnectionType> for IoConnection {
    fn from(ct: ConnectionType) -> Self {
        let mut conn = IoConnection::empty();
        conn.set(IoConnection::POLL, ct.contains(ConnectionType::POLLED));
        conn.set(IoConnection::STROBE, ct.contains(ConnectionType::STROBED));
        conn.set(
            IoConnection::CHANGE_OF_STATE,
            ct.contains(ConnectionType::CHANGE_OF_STATE),
        );
        conn.set(IoConnection::CYCLIC, ct.contains(ConnectionType::CYCLIC));
        conn
    }
}

/// Parameters of an I/O connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoConfig {
    pub connection: IoConnection,
    /// Bytes the master receives from the device
    pub input_length: u8,
    /// Bytes the master sends to the device
    pub output_length: u8,
    /// Expected packet rate in milliseconds
    pub expected_packet_rate: u16,
}

/// Access to the vendor SDK
///
/// Every call returns an [`NcStatus`]: zero on success, a positive warning that still counts as
/// success, or a negative error.  Objects are addressed by the name of the interface they belong
/// to (`dnet0`, `dnet1`, ...) when opened and by their [`ObjectHandle`] afterwards.  Timeouts are
/// in milliseconds.
pub trait NiDnetDriver {
    /// Open the interface object of the network named `name`.
    fn open_interface(
        &mut self,
        name: &str,
        address: crate::Address,
        baudrate: Baudrate,
        poll_mode: PollMode,
        handle: &mut ObjectHandle,
    ) -> NcStatus;

    fn operate_interface(&mut self, handle: ObjectHandle, operation: Operation) -> NcStatus;

    fn close_object(&mut self, handle: ObjectHandle) -> NcStatus;

    /// Open an I/O connection object for the device at `address`.
    fn open_io(
        &mut self,
        name: &str,
        address: crate::Address,
        config: IoConfig,
        handle: &mut ObjectHandle,
    ) -> NcStatus;

    /// Open an explicit messaging object for the device at `address`.
    fn open_explicit(
        &mut self,
        name: &str,
        address: crate::Address,
        handle: &mut ObjectHandle,
    ) -> NcStatus;

    /// Wait until the object reaches any of the `desired` states.
    fn wait_for_state(
        &mut self,
        handle: ObjectHandle,
        desired: ObjectState,
        timeout: u32,
        current: &mut ObjectState,
    ) -> NcStatus;

    fn read_io(&mut self, handle: ObjectHandle, data: &mut [u8]) -> NcStatus;

    fn write_io(&mut self, handle: ObjectHandle, data: &[u8]) -> NcStatus;

    /// Get_Attribute_Single through an explicit messaging object.
    ///
    /// On [`NcStatus::ERR_DNET_ERR_RESP`], `device_error` holds the general status (low byte)
    /// and the additional code (high byte) of the device's error response.
    #[allow(clippy::too_many_arguments)]
    fn get_attribute(
        &mut self,
        handle: ObjectHandle,
        class: u16,
        instance: u16,
        attribute: u8,
        timeout: u32,
        data: &mut [u8],
        actual_len: &mut usize,
        device_error: &mut u16,
    ) -> NcStatus;

    /// Set_Attribute_Single through an explicit messaging object.
    #[allow(clippy::too_many_arguments)]
    fn set_attribute(
        &mut self,
        handle: ObjectHandle,
        class: u16,
        instance: u16,
        attribute: u8,
        timeout: u32,
        data: &[u8],
        device_error: &mut u16,
    ) -> NcStatus;

    /// Send an explicit request.
    fn write_explicit(
        &mut self,
        handle: ObjectHandle,
        service: u8,
        class: u16,
        instance: u16,
        data: &[u8],
    ) -> NcStatus;

    /// Fetch the response to the last explicit request.
    fn read_explicit(
        &mut self,
        handle: ObjectHandle,
        service: &mut u8,
        data: &mut [u8],
        actual_len: &mut usize,
    ) -> NcStatus;

    /// Reset the interface named `name`.
    fn reset(&mut self, name: &str) -> NcStatus;

    /// Render a status code.
    fn status_to_string(&self, status: NcStatus) -> String {
        status.to_string()
    }
}
