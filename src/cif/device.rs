use std::cell::RefCell;
use std::rc::Rc;

use super::status::classify;
use super::{
    CifInterface, DeviceDiagnostics, DeviceRecord, DriverStatus, Message, TaskError,
    TelegramHeader,
};
use crate::consts;
use crate::interface::{borrow, downcast, require_open};
use crate::{AllocFlags, Classified, ConnectionType, Device, DeviceBase, Interface, Kind};

/// Slave device configured through a [`CifInterface`]
///
/// The board always sets up I/O and explicit messaging together, so the flags passed to
/// [`Device::allocate()`] are ignored.
#[derive(Debug)]
pub struct CifDevice {
    base: DeviceBase,
    input_offset: Option<u16>,
    output_offset: Option<u16>,
}

impl CifDevice {
    pub fn new(
        address: crate::Address,
        consumed_size: u8,
        produced_size: u8,
        connection_type: ConnectionType,
        expected_packet_rate: u16,
        interface: &Rc<RefCell<CifInterface>>,
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

    /// Wrap an existing device configuration.  The interface it references is only checked
    /// when an operation runs.
    pub fn from_base(base: DeviceBase) -> Self {
        Self {
            base,
            input_offset: None,
            output_offset: None,
        }
    }

    /// Offsets of this device in the board's input and output image, once allocated.
    pub fn io_offsets(&self) -> (Option<u16>, Option<u16>) {
        (self.input_offset, self.output_offset)
    }

    fn record(&self) -> DeviceRecord {
        let node = self.base.node();
        DeviceRecord {
            address: node.address(),
            connection_type: self.base.connection_type(),
            expected_packet_rate: self.base.expected_packet_rate(),
            consumed_size: node.consumed_size(),
            produced_size: node.produced_size(),
            input_offset: self.input_offset,
            output_offset: self.output_offset,
        }
    }

    fn allocate_inner(&mut self) -> crate::Result<()> {
        let address = self.address();
        let strong = self.base.interface();
        let intf = borrow(&strong, address)?;
        let mut cif = downcast::<CifInterface>(intf, address, Kind::CifInterface)?;
        require_open(&*cif, "Allocate")?;

        let node = self.base.node();
        let (input, output) = cif.reserve_io(node.consumed_size(), node.produced_size());
        self.input_offset = input;
        self.output_offset = output;

        let record = self.record();
        log::debug!(
            "Board {}: downloading device record for #{}: {:?}",
            cif.board(),
            address,
            record
        );
        let mut msg = record.to_message();
        let get = cif.timeouts().get;
        cif.transact(&mut msg, get, address)?;
        classify(DriverStatus::NO_ERROR, TaskError(msg.f), cif.board(), address)?;

        // The board only picks up the new record when the bus parameters are downloaded again.
        cif.open()?;

        cif.settle();
        let diag = cif.global_diagnostics()?;
        let mut result = Ok(());
        if diag.has_operate() {
            let slot = diag.slot(address);
            if slot.configured {
                self.base.node.set_active(slot.connected);
                if slot.new_diagnostics {
                    result = diagnostics(&mut cif, address);
                }
            }
        }

        if self.is_active() {
            log::info!("Device #{} allocated on board {}", address, cif.board());
        } else if result.is_ok() {
            log::warn!(
                "Device #{} did not connect (board state 0x{:02x})",
                address,
                diag.state
            );
            result = Err(crate::Error::Unknown);
        }
        result
    }

    fn unallocate_inner(&mut self) -> crate::Result<()> {
        let result = self.clear_slave_status();
        self.base.node.set_active(false);
        result
    }

    /// Clear this device's bit in the slave status bitmap of the board.
    fn clear_slave_status(&mut self) -> crate::Result<()> {
        let address = self.address();
        let strong = self.base.interface();
        let intf = borrow(&strong, address)?;
        let mut cif = downcast::<CifInterface>(intf, address, Kind::CifInterface)?;
        require_open(&*cif, "Unallocate")?;

        let board = cif.board();
        let mut bits = [0u8; consts::DPM_SLAVE_STATUS_LEN];
        let status = cif
            .driver()
            .read_dpm(board, consts::DPM_SLAVE_STATUS_OFFSET, &mut bits);
        cif.check(status, address)?;

        bits[usize::from(address / 8)] &= !(1 << (address % 8));

        let status = cif
            .driver()
            .write_dpm(board, consts::DPM_SLAVE_STATUS_OFFSET, &bits);
        cif.check(status, address)?;
        log::info!("Device #{} unallocated on board {}", address, board);
        Ok(())
    }

    fn exchange_io(
        &mut self,
        function: &'static str,
        send: &[u8],
        receive: &mut [u8],
    ) -> crate::Result<()> {
        let address = self.address();
        let strong = self.base.interface();
        let intf = borrow(&strong, address)?;
        let mut cif = downcast::<CifInterface>(intf, address, Kind::CifInterface)?;
        require_open(&*cif, function)?;
        if !self.is_active() {
            return Err(crate::Error::NotAllocated(address));
        }

        let board = cif.board();
        let timeout = cif.timeouts().io_exchange;
        let send_offset = self.output_offset.unwrap_or(0);
        let receive_offset = self.input_offset.unwrap_or(0);
        let status = if receive.is_empty() {
            cif.driver()
                .exchange_io(board, send_offset, send, 0, &mut [], timeout)
        } else {
            cif.driver()
                .exchange_io(board, 0, &[], receive_offset, receive, timeout)
        };
        cif.check(status, address)
    }

    /// Run an explicit request and evaluate the device diagnostics afterwards.
    ///
    /// `reply` receives the reply message when the exchange itself went through.
    fn explicit(
        &mut self,
        function: &'static str,
        command: u8,
        header: TelegramHeader,
        data: &[u8],
        get_timeout: impl FnOnce(&super::Timeouts) -> u32,
        reply: impl FnOnce(&Message),
    ) -> crate::Result<()> {
        let address = self.address();
        let strong = self.base.interface();
        let intf = borrow(&strong, address)?;
        require_open(&*intf, function)?;
        let mut cif = downcast::<CifInterface>(intf, address, Kind::CifInterface)?;
        if !self.is_active() {
            return Err(crate::Error::NotAllocated(address));
        }

        let mut msg = Message::telegram(command, header, data);
        let timeout = get_timeout(cif.timeouts());
        cif.put_request(&msg, address)?;
        // Writes go on to the diagnostics even when their reply is lost.
        let is_write =
            command == consts::CMD_GET_SET_ATTRIBUTE && header.function == consts::FUNCTION_WRITE;
        let outcome = match cif.get_reply(&mut msg, timeout, address) {
            Err(e) if !is_write => return Err(e),
            Err(e) => Err(e),
            Ok(()) if msg.f > 0 && msg.f <= consts::MAX_GENERAL_STATUS => {
                let additional = msg.telegram_data().first().copied().unwrap_or(0xFF);
                Err(crate::Error::explicit(address, msg.f, additional))
            }
            Ok(()) => classify(DriverStatus::NO_ERROR, TaskError(msg.f), cif.board(), address),
        };
        if outcome.is_ok() {
            reply(&msg);
        } else if let Err(e) = &outcome {
            log::debug!("Device #{}: {} failed: {}", address, function, e);
        }

        diagnostics(&mut cif, address).and(outcome)
    }
}

/// Build a telegram header, rejecting values the telegram cannot carry.
fn telegram_header(
    device: crate::Address,
    class: u16,
    instance: u16,
    attribute: u8,
    count: usize,
    function: u8,
    caller: &'static str,
) -> crate::Result<TelegramHeader> {
    let data_area = u8::try_from(class).map_err(|_| crate::Error::InvalidArgument {
        parameter: "usClsId",
        value: class.to_string(),
        function: caller,
    })?;
    let data_count = u8::try_from(count)
        .ok()
        .filter(|c| usize::from(*c) <= super::MESSAGE_DATA_LEN - super::TELEGRAM_HEADER_LEN)
        .ok_or_else(|| crate::Error::InvalidArgument {
            parameter: "usDataSz",
            value: count.to_string(),
            function: caller,
        })?;
    Ok(TelegramHeader {
        device_address: device,
        data_area,
        data_address: instance,
        data_index: attribute,
        data_count,
        data_type: 0,
        function,
    })
}

/// Fetch and evaluate the diagnostics of one device.
fn diagnostics(cif: &mut CifInterface, device: crate::Address) -> crate::Result<()> {
    let header = TelegramHeader {
        device_address: device,
        ..Default::default()
    };
    let mut msg = Message::telegram(consts::CMD_DEVICE_DIAG, header, &[]);
    let timeout = cif.timeouts().diagnostics;
    cif.transact(&mut msg, timeout, device)?;
    classify(DriverStatus::NO_ERROR, TaskError(msg.f), cif.board(), device)?;

    let diag = DeviceDiagnostics::parse(msg.telegram_data()).ok_or(crate::Error::Unknown)?;
    log::debug!("Device #{} diagnostics: {:?}", device, diag);
    diag.evaluate(cif.board(), device)
}

impl Classified for CifDevice {
    fn kind(&self) -> Kind {
        Kind::CifDevice
    }
}

impl Device for CifDevice {
    fn base(&self) -> &DeviceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DeviceBase {
        &mut self.base
    }

    fn allocate(&mut self, _flags: AllocFlags) -> crate::Result<()> {
        crate::error::track(self.allocate_inner())
    }

    fn unallocate(&mut self) -> crate::Result<()> {
        crate::error::track(self.unallocate_inner())
    }

    fn read_io(&mut self, data: &mut [u8]) -> crate::Result<()> {
        crate::error::track(self.exchange_io("ReadIOData", &[], data))
    }

    fn write_io(&mut self, data: &[u8]) -> crate::Result<()> {
        crate::error::track(self.exchange_io("WriteIOData", data, &mut []))
    }

    fn get_attribute(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &mut [u8],
    ) -> crate::Result<usize> {
        let result = telegram_header(
            self.address(),
            class,
            instance,
            attribute,
            data.len(),
            consts::FUNCTION_READ,
            "GetAttribute",
        )
        .and_then(|header| {
            let mut count = 0;
            self.explicit(
                "GetAttribute",
                consts::CMD_GET_SET_ATTRIBUTE,
                header,
                &[],
                |t| t.get,
                |reply| {
                    count = usize::from(reply.telegram_header().data_count);
                    let answer = reply.telegram_data();
                    let len = answer.len().min(data.len());
                    data[..len].copy_from_slice(&answer[..len]);
                },
            )?;
            Ok(count)
        });
        crate::error::track(result)
    }

    fn set_attribute(
        &mut self,
        class: u16,
        instance: u16,
        attribute: u8,
        data: &[u8],
    ) -> crate::Result<()> {
        let result = telegram_header(
            self.address(),
            class,
            instance,
            attribute,
            data.len(),
            consts::FUNCTION_WRITE,
            "SetAttribute",
        )
        .and_then(|header| {
            self.explicit(
                "SetAttribute",
                consts::CMD_GET_SET_ATTRIBUTE,
                header,
                data,
                |t| t.reply,
                |_| (),
            )
        });
        crate::error::track(result)
    }

    fn exec_service(
        &mut self,
        service: u8,
        class: u16,
        instance: u16,
        data: &mut [u8],
    ) -> crate::Result<()> {
        let result = telegram_header(
            self.address(),
            class,
            instance,
            0,
            data.len(),
            service,
            "ExecService",
        )
        .and_then(|header| {
            let request = data.to_vec();
            self.explicit(
                "ExecService",
                consts::CMD_EXEC_SERVICE,
                header,
                &request,
                |t| t.reply,
                |reply| {
                    let answer = reply.telegram_data();
                    let len = answer.len().min(data.len());
                    data[..len].copy_from_slice(&answer[..len]);
                },
            )
        });
        crate::error::track(result)
    }
}

impl Drop for CifDevice {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.unallocate_inner() {
                log::debug!("Unallocating device #{} on drop failed: {}", self.address(), e);
            }
        }
    }
}
