//! Simulated interface board
//!
//! [`SimulatorBoard`] implements [`CifDriver`] on top of an in-memory coprocessor model: it keeps
//! a device database, answers mailbox messages, maintains the global diagnostics and the slave
//! status bitmap, and exchanges process data with [`SimulatedSlave`]s.  Every driver call is
//! recorded so tests can check what the master actually did.
use std::collections::{BTreeMap, VecDeque};
use std::sync;

use super::{
    BusParameters, CifDriver, DeviceDiagnostics, DeviceFaults, DeviceRecord, DriverInfo,
    DriverStatus, GlobalDiagnostics, HostState, Message, TaskError, TelegramHeader,
};
use crate::consts;
use crate::simulator::{ExplicitReply, SimulatedSlave, SlaveFault};

/// Size of each process image
pub const IMAGE_SIZE: usize = 3584;

/// A driver call as seen by the simulated board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    OpenDriver,
    CloseDriver,
    InitBoard,
    ExitBoard,
    HostState(HostState),
    DriverInfo,
    TaskParameter(Vec<u8>),
    TaskState,
    Reset { mode: u16, timeout: u32 },
    PutMessage { command: u8, timeout: u32 },
    GetMessage { timeout: u32 },
    ReadDpm { offset: u16, len: usize },
    WriteDpm { offset: u16, len: usize },
    ExchangeIo {
        send_offset: u16,
        send_len: usize,
        receive_offset: u16,
        receive_len: usize,
        timeout: u32,
    },
}

impl DriverCall {
    fn same_kind(&self, other: &DriverCall) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

#[derive(Debug)]
struct BoardState {
    driver_open: bool,
    board_init: bool,
    host_ready: bool,
    task_parameter: Vec<u8>,
    bus_parameters: Option<BusParameters>,
    database: BTreeMap<crate::Address, DeviceRecord>,
    /// The database survives clear requests.
    sticky_database: bool,
    /// The DNM task refuses to go to OPERATE.
    refuse_operate: bool,
    slaves: BTreeMap<crate::Address, SimulatedSlave>,
    slave_status: [u8; consts::DPM_SLAVE_STATUS_LEN],
    replies: VecDeque<Message>,
    inputs: Vec<u8>,
    outputs: Vec<u8>,
    calls: Vec<DriverCall>,
    failures: Vec<(DriverCall, DriverStatus)>,
}

impl BoardState {
    fn new() -> Self {
        Self {
            driver_open: false,
            board_init: false,
            host_ready: false,
            task_parameter: Vec::new(),
            bus_parameters: None,
            database: BTreeMap::new(),
            sticky_database: false,
            refuse_operate: false,
            slaves: BTreeMap::new(),
            slave_status: [0; consts::DPM_SLAVE_STATUS_LEN],
            replies: VecDeque::new(),
            inputs: vec![0; IMAGE_SIZE],
            outputs: vec![0; IMAGE_SIZE],
            calls: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Record a call and return the injected failure for it, if any.
    fn call(&mut self, call: DriverCall) -> Option<DriverStatus> {
        log::trace!("Simulated board: {:?}", call);
        let failure = self
            .failures
            .iter()
            .position(|(c, _)| c.same_kind(&call))
            .map(|i| self.failures.remove(i).1);
        self.calls.push(call);
        failure
    }

    fn ready(&self) -> Result<(), DriverStatus> {
        if !self.driver_open {
            Err(DriverStatus::USR_NOT_INITIALIZED)
        } else if !self.board_init {
            Err(DriverStatus::BOARD_NOT_INITIALIZED)
        } else {
            Ok(())
        }
    }

    fn state(&self) -> u8 {
        if self.bus_parameters.is_some() && self.host_ready && !self.refuse_operate {
            consts::STATE_OPERATE
        } else if self.host_ready {
            consts::STATE_STOP
        } else {
            consts::STATE_OFFLINE
        }
    }

    fn slot_bit(address: crate::Address) -> (usize, u8) {
        (usize::from(address / 8), 1 << (address % 8))
    }

    fn is_connected(&self, address: crate::Address) -> bool {
        let (byte, mask) = Self::slot_bit(address);
        let Some(record) = self.database.get(&address) else {
            return false;
        };
        self.slave_status[byte] & mask != 0
            && self
                .slaves
                .get(&address)
                .is_some_and(|s| s.matches(record.consumed_size, record.produced_size))
    }

    fn device_diagnostics(&self, address: crate::Address) -> DeviceDiagnostics {
        let mut diag = DeviceDiagnostics::default();
        let Some(record) = self.database.get(&address) else {
            return diag;
        };
        match self.slaves.get(&address) {
            None => diag.faults = DeviceFaults::NO_RESPONSE,
            Some(slave) => match slave.fault {
                Some(SlaveFault::Silent) => diag.faults = DeviceFaults::NO_RESPONSE,
                Some(SlaveFault::Parameter) => diag.faults = DeviceFaults::PARAMETER_FAULT,
                Some(SlaveFault::Online(code)) => diag.online_error = code,
                None if !slave.matches(record.consumed_size, record.produced_size) => {
                    diag.faults = DeviceFaults::CONFIG_FAULT
                }
                None => (),
            },
        }
        diag
    }

    fn global_diagnostics(&self) -> GlobalDiagnostics {
        let mut diag = GlobalDiagnostics {
            state: self.state(),
            ..Default::default()
        };
        for address in self.database.keys() {
            let i = usize::from(*address);
            diag.configured.set(i, true);
            diag.connected.set(i, self.is_connected(*address));
            diag.diagnostics
                .set(i, self.device_diagnostics(*address) != DeviceDiagnostics::default());
        }
        diag
    }

    /// Copy slave inputs into the input image.
    fn refresh_inputs(&mut self) {
        for (address, record) in &self.database {
            if !self.is_connected(*address) {
                continue;
            }
            if let (Some(offset), Some(slave)) = (record.input_offset, self.slaves.get(address)) {
                let offset = usize::from(offset);
                let len = slave.inputs.len().min(IMAGE_SIZE.saturating_sub(offset));
                self.inputs[offset..offset + len].copy_from_slice(&slave.inputs[..len]);
            }
        }
    }

    /// Hand the output image to the slaves.
    fn propagate_outputs(&mut self) {
        let connected: Vec<_> = self
            .database
            .values()
            .filter(|r| self.is_connected(r.address))
            .filter_map(|r| Some((r.address, usize::from(r.output_offset?), r.produced_size)))
            .collect();
        for (address, offset, size) in connected {
            if let Some(slave) = self.slaves.get_mut(&address) {
                let end = (offset + usize::from(size)).min(IMAGE_SIZE);
                slave.outputs = self.outputs[offset..end].to_vec();
            }
        }
    }

    fn handle(&mut self, request: &Message) -> Message {
        let mut reply = request.clone();
        reply.rx = request.tx;
        reply.tx = request.rx;
        reply.a = request.b;
        reply.f = 0;

        match (request.rx, request.b) {
            (consts::TASK_OS, consts::CMD_DATABASE)
                if request.data[0] == consts::DATABASE_CLEAR =>
            {
                if self.sticky_database {
                    log::trace!("Simulated board: ignoring database clear");
                } else {
                    self.database.clear();
                    self.bus_parameters = None;
                    self.slave_status = [0; consts::DPM_SLAVE_STATUS_LEN];
                }
                reply.ln = 0;
            }
            (consts::TASK_DNM, consts::CMD_DOWNLOAD) => {
                reply.f = self.download(request).0;
                reply.ln = 0;
            }
            (consts::TASK_DNM, consts::CMD_GET_SET_ATTRIBUTE) => {
                let header = request.telegram_header();
                let data = request.telegram_data().to_vec();
                self.explicit(&mut reply, header, |slave| match header.function {
                    consts::FUNCTION_READ => Ok(slave.get(
                        u16::from(header.data_area),
                        header.data_address,
                        header.data_index,
                    )),
                    consts::FUNCTION_WRITE => Ok(slave.set(
                        u16::from(header.data_area),
                        header.data_address,
                        header.data_index,
                        &data,
                    )),
                    _ => Err(TaskError::FUNCTION),
                });
            }
            (consts::TASK_DNM, consts::CMD_EXEC_SERVICE) => {
                let header = request.telegram_header();
                let data = request.telegram_data().to_vec();
                self.explicit(&mut reply, header, |slave| {
                    Ok(slave.service(
                        header.function,
                        u16::from(header.data_area),
                        header.data_address,
                        &data,
                    ))
                });
            }
            (consts::TASK_DNM, consts::CMD_DEVICE_DIAG) => {
                let header = request.telegram_header();
                let diag = self.device_diagnostics(header.device_address);
                let mut buf = [0u8; DeviceDiagnostics::LEN];
                diag.encode(&mut buf);
                reply = Message::telegram(consts::CMD_DEVICE_DIAG, header, &buf);
                reply.rx = request.tx;
                reply.tx = request.rx;
                reply.a = request.b;
            }
            _ => {
                reply.f = TaskError::FUNCTION.0;
                reply.ln = 0;
            }
        }
        reply
    }

    fn download(&mut self, request: &Message) -> TaskError {
        let area = request.download_area();
        if area == consts::AREA_BUS_PARAMETERS {
            match BusParameters::parse(request.download_record()) {
                Some(param) => {
                    log::trace!("Simulated board: bus parameters {:?}", param);
                    self.bus_parameters = Some(param);
                    TaskError::OK
                }
                None => TaskError::DATA_SET_FIELD_LEN,
            }
        } else if usize::from(area) >= crate::MAX_DEVICES {
            TaskError::DATA_AREA
        } else {
            match DeviceRecord::parse(area, request.download_record()) {
                Ok(record) => {
                    log::trace!("Simulated board: device record {:?}", record);
                    let (byte, mask) = Self::slot_bit(area);
                    self.slave_status[byte] |= mask;
                    self.database.insert(area, record);
                    TaskError::OK
                }
                Err(e) => e,
            }
        }
    }

    fn explicit(
        &mut self,
        reply: &mut Message,
        header: TelegramHeader,
        f: impl FnOnce(&mut SimulatedSlave) -> Result<ExplicitReply, TaskError>,
    ) {
        let address = header.device_address;
        let answer = if !self.is_connected(address) {
            Err(TaskError::NO_CAN)
        } else {
            match self.slaves.get_mut(&address) {
                Some(slave) => f(slave),
                None => Err(TaskError::NO_CAN),
            }
        };

        let (data, count) = match answer {
            Ok(ExplicitReply::Data(data)) => {
                let count = data.len() as u8;
                (data, count)
            }
            Ok(ExplicitReply::Error(general, additional)) => {
                reply.f = general.0;
                (vec![additional.0], 0)
            }
            Err(e) => {
                reply.f = e.0;
                (Vec::new(), 0)
            }
        };
        let f = reply.f;
        let mut header = header;
        header.data_count = count;
        let mut msg = Message::telegram(reply.b, header, &data);
        msg.rx = reply.rx;
        msg.tx = reply.tx;
        msg.a = reply.a;
        msg.f = f;
        *reply = msg;
    }
}

/// Simulated interface board
///
/// Clones share the same board, so a test can keep one handle for inspection while the
/// interface owns another.
#[derive(Debug, Clone)]
pub struct SimulatorBoard {
    state: sync::Arc<sync::Mutex<BoardState>>,
}

impl Default for SimulatorBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorBoard {
    pub fn new() -> Self {
        Self {
            state: sync::Arc::new(sync::Mutex::new(BoardState::new())),
        }
    }

    fn lock(&self) -> sync::MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Place a slave at `address` on the simulated network.
    pub fn add_slave(&self, address: crate::Address, slave: SimulatedSlave) {
        self.lock().slaves.insert(address, slave);
    }

    /// Access a slave on the simulated network.
    pub fn with_slave<R>(
        &self,
        address: crate::Address,
        f: impl FnOnce(&mut SimulatedSlave) -> R,
    ) -> Option<R> {
        self.lock().slaves.get_mut(&address).map(f)
    }

    /// Preload a device database, as if left behind by an earlier session.
    pub fn preload_database(&self, record: DeviceRecord) {
        let mut state = self.lock();
        let (byte, mask) = BoardState::slot_bit(record.address);
        state.slave_status[byte] |= mask;
        state.database.insert(record.address, record);
    }

    /// Make the device database survive clear requests.
    pub fn set_sticky_database(&self, sticky: bool) {
        self.lock().sticky_database = sticky;
    }

    /// Keep the DNM task from entering OPERATE.
    pub fn set_refuse_operate(&self, refuse: bool) {
        self.lock().refuse_operate = refuse;
    }

    /// Fail the next call of the same kind as `call` with `status`.
    ///
    /// Only the variant of `call` matters, its fields are ignored.
    pub fn fail_next(&self, call: DriverCall, status: DriverStatus) {
        self.lock().failures.push((call, status));
    }

    /// All driver calls so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn is_driver_open(&self) -> bool {
        self.lock().driver_open
    }

    pub fn is_board_initialized(&self) -> bool {
        self.lock().board_init
    }

    pub fn bus_parameters(&self) -> Option<BusParameters> {
        self.lock().bus_parameters.clone()
    }

    pub fn device_record(&self, address: crate::Address) -> Option<DeviceRecord> {
        self.lock().database.get(&address).cloned()
    }

    /// Raw slave status bitmap as found in the dual-port memory.
    pub fn slave_status(&self) -> [u8; consts::DPM_SLAVE_STATUS_LEN] {
        self.lock().slave_status
    }

    pub fn global_diagnostics(&self) -> GlobalDiagnostics {
        self.lock().global_diagnostics()
    }
}

fn status(result: Result<(), DriverStatus>) -> DriverStatus {
    result.err().unwrap_or(DriverStatus::NO_ERROR)
}

impl CifDriver for SimulatorBoard {
    fn open_driver(&mut self) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::OpenDriver) {
            return s;
        }
        state.driver_open = true;
        DriverStatus::NO_ERROR
    }

    fn close_driver(&mut self) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::CloseDriver) {
            return s;
        }
        if !state.driver_open {
            return DriverStatus::USR_NOT_INITIALIZED;
        }
        state.driver_open = false;
        state.board_init = false;
        DriverStatus::NO_ERROR
    }

    fn init_board(&mut self, _board: u16) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::InitBoard) {
            return s;
        }
        if !state.driver_open {
            return DriverStatus::USR_NOT_INITIALIZED;
        }
        state.board_init = true;
        DriverStatus::NO_ERROR
    }

    fn exit_board(&mut self, _board: u16) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::ExitBoard) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        state.board_init = false;
        state.host_ready = false;
        DriverStatus::NO_ERROR
    }

    fn set_host_state(&mut self, _board: u16, host_state: HostState, _timeout: u32) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::HostState(host_state)) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        state.host_ready = host_state == HostState::Ready;
        DriverStatus::NO_ERROR
    }

    fn driver_info(&mut self, _board: u16, info: &mut DriverInfo) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::DriverInfo) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        info.host_flags = if state.database.is_empty() {
            consts::HOST_FLAG_READY
        } else {
            consts::HOST_FLAG_READY | consts::HOST_FLAG_RUN
        };
        DriverStatus::NO_ERROR
    }

    fn put_task_parameter(&mut self, _board: u16, _task: u16, data: &[u8]) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::TaskParameter(data.to_vec())) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        state.task_parameter = data.to_vec();
        DriverStatus::NO_ERROR
    }

    fn task_state(&mut self, _board: u16, task: u16, data: &mut [u8]) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::TaskState) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        if task != consts::PROTOCOL_TASK || data.len() < GlobalDiagnostics::LEN {
            return DriverStatus::USR_INFO_AREA_INVALID;
        }
        state.global_diagnostics().encode(data);
        DriverStatus::NO_ERROR
    }

    fn reset(&mut self, _board: u16, mode: u16, timeout: u32) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::Reset { mode, timeout }) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        state.host_ready = false;
        state.replies.clear();
        DriverStatus::NO_ERROR
    }

    fn put_message(&mut self, _board: u16, message: &Message, timeout: u32) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::PutMessage {
            command: message.b,
            timeout,
        }) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        let reply = state.handle(message);
        log::trace!("Simulated board: {:?} -> {:?}", message, reply);
        state.replies.push_back(reply);
        DriverStatus::NO_ERROR
    }

    fn get_message(&mut self, _board: u16, message: &mut Message, timeout: u32) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::GetMessage { timeout }) {
            // A failed read loses the pending reply.
            state.replies.pop_front();
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        match state.replies.pop_front() {
            Some(reply) => {
                *message = reply;
                DriverStatus::NO_ERROR
            }
            None => DriverStatus::DEV_GET_TIMEOUT,
        }
    }

    fn read_dpm(&mut self, _board: u16, offset: u16, data: &mut [u8]) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::ReadDpm {
            offset,
            len: data.len(),
        }) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        if offset != consts::DPM_SLAVE_STATUS_OFFSET || data.len() > consts::DPM_SLAVE_STATUS_LEN {
            return DriverStatus::DEV_DPM_ACCESS_ERROR;
        }
        let len = data.len();
        data.copy_from_slice(&state.slave_status[..len]);
        DriverStatus::NO_ERROR
    }

    fn write_dpm(&mut self, _board: u16, offset: u16, data: &[u8]) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::WriteDpm {
            offset,
            len: data.len(),
        }) {
            return s;
        }
        if let Err(s) = state.ready() {
            return s;
        }
        if offset != consts::DPM_SLAVE_STATUS_OFFSET || data.len() > consts::DPM_SLAVE_STATUS_LEN {
            return DriverStatus::DEV_DPM_ACCESS_ERROR;
        }
        state.slave_status[..data.len()].copy_from_slice(data);
        DriverStatus::NO_ERROR
    }

    fn exchange_io(
        &mut self,
        _board: u16,
        send_offset: u16,
        send: &[u8],
        receive_offset: u16,
        receive: &mut [u8],
        timeout: u32,
    ) -> DriverStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(DriverCall::ExchangeIo {
            send_offset,
            send_len: send.len(),
            receive_offset,
            receive_len: receive.len(),
            timeout,
        }) {
            return s;
        }
        let result = state.ready().and_then(|()| {
            let send_end = usize::from(send_offset) + send.len();
            let receive_end = usize::from(receive_offset) + receive.len();
            if send_end > IMAGE_SIZE {
                return Err(DriverStatus::USR_SENDSIZE_TOO_LONG);
            }
            if receive_end > IMAGE_SIZE {
                return Err(DriverStatus::USR_RECVSIZE_TOO_LONG);
            }
            if !send.is_empty() {
                state.outputs[usize::from(send_offset)..send_end].copy_from_slice(send);
                state.propagate_outputs();
            }
            if !receive.is_empty() {
                state.refresh_inputs();
                receive.copy_from_slice(&state.inputs[usize::from(receive_offset)..receive_end]);
            }
            Ok(())
        });
        status(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_board() -> SimulatorBoard {
        let mut board = SimulatorBoard::new();
        assert_eq!(board.open_driver(), DriverStatus::NO_ERROR);
        assert_eq!(board.init_board(0), DriverStatus::NO_ERROR);
        board
    }

    #[test]
    fn needs_open_driver() {
        let mut board = SimulatorBoard::new();
        assert_eq!(board.init_board(0), DriverStatus::USR_NOT_INITIALIZED);
        let mut info = DriverInfo::default();
        assert_eq!(board.driver_info(0, &mut info), DriverStatus::USR_NOT_INITIALIZED);
    }

    #[test]
    fn get_without_put_times_out() {
        let mut board = open_board();
        let mut msg = Message::default();
        assert_eq!(board.get_message(0, &mut msg, 100), DriverStatus::DEV_GET_TIMEOUT);
    }

    #[test]
    fn database_clear() {
        let mut board = open_board();
        board.preload_database(DeviceRecord {
            address: 3,
            connection_type: crate::ConnectionType::POLLED,
            expected_packet_rate: 100,
            consumed_size: 1,
            produced_size: 0,
            input_offset: Some(0),
            output_offset: None,
        });

        let mut info = DriverInfo::default();
        board.driver_info(0, &mut info);
        assert_eq!(info.host_flags, consts::HOST_FLAG_READY | consts::HOST_FLAG_RUN);

        let mut msg = Message::clear_database();
        assert_eq!(board.put_message(0, &msg, 500), DriverStatus::NO_ERROR);
        assert_eq!(board.get_message(0, &mut msg, 500), DriverStatus::NO_ERROR);
        assert_eq!(msg.f, 0);
        assert_eq!(board.device_record(3), None);
        assert_eq!(board.slave_status(), [0; 8]);
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let mut board = open_board();
        board.fail_next(DriverCall::TaskState, DriverStatus::DEV_NOT_READY);
        let mut buf = [0u8; GlobalDiagnostics::LEN];
        assert_eq!(board.task_state(0, 2, &mut buf), DriverStatus::DEV_NOT_READY);
        assert_eq!(board.task_state(0, 2, &mut buf), DriverStatus::NO_ERROR);
        assert_eq!(buf[0], consts::STATE_OFFLINE);
    }

    #[test]
    fn unknown_command() {
        let mut board = open_board();
        let mut msg = Message::request(consts::TASK_DNM, 0x7f);
        board.put_message(0, &msg, 500);
        board.get_message(0, &mut msg, 500);
        assert_eq!(TaskError(msg.f), TaskError::FUNCTION);
    }
}
