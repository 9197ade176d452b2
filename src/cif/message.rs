//! Mailbox messages exchanged with the board coprocessor
//!
//! A message consists of an 8 byte header (`rx`, `tx`, `ln`, `nr`, `a`, `f`, `b`, `e`) followed
//! by up to 255 data bytes.  Configuration is downloaded as binary records inside the data part;
//! explicit messaging uses a telegram header in front of the actual request data.
//!
//! All multi-byte fields are little endian.
use crate::consts;
use crate::ConnectionType;

/// Maximum size of the data part of a message
pub const MESSAGE_DATA_LEN: usize = 255;

/// Mailbox message
#[derive(Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Message {
    /// Receiving task
    pub rx: u8,
    /// Transmitting task
    pub tx: u8,
    /// Length of valid data
    pub ln: u8,
    /// Message number
    pub nr: u8,
    /// Answer code
    pub a: u8,
    /// Error code (task error in replies)
    pub f: u8,
    /// Command
    pub b: u8,
    /// Extension
    pub e: u8,
    pub data: [u8; MESSAGE_DATA_LEN],
}

impl Default for Message {
    fn default() -> Self {
        Self {
            rx: 0,
            tx: 0,
            ln: 0,
            nr: 0,
            a: 0,
            f: 0,
            b: 0,
            e: 0,
            data: [0; MESSAGE_DATA_LEN],
        }
    }
}

impl core::fmt::Debug for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Message")
            .field("rx", &self.rx)
            .field("tx", &self.tx)
            .field("ln", &self.ln)
            .field("nr", &self.nr)
            .field("a", &self.a)
            .field("f", &self.f)
            .field("b", &self.b)
            .field("e", &self.e)
            .field("data", &self.payload())
            .finish()
    }
}

impl Message {
    /// A request from the host to the given task.
    pub fn request(rx: u8, command: u8) -> Self {
        Self {
            rx,
            tx: consts::TASK_HOST,
            b: command,
            ..Default::default()
        }
    }

    /// A request to clear the device database of the board.
    pub fn clear_database() -> Self {
        let mut msg = Self::request(consts::TASK_OS, consts::CMD_DATABASE);
        msg.data[0] = consts::DATABASE_CLEAR;
        msg.data[1] = consts::DATABASE_CLEAR_OFFSET;
        msg.ln = 2;
        msg
    }

    /// Valid part of the data.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.ln)]
    }

    /// Build an explicit messaging telegram: header followed by `data`.
    ///
    /// `data` is truncated to what fits into a single message.
    pub fn telegram(command: u8, header: TelegramHeader, data: &[u8]) -> Self {
        let mut msg = Self::request(consts::TASK_DNM, command);
        header.write(&mut msg.data[..TELEGRAM_HEADER_LEN]);
        let len = data.len().min(MESSAGE_DATA_LEN - TELEGRAM_HEADER_LEN);
        msg.data[TELEGRAM_HEADER_LEN..][..len].copy_from_slice(&data[..len]);
        msg.ln = (TELEGRAM_HEADER_LEN + len) as u8;
        msg
    }

    pub fn telegram_header(&self) -> TelegramHeader {
        TelegramHeader::read(&self.data[..TELEGRAM_HEADER_LEN])
    }

    /// Data following the telegram header.
    pub fn telegram_data(&self) -> &[u8] {
        let len = usize::from(self.ln).max(TELEGRAM_HEADER_LEN);
        &self.data[TELEGRAM_HEADER_LEN..len]
    }

    /// Build a download message for the given area (bus parameters or a device record).
    fn download(area: u8, record: impl FnOnce(&mut [u8]) -> usize) -> Self {
        let mut msg = Self::request(consts::TASK_DNM, consts::CMD_DOWNLOAD);
        msg.data[0] = 0; // request additional
        msg.data[1] = area;
        msg.data[2..4].copy_from_slice(&0u16.to_le_bytes());
        let len = record(&mut msg.data[DOWNLOAD_HEADER_LEN..]);
        msg.ln = (DOWNLOAD_HEADER_LEN + len) as u8;
        msg
    }

    /// Area code of a download message.
    pub fn download_area(&self) -> u8 {
        self.data[1]
    }

    /// Record carried by a download message.
    pub fn download_record(&self) -> &[u8] {
        let len = usize::from(self.ln).max(DOWNLOAD_HEADER_LEN);
        &self.data[DOWNLOAD_HEADER_LEN..len]
    }
}

/// Header in front of explicit messaging data
pub const TELEGRAM_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelegramHeader {
    pub device_address: u8,
    /// Object class
    pub data_area: u8,
    /// Object instance
    pub data_address: u16,
    /// Attribute
    pub data_index: u8,
    pub data_count: u8,
    pub data_type: u8,
    /// Read, write, or the service code
    pub function: u8,
}

impl TelegramHeader {
    fn write(&self, buf: &mut [u8]) {
        buf[0] = self.device_address;
        buf[1] = self.data_area;
        buf[2..4].copy_from_slice(&self.data_address.to_le_bytes());
        buf[4] = self.data_index;
        buf[5] = self.data_count;
        buf[6] = self.data_type;
        buf[7] = self.function;
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            device_address: buf[0],
            data_area: buf[1],
            data_address: u16::from_le_bytes([buf[2], buf[3]]),
            data_index: buf[4],
            data_count: buf[5],
            data_type: buf[6],
            function: buf[7],
        }
    }
}

/// `req_add`, `area`, `offset` in front of every download record
pub const DOWNLOAD_HEADER_LEN: usize = 4;

/// Bus parameters of the master itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusParameters {
    pub own_address: crate::Address,
    pub vendor_id: u16,
    pub baudrate: crate::Baudrate,
    pub auto_clear: bool,
    pub consumed_size: u8,
    pub consumed_offset: u16,
    pub produced_size: u8,
    pub produced_offset: u16,
}

pub const BUS_PARAMETERS_LEN: usize = 11;

fn dnm_baudrate(baudrate: crate::Baudrate) -> u8 {
    match baudrate {
        crate::Baudrate::B125k => consts::DNM_BAUD_125K,
        crate::Baudrate::B250k => consts::DNM_BAUD_250K,
        crate::Baudrate::B500k => consts::DNM_BAUD_500K,
    }
}

fn baudrate_from_dnm(code: u8) -> Option<crate::Baudrate> {
    match code {
        consts::DNM_BAUD_125K => Some(crate::Baudrate::B125k),
        consts::DNM_BAUD_250K => Some(crate::Baudrate::B250k),
        consts::DNM_BAUD_500K => Some(crate::Baudrate::B500k),
        _ => None,
    }
}

impl BusParameters {
    pub fn to_message(&self) -> Message {
        Message::download(consts::AREA_BUS_PARAMETERS, |buf| {
            buf[0] = self.own_address;
            buf[1..3].copy_from_slice(&self.vendor_id.to_le_bytes());
            buf[3] = dnm_baudrate(self.baudrate);
            buf[4] = u8::from(self.auto_clear);
            buf[5] = self.consumed_size;
            buf[6..8].copy_from_slice(&self.consumed_offset.to_le_bytes());
            buf[8] = self.produced_size;
            buf[9..11].copy_from_slice(&self.produced_offset.to_le_bytes());
            BUS_PARAMETERS_LEN
        })
    }

    pub fn parse(record: &[u8]) -> Option<Self> {
        if record.len() < BUS_PARAMETERS_LEN {
            return None;
        }
        Some(Self {
            own_address: record[0],
            vendor_id: u16::from_le_bytes([record[1], record[2]]),
            baudrate: baudrate_from_dnm(record[3])?,
            auto_clear: record[4] != 0,
            consumed_size: record[5],
            consumed_offset: u16::from_le_bytes([record[6], record[7]]),
            produced_size: record[8],
            produced_offset: u16::from_le_bytes([record[9], record[10]]),
        })
    }
}

/// Fixed header at the start of a device record
pub const DEVICE_HEADER_LEN: usize = 20;
/// Connection type, watchdog action, production inhibit, EPR, module count
pub const IO_OBJECT_HEADER_LEN: usize = 7;
pub const IO_MODULE_LEN: usize = 2;
pub const EXPLICIT_ATTRIBUTES_LEN: usize = 2;
pub const UCMM_CONFIG_LEN: usize = 2;
pub const UCMM_ADDRESS_TABLE_LEN: usize = 4;

/// Translate connection type bits into the DNM task's representation.
pub fn dnm_connection_type(ct: ConnectionType) -> u8 {
    let mut bits = 0;
    if ct.contains(ConnectionType::POLLED) {
        bits |= consts::DNM_TYPE_POLLED;
    }
    if ct.contains(ConnectionType::STROBED) {
        bits |= consts::DNM_TYPE_BIT_STROBED;
    }
    if ct.contains(ConnectionType::CHANGE_OF_STATE) {
        bits |= consts::DNM_TYPE_CHANGE_OF_STATE;
    }
    if ct.contains(ConnectionType::CYCLIC) {
        bits |= consts::DNM_TYPE_CYCLIC;
    }
    bits
}

fn connection_type_from_dnm(bits: u8) -> ConnectionType {
    let mut ct = ConnectionType::empty();
    ct.set(ConnectionType::POLLED, bits & consts::DNM_TYPE_POLLED != 0);
    ct.set(ConnectionType::STROBED, bits & consts::DNM_TYPE_BIT_STROBED != 0);
    ct.set(
        ConnectionType::CHANGE_OF_STATE,
        bits & consts::DNM_TYPE_CHANGE_OF_STATE != 0,
    );
    ct.set(ConnectionType::CYCLIC, bits & consts::DNM_TYPE_CYCLIC != 0);
    ct
}

/// Configuration record of one slave device
///
/// Offsets are only present for directions with a non-zero size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub address: crate::Address,
    pub connection_type: ConnectionType,
    pub expected_packet_rate: u16,
    pub consumed_size: u8,
    pub produced_size: u8,
    pub input_offset: Option<u16>,
    pub output_offset: Option<u16>,
}

impl DeviceRecord {
    fn module_count(&self) -> usize {
        usize::from(self.consumed_size > 0) + usize::from(self.produced_size > 0)
    }

    /// Length of the predefined master/slave configuration section.
    pub fn config_len(&self) -> usize {
        2 + IO_OBJECT_HEADER_LEN + IO_MODULE_LEN * self.module_count()
    }

    /// Length of the address table section.
    pub fn address_table_len(&self) -> usize {
        4 + 2 * (usize::from(self.input_offset.is_some())
            + usize::from(self.output_offset.is_some()))
    }

    /// Total record length as stored in its header.
    pub fn record_len(&self) -> usize {
        DEVICE_HEADER_LEN
            + self.config_len()
            + self.address_table_len()
            + EXPLICIT_ATTRIBUTES_LEN
            + UCMM_CONFIG_LEN
            + UCMM_ADDRESS_TABLE_LEN
    }

    fn encode(&self, buf: &mut [u8]) -> usize {
        let total = self.record_len();

        // Fixed header
        buf[0..2].copy_from_slice(&(total as u16).to_le_bytes());
        buf[2] = consts::DEVICE_FLAG_ACTIVE;
        buf[3] = 0; // UCMM group
        buf[4..6].copy_from_slice(&consts::REC_FRAG_TIMER.to_le_bytes());
        // Vendor ID, device type, product code, revision, and octet string are not checked.
        buf[6..DEVICE_HEADER_LEN].fill(0);
        let mut cursor = DEVICE_HEADER_LEN;

        // Predefined master/slave connection configuration
        let cfg = &mut buf[cursor..];
        cfg[0..2].copy_from_slice(&(self.config_len() as u16).to_le_bytes());
        cfg[2] = dnm_connection_type(self.connection_type);
        cfg[3] = consts::DNM_TRANSMISSION_TO_TIMEOUT;
        cfg[4..6].copy_from_slice(&consts::PRODUCTION_INHIBIT_TIME.to_le_bytes());
        cfg[6..8].copy_from_slice(&self.expected_packet_rate.to_le_bytes());
        cfg[8] = self.module_count() as u8;
        let mut m = 2 + IO_OBJECT_HEADER_LEN;
        if self.consumed_size > 0 {
            cfg[m] = consts::DATA_TYPE_STRING;
            cfg[m + 1] = self.consumed_size;
            m += IO_MODULE_LEN;
        }
        if self.produced_size > 0 {
            cfg[m] = consts::DATA_TYPE_STRING | consts::DATA_TYPE_OUTPUT;
            cfg[m + 1] = self.produced_size;
        }
        cursor += self.config_len();

        // Address table
        let tab = &mut buf[cursor..];
        tab[0..2].copy_from_slice(&(self.address_table_len() as u16).to_le_bytes());
        tab[2] = u8::from(self.input_offset.is_some());
        tab[3] = u8::from(self.output_offset.is_some());
        let mut t = 4;
        for offset in self.input_offset.iter().chain(self.output_offset.iter()) {
            tab[t..t + 2].copy_from_slice(&offset.to_le_bytes());
            t += 2;
        }
        cursor += self.address_table_len();

        // Explicit attribute table and UCMM configuration, both empty
        buf[cursor..cursor + 2].copy_from_slice(&(EXPLICIT_ATTRIBUTES_LEN as u16).to_le_bytes());
        cursor += EXPLICIT_ATTRIBUTES_LEN;
        buf[cursor..cursor + 2].copy_from_slice(&(UCMM_CONFIG_LEN as u16).to_le_bytes());
        cursor += UCMM_CONFIG_LEN;
        buf[cursor..cursor + 2].copy_from_slice(&(UCMM_ADDRESS_TABLE_LEN as u16).to_le_bytes());
        buf[cursor + 2] = 0;
        buf[cursor + 3] = 0;
        cursor += UCMM_ADDRESS_TABLE_LEN;

        debug_assert_eq!(cursor, total);
        total
    }

    pub fn to_message(&self) -> Message {
        Message::download(self.address, |buf| self.encode(buf))
    }

    /// Decode a device record, reporting inconsistencies the way the DNM task does.
    pub fn parse(address: crate::Address, record: &[u8]) -> Result<Self, super::TaskError> {
        use super::TaskError;

        let field = |at: usize| -> Result<u16, TaskError> {
            record
                .get(at..at + 2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .ok_or(TaskError::DATA_SET_FIELD_LEN)
        };

        let total = usize::from(field(0)?);
        if total != record.len() || total < DEVICE_HEADER_LEN {
            return Err(TaskError::DATA_SET_FIELD_LEN);
        }

        let mut cursor = DEVICE_HEADER_LEN;
        let config_len = usize::from(field(cursor)?);
        let cfg = record
            .get(cursor..cursor + config_len)
            .filter(|c| c.len() >= 2 + IO_OBJECT_HEADER_LEN)
            .ok_or(TaskError::PRED_MSTSL_CFG_FIELD_LEN)?;
        let connection_type = connection_type_from_dnm(cfg[2]);
        if connection_type.is_empty() {
            return Err(TaskError::WRONG_TYPE_OF_CONNECTION);
        }
        let expected_packet_rate = u16::from_le_bytes([cfg[6], cfg[7]]);
        let modules = usize::from(cfg[8]);
        if cfg.len() != 2 + IO_OBJECT_HEADER_LEN + IO_MODULE_LEN * modules {
            return Err(TaskError::PRED_MSTSL_CFG_FIELD_LEN);
        }
        let mut consumed_size = 0;
        let mut produced_size = 0;
        for module in cfg[2 + IO_OBJECT_HEADER_LEN..].chunks_exact(IO_MODULE_LEN) {
            if module[0] & !consts::DATA_TYPE_OUTPUT != consts::DATA_TYPE_STRING {
                return Err(TaskError::UNKNOWN_DATA_TYPE);
            }
            if module[0] & consts::DATA_TYPE_OUTPUT != 0 {
                produced_size = module[1];
            } else {
                consumed_size = module[1];
            }
        }
        cursor += config_len;

        let table_len = usize::from(field(cursor)?);
        let tab = record
            .get(cursor..cursor + table_len)
            .filter(|t| t.len() >= 4)
            .ok_or(TaskError::PRED_MST_SL_ADD_LEN)?;
        let inputs = usize::from(tab[2]);
        let outputs = usize::from(tab[3]);
        if tab.len() != 4 + 2 * (inputs + outputs) {
            return Err(TaskError::PRED_MST_SL_ADD_TAB_INCONS);
        }
        if inputs != usize::from(consumed_size > 0) {
            return Err(TaskError::CFG_ADD_INPUT_INCONS);
        }
        if outputs != usize::from(produced_size > 0) {
            return Err(TaskError::CFG_ADD_OUTPUT_INCONS);
        }
        let offset_at = |i: usize| u16::from_le_bytes([tab[4 + 2 * i], tab[5 + 2 * i]]);
        let input_offset = (inputs > 0).then(|| offset_at(0));
        let output_offset = (outputs > 0).then(|| offset_at(inputs));
        cursor += table_len;

        if usize::from(field(cursor)?) != EXPLICIT_ATTRIBUTES_LEN {
            return Err(TaskError::EXPL_PRM_FIELD_LEN);
        }

        Ok(Self {
            address,
            connection_type,
            expected_packet_rate,
            consumed_size,
            produced_size,
            input_offset,
            output_offset,
        })
    }
}
