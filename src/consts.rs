//! Wire-level constants of the board coprocessor protocol

/// Vendor ID the master reports in its bus parameters (Hilscher GmbH)
pub const MASTER_VENDOR_ID: u16 = 283;

/// Task numbers on the coprocessor
pub const TASK_OS: u8 = 0;
pub const TASK_DNM: u8 = 3;
pub const TASK_HOST: u8 = 16;

/// Task the protocol parameters and global diagnostics belong to
pub const PROTOCOL_TASK: u16 = 2;

/// Message commands
pub const CMD_DATABASE: u8 = 6;
pub const CMD_DEVICE_DIAG: u8 = 66;
pub const CMD_DOWNLOAD: u8 = 68;
pub const CMD_GET_SET_ATTRIBUTE: u8 = 78;
pub const CMD_EXEC_SERVICE: u8 = 79;

/// Database sub-command "clear" and the area offset it acts on
pub const DATABASE_CLEAR: u8 = 4;
pub const DATABASE_CLEAR_OFFSET: u8 = 8;

/// Download area holding the bus parameters; device records use their MAC ID as area.
pub const AREA_BUS_PARAMETERS: u8 = 127;

/// Telegram function codes
pub const FUNCTION_READ: u8 = 1;
pub const FUNCTION_WRITE: u8 = 2;

/// Protocol task handshake mode: buffered, device controlled
pub const MODE_BUFFERED_DEVICE_CONTROLLED: u8 = 4;

/// Global DNM states reported in the task diagnostics
pub const STATE_OFFLINE: u8 = 0x00;
pub const STATE_STOP: u8 = 0x40;
pub const STATE_OPERATE: u8 = 0xC0;

/// Baudrate codes as understood by the DNM task
pub const DNM_BAUD_125K: u8 = 0;
pub const DNM_BAUD_250K: u8 = 1;
pub const DNM_BAUD_500K: u8 = 2;

/// Connection types in the I/O object header
pub const DNM_TYPE_POLLED: u8 = 0x02;
pub const DNM_TYPE_BIT_STROBED: u8 = 0x04;
pub const DNM_TYPE_CHANGE_OF_STATE: u8 = 0x10;
pub const DNM_TYPE_CYCLIC: u8 = 0x20;

/// Watchdog timeout action: transition to timed out
pub const DNM_TRANSMISSION_TO_TIMEOUT: u8 = 0;

/// Production inhibit time configured for every I/O connection (ms)
pub const PRODUCTION_INHIBIT_TIME: u16 = 10;

/// Fragmentation timer configured for every device (ms)
pub const REC_FRAG_TIMER: u16 = 1000;

/// Device parameter flag: device active
pub const DEVICE_FLAG_ACTIVE: u8 = 0x80;

/// I/O module data types
pub const DATA_TYPE_STRING: u8 = 10;
pub const DATA_TYPE_OUTPUT: u8 = 0x80;

/// Online error signalling that the device answered with an explicit error response
pub const ONLINE_ERROR_RESPONSE: u8 = 0x23;

/// Highest general status code an explicit error response can carry
pub const MAX_GENERAL_STATUS: u8 = 0x1F;

/// Slave status bitmap in the dual-port memory
pub const DPM_SLAVE_STATUS_OFFSET: u16 = 0x2F8;
pub const DPM_SLAVE_STATUS_LEN: usize = 8;

/// Host flags in the driver info
pub const HOST_FLAG_RUN: u8 = 0x40;
pub const HOST_FLAG_READY: u8 = 0x80;

/// Reset modes understood by the board driver
pub const RESET_COLDSTART: u16 = 2;
pub const RESET_WARMSTART: u16 = 3;
pub const RESET_BOOTSTART: u16 = 4;

/// Status codes at or above this offset are coprocessor (RCS) errors
pub const RCS_ERROR_OFFSET: i16 = 1000;

/// Explicit service codes
pub const SERVICE_RESET: u8 = 0x05;
pub const SERVICE_GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
pub const SERVICE_SET_ATTRIBUTE_SINGLE: u8 = 0x10;

/// Identity object
pub const CLASS_IDENTITY: u16 = 0x01;
