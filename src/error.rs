//! Error taxonomy shared by both backends
//!
//! All operations return a [`Result`].  The rendered message of the most recent failing public
//! operation is additionally kept per thread and can be fetched with [`last_error_message()`]
//! for callers that only want to log a string.
use std::cell::RefCell;

use crate::cif::{DriverStatus, TaskError};

pub type Result<T> = core::result::Result<T, Error>;

/// Failure reported by a board driver call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardFault {
    /// Status code returned by the driver library itself
    Driver(DriverStatus),
    /// Error byte reported by the coprocessor task in a reply message
    Task(TaskError),
}

impl core::fmt::Display for BoardFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BoardFault::Driver(s) => write!(f, "E{}: {}", s.0, s),
            BoardFault::Task(t) => write!(f, "TE{}: {}", t.0, t),
        }
    }
}

/// General status code of a DeviceNet explicit error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralStatus(pub u8);

impl GeneralStatus {
    pub const SUCCESS: GeneralStatus = GeneralStatus(0x00);
    pub const RESOURCE_UNAVAILABLE: GeneralStatus = GeneralStatus(0x02);
    pub const SERVICE_UNAVAILABLE: GeneralStatus = GeneralStatus(0x08);
    pub const INVALID_ATTRIBUTE_VALUE: GeneralStatus = GeneralStatus(0x09);
    pub const ALREADY_IN_REQUESTED_MODE: GeneralStatus = GeneralStatus(0x0B);
    pub const OBJECT_STATE_CONFLICT: GeneralStatus = GeneralStatus(0x0C);
    pub const ATTRIBUTE_NOT_SETTABLE: GeneralStatus = GeneralStatus(0x0E);
    pub const PRIVILEGE_VIOLATION: GeneralStatus = GeneralStatus(0x0F);
    pub const DEVICE_STATE_CONFLICT: GeneralStatus = GeneralStatus(0x10);
    pub const REPLY_DATA_TOO_LARGE: GeneralStatus = GeneralStatus(0x11);
    pub const NOT_ENOUGH_DATA: GeneralStatus = GeneralStatus(0x13);
    pub const ATTRIBUTE_NOT_SUPPORTED: GeneralStatus = GeneralStatus(0x14);
    pub const TOO_MUCH_DATA: GeneralStatus = GeneralStatus(0x15);
    pub const OBJECT_DOES_NOT_EXIST: GeneralStatus = GeneralStatus(0x16);
    pub const REPLY_BUFFER_TOO_SMALL: GeneralStatus = GeneralStatus(0x17);
    pub const VENDOR_SPECIFIC: GeneralStatus = GeneralStatus(0x1F);
    /// Placeholder for "no additional code"
    pub const NONE: GeneralStatus = GeneralStatus(0xFF);

    pub fn description(self) -> &'static str {
        match self.0 {
            0x00 => "OK",
            0x02 => "Resource unavailable",
            0x08 => "Service unavailable",
            0x09 => "Invalid attribute value",
            0x0B => "Already in request mode",
            0x0C => "Object state conflict",
            0x0E => "Attribute not settable",
            0x0F => "Permission check failed",
            0x10 => "State prohibits the execution",
            0x11 => "No response from device",
            0x13 => "Not enough data received",
            0x14 => "Attribute not supported",
            0x15 => "Too much data received",
            0x16 => "Object doesn't exist",
            0x17 => "Data large buffer small",
            0x1F => "Vendor specific. See additional",
            0xFF => "No",
            _ => "Unknown",
        }
    }
}

impl core::fmt::Display for GeneralStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:X} - {}", self.0, self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error.")]
    Unknown,

    #[error("EXT: {0}")]
    External(String),

    #[error("NI-DNET (Intf:dnet{interface} Dev:{device}): {message}")]
    NiDnet {
        interface: u8,
        device: crate::Address,
        status: i32,
        message: String,
    },

    #[error("CIF (Board:{board} Dev:{device}): {fault}")]
    Board {
        board: u16,
        device: crate::Address,
        fault: BoardFault,
    },

    /// The device answered an explicit request with an error response.
    #[error("EM (Dev:{device}): {general}, {additional}")]
    Explicit {
        device: crate::Address,
        general: GeneralStatus,
        additional: GeneralStatus,
    },

    #[error("Can't allocate memory.")]
    CannotAllocateMemory,

    #[error("Invalid function pointer (NULL).")]
    InvalidFunctionPointer,

    #[error("Invalid value for parameter '{parameter}'={value} of function {function}.")]
    InvalidArgument {
        parameter: &'static str,
        value: String,
        function: &'static str,
    },

    #[error("{0}: Interface must not be operational.")]
    MustNotBeOperational(&'static str),

    #[error("{0}: Interface must be operational.")]
    NotOperational(&'static str),

    /// The interface referenced by a device is gone (or busy).
    #[error("Dev:{device} : Invalid pointer {name}.")]
    InvalidPointer {
        device: crate::Address,
        name: &'static str,
    },

    #[error("Dev:{device} : Invalid interface. Must be of type {expected}.")]
    InvalidInterface {
        device: crate::Address,
        expected: crate::Kind,
    },

    #[error("Dev:{0} : Device not allocated.")]
    NotAllocated(crate::Address),

    #[error("Dev:{0} : Device not using I/O connection.")]
    NotUsingIoConnection(crate::Address),

    #[error("Dev:{0} : Device not using EM connection.")]
    NotUsingExplicitConnection(crate::Address),

    #[error("{0} - No such vendor ID!")]
    UnknownVendor(u16),

    #[error("{0} - No such device type ID!")]
    UnknownDeviceType(u16),
}

impl Error {
    /// Numeric error code of this error's class.
    pub fn code(&self) -> i32 {
        match self {
            Error::Unknown => 1,
            Error::External(_) => 2,
            Error::NiDnet { .. } => 4,
            Error::Board { .. } => 5,
            Error::Explicit { .. } => 6,
            Error::CannotAllocateMemory => 10,
            Error::InvalidFunctionPointer => 20,
            Error::InvalidArgument { .. } => 21,
            Error::MustNotBeOperational(_) => 101,
            Error::NotOperational(_) => 102,
            Error::InvalidPointer { .. } => 103,
            Error::InvalidInterface { .. } => 104,
            Error::NotAllocated(_) => 105,
            Error::NotUsingIoConnection(_) => 106,
            Error::NotUsingExplicitConnection(_) => 107,
            Error::UnknownVendor(_) => 108,
            Error::UnknownDeviceType(_) => 109,
        }
    }

    pub(crate) fn explicit(device: crate::Address, general: u8, additional: u8) -> Self {
        Error::Explicit {
            device,
            general: GeneralStatus(general),
            additional: GeneralStatus(additional),
        }
    }
}

std::thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Message of the most recent failed operation on this thread.
///
/// Empty if the most recent operation succeeded.
pub fn last_error_message() -> String {
    LAST_ERROR.with_borrow(|m| m.clone())
}

/// Remember an error message without affecting the outcome of the current operation.
pub(crate) fn record(error: &Error) {
    LAST_ERROR.with_borrow_mut(|m| *m = error.to_string());
}

/// Update the last error message from the outcome of a public operation.
pub(crate) fn track<T>(result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => LAST_ERROR.with_borrow_mut(|m| m.clear()),
        Err(e) => record(e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_status_table() {
        for code in 0x00..=0x1F {
            assert!(!GeneralStatus(code).description().is_empty());
        }
        assert_eq!(GeneralStatus(0x14).description(), "Attribute not supported");
        assert_eq!(GeneralStatus(0x01).description(), "Unknown");
        assert_eq!(GeneralStatus(0xFF).description(), "No");
        assert_eq!(GeneralStatus(0x40).description(), "Unknown");
    }

    #[test]
    fn message_formats() {
        assert_eq!(
            Error::explicit(5, 0x14, 0xFF).to_string(),
            "EM (Dev:5): 0x14 - Attribute not supported, 0xFF - No"
        );
        assert_eq!(
            Error::NotOperational("ReadIOData").to_string(),
            "ReadIOData: Interface must be operational."
        );
        assert_eq!(
            Error::NotAllocated(12).to_string(),
            "Dev:12 : Device not allocated."
        );
        assert_eq!(
            Error::InvalidInterface {
                device: 3,
                expected: crate::Kind::CifInterface
            }
            .to_string(),
            "Dev:3 : Invalid interface. Must be of type CCIFInterface."
        );
        assert_eq!(
            Error::InvalidArgument {
                parameter: "mode",
                value: "7".into(),
                function: "Reset",
            }
            .to_string(),
            "Invalid value for parameter 'mode'=7 of function Reset."
        );
        assert_eq!(
            Error::Board {
                board: 1,
                device: 0,
                fault: BoardFault::Driver(DriverStatus(-17)),
            }
            .to_string(),
            "CIF (Board:1 Dev:0): E-17: (DEVICE) PutMessage timeout"
        );
        assert_eq!(
            Error::Board {
                board: 0,
                device: 7,
                fault: BoardFault::Task(TaskError(57)),
            }
            .to_string(),
            "CIF (Board:0 Dev:7): TE57: Duplicate MAC-ID detected"
        );
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            Error::Unknown,
            Error::External(String::new()),
            Error::CannotAllocateMemory,
            Error::InvalidFunctionPointer,
            Error::MustNotBeOperational(""),
            Error::NotOperational(""),
            Error::NotAllocated(0),
            Error::NotUsingIoConnection(0),
            Error::NotUsingExplicitConnection(0),
            Error::UnknownVendor(0),
            Error::UnknownDeviceType(0),
        ];
        for (i, a) in errors.iter().enumerate() {
            assert_ne!(a.code(), 0);
            for b in &errors[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn last_error_tracking() {
        let _ = track::<()>(Err(Error::NotAllocated(3)));
        assert_eq!(last_error_message(), "Dev:3 : Device not allocated.");
        let _ = track(Ok(()));
        assert_eq!(last_error_message(), "");
    }
}
