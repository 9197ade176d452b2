use bitvec::array::BitArray;
use bitvec::order::Lsb0;

use crate::consts;

/// One bit per MAC ID, byte `address / 8`, bit `address % 8`
pub type StationBits = bitvec::BitArr!(for crate::MAX_DEVICES, in u8, Lsb0);

/// Global state of the DNM task as reported through the task state area
///
/// Layout (little endian):
///
/// | offset | content                          |
/// |--------|----------------------------------|
/// | 0      | global state                     |
/// | 1      | MAC ID of last faulty device     |
/// | 2      | last error event                 |
/// | 4..6   | bus error counter                |
/// | 6..8   | bus timeout counter              |
/// | 8..16  | devices configured               |
/// | 16..24 | device state, reserved half      |
/// | 24..32 | devices connected                |
/// | 32..40 | devices with new diagnostics     |
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalDiagnostics {
    pub state: u8,
    pub error_address: crate::Address,
    pub error_event: u8,
    pub bus_error_count: u16,
    pub timeout_count: u16,
    pub configured: StationBits,
    pub connected: StationBits,
    pub diagnostics: StationBits,
}

/// Status of a single device as seen by the coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSlot {
    pub configured: bool,
    pub connected: bool,
    pub new_diagnostics: bool,
}

fn station_bits(buf: &[u8]) -> StationBits {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[..8]);
    BitArray::new(raw)
}

impl GlobalDiagnostics {
    pub const LEN: usize = 40;

    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(Self {
            state: buf[0],
            error_address: buf[1],
            error_event: buf[2],
            bus_error_count: u16::from_le_bytes([buf[4], buf[5]]),
            timeout_count: u16::from_le_bytes([buf[6], buf[7]]),
            configured: station_bits(&buf[8..16]),
            connected: station_bits(&buf[24..32]),
            diagnostics: station_bits(&buf[32..40]),
        })
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..Self::LEN].fill(0);
        buf[0] = self.state;
        buf[1] = self.error_address;
        buf[2] = self.error_event;
        buf[4..6].copy_from_slice(&self.bus_error_count.to_le_bytes());
        buf[6..8].copy_from_slice(&self.timeout_count.to_le_bytes());
        buf[8..16].copy_from_slice(self.configured.as_raw_slice());
        buf[24..32].copy_from_slice(self.connected.as_raw_slice());
        buf[32..40].copy_from_slice(self.diagnostics.as_raw_slice());
    }

    /// The DNM task has entered OPERATE.
    #[inline(always)]
    pub fn is_operate(&self) -> bool {
        self.state == consts::STATE_OPERATE
    }

    /// The OPERATE bits are set (the task may additionally report other state bits).
    #[inline(always)]
    pub fn has_operate(&self) -> bool {
        self.state & consts::STATE_OPERATE == consts::STATE_OPERATE
    }

    pub fn slot(&self, address: crate::Address) -> DeviceSlot {
        let i = usize::from(address);
        if i >= crate::MAX_DEVICES {
            return DeviceSlot::default();
        }
        DeviceSlot {
            configured: self.configured[i],
            connected: self.connected[i],
            new_diagnostics: self.diagnostics[i],
        }
    }
}

bitflags::bitflags! {
    /// First status byte of the device diagnostics
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceFaults: u8 {
        /// Device does not answer
        const NO_RESPONSE = 0x01;
        /// Connection sizes configured in the master differ from the device
        const CONFIG_FAULT = 0x04;
        /// Device refused an attribute during parameterization
        const PARAMETER_FAULT = 0x40;
    }
}

/// Reply data of a device diagnostics request
///
/// Layout: faults, two reserved status bytes, online error, general error code, additional
/// error code, heartbeat timer (2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceDiagnostics {
    pub faults: DeviceFaults,
    pub online_error: u8,
    pub general_error: u8,
    pub additional_code: u8,
    pub heartbeat: u16,
}

impl DeviceDiagnostics {
    pub const LEN: usize = 8;

    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(Self {
            faults: DeviceFaults::from_bits_retain(buf[0]),
            online_error: buf[3],
            general_error: buf[4],
            additional_code: buf[5],
            heartbeat: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..Self::LEN].fill(0);
        buf[0] = self.faults.bits();
        buf[3] = self.online_error;
        buf[4] = self.general_error;
        buf[5] = self.additional_code;
        buf[6..8].copy_from_slice(&self.heartbeat.to_le_bytes());
    }

    /// Turn the diagnostics into an error, if they report one.
    ///
    /// An explicit error response wins over any other online error, which in turn wins over the
    /// fault bits.
    pub fn evaluate(&self, board: u16, device: crate::Address) -> crate::Result<()> {
        use super::{DriverStatus, TaskError};

        if self.online_error == consts::ONLINE_ERROR_RESPONSE {
            return Err(crate::Error::explicit(
                device,
                self.general_error,
                self.additional_code,
            ));
        }
        if self.online_error != 0 {
            return super::status::classify(
                DriverStatus::NO_ERROR,
                TaskError(self.online_error),
                board,
                device,
            );
        }

        let status = if self.faults.contains(DeviceFaults::NO_RESPONSE) {
            DriverStatus::DEV_NOT_RESPONDING
        } else if self.faults.contains(DeviceFaults::PARAMETER_FAULT) {
            DriverStatus::DEV_ATTR_ACCESS_DENIED
        } else if self.faults.contains(DeviceFaults::CONFIG_FAULT) {
            DriverStatus::DEV_CONN_LEN_DIFF
        } else {
            DriverStatus::NO_ERROR
        };
        super::status::classify(status, TaskError::OK, board, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cif::DriverStatus;
    use crate::error::BoardFault;

    #[test]
    fn slot_bits() {
        let mut diag = GlobalDiagnostics {
            state: consts::STATE_OPERATE,
            ..Default::default()
        };
        diag.configured.set(5, true);
        diag.connected.set(5, true);
        diag.diagnostics.set(13, true);

        let mut buf = [0u8; GlobalDiagnostics::LEN];
        diag.encode(&mut buf);
        assert_eq!(buf[8], 0x20);
        assert_eq!(buf[24], 0x20);
        assert_eq!(buf[33], 0x20);

        let parsed = GlobalDiagnostics::parse(&buf).unwrap();
        assert!(parsed.is_operate());
        assert_eq!(
            parsed.slot(5),
            DeviceSlot {
                configured: true,
                connected: true,
                new_diagnostics: false,
            }
        );
        assert!(parsed.slot(13).new_diagnostics);
        assert_eq!(parsed.slot(64), DeviceSlot::default());
    }

    #[test]
    fn operate_bits() {
        let diag = GlobalDiagnostics {
            state: consts::STATE_OPERATE | 0x01,
            ..Default::default()
        };
        assert!(diag.has_operate());
        assert!(!diag.is_operate());
    }

    fn board_status(result: crate::Result<()>) -> Option<DriverStatus> {
        match result {
            Err(crate::Error::Board {
                fault: BoardFault::Driver(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    #[rstest::rstest]
    #[case(DeviceFaults::NO_RESPONSE, DriverStatus::DEV_NOT_RESPONDING)]
    #[case(DeviceFaults::all(), DriverStatus::DEV_NOT_RESPONDING)]
    #[case(
        DeviceFaults::PARAMETER_FAULT | DeviceFaults::CONFIG_FAULT,
        DriverStatus::DEV_ATTR_ACCESS_DENIED
    )]
    #[case(DeviceFaults::CONFIG_FAULT, DriverStatus::DEV_CONN_LEN_DIFF)]
    fn fault_priority(#[case] faults: DeviceFaults, #[case] expected: DriverStatus) {
        let diag = DeviceDiagnostics {
            faults,
            ..Default::default()
        };
        assert_eq!(board_status(diag.evaluate(0, 5)), Some(expected));
    }

    #[test]
    fn explicit_error_response() {
        let diag = DeviceDiagnostics {
            faults: DeviceFaults::NO_RESPONSE,
            online_error: consts::ONLINE_ERROR_RESPONSE,
            general_error: 0x14,
            additional_code: 0xFF,
            heartbeat: 0,
        };
        assert_eq!(diag.evaluate(0, 9), Err(crate::Error::explicit(9, 0x14, 0xFF)));
    }

    #[test]
    fn online_error_is_task_error() {
        let diag = DeviceDiagnostics {
            online_error: 0x1e,
            ..Default::default()
        };
        assert_eq!(
            diag.evaluate(1, 9),
            Err(crate::Error::Board {
                board: 1,
                device: 9,
                fault: BoardFault::Task(crate::cif::TaskError(0x1e)),
            })
        );
        assert_eq!(DeviceDiagnostics::default().evaluate(1, 9), Ok(()));
    }
}
