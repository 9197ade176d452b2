/// Status code returned by every SDK call
///
/// Zero is success, negative codes are errors, and positive codes are warnings: the call did its
/// job but something noteworthy happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NcStatus(pub i32);

const ERROR_BASE: u32 = 0xBFF6_2000;
const WARNING_BASE: u32 = 0x3FF6_2000;

const fn error(code: u32) -> NcStatus {
    NcStatus((ERROR_BASE | code) as i32)
}

const fn warning(code: u32) -> NcStatus {
    NcStatus((WARNING_BASE | code) as i32)
}

impl NcStatus {
    pub const SUCCESS: NcStatus = NcStatus(0);

    pub const ERR_TIMEOUT: NcStatus = error(0x001);
    pub const ERR_DRIVER: NcStatus = error(0x002);
    pub const ERR_BAD_NAME: NcStatus = error(0x003);
    pub const ERR_BAD_PARAM: NcStatus = error(0x004);
    pub const ERR_BAD_HANDLE: NcStatus = error(0x005);
    pub const ERR_ALREADY_OPEN: NcStatus = error(0x006);
    pub const ERR_NOT_STOPPED: NcStatus = error(0x007);
    pub const ERR_NOT_STARTED: NcStatus = error(0x008);
    pub const ERR_OVERFLOW: NcStatus = error(0x00A);
    pub const ERR_NO_DATA: NcStatus = error(0x00B);
    pub const ERR_OLD_DATA: NcStatus = error(0x00C);
    pub const ERR_DATA_LENGTH: NcStatus = error(0x012);
    pub const ERR_NO_DEVICE: NcStatus = error(0x030);
    pub const ERR_CONN_REFUSED: NcStatus = error(0x031);
    /// The device answered with an explicit error response.
    ///
    /// The device's error word is reported separately by the call that returned this status.
    pub const ERR_DNET_ERR_RESP: NcStatus = error(0x036);

    pub const WARN_OLD_DATA: NcStatus = warning(0x00C);
    pub const WARN_DATA_LENGTH: NcStatus = warning(0x012);
    pub const WARN_DUPLICATE_MAC: NcStatus = warning(0x033);

    #[inline(always)]
    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn is_error(self) -> bool {
        self.0 < 0
    }

    #[inline(always)]
    pub fn is_warning(self) -> bool {
        self.0 > 0
    }

    pub fn description(self) -> Option<&'static str> {
        Some(match self {
            NcStatus::SUCCESS => "Success",
            NcStatus::ERR_TIMEOUT => "Timeout expired while waiting for the desired state",
            NcStatus::ERR_DRIVER => "Driver call failed",
            NcStatus::ERR_BAD_NAME => "Invalid interface name",
            NcStatus::ERR_BAD_PARAM => "Invalid parameter",
            NcStatus::ERR_BAD_HANDLE => "Invalid object handle",
            NcStatus::ERR_ALREADY_OPEN => "Object is already open",
            NcStatus::ERR_NOT_STOPPED => "Interface must be stopped",
            NcStatus::ERR_NOT_STARTED => "Interface is not started",
            NcStatus::ERR_OVERFLOW => "Read queue overflow",
            NcStatus::ERR_NO_DATA => "No data available",
            NcStatus::ERR_OLD_DATA => "Data was already read",
            NcStatus::ERR_DATA_LENGTH => "Data length does not match the connection size",
            NcStatus::ERR_NO_DEVICE => "Device not responding",
            NcStatus::ERR_CONN_REFUSED => "Device refused the connection",
            NcStatus::ERR_DNET_ERR_RESP => "Device returned an error response",
            NcStatus::WARN_OLD_DATA => "Warning: data was already read",
            NcStatus::WARN_DATA_LENGTH => "Warning: data length differs from the connection size",
            NcStatus::WARN_DUPLICATE_MAC => "Warning: duplicate MAC ID check not completed",
            _ => return None,
        })
    }
}

impl core::fmt::Display for NcStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.description() {
            Some(d) => f.write_str(d),
            None if self.is_warning() => write!(f, "Unknown warning 0x{:08X}", self.0),
            None => write!(f, "Unknown error 0x{:08X}", self.0),
        }
    }
}
