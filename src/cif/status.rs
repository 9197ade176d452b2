use crate::consts::RCS_ERROR_OFFSET;

/// Status code returned by a board driver call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverStatus(pub i16);

impl DriverStatus {
    pub const NO_ERROR: DriverStatus = DriverStatus(0);

    pub const BOARD_NOT_INITIALIZED: DriverStatus = DriverStatus(-1);
    pub const INIT_STATE_ERROR: DriverStatus = DriverStatus(-2);
    pub const READ_STATE_ERROR: DriverStatus = DriverStatus(-3);
    pub const CMD_ACTIVE: DriverStatus = DriverStatus(-4);
    pub const PARAMETER_UNKNOWN: DriverStatus = DriverStatus(-5);
    pub const WRONG_DRIVER_VERSION: DriverStatus = DriverStatus(-6);
    pub const PCI_SET_CONFIG_MODE: DriverStatus = DriverStatus(-7);
    pub const PCI_READ_DPM_LENGTH: DriverStatus = DriverStatus(-8);
    pub const PCI_SET_RUN_MODE: DriverStatus = DriverStatus(-9);

    pub const DEV_DPM_ACCESS_ERROR: DriverStatus = DriverStatus(-10);
    pub const DEV_NOT_READY: DriverStatus = DriverStatus(-11);
    pub const DEV_NOT_RUNNING: DriverStatus = DriverStatus(-12);
    pub const DEV_WATCHDOG_FAILED: DriverStatus = DriverStatus(-13);
    pub const DEV_OS_VERSION_ERROR: DriverStatus = DriverStatus(-14);
    pub const DEV_SYSERR: DriverStatus = DriverStatus(-15);
    pub const DEV_MAILBOX_FULL: DriverStatus = DriverStatus(-16);
    pub const DEV_PUT_TIMEOUT: DriverStatus = DriverStatus(-17);
    pub const DEV_GET_TIMEOUT: DriverStatus = DriverStatus(-18);
    pub const DEV_GET_NO_MESSAGE: DriverStatus = DriverStatus(-19);
    pub const DEV_RESET_TIMEOUT: DriverStatus = DriverStatus(-20);
    pub const DEV_NO_COM_FLAG: DriverStatus = DriverStatus(-21);
    pub const DEV_EXCHANGE_FAILED: DriverStatus = DriverStatus(-22);
    pub const DEV_EXCHANGE_TIMEOUT: DriverStatus = DriverStatus(-23);
    pub const DEV_COM_MODE_UNKNOWN: DriverStatus = DriverStatus(-24);
    pub const DEV_FUNCTION_FAILED: DriverStatus = DriverStatus(-25);
    pub const DEV_DPMSIZE_MISMATCH: DriverStatus = DriverStatus(-26);
    pub const DEV_STATE_MODE_UNKNOWN: DriverStatus = DriverStatus(-27);

    pub const USR_OPEN_ERROR: DriverStatus = DriverStatus(-30);
    pub const USR_INIT_DRV_ERROR: DriverStatus = DriverStatus(-31);
    pub const USR_NOT_INITIALIZED: DriverStatus = DriverStatus(-32);
    pub const USR_COMM_ERR: DriverStatus = DriverStatus(-33);
    pub const USR_DEV_NUMBER_INVALID: DriverStatus = DriverStatus(-34);
    pub const USR_INFO_AREA_INVALID: DriverStatus = DriverStatus(-35);
    pub const USR_NUMBER_INVALID: DriverStatus = DriverStatus(-36);
    pub const USR_MODE_INVALID: DriverStatus = DriverStatus(-37);
    pub const USR_MSG_BUF_NULL_PTR: DriverStatus = DriverStatus(-38);
    pub const USR_MSG_BUF_TOO_SHORT: DriverStatus = DriverStatus(-39);
    pub const USR_SIZE_INVALID: DriverStatus = DriverStatus(-40);
    pub const USR_SIZE_ZERO: DriverStatus = DriverStatus(-42);
    pub const USR_SIZE_TOO_LONG: DriverStatus = DriverStatus(-43);
    pub const USR_DEV_PTR_NULL: DriverStatus = DriverStatus(-44);
    pub const USR_BUF_PTR_NULL: DriverStatus = DriverStatus(-45);
    pub const USR_SENDSIZE_TOO_LONG: DriverStatus = DriverStatus(-46);
    pub const USR_RECVSIZE_TOO_LONG: DriverStatus = DriverStatus(-47);
    pub const USR_SENDBUF_PTR_NULL: DriverStatus = DriverStatus(-48);
    pub const USR_RECVBUF_PTR_NULL: DriverStatus = DriverStatus(-49);

    pub const USR_FILE_OPEN_FAILED: DriverStatus = DriverStatus(-100);
    pub const USR_FILE_SIZE_ZERO: DriverStatus = DriverStatus(-101);
    pub const USR_FILE_NO_MEMORY: DriverStatus = DriverStatus(-102);
    pub const USR_FILE_READ_FAILED: DriverStatus = DriverStatus(-103);
    pub const USR_INVALID_FILETYPE: DriverStatus = DriverStatus(-104);
    pub const USR_FILENAME_INVALID: DriverStatus = DriverStatus(-105);

    /// Device diagnostics: device did not answer
    pub const DEV_NOT_RESPONDING: DriverStatus = DriverStatus(-501);
    /// Device diagnostics: parameterization was refused
    pub const DEV_ATTR_ACCESS_DENIED: DriverStatus = DriverStatus(-502);
    /// Device diagnostics: configured and actual connection sizes differ
    pub const DEV_CONN_LEN_DIFF: DriverStatus = DriverStatus(-503);

    /// Whether this status aborts the operation it was returned from.
    ///
    /// Negative values are driver errors, values from 1000 upwards are coprocessor errors.
    #[inline(always)]
    pub fn is_failure(self) -> bool {
        self.0 < 0 || self.0 >= RCS_ERROR_OFFSET
    }

    #[inline(always)]
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Static description, `None` for coprocessor errors and unknown codes.
    pub fn description(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "No error",
            -1 => "(DRIVER) Board not initialized",
            -2 => "(DRIVER) Error in internal init state",
            -3 => "(DRIVER) Error in internal read state",
            -4 => "(DRIVER) Command on this channel is active",
            -5 => "(DRIVER) Unknown parameter in function occured",
            -6 => "(DRIVER) Version is incompatible with DLL",
            -7 => "(DRIVER) Error during PCI set config mode",
            -8 => "(DRIVER) Could not read PCI dual port memory length",
            -9 => "(DRIVER) Error during PCI set run mode",
            -10 => "(DEVICE) Dual port ram not accessable(board not found)",
            -11 => "(DEVICE) Not ready (ready flag failed)",
            -12 => "(DEVICE) Not running (running flag failed)",
            -13 => "(DEVICE) Watchdog test failed",
            -14 => "(DEVICE) Signals wrong OS version",
            -15 => "(DEVICE) Error in dual port flags",
            -16 => "(DEVICE) Send mailbox is full",
            -17 => "(DEVICE) PutMessage timeout",
            -18 => "(DEVICE) GetMessage timeout",
            -19 => "(DEVICE) No message available",
            -20 => "(DEVICE) RESET command timeout",
            -21 => "(DEVICE) COM-flag not set",
            -22 => "(DEVICE) IO data exchange failed",
            -23 => "(DEVICE) IO data exchange timeout",
            -24 => "(DEVICE) IO data mode unknown",
            -25 => "(DEVICE) Function call failed",
            -26 => "(DEVICE) DPM size differs from configuration",
            -27 => "(DEVICE) State mode unknown",
            -30 => "(USER) Driver not opened (device driver not loaded)",
            -31 => "(USER) Can't connect with device",
            -32 => "(USER) Board not initialized (DevInitBoard not called)",
            -33 => "(USER) IOCTRL function failed",
            -34 => "(USER) Parameter DeviceNumber invalid",
            -35 => "(USER) Parameter InfoArea unknown",
            -36 => "(USER) Parameter Number invalid",
            -37 => "(USER) Parameter Mode invalid",
            -38 => "(USER) NULL pointer assignment",
            -39 => "(USER) Message buffer too short",
            -40 => "(USER) Parameter Size invalid",
            -42 => "(USER) Parameter Size with zero length",
            -43 => "(USER) Parameter Size too long",
            -44 => "(USER) Device address null pointer",
            -45 => "(USER) Pointer to buffer is a null pointer",
            -46 => "(USER) Parameter SendSize too long",
            -47 => "(USER) Parameter ReceiveSize too long",
            -48 => "(USER) Pointer to send buffer is a null pointer",
            -49 => "(USER) Pointer to receive buffer is a null pointer",
            -100 => "(USER) file not opened",
            -101 => "(USER) file size zero",
            -102 => "(USER) not enough memory to load file",
            -103 => "(USER) file read failed",
            -104 => "(USER) file type invalid",
            -105 => "(USER) file name not valid",
            -501 => "Device not responding",
            -502 => "Device has denied write access to configured attribute",
            -503 => "Configured and actual connection lengths differ",
            _ => return None,
        })
    }
}

impl core::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.description() {
            Some(d) => f.write_str(d),
            None if self.0 >= RCS_ERROR_OFFSET => {
                write!(f, "(RCS) RCS error {}", self.0 - RCS_ERROR_OFFSET)
            }
            None => f.write_str("Unknown"),
        }
    }
}

/// Error byte reported by a coprocessor task in a reply message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskError(pub u8);

impl TaskError {
    pub const OK: TaskError = TaskError(0);

    pub const UNKNOWN_MODE: TaskError = TaskError(52);
    pub const BAUDRATE_OUT_RANGE: TaskError = TaskError(53);
    pub const OWN_MAC_ID_OUT_RANGE: TaskError = TaskError(54);
    pub const DUPLICATE_MAC_ID: TaskError = TaskError(57);
    pub const NO_DEV_TAB: TaskError = TaskError(58);
    pub const ADR_DOUBLE: TaskError = TaskError(60);
    pub const DATA_SET_FIELD_LEN: TaskError = TaskError(61);
    pub const PRED_MST_SL_ADD_LEN: TaskError = TaskError(62);
    pub const PRED_MSTSL_CFG_FIELD_LEN: TaskError = TaskError(63);
    pub const PRED_MST_SL_ADD_TAB_INCONS: TaskError = TaskError(64);
    pub const EXPL_PRM_FIELD_LEN: TaskError = TaskError(65);
    pub const CFG_ADD_INPUT_INCONS: TaskError = TaskError(66);
    pub const CFG_ADD_OUTPUT_INCONS: TaskError = TaskError(67);
    pub const UNKNOWN_DATA_TYPE: TaskError = TaskError(68);
    pub const MODULE_DATA_SIZE: TaskError = TaskError(69);
    pub const OUTPUT_OFF_RANGE: TaskError = TaskError(70);
    pub const INPUT_OFF_RANGE: TaskError = TaskError(71);
    pub const WRONG_TYPE_OF_CONNECTION: TaskError = TaskError(72);
    pub const TYPE_CONNECTION_REDEFINITION: TaskError = TaskError(73);
    pub const EXP_PACKET_LESS_PROD_INHIBIT: TaskError = TaskError(74);
    pub const PRM_FIELD_LEN_INCONSISTENT: TaskError = TaskError(75);
    pub const DATA_AREA: TaskError = TaskError(201);
    pub const DATA_ADR: TaskError = TaskError(202);
    pub const DATA_CNT: TaskError = TaskError(203);
    pub const DATA_TYPE: TaskError = TaskError(204);
    pub const FUNCTION: TaskError = TaskError(205);
    pub const NO_CAN: TaskError = TaskError(210);
    pub const DATABASE: TaskError = TaskError(220);
    pub const DATABASE_READ: TaskError = TaskError(221);

    #[inline(always)]
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub fn description(self) -> Option<&'static str> {
        Some(match self {
            TaskError::OK => "No error",
            TaskError::UNKNOWN_MODE => "Unknown handshake mode configured",
            TaskError::BAUDRATE_OUT_RANGE => "Configured baudrate not supported",
            TaskError::OWN_MAC_ID_OUT_RANGE => "DEVICE MAC-ID out of range",
            TaskError::DUPLICATE_MAC_ID => "Duplicate MAC-ID detected",
            TaskError::NO_DEV_TAB => "Data base in the DEVICE has no entries included",
            TaskError::ADR_DOUBLE => "Double MAC-ID configured internally",
            TaskError::DATA_SET_FIELD_LEN => "Size of one device data set invalid",
            TaskError::PRED_MST_SL_ADD_LEN => "Offset table for predef.mst slave conn. invalid",
            TaskError::PRED_MSTSL_CFG_FIELD_LEN => {
                "Configured table length for predefined master/slave conn invalid"
            }
            TaskError::PRED_MST_SL_ADD_TAB_INCONS => {
                "Offset table do not correspond to I/O configuration table"
            }
            TaskError::EXPL_PRM_FIELD_LEN => "Size indicator of parameter data table corrupt",
            TaskError::CFG_ADD_INPUT_INCONS => "Num of inputs in add tab not equal I/O configuration",
            TaskError::CFG_ADD_OUTPUT_INCONS => {
                "Num of outputs in add tab not equal I/O configuration"
            }
            TaskError::UNKNOWN_DATA_TYPE => "Unknown data type in I/O configuration",
            TaskError::MODULE_DATA_SIZE => "Data type does not correspond to its configured length",
            TaskError::OUTPUT_OFF_RANGE => "Configured output offset address out of range",
            TaskError::INPUT_OFF_RANGE => "Configured input offset address out of range",
            TaskError::WRONG_TYPE_OF_CONNECTION => "One predefined connection type is unknown",
            TaskError::TYPE_CONNECTION_REDEFINITION => "Multiple connections defined in parallel",
            TaskError::EXP_PACKET_LESS_PROD_INHIBIT => {
                "Configured EXP_PCKT_RATE less then PROD_INHIBIT_TIME"
            }
            TaskError::PRM_FIELD_LEN_INCONSISTENT => {
                "Parameter field DNM_SET_ATTR_DATA in data set inconsistent"
            }
            TaskError::DATA_AREA => "Illegal address area",
            TaskError::DATA_ADR => "Overflow in the buffer length",
            TaskError::DATA_CNT => "Illegal data count",
            TaskError::DATA_TYPE => "Unknown data type",
            TaskError::FUNCTION => "Unknown function",
            TaskError::NO_CAN => "No device responding on CAN network at configured baudrate",
            TaskError::DATABASE => "No database found on the system",
            TaskError::DATABASE_READ => "Failure in reading database",
            _ => return None,
        })
    }
}

impl core::fmt::Display for TaskError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.description() {
            Some(d) => f.write_str(d),
            None => write!(f, "Task error. Code {}.", self.0),
        }
    }
}

/// Classify the outcome of a driver call (plus the task error of a reply, if any).
///
/// A non-zero driver status takes precedence over the task error.
pub(crate) fn classify(
    status: DriverStatus,
    task: TaskError,
    board: u16,
    device: crate::Address,
) -> crate::Result<()> {
    let fault = if !status.is_ok() {
        crate::error::BoardFault::Driver(status)
    } else if !task.is_ok() {
        crate::error::BoardFault::Task(task)
    } else {
        return Ok(());
    };
    Err(crate::Error::Board {
        board,
        device,
        fault,
    })
}
