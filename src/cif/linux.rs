//! Binding to the board vendor's Linux driver library (`libcif`)
use std::ffi::c_void;

use libc::{c_short, c_uchar, c_ulong, c_ushort};

use super::{CifDriver, DriverInfo, DriverStatus, HostState, Message};

/// `DevGetInfo()` area of the driver information
const GET_DRIVER_INFO: c_ushort = 1;
/// `DevReadWriteDPMRaw()` modes
const PARAMETER_READ: c_ushort = 1;
const PARAMETER_WRITE: c_ushort = 2;

#[repr(C)]
#[derive(Default)]
struct RawDriverInfo {
    open_count: c_ulong,
    close_count: c_ulong,
    read_count: c_ulong,
    write_count: c_ulong,
    irq_count: c_ulong,
    init_msg_flag: c_uchar,
    read_msg_flag: c_uchar,
    write_msg_flag: c_uchar,
    last_function: c_uchar,
    write_state: c_uchar,
    read_state: c_uchar,
    host_flags: c_uchar,
    my_dev_flags: c_uchar,
    exio_flag: c_uchar,
    exio_count: c_ulong,
}

#[link(name = "cif")]
extern "C" {
    fn DevOpenDriver() -> c_short;
    fn DevCloseDriver() -> c_short;
    fn DevInitBoard(board: c_ushort) -> c_short;
    fn DevExitBoard(board: c_ushort) -> c_short;
    fn DevSetHostState(board: c_ushort, mode: c_ushort, timeout: c_ulong) -> c_short;
    fn DevGetInfo(board: c_ushort, area: c_ushort, size: c_ushort, data: *mut c_void) -> c_short;
    fn DevPutTaskParameter(
        board: c_ushort,
        task: c_ushort,
        size: c_ushort,
        data: *mut c_void,
    ) -> c_short;
    fn DevGetTaskState(board: c_ushort, task: c_ushort, size: c_ushort, data: *mut c_void)
        -> c_short;
    fn DevReset(board: c_ushort, mode: c_ushort, timeout: c_ulong) -> c_short;
    fn DevPutMessage(board: c_ushort, message: *mut Message, timeout: c_ulong) -> c_short;
    fn DevGetMessage(
        board: c_ushort,
        size: c_ushort,
        message: *mut Message,
        timeout: c_ulong,
    ) -> c_short;
    fn DevReadWriteDPMRaw(
        board: c_ushort,
        mode: c_ushort,
        offset: c_ushort,
        size: c_ushort,
        data: *mut c_void,
    ) -> c_short;
    fn DevExchangeIO(
        board: c_ushort,
        send_offset: c_ushort,
        send_size: c_ushort,
        send_data: *mut c_void,
        receive_offset: c_ushort,
        receive_size: c_ushort,
        receive_data: *mut c_void,
        timeout: c_ulong,
    ) -> c_short;
}

/// Buffer sizes beyond `u16` can never be valid for the driver.
/// Pointer handed to the library for a data buffer.  Empty buffers are passed as NULL.
fn buffer_ptr(buf: &[u8]) -> *mut c_void {
    if buf.is_empty() {
        core::ptr::null_mut()
    } else {
        buf.as_ptr() as *mut c_void
    }
}

fn size(len: usize) -> Result<c_ushort, DriverStatus> {
    c_ushort::try_from(len).map_err(|_| DriverStatus::USR_SIZE_TOO_LONG)
}

fn status(result: Result<c_short, DriverStatus>) -> DriverStatus {
    match result {
        Ok(s) => DriverStatus(s),
        Err(s) => s,
    }
}

/// [`CifDriver`] backed by the vendor's `libcif`
///
/// The library keeps one global driver handle per process, so this type carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxCifDriver;

impl LinuxCifDriver {
    pub fn new() -> Self {
        Self
    }
}

impl CifDriver for LinuxCifDriver {
    fn open_driver(&mut self) -> DriverStatus {
        // SAFETY: No arguments, the library manages its handle internally.
        DriverStatus(unsafe { DevOpenDriver() })
    }

    fn close_driver(&mut self) -> DriverStatus {
        // SAFETY: See open_driver().
        DriverStatus(unsafe { DevCloseDriver() })
    }

    fn init_board(&mut self, board: u16) -> DriverStatus {
        // SAFETY: Plain integer argument.
        DriverStatus(unsafe { DevInitBoard(board) })
    }

    fn exit_board(&mut self, board: u16) -> DriverStatus {
        // SAFETY: Plain integer argument.
        DriverStatus(unsafe { DevExitBoard(board) })
    }

    fn set_host_state(&mut self, board: u16, state: HostState, timeout: u32) -> DriverStatus {
        // SAFETY: Plain integer arguments.
        DriverStatus(unsafe { DevSetHostState(board, state as c_ushort, c_ulong::from(timeout)) })
    }

    fn driver_info(&mut self, board: u16, info: &mut DriverInfo) -> DriverStatus {
        let mut raw = RawDriverInfo::default();
        // SAFETY: The library writes at most `size` bytes into `raw`.
        let s = unsafe {
            DevGetInfo(
                board,
                GET_DRIVER_INFO,
                core::mem::size_of::<RawDriverInfo>() as c_ushort,
                &mut raw as *mut RawDriverInfo as *mut c_void,
            )
        };
        *info = DriverInfo {
            open_count: raw.open_count as u32,
            close_count: raw.close_count as u32,
            host_flags: raw.host_flags,
            device_flags: raw.my_dev_flags,
        };
        DriverStatus(s)
    }

    fn put_task_parameter(&mut self, board: u16, task: u16, data: &[u8]) -> DriverStatus {
        status(size(data.len()).map(|len| {
            // SAFETY: The library only reads `len` bytes from `data`.
            unsafe { DevPutTaskParameter(board, task, len, data.as_ptr() as *mut c_void) }
        }))
    }

    fn task_state(&mut self, board: u16, task: u16, data: &mut [u8]) -> DriverStatus {
        status(size(data.len()).map(|len| {
            // SAFETY: The library writes at most `len` bytes into `data`.
            unsafe { DevGetTaskState(board, task, len, data.as_mut_ptr() as *mut c_void) }
        }))
    }

    fn reset(&mut self, board: u16, mode: u16, timeout: u32) -> DriverStatus {
        // SAFETY: Plain integer arguments.
        DriverStatus(unsafe { DevReset(board, mode, c_ulong::from(timeout)) })
    }

    fn put_message(&mut self, board: u16, message: &Message, timeout: u32) -> DriverStatus {
        let mut msg = message.clone();
        // SAFETY: `Message` has the layout of the library's message structure.
        DriverStatus(unsafe { DevPutMessage(board, &mut msg, c_ulong::from(timeout)) })
    }

    fn get_message(&mut self, board: u16, message: &mut Message, timeout: u32) -> DriverStatus {
        // SAFETY: `Message` has the layout of the library's message structure and the library
        // writes at most its size.
        DriverStatus(unsafe {
            DevGetMessage(
                board,
                core::mem::size_of::<Message>() as c_ushort,
                message,
                c_ulong::from(timeout),
            )
        })
    }

    fn read_dpm(&mut self, board: u16, offset: u16, data: &mut [u8]) -> DriverStatus {
        status(size(data.len()).map(|len| {
            // SAFETY: The library writes at most `len` bytes into `data`.
            unsafe {
                DevReadWriteDPMRaw(
                    board,
                    PARAMETER_READ,
                    offset,
                    len,
                    data.as_mut_ptr() as *mut c_void,
                )
            }
        }))
    }

    fn write_dpm(&mut self, board: u16, offset: u16, data: &[u8]) -> DriverStatus {
        status(size(data.len()).map(|len| {
            // SAFETY: In write mode the library only reads `len` bytes from `data`.
            unsafe {
                DevReadWriteDPMRaw(
                    board,
                    PARAMETER_WRITE,
                    offset,
                    len,
                    data.as_ptr() as *mut c_void,
                )
            }
        }))
    }

    fn exchange_io(
        &mut self,
        board: u16,
        send_offset: u16,
        send: &[u8],
        receive_offset: u16,
        receive: &mut [u8],
        timeout: u32,
    ) -> DriverStatus {
        status(size(send.len()).and_then(|send_len| {
            let receive_len = size(receive.len())?;
            let send_ptr = buffer_ptr(send);
            let receive_ptr = if receive.is_empty() {
                core::ptr::null_mut()
            } else {
                receive.as_mut_ptr() as *mut c_void
            };
            // SAFETY: The library reads `send_len` bytes from `send` and writes at most
            // `receive_len` bytes into `receive`.
            Ok(unsafe {
                DevExchangeIO(
                    board,
                    send_offset,
                    send_len,
                    send_ptr,
                    receive_offset,
                    receive_len,
                    receive_ptr,
                    c_ulong::from(timeout),
                )
            })
        }))
    }
}
