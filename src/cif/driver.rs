use super::{DriverStatus, Message};

/// Host state signalled to the coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum HostState {
    NotReady = 0,
    Ready = 1,
}

/// Driver and handshake state of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverInfo {
    pub open_count: u32,
    pub close_count: u32,
    /// Flags set by the coprocessor (`RUN`, `READY`, ...)
    pub host_flags: u8,
    /// Flags set by the host
    pub device_flags: u8,
}

/// Access to the board driver library
///
/// All calls return the driver status code; negative values and values from 1000 upwards are
/// failures (see [`DriverStatus::is_failure()`]).  Timeouts are in milliseconds.
pub trait CifDriver {
    fn open_driver(&mut self) -> DriverStatus;

    fn close_driver(&mut self) -> DriverStatus;

    fn init_board(&mut self, board: u16) -> DriverStatus;

    fn exit_board(&mut self, board: u16) -> DriverStatus;

    fn set_host_state(&mut self, board: u16, state: HostState, timeout: u32) -> DriverStatus;

    fn driver_info(&mut self, board: u16, info: &mut DriverInfo) -> DriverStatus;

    /// Write the parameters of a coprocessor task.
    fn put_task_parameter(&mut self, board: u16, task: u16, data: &[u8]) -> DriverStatus;

    /// Read the state area of a coprocessor task.
    fn task_state(&mut self, board: u16, task: u16, data: &mut [u8]) -> DriverStatus;

    fn reset(&mut self, board: u16, mode: u16, timeout: u32) -> DriverStatus;

    /// Post a message into the board's mailbox.
    fn put_message(&mut self, board: u16, message: &Message, timeout: u32) -> DriverStatus;

    /// Wait for a message from the board.
    fn get_message(&mut self, board: u16, message: &mut Message, timeout: u32) -> DriverStatus;

    /// Read raw dual-port memory.
    fn read_dpm(&mut self, board: u16, offset: u16, data: &mut [u8]) -> DriverStatus;

    /// Write raw dual-port memory.
    fn write_dpm(&mut self, board: u16, offset: u16, data: &[u8]) -> DriverStatus;

    /// Exchange process data: write `send` at `send_offset` into the output image and read
    /// `receive` from `receive_offset` of the input image.  Either buffer may be empty.
    fn exchange_io(
        &mut self,
        board: u16,
        send_offset: u16,
        send: &[u8],
        receive_offset: u16,
        receive: &mut [u8],
        timeout: u32,
    ) -> DriverStatus;
}
