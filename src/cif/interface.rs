use std::any::Any;
use std::time::Duration;

use super::status::classify;
use super::{
    BusParameters, CifDriver, DriverInfo, DriverStatus, GlobalDiagnostics, HostState, Message,
    TaskError,
};
use crate::consts;
use crate::{Baudrate, Classified, Interface, InterfaceBase, Kind};

/// Number of boards a single driver can handle
pub const MAX_BOARDS: u16 = 4;

/// Timeouts of the individual driver calls, in milliseconds
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Timeouts {
    /// Posting any message into the mailbox
    pub put: u32,
    /// Waiting for the reply to a download or an attribute read
    pub get: u32,
    /// Waiting for the reply to an attribute write or a service request
    pub reply: u32,
    /// Waiting for device diagnostics
    pub diagnostics: u32,
    pub host_state: u32,
    pub warmstart: u32,
    /// Cold start and boot start
    pub coldstart: u32,
    pub io_exchange: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            put: 500,
            get: 3000,
            reply: 500,
            diagnostics: 1000,
            host_state: 1000,
            warmstart: 8000,
            coldstart: 10000,
            io_exchange: 500,
        }
    }
}

/// Board interface parameters
///
/// # Example
/// ```
/// use dnetrust::cif;
///
/// let param = cif::Parameters {
///     board: 1,
///     address: 0,
///     baudrate: dnetrust::Baudrate::B500k,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Parameters {
    /// Board number (`0..4`)
    pub board: u16,
    /// MAC ID of the master
    pub address: crate::Address,
    pub baudrate: Baudrate,
    /// Whether the board should leave OPERATE when a device fails
    pub auto_clear: bool,
    /// Size of the master's own consumed (input) connection
    pub consumed_size: u8,
    /// Size of the master's own produced (output) connection
    pub produced_size: u8,
    /// Watchdog time configured into the protocol task (ms)
    pub watchdog: u16,
    pub timeouts: Timeouts,
    /// Time for the board to settle after a configuration change before its diagnostics are
    /// meaningful
    pub settle_time: Duration,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            board: 0,
            address: 0,
            baudrate: Baudrate::default(),
            auto_clear: false,
            consumed_size: 0,
            produced_size: 0,
            watchdog: 1000,
            timeouts: Timeouts::default(),
            settle_time: Duration::from_millis(100),
        }
    }
}

/// DeviceNet master on a dual-port-memory interface board
pub struct CifInterface {
    base: InterfaceBase,
    board: u16,
    auto_clear: bool,
    watchdog: u16,
    timeouts: Timeouts,
    settle_time: Duration,
    /// Next free offset in the input image
    input_offset: u16,
    /// Next free offset in the output image
    output_offset: u16,
    driver: Box<dyn CifDriver>,
}

impl core::fmt::Debug for CifInterface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CifInterface")
            .field("base", &self.base)
            .field("board", &self.board)
            .field("auto_clear", &self.auto_clear)
            .field("input_offset", &self.input_offset)
            .field("output_offset", &self.output_offset)
            .finish_non_exhaustive()
    }
}

impl CifInterface {
    pub fn new(driver: Box<dyn CifDriver>, param: Parameters) -> Self {
        let mut base = InterfaceBase::new(param.address, param.baudrate);
        base.node.set_consumed_size(param.consumed_size);
        base.node.set_produced_size(param.produced_size);
        let mut this = Self {
            base,
            board: 0,
            auto_clear: param.auto_clear,
            watchdog: param.watchdog,
            timeouts: param.timeouts,
            settle_time: param.settle_time,
            input_offset: 0,
            output_offset: 0,
            driver,
        };
        if let Err(e) = this.set_board(param.board) {
            log::warn!("{}, using board 0", e);
        }
        this
    }

    #[inline(always)]
    pub fn board(&self) -> u16 {
        self.board
    }

    /// Select the board.  Only possible while the interface is closed.
    pub fn set_board(&mut self, board: u16) -> crate::Result<()> {
        if self.base.node().is_active() {
            return Err(crate::Error::MustNotBeOperational("SetBoardNum"));
        }
        if board >= MAX_BOARDS {
            return Err(crate::Error::InvalidArgument {
                parameter: "usBrdNum",
                value: board.to_string(),
                function: "SetBoardNum",
            });
        }
        self.board = board;
        Ok(())
    }

    #[inline(always)]
    pub fn auto_clear(&self) -> bool {
        self.auto_clear
    }

    pub fn set_auto_clear(&mut self, auto_clear: bool) {
        if !self.base.node().is_active() {
            self.auto_clear = auto_clear;
        }
    }

    #[inline(always)]
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    #[inline(always)]
    pub fn settle_time(&self) -> Duration {
        self.settle_time
    }

    pub fn set_settle_time(&mut self, settle_time: Duration) {
        self.settle_time = settle_time;
    }

    /// Next free offsets in the input and output image.
    pub fn io_offsets(&self) -> (u16, u16) {
        (self.input_offset, self.output_offset)
    }

    /// Reserve space in the process images for a device.
    ///
    /// Offsets are handed out monotonically and never reclaimed.
    pub(crate) fn reserve_io(&mut self, consumed: u8, produced: u8) -> (Option<u16>, Option<u16>) {
        let input = (consumed > 0).then(|| {
            let offset = self.input_offset;
            self.input_offset = self.input_offset.wrapping_add(u16::from(consumed));
            offset
        });
        let output = (produced > 0).then(|| {
            let offset = self.output_offset;
            self.output_offset = self.output_offset.wrapping_add(u16::from(produced));
            offset
        });
        (input, output)
    }

    pub(crate) fn driver(&mut self) -> &mut dyn CifDriver {
        &mut *self.driver
    }

    /// Check a driver status: failures abort, other non-zero codes are only logged.
    pub(crate) fn check(&self, status: DriverStatus, device: crate::Address) -> crate::Result<()> {
        if status.is_failure() {
            return classify(status, TaskError::OK, self.board, device);
        }
        if !status.is_ok() {
            log::debug!("Board {}: driver reported status {}", self.board, status.0);
        }
        Ok(())
    }

    /// Post a request and wait for its reply, which replaces `msg`.
    pub(crate) fn transact(
        &mut self,
        msg: &mut Message,
        get_timeout: u32,
        device: crate::Address,
    ) -> crate::Result<()> {
        self.put_request(msg, device)?;
        self.get_reply(msg, get_timeout, device)
    }

    /// Hand a request to the board's mailbox.
    pub(crate) fn put_request(
        &mut self,
        msg: &Message,
        device: crate::Address,
    ) -> crate::Result<()> {
        log::trace!("Board {}: request {:?}", self.board, msg);
        let status = self.driver.put_message(self.board, msg, self.timeouts.put);
        self.check(status, device)
    }

    /// Wait for the board's reply, overwriting `msg`.
    pub(crate) fn get_reply(
        &mut self,
        msg: &mut Message,
        get_timeout: u32,
        device: crate::Address,
    ) -> crate::Result<()> {
        let status = self.driver.get_message(self.board, msg, get_timeout);
        self.check(status, device)?;
        log::trace!("Board {}: reply {:?}", self.board, msg);
        Ok(())
    }

    /// Read the global diagnostics of the DNM task.
    pub(crate) fn global_diagnostics(&mut self) -> crate::Result<GlobalDiagnostics> {
        let mut buf = [0u8; GlobalDiagnostics::LEN];
        let status = self
            .driver
            .task_state(self.board, consts::PROTOCOL_TASK, &mut buf);
        self.check(status, self.address())?;
        GlobalDiagnostics::parse(&buf).ok_or(crate::Error::Unknown)
    }

    pub(crate) fn settle(&self) {
        if !self.settle_time.is_zero() {
            std::thread::sleep(self.settle_time);
        }
    }

    fn set_protocol_parameters(&mut self) -> crate::Result<()> {
        let mut param = [0u8; 3];
        param[0] = consts::MODE_BUFFERED_DEVICE_CONTROLLED;
        param[1..3].copy_from_slice(&self.watchdog.to_le_bytes());
        let status = self
            .driver
            .put_task_parameter(self.board, consts::PROTOCOL_TASK, &param);
        self.check(status, self.address())?;

        let status =
            self.driver
                .reset(self.board, consts::RESET_WARMSTART, self.timeouts.warmstart);
        self.check(status, self.address())
    }

    fn clear_database(&mut self) -> crate::Result<()> {
        let mut msg = Message::clear_database();
        self.transact(&mut msg, self.timeouts.get, self.address())?;
        classify(
            DriverStatus::NO_ERROR,
            TaskError(msg.f),
            self.board,
            self.address(),
        )
    }

    fn download_bus_parameters(&mut self) -> crate::Result<()> {
        let node = self.base.node();
        let param = BusParameters {
            own_address: node.address(),
            vendor_id: consts::MASTER_VENDOR_ID,
            baudrate: self.base.baudrate(),
            auto_clear: self.auto_clear,
            consumed_size: node.consumed_size(),
            consumed_offset: self.input_offset,
            produced_size: node.produced_size(),
            produced_offset: self.output_offset,
        };
        log::debug!("Board {}: downloading bus parameters {:?}", self.board, param);
        let mut msg = param.to_message();
        self.transact(&mut msg, self.timeouts.get, self.address())?;
        classify(
            DriverStatus::NO_ERROR,
            TaskError(msg.f),
            self.board,
            self.address(),
        )
    }

    /// Everything after the board was initialized.
    fn configure(&mut self, initial: bool) -> crate::Result<()> {
        if initial {
            let mut cleared = false;
            loop {
                self.set_protocol_parameters()?;

                let mut info = DriverInfo::default();
                let status = self.driver.driver_info(self.board, &mut info);
                self.check(status, self.address())?;

                let configured = consts::HOST_FLAG_RUN | consts::HOST_FLAG_READY;
                if info.host_flags & configured != configured {
                    break;
                }
                if cleared {
                    log::warn!(
                        "Board {} still holds a device database after clearing, continuing",
                        self.board
                    );
                    break;
                }
                log::info!("Board {} holds a device database, clearing it", self.board);
                self.clear_database()?;
                cleared = true;
            }
        }

        self.download_bus_parameters()?;

        if initial {
            let status =
                self.driver
                    .set_host_state(self.board, HostState::Ready, self.timeouts.host_state);
            self.check(status, self.address())?;
        }

        self.settle();
        let diag = self.global_diagnostics()?;
        self.base.node.set_active(diag.is_operate());
        if diag.is_operate() {
            log::info!("Board {} is operational", self.board);
        } else {
            log::warn!(
                "Board {} did not enter OPERATE (state 0x{:02x})",
                self.board,
                diag.state
            );
        }
        Ok(())
    }

    /// Release the board and the driver after a failed bring-up.
    fn unwind(&mut self) {
        let status = self.driver.exit_board(self.board);
        if !status.is_ok() {
            log::debug!("Board {}: exit returned {}", self.board, status.0);
        }
        let status = self.driver.close_driver();
        if !status.is_ok() {
            log::debug!("Board {}: closing driver returned {}", self.board, status.0);
        }
    }

    /// Open the driver and initialize the board.
    fn init(&mut self) -> crate::Result<()> {
        let status = self.driver.open_driver();
        self.check(status, self.address())?;
        let status = self.driver.init_board(self.board);
        if let Err(e) = self.check(status, self.address()) {
            let _ = self.driver.close_driver();
            return Err(e);
        }
        Ok(())
    }

    fn open_inner(&mut self) -> crate::Result<()> {
        let initial = !self.base.node().is_active();
        if initial {
            self.init()?;
        }
        let result = self.configure(initial);
        if initial && (result.is_err() || !self.base.node().is_active()) {
            if let Err(e) = &result {
                log::debug!("Board {}: bring-up failed: {}", self.board, e);
            }
            self.unwind();
        }
        result
    }

    fn close_inner(&mut self) -> crate::Result<()> {
        if !self.base.node().is_active() {
            return Ok(());
        }
        let results = [
            self.driver
                .set_host_state(self.board, HostState::NotReady, self.timeouts.host_state),
            self.driver.exit_board(self.board),
            self.driver.close_driver(),
        ];
        self.base.node.set_active(false);
        log::info!("Board {} closed", self.board);
        results
            .into_iter()
            .map(|status| self.check(status, self.address()))
            .find(|r| r.is_err())
            .unwrap_or(Ok(()))
    }

    /// Timeout for a reset in the given mode.  Unknown modes are reported and get no timeout.
    fn reset_timeout(&self, mode: u16) -> (u32, Option<crate::Error>) {
        match mode {
            consts::RESET_COLDSTART | consts::RESET_BOOTSTART => (self.timeouts.coldstart, None),
            consts::RESET_WARMSTART => (self.timeouts.warmstart, None),
            _ => {
                let e = crate::Error::InvalidArgument {
                    parameter: "mode",
                    value: mode.to_string(),
                    function: "Reset",
                };
                log::warn!("{} Resetting without timeout.", e);
                (0, Some(e))
            }
        }
    }

    fn reset_inner(&mut self, mode: u16, timeout: u32) -> crate::Result<()> {
        let initial = !self.base.node().is_active();
        if initial {
            self.init()?;
        }

        let status = self.driver.reset(self.board, mode, timeout);
        let result = self.check(status, self.address());
        log::info!("Board {} reset (mode {})", self.board, mode);

        if initial {
            self.unwind();
        }
        result
    }
}

impl Classified for CifInterface {
    fn kind(&self) -> Kind {
        Kind::CifInterface
    }
}

impl Interface for CifInterface {
    fn base(&self) -> &InterfaceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut InterfaceBase {
        &mut self.base
    }

    fn open(&mut self) -> crate::Result<()> {
        crate::error::track(self.open_inner())
    }

    fn close(&mut self) -> crate::Result<()> {
        crate::error::track(self.close_inner())
    }

    /// Reset the board.  `mode` is one of [`ResetMode`][super::ResetMode] as `u16`.
    fn reset(&mut self, mode: u16) -> crate::Result<()> {
        let (timeout, invalid) = self.reset_timeout(mode);
        let result = crate::error::track(self.reset_inner(mode, timeout));
        if let (Ok(()), Some(e)) = (&result, invalid) {
            crate::error::record(&e);
        }
        result
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for CifInterface {
    fn drop(&mut self) {
        if self.base.node().is_active() {
            if let Err(e) = self.close_inner() {
                log::debug!("Closing board {} on drop failed: {}", self.board, e);
            }
        }
    }
}
