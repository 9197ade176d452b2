//! Simulated vendor SDK
//!
//! [`SimulatorSdk`] implements [`NiDnetDriver`] for a single simulated network.  Interface,
//! I/O, and explicit messaging objects are tracked by handle, connections come up when a
//! matching [`SimulatedSlave`] is present and the interface is started.  Every SDK call is
//! recorded so tests can check what the master actually did.
use std::collections::BTreeMap;
use std::sync;

use super::{
    IoConfig, NcStatus, NiDnetDriver, ObjectHandle, ObjectState, Operation, PollMode,
};
use crate::simulator::{ExplicitReply, SimulatedSlave, SlaveFault};
use crate::Baudrate;

/// Reply service code of an explicit error response
const SERVICE_ERROR_RESPONSE: u8 = 0x94;

/// An SDK call as seen by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    OpenInterface {
        name: String,
        address: crate::Address,
        baudrate: Baudrate,
        poll_mode: PollMode,
    },
    Operate(Operation),
    CloseObject(ObjectHandle),
    OpenIo {
        name: String,
        address: crate::Address,
        config: IoConfig,
    },
    OpenExplicit {
        name: String,
        address: crate::Address,
    },
    WaitForState {
        desired: ObjectState,
        timeout: u32,
    },
    ReadIo { len: usize },
    WriteIo { len: usize },
    GetAttribute {
        class: u16,
        instance: u16,
        attribute: u8,
        timeout: u32,
    },
    SetAttribute {
        class: u16,
        instance: u16,
        attribute: u8,
        timeout: u32,
    },
    WriteExplicit {
        service: u8,
        class: u16,
        instance: u16,
        len: usize,
    },
    ReadExplicit { len: usize },
    Reset { name: String },
}

impl SdkCall {
    fn same_kind(&self, other: &SdkCall) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Object {
    Interface { name: String, running: bool },
    Io { address: crate::Address, config: IoConfig },
    Explicit {
        address: crate::Address,
        pending: Option<(u8, Vec<u8>)>,
    },
}

#[derive(Debug)]
struct SdkState {
    objects: BTreeMap<ObjectHandle, Object>,
    next_handle: u32,
    slaves: BTreeMap<crate::Address, SimulatedSlave>,
    calls: Vec<SdkCall>,
    failures: Vec<(SdkCall, NcStatus)>,
}

impl SdkState {
    fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_handle: 1,
            slaves: BTreeMap::new(),
            calls: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Record a call and return the injected status for it, if any.
    fn call(&mut self, call: SdkCall) -> Option<NcStatus> {
        log::trace!("Simulated SDK: {:?}", call);
        let failure = self
            .failures
            .iter()
            .position(|(c, _)| c.same_kind(&call))
            .map(|i| self.failures.remove(i).1);
        self.calls.push(call);
        failure
    }

    fn insert(&mut self, object: Object) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(handle, object);
        handle
    }

    fn is_running(&self) -> bool {
        self.objects
            .values()
            .any(|o| matches!(o, Object::Interface { running: true, .. }))
    }

    fn interface_open(&self, name: &str) -> bool {
        self.objects
            .values()
            .any(|o| matches!(o, Object::Interface { name: n, .. } if n == name))
    }

    fn responds(&self, address: crate::Address) -> bool {
        self.is_running()
            && self
                .slaves
                .get(&address)
                .is_some_and(|s| s.fault != Some(SlaveFault::Silent))
    }

    fn state(&self, handle: ObjectHandle) -> Result<ObjectState, NcStatus> {
        match self.objects.get(&handle) {
            Some(Object::Interface { .. }) => Ok(ObjectState::empty()),
            Some(Object::Io { address, config }) => {
                let established = self.is_running()
                    && self.slaves.get(address).is_some_and(|s| {
                        s.matches(config.input_length, config.output_length)
                    });
                Ok(if established {
                    ObjectState::ESTABLISHED | ObjectState::READ_AVAILABLE
                } else {
                    ObjectState::empty()
                })
            }
            Some(Object::Explicit { address, pending }) => {
                let mut state = ObjectState::empty();
                state.set(ObjectState::ESTABLISHED, self.responds(*address));
                state.set(ObjectState::READ_AVAILABLE, pending.is_some());
                Ok(state)
            }
            None => Err(NcStatus::ERR_BAD_HANDLE),
        }
    }

    fn io(&self, handle: ObjectHandle) -> Result<crate::Address, NcStatus> {
        match self.objects.get(&handle) {
            Some(Object::Io { address, .. }) => {
                if self.state(handle)?.contains(ObjectState::ESTABLISHED) {
                    Ok(*address)
                } else {
                    Err(NcStatus::ERR_NOT_STARTED)
                }
            }
            _ => Err(NcStatus::ERR_BAD_HANDLE),
        }
    }

    /// Run an explicit request against the slave behind an explicit messaging object.
    fn explicit(
        &mut self,
        handle: ObjectHandle,
        f: impl FnOnce(&mut SimulatedSlave) -> ExplicitReply,
    ) -> Result<ExplicitReply, NcStatus> {
        let address = match self.objects.get(&handle) {
            Some(Object::Explicit { address, .. }) => *address,
            _ => return Err(NcStatus::ERR_BAD_HANDLE),
        };
        if !self.responds(address) {
            return Err(NcStatus::ERR_TIMEOUT);
        }
        self.slaves
            .get_mut(&address)
            .map(f)
            .ok_or(NcStatus::ERR_NO_DEVICE)
    }
}

/// Simulated vendor SDK
///
/// Clones share the same network, so a test can keep one handle for inspection while the
/// interface owns another.
#[derive(Debug, Clone)]
pub struct SimulatorSdk {
    state: sync::Arc<sync::Mutex<SdkState>>,
}

impl Default for SimulatorSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorSdk {
    pub fn new() -> Self {
        Self {
            state: sync::Arc::new(sync::Mutex::new(SdkState::new())),
        }
    }

    fn lock(&self) -> sync::MutexGuard<'_, SdkState> {
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

    /// Answer the next call of the same kind as `call` with `status`.
    ///
    /// Only the variant of `call` matters, its fields are ignored.  Injected warnings are
    /// returned instead of success without the call taking effect.
    pub fn fail_next(&self, call: SdkCall, status: NcStatus) {
        self.lock().failures.push((call, status));
    }

    /// All SDK calls so far.
    pub fn calls(&self) -> Vec<SdkCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of objects currently open.
    pub fn open_objects(&self) -> usize {
        self.lock().objects.len()
    }

    /// Whether a started interface object exists.
    pub fn is_running(&self) -> bool {
        self.lock().is_running()
    }
}

fn status(result: Result<(), NcStatus>) -> NcStatus {
    result.err().unwrap_or(NcStatus::SUCCESS)
}

impl NiDnetDriver for SimulatorSdk {
    fn open_interface(
        &mut self,
        name: &str,
        address: crate::Address,
        baudrate: Baudrate,
        poll_mode: PollMode,
        handle: &mut ObjectHandle,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::OpenInterface {
            name: name.to_owned(),
            address,
            baudrate,
            poll_mode,
        }) {
            return s;
        }
        if !name.starts_with("dnet") {
            return NcStatus::ERR_BAD_NAME;
        }
        if state.interface_open(name) {
            return NcStatus::ERR_ALREADY_OPEN;
        }
        *handle = state.insert(Object::Interface {
            name: name.to_owned(),
            running: false,
        });
        NcStatus::SUCCESS
    }

    fn operate_interface(&mut self, handle: ObjectHandle, operation: Operation) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::Operate(operation)) {
            return s;
        }
        match state.objects.get_mut(&handle) {
            Some(Object::Interface { running, .. }) => {
                *running = operation == Operation::Start;
                NcStatus::SUCCESS
            }
            _ => NcStatus::ERR_BAD_HANDLE,
        }
    }

    fn close_object(&mut self, handle: ObjectHandle) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::CloseObject(handle)) {
            return s;
        }
        match state.objects.remove(&handle) {
            Some(_) => NcStatus::SUCCESS,
            None => NcStatus::ERR_BAD_HANDLE,
        }
    }

    fn open_io(
        &mut self,
        name: &str,
        address: crate::Address,
        config: IoConfig,
        handle: &mut ObjectHandle,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::OpenIo {
            name: name.to_owned(),
            address,
            config,
        }) {
            return s;
        }
        if !state.interface_open(name) {
            return NcStatus::ERR_BAD_NAME;
        }
        if config.connection.is_empty() {
            return NcStatus::ERR_BAD_PARAM;
        }
        *handle = state.insert(Object::Io { address, config });
        NcStatus::SUCCESS
    }

    fn open_explicit(
        &mut self,
        name: &str,
        address: crate::Address,
        handle: &mut ObjectHandle,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::OpenExplicit {
            name: name.to_owned(),
            address,
        }) {
            return s;
        }
        if !state.interface_open(name) {
            return NcStatus::ERR_BAD_NAME;
        }
        *handle = state.insert(Object::Explicit {
            address,
            pending: None,
        });
        NcStatus::SUCCESS
    }

    fn wait_for_state(
        &mut self,
        handle: ObjectHandle,
        desired: ObjectState,
        timeout: u32,
        current: &mut ObjectState,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::WaitForState { desired, timeout }) {
            return s;
        }
        match state.state(handle) {
            Ok(s) => {
                *current = s;
                if s.intersects(desired) {
                    NcStatus::SUCCESS
                } else {
                    NcStatus::ERR_TIMEOUT
                }
            }
            Err(e) => e,
        }
    }

    fn read_io(&mut self, handle: ObjectHandle, data: &mut [u8]) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::ReadIo { len: data.len() }) {
            return s;
        }
        let result = state.io(handle).map(|address| {
            if let Some(slave) = state.slaves.get(&address) {
                let len = slave.inputs.len().min(data.len());
                data[..len].copy_from_slice(&slave.inputs[..len]);
            }
        });
        status(result)
    }

    fn write_io(&mut self, handle: ObjectHandle, data: &[u8]) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::WriteIo { len: data.len() }) {
            return s;
        }
        let result = state.io(handle).map(|address| {
            if let Some(slave) = state.slaves.get_mut(&address) {
                slave.outputs = data.to_vec();
            }
        });
        status(result)
    }

    fn get_attribute(
        &mut self,
        handle: ObjectHandle,
        class: u16,
        instance: u16,
        attribute: u8,
        timeout: u32,
        data: &mut [u8],
        actual_len: &mut usize,
        device_error: &mut u16,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::GetAttribute {
            class,
            instance,
            attribute,
            timeout,
        }) {
            return s;
        }
        match state.explicit(handle, |slave| slave.get(class, instance, attribute)) {
            Ok(ExplicitReply::Data(value)) => {
                let len = value.len().min(data.len());
                data[..len].copy_from_slice(&value[..len]);
                *actual_len = value.len();
                if value.len() > data.len() {
                    NcStatus::WARN_DATA_LENGTH
                } else {
                    NcStatus::SUCCESS
                }
            }
            Ok(ExplicitReply::Error(general, additional)) => {
                *device_error = u16::from_le_bytes([general.0, additional.0]);
                NcStatus::ERR_DNET_ERR_RESP
            }
            Err(e) => e,
        }
    }

    fn set_attribute(
        &mut self,
        handle: ObjectHandle,
        class: u16,
        instance: u16,
        attribute: u8,
        timeout: u32,
        data: &[u8],
        device_error: &mut u16,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::SetAttribute {
            class,
            instance,
            attribute,
            timeout,
        }) {
            return s;
        }
        match state.explicit(handle, |slave| slave.set(class, instance, attribute, data)) {
            Ok(ExplicitReply::Data(_)) => NcStatus::SUCCESS,
            Ok(ExplicitReply::Error(general, additional)) => {
                *device_error = u16::from_le_bytes([general.0, additional.0]);
                NcStatus::ERR_DNET_ERR_RESP
            }
            Err(e) => e,
        }
    }

    fn write_explicit(
        &mut self,
        handle: ObjectHandle,
        service: u8,
        class: u16,
        instance: u16,
        data: &[u8],
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::WriteExplicit {
            service,
            class,
            instance,
            len: data.len(),
        }) {
            return s;
        }
        let reply = match state.explicit(handle, |slave| {
            slave.service(service, class, instance, data)
        }) {
            Ok(ExplicitReply::Data(value)) => (service | 0x80, value),
            Ok(ExplicitReply::Error(general, additional)) => {
                (SERVICE_ERROR_RESPONSE, vec![general.0, additional.0])
            }
            Err(e) => return e,
        };
        if let Some(Object::Explicit { pending, .. }) = state.objects.get_mut(&handle) {
            *pending = Some(reply);
        }
        NcStatus::SUCCESS
    }

    fn read_explicit(
        &mut self,
        handle: ObjectHandle,
        service: &mut u8,
        data: &mut [u8],
        actual_len: &mut usize,
    ) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::ReadExplicit { len: data.len() }) {
            return s;
        }
        let pending = match state.objects.get_mut(&handle) {
            Some(Object::Explicit { pending, .. }) => pending.take(),
            _ => return NcStatus::ERR_BAD_HANDLE,
        };
        match pending {
            Some((reply_service, value)) => {
                *service = reply_service;
                let len = value.len().min(data.len());
                data[..len].copy_from_slice(&value[..len]);
                *actual_len = value.len();
                NcStatus::SUCCESS
            }
            None => NcStatus::ERR_NO_DATA,
        }
    }

    fn reset(&mut self, name: &str) -> NcStatus {
        let mut state = self.lock();
        if let Some(s) = state.call(SdkCall::Reset {
            name: name.to_owned(),
        }) {
            return s;
        }
        if !name.starts_with("dnet") {
            return NcStatus::ERR_BAD_NAME;
        }
        NcStatus::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(sdk: &mut SimulatorSdk) -> ObjectHandle {
        let mut intf = ObjectHandle(0);
        assert_eq!(
            sdk.open_interface("dnet0", 0, Baudrate::B125k, PollMode::Individual, &mut intf),
            NcStatus::SUCCESS
        );
        assert_eq!(sdk.operate_interface(intf, Operation::Start), NcStatus::SUCCESS);
        intf
    }

    #[test]
    fn interface_opens_once() {
        let mut sdk = SimulatorSdk::new();
        started(&mut sdk);
        let mut other = ObjectHandle(0);
        assert_eq!(
            sdk.open_interface("dnet0", 1, Baudrate::B125k, PollMode::Individual, &mut other),
            NcStatus::ERR_ALREADY_OPEN
        );
        assert!(sdk.is_running());
    }

    #[test]
    fn io_needs_matching_slave() {
        let mut sdk = SimulatorSdk::new();
        sdk.add_slave(4, SimulatedSlave::new(2, 0));
        started(&mut sdk);

        let config = IoConfig {
            connection: super::super::IoConnection::POLL,
            input_length: 1,
            output_length: 0,
            expected_packet_rate: 10,
        };
        let mut io = ObjectHandle(0);
        assert_eq!(sdk.open_io("dnet0", 4, config, &mut io), NcStatus::SUCCESS);
        let mut current = ObjectState::empty();
        assert_eq!(
            sdk.wait_for_state(io, ObjectState::READ_AVAILABLE, 100, &mut current),
            NcStatus::ERR_TIMEOUT
        );
        assert_eq!(sdk.read_io(io, &mut [0; 1]), NcStatus::ERR_NOT_STARTED);
    }

    #[test]
    fn explicit_reply_is_consumed() {
        let mut sdk = SimulatorSdk::new();
        sdk.add_slave(4, SimulatedSlave::new(0, 0));
        started(&mut sdk);

        let mut em = ObjectHandle(0);
        assert_eq!(sdk.open_explicit("dnet0", 4, &mut em), NcStatus::SUCCESS);
        assert_eq!(sdk.write_explicit(em, 0x0E, 1, 1, &[2]), NcStatus::SUCCESS);

        let (mut service, mut len) = (0, 0);
        let mut data = [0u8; 4];
        assert_eq!(
            sdk.read_explicit(em, &mut service, &mut data, &mut len),
            NcStatus::SUCCESS
        );
        assert_eq!((service, len, &data[..2]), (0x8E, 2, &[12u8, 0][..]));
        assert_eq!(
            sdk.read_explicit(em, &mut service, &mut data, &mut len),
            NcStatus::ERR_NO_DATA
        );
    }

    #[test]
    fn closing_unknown_handle() {
        let mut sdk = SimulatorSdk::new();
        assert_eq!(sdk.close_object(ObjectHandle(42)), NcStatus::ERR_BAD_HANDLE);
    }
}
