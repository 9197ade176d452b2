//! Simulated slave devices for the simulated interface backends
//!
//! A [`SimulatedSlave`] is placed at an address of a [`cif::SimulatorBoard`][crate::cif::SimulatorBoard]
//! or a [`nidnet::SimulatorSdk`][crate::nidnet::SimulatorSdk].  It answers explicit requests from
//! its attribute table and exchanges I/O data through plain buffers the test can inspect.
use std::collections::BTreeMap;

use crate::error::GeneralStatus;
use crate::identity::DeviceIdentity;

/// Fault condition a simulated slave can be put into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveFault {
    /// The slave does not answer at all.
    Silent,
    /// The slave refused an attribute during parameterization.
    Parameter,
    /// The slave reports an online error (other than an error response).
    Online(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedSlave {
    /// Size of the data the slave sends to the master
    pub consumed_size: u8,
    /// Size of the data the slave expects from the master
    pub produced_size: u8,
    /// Current input data, as read by the master
    pub inputs: Vec<u8>,
    /// Last output data written by the master
    pub outputs: Vec<u8>,
    pub fault: Option<SlaveFault>,
    /// Answer the next explicit request with this error response.
    pub error_response: Option<(GeneralStatus, GeneralStatus)>,
    /// Number of reset services received
    pub resets: u32,
    attributes: BTreeMap<(u16, u16, u8), Vec<u8>>,
}

impl SimulatedSlave {
    /// A slave with the given connection sizes and a default identity object.
    pub fn new(consumed_size: u8, produced_size: u8) -> Self {
        let mut this = Self {
            consumed_size,
            produced_size,
            inputs: vec![0; usize::from(consumed_size)],
            outputs: vec![0; usize::from(produced_size)],
            fault: None,
            error_response: None,
            resets: 0,
            attributes: BTreeMap::new(),
        };
        this.set_identity(&DeviceIdentity {
            vendor_id: crate::consts::MASTER_VENDOR_ID,
            device_type: 12,
            product_code: 1,
            revision: crate::identity::Revision { major: 1, minor: 1 },
            status: 0,
            serial_number: 0x0001_0000,
            product_name: "Simulated slave".into(),
        });
        this
    }

    /// Replace the identity object (class 1, instance 1).
    pub fn set_identity(&mut self, identity: &DeviceIdentity) {
        for attr in DeviceIdentity::VENDOR_ID..=DeviceIdentity::PRODUCT_NAME {
            if let Some(value) = identity.encode_attribute(attr) {
                self.attributes
                    .insert((crate::consts::CLASS_IDENTITY, 1, attr), value);
            }
        }
    }

    pub fn with_identity(mut self, identity: &DeviceIdentity) -> Self {
        self.set_identity(identity);
        self
    }

    pub fn with_attribute(mut self, class: u16, instance: u16, attribute: u8, value: &[u8]) -> Self {
        self.attributes
            .insert((class, instance, attribute), value.to_vec());
        self
    }

    pub fn attribute(&self, class: u16, instance: u16, attribute: u8) -> Option<&[u8]> {
        self.attributes
            .get(&(class, instance, attribute))
            .map(|v| v.as_slice())
    }

    /// Whether the slave takes part in I/O with the given sizes.
    pub fn matches(&self, consumed_size: u8, produced_size: u8) -> bool {
        self.fault != Some(SlaveFault::Silent)
            && self.consumed_size == consumed_size
            && self.produced_size == produced_size
    }

    /// Handle an explicit read.
    pub fn get(&mut self, class: u16, instance: u16, attribute: u8) -> ExplicitReply {
        if let Some(reply) = self.take_error() {
            return reply;
        }
        match self.attribute(class, instance, attribute) {
            Some(value) => ExplicitReply::Data(value.to_vec()),
            None => ExplicitReply::Error(GeneralStatus::ATTRIBUTE_NOT_SUPPORTED, GeneralStatus::NONE),
        }
    }

    /// Handle an explicit write.  Only attributes that exist can be written.
    pub fn set(&mut self, class: u16, instance: u16, attribute: u8, value: &[u8]) -> ExplicitReply {
        if let Some(reply) = self.take_error() {
            return reply;
        }
        match self.attributes.get_mut(&(class, instance, attribute)) {
            Some(v) => {
                *v = value.to_vec();
                ExplicitReply::Data(Vec::new())
            }
            None => ExplicitReply::Error(GeneralStatus::ATTRIBUTE_NOT_SUPPORTED, GeneralStatus::NONE),
        }
    }

    /// Handle an arbitrary service request.
    pub fn service(&mut self, service: u8, class: u16, instance: u16, data: &[u8]) -> ExplicitReply {
        use crate::consts;

        match service {
            consts::SERVICE_RESET if class == consts::CLASS_IDENTITY => {
                if let Some(reply) = self.take_error() {
                    return reply;
                }
                self.resets += 1;
                log::trace!("Simulated slave reset ({} so far)", self.resets);
                ExplicitReply::Data(Vec::new())
            }
            consts::SERVICE_GET_ATTRIBUTE_SINGLE => match data.first() {
                Some(attr) => self.get(class, instance, *attr),
                None => ExplicitReply::Error(GeneralStatus::NOT_ENOUGH_DATA, GeneralStatus::NONE),
            },
            consts::SERVICE_SET_ATTRIBUTE_SINGLE => match data.split_first() {
                Some((attr, value)) => self.set(class, instance, *attr, value),
                None => ExplicitReply::Error(GeneralStatus::NOT_ENOUGH_DATA, GeneralStatus::NONE),
            },
            _ => ExplicitReply::Error(GeneralStatus::SERVICE_UNAVAILABLE, GeneralStatus::NONE),
        }
    }

    fn take_error(&mut self) -> Option<ExplicitReply> {
        self.error_response
            .take()
            .map(|(general, additional)| ExplicitReply::Error(general, additional))
    }
}

/// Answer of a simulated slave to an explicit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplicitReply {
    Data(Vec<u8>),
    Error(GeneralStatus, GeneralStatus),
}
