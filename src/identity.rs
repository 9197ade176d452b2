//! Reading the identity object of a device
use crate::consts;
use crate::Device;

/// Identity object instance read by [`read_identity()`]
const IDENTITY_INSTANCE: u16 = 1;

/// Longest product name a device may report (SHORT_STRING)
const MAX_PRODUCT_NAME: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Revision {
    pub major: u8,
    pub minor: u8,
}

impl core::fmt::Display for Revision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:03}", self.major, self.minor)
    }
}

/// Identity of a device as reported by attributes 1 to 7 of its identity object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub device_type: u16,
    pub product_code: u16,
    pub revision: Revision,
    pub status: u16,
    pub serial_number: u32,
    pub product_name: String,
}

impl DeviceIdentity {
    pub const VENDOR_ID: u8 = 1;
    pub const DEVICE_TYPE: u8 = 2;
    pub const PRODUCT_CODE: u8 = 3;
    pub const REVISION: u8 = 4;
    pub const STATUS: u8 = 5;
    pub const SERIAL_NUMBER: u8 = 6;
    pub const PRODUCT_NAME: u8 = 7;

    /// Vendor name, or `"Unknown"` for unregistered IDs.
    pub fn vendor_name(&self) -> &'static str {
        crate::names::vendor_name(self.vendor_id).unwrap_or("Unknown")
    }

    /// Device profile name, or `"Unknown"`.
    pub fn device_type_name(&self) -> &'static str {
        crate::names::device_type_name(self.device_type).unwrap_or("Unknown")
    }

    /// Wire encoding of one identity attribute, as a device would answer it.
    pub fn encode_attribute(&self, attribute: u8) -> Option<Vec<u8>> {
        Some(match attribute {
            Self::VENDOR_ID => self.vendor_id.to_le_bytes().to_vec(),
            Self::DEVICE_TYPE => self.device_type.to_le_bytes().to_vec(),
            Self::PRODUCT_CODE => self.product_code.to_le_bytes().to_vec(),
            Self::REVISION => vec![self.revision.major, self.revision.minor],
            Self::STATUS => self.status.to_le_bytes().to_vec(),
            Self::SERIAL_NUMBER => self.serial_number.to_le_bytes().to_vec(),
            Self::PRODUCT_NAME => {
                let name = &self.product_name.as_bytes()[..self.product_name.len().min(MAX_PRODUCT_NAME)];
                let mut buf = Vec::with_capacity(name.len() + 1);
                buf.push(name.len() as u8);
                buf.extend_from_slice(name);
                buf
            }
            _ => return None,
        })
    }
}

fn read_u16(device: &mut dyn Device, attribute: u8) -> crate::Result<u16> {
    let mut buf = [0u8; 2];
    device.get_attribute(consts::CLASS_IDENTITY, IDENTITY_INSTANCE, attribute, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read the identity object of an allocated device.
///
/// # Example
/// ```no_run
/// # fn show(device: &mut dyn dnetrust::Device) -> dnetrust::Result<()> {
/// let identity = dnetrust::identity::read_identity(device)?;
/// println!("{} by {}", identity.product_name, identity.vendor_name());
/// # Ok(())
/// # }
/// ```
pub fn read_identity(device: &mut dyn Device) -> crate::Result<DeviceIdentity> {
    let vendor_id = read_u16(device, DeviceIdentity::VENDOR_ID)?;
    let device_type = read_u16(device, DeviceIdentity::DEVICE_TYPE)?;
    let product_code = read_u16(device, DeviceIdentity::PRODUCT_CODE)?;

    let mut rev = [0u8; 2];
    device.get_attribute(
        consts::CLASS_IDENTITY,
        IDENTITY_INSTANCE,
        DeviceIdentity::REVISION,
        &mut rev,
    )?;
    let status = read_u16(device, DeviceIdentity::STATUS)?;

    let mut serial = [0u8; 4];
    device.get_attribute(
        consts::CLASS_IDENTITY,
        IDENTITY_INSTANCE,
        DeviceIdentity::SERIAL_NUMBER,
        &mut serial,
    )?;

    let mut name = [0u8; MAX_PRODUCT_NAME + 1];
    let count = device.get_attribute(
        consts::CLASS_IDENTITY,
        IDENTITY_INSTANCE,
        DeviceIdentity::PRODUCT_NAME,
        &mut name,
    )?;
    let len = usize::from(name[0])
        .min(count.saturating_sub(1))
        .min(MAX_PRODUCT_NAME);
    let product_name = String::from_utf8_lossy(&name[1..1 + len]).into_owned();

    let identity = DeviceIdentity {
        vendor_id,
        device_type,
        product_code,
        revision: Revision {
            major: rev[0],
            minor: rev[1],
        },
        status,
        serial_number: u32::from_le_bytes(serial),
        product_name,
    };
    log::debug!("Device #{} identity: {:?}", device.address(), identity);
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_encoding() {
        let identity = DeviceIdentity {
            vendor_id: 283,
            device_type: 12,
            product_code: 0x0102,
            revision: Revision { major: 1, minor: 7 },
            status: 0x0004,
            serial_number: 0xDEADBEEF,
            product_name: "DNS-SIM".into(),
        };
        assert_eq!(identity.encode_attribute(1), Some(vec![0x1b, 0x01]));
        assert_eq!(identity.encode_attribute(4), Some(vec![1, 7]));
        assert_eq!(
            identity.encode_attribute(6),
            Some(vec![0xEF, 0xBE, 0xAD, 0xDE])
        );
        assert_eq!(
            identity.encode_attribute(7),
            Some(b"\x07DNS-SIM".to_vec())
        );
        assert_eq!(identity.encode_attribute(8), None);
        assert_eq!(identity.vendor_name(), "Hilscher GmbH");
        assert_eq!(identity.device_type_name(), "Communications Adapter");
        assert_eq!(identity.revision.to_string(), "1.007");
    }

    #[test]
    fn long_product_name_is_truncated() {
        let identity = DeviceIdentity {
            product_name: "x".repeat(40),
            ..Default::default()
        };
        let encoded = identity.encode_attribute(DeviceIdentity::PRODUCT_NAME).unwrap();
        assert_eq!(encoded[0], 32);
        assert_eq!(encoded.len(), 33);
    }
}
