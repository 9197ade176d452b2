//! Human readable names for identity object values

/// Highest vendor ID known to the lookup
pub const MAX_VENDOR_ID: u16 = 829;

/// Highest device type (profile) known to the lookup
pub const MAX_DEVICE_TYPE: u16 = 28;

const VENDORS: &[(u16, &str)] = &[
    (0, "Reserved"),
    (1, "Rockwell Automation/Allen-Bradley"),
    (2, "Namco Controls Corp."),
    (3, "Honeywell Inc."),
    (5, "Rockwell Automation/Reliance Elec."),
    (7, "SMC Corporation"),
    (8, "Molex Incorporated"),
    (12, "Banner Engineering Corp."),
    (26, "Festo Corporation"),
    (47, "OMRON Corporation"),
    (48, "Turck, Inc."),
    (283, "Hilscher GmbH"),
];

const DEVICE_TYPES: [&str; MAX_DEVICE_TYPE as usize + 1] = [
    "Generic Device",
    "Reserved",
    "AC Drive",
    "Motor Overload",
    "Limit Switch",
    "Inductive Proximity Switch",
    "Photoelectric Sensor",
    "General Purpose Discrete I/O",
    "Reserved",
    "Resolver",
    "Reserved",
    "Reserved",
    "Communications Adapter",
    "Reserved",
    "Programmable Logic Controller",
    "Reserved",
    "Position Controller",
    "Reserved",
    "Reserved",
    "DC Drive",
    "Reserved",
    "Contactor",
    "Motor Starter",
    "Soft Start",
    "Human-Machine Interface",
    "Reserved",
    "Mass Flow Controller",
    "Pneumatic Valve",
    "Vacuum Pressure Gauge",
];

/// Name of the vendor with the given ID.
///
/// IDs up to [`MAX_VENDOR_ID`] always resolve; IDs without a registered name yield
/// `"Unknown"`.  Larger IDs are an error.
///
/// # Example
/// ```
/// assert_eq!(dnetrust::names::vendor_name(283), Ok("Hilscher GmbH"));
/// assert!(dnetrust::names::vendor_name(830).is_err());
/// ```
pub fn vendor_name(id: u16) -> crate::Result<&'static str> {
    if id > MAX_VENDOR_ID {
        return crate::error::track(Err(crate::Error::UnknownVendor(id)));
    }
    let name = VENDORS
        .binary_search_by_key(&id, |(v, _)| *v)
        .map(|i| VENDORS[i].1)
        .unwrap_or("Unknown");
    crate::error::track(Ok(name))
}

/// Name of the device profile with the given type ID.
pub fn device_type_name(id: u16) -> crate::Result<&'static str> {
    let name = DEVICE_TYPES
        .get(usize::from(id))
        .copied()
        .ok_or(crate::Error::UnknownDeviceType(id));
    crate::error::track(name)
}
