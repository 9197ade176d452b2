use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::error::GeneralStatus;
use crate::simulator::{SimulatedSlave, SlaveFault};
use crate::{consts, AllocFlags, Baudrate, ConnectionType, Device, Interface, Kind};

fn interface(sdk: &SimulatorSdk) -> Rc<RefCell<NiInterface>> {
    Rc::new(RefCell::new(NiInterface::new(
        Box::new(sdk.clone()),
        Parameters::default(),
    )))
}

fn open_interface(sdk: &SimulatorSdk) -> Rc<RefCell<NiInterface>> {
    let intf = interface(sdk);
    intf.borrow_mut().open().unwrap();
    assert!(intf.borrow().is_active());
    intf
}

fn allocated(
    sdk: &SimulatorSdk,
    slave: SimulatedSlave,
    flags: AllocFlags,
) -> (Rc<RefCell<NiInterface>>, NiDevice) {
    sdk.add_slave(5, slave);
    let intf = open_interface(sdk);
    let mut device = NiDevice::new(5, 2, 0, ConnectionType::POLLED, 100, &intf);
    device.allocate(flags).unwrap();
    (intf, device)
}

fn status(e: crate::Error) -> Option<NcStatus> {
    match e {
        crate::Error::NiDnet { status, .. } => Some(NcStatus(status)),
        _ => None,
    }
}

#[test]
fn open_sequence() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = open_interface(&sdk);

    assert_eq!(
        sdk.calls(),
        vec![
            SdkCall::OpenInterface {
                name: "dnet0".into(),
                address: 0,
                baudrate: Baudrate::B250k,
                poll_mode: PollMode::Individual,
            },
            SdkCall::Operate(Operation::Start),
        ]
    );
    assert!(sdk.is_running());

    sdk.clear_calls();
    intf.borrow_mut().open().unwrap();
    assert_eq!(sdk.calls(), vec![]);
    assert_eq!(crate::error::last_error_message(), "");
}

#[test]
fn close_stops_and_releases() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = open_interface(&sdk);
    sdk.clear_calls();

    intf.borrow_mut().close().unwrap();
    assert!(!intf.borrow().is_active());
    assert_eq!(
        sdk.calls(),
        vec![
            SdkCall::Operate(Operation::Stop),
            SdkCall::CloseObject(ObjectHandle(1)),
        ]
    );
    assert_eq!(sdk.open_objects(), 0);

    sdk.clear_calls();
    intf.borrow_mut().close().unwrap();
    assert_eq!(sdk.calls(), vec![]);
}

#[test]
fn failed_start_closes_interface_object() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    sdk.fail_next(SdkCall::Operate(Operation::Start), NcStatus::ERR_DRIVER);
    let intf = interface(&sdk);

    let e = intf.borrow_mut().open().unwrap_err();
    assert_eq!(status(e), Some(NcStatus::ERR_DRIVER));
    assert!(!intf.borrow().is_active());
    assert_eq!(sdk.open_objects(), 0);
    assert_eq!(
        crate::error::last_error_message(),
        "NI-DNET (Intf:dnet0 Dev:0): Driver call failed"
    );

    intf.borrow_mut().open().unwrap();
    assert!(sdk.is_running());
}

#[test]
fn close_reports_first_error() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = open_interface(&sdk);
    sdk.fail_next(SdkCall::Operate(Operation::Stop), NcStatus::ERR_NOT_STARTED);

    let e = intf.borrow_mut().close().unwrap_err();
    assert_eq!(status(e), Some(NcStatus::ERR_NOT_STARTED));
    assert!(!intf.borrow().is_active());
    assert_eq!(sdk.open_objects(), 0);
}

#[test]
fn interface_id_is_gated() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = interface(&sdk);

    intf.borrow_mut().set_interface(3).unwrap();
    assert_eq!(intf.borrow().name(), "dnet3");
    assert_eq!(
        intf.borrow_mut().set_interface(MAX_INTERFACES),
        Err(crate::Error::InvalidArgument {
            parameter: "ucIID",
            value: "32".into(),
            function: "SetIntfID",
        })
    );
    assert_eq!(intf.borrow().interface(), 3);

    intf.borrow_mut().open().unwrap();
    assert!(matches!(
        &sdk.calls()[0],
        SdkCall::OpenInterface { name, .. } if name == "dnet3"
    ));
    assert_eq!(
        intf.borrow_mut().set_interface(1),
        Err(crate::Error::MustNotBeOperational("SetIntfID"))
    );
}

#[test]
fn invalid_interface_in_parameters_falls_back() {
    crate::test_utils::prepare_test_logger_with_warnings(vec![
        "Invalid value for parameter 'ucIID'",
    ]);
    let sdk = SimulatorSdk::new();
    let intf = NiInterface::new(
        Box::new(sdk),
        Parameters {
            interface: 40,
            ..Default::default()
        },
    );
    assert_eq!(intf.interface(), 0);
}

#[test]
fn reset_by_name() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = interface(&sdk);
    intf.borrow_mut().set_interface(2).unwrap();

    intf.borrow_mut().reset(0x1234).unwrap();
    assert_eq!(
        sdk.calls(),
        vec![SdkCall::Reset {
            name: "dnet2".into()
        }]
    );
}

#[test]
fn dropping_interface_closes_it() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = open_interface(&sdk);
    drop(intf);
    assert!(!sdk.is_running());
    assert_eq!(sdk.open_objects(), 0);
}

#[test]
fn allocate_and_read() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let mut slave = SimulatedSlave::new(2, 0);
    slave.inputs = vec![0x12, 0x34];
    sdk.add_slave(5, slave);
    let intf = open_interface(&sdk);
    sdk.clear_calls();

    let mut device = NiDevice::new(5, 2, 0, ConnectionType::POLLED, 100, &intf);
    device.allocate(AllocFlags::IO).unwrap();
    assert!(device.is_active());
    assert!(device.has_io_connection());
    assert!(!device.has_explicit_connection());
    assert_eq!(
        sdk.calls(),
        vec![SdkCall::OpenIo {
            name: "dnet0".into(),
            address: 5,
            config: IoConfig {
                connection: IoConnection::POLL,
                input_length: 2,
                output_length: 0,
                expected_packet_rate: 100,
            },
        }]
    );

    sdk.clear_calls();
    let mut inputs = [0u8; 2];
    device.read_io(&mut inputs).unwrap();
    assert_eq!(inputs, [0x12, 0x34]);
    assert_eq!(
        sdk.calls(),
        vec![
            SdkCall::WaitForState {
                desired: ObjectState::READ_AVAILABLE,
                timeout: 10000,
            },
            SdkCall::ReadIo { len: 2 },
        ]
    );
}

#[rstest::rstest]
#[case(ConnectionType::STROBED, IoConnection::STROBE)]
#[case(ConnectionType::CHANGE_OF_STATE, IoConnection::CHANGE_OF_STATE)]
#[case(
    ConnectionType::CHANGE_OF_STATE | ConnectionType::CYCLIC,
    IoConnection::CHANGE_OF_STATE | IoConnection::CYCLIC
)]
fn connection_type_reaches_the_sdk(#[case] ct: ConnectionType, #[case] expected: IoConnection) {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = open_interface(&sdk);
    sdk.clear_calls();

    let mut device = NiDevice::new(7, 1, 1, ct, 20, &intf);
    device.allocate(AllocFlags::IO).unwrap();
    assert!(matches!(
        &sdk.calls()[0],
        SdkCall::OpenIo { config, .. } if config.connection == expected
    ));
}

#[test]
fn write_reaches_the_slave() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    sdk.add_slave(9, SimulatedSlave::new(0, 2));
    let intf = open_interface(&sdk);

    let mut device = NiDevice::new(9, 0, 2, ConnectionType::POLLED, 100, &intf);
    device.allocate(AllocFlags::IO).unwrap();
    device.write_io(&[0xde, 0xad]).unwrap();
    assert_eq!(sdk.with_slave(9, |s| s.outputs.clone()), Some(vec![0xde, 0xad]));
}

#[test]
fn size_mismatch_times_out() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    sdk.add_slave(5, SimulatedSlave::new(2, 0));
    let intf = open_interface(&sdk);

    let mut device = NiDevice::new(5, 3, 0, ConnectionType::POLLED, 100, &intf);
    device.allocate(AllocFlags::IO).unwrap();
    let e = device.read_io(&mut [0; 3]).unwrap_err();
    assert_eq!(status(e), Some(NcStatus::ERR_TIMEOUT));
    assert_eq!(
        crate::error::last_error_message(),
        "NI-DNET (Intf:dnet0 Dev:5): Timeout expired while waiting for the desired state"
    );
}

#[test]
fn warnings_count_as_success() {
    crate::test_utils::prepare_test_logger_with_warnings(vec!["NI-DNET (Intf:dnet0 Dev:5)"]);
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::IO);

    sdk.fail_next(SdkCall::ReadIo { len: 0 }, NcStatus::WARN_OLD_DATA);
    assert_eq!(device.read_io(&mut [0; 2]), Ok(()));
    assert_eq!(crate::error::last_error_message(), "");
}

#[test]
fn checks_come_in_order() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    sdk.add_slave(5, SimulatedSlave::new(2, 0));
    let intf = interface(&sdk);
    let mut device = NiDevice::new(5, 2, 0, ConnectionType::POLLED, 100, &intf);

    assert_eq!(
        device.allocate(AllocFlags::IO),
        Err(crate::Error::NotOperational("Allocate"))
    );
    assert_eq!(
        device.read_io(&mut [0; 2]),
        Err(crate::Error::NotOperational("ReadIOData"))
    );
    assert_eq!(
        device.get_attribute(1, 1, 1, &mut [0; 2]),
        Err(crate::Error::NotOperational("GetAttribute"))
    );

    intf.borrow_mut().open().unwrap();
    assert_eq!(
        device.write_io(&[0]),
        Err(crate::Error::NotUsingIoConnection(5))
    );
    assert_eq!(
        device.exec_service(consts::SERVICE_RESET, 1, 1, &mut [0]),
        Err(crate::Error::NotUsingExplicitConnection(5))
    );

    device.allocate(AllocFlags::IO).unwrap();
    assert_eq!(
        device.set_attribute(1, 1, 1, &[0]),
        Err(crate::Error::NotUsingExplicitConnection(5))
    );
    assert_eq!(device.read_io(&mut [0; 2]), Ok(()));
}

#[test]
fn wrong_interface_kind() {
    crate::test_utils::prepare_test_logger();
    let board = crate::cif::SimulatorBoard::new();
    let intf = Rc::new(RefCell::new(crate::cif::CifInterface::new(
        Box::new(board),
        crate::cif::Parameters::default(),
    )));
    let mut device = NiDevice::from_base(crate::DeviceBase::new(
        5,
        2,
        0,
        ConnectionType::POLLED,
        100,
        &intf,
    ));

    let expected = crate::Error::InvalidInterface {
        device: 5,
        expected: Kind::NiInterface,
    };
    assert_eq!(device.allocate(AllocFlags::IO), Err(expected.clone()));
    assert_eq!(device.read_io(&mut [0; 2]), Err(expected));
}

#[test]
fn dropped_interface_is_reported() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let intf = interface(&sdk);
    let mut device = NiDevice::new(5, 2, 0, ConnectionType::POLLED, 100, &intf);
    drop(intf);

    assert_eq!(
        device.allocate(AllocFlags::IO),
        Err(crate::Error::InvalidPointer {
            device: 5,
            name: "interface"
        })
    );
}

#[test]
fn explicit_connection_waits_for_device() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::EXPLICIT);

    assert!(device.has_explicit_connection());
    assert!(!device.has_io_connection());
    let calls = sdk.calls();
    assert_eq!(
        calls[calls.len() - 2..],
        [
            SdkCall::OpenExplicit {
                name: "dnet0".into(),
                address: 5,
            },
            SdkCall::WaitForState {
                desired: ObjectState::ESTABLISHED,
                timeout: 10000,
            },
        ]
    );
}

#[test]
fn silent_device_fails_allocation() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let mut slave = SimulatedSlave::new(2, 0);
    slave.fault = Some(SlaveFault::Silent);
    sdk.add_slave(5, slave);
    let intf = open_interface(&sdk);

    let mut device = NiDevice::new(5, 2, 0, ConnectionType::POLLED, 100, &intf);
    let e = device
        .allocate(AllocFlags::IO | AllocFlags::EXPLICIT)
        .unwrap_err();
    assert_eq!(status(e), Some(NcStatus::ERR_TIMEOUT));
    assert!(!device.is_active());

    // The objects opened so far are released by unallocating.
    assert_eq!(sdk.open_objects(), 3);
    device.unallocate().unwrap();
    assert_eq!(sdk.open_objects(), 1);
}

#[test]
fn get_and_set_attribute() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(
        &sdk,
        SimulatedSlave::new(2, 0).with_attribute(0x64, 1, 3, &[0xaa, 0xbb]),
        AllocFlags::IO | AllocFlags::EXPLICIT,
    );

    sdk.clear_calls();
    let mut buf = [0u8; 4];
    assert_eq!(device.get_attribute(0x64, 1, 3, &mut buf), Ok(2));
    assert_eq!(buf, [0xaa, 0xbb, 0, 0]);
    assert_eq!(
        sdk.calls(),
        vec![SdkCall::GetAttribute {
            class: 0x64,
            instance: 1,
            attribute: 3,
            timeout: 2000,
        }]
    );

    device.set_attribute(0x64, 1, 3, &[1, 2]).unwrap();
    assert_eq!(
        sdk.with_slave(5, |s| s.attribute(0x64, 1, 3).map(|v| v.to_vec())),
        Some(Some(vec![1, 2]))
    );
}

#[test]
fn error_response_is_split_into_codes() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::EXPLICIT);

    assert_eq!(
        device.get_attribute(0x64, 1, 3, &mut [0; 2]),
        Err(crate::Error::explicit(5, 0x14, 0xFF))
    );
    assert_eq!(
        crate::error::last_error_message(),
        "EM (Dev:5): 0x14 - Attribute not supported, 0xFF - No"
    );

    sdk.with_slave(5, |s| {
        s.error_response = Some((GeneralStatus::OBJECT_STATE_CONFLICT, GeneralStatus(0x01)));
    });
    assert_eq!(
        device.set_attribute(1, 1, 1, &[0]),
        Err(crate::Error::explicit(5, 0x0C, 0x01))
    );
}

#[test]
fn exec_service_returns_reply() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::EXPLICIT);

    sdk.clear_calls();
    let mut data = [crate::identity::DeviceIdentity::DEVICE_TYPE, 0];
    device
        .exec_service(consts::SERVICE_GET_ATTRIBUTE_SINGLE, 1, 1, &mut data)
        .unwrap();
    assert_eq!(data, [12, 0]);
    assert_eq!(
        sdk.calls(),
        vec![
            SdkCall::WriteExplicit {
                service: consts::SERVICE_GET_ATTRIBUTE_SINGLE,
                class: 1,
                instance: 1,
                len: 2,
            },
            SdkCall::WaitForState {
                desired: ObjectState::READ_AVAILABLE,
                timeout: 10000,
            },
            SdkCall::ReadExplicit { len: 2 },
        ]
    );
}

#[test]
fn exec_service_passes_error_reply_through() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::EXPLICIT);

    let mut data = [0u8; 2];
    assert_eq!(device.exec_service(0x4b, 1, 1, &mut data), Ok(()));
    assert_eq!(data, [0x08, 0xFF]);
}

#[test]
fn reset_device() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::EXPLICIT);

    device.reset().unwrap();
    assert_eq!(sdk.with_slave(5, |s| s.resets), Some(1));
}

#[test]
fn identity_readout() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let identity = crate::identity::DeviceIdentity {
        vendor_id: 1,
        device_type: 7,
        product_code: 0x55,
        revision: crate::identity::Revision { major: 3, minor: 2 },
        status: 0x0030,
        serial_number: 0x00C0FFEE,
        product_name: "1794-ADN Flex I/O".into(),
    };
    let (_intf, mut device) = allocated(
        &sdk,
        SimulatedSlave::new(2, 0).with_identity(&identity),
        AllocFlags::EXPLICIT,
    );

    assert_eq!(crate::identity::read_identity(&mut device), Ok(identity));
}

#[test]
fn unallocate_releases_objects() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, mut device) = allocated(
        &sdk,
        SimulatedSlave::new(2, 0),
        AllocFlags::IO | AllocFlags::EXPLICIT,
    );
    assert_eq!(sdk.open_objects(), 3);

    sdk.clear_calls();
    device.unallocate().unwrap();
    assert!(!device.is_active());
    assert!(!device.has_io_connection());
    assert!(!device.has_explicit_connection());
    assert_eq!(sdk.open_objects(), 1);
    assert_eq!(
        sdk.calls(),
        vec![
            SdkCall::CloseObject(ObjectHandle(2)),
            SdkCall::CloseObject(ObjectHandle(3)),
        ]
    );

    sdk.clear_calls();
    device.unallocate().unwrap();
    assert_eq!(sdk.calls(), vec![]);
}

#[test]
fn unallocate_without_interface() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (intf, mut device) = allocated(&sdk, SimulatedSlave::new(2, 0), AllocFlags::IO);
    drop(intf);

    assert_eq!(
        device.unallocate(),
        Err(crate::Error::InvalidPointer {
            device: 5,
            name: "interface"
        })
    );
    assert!(!device.is_active());
    assert!(!device.has_io_connection());
}

#[test]
fn drop_unallocates() {
    crate::test_utils::prepare_test_logger();
    let sdk = SimulatorSdk::new();
    let (_intf, device) = allocated(
        &sdk,
        SimulatedSlave::new(2, 0),
        AllocFlags::IO | AllocFlags::EXPLICIT,
    );
    drop(device);
    assert_eq!(sdk.open_objects(), 1);
    assert!(sdk.is_running());
}
