//! Acquisition, info and teardown against the scripted dongle.

mod common;

use std::thread;
use std::time::Duration;

use common::*;
use myolink_bgapi::myohw::{HANDLE_BATTERY, HANDLE_COMMAND};
use myolink_bgapi::*;
use myolink_driver::{DeviceSlot, DiscoveryFilter, DriverConfig, DriverError, Session, TeardownMode};

fn two_armbands() -> FakeDongle {
    let dongle = FakeDongle::new();
    dongle.advertise(address(0xEE), foreign_adv_data());
    dongle.advertise(address(1), myo_adv_data());
    dongle.advertise(address(1), myo_adv_data());
    dongle.advertise(address(2), myo_adv_data());
    dongle
}

#[test]
fn test_startup_sweeps_stale_connections() {
    let dongle = two_armbands();
    let mut driver = driver(&dongle, config(1));
    driver.run().unwrap();

    let sent = dongle.sent();
    assert_eq!((sent[0].class, sent[0].command), (CLASS_GAP, CMD_GAP_END_PROCEDURE));
    for (i, frame) in sent[1..=8].iter().enumerate() {
        assert_eq!((frame.class, frame.command), (CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT));
        assert_eq!(frame.payload, vec![i as u8]);
    }
    assert_eq!((sent[9].class, sent[9].command), (CLASS_GAP, CMD_GAP_DISCOVER));
}

#[test]
fn test_two_devices_end_to_end() {
    let dongle = two_armbands();
    let mut driver = driver(&dongle, config(2));

    driver.run().unwrap();
    assert_eq!(driver.registry().len(), 2);
    assert_eq!(*driver.session(), Session::Idle);
    assert!(!driver.registry().all_ready());

    driver.get_info().unwrap();
    assert!(driver.registry().all_ready());

    // Discovery order, duplicate advertisement of the first armband skipped
    let devices: Vec<_> = driver.registry().iter().map(|(slot, d)| (slot, d.clone())).collect();
    assert_eq!(devices[0].0, DeviceSlot(0));
    assert_eq!(devices[0].1.address, address(1));
    assert_eq!(devices[1].1.address, address(2));
    assert_ne!(devices[0].1.connection, devices[1].1.connection);

    let first = &devices[0].1;
    assert_eq!(first.name.as_deref(), Some("Myo 0"));
    assert_eq!(first.battery, Some(80));
    assert_eq!(first.firmware.map(|f| (f.major, f.minor, f.patch)), Some((1, 5, 1970)));
}

#[test]
fn test_configure_commands_after_connect() {
    let dongle = two_armbands();
    let mut driver = driver(&dongle, config(1));
    driver.run().unwrap();

    let writes: Vec<Vec<u8>> = dongle
        .sent()
        .into_iter()
        .filter(|f| (f.class, f.command) == (CLASS_ATTCLIENT, CMD_ATTCLIENT_ATTRIBUTE_WRITE))
        .map(|f| f.payload)
        .collect();
    let [lo, hi] = HANDLE_COMMAND.to_le_bytes();
    // Short vibration, then never-sleep
    assert_eq!(writes, vec![vec![0, lo, hi, 3, 3, 1, 1], vec![0, lo, hi, 3, 9, 1, 1]]);
}

#[test]
fn test_expected_address_is_honoured() {
    let dongle = two_armbands();
    let config = DriverConfig {
        filter: DiscoveryFilter::default().with_address(address(2)),
        ..config(1)
    };
    let mut driver = driver(&dongle, config);
    driver.run().unwrap();

    let (_, device) = driver.registry().iter().next().unwrap();
    assert_eq!(device.address, address(2));
}

#[test]
fn test_connect_rejection_is_fatal() {
    let dongle = two_armbands();
    dongle.set_connect_result(0x0181);
    let mut driver = driver(&dongle, config(1));

    let err = driver.run().unwrap_err();
    assert!(matches!(
        err,
        DriverError::Rejected {
            command: "gap_connect_direct",
            result: 0x0181
        }
    ));
    assert!(driver.registry().is_empty());
    assert_eq!(*driver.session(), Session::Idle);
}

#[test]
fn test_interrupt_while_scanning() {
    // Nothing advertises, so acquisition waits until cancelled
    let dongle = FakeDongle::new();
    let mut driver = driver(&dongle, config(1));
    let cancel = driver.cancel_token().clone();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
    });
    let err = driver.run().unwrap_err();
    stopper.join().unwrap();

    assert!(matches!(err, DriverError::Interrupted));
    let report = driver.disconnect_all();
    assert!(report.outcomes.is_empty());
}

#[test]
fn test_disconnect_all_covers_every_device() {
    let dongle = two_armbands();
    let mut driver = driver(&dongle, config(2));
    driver.run().unwrap();
    dongle.clear_sent();

    let report = driver.disconnect_all();
    assert_eq!(report.mode, TeardownMode::Disconnect);
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.is_complete());

    let sent = dongle.sent();
    assert_eq!(ids(&sent), vec![(CLASS_CONNECTION, CMD_CONNECTION_DISCONNECT); 2]);
    let mut connections: Vec<u8> = sent.iter().map(|f| f.payload[0]).collect();
    connections.sort_unstable();
    assert_eq!(connections, vec![0, 1]);

    assert!(driver.registry().is_empty());
    assert_eq!(dongle.open_connections(), 0);
}

#[test]
fn test_deep_sleep_continues_past_failure() {
    let dongle = two_armbands();
    dongle.advertise(address(3), myo_adv_data());
    let mut driver = driver(&dongle, config(3));
    driver.run().unwrap();
    dongle.clear_sent();
    dongle.fail_writes_to(1);

    let report = driver.deep_sleep_all();
    assert_eq!(report.outcomes.len(), 3);
    let failed: Vec<u8> = report.failures().map(|o| o.connection).collect();
    assert_eq!(failed, vec![1]);

    // The other two still got exactly one deep-sleep write each
    let sent = dongle.sent();
    assert_eq!(sent.len(), 2);
    let [lo, hi] = HANDLE_COMMAND.to_le_bytes();
    assert_eq!(sent[0].payload, vec![0, lo, hi, 2, 4, 0]);
    assert_eq!(sent[1].payload, vec![2, lo, hi, 2, 4, 0]);

    assert!(driver.registry().is_empty());
}

#[test]
fn test_radio_disconnect_removes_device() {
    let dongle = two_armbands();
    let mut driver = driver(&dongle, config(2));
    driver.run().unwrap();

    dongle.drop_connection(0);
    for _ in 0..100 {
        if driver.registry().len() == 1 {
            break;
        }
        driver.receive().unwrap();
    }

    assert_eq!(driver.registry().len(), 1);
    assert!(driver.registry().get(DeviceSlot(0)).is_none());
    assert_eq!(driver.registry().get(DeviceSlot(1)).unwrap().address, address(2));
}

#[test]
fn test_get_info_without_devices_returns() {
    let dongle = FakeDongle::new();
    let mut driver = driver(&dongle, config(1));
    driver.get_info().unwrap();
    assert!(dongle.sent().is_empty());
}

#[test]
fn test_get_info_waits_for_every_attribute() {
    let dongle = two_armbands();
    dongle.withhold(1, HANDLE_BATTERY);
    let mut driver = driver(&dongle, config(2));
    driver.run().unwrap();
    let cancel = driver.cancel_token().clone();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
    });
    let err = driver.get_info().unwrap_err();
    stopper.join().unwrap();

    assert!(matches!(err, DriverError::Interrupted));
    assert!(!driver.registry().all_ready());
    let devices: Vec<_> = driver.registry().iter().map(|(_, d)| d.clone()).collect();
    assert!(devices[0].ready());
    assert!(devices[1].name.is_some() && devices[1].firmware.is_some());
    assert_eq!(devices[1].battery, None);
}
