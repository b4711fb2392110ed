
mod common;

use benchvisa::devices::Instrument;
use benchvisa::discovery::{discover_generators, discover_oscilloscopes};
use benchvisa::error::Error;

use common::{MockBus, GEN_IDN, SCOPE_IDN};

#[test]
fn matching_resources_are_classified_and_the_rest_raise_the_flag() {
    // Five resources: two registered oscilloscopes, a generator (wrong kind
    // for this scan), an unsupported multimeter, and one that will not open
    let mut bus = MockBus::new(&[
        ("TCPIP0::192.168.2.10::INSTR", Some(SCOPE_IDN)),
        ("TCPIP0::192.168.2.11::INSTR", Some("RIGOL TECHNOLOGIES,DS1054Z,DS1ZA000000002,00.04.03")),
        ("TCPIP0::192.168.2.12::INSTR", Some(GEN_IDN)),
        ("TCPIP0::192.168.2.13::INSTR", Some("Keysight Technologies,34465A,MY00000001,A.02.17")),
        ("TCPIP0::192.168.2.14::INSTR", None),
    ]);

    let found = discover_oscilloscopes(&mut bus).unwrap();
    assert_eq!(found.devices.len(), 2);
    assert!(found.unknown_device_present);

    let models: Vec<String> = found.devices.iter().map(|d| d.identity().model.clone()).collect();
    assert!(models.contains(&"DS1104Z".to_string()));
    assert!(models.contains(&"DS1054Z".to_string()));
}

#[test]
fn flag_stays_clear_when_every_resource_matches() {
    let mut bus = MockBus::new(&[
        ("TCPIP0::192.168.2.10::INSTR", Some(SCOPE_IDN)),
        ("TCPIP0::192.168.2.11::INSTR", Some("RIGOL TECHNOLOGIES,DS1054Z,DS1ZA000000002,00.04.03")),
    ]);

    let found = discover_oscilloscopes(&mut bus).unwrap();
    assert_eq!(found.devices.len(), 2);
    assert!(!found.unknown_device_present);
}

#[test]
fn discovered_device_reports_its_identification_string() {
    let mut bus = MockBus::new(&[("TCPIP0::192.168.2.10::INSTR", Some(SCOPE_IDN))]);

    let found = discover_oscilloscopes(&mut bus).unwrap();
    assert_eq!(
        found.devices[0].identification_string(),
        "RIGOL TECHNOLOGIES,DS1104Z,DS1ZA170000001"
    );
    assert_eq!(found.devices[0].resource(), "TCPIP0::192.168.2.10::INSTR");
}

#[test]
fn generator_scan_ignores_oscilloscopes() {
    let mut bus = MockBus::new(&[
        ("TCPIP0::192.168.2.10::INSTR", Some(SCOPE_IDN)),
        ("TCPIP0::192.168.2.12::INSTR", Some(GEN_IDN)),
    ]);

    let found = discover_generators(&mut bus).unwrap();
    assert_eq!(found.devices.len(), 1);
    assert_eq!(found.devices[0].identity().model, "SDG2042X");
    assert!(found.unknown_device_present);
}

#[test]
fn misreported_series_name_still_classifies() {
    // Firmware that answers with the series name instead of the model
    let mut bus = MockBus::new(&[(
        "TCPIP0::192.168.2.12::INSTR",
        Some("Siglent Technologies,SDG2000X,SDG2XCAX1R0002,2.01.01.35R3B2"),
    )]);

    let found = discover_generators(&mut bus).unwrap();
    assert_eq!(found.devices.len(), 1);
    assert!(!found.unknown_device_present);
}

#[test]
fn empty_bus_is_a_normal_result() {
    let mut bus = MockBus::new(&[]);

    let found = discover_oscilloscopes(&mut bus).unwrap();
    assert!(found.devices.is_empty());
    assert!(!found.unknown_device_present);
}

#[test]
fn enumeration_failure_is_folded_into_an_empty_result() {
    let mut bus = MockBus::new(&[]);
    bus.enumerate_fails = true;

    let found = discover_oscilloscopes(&mut bus).unwrap();
    assert!(found.devices.is_empty());
    assert!(!found.unknown_device_present);
}

#[test]
fn missing_backend_propagates() {
    let mut bus = MockBus::new(&[]);
    bus.backend_missing = true;

    match discover_oscilloscopes(&mut bus) {
        Err(Error::BackendMissing(_)) => {}
        other => panic!("expected a backend-missing error, got {:?}", other.map(|d| d.devices.len())),
    }
}

#[test]
fn malformed_identification_does_not_abort_the_scan() {
    let mut bus = MockBus::new(&[
        ("TCPIP0::192.168.2.9::INSTR", Some("GARBAGE")),
        ("TCPIP0::192.168.2.10::INSTR", Some(SCOPE_IDN)),
    ]);

    let found = discover_oscilloscopes(&mut bus).unwrap();
    assert_eq!(found.devices.len(), 1);
    assert!(found.unknown_device_present);
}
