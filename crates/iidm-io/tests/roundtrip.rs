use iidm_core::{fixtures, Battery, HvdcLine, IidmError, Line, Load, Network, Switch, ThreeWindingsTransformer, TieLine, TwoWindingsTransformer};
use iidm_io::{
    copy, read, write, ExportOptions, IidmVersion, ImportOptions, TopologyLevel, TreeDataFormat,
};

fn write_string(network: &Network, options: &ExportOptions) -> Result<String, IidmError> {
    let mut out = Vec::new();
    write(network, options, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

fn round_trip(network: &Network, options: &ExportOptions) -> Network {
    let text = write_string(network, options).expect("write");
    read(text.as_bytes(), options.format, &ImportOptions::default()).expect("read back")
}

#[test]
fn two_substations_survives_every_version() {
    let network = fixtures::two_substations().expect("fixture");
    for version in [IidmVersion::V_1_0, IidmVersion::V_1_5, IidmVersion::V_1_9, IidmVersion::CURRENT] {
        let options = ExportOptions::default().with_version(version);
        let back = round_trip(&network, &options);
        assert_eq!(back.stats(), network.stats(), "version {version}");
        let line = back.get::<Line>("L1").expect("L1");
        assert_eq!(line.x, 33.0);
        assert!(back.get::<Load>("LD3").is_some());
    }
}

#[test]
fn json_round_trip_keeps_hvdc_and_extensions() {
    let network = fixtures::with_tie_line_and_hvdc().expect("fixture");
    let options = ExportOptions::default().with_format(TreeDataFormat::Json);
    let text = write_string(&network, &options).expect("write");
    assert!(text.trim_start().starts_with('{'));
    assert!(text.contains(r#""version": "1.12""#) || text.contains(r#""version":"1.12""#));

    let back = read(text.as_bytes(), TreeDataFormat::Json, &ImportOptions::default()).expect("read");
    assert_eq!(back.stats(), network.stats());
    let hvdc = back.get::<HvdcLine>("HVDC1").expect("HVDC1");
    assert_eq!(hvdc.converter_station2, "VSC2");
    let battery = back.get::<Battery>("BAT1").expect("BAT1");
    let apc = battery.identity.extension("activePowerControl").expect("extension");
    assert_eq!(apc.attribute("participate"), Some("true"));
    assert_eq!(back.iter::<TieLine>().count(), 1);
}

#[test]
fn legacy_tie_line_round_trip() {
    let network = fixtures::with_tie_line().expect("fixture");
    let options = ExportOptions::default().with_version(IidmVersion::V_1_9);
    let text = write_string(&network, &options).expect("write");
    assert!(text.contains("id_1=\"DL1\""));
    let back = read(text.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
    let tie_line = back.get::<TieLine>("TL1").expect("TL1");
    assert_eq!(tie_line.dangling_line1, "DL1");
    assert_eq!(tie_line.dangling_line2, "DL2");
}

#[test]
fn three_windings_transformer_round_trip() {
    let network = fixtures::three_windings_transformer().expect("fixture");
    let back = round_trip(&network, &ExportOptions::default());
    assert_eq!(back.stats(), network.stats());

    let legacy = ExportOptions::default().with_version(IidmVersion::V_1_1);
    let err = write_string(&network, &legacy).unwrap_err();
    assert!(matches!(err, IidmError::UnsupportedVersion(_)), "{err}");
    assert!(err.to_string().contains("threeWindingsTransformer.ratedS1"), "{err}");

    let mut network = network;
    network
        .get_mut::<ThreeWindingsTransformer>("3WT")
        .expect("3WT")
        .legs[0]
        .rated_s = f64::NAN;
    let back = round_trip(&network, &legacy);
    assert_eq!(back.stats(), network.stats());
    let legs = &back.get::<ThreeWindingsTransformer>("3WT").expect("3WT").legs;
    assert!(legs[0].rated_s.is_nan());
    assert_eq!(legs[1].x, 1.2);
}

#[test]
fn tap_range_past_integer_bounds_is_rejected() {
    let network = fixtures::two_substations().expect("fixture");
    let text = write_string(&network, &ExportOptions::default()).expect("write");
    let patched = text.replace(
        r#"lowTapPosition="0" tapPosition="1""#,
        r#"lowTapPosition="2147483647" tapPosition="2147483647""#,
    );
    assert_ne!(patched, text);
    let err = read(patched.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, IidmError::Validation(_)), "{err}");
}

#[test]
fn node_breaker_exported_at_bus_breaker_level() {
    let network = fixtures::node_breaker().expect("fixture");
    let options = ExportOptions::default().with_topology_level(TopologyLevel::BusBreaker);
    let text = write_string(&network, &options).expect("write");
    assert!(text.contains(r#"topologyKind="BUS_BREAKER""#));
    assert!(!text.contains("nodeBreakerTopology"));
    // the retained coupler survives the projection
    assert!(text.contains(r#"id="COUPLER""#));

    let back = read(text.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
    assert!(back.get::<Switch>("COUPLER").is_some());
    assert!(back.get::<Switch>("BK1").is_none());
    assert!(back.get::<Load>("LD1").is_some());
}

#[test]
fn self_looped_switch_policy_follows_version() {
    let mut network = fixtures::two_substations().expect("fixture");
    network
        .add_equipment(Switch::buses("LOOP", "VL1", "B2", "B2"))
        .expect("switch");

    let legacy = ExportOptions::default().with_version(IidmVersion::V_1_7);
    let text = write_string(&network, &legacy).expect("legacy write keeps the switch");
    let back = read(text.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
    assert!(back.get::<Switch>("LOOP").is_some());

    let err = write_string(&network, &ExportOptions::default().with_version(IidmVersion::V_1_9)).unwrap_err();
    assert!(matches!(err, IidmError::Validation(_)), "{err}");

    let relabeled = text.replace("iidm/1_7", "iidm/1_9");
    let err = read(relabeled.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, IidmError::Validation(_)), "{err}");
}

#[test]
fn main_connected_component_drops_isolated_substation() {
    let network = fixtures::two_substations().expect("fixture");
    let options = ExportOptions::default().with_only_main_connected_component(true);
    let text = write_string(&network, &options).expect("write");
    assert!(text.contains(r#"id="LD1""#));
    assert!(!text.contains(r#"id="LD3""#));
    assert!(!text.contains(r#"id="S3""#));

    let back = read(text.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
    assert!(back.get::<Load>("LD2").is_some());
    assert!(back.get::<Load>("LD3").is_none());
}

#[test]
fn sorted_output_is_stable() {
    let network = fixtures::with_tie_line_and_hvdc().expect("fixture");
    let options = ExportOptions::default().with_sorted(true);
    let first = write_string(&network, &options).expect("write");
    let copy = copy(&network).expect("copy");
    let second = write_string(&copy, &options).expect("write copy");
    assert_eq!(first, second);
}

#[test]
fn unknown_element_names_its_parent() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<iidm:network xmlns:iidm="http://www.powsybl.org/schema/iidm/1_12" id="n" caseDate="2024-01-15T10:30:00.000+01:00" forecastDistance="0" sourceFormat="test" minimumValidationLevel="STEADY_STATE_HYPOTHESIS">
  <iidm:substation id="S1">
    <iidm:gizmo/>
  </iidm:substation>
</iidm:network>"#;
    let err = read(xml.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Unknown element name 'gizmo' in 'S1'");
}

#[test]
fn extension_on_unknown_identifiable_is_dangling() {
    let xml = r#"<iidm:network xmlns:iidm="http://www.powsybl.org/schema/iidm/1_12" xmlns:apc="http://www.powsybl.org/schema/iidm/ext/active_power_control/1_0" id="n" caseDate="2024-01-15T10:30:00.000+01:00" forecastDistance="0" sourceFormat="test">
  <iidm:extension id="NOPE">
    <apc:activePowerControl participate="true" droop="4"/>
  </iidm:extension>
</iidm:network>"#;
    let err = read(xml.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, IidmError::DanglingReference(ref id) if id == "NOPE"), "{err}");
}

#[test]
fn unsupported_namespace_version_is_rejected() {
    let xml = r#"<iidm:network xmlns:iidm="http://www.powsybl.org/schema/iidm/equipment/1_6" id="n" caseDate="2024-01-15T10:30:00.000+01:00" sourceFormat="test"/>"#;
    let err = read(xml.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, IidmError::UnsupportedVersion(_)), "{err}");
}

#[test]
fn deadband_omitted_when_default_before_1_2() {
    let mut network = fixtures::two_substations().expect("fixture");
    let t1 = network.get_mut::<TwoWindingsTransformer>("T1").expect("T1");
    if let Some(rtc) = t1.ratio_tap_changer.as_mut() {
        rtc.target_deadband = 0.0;
    }
    let legacy = write_string(&network, &ExportOptions::default().with_version(IidmVersion::V_1_1)).expect("write");
    assert!(!legacy.contains("targetDeadband"));
    let recent = write_string(&network, &ExportOptions::default().with_version(IidmVersion::V_1_3)).expect("write");
    assert!(recent.contains(r#"targetDeadband="0""#));

    let back = read(legacy.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
    let rtc = back
        .get::<TwoWindingsTransformer>("T1")
        .and_then(|t| t.ratio_tap_changer.as_ref())
        .expect("ratio tap changer");
    assert_eq!(rtc.target_deadband, 0.0);
}

#[test]
fn battery_setpoints_renamed_at_1_8() {
    let mut network = fixtures::with_tie_line_and_hvdc().expect("fixture");
    network.get_mut::<Battery>("BAT1").expect("BAT1").target_p = 12.5;
    let old = write_string(&network, &ExportOptions::default().with_version(IidmVersion::V_1_7)).expect("write");
    assert!(old.contains(r#"p0="12.5""#));
    assert!(!old.contains(r#"targetP="12.5""#));
    let new = write_string(&network, &ExportOptions::default().with_version(IidmVersion::V_1_8)).expect("write");
    assert!(new.contains(r#"targetP="12.5""#));
    assert!(!new.contains(r#"p0="12.5""#));

    for text in [old, new] {
        let back = read(text.as_bytes(), TreeDataFormat::Xml, &ImportOptions::default()).expect("read");
        assert_eq!(back.get::<Battery>("BAT1").expect("BAT1").target_p, 12.5);
    }
}
