//! Small sample networks used by tests and the CLI `demo` command.

use chrono::{DateTime, FixedOffset};

use crate::limits::LimitType;
use crate::*;

pub const CASE_DATE: &str = "2024-01-15T10:30:00.000+01:00";

fn case_date() -> IidmResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(CASE_DATE).map_err(|e| IidmError::Parse(e.to_string()))
}

/// Bus/breaker network over three substations:
///
/// - `S1`/`VL1` (400 kV): buses `B1`, `B2` joined by closed coupler `CPL`, generator `G1`, load `LD1`
/// - `S2`/`VL2` (400 kV) and `S2`/`VL3` (225 kV): buses `B3`, `B4`, transformer `T1`, load `LD2`
/// - `S3`/`VL4` (63 kV): isolated bus `B5` with load `LD3`
///
/// Line `L1` links `B1` to `B3`.
pub fn two_substations() -> IidmResult<Network> {
    let mut network = Network::new("two_substations", "test").with_case_date(case_date()?);
    network.add_substation(Substation::new("S1").with_country("FR").with_tso("RTE"))?;
    network.add_substation(Substation::new("S2").with_country("BE"))?;
    network.add_substation(Substation::new("S3").with_country("FR"))?;

    network.add_voltage_level(VoltageLevel::bus_breaker("VL1", Some("S1"), 400.0))?;
    network.add_voltage_level(VoltageLevel::bus_breaker("VL2", Some("S2"), 400.0))?;
    network.add_voltage_level(VoltageLevel::bus_breaker("VL3", Some("S2"), 225.0))?;
    network.add_voltage_level(VoltageLevel::bus_breaker("VL4", Some("S3"), 63.0))?;
    network.add_configured_bus("VL1", ConfiguredBus::new("B1").with_voltage(402.0, 0.0))?;
    network.add_configured_bus("VL1", ConfiguredBus::new("B2"))?;
    network.add_configured_bus("VL2", ConfiguredBus::new("B3"))?;
    network.add_configured_bus("VL3", ConfiguredBus::new("B4"))?;
    network.add_configured_bus("VL4", ConfiguredBus::new("B5"))?;

    network.add_equipment(Switch::buses("CPL", "VL1", "B1", "B2"))?;

    let mut g1 = Generator::new("G1", Terminal::bus("VL1", "B1").with_flow(-500.0, -20.0), 500.0, 402.0);
    g1.energy_source = EnergySource::Nuclear;
    g1.min_p = 0.0;
    g1.max_p = 900.0;
    g1.reactive_limits = Some(ReactiveLimits::MinMax {
        min_q: -300.0,
        max_q: 300.0,
    });
    network.add_equipment(g1)?;
    network.add_equipment(Load::new("LD1", Terminal::bus("VL1", "B2"), 200.0, 20.0))?;
    network.add_equipment(Load::new("LD2", Terminal::bus("VL3", "B4"), 280.0, 30.0))?;
    network.add_equipment(Load::new("LD3", Terminal::bus("VL4", "B5"), 10.0, 1.0))?;

    let mut l1 = Line::new("L1", Terminal::bus("VL1", "B1"), Terminal::bus("VL2", "B3"), 3.0, 33.0);
    l1.b1 = 1.9e-4;
    l1.b2 = 1.9e-4;
    let mut current = LoadingLimits::new(1000.0);
    current.add_temporary_limit(TemporaryLimit::new("20'", 1200, 1200.0))?;
    current.add_temporary_limit(TemporaryLimit::new("1'", 60, 1500.0))?;
    l1.limits1
        .selected_group_or_default()
        .set_limits(LimitType::Current, current);
    network.add_equipment(l1)?;

    let mut t1 = TwoWindingsTransformer::new(
        "T1",
        Some("S2"),
        Terminal::bus("VL2", "B3"),
        Terminal::bus("VL3", "B4"),
        400.0,
        225.0,
    );
    t1.x = 12.0;
    let mut rtc = RatioTapChanger::new(
        0,
        1,
        vec![
            RatioTapChangerStep::new(0.95),
            RatioTapChangerStep::new(1.0),
            RatioTapChangerStep::new(1.05),
        ],
    );
    rtc.load_tap_changing_capabilities = true;
    rtc.regulating = true;
    rtc.target_v = 225.0;
    rtc.target_deadband = 2.0;
    rtc.regulation_terminal = Some(TerminalRef::new("LD2", None));
    t1.ratio_tap_changer = Some(rtc);
    network.add_equipment(t1)?;
    Ok(network)
}

/// [`two_substations`] plus dangling lines `DL1` (on `B2`) and `DL2` (on `B3`) paired in tie line `TL1`.
pub fn with_tie_line() -> IidmResult<Network> {
    let mut network = two_substations()?;
    let mut dl1 = DanglingLine::new("DL1", Terminal::bus("VL1", "B2")).with_impedance(1.0, 10.0, 1e-6, 1e-5);
    dl1.pairing_key = Some("XNODE1".to_string());
    dl1.limits
        .selected_group_or_default()
        .set_limits(LimitType::Current, LoadingLimits::new(800.0));
    let mut dl2 = DanglingLine::new("DL2", Terminal::bus("VL2", "B3")).with_impedance(2.0, 20.0, 2e-6, 2e-5);
    dl2.pairing_key = Some("XNODE1".to_string());
    network.add_equipment(dl1)?;
    network.add_equipment(dl2)?;
    network.add_equipment(TieLine::new("TL1", "DL1", "DL2"))?;
    Ok(network)
}

/// Node/breaker network:
///
/// - `S1`/`VL1` (400 kV): busbar section `BBS1` (node 0), closed breaker `BK1` (0-1), open
///   breaker `BK2` (1-2), retained coupler `COUPLER` (0-3), internal connection 3-4,
///   generator `G1` on node 2, load `LD1` on node 4
/// - `S2`/`VL2` (400 kV): busbar section `BBS2` (node 0), closed breaker `BK3` (0-1)
///
/// Line `L1` links node 1 of both voltage levels.
pub fn node_breaker() -> IidmResult<Network> {
    let mut network = Network::new("node_breaker", "test").with_case_date(case_date()?);
    network.add_substation(Substation::new("S1").with_country("FR"))?;
    network.add_substation(Substation::new("S2").with_country("FR"))?;
    let mut vl1 = VoltageLevel::node_breaker("VL1", Some("S1"), 400.0);
    vl1.low_voltage_limit = 380.0;
    vl1.high_voltage_limit = 420.0;
    if let Topology::NodeBreaker(topology) = &mut vl1.topology {
        topology
            .internal_connections
            .push(InternalConnection { node1: 3, node2: 4 });
    }
    network.add_voltage_level(vl1)?;
    network.add_voltage_level(VoltageLevel::node_breaker("VL2", Some("S2"), 400.0))?;

    network.add_equipment(BusbarSection::new("BBS1", Terminal::node("VL1", 0)))?;
    network.add_equipment(Switch::nodes("BK1", "VL1", SwitchKind::Breaker, 0, 1))?;
    network.add_equipment(Switch::nodes("BK2", "VL1", SwitchKind::Breaker, 1, 2).with_open(true))?;
    network.add_equipment(Switch::nodes("COUPLER", "VL1", SwitchKind::Breaker, 0, 3).with_retained(true))?;
    network.add_equipment(Generator::new("G1", Terminal::node("VL1", 2), 100.0, 400.0))?;
    network.add_equipment(Load::new("LD1", Terminal::node("VL1", 4), 80.0, 5.0))?;

    network.add_equipment(BusbarSection::new("BBS2", Terminal::node("VL2", 0)))?;
    network.add_equipment(Switch::nodes("BK3", "VL2", SwitchKind::Breaker, 0, 1))?;
    network.add_equipment(Line::new("L1", Terminal::node("VL1", 1), Terminal::node("VL2", 1), 1.0, 10.0))?;
    Ok(network)
}

/// [`with_tie_line`] plus compensation and a VSC HVDC link:
///
/// - shunt `SH1` (linear, 2 sections) on `B2`, battery `BAT1` on `B1`
/// - static var compensator `SVC1` on `B3`, regulating voltage at `LD2`
/// - converter stations `VSC1` (on `B1`) and `VSC2` (on `B3`) linked by `HVDC1`
pub fn with_tie_line_and_hvdc() -> IidmResult<Network> {
    let mut network = with_tie_line()?;
    let mut shunt = ShuntCompensator::linear("SH1", Terminal::bus("VL1", "B2"), 1e-5, 2);
    shunt.section_count = 1;
    network.add_equipment(shunt)?;
    let mut battery = Battery::new("BAT1", Terminal::bus("VL1", "B1"), 10.0, 2.0);
    battery.min_p = -50.0;
    battery.max_p = 50.0;
    battery.identity.add_extension(
        Extension::new("activePowerControl")
            .with_attribute("participate", "true")
            .with_attribute("droop", "4"),
    );
    network.add_equipment(battery)?;
    network.add_equipment(StaticVarCompensator {
        identity: Identity::new("SVC1"),
        terminal: Terminal::bus("VL2", "B3"),
        b_min: -1e-3,
        b_max: 1e-3,
        voltage_setpoint: 400.0,
        reactive_power_setpoint: f64::NAN,
        regulation_mode: SvcRegulationMode::Voltage,
        regulating_terminal: Some(TerminalRef::new("LD2", None)),
    })?;
    for (id, vl, bus) in [("VSC1", "VL1", "B1"), ("VSC2", "VL2", "B3")] {
        network.add_equipment(VscConverterStation {
            identity: Identity::new(id),
            terminal: Terminal::bus(vl, bus),
            loss_factor: 1.1,
            voltage_regulator_on: true,
            voltage_setpoint: 405.0,
            reactive_power_setpoint: f64::NAN,
            reactive_limits: Some(ReactiveLimits::MinMax {
                min_q: -100.0,
                max_q: 100.0,
            }),
        })?;
    }
    network.add_equipment(HvdcLine {
        identity: Identity::new("HVDC1"),
        r: 1.0,
        nominal_v: 320.0,
        converters_mode: ConvertersMode::Side1RectifierSide2Inverter,
        active_power_setpoint: 150.0,
        max_p: 300.0,
        converter_station1: "VSC1".to_string(),
        converter_station2: "VSC2".to_string(),
    })?;
    Ok(network)
}

/// One substation `S1` (DE) with three bus/breaker voltage levels `VL132` (`B132`),
/// `VL33` (`B33`) and `VL11` (`B11`) tied by three-winding transformer `3WT`.
/// Leg 2 carries a ratio tap changer regulating `LOAD33`; leg 1 carries current limits.
pub fn three_windings_transformer() -> IidmResult<Network> {
    let mut network = Network::new("three_windings", "test").with_case_date(case_date()?);
    network.add_substation(Substation::new("S1").with_country("DE"))?;
    for (vl, bus, nominal_v) in [("VL132", "B132", 132.0), ("VL33", "B33", 33.0), ("VL11", "B11", 11.0)] {
        network.add_voltage_level(VoltageLevel::bus_breaker(vl, Some("S1"), nominal_v))?;
        network.add_configured_bus(vl, ConfiguredBus::new(bus))?;
    }
    network.add_equipment(Generator::new("GEN132", Terminal::bus("VL132", "B132"), 20.0, 133.0))?;
    network.add_equipment(Load::new("LOAD33", Terminal::bus("VL33", "B33"), 11.0, 2.0))?;
    network.add_equipment(Load::new("LOAD11", Terminal::bus("VL11", "B11"), 9.0, 1.5))?;

    let mut leg1 = Leg::new(Terminal::bus("VL132", "B132"), 132.0);
    leg1.r = 0.1;
    leg1.x = 12.0;
    leg1.rated_s = 60.0;
    leg1.limits
        .selected_group_or_default()
        .set_limits(LimitType::Current, LoadingLimits::new(300.0));
    let mut leg2 = Leg::new(Terminal::bus("VL33", "B33"), 33.0);
    leg2.x = 1.2;
    let mut rtc = RatioTapChanger::new(
        -1,
        0,
        vec![
            RatioTapChangerStep::new(0.98),
            RatioTapChangerStep::new(1.0),
            RatioTapChangerStep::new(1.02),
        ],
    );
    rtc.load_tap_changing_capabilities = true;
    rtc.regulating = true;
    rtc.target_v = 33.5;
    rtc.target_deadband = 0.5;
    rtc.regulation_terminal = Some(TerminalRef::new("LOAD33", None));
    leg2.ratio_tap_changer = Some(rtc);
    let mut leg3 = Leg::new(Terminal::bus("VL11", "B11"), 11.0);
    leg3.x = 0.4;
    network.add_equipment(ThreeWindingsTransformer {
        identity: Identity::new("3WT"),
        substation_id: Some("S1".to_string()),
        rated_u0: 132.0,
        legs: [leg1, leg2, leg3],
    })?;
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_build() {
        assert!(two_substations().is_ok());
        assert!(node_breaker().is_ok());
        let network = with_tie_line().expect("fixture");
        assert_eq!(network.iter::<TieLine>().count(), 1);
        assert_eq!(network.case_date.to_rfc3339(), "2024-01-15T10:30:00+01:00");
        let network = with_tie_line_and_hvdc().expect("fixture");
        assert_eq!(network.iter::<HvdcLine>().count(), 1);
        let network = three_windings_transformer().expect("fixture");
        assert_eq!(network.iter::<ThreeWindingsTransformer>().count(), 1);
    }
}
