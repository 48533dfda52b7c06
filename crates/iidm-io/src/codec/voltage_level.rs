//! `voltageLevel` and its topology
//!
//! A voltage level is written at the topology level the export asks for, never finer than
//! its native one:
//!
//! - **node/breaker**: busbar sections, switches, internal connections, the voltage of
//!   calculated buses (`bus`, 1.1+) and fictitious node injections (`inj`, 1.8+).
//! - **bus/breaker**: configured buses and switches. A node/breaker voltage level is
//!   projected onto its bus/breaker view: calculated buses replace nodes, retained
//!   switches become bus-to-bus switches and busbar sections disappear.
//! - **bus/branch**: the buses of the bus view, no switch.
//!
//! Injections follow the topology in a fixed order, see [`injection::WRITE_ORDER`].

use iidm_core::{
    BusVoltage, BusbarSection, ConfiguredBus, Equipment, FictitiousInjection, IidmError, IidmResult,
    InternalConnection, Network, Switch, SwitchEnds, SwitchKind, Topology, TopologyKind, VoltageLevel,
};

use crate::codec::{injection, read_contained_elements, read_identity, read_leaf, tie_line, write_identifiable};
use crate::context::{ReaderContext, WriterContext};
use crate::gating::{CALCULATED_BUS, FICTITIOUS_INJECTION, NODE_COUNT};
use crate::options::TopologyLevel;
use crate::tree::{read_enum, read_required_enum};
use crate::version::IidmVersion;

pub(crate) const VOLTAGE_LEVEL: &str = "voltageLevel";
const NODE_BREAKER_TOPOLOGY: &str = "nodeBreakerTopology";
const BUS_BREAKER_TOPOLOGY: &str = "busBreakerTopology";
const BUSBAR_SECTION: &str = "busbarSection";
const SWITCH: &str = "switch";
const INTERNAL_CONNECTION: &str = "internalConnection";
const BUS: &str = "bus";
const INJ: &str = "inj";

/// First version rejecting switches whose two ends are the same node or bus.
const SELF_LOOP_REJECTED_SINCE: IidmVersion = IidmVersion::V_1_8;

pub(crate) fn write(ctx: &mut WriterContext<'_>, vl: &VoltageLevel) -> IidmResult<()> {
    let level = ctx.options.topology_level.effective(vl.kind());
    write_identifiable(
        ctx,
        VOLTAGE_LEVEL,
        &vl.identity,
        |ctx| {
            ctx.writer.write_double_attribute("nominalV", vl.nominal_v)?;
            ctx.writer.write_double_attribute("lowVoltageLimit", vl.low_voltage_limit)?;
            ctx.writer.write_double_attribute("highVoltageLimit", vl.high_voltage_limit)?;
            ctx.writer
                .write_string_attribute("topologyKind", level.written_kind().as_str())
        },
        |ctx| {
            match level {
                TopologyLevel::NodeBreaker => write_node_breaker(ctx, vl)?,
                TopologyLevel::BusBreaker => write_bus_breaker(ctx, vl)?,
                TopologyLevel::BusBranch => write_bus_branch(ctx, vl)?,
            }
            write_injections(ctx, vl)
        },
    )
}

fn check_self_loop(version: IidmVersion, sw: &Switch) -> IidmResult<()> {
    if !sw.is_self_loop() {
        return Ok(());
    }
    if version.is_at_least(SELF_LOOP_REJECTED_SINCE) {
        return Err(IidmError::Validation(format!(
            "switch '{}' connects a node or bus to itself",
            sw.identity.id
        )));
    }
    tracing::warn!(switch = %sw.identity.id, %version, "switch connects a node or bus to itself");
    Ok(())
}

/// Equipment of `kind` in `vl` that passes the export filter, in writing order.
fn exported_in<'n>(ctx: &WriterContext<'n>, vl: &'n VoltageLevel, kind: &str) -> Vec<&'n Equipment> {
    let network = ctx.network;
    let mut items: Vec<&Equipment> = network
        .equipment_in(&vl.identity.id)
        .filter(|e| e.element() == kind)
        .filter(|e| ctx.filter.test_equipment(network, &ctx.views, e))
        .collect();
    if ctx.options.sorted {
        items.sort_by(|a, b| a.id().cmp(b.id()));
    }
    items
}

fn write_switch(ctx: &mut WriterContext<'_>, sw: &Switch, ends: &SwitchEnds) -> IidmResult<()> {
    write_identifiable(
        ctx,
        SWITCH,
        &sw.identity,
        |ctx| {
            ctx.writer.write_string_attribute("kind", sw.kind.as_str())?;
            ctx.writer.write_bool_attribute("retained", sw.retained)?;
            ctx.writer.write_bool_attribute("open", sw.open)?;
            match ends {
                SwitchEnds::Nodes(n1, n2) => {
                    ctx.writer.write_int_attribute("node1", *n1 as i32)?;
                    ctx.writer.write_int_attribute("node2", *n2 as i32)
                }
                SwitchEnds::Buses(b1, b2) => {
                    ctx.write_id("bus1", b1)?;
                    ctx.write_id("bus2", b2)
                }
            }
        },
        |_| Ok(()),
    )
}

fn write_node_breaker(ctx: &mut WriterContext<'_>, vl: &VoltageLevel) -> IidmResult<()> {
    let Topology::NodeBreaker(topology) = &vl.topology else {
        return Err(IidmError::Network(format!(
            "voltage level '{}' has no node/breaker topology",
            vl.identity.id
        )));
    };
    let network = ctx.network;
    let version = ctx.version;
    ctx.start(NODE_BREAKER_TOPOLOGY)?;
    if NODE_COUNT.is_supported(version) {
        let node_count = network.nodes_of(vl).last().map_or(0, |n| n + 1);
        ctx.writer.write_int_attribute(NODE_COUNT.name, node_count as i32)?;
    }
    for equipment in exported_in(ctx, vl, BUSBAR_SECTION) {
        if let Equipment::BusbarSection(bbs) = equipment {
            write_identifiable(
                ctx,
                BUSBAR_SECTION,
                &bbs.identity,
                |ctx| {
                    let node = bbs.terminal.node_number().ok_or_else(|| {
                        IidmError::Network(format!("busbar section '{}' has no node", bbs.identity.id))
                    })?;
                    ctx.writer.write_int_attribute("node", node as i32)
                },
                |_| Ok(()),
            )?;
        }
    }
    for equipment in exported_in(ctx, vl, SWITCH) {
        if let Equipment::Switch(sw) = equipment {
            check_self_loop(version, sw)?;
            write_switch(ctx, sw, &sw.ends)?;
        }
    }
    let mut connections: Vec<&InternalConnection> = topology.internal_connections.iter().collect();
    if ctx.options.sorted {
        connections.sort_by_key(|ic| (ic.node1.min(ic.node2), ic.node1.max(ic.node2)));
    }
    for ic in connections {
        ctx.start(INTERNAL_CONNECTION)?;
        ctx.writer.write_int_attribute("node1", ic.node1 as i32)?;
        ctx.writer.write_int_attribute("node2", ic.node2 as i32)?;
        ctx.end()?;
    }
    if CALCULATED_BUS.is_supported(version) && !topology.bus_voltages.is_empty() {
        let bus_view = network.bus_view(&vl.identity.id)?;
        for bus in &bus_view.buses {
            if bus.v.is_nan() && bus.angle.is_nan() {
                continue;
            }
            let passes = ctx
                .views
                .get(&vl.identity.id)
                .map_or(true, |view| ctx.filter.test_view_bus(view, bus));
            if !passes {
                continue;
            }
            ctx.start(BUS)?;
            ctx.writer.write_double_attribute("v", bus.v)?;
            ctx.writer.write_double_attribute("angle", bus.angle)?;
            ctx.writer.write_int_array_attribute("nodes", &bus.nodes)?;
            ctx.end()?;
        }
    }
    if !topology.fictitious_injections.is_empty() {
        FICTITIOUS_INJECTION.check(version)?;
        for (node, injection) in &topology.fictitious_injections {
            ctx.start(INJ)?;
            ctx.writer.write_int_attribute("node", *node as i32)?;
            ctx.writer.write_double_attribute_with_default("fictitiousP0", injection.p0, 0.0)?;
            ctx.writer.write_double_attribute_with_default("fictitiousQ0", injection.q0, 0.0)?;
            ctx.end()?;
        }
    }
    ctx.end()
}

fn write_bus_breaker(ctx: &mut WriterContext<'_>, vl: &VoltageLevel) -> IidmResult<()> {
    let network = ctx.network;
    let version = ctx.version;
    ctx.start(BUS_BREAKER_TOPOLOGY)?;
    match &vl.topology {
        Topology::BusBreaker(topology) => {
            let mut buses: Vec<&ConfiguredBus> = topology
                .buses
                .iter()
                .filter(|b| ctx.filter.test_bus(&b.identity.id))
                .collect();
            if ctx.options.sorted {
                buses.sort_by(|a, b| a.identity.id.cmp(&b.identity.id));
            }
            for bus in buses {
                write_identifiable(
                    ctx,
                    BUS,
                    &bus.identity,
                    |ctx| {
                        ctx.writer.write_double_attribute("v", bus.v)?;
                        ctx.writer.write_double_attribute("angle", bus.angle)
                    },
                    |_| Ok(()),
                )?;
            }
            for equipment in exported_in(ctx, vl, SWITCH) {
                if let Equipment::Switch(sw) = equipment {
                    check_self_loop(version, sw)?;
                    write_switch(ctx, sw, &sw.ends)?;
                }
            }
        }
        Topology::NodeBreaker(_) => {
            let view = ctx
                .projected_view(&vl.identity.id, TopologyLevel::BusBreaker)?
                .clone();
            for bus in &view.buses {
                if !ctx.filter.test_bus(&bus.id) {
                    continue;
                }
                ctx.start(BUS)?;
                ctx.write_id("id", &bus.id)?;
                ctx.writer.write_double_attribute("v", bus.v)?;
                ctx.writer.write_double_attribute("angle", bus.angle)?;
                ctx.end()?;
            }
            let mut switches: Vec<_> = view.switches.iter().collect();
            if ctx.options.sorted {
                switches.sort_by(|a, b| a.id.cmp(&b.id));
            }
            for projected in switches {
                if !(ctx.filter.test_bus(&projected.bus1) && ctx.filter.test_bus(&projected.bus2)) {
                    continue;
                }
                let Some(sw) = network.get::<Switch>(&projected.id) else {
                    continue;
                };
                let ends = SwitchEnds::Buses(projected.bus1.clone(), projected.bus2.clone());
                write_switch(ctx, sw, &ends)?;
            }
            for collapsed in &view.collapsed_switches {
                tracing::warn!(
                    switch = %collapsed,
                    voltage_level = %vl.identity.id,
                    "retained switch has both ends in the same bus, dropped"
                );
            }
        }
    }
    ctx.end()
}

fn write_bus_branch(ctx: &mut WriterContext<'_>, vl: &VoltageLevel) -> IidmResult<()> {
    let id = vl.identity.id.as_str();
    let buses = ctx.projected_view(id, TopologyLevel::BusBranch)?.buses.clone();
    ctx.start(BUS_BREAKER_TOPOLOGY)?;
    for bus in &buses {
        let passes = ctx
            .views
            .get(id)
            .map_or(true, |view| ctx.filter.test_view_bus(view, bus));
        if !passes {
            continue;
        }
        ctx.start(BUS)?;
        ctx.write_id("id", &bus.id)?;
        ctx.writer.write_double_attribute("v", bus.v)?;
        ctx.writer.write_double_attribute("angle", bus.angle)?;
        ctx.end()?;
    }
    ctx.end()
}

fn write_injections(ctx: &mut WriterContext<'_>, vl: &VoltageLevel) -> IidmResult<()> {
    for kind in injection::WRITE_ORDER {
        for equipment in exported_in(ctx, vl, kind) {
            if ctx.is_exported(equipment.id())
                || (kind == injection::DANGLING_LINE && tie_line::written_inline(ctx, equipment.id()))
            {
                continue;
            }
            injection::write(ctx, equipment)?;
        }
    }
    Ok(())
}

/// Read a `voltageLevel` of `substation_id` (or of the network when `None`).
pub(crate) fn read(ctx: &mut ReaderContext<'_>, substation_id: Option<&str>, network: &mut Network) -> IidmResult<()> {
    let identity = read_identity(ctx, VOLTAGE_LEVEL)?;
    let nominal_v = ctx.reader.read_double("nominalV")?;
    let kind: TopologyKind = read_required_enum(ctx.reader(), "topologyKind")?;
    let id = identity.id.clone();
    let mut vl = match kind {
        TopologyKind::NodeBreaker => VoltageLevel::node_breaker(id.clone(), substation_id, nominal_v),
        TopologyKind::BusBreaker => VoltageLevel::bus_breaker(id.clone(), substation_id, nominal_v),
    };
    vl.identity = identity;
    vl.low_voltage_limit = ctx.reader.read_double("lowVoltageLimit")?;
    vl.high_voltage_limit = ctx.reader.read_double("highVoltageLimit")?;
    network.add_voltage_level(vl)?;

    read_contained_elements(ctx, VOLTAGE_LEVEL, &id, network, |ctx, child, network| match child {
        NODE_BREAKER_TOPOLOGY => {
            expect_kind(&id, kind, TopologyKind::NodeBreaker)?;
            read_node_breaker(ctx, &id, network)?;
            Ok(true)
        }
        BUS_BREAKER_TOPOLOGY => {
            expect_kind(&id, kind, TopologyKind::BusBreaker)?;
            read_bus_breaker(ctx, &id, network)?;
            Ok(true)
        }
        other => injection::read(ctx, other, &id, network),
    })
}

fn expect_kind(id: &str, declared: TopologyKind, found: TopologyKind) -> IidmResult<()> {
    if declared == found {
        Ok(())
    } else {
        Err(IidmError::Parse(format!(
            "voltage level '{id}': topologyKind {} does not match a {} element",
            declared.as_str(),
            found.as_str()
        )))
    }
}

fn read_node(ctx: &ReaderContext<'_>, owner: &str, name: &str) -> IidmResult<u32> {
    let node = ctx.reader.read_required_int(name)?;
    u32::try_from(node).map_err(|_| IidmError::Parse(format!("'{owner}': negative {name} {node}")))
}

fn read_switch(ctx: &mut ReaderContext<'_>, voltage_level_id: &str, ends_as_nodes: bool) -> IidmResult<Switch> {
    let identity = read_identity(ctx, SWITCH)?;
    let ends = if ends_as_nodes {
        SwitchEnds::Nodes(
            read_node(ctx, &identity.id, "node1")?,
            read_node(ctx, &identity.id, "node2")?,
        )
    } else {
        SwitchEnds::Buses(ctx.read_id("bus1")?, ctx.read_id("bus2")?)
    };
    let mut sw = Switch {
        identity,
        voltage_level_id: voltage_level_id.to_string(),
        kind: read_enum::<SwitchKind>(ctx.reader(), "kind")?.unwrap_or(SwitchKind::Breaker),
        open: ctx.reader.read_bool_or("open", false)?,
        retained: ctx.reader.read_bool_or("retained", false)?,
        ends,
    };
    check_self_loop(ctx.version, &sw)?;
    read_leaf(ctx, SWITCH, &mut sw)?;
    Ok(sw)
}

fn with_node_breaker<'n>(network: &'n mut Network, voltage_level_id: &str) -> IidmResult<&'n mut iidm_core::NodeBreakerTopology> {
    match network.voltage_level_mut(voltage_level_id).map(|vl| &mut vl.topology) {
        Some(Topology::NodeBreaker(topology)) => Ok(topology),
        _ => Err(IidmError::Network(format!(
            "voltage level '{voltage_level_id}' has no node/breaker topology"
        ))),
    }
}

fn read_node_breaker(ctx: &mut ReaderContext<'_>, voltage_level_id: &str, network: &mut Network) -> IidmResult<()> {
    if let Some(node_count) = NODE_COUNT.read_int(ctx.reader(), ctx.version)? {
        tracing::info!(voltage_level = voltage_level_id, node_count, "nodeCount is ignored");
    }
    while let Some(child) = ctx.reader.next_child()? {
        match child.as_str() {
            BUSBAR_SECTION => {
                let identity = read_identity(ctx, BUSBAR_SECTION)?;
                let node = read_node(ctx, &identity.id, "node")?;
                let mut bbs = BusbarSection::new(identity.id.clone(), iidm_core::Terminal::node(voltage_level_id, node));
                bbs.identity = identity;
                read_leaf(ctx, BUSBAR_SECTION, &mut bbs)?;
                network.add_equipment(bbs)?;
            }
            SWITCH => {
                let sw = read_switch(ctx, voltage_level_id, true)?;
                network.add_equipment(sw)?;
            }
            INTERNAL_CONNECTION => {
                let node1 = read_node(ctx, voltage_level_id, "node1")?;
                let node2 = read_node(ctx, voltage_level_id, "node2")?;
                ctx.reader.read_end_node(INTERNAL_CONNECTION)?;
                with_node_breaker(network, voltage_level_id)?
                    .internal_connections
                    .push(InternalConnection { node1, node2 });
            }
            BUS => {
                CALCULATED_BUS.check(ctx.version)?;
                let voltage = BusVoltage {
                    v: ctx.reader.read_double("v")?,
                    angle: ctx.reader.read_double("angle")?,
                };
                let nodes = ctx.reader.read_int_array("nodes")?;
                ctx.reader.read_end_node(BUS)?;
                let vl_id = voltage_level_id.to_string();
                ctx.deferred.register(move |network| {
                    with_node_breaker(network, &vl_id)?.set_bus_voltage(&nodes, voltage);
                    Ok(())
                });
            }
            INJ => {
                FICTITIOUS_INJECTION.check(ctx.version)?;
                let node = read_node(ctx, voltage_level_id, "node")?;
                let injection = FictitiousInjection {
                    p0: ctx.reader.read_double_or("fictitiousP0", 0.0)?,
                    q0: ctx.reader.read_double_or("fictitiousQ0", 0.0)?,
                };
                ctx.reader.read_end_node(INJ)?;
                with_node_breaker(network, voltage_level_id)?
                    .fictitious_injections
                    .insert(node, injection);
            }
            _ => {
                return Err(IidmError::UnknownElement {
                    element: child,
                    parent: NODE_BREAKER_TOPOLOGY.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn read_bus_breaker(ctx: &mut ReaderContext<'_>, voltage_level_id: &str, network: &mut Network) -> IidmResult<()> {
    while let Some(child) = ctx.reader.next_child()? {
        match child.as_str() {
            BUS => {
                let identity = read_identity(ctx, BUS)?;
                let mut bus = ConfiguredBus::new(identity.id.clone())
                    .with_voltage(ctx.reader.read_double("v")?, ctx.reader.read_double("angle")?);
                bus.identity = identity;
                read_leaf(ctx, BUS, &mut bus)?;
                network.add_configured_bus(voltage_level_id, bus)?;
            }
            SWITCH => {
                let sw = read_switch(ctx, voltage_level_id, false)?;
                network.add_equipment(sw)?;
            }
            _ => {
                return Err(IidmError::UnknownElement {
                    element: child,
                    parent: BUS_BREAKER_TOPOLOGY.to_string(),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{reader_over, write_with};
    use crate::extensions::ExtensionRegistry;
    use crate::options::{ExportOptions, ImportOptions};
    use crate::tree::TreeDataFormat;
    use iidm_core::{fixtures, Generator, Substation};

    fn write_vl(network: &Network, id: &str, options: &ExportOptions) -> IidmResult<String> {
        let vl = network.voltage_level(id).expect("voltage level");
        write_with(network, options, |ctx| write(ctx, vl))
    }

    #[test]
    fn test_node_breaker_written_natively() {
        let network = fixtures::node_breaker().expect("fixture");
        let xml = write_vl(&network, "VL1", &ExportOptions::default()).expect("write");
        assert!(xml.contains(r#"topologyKind="NODE_BREAKER""#), "{xml}");
        assert!(xml.contains(r#"<iidm:busbarSection id="BBS1" node="0"/>"#));
        assert!(xml.contains(
            r#"<iidm:switch id="BK2" kind="BREAKER" retained="false" open="true" node1="1" node2="2"/>"#
        ));
        assert!(xml.contains(r#"<iidm:internalConnection node1="3" node2="4"/>"#));
        assert!(!xml.contains("nodeCount"));
        // generator before load
        assert!(xml.find(r#"id="G1""#) < xml.find(r#"id="LD1""#));
    }

    #[test]
    fn test_node_count_before_1_2() {
        let network = fixtures::node_breaker().expect("fixture");
        let options = ExportOptions::default().with_version(IidmVersion::V_1_1);
        let xml = write_vl(&network, "VL1", &options).expect("write");
        assert!(xml.contains(r#"nodeCount="5""#), "{xml}");
    }

    #[test]
    fn test_node_breaker_projected_on_bus_breaker() {
        let network = fixtures::node_breaker().expect("fixture");
        let options = ExportOptions::default().with_topology_level(TopologyLevel::BusBreaker);
        let xml = write_vl(&network, "VL1", &options).expect("write");
        assert!(xml.contains(r#"topologyKind="BUS_BREAKER""#), "{xml}");
        assert!(!xml.contains("busbarSection"));
        assert!(!xml.contains(r#"id="BK1""#));
        assert!(xml.contains(r#"id="COUPLER" kind="BREAKER" retained="true" open="false" bus1="VL1_0" bus2="VL1_2""#));
        assert!(xml.contains(r#"<iidm:bus id="VL1_1"/>"#));
    }

    #[test]
    fn test_bus_branch_has_no_switch() {
        let network = fixtures::two_substations().expect("fixture");
        let options = ExportOptions::default().with_topology_level(TopologyLevel::BusBranch);
        let xml = write_vl(&network, "VL1", &options).expect("write");
        assert!(!xml.contains("CPL"), "{xml}");
        // B1 and B2 merge through the closed coupler
        assert!(xml.contains(r#"<iidm:bus id="VL1_0""#));
        assert!(!xml.contains(r#"id="VL1_1""#));
        assert!(xml.contains(r#"bus="VL1_0" connectableBus="VL1_0""#));
    }

    #[test]
    fn test_self_loop_switch_by_version() {
        let mut network = fixtures::two_substations().expect("fixture");
        network
            .add_equipment(Switch::buses("LOOP", "VL1", "B1", "B1"))
            .expect("switch");
        let old = ExportOptions::default().with_version(IidmVersion::V_1_7);
        assert!(write_vl(&network, "VL1", &old).expect("write").contains(r#"id="LOOP""#));
        let err = write_vl(&network, "VL1", &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, IidmError::Validation(_)), "{err}");
    }

    #[test]
    fn test_read_node_breaker_voltage_level() {
        let xml = r#"<substation xmlns="urn:x">
            <voltageLevel id="VLX" nominalV="225" topologyKind="NODE_BREAKER">
              <nodeBreakerTopology>
                <busbarSection id="BBSX" node="0"/>
                <switch id="DX" kind="DISCONNECTOR" retained="false" open="false" node1="0" node2="1"/>
                <internalConnection node1="1" node2="2"/>
                <bus v="226.5" angle="-1.5" nodes="0,1,2"/>
                <inj node="2" fictitiousP0="3"/>
              </nodeBreakerTopology>
              <generator id="GX" energySource="HYDRO" voltageRegulatorOn="true" targetP="5" targetV="226" node="2"/>
            </voltageLevel></substation>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::CURRENT, &options, &registry);
        ctx.reader.next_child().expect("child").expect("voltage level");
        let mut network = Network::new("n", "test");
        network.add_substation(Substation::new("SX")).expect("substation");
        read(&mut ctx, Some("SX"), &mut network).expect("read");
        ctx.deferred.drain(&mut network).expect("drain");

        let vl = network.voltage_level("VLX").expect("VLX");
        let Topology::NodeBreaker(topology) = &vl.topology else {
            panic!("expected node/breaker");
        };
        assert_eq!(topology.internal_connections, vec![InternalConnection { node1: 1, node2: 2 }]);
        assert_eq!(topology.bus_voltages.get(&2).map(|bv| bv.v), Some(226.5));
        assert_eq!(topology.fictitious_injections.get(&2).map(|fi| fi.p0), Some(3.0));
        assert_eq!(network.get::<Switch>("DX").map(|sw| sw.kind), Some(SwitchKind::Disconnector));
        assert!(network.get::<Generator>("GX").is_some_and(|g| g.voltage_regulator_on));
    }

    #[test]
    fn test_fictitious_injection_before_1_8() {
        let xml = r#"<v xmlns="urn:x"><nodeBreakerTopology><inj node="2" fictitiousP0="3"/></nodeBreakerTopology></v>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::V_1_7, &options, &registry);
        ctx.reader.next_child().expect("child").expect("topology");
        let mut network = fixtures::node_breaker().expect("fixture");
        let err = read_node_breaker(&mut ctx, "VL1", &mut network).unwrap_err();
        assert!(err.to_string().contains("nodeBreakerTopology.inj is not supported"), "{err}");
    }
}
