//! Terminal attributes shared by every connectable
//!
//! A terminal is written as attributes of its owner, suffixed by the side index on
//! branches (`node1`, `bus2`, `connectableBus3`, ...). Which attributes appear depends on
//! the topology level the owning voltage level is exported at: a node number at
//! node/breaker level, otherwise the `bus` it is connected to (absent when disconnected)
//! and the `connectableBus` it could connect to, both taken from the calculated view the
//! level projects onto.

use iidm_core::{Connection, IidmError, IidmResult, Side, Terminal, TerminalRef};

use crate::context::{ReaderContext, WriterContext};
use crate::options::TopologyLevel;
use crate::tree::read_enum;

pub(crate) fn write_node_or_bus(ctx: &mut WriterContext<'_>, owner: &str, suffix: &str, terminal: &Terminal) -> IidmResult<()> {
    let level = ctx.topology_level(&terminal.voltage_level_id)?;
    if level == TopologyLevel::NodeBreaker {
        let node = terminal.node_number().ok_or_else(|| {
            IidmError::Network(format!("'{owner}': terminal{suffix} is not connected to a node"))
        })?;
        return ctx.writer.write_int_attribute(&format!("node{suffix}"), node as i32);
    }
    let view = ctx.projected_view(&terminal.voltage_level_id, level)?;
    let connectable = view
        .connectable_bus(terminal)
        .map(|b| b.id.clone())
        .ok_or_else(|| {
            IidmError::Network(format!(
                "'{owner}': terminal{suffix} has no bus in the {} view of '{}'",
                level.as_str(),
                terminal.voltage_level_id
            ))
        })?;
    let connected = view.connected_bus(terminal).map(|b| b.id.clone());
    ctx.write_optional_id(&format!("bus{suffix}"), connected.as_deref())?;
    ctx.write_id(&format!("connectableBus{suffix}"), &connectable)
}

pub(crate) fn write_pq(ctx: &mut WriterContext<'_>, suffix: &str, terminal: &Terminal) -> IidmResult<()> {
    if !ctx.options.with_branch_state_variables {
        return Ok(());
    }
    ctx.writer.write_double_attribute(&format!("p{suffix}"), terminal.p)?;
    ctx.writer.write_double_attribute(&format!("q{suffix}"), terminal.q)
}

pub(crate) fn write_voltage_level_ref(ctx: &mut WriterContext<'_>, suffix: &str, terminal: &Terminal) -> IidmResult<()> {
    ctx.write_id(&format!("voltageLevelId{suffix}"), &terminal.voltage_level_id)
}

/// Complete terminal of a branch side: voltage level, connection and flow.
pub(crate) fn write_branch_terminal(ctx: &mut WriterContext<'_>, owner: &str, side: Side, terminal: &Terminal) -> IidmResult<()> {
    let suffix = side.index().to_string();
    write_voltage_level_ref(ctx, &suffix, terminal)?;
    write_node_or_bus(ctx, owner, &suffix, terminal)?;
    write_pq(ctx, &suffix, terminal)
}

pub(crate) fn read_node_or_bus(
    ctx: &ReaderContext<'_>,
    owner: &str,
    suffix: &str,
    voltage_level_id: String,
) -> IidmResult<Terminal> {
    if let Some(node) = ctx.reader.read_int(&format!("node{suffix}"))? {
        let node = u32::try_from(node)
            .map_err(|_| IidmError::Parse(format!("'{owner}': negative node{suffix} {node}")))?;
        return Ok(Terminal::node(voltage_level_id, node));
    }
    let bus = ctx.read_optional_id(&format!("bus{suffix}"))?;
    let connectable = ctx.read_optional_id(&format!("connectableBus{suffix}"))?;
    let connection = match (bus, connectable) {
        (bus, Some(connectable_bus)) => Connection::Bus { bus, connectable_bus },
        (Some(bus), None) => Connection::Bus {
            bus: Some(bus.clone()),
            connectable_bus: bus,
        },
        (None, None) => {
            return Err(IidmError::Parse(format!(
                "'{owner}': terminal{suffix} has neither node nor bus"
            )))
        }
    };
    Ok(Terminal {
        voltage_level_id,
        connection,
        p: f64::NAN,
        q: f64::NAN,
    })
}

pub(crate) fn read_pq(ctx: &ReaderContext<'_>, suffix: &str, terminal: Terminal) -> IidmResult<Terminal> {
    let p = ctx.reader.read_double(&format!("p{suffix}"))?;
    let q = ctx.reader.read_double(&format!("q{suffix}"))?;
    Ok(terminal.with_flow(p, q))
}

pub(crate) fn read_branch_terminal(ctx: &ReaderContext<'_>, owner: &str, side: Side) -> IidmResult<Terminal> {
    let suffix = side.index().to_string();
    let voltage_level_id = ctx.read_id(&format!("voltageLevelId{suffix}"))?;
    let terminal = read_node_or_bus(ctx, owner, &suffix, voltage_level_id)?;
    read_pq(ctx, &suffix, terminal)
}

/// Injection terminal: the voltage level is the enclosing element.
pub(crate) fn read_injection_terminal(ctx: &ReaderContext<'_>, owner: &str, voltage_level_id: &str) -> IidmResult<Terminal> {
    let terminal = read_node_or_bus(ctx, owner, "", voltage_level_id.to_string())?;
    read_pq(ctx, "", terminal)
}

pub(crate) fn write_injection_terminal(ctx: &mut WriterContext<'_>, owner: &str, terminal: &Terminal) -> IidmResult<()> {
    write_node_or_bus(ctx, owner, "", terminal)?;
    write_pq(ctx, "", terminal)
}

/// Reference to the terminal of another equipment (`regulatingTerminal`, `terminalRef`).
/// The referenced equipment must be part of the export.
pub(crate) fn write_terminal_ref(ctx: &mut WriterContext<'_>, element: &str, owner: &str, reference: &TerminalRef) -> IidmResult<()> {
    if !ctx.test_equipment_id(&reference.id) {
        return Err(IidmError::Validation(format!(
            "'{owner}': {element} '{}' is not part of the export",
            reference.id
        )));
    }
    ctx.start(element)?;
    ctx.write_id("id", &reference.id)?;
    if let Some(side) = reference.side {
        ctx.writer.write_string_attribute("side", side.as_str())?;
    }
    ctx.end()
}

/// Read a terminal reference and queue the check that it resolves once every equipment
/// is known.
pub(crate) fn read_terminal_ref(ctx: &mut ReaderContext<'_>, element: &str, owner: &str) -> IidmResult<TerminalRef> {
    let id = ctx.read_id("id")?;
    let side: Option<Side> = read_enum(ctx.reader(), "side")?;
    ctx.reader.read_end_node(element)?;
    let reference = TerminalRef::new(id, side);

    let pending = reference.clone();
    let owner = owner.to_string();
    ctx.deferred.register(move |network| {
        if network.terminal(&pending.id, pending.side).is_none() {
            tracing::warn!(owner = %owner, target = %pending.id, "unresolved terminal reference");
            return Err(IidmError::DanglingReference(pending.id));
        }
        Ok(())
    });
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{reader_over, write_with};
    use crate::extensions::ExtensionRegistry;
    use crate::options::{ExportOptions, ImportOptions};
    use crate::tree::TreeDataFormat;
    use crate::version::IidmVersion;
    use iidm_core::{fixtures, Generator, Network};

    #[test]
    fn test_node_breaker_projected_to_bus_breaker() {
        let network = fixtures::node_breaker().expect("fixture");
        let g1 = network.get::<Generator>("G1").expect("G1").terminal.clone();
        let options = ExportOptions::default().with_topology_level(TopologyLevel::BusBreaker);
        let xml = write_with(&network, &options, |ctx| write_injection_terminal(ctx, "G1", &g1)).expect("write");
        // BK2 is open, so G1 sits alone on its own calculated bus
        assert!(xml.contains(r#"bus="VL1_"#), "{xml}");
        assert!(xml.contains(r#"connectableBus="VL1_"#));
        assert!(!xml.contains("node="));

        let native = write_with(&network, &ExportOptions::default(), |ctx| write_injection_terminal(ctx, "G1", &g1))
            .expect("write");
        assert!(native.contains(r#"node="2""#));
    }

    #[test]
    fn test_disconnected_terminal_has_no_bus() {
        let network = fixtures::two_substations().expect("fixture");
        let terminal = Terminal::disconnected_bus("VL1", "B2");
        let xml = write_with(&network, &ExportOptions::default(), |ctx| write_injection_terminal(ctx, "X", &terminal))
            .expect("write");
        assert!(xml.contains(r#"connectableBus="B2""#));
        assert!(!xml.contains(r#" bus="#));
    }

    #[test]
    fn test_read_branch_terminal() {
        let xml = r#"<line xmlns="urn:x" voltageLevelId2="VL2" connectableBus2="B3" p2="12.5"/>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::CURRENT, &options, &registry);
        let terminal = read_branch_terminal(&ctx, "L", Side::Two).expect("terminal");
        assert_eq!(terminal.connection, Terminal::disconnected_bus("VL2", "B3").connection);
        assert_eq!(terminal.voltage_level_id, "VL2");
        assert_eq!(terminal.p, 12.5);
        assert!(terminal.q.is_nan());
    }

    #[test]
    fn test_unresolved_terminal_ref_fails_on_drain() {
        let xml = r#"<regulatingTerminal xmlns="urn:x" id="NOPE" side="TWO"/>"#;
        let options = ImportOptions::default();
        let registry = ExtensionRegistry::default();
        let mut ctx = reader_over(xml, TreeDataFormat::Xml, IidmVersion::CURRENT, &options, &registry);
        let reference = read_terminal_ref(&mut ctx, "regulatingTerminal", "G").expect("read");
        assert_eq!(reference.side, Some(Side::Two));
        let mut network = Network::new("n", "test");
        assert!(matches!(
            ctx.deferred.drain(&mut network),
            Err(IidmError::DanglingReference(id)) if id == "NOPE"
        ));
    }
}
