//! Voltage levels and calculated topology views
//!
//! A voltage level stores its native topology. Two derived views are computed on demand:
//!
//! - **bus/breaker view**: node/breaker nodes merged through internal connections and
//!   closed non-retained switches; retained switches stay as explicit edges. A bus/breaker
//!   voltage level is its own bus/breaker view.
//! - **bus view**: everything merged through closed switches; only buses reached by a
//!   terminal are kept.
//!
//! Calculated buses are named `<voltage level id>_<k>` with `k` assigned in ascending
//! order of their smallest node (or first configured bus).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::{
    Connection, Equipment, Identifiable, Identity, IidmError, IidmResult, Network, Switch,
    SwitchEnds, SwitchKind, Terminal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TopologyKind {
    BusBreaker,
    NodeBreaker,
}

impl TopologyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::NodeBreaker => "NODE_BREAKER",
            TopologyKind::BusBreaker => "BUS_BREAKER",
        }
    }
}

impl FromStr for TopologyKind {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NODE_BREAKER" => Ok(TopologyKind::NodeBreaker),
            "BUS_BREAKER" => Ok(TopologyKind::BusBreaker),
            other => Err(IidmError::Parse(format!("invalid topology kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalConnection {
    pub node1: u32,
    pub node2: u32,
}

/// Fictitious active/reactive injection attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FictitiousInjection {
    pub p0: f64,
    pub q0: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusVoltage {
    pub v: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBreakerTopology {
    pub internal_connections: Vec<InternalConnection>,
    pub fictitious_injections: BTreeMap<u32, FictitiousInjection>,
    /// Voltage state carried by the calculated buses, keyed by node
    pub bus_voltages: BTreeMap<u32, BusVoltage>,
}

impl NodeBreakerTopology {
    /// Record `voltage` on every node of a calculated bus.
    pub fn set_bus_voltage(&mut self, nodes: &[u32], voltage: BusVoltage) {
        for node in nodes {
            self.bus_voltages.insert(*node, voltage);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredBus {
    pub identity: Identity,
    pub v: f64,
    pub angle: f64,
}

impl ConfiguredBus {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(id),
            v: f64::NAN,
            angle: f64::NAN,
        }
    }

    pub fn with_voltage(mut self, v: f64, angle: f64) -> Self {
        self.v = v;
        self.angle = angle;
        self
    }
}

impl Identifiable for ConfiguredBus {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusBreakerTopology {
    pub buses: Vec<ConfiguredBus>,
}

impl BusBreakerTopology {
    pub fn contains_bus(&self, id: &str) -> bool {
        self.buses.iter().any(|b| b.identity.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Topology {
    NodeBreaker(NodeBreakerTopology),
    BusBreaker(BusBreakerTopology),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub identity: Identity,
    /// `None` for voltage levels outside any substation
    pub substation_id: Option<String>,
    pub nominal_v: f64,
    pub low_voltage_limit: f64,
    pub high_voltage_limit: f64,
    pub topology: Topology,
}

impl VoltageLevel {
    pub fn node_breaker(id: impl Into<String>, substation_id: Option<&str>, nominal_v: f64) -> Self {
        Self::with_topology(id, substation_id, nominal_v, Topology::NodeBreaker(NodeBreakerTopology::default()))
    }

    pub fn bus_breaker(id: impl Into<String>, substation_id: Option<&str>, nominal_v: f64) -> Self {
        Self::with_topology(id, substation_id, nominal_v, Topology::BusBreaker(BusBreakerTopology::default()))
    }

    fn with_topology(id: impl Into<String>, substation_id: Option<&str>, nominal_v: f64, topology: Topology) -> Self {
        Self {
            identity: Identity::new(id),
            substation_id: substation_id.map(str::to_string),
            nominal_v,
            low_voltage_limit: f64::NAN,
            high_voltage_limit: f64::NAN,
            topology,
        }
    }

    pub fn kind(&self) -> TopologyKind {
        match self.topology {
            Topology::NodeBreaker(_) => TopologyKind::NodeBreaker,
            Topology::BusBreaker(_) => TopologyKind::BusBreaker,
        }
    }
}

impl Identifiable for VoltageLevel {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

/// Bus of a calculated view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedBus {
    pub id: String,
    /// Merged nodes (node/breaker voltage levels), ascending
    pub nodes: Vec<u32>,
    /// Merged configured buses (bus/breaker voltage levels)
    pub configured_buses: Vec<String>,
    pub v: f64,
    pub angle: f64,
}

/// Switch kept as an edge between two view buses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSwitch {
    pub id: String,
    pub kind: SwitchKind,
    pub open: bool,
    pub bus1: String,
    pub bus2: String,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyView {
    pub voltage_level_id: String,
    pub buses: Vec<CalculatedBus>,
    pub switches: Vec<ViewSwitch>,
    /// Retained switches whose ends fell into the same bus
    pub collapsed_switches: Vec<String>,
    by_node: HashMap<u32, usize>,
    by_configured_bus: HashMap<String, usize>,
}

impl TopologyView {
    pub fn bus(&self, id: &str) -> Option<&CalculatedBus> {
        self.buses.iter().find(|b| b.id == id)
    }

    pub fn bus_of_node(&self, node: u32) -> Option<&CalculatedBus> {
        self.by_node.get(&node).map(|&i| &self.buses[i])
    }

    pub fn bus_of_configured(&self, bus_id: &str) -> Option<&CalculatedBus> {
        self.by_configured_bus.get(bus_id).map(|&i| &self.buses[i])
    }

    /// Bus the terminal could be connected to.
    pub fn connectable_bus(&self, terminal: &Terminal) -> Option<&CalculatedBus> {
        match &terminal.connection {
            Connection::Node(node) => self.bus_of_node(*node),
            Connection::Bus { connectable_bus, .. } => self.bus_of_configured(connectable_bus),
        }
    }

    /// Bus the terminal is connected to, `None` when disconnected.
    pub fn connected_bus(&self, terminal: &Terminal) -> Option<&CalculatedBus> {
        match &terminal.connection {
            Connection::Node(node) => self.bus_of_node(*node),
            Connection::Bus { bus, .. } => bus.as_deref().and_then(|b| self.bus_of_configured(b)),
        }
    }

    fn from_components(
        voltage_level_id: &str,
        components: Vec<(Vec<u32>, Vec<String>)>,
        voltage: impl Fn(&[u32], &[String]) -> Option<(f64, f64)>,
    ) -> Self {
        let mut view = TopologyView {
            voltage_level_id: voltage_level_id.to_string(),
            ..TopologyView::default()
        };
        for (k, (nodes, configured)) in components.into_iter().enumerate() {
            let (v, angle) = voltage(&nodes, &configured).unwrap_or((f64::NAN, f64::NAN));
            for node in &nodes {
                view.by_node.insert(*node, k);
            }
            for bus in &configured {
                view.by_configured_bus.insert(bus.clone(), k);
            }
            view.buses.push(CalculatedBus {
                id: format!("{voltage_level_id}_{k}"),
                nodes,
                configured_buses: configured,
                v,
                angle,
            });
        }
        view
    }
}

/// Dense index over the sparse node numbers of a node/breaker voltage level.
struct NodeIndex {
    nodes: Vec<u32>,
    position: HashMap<u32, usize>,
}

impl NodeIndex {
    fn new(nodes: BTreeSet<u32>) -> Self {
        let nodes: Vec<u32> = nodes.into_iter().collect();
        let position = nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        Self { nodes, position }
    }

    fn union(&self, uf: &mut UnionFind<usize>, a: u32, b: u32) {
        if let (Some(&ia), Some(&ib)) = (self.position.get(&a), self.position.get(&b)) {
            uf.union(ia, ib);
        }
    }

    /// Components in ascending order of their smallest node.
    fn components(&self, uf: &UnionFind<usize>, keep: impl Fn(u32) -> bool) -> Vec<Vec<u32>> {
        let mut groups: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            groups.entry(uf.find(i)).or_default().push(*node);
        }
        let mut components: Vec<Vec<u32>> = groups
            .into_values()
            .filter(|nodes| nodes.iter().any(|n| keep(*n)))
            .collect();
        components.sort_by_key(|nodes| nodes[0]);
        components
    }
}

impl Network {
    fn switches_in<'a>(&'a self, voltage_level_id: &'a str) -> impl Iterator<Item = &'a Switch> {
        self.equipment_in(voltage_level_id).filter_map(|e| match e {
            Equipment::Switch(sw) => Some(sw),
            _ => None,
        })
    }

    /// Every node referenced in a node/breaker voltage level.
    pub fn nodes_of(&self, voltage_level: &VoltageLevel) -> BTreeSet<u32> {
        let mut nodes = BTreeSet::new();
        let id = voltage_level.identity.id.as_str();
        nodes.extend(self.terminals_in(id).filter_map(Terminal::node_number));
        for sw in self.switches_in(id) {
            if let SwitchEnds::Nodes(n1, n2) = sw.ends {
                nodes.insert(n1);
                nodes.insert(n2);
            }
        }
        if let Topology::NodeBreaker(topology) = &voltage_level.topology {
            for ic in &topology.internal_connections {
                nodes.insert(ic.node1);
                nodes.insert(ic.node2);
            }
            nodes.extend(topology.fictitious_injections.keys().copied());
            nodes.extend(topology.bus_voltages.keys().copied());
        }
        nodes
    }

    fn view_voltage_level(&self, voltage_level_id: &str) -> IidmResult<&VoltageLevel> {
        self.voltage_level(voltage_level_id).ok_or_else(|| {
            IidmError::Network(format!("voltage level '{voltage_level_id}' not found"))
        })
    }

    /// Bus/breaker view of one voltage level.
    pub fn bus_breaker_view(&self, voltage_level_id: &str) -> IidmResult<TopologyView> {
        let vl = self.view_voltage_level(voltage_level_id)?;
        match &vl.topology {
            Topology::BusBreaker(topology) => {
                let mut view = TopologyView {
                    voltage_level_id: voltage_level_id.to_string(),
                    ..TopologyView::default()
                };
                for (k, bus) in topology.buses.iter().enumerate() {
                    view.by_configured_bus.insert(bus.identity.id.clone(), k);
                    view.buses.push(CalculatedBus {
                        id: bus.identity.id.clone(),
                        nodes: Vec::new(),
                        configured_buses: vec![bus.identity.id.clone()],
                        v: bus.v,
                        angle: bus.angle,
                    });
                }
                for sw in self.switches_in(voltage_level_id) {
                    if let SwitchEnds::Buses(b1, b2) = &sw.ends {
                        view.switches.push(ViewSwitch {
                            id: sw.identity.id.clone(),
                            kind: sw.kind,
                            open: sw.open,
                            bus1: b1.clone(),
                            bus2: b2.clone(),
                        });
                    }
                }
                Ok(view)
            }
            Topology::NodeBreaker(topology) => {
                let index = NodeIndex::new(self.nodes_of(vl));
                let mut uf = UnionFind::new(index.nodes.len());
                for ic in &topology.internal_connections {
                    index.union(&mut uf, ic.node1, ic.node2);
                }
                let mut retained = Vec::new();
                for sw in self.switches_in(voltage_level_id) {
                    if let SwitchEnds::Nodes(n1, n2) = sw.ends {
                        if sw.retained {
                            retained.push((sw, n1, n2));
                        } else if !sw.open {
                            index.union(&mut uf, n1, n2);
                        }
                    }
                }
                let components = index
                    .components(&uf, |_| true)
                    .into_iter()
                    .map(|nodes| (nodes, Vec::new()))
                    .collect();
                let mut view = TopologyView::from_components(voltage_level_id, components, |nodes, _| {
                    node_voltage(topology, nodes)
                });
                for (sw, n1, n2) in retained {
                    let bus1 = view.bus_of_node(n1).map(|b| b.id.clone());
                    let bus2 = view.bus_of_node(n2).map(|b| b.id.clone());
                    match (bus1, bus2) {
                        (Some(bus1), Some(bus2)) if bus1 != bus2 => view.switches.push(ViewSwitch {
                            id: sw.identity.id.clone(),
                            kind: sw.kind,
                            open: sw.open,
                            bus1,
                            bus2,
                        }),
                        _ => view.collapsed_switches.push(sw.identity.id.clone()),
                    }
                }
                Ok(view)
            }
        }
    }

    /// Bus view of one voltage level.
    pub fn bus_view(&self, voltage_level_id: &str) -> IidmResult<TopologyView> {
        let vl = self.view_voltage_level(voltage_level_id)?;
        match &vl.topology {
            Topology::NodeBreaker(topology) => {
                let index = NodeIndex::new(self.nodes_of(vl));
                let mut uf = UnionFind::new(index.nodes.len());
                for ic in &topology.internal_connections {
                    index.union(&mut uf, ic.node1, ic.node2);
                }
                for sw in self.switches_in(voltage_level_id) {
                    if let (SwitchEnds::Nodes(n1, n2), false) = (&sw.ends, sw.open) {
                        index.union(&mut uf, *n1, *n2);
                    }
                }
                let terminal_nodes: BTreeSet<u32> = self
                    .terminals_in(voltage_level_id)
                    .filter_map(Terminal::node_number)
                    .collect();
                let components = index
                    .components(&uf, |n| terminal_nodes.contains(&n))
                    .into_iter()
                    .map(|nodes| (nodes, Vec::new()))
                    .collect();
                Ok(TopologyView::from_components(voltage_level_id, components, |nodes, _| {
                    node_voltage(topology, nodes)
                }))
            }
            Topology::BusBreaker(topology) => {
                let position: HashMap<&str, usize> = topology
                    .buses
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (b.identity.id.as_str(), i))
                    .collect();
                let mut uf = UnionFind::new(topology.buses.len());
                for sw in self.switches_in(voltage_level_id) {
                    if let (SwitchEnds::Buses(b1, b2), false) = (&sw.ends, sw.open) {
                        if let (Some(&i1), Some(&i2)) = (position.get(b1.as_str()), position.get(b2.as_str())) {
                            uf.union(i1, i2);
                        }
                    }
                }
                let used: BTreeSet<&str> = self
                    .terminals_in(voltage_level_id)
                    .filter_map(|t| match &t.connection {
                        Connection::Bus { connectable_bus, .. } => Some(connectable_bus.as_str()),
                        Connection::Node(_) => None,
                    })
                    .collect();
                let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
                for i in 0..topology.buses.len() {
                    groups.entry(uf.find(i)).or_default().push(i);
                }
                let mut members: Vec<Vec<usize>> = groups
                    .into_values()
                    .filter(|g| g.iter().any(|&i| used.contains(topology.buses[i].identity.id.as_str())))
                    .collect();
                members.sort_by_key(|g| g[0]);
                let components = members
                    .into_iter()
                    .map(|g| {
                        let ids = g.iter().map(|&i| topology.buses[i].identity.id.clone()).collect();
                        (Vec::new(), ids)
                    })
                    .collect();
                Ok(TopologyView::from_components(voltage_level_id, components, |_, configured| {
                    configured.iter().find_map(|id| {
                        topology
                            .buses
                            .iter()
                            .find(|b| &b.identity.id == id && !b.v.is_nan())
                            .map(|b| (b.v, b.angle))
                    })
                }))
            }
        }
    }
}

fn node_voltage(topology: &NodeBreakerTopology, nodes: &[u32]) -> Option<(f64, f64)> {
    nodes
        .iter()
        .find_map(|n| topology.bus_voltages.get(n))
        .map(|bv| (bv.v, bv.angle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_node_breaker_bus_breaker_view() {
        let network = fixtures::node_breaker().expect("fixture");
        let view = network.bus_breaker_view("VL1").expect("view");
        // nodes 0-1 via closed breaker, 2 isolated behind an open breaker, 3-4 by internal connection
        let bus0 = view.bus_of_node(0).expect("bus of node 0");
        assert_eq!(bus0.id, "VL1_0");
        assert_eq!(bus0.nodes, vec![0, 1]);
        assert_eq!(view.bus_of_node(3).map(|b| &b.id), view.bus_of_node(4).map(|b| &b.id));
        // retained coupler kept as an edge
        assert_eq!(view.switches.len(), 1);
        assert_eq!(view.switches[0].id, "COUPLER");
    }

    #[test]
    fn test_node_breaker_bus_view_merges_retained() {
        let network = fixtures::node_breaker().expect("fixture");
        let bb = network.bus_breaker_view("VL1").expect("bus breaker view");
        let bus = network.bus_view("VL1").expect("bus view");
        assert!(bus.buses.len() < bb.buses.len());
        let load_bus = bus.bus_of_node(4).expect("load bus");
        assert!(load_bus.nodes.contains(&0));
    }

    #[test]
    fn test_bus_breaker_views() {
        let network = fixtures::two_substations().expect("fixture");
        let bb = network.bus_breaker_view("VL1").expect("view");
        assert_eq!(bb.buses.len(), 2);
        assert_eq!(bb.buses[0].id, "B1");
        let bus = network.bus_view("VL1").expect("view");
        // coupler B1-B2 is closed
        assert_eq!(bus.buses.len(), 1);
        assert_eq!(bus.buses[0].configured_buses, vec!["B1".to_string(), "B2".to_string()]);
        assert_eq!(bus.buses[0].id, "VL1_0");
    }

    #[test]
    fn test_calculated_bus_voltage_from_nodes() {
        let mut network = fixtures::node_breaker().expect("fixture");
        if let Some(vl) = network.voltage_level_mut("VL1") {
            if let Topology::NodeBreaker(topology) = &mut vl.topology {
                topology.set_bus_voltage(&[0, 1], BusVoltage { v: 402.0, angle: 0.5 });
            }
        }
        let view = network.bus_breaker_view("VL1").expect("view");
        let bus = view.bus_of_node(1).expect("bus");
        assert_eq!(bus.v, 402.0);
        assert_eq!(bus.angle, 0.5);
    }
}
