use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};

use crate::{Equipment, IidmResult, Network, Terminal, TopologyView};

/// Connectivity summary over the bus/breaker view of a whole network.
#[derive(Debug, Default)]
pub struct ComponentAnalysis {
    /// Bus ids per component, largest component first
    pub components: Vec<HashSet<String>>,
}

impl ComponentAnalysis {
    pub fn main(&self) -> Option<&HashSet<String>> {
        self.components.first()
    }

    pub fn component_of(&self, bus_id: &str) -> Option<usize> {
        self.components.iter().position(|c| c.contains(bus_id))
    }
}

/// Bus/breaker views of every voltage level, keyed by voltage level id.
pub fn bus_breaker_views(network: &Network) -> IidmResult<HashMap<String, TopologyView>> {
    network
        .voltage_levels()
        .iter()
        .map(|vl| {
            network
                .bus_breaker_view(&vl.identity.id)
                .map(|view| (vl.identity.id.clone(), view))
        })
        .collect()
}

/// Bus a connected terminal sits on in the bus/breaker view.
pub fn terminal_bus<'a>(views: &'a HashMap<String, TopologyView>, terminal: &Terminal) -> Option<&'a str> {
    views
        .get(&terminal.voltage_level_id)
        .and_then(|view| view.connected_bus(terminal))
        .map(|bus| bus.id.as_str())
}

/// Label connected components (breadth-first search) over buses linked by closed switches,
/// branches with both ends connected, tie lines and HVDC links.
pub fn connected_components(network: &Network) -> IidmResult<ComponentAnalysis> {
    let views = bus_breaker_views(network)?;
    let mut graph: UnGraph<String, ()> = UnGraph::new_undirected();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    for vl in network.voltage_levels() {
        if let Some(view) = views.get(&vl.identity.id) {
            for bus in &view.buses {
                let idx = graph.add_node(bus.id.clone());
                nodes.insert(bus.id.clone(), idx);
            }
        }
    }

    let mut link = |a: Option<&str>, b: Option<&str>| {
        if let (Some(a), Some(b)) = (a.and_then(|a| nodes.get(a)), b.and_then(|b| nodes.get(b))) {
            graph.add_edge(*a, *b, ());
        }
    };

    for view in views.values() {
        for sw in view.switches.iter().filter(|sw| !sw.open) {
            link(Some(&sw.bus1), Some(&sw.bus2));
        }
    }
    for equipment in network.equipment() {
        match equipment {
            Equipment::Line(_) | Equipment::TwoWindingsTransformer(_) | Equipment::ThreeWindingsTransformer(_) => {
                let terminals = equipment.terminals();
                for pair in terminals.windows(2) {
                    link(terminal_bus(&views, pair[0]), terminal_bus(&views, pair[1]));
                }
            }
            Equipment::TieLine(tl) => {
                let t1 = network.terminal(&tl.dangling_line1, None);
                let t2 = network.terminal(&tl.dangling_line2, None);
                if let (Some(t1), Some(t2)) = (t1, t2) {
                    link(terminal_bus(&views, t1), terminal_bus(&views, t2));
                }
            }
            Equipment::HvdcLine(hvdc) => {
                let t1 = network.terminal(&hvdc.converter_station1, None);
                let t2 = network.terminal(&hvdc.converter_station2, None);
                if let (Some(t1), Some(t2)) = (t1, t2) {
                    link(terminal_bus(&views, t1), terminal_bus(&views, t2));
                }
            }
            _ => {}
        }
    }

    let mut visited = HashSet::new();
    let mut components = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = HashSet::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.insert(graph[node].clone());
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        components.push(members);
    }
    // stable sort keeps discovery order among equally sized components
    components.sort_by(|a, b| b.len().cmp(&a.len()));
    Ok(ComponentAnalysis { components })
}

/// Buses of the largest connected component.
pub fn main_connected_component(network: &Network) -> IidmResult<HashSet<String>> {
    let mut analysis = connected_components(network)?;
    if analysis.components.is_empty() {
        return Ok(HashSet::new());
    }
    Ok(analysis.components.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_island_is_not_main_component() {
        let network = fixtures::two_substations().expect("fixture");
        let analysis = connected_components(&network).expect("components");
        assert_eq!(analysis.components.len(), 2);
        let main = analysis.main().expect("main component");
        assert!(main.contains("B1"));
        assert!(main.contains("B4"));
        assert!(!main.contains("B5"));
        assert_eq!(analysis.component_of("B5"), Some(1));
    }

    #[test]
    fn test_open_coupler_splits_component() {
        let mut network = fixtures::two_substations().expect("fixture");
        if let Some(sw) = network.get_mut::<crate::Switch>("CPL") {
            sw.open = true;
        }
        let main = main_connected_component(&network).expect("main");
        // B2 only holds a load once the coupler is open
        assert!(!main.contains("B2"));
        assert!(main.contains("B1"));
    }

    #[test]
    fn test_node_breaker_component() {
        let network = fixtures::node_breaker().expect("fixture");
        let main = main_connected_component(&network).expect("main");
        assert!(main.contains("VL1_0"));
        assert!(main.contains("VL2_0"));
    }
}
