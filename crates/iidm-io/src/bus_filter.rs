//! Retained-bus predicate for "main connected component only" exports.
//!
//! The retained set starts from the buses of the main connected component (bus/breaker
//! view) and is then closed over equipment straddling its boundary: the far bus of a line,
//! two-winding transformer, tie line or HVDC link whose other end is retained is retained
//! too, and every leg bus of a three-winding transformer is retained as soon as one leg is.
//! The closure runs to a fixed point so the document never references a bus it does not
//! contain.

use std::collections::{HashMap, HashSet};

use iidm_core::graph_utils::main_connected_component;
use iidm_core::{CalculatedBus, Equipment, IidmResult, Network, SwitchEnds, Terminal, TopologyView};

#[derive(Debug, Clone, Default)]
pub struct BusFilter {
    /// `None` keeps everything
    retained: Option<HashSet<String>>,
}

impl BusFilter {
    /// Filter that retains every bus and equipment.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn main_connected_component(network: &Network, views: &HashMap<String, TopologyView>) -> IidmResult<Self> {
        let mut retained = main_connected_component(network)?;
        let seed = retained.len();

        loop {
            let mut added = Vec::new();
            for equipment in network.equipment() {
                let buses = boundary_buses(network, views, equipment);
                if buses.len() < 2 {
                    continue;
                }
                if buses.iter().any(|b| retained.contains(*b)) {
                    added.extend(
                        buses
                            .into_iter()
                            .filter(|b| !retained.contains(*b))
                            .map(str::to_string),
                    );
                }
            }
            if added.is_empty() {
                break;
            }
            retained.extend(added);
        }

        tracing::debug!(
            main = seed,
            retained = retained.len(),
            "main connected component filter built"
        );
        Ok(Self {
            retained: Some(retained),
        })
    }

    pub fn is_active(&self) -> bool {
        self.retained.is_some()
    }

    /// Bus/breaker view bus.
    pub fn test_bus(&self, bus_id: &str) -> bool {
        self.retained.as_ref().map_or(true, |set| set.contains(bus_id))
    }

    /// A calculated bus of another view, retained when one of its members is.
    pub fn test_view_bus(&self, bus_breaker_view: &TopologyView, bus: &CalculatedBus) -> bool {
        if !self.is_active() {
            return true;
        }
        bus.nodes
            .iter()
            .filter_map(|n| bus_breaker_view.bus_of_node(*n))
            .chain(
                bus.configured_buses
                    .iter()
                    .filter_map(|b| bus_breaker_view.bus_of_configured(b)),
            )
            .any(|b| self.test_bus(&b.id))
    }

    pub fn test_terminal(&self, views: &HashMap<String, TopologyView>, terminal: &Terminal) -> bool {
        if !self.is_active() {
            return true;
        }
        connectable_bus(views, terminal).is_some_and(|bus| self.test_bus(bus))
    }

    pub fn test_voltage_level(&self, views: &HashMap<String, TopologyView>, voltage_level_id: &str) -> bool {
        if !self.is_active() {
            return true;
        }
        views
            .get(voltage_level_id)
            .is_some_and(|view| view.buses.iter().any(|b| self.test_bus(&b.id)))
    }

    pub fn test_equipment(&self, network: &Network, views: &HashMap<String, TopologyView>, equipment: &Equipment) -> bool {
        if !self.is_active() {
            return true;
        }
        match equipment {
            Equipment::Switch(sw) => {
                let Some(view) = views.get(&sw.voltage_level_id) else {
                    return false;
                };
                match &sw.ends {
                    SwitchEnds::Buses(b1, b2) => self.test_bus(b1) && self.test_bus(b2),
                    SwitchEnds::Nodes(n1, n2) => [n1, n2]
                        .into_iter()
                        .all(|n| view.bus_of_node(*n).is_some_and(|b| self.test_bus(&b.id))),
                }
            }
            Equipment::TieLine(tl) => [&tl.dangling_line1, &tl.dangling_line2]
                .into_iter()
                .all(|dl| self.test_station(network, views, dl)),
            Equipment::HvdcLine(hvdc) => [&hvdc.converter_station1, &hvdc.converter_station2]
                .into_iter()
                .all(|station| self.test_station(network, views, station)),
            other => other.terminals().into_iter().any(|t| self.test_terminal(views, t)),
        }
    }

    fn test_station(&self, network: &Network, views: &HashMap<String, TopologyView>, id: &str) -> bool {
        network
            .terminal(id, None)
            .is_some_and(|t| self.test_terminal(views, t))
    }
}

fn connectable_bus<'a>(views: &'a HashMap<String, TopologyView>, terminal: &Terminal) -> Option<&'a str> {
    views
        .get(&terminal.voltage_level_id)
        .and_then(|view| view.connectable_bus(terminal))
        .map(|bus| bus.id.as_str())
}

/// Buses an equipment ties together across voltage levels.
fn boundary_buses<'a>(
    network: &Network,
    views: &'a HashMap<String, TopologyView>,
    equipment: &Equipment,
) -> Vec<&'a str> {
    let terminals: Vec<&Terminal> = match equipment {
        Equipment::Line(_) | Equipment::TwoWindingsTransformer(_) | Equipment::ThreeWindingsTransformer(_) => {
            equipment.terminals()
        }
        Equipment::TieLine(tl) => [&tl.dangling_line1, &tl.dangling_line2]
            .into_iter()
            .filter_map(|dl| network.terminal(dl, None))
            .collect(),
        Equipment::HvdcLine(hvdc) => [&hvdc.converter_station1, &hvdc.converter_station2]
            .into_iter()
            .filter_map(|station| network.terminal(station, None))
            .collect(),
        _ => Vec::new(),
    };
    terminals
        .into_iter()
        .filter_map(|t| connectable_bus(views, t))
        .collect()
}
