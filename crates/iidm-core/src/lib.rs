//! # iidm-core: Grid Network Object Model
//!
//! In-memory representation of a power grid network as exchanged by the IIDM codec in
//! `iidm-io`. The model is a container of identifiables with globally unique ids:
//!
//! - **Substations** group voltage levels and transformers
//! - **Voltage levels** carry their native topology, either a fully switched
//!   node/breaker graph or a pre-aggregated bus/breaker graph
//! - **Equipment** is a closed tagged union ([`Equipment`]) covering injections
//!   (generators, loads, shunts, ...), switches, branches, tie lines and HVDC links
//!
//! Connectivity is expressed through [`Terminal`]s: a terminal points to its voltage level
//! and either to a node (node/breaker) or to a configured bus (bus/breaker). Derived views
//! (bus/breaker view and bus view) are computed on demand, see [`topology`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iidm_core::*;
//!
//! fn main() -> IidmResult<()> {
//!     let mut network = Network::new("sample", "test");
//!     network.add_substation(Substation::new("S1").with_country("FR"))?;
//!     network.add_voltage_level(VoltageLevel::bus_breaker("VL1", Some("S1"), 400.0))?;
//!     network.add_configured_bus("VL1", ConfiguredBus::new("B1"))?;
//!     network.add_equipment(Load::new("L1", Terminal::bus("VL1", "B1"), 100.0, 10.0))?;
//!     assert_eq!(network.equipment().len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`equipment`] - Equipment kinds and the [`Equipment`] union
//! - [`topology`] - Voltage levels, topologies and calculated bus views
//! - [`limits`] - Operational limits groups and loading limits
//! - [`tap_changer`] - Ratio and phase tap changers
//! - [`graph_utils`] - Connected component analysis over the bus/breaker view
//! - [`fixtures`] - Sample networks used by tests and demos

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

pub mod country;
pub mod equipment;
pub mod error;
pub mod fixtures;
pub mod graph_utils;
pub mod limits;
pub mod tap_changer;
pub mod topology;

pub use equipment::*;
pub use error::{IidmError, IidmResult, NamespaceAxis, Violation};
pub use limits::{Limits, LoadingLimits, OperationalLimitsGroup, TemporaryLimit};
pub use tap_changer::{
    PhaseRegulationMode, PhaseTapChanger, PhaseTapChangerStep, RatioTapChanger,
    RatioTapChangerStep,
};
pub use topology::{
    BusBreakerTopology, BusVoltage, CalculatedBus, ConfiguredBus, FictitiousInjection,
    InternalConnection, NodeBreakerTopology, Topology, TopologyKind, TopologyView, VoltageLevel,
};

/// Alternative identifier of an identifiable, optionally typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub alias: String,
    pub alias_type: Option<String>,
}

/// Named attachment to an identifiable. Its content is an ordered attribute bag whose
/// meaning is owned by the extension codec registered under `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Identity shared by every identifiable: id, name, fictitious flag, aliases,
/// properties and extensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: Option<String>,
    pub fictitious: bool,
    pub aliases: Vec<Alias>,
    pub properties: BTreeMap<String, String>,
    pub extensions: Vec<Extension>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, alias_type: Option<String>) {
        self.aliases.push(Alias {
            alias: alias.into(),
            alias_type,
        });
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Attach an extension, replacing any previous one with the same name.
    pub fn add_extension(&mut self, extension: Extension) {
        self.extensions.retain(|e| e.name != extension.name);
        self.extensions.push(extension);
    }

    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.name == name)
    }

    /// Name if present, id otherwise.
    pub fn name_or_id(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Anything carrying an [`Identity`].
pub trait Identifiable {
    fn identity(&self) -> &Identity;
    fn identity_mut(&mut self) -> &mut Identity;

    fn id(&self) -> &str {
        &self.identity().id
    }
}

/// Side of a branch or leg of a three-winding transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    One,
    Two,
    Three,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::One => "ONE",
            Side::Two => "TWO",
            Side::Three => "THREE",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::One => 1,
            Side::Two => 2,
            Side::Three => 3,
        }
    }
}

impl FromStr for Side {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONE" => Ok(Side::One),
            "TWO" => Ok(Side::Two),
            "THREE" => Ok(Side::Three),
            other => Err(IidmError::Parse(format!("invalid side '{other}'"))),
        }
    }
}

/// Where a terminal is plugged in its voltage level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Connection {
    /// Node of a node/breaker voltage level
    Node(u32),
    /// Configured bus of a bus/breaker voltage level. `bus` is `None` when disconnected.
    Bus {
        bus: Option<String>,
        connectable_bus: String,
    },
}

/// Connection point of an equipment with its flow state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub voltage_level_id: String,
    pub connection: Connection,
    pub p: f64,
    pub q: f64,
}

impl Terminal {
    pub fn node(voltage_level_id: impl Into<String>, node: u32) -> Self {
        Self {
            voltage_level_id: voltage_level_id.into(),
            connection: Connection::Node(node),
            p: f64::NAN,
            q: f64::NAN,
        }
    }

    /// Terminal connected to `bus`.
    pub fn bus(voltage_level_id: impl Into<String>, bus: impl Into<String>) -> Self {
        let bus = bus.into();
        Self {
            voltage_level_id: voltage_level_id.into(),
            connection: Connection::Bus {
                bus: Some(bus.clone()),
                connectable_bus: bus,
            },
            p: f64::NAN,
            q: f64::NAN,
        }
    }

    /// Terminal that could connect to `bus` but currently is not.
    pub fn disconnected_bus(voltage_level_id: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            voltage_level_id: voltage_level_id.into(),
            connection: Connection::Bus {
                bus: None,
                connectable_bus: bus.into(),
            },
            p: f64::NAN,
            q: f64::NAN,
        }
    }

    pub fn with_flow(mut self, p: f64, q: f64) -> Self {
        self.p = p;
        self.q = q;
        self
    }

    pub fn node_number(&self) -> Option<u32> {
        match self.connection {
            Connection::Node(n) => Some(n),
            Connection::Bus { .. } => None,
        }
    }
}

/// Reference to a terminal of another equipment, e.g. a regulation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalRef {
    pub id: String,
    pub side: Option<Side>,
}

impl TerminalRef {
    pub fn new(id: impl Into<String>, side: Option<Side>) -> Self {
        Self { id: id.into(), side }
    }
}

/// Minimum validation level a network satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationLevel {
    Equipment,
    #[default]
    SteadyStateHypothesis,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Equipment => "EQUIPMENT",
            ValidationLevel::SteadyStateHypothesis => "STEADY_STATE_HYPOTHESIS",
        }
    }
}

impl FromStr for ValidationLevel {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUIPMENT" => Ok(ValidationLevel::Equipment),
            "STEADY_STATE_HYPOTHESIS" => Ok(ValidationLevel::SteadyStateHypothesis),
            other => Err(IidmError::Parse(format!(
                "invalid validation level '{other}'"
            ))),
        }
    }
}

/// Geographic and organisational grouping of voltage levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substation {
    pub identity: Identity,
    /// ISO 3166-1 alpha-2 code
    pub country: Option<String>,
    pub tso: Option<String>,
    pub geographical_tags: Vec<String>,
}

impl Substation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(id),
            country: None,
            tso: None,
            geographical_tags: Vec::new(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_tso(mut self, tso: impl Into<String>) -> Self {
        self.tso = Some(tso.into());
        self
    }
}

impl Identifiable for Substation {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

/// Location of an identifiable inside a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef {
    Network,
    Substation(usize),
    VoltageLevel(usize),
    /// Configured bus: (voltage level index, bus index)
    Bus(usize, usize),
    Equipment(usize),
}

/// The network container.
///
/// Every identifiable is registered in a single id index, so ids are unique across
/// substations, voltage levels, configured buses and equipment.
#[derive(Debug, Clone)]
pub struct Network {
    pub identity: Identity,
    pub case_date: DateTime<FixedOffset>,
    pub forecast_distance: i32,
    pub source_format: String,
    pub validation_level: ValidationLevel,
    substations: Vec<Substation>,
    voltage_levels: Vec<VoltageLevel>,
    equipment: Vec<Equipment>,
    index: HashMap<String, ObjectRef>,
}

impl Identifiable for Network {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

/// Counts of the identifiables held by a network.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NetworkStats {
    pub substations: usize,
    pub voltage_levels: usize,
    pub buses: usize,
    pub equipment: usize,
    pub switches: usize,
    pub branches: usize,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} substations, {} voltage levels, {} buses, {} equipment ({} switches, {} branches)",
            self.substations,
            self.voltage_levels,
            self.buses,
            self.equipment,
            self.switches,
            self.branches
        )
    }
}

impl Network {
    pub fn new(id: impl Into<String>, source_format: impl Into<String>) -> Self {
        let identity = Identity::new(id);
        let mut index = HashMap::new();
        index.insert(identity.id.clone(), ObjectRef::Network);
        Self {
            identity,
            case_date: Utc::now().fixed_offset(),
            forecast_distance: 0,
            source_format: source_format.into(),
            validation_level: ValidationLevel::default(),
            substations: Vec::new(),
            voltage_levels: Vec::new(),
            equipment: Vec::new(),
            index,
        }
    }

    pub fn with_case_date(mut self, case_date: DateTime<FixedOffset>) -> Self {
        self.case_date = case_date;
        self
    }

    pub fn substations(&self) -> &[Substation] {
        &self.substations
    }

    pub fn voltage_levels(&self) -> &[VoltageLevel] {
        &self.voltage_levels
    }

    pub fn equipment(&self) -> &[Equipment] {
        &self.equipment
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn lookup(&self, id: &str) -> Option<ObjectRef> {
        self.index.get(id).copied()
    }

    fn check_unique(&self, id: &str) -> IidmResult<()> {
        if id.is_empty() {
            return Err(IidmError::Network("identifiable id is empty".into()));
        }
        if self.index.contains_key(id) {
            return Err(IidmError::Network(format!(
                "the network {} already contains an object with the id '{}'",
                self.identity.id, id
            )));
        }
        Ok(())
    }

    pub fn add_substation(&mut self, substation: Substation) -> IidmResult<()> {
        self.check_unique(&substation.identity.id)?;
        if let Some(country) = &substation.country {
            if !country::is_country_code(country) {
                return Err(IidmError::Network(format!(
                    "substation '{}': unknown country code '{}'",
                    substation.identity.id, country
                )));
            }
        }
        self.index.insert(
            substation.identity.id.clone(),
            ObjectRef::Substation(self.substations.len()),
        );
        self.substations.push(substation);
        Ok(())
    }

    pub fn add_voltage_level(&mut self, voltage_level: VoltageLevel) -> IidmResult<()> {
        self.check_unique(&voltage_level.identity.id)?;
        if let Some(substation_id) = &voltage_level.substation_id {
            if self.substation(substation_id).is_none() {
                return Err(IidmError::Network(format!(
                    "voltage level '{}': substation '{}' not found",
                    voltage_level.identity.id, substation_id
                )));
            }
        }
        let vl_index = self.voltage_levels.len();
        if let Topology::BusBreaker(topology) = &voltage_level.topology {
            for (bus_index, bus) in topology.buses.iter().enumerate() {
                self.check_unique(&bus.identity.id)?;
                self.index
                    .insert(bus.identity.id.clone(), ObjectRef::Bus(vl_index, bus_index));
            }
        }
        self.index
            .insert(voltage_level.identity.id.clone(), ObjectRef::VoltageLevel(vl_index));
        self.voltage_levels.push(voltage_level);
        Ok(())
    }

    /// Add a configured bus to a bus/breaker voltage level.
    pub fn add_configured_bus(&mut self, voltage_level_id: &str, bus: ConfiguredBus) -> IidmResult<()> {
        self.check_unique(&bus.identity.id)?;
        let vl_index = match self.lookup(voltage_level_id) {
            Some(ObjectRef::VoltageLevel(i)) => i,
            _ => {
                return Err(IidmError::Network(format!(
                    "voltage level '{voltage_level_id}' not found"
                )))
            }
        };
        match &mut self.voltage_levels[vl_index].topology {
            Topology::BusBreaker(topology) => {
                let bus_index = topology.buses.len();
                self.index
                    .insert(bus.identity.id.clone(), ObjectRef::Bus(vl_index, bus_index));
                topology.buses.push(bus);
                Ok(())
            }
            Topology::NodeBreaker(_) => Err(IidmError::Network(format!(
                "voltage level '{voltage_level_id}' is not in bus/breaker topology"
            ))),
        }
    }

    /// Add any equipment kind after checking ids and the references it holds.
    pub fn add_equipment(&mut self, equipment: impl Into<Equipment>) -> IidmResult<()> {
        let equipment = equipment.into();
        self.check_unique(equipment.id())?;
        self.check_equipment(&equipment)?;
        self.index.insert(
            equipment.id().to_string(),
            ObjectRef::Equipment(self.equipment.len()),
        );
        self.equipment.push(equipment);
        Ok(())
    }

    fn check_equipment(&self, equipment: &Equipment) -> IidmResult<()> {
        let owner = equipment.id();
        for terminal in equipment.terminals() {
            self.check_terminal(owner, terminal)?;
        }
        match equipment {
            Equipment::Switch(sw) => self.check_switch(sw),
            Equipment::TwoWindingsTransformer(t) => {
                self.check_transformer_substation(owner, t.substation_id.as_deref())?;
                if let Some(rtc) = &t.ratio_tap_changer {
                    rtc.check(owner)?;
                }
                if let Some(ptc) = &t.phase_tap_changer {
                    ptc.check(owner)?;
                }
                Ok(())
            }
            Equipment::ThreeWindingsTransformer(t) => {
                self.check_transformer_substation(owner, t.substation_id.as_deref())?;
                for leg in &t.legs {
                    if let Some(rtc) = &leg.ratio_tap_changer {
                        rtc.check(owner)?;
                    }
                    if let Some(ptc) = &leg.phase_tap_changer {
                        ptc.check(owner)?;
                    }
                }
                Ok(())
            }
            Equipment::TieLine(tl) => self.check_tie_line(tl),
            Equipment::HvdcLine(hvdc) => {
                for station in [&hvdc.converter_station1, &hvdc.converter_station2] {
                    match self.equipment_by_id(station) {
                        Some(Equipment::VscConverterStation(_))
                        | Some(Equipment::LccConverterStation(_)) => {}
                        _ => {
                            return Err(IidmError::Network(format!(
                                "HVDC line '{owner}': converter station '{station}' not found"
                            )))
                        }
                    }
                }
                Ok(())
            }
            Equipment::ShuntCompensator(shunt) => shunt.check(),
            _ => Ok(()),
        }
    }

    fn check_terminal(&self, owner: &str, terminal: &Terminal) -> IidmResult<()> {
        let vl = self.voltage_level(&terminal.voltage_level_id).ok_or_else(|| {
            IidmError::Network(format!(
                "'{}': voltage level '{}' not found",
                owner, terminal.voltage_level_id
            ))
        })?;
        match (&vl.topology, &terminal.connection) {
            (Topology::NodeBreaker(_), Connection::Node(_)) => Ok(()),
            (Topology::BusBreaker(topology), Connection::Bus { bus, connectable_bus }) => {
                if !topology.contains_bus(connectable_bus) {
                    return Err(IidmError::Network(format!(
                        "'{}': bus '{}' not found in voltage level '{}'",
                        owner, connectable_bus, vl.identity.id
                    )));
                }
                if let Some(bus) = bus {
                    if bus != connectable_bus {
                        return Err(IidmError::Network(format!(
                            "'{owner}': connection bus '{bus}' is different from connectable bus '{connectable_bus}'"
                        )));
                    }
                }
                Ok(())
            }
            (Topology::NodeBreaker(_), Connection::Bus { .. }) => Err(IidmError::Network(format!(
                "'{}': voltage level '{}' is node/breaker, a node is expected",
                owner, vl.identity.id
            ))),
            (Topology::BusBreaker(_), Connection::Node(_)) => Err(IidmError::Network(format!(
                "'{}': voltage level '{}' is bus/breaker, a bus is expected",
                owner, vl.identity.id
            ))),
        }
    }

    fn check_switch(&self, sw: &Switch) -> IidmResult<()> {
        let vl = self.voltage_level(&sw.voltage_level_id).ok_or_else(|| {
            IidmError::Network(format!(
                "switch '{}': voltage level '{}' not found",
                sw.identity.id, sw.voltage_level_id
            ))
        })?;
        match (&vl.topology, &sw.ends) {
            (Topology::NodeBreaker(_), SwitchEnds::Nodes(_, _)) => Ok(()),
            (Topology::BusBreaker(topology), SwitchEnds::Buses(b1, b2)) => {
                for bus in [b1, b2] {
                    if !topology.contains_bus(bus) {
                        return Err(IidmError::Network(format!(
                            "switch '{}': bus '{}' not found in voltage level '{}'",
                            sw.identity.id, bus, sw.voltage_level_id
                        )));
                    }
                }
                Ok(())
            }
            _ => Err(IidmError::Network(format!(
                "switch '{}': ends do not match the topology of voltage level '{}'",
                sw.identity.id, sw.voltage_level_id
            ))),
        }
    }

    fn check_transformer_substation(&self, owner: &str, substation_id: Option<&str>) -> IidmResult<()> {
        match substation_id {
            Some(id) if self.substation(id).is_none() => Err(IidmError::Network(format!(
                "transformer '{owner}': substation '{id}' not found"
            ))),
            _ => Ok(()),
        }
    }

    fn check_tie_line(&self, tl: &TieLine) -> IidmResult<()> {
        if tl.dangling_line1 == tl.dangling_line2 {
            return Err(IidmError::Network(format!(
                "tie line '{}': both halves reference '{}'",
                tl.identity.id, tl.dangling_line1
            )));
        }
        for dl in [&tl.dangling_line1, &tl.dangling_line2] {
            if self.get::<DanglingLine>(dl).is_none() {
                return Err(IidmError::Network(format!(
                    "tie line '{}': dangling line '{}' not found",
                    tl.identity.id, dl
                )));
            }
            if let Some(other) = self.tie_line_of(dl) {
                return Err(IidmError::Network(format!(
                    "dangling line '{}' is already paired in tie line '{}'",
                    dl, other.identity.id
                )));
            }
        }
        Ok(())
    }

    pub fn substation(&self, id: &str) -> Option<&Substation> {
        match self.lookup(id)? {
            ObjectRef::Substation(i) => self.substations.get(i),
            _ => None,
        }
    }

    pub fn voltage_level(&self, id: &str) -> Option<&VoltageLevel> {
        match self.lookup(id)? {
            ObjectRef::VoltageLevel(i) => self.voltage_levels.get(i),
            _ => None,
        }
    }

    pub fn voltage_level_mut(&mut self, id: &str) -> Option<&mut VoltageLevel> {
        match self.lookup(id)? {
            ObjectRef::VoltageLevel(i) => self.voltage_levels.get_mut(i),
            _ => None,
        }
    }

    pub fn configured_bus(&self, id: &str) -> Option<&ConfiguredBus> {
        match self.lookup(id)? {
            ObjectRef::Bus(vl, bus) => match &self.voltage_levels.get(vl)?.topology {
                Topology::BusBreaker(topology) => topology.buses.get(bus),
                Topology::NodeBreaker(_) => None,
            },
            _ => None,
        }
    }

    pub fn equipment_by_id(&self, id: &str) -> Option<&Equipment> {
        match self.lookup(id)? {
            ObjectRef::Equipment(i) => self.equipment.get(i),
            _ => None,
        }
    }

    pub fn equipment_by_id_mut(&mut self, id: &str) -> Option<&mut Equipment> {
        match self.lookup(id)? {
            ObjectRef::Equipment(i) => self.equipment.get_mut(i),
            _ => None,
        }
    }

    /// Typed lookup of one equipment kind.
    pub fn get<T: EquipmentKind>(&self, id: &str) -> Option<&T> {
        self.equipment_by_id(id).and_then(T::from_equipment)
    }

    pub fn get_mut<T: EquipmentKind>(&mut self, id: &str) -> Option<&mut T> {
        self.equipment_by_id_mut(id).and_then(T::from_equipment_mut)
    }

    /// All equipment of one kind, in insertion order.
    pub fn iter<'a, T: EquipmentKind + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.equipment.iter().filter_map(T::from_equipment)
    }

    pub fn identity_of(&self, id: &str) -> Option<&Identity> {
        match self.lookup(id)? {
            ObjectRef::Network => Some(&self.identity),
            ObjectRef::Substation(i) => self.substations.get(i).map(|s| &s.identity),
            ObjectRef::VoltageLevel(i) => self.voltage_levels.get(i).map(|v| &v.identity),
            ObjectRef::Bus(vl, bus) => match &self.voltage_levels.get(vl)?.topology {
                Topology::BusBreaker(topology) => topology.buses.get(bus).map(|b| &b.identity),
                Topology::NodeBreaker(_) => None,
            },
            ObjectRef::Equipment(i) => self.equipment.get(i).map(Equipment::identity),
        }
    }

    pub fn identity_of_mut(&mut self, id: &str) -> Option<&mut Identity> {
        match self.lookup(id)? {
            ObjectRef::Network => Some(&mut self.identity),
            ObjectRef::Substation(i) => self.substations.get_mut(i).map(|s| &mut s.identity),
            ObjectRef::VoltageLevel(i) => self.voltage_levels.get_mut(i).map(|v| &mut v.identity),
            ObjectRef::Bus(vl, bus) => match &mut self.voltage_levels.get_mut(vl)?.topology {
                Topology::BusBreaker(topology) => {
                    topology.buses.get_mut(bus).map(|b| &mut b.identity)
                }
                Topology::NodeBreaker(_) => None,
            },
            ObjectRef::Equipment(i) => self.equipment.get_mut(i).map(Equipment::identity_mut),
        }
    }

    /// Every identifiable in a stable order: network, substations, voltage levels
    /// (with their configured buses), then equipment.
    pub fn identities(&self) -> Vec<&Identity> {
        let mut all = vec![&self.identity];
        all.extend(self.substations.iter().map(|s| &s.identity));
        for vl in &self.voltage_levels {
            all.push(&vl.identity);
            if let Topology::BusBreaker(topology) = &vl.topology {
                all.extend(topology.buses.iter().map(|b| &b.identity));
            }
        }
        all.extend(self.equipment.iter().map(Equipment::identity));
        all
    }

    pub fn voltage_levels_of<'a>(&'a self, substation_id: &'a str) -> impl Iterator<Item = &'a VoltageLevel> {
        self.voltage_levels
            .iter()
            .filter(move |vl| vl.substation_id.as_deref() == Some(substation_id))
    }

    /// Equipment located in one voltage level (injections, switches, busbar sections).
    /// Branches are not included.
    pub fn equipment_in<'a>(&'a self, voltage_level_id: &'a str) -> impl Iterator<Item = &'a Equipment> {
        self.equipment
            .iter()
            .filter(move |e| e.voltage_level_id() == Some(voltage_level_id))
    }

    /// Every terminal, of any equipment, located in one voltage level.
    pub fn terminals_in<'a>(&'a self, voltage_level_id: &'a str) -> impl Iterator<Item = &'a Terminal> {
        self.equipment
            .iter()
            .flat_map(Equipment::terminals)
            .filter(move |t| t.voltage_level_id == voltage_level_id)
    }

    pub fn tie_line_of(&self, dangling_line_id: &str) -> Option<&TieLine> {
        self.iter::<TieLine>().find(|tl| {
            tl.dangling_line1 == dangling_line_id || tl.dangling_line2 == dangling_line_id
        })
    }

    /// Terminal of `equipment_id` designated by `side` (`None` for single-terminal equipment).
    pub fn terminal(&self, equipment_id: &str, side: Option<Side>) -> Option<&Terminal> {
        let equipment = self.equipment_by_id(equipment_id)?;
        let terminals = equipment.terminals();
        match side {
            None if terminals.len() == 1 => terminals.first().copied(),
            None => None,
            Some(side) => terminals.get(side.index() - 1).copied(),
        }
    }

    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            substations: self.substations.len(),
            voltage_levels: self.voltage_levels.len(),
            equipment: self.equipment.len(),
            ..NetworkStats::default()
        };
        for vl in &self.voltage_levels {
            if let Topology::BusBreaker(topology) = &vl.topology {
                stats.buses += topology.buses.len();
            }
        }
        for e in &self.equipment {
            match e {
                Equipment::Switch(_) => stats.switches += 1,
                Equipment::Line(_)
                | Equipment::TwoWindingsTransformer(_)
                | Equipment::ThreeWindingsTransformer(_)
                | Equipment::TieLine(_) => stats.branches += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_breaker_network() -> Network {
        let mut network = Network::new("test", "unit");
        network
            .add_substation(Substation::new("S1").with_country("FR"))
            .expect("substation");
        network
            .add_voltage_level(VoltageLevel::bus_breaker("VL1", Some("S1"), 400.0))
            .expect("voltage level");
        network
            .add_configured_bus("VL1", ConfiguredBus::new("B1"))
            .expect("bus");
        network
    }

    #[test]
    fn test_ids_are_unique_across_kinds() {
        let mut network = bus_breaker_network();
        let err = network
            .add_equipment(Load::new("B1", Terminal::bus("VL1", "B1"), 10.0, 1.0))
            .unwrap_err();
        assert!(err.to_string().contains("already contains an object with the id 'B1'"));
    }

    #[test]
    fn test_terminal_must_match_topology() {
        let mut network = bus_breaker_network();
        let err = network
            .add_equipment(Load::new("L1", Terminal::node("VL1", 3), 10.0, 1.0))
            .unwrap_err();
        assert!(err.to_string().contains("a bus is expected"));
    }

    #[test]
    fn test_unknown_country_rejected() {
        let mut network = Network::new("test", "unit");
        let err = network
            .add_substation(Substation::new("S1").with_country("XX"))
            .unwrap_err();
        assert!(matches!(err, IidmError::Network(_)));
    }

    #[test]
    fn test_typed_lookup_and_identity() {
        let mut network = bus_breaker_network();
        network
            .add_equipment(Load::new("L1", Terminal::bus("VL1", "B1"), 10.0, 1.0))
            .expect("load");
        assert!(network.get::<Load>("L1").is_some());
        assert!(network.get::<Generator>("L1").is_none());
        network
            .identity_of_mut("L1")
            .expect("identity")
            .set_property("owner", "grid");
        assert_eq!(
            network.identity_of("L1").and_then(|i| i.properties.get("owner")).map(String::as_str),
            Some("grid")
        );
        assert_eq!(network.identity_of("B1").map(|i| i.id.as_str()), Some("B1"));
    }

    #[test]
    fn test_tie_line_halves_paired_once() {
        let mut network = bus_breaker_network();
        for id in ["DL1", "DL2", "DL3"] {
            network
                .add_equipment(DanglingLine::new(id, Terminal::bus("VL1", "B1")))
                .expect("dangling line");
        }
        network
            .add_equipment(TieLine::new("TL1", "DL1", "DL2"))
            .expect("tie line");
        let err = network
            .add_equipment(TieLine::new("TL2", "DL2", "DL3"))
            .unwrap_err();
        assert!(err.to_string().contains("already paired"));
        assert_eq!(network.tie_line_of("DL1").map(|t| t.identity.id.as_str()), Some("TL1"));
    }

    #[test]
    fn test_stats() {
        let network = fixtures::two_substations().expect("fixture");
        let stats = network.stats();
        assert_eq!(stats.substations, 3);
        assert_eq!(stats.branches, 2);
        assert!(stats.to_string().contains("3 substations"));
    }

    #[test]
    fn test_identity_serializes_to_json() {
        let mut identity = Identity::new("G1").with_name("gen");
        identity.add_alias("alt", Some("code".into()));
        let json = serde_json::to_string(&identity).expect("serialize");
        assert!(json.contains("\"alias_type\":\"code\""));
    }
}
