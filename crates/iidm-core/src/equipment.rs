//! Equipment kinds held by a [`Network`](crate::Network).
//!
//! Every kind is a plain struct with public fields; [`Equipment`] is the closed union the
//! network stores. Injections and switches live inside one voltage level, branches span two
//! (or three) voltage levels, tie lines pair two dangling lines and HVDC lines link two
//! converter stations.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::limits::Limits;
use crate::tap_changer::{PhaseTapChanger, RatioTapChanger};
use crate::{Identifiable, Identity, IidmError, IidmResult, Terminal, TerminalRef};

/// String enums written as upper snake case tokens on the wire.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = IidmError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    other => Err(IidmError::Parse(format!(
                        "invalid {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum!(SwitchKind {
    Breaker => "BREAKER",
    Disconnector => "DISCONNECTOR",
    LoadBreakSwitch => "LOAD_BREAK_SWITCH",
});

wire_enum!(EnergySource {
    Hydro => "HYDRO",
    Nuclear => "NUCLEAR",
    Wind => "WIND",
    Thermal => "THERMAL",
    Solar => "SOLAR",
    Other => "OTHER",
});

wire_enum!(LoadType {
    Undefined => "UNDEFINED",
    Auxiliary => "AUXILIARY",
    Fictitious => "FICTITIOUS",
});

wire_enum!(SvcRegulationMode {
    Voltage => "VOLTAGE",
    ReactivePower => "REACTIVE_POWER",
    Off => "OFF",
});

wire_enum!(ConvertersMode {
    Side1RectifierSide2Inverter => "SIDE_1_RECTIFIER_SIDE_2_INVERTER",
    Side1InverterSide2Rectifier => "SIDE_1_INVERTER_SIDE_2_RECTIFIER",
});

/// Ends of a switch: two nodes in node/breaker, two configured buses in bus/breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchEnds {
    Nodes(u32, u32),
    Buses(String, String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub identity: Identity,
    pub voltage_level_id: String,
    pub kind: SwitchKind,
    pub open: bool,
    /// Kept as an explicit edge when projecting node/breaker onto bus/breaker
    pub retained: bool,
    pub ends: SwitchEnds,
}

impl Switch {
    pub fn nodes(id: impl Into<String>, voltage_level_id: impl Into<String>, kind: SwitchKind, node1: u32, node2: u32) -> Self {
        Self {
            identity: Identity::new(id),
            voltage_level_id: voltage_level_id.into(),
            kind,
            open: false,
            retained: false,
            ends: SwitchEnds::Nodes(node1, node2),
        }
    }

    pub fn buses(
        id: impl Into<String>,
        voltage_level_id: impl Into<String>,
        bus1: impl Into<String>,
        bus2: impl Into<String>,
    ) -> Self {
        Self {
            identity: Identity::new(id),
            voltage_level_id: voltage_level_id.into(),
            kind: SwitchKind::Breaker,
            open: false,
            retained: false,
            ends: SwitchEnds::Buses(bus1.into(), bus2.into()),
        }
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn with_retained(mut self, retained: bool) -> Self {
        self.retained = retained;
        self
    }

    /// Both ends on the same node or bus.
    pub fn is_self_loop(&self) -> bool {
        match &self.ends {
            SwitchEnds::Nodes(n1, n2) => n1 == n2,
            SwitchEnds::Buses(b1, b2) => b1 == b2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusbarSection {
    pub identity: Identity,
    pub terminal: Terminal,
}

impl BusbarSection {
    pub fn new(id: impl Into<String>, terminal: Terminal) -> Self {
        Self {
            identity: Identity::new(id),
            terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactiveCapabilityPoint {
    pub p: f64,
    pub min_q: f64,
    pub max_q: f64,
}

/// Reactive capability of a generator-like injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReactiveLimits {
    MinMax { min_q: f64, max_q: f64 },
    /// Points sorted by increasing `p`
    Curve(Vec<ReactiveCapabilityPoint>),
}

impl Default for ReactiveLimits {
    fn default() -> Self {
        ReactiveLimits::MinMax {
            min_q: -f64::MAX,
            max_q: f64::MAX,
        }
    }
}

impl ReactiveLimits {
    /// Curve from unordered points; duplicated `p` values are rejected.
    pub fn curve(mut points: Vec<ReactiveCapabilityPoint>) -> IidmResult<Self> {
        points.sort_by(|a, b| a.p.total_cmp(&b.p));
        if points.windows(2).any(|w| w[0].p == w[1].p) {
            return Err(IidmError::Validation(
                "reactive capability curve has two points with the same p".into(),
            ));
        }
        if points.len() < 2 {
            return Err(IidmError::Validation(
                "reactive capability curve should have at least two points".into(),
            ));
        }
        Ok(ReactiveLimits::Curve(points))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub identity: Identity,
    pub terminal: Terminal,
    pub energy_source: EnergySource,
    pub min_p: f64,
    pub max_p: f64,
    pub rated_s: f64,
    pub voltage_regulator_on: bool,
    pub target_p: f64,
    pub target_v: f64,
    pub target_q: f64,
    pub regulating_terminal: Option<TerminalRef>,
    pub reactive_limits: Option<ReactiveLimits>,
}

impl Generator {
    pub fn new(id: impl Into<String>, terminal: Terminal, target_p: f64, target_v: f64) -> Self {
        Self {
            identity: Identity::new(id),
            terminal,
            energy_source: EnergySource::Other,
            min_p: -f64::MAX,
            max_p: f64::MAX,
            rated_s: f64::NAN,
            voltage_regulator_on: !target_v.is_nan(),
            target_p,
            target_v,
            target_q: f64::NAN,
            regulating_terminal: None,
            reactive_limits: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub identity: Identity,
    pub terminal: Terminal,
    pub target_p: f64,
    pub target_q: f64,
    pub min_p: f64,
    pub max_p: f64,
    pub reactive_limits: Option<ReactiveLimits>,
}

impl Battery {
    pub fn new(id: impl Into<String>, terminal: Terminal, target_p: f64, target_q: f64) -> Self {
        Self {
            identity: Identity::new(id),
            terminal,
            target_p,
            target_q,
            min_p: -f64::MAX,
            max_p: f64::MAX,
            reactive_limits: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub identity: Identity,
    pub terminal: Terminal,
    pub load_type: LoadType,
    pub p0: f64,
    pub q0: f64,
}

impl Load {
    pub fn new(id: impl Into<String>, terminal: Terminal, p0: f64, q0: f64) -> Self {
        Self {
            identity: Identity::new(id),
            terminal,
            load_type: LoadType::Undefined,
            p0,
            q0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShuntSection {
    pub b: f64,
    pub g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShuntModel {
    Linear {
        b_per_section: f64,
        g_per_section: f64,
        maximum_section_count: i32,
    },
    /// Cumulative susceptance/conductance per section
    NonLinear(Vec<ShuntSection>),
}

impl ShuntModel {
    pub fn maximum_section_count(&self) -> i32 {
        match self {
            ShuntModel::Linear {
                maximum_section_count,
                ..
            } => *maximum_section_count,
            ShuntModel::NonLinear(sections) => sections.len() as i32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuntCompensator {
    pub identity: Identity,
    pub terminal: Terminal,
    pub section_count: i32,
    pub model: ShuntModel,
    pub voltage_regulator_on: bool,
    pub target_v: f64,
    pub target_deadband: f64,
    pub regulating_terminal: Option<TerminalRef>,
}

impl ShuntCompensator {
    pub fn linear(id: impl Into<String>, terminal: Terminal, b_per_section: f64, maximum_section_count: i32) -> Self {
        Self {
            identity: Identity::new(id),
            terminal,
            section_count: 0,
            model: ShuntModel::Linear {
                b_per_section,
                g_per_section: f64::NAN,
                maximum_section_count,
            },
            voltage_regulator_on: false,
            target_v: f64::NAN,
            target_deadband: f64::NAN,
            regulating_terminal: None,
        }
    }

    pub fn check(&self) -> IidmResult<()> {
        let max = self.model.maximum_section_count();
        if self.section_count < 0 || self.section_count > max {
            return Err(IidmError::Validation(format!(
                "shunt compensator '{}': section count {} is not in [0, {}]",
                self.identity.id, self.section_count, max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticVarCompensator {
    pub identity: Identity,
    pub terminal: Terminal,
    pub b_min: f64,
    pub b_max: f64,
    pub voltage_setpoint: f64,
    pub reactive_power_setpoint: f64,
    pub regulation_mode: SvcRegulationMode,
    pub regulating_terminal: Option<TerminalRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanglingLineGeneration {
    pub min_p: f64,
    pub max_p: f64,
    pub target_p: f64,
    pub target_q: f64,
    pub target_v: f64,
    pub voltage_regulation_on: bool,
    pub reactive_limits: Option<ReactiveLimits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanglingLine {
    pub identity: Identity,
    pub terminal: Terminal,
    pub p0: f64,
    pub q0: f64,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    /// Boundary node code shared by the two halves of a tie line
    pub pairing_key: Option<String>,
    pub generation: Option<DanglingLineGeneration>,
    pub limits: Limits,
}

impl DanglingLine {
    pub fn new(id: impl Into<String>, terminal: Terminal) -> Self {
        Self {
            identity: Identity::new(id),
            terminal,
            p0: 0.0,
            q0: 0.0,
            r: 0.0,
            x: 0.0,
            g: 0.0,
            b: 0.0,
            pairing_key: None,
            generation: None,
            limits: Limits::default(),
        }
    }

    pub fn with_impedance(mut self, r: f64, x: f64, g: f64, b: f64) -> Self {
        self.r = r;
        self.x = x;
        self.g = g;
        self.b = b;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VscConverterStation {
    pub identity: Identity,
    pub terminal: Terminal,
    pub loss_factor: f64,
    pub voltage_regulator_on: bool,
    pub voltage_setpoint: f64,
    pub reactive_power_setpoint: f64,
    pub reactive_limits: Option<ReactiveLimits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LccConverterStation {
    pub identity: Identity,
    pub terminal: Terminal,
    pub loss_factor: f64,
    pub power_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub identity: Identity,
    pub terminal1: Terminal,
    pub terminal2: Terminal,
    pub r: f64,
    pub x: f64,
    pub g1: f64,
    pub b1: f64,
    pub g2: f64,
    pub b2: f64,
    pub limits1: Limits,
    pub limits2: Limits,
}

impl Line {
    pub fn new(id: impl Into<String>, terminal1: Terminal, terminal2: Terminal, r: f64, x: f64) -> Self {
        Self {
            identity: Identity::new(id),
            terminal1,
            terminal2,
            r,
            x,
            g1: 0.0,
            b1: 0.0,
            g2: 0.0,
            b2: 0.0,
            limits1: Limits::default(),
            limits2: Limits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoWindingsTransformer {
    pub identity: Identity,
    pub substation_id: Option<String>,
    pub terminal1: Terminal,
    pub terminal2: Terminal,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    pub rated_u1: f64,
    pub rated_u2: f64,
    pub rated_s: f64,
    pub ratio_tap_changer: Option<RatioTapChanger>,
    pub phase_tap_changer: Option<PhaseTapChanger>,
    pub limits1: Limits,
    pub limits2: Limits,
}

impl TwoWindingsTransformer {
    pub fn new(
        id: impl Into<String>,
        substation_id: Option<&str>,
        terminal1: Terminal,
        terminal2: Terminal,
        rated_u1: f64,
        rated_u2: f64,
    ) -> Self {
        Self {
            identity: Identity::new(id),
            substation_id: substation_id.map(str::to_string),
            terminal1,
            terminal2,
            r: 0.0,
            x: 0.0,
            g: 0.0,
            b: 0.0,
            rated_u1,
            rated_u2,
            rated_s: f64::NAN,
            ratio_tap_changer: None,
            phase_tap_changer: None,
            limits1: Limits::default(),
            limits2: Limits::default(),
        }
    }
}

/// One winding of a three-winding transformer, seen from the star point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub terminal: Terminal,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    pub rated_u: f64,
    pub rated_s: f64,
    pub ratio_tap_changer: Option<RatioTapChanger>,
    pub phase_tap_changer: Option<PhaseTapChanger>,
    pub limits: Limits,
}

impl Leg {
    pub fn new(terminal: Terminal, rated_u: f64) -> Self {
        Self {
            terminal,
            r: 0.0,
            x: 0.0,
            g: 0.0,
            b: 0.0,
            rated_u,
            rated_s: f64::NAN,
            ratio_tap_changer: None,
            phase_tap_changer: None,
            limits: Limits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeWindingsTransformer {
    pub identity: Identity,
    pub substation_id: Option<String>,
    /// Star bus rated voltage
    pub rated_u0: f64,
    pub legs: [Leg; 3],
}

/// Branch formed by pairing two dangling lines at a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieLine {
    pub identity: Identity,
    pub dangling_line1: String,
    pub dangling_line2: String,
}

impl TieLine {
    pub fn new(id: impl Into<String>, dangling_line1: impl Into<String>, dangling_line2: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(id),
            dangling_line1: dangling_line1.into(),
            dangling_line2: dangling_line2.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HvdcLine {
    pub identity: Identity,
    pub r: f64,
    pub nominal_v: f64,
    pub converters_mode: ConvertersMode,
    pub active_power_setpoint: f64,
    pub max_p: f64,
    pub converter_station1: String,
    pub converter_station2: String,
}

/// Typed access to one variant of [`Equipment`].
pub trait EquipmentKind: Sized {
    /// Element name used in documents
    const ELEMENT: &'static str;

    fn from_equipment(equipment: &Equipment) -> Option<&Self>;
    fn from_equipment_mut(equipment: &mut Equipment) -> Option<&mut Self>;
}

macro_rules! equipment_union {
    ($($variant:ident => $element:literal),+ $(,)?) => {
        /// Closed union of every equipment kind the network can hold.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Equipment {
            $($variant($variant)),+
        }

        impl Equipment {
            pub fn identity(&self) -> &Identity {
                match self {
                    $(Equipment::$variant(e) => &e.identity),+
                }
            }

            pub fn identity_mut(&mut self) -> &mut Identity {
                match self {
                    $(Equipment::$variant(e) => &mut e.identity),+
                }
            }

            /// Element name of this kind
            pub fn element(&self) -> &'static str {
                match self {
                    $(Equipment::$variant(_) => $element),+
                }
            }
        }

        $(
            impl From<$variant> for Equipment {
                fn from(e: $variant) -> Self {
                    Equipment::$variant(e)
                }
            }

            impl EquipmentKind for $variant {
                const ELEMENT: &'static str = $element;

                fn from_equipment(equipment: &Equipment) -> Option<&Self> {
                    match equipment {
                        Equipment::$variant(e) => Some(e),
                        _ => None,
                    }
                }

                fn from_equipment_mut(equipment: &mut Equipment) -> Option<&mut Self> {
                    match equipment {
                        Equipment::$variant(e) => Some(e),
                        _ => None,
                    }
                }
            }

            impl Identifiable for $variant {
                fn identity(&self) -> &Identity {
                    &self.identity
                }

                fn identity_mut(&mut self) -> &mut Identity {
                    &mut self.identity
                }
            }
        )+
    };
}

equipment_union! {
    BusbarSection => "busbarSection",
    Switch => "switch",
    Generator => "generator",
    Battery => "battery",
    Load => "load",
    ShuntCompensator => "shunt",
    StaticVarCompensator => "staticVarCompensator",
    DanglingLine => "danglingLine",
    VscConverterStation => "vscConverterStation",
    LccConverterStation => "lccConverterStation",
    Line => "line",
    TwoWindingsTransformer => "twoWindingsTransformer",
    ThreeWindingsTransformer => "threeWindingsTransformer",
    TieLine => "tieLine",
    HvdcLine => "hvdcLine",
}

impl Equipment {
    pub fn id(&self) -> &str {
        &self.identity().id
    }

    /// Own terminals, ordered by side. Tie lines, HVDC lines and switches have none.
    pub fn terminals(&self) -> Vec<&Terminal> {
        match self {
            Equipment::BusbarSection(e) => vec![&e.terminal],
            Equipment::Generator(e) => vec![&e.terminal],
            Equipment::Battery(e) => vec![&e.terminal],
            Equipment::Load(e) => vec![&e.terminal],
            Equipment::ShuntCompensator(e) => vec![&e.terminal],
            Equipment::StaticVarCompensator(e) => vec![&e.terminal],
            Equipment::DanglingLine(e) => vec![&e.terminal],
            Equipment::VscConverterStation(e) => vec![&e.terminal],
            Equipment::LccConverterStation(e) => vec![&e.terminal],
            Equipment::Line(e) => vec![&e.terminal1, &e.terminal2],
            Equipment::TwoWindingsTransformer(e) => vec![&e.terminal1, &e.terminal2],
            Equipment::ThreeWindingsTransformer(e) => e.legs.iter().map(|l| &l.terminal).collect(),
            Equipment::Switch(_) | Equipment::TieLine(_) | Equipment::HvdcLine(_) => Vec::new(),
        }
    }

    /// Containing voltage level for equipment located in exactly one.
    pub fn voltage_level_id(&self) -> Option<&str> {
        match self {
            Equipment::Switch(sw) => Some(&sw.voltage_level_id),
            Equipment::Line(_)
            | Equipment::TwoWindingsTransformer(_)
            | Equipment::ThreeWindingsTransformer(_)
            | Equipment::TieLine(_)
            | Equipment::HvdcLine(_) => None,
            other => other
                .terminals()
                .first()
                .map(|t| t.voltage_level_id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_enum_tokens() {
        assert_eq!(SwitchKind::LoadBreakSwitch.as_str(), "LOAD_BREAK_SWITCH");
        assert_eq!("NUCLEAR".parse::<EnergySource>().ok(), Some(EnergySource::Nuclear));
        assert!("nuclear".parse::<EnergySource>().is_err());
    }

    #[test]
    fn test_switch_self_loop() {
        let sw = Switch::nodes("SW", "VL", SwitchKind::Breaker, 2, 2);
        assert!(sw.is_self_loop());
        let sw = Switch::buses("SW", "VL", "B1", "B2");
        assert!(!sw.is_self_loop());
    }

    #[test]
    fn test_reactive_curve_sorted_by_p() {
        let curve = ReactiveLimits::curve(vec![
            ReactiveCapabilityPoint { p: 100.0, min_q: -50.0, max_q: 50.0 },
            ReactiveCapabilityPoint { p: 0.0, min_q: -80.0, max_q: 80.0 },
        ])
        .expect("curve");
        match curve {
            ReactiveLimits::Curve(points) => assert_eq!(points[0].p, 0.0),
            ReactiveLimits::MinMax { .. } => panic!("expected a curve"),
        }
    }

    #[test]
    fn test_shunt_section_count_range() {
        let mut shunt = ShuntCompensator::linear("SH", Terminal::node("VL", 1), 1e-3, 2);
        shunt.section_count = 3;
        assert!(shunt.check().is_err());
        shunt.section_count = 2;
        assert!(shunt.check().is_ok());
    }

    #[test]
    fn test_equipment_terminals_and_element() {
        let line: Equipment = Line::new("L", Terminal::node("VL1", 1), Terminal::node("VL2", 1), 1.0, 10.0).into();
        assert_eq!(line.terminals().len(), 2);
        assert_eq!(line.element(), "line");
        assert!(line.voltage_level_id().is_none());

        let load: Equipment = Load::new("LD", Terminal::node("VL1", 4), 1.0, 0.0).into();
        assert_eq!(load.voltage_level_id(), Some("VL1"));
        assert_eq!(<Load as EquipmentKind>::ELEMENT, "load");
    }
}
