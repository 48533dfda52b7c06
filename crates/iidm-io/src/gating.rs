//! Version gating table
//!
//! Every attribute or element whose presence, name or default handling depends on the
//! document version is described once by a [`Gate`]. Writers, readers and the structural
//! validator all consult the same record, so a gate can never disagree with itself between
//! directions.
//!
//! A gate combines up to three rules:
//!
//! - a presence window (`since` / `until`, both inclusive);
//! - a rename: the wire name switches to a new one from a given version;
//! - default omission: below a given version the value is only written when it differs
//!   from its default, from that version on it is always written.

use std::fmt;

use iidm_core::{IidmError, IidmResult};

use crate::tree::{is_default, TreeDataReader, TreeDataWriter};
use crate::version::IidmVersion;

/// Owner used by gates that apply to every element carrying the attribute.
pub const ANY_OWNER: &str = "*";

/// Why a gated value cannot be expressed in a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateViolation {
    NotSupported,
    Mandatory,
    NotNullNotSupported,
    NotDefaultNotSupported,
}

impl fmt::Display for GateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GateViolation::NotSupported => "not supported",
            GateViolation::Mandatory => "mandatory",
            GateViolation::NotNullNotSupported => "not null and not supported",
            GateViolation::NotDefaultNotSupported => "not defined as default and not supported",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate<'o> {
    /// Element carrying the gated attribute or child, [`ANY_OWNER`] for generic gates
    pub owner: &'o str,
    pub name: &'static str,
    pub since: Option<IidmVersion>,
    pub until: Option<IidmVersion>,
    pub renamed: Option<(&'static str, IidmVersion)>,
    pub always_written_since: Option<IidmVersion>,
}

impl<'o> Gate<'o> {
    pub const fn new(owner: &'o str, name: &'static str) -> Self {
        Self {
            owner,
            name,
            since: None,
            until: None,
            renamed: None,
            always_written_since: None,
        }
    }

    pub const fn since(mut self, version: IidmVersion) -> Self {
        self.since = Some(version);
        self
    }

    pub const fn until(mut self, version: IidmVersion) -> Self {
        self.until = Some(version);
        self
    }

    pub const fn renamed_at(mut self, new_name: &'static str, version: IidmVersion) -> Self {
        self.renamed = Some((new_name, version));
        self
    }

    pub const fn default_omitted_before(mut self, version: IidmVersion) -> Self {
        self.always_written_since = Some(version);
        self
    }

    /// Same gate reported under a concrete owner element.
    pub const fn on<'p>(self, owner: &'p str) -> Gate<'p> {
        Gate {
            owner,
            name: self.name,
            since: self.since,
            until: self.until,
            renamed: self.renamed,
            always_written_since: self.always_written_since,
        }
    }

    /// Name of the attribute or element in a document of `version`.
    pub fn wire_name(&self, version: IidmVersion) -> &'static str {
        match self.renamed {
            Some((new_name, at)) if version.is_at_least(at) => new_name,
            _ => self.name,
        }
    }

    pub fn is_supported(&self, version: IidmVersion) -> bool {
        self.since.map_or(true, |since| version.is_at_least(since))
            && self.until.map_or(true, |until| version.is_at_most(until))
    }

    /// Version-incompatibility error for this gate.
    pub fn error(&self, version: IidmVersion, violation: GateViolation) -> IidmError {
        let (op, bound) = match (self.since, self.until) {
            (Some(since), _) if version < since => (">=", since),
            (_, Some(until)) if version > until => ("<=", until),
            (Some(since), _) => (">=", since),
            (_, Some(until)) => ("<=", until),
            (None, None) => (">=", IidmVersion::V_1_0),
        };
        IidmError::UnsupportedVersion(format!(
            "{}.{} is {} for IIDM-XML version {}. IIDM-XML version should be {} {}",
            self.owner,
            self.wire_name(version),
            violation,
            version,
            op,
            bound
        ))
    }

    /// Fail when the element or attribute is not part of `version`.
    pub fn check(&self, version: IidmVersion) -> IidmResult<()> {
        if self.is_supported(version) {
            Ok(())
        } else {
            Err(self.error(version, GateViolation::NotSupported))
        }
    }

    /// Fail when a value that cannot be expressed in `version` is present.
    pub fn check_absent(&self, version: IidmVersion, present: bool) -> IidmResult<()> {
        if present && !self.is_supported(version) {
            Err(self.error(version, GateViolation::NotNullNotSupported))
        } else {
            Ok(())
        }
    }

    fn omits_default(&self, version: IidmVersion) -> bool {
        self.always_written_since
            .is_some_and(|since| version < since)
    }

    /// Write a double attribute. Outside the window only the default (or NaN) is accepted.
    pub fn write_double(
        &self,
        writer: &mut dyn TreeDataWriter,
        version: IidmVersion,
        value: f64,
        default: f64,
    ) -> IidmResult<()> {
        if !self.is_supported(version) {
            if is_default(value, default) || value.is_nan() {
                return Ok(());
            }
            let violation = if default.is_nan() {
                GateViolation::NotNullNotSupported
            } else {
                GateViolation::NotDefaultNotSupported
            };
            return Err(self.error(version, violation));
        }
        let name = self.wire_name(version);
        if self.omits_default(version) {
            writer.write_double_attribute_with_default(name, value, default)
        } else {
            writer.write_double_attribute(name, value)
        }
    }

    pub fn write_int(
        &self,
        writer: &mut dyn TreeDataWriter,
        version: IidmVersion,
        value: i32,
        default: Option<i32>,
    ) -> IidmResult<()> {
        if !self.is_supported(version) {
            return match default {
                Some(default) if value == default => Ok(()),
                Some(_) => Err(self.error(version, GateViolation::NotDefaultNotSupported)),
                None => Err(self.error(version, GateViolation::NotNullNotSupported)),
            };
        }
        if self.omits_default(version) && default == Some(value) {
            return Ok(());
        }
        writer.write_int_attribute(self.wire_name(version), value)
    }

    pub fn write_bool(
        &self,
        writer: &mut dyn TreeDataWriter,
        version: IidmVersion,
        value: bool,
        default: bool,
    ) -> IidmResult<()> {
        if !self.is_supported(version) {
            if value == default {
                return Ok(());
            }
            return Err(self.error(version, GateViolation::NotDefaultNotSupported));
        }
        if self.omits_default(version) {
            writer.write_bool_attribute_with_default(self.wire_name(version), value, default)
        } else {
            writer.write_bool_attribute(self.wire_name(version), value)
        }
    }

    pub fn write_str(
        &self,
        writer: &mut dyn TreeDataWriter,
        version: IidmVersion,
        value: Option<&str>,
    ) -> IidmResult<()> {
        let Some(value) = value else {
            return Ok(());
        };
        if !self.is_supported(version) {
            return Err(self.error(version, GateViolation::NotNullNotSupported));
        }
        writer.write_string_attribute(self.wire_name(version), value)
    }

    /// Read a double attribute, `default` when absent or outside the window.
    pub fn read_double(&self, reader: &dyn TreeDataReader, version: IidmVersion, default: f64) -> IidmResult<f64> {
        if !self.is_supported(version) {
            return Ok(default);
        }
        reader.read_double_or(self.wire_name(version), default)
    }

    /// Read a double attribute that is mandatory whenever the version supports it.
    pub fn read_required_double(&self, reader: &dyn TreeDataReader, version: IidmVersion) -> IidmResult<Option<f64>> {
        if !self.is_supported(version) {
            return Ok(None);
        }
        match reader.attribute(self.wire_name(version)) {
            Some(_) => reader.read_double(self.wire_name(version)).map(Some),
            None => Err(self.error(version, GateViolation::Mandatory)),
        }
    }

    pub fn read_int(&self, reader: &dyn TreeDataReader, version: IidmVersion) -> IidmResult<Option<i32>> {
        if !self.is_supported(version) {
            return Ok(None);
        }
        reader.read_int(self.wire_name(version))
    }

    pub fn read_bool(&self, reader: &dyn TreeDataReader, version: IidmVersion, default: bool) -> IidmResult<bool> {
        if !self.is_supported(version) {
            return Ok(default);
        }
        reader.read_bool_or(self.wire_name(version), default)
    }

    pub fn read_str(&self, reader: &dyn TreeDataReader, version: IidmVersion) -> Option<String> {
        if !self.is_supported(version) {
            return None;
        }
        reader.read_string(self.wire_name(version))
    }
}

use IidmVersion as V;

pub const FICTITIOUS: Gate = Gate::new(ANY_OWNER, "fictitious").since(V::V_1_3);
pub const ALIAS: Gate = Gate::new(ANY_OWNER, "alias").since(V::V_1_3);
pub const ALIAS_TYPE: Gate = Gate::new("alias", "type").since(V::V_1_4);

pub const MINIMUM_VALIDATION_LEVEL: Gate = Gate::new("network", "minimumValidationLevel").since(V::V_1_7);
pub const NETWORK_VOLTAGE_LEVEL: Gate = Gate::new("network", "voltageLevel").since(V::V_1_6);
pub const NETWORK_TWO_WINDINGS_TRANSFORMER: Gate = Gate::new("network", "twoWindingsTransformer").since(V::V_1_6);
pub const NETWORK_THREE_WINDINGS_TRANSFORMER: Gate = Gate::new("network", "threeWindingsTransformer").since(V::V_1_6);

pub const NODE_COUNT: Gate = Gate::new("nodeBreakerTopology", "nodeCount").until(V::V_1_1);
pub const CALCULATED_BUS: Gate = Gate::new("nodeBreakerTopology", "bus").since(V::V_1_1);
pub const FICTITIOUS_INJECTION: Gate = Gate::new("nodeBreakerTopology", "inj").since(V::V_1_8);

pub const RATED_S: Gate = Gate::new("twoWindingsTransformer", "ratedS").since(V::V_1_2);
pub const TARGET_DEADBAND: Gate = Gate::new(ANY_OWNER, "targetDeadband").default_omitted_before(V::V_1_2);

pub const RATED_U0: Gate = Gate::new("threeWindingsTransformer", "ratedU0").since(V::V_1_1);
pub const LEG_G: [Gate; 3] = [
    Gate::new("threeWindingsTransformer", "g1"),
    Gate::new("threeWindingsTransformer", "g2").since(V::V_1_1),
    Gate::new("threeWindingsTransformer", "g3").since(V::V_1_1),
];
pub const LEG_B: [Gate; 3] = [
    Gate::new("threeWindingsTransformer", "b1"),
    Gate::new("threeWindingsTransformer", "b2").since(V::V_1_1),
    Gate::new("threeWindingsTransformer", "b3").since(V::V_1_1),
];
pub const LEG_RATED_S: [Gate; 3] = [
    Gate::new("threeWindingsTransformer", "ratedS1").since(V::V_1_2),
    Gate::new("threeWindingsTransformer", "ratedS2").since(V::V_1_2),
    Gate::new("threeWindingsTransformer", "ratedS3").since(V::V_1_2),
];
pub const LEG_RATIO_TAP_CHANGER: [Gate; 3] = [
    Gate::new("threeWindingsTransformer", "ratioTapChanger1").since(V::V_1_1),
    Gate::new("threeWindingsTransformer", "ratioTapChanger2"),
    Gate::new("threeWindingsTransformer", "ratioTapChanger3"),
];
pub const LEG_PHASE_TAP_CHANGER: [Gate; 3] = [
    Gate::new("threeWindingsTransformer", "phaseTapChanger1").since(V::V_1_1),
    Gate::new("threeWindingsTransformer", "phaseTapChanger2").since(V::V_1_1),
    Gate::new("threeWindingsTransformer", "phaseTapChanger3").since(V::V_1_1),
];

pub const SHUNT_SECTION_COUNT: Gate =
    Gate::new("shunt", "currentSectionCount").renamed_at("sectionCount", V::V_1_3);
pub const SHUNT_LINEAR_MODEL: Gate = Gate::new("shunt", "shuntLinearModel").since(V::V_1_3);
pub const SHUNT_NON_LINEAR_MODEL: Gate = Gate::new("shunt", "shuntNonLinearModel").since(V::V_1_3);
pub const SHUNT_B_PER_SECTION: Gate = Gate::new("shunt", "bPerSection").until(V::V_1_2);
pub const SHUNT_MAXIMUM_SECTION_COUNT: Gate = Gate::new("shunt", "maximumSectionCount").until(V::V_1_2);
pub const SHUNT_VOLTAGE_REGULATOR_ON: Gate = Gate::new("shunt", "voltageRegulatorOn").since(V::V_1_2);
pub const SHUNT_TARGET_V: Gate = Gate::new("shunt", "targetV").since(V::V_1_2);
pub const SHUNT_TARGET_DEADBAND: Gate = Gate::new("shunt", "targetDeadband").since(V::V_1_2);
pub const SHUNT_REGULATING_TERMINAL: Gate = Gate::new("shunt", "regulatingTerminal").since(V::V_1_2);

pub const SVC_VOLTAGE_SETPOINT: Gate =
    Gate::new("staticVarCompensator", "voltageSetPoint").renamed_at("voltageSetpoint", V::V_1_3);
pub const SVC_REACTIVE_POWER_SETPOINT: Gate =
    Gate::new("staticVarCompensator", "reactivePowerSetPoint").renamed_at("reactivePowerSetpoint", V::V_1_3);

pub const BATTERY_TARGET_P: Gate = Gate::new("battery", "p0").renamed_at("targetP", V::V_1_8);
pub const BATTERY_TARGET_Q: Gate = Gate::new("battery", "q0").renamed_at("targetQ", V::V_1_8);

pub const DANGLING_LINE_GENERATION: Gate = Gate::new("danglingLine", "generation").since(V::V_1_3);
pub const PAIRING_KEY: Gate = Gate::new("danglingLine", "ucteXnodeCode").renamed_at("pairingKey", V::V_1_11);
pub const TIE_LINE_DANGLING_LINES: Gate = Gate::new("network", "tieLineDanglingLine").since(V::V_1_10);

pub const ACTIVE_POWER_LIMITS: Gate = Gate::new(ANY_OWNER, "activePowerLimits").since(V::V_1_5);
pub const APPARENT_POWER_LIMITS: Gate = Gate::new(ANY_OWNER, "apparentPowerLimits").since(V::V_1_5);
pub const OPERATIONAL_LIMITS_GROUP: Gate = Gate::new(ANY_OWNER, "operationalLimitsGroup").since(V::V_1_12);
pub const SELECTED_OPERATIONAL_LIMITS_GROUP_ID: Gate =
    Gate::new(ANY_OWNER, "selectedOperationalLimitsGroupId").since(V::V_1_12);

pub const TIE_LINE_HALF: Gate = Gate::new("tieLine", "id_1").until(V::V_1_9);
pub const TIE_LINE_XNODE_POWER: Gate = Gate::new("tieLine", "xnodeP_1").until(V::V_1_4);
pub const TIE_LINE_HALF_FICTITIOUS: Gate = Gate::new("tieLine", "fictitious_1").since(V::V_1_3).until(V::V_1_9);
pub const TIE_LINE_DANGLING_LINE_ID: Gate = Gate::new("tieLine", "danglingLineId1").since(V::V_1_10);
/// Dangling line content a legacy tie line half has no attribute for.
pub const TIE_LINE_HALF_GENERATION: [Gate; 2] = [
    Gate::new("tieLine", "generation_1").since(V::V_1_10),
    Gate::new("tieLine", "generation_2").since(V::V_1_10),
];
pub const TIE_LINE_HALF_P0: [Gate; 2] = [
    Gate::new("tieLine", "p0_1").since(V::V_1_10),
    Gate::new("tieLine", "p0_2").since(V::V_1_10),
];
pub const TIE_LINE_HALF_Q0: [Gate; 2] = [
    Gate::new("tieLine", "q0_1").since(V::V_1_10),
    Gate::new("tieLine", "q0_2").since(V::V_1_10),
];
pub const TIE_LINE_HALF_ALIAS: [Gate; 2] = [
    Gate::new("tieLine", "alias_1").since(V::V_1_10),
    Gate::new("tieLine", "alias_2").since(V::V_1_10),
];
pub const TIE_LINE_HALF_PROPERTY: [Gate; 2] = [
    Gate::new("tieLine", "property_1").since(V::V_1_10),
    Gate::new("tieLine", "property_2").since(V::V_1_10),
];

pub const RATIO_TARGET_V: Gate = Gate::new("ratioTapChanger", "targetV").until(V::V_1_11);
pub const RATIO_REGULATION_MODE: Gate = Gate::new("ratioTapChanger", "regulationMode").since(V::V_1_12);
pub const RATIO_REGULATION_VALUE: Gate = Gate::new("ratioTapChanger", "regulationValue").since(V::V_1_12);

/// Every gate, for the structural validator.
pub const ALL: &[Gate] = &[
    FICTITIOUS,
    ALIAS,
    ALIAS_TYPE,
    MINIMUM_VALIDATION_LEVEL,
    NETWORK_VOLTAGE_LEVEL,
    NETWORK_TWO_WINDINGS_TRANSFORMER,
    NETWORK_THREE_WINDINGS_TRANSFORMER,
    NODE_COUNT,
    CALCULATED_BUS,
    FICTITIOUS_INJECTION,
    RATED_S,
    TARGET_DEADBAND,
    RATED_U0,
    LEG_G[1],
    LEG_G[2],
    LEG_B[1],
    LEG_B[2],
    LEG_RATED_S[0],
    LEG_RATED_S[1],
    LEG_RATED_S[2],
    LEG_RATIO_TAP_CHANGER[0],
    LEG_PHASE_TAP_CHANGER[0],
    LEG_PHASE_TAP_CHANGER[1],
    LEG_PHASE_TAP_CHANGER[2],
    SHUNT_SECTION_COUNT,
    SHUNT_LINEAR_MODEL,
    SHUNT_NON_LINEAR_MODEL,
    SHUNT_B_PER_SECTION,
    SHUNT_MAXIMUM_SECTION_COUNT,
    SHUNT_VOLTAGE_REGULATOR_ON,
    SHUNT_TARGET_V,
    SHUNT_TARGET_DEADBAND,
    SHUNT_REGULATING_TERMINAL,
    SVC_VOLTAGE_SETPOINT,
    SVC_REACTIVE_POWER_SETPOINT,
    BATTERY_TARGET_P,
    BATTERY_TARGET_Q,
    DANGLING_LINE_GENERATION,
    PAIRING_KEY,
    ACTIVE_POWER_LIMITS,
    APPARENT_POWER_LIMITS,
    OPERATIONAL_LIMITS_GROUP,
    SELECTED_OPERATIONAL_LIMITS_GROUP_ID,
    TIE_LINE_HALF,
    TIE_LINE_XNODE_POWER,
    TIE_LINE_HALF_FICTITIOUS,
    TIE_LINE_DANGLING_LINE_ID,
    RATIO_TARGET_V,
    RATIO_REGULATION_MODE,
    RATIO_REGULATION_VALUE,
];

/// Gate matching a document name under `owner`, either by its old or its new wire name.
pub fn find(owner: &str, name: &str) -> Option<&'static Gate<'static>> {
    ALL.iter().find(|gate| {
        (gate.owner == owner || gate.owner == ANY_OWNER)
            && (gate.name == name || gate.renamed.is_some_and(|(new_name, _)| new_name == name))
    })
}
