//! Structural validation of IIDM documents
//!
//! A document is checked against a table of [`ElementRule`]s: which children an element
//! accepts and which attributes it requires. Version windows come from the gating table,
//! so an attribute or element used outside its window is reported with the same rule the
//! codecs apply. Extension elements are checked against the rule supplied by their
//! registered codec.
//!
//! Validation walks the whole document and collects every violation before failing with
//! [`IidmError::StructuralValidation`]. Malformed input (broken XML, invalid JSON) still
//! fails immediately with a parse error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use iidm_core::{IidmError, IidmResult, Violation};

use crate::extensions::ExtensionRegistry;
use crate::gating::{self, Gate, ANY_OWNER};
use crate::tree::{self, TreeDataFormat, TreeDataReader};
use crate::version::IidmVersion;

const ROOT: &str = "network";
const EXTENSION: &str = "extension";
const IDENTIFIABLE_CHILDREN: [&str; 2] = ["alias", "property"];

/// Families whose element (or attribute) name carries a side suffix `1`..`3`.
const SIDE_SUFFIXED: [&str; 7] = [
    "currentLimits",
    "activePowerLimits",
    "apparentPowerLimits",
    "operationalLimitsGroup",
    "ratioTapChanger",
    "phaseTapChanger",
    "selectedOperationalLimitsGroupId",
];

/// Structural rule of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRule {
    pub name: &'static str,
    pub required: &'static [&'static str],
    pub children: &'static [&'static str],
    /// Accepts aliases and properties and carries the generic identifiable attributes
    pub identifiable: bool,
}

impl ElementRule {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            required: &[],
            children: &[],
            identifiable: false,
        }
    }

    pub const fn with_required(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }

    pub const fn with_children(mut self, children: &'static [&'static str]) -> Self {
        self.children = children;
        self
    }

    pub const fn identifiable(mut self) -> Self {
        self.identifiable = true;
        self
    }

    pub fn allows_child(&self, name: &str) -> bool {
        let base = base_name(name);
        self.children.contains(&base) || (self.identifiable && IDENTIFIABLE_CHILDREN.contains(&name))
    }
}

const LIMITS: [&str; 4] = [
    "currentLimits",
    "activePowerLimits",
    "apparentPowerLimits",
    "operationalLimitsGroup",
];
const REACTIVE_LIMITS: [&str; 2] = ["minMaxReactiveLimits", "reactiveCapabilityCurve"];

/// Rules of the network schema, keyed by element name without side suffix.
pub static RULES: &[ElementRule] = &[
    ElementRule::new(ROOT)
        .with_required(&["id", "caseDate", "sourceFormat"])
        .with_children(&[
            "substation",
            "voltageLevel",
            "twoWindingsTransformer",
            "threeWindingsTransformer",
            "line",
            "tieLine",
            "hvdcLine",
            EXTENSION,
        ])
        .identifiable(),
    ElementRule::new("substation")
        .with_required(&["id"])
        .with_children(&["voltageLevel", "twoWindingsTransformer", "threeWindingsTransformer"])
        .identifiable(),
    ElementRule::new("voltageLevel")
        .with_required(&["id", "nominalV", "topologyKind"])
        .with_children(&[
            "nodeBreakerTopology",
            "busBreakerTopology",
            "generator",
            "battery",
            "load",
            "shunt",
            "staticVarCompensator",
            "danglingLine",
            "vscConverterStation",
            "lccConverterStation",
        ])
        .identifiable(),
    ElementRule::new("nodeBreakerTopology").with_children(&["busbarSection", "switch", "internalConnection", "bus", "inj"]),
    ElementRule::new("busBreakerTopology").with_children(&["bus", "switch"]),
    ElementRule::new("busbarSection").with_required(&["id", "node"]).identifiable(),
    ElementRule::new("switch").with_required(&["id", "kind"]).identifiable(),
    ElementRule::new("internalConnection").with_required(&["node1", "node2"]),
    // configured buses carry an id, calculated node/breaker buses do not
    ElementRule::new("bus").identifiable(),
    ElementRule::new("inj").with_required(&["node"]),
    ElementRule::new("generator")
        .with_required(&["id"])
        .with_children(&["regulatingTerminal", "minMaxReactiveLimits", "reactiveCapabilityCurve"])
        .identifiable(),
    ElementRule::new("battery")
        .with_required(&["id"])
        .with_children(&REACTIVE_LIMITS)
        .identifiable(),
    ElementRule::new("load").with_required(&["id"]).identifiable(),
    ElementRule::new("shunt")
        .with_required(&["id"])
        .with_children(&["shuntLinearModel", "shuntNonLinearModel", "regulatingTerminal"])
        .identifiable(),
    ElementRule::new("shuntLinearModel").with_required(&["bPerSection"]),
    ElementRule::new("shuntNonLinearModel").with_children(&["section"]),
    ElementRule::new("section").with_required(&["b"]),
    ElementRule::new("staticVarCompensator")
        .with_required(&["id"])
        .with_children(&["regulatingTerminal"])
        .identifiable(),
    ElementRule::new("danglingLine")
        .with_required(&["id"])
        .with_children(&[
            "generation",
            "currentLimits",
            "activePowerLimits",
            "apparentPowerLimits",
            "operationalLimitsGroup",
        ])
        .identifiable(),
    ElementRule::new("generation").with_children(&REACTIVE_LIMITS),
    ElementRule::new("vscConverterStation")
        .with_required(&["id"])
        .with_children(&REACTIVE_LIMITS)
        .identifiable(),
    ElementRule::new("lccConverterStation").with_required(&["id"]).identifiable(),
    ElementRule::new("line")
        .with_required(&["id"])
        .with_children(&LIMITS)
        .identifiable(),
    ElementRule::new("twoWindingsTransformer")
        .with_required(&["id"])
        .with_children(&[
            "ratioTapChanger",
            "phaseTapChanger",
            "currentLimits",
            "activePowerLimits",
            "apparentPowerLimits",
            "operationalLimitsGroup",
        ])
        .identifiable(),
    ElementRule::new("threeWindingsTransformer")
        .with_required(&["id"])
        .with_children(&[
            "ratioTapChanger",
            "phaseTapChanger",
            "currentLimits",
            "activePowerLimits",
            "apparentPowerLimits",
            "operationalLimitsGroup",
        ])
        .identifiable(),
    ElementRule::new("ratioTapChanger")
        .with_required(&["lowTapPosition", "tapPosition"])
        .with_children(&["step", "terminalRef"]),
    ElementRule::new("phaseTapChanger")
        .with_required(&["lowTapPosition", "tapPosition", "regulationMode"])
        .with_children(&["step", "terminalRef"]),
    ElementRule::new("step"),
    ElementRule::new("terminalRef").with_required(&["id"]),
    ElementRule::new("regulatingTerminal").with_required(&["id"]),
    ElementRule::new("minMaxReactiveLimits"),
    ElementRule::new("reactiveCapabilityCurve").with_children(&["point"]),
    ElementRule::new("point").with_required(&["p"]),
    ElementRule::new("currentLimits").with_children(&["temporaryLimit"]),
    ElementRule::new("activePowerLimits").with_children(&["temporaryLimit"]),
    ElementRule::new("apparentPowerLimits").with_children(&["temporaryLimit"]),
    ElementRule::new("temporaryLimit").with_required(&["name"]),
    ElementRule::new("operationalLimitsGroup")
        .with_required(&["id"])
        .with_children(&["currentLimits", "activePowerLimits", "apparentPowerLimits"]),
    ElementRule::new("tieLine")
        .with_required(&["id"])
        .with_children(&["currentLimits", "activePowerLimits", "apparentPowerLimits"])
        .identifiable(),
    ElementRule::new("hvdcLine")
        .with_required(&["id", "convertersMode", "converterStation1", "converterStation2"])
        .identifiable(),
    ElementRule::new(EXTENSION).with_required(&["id"]),
    ElementRule::new("alias"),
    ElementRule::new("property").with_required(&["name", "value"]),
];

/// Name with its side suffix removed, for the families in [`SIDE_SUFFIXED`].
fn base_name(name: &str) -> &str {
    match name.strip_suffix(|c: char| matches!(c, '1'..='3')) {
        Some(base) if SIDE_SUFFIXED.contains(&base) => base,
        _ => name,
    }
}

pub fn rule_of(name: &str) -> Option<&'static ElementRule> {
    let base = base_name(name);
    RULES.iter().find(|rule| rule.name == base)
}

/// Whether `name`, matched by `gate`, is valid in `version`.
fn gate_allows(gate: &Gate<'_>, name: &str, version: IidmVersion) -> bool {
    if !gate.is_supported(version) {
        return false;
    }
    match gate.renamed {
        Some((new_name, at)) if name == new_name => version.is_at_least(at),
        Some((_, at)) => version < at,
        None => true,
    }
}

fn find_gate(owner: &str, name: &str) -> Option<&'static Gate<'static>> {
    gating::find(owner, name).or_else(|| {
        let base = base_name(name);
        (base != name).then(|| gating::find(owner, base)).flatten()
    })
}

struct Validator<'r> {
    registry: &'r ExtensionRegistry,
    version: IidmVersion,
    namespace: Option<String>,
    violations: Vec<Violation>,
}

impl Validator<'_> {
    fn report(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn check_attributes(&mut self, reader: &dyn TreeDataReader, rule: &ElementRule, path: &str) {
        for required in rule.required {
            if reader.attribute(required).is_none() {
                self.report(path, format!("missing attribute '{required}'"));
            }
        }
        for name in reader.attribute_names() {
            let Some(gate) = find_gate(rule.name, &name) else {
                continue;
            };
            // generic gates only concern identifiables, e.g. temporary limits have their own `fictitious`
            if gate.owner == ANY_OWNER && !rule.identifiable {
                continue;
            }
            if !gate_allows(gate, &name, self.version) {
                self.report(
                    path,
                    format!("attribute '{name}' is not allowed in IIDM version {}", self.version),
                );
            }
        }
    }

    fn check_node(&mut self, reader: &mut dyn TreeDataReader, rule: &ElementRule, path: &str) -> IidmResult<()> {
        self.check_attributes(reader, rule, path);
        while let Some(child) = reader.next_child()? {
            let child_path = match reader.attribute("id") {
                Some(id) => format!("{path}/{child}[{id}]"),
                None => format!("{path}/{child}"),
            };
            if rule.name == EXTENSION {
                self.check_extension(reader, &child, &child_path)?;
                continue;
            }
            if !rule.allows_child(&child) {
                self.report(&child_path, format!("unexpected element '{child}' in '{}'", rule.name));
                reader.skip_node()?;
                continue;
            }
            if let Some(gate) = find_gate(rule.name, &child) {
                if !gate_allows(gate, &child, self.version) {
                    self.report(
                        &child_path,
                        format!("element '{child}' is not allowed in IIDM version {}", self.version),
                    );
                }
            }
            if let Some(actual) = reader.namespace() {
                if self.namespace.as_deref().is_some_and(|expected| expected != actual) {
                    let message = format!("element '{child}' is in namespace '{actual}'");
                    self.report(&child_path, message);
                }
            }
            match rule_of(&child) {
                Some(child_rule) => self.check_node(reader, child_rule, &child_path)?,
                None => reader.skip_node()?,
            }
        }
        Ok(())
    }

    fn check_extension(&mut self, reader: &mut dyn TreeDataReader, name: &str, path: &str) -> IidmResult<()> {
        let registry = self.registry;
        let Some(serde) = registry.find(name) else {
            self.report(path, format!("no schema registered for extension '{name}'"));
            return reader.skip_node();
        };
        if let Some(actual) = reader.namespace() {
            if actual != serde.namespace_uri() {
                let message = format!(
                    "extension '{name}' is in namespace '{actual}', expected '{}'",
                    serde.namespace_uri()
                );
                self.report(path, message);
            }
        }
        let rule = serde.element_rule();
        for required in rule.required {
            if reader.attribute(required).is_none() {
                self.report(path, format!("missing attribute '{required}'"));
            }
        }
        while let Some(child) = reader.next_child()? {
            if !rule.children.contains(&child.as_str()) {
                self.report(path, format!("unexpected element '{child}' in extension '{name}'"));
            }
            reader.skip_node()?;
        }
        Ok(())
    }
}

/// Validate a document against the schema of the version it declares and the rules of the
/// extensions registered in `registry`.
pub fn validate<R: BufRead>(input: R, format: TreeDataFormat, registry: &ExtensionRegistry) -> IidmResult<()> {
    let mut reader = tree::reader(format, input)?;
    let root = reader.read_root()?;
    if root.name != ROOT {
        return Err(IidmError::StructuralValidation(vec![Violation {
            path: root.name.clone(),
            message: format!("root element must be '{ROOT}'"),
        }]));
    }
    let (version, _) = crate::network::document_version(&root).map_err(|e| {
        IidmError::StructuralValidation(vec![Violation {
            path: ROOT.to_string(),
            message: e.to_string(),
        }])
    })?;
    let namespace = root.namespace.clone();
    tracing::debug!(%version, ?format, "validating document");

    let mut validator = Validator {
        registry,
        version,
        namespace,
        violations: Vec::new(),
    };
    let rule = rule_of(ROOT).ok_or_else(|| IidmError::Other("no rule for the network element".into()))?;
    validator.check_node(reader.as_mut(), rule, ROOT)?;
    if validator.violations.is_empty() {
        Ok(())
    } else {
        Err(IidmError::StructuralValidation(validator.violations))
    }
}

/// [`validate`] a file, with the encoding detected from its extension or content.
pub fn validate_path(path: &Path, registry: &ExtensionRegistry) -> IidmResult<()> {
    let format = crate::network::detect_format(path)?;
    let file = File::open(path)?;
    validate(BufReader::new(file), format, registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_1_7: &str = "http://www.powsybl.org/schema/iidm/1_7";

    fn violations(text: &str, format: TreeDataFormat) -> Vec<Violation> {
        match validate(text.as_bytes(), format, &ExtensionRegistry::default()) {
            Ok(()) => Vec::new(),
            Err(IidmError::StructuralValidation(violations)) => violations,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_document() {
        let xml = format!(
            r#"<iidm:network xmlns:iidm="{NS_1_7}" id="n" caseDate="2024-01-01T00:00:00.000+01:00" forecastDistance="0" sourceFormat="test">
                <iidm:substation id="S1" country="FR">
                    <iidm:voltageLevel id="VL1" nominalV="400" topologyKind="BUS_BREAKER">
                        <iidm:busBreakerTopology><iidm:bus id="B1"/></iidm:busBreakerTopology>
                        <iidm:battery id="BAT" p0="1" q0="0" minP="0" maxP="2" bus="B1" connectableBus="B1"/>
                    </iidm:voltageLevel>
                </iidm:substation>
            </iidm:network>"#
        );
        assert!(violations(&xml, TreeDataFormat::Xml).is_empty());
    }

    #[test]
    fn test_collects_every_violation() {
        let xml = format!(
            r#"<iidm:network xmlns:iidm="{NS_1_7}" id="n" caseDate="2024-01-01T00:00:00.000+01:00" sourceFormat="test">
                <iidm:substation>
                    <iidm:voltageLevel id="VL1" nominalV="400" topologyKind="BUS_BREAKER">
                        <iidm:battery id="BAT" targetP="1" targetQ="0" bus="B1" connectableBus="B1"/>
                        <iidm:bogus/>
                    </iidm:voltageLevel>
                </iidm:substation>
            </iidm:network>"#
        );
        let found = violations(&xml, TreeDataFormat::Xml);
        let messages: Vec<String> = found.iter().map(ToString::to_string).collect();
        assert_eq!(found.len(), 4, "{messages:?}");
        assert!(messages[0].contains("missing attribute 'id'"));
        assert!(messages.iter().any(|m| m.contains("attribute 'targetP' is not allowed")));
        assert!(messages.iter().any(|m| m.contains("unexpected element 'bogus'")));
    }

    #[test]
    fn test_gated_child_element() {
        let ns = "http://www.powsybl.org/schema/iidm/1_5";
        let xml = format!(
            r#"<network xmlns="{ns}" id="n" caseDate="2024-01-01T00:00:00Z" sourceFormat="t">
                <voltageLevel id="VL" nominalV="1" topologyKind="NODE_BREAKER"><nodeBreakerTopology/></voltageLevel>
            </network>"#
        );
        let found = violations(&xml, TreeDataFormat::Xml);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "network/voltageLevel[VL]");
    }

    #[test]
    fn test_json_and_extensions() {
        let json = r#"{"version":"1.12","id":"n","caseDate":"2024-01-01T00:00:00Z","sourceFormat":"t",
            "extensions":[
                {"id":"G1","activePowerControl":{"participate":true}},
                {"id":"G2","unknownThing":{"a":"b"}}
            ]}"#;
        let found = violations(json, TreeDataFormat::Json);
        let messages: Vec<String> = found.iter().map(|v| v.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "missing attribute 'droop'".to_string(),
                "no schema registered for extension 'unknownThing'".to_string(),
            ]
        );
    }

    #[test]
    fn test_base_names() {
        assert_eq!(base_name("currentLimits2"), "currentLimits");
        assert_eq!(base_name("ratioTapChanger3"), "ratioTapChanger");
        assert_eq!(base_name("node1"), "node1");
        assert!(rule_of("operationalLimitsGroup1").is_some());
    }
}
