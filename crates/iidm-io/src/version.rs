//! Supported IIDM schema versions.

use std::fmt;
use std::str::FromStr;

use iidm_core::{IidmError, IidmResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NAMESPACE_BASE: &str = "http://www.powsybl.org/schema/iidm/";
const EQUIPMENT_NAMESPACE_BASE: &str = "http://www.powsybl.org/schema/iidm/equipment/";

/// Schema version, totally ordered by (major, minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IidmVersion {
    major: u8,
    minor: u8,
}

impl IidmVersion {
    pub const V_1_0: IidmVersion = IidmVersion::new(1, 0);
    pub const V_1_1: IidmVersion = IidmVersion::new(1, 1);
    pub const V_1_2: IidmVersion = IidmVersion::new(1, 2);
    pub const V_1_3: IidmVersion = IidmVersion::new(1, 3);
    pub const V_1_4: IidmVersion = IidmVersion::new(1, 4);
    pub const V_1_5: IidmVersion = IidmVersion::new(1, 5);
    pub const V_1_6: IidmVersion = IidmVersion::new(1, 6);
    pub const V_1_7: IidmVersion = IidmVersion::new(1, 7);
    pub const V_1_8: IidmVersion = IidmVersion::new(1, 8);
    pub const V_1_9: IidmVersion = IidmVersion::new(1, 9);
    pub const V_1_10: IidmVersion = IidmVersion::new(1, 10);
    pub const V_1_11: IidmVersion = IidmVersion::new(1, 11);
    pub const V_1_12: IidmVersion = IidmVersion::new(1, 12);

    pub const CURRENT: IidmVersion = IidmVersion::V_1_12;

    pub const ALL: [IidmVersion; 13] = [
        IidmVersion::V_1_0,
        IidmVersion::V_1_1,
        IidmVersion::V_1_2,
        IidmVersion::V_1_3,
        IidmVersion::V_1_4,
        IidmVersion::V_1_5,
        IidmVersion::V_1_6,
        IidmVersion::V_1_7,
        IidmVersion::V_1_8,
        IidmVersion::V_1_9,
        IidmVersion::V_1_10,
        IidmVersion::V_1_11,
        IidmVersion::V_1_12,
    ];

    const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn is_at_least(&self, other: IidmVersion) -> bool {
        *self >= other
    }

    pub fn is_at_most(&self, other: IidmVersion) -> bool {
        *self <= other
    }

    /// Whether an equipment-only namespace exists for this version.
    pub fn supports_equipment_validation_level(&self) -> bool {
        self.is_at_least(IidmVersion::V_1_7)
    }

    /// `1_12` style token used in namespaces and schema names.
    pub fn underscored(&self) -> String {
        format!("{}_{}", self.major, self.minor)
    }

    /// Namespace URI; `valid == false` selects the equipment-only variant when available.
    pub fn namespace_uri(&self, valid: bool) -> String {
        if !valid && self.supports_equipment_validation_level() {
            format!("{EQUIPMENT_NAMESPACE_BASE}{}", self.underscored())
        } else {
            format!("{NAMESPACE_BASE}{}", self.underscored())
        }
    }

    pub fn schema_name(&self, valid: bool) -> String {
        if !valid && self.supports_equipment_validation_level() {
            format!("iidm_equipment_V{}.xsd", self.underscored())
        } else {
            format!("iidm_V{}.xsd", self.underscored())
        }
    }

    /// Version designated by a namespace URI, along with whether it is the equipment-only variant.
    pub fn from_namespace_uri(uri: &str) -> IidmResult<(IidmVersion, bool)> {
        let (token, equipment) = if let Some(rest) = uri.strip_prefix(EQUIPMENT_NAMESPACE_BASE) {
            (rest, true)
        } else if let Some(rest) = uri.strip_prefix(NAMESPACE_BASE) {
            (rest, false)
        } else {
            return Err(IidmError::Parse(format!("namespace '{uri}' is not an IIDM namespace")));
        };
        let version = token.replace('_', ".").parse::<IidmVersion>()?;
        if equipment && !version.supports_equipment_validation_level() {
            return Err(IidmError::UnsupportedVersion(format!(
                "equipment namespace is not supported for IIDM-XML version {version}"
            )));
        }
        Ok((version, equipment))
    }
}

impl Default for IidmVersion {
    fn default() -> Self {
        IidmVersion::CURRENT
    }
}

impl fmt::Display for IidmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for IidmVersion {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IidmVersion::ALL
            .into_iter()
            .find(|v| v.to_string() == s.trim())
            .ok_or_else(|| IidmError::UnsupportedVersion(format!("IIDM version '{s}' is not supported")))
    }
}

impl Serialize for IidmVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IidmVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ordered() {
        assert!(IidmVersion::V_1_10 > IidmVersion::V_1_9);
        assert!(IidmVersion::V_1_2.is_at_least(IidmVersion::V_1_2));
        assert!(IidmVersion::V_1_1.is_at_most(IidmVersion::V_1_2));
        assert_eq!(IidmVersion::CURRENT, IidmVersion::V_1_12);
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(
            IidmVersion::V_1_12.namespace_uri(true),
            "http://www.powsybl.org/schema/iidm/1_12"
        );
        assert_eq!(
            IidmVersion::V_1_8.namespace_uri(false),
            "http://www.powsybl.org/schema/iidm/equipment/1_8"
        );
        // no equipment variant before 1.7
        assert_eq!(
            IidmVersion::V_1_6.namespace_uri(false),
            "http://www.powsybl.org/schema/iidm/1_6"
        );
        assert_eq!(IidmVersion::V_1_3.schema_name(true), "iidm_V1_3.xsd");
    }

    #[test]
    fn test_parse_from_namespace() {
        let (version, equipment) =
            IidmVersion::from_namespace_uri("http://www.powsybl.org/schema/iidm/equipment/1_10").expect("namespace");
        assert_eq!(version, IidmVersion::V_1_10);
        assert!(equipment);
        assert!(IidmVersion::from_namespace_uri("http://example.com/1_0").is_err());
        assert!("1.13".parse::<IidmVersion>().is_err());
    }
}
