//! Export and import options
//!
//! Both structs deserialize from partial TOML/JSON tables (`#[serde(default)]`), which is how
//! the CLI configuration file feeds them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use iidm_core::{IidmError, TopologyKind};
use serde::{Deserialize, Serialize};

use crate::tree::TreeDataFormat;
use crate::version::IidmVersion;

/// Requested topological detail of an export, from most to least detailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyLevel {
    BusBranch,
    BusBreaker,
    #[default]
    NodeBreaker,
}

impl TopologyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyLevel::NodeBreaker => "NODE_BREAKER",
            TopologyLevel::BusBreaker => "BUS_BREAKER",
            TopologyLevel::BusBranch => "BUS_BRANCH",
        }
    }

    /// Level a voltage level of native `kind` is exported at.
    pub fn effective(self, kind: TopologyKind) -> TopologyLevel {
        let native = match kind {
            TopologyKind::NodeBreaker => TopologyLevel::NodeBreaker,
            TopologyKind::BusBreaker => TopologyLevel::BusBreaker,
        };
        self.min(native)
    }

    /// Topology kind written in the document for this level.
    pub fn written_kind(self) -> TopologyKind {
        match self {
            TopologyLevel::NodeBreaker => TopologyKind::NodeBreaker,
            TopologyLevel::BusBreaker | TopologyLevel::BusBranch => TopologyKind::BusBreaker,
        }
    }
}

impl fmt::Display for TopologyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopologyLevel {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "NODE_BREAKER" => Ok(TopologyLevel::NodeBreaker),
            "BUS_BREAKER" => Ok(TopologyLevel::BusBreaker),
            "BUS_BRANCH" => Ok(TopologyLevel::BusBranch),
            other => Err(IidmError::Config(format!("unknown topology level '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub indent: bool,
    pub with_branch_state_variables: bool,
    pub only_main_connected_component: bool,
    pub anonymized: bool,
    pub skip_extensions: bool,
    pub topology_level: TopologyLevel,
    pub throw_if_extension_not_found: bool,
    /// Identifiables by id, extensions by name, temporary limits by name
    pub sorted: bool,
    /// Extension names to write; all when `None`
    pub extensions: Option<BTreeSet<String>>,
    pub version: IidmVersion,
    pub format: TreeDataFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            indent: true,
            with_branch_state_variables: true,
            only_main_connected_component: false,
            anonymized: false,
            skip_extensions: false,
            topology_level: TopologyLevel::default(),
            throw_if_extension_not_found: false,
            sorted: false,
            extensions: None,
            version: IidmVersion::CURRENT,
            format: TreeDataFormat::default(),
        }
    }
}

impl ExportOptions {
    pub fn with_version(mut self, version: IidmVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_format(mut self, format: TreeDataFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_topology_level(mut self, level: TopologyLevel) -> Self {
        self.topology_level = level;
        self
    }

    pub fn with_anonymized(mut self, anonymized: bool) -> Self {
        self.anonymized = anonymized;
        self
    }

    pub fn with_only_main_connected_component(mut self, only: bool) -> Self {
        self.only_main_connected_component = only;
        self
    }

    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Whether extension `name` is written.
    pub fn includes_extension(&self, name: &str) -> bool {
        !self.skip_extensions && self.extensions.as_ref().map_or(true, |set| set.contains(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub throw_if_extension_not_found: bool,
    pub skip_extensions: bool,
    /// Extension names to read; all when `None`
    pub extensions: Option<BTreeSet<String>>,
    /// Forced encoding; detected from the file extension when `None`
    pub format: Option<TreeDataFormat>,
}

impl ImportOptions {
    pub fn with_throw_if_extension_not_found(mut self, throw: bool) -> Self {
        self.throw_if_extension_not_found = throw;
        self
    }

    pub fn with_format(mut self, format: TreeDataFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn includes_extension(&self, name: &str) -> bool {
        !self.skip_extensions && self.extensions.as_ref().map_or(true, |set| set.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level_is_min() {
        assert_eq!(
            TopologyLevel::NodeBreaker.effective(TopologyKind::BusBreaker),
            TopologyLevel::BusBreaker
        );
        assert_eq!(
            TopologyLevel::BusBranch.effective(TopologyKind::NodeBreaker),
            TopologyLevel::BusBranch
        );
        assert_eq!(TopologyLevel::BusBranch.written_kind(), TopologyKind::BusBreaker);
    }

    #[test]
    fn test_partial_options_from_json() {
        let options: ExportOptions =
            serde_json::from_str(r#"{"topology_level":"BUS_BRANCH","version":"1.5","sorted":true}"#)
                .expect("options");
        assert_eq!(options.topology_level, TopologyLevel::BusBranch);
        assert_eq!(options.version, IidmVersion::V_1_5);
        assert!(options.indent);
        assert!(options.with_branch_state_variables);
    }

    #[test]
    fn test_extension_filter() {
        let mut options = ExportOptions::default();
        assert!(options.includes_extension("activePowerControl"));
        options.extensions = Some(["busbarSectionPosition".to_string()].into_iter().collect());
        assert!(!options.includes_extension("activePowerControl"));
        options.skip_extensions = true;
        assert!(!options.includes_extension("busbarSectionPosition"));
    }
}
