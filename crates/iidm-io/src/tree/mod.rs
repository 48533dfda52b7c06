//! Tree data primitives shared by the XML and JSON encodings.
//!
//! Codecs only talk to [`TreeDataWriter`] and [`TreeDataReader`], so the same entity code
//! produces and consumes both encodings.
//!
//! Reading is a forward cursor over nested nodes. [`TreeDataReader::next_child`] enters
//! the next child of the current node and returns its name, or leaves the current node
//! and returns `None` once it has no more children. Every child that was entered must be
//! finished the same way (or with [`TreeDataReader::skip_node`]) before its parent
//! continues.

use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use iidm_core::{IidmError, IidmResult};
use serde::{Deserialize, Serialize};

use crate::version::IidmVersion;

pub mod json;
pub mod xml;

pub use json::{JsonTreeReader, JsonTreeWriter};
pub use xml::{XmlTreeReader, XmlTreeWriter};

/// Elements that repeat under one parent, with the array key used by the JSON encoding.
pub const ARRAY_ELEMENTS: &[(&str, &str)] = &[
    ("alias", "aliases"),
    ("property", "properties"),
    ("substation", "substations"),
    ("voltageLevel", "voltageLevels"),
    ("busbarSection", "busbarSections"),
    ("switch", "switches"),
    ("internalConnection", "internalConnections"),
    ("bus", "buses"),
    ("inj", "injections"),
    ("generator", "generators"),
    ("battery", "batteries"),
    ("load", "loads"),
    ("shunt", "shunts"),
    ("section", "sections"),
    ("staticVarCompensator", "staticVarCompensators"),
    ("danglingLine", "danglingLines"),
    ("vscConverterStation", "vscConverterStations"),
    ("lccConverterStation", "lccConverterStations"),
    ("line", "lines"),
    ("twoWindingsTransformer", "twoWindingsTransformers"),
    ("threeWindingsTransformer", "threeWindingsTransformers"),
    ("tieLine", "tieLines"),
    ("hvdcLine", "hvdcLines"),
    ("step", "steps"),
    ("point", "points"),
    ("temporaryLimit", "temporaryLimits"),
    ("operationalLimitsGroup", "operationalLimitsGroups"),
    ("operationalLimitsGroup1", "operationalLimitsGroups1"),
    ("operationalLimitsGroup2", "operationalLimitsGroups2"),
    ("operationalLimitsGroup3", "operationalLimitsGroups3"),
    ("extension", "extensions"),
];

pub fn array_name(element: &str) -> Option<&'static str> {
    ARRAY_ELEMENTS
        .iter()
        .find(|(single, _)| *single == element)
        .map(|(_, plural)| *plural)
}

pub fn element_of_array(array: &str) -> Option<&'static str> {
    ARRAY_ELEMENTS
        .iter()
        .find(|(_, plural)| *plural == array)
        .map(|(single, _)| *single)
}

/// Shortest decimal rendering that parses back to the same value.
pub fn format_double(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = value.abs();
    if value != 0.0 && (abs >= 1e7 || abs < 1e-3) {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/// Document encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeDataFormat {
    #[default]
    Xml,
    Json,
}

impl TreeDataFormat {
    /// Encoding implied by a file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xiidm" | "iidm" | "xml" => Some(TreeDataFormat::Xml),
            "jiidm" | "json" => Some(TreeDataFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TreeDataFormat::Xml => "xiidm",
            TreeDataFormat::Json => "jiidm",
        }
    }
}

impl FromStr for TreeDataFormat {
    type Err = IidmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" | "xiidm" => Ok(TreeDataFormat::Xml),
            "json" | "jiidm" => Ok(TreeDataFormat::Json),
            other => Err(IidmError::Config(format!("unknown document format '{other}'"))),
        }
    }
}

/// Streaming writer of nested attributed nodes.
pub trait TreeDataWriter {
    /// Declare a namespace prefix; must be called before the root node is started.
    fn declare_namespace(&mut self, prefix: &str, uri: &str);
    fn write_start_node(&mut self, namespace: &str, name: &str) -> IidmResult<()>;
    fn write_end_node(&mut self) -> IidmResult<()>;
    fn write_string_attribute(&mut self, name: &str, value: &str) -> IidmResult<()>;
    /// NaN values are not written.
    fn write_double_attribute(&mut self, name: &str, value: f64) -> IidmResult<()>;
    fn write_int_attribute(&mut self, name: &str, value: i32) -> IidmResult<()>;
    fn write_bool_attribute(&mut self, name: &str, value: bool) -> IidmResult<()>;
    fn write_int_array_attribute(&mut self, name: &str, values: &[u32]) -> IidmResult<()>;
    /// Text content of the current node; no attribute may follow.
    fn write_node_content(&mut self, content: &str) -> IidmResult<()>;
    /// Flush the document; no node may be open.
    fn finish(&mut self) -> IidmResult<()>;

    fn write_optional_string_attribute(&mut self, name: &str, value: Option<&str>) -> IidmResult<()> {
        match value {
            Some(value) => self.write_string_attribute(name, value),
            None => Ok(()),
        }
    }

    fn write_double_attribute_with_default(&mut self, name: &str, value: f64, default: f64) -> IidmResult<()> {
        if is_default(value, default) {
            return Ok(());
        }
        self.write_double_attribute(name, value)
    }

    fn write_bool_attribute_with_default(&mut self, name: &str, value: bool, default: bool) -> IidmResult<()> {
        if value == default {
            return Ok(());
        }
        self.write_bool_attribute(name, value)
    }
}

/// Equality that treats two NaNs as equal.
pub fn is_default(value: f64, default: f64) -> bool {
    value == default || (value.is_nan() && default.is_nan())
}

/// Root node of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RootNode {
    pub name: String,
    /// Namespace URI of the root element (XML)
    pub namespace: Option<String>,
    /// Explicit version attribute (JSON)
    pub version: Option<String>,
}

/// Forward-only reader of nested attributed nodes.
pub trait TreeDataReader {
    /// Enter the root node.
    fn read_root(&mut self) -> IidmResult<RootNode>;
    /// Enter the next child of the current node, or leave the current node.
    fn next_child(&mut self) -> IidmResult<Option<String>>;
    /// Attribute of the current node.
    fn attribute(&self, name: &str) -> Option<&str>;
    fn attribute_names(&self) -> Vec<String>;
    /// Namespace URI of the current node, when the encoding carries one.
    fn namespace(&self) -> Option<&str>;
    /// Number of entered nodes, root included.
    fn depth(&self) -> usize;
    /// Text content of the current node, which is left afterwards.
    fn read_content(&mut self) -> IidmResult<String>;

    /// Consume the remainder of the current node, children included.
    fn skip_node(&mut self) -> IidmResult<()> {
        while self.next_child()?.is_some() {
            self.skip_node()?;
        }
        Ok(())
    }

    /// Leave a node that accepts no children.
    fn read_end_node(&mut self, owner: &str) -> IidmResult<()> {
        match self.next_child()? {
            Some(element) => Err(IidmError::UnknownElement {
                element,
                parent: owner.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn read_string(&self, name: &str) -> Option<String> {
        self.attribute(name).map(str::to_string)
    }

    fn read_required_string(&self, name: &str) -> IidmResult<String> {
        self.read_string(name)
            .ok_or_else(|| IidmError::Parse(format!("missing attribute '{name}'")))
    }

    /// NaN when absent.
    fn read_double(&self, name: &str) -> IidmResult<f64> {
        self.read_double_or(name, f64::NAN)
    }

    fn read_double_or(&self, name: &str, default: f64) -> IidmResult<f64> {
        match self.attribute(name) {
            Some(raw) => parse_double(name, raw),
            None => Ok(default),
        }
    }

    fn read_required_double(&self, name: &str) -> IidmResult<f64> {
        let raw = self
            .attribute(name)
            .ok_or_else(|| IidmError::Parse(format!("missing attribute '{name}'")))?;
        parse_double(name, raw)
    }

    fn read_int(&self, name: &str) -> IidmResult<Option<i32>> {
        self.attribute(name)
            .map(|raw| {
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| IidmError::Parse(format!("attribute '{name}': invalid integer '{raw}'")))
            })
            .transpose()
    }

    fn read_required_int(&self, name: &str) -> IidmResult<i32> {
        self.read_int(name)?
            .ok_or_else(|| IidmError::Parse(format!("missing attribute '{name}'")))
    }

    fn read_bool(&self, name: &str) -> IidmResult<Option<bool>> {
        self.attribute(name)
            .map(|raw| match raw.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(IidmError::Parse(format!("attribute '{name}': invalid boolean '{other}'"))),
            })
            .transpose()
    }

    fn read_bool_or(&self, name: &str, default: bool) -> IidmResult<bool> {
        Ok(self.read_bool(name)?.unwrap_or(default))
    }

    fn read_int_array(&self, name: &str) -> IidmResult<Vec<u32>> {
        match self.attribute(name) {
            None => Ok(Vec::new()),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u32>()
                        .map_err(|_| IidmError::Parse(format!("attribute '{name}': invalid node '{s}'")))
                })
                .collect(),
        }
    }
}

pub fn parse_double(name: &str, raw: &str) -> IidmResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| IidmError::Parse(format!("attribute '{name}': invalid number '{raw}'")))
}

/// Enumerated attribute of the current node.
pub fn read_enum<T>(reader: &dyn TreeDataReader, name: &str) -> IidmResult<Option<T>>
where
    T: FromStr<Err = IidmError>,
{
    reader.attribute(name).map(str::parse::<T>).transpose()
}

pub fn read_required_enum<T>(reader: &dyn TreeDataReader, name: &str) -> IidmResult<T>
where
    T: FromStr<Err = IidmError>,
{
    read_enum(reader, name)?.ok_or_else(|| IidmError::Parse(format!("missing attribute '{name}'")))
}

/// Writer for `format` over `out`.
pub fn writer<'a, W: Write + 'a>(
    format: TreeDataFormat,
    out: W,
    indent: bool,
    version: IidmVersion,
) -> Box<dyn TreeDataWriter + 'a> {
    match format {
        TreeDataFormat::Xml => Box::new(XmlTreeWriter::new(out, indent)),
        TreeDataFormat::Json => Box::new(JsonTreeWriter::new(out, indent, version)),
    }
}

/// Reader for `format` over `input`.
pub fn reader<'a, R: BufRead + 'a>(format: TreeDataFormat, input: R) -> IidmResult<Box<dyn TreeDataReader + 'a>> {
    Ok(match format {
        TreeDataFormat::Xml => Box::new(XmlTreeReader::new(input)),
        TreeDataFormat::Json => Box::new(JsonTreeReader::new(input)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_double_round_trips() {
        for value in [0.0, 1.0, -3.5, 0.1, 1e-5, 400.0, f64::MAX, -f64::MAX, 12345678.9] {
            let text = format_double(value);
            assert_eq!(text.parse::<f64>().expect("parse"), value, "{text}");
        }
        assert_eq!(format_double(400.0), "400");
        assert_eq!(format_double(f64::MAX), "1.7976931348623157e308");
    }

    #[test]
    fn test_infinite_doubles_spelled_out() {
        assert_eq!(format_double(f64::INFINITY), "Infinity");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(parse_double("maxQ", "Infinity").expect("parse"), f64::INFINITY);
        assert_eq!(parse_double("minQ", "-Infinity").expect("parse"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(TreeDataFormat::detect(Path::new("a/b.xiidm")), Some(TreeDataFormat::Xml));
        assert_eq!(TreeDataFormat::detect(Path::new("b.JSON")), Some(TreeDataFormat::Json));
        assert_eq!(TreeDataFormat::detect(Path::new("b.txt")), None);
    }

    #[test]
    fn test_array_names() {
        assert_eq!(array_name("switch"), Some("switches"));
        assert_eq!(element_of_array("temporaryLimits"), Some("temporaryLimit"));
        assert_eq!(array_name("network"), None);
    }
}
