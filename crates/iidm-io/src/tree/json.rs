//! JSON encoding of the same node tree as the XML one.
//!
//! Attributes become object members; a single child becomes a nested object keyed by its
//! name; repeated children (see [`ARRAY_ELEMENTS`](super::ARRAY_ELEMENTS)) become arrays
//! under their plural key. The root object carries a `version` member instead of a
//! namespace.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use iidm_core::{IidmError, IidmResult};
use serde_json::{Map, Value};

use super::{array_name, element_of_array, format_double, RootNode, TreeDataReader, TreeDataWriter};
use crate::version::IidmVersion;

pub const ROOT_NAME: &str = "network";
const VERSION_KEY: &str = "version";
const CONTENT_KEY: &str = "content";

pub struct JsonTreeWriter<W: Write> {
    out: W,
    indent: bool,
    version: IidmVersion,
    stack: Vec<(String, Map<String, Value>)>,
    root: Option<Map<String, Value>>,
}

impl<W: Write> JsonTreeWriter<W> {
    pub fn new(out: W, indent: bool, version: IidmVersion) -> Self {
        Self {
            out,
            indent,
            version,
            stack: Vec::new(),
            root: None,
        }
    }

    fn current(&mut self, attribute: &str) -> IidmResult<&mut Map<String, Value>> {
        self.stack
            .last_mut()
            .map(|(_, object)| object)
            .ok_or_else(|| IidmError::Other(format!("attribute '{attribute}' written outside of a node")))
    }
}

impl<W: Write> TreeDataWriter for JsonTreeWriter<W> {
    fn declare_namespace(&mut self, _prefix: &str, _uri: &str) {}

    fn write_start_node(&mut self, _namespace: &str, name: &str) -> IidmResult<()> {
        self.stack.push((name.to_string(), Map::new()));
        Ok(())
    }

    fn write_end_node(&mut self) -> IidmResult<()> {
        let (name, object) = self
            .stack
            .pop()
            .ok_or_else(|| IidmError::Other("end node without a matching start node".into()))?;
        let Some((_, parent)) = self.stack.last_mut() else {
            self.root = Some(object);
            return Ok(());
        };
        match array_name(&name) {
            Some(plural) => {
                let slot = parent
                    .entry(plural.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(items) => items.push(Value::Object(object)),
                    _ => {
                        return Err(IidmError::Other(format!(
                            "'{plural}' is used both as an attribute and as an array"
                        )))
                    }
                }
            }
            None => {
                parent.insert(name, Value::Object(object));
            }
        }
        Ok(())
    }

    fn write_string_attribute(&mut self, name: &str, value: &str) -> IidmResult<()> {
        self.current(name)?
            .insert(name.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn write_double_attribute(&mut self, name: &str, value: f64) -> IidmResult<()> {
        if value.is_nan() {
            return Ok(());
        }
        // JSON numbers have no infinities
        let value = if value.is_finite() {
            Value::from(value)
        } else {
            Value::String(format_double(value))
        };
        self.current(name)?.insert(name.to_string(), value);
        Ok(())
    }

    fn write_int_attribute(&mut self, name: &str, value: i32) -> IidmResult<()> {
        self.current(name)?.insert(name.to_string(), Value::from(value));
        Ok(())
    }

    fn write_bool_attribute(&mut self, name: &str, value: bool) -> IidmResult<()> {
        self.current(name)?.insert(name.to_string(), Value::Bool(value));
        Ok(())
    }

    fn write_int_array_attribute(&mut self, name: &str, values: &[u32]) -> IidmResult<()> {
        let items = values.iter().map(|v| Value::from(*v)).collect();
        self.current(name)?.insert(name.to_string(), Value::Array(items));
        Ok(())
    }

    fn write_node_content(&mut self, content: &str) -> IidmResult<()> {
        self.write_string_attribute(CONTENT_KEY, content)
    }

    fn finish(&mut self) -> IidmResult<()> {
        if !self.stack.is_empty() {
            return Err(IidmError::Other(format!(
                "document finished with {} open node(s)",
                self.stack.len()
            )));
        }
        let mut document = Map::new();
        document.insert(VERSION_KEY.to_string(), Value::String(self.version.to_string()));
        document.extend(self.root.take().unwrap_or_default());
        let document = Value::Object(document);
        if self.indent {
            serde_json::to_writer_pretty(&mut self.out, &document)?;
        } else {
            serde_json::to_writer(&mut self.out, &document)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

enum JsonEvent {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    End,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flatten(name: &str, object: &Map<String, Value>, root: bool, events: &mut VecDeque<JsonEvent>) {
    let mut attributes = Vec::new();
    let mut children: Vec<(&str, &Map<String, Value>)> = Vec::new();
    for (key, value) in object {
        if root && key == VERSION_KEY {
            continue;
        }
        match value {
            Value::Object(child) => children.push((key.as_str(), child)),
            Value::Array(items) if items.is_empty() => {}
            Value::Array(items) if items.iter().all(Value::is_object) => {
                let element = element_of_array(key).unwrap_or(key.as_str());
                children.extend(items.iter().filter_map(Value::as_object).map(|child| (element, child)));
            }
            Value::Array(items) => {
                let joined = items.iter().filter_map(scalar_text).collect::<Vec<_>>().join(",");
                attributes.push((key.clone(), joined));
            }
            Value::Null => {}
            scalar => {
                if let Some(text) = scalar_text(scalar) {
                    attributes.push((key.clone(), text));
                }
            }
        }
    }
    events.push_back(JsonEvent::Start {
        name: name.to_string(),
        attributes,
    });
    for (child_name, child) in children {
        flatten(child_name, child, false, events);
    }
    events.push_back(JsonEvent::End);
}

/// JSON reader; the document is parsed up front and replayed as node events.
pub struct JsonTreeReader {
    version: Option<String>,
    events: VecDeque<JsonEvent>,
    stack: Vec<(String, Vec<(String, String)>)>,
}

impl JsonTreeReader {
    pub fn new<R: BufRead>(input: R) -> IidmResult<Self> {
        let value: Value = serde_json::from_reader(input)?;
        let Value::Object(document) = value else {
            return Err(IidmError::Parse("JSON document root must be an object".into()));
        };
        let version = document.get(VERSION_KEY).and_then(scalar_text);
        let mut events = VecDeque::new();
        flatten(ROOT_NAME, &document, true, &mut events);
        Ok(Self {
            version,
            events,
            stack: Vec::new(),
        })
    }

    fn enter(&mut self) -> Option<String> {
        match self.events.pop_front()? {
            JsonEvent::Start { name, attributes } => {
                self.stack.push((name.clone(), attributes));
                Some(name)
            }
            JsonEvent::End => {
                self.stack.pop();
                None
            }
        }
    }
}

impl TreeDataReader for JsonTreeReader {
    fn read_root(&mut self) -> IidmResult<RootNode> {
        let name = self
            .enter()
            .ok_or_else(|| IidmError::Parse("empty document".into()))?;
        Ok(RootNode {
            name,
            namespace: None,
            version: self.version.clone(),
        })
    }

    fn next_child(&mut self) -> IidmResult<Option<String>> {
        if self.stack.is_empty() || self.events.is_empty() {
            return Err(IidmError::Parse("unexpected end of document".into()));
        }
        Ok(self.enter())
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.stack
            .last()?
            .1
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn attribute_names(&self) -> Vec<String> {
        self.stack
            .last()
            .map(|(_, attributes)| attributes.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    fn namespace(&self) -> Option<&str> {
        None
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn read_content(&mut self) -> IidmResult<String> {
        let content = self.attribute(CONTENT_KEY).unwrap_or_default().to_string();
        let owner = self.stack.last().map(|(name, _)| name.clone()).unwrap_or_default();
        match self.next_child()? {
            Some(element) => Err(IidmError::UnknownElement { element, parent: owner }),
            None => Ok(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_children_become_arrays() {
        let mut out = Vec::new();
        {
            let mut writer = JsonTreeWriter::new(&mut out, false, IidmVersion::V_1_12);
            writer.write_start_node("", "network").expect("start");
            writer.write_string_attribute("id", "n").expect("attr");
            for id in ["S1", "S2"] {
                writer.write_start_node("", "substation").expect("start");
                writer.write_string_attribute("id", id).expect("attr");
                writer.write_end_node().expect("end");
            }
            writer.write_start_node("", "busbarSectionPosition").expect("start");
            writer.write_int_attribute("busbarIndex", 1).expect("attr");
            writer.write_end_node().expect("end");
            writer.write_end_node().expect("end");
            writer.finish().expect("finish");
        }
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            r#"{"version":"1.12","id":"n","substations":[{"id":"S1"},{"id":"S2"}],"busbarSectionPosition":{"busbarIndex":1}}"#
        );
    }

    #[test]
    fn test_infinite_double_survives() {
        let mut out = Vec::new();
        {
            let mut writer = JsonTreeWriter::new(&mut out, false, IidmVersion::V_1_12);
            writer.write_start_node("", "network").expect("start");
            writer.write_double_attribute("maxP", f64::INFINITY).expect("attr");
            writer.write_double_attribute("minP", f64::NEG_INFINITY).expect("attr");
            writer.write_double_attribute("targetV", f64::NAN).expect("attr");
            writer.write_end_node().expect("end");
            writer.finish().expect("finish");
        }
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, r#"{"version":"1.12","maxP":"Infinity","minP":"-Infinity"}"#);

        let mut reader = JsonTreeReader::new(text.as_bytes()).expect("reader");
        reader.read_root().expect("root");
        assert_eq!(reader.read_double("maxP").expect("maxP"), f64::INFINITY);
        assert_eq!(reader.read_double("minP").expect("minP"), f64::NEG_INFINITY);
        assert!(reader.read_double("targetV").expect("targetV").is_nan());
    }

    #[test]
    fn test_reader_replays_nodes() {
        let text = r#"{"version":"1.12","id":"n","forecastDistance":0,
            "substations":[{"id":"S1","geographicalTags":["a","b"]}],
            "extension":{"id":"G1"}}"#;
        let mut reader = JsonTreeReader::new(text.as_bytes()).expect("parse");
        let root = reader.read_root().expect("root");
        assert_eq!(root.name, "network");
        assert_eq!(root.version.as_deref(), Some("1.12"));
        assert_eq!(reader.attribute("forecastDistance"), Some("0"));
        assert!(reader.attribute("version").is_none());
        assert_eq!(reader.next_child().expect("child").as_deref(), Some("substation"));
        assert_eq!(reader.attribute("geographicalTags"), Some("a,b"));
        assert_eq!(reader.next_child().expect("end"), None);
        assert_eq!(reader.next_child().expect("child").as_deref(), Some("extension"));
        assert_eq!(reader.next_child().expect("end"), None);
        assert_eq!(reader.next_child().expect("end"), None);
    }

    #[test]
    fn test_alias_content() {
        let text = r#"{"version":"1.12","id":"n","aliases":[{"type":"code","content":"A1"}]}"#;
        let mut reader = JsonTreeReader::new(text.as_bytes()).expect("parse");
        reader.read_root().expect("root");
        assert_eq!(reader.next_child().expect("alias").as_deref(), Some("alias"));
        assert_eq!(reader.read_content().expect("content"), "A1");
        assert_eq!(reader.next_child().expect("end"), None);
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(JsonTreeReader::new("[1,2]".as_bytes()).is_err());
    }
}
