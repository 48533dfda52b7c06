use std::collections::HashMap;
use std::io::{BufRead, Write};

use iidm_core::{IidmError, IidmResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{format_double, RootNode, TreeDataReader, TreeDataWriter};

fn write_error(err: quick_xml::Error) -> IidmError {
    IidmError::Other(format!("XML write error: {err}"))
}

fn read_error(err: quick_xml::Error) -> IidmError {
    IidmError::Parse(format!("XML error: {err}"))
}

/// XML writer. A start tag is held back until its first child or its end, so childless
/// nodes come out self-closing.
pub struct XmlTreeWriter<W: Write> {
    writer: Writer<W>,
    namespaces: Vec<(String, String)>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
    started: bool,
}

impl<W: Write> XmlTreeWriter<W> {
    pub fn new(out: W, indent: bool) -> Self {
        let writer = if indent {
            Writer::new_with_indent(out, b' ', 4)
        } else {
            Writer::new(out)
        };
        Self {
            writer,
            namespaces: Vec::new(),
            pending: None,
            open: Vec::new(),
            started: false,
        }
    }

    fn qualified(&self, namespace: &str, name: &str) -> IidmResult<String> {
        self.namespaces
            .iter()
            .find(|(_, uri)| uri == namespace)
            .map(|(prefix, _)| format!("{prefix}:{name}"))
            .ok_or_else(|| IidmError::Other(format!("namespace '{namespace}' is not declared")))
    }

    fn flush_pending(&mut self) -> IidmResult<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start)).map_err(write_error)?;
        }
        Ok(())
    }

    fn pending_mut(&mut self, attribute: &str) -> IidmResult<&mut BytesStart<'static>> {
        self.pending
            .as_mut()
            .ok_or_else(|| IidmError::Other(format!("attribute '{attribute}' written after node content")))
    }
}

impl<W: Write> TreeDataWriter for XmlTreeWriter<W> {
    fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if !self.namespaces.iter().any(|(p, _)| p == prefix) {
            self.namespaces.push((prefix.to_string(), uri.to_string()));
        }
    }

    fn write_start_node(&mut self, namespace: &str, name: &str) -> IidmResult<()> {
        self.flush_pending()?;
        let qname = self.qualified(namespace, name)?;
        let mut start = BytesStart::new(qname.clone());
        if !self.started {
            self.writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(write_error)?;
            for (prefix, uri) in &self.namespaces {
                start.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
            }
            self.started = true;
        }
        self.open.push(qname);
        self.pending = Some(start);
        Ok(())
    }

    fn write_end_node(&mut self) -> IidmResult<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| IidmError::Other("end node without a matching start node".into()))?;
        let event = match self.pending.take() {
            Some(start) => Event::Empty(start),
            None => Event::End(BytesEnd::new(name)),
        };
        self.writer.write_event(event).map_err(write_error)
    }

    fn write_string_attribute(&mut self, name: &str, value: &str) -> IidmResult<()> {
        self.pending_mut(name)?.push_attribute((name, value));
        Ok(())
    }

    fn write_double_attribute(&mut self, name: &str, value: f64) -> IidmResult<()> {
        if value.is_nan() {
            return Ok(());
        }
        self.write_string_attribute(name, &format_double(value))
    }

    fn write_int_attribute(&mut self, name: &str, value: i32) -> IidmResult<()> {
        self.write_string_attribute(name, &value.to_string())
    }

    fn write_bool_attribute(&mut self, name: &str, value: bool) -> IidmResult<()> {
        self.write_string_attribute(name, if value { "true" } else { "false" })
    }

    fn write_int_array_attribute(&mut self, name: &str, values: &[u32]) -> IidmResult<()> {
        let joined = values
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.write_string_attribute(name, &joined)
    }

    fn write_node_content(&mut self, content: &str) -> IidmResult<()> {
        self.flush_pending()?;
        self.writer
            .write_event(Event::Text(BytesText::new(content)))
            .map_err(write_error)
    }

    fn finish(&mut self) -> IidmResult<()> {
        if !self.open.is_empty() {
            return Err(IidmError::Other(format!(
                "document finished with {} open node(s)",
                self.open.len()
            )));
        }
        self.writer.get_mut().flush()?;
        Ok(())
    }
}

struct XmlFrame {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    empty: bool,
}

fn frame_from(start: &BytesStart, namespaces: &mut HashMap<String, String>, empty: bool) -> IidmResult<XmlFrame> {
    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| IidmError::Parse(format!("malformed attribute in '{qname}': {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(read_error)?.into_owned();
        if key == "xmlns" {
            namespaces.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.insert(prefix.to_string(), value);
        } else {
            attributes.push((key, value));
        }
    }
    let (prefix, local) = match qname.split_once(':') {
        Some((prefix, local)) => (prefix.to_string(), local.to_string()),
        None => (String::new(), qname.clone()),
    };
    Ok(XmlFrame {
        name: local,
        namespace: namespaces.get(&prefix).cloned(),
        attributes,
        empty,
    })
}

/// Pull-based XML reader over any buffered input.
pub struct XmlTreeReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    namespaces: HashMap<String, String>,
    stack: Vec<XmlFrame>,
}

impl<R: BufRead> XmlTreeReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            namespaces: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn current(&self) -> Option<&XmlFrame> {
        self.stack.last()
    }
}

impl<R: BufRead> TreeDataReader for XmlTreeReader<R> {
    fn read_root(&mut self) -> IidmResult<RootNode> {
        loop {
            self.buf.clear();
            let frame = match self.reader.read_event_into(&mut self.buf).map_err(read_error)? {
                Event::Start(e) => frame_from(&e, &mut self.namespaces, false)?,
                Event::Empty(e) => frame_from(&e, &mut self.namespaces, true)?,
                Event::Eof => return Err(IidmError::Parse("empty document".into())),
                _ => continue,
            };
            let root = RootNode {
                name: frame.name.clone(),
                namespace: frame.namespace.clone(),
                version: None,
            };
            self.stack.push(frame);
            return Ok(root);
        }
    }

    fn next_child(&mut self) -> IidmResult<Option<String>> {
        match self.stack.last() {
            None => return Err(IidmError::Parse("no open node".into())),
            Some(frame) if frame.empty => {
                self.stack.pop();
                return Ok(None);
            }
            Some(_) => {}
        }
        loop {
            self.buf.clear();
            let frame = match self.reader.read_event_into(&mut self.buf).map_err(read_error)? {
                Event::Start(e) => frame_from(&e, &mut self.namespaces, false)?,
                Event::Empty(e) => frame_from(&e, &mut self.namespaces, true)?,
                Event::End(_) => {
                    self.stack.pop();
                    return Ok(None);
                }
                Event::Eof => return Err(IidmError::Parse("unexpected end of document".into())),
                _ => continue,
            };
            let name = frame.name.clone();
            self.stack.push(frame);
            return Ok(Some(name));
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.current()?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn attribute_names(&self) -> Vec<String> {
        self.current()
            .map(|frame| frame.attributes.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    fn namespace(&self) -> Option<&str> {
        self.current()?.namespace.as_deref()
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn read_content(&mut self) -> IidmResult<String> {
        let owner = match self.stack.last() {
            None => return Err(IidmError::Parse("no open node".into())),
            Some(frame) if frame.empty => {
                self.stack.pop();
                return Ok(String::new());
            }
            Some(frame) => frame.name.clone(),
        };
        let mut content = String::new();
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf).map_err(read_error)? {
                Event::Text(text) => content.push_str(&text.unescape().map_err(read_error)?),
                Event::CData(data) => content.push_str(&String::from_utf8_lossy(&data)),
                Event::End(_) => {
                    self.stack.pop();
                    return Ok(content);
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(IidmError::UnknownElement {
                        element: frame_from(&e, &mut self.namespaces, true)?.name,
                        parent: owner,
                    })
                }
                Event::Eof => return Err(IidmError::Parse("unexpected end of document".into())),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://www.powsybl.org/schema/iidm/1_12";

    fn sample(indent: bool) -> String {
        let mut out = Vec::new();
        {
            let mut writer = XmlTreeWriter::new(&mut out, indent);
            writer.declare_namespace("iidm", NS);
            writer.write_start_node(NS, "network").expect("start");
            writer.write_string_attribute("id", "a<b").expect("attr");
            writer.write_start_node(NS, "substation").expect("start");
            writer.write_string_attribute("id", "S1").expect("attr");
            writer.write_double_attribute("skipped", f64::NAN).expect("attr");
            writer.write_end_node().expect("end");
            writer.write_end_node().expect("end");
            writer.finish().expect("finish");
        }
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn test_writer_self_closes_and_escapes() {
        let xml = sample(false);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:iidm=\"http://www.powsybl.org/schema/iidm/1_12\""));
        assert!(xml.contains("id=\"a&lt;b\""));
        assert!(xml.contains("<iidm:substation id=\"S1\"/>"));
        assert!(!xml.contains("skipped"));
    }

    #[test]
    fn test_reader_walks_nodes() {
        let xml = sample(true);
        let mut reader = XmlTreeReader::new(xml.as_bytes());
        let root = reader.read_root().expect("root");
        assert_eq!(root.name, "network");
        assert_eq!(root.namespace.as_deref(), Some(NS));
        assert_eq!(reader.attribute("id"), Some("a<b"));
        assert_eq!(reader.next_child().expect("child").as_deref(), Some("substation"));
        assert_eq!(reader.attribute("id"), Some("S1"));
        assert_eq!(reader.depth(), 2);
        assert_eq!(reader.next_child().expect("end"), None);
        assert_eq!(reader.next_child().expect("end"), None);
        assert_eq!(reader.depth(), 0);
    }

    #[test]
    fn test_unknown_child_reported_with_owner() {
        let xml = r#"<iidm:network xmlns:iidm="x" id="n"><iidm:load id="L"><iidm:foo/></iidm:load></iidm:network>"#;
        let mut reader = XmlTreeReader::new(xml.as_bytes());
        reader.read_root().expect("root");
        reader.next_child().expect("load");
        let err = reader.read_end_node("L").unwrap_err();
        assert_eq!(err.to_string(), "Unknown element name 'foo' in 'L'");
    }

    #[test]
    fn test_node_content() {
        let mut out = Vec::new();
        {
            let mut writer = XmlTreeWriter::new(&mut out, true);
            writer.declare_namespace("iidm", NS);
            writer.write_start_node(NS, "network").expect("start");
            writer.write_start_node(NS, "alias").expect("start");
            writer.write_string_attribute("type", "code").expect("attr");
            writer.write_node_content("A&B").expect("content");
            writer.write_end_node().expect("end");
            writer.write_end_node().expect("end");
            writer.finish().expect("finish");
        }
        let xml = String::from_utf8(out).expect("utf8");
        assert!(xml.contains(r#"<iidm:alias type="code">A&amp;B</iidm:alias>"#), "{xml}");

        let mut reader = XmlTreeReader::new(xml.as_bytes());
        reader.read_root().expect("root");
        assert_eq!(reader.next_child().expect("alias").as_deref(), Some("alias"));
        assert_eq!(reader.attribute("type"), Some("code"));
        assert_eq!(reader.read_content().expect("content"), "A&B");
        assert_eq!(reader.next_child().expect("end"), None);
    }

    #[test]
    fn test_skip_node_consumes_subtree() {
        let xml = r#"<n xmlns="x"><ext><a><b/></a><c/></ext><load id="L"/></n>"#;
        let mut reader = XmlTreeReader::new(xml.as_bytes());
        reader.read_root().expect("root");
        assert_eq!(reader.next_child().expect("ext").as_deref(), Some("ext"));
        reader.skip_node().expect("skip");
        assert_eq!(reader.next_child().expect("load").as_deref(), Some("load"));
        assert_eq!(reader.namespace(), Some("x"));
    }
}
